//! Recipe repositories on disk
//!
//! A repository is a directory with one sub-directory per recipe, each
//! holding a declaration file:
//!
//! ```text
//! recipes/
//! ├── binutils/brioche.yml
//! ├── gcc/brioche.yml
//! └── glibc/brioche.yml
//! ```
//!
//! Files are discovered in sorted path order so that loading, and the
//! duplicate that gets reported first, never depends on directory listing
//! order.

use crate::declaration::RecipeDeclaration;
use crate::error::{RecipeError, Result};
use crate::loader::{LoadedRecipes, LoaderConfig, load_recipes};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Declaration file name looked up in every recipe directory
pub const DEFAULT_RECIPE_FILE: &str = "brioche.yml";

/// A declaration file read from disk
#[derive(Debug, Clone)]
pub struct RecipeFile {
    /// Path of the file
    pub path: PathBuf,
    /// Parsed document
    pub declaration: RecipeDeclaration,
    /// SHA-256 of the file content, hex encoded
    pub checksum: String,
}

impl RecipeFile {
    /// Read and parse a declaration file.
    ///
    /// # Errors
    ///
    /// - `RecipeError::Io` if the file cannot be read
    /// - `RecipeError::MalformedDeclaration` if it is not valid YAML
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecipeError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let checksum = Self::calculate_checksum(&content);
        let declaration = RecipeDeclaration::from_yaml_str(path.display().to_string(), &content)?;

        Ok(Self {
            path: path.to_path_buf(),
            declaration,
            checksum,
        })
    }

    fn calculate_checksum(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// All declaration files found under a repository root
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    /// Directory that was scanned
    pub root: PathBuf,
    /// Files that parsed as YAML, in path order
    pub files: Vec<RecipeFile>,
    /// Files that could not be parsed
    pub rejected: Vec<RecipeError>,
}

impl RecipeRepository {
    /// Find and read `<root>/<dir>/<recipe_file>` for every sub-directory
    /// of `root`.
    ///
    /// Directories without the file are skipped. A file that is not valid
    /// YAML ends up in `rejected`.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Io` if the root cannot be walked or a
    /// declaration file cannot be read.
    pub async fn scan(root: impl AsRef<Path>, recipe_file: &str) -> Result<Self> {
        let root = root.as_ref();
        info!("Scanning {} for {} files", root.display(), recipe_file);

        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| RecipeError::Io {
                path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                message: e.to_string(),
            })?;

            if entry.file_type().is_file() && entry.file_name() == recipe_file {
                paths.push(entry.into_path());
            }
        }

        let mut files = Vec::with_capacity(paths.len());
        let mut rejected = Vec::new();
        for path in paths {
            match RecipeFile::load(&path).await {
                Ok(file) => {
                    debug!("Read {} ({})", path.display(), &file.checksum[..12]);
                    files.push(file);
                }
                Err(e @ RecipeError::MalformedDeclaration { .. }) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    rejected.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Found {} declaration file(s)", files.len() + rejected.len());

        Ok(Self {
            root: root.to_path_buf(),
            files,
            rejected,
        })
    }

    /// Declarations of every parsed file, in scan order
    pub fn declarations(&self) -> Vec<RecipeDeclaration> {
        self.files.iter().map(|file| file.declaration.clone()).collect()
    }

    /// Load the recipes of every file found.
    ///
    /// Files rejected during the scan come first in `rejected`.
    ///
    /// # Errors
    ///
    /// See [`load_recipes`].
    pub fn load(&self, config: &LoaderConfig) -> Result<LoadedRecipes> {
        let mut loaded = load_recipes(&self.declarations(), config)?;
        let mut rejected = self.rejected.clone();
        rejected.append(&mut loaded.rejected);
        loaded.rejected = rejected;
        Ok(loaded)
    }

    /// Checksum over every file's checksum, in path order.
    pub fn combined_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.checksum.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
