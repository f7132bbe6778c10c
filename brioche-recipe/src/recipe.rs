//! Recipe data model
//!
//! A recipe is an immutable record: identity (name + version), where its
//! source comes from, which other recipes it needs, and the shell script
//! that builds it. The script is never interpreted here.

use crate::error::{RecipeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recipe identity: name plus exact version.
///
/// Ordering is by name, then version, which is also the tie-break order of
/// build plans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecipeId {
    /// Recipe name, e.g. `gcc`
    pub name: String,
    /// Version string, compared as text
    pub version: String,
}

impl RecipeId {
    /// Identity from a name and a version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Where a recipe's source code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum RecipeSource {
    /// A git repository at a tag, branch or commit
    Git {
        /// Repository URL
        git: String,
        /// Tag, branch or commit to check out
        #[serde(rename = "ref")]
        git_ref: String,
    },
    /// A source archive to download and unpack
    Tarball {
        /// Archive URL
        tarball: String,
    },
}

impl RecipeSource {
    /// Tarball or repository URL
    pub fn url(&self) -> &str {
        match self {
            RecipeSource::Git { git, .. } => git,
            RecipeSource::Tarball { tarball } => tarball,
        }
    }

    /// `tarball` or `git`
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeSource::Git { .. } => "git",
            RecipeSource::Tarball { .. } => "tarball",
        }
    }
}

impl fmt::Display for RecipeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeSource::Git { git, git_ref } => write!(f, "git {git} ({git_ref})"),
            RecipeSource::Tarball { tarball } => write!(f, "tarball {tarball}"),
        }
    }
}

/// Shell program that builds a recipe, plus environment overrides.
///
/// Scripts are static text. Use [`BuildScript::sh`] or the [`sh!`](crate::sh)
/// macro for literals; [`BuildScript::from_template`] rejects any template
/// that carries interpolated values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildScript {
    shell: String,
    script: String,
    env_vars: BTreeMap<String, String>,
}

impl BuildScript {
    /// Shell used when a declaration does not name one
    pub const DEFAULT_SHELL: &'static str = "sh";

    /// Build script from a string literal, run with `sh`.
    pub fn sh(script: &'static str) -> Self {
        Self::new(Self::DEFAULT_SHELL, script)
    }

    /// Script run by `shell`, with no overrides
    pub fn new(shell: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            script: script.into(),
            env_vars: BTreeMap::new(),
        }
    }

    /// Build script from template parts: literal fragments and the values
    /// that would go between them.
    ///
    /// Only a single fragment with no arguments is accepted.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Interpolation` for anything else.
    pub fn from_template<A>(fragments: &[&str], arguments: &[A]) -> Result<Self> {
        match (fragments, arguments) {
            ([script], []) => Ok(Self::new(Self::DEFAULT_SHELL, *script)),
            _ => Err(RecipeError::Interpolation {
                fragments: fragments.len(),
                arguments: arguments.len(),
            }),
        }
    }

    /// Add an environment override
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.env_vars.insert(name.into(), value.into());
        self
    }

    /// Interpreter of the script
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Script text, run as is
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Environment overrides by name
    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }
}

/// Build script from a string literal.
///
/// Passing anything besides the literal is a compile error, so values can
/// never be spliced into shell text.
///
/// ```
/// use brioche_recipe::sh;
///
/// let build = sh!("make && make install");
/// assert_eq!(build.shell(), "sh");
/// ```
///
/// ```compile_fail
/// use brioche_recipe::sh;
///
/// let prefix = "/usr";
/// let build = sh!("./configure --prefix={}", prefix);
/// ```
#[macro_export]
macro_rules! sh {
    ($script:literal $(,)?) => {
        $crate::BuildScript::sh($script)
    };
    ($script:literal, $($arguments:tt)+) => {
        compile_error!("Cannot interpolate values into a build script")
    };
}

/// A loaded recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    /// Name and version
    #[serde(flatten)]
    pub id: RecipeId,
    /// Where the sources come from
    pub source: RecipeSource,
    /// Dependency name -> required version
    pub dependencies: BTreeMap<String, String>,
    /// How the recipe is built
    pub build: BuildScript,
}

impl Recipe {
    /// Recipe without dependencies
    pub fn new(id: RecipeId, source: RecipeSource, build: BuildScript) -> Self {
        Self {
            id,
            source,
            dependencies: BTreeMap::new(),
            build,
        }
    }

    /// Add a dependency on `name` at `version`
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        let _ = self.dependencies.insert(name.into(), version.into());
        self
    }

    /// Shorthand for `id.name`
    pub fn name(&self) -> &str {
        &self.id.name
    }

    /// Shorthand for `id.version`
    pub fn version(&self) -> &str {
        &self.id.version
    }

    /// Identities of the declared dependencies, ordered by name.
    pub fn dependency_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        self.dependencies
            .iter()
            .map(|(name, version)| RecipeId::new(name.as_str(), version.as_str()))
    }
}
