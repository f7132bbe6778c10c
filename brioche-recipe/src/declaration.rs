//! Raw recipe declarations and their validation
//!
//! A declaration is an untyped YAML (or JSON) document tagged with where it
//! came from. Turning it into a [`Recipe`] checks the required fields and
//! their shapes; every failure is a `MalformedDeclaration` naming the origin.

use crate::error::{RecipeError, Result};
use crate::recipe::{BuildScript, Recipe, RecipeId, RecipeSource};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Fields every declaration must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "version", "source", "build"];

/// An unvalidated recipe declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDeclaration {
    /// File path or label used in error messages
    pub origin: String,
    /// Parsed document
    pub body: serde_yaml::Value,
}

/// Typed view of a declaration document
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationFields {
    name: String,
    version: String,
    source: RecipeSource,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, String>>,
    build: BuildField,
}

/// `build:` is either the bare script or a mapping with shell and env
#[derive(Debug, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
enum BuildField {
    Script(String),
    Full {
        #[serde(default)]
        shell: Option<String>,
        script: String,
        #[serde(default, alias = "envVars", alias = "env_vars")]
        env: Option<BTreeMap<String, String>>,
    },
}

impl From<BuildField> for BuildScript {
    fn from(field: BuildField) -> Self {
        match field {
            BuildField::Script(script) => BuildScript::new(BuildScript::DEFAULT_SHELL, script),
            BuildField::Full { shell, script, env } => {
                let shell = shell.unwrap_or_else(|| BuildScript::DEFAULT_SHELL.to_string());
                env.unwrap_or_default()
                    .into_iter()
                    .fold(BuildScript::new(shell, script), |build, (name, value)| {
                        build.with_env(name, value)
                    })
            }
        }
    }
}

impl RecipeDeclaration {
    /// Wrap an already parsed document
    pub fn new(origin: impl Into<String>, body: serde_yaml::Value) -> Self {
        Self {
            origin: origin.into(),
            body,
        }
    }

    /// Parse one YAML or JSON document.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::MalformedDeclaration` if the text is not a
    /// valid document.
    pub fn from_yaml_str(origin: impl Into<String>, text: &str) -> Result<Self> {
        let origin = origin.into();
        match serde_yaml::from_str(text) {
            Ok(body) => Ok(Self { origin, body }),
            Err(e) => Err(RecipeError::MalformedDeclaration {
                origin,
                reason: e.to_string(),
            }),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> RecipeError {
        RecipeError::MalformedDeclaration {
            origin: self.origin.clone(),
            reason: reason.into(),
        }
    }

    /// Validate the declaration and build the recipe it describes.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::MalformedDeclaration` if the document is not a
    /// mapping, a required field is missing or empty, or a field has the
    /// wrong shape (versions must be strings, not numbers).
    pub fn parse(&self) -> Result<Recipe> {
        let mapping = self
            .body
            .as_mapping()
            .ok_or_else(|| self.malformed("expected a mapping at the top level"))?;

        for field in REQUIRED_FIELDS {
            if !mapping.contains_key(field) {
                return Err(self.malformed(format!("missing required field `{field}`")));
            }
        }

        let fields: DeclarationFields =
            serde_yaml::from_value(self.body.clone()).map_err(|e| self.malformed(e.to_string()))?;

        if fields.name.trim().is_empty() {
            return Err(self.malformed("`name` must not be empty"));
        }
        if fields.version.trim().is_empty() {
            return Err(self.malformed("`version` must not be empty"));
        }

        let dependencies = fields.dependencies.unwrap_or_default();
        if let Some((name, _)) = dependencies
            .iter()
            .find(|(name, version)| name.trim().is_empty() || version.trim().is_empty())
        {
            return Err(self.malformed(format!(
                "dependency `{name}` needs a non-empty name and version"
            )));
        }

        let mut recipe = Recipe::new(
            RecipeId::new(fields.name, fields.version),
            fields.source,
            fields.build.into(),
        );
        recipe.dependencies = dependencies;

        Ok(recipe)
    }
}
