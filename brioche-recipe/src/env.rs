//! Environment handed to build scripts

use crate::recipe::Recipe;
use std::collections::BTreeMap;
use std::path::PathBuf;
use target_lexicon::{CustomVendor, Triple, Vendor};
use tracing::warn;

/// Install prefix of the recipe being built
pub const PREFIX_VAR: &str = "BRIOCHE_PREFIX";

/// Target triple used while bootstrapping the cross toolchain
pub const BOOTSTRAP_TARGET_VAR: &str = "BRIOCHE_BOOTSTRAP_TARGET";

/// Vendor field of the bootstrap target triple
pub const BOOTSTRAP_VENDOR: &str = "brioche_bootstrap";

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "/home/brioche-dev/.local/share/brioche/prefix";

/// Bootstrap target for `triple`: the same triple with the vendor replaced
/// by [`BOOTSTRAP_VENDOR`].
pub fn bootstrap_target_for(triple: &Triple) -> String {
    let mut bootstrap_target = triple.clone();
    bootstrap_target.vendor = Vendor::Custom(CustomVendor::Static(BOOTSTRAP_VENDOR));
    bootstrap_target.to_string()
}

/// Values every build script sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnv {
    /// Value of `BRIOCHE_PREFIX`
    pub prefix: PathBuf,
    /// Value of `BRIOCHE_BOOTSTRAP_TARGET`
    pub bootstrap_target: String,
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self::host()
    }
}

impl BuildEnv {
    /// Environment with explicit values
    pub fn new(prefix: impl Into<PathBuf>, bootstrap_target: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            bootstrap_target: bootstrap_target.into(),
        }
    }

    /// Default prefix, bootstrap target derived from the host triple.
    pub fn host() -> Self {
        Self::new(
            DEFAULT_PREFIX,
            bootstrap_target_for(&target_lexicon::HOST),
        )
    }

    /// Same values with another prefix
    #[must_use]
    pub fn with_prefix(&self, prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            bootstrap_target: self.bootstrap_target.clone(),
        }
    }

    /// Variables for running `recipe`'s build script.
    ///
    /// The recipe's own overrides are applied on top, except for the two
    /// engine variables, which always keep the engine's values.
    pub fn resolve(&self, recipe: &Recipe) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        let _ = vars.insert(PREFIX_VAR.to_string(), self.prefix.display().to_string());
        let _ = vars.insert(
            BOOTSTRAP_TARGET_VAR.to_string(),
            self.bootstrap_target.clone(),
        );

        for (name, value) in recipe.build.env_vars() {
            if name == PREFIX_VAR || name == BOOTSTRAP_TARGET_VAR {
                warn!("{} tries to override {}, ignoring", recipe.id, name);
                continue;
            }
            let _ = vars.insert(name.clone(), value.clone());
        }

        vars
    }
}
