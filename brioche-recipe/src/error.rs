//! Error types for loading and planning recipes

use crate::recipe::RecipeId;
use brioche_graph::GraphError;
use std::path::PathBuf;

/// Errors raised while loading declarations, building the recipe graph or
/// planning a build.
///
/// Every variant carries the identifiers involved so callers can point at
/// the offending recipe without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecipeError {
    /// A declaration is missing a required field or has a field of the
    /// wrong shape
    #[error("Malformed declaration in {origin}: {reason}")]
    MalformedDeclaration {
        /// Where the declaration came from (file path or label)
        origin: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two declarations collide on their identity
    #[error("Duplicate recipe {duplicate} (already loaded as {existing})")]
    DuplicateRecipe {
        /// The recipe loaded first
        existing: RecipeId,
        /// The recipe that was rejected
        duplicate: RecipeId,
    },

    /// A recipe depends on a name and version that was not loaded
    #[error("Recipe {recipe} depends on {dependency}, which is not loaded")]
    UnresolvedDependency {
        /// The requesting recipe
        recipe: RecipeId,
        /// The missing dependency
        dependency: RecipeId,
    },

    /// The dependency relation contains a cycle
    #[error("Dependency cycle: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// Closed path: each recipe depends on the next, and the last one
        /// is the first again
        cycle: Vec<RecipeId>,
    },

    /// A build script template was given interpolated values
    #[error(
        "Cannot interpolate values into a build script ({fragments} fragments, {arguments} arguments)"
    )]
    Interpolation {
        /// Number of literal fragments in the template
        fragments: usize,
        /// Number of values to interpolate
        arguments: usize,
    },

    /// A recipe was asked for that is not in the loaded set
    #[error("Unknown recipe {0}")]
    UnknownRecipe(String),

    /// A recipe could not be serialized for hashing
    #[error("Failed to serialize {recipe}: {message}")]
    Serialization {
        /// The recipe being hashed
        recipe: RecipeId,
        /// Serializer message
        message: String,
    },

    /// File system I/O error
    #[error("IO error reading {path}: {message}")]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// Declarations were rejected while strict loading was requested
    #[error("{} declaration(s) rejected, first: {}", .0.len(), first_rejection(.0))]
    Rejected(Vec<RecipeError>),

    /// Unexpected error from the underlying graph
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for recipe operations.
pub type Result<T> = std::result::Result<T, RecipeError>;

fn format_cycle(cycle: &[RecipeId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn first_rejection(rejected: &[RecipeError]) -> String {
    rejected
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
