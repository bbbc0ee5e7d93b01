//! Metadata errors
//!
//! Three families:
//! - `BuildError`: structural problems found while building a store. They are
//!   collected per element and never abort a build.
//! - `PlaceholderError`: a placeholder expression could not be resolved.
//! - `MetadataError`: opt-in failures of required queries, snapshots and
//!   configuration.

use emblem_convert::{ConfigError, ConversionError};
use emblem_core::TypeName;
use thiserror::Error;

/// Structural problem found while building a metadata store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A member alias names an annotation type that is not known
    #[error("{element}: alias of @{annotation}.{member} targets unknown annotation {target}")]
    UnresolvedAlias {
        /// Element being built
        element: String,
        /// Annotation declaring the alias
        annotation: TypeName,
        /// Aliased member
        member: String,
        /// Missing alias target
        target: TypeName,
    },

    /// Meta-annotations form a cycle
    #[error("{element}: stereotype cycle {}", format_chain(.chain))]
    StereotypeCycle {
        /// Element being built
        element: String,
        /// Annotation chain ending with the repeated type
        chain: Vec<TypeName>,
    },

    /// A repeatable annotation's container is unusable
    #[error("{element}: @{annotation} cannot repeat into {container}; treated as non-repeatable")]
    RepeatableMismatch {
        /// Element being built
        element: String,
        /// Repeatable annotation type
        annotation: TypeName,
        /// Declared container type
        container: TypeName,
    },

    /// Reported by a custom validator
    #[error("{element}: invalid @{annotation}: {message}")]
    Invalid {
        /// Element being built
        element: String,
        /// Offending annotation
        annotation: TypeName,
        /// Validator message
        message: String,
    },
}

impl BuildError {
    /// Element the error was found on
    pub fn element(&self) -> &str {
        match self {
            BuildError::UnresolvedAlias { element, .. }
            | BuildError::StereotypeCycle { element, .. }
            | BuildError::RepeatableMismatch { element, .. }
            | BuildError::Invalid { element, .. } => element,
        }
    }
}

fn format_chain(chain: &[TypeName]) -> String {
    chain
        .iter()
        .map(|name| format!("@{}", name))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Placeholder resolution failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaceholderError {
    /// No property and no default for a placeholder
    #[error("could not resolve placeholder ${{{placeholder}}} in \"{text}\"")]
    Unresolved {
        /// Placeholder key
        placeholder: String,
        /// Full text being resolved
        text: String,
    },

    /// A placeholder is opened but never closed
    #[error("malformed placeholder in \"{text}\"")]
    Malformed {
        /// Full text being resolved
        text: String,
    },

    /// Property values refer back to themselves
    #[error("circular placeholder reference to {key}")]
    Circular {
        /// Key seen twice while resolving
        key: String,
    },
}

/// Failure of an opt-in (throwing) metadata operation
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A required member has no value
    #[error("{element}: no value for @{annotation}.{member}")]
    MissingValue {
        /// Element queried
        element: String,
        /// Annotation queried
        annotation: TypeName,
        /// Member queried
        member: String,
    },

    /// A member value could not be converted to the requested type
    #[error("{element}: @{annotation}.{member} is not a valid {target}: {source}")]
    Conversion {
        /// Element queried
        element: String,
        /// Annotation queried
        annotation: TypeName,
        /// Member queried
        member: String,
        /// Requested type
        target: TypeName,
        /// Underlying conversion error
        source: ConversionError,
    },

    /// Placeholder resolution failed on a required path
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    /// A hierarchy needs at least one layer
    #[error("metadata hierarchy must have at least one layer")]
    EmptyHierarchy,

    /// Snapshot encoding or decoding failed
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot file IO failed
    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = BuildError::StereotypeCycle {
            element: "app.Service".into(),
            chain: vec![TypeName::new("A"), TypeName::new("B"), TypeName::new("A")],
        };
        assert_eq!(err.to_string(), "app.Service: stereotype cycle @A -> @B -> @A");
        assert_eq!(err.element(), "app.Service");
    }

    #[test]
    fn test_placeholder_message() {
        let err = PlaceholderError::Unresolved {
            placeholder: "db.url".into(),
            text: "${db.url}".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not resolve placeholder ${db.url} in \"${db.url}\""
        );
    }
}
