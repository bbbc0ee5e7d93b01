//! Converter registry and cache keys

use std::fmt;

use emblem_core::TypeName;

/// (source type, target type, optional format qualifier)
///
/// Equality and hashing cover all three fields, so a qualified pair never
/// collides with its unqualified counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConvertiblePair {
    /// Source type
    pub source: TypeName,
    /// Target type
    pub target: TypeName,
    /// Format qualifier (annotation name), if any
    pub qualifier: Option<TypeName>,
}

impl ConvertiblePair {
    /// Create an unqualified pair
    pub fn new(source: impl Into<TypeName>, target: impl Into<TypeName>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            qualifier: None,
        }
    }

    /// Create a qualified pair
    pub fn qualified(
        source: impl Into<TypeName>,
        target: impl Into<TypeName>,
        qualifier: impl Into<TypeName>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// Same pair with the given qualifier
    pub fn with_qualifier(&self, qualifier: Option<TypeName>) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.clone(),
            qualifier,
        }
    }
}

impl fmt::Display for ConvertiblePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, " @{}", qualifier)?;
        }
        Ok(())
    }
}
