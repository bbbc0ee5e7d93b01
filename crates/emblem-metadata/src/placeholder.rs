//! Placeholder resolution
//!
//! `${key}` is replaced by the property `key`; `${key:fallback}` uses the
//! fallback when the property is missing. Several placeholders may appear in
//! one string, fallbacks may themselves contain placeholders, and property
//! values are resolved recursively.

use emblem_convert::ConversionService;
use emblem_core::{Argument, Value};
use indexmap::IndexMap;

use crate::config::{ConfigError, PlaceholderConfig};
use crate::error::PlaceholderError;

/// Resolves placeholder expressions in strings
pub trait PlaceholderResolver: Send + Sync {
    /// Check if `text` contains a placeholder marker
    fn has_placeholder(&self, text: &str) -> bool;

    /// Resolve every placeholder, failing on the first unresolved one
    fn resolve_required(&self, text: &str) -> Result<String, PlaceholderError>;

    /// Resolve every placeholder, or `None` if any is unresolved
    fn resolve_placeholders(&self, text: &str) -> Option<String> {
        self.resolve_required(text).ok()
    }

    /// Resolve and convert to `target`
    fn resolve_optional(
        &self,
        text: &str,
        target: &Argument,
        conversion: &ConversionService,
    ) -> Option<Value> {
        let resolved = self.resolve_placeholders(text)?;
        conversion.convert_value(&Value::String(resolved), target.clone())
    }
}

/// Map-backed resolver
#[derive(Debug, Clone, Default)]
pub struct PropertyPlaceholderResolver {
    properties: IndexMap<String, String>,
    syntax: PlaceholderConfig,
}

impl PropertyPlaceholderResolver {
    /// Empty resolver with the default `${key:default}` syntax
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty resolver with a custom syntax
    ///
    /// Fails if any marker is empty.
    pub fn with_syntax(syntax: PlaceholderConfig) -> Result<Self, ConfigError> {
        syntax.validate()?;
        Ok(Self {
            properties: IndexMap::new(),
            syntax,
        })
    }

    /// Resolver over the given properties
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut resolver = Self::new();
        for (key, value) in properties {
            resolver.insert(key, value);
        }
        resolver
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a property
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Look up a raw property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn resolve_text(&self, text: &str, visiting: &mut Vec<String>) -> Result<String, PlaceholderError> {
        let prefix = self.syntax.prefix.as_str();
        let suffix = self.syntax.suffix.as_str();

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(prefix) {
            out.push_str(&rest[..start]);
            let after = &rest[start + prefix.len()..];
            let end = find_closing(after, prefix, suffix).ok_or_else(|| PlaceholderError::Malformed {
                text: text.to_string(),
            })?;
            out.push_str(&self.resolve_expression(&after[..end], text, visiting)?);
            rest = &after[end + suffix.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn resolve_expression(
        &self,
        expression: &str,
        text: &str,
        visiting: &mut Vec<String>,
    ) -> Result<String, PlaceholderError> {
        let (key, fallback) = match expression.find(self.syntax.default_separator.as_str()) {
            Some(at) => (
                &expression[..at],
                Some(&expression[at + self.syntax.default_separator.len()..]),
            ),
            None => (expression, None),
        };
        let key = key.trim();

        if visiting.iter().any(|k| k == key) {
            return Err(PlaceholderError::Circular {
                key: key.to_string(),
            });
        }

        if let Some(value) = self.properties.get(key) {
            visiting.push(key.to_string());
            let resolved = self.resolve_text(value, visiting);
            visiting.pop();
            return resolved;
        }

        match fallback {
            Some(fallback) => self.resolve_text(fallback, visiting),
            None => Err(PlaceholderError::Unresolved {
                placeholder: key.to_string(),
                text: text.to_string(),
            }),
        }
    }
}

/// Offset of the suffix closing the placeholder that `s` starts inside of
fn find_closing(s: &str, prefix: &str, suffix: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if rest.starts_with(prefix) {
            depth += 1;
            i += prefix.len();
        } else if rest.starts_with(suffix) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
            i += suffix.len();
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

impl PlaceholderResolver for PropertyPlaceholderResolver {
    fn has_placeholder(&self, text: &str) -> bool {
        text.contains(self.syntax.prefix.as_str())
    }

    fn resolve_required(&self, text: &str) -> Result<String, PlaceholderError> {
        self.resolve_text(text, &mut Vec::new())
    }
}
