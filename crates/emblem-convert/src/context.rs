//! Per-call conversion context
//!
//! A `ConversionContext` carries the target argument, locale, charset and an
//! optional format qualifier into every converter, and collects the errors
//! converters report. Element-wise converters derive a child context per
//! element and fold its errors back in on failure.

use emblem_core::{Argument, TypeName};

use crate::error::ConversionError;

/// Default locale tag
pub const DEFAULT_LOCALE: &str = "en";

/// Default charset
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// A format qualifier: the formatting annotation and its pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatQualifier {
    /// Annotation naming the format (the converter qualifier)
    pub annotation: TypeName,
    /// Format pattern, if the annotation carries one
    pub pattern: Option<String>,
}

/// Target, environment and error sink for one conversion
#[derive(Debug, Clone)]
pub struct ConversionContext {
    argument: Argument,
    locale: String,
    charset: String,
    format: Option<FormatQualifier>,
    errors: Vec<ConversionError>,
}

impl ConversionContext {
    /// Context converting to `argument`
    pub fn new(argument: impl Into<Argument>) -> Self {
        Self {
            argument: argument.into(),
            locale: DEFAULT_LOCALE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            format: None,
            errors: Vec::new(),
        }
    }

    /// Set the locale tag
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set the charset
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Qualify the conversion with a formatting annotation
    pub fn with_format(mut self, annotation: impl Into<TypeName>, pattern: Option<String>) -> Self {
        self.format = Some(FormatQualifier {
            annotation: annotation.into(),
            pattern,
        });
        self
    }

    /// The target argument
    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    /// The target type
    pub fn target(&self) -> &TypeName {
        self.argument.type_name()
    }

    /// Element argument for container targets
    pub fn first_type_parameter(&self) -> Option<&Argument> {
        self.argument.first_type_parameter()
    }

    /// Locale tag
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Charset
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Format qualifier, if any
    pub fn format(&self) -> Option<&FormatQualifier> {
        self.format.as_ref()
    }

    /// Format pattern, if any
    pub fn pattern(&self) -> Option<&str> {
        self.format.as_ref()?.pattern.as_deref()
    }

    /// Converter qualifier, if any
    pub fn qualifier(&self) -> Option<&TypeName> {
        self.format.as_ref().map(|format| &format.annotation)
    }

    /// Same context without its format qualifier
    pub fn without_format(&self) -> Self {
        Self {
            format: None,
            errors: Vec::new(),
            ..self.clone()
        }
    }

    /// Child context for converting one element to `argument`
    ///
    /// Locale, charset and format carry over; errors start empty.
    pub fn for_element(&self, argument: Argument) -> Self {
        Self {
            argument,
            locale: self.locale.clone(),
            charset: self.charset.clone(),
            format: self.format.clone(),
            errors: Vec::new(),
        }
    }

    /// Record a rejected conversion
    pub fn reject(&mut self, error: ConversionError) {
        self.errors.push(error);
    }

    /// Fold the errors of a child context into this one
    pub fn absorb(&mut self, child: ConversionContext) {
        self.errors.extend(child.errors);
    }

    /// Recorded errors, oldest first
    pub fn errors(&self) -> &[ConversionError] {
        &self.errors
    }

    /// Most recent error
    pub fn last_error(&self) -> Option<&ConversionError> {
        self.errors.last()
    }

    /// Check if any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take all recorded errors
    pub fn take_errors(&mut self) -> Vec<ConversionError> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn retarget(&mut self, target: TypeName) {
        if *self.argument.type_name() != target {
            self.argument = self.argument.with_type(target);
        }
    }
}

impl From<Argument> for ConversionContext {
    fn from(argument: Argument) -> Self {
        Self::new(argument)
    }
}
