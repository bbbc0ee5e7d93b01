//! Conversion service
//!
//! Owns the converter registry and the resolution cache.
//!
//! ## Dispatch
//!
//! 1. A target of `Object` returns the value unchanged.
//! 2. A non-container value already assignable to the target is returned
//!    unchanged. Lists and maps always convert so their elements reach the
//!    requested element type.
//! 3. Otherwise the converter for (source type, target type, qualifier) is
//!    resolved: every source supertype (most specific first) is tried against
//!    every target supertype (most specific first), with the qualified key
//!    ahead of the unqualified one. The first hit wins and is cached; a miss
//!    is cached as unconvertible.

use std::sync::Arc;

use dashmap::DashMap;
use emblem_core::{Argument, FromValue, TypeName, TypeRegistry, Value};

use crate::cache::{CacheStats, CachedConverter, ConverterCache};
use crate::config::ConversionConfig;
use crate::context::ConversionContext;
use crate::converter::TypeConverter;
use crate::defaults;
use crate::error::{ConversionError, ConversionErrorKind};
use crate::pair::ConvertiblePair;

/// Registry of converters keyed by (source, target, qualifier)
pub struct ConversionService {
    types: Arc<TypeRegistry>,
    converters: DashMap<ConvertiblePair, Arc<dyn TypeConverter>>,
    cache: ConverterCache,
}

impl ConversionService {
    /// Service with the built-in converters and default cache tuning
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self::with_config(types, &ConversionConfig::default())
    }

    /// Service with the built-in converters
    pub fn with_config(types: Arc<TypeRegistry>, config: &ConversionConfig) -> Self {
        let service = Self::empty_with_config(types, config);
        defaults::register_defaults(&service);
        tracing::debug!(
            converters = service.converters.len(),
            "registered built-in converters"
        );
        service
    }

    /// Service with no converters
    pub fn empty(types: Arc<TypeRegistry>) -> Self {
        Self::empty_with_config(types, &ConversionConfig::default())
    }

    /// Service with no converters and the given cache tuning
    pub fn empty_with_config(types: Arc<TypeRegistry>, config: &ConversionConfig) -> Self {
        Self {
            types,
            converters: DashMap::new(),
            cache: ConverterCache::new(config.cache_capacity, config.eviction_batch()),
        }
    }

    /// The type registry hierarchies are resolved against
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a converter from `source` to `target`
    ///
    /// Replaces any converter registered for the same pair and clears the
    /// resolution cache.
    pub fn add_converter<F>(&self, source: impl Into<TypeName>, target: impl Into<TypeName>, f: F)
    where
        F: Fn(&Value, &mut ConversionContext, &ConversionService) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        let pair = ConvertiblePair::new(source, target);
        self.add_type_converter(pair, Arc::new(f));
    }

    /// Register a converter used only under the `qualifier` format
    pub fn add_qualified_converter<F>(
        &self,
        source: impl Into<TypeName>,
        target: impl Into<TypeName>,
        qualifier: impl Into<TypeName>,
        f: F,
    ) where
        F: Fn(&Value, &mut ConversionContext, &ConversionService) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        let pair = ConvertiblePair::qualified(source, target, qualifier);
        self.add_type_converter(pair, Arc::new(f));
    }

    /// Register a converter object for a pair
    pub fn add_type_converter(&self, pair: ConvertiblePair, converter: Arc<dyn TypeConverter>) {
        let pair = ConvertiblePair {
            source: self.types.canonical(&pair.source),
            target: self.types.canonical(&pair.target),
            qualifier: pair.qualifier,
        };
        tracing::trace!(%pair, "registering converter");
        self.converters.insert(pair, converter);
        self.cache.clear();
    }

    /// Number of registered converters
    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Convert `value` to the target of `ctx`
    ///
    /// `None` means not convertible; errors recorded by converters are left
    /// in `ctx`.
    pub fn convert(&self, value: &Value, ctx: &mut ConversionContext) -> Option<Value> {
        let target = self.types.canonical(ctx.target());
        if target == emblem_core::names::OBJECT {
            return Some(value.clone());
        }
        ctx.retarget(target.clone());

        let source = value.type_name();
        if !value.is_container() && self.types.is_assignable(&source, &target) {
            return Some(value.clone());
        }

        let pair = ConvertiblePair {
            source,
            target,
            qualifier: ctx.qualifier().cloned(),
        };
        match self.find_converter(&pair) {
            CachedConverter::Found(converter) => converter.convert(value, ctx, self),
            CachedConverter::Unconvertible => {
                tracing::trace!(%pair, "no converter");
                None
            }
        }
    }

    /// Convert `value` to `argument` with a fresh context
    pub fn convert_value(&self, value: &Value, argument: impl Into<Argument>) -> Option<Value> {
        let mut ctx = ConversionContext::new(argument);
        self.convert(value, &mut ctx)
    }

    /// Convert `value` and extract it as a Rust type
    pub fn convert_to<T: FromValue>(&self, value: &Value) -> Option<T> {
        self.convert_value(value, T::argument())
            .and_then(T::from_value)
    }

    /// Convert `value` to `argument`, turning "not convertible" into an error
    pub fn convert_required(
        &self,
        value: &Value,
        argument: impl Into<Argument>,
    ) -> Result<Value, ConversionError> {
        let mut ctx = ConversionContext::new(argument);
        match self.convert(value, &mut ctx) {
            Some(converted) => Ok(converted),
            None => Err(ctx.take_errors().pop().unwrap_or_else(|| {
                ConversionError::new(
                    value.clone(),
                    ctx.target().clone(),
                    ConversionErrorKind::NoConverter,
                )
            })),
        }
    }

    /// Check if some converter applies from `source` to `target`
    pub fn can_convert(&self, source: &TypeName, target: &TypeName) -> bool {
        self.can_convert_qualified(source, target, None)
    }

    /// Check if some converter applies under an optional qualifier
    pub fn can_convert_qualified(
        &self,
        source: &TypeName,
        target: &TypeName,
        qualifier: Option<&TypeName>,
    ) -> bool {
        let source = self.types.canonical(source);
        let target = self.types.canonical(target);
        if target == emblem_core::names::OBJECT || self.types.is_assignable(&source, &target) {
            return true;
        }
        let pair = ConvertiblePair {
            source,
            target,
            qualifier: qualifier.cloned(),
        };
        matches!(self.find_converter(&pair), CachedConverter::Found(_))
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn find_converter(&self, pair: &ConvertiblePair) -> CachedConverter {
        if let Some(cached) = self.cache.get(pair) {
            return cached;
        }
        // Read before the walk so a registration during it discards the outcome
        let generation = self.cache.generation();
        let outcome = match self.resolve(pair) {
            Some(converter) => CachedConverter::Found(converter),
            None => CachedConverter::Unconvertible,
        };
        self.cache.insert_at(pair.clone(), outcome.clone(), generation);
        outcome
    }

    /// Walk the source and target hierarchies for a converter, bypassing the
    /// cache
    pub fn resolve(&self, pair: &ConvertiblePair) -> Option<Arc<dyn TypeConverter>> {
        let sources = self.types.hierarchy(&pair.source);
        let targets = self.types.hierarchy(&pair.target);

        if let Some(qualifier) = &pair.qualifier {
            if let Some(found) = self.walk(&sources, &targets, Some(qualifier)) {
                return Some(found);
            }
        }
        self.walk(&sources, &targets, None)
    }

    fn walk(
        &self,
        sources: &[TypeName],
        targets: &[TypeName],
        qualifier: Option<&TypeName>,
    ) -> Option<Arc<dyn TypeConverter>> {
        for source in sources {
            for target in targets {
                let key = ConvertiblePair {
                    source: source.clone(),
                    target: target.clone(),
                    qualifier: qualifier.cloned(),
                };
                if let Some(found) = self.converters.get(&key) {
                    return Some(Arc::clone(found.value()));
                }
            }
        }
        None
    }

    /// Resolution cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionService")
            .field("converters", &self.converters.len())
            .field("cache", &self.cache.stats())
            .finish()
    }
}
