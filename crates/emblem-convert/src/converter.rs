//! Converter trait

use emblem_core::Value;

use crate::context::ConversionContext;
use crate::service::ConversionService;

/// Converts a value to the target named by the context
///
/// Returning `None` means "not convertible". A converter that rejects a
/// value for a concrete reason records it with [`ConversionContext::reject`]
/// first. The service is passed in so converters can delegate element
/// conversions back to it.
pub trait TypeConverter: Send + Sync {
    /// Convert `value` to `ctx.target()`
    fn convert(
        &self,
        value: &Value,
        ctx: &mut ConversionContext,
        service: &ConversionService,
    ) -> Option<Value>;
}

impl<F> TypeConverter for F
where
    F: Fn(&Value, &mut ConversionContext, &ConversionService) -> Option<Value> + Send + Sync,
{
    fn convert(
        &self,
        value: &Value,
        ctx: &mut ConversionContext,
        service: &ConversionService,
    ) -> Option<Value> {
        self(value, ctx, service)
    }
}
