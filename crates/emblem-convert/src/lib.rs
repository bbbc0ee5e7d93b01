//! Emblem Convert
//!
//! The type conversion engine:
//! - **Registry**: converters keyed by (source, target, optional format
//!   qualifier) in a `ConversionService`
//! - **Dispatch**: nested source x target hierarchy walk, qualified keys
//!   ahead of unqualified ones
//! - **Cache**: bounded memo of resolution outcomes, including misses
//! - **Built-ins**: text, numeric, temporal, container and primitive-array
//!   converters
//!
//! # Example
//!
//! ```ignore
//! let service = ConversionService::new(Arc::new(create_standard_registry()));
//! let port: Option<i32> = service.convert_to(&Value::string("8080"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod context;
pub mod converter;
pub mod defaults;
pub mod error;
pub mod pair;
pub mod service;

pub use cache::{CacheStats, CachedConverter, ConverterCache};
pub use config::{ConfigError, ConversionConfig};
pub use context::{ConversionContext, FormatQualifier};
pub use converter::TypeConverter;
pub use defaults::{FORMAT, READABLE_BYTES};
pub use error::{ConversionError, ConversionErrorKind};
pub use pair::ConvertiblePair;
pub use service::ConversionService;
