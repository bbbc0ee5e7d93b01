//! Emblem Metadata
//!
//! Annotation metadata of program elements:
//! - **Stores**: immutable per-element value maps with stereotype tracking
//!   and copy-and-mutate updates
//! - **Builder**: turns raw annotated elements into stores, resolving
//!   aliases, repeatable containers and meta-annotations
//! - **Hierarchies**: several stores queried as one, most specific first
//! - **Environment**: placeholder resolution in string members
//! - **Snapshots**: JSON persistence and lazy restoration
//!
//! Every source implements `AnnotationMetadata`, whose typed getters convert
//! member values through an `emblem_convert::ConversionService`.
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(MetadataRegistry::standard());
//! let types = AnnotationTypes::new()
//!     .define(AnnotationType::new("app.Cache").default_value("size", 10));
//! let mut builder = MetadataBuilder::new(registry, Arc::new(types));
//!
//! let element = RawElement::type_element("app.Users")
//!     .annotate(AnnotationValue::new("app.Cache").member("name", "users"));
//! let metadata = builder.build(&element);
//! assert_eq!(metadata.int_value("app.Cache", "size"), Some(10));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod builder;
pub mod config;
pub mod environment;
pub mod error;
pub mod hierarchy;
pub mod merge;
pub mod metadata;
pub mod placeholder;
pub mod registry;
pub mod repository;
pub mod snapshot;
pub mod store;
pub mod values;

pub use builder::{
    AliasFor, AnnotationMapper, AnnotationType, AnnotationTypes, ElementKind, MetadataBuilder,
    MetadataValidator, RawAnnotation, RawElement,
};
pub use config::{BuilderConfig, ConfigError, MetadataConfig, PlaceholderConfig};
pub use environment::{EnvironmentMetadata, PlaceholderMapper};
pub use error::{BuildError, MetadataError, PlaceholderError};
pub use hierarchy::MetadataHierarchy;
pub use merge::merge_annotation_values;
pub use metadata::{AnnotationMetadata, Scope, ValueMapper};
pub use placeholder::{PlaceholderResolver, PropertyPlaceholderResolver};
pub use registry::MetadataRegistry;
pub use repository::MetadataRepository;
pub use snapshot::{MetadataSnapshot, SnapshotBundle};
pub use store::{MetadataStore, MetadataStoreMut};
pub use values::{AnnotationValues, StereotypeIndex};
