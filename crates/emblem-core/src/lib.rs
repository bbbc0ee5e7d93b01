//! Emblem Core
//!
//! Shared vocabulary for the emblem crates:
//! - **Names**: `TypeName` tokens and the built-in type universe (`names`)
//! - **Types**: nominal `TypeDescriptor`s and the concurrent `TypeRegistry`
//!   that resolves type hierarchies
//! - **Values**: the dynamic `Value` model, nested `AnnotationValue`s and
//!   typed extraction through `FromValue`
//! - **Arguments**: conversion targets with type parameters

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod annotation;
pub mod argument;
pub mod from_value;
pub mod name;
pub mod registry;
pub mod ty;
pub mod value;

pub use annotation::{AnnotationValue, AttributeValues, VALUE_MEMBER};
pub use argument::Argument;
pub use from_value::FromValue;
pub use name::{names, TypeName};
pub use registry::{create_standard_registry, TypeRegistry};
pub use ty::{TypeDescriptor, TypeKind};
pub use value::{ArrayValue, EnumConstant, ObjectValue, Value};
