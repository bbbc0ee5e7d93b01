//! Known-type registry and hierarchy resolution
//!
//! The registry is the process-wide table of known type names. It is safe for
//! concurrent insert-if-absent and is never pruned. Hierarchy walks are
//! memoized per type name; registering a new type invalidates the memo.
//!
//! ## Hierarchy order
//!
//! `hierarchy(T)` lists T first, then its interfaces depth-first in
//! declaration order, then each superclass in turn followed by its own
//! interfaces, and always ends with `Object`. Array types resolve to
//! `T[]`, `Object[]` (reference components only), `Array`, `Object`.
//! Primitive names are replaced by their boxed form before walking.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::name::{names, TypeName};
use crate::ty::{TypeDescriptor, TypeKind};

/// The built-in type universe
static BUILTIN_TYPES: Lazy<Vec<TypeDescriptor>> = Lazy::new(|| {
    let mut types = vec![
        TypeDescriptor::class(names::OBJECT),
        TypeDescriptor::interface(names::COMPARABLE),
        TypeDescriptor::interface(names::CHAR_SEQUENCE),
        TypeDescriptor::class(names::STRING)
            .implements(names::CHAR_SEQUENCE)
            .implements(names::COMPARABLE),
        TypeDescriptor::class(names::NUMBER),
        TypeDescriptor::class(names::BOOLEAN).implements(names::COMPARABLE),
        TypeDescriptor::class(names::CHARACTER).implements(names::COMPARABLE),
        TypeDescriptor::class(names::ENUM).implements(names::COMPARABLE),
        TypeDescriptor::class(names::CLASS),
        TypeDescriptor::interface(names::ANNOTATION),
        TypeDescriptor::interface(names::ITERABLE),
        TypeDescriptor::interface(names::COLLECTION).implements(names::ITERABLE),
        TypeDescriptor::interface(names::LIST).implements(names::COLLECTION),
        TypeDescriptor::interface(names::MAP),
        TypeDescriptor::class(names::ARRAY),
        TypeDescriptor::interface(names::TEMPORAL),
        TypeDescriptor::class(names::LOCAL_DATE)
            .implements(names::TEMPORAL)
            .implements(names::COMPARABLE),
        TypeDescriptor::class(names::LOCAL_DATE_TIME)
            .implements(names::TEMPORAL)
            .implements(names::COMPARABLE),
        TypeDescriptor::class(names::DURATION).implements(names::COMPARABLE),
    ];

    for boxed in [
        names::BYTE,
        names::SHORT,
        names::INTEGER,
        names::LONG,
        names::FLOAT,
        names::DOUBLE,
    ] {
        types.push(
            TypeDescriptor::class(boxed)
                .extends(names::NUMBER)
                .implements(names::COMPARABLE),
        );
    }

    for (primitive, _) in names::PRIMITIVES {
        types.push(TypeDescriptor::primitive(primitive));
    }

    types
});

/// Create a registry pre-populated with the built-in type universe
pub fn create_standard_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    for desc in BUILTIN_TYPES.iter() {
        registry.register(desc.clone());
    }
    registry
}

/// Concurrent table of known types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Type name -> descriptor
    types: DashMap<TypeName, Arc<TypeDescriptor>>,
    /// Memoized hierarchy walks
    hierarchies: DashMap<TypeName, Arc<[TypeName]>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type if it is not known yet
    ///
    /// Returns false if a type with that name was already registered.
    pub fn register(&self, descriptor: TypeDescriptor) -> bool {
        let name = descriptor.name.clone();
        let inserted = match self.types.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(descriptor));
                true
            }
        };
        if inserted {
            self.hierarchies.clear();
        }
        inserted
    }

    /// Get a type descriptor
    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a type is known
    ///
    /// Array types are known when their component is.
    pub fn contains(&self, name: &str) -> bool {
        match name.strip_suffix("[]") {
            Some(component) => self.contains(component),
            None => self.types.contains_key(name),
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Map a primitive name to its boxed form; other names are returned as-is
    pub fn canonical(&self, name: &TypeName) -> TypeName {
        names::PRIMITIVES
            .iter()
            .find(|(primitive, _)| name == primitive)
            .map(|(_, boxed)| TypeName::new(boxed))
            .unwrap_or_else(|| name.clone())
    }

    /// Map a boxed name to its primitive form
    pub fn primitive_of(&self, name: &str) -> Option<TypeName> {
        names::PRIMITIVES
            .iter()
            .find(|(_, boxed)| *boxed == name)
            .map(|(primitive, _)| TypeName::new(primitive))
    }

    /// Check if a name is one of the primitive types
    pub fn is_primitive(&self, name: &str) -> bool {
        names::PRIMITIVES.iter().any(|(primitive, _)| *primitive == name)
    }

    /// Enum constants of an enum type
    pub fn enum_constants(&self, name: &str) -> Option<Vec<String>> {
        let desc = self.get(name)?;
        (desc.kind == TypeKind::Enum).then(|| desc.enum_constants.clone())
    }

    /// Check if a value of type `sub` can be used where `sup` is expected
    pub fn is_assignable(&self, sub: &TypeName, sup: &TypeName) -> bool {
        if sup == names::OBJECT {
            return true;
        }
        let sub = self.canonical(sub);
        let sup = self.canonical(sup);
        if sub == sup {
            return true;
        }
        self.hierarchy(&sub).iter().any(|t| *t == sup)
    }

    /// Resolve the hierarchy of a type, most specific first
    pub fn hierarchy(&self, name: &TypeName) -> Arc<[TypeName]> {
        let name = self.canonical(name);
        if let Some(cached) = self.hierarchies.get(&name) {
            return Arc::clone(cached.value());
        }
        let resolved: Arc<[TypeName]> = self.compute_hierarchy(&name).into();
        self.hierarchies.insert(name, Arc::clone(&resolved));
        resolved
    }

    fn compute_hierarchy(&self, name: &TypeName) -> Vec<TypeName> {
        let object = TypeName::new(names::OBJECT);

        if let Some(component) = name.component() {
            let mut hierarchy = vec![name.clone()];
            if !self.is_primitive(component.as_str()) && name != names::OBJECT_ARRAY {
                hierarchy.push(TypeName::new(names::OBJECT_ARRAY));
            }
            hierarchy.push(TypeName::new(names::ARRAY));
            hierarchy.push(object);
            return hierarchy;
        }

        if *name == object {
            return vec![object];
        }

        let mut hierarchy = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(name.clone());
        while let Some(ty) = current.take() {
            if ty == object || visited.contains(&ty) {
                break;
            }
            self.populate_interfaces(&ty, &mut hierarchy, &mut visited);
            current = self.get(ty.as_str()).and_then(|desc| desc.superclass.clone());
        }
        hierarchy.push(object);
        hierarchy
    }

    fn populate_interfaces(
        &self,
        ty: &TypeName,
        hierarchy: &mut Vec<TypeName>,
        visited: &mut FxHashSet<TypeName>,
    ) {
        if visited.insert(ty.clone()) {
            hierarchy.push(ty.clone());
        }
        let Some(desc) = self.get(ty.as_str()) else {
            return;
        };
        for interface in &desc.interfaces {
            if visited.insert(interface.clone()) {
                hierarchy.push(interface.clone());
                self.populate_interfaces(interface, hierarchy, visited);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(h: &[TypeName]) -> Vec<&str> {
        h.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn test_boxed_hierarchy() {
        let registry = create_standard_registry();
        let h = registry.hierarchy(&TypeName::new("Integer"));
        assert_eq!(names_of(&h), vec!["Integer", "Comparable", "Number", "Object"]);
    }

    #[test]
    fn test_primitive_is_canonicalized() {
        let registry = create_standard_registry();
        let h = registry.hierarchy(&TypeName::new("int"));
        assert_eq!(h[0].as_str(), "Integer");
        assert_eq!(registry.primitive_of("Long"), Some(TypeName::new("long")));
    }

    #[test]
    fn test_interface_hierarchy() {
        let registry = create_standard_registry();
        let h = registry.hierarchy(&TypeName::new("List"));
        assert_eq!(names_of(&h), vec!["List", "Collection", "Iterable", "Object"]);
    }

    #[test]
    fn test_array_hierarchy() {
        let registry = create_standard_registry();
        let h = registry.hierarchy(&TypeName::new("String[]"));
        assert_eq!(names_of(&h), vec!["String[]", "Object[]", "Array", "Object"]);

        let h = registry.hierarchy(&TypeName::new("int[]"));
        assert_eq!(names_of(&h), vec!["int[]", "Array", "Object"]);
    }

    #[test]
    fn test_unknown_type_hierarchy() {
        let registry = TypeRegistry::new();
        let h = registry.hierarchy(&TypeName::new("Mystery"));
        assert_eq!(names_of(&h), vec!["Mystery", "Object"]);
    }

    #[test]
    fn test_register_invalidates_memo() {
        let registry = create_standard_registry();
        let name = TypeName::new("app.Money");
        assert_eq!(registry.hierarchy(&name).len(), 2);

        assert!(registry.register(TypeDescriptor::class("app.Money").extends("Number")));
        assert_eq!(
            names_of(&registry.hierarchy(&name)),
            vec!["app.Money", "Number", "Object"]
        );
        assert!(!registry.register(TypeDescriptor::class("app.Money")));
    }

    #[test]
    fn test_cyclic_interfaces_terminate() {
        let registry = TypeRegistry::new();
        registry.register(TypeDescriptor::interface("A").implements("B"));
        registry.register(TypeDescriptor::interface("B").implements("A"));
        let h = registry.hierarchy(&TypeName::new("A"));
        assert_eq!(names_of(&h), vec!["A", "B", "Object"]);
    }

    #[test]
    fn test_assignability() {
        let registry = create_standard_registry();
        let integer = TypeName::new("Integer");
        assert!(registry.is_assignable(&integer, &TypeName::new("Number")));
        assert!(registry.is_assignable(&TypeName::new("int"), &integer));
        assert!(!registry.is_assignable(&TypeName::new("Number"), &integer));
        assert!(registry.is_assignable(&TypeName::new("Mystery"), &TypeName::new("Object")));
    }

    #[test]
    fn test_enum_constants() {
        let registry = create_standard_registry();
        registry.register(TypeDescriptor::enumeration("Color", ["RED", "BLUE"]));
        assert_eq!(
            registry.enum_constants("Color"),
            Some(vec!["RED".to_string(), "BLUE".to_string()])
        );
        assert_eq!(registry.enum_constants("String"), None);
    }
}
