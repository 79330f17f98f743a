//! Schema registry: named element and complexType definitions.
//!
//! The registry is populated once during service definition and treated as
//! read-only afterwards; concurrent readers need no locking. Type names
//! live in one flat namespace shared with the primitive type names.
//!
//! A field must not reference its own enclosing type, directly or
//! transitively, unless the reference is list-typed; the marshalling engine
//! performs no cycle detection and would recurse forever on such a schema.

use crate::error::SchemaError;
use crate::primitives::{PrimitiveType, StringFacets};
use indexmap::IndexMap;

/// Upper occurrence bound of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Bounded(u32),
    Unbounded,
}

impl Occurs {
    /// Wire rendering for schema documents: a number or `unbounded`.
    pub fn to_wire(self) -> String {
        match self {
            Occurs::Bounded(n) => n.to_string(),
            Occurs::Unbounded => "unbounded".to_string(),
        }
    }
}

/// One entry of a type's sequence. The field name is the key of the owning
/// [`TypeDef::sequence`] map.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Referenced type name, primitive or user-declared. Resolved lazily.
    pub type_name: String,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
    /// Length facets, honored by the `string` primitive only.
    pub facets: StringFacets,
}

impl FieldDef {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            min_occurs: 0,
            max_occurs: Occurs::Bounded(1),
            facets: StringFacets::default(),
        }
    }

    /// Shorthand for `minOccurs=1, maxOccurs=1`; not retained as a separate
    /// flag after this normalization.
    pub fn required(mut self) -> Self {
        self.min_occurs = 1;
        self.max_occurs = Occurs::Bounded(1);
        self
    }

    pub fn occurs(mut self, min: u32, max: Occurs) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    pub fn length(mut self, n: usize) -> Self {
        self.facets.length = Some(n);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.facets.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.facets.max_length = Some(n);
        self
    }

    /// List-typed iff the upper bound is unbounded or greater than one.
    pub fn is_list(&self) -> bool {
        match self.max_occurs {
            Occurs::Unbounded => true,
            Occurs::Bounded(n) => n > 1,
        }
    }

    pub fn is_required(&self) -> bool {
        self.min_occurs >= 1
    }
}

/// A named type: an ordered sequence of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    /// Fields in declaration order. Order matters for document generation.
    pub sequence: IndexMap<String, FieldDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: IndexMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.sequence.insert(name.into(), def);
        self
    }
}

/// Holds every declared type. Elements may serve as decode/encode roots;
/// complexTypes only appear nested inside other types.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    elements: IndexMap<String, TypeDef>,
    complex_types: IndexMap<String, TypeDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a type usable only as a nested field type.
    ///
    /// Registration under a taken name is rejected with `DuplicateName`;
    /// the flat namespace spans elements, complexTypes and primitives.
    pub fn register_complex_type(&mut self, def: TypeDef) -> Result<(), SchemaError> {
        self.check_name(&def)?;
        self.complex_types.insert(def.name.clone(), def);
        Ok(())
    }

    /// Store a type additionally eligible as a decode/encode entry point.
    pub fn register_element(&mut self, def: TypeDef) -> Result<(), SchemaError> {
        self.check_name(&def)?;
        self.elements.insert(def.name.clone(), def);
        Ok(())
    }

    fn check_name(&self, def: &TypeDef) -> Result<(), SchemaError> {
        if self.elements.contains_key(&def.name)
            || self.complex_types.contains_key(&def.name)
            || PrimitiveType::from_name(&def.name).is_some()
        {
            return Err(SchemaError::DuplicateName(def.name.clone()));
        }
        for (field_name, field) in &def.sequence {
            if let Occurs::Bounded(max) = field.max_occurs {
                if field.min_occurs > max {
                    return Err(SchemaError::ConstraintViolation {
                        field: field_name.clone(),
                        detail: format!(
                            "minOccurs {} exceeds maxOccurs {}",
                            field.min_occurs, max
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve a type name, elements first.
    pub fn resolve(&self, name: &str) -> Result<&TypeDef, SchemaError> {
        self.elements
            .get(name)
            .or_else(|| self.complex_types.get(name))
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Resolve a type name that must be a registered element.
    pub fn resolve_element(&self, name: &str) -> Result<&TypeDef, SchemaError> {
        self.elements
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn is_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Membership test against the fixed primitive set.
    pub fn is_primitive(&self, name: &str) -> bool {
        PrimitiveType::from_name(name).is_some()
    }

    /// Registered elements in declaration order.
    pub fn elements(&self) -> impl Iterator<Item = &TypeDef> {
        self.elements.values()
    }

    /// Registered complexTypes in declaration order.
    pub fn complex_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.complex_types.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> TypeDef {
        TypeDef::new("Point")
            .field("x", FieldDef::new("integer").required())
            .field("y", FieldDef::new("integer"))
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = SchemaRegistry::new();
        registry.register_element(point()).unwrap();
        let def = registry.resolve("Point").unwrap();
        assert_eq!(def.sequence.len(), 2);
        assert!(registry.resolve_element("Point").is_ok());
        assert_eq!(
            registry.resolve("Line").unwrap_err(),
            SchemaError::UnknownType("Line".to_string())
        );
    }

    #[test]
    fn test_complex_type_is_not_an_element_root() {
        let mut registry = SchemaRegistry::new();
        registry.register_complex_type(point()).unwrap();
        assert!(registry.resolve("Point").is_ok());
        assert!(registry.resolve_element("Point").is_err());
    }

    #[test]
    fn test_duplicate_name_rejected_across_kinds() {
        let mut registry = SchemaRegistry::new();
        registry.register_element(point()).unwrap();
        assert_eq!(
            registry.register_complex_type(point()).unwrap_err(),
            SchemaError::DuplicateName("Point".to_string())
        );
        assert_eq!(
            registry.register_element(TypeDef::new("string")).unwrap_err(),
            SchemaError::DuplicateName("string".to_string())
        );
    }

    #[test]
    fn test_required_normalization() {
        let field = FieldDef::new("string").required();
        assert_eq!(field.min_occurs, 1);
        assert_eq!(field.max_occurs, Occurs::Bounded(1));
        assert!(field.is_required());
        assert!(!field.is_list());
    }

    #[test]
    fn test_list_detection() {
        assert!(FieldDef::new("Item").occurs(0, Occurs::Unbounded).is_list());
        assert!(FieldDef::new("Item").occurs(0, Occurs::Bounded(5)).is_list());
        assert!(!FieldDef::new("Item").is_list());
    }

    #[test]
    fn test_min_over_max_rejected() {
        let bad = TypeDef::new("Bad").field("f", FieldDef::new("string").occurs(3, Occurs::Bounded(2)));
        let mut registry = SchemaRegistry::new();
        assert!(matches!(
            registry.register_element(bad),
            Err(SchemaError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let mut registry = SchemaRegistry::new();
        registry.register_element(TypeDef::new("B")).unwrap();
        registry.register_element(TypeDef::new("A")).unwrap();
        let names: Vec<_> = registry.elements().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn test_occurs_wire_rendering() {
        assert_eq!(Occurs::Bounded(3).to_wire(), "3");
        assert_eq!(Occurs::Unbounded.to_wire(), "unbounded");
    }
}
