// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
use self::TypeValue::*;
use super::Expr;
use crate::InternedString;
use num_traits::Signed;
use std::convert::TryInto;
use std::fmt::Debug;
use std::rc::Rc;

///////////////////////////////////////////////////////////////////////////////////////////////
/// Datatypes
///////////////////////////////////////////////////////////////////////////////////////////////

/// The type of an expression in the program under analysis.
///
/// `Type` is a cheap handle: the node behind it is immutable and reference counted, so
/// the many expressions that mention one type all share a single node, and cloning an
/// expression tree never copies (or dangles) its types. Structural substitution builds a
/// fresh node; there is no way to mutate a type in place once constructed.
#[derive(Debug, Clone)]
pub struct Type {
    value: Rc<TypeValue>,
}

/// The different kinds of types.
/// In the examples below, `x` is used as a placeholder showing how a variable of that
/// type would be declared in C.
#[derive(PartialEq, Eq, Debug)]
pub enum TypeValue {
    /// `typ x[size]`. The size is an expression so that variable-length bounds can
    /// mention symbols; renaming rewrites them like any other expression.
    Array { typ: Type, size: Expr },
    /// A single bit boolean. The result type of every relational and logical operator.
    Bool,
    /// `void`
    Empty,
    /// `typ*`
    Pointer { typ: Type },
    /// `int<width>_t`. e.g. `int32_t`
    Signedbv { width: u64 },
    /// `struct tag {component1.typ component1.name; component2.typ component2.name ... }`
    Struct { tag: InternedString, components: Vec<DatatypeComponent> },
    /// `union tag {component1.typ component1.name; component2.typ component2.name ... }`
    Union { tag: InternedString, components: Vec<DatatypeComponent> },
    /// `uint<width>_t`. e.g. `uint32_t`
    Unsignedbv { width: u64 },
}

/// A field of a struct or union.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DatatypeComponent {
    name: InternedString,
    typ: Type,
}

///////////////////////////////////////////////////////////////////////////////////////////////
/// Implementations
///////////////////////////////////////////////////////////////////////////////////////////////

/// Two types are equal when they are structurally equal; sharing one node is the
/// (common) fast path.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value) || self.value == other.value
    }
}

impl Eq for Type {}

/// Getters
impl DatatypeComponent {
    pub fn name(&self) -> InternedString {
        self.name
    }

    pub fn typ(&self) -> &Type {
        &self.typ
    }
}

/// Getters
impl Type {
    pub fn value(&self) -> &TypeValue {
        &self.value
    }

    /// The size expression of an array type.
    pub fn array_size(&self) -> Option<&Expr> {
        match self.value() {
            Array { size, .. } => Some(size),
            _ => None,
        }
    }

    /// The base type of this type, if one exists.
    /// `typ*` | `typ x[size]` -> `typ`
    pub fn base_type(&self) -> Option<&Type> {
        match self.value() {
            Array { typ, .. } | Pointer { typ } => Some(typ),
            _ => None,
        }
    }

    pub fn components(&self) -> Option<&Vec<DatatypeComponent>> {
        match self.value() {
            Struct { components, .. } | Union { components, .. } => Some(components),
            _ => None,
        }
    }

    /// The type of the named field, if this is a struct or union that has it.
    pub fn lookup_field_type<T: Into<InternedString>>(&self, field: T) -> Option<Type> {
        let field = field.into();
        self.components()
            .and_then(|fields| fields.iter().find(|x| x.name() == field).map(|x| x.typ().clone()))
    }

    /// Get the tag of a struct or union.
    pub fn tag(&self) -> Option<InternedString> {
        match self.value() {
            Struct { tag, .. } | Union { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    /// The width of an integer type.
    pub fn width(&self) -> Option<u64> {
        match self.value() {
            Signedbv { width } | Unsignedbv { width } => Some(*width),
            _ => None,
        }
    }
}

/// Predicates
impl Type {
    pub fn is_array(&self) -> bool {
        match self.value() {
            Array { .. } => true,
            _ => false,
        }
    }

    pub fn is_bool(&self) -> bool {
        match self.value() {
            Bool => true,
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.value() {
            Empty => true,
            _ => false,
        }
    }

    /// Whether the current type is an integer with finite width
    pub fn is_integer(&self) -> bool {
        match self.value() {
            Signedbv { .. } | Unsignedbv { .. } => true,
            _ => false,
        }
    }

    pub fn is_pointer(&self) -> bool {
        match self.value() {
            Pointer { .. } => true,
            _ => false,
        }
    }

    /// Is this a signed integer
    pub fn is_signed(&self) -> bool {
        match self.value() {
            Signedbv { .. } => true,
            _ => false,
        }
    }

    pub fn is_struct(&self) -> bool {
        match self.value() {
            Struct { .. } => true,
            _ => false,
        }
    }

    pub fn is_union(&self) -> bool {
        match self.value() {
            Union { .. } => true,
            _ => false,
        }
    }

    /// Is this an unsigned integer
    pub fn is_unsigned(&self) -> bool {
        match self.value() {
            Unsignedbv { .. } => true,
            _ => false,
        }
    }
}

/// Constructors
impl Type {
    fn new(value: TypeValue) -> Self {
        Type { value: Rc::new(value) }
    }

    /// elem_t[size], with a possibly symbolic size expression.
    pub fn array_of(self, size: Expr) -> Self {
        assert!(
            size.typ().is_integer(),
            "Array size must have integer type: {size:?}"
        );
        if let Some(i) = size.int_constant_value() {
            assert!(!i.is_negative(), "Array size must be non-negative: {size:?}");
        }
        Type::new(Array { typ: self, size })
    }

    /// elem_t[size] for a statically known size.
    pub fn array_of_size<T>(self, size: T) -> Self
    where
        T: TryInto<u64>,
        T::Error: Debug,
    {
        let size: u64 = size.try_into().unwrap();
        let size = Expr::int_constant(size, Type::unsigned_int(64));
        self.array_of(size)
    }

    pub fn bool() -> Self {
        Type::new(Bool)
    }

    /// A field of a struct or union.
    pub fn datatype_component<T: Into<InternedString>>(name: T, typ: Type) -> DatatypeComponent {
        let name = name.into();
        DatatypeComponent { name, typ }
    }

    /// The void type
    pub fn empty() -> Self {
        Type::new(Empty)
    }

    pub fn signed_int<T>(w: T) -> Self
    where
        T: TryInto<u64>,
        T::Error: Debug,
    {
        let width: u64 = w.try_into().unwrap();
        assert!(width > 0);
        Type::new(Signedbv { width })
    }

    pub fn components_are_unique(components: &[DatatypeComponent]) -> bool {
        let mut names: Vec<_> = components.iter().map(|x| x.name()).collect();
        names.sort();
        names.dedup();
        names.len() == components.len()
    }

    /// struct tag {
    ///     f1.typ f1.data; ...
    /// }
    pub fn struct_type<T: Into<InternedString>>(
        tag: T,
        components: Vec<DatatypeComponent>,
    ) -> Self {
        assert!(
            Type::components_are_unique(&components),
            "Components contain duplicates: {components:?}"
        );
        let tag = tag.into();
        Type::new(Struct { tag, components })
    }

    /// self *
    pub fn to_pointer(self) -> Self {
        Type::new(Pointer { typ: self })
    }

    /// union tag {
    ///     f1.typ f1.data; ...
    /// }
    pub fn union_type<T: Into<InternedString>>(tag: T, components: Vec<DatatypeComponent>) -> Self {
        assert!(
            Type::components_are_unique(&components),
            "Components contain duplicates: {components:?}"
        );
        let tag = tag.into();
        Type::new(Union { tag, components })
    }

    pub fn unsigned_int<T>(w: T) -> Self
    where
        T: TryInto<u64>,
        T::Error: Debug,
    {
        let width: u64 = w.try_into().unwrap();
        assert!(width > 0);
        Type::new(Unsignedbv { width })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_nodes_compare_equal() {
        let t = Type::signed_int(32).to_pointer();
        let shared = t.clone();
        let rebuilt = Type::signed_int(32).to_pointer();
        assert_eq!(t, shared);
        assert_eq!(t, rebuilt);
        assert_ne!(t, Type::unsigned_int(32).to_pointer());
    }

    #[test]
    fn field_lookup() {
        let pair = Type::struct_type(
            "pair",
            vec![
                Type::datatype_component("fst", Type::signed_int(32)),
                Type::datatype_component("snd", Type::bool()),
            ],
        );
        assert_eq!(pair.lookup_field_type("snd"), Some(Type::bool()));
        assert_eq!(pair.lookup_field_type("nope"), None);
    }

    #[test]
    #[should_panic(expected = "duplicates")]
    fn duplicate_fields_rejected() {
        Type::struct_type(
            "p",
            vec![
                Type::datatype_component("f", Type::bool()),
                Type::datatype_component("f", Type::bool()),
            ],
        );
    }

    #[test]
    fn symbolic_array_bound() {
        let n = Expr::symbol_expression("n", Type::unsigned_int(64));
        let vla = Type::signed_int(8).array_of(n);
        assert!(vla.is_array());
        assert!(vla.array_size().unwrap().is_symbol());
    }
}
