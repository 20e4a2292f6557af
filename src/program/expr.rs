// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// This file has a lot of functions with names like "div"
#![allow(clippy::should_implement_trait)]

use self::BinaryOperator::*;
use self::ExprValue::*;
use self::UnaryOperator::*;
use super::Type;
use crate::InternedString;
use num::bigint::BigInt;

///////////////////////////////////////////////////////////////////////////////////////////////
/// Datatypes
///////////////////////////////////////////////////////////////////////////////////////////////

/// An `Expr` represents an expression: a computation that returns a value.
/// Every expression has a type and a value.
///
/// The fields of `Expr` are kept private, and there are no getters that return mutable
/// references. This means that the only way to create `Expr`s is using the constructors,
/// which ensure that every expression is well-formed (e.g. that both operands of a
/// relational operator have the same type). Substituting part of a tree means building a
/// replacement node, never rewriting an existing one in place, so observers holding
/// earlier clones are unaffected.
///
/// `clone` produces an independently owned deep copy of the subtree: exploring two
/// divergent execution paths requires independently mutable copies of the same state.
/// (Type nodes are immutable and shared by reference count; see [Type].)
///
/// In general, expressions are constructed in a "chained" style:
///     `x == y + 1` would translate to `x.eq(y.plus(one))`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    value: Box<ExprValue>,
    typ: Type,
}

/// The different kinds of values an expression can have.
/// Each expression is described by reference to the corresponding C code that would
/// generate it. When an expression makes most sense in a broader statement context,
/// the characters >>> e <<< are used to mark the part described by the enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprValue {
    /// `&self`
    AddressOf(Expr),
    /// `typ x[] = >>> {elems0, elems1 ...} <<<`
    Array {
        elems: Vec<Expr>,
    },
    /// `typ x[width] = >>> {elem} <<<`. An array holding `elem` at every index.
    ArrayOf {
        elem: Expr,
    },
    /// `lhs op rhs`.  E.g. `lhs + rhs` if `op == BinaryOperator::Plus`
    BinOp {
        op: BinaryOperator,
        lhs: Expr,
        rhs: Expr,
    },
    /// `true/false`. A single bit boolean.
    BoolConstant(bool),
    /// `*self`
    Dereference(Expr),
    /// `c ? t : e`
    If {
        c: Expr,
        t: Expr,
        e: Expr,
    },
    /// `array[index]`
    Index {
        array: Expr,
        index: Expr,
    },
    /// `123`
    IntConstant(BigInt),
    /// `lhs.field`
    Member {
        lhs: Expr,
        field: InternedString,
    },
    /// A raw string constant.
    /// `"s"`
    StringConstant {
        s: InternedString,
    },
    /// Struct initializer
    /// `struct foo the_foo = >>> {field1, field2, ... } <<<`
    Struct {
        values: Vec<Expr>,
    },
    /// A reference to a variable; the part renaming rewrites.
    /// `self`
    Symbol {
        identifier: InternedString,
    },
    /// `(typ) self`. Target type is in the outer `Expr` struct.
    Typecast(Expr),
    /// Union initializer
    /// `union foo the_foo = >>> {.field = value } <<<`
    Union {
        value: Expr,
        field: InternedString,
    },
    /// `op self` e.g. `! self` if `op == UnaryOperator::Not`
    UnOp {
        op: UnaryOperator,
        e: Expr,
    },
}

/// Binary operators. Relational and logical operators always produce `Bool`; bitwise and
/// arithmetic operators produce the (identical) type of their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Bitand,
    Bitnand,
    Bitnor,
    Bitnxor,
    Bitor,
    Bitxor,
    Div,
    Equal,
    Ge,
    Gt,
    Implies,
    Le,
    Lshr,
    Lt,
    Minus,
    Mod,
    Mult,
    Notequal,
    Or,
    Plus,
    Shl,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `~self`
    Bitnot,
    /// `!self`
    Not,
    /// `-self`
    UnaryMinus,
}

///////////////////////////////////////////////////////////////////////////////////////////////
/// Implementations
///////////////////////////////////////////////////////////////////////////////////////////////

/// Getters
impl Expr {
    pub fn typ(&self) -> &Type {
        &self.typ
    }

    pub fn value(&self) -> &ExprValue {
        &self.value
    }

    /// If the expression is an Int constant type, return its value
    pub fn int_constant_value(&self) -> Option<BigInt> {
        match &*self.value {
            IntConstant(i) => Some(i.clone()),
            _ => None,
        }
    }

    /// If the expression is a symbol reference, return the identifier it refers to.
    pub fn symbol_identifier(&self) -> Option<InternedString> {
        match &*self.value {
            Symbol { identifier } => Some(*identifier),
            _ => None,
        }
    }
}

/// Predicates
impl Expr {
    /// Whether the expression is a literal value, built entirely out of constants.
    pub fn is_constant(&self) -> bool {
        match &*self.value {
            Array { elems } | Struct { values: elems } => elems.iter().all(|e| e.is_constant()),
            ArrayOf { elem } => elem.is_constant(),
            BoolConstant(_) | IntConstant(_) | StringConstant { .. } => true,
            Union { value, .. } => value.is_constant(),
            _ => false,
        }
    }

    pub fn is_int_constant(&self) -> bool {
        match *self.value {
            IntConstant(_) => true,
            _ => false,
        }
    }

    pub fn is_symbol(&self) -> bool {
        match *self.value {
            Symbol { .. } => true,
            _ => false,
        }
    }

    /// What typecasts are legal. Based off the C standard, restricted to the types this
    /// representation has.
    pub fn can_cast_from(source: &Type, target: &Type) -> bool {
        #[allow(clippy::needless_bool)]
        if source == target {
            true
        } else if target.is_bool() {
            source.is_integer()
        } else if target.is_integer() {
            source.is_bool() || source.is_integer() || source.is_pointer()
        } else if target.is_pointer() {
            source.is_integer() || source.is_pointer()
        } else {
            false
        }
    }

    pub fn can_cast_to(&self, target: &Type) -> bool {
        Expr::can_cast_from(&self.typ, target)
    }

    pub fn can_take_address_of(&self) -> bool {
        match *self.value {
            Dereference(_) | Index { .. } | Member { .. } | Symbol { .. } => true,
            _ => false,
        }
    }
}

/// Private constructor. Making this a macro allows multiple references to self in the same call.
macro_rules! expr {
    ( $value:expr,  $typ:expr) => {{
        let typ = $typ;
        let value = Box::new($value);
        Expr { value, typ }
    }};
}

/// Constructors for the main types
impl Expr {
    /// `&self`
    pub fn address_of(self) -> Self {
        assert!(self.can_take_address_of(), "Can't take address of {self:?}");
        expr!(AddressOf(self), self.typ.clone().to_pointer())
    }

    /// `typ x[width] = >>> {elem} <<<`. The "array of default" constant: `elem` at every
    /// index. The width may be a symbolic expression.
    pub fn array_constant(self, size: Expr) -> Self {
        expr!(ArrayOf { elem: self }, self.typ.clone().array_of(size))
    }

    /// `typ x[] = >>> {elems0, elems1 ...} <<<`
    pub fn array_expr(typ: Type, elems: Vec<Expr>) -> Self {
        match (typ.base_type(), typ.array_size()) {
            (Some(value_typ), Some(size)) => {
                if let Some(size) = size.int_constant_value() {
                    assert_eq!(
                        size,
                        BigInt::from(elems.len()),
                        "Array type and element count don't match: \n{typ:?}\n{elems:?}"
                    );
                }
                assert!(
                    elems.iter().all(|x| x.typ == *value_typ),
                    "Array type and value types don't match: \n{typ:?}\n{elems:?}"
                );
            }
            _ => unreachable!("Can't make an array_expr with non-array target type {:?}", typ),
        }
        expr!(Array { elems }, typ)
    }

    /// `true/false`. True/False as a single bit boolean.
    pub fn bool_constant(c: bool) -> Self {
        expr!(BoolConstant(c), Type::bool())
    }

    /// `false`. False as a single bit boolean.
    pub fn bool_false() -> Self {
        Expr::bool_constant(false)
    }

    /// `true`. True as a single bit boolean.
    pub fn bool_true() -> Self {
        Expr::bool_constant(true)
    }

    /// `(typ) self`.
    pub fn cast_to(self, typ: Type) -> Self {
        assert!(self.can_cast_to(&typ), "Can't cast\n\n{self:?} ({:?})\n\n{typ:?}", self.typ);
        if self.typ == typ {
            self
        } else {
            expr!(Typecast(self), typ)
        }
    }

    /// `*self`
    pub fn dereference(self) -> Self {
        assert!(self.typ.is_pointer(), "Can't dereference {self:?}");
        expr!(Dereference(self), self.typ.base_type().unwrap().clone())
    }

    /// `self[index]`
    pub fn index_array(self, index: Expr) -> Self {
        assert!(index.typ.is_integer(), "Can't index with {index:?}");
        assert!(self.typ.is_array(), "Can't index into {self:?}");
        let typ = self.typ().base_type().unwrap().clone();
        expr!(Index { array: self, index }, typ)
    }

    /// `123`
    pub fn int_constant<T>(i: T, typ: Type) -> Self
    where
        T: Into<BigInt>,
    {
        assert!(typ.is_integer(), "Int constant must have integer type: {typ:?}");
        let i = i.into();
        expr!(IntConstant(i), typ)
    }

    /// `self.field`
    pub fn member<T>(self, field: T) -> Self
    where
        T: Into<InternedString>,
    {
        let field: InternedString = field.into();
        assert!(
            self.typ.is_struct() || self.typ.is_union(),
            "Can't apply .member operation to\n\t{self:?}\n\t{field}",
        );
        if let Some(ty) = self.typ.lookup_field_type(field) {
            expr!(Member { lhs: self, field }, ty)
        } else {
            unreachable!("unable to find field {} for type {:?}", field, self.typ())
        }
    }

    /// A raw string constant, typed as a byte array of its length.
    /// `"s"`
    pub fn string_constant<T>(s: T) -> Self
    where
        T: Into<InternedString>,
    {
        let s = s.into();
        let typ = Type::unsigned_int(8).array_of_size(s.len());
        expr!(StringConstant { s }, typ)
    }

    /// Struct initializer
    /// `struct foo the_foo = >>> {field1, field2, ... } <<<`
    /// ALL fields must be given, in component order.
    pub fn struct_expr(typ: Type, values: Vec<Expr>) -> Self {
        assert!(
            typ.is_struct(),
            "Error in struct_expr; must be given a struct type.\n\t{typ:?}\n\t{values:?}"
        );
        let fields = typ.components().unwrap();
        assert_eq!(
            fields.len(),
            values.len(),
            "Error in struct_expr; mismatch in number of fields and values.\n\t{typ:?}\n\t{values:?}"
        );
        assert!(
            fields.iter().zip(values.iter()).all(|(f, v)| *f.typ() == v.typ),
            "Error in struct_expr; value type does not match field type.\n\t{typ:?}\n\t{values:?}"
        );
        expr!(Struct { values }, typ)
    }

    /// `identifier`
    pub fn symbol_expression<T: Into<InternedString>>(identifier: T, typ: Type) -> Self {
        let identifier = identifier.into();
        expr!(Symbol { identifier }, typ)
    }

    /// `self ? t : e`
    pub fn ternary(self, t: Expr, e: Expr) -> Expr {
        assert_eq!(t.typ, e.typ, "Ternary branches must have the same type:\n{t:?}\n{e:?}");
        expr!(If { c: self.cast_to(Type::bool()), t, e }, t.typ.clone())
    }

    /// Union initializer
    /// `union foo the_foo = >>> {.field = value } <<<`
    pub fn union_expr<T: Into<InternedString>>(typ: Type, field: T, value: Expr) -> Self {
        let field = field.into();
        assert!(
            typ.is_union(),
            "Error in union_expr; must be given a union type.\n\t{typ:?}\n\t{field}"
        );
        assert_eq!(
            typ.lookup_field_type(field).as_ref(),
            Some(value.typ()),
            "Error in union_expr; value type does not match field type.\n\t{typ:?}\n\t{field}\n\t{value:?}"
        );
        expr!(Union { value, field }, typ)
    }
}

/// Constructors for Binary Operations
impl Expr {
    fn typecheck_binop_args(op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> bool {
        match op {
            // Arithmetic which can include pointers
            Minus | Plus => {
                (lhs.typ == rhs.typ && lhs.typ.is_integer())
                    || (lhs.typ.is_pointer() && rhs.typ.is_integer())
            }
            // Arithmetic
            Div | Mod | Mult => lhs.typ == rhs.typ && lhs.typ.is_integer(),
            // Bitshifts
            Lshr | Shl => lhs.typ.is_integer() && rhs.typ.is_integer(),
            // Boolean ops
            And | Implies | Or | Xor => lhs.typ.is_bool() && rhs.typ.is_bool(),
            // Bitwise ops
            Bitand | Bitnand | Bitnor | Bitnxor | Bitor | Bitxor => {
                lhs.typ == rhs.typ && lhs.typ.is_integer()
            }
            // Comparisons
            Ge | Gt | Le | Lt => lhs.typ == rhs.typ && (lhs.typ.is_integer() || lhs.typ.is_pointer()),
            // Equalities
            Equal | Notequal => {
                lhs.typ == rhs.typ
                    && (lhs.typ.is_bool() || lhs.typ.is_integer() || lhs.typ.is_pointer())
            }
        }
    }

    fn binop_return_type(op: BinaryOperator, lhs: &Expr, _rhs: &Expr) -> Type {
        match op {
            // Arithmetic
            Div | Minus | Mod | Mult | Plus => lhs.typ.clone(),
            // Bitshifts
            Lshr | Shl => lhs.typ.clone(),
            // Boolean ops
            And | Implies | Or | Xor => Type::bool(),
            // Bitwise ops
            Bitand | Bitnand | Bitnor | Bitnxor | Bitor | Bitxor => lhs.typ.clone(),
            // Comparisons
            Ge | Gt | Le | Lt => Type::bool(),
            // Equalities
            Equal | Notequal => Type::bool(),
        }
    }

    /// self op right;
    pub fn binop(self, op: BinaryOperator, rhs: Expr) -> Expr {
        assert!(
            Expr::typecheck_binop_args(op, &self, &rhs),
            "BinaryOperation Expression does not typecheck {op:?} {self:?} {rhs:?}"
        );
        expr!(BinOp { op, lhs: self, rhs }, Expr::binop_return_type(op, &self, &rhs))
    }

    /// `self && e`
    pub fn and(self, e: Expr) -> Expr {
        self.cast_to(Type::bool()).binop(And, e.cast_to(Type::bool()))
    }

    /// `self & e`
    pub fn bitand(self, e: Expr) -> Expr {
        self.binop(Bitand, e)
    }

    /// `~ (self & e)`
    pub fn bitnand(self, e: Expr) -> Expr {
        self.binop(Bitnand, e)
    }

    /// `~ (self | e)`
    pub fn bitnor(self, e: Expr) -> Expr {
        self.binop(Bitnor, e)
    }

    /// `~ (self ^ e)`
    pub fn bitnxor(self, e: Expr) -> Expr {
        self.binop(Bitnxor, e)
    }

    /// `self | e`
    pub fn bitor(self, e: Expr) -> Expr {
        self.binop(Bitor, e)
    }

    /// `self ^ e`
    pub fn bitxor(self, e: Expr) -> Expr {
        self.binop(Bitxor, e)
    }

    /// `self / e`
    pub fn div(self, e: Expr) -> Expr {
        self.binop(Div, e)
    }

    /// `self == e`
    pub fn eq(self, e: Expr) -> Expr {
        self.binop(Equal, e)
    }

    /// `self >= e`
    pub fn ge(self, e: Expr) -> Expr {
        self.binop(Ge, e)
    }

    /// `self > e`
    pub fn gt(self, e: Expr) -> Expr {
        self.binop(Gt, e)
    }

    /// `self ==> e`
    pub fn implies(self, e: Expr) -> Expr {
        self.cast_to(Type::bool()).binop(Implies, e.cast_to(Type::bool()))
    }

    /// `self <= e`
    pub fn le(self, e: Expr) -> Expr {
        self.binop(Le, e)
    }

    /// `self >> e` (Unsigned logical shift)
    pub fn lshr(self, e: Expr) -> Expr {
        self.binop(Lshr, e)
    }

    /// `self < e`
    pub fn lt(self, e: Expr) -> Expr {
        self.binop(Lt, e)
    }

    /// `self * e`
    pub fn mul(self, e: Expr) -> Expr {
        self.binop(Mult, e)
    }

    /// `self != e`
    pub fn neq(self, e: Expr) -> Expr {
        self.binop(Notequal, e)
    }

    /// `self || e`
    pub fn or(self, e: Expr) -> Expr {
        self.cast_to(Type::bool()).binop(Or, e.cast_to(Type::bool()))
    }

    /// `self + e`
    pub fn plus(self, e: Expr) -> Expr {
        self.binop(Plus, e)
    }

    /// `self % e`
    pub fn rem(self, e: Expr) -> Expr {
        self.binop(Mod, e)
    }

    /// `self << e`
    pub fn shl(self, e: Expr) -> Expr {
        self.binop(Shl, e)
    }

    /// `self - e`
    pub fn sub(self, e: Expr) -> Expr {
        self.binop(Minus, e)
    }

    /// logical xor
    pub fn xor(self, e: Expr) -> Expr {
        self.binop(Xor, e)
    }
}

/// Constructors for Unary Operations
impl Expr {
    fn typecheck_unop_arg(op: UnaryOperator, arg: &Expr) -> bool {
        match op {
            Bitnot | UnaryMinus => arg.typ.is_integer(),
            Not => arg.typ.is_bool(),
        }
    }

    fn unop_return_type(op: UnaryOperator, arg: &Expr) -> Type {
        match op {
            Bitnot | UnaryMinus => arg.typ.clone(),
            Not => Type::bool(),
        }
    }

    /// `op self`
    pub fn unop(self, op: UnaryOperator) -> Expr {
        assert!(
            Expr::typecheck_unop_arg(op, &self),
            "UnaryOperation Expression does not typecheck {op:?} {self:?}"
        );
        expr!(UnOp { op, e: self }, Expr::unop_return_type(op, &self))
    }

    /// `~self`
    pub fn bitnot(self) -> Expr {
        self.unop(Bitnot)
    }

    /// `-self`
    pub fn neg(self) -> Expr {
        self.unop(UnaryMinus)
    }

    /// `!self`
    pub fn not(self) -> Expr {
        self.cast_to(Type::bool()).unop(Not)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Expr {
        Expr::int_constant(i, Type::signed_int(32))
    }

    #[test]
    fn relational_nodes_are_boolean() {
        let cmp = int(1).lt(int(2));
        assert!(cmp.typ().is_bool());
        let chained = cmp.and(int(3).eq(int(3)));
        assert!(chained.typ().is_bool());
    }

    #[test]
    #[should_panic(expected = "does not typecheck")]
    fn relational_operand_types_must_match() {
        let lhs = Expr::int_constant(1, Type::signed_int(32));
        let rhs = Expr::int_constant(1, Type::unsigned_int(32));
        lhs.eq(rhs);
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let e = int(1).plus(int(2)).eq(int(3));
        let copy = e.clone();
        assert_eq!(e, copy);
        assert!(!std::ptr::eq(e.value(), copy.value()));
    }

    #[test]
    fn cast_to_same_type_collapses() {
        let e = int(5);
        let cast = e.clone().cast_to(Type::signed_int(32));
        assert_eq!(e, cast);
        let widened = e.cast_to(Type::signed_int(64));
        assert!(matches!(widened.value(), ExprValue::Typecast(_)));
        assert_eq!(widened.typ(), &Type::signed_int(64));
    }

    #[test]
    fn aggregate_constants() {
        let pair = Type::struct_type(
            "pair",
            vec![
                Type::datatype_component("fst", Type::signed_int(32)),
                Type::datatype_component("snd", Type::bool()),
            ],
        );
        let value = Expr::struct_expr(pair, vec![int(1), Expr::bool_true()]);
        assert!(value.is_constant());
        assert!(!value.clone().member("fst").is_constant());
        assert_eq!(value.member("snd").typ(), &Type::bool());
    }

    #[test]
    #[should_panic(expected = "unable to find field")]
    fn member_of_missing_field() {
        let pair = Type::struct_type(
            "pair",
            vec![Type::datatype_component("fst", Type::signed_int(32))],
        );
        Expr::struct_expr(pair, vec![int(1)]).member("snd");
    }
}
