// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The two-level renaming discipline that turns mutable-variable semantics into SSA form.
//!
//! [Level1] qualifies identifiers with their call-frame instance, so locals of recursive
//! invocations never alias. [Level2] assigns an SSA version to each frame-qualified
//! identifier and fingerprints the whole state for path-equivalence checks. Data flows
//! one direction: unrenamed trees from the frontend pass through level 1, then level 2,
//! and the result goes to constraint generation. Both levels keep an inverse map back to
//! the identifiers the user wrote, for counterexample reporting.
//!
//! A symbol with no active binding passes through a level unrenamed: globals legitimately
//! have no frame or version until first assigned, and it is not this module's business to
//! reject them.

mod level1;
mod level2;
mod state_hash;

pub use level1::Level1;
pub use level2::{BindingExport, ConstantPropagation, Level2};
pub use state_hash::StateDigest;

use crate::InternedString;
use crate::program::{Expr, ExprValue, Type, TypeValue};
use fxhash::FxHashMap;

/// Separators reserved for rendered names. A source identifier containing one of these
/// could collide with a rendered name, which would silently corrupt the analysis, so the
/// levels reject such identifiers at the bind boundary.
pub(crate) const RESERVED: &[char] = &['!', '#', '@'];

/// Record `rendered -> identifier` in a level's inverse map. The map grows
/// monotonically: historical rendered names stay resolvable after the forward binding is
/// removed, since they may still appear in recorded path history. A rendered name
/// arriving for a second, different identifier means the naming scheme lost injectivity,
/// which would corrupt the analysis; that aborts the run with full context.
pub(crate) fn record_original_name(
    original_names: &mut FxHashMap<InternedString, InternedString>,
    rendered: InternedString,
    identifier: InternedString,
) {
    if let Some(previous) = original_names.insert(rendered, identifier) {
        assert!(
            previous == identifier,
            "rendered name {rendered} collides: produced for both {previous} and {identifier}"
        );
    }
}

/// What any renaming level must support. Callers hold the concrete level they need
/// ([Level1] or [Level2]); this trait is the shared contract between them, not an
/// extension point for open-ended subclassing.
pub trait RenamingLevel {
    /// The deterministic rendered form of the identifier under its current binding.
    /// Distinct bindings never produce the same rendered name. An identifier with no
    /// active binding renders as itself.
    fn get_ident_name(&self, identifier: InternedString) -> InternedString;

    /// Rewrite every free symbol reference anywhere in the subtree into its currently
    /// active renamed form. The input tree is immutable; the result is a fresh tree
    /// (types are shared, see [Type]).
    fn rename_expr(&self, expr: &Expr) -> Expr;

    /// The original source identifier a rendered name was derived from. Names this level
    /// never produced map to themselves, so the levels can be chained when recovering
    /// fully-qualified names.
    fn get_original_name(&self, identifier: InternedString) -> InternedString;

    /// Delete the identifier's current binding. Subsequent references pass through
    /// unrenamed (or resolve in an enclosing scope, which is the caller's policy).
    /// Historical rendered names remain resolvable via [Self::get_original_name].
    fn remove(&mut self, identifier: InternedString);

    /// Rewrite the symbolic expressions a type embeds (variable-length array bounds).
    /// Types without embedded expressions are returned as shared nodes.
    fn rename_type(&self, typ: &Type) -> Type {
        rewrite_type(&RenameView(self), typ)
    }

    /// Map every renamed symbol in the subtree back to its original identifier.
    fn original_names_expr(&self, expr: &Expr) -> Expr {
        rewrite_expr(&RestoreNames(self), expr)
    }
}

/// How one symbol reference is rewritten. The traversal below applies this at every
/// `Symbol` leaf, in expression trees and in the bounds expressions embedded in types.
pub(crate) trait SymbolRewrite {
    /// Replacement for a symbol reference in value position. The type has already been
    /// rewritten.
    fn rewrite_symbol(&self, identifier: InternedString, typ: Type) -> Expr;

    /// Replacement in address-taken position, which must remain an lvalue: a cached
    /// constant value has no address, so levels that substitute constants rename only.
    fn rewrite_symbol_place(&self, identifier: InternedString, typ: Type) -> Expr {
        self.rewrite_symbol(identifier, typ)
    }
}

/// Adapter giving the plain rename-only rewrite of a level.
pub(crate) struct RenameView<'a, L: ?Sized>(pub &'a L);

impl<L: RenamingLevel + ?Sized> SymbolRewrite for RenameView<'_, L> {
    fn rewrite_symbol(&self, identifier: InternedString, typ: Type) -> Expr {
        Expr::symbol_expression(self.0.get_ident_name(identifier), typ)
    }
}

/// Adapter running a level's inverse map over a tree.
struct RestoreNames<'a, L: ?Sized>(&'a L);

impl<L: RenamingLevel + ?Sized> SymbolRewrite for RestoreNames<'_, L> {
    fn rewrite_symbol(&self, identifier: InternedString, typ: Type) -> Expr {
        Expr::symbol_expression(self.0.get_original_name(identifier), typ)
    }
}

/// Rebuild `expr` with `r` applied to every symbol reference, recursing through all
/// children and through the expressions embedded in node types. Reconstruction goes
/// through the validating constructors, so a rewrite that breaks a node's typing
/// contract fails loudly instead of producing a corrupt tree.
pub(crate) fn rewrite_expr<R: SymbolRewrite + ?Sized>(r: &R, expr: &Expr) -> Expr {
    match expr.value() {
        ExprValue::AddressOf(e) => rewrite_place(r, e).address_of(),
        ExprValue::Array { elems } => {
            let typ = rewrite_type(r, expr.typ());
            Expr::array_expr(typ, elems.iter().map(|e| rewrite_expr(r, e)).collect())
        }
        ExprValue::ArrayOf { elem } => {
            let typ = rewrite_type(r, expr.typ());
            let size = typ.array_size().unwrap().clone();
            rewrite_expr(r, elem).array_constant(size)
        }
        ExprValue::BinOp { op, lhs, rhs } => {
            rewrite_expr(r, lhs).binop(*op, rewrite_expr(r, rhs))
        }
        ExprValue::BoolConstant(_) | ExprValue::IntConstant(_) | ExprValue::StringConstant { .. } => {
            expr.clone()
        }
        ExprValue::Dereference(e) => rewrite_expr(r, e).dereference(),
        ExprValue::If { c, t, e } => {
            rewrite_expr(r, c).ternary(rewrite_expr(r, t), rewrite_expr(r, e))
        }
        ExprValue::Index { array, index } => {
            rewrite_expr(r, array).index_array(rewrite_expr(r, index))
        }
        ExprValue::Member { lhs, field } => rewrite_expr(r, lhs).member(*field),
        ExprValue::Struct { values } => {
            let typ = rewrite_type(r, expr.typ());
            Expr::struct_expr(typ, values.iter().map(|e| rewrite_expr(r, e)).collect())
        }
        ExprValue::Symbol { identifier } => {
            r.rewrite_symbol(*identifier, rewrite_type(r, expr.typ()))
        }
        ExprValue::Typecast(e) => rewrite_expr(r, e).cast_to(rewrite_type(r, expr.typ())),
        ExprValue::Union { value, field } => {
            let typ = rewrite_type(r, expr.typ());
            Expr::union_expr(typ, *field, rewrite_expr(r, value))
        }
        ExprValue::UnOp { op, e } => rewrite_expr(r, e).unop(*op),
    }
}

/// Rewrite an lvalue subtree (the operand of an address-of). Symbols here must stay
/// symbols; everything in value position inside it (indices, dereferenced pointers) is
/// rewritten normally.
fn rewrite_place<R: SymbolRewrite + ?Sized>(r: &R, expr: &Expr) -> Expr {
    match expr.value() {
        ExprValue::Dereference(e) => rewrite_expr(r, e).dereference(),
        ExprValue::Index { array, index } => {
            rewrite_place(r, array).index_array(rewrite_expr(r, index))
        }
        ExprValue::Member { lhs, field } => rewrite_place(r, lhs).member(*field),
        ExprValue::Symbol { identifier } => {
            r.rewrite_symbol_place(*identifier, rewrite_type(r, expr.typ()))
        }
        _ => unreachable!("cannot take the address of {:?}", expr),
    }
}

/// Rebuild a type with `r` applied to the expressions it embeds (array bounds). Types
/// with no embedded expressions come back as the same shared node.
pub(crate) fn rewrite_type<R: SymbolRewrite + ?Sized>(r: &R, typ: &Type) -> Type {
    match typ.value() {
        TypeValue::Array { typ: elem, size } => {
            rewrite_type(r, elem).array_of(rewrite_expr(r, size))
        }
        TypeValue::Pointer { typ: target } => rewrite_type(r, target).to_pointer(),
        TypeValue::Struct { tag, components } => Type::struct_type(
            *tag,
            components
                .iter()
                .map(|c| Type::datatype_component(c.name(), rewrite_type(r, c.typ())))
                .collect(),
        ),
        TypeValue::Union { tag, components } => Type::union_type(
            *tag,
            components
                .iter()
                .map(|c| Type::datatype_component(c.name(), rewrite_type(r, c.typ())))
                .collect(),
        ),
        TypeValue::Bool
        | TypeValue::Empty
        | TypeValue::Signedbv { .. }
        | TypeValue::Unsignedbv { .. } => typ.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_type() -> Type {
        Type::signed_int(32)
    }

    /// The full pipeline on one identifier: frame qualification, two SSA versions, and
    /// the inverse mapping back to the source name.
    #[test]
    fn rename_and_report_end_to_end() {
        let mut l1 = Level1::new(0);
        let mut l2 = Level2::new();

        l1.rename("n", 0);
        let frame_name = l1.get_ident_name("n".into());
        assert_eq!(frame_name, "n!0");

        l2.rename(frame_name, 0);
        assert_eq!(l2.get_ident_name(frame_name), "n!0#0");

        l2.rename(frame_name, 1);
        let ssa_name = l2.get_ident_name(frame_name);
        assert_eq!(ssa_name, "n!0#1");

        // Reporting recovers the source identifier by unwinding the levels in reverse.
        let frame_qualified = l2.get_original_name(ssa_name);
        assert_eq!(frame_qualified, "n!0");
        assert_eq!(l1.get_original_name(frame_qualified), "n");
    }

    #[test]
    fn rename_through_subtree() {
        let mut l1 = Level1::new(0);
        l1.rename("x", 2);

        // (x + 1) == y, with y unbound: y passes through untouched.
        let x = Expr::symbol_expression("x", int_type());
        let y = Expr::symbol_expression("y", int_type());
        let e = x.plus(Expr::int_constant(1, int_type())).eq(y);

        let renamed = l1.rename_expr(&e);
        let ExprValue::BinOp { lhs, rhs, .. } = renamed.value() else {
            panic!("expected comparison, got {renamed:?}");
        };
        assert_eq!(rhs.symbol_identifier().unwrap(), "y");
        let ExprValue::BinOp { lhs: x_ref, .. } = lhs.value() else {
            panic!("expected sum, got {lhs:?}");
        };
        assert_eq!(x_ref.symbol_identifier().unwrap(), "x!2");
    }

    #[test]
    fn rename_variable_length_array_bound() {
        let mut l1 = Level1::new(0);
        l1.rename("n", 1);

        let bound = Expr::symbol_expression("n", Type::unsigned_int(64));
        let vla = Type::signed_int(8).array_of(bound);
        let renamed = l1.rename_type(&vla);
        assert_eq!(renamed.array_size().unwrap().symbol_identifier().unwrap(), "n!1");

        // A scalar comes back as the very same shared node.
        let scalar = Type::signed_int(8);
        let untouched = l1.rename_type(&scalar);
        assert_eq!(scalar, untouched);
    }

    #[test]
    fn original_names_across_a_tree() {
        let mut l1 = Level1::new(0);
        l1.rename("a", 4);

        let e = Expr::symbol_expression("a", int_type())
            .plus(Expr::int_constant(7, int_type()));
        let renamed = l1.rename_expr(&e);
        let restored = l1.original_names_expr(&renamed);
        assert_eq!(restored, e);
    }

    #[test]
    fn address_of_is_renamed_but_never_folded() {
        let mut l2 = Level2::new();
        l2.rename("p!0", 0);
        l2.set_constant("p!0", Expr::int_constant(3, int_type()));

        let addr = Expr::symbol_expression("p!0", int_type()).address_of();
        let renamed = l2.rename_expr(&addr, ConstantPropagation::Enabled);
        let ExprValue::AddressOf(place) = renamed.value() else {
            panic!("expected address-of, got {renamed:?}");
        };
        assert_eq!(place.symbol_identifier().unwrap(), "p!0#0");
    }
}
