// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Level 2 renaming: SSA versioning and state fingerprinting.

use super::state_hash::StateDigest;
use super::{RenamingLevel, SymbolRewrite, record_original_name, rewrite_expr};
use crate::InternedString;
use crate::program::{Expr, Type};
use fxhash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace};

/// SSA renaming state for one explored path.
///
/// Takes frame-qualified identifiers (the output of [super::Level1]) and assigns each a
/// monotonically increasing version: the second assignment to `x!3` renders as `x!3#1`.
/// Per identifier the state can additionally cache a constant value the engine has
/// proven, and the whole state can be fingerprinted with [Self::generate_l2_state_hash]
/// to detect when two independently explored paths reached equivalent bindings.
///
/// Forking a path at a branch or loop-unwind decision clones this state. `Clone` is a
/// full deep copy of the binding maps; the forked paths share nothing mutable. (Type
/// nodes inside cached constants are shared, but those are immutable.)
///
/// The choice of version for each assignment is the caller's: always bumping, bumping
/// only on actual assignment, or jumping to a target version when merging branches are
/// all expressed through the explicit `count` argument of [Self::rename], with
/// [Self::bump] as the common case.
#[derive(Clone, Debug, Default)]
pub struct Level2 {
    current_names: FxHashMap<InternedString, Binding>,
    /// Digest of each current binding, maintained incrementally so that hashing the
    /// aggregate state does not have to re-digest unchanged bindings.
    current_hashes: FxHashMap<InternedString, StateDigest>,
    original_names: FxHashMap<InternedString, InternedString>,
}

#[derive(Clone, Debug)]
struct Binding {
    count: u64,
    /// Present only while the engine can prove the identifier holds this literal value.
    /// Cleared on every version transition.
    constant: Option<Expr>,
    /// Opaque identifier of the program node that produced the current version; carried
    /// for the executor's bookkeeping, never interpreted here.
    node_id: u64,
}

/// Whether [Level2::rename_expr] may substitute a symbol reference outright with its
/// cached constant value. An explicit argument, so simplification is a visible choice at
/// the call site rather than a mode hidden in the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstantPropagation {
    Enabled,
    Disabled,
}

/// One row of the reporting export: a rendered SSA name and what it stands for.
#[derive(Debug, Serialize)]
pub struct BindingExport {
    pub identifier: InternedString,
    pub ssa_name: InternedString,
    pub version: u64,
    pub constant_known: bool,
}

impl Level2 {
    pub fn new() -> Self {
        Self::default()
    }

    /// The version-qualified rendered form of `(identifier, count)`.
    pub fn name(&self, identifier: InternedString, count: u64) -> InternedString {
        format!("{identifier}#{count}").into()
    }

    /// Record `count` as the identifier's current version. The version sequence per
    /// identifier is non-decreasing within one state's lifetime; a regression means the
    /// executor's bookkeeping is broken and aborts the run. Any previously cached
    /// constant is dropped: the new version's value is unknown until proven again.
    pub fn rename<T: Into<InternedString>>(&mut self, identifier: T, count: u64) {
        let identifier = identifier.into();
        assert!(
            identifier.map(|s| !s.contains('#')),
            "identifier {identifier} contains a reserved version separator"
        );
        match self.current_names.get_mut(&identifier) {
            Some(binding) => {
                assert!(
                    count >= binding.count,
                    "version regression for {identifier}: {} -> {count}",
                    binding.count
                );
                binding.count = count;
                binding.constant = None;
            }
            None => {
                self.current_names.insert(identifier, Binding { count, constant: None, node_id: 0 });
            }
        }
        trace!(?identifier, count, "level 2 binding");
        let rendered = self.name(identifier, count);
        record_original_name(&mut self.original_names, rendered, identifier);
        self.refresh_hash(identifier);
    }

    /// Assign the next version: one past the current one, or version 0 for an
    /// identifier this state has never seen. Returns the version assigned.
    pub fn bump<T: Into<InternedString>>(&mut self, identifier: T) -> u64 {
        let identifier = identifier.into();
        let next = match self.current_names.get(&identifier) {
            Some(binding) => binding.count + 1,
            None => 0,
        };
        self.rename(identifier, next);
        next
    }

    /// The identifier's active version count, or 0 if it has never been assigned in
    /// this state.
    pub fn current_number(&self, identifier: InternedString) -> u64 {
        self.current_names.get(&identifier).map_or(0, |binding| binding.count)
    }

    /// Cache a proven constant value for the identifier's current version.
    pub fn set_constant<T: Into<InternedString>>(&mut self, identifier: T, value: Expr) {
        let identifier = identifier.into();
        assert!(
            value.is_constant(),
            "cached value for {identifier} must be a literal: {value:?}"
        );
        let Some(binding) = self.current_names.get_mut(&identifier) else {
            panic!("cannot cache a constant for unbound identifier {identifier}");
        };
        binding.constant = Some(value);
        self.refresh_hash(identifier);
    }

    /// The cached constant value of the identifier's current version, if one is known.
    pub fn constant(&self, identifier: InternedString) -> Option<&Expr> {
        self.current_names.get(&identifier).and_then(|binding| binding.constant.as_ref())
    }

    pub fn node_id(&self, identifier: InternedString) -> Option<u64> {
        self.current_names.get(&identifier).map(|binding| binding.node_id)
    }

    pub fn set_node_id<T: Into<InternedString>>(&mut self, identifier: T, node_id: u64) {
        let identifier = identifier.into();
        let Some(binding) = self.current_names.get_mut(&identifier) else {
            panic!("cannot record a node for unbound identifier {identifier}");
        };
        binding.node_id = node_id;
    }

    /// The identifiers currently bound in this state.
    pub fn get_variables(&self) -> BTreeSet<InternedString> {
        self.current_names.keys().copied().collect()
    }

    /// Digest the entire renaming state: every (identifier, version, constant) binding,
    /// independent of the order the bindings were inserted in. Two paths that arrived at
    /// identical bindings digest identically, which is what state merging and
    /// redundant-path pruning compare. Digest equality is a fast-path filter backed by
    /// the collision resistance of the underlying hash, not a proof of equivalence.
    pub fn generate_l2_state_hash(&self) -> StateDigest {
        let mut parts: Vec<_> = self
            .current_hashes
            .iter()
            .map(|(identifier, digest)| (identifier.to_string(), *digest))
            .collect();
        parts.sort_by(|a, b| a.0.cmp(&b.0));
        let digest = StateDigest::aggregate(parts.into_iter().map(|(_, digest)| digest));
        debug!(bindings = self.current_names.len(), "computed level 2 state digest");
        digest
    }

    /// Rewrite every symbol reference in the subtree to its version-qualified name.
    /// With [ConstantPropagation::Enabled], a reference whose binding caches a constant
    /// is substituted by the constant itself, except in address-taken position.
    pub fn rename_expr(&self, expr: &Expr, propagation: ConstantPropagation) -> Expr {
        rewrite_expr(&L2Rewrite { level: self, propagation }, expr)
    }

    /// The current bindings in reporting form, sorted by identifier.
    pub fn export_bindings(&self) -> Vec<BindingExport> {
        let mut rows: Vec<_> = self
            .current_names
            .iter()
            .map(|(identifier, binding)| BindingExport {
                identifier: *identifier,
                ssa_name: self.name(*identifier, binding.count),
                version: binding.count,
                constant_known: binding.constant.is_some(),
            })
            .collect();
        rows.sort_by_key(|row| row.identifier.to_string());
        rows
    }

    fn refresh_hash(&mut self, identifier: InternedString) {
        let binding = &self.current_names[&identifier];
        self.current_hashes.insert(
            identifier,
            StateDigest::of_binding(identifier, binding.count, binding.constant.as_ref()),
        );
    }
}

impl RenamingLevel for Level2 {
    fn get_ident_name(&self, identifier: InternedString) -> InternedString {
        match self.current_names.get(&identifier) {
            Some(binding) => self.name(identifier, binding.count),
            // Never assigned in this state: passes through unrenamed.
            None => identifier,
        }
    }

    fn rename_expr(&self, expr: &Expr) -> Expr {
        Level2::rename_expr(self, expr, ConstantPropagation::Disabled)
    }

    fn get_original_name(&self, identifier: InternedString) -> InternedString {
        self.original_names.get(&identifier).copied().unwrap_or(identifier)
    }

    /// Drop the binding entirely (the variable went out of scope), as opposed to
    /// bumping its version. The inverse map keeps its history.
    fn remove(&mut self, identifier: InternedString) {
        trace!(?identifier, "level 2 unbinding");
        self.current_names.remove(&identifier);
        self.current_hashes.remove(&identifier);
    }
}

struct L2Rewrite<'a> {
    level: &'a Level2,
    propagation: ConstantPropagation,
}

impl SymbolRewrite for L2Rewrite<'_> {
    fn rewrite_symbol(&self, identifier: InternedString, typ: Type) -> Expr {
        if self.propagation == ConstantPropagation::Enabled {
            if let Some(value) = self.level.constant(identifier) {
                assert_eq!(
                    value.typ(),
                    &typ,
                    "cached constant for {identifier} does not match the reference type"
                );
                return value.clone();
            }
        }
        Expr::symbol_expression(self.level.get_ident_name(identifier), typ)
    }

    fn rewrite_symbol_place(&self, identifier: InternedString, typ: Type) -> Expr {
        Expr::symbol_expression(self.level.get_ident_name(identifier), typ)
    }
}

impl fmt::Display for Level2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "level 2 bindings:")?;
        let mut entries: Vec<_> = self.current_names.iter().collect();
        entries.sort_by_key(|(identifier, _)| identifier.to_string());
        for (identifier, binding) in entries {
            write!(f, "  {identifier} -> {}", self.name(*identifier, binding.count))?;
            match &binding.constant {
                Some(value) => writeln!(f, " = {value:?}")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_ser_tokens};

    fn int(i: i64) -> Expr {
        Expr::int_constant(i, Type::signed_int(32))
    }

    #[test]
    fn versions_are_monotonic() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 0);
        l2.rename("x!0", 1);
        // Renaming to the current version again is allowed; going back is not.
        l2.rename("x!0", 1);
        l2.rename("x!0", 4);
        assert_eq!(l2.current_number("x!0".into()), 4);
        assert_eq!(l2.get_ident_name("x!0".into()), "x!0#4");
    }

    #[test]
    #[should_panic(expected = "version regression")]
    fn version_regression_aborts() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 2);
        l2.rename("x!0", 1);
    }

    #[test]
    fn bump_starts_at_zero() {
        let mut l2 = Level2::new();
        assert_eq!(l2.bump("x!0"), 0);
        assert_eq!(l2.bump("x!0"), 1);
        assert_eq!(l2.current_number("x!0".into()), 1);
    }

    #[test]
    fn remove_returns_to_the_unbound_sentinel() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 3);
        l2.remove("x!0".into());
        assert_eq!(l2.current_number("x!0".into()), 0);
        assert_eq!(l2.get_ident_name("x!0".into()), "x!0");
        assert!(l2.get_variables().is_empty());
        // History survives removal.
        assert_eq!(l2.get_original_name("x!0#3".into()), "x!0");
    }

    #[test]
    fn clone_is_independent() {
        let mut s = Level2::new();
        s.rename("x!0", 2);
        s.set_constant("x!0", int(5));

        let mut s2 = s.clone();
        s2.rename("x!0", 3);

        assert_eq!(s.current_number("x!0".into()), 2);
        assert_eq!(s2.current_number("x!0".into()), 3);
        // The fork's version transition did not disturb the original's cached constant.
        assert_eq!(s.constant("x!0".into()), Some(&int(5)));
        assert_eq!(s2.constant("x!0".into()), None);
    }

    #[test]
    fn state_hash_ignores_insertion_order() {
        let mut a = Level2::new();
        a.rename("x!0", 1);
        a.rename("y!0", 2);
        a.set_constant("y!0", int(9));

        let mut b = Level2::new();
        b.rename("y!0", 2);
        b.set_constant("y!0", int(9));
        b.rename("x!0", 1);

        assert_eq!(a.generate_l2_state_hash(), b.generate_l2_state_hash());

        // Any difference in version or cached value shows up in the digest.
        let mut c = b.clone();
        c.rename("x!0", 2);
        assert_ne!(a.generate_l2_state_hash(), c.generate_l2_state_hash());
    }

    #[test]
    fn constant_cache_cleared_on_version_transition() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 1);
        l2.set_constant("x!0", int(42));
        assert_eq!(l2.constant("x!0".into()), Some(&int(42)));

        l2.rename("x!0", 2);
        assert_eq!(l2.constant("x!0".into()), None);
    }

    #[test]
    fn constant_propagation_is_opt_in() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 1);
        l2.set_constant("x!0", int(42));

        let reference = Expr::symbol_expression("x!0", Type::signed_int(32));
        let renamed = l2.rename_expr(&reference, ConstantPropagation::Disabled);
        assert_eq!(renamed.symbol_identifier().unwrap(), "x!0#1");

        let folded = l2.rename_expr(&reference, ConstantPropagation::Enabled);
        assert_eq!(folded, int(42));
    }

    #[test]
    fn node_ids_are_carried() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 0);
        l2.set_node_id("x!0", 17);
        assert_eq!(l2.node_id("x!0".into()), Some(17));
        // A version transition keeps the caller's bookkeeping in place.
        l2.rename("x!0", 1);
        assert_eq!(l2.node_id("x!0".into()), Some(17));
    }

    #[test]
    fn export_serializes_for_reporting() {
        let mut l2 = Level2::new();
        l2.rename("x!0", 2);
        let rows = l2.export_bindings();
        assert_ser_tokens(&rows[0], &[
            Token::Struct { name: "BindingExport", len: 4 },
            Token::Str("identifier"),
            Token::String("x!0"),
            Token::Str("ssa_name"),
            Token::String("x!0#2"),
            Token::Str("version"),
            Token::U64(2),
            Token::Str("constant_known"),
            Token::Bool(false),
            Token::StructEnd,
        ]);
    }
}
