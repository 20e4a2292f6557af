// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Level 1 renaming: call-frame disambiguation.

use super::{RESERVED, RenameView, RenamingLevel, record_original_name, rewrite_expr};
use crate::InternedString;
use crate::program::Expr;
use fxhash::FxHashMap;
use std::fmt;
use tracing::trace;

/// Qualifies each identifier with the call-frame instance it is currently bound in, so
/// that locals of recursive or re-entrant invocations of the same function never alias:
/// `x` bound in frame 3 renders as `x!3`.
///
/// The map only remembers the *current* frame per identifier. Popping a call frame
/// removes its bindings, and the caller hands every new frame a fresh, never-reused
/// frame number, which keeps identifiers from distinct invocations distinguishable even
/// though no history is kept here.
///
/// Execution is per modeled program thread; each thread gets its own `Level1`, and the
/// thread id is part of every rendered name outside thread 0, so identifiers originating
/// in different modeled threads never alias either.
#[derive(Clone, Debug)]
pub struct Level1 {
    current_names: FxHashMap<InternedString, u64>,
    original_names: FxHashMap<InternedString, InternedString>,
    thread_id: u64,
}

impl Level1 {
    pub fn new(thread_id: u64) -> Self {
        Level1 {
            current_names: FxHashMap::default(),
            original_names: FxHashMap::default(),
            thread_id,
        }
    }

    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// The frame-qualified rendered form of `(identifier, frame)`. Injective: distinct
    /// pairs (and distinct thread ids) never produce the same name, given that source
    /// identifiers contain no reserved separator.
    pub fn name(&self, identifier: InternedString, frame: u64) -> InternedString {
        if self.thread_id == 0 {
            format!("{identifier}!{frame}").into()
        } else {
            format!("{identifier}!{frame}@{}", self.thread_id).into()
        }
    }

    /// Bind `identifier` to `frame` and remember the rendered name for reporting.
    pub fn rename<T: Into<InternedString>>(&mut self, identifier: T, frame: u64) {
        let identifier = identifier.into();
        assert!(
            identifier.map(|s| !s.contains(RESERVED)),
            "identifier {identifier} contains a reserved renaming separator"
        );
        trace!(?identifier, frame, "level 1 binding");
        self.current_names.insert(identifier, frame);
        let rendered = self.name(identifier, frame);
        record_original_name(&mut self.original_names, rendered, identifier);
    }

    /// The frame `identifier` is currently bound in, if any.
    pub fn current_frame(&self, identifier: InternedString) -> Option<u64> {
        self.current_names.get(&identifier).copied()
    }
}

impl RenamingLevel for Level1 {
    fn get_ident_name(&self, identifier: InternedString) -> InternedString {
        match self.current_names.get(&identifier) {
            Some(frame) => self.name(identifier, *frame),
            // No active binding: a global, which passes through unrenamed.
            None => identifier,
        }
    }

    fn rename_expr(&self, expr: &Expr) -> Expr {
        rewrite_expr(&RenameView(self), expr)
    }

    fn get_original_name(&self, identifier: InternedString) -> InternedString {
        self.original_names.get(&identifier).copied().unwrap_or(identifier)
    }

    fn remove(&mut self, identifier: InternedString) {
        trace!(?identifier, "level 1 unbinding");
        self.current_names.remove(&identifier);
    }
}

impl fmt::Display for Level1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "level 1 bindings (thread {}):", self.thread_id)?;
        let mut entries: Vec<_> = self.current_names.iter().collect();
        entries.sort_by_key(|(identifier, _)| identifier.to_string());
        for (identifier, frame) in entries {
            writeln!(f, "  {identifier} -> {}", self.name(*identifier, *frame))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_injective() {
        let l1 = Level1::new(0);
        let x: InternedString = "x".into();
        let y: InternedString = "y".into();
        assert_ne!(l1.name(x, 1), l1.name(x, 2));
        assert_ne!(l1.name(x, 1), l1.name(y, 1));

        // Same identifier and frame in another modeled thread is a different name.
        let other_thread = Level1::new(1);
        assert_ne!(l1.name(x, 1), other_thread.name(x, 1));
    }

    #[test]
    fn frame_isolation() {
        let mut l1 = Level1::new(0);
        l1.rename("x", 1);
        let first = l1.get_ident_name("x".into());
        l1.rename("x", 2);
        let second = l1.get_ident_name("x".into());
        assert_ne!(first, second);
        assert_eq!(second, "x!2");

        // Both historical names still report the same source identifier.
        assert_eq!(l1.get_original_name(first), "x");
        assert_eq!(l1.get_original_name(second), "x");
    }

    #[test]
    fn removed_binding_passes_through() {
        let mut l1 = Level1::new(0);
        l1.rename("x", 7);
        l1.remove("x".into());
        assert_eq!(l1.get_ident_name("x".into()), "x");
        assert_eq!(l1.current_frame("x".into()), None);
        // History survives removal.
        assert_eq!(l1.get_original_name("x!7".into()), "x");
    }

    #[test]
    fn unbound_globals_pass_through() {
        let l1 = Level1::new(0);
        assert_eq!(l1.get_ident_name("global_counter".into()), "global_counter");
        // A name this level never produced maps to itself.
        assert_eq!(l1.get_original_name("global_counter".into()), "global_counter");
    }

    #[test]
    #[should_panic(expected = "reserved renaming separator")]
    fn reserved_separators_rejected() {
        let mut l1 = Level1::new(0);
        l1.rename("x!1", 0);
    }
}
