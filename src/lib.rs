// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Program-state representation for the symbolic execution engine.
//!
//! Symbolic execution explores one program path at a time, rewriting the program's
//! expressions into static single assignment (SSA) form as it goes. This crate owns the
//! two data structures everything else in the engine operates on:
//!
//! 1. [program::Expr] and [program::Type]: an immutable, closed-variant tree representing
//!    the expressions and types of the program under analysis. Constructors enforce the
//!    typing contract of each node kind, so a well-formed tree stays well-formed through
//!    every rewrite.
//! 2. [renaming::Level1] and [renaming::Level2]: the two renaming levels that turn
//!    mutable-variable semantics into SSA form. Level 1 qualifies each identifier with
//!    its call-frame instance (`x` becomes `x!3`), so recursive invocations of the same
//!    function never alias each other's locals. Level 2 assigns a monotonically
//!    increasing version to each frame-qualified identifier (`x!3` becomes `x!3#2`), can
//!    cache a known constant value per SSA name, and fingerprints the whole renaming
//!    state for cheap equivalence checks between explored paths.
//!
//! Renamed trees flow on to constraint generation; the inverse mapping
//! ([renaming::RenamingLevel::get_original_name]) flows back into counterexample
//! reporting, so results are phrased in terms of the identifiers the user wrote.
//!
//! Exploration forks (branches, loop unwinding choices) duplicate renaming state via
//! `Clone`, which is a full deep copy: two forked paths never share mutable renaming
//! state.

mod intern;
pub mod program;
pub mod renaming;
pub use intern::{InternString, InternedString};
