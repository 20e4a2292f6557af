// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typesafe representation of the program under analysis: types and expressions.
//!
//! Both are closed variant sets. Every analysis pass matches on them exhaustively, so
//! adding a node kind is a compile-time checklist of every traversal that must learn
//! about it.

// There are a fair number of constructs in this module that are better maintained as
// explicit pattern matching versus using the `matches!` macro.
#![allow(clippy::match_like_matches_macro)]

mod expr;
mod typ;

pub use expr::{BinaryOperator, Expr, ExprValue, UnaryOperator};
pub use typ::{DatatypeComponent, Type, TypeValue};
