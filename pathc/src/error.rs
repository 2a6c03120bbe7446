//! Recoverable compile-time errors.
//!
//! Only the error kinds that a caller can reasonably recover from live here
//! (the "type violation" and "empty construction" kinds of the error
//! taxonomy). Invariant violations — an out-of-sync symbol table, a
//! replacement walk that can't find the leaf it was told exists — are bugs
//! in this crate and are reported via `panic!`/`debug_assert!` instead, not
//! through this enum.

use thiserror::Error;

use crate::atom::AtomKind;

/// Errors that can occur while constructing atoms or path expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Boolean algebra (`∧`, `∨`, `¬`) was applied across atoms of
    /// different kinds (e.g. `ingress ∧ egress`).
    #[error("cannot combine atoms of kind {left:?} and {right:?}")]
    KindMismatch { left: AtomKind, right: AtomKind },

    /// A combinator expected a path expression operand and didn't get one.
    #[error("operand is not a path expression")]
    NotAPath,

    /// A `hook` atom was constructed without a group-by key list.
    #[error("hook atom requires a non-empty group-by key list")]
    EmptyGroupBy,

    /// A leaf-replacement walk (§4.3/§9) reached a non-alternation interior
    /// node where the alternation-only invariant requires one.
    #[error("symbol replacement reached a non-alternation interior node")]
    NonAlternationInterior,
}

/// Convenience alias used throughout the crate's fallible APIs.
pub type Result<T> = std::result::Result<T, CompileError>;
