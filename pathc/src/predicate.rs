//! The predicate algebra consumed from the external classifier (PCO, §6).
//!
//! This crate never decides overlap or satisfiability itself — it is told
//! the answer by whatever boolean algebra over located packets the caller
//! plugs in. `Predicate` is that seam.

use std::fmt;

/// How two predicates relate under set containment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// `φ₁` and `φ₂` denote the same set of packets.
    Equal,
    /// `φ₁ ⊃ φ₂`.
    Superset,
    /// `φ₁ ⊂ φ₂`.
    Subset,
    /// Neither contains the other, but `φ₁ ∧ φ₂` is satisfiable.
    Intersects,
    /// `φ₁ ∧ φ₂` is unsatisfiable.
    Disjoint,
}

/// The external boolean algebra over located packets (classifier
/// predicates). The core is generic over this trait and never inspects a
/// predicate's internal shape — only `overlap` and `is_satisfiable` drive
/// the tree builder's case analysis (§4.3).
pub trait Predicate: Clone + fmt::Debug {
    /// Conjunction.
    fn and(&self, other: &Self) -> Self;
    /// Disjunction.
    fn or(&self, other: &Self) -> Self;
    /// Negation.
    fn not(&self) -> Self;
    /// Decide how `self` relates to `other`.
    fn overlap(&self, other: &Self) -> Overlap;
    /// Whether `self` denotes a nonempty set of packets.
    fn is_satisfiable(&self) -> bool;
    /// The universal predicate (matches every packet). Used as the
    /// identity element for the stitcher's `unaffected_predicate` base
    /// case and as the match condition of the any-packet atom underlying
    /// `**`.
    fn any() -> Self;
}
