//! User-visible atoms — the elementary single-step matches of a path
//! expression (§3 "Atom `a`", §4.4).

use crate::regex::Regex;

/// A lightweight, `Copy` handle to an [`Atom`]. Stable for the atom's
/// entire lifetime; used as metadata on `sym` nodes and in leaf entries'
/// atom sets so that symbol-table rewrites never need to clone or borrow
/// a full atom to reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomId(pub(crate) u32);

impl AtomId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The kind discriminator carried by every atom. Cross-kind algebra
/// (`∧`/`∨`/`¬` between atoms of different kinds) is a type violation
/// (§7); the stitcher currently only wires tagging/capture generically
/// across kinds, with egress/drop/hook-specific data-plane behavior left
/// as a future extension (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Ingress,
    Egress,
    Drop,
    EndPath,
    Hook,
}

/// A user-declared elementary match: a kind, the originally requested
/// predicate, and an owned regex tree whose language equals that predicate
/// under the *current* leaf partition (§3). The tree is mutated in place
/// by the tree builder whenever an overlapping predicate is registered
/// later (§4.3); this struct does not enforce that invariant itself, the
/// symbol table and tree builder do.
#[derive(Debug, Clone)]
pub struct Atom<P> {
    pub id: AtomId,
    pub kind: AtomKind,
    pub pred: P,
    pub tree: Regex,
    /// Group-by key list. Only meaningful (and required nonempty) for
    /// `AtomKind::Hook`.
    pub groupby: Option<Vec<String>>,
}

impl<P> Atom<P> {
    pub fn is_hook(&self) -> bool {
        matches!(self.kind, AtomKind::Hook)
    }
}
