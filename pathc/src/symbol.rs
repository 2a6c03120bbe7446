//! The symbol table (ST, §4.2): a bidirectional map between abstract
//! symbols and the *disjoint* leaf predicates that form the regex
//! alphabet, plus the back-reference from each leaf to the atoms whose
//! trees reference it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{atom::AtomId, predicate::Predicate};

/// A symbol starts life as a printable-ASCII codepoint so that early
/// compiles are legible in debug output (`!` = 0x21); later symbols just
/// keep counting up past the printable range, which is harmless.
const SYMBOL_BASE: u32 = 0x21;

/// A unique, totally ordered alphabet token. The symbol alphabet is the
/// symbol table's current key set and is mutated over time as predicates
/// are split (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "σ{}", self.0)
    }
}

/// One disjoint leaf of the current alphabet: its predicate, and the set
/// of atoms whose regex trees currently reference its symbol.
#[derive(Debug, Clone)]
pub struct LeafEntry<P> {
    pub pred: P,
    pub atoms: BTreeSet<AtomId>,
}

/// ST's state: `leaves` plays the role of both directions of spec.md
/// §4.2's bijection (`pred_to_entry`/`sym_to_pred`) at once, since keying
/// directly by `Symbol` makes the bijection a representational invariant
/// rather than something to check — there is exactly one `LeafEntry` per
/// live `Symbol` by construction.
#[derive(Debug, Clone)]
pub struct SymbolTable<P> {
    leaves: BTreeMap<Symbol, LeafEntry<P>>,
    next_symbol: u32,
}

impl<P> Default for SymbolTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> SymbolTable<P> {
    pub fn new() -> Self {
        SymbolTable {
            leaves: BTreeMap::new(),
            next_symbol: SYMBOL_BASE,
        }
    }

    /// Mint a fresh symbol. Does not register a leaf for it; callers
    /// follow up with [`SymbolTable::add`].
    pub fn new_symbol(&mut self) -> Symbol {
        let sym = Symbol(self.next_symbol);
        self.next_symbol += 1;
        sym
    }

    pub fn leaves(&self) -> impl Iterator<Item = (Symbol, &LeafEntry<P>)> {
        self.leaves.iter().map(|(s, e)| (*s, e))
    }

    pub fn leaf(&self, sym: Symbol) -> Option<&LeafEntry<P>> {
        self.leaves.get(&sym)
    }

    pub fn pred(&self, sym: Symbol) -> Option<&P> {
        self.leaves.get(&sym).map(|e| &e.pred)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Insert a new leaf entry. `sym` must be fresh and `pred` must be
    /// disjoint from (and not equal/superset/subset of) every currently
    /// stored predicate — the tree builder is responsible for having
    /// already split away any overlap before calling this. Violating
    /// either precondition is a bug in this crate, not a caller error, so
    /// it is only checked in debug builds.
    pub fn add(&mut self, pred: P, sym: Symbol, atoms: BTreeSet<AtomId>) {
        debug_assert!(
            !self.leaves.contains_key(&sym),
            "SymbolTable::add called with an already-registered symbol"
        );
        self.leaves.insert(sym, LeafEntry { pred, atoms });
    }

    /// Add `atom` to an existing leaf's atom set in place (the `equal` and
    /// `subset` cases of §4.3, which extend `A` without splitting `φ`).
    pub fn add_atom(&mut self, sym: Symbol, atom: AtomId) {
        self.leaves
            .get_mut(&sym)
            .unwrap_or_else(|| unreachable!("add_atom on a symbol with no leaf entry: {sym}"))
            .atoms
            .insert(atom);
    }

    /// Drop a leaf entry (used when it is being split into replacements).
    pub fn remove(&mut self, sym: Symbol) -> LeafEntry<P> {
        self.leaves
            .remove(&sym)
            .unwrap_or_else(|| unreachable!("removing a symbol with no leaf entry: {sym}"))
    }

    /// Reset all state, including the token counter, returning the table
    /// to its initial empty state. Used to begin a new independent
    /// compilation universe (§5, §6 "Reset").
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.next_symbol = SYMBOL_BASE;
    }
}

impl<P: Predicate> SymbolTable<P> {
    /// `¬(∨ φᵢ)` across all leaves — the predicate matched by packets
    /// outside every query's alphabet, so they still traverse forwarding
    /// untouched (§4.2, used by the stitcher).
    pub fn unaffected_predicate(&self) -> P {
        let mut preds = self.leaves.values().map(|e| e.pred.clone());
        match preds.next() {
            None => P::any(),
            Some(first) => preds.fold(first, |acc, p| acc.or(&p)).not(),
        }
    }
}
