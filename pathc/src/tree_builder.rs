/*!
The tree builder (TB, §4.3) — the hardest step in the core. Given a newly
requested predicate and the atom that owns it, it returns a regex tree over
the symbol table's *current* symbols that exactly denotes that predicate,
splitting and rewriting any existing leaves that overlap it so the symbol
table's disjoint-alphabet invariant keeps holding afterward.

This is a direct translation of `re_tree_gen.get_re_tree` in the Pyretic
path-query library this system is descended from: walk the existing leaves
in some fixed order, dispatch on [`Overlap`], split on superset/intersects,
narrow `remaining` on subset/intersects, and fall through on disjoint.
*/
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::cell::RefCell;

use tracing::trace;

use crate::{
    atom::{Atom, AtomId},
    predicate::{Overlap, Predicate},
    regex::{self, Regex},
    symbol::{Symbol, SymbolTable},
};

/// Register `new_pred` as belonging to `owner` against `symtab`, rewriting
/// any atom trees in `atoms` whose leaves overlap it, and return the regex
/// tree that exactly denotes `new_pred` under the resulting partition.
///
/// `owner` must already have been allocated (but need not yet be present
/// in `atoms` — see the note in `SPEC_FULL.md` §4.3 on why this crate
/// pre-allocates the id before constructing the `Atom` itself).
pub fn build_tree<P: Predicate>(
    symtab: &mut SymbolTable<P>,
    atoms: &BTreeMap<AtomId, Rc<RefCell<Atom<P>>>>,
    new_pred: P,
    owner: AtomId,
) -> Regex {
    let mut remaining = new_pred;
    let mut parts: Vec<Regex> = Vec::new();

    // Snapshot the current leaf symbols up front: we mutate `symtab`
    // (add/remove) while iterating, and the loop is defined over "every
    // existing leaf at call time" (§4.3), not leaves created by this call.
    let existing: Vec<Symbol> = symtab.leaves().map(|(s, _)| s).collect();

    for sym in existing {
        // A leaf visited earlier in this same call may already have been
        // removed by a split triggered by this call (superset/intersects
        // both `remove` the leaf they split). Skip it if so.
        let Some(entry) = symtab.leaf(sym) else {
            continue;
        };
        let pred = entry.pred.clone();
        let overlap = pred.overlap(&remaining);
        trace!(?sym, ?overlap, "tree_builder: visiting leaf");

        match overlap {
            Overlap::Equal => {
                symtab.add_atom(sym, owner);
                let meta = symtab.leaf(sym).unwrap().atoms.clone();
                parts.push(regex::sym(sym, meta));
                return regex::alt(parts);
            }
            Overlap::Superset => {
                let entry = symtab.remove(sym);
                let kept_pred = entry.pred.and(&remaining.not());
                let mut new_atoms = entry.atoms.clone();
                new_atoms.insert(owner);

                let kept_sym = symtab.new_symbol();
                let new_sym = symtab.new_symbol();
                symtab.add(kept_pred, kept_sym, entry.atoms.clone());
                symtab.add(remaining.clone(), new_sym, new_atoms.clone());
                replace_in_atoms(atoms, sym, &[kept_sym, new_sym]);

                parts.push(regex::sym(new_sym, new_atoms));
                return regex::alt(parts);
            }
            Overlap::Subset => {
                symtab.add_atom(sym, owner);
                let meta = symtab.leaf(sym).unwrap().atoms.clone();
                parts.push(regex::sym(sym, meta));
                remaining = remaining.and(&pred.not());
            }
            Overlap::Intersects => {
                let entry = symtab.remove(sym);
                let kept_pred = entry.pred.and(&remaining.not());
                let shared_pred = entry.pred.and(&remaining);
                let mut shared_atoms = entry.atoms.clone();
                shared_atoms.insert(owner);

                let kept_sym = symtab.new_symbol();
                let shared_sym = symtab.new_symbol();
                symtab.add(kept_pred, kept_sym, entry.atoms.clone());
                symtab.add(shared_pred, shared_sym, shared_atoms.clone());
                replace_in_atoms(atoms, sym, &[kept_sym, shared_sym]);

                parts.push(regex::sym(shared_sym, shared_atoms));
                remaining = remaining.and(&pred.not());
            }
            Overlap::Disjoint => {}
        }
    }

    if remaining.is_satisfiable() {
        let fresh = symtab.new_symbol();
        let mut meta = BTreeSet::new();
        meta.insert(owner);
        symtab.add(remaining, fresh, meta.clone());
        parts.push(regex::sym(fresh, meta));
    }

    regex::alt(parts)
}

/// `replace_in_atoms` (§4.2): for every atom that referenced `old`, rewrite
/// its tree in place, replacing every `sym(old, m)` leaf with
/// `alt(sym(new_1, m), …, sym(new_k, m))`. The atoms to visit are exactly
/// the leaf's `A` set, which is why the caller passes it in rather than
/// this function looking it up again — the leaf has already been removed
/// from `symtab` by the time this runs.
fn replace_in_atoms<P>(
    atoms: &BTreeMap<AtomId, Rc<RefCell<Atom<P>>>>,
    old: Symbol,
    new_syms: &[Symbol],
) {
    for (_, atom) in atoms.iter() {
        let mut atom = atom.borrow_mut();
        if !tree_references(&atom.tree, old) {
            continue;
        }
        regex::replace_symbol(&mut atom.tree, old, new_syms)
            .expect("replace_in_atoms: non-alternation interior in an atom's own tree");
    }
}

fn tree_references(tree: &Regex, sym: Symbol) -> bool {
    match tree {
        Regex::Sym(s, _) => *s == sym,
        Regex::Alt(cs) | Regex::Cat(cs) | Regex::Inter(cs) => {
            cs.iter().any(|c| tree_references(c, sym))
        }
        Regex::Star(inner) | Regex::Neg(inner) => tree_references(inner, sym),
        Regex::Epsilon | Regex::Empty => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomKind;
    use crate::testutil::BitPred;
    use std::collections::BTreeMap as Map;

    fn owner(n: u32) -> AtomId {
        AtomId(n)
    }

    fn insert_atom(
        atoms: &mut Map<AtomId, Rc<RefCell<Atom<BitPred>>>>,
        id: AtomId,
        pred: BitPred,
        tree: Regex,
    ) {
        atoms.insert(
            id,
            Rc::new(RefCell::new(Atom {
                id,
                kind: AtomKind::Ingress,
                pred,
                tree,
                groupby: None,
            })),
        );
    }

    /// Scenario 1 (§8): two identical predicates share exactly one leaf.
    #[test]
    fn identical_predicates_share_one_leaf() {
        let mut symtab = SymbolTable::<BitPred>::new();
        let atoms: Map<AtomId, Rc<RefCell<Atom<BitPred>>>> = Map::new();
        let p = BitPred::new(0b0011);

        let t1 = build_tree(&mut symtab, &atoms, p, owner(0));
        let t2 = build_tree(&mut symtab, &atoms, p, owner(1));

        assert_eq!(symtab.len(), 1);
        assert_eq!(t1, t2);
        let Regex::Sym(sym, meta) = t1 else {
            panic!("expected a bare symbol leaf")
        };
        assert!(meta.contains(&owner(0)));
        assert_eq!(symtab.leaf(sym).unwrap().atoms.len(), 2);
    }

    /// Scenario 2 (§8): disjoint predicates get separate leaves, no
    /// rewrites.
    #[test]
    fn disjoint_predicates_get_separate_leaves() {
        let mut symtab = SymbolTable::<BitPred>::new();
        let atoms: Map<AtomId, Rc<RefCell<Atom<BitPred>>>> = Map::new();

        build_tree(&mut symtab, &atoms, BitPred::new(0b0011), owner(0));
        build_tree(&mut symtab, &atoms, BitPred::new(0b1100), owner(1));

        assert_eq!(symtab.len(), 2);
    }

    /// Scenario 3 (§8): `atom(P)` then `atom(Q)` with `Q ⊂ P`. Expect two
    /// leaves, `(P∧¬Q, {a1})` and `(Q, {a1, a2})`, with `a1`'s tree
    /// rewritten to the alternation of both and `a2`'s tree the bare `Q`
    /// leaf.
    #[test]
    fn superset_split_preserves_both_atom_languages() {
        let mut symtab = SymbolTable::<BitPred>::new();
        let mut atoms: Map<AtomId, Rc<RefCell<Atom<BitPred>>>> = Map::new();

        let p = BitPred::new(0b1111);
        let q = BitPred::new(0b0011);
        let a1 = owner(0);
        let a2 = owner(1);

        let t1 = build_tree(&mut symtab, &atoms, p, a1);
        insert_atom(&mut atoms, a1, p, t1);

        let t2 = build_tree(&mut symtab, &atoms, q, a2);
        insert_atom(&mut atoms, a2, q, t2);

        assert_eq!(symtab.len(), 2);

        // a1's tree must still denote exactly P: the union of its leaves'
        // predicates, OR'd together, equals P.
        let a1_tree = atoms[&a1].borrow().tree.clone();
        let a1_langs = leaf_preds(&symtab, &a1_tree);
        assert_eq!(or_all(&a1_langs), p);

        // a2's tree must denote exactly Q.
        let a2_tree = atoms[&a2].borrow().tree.clone();
        let a2_langs = leaf_preds(&symtab, &a2_tree);
        assert_eq!(or_all(&a2_langs), q);
    }

    /// Scenario 4 (§8): true intersection — `P∩Q`, `P\Q`, `Q\P` all
    /// satisfiable. Both atoms' recovered languages must still equal
    /// their originally requested predicates after the split.
    #[test]
    fn intersecting_split_preserves_both_atom_languages() {
        let mut symtab = SymbolTable::<BitPred>::new();
        let mut atoms: Map<AtomId, Rc<RefCell<Atom<BitPred>>>> = Map::new();

        let p = BitPred::new(0b0111);
        let q = BitPred::new(0b1110);
        let a1 = owner(0);
        let a2 = owner(1);

        let t1 = build_tree(&mut symtab, &atoms, p, a1);
        insert_atom(&mut atoms, a1, p, t1);

        let t2 = build_tree(&mut symtab, &atoms, q, a2);
        insert_atom(&mut atoms, a2, q, t2);

        assert_eq!(symtab.len(), 3);

        let a1_tree = atoms[&a1].borrow().tree.clone();
        assert_eq!(or_all(&leaf_preds(&symtab, &a1_tree)), p);

        let a2_tree = atoms[&a2].borrow().tree.clone();
        assert_eq!(or_all(&leaf_preds(&symtab, &a2_tree)), q);

        // every pairwise leaf intersection must be unsatisfiable
        // (disjointness, §8).
        let leaves: Vec<_> = symtab.leaves().map(|(_, e)| e.pred).collect();
        for i in 0..leaves.len() {
            for j in (i + 1)..leaves.len() {
                assert!(!leaves[i].and(&leaves[j]).is_satisfiable());
            }
        }
    }

    fn leaf_preds(symtab: &SymbolTable<BitPred>, tree: &Regex) -> Vec<BitPred> {
        match tree {
            Regex::Sym(s, _) => vec![symtab.pred(*s).copied().unwrap()],
            Regex::Alt(cs) => cs.iter().flat_map(|c| leaf_preds(symtab, c)).collect(),
            other => panic!("unexpected node in atom tree: {other:?}"),
        }
    }

    fn or_all(preds: &[BitPred]) -> BitPred {
        preds
            .iter()
            .copied()
            .reduce(|a, b| a.or(&b))
            .expect("at least one leaf")
    }
}
