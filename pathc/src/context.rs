/*!
The compile context — an explicit, owned replacement for the
process-global `re_tree_gen` singleton the Python original used (§9
"Global process state"). It owns the symbol table and the atom table,
and is the only thing that can mutate either: every method that would
register a new leaf or rewrite an existing atom's tree takes `&mut self`,
which makes "one writer" (§5) a property the borrow checker enforces
rather than a documented contract callers must honor.
*/
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::instrument;

use crate::{
    atom::{Atom, AtomId, AtomKind},
    error::{CompileError, Result},
    predicate::Predicate,
    symbol::SymbolTable,
    tree_builder,
};

/// Owns every piece of mutable state a compile session touches: the
/// symbol table and the atom table. A `CompileContext` is a single
/// independent compilation universe; [`CompileContext::clear`] resets it
/// to start a new one without needing to drop and reallocate (§9).
pub struct CompileContext<P> {
    symtab: SymbolTable<P>,
    atoms: BTreeMap<AtomId, Rc<RefCell<Atom<P>>>>,
    next_atom: u32,
}

impl<P> Default for CompileContext<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> CompileContext<P> {
    pub fn new() -> Self {
        CompileContext {
            symtab: SymbolTable::new(),
            atoms: BTreeMap::new(),
            next_atom: 0,
        }
    }

    pub fn symtab(&self) -> &SymbolTable<P> {
        &self.symtab
    }

    pub fn atom_handle(&self, id: AtomId) -> Option<&Rc<RefCell<Atom<P>>>> {
        self.atoms.get(&id)
    }

    fn alloc_atom_id(&mut self) -> AtomId {
        let id = AtomId(self.next_atom);
        self.next_atom += 1;
        id
    }

    /// Reset to an empty compile session: drops every atom and leaf, and
    /// restarts the symbol and atom counters (§5, §6 "Reset").
    pub fn clear(&mut self) {
        self.symtab.clear();
        self.atoms.clear();
        self.next_atom = 0;
    }
}

impl<P: Predicate> CompileContext<P> {
    /// Construct a non-`hook` atom (`ingress`/`egress`/`drop`/`end_path`).
    /// Calls into the tree builder to register `pred` with the symbol
    /// table and obtain the atom's initial tree.
    #[instrument(level = "debug", skip(self, pred), fields(kind = ?kind))]
    pub fn atom(&mut self, kind: AtomKind, pred: P) -> Result<Rc<RefCell<Atom<P>>>> {
        debug_assert!(
            !matches!(kind, AtomKind::Hook),
            "use CompileContext::hook for hook atoms"
        );
        Ok(self.construct_atom(kind, pred, None))
    }

    /// Construct a `hook` atom. `groupby` must be non-empty (§7 "Empty
    /// construction").
    #[instrument(level = "debug", skip(self, pred, groupby))]
    pub fn hook(&mut self, pred: P, groupby: Vec<String>) -> Result<Rc<RefCell<Atom<P>>>> {
        if groupby.is_empty() {
            return Err(CompileError::EmptyGroupBy);
        }
        Ok(self.construct_atom(AtomKind::Hook, pred, Some(groupby)))
    }

    fn construct_atom(
        &mut self,
        kind: AtomKind,
        pred: P,
        groupby: Option<Vec<String>>,
    ) -> Rc<RefCell<Atom<P>>> {
        let id = self.alloc_atom_id();
        let tree = tree_builder::build_tree(&mut self.symtab, &self.atoms, pred.clone(), id);
        let atom = Rc::new(RefCell::new(Atom {
            id,
            kind,
            pred,
            tree,
            groupby,
        }));
        self.atoms.insert(id, Rc::clone(&atom));
        atom
    }
}
