/*!
Path expressions (PE, §4.4): the user-facing regex combinators over atoms,
and the path-policy tree that groups many queries into one compile.

Composite nodes never cache a materialized [`crate::regex::Regex`] — their
tree is recomputed from their children every time [`PathNode::re_tree`] is
called. That laziness is what lets the tree builder rewrite an atom's
leaves in place (§4.3) without having to chase down every composite that
transitively references it (§9).
*/
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use bon::bon;

use crate::{
    atom::{Atom, AtomId, AtomKind},
    context::CompileContext,
    error::{CompileError, Result},
    policy::Sink,
    predicate::Predicate,
    regex::{self, Regex},
};

/// A path expression. Leaves are atoms (or the literal `ε`/`∅` paths);
/// internal nodes are the regex combinators of §4.4.
pub enum PathNode<P> {
    /// `ε-path`: matches the empty trajectory.
    Epsilon,
    /// `∅-path`: matches no trajectory.
    Empty,
    Atom(Rc<RefCell<Atom<P>>>),
    Union(Vec<PathNode<P>>),
    Concat(Vec<PathNode<P>>),
    Star(Box<PathNode<P>>),
    Inter(Vec<PathNode<P>>),
    Neg(Box<PathNode<P>>),
}

impl<P> Clone for PathNode<P> {
    fn clone(&self) -> Self {
        match self {
            PathNode::Epsilon => PathNode::Epsilon,
            PathNode::Empty => PathNode::Empty,
            PathNode::Atom(a) => PathNode::Atom(Rc::clone(a)),
            PathNode::Union(cs) => PathNode::Union(cs.clone()),
            PathNode::Concat(cs) => PathNode::Concat(cs.clone()),
            PathNode::Star(inner) => PathNode::Star(inner.clone()),
            PathNode::Inter(cs) => PathNode::Inter(cs.clone()),
            PathNode::Neg(inner) => PathNode::Neg(inner.clone()),
        }
    }
}

impl<P> PathNode<P> {
    /// Every atom reachable from this node, in no particular order.
    /// Used by diagnostics and by scenarios that need to assert something
    /// about every atom a composite touches.
    pub fn atoms(&self) -> Vec<AtomId> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut Vec<AtomId>) {
        match self {
            PathNode::Epsilon | PathNode::Empty => {}
            PathNode::Atom(a) => out.push(a.borrow().id),
            PathNode::Union(cs) | PathNode::Concat(cs) | PathNode::Inter(cs) => {
                for c in cs {
                    c.collect_atoms(out);
                }
            }
            PathNode::Star(inner) | PathNode::Neg(inner) => inner.collect_atoms(out),
        }
    }
}

impl<P: Predicate> PathNode<P> {
    /// The regex tree this path expression currently denotes, recomputed
    /// fresh from the (possibly just-rewritten) leaves of its atoms.
    pub fn re_tree(&self) -> Regex {
        match self {
            PathNode::Epsilon => Regex::Epsilon,
            PathNode::Empty => Regex::Empty,
            PathNode::Atom(a) => a.borrow().tree.clone(),
            PathNode::Union(cs) => regex::alt(cs.iter().map(PathNode::re_tree)),
            PathNode::Concat(cs) => regex::cat(cs.iter().map(PathNode::re_tree)),
            PathNode::Star(inner) => regex::star(inner.re_tree()),
            PathNode::Inter(cs) => regex::inter(cs.iter().map(PathNode::re_tree)),
            PathNode::Neg(inner) => regex::neg(inner.re_tree()),
        }
    }
}

/// Parallel union of path expressions.
pub fn union<P>(children: impl IntoIterator<Item = PathNode<P>>) -> PathNode<P> {
    let flat: Vec<_> = children
        .into_iter()
        .flat_map(|c| match c {
            PathNode::Union(cs) => cs,
            PathNode::Empty => Vec::new(),
            other => vec![other],
        })
        .collect();
    match flat.len() {
        0 => PathNode::Empty,
        1 => flat.into_iter().next().unwrap(),
        _ => PathNode::Union(flat),
    }
}

/// Concatenation, with the smart flattener spec.md §4.4 asks for: drops
/// `ε-path` children, hoists nested `concat`, collapses to the single
/// child (or `ε-path`) when reduced to one or zero operands.
pub fn concat<P>(children: impl IntoIterator<Item = PathNode<P>>) -> PathNode<P> {
    let mut flat = Vec::new();
    for c in children {
        match c {
            PathNode::Epsilon => {}
            PathNode::Concat(cs) => flat.extend(cs),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => PathNode::Epsilon,
        1 => flat.into_iter().next().unwrap(),
        _ => PathNode::Concat(flat),
    }
}

pub fn star<P>(p: PathNode<P>) -> PathNode<P> {
    match p {
        PathNode::Star(_) => p,
        other => PathNode::Star(Box::new(other)),
    }
}

/// Intersection of path expressions. Folds like `regex::inter` — an
/// empty operand list is the universal path (identity for `∧`).
pub fn inter<P>(children: impl IntoIterator<Item = PathNode<P>>) -> PathNode<P> {
    let flat: Vec<_> = children
        .into_iter()
        .flat_map(|c| match c {
            PathNode::Inter(cs) => cs,
            other => vec![other],
        })
        .collect();
    match flat.len() {
        0 => PathNode::Neg(Box::new(PathNode::Empty)),
        1 => flat.into_iter().next().unwrap(),
        _ => PathNode::Inter(flat),
    }
}

pub fn neg<P>(p: PathNode<P>) -> PathNode<P> {
    match p {
        PathNode::Neg(inner) => *inner,
        other => PathNode::Neg(Box::new(other)),
    }
}

/// A leaf of the path policy tree (§3 "Path policy"): a path expression
/// paired with the sink its matching trajectories are delivered to.
pub struct Query<P> {
    pub path: PathNode<P>,
    pub sink: Arc<dyn Sink>,
}

impl<P> Clone for Query<P> {
    fn clone(&self) -> Self {
        Query {
            path: self.path.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

#[bon]
impl<P> Query<P> {
    #[builder]
    pub fn new(#[builder(start_fn)] path: PathNode<P>, sink: Arc<dyn Sink>) -> Self {
        Query { path, sink }
    }
}

/// The path policy tree (§3): a leaf query, a parallel union of several
/// path policies, or a dynamic wrapper around one ([`DynamicCell`]).
pub enum PathPolicy<P> {
    Leaf(Query<P>),
    Union(Vec<PathPolicy<P>>),
    Dynamic(DynamicCell<P>),
}

impl<P> Clone for PathPolicy<P> {
    fn clone(&self) -> Self {
        match self {
            PathPolicy::Leaf(q) => PathPolicy::Leaf(q.clone()),
            PathPolicy::Union(ps) => PathPolicy::Union(ps.clone()),
            PathPolicy::Dynamic(d) => PathPolicy::Dynamic(d.clone()),
        }
    }
}

impl<P> PathPolicy<P> {
    /// Every query reachable from this node, leaf order left-to-right
    /// (the order callers hand to [`crate::dfa::Dfa::build`] as the
    /// pattern vector, so that pattern index `i` corresponds to
    /// `queries()[i]`'s sink).
    pub fn queries(&self) -> Vec<Query<P>> {
        let mut out = Vec::new();
        self.collect_queries(&mut out);
        out
    }

    fn collect_queries(&self, out: &mut Vec<Query<P>>) {
        match self {
            PathPolicy::Leaf(q) => out.push(q.clone()),
            PathPolicy::Union(ps) => {
                for p in ps {
                    p.collect_queries(out);
                }
            }
            PathPolicy::Dynamic(d) => d.get().collect_queries(out),
        }
    }
}

/// Parallel union of path policies, flattening nested unions (mirrors
/// [`union`]'s flattener, one level up the tree).
pub fn policy_union<P>(children: impl IntoIterator<Item = PathPolicy<P>>) -> PathPolicy<P> {
    let flat: Vec<_> = children
        .into_iter()
        .flat_map(|c| match c {
            PathPolicy::Union(ps) => ps,
            other => vec![other],
        })
        .collect();
    match flat.len() {
        1 => flat.into_iter().next().unwrap(),
        _ => PathPolicy::Union(flat),
    }
}

/// A mutable cell holding a [`PathPolicy`] plus an optional
/// change-notification callback (§4.4 "dynamic path policy"): setting
/// the contents invokes the callback so the surrounding runtime can
/// recompile. Cloning a `DynamicCell` shares the same underlying cell
/// (it is a handle, like `Rc`), matching the Python original's identity
/// semantics for `dynamic_path_policy`.
pub struct DynamicCell<P> {
    policy: Rc<RefCell<PathPolicy<P>>>,
    #[allow(clippy::type_complexity)]
    notify: Rc<RefCell<Option<Box<dyn Fn(DynamicCell<P>)>>>>,
}

impl<P> Clone for DynamicCell<P> {
    fn clone(&self) -> Self {
        DynamicCell {
            policy: Rc::clone(&self.policy),
            notify: Rc::clone(&self.notify),
        }
    }
}

impl<P> DynamicCell<P> {
    pub fn new(policy: PathPolicy<P>) -> Self {
        DynamicCell {
            policy: Rc::new(RefCell::new(policy)),
            notify: Rc::new(RefCell::new(None)),
        }
    }

    /// Register a change-notification callback, replacing any previous
    /// one.
    pub fn attach(&self, notify: impl Fn(DynamicCell<P>) + 'static) {
        *self.notify.borrow_mut() = Some(Box::new(notify));
    }

    pub fn detach(&self) {
        *self.notify.borrow_mut() = None;
    }

    pub fn get(&self) -> Ref<'_, PathPolicy<P>> {
        self.policy.borrow()
    }

    /// Replace the contained policy and notify any attached callback.
    pub fn set(&self, policy: PathPolicy<P>) {
        *self.policy.borrow_mut() = policy;
        self.changed();
    }

    fn changed(&self) {
        if let Some(cb) = self.notify.borrow().as_ref() {
            cb(self.clone());
        }
    }
}

/// `P ** Q`, sugar for `P · (·)* · Q` where `·` is an any-packet atom
/// (§4.4). Needs the compile context because the any-packet atom is a
/// real atom that must be registered with the tree builder like any
/// other — `Predicate::any()` is what makes its predicate disjoint-safe
/// to register (it overlaps every other leaf, driving the usual splits).
pub fn concat_anywhere<P: Predicate>(
    ctx: &mut CompileContext<P>,
    p: PathNode<P>,
    q: PathNode<P>,
) -> Result<PathNode<P>> {
    let wildcard = ctx.atom(AtomKind::Ingress, P::any())?;
    Ok(concat([p, star(PathNode::Atom(wildcard)), q]))
}

/// Atom-level boolean algebra (§4.4): `∧`/`∨`/`¬` pushed down onto the
/// predicate, producing a *new* atom (registered with the tree builder
/// like any other atom construction). Combining atoms of different kinds
/// is a type violation. Combining two `hook` atoms merges their group-by
/// key lists (sorted, deduplicated) — the source system doesn't specify
/// this case precisely, so this crate picks the least-surprising option
/// and records it here rather than in a scattered comment.
impl<P: Predicate> CompileContext<P> {
    pub fn atom_and(
        &mut self,
        a: &Rc<RefCell<Atom<P>>>,
        b: &Rc<RefCell<Atom<P>>>,
    ) -> Result<Rc<RefCell<Atom<P>>>> {
        self.atom_binop(a, b, |x, y| x.and(y))
    }

    pub fn atom_or(
        &mut self,
        a: &Rc<RefCell<Atom<P>>>,
        b: &Rc<RefCell<Atom<P>>>,
    ) -> Result<Rc<RefCell<Atom<P>>>> {
        self.atom_binop(a, b, |x, y| x.or(y))
    }

    pub fn atom_not(&mut self, a: &Rc<RefCell<Atom<P>>>) -> Result<Rc<RefCell<Atom<P>>>> {
        let (kind, pred, groupby) = {
            let a = a.borrow();
            (a.kind, a.pred.not(), a.groupby.clone())
        };
        self.atom_with_kind(kind, pred, groupby)
    }

    fn atom_binop(
        &mut self,
        a: &Rc<RefCell<Atom<P>>>,
        b: &Rc<RefCell<Atom<P>>>,
        op: impl FnOnce(&P, &P) -> P,
    ) -> Result<Rc<RefCell<Atom<P>>>> {
        let (ka, kb) = (a.borrow().kind, b.borrow().kind);
        if ka != kb {
            return Err(CompileError::KindMismatch { left: ka, right: kb });
        }
        let pred = op(&a.borrow().pred, &b.borrow().pred);
        let groupby = match (&a.borrow().groupby, &b.borrow().groupby) {
            (Some(ga), Some(gb)) => {
                let mut merged: Vec<String> = ga.iter().chain(gb.iter()).cloned().collect();
                merged.sort();
                merged.dedup();
                Some(merged)
            }
            (Some(g), None) | (None, Some(g)) => Some(g.clone()),
            (None, None) => None,
        };
        self.atom_with_kind(ka, pred, groupby)
    }

    fn atom_with_kind(
        &mut self,
        kind: AtomKind,
        pred: P,
        groupby: Option<Vec<String>>,
    ) -> Result<Rc<RefCell<Atom<P>>>> {
        match kind {
            AtomKind::Hook => self.hook(pred, groupby.unwrap_or_default()),
            other => self.atom(other, pred),
        }
    }
}
