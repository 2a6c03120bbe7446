/*!
The regex AST (RX, §4.1): an algebraic data type for regular expressions
over [`Symbol`]s, with Brzozowski-style derivatives.

Constructors here are *smart*: `alt`/`cat`/`star`/`inter`/`neg` never return
a literal nested redundancy (doubled negation, nested same-kind node,
`∅`/`ε` absorption) — they return a canonical-ish shape so that structural
equality on two differently-built trees denoting the same language usually
coincides (§4.1, used by [`crate::dfa`] to intern DFA states by structural
equality on state tuples).

Every symbol leaf carries *metadata*: the set of atoms that reference this
particular occurrence (§3 "Regex node"). Composite nodes never cache
symbol leaves of their own — they're built fresh from their children every
time a composite's tree is asked for (§4.4, §9 "the alternation-only
invariant") — so only atom-owned trees are ever mutated in place by
[`crate::tree_builder`].
*/
use std::collections::BTreeSet;
use std::mem;

use itertools::Itertools;

use crate::{
    atom::AtomId,
    error::{CompileError, Result},
    symbol::Symbol,
};

/// The atoms that reference a particular symbol occurrence.
pub type Meta = BTreeSet<AtomId>;

/// A regex node. `Regex` values are small trees; cloning copies metadata
/// sets (usually tiny — one or two atom ids) but never symbol-table state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Regex {
    /// Matches only the empty string.
    Epsilon,
    /// Matches nothing.
    Empty,
    /// A single alphabet symbol, with the atoms that reference this leaf.
    Sym(Symbol, Meta),
    Alt(Vec<Regex>),
    Cat(Vec<Regex>),
    Star(Box<Regex>),
    Inter(Vec<Regex>),
    Neg(Box<Regex>),
}

/// A bare symbol leaf. Not itself "smart" (there's nothing to canonicalize
/// about a single symbol), but kept alongside the other constructors for
/// symmetry.
pub fn sym(s: Symbol, meta: Meta) -> Regex {
    Regex::Sym(s, meta)
}

/// Union. Flattens nested `alt`s, drops `∅` children (the identity for
/// union), and sorts+dedups for a canonical shape. Collapses to the single
/// remaining child, or `∅` if nothing remains.
pub fn alt(children: impl IntoIterator<Item = Regex>) -> Regex {
    let mut flat = Vec::new();
    for c in children {
        match c {
            Regex::Empty => {}
            Regex::Alt(cs) => flat.extend(cs),
            other => flat.push(other),
        }
    }
    let flat: Vec<_> = flat.into_iter().sorted().dedup().collect();
    match flat.len() {
        0 => Regex::Empty,
        1 => flat.into_iter().next().unwrap(),
        _ => Regex::Alt(flat),
    }
}

/// Concatenation. Flattens nested `cat`s, drops `ε` children (the identity
/// for concatenation), and is null-absorbed by any `∅` child. Collapses to
/// the single remaining child, or `ε` if nothing remains.
pub fn cat(children: impl IntoIterator<Item = Regex>) -> Regex {
    let mut flat = Vec::new();
    for c in children {
        match c {
            Regex::Epsilon => {}
            Regex::Empty => return Regex::Empty,
            Regex::Cat(cs) => flat.extend(cs),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => Regex::Epsilon,
        1 => flat.into_iter().next().unwrap(),
        _ => Regex::Cat(flat),
    }
}

/// Kleene star. `star(ε) = ε`, `star(∅) = ε` (zero-or-more repetitions of
/// nothing is still just the empty string), `star(star(r)) = star(r)`.
pub fn star(r: Regex) -> Regex {
    match r {
        Regex::Epsilon | Regex::Empty => Regex::Epsilon,
        Regex::Star(inner) => Regex::Star(inner),
        other => Regex::Star(Box::new(other)),
    }
}

/// Intersection. Flattens nested `inter`s, is absorbed by any `∅` child,
/// and sorts+dedups. An empty intersection is the universal language `Σ*`
/// (`¬∅`) — the identity element for `∧`, matching how the path-expression
/// layer folds `inter` over a list of operands (§4.4).
pub fn inter(children: impl IntoIterator<Item = Regex>) -> Regex {
    let mut flat = Vec::new();
    for c in children {
        match c {
            Regex::Empty => return Regex::Empty,
            Regex::Inter(cs) => flat.extend(cs),
            other => flat.push(other),
        }
    }
    let flat: Vec<_> = flat.into_iter().sorted().dedup().collect();
    match flat.len() {
        0 => neg(Regex::Empty),
        1 => flat.into_iter().next().unwrap(),
        _ => Regex::Inter(flat),
    }
}

/// Complement. Double negation cancels.
pub fn neg(r: Regex) -> Regex {
    match r {
        Regex::Neg(inner) => *inner,
        other => Regex::Neg(Box::new(other)),
    }
}

/// Nullability `ν: r → {ε, ∅}`, represented as a bool (`true` iff `ε ∈
/// L(r)`).
pub fn nullable(r: &Regex) -> bool {
    match r {
        Regex::Epsilon => true,
        Regex::Empty => false,
        Regex::Sym(_, _) => false,
        Regex::Alt(cs) => cs.iter().any(nullable),
        Regex::Cat(cs) => cs.iter().all(nullable),
        Regex::Star(_) => true,
        Regex::Inter(cs) => cs.iter().all(nullable),
        Regex::Neg(inner) => !nullable(inner),
    }
}

/// The derivative `∂_σ r`: the residual regex matching strings `w` such
/// that `σw ∈ L(r)`. Distributes over every node kind via the standard
/// Brzozowski rules.
pub fn derivative(r: &Regex, sigma: Symbol) -> Regex {
    match r {
        Regex::Epsilon => Regex::Empty,
        Regex::Empty => Regex::Empty,
        Regex::Sym(s, _) => {
            if *s == sigma {
                Regex::Epsilon
            } else {
                Regex::Empty
            }
        }
        Regex::Alt(cs) => alt(cs.iter().map(|c| derivative(c, sigma))),
        Regex::Cat(cs) => derivative_cat(cs, sigma),
        Regex::Star(inner) => cat([derivative(inner, sigma), star((**inner).clone())]),
        Regex::Inter(cs) => inter(cs.iter().map(|c| derivative(c, sigma))),
        Regex::Neg(inner) => neg(derivative(inner, sigma)),
    }
}

fn derivative_cat(cs: &[Regex], sigma: Symbol) -> Regex {
    match cs.split_first() {
        None => Regex::Empty,
        Some((head, rest)) => {
            let rest_regex = cat(rest.iter().cloned());
            let through_head = cat([derivative(head, sigma), rest_regex.clone()]);
            if nullable(head) {
                alt([through_head, derivative(&rest_regex, sigma)])
            } else {
                through_head
            }
        }
    }
}

/// In-place leaf replacement: every `sym(old, m)` occurrence in `tree` is
/// replaced by `alt(sym(new_1, m), …, sym(new_k, m))`, preserving metadata
/// (§4.2 `replace_in_atoms`). The walk only ever descends through
/// alternation nodes (§9 "the alternation-only invariant") — atom trees
/// are built purely by appending via `∪`, so any other interior shape
/// means a caller handed this function something that isn't an atom's
/// own tree, which is a type violation, not a bug, and is reported as
/// [`CompileError::NonAlternationInterior`]. Reaching a bare `ε`/`∅` node
/// partway through the walk, on the other hand, means an atom tree
/// collapsed to a leafless shape it should never have — that's an
/// invariant violation and aborts the process.
pub fn replace_symbol(tree: &mut Regex, old: Symbol, new_syms: &[Symbol]) -> Result<()> {
    match tree {
        Regex::Sym(s, meta) if *s == old => {
            let meta = mem::take(meta);
            *tree = alt(new_syms.iter().map(|ns| Regex::Sym(*ns, meta.clone())));
            Ok(())
        }
        Regex::Sym(_, _) => Ok(()),
        Regex::Alt(children) => {
            for child in children.iter_mut() {
                replace_symbol(child, old, new_syms)?;
            }
            *tree = alt(mem::take(children));
            Ok(())
        }
        Regex::Epsilon | Regex::Empty => {
            unreachable!("replace_symbol reached ε/∅ inside an atom tree — invariant violation")
        }
        Regex::Cat(_) | Regex::Star(_) | Regex::Inter(_) | Regex::Neg(_) => {
            Err(CompileError::NonAlternationInterior)
        }
    }
}
