/*!
The DFA builder (DB, §4.5): a worklist-based Brzozowski product
construction over a *vector* of regexes, so one DFA serves every query in
a compile session at once (multi-pattern matching).

States are interned by structural equality on the state tuple
`(∂ s₀, …, ∂ s_{k-1})`, guaranteeing the usual Brzozowski property that the
automaton is finite whenever the starting regexes are (the canonical
constructors in [`crate::regex`] keep the reachable set of derivatives
small by collapsing equivalent shapes).
*/
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::{
    regex::{self, Regex},
    symbol::{Symbol, SymbolTable},
};

/// `(Q, Σ, δ, q₀, F, dead, ord)` from §3 "DFA" — `q₀` is always `states[1]`
/// unless the compile session is degenerate (every pattern is `∅`, in
/// which case `q₀ == dead == 0`); callers that need the start state should
/// track the value `Dfa::build` hands back alongside this struct rather
/// than assuming an index.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub states: Vec<Vec<Regex>>,
    pub transitions: BTreeMap<(usize, Symbol), usize>,
    /// State → set of pattern indices nullable at that state (`ord`).
    pub accepting: BTreeMap<usize, BTreeSet<usize>>,
    /// The unique absorbing non-accepting state. Always `0`.
    pub dead: usize,
}

/// The result of building a DFA: the automaton plus the index of its
/// start state (not necessarily distinct from `dead`).
#[derive(Debug, Clone)]
pub struct Built {
    pub dfa: Dfa,
    pub start: usize,
}

impl Dfa {
    /// Build the product DFA for `patterns` over the alphabet currently
    /// registered in `symtab`. `patterns[i]` is the regex for query `i`;
    /// `ord(q)` names the indices into `patterns` nullable at `q`.
    pub fn build<P>(patterns: &[Regex], symtab: &SymbolTable<P>) -> Built {
        let alphabet: Vec<Symbol> = symtab.leaves().map(|(s, _)| s).collect();

        let mut states: Vec<Vec<Regex>> = Vec::new();
        let mut index: BTreeMap<Vec<Regex>, usize> = BTreeMap::new();
        let mut transitions = BTreeMap::new();
        let mut accepting = BTreeMap::new();

        let dead_state: Vec<Regex> = patterns.iter().map(|_| Regex::Empty).collect();
        let dead = intern(&mut states, &mut index, dead_state);
        debug_assert_eq!(dead, 0, "dead state must be the first interned state");

        let start_state: Vec<Regex> = patterns.to_vec();
        let start = intern(&mut states, &mut index, start_state);

        let mut worklist = vec![dead, start];
        let mut explored: BTreeSet<usize> = BTreeSet::new();

        while let Some(q) = worklist.pop() {
            if !explored.insert(q) {
                continue;
            }
            let components = states[q].clone();
            let ord: BTreeSet<usize> = components
                .iter()
                .enumerate()
                .filter(|(_, r)| regex::nullable(r))
                .map(|(i, _)| i)
                .collect();
            if !ord.is_empty() {
                accepting.insert(q, ord);
            }
            trace!(state = q, "dfa: exploring state");

            for &sigma in &alphabet {
                let next: Vec<Regex> = components.iter().map(|r| regex::derivative(r, sigma)).collect();
                let next_idx = intern(&mut states, &mut index, next);
                transitions.insert((q, sigma), next_idx);
                if !explored.contains(&next_idx) {
                    worklist.push(next_idx);
                }
            }
        }

        debug!(state_count = states.len(), "dfa: construction complete");

        Built {
            dfa: Dfa {
                states,
                transitions,
                accepting,
                dead,
            },
            start,
        }
    }

    pub fn is_dead(&self, state: usize) -> bool {
        state == self.dead
    }
}

fn intern(
    states: &mut Vec<Vec<Regex>>,
    index: &mut BTreeMap<Vec<Regex>, usize>,
    tuple: Vec<Regex>,
) -> usize {
    if let Some(&i) = index.get(&tuple) {
        return i;
    }
    let i = states.len();
    index.insert(tuple.clone(), i);
    states.push(tuple);
    i
}
