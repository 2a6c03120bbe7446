/*!
The stitcher (SX, §4.6): walks a built [`Dfa`] and synthesizes the
`(tagging, capture)` policy pair. This is the one place in the crate
that talks to the external policy/allocator interfaces of §6 — it is a
direct translation of `pathcomp.compile` in the Pyretic path-query
library this system is descended from, generalized from its two fixed
fields (`net_id`/`switch_id` there) to the single `path_tag` virtual
field this crate declares.
*/
use tracing::{debug, instrument};

use crate::{
    atom::AtomId,
    dfa::Built,
    policy::{Match, Policy, Sink, VirtualFieldAllocator},
    predicate::Predicate,
    symbol::SymbolTable,
};

/// The compiled output: a tagging policy (advances `path_tag` as
/// predicates match) and a capture policy (delivers to sinks on
/// accepting edges).
pub struct Stitched<P> {
    pub tagging: Policy<P>,
    pub capture: Policy<P>,
}

/// `sink_of(i)` maps a pattern index (the position a query's regex held
/// in the vector passed to [`crate::dfa::Dfa::build`]) to the sink that
/// should receive packets accepted by that query. The caller is
/// responsible for keeping this ordering in lock-step with the pattern
/// vector — the DFA itself only knows about indices, never atoms or
/// sinks.
#[instrument(level = "debug", skip_all)]
pub fn stitch<P: Predicate>(
    built: &Built,
    symtab: &SymbolTable<P>,
    allocator: &mut impl VirtualFieldAllocator,
    sink_of: impl Fn(usize) -> std::sync::Arc<dyn Sink>,
) -> Stitched<P> {
    use crate::policy::FieldType;

    let state_count = built.dfa.states.len() as u32;
    allocator.declare("path_tag", 0..state_count, FieldType::Tag);

    let dead = built.dfa.dead as u32;

    let mut tagging = Policy::Match(Match::Tag(dead));
    let mut capture_parts: Vec<Policy<P>> = Vec::new();

    for (&(src, sigma), &dst) in &built.dfa.transitions {
        if src == built.dfa.dead {
            continue;
        }
        let phi = symtab
            .pred(sigma)
            .expect("dfa transition labeled with a symbol absent from the symbol table")
            .clone();

        let guard = Policy::Match(Match::Tag(src as u32)).then(Policy::Match(Match::Pred(phi.clone())));
        tagging = tagging.parallel(guard.clone().then(Policy::SetTag(dst as u32)));

        if let Some(ord) = built.dfa.accepting.get(&dst) {
            for &i in ord {
                debug!(src, dst, pattern = i, "stitcher: emitting capture edge");
                capture_parts.push(guard.clone().then(Policy::Deliver(sink_of(i))));
            }
        }
    }

    tagging = tagging.parallel(Policy::Match(Match::Pred(symtab.unaffected_predicate())));

    let capture = if capture_parts.is_empty() {
        Policy::Drop
    } else {
        Policy::Parallel(capture_parts)
    };

    Stitched { tagging, capture }
}

/// Every [`AtomId`] whose leaf predicate labels at least one transition
/// out of a non-dead state — i.e. every atom that can actually influence
/// the emitted tagging policy. Diagnostic helper, not part of the
/// stitching algorithm itself.
pub fn live_atoms<P>(built: &Built, symtab: &SymbolTable<P>) -> Vec<AtomId> {
    let mut out = Vec::new();
    for &(src, sigma) in built.dfa.transitions.keys() {
        if src == built.dfa.dead {
            continue;
        }
        if let Some(entry) = symtab.leaf(sigma) {
            out.extend(entry.atoms.iter().copied());
        }
    }
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom::AtomKind, context::CompileContext, dfa::Dfa, path, testutil::BitPred};
    use std::ops::Range;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FakeSink(u32);
    impl Sink for FakeSink {
        fn register_callback(&self, _callback: crate::policy::SinkCallback) {}
    }

    #[derive(Default)]
    struct FakeAllocator {
        declared: Vec<(String, Range<u32>)>,
    }
    impl VirtualFieldAllocator for FakeAllocator {
        fn declare(&mut self, name: &str, domain: Range<u32>, _field_type: crate::policy::FieldType) {
            self.declared.push((name.to_string(), domain));
        }
    }

    fn matches(policy: &Policy<BitPred>, needle: &str) -> bool {
        format!("{policy:?}").contains(needle)
    }

    /// Scenario 5 (§8): `a · b` stitches to the 3 tagging rules and 1
    /// capture rule the scenario names.
    #[test]
    fn concat_of_disjoint_atoms_stitches_expected_rules() {
        let mut ctx = CompileContext::<BitPred>::new();
        let a = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, BitPred::new(0b01)).unwrap());
        let b = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, BitPred::new(0b10)).unwrap());
        let p = path::concat([a, b]);
        let built = Dfa::build(&[p.re_tree()], ctx.symtab());

        let mut allocator = FakeAllocator::default();
        let stitched = stitch(&built, ctx.symtab(), &mut allocator, |_| {
            Arc::new(FakeSink(0)) as Arc<dyn Sink>
        });

        assert_eq!(allocator.declared.len(), 1);
        assert_eq!(allocator.declared[0].0, "path_tag");
        assert_eq!(allocator.declared[0].1, 0..built.dfa.states.len() as u32);

        assert!(matches(&stitched.tagging, &format!("tag={}", built.dfa.dead)));
        assert!(matches(&stitched.capture, "deliver"));
        assert!(!matches(&stitched.capture, "drop"));
    }

    /// Dead-only DFA (no patterns registered): capture is `drop`, tagging
    /// is just the absorbing + unaffected clauses.
    #[test]
    fn empty_pattern_set_yields_no_capture() {
        let ctx = CompileContext::<BitPred>::new();
        let built = Dfa::build::<BitPred>(&[], ctx.symtab());

        let mut allocator = FakeAllocator::default();
        let stitched = stitch(&built, ctx.symtab(), &mut allocator, |_| {
            Arc::new(FakeSink(0)) as Arc<dyn Sink>
        });

        assert!(matches!(stitched.capture, Policy::Drop));
    }

    #[test]
    fn live_atoms_excludes_atoms_only_reachable_from_dead() {
        let mut ctx = CompileContext::<BitPred>::new();
        let a = ctx.atom(AtomKind::Ingress, BitPred::new(0b01)).unwrap();
        let r = path::PathNode::Atom(a.clone()).re_tree();
        let built = Dfa::build(&[r], ctx.symtab());

        let live = live_atoms(&built, ctx.symtab());
        assert_eq!(live, vec![a.borrow().id]);
    }
}
