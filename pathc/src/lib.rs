/*!
Compiles declarative *path queries* over packet trajectories — regular
expressions whose alphabet is predicates on located packets — into a
pair of per-packet data-plane policies: a **tagging policy** that
advances a finite-state marker carried in a virtual header field as
packets traverse the network, and a **capture policy** that delivers
matching trajectories to per-query sinks.

## How it fits together

- [`predicate`] is the external boolean algebra this crate never
  implements itself — only consumes, through the [`predicate::Predicate`]
  trait.
- [`symbol`] maintains a *disjoint* partition of every predicate ever
  registered, indexed by abstract [`symbol::Symbol`]s; [`tree_builder`]
  is what keeps that partition disjoint as new, possibly overlapping
  predicates arrive, by splitting existing leaves and rewriting every
  atom tree that referenced them in place.
- [`regex`] is the algebraic regex type these leaves are strung
  together into, with Brzozowski derivatives; [`dfa`] turns a vector of
  such regexes (one per query) into a single product automaton.
- [`path`] is the user-facing surface: [`atom`]s (single-step matches)
  composed with regex combinators into [`path::PathNode`]s, grouped
  into a [`path::PathPolicy`] tree alongside their sinks.
- [`stitcher`] walks the finished automaton and emits the
  `(tagging, capture)` pair as [`policy::Policy`] values.
- [`context::CompileContext`] owns everything mutable (the symbol table,
  the atom table) for one independent compile session; [`compile`] ties
  a `CompileContext` and a `PathPolicy` together into a finished
  [`stitcher::Stitched`] output.

## Example

```
use std::sync::Arc;
use pathc::{
    atom::AtomKind,
    context::CompileContext,
    path::{self, PathPolicy, Query},
    policy::{FieldType, Sink, SinkCallback, VirtualFieldAllocator},
    predicate::{Overlap, Predicate},
};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlowPred(u8);

impl Predicate for FlowPred {
    fn and(&self, o: &Self) -> Self { FlowPred(self.0 & o.0) }
    fn or(&self, o: &Self) -> Self { FlowPred(self.0 | o.0) }
    fn not(&self) -> Self { FlowPred(!self.0) }
    fn overlap(&self, o: &Self) -> Overlap {
        let shared = self.0 & o.0;
        if self.0 == o.0 { Overlap::Equal }
        else if shared == 0 { Overlap::Disjoint }
        else if shared == o.0 { Overlap::Superset }
        else if shared == self.0 { Overlap::Subset }
        else { Overlap::Intersects }
    }
    fn is_satisfiable(&self) -> bool { self.0 != 0 }
    fn any() -> Self { FlowPred(0xff) }
}

#[derive(Debug)]
struct NullSink;
impl Sink for NullSink {
    fn register_callback(&self, _callback: SinkCallback) {}
}

#[derive(Default)]
struct NullAllocator;
impl VirtualFieldAllocator for NullAllocator {
    fn declare(&mut self, _name: &str, _domain: Range<u32>, _field_type: FieldType) {}
}

let mut ctx = CompileContext::<FlowPred>::new();
let ingress = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, FlowPred(0b01)).unwrap());
let egress = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, FlowPred(0b10)).unwrap());
let query = Query::builder(path::concat([ingress, egress]))
    .sink(Arc::new(NullSink) as Arc<dyn Sink>)
    .build();

let stitched = pathc::compile(&ctx, &PathPolicy::Leaf(query), &mut NullAllocator);
assert!(format!("{:?}", stitched.capture).contains("deliver"));
```
*/

pub mod atom;
pub mod context;
pub mod dfa;
pub mod error;
pub mod path;
pub mod policy;
pub mod predicate;
pub mod regex;
pub mod stitcher;
pub mod symbol;
pub mod tree_builder;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use context::CompileContext;
use dfa::Dfa;
use path::PathPolicy;
use policy::{Sink, VirtualFieldAllocator};
use predicate::Predicate;
use regex::Regex;
use stitcher::Stitched;

/// Compile a finished path policy tree against a frozen compile
/// context: builds the product DFA over every leaf query's regex tree
/// (§4.5) and stitches it into a `(tagging, capture)` policy pair
/// (§4.6). Pattern index `i` in the DFA corresponds to
/// `policy.queries()[i]`'s sink (§5: "ST is frozen for the duration of
/// DB+SX" — `ctx` is taken by shared reference, not `&mut`, enforcing
/// that no atom construction can be interleaved with a compile).
pub fn compile<P: Predicate>(
    ctx: &CompileContext<P>,
    policy: &PathPolicy<P>,
    allocator: &mut impl VirtualFieldAllocator,
) -> Stitched<P> {
    let queries = policy.queries();
    let patterns: Vec<Regex> = queries.iter().map(|q| q.path.re_tree()).collect();
    let sinks: Vec<Arc<dyn Sink>> = queries.iter().map(|q| Arc::clone(&q.sink)).collect();

    let built = Dfa::build(&patterns, ctx.symtab());
    stitcher::stitch(&built, ctx.symtab(), allocator, move |i| Arc::clone(&sinks[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atom::AtomKind,
        path::{self, Query},
        policy::{FieldType, SinkCallback},
        testutil::BitPred,
    };
    use std::ops::Range;

    #[derive(Debug)]
    struct FakeSink;
    impl Sink for FakeSink {
        fn register_callback(&self, _callback: SinkCallback) {}
    }

    #[derive(Default)]
    struct FakeAllocator {
        domain: Option<Range<u32>>,
    }
    impl VirtualFieldAllocator for FakeAllocator {
        fn declare(&mut self, name: &str, domain: Range<u32>, _field_type: FieldType) {
            assert_eq!(name, "path_tag");
            self.domain = Some(domain);
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::TRACE)
            .try_init();
    }

    /// Scenario 1 (§8), exercised through the public `atom` constructor:
    /// two identical predicates share exactly one leaf.
    #[test]
    fn identical_predicates_share_one_leaf_through_public_api() {
        let mut ctx = CompileContext::<BitPred>::new();
        let a1 = ctx.atom(AtomKind::Ingress, BitPred::new(0b0011)).unwrap();
        let a2 = ctx.atom(AtomKind::Ingress, BitPred::new(0b0011)).unwrap();
        assert_eq!(ctx.symtab().len(), 1);
        assert_eq!(a1.borrow().tree, a2.borrow().tree);
    }

    /// Scenario 5 (§8), end to end: `a · b` with disjoint atoms compiles
    /// through the full pipeline (atoms → path policy → DFA → stitcher)
    /// to a tagging policy that advances through 3 live states and a
    /// capture policy that delivers on the accepting edge.
    #[test]
    fn concat_of_disjoint_atoms_compiles_end_to_end() {
        init_tracing();
        let mut ctx = CompileContext::<BitPred>::new();
        let a = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, BitPred::new(0b01)).unwrap());
        let b = path::PathNode::Atom(ctx.atom(AtomKind::Ingress, BitPred::new(0b10)).unwrap());
        let query = Query::builder(path::concat([a, b]))
            .sink(Arc::new(FakeSink) as Arc<dyn Sink>)
            .build();

        let mut allocator = FakeAllocator::default();
        let stitched = compile(&ctx, &PathPolicy::Leaf(query), &mut allocator);

        assert_eq!(allocator.domain, Some(0..4));
        assert!(format!("{:?}", stitched.capture).contains("deliver"));
        assert!(format!("{:?}", stitched.tagging).contains("tag=0"));
    }

    /// Scenario 6 (§8), end to end: a union of two single-atom queries
    /// delivers to the sink matching whichever atom actually fired,
    /// never the other one's.
    #[test]
    fn union_of_two_queries_delivers_to_the_right_sink() {
        let mut ctx = CompileContext::<BitPred>::new();
        let a = ctx.atom(AtomKind::Ingress, BitPred::new(0b01)).unwrap();
        let b = ctx.atom(AtomKind::Ingress, BitPred::new(0b10)).unwrap();

        let qa = Query::builder(path::PathNode::Atom(a))
            .sink(Arc::new(FakeSink) as Arc<dyn Sink>)
            .build();
        let qb = Query::builder(path::PathNode::Atom(b))
            .sink(Arc::new(FakeSink) as Arc<dyn Sink>)
            .build();
        let policy = path::policy_union([PathPolicy::Leaf(qa), PathPolicy::Leaf(qb)]);

        let mut allocator = FakeAllocator::default();
        let stitched = compile(&ctx, &policy, &mut allocator);

        let capture_text = format!("{:?}", stitched.capture);
        assert_eq!(capture_text.matches("deliver").count(), 2);
    }
}
