/*!
External interfaces (§6): the things this crate *consumes* (the virtual
field allocator, packet sinks) and *produces* (the `(tagging, capture)`
policy pair). None of these types know how to forward a packet — they're
just the algebra the stitcher (§4.6) assembles its output from.
*/
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// The finite-domain type a virtual field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A single unsigned integer tag (what `path_tag` uses).
    Tag,
}

/// The virtual-field allocator (consumed, §6): reserves a header field
/// with a finite integer domain. The stitcher calls `declare` exactly
/// once per compile, with name `"path_tag"` and domain `[0, |Q|)`.
pub trait VirtualFieldAllocator {
    fn declare(&mut self, name: &str, domain: Range<u32>, field_type: FieldType);
}

/// What a `match`/`modify` combinator tests or sets (§6). `path_tag = 0`
/// is the dead state's tag value; per §4.6's closing note this same
/// value also stands for "a fresh packet, never tagged yet" — a single
/// overloaded convention, not a separate "unset" state. Freshly-arrived
/// packets are brought into that convention by the `unaffected_predicate`
/// clause the stitcher always appends, not by a distinct `Match` variant.
#[derive(Clone)]
pub enum Match<P> {
    /// Match (or set) the `path_tag` virtual field.
    Tag(u32),
    /// Match an arbitrary predicate from the external algebra.
    Pred(P),
}

impl<P: fmt::Debug> fmt::Debug for Match<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Match::Tag(t) => write!(f, "tag={t}"),
            Match::Pred(p) => write!(f, "pred({p:?})"),
        }
    }
}

/// A packet collector attached to a path query's leaf (§3 "Path policy",
/// §6 "Packet sinks"). Delivery semantics are entirely up to the runtime
/// that implements this trait; the core only needs something to route
/// `capture` edges to.
pub trait Sink: fmt::Debug {
    fn register_callback(&self, callback: SinkCallback);
}

/// A callback a [`Sink`] invokes per delivered packet. Opaque to this
/// crate — it never constructs or calls one itself, only plumbs `Arc<dyn
/// Sink>` values through to the emitted `capture` policy.
pub type SinkCallback = Arc<dyn Fn() + Send + Sync>;

/// The compiler's output algebra (§6 "Compiler output"): `match`,
/// `modify`, sequence (`>>`), parallel (`+`), `drop`, `identity`. The
/// stitcher only ever emits policies built from these combinators.
#[derive(Clone)]
pub enum Policy<P> {
    Drop,
    Identity,
    Match(Match<P>),
    SetTag(u32),
    Sequence(Vec<Policy<P>>),
    Parallel(Vec<Policy<P>>),
    Deliver(Arc<dyn Sink>),
}

impl<P: fmt::Debug> fmt::Debug for Policy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Drop => write!(f, "drop"),
            Policy::Identity => write!(f, "identity"),
            Policy::Match(m) => write!(f, "match({m:?})"),
            Policy::SetTag(t) => write!(f, "set(path_tag={t})"),
            Policy::Sequence(ps) => {
                write!(f, "(")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, " >> ")?;
                    }
                    write!(f, "{p:?}")?;
                }
                write!(f, ")")
            }
            Policy::Parallel(ps) => {
                write!(f, "(")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{p:?}")?;
                }
                write!(f, ")")
            }
            Policy::Deliver(sink) => write!(f, "deliver({sink:?})"),
        }
    }
}

impl<P> Policy<P> {
    /// Sequential composition, flattening nested `Sequence`s for a
    /// slightly tidier tree (purely cosmetic — the external policy
    /// algebra doesn't require canonical shape, unlike the regex AST).
    pub fn then(self, next: Policy<P>) -> Policy<P> {
        let mut parts = match self {
            Policy::Sequence(ps) => ps,
            other => vec![other],
        };
        match next {
            Policy::Sequence(ps) => parts.extend(ps),
            other => parts.push(other),
        }
        Policy::Sequence(parts)
    }

    /// Parallel composition (`+`).
    pub fn parallel(self, other: Policy<P>) -> Policy<P> {
        let mut parts = match self {
            Policy::Parallel(ps) => ps,
            other => vec![other],
        };
        match other {
            Policy::Parallel(ps) => parts.extend(ps),
            other => parts.push(other),
        }
        Policy::Parallel(parts)
    }
}
