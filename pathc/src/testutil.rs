//! A small bitmask predicate used as the `Predicate` test double across
//! this crate's unit tests. Real callers plug in a classifier-backed
//! implementation (§6); this one just treats a predicate as a set of
//! packet classes drawn from a 16-element universe, which is expressive
//! enough to exercise every [`crate::predicate::Overlap`] case.
#![cfg(test)]

use crate::predicate::{Overlap, Predicate};

const UNIVERSE: u16 = 0xffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitPred(pub u16);

impl BitPred {
    pub fn new(bits: u16) -> Self {
        BitPred(bits)
    }
}

impl Predicate for BitPred {
    fn and(&self, other: &Self) -> Self {
        BitPred(self.0 & other.0)
    }

    fn or(&self, other: &Self) -> Self {
        BitPred(self.0 | other.0)
    }

    fn not(&self) -> Self {
        BitPred(!self.0 & UNIVERSE)
    }

    fn overlap(&self, other: &Self) -> Overlap {
        if self.0 == other.0 {
            return Overlap::Equal;
        }
        let shared = self.0 & other.0;
        if shared == 0 {
            Overlap::Disjoint
        } else if shared == other.0 {
            Overlap::Superset
        } else if shared == self.0 {
            Overlap::Subset
        } else {
            Overlap::Intersects
        }
    }

    fn is_satisfiable(&self) -> bool {
        self.0 != 0
    }

    fn any() -> Self {
        BitPred(UNIVERSE)
    }
}
