//! The causal context: the set of dots a replica has observed, stored as a
//! compact causal context (CCC) plus a dot cloud (DC) of not-yet-contiguous
//! dots.
//!
//! Grounded on `sypytkowski-blog/src/delta_state/dot.rs::DotCtx` (`clock` +
//! `dot_cloud`, `compact`, `merge`, `next_dot`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::dot::{Dot, IntoDot};
use crate::error::Result;

/// A replica's observed causal history: every dot it has seen, either as a
/// write or as an observed-remove.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DotContext {
    /// Compact causal context: replica id -> greatest contiguous counter seen.
    ccc: BTreeMap<String, u64>,
    /// Dot cloud: dots observed out of order, not yet absorbed into the CCC.
    dc: BTreeSet<Dot>,
}

impl DotContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` iff `d.counter <= CCC[d.id]` or `d` is present in the dot cloud.
    pub fn dot_in(&self, d: &Dot) -> bool {
        match self.ccc.get(d.id()) {
            Some(&c) if d.counter() <= c => true,
            _ => self.dc.contains(d),
        }
    }

    /// Allocates a fresh dot for `id`: increments `CCC[id]` and returns
    /// `(id, CCC[id])`. The returned dot is guaranteed not to already be a
    /// member of this context.
    pub fn make_dot(&mut self, id: impl Into<String>) -> Dot {
        let id = id.into();
        let counter = self.ccc.entry(id.clone()).or_insert(0);
        *counter += 1;
        Dot::new(id, *counter).expect("replica id validated by caller of make_dot")
    }

    /// Adds a dot to the dot cloud, optionally compacting immediately.
    pub fn insert_dot(&mut self, dot: impl IntoDot, compact_now: bool) -> Result<()> {
        let dot = dot.into_dot()?;
        self.dc.insert(dot);
        if compact_now {
            self.compact();
        }
        Ok(())
    }

    /// Normalizes the representation to a fixpoint: every `(id, c)` remaining
    /// in the dot cloud satisfies `c > CCC[id] + 1` (strictly non-contiguous,
    /// not dominated). Absorbing `(id, k)` can unblock `(id, k+1)`, so this
    /// iterates until a pass makes no progress.
    pub fn compact(&mut self) {
        loop {
            let mut progressed = false;
            let candidates: Vec<Dot> = self.dc.iter().cloned().collect();
            for dot in candidates {
                let next = self.ccc.get(dot.id()).copied().unwrap_or(0);
                if dot.counter() == next + 1 {
                    self.ccc.insert(dot.id().to_string(), dot.counter());
                    self.dc.remove(&dot);
                    progressed = true;
                } else if dot.counter() <= next {
                    self.dc.remove(&dot);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Mutating merge: folds `other`'s CCC in by `max`, unions the dot clouds,
    /// then compacts. Used when this context is the single shared instance for
    /// several kernels and must be updated in place (see [`crate::DotKernel`]).
    pub fn join_in_place(&mut self, other: &Self) {
        for (id, &c) in other.ccc.iter() {
            self.ccc
                .entry(id.clone())
                .and_modify(|v| *v = (*v).max(c))
                .or_insert(c);
        }
        self.dc.extend(other.dc.iter().cloned());
        self.compact();
    }

    /// Functional merge: returns a new context rather than mutating `self`.
    /// Idempotent, commutative, associative (see `tests/properties.rs`).
    pub fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.join_in_place(other);
        result
    }

    pub fn ccc(&self) -> &BTreeMap<String, u64> {
        &self.ccc
    }

    pub fn dot_cloud(&self) -> &BTreeSet<Dot> {
        &self.dc
    }
}

impl fmt::Display for DotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cc: Vec<String> = self
            .ccc
            .iter()
            .map(|(id, c)| format!("{id}:{c}"))
            .collect();
        let dc: Vec<String> = self.dc.iter().map(|d| d.to_string()).collect();
        write!(f, "Context: CC ({}) DC ({})", cc.join(" "), dc.join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_context_compaction() {
        let mut ctx = DotContext::new();
        ctx.insert_dot("a:2", false).unwrap();
        ctx.insert_dot("a:1", false).unwrap();
        ctx.compact();
        assert_eq!(ctx.ccc().get("a"), Some(&2));
        assert!(ctx.dot_cloud().is_empty());
    }

    #[test]
    fn make_dot_is_contiguous_and_fresh() {
        let mut ctx = DotContext::new();
        let d1 = ctx.make_dot("a");
        let d2 = ctx.make_dot("a");
        assert_eq!(d1.counter(), 1);
        assert_eq!(d2.counter(), 2);
        assert!(ctx.dot_in(&d1));
        assert!(ctx.dot_in(&d2));
    }

    #[test]
    fn compact_preserves_membership() {
        let mut ctx = DotContext::new();
        ctx.insert_dot(("a", 3u64), false).unwrap();
        ctx.insert_dot(("a", 1u64), false).unwrap();
        let before: Vec<bool> = (0..5)
            .map(|n| ctx.dot_in(&Dot::new("a", n).unwrap()))
            .collect();
        ctx.compact();
        let after: Vec<bool> = (0..5)
            .map(|n| ctx.dot_in(&Dot::new("a", n).unwrap()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn join_is_idempotent_commutative_associative_smoke() {
        let mut a = DotContext::new();
        a.make_dot("a");
        a.make_dot("a");
        let mut b = DotContext::new();
        b.make_dot("b");

        assert_eq!(a.join(&a), a);
        assert_eq!(a.join(&b), b.join(&a));

        let mut c = DotContext::new();
        c.make_dot("c");
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn dot_strategy() -> impl Strategy<Value = Dot> {
            ("[a-d]{1}", 1u64..20).prop_map(|(id, counter)| Dot::new(id, counter).unwrap())
        }

        fn ctx_strategy() -> impl Strategy<Value = DotContext> {
            proptest::collection::vec(dot_strategy(), 0..30).prop_map(|dots| {
                let mut ctx = DotContext::new();
                for d in dots {
                    let _ = ctx.insert_dot(d, false);
                }
                ctx.compact();
                ctx
            })
        }

        proptest! {
            #[test]
            fn compaction_invariant(ctx in ctx_strategy()) {
                for dot in ctx.dot_cloud() {
                    let bound = ctx.ccc().get(dot.id()).copied().unwrap_or(0);
                    prop_assert!(dot.counter() > bound + 1);
                }
            }

            #[test]
            fn idempotent(a in ctx_strategy()) {
                prop_assert_eq!(a.join(&a), a);
            }

            #[test]
            fn commutative(a in ctx_strategy(), b in ctx_strategy()) {
                prop_assert_eq!(a.join(&b), b.join(&a));
            }

            #[test]
            fn associative(a in ctx_strategy(), b in ctx_strategy(), c in ctx_strategy()) {
                prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
            }

            #[test]
            fn membership_monotone_under_join(a in ctx_strategy(), b in ctx_strategy(), d in dot_strategy()) {
                if a.dot_in(&d) {
                    prop_assert!(a.join(&b).dot_in(&d));
                }
            }
        }
    }
}
