//! A secondary, causal-context-free Observed-Remove Set: membership is decided
//! by a per-element tag set rather than by consulting a shared [`crate::DotContext`].
//!
//! Not part of the dot/kernel substrate — kept alongside it as a second,
//! self-contained illustration of the same add-wins, observed-remove idea
//! using plain unique tags instead of a causal context. Grounded on
//! `sypytkowski-blog/src/state/or_set.rs::ORSet` for the add/remove/merge
//! shape, re-keyed from per-element vector clocks to a per-add [`Dot`] tag
//! per `Agate-DB-Carnelia/crates/mdcs-core/src/orset.rs::ORSet`'s `Tag`.

use std::collections::{BTreeMap, BTreeSet};

use crate::dot::Dot;

/// An observed-remove set keyed by unique per-add tags: an element is a
/// member iff it has at least one add-tag that isn't also a remove-tag.
/// Concurrent add and remove of the same element is add-wins, since a
/// concurrent add mints a tag the remote remove never observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSetOrSet<T: Ord + Clone> {
    adds: BTreeMap<T, BTreeSet<Dot>>,
    tombstones: BTreeSet<Dot>,
    next_counter: u64,
}

impl<T: Ord + Clone> TagSetOrSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh tag for `value` and records the add. The tag is local to
    /// this set (not drawn from a shared [`crate::DotContext`]), per the
    /// causal-context-free framing of this module.
    pub fn add(&mut self, replica_id: impl Into<String>, value: T) {
        self.next_counter += 1;
        let tag = Dot::new(replica_id, self.next_counter)
            .expect("replica id validated by caller of TagSetOrSet::add");
        self.adds.entry(value).or_default().insert(tag);
    }

    /// Removes every tag currently observed for `value`.
    pub fn remove(&mut self, value: &T) {
        if let Some(tags) = self.adds.remove(value) {
            self.tombstones.extend(tags);
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.adds
            .get(value)
            .is_some_and(|tags| tags.iter().any(|t| !self.tombstones.contains(t)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.adds
            .iter()
            .filter(|(_, tags)| tags.iter().any(|t| !self.tombstones.contains(t)))
            .map(|(v, _)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Union of tombstones, union of surviving tags per element, dropping any
    /// element left with no surviving tags.
    pub fn join(&self, other: &Self) -> Self {
        let tombstones: BTreeSet<Dot> = self
            .tombstones
            .union(&other.tombstones)
            .cloned()
            .collect();

        let mut adds: BTreeMap<T, BTreeSet<Dot>> = BTreeMap::new();
        let keys = self.adds.keys().chain(other.adds.keys()).cloned();
        for key in keys {
            let mut tags = self.adds.get(&key).cloned().unwrap_or_default();
            tags.extend(other.adds.get(&key).cloned().unwrap_or_default());
            tags.retain(|t| !tombstones.contains(t));
            if !tags.is_empty() {
                adds.entry(key).or_default().extend(tags);
            }
        }

        Self {
            adds,
            tombstones,
            next_counter: self.next_counter.max(other.next_counter),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_then_contains() {
        let mut s = TagSetOrSet::new();
        s.add("a", "x");
        assert!(s.contains(&"x"));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![&"x"]);
    }

    #[test]
    fn remove_clears_membership() {
        let mut s = TagSetOrSet::new();
        s.add("a", "x");
        s.remove(&"x");
        assert!(!s.contains(&"x"));
    }

    #[test]
    fn concurrent_add_and_remove_is_add_wins() {
        let mut s1 = TagSetOrSet::new();
        s1.add("a", "x");

        let mut s2 = s1.clone();
        s2.remove(&"x");

        s1.add("a", "x");

        let joined = s1.join(&s2);
        assert!(joined.contains(&"x"));
    }

    #[test]
    fn join_is_idempotent_commutative_associative() {
        let mut a = TagSetOrSet::new();
        a.add("a", "x");
        let mut b = TagSetOrSet::new();
        b.add("b", "y");
        b.remove(&"y");
        let mut c = TagSetOrSet::new();
        c.add("c", "z");

        assert_eq!(a.join(&a), a);
        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(String, u8),
            Remove(u8),
        }

        fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
            proptest::collection::vec(
                prop_oneof![
                    ("[a-c]{1}", 0u8..5).prop_map(|(r, v)| Op::Add(r, v)),
                    (0u8..5).prop_map(Op::Remove),
                ],
                0..10,
            )
        }

        fn set_strategy() -> impl Strategy<Value = TagSetOrSet<u8>> {
            ops_strategy().prop_map(|ops| {
                let mut s = TagSetOrSet::new();
                for op in ops {
                    match op {
                        Op::Add(r, v) => s.add(r, v),
                        Op::Remove(v) => s.remove(&v),
                    }
                }
                s
            })
        }

        proptest! {
            #[test]
            fn idempotent(a in set_strategy()) {
                prop_assert_eq!(a.join(&a), a);
            }

            #[test]
            fn commutative(a in set_strategy(), b in set_strategy()) {
                prop_assert_eq!(a.join(&b), b.join(&a));
            }

            #[test]
            fn associative(a in set_strategy(), b in set_strategy(), c in set_strategy()) {
                prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
            }
        }
    }
}
