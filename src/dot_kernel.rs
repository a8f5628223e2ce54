//! The causally-anchored dot -> value store: `add`/`remove`/`join` with
//! observed-remove semantics.
//!
//! Grounded on `sypytkowski-blog/src/delta_state/dot.rs::DotKernel` (two-pointer
//! `merge`, `add`, `remove`, `remove_all`) and, for the shared/owned context
//! split, `other_examples/70ce24e2_Waidhoferj-thesis..dot_kernel.rs`'s
//! `DotContext`/`DotKernel` pairing.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::dot::{Dot, IntoDot};
use crate::dot_context::DotContext;
use crate::error::Result;
use crate::join::Lattice;

/// Selects what [`DotKernel::rmv`] removes: every dot, one specific dot, or
/// every dot whose value is structurally equal to a given one.
#[derive(Debug, Clone)]
pub enum RemoveSelector<V> {
    /// Remove every dot currently in the kernel.
    All,
    /// Remove a single dot, if present.
    Dot(Dot),
    /// Remove every dot whose stored value is structurally equal (`==`) to this.
    Value(V),
}

impl<V> RemoveSelector<V> {
    pub fn dot(d: impl IntoDot) -> Result<Self> {
        Ok(Self::Dot(d.into_dot()?))
    }
}

/// A causally-anchored dot -> value store.
///
/// `shared_context` is an `Rc<RefCell<..>>` handle rather than an owned value
/// so that several kernels belonging to the same replica (e.g. the fields of a
/// composite CRDT) can draw dots from one causal frame. `owns_context` records
/// whether this kernel is the frame's sole owner (own-base) or a participant in
/// an externally-supplied frame (shared-base); [`Clone`] preserves that
/// distinction exactly.
#[derive(Debug)]
pub struct DotKernel<V> {
    data_storage: BTreeMap<Dot, V>,
    shared_context: Rc<RefCell<DotContext>>,
    owns_context: bool,
}

impl<V> Default for DotKernel<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for DotKernel<V> {
    fn eq(&self, other: &Self) -> bool {
        self.data_storage == other.data_storage
            && *self.shared_context.borrow() == *other.shared_context.borrow()
    }
}

impl<V> DotKernel<V> {
    /// A kernel that owns a fresh, empty causal context.
    pub fn new() -> Self {
        Self {
            data_storage: BTreeMap::new(),
            shared_context: Rc::new(RefCell::new(DotContext::new())),
            owns_context: true,
        }
    }

    /// A kernel participating in an externally-owned, possibly-shared causal
    /// frame: a `DotContext` may legitimately be shared between several
    /// `DotKernel`s belonging to the same replica.
    pub fn with_shared_context(shared_context: Rc<RefCell<DotContext>>) -> Self {
        Self {
            data_storage: BTreeMap::new(),
            shared_context,
            owns_context: false,
        }
    }

    /// A fresh, independent `Rc<RefCell<DotContext>>` handle, so a caller can
    /// build a sibling kernel that shares this one's causal frame.
    pub fn shared_context_handle(&self) -> Rc<RefCell<DotContext>> {
        Rc::clone(&self.shared_context)
    }

    /// A point-in-time copy of this kernel's causal context.
    pub fn context_snapshot(&self) -> DotContext {
        self.shared_context.borrow().clone()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.data_storage.values()
    }

    pub fn entries(&self) -> &BTreeMap<Dot, V> {
        &self.data_storage
    }

    pub fn is_empty(&self) -> bool {
        self.data_storage.is_empty()
    }
}

impl<V: Clone> DotKernel<V> {
    /// Allocates a fresh dot, writes `value`, and returns a delta kernel
    /// containing exactly that one dot (and the minimal context to explain it).
    pub fn add(&mut self, replica_id: impl Into<String>, value: V) -> Result<Self> {
        let dot = self.shared_context.borrow_mut().make_dot(replica_id);
        self.data_storage.insert(dot.clone(), value.clone());

        let mut delta_ctx = DotContext::new();
        delta_ctx.insert_dot(dot.clone(), true)?;
        let mut delta_entries = BTreeMap::new();
        delta_entries.insert(dot, value);

        Ok(Self {
            data_storage: delta_entries,
            shared_context: Rc::new(RefCell::new(delta_ctx)),
            owns_context: true,
        })
    }

    /// Same as [`Self::add`] but returns only the allocated dot; used when a
    /// caller composes several writes into one higher-level delta itself.
    pub fn dot_add(&mut self, replica_id: impl Into<String>, value: V) -> Dot {
        let dot = self.shared_context.borrow_mut().make_dot(replica_id);
        self.data_storage.insert(dot.clone(), value);
        dot
    }

    /// Own-mode clones the context's value into a fresh `Rc`; shared-mode
    /// clones the `Rc` handle itself, preserving the shared frame.
    pub fn clone_kernel(&self) -> Self {
        if self.owns_context {
            let ctx_copy = self.shared_context.borrow().clone();
            Self {
                data_storage: self.data_storage.clone(),
                shared_context: Rc::new(RefCell::new(ctx_copy)),
                owns_context: true,
            }
        } else {
            Self {
                data_storage: self.data_storage.clone(),
                shared_context: Rc::clone(&self.shared_context),
                owns_context: false,
            }
        }
    }
}

impl<V: Clone> Clone for DotKernel<V> {
    fn clone(&self) -> Self {
        self.clone_kernel()
    }
}

impl<V: Clone + PartialEq> DotKernel<V> {
    /// Removes dots per `selector`; the removed dots remain tombstoned in
    /// `self`'s context (never in `data_storage` again) and are absorbed into
    /// the returned delta's context, so merging the delta elsewhere causes the
    /// same dots to be deleted there too.
    ///
    /// A dot-like selector naming a dot not currently in `data_storage`
    /// produces an empty, no-op delta: the dot is either foreign to this
    /// kernel or already tombstoned, and either way there is nothing new to
    /// observe-remove.
    pub fn rmv(&mut self, selector: RemoveSelector<V>) -> Result<Self> {
        let mut delta_ctx = DotContext::new();
        let removed: Vec<Dot> = match selector {
            RemoveSelector::All => {
                let removed: Vec<Dot> = self.data_storage.keys().cloned().collect();
                self.data_storage.clear();
                removed
            }
            RemoveSelector::Dot(d) => {
                if self.data_storage.remove(&d).is_some() {
                    vec![d]
                } else {
                    vec![]
                }
            }
            RemoveSelector::Value(v) => {
                let removed: Vec<Dot> = self
                    .data_storage
                    .iter()
                    .filter(|(_, val)| **val == v)
                    .map(|(d, _)| d.clone())
                    .collect();
                for d in &removed {
                    self.data_storage.remove(d);
                }
                removed
            }
        };
        for d in removed {
            delta_ctx.insert_dot(d, false)?;
        }
        delta_ctx.compact();

        Ok(Self {
            data_storage: BTreeMap::new(),
            shared_context: Rc::new(RefCell::new(delta_ctx)),
            owns_context: true,
        })
    }

    /// The causal merge: a sorted two-pointer walk that is linear in the
    /// combined size and oblivious to iteration order.
    ///
    /// `std::ptr::eq(self, other)` makes self-join a no-op by pointer identity
    /// rather than walking both sides to find they're equal.
    pub fn join(&self, other: &Self) -> Self {
        if std::ptr::eq(self, other) {
            return self.clone_kernel();
        }
        self.merge_with(other, None)
    }

    /// Identical to [`Self::join`] except that when a dot is present on both
    /// sides with differing values, the payloads are merged via
    /// [`Lattice::join`] instead of the "keep existing" rule.
    pub fn deep_join(&self, other: &Self) -> Self
    where
        V: Lattice,
    {
        if std::ptr::eq(self, other) {
            return self.clone_kernel();
        }
        self.merge_with(other, Some(Lattice::join))
    }

    fn merge_with(&self, other: &Self, on_conflict: Option<fn(&V, &V) -> V>) -> Self {
        let mut entries = BTreeMap::new();
        {
            let self_ctx = self.shared_context.borrow();
            let other_ctx = other.shared_context.borrow();

            let mut it_a = self.data_storage.iter().peekable();
            let mut it_b = other.data_storage.iter().peekable();
            loop {
                match (it_a.peek().copied(), it_b.peek().copied()) {
                    (Some((da, va)), Some((db, vb))) => match da.cmp(db) {
                        Ordering::Less => {
                            if !other_ctx.dot_in(da) {
                                entries.insert(da.clone(), va.clone());
                            }
                            it_a.next();
                        }
                        Ordering::Greater => {
                            if !self_ctx.dot_in(db) {
                                entries.insert(db.clone(), vb.clone());
                            }
                            it_b.next();
                        }
                        Ordering::Equal => {
                            let merged = if va == vb {
                                va.clone()
                            } else if let Some(merge_fn) = on_conflict {
                                merge_fn(va, vb)
                            } else {
                                va.clone()
                            };
                            entries.insert(da.clone(), merged);
                            it_a.next();
                            it_b.next();
                        }
                    },
                    (Some((da, va)), None) => {
                        if !other_ctx.dot_in(da) {
                            entries.insert(da.clone(), va.clone());
                        }
                        it_a.next();
                    }
                    (None, Some((db, vb))) => {
                        if !self_ctx.dot_in(db) {
                            entries.insert(db.clone(), vb.clone());
                        }
                        it_b.next();
                    }
                    (None, None) => break,
                }
            }
        }

        let same_ctx = Rc::ptr_eq(&self.shared_context, &other.shared_context);
        let shared_context = if same_ctx {
            Rc::clone(&self.shared_context)
        } else if self.owns_context {
            let joined = self
                .shared_context
                .borrow()
                .join(&other.shared_context.borrow());
            Rc::new(RefCell::new(joined))
        } else {
            self.shared_context
                .borrow_mut()
                .join_in_place(&other.shared_context.borrow());
            Rc::clone(&self.shared_context)
        };

        Self {
            data_storage: entries,
            shared_context,
            owns_context: self.owns_context,
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Display for DotKernel<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ds: Vec<String> = self
            .data_storage
            .iter()
            .map(|(d, v)| format!("{d}->{v:?}"))
            .collect();
        write!(
            f,
            "Kernel: DS ({}) {}",
            ds.join(" "),
            self.shared_context.borrow()
        )
    }
}
