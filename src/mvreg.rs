//! Multi-Value Register: a register that preserves every concurrently-written
//! value and collapses to one value once concurrency resolves.
//!
//! Grounded on `sypytkowski-blog/src/delta_state/mvreg.rs::MVReg`
//! (`set`/`value`/`merge`/`merge_delta`/`split`), renamed to
//! `write`/`read`/`reset`/`join`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::dot_context::DotContext;
use crate::dot_kernel::{DotKernel, RemoveSelector};
use crate::error::Result;

/// A register retaining all concurrent writes, built directly on [`DotKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct MVReg<V> {
    core: DotKernel<V>,
}

impl<V> Default for MVReg<V> {
    fn default() -> Self {
        Self {
            core: DotKernel::new(),
        }
    }
}

impl<V> MVReg<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A register whose kernel participates in an externally-shared causal
    /// frame — e.g. one field of a composite CRDT.
    pub fn with_shared_context(shared_context: Rc<RefCell<DotContext>>) -> Self {
        Self {
            core: DotKernel::with_shared_context(shared_context),
        }
    }
}

impl<V: Clone + PartialEq + Ord> MVReg<V> {
    /// The current value set: empty, a singleton, or several concurrently
    /// written values.
    pub fn read(&self) -> BTreeSet<&V> {
        self.core.values().collect()
    }

    /// Atomically clears every existing dot and writes `v`, returning the union
    /// of the removal and the addition as one delta. After this call only `v`
    /// is observable locally; a concurrent write elsewhere survives the next
    /// `join` because neither side's context contained the other's new dot.
    pub fn write(&mut self, replica_id: impl Into<String>, v: V) -> Result<Self> {
        let removal = self.core.rmv(RemoveSelector::All)?;
        let addition = self.core.add(replica_id, v)?;
        Ok(Self {
            core: removal.join(&addition),
        })
    }

    /// The removal half of [`Self::write`], with no new value: clears the
    /// register without writing anything.
    pub fn reset(&mut self) -> Result<Self> {
        Ok(Self {
            core: self.core.rmv(RemoveSelector::All)?,
        })
    }

    /// Causal merge, delegating to [`DotKernel::join`].
    pub fn join(&self, other: &Self) -> Self {
        Self {
            core: self.core.join(&other.core),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn is_multi_valued(&self) -> bool {
        self.core.entries().len() > 1
    }
}
