//! Delta-state CRDTs built on a dot/causal-context substrate.
//!
//! The core is [`Dot`] (a replica/counter pair identifying one write),
//! [`DotContext`] (the compact causal context a replica has observed), and
//! [`DotKernel`] (a causally-anchored dot -> value store with observed-remove
//! `join`). [`MVReg`] is a register built directly on the kernel.
//!
//! [`TagSetOrSet`] is a second, causal-context-free observed-remove set kept
//! alongside the kernel as an independent illustration of the same idea using
//! plain unique tags instead of a shared causal context.

pub mod dot;
pub mod dot_context;
pub mod dot_kernel;
pub mod error;
pub mod join;
pub mod mvreg;
pub mod orset;

pub use dot::{Dot, IntoDot};
pub use dot_context::DotContext;
pub use dot_kernel::{DotKernel, RemoveSelector};
pub use error::{CrdtError, Result};
pub use join::{join, join_dyn, DynValue, Lattice};
pub use mvreg::MVReg;
pub use orset::TagSetOrSet;
