//! Polymorphic payload joins for [`crate::DotKernel::deep_join`].
//!
//! Grounded on `sypytkowski-blog/src/delta_state/convergent.rs::Convergent`
//! (`merge(&self, other: &Self) -> Self`, implemented for `u16` via `max`),
//! extended to the other integer primitives.

use crate::error::{CrdtError, Result};

/// A join-semilattice element: a type whose values can be merged such that the
/// merge is commutative, associative, and idempotent.
///
/// Numbers join by `max`; composite payloads join by recursing into their own
/// `Lattice` impl (or by implementing one field-wise). This is the statically
/// typed counterpart to a dynamic "numbers join by max, objects join via their
/// own `join` method, else unjoinable" rule: the type system enforces the
/// "else" branch at compile time, so [`CrdtError::UnjoinableTypes`] is
/// unreachable from this path (see [`join_dyn`] for the dynamic counterpart).
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
}

macro_rules! impl_lattice_for_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Lattice for $t {
                fn join(&self, other: &Self) -> Self {
                    (*self).max(*other)
                }
            }
        )*
    };
}

impl_lattice_for_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Free-function form for callers who'd rather not import the trait.
pub fn join<T: Lattice>(a: &T, b: &T) -> T {
    a.join(b)
}

/// A small JSON-like dynamic value, for callers who genuinely don't know a
/// payload's shape until runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DynValue {
    Number(f64),
    Other(String),
}

/// Dynamic counterpart to [`Lattice::join`]: numbers join by `max`; anything
/// else fails with [`CrdtError::UnjoinableTypes`], since a `DynValue::Other`
/// has no `join` operation of its own to delegate to.
pub fn join_dyn(a: &DynValue, b: &DynValue) -> Result<DynValue> {
    match (a, b) {
        (DynValue::Number(x), DynValue::Number(y)) => Ok(DynValue::Number(x.max(*y))),
        _ => Err(CrdtError::UnjoinableTypes),
    }
}
