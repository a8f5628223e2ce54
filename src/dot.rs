//! The dot: a (replica id, logical counter) pair identifying exactly one local
//! write at one replica.
//!
//! Grounded on `sypytkowski-blog/src/delta_state/dot.rs::Dot`, generalized from
//! a `u64` replica id to an opaque string id with a `"id:counter"` wire form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CrdtError, Result};

/// A single dot: `(id, counter)`.
///
/// Ordering is derived field-order-first, which for `(id: String, counter: u64)`
/// gives lexicographic on `id`, then numeric on `counter`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "String", try_from = "String"))]
pub struct Dot {
    id: String,
    counter: u64,
}

impl Dot {
    /// Constructs a dot directly. Rejects an empty `id`; `counter` may be zero
    /// (only meaningful as a sentinel inside a [`crate::DotContext`]'s CCC, never
    /// as a dot actually allocated by [`crate::DotContext::make_dot`]).
    pub fn new(id: impl Into<String>, counter: u64) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CrdtError::InvalidDot {
                reason: "replica id must not be empty".to_string(),
            });
        }
        if id.contains(':') {
            return Err(CrdtError::InvalidDot {
                reason: "replica id must not contain ':'".to_string(),
            });
        }
        Ok(Self { id, counter })
    }

    /// Parses the wire form `"id:counter"`. The delimiter `':'` must appear
    /// exactly once; `id` must be non-empty and `counter` must parse as a `u64`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(2, ':');
        let id = parts.next().unwrap_or("");
        let rest = parts.next().ok_or_else(|| CrdtError::InvalidDotFormat {
            input: s.to_string(),
        })?;
        if rest.contains(':') || id.is_empty() {
            return Err(CrdtError::InvalidDotFormat {
                input: s.to_string(),
            });
        }
        let counter: u64 = rest.parse().map_err(|_| CrdtError::InvalidDotFormat {
            input: s.to_string(),
        })?;
        Ok(Self {
            id: id.to_string(),
            counter,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Total order over dots: `a.id` lexicographic, then `a.counter - b.counter`.
    /// Equivalent to `Ord::cmp`; kept as a named method since comparing dots is
    /// a primitive operation in its own right.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl fmt::Display for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.counter)
    }
}

impl FromStr for Dot {
    type Err = CrdtError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl From<Dot> for String {
    fn from(dot: Dot) -> Self {
        dot.to_string()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<String> for Dot {
    type Error = CrdtError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

/// Anything that can be coerced into a [`Dot`]: a `Dot` itself, a wire-form
/// string, or an `(id, counter)` record. Used by [`crate::DotContext::insert_dot`]
/// and the dot-like branch of [`crate::DotKernel::rmv`].
pub trait IntoDot {
    fn into_dot(self) -> Result<Dot>;
}

impl IntoDot for Dot {
    fn into_dot(self) -> Result<Dot> {
        Ok(self)
    }
}

impl IntoDot for &Dot {
    fn into_dot(self) -> Result<Dot> {
        Ok(self.clone())
    }
}

impl IntoDot for &str {
    fn into_dot(self) -> Result<Dot> {
        Dot::parse(self)
    }
}

impl IntoDot for String {
    fn into_dot(self) -> Result<Dot> {
        Dot::parse(&self)
    }
}

impl IntoDot for (String, u64) {
    fn into_dot(self) -> Result<Dot> {
        Dot::new(self.0, self.1)
    }
}

impl IntoDot for (&str, u64) {
    fn into_dot(self) -> Result<Dot> {
        Dot::new(self.0, self.1)
    }
}
