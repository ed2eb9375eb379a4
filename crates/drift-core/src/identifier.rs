//! Stable identities for simulated entities.
//!
//! This module provides [`NodeId`], the key under which a node's simulated
//! state is stored, [`LinkKey`], the identity of a link between two nodes,
//! and [`IdAllocator`], which hands out fresh node ids.
//!
//! Ids are plain integers supplied by the caller or allocated on expansion.
//! An id is never reassigned to a different logical entity while it is in use.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a node.
///
/// # Examples
///
/// ```
/// use drift_core::identifier::NodeId;
///
/// let id = NodeId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// assert_eq!("7".parse::<NodeId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node id from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a valid [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node id `{input}`: {source}")]
pub struct ParseNodeIdError {
    input: String,
    #[source]
    source: ParseIntError,
}

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(NodeId)
            .map_err(|source| ParseNodeIdError {
                input: s.to_string(),
                source,
            })
    }
}

/// Identity of a link: the ordered pair of its endpoints.
///
/// Two links with the same source and target are the same link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub source: NodeId,
    pub target: NodeId,
}

impl LinkKey {
    pub const fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Checks whether `node` is one of the two endpoints.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// Monotonic allocator of fresh [`NodeId`]s.
///
/// Every id the allocator has seen, either by handing it out or through
/// [`IdAllocator::reserve`], is never returned by [`IdAllocator::allocate`].
/// Once `u64::MAX` was seen the allocator is exhausted.
///
/// # Examples
///
/// ```
/// use drift_core::identifier::{IdAllocator, NodeId};
///
/// let mut ids = IdAllocator::new();
/// ids.reserve(NodeId::new(4));
/// assert_eq!(ids.allocate(), Some(NodeId::new(5)));
/// assert_eq!(ids.allocate(), Some(NodeId::new(6)));
/// ```
#[derive(Debug, Clone)]
pub struct IdAllocator {
    /// `None` once every id was handed out or reserved.
    next: Option<u64>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: Some(0) }
    }
}

impl IdAllocator {
    /// Creates an allocator whose first id is `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: Some(first) }
    }

    /// Marks `id` as taken so it is never allocated.
    pub fn reserve(&mut self, id: NodeId) {
        if let Some(next) = self.next {
            if id.get() >= next {
                self.next = id.get().checked_add(1);
            }
        }
    }

    /// Returns a fresh id, or `None` if the id space is exhausted.
    pub fn allocate(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(NodeId(id))
    }

    /// Number of ids that can still be allocated.
    pub fn remaining(&self) -> u64 {
        match self.next {
            // `u64::MAX - next + 1`, saturating for a fresh allocator
            Some(next) => (u64::MAX - next).saturating_add(1),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_id() {
        assert_eq!(" 12 ".parse::<NodeId>().unwrap(), NodeId::new(12));

        let err = "abc".parse::<NodeId>().unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_link_key_endpoints() {
        let key = LinkKey::new(NodeId::new(1), NodeId::new(2));
        assert!(key.touches(NodeId::new(1)));
        assert!(key.touches(NodeId::new(2)));
        assert!(!key.touches(NodeId::new(3)));
        assert_ne!(key, LinkKey::new(NodeId::new(2), NodeId::new(1)));
        assert_eq!(key.to_string(), "1->2");
    }

    #[test]
    fn test_allocator_skips_reserved() {
        let mut ids = IdAllocator::starting_at(3);
        ids.reserve(NodeId::new(1));
        assert_eq!(ids.allocate(), Some(NodeId::new(3)));

        ids.reserve(NodeId::new(10));
        assert_eq!(ids.allocate(), Some(NodeId::new(11)));
        assert_eq!(ids.allocate(), Some(NodeId::new(12)));
    }

    #[test]
    fn test_allocator_exhaustion() {
        let mut ids = IdAllocator::starting_at(u64::MAX - 1);
        assert_eq!(ids.remaining(), 2);
        assert_eq!(ids.allocate(), Some(NodeId::new(u64::MAX - 1)));
        assert_eq!(ids.allocate(), Some(NodeId::new(u64::MAX)));
        assert_eq!(ids.remaining(), 0);
        assert_eq!(ids.allocate(), None);
        assert_eq!(ids.allocate(), None);

        let mut reserved = IdAllocator::new();
        reserved.reserve(NodeId::new(u64::MAX));
        assert_eq!(reserved.allocate(), None);
        assert_eq!(IdAllocator::new().remaining(), u64::MAX);
    }
}
