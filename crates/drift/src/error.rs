//! Error types for Drift operations.
//!
//! This module provides the main error type [`Error`] and the structural
//! [`IdentityError`] raised when a data snapshot cannot be reconciled.
//!
//! Numerical edge cases (coincident nodes, zero-length links) are never
//! reported here; the force modules resolve them internally.

use thiserror::Error;

use drift_core::identifier::{LinkKey, NodeId};

/// The main error type for Drift operations.
///
/// A failed operation leaves the simulation exactly as it was before the
/// call, so the caller can keep ticking with the last valid state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The snapshot passed to `reconcile` is structurally invalid. Nothing was applied.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Unknown node: {0}")]
    UnknownEntity(NodeId),

    #[error("Node {0} is already expanded")]
    AlreadyExpanded(NodeId),

    /// Child `index` of an expansion has an unusable radius, rest length or strength.
    #[error("Invalid child spec at index {0}")]
    InvalidChild(usize),

    /// No fresh node id is left for an expansion or a tree without explicit ids.
    #[error("Node id space exhausted: {requested} fresh ids needed")]
    IdsExhausted { requested: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structural problems in a node/link snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("node id {0} appears more than once")]
    DuplicateNode(NodeId),

    #[error("link {0} appears more than once")]
    DuplicateLink(LinkKey),

    #[error("link {link} references node {missing}, which is not in the snapshot")]
    DanglingLink { link: LinkKey, missing: NodeId },

    #[error("node {0} has a negative or non-finite radius")]
    InvalidRadius(NodeId),

    #[error("link {0} has a negative or non-finite rest length, or a non-finite strength")]
    InvalidLinkParameters(LinkKey),
}

pub type Result<T> = std::result::Result<T, Error>;
