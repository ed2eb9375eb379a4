//! Drift Core Types and Definitions
//!
//! This crate provides the foundational value types shared by the Drift force
//! layout engine and its collaborators. It includes:
//!
//! - **Geometry**: Planar points and bounding boxes ([`geometry`] module)
//! - **Identifiers**: Stable node identities, link keys and id allocation ([`identifier`] module)

pub mod geometry;
pub mod identifier;
