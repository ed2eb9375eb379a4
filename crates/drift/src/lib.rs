//! Drift - Incremental force-directed graph layout.
//!
//! A physics-style simulation assigning planar positions to a mutating set
//! of nodes and links. Links act as springs, nodes repel one another through
//! a Barnes–Hut approximation over a quadtree, overlapping circles are pushed
//! apart, and a cooling schedule ("alpha") governs convergence.
//!
//! New data is merged by reconciliation: nodes keep their motion state for as
//! long as their id appears in the incoming snapshots, so a layout evolves
//! instead of being recomputed.
//!
//! # Examples
//!
//! ```
//! use drift::{ChildSpec, GraphData, LinkSpec, NodeSpec, Simulation, config::SimulationConfig};
//! use drift_core::identifier::NodeId;
//!
//! let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
//! simulation
//!     .reconcile(&GraphData::new(
//!         vec![NodeSpec::new(1), NodeSpec::new(2)],
//!         vec![LinkSpec::new(1, 2)],
//!     ))
//!     .unwrap();
//! simulation.run(500);
//!
//! let children = simulation
//!     .expand(NodeId::new(2), &[ChildSpec::new(), ChildSpec::new()])
//!     .unwrap();
//! assert_eq!(children.len(), 2);
//! assert!(!simulation.is_converged());
//! ```

pub mod config;
pub mod force;
pub mod hierarchy;
pub mod quadtree;
pub mod snapshot;

mod error;
mod simulation;
mod store;

pub use drift_core::{geometry, identifier};

pub use error::{Error, IdentityError, Result};
pub use simulation::{ChildSpec, Mutation, Simulation, TickStatus};
pub use snapshot::{LinkState, NodeState, RenderSink, Snapshot};
pub use store::{EntityStore, GraphData, Link, LinkSpec, Node, NodeSpec, ReconcileResult};
