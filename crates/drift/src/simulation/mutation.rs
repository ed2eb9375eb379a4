//! Structural and pinning mutations.
//!
//! Calls made directly on [`Simulation`] take effect immediately; a driver
//! that receives mutations while a tick may be in progress queues them with
//! [`Simulation::enqueue`] instead, and the next tick applies them before
//! evaluating any force.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use drift_core::{
    geometry::Point,
    identifier::{LinkKey, NodeId},
};

use super::Simulation;
use crate::{
    error::{Error, Result},
    store::{self, GraphData, Link, Node},
};

/// Parameters of one child created by [`Simulation::expand`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChildSpec {
    /// Collision radius override.
    pub radius: Option<f64>,
    /// Rest length of the link from the parent.
    pub rest_length: Option<f64>,
    pub strength: Option<f64>,
}

impl ChildSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_rest_length(mut self, rest_length: f64) -> Self {
        self.rest_length = Some(rest_length);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    fn is_valid(&self) -> bool {
        store::is_valid_radius(self.radius)
            && store::is_valid_link_parameters(self.rest_length, self.strength)
    }
}

/// A deferred operation, applied between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Reconcile(GraphData),
    Expand {
        node: NodeId,
        children: Vec<ChildSpec>,
    },
    Pin {
        node: NodeId,
        at: Point,
    },
    Unpin(NodeId),
    FreezeOthers(NodeId),
    Restart(f64),
    Reheat(f64),
}

impl Mutation {
    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reconcile(_) => "reconcile",
            Self::Expand { .. } => "expand",
            Self::Pin { .. } => "pin",
            Self::Unpin(_) => "unpin",
            Self::FreezeOthers(_) => "freeze_others",
            Self::Restart(_) => "restart",
            Self::Reheat(_) => "reheat",
        }
    }
}

impl<R: Rng> Simulation<R> {
    /// Creates one child of `node_id` per spec.
    ///
    /// Children get fresh ids, are linked from the parent and start within
    /// `placement.expand_jitter` of it on each axis, drawn from the
    /// simulation's random source. The parent is marked expanded and the
    /// simulation restarts at `placement.expand_alpha`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] if `node_id` is not in the store,
    /// [`Error::AlreadyExpanded`] if it was expanded before,
    /// [`Error::InvalidChild`] for a child with a negative or non-finite
    /// parameter and [`Error::IdsExhausted`] if fewer fresh ids than
    /// children are left. Nothing changes in any of these cases.
    pub fn expand(&mut self, node_id: NodeId, children: &[ChildSpec]) -> Result<Vec<NodeId>> {
        let parent = self
            .store
            .get(node_id)
            .ok_or(Error::UnknownEntity(node_id))?;
        if parent.is_expanded() {
            return Err(Error::AlreadyExpanded(node_id));
        }
        let origin = parent.position();
        let depth = parent.depth() + 1;
        if let Some(index) = children.iter().position(|child| !child.is_valid()) {
            return Err(Error::InvalidChild(index));
        }
        let jitter = self.config.placement().expand_jitter();

        let ids = self.store.allocate_ids(children.len())?;
        for (&id, child) in ids.iter().zip(children) {
            let offset = Point::new(
                self.rng.random_range(-jitter..=jitter),
                self.rng.random_range(-jitter..=jitter),
            );
            let node = Node::new(id, origin.add_point(offset))
                .with_lineage(Some(node_id), depth)
                .with_radius(child.radius);
            self.store.insert_node(node);
            self.store.insert_link(Link::new(
                LinkKey::new(node_id, id),
                child.rest_length,
                child.strength,
            ));
        }

        if let Some(parent) = self.store.get_mut(node_id) {
            parent.set_expanded();
        }
        debug!(node = node_id.get(), children = ids.len(); "Expanded node");

        let alpha = self.config.placement().expand_alpha();
        self.restart(alpha);
        Ok(ids)
    }

    /// Fixes `node_id` at `at`, moving it there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] if `node_id` is not in the store.
    pub fn pin(&mut self, node_id: NodeId, at: Point) -> Result<()> {
        let node = self
            .store
            .get_mut(node_id)
            .ok_or(Error::UnknownEntity(node_id))?;
        node.pin(at);
        debug!(node = node_id.get(), x = at.x(), y = at.y(); "Pinned node");
        Ok(())
    }

    /// Releases `node_id` back into integration with zero velocity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] if `node_id` is not in the store.
    pub fn unpin(&mut self, node_id: NodeId) -> Result<()> {
        let node = self
            .store
            .get_mut(node_id)
            .ok_or(Error::UnknownEntity(node_id))?;
        node.unpin();
        debug!(node = node_id.get(); "Unpinned node");
        Ok(())
    }

    /// Pins every node except `node_id` where it currently is, and releases `node_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntity`] if `node_id` is not in the store.
    pub fn freeze_others(&mut self, node_id: NodeId) -> Result<()> {
        if !self.store.contains(node_id) {
            return Err(Error::UnknownEntity(node_id));
        }
        let mut frozen = 0usize;
        for node in self.store.nodes_mut() {
            if node.id() == node_id {
                if node.is_fixed() {
                    node.unpin();
                }
            } else {
                node.pin(node.position());
                frozen += 1;
            }
        }
        debug!(node = node_id.get(), frozen = frozen; "Froze all other nodes");
        Ok(())
    }

    /// Queues `mutation` for the next tick.
    pub fn enqueue(&mut self, mutation: Mutation) {
        debug!(mutation = mutation.kind(), pending = self.pending.len() + 1; "Queued mutation");
        self.pending.push_back(mutation);
    }

    /// Number of queued mutations.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::Reconcile(data) => self.reconcile(&data).map(|_| ()),
            Mutation::Expand { node, children } => self.expand(node, &children).map(|_| ()),
            Mutation::Pin { node, at } => self.pin(node, at),
            Mutation::Unpin(node) => self.unpin(node),
            Mutation::FreezeOthers(node) => self.freeze_others(node),
            Mutation::Restart(alpha) => {
                self.restart(alpha);
                Ok(())
            }
            Mutation::Reheat(alpha_target) => {
                self.reheat(alpha_target);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{config::SimulationConfig, store::NodeSpec};

    fn simulation() -> Simulation {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        simulation
            .reconcile(&GraphData::new(
                vec![NodeSpec::new(1).with_position(Point::new(10.0, 20.0))],
                vec![],
            ))
            .unwrap();
        simulation
    }

    #[test]
    fn test_expand_creates_linked_children() {
        let mut simulation = simulation();
        let ids = simulation
            .expand(NodeId::new(1), &[ChildSpec::new(), ChildSpec::new().with_radius(4.0)])
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|id| *id != NodeId::new(1)));
        assert_eq!(simulation.store().len(), 3);
        assert_eq!(simulation.store().link_count(), 2);

        for id in &ids {
            let child = simulation.store().get(*id).unwrap();
            assert_eq!(child.parent(), Some(NodeId::new(1)));
            assert_eq!(child.depth(), 1);
            let offset = child.position().sub_point(Point::new(10.0, 20.0));
            assert!(offset.x().abs() <= 10.0 && offset.y().abs() <= 10.0);
        }
        assert_eq!(simulation.store().get(ids[1]).unwrap().radius(), Some(4.0));
        assert!(simulation.store().get(NodeId::new(1)).unwrap().is_expanded());
    }

    #[test]
    fn test_expand_next_to_the_highest_id() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        simulation
            .reconcile(&GraphData::new(
                vec![NodeSpec::new(5), NodeSpec::new(u64::MAX - 2)],
                vec![],
            ))
            .unwrap();

        let ids = simulation
            .expand(NodeId::new(5), &[ChildSpec::new(), ChildSpec::new()])
            .unwrap();
        assert_eq!(ids, vec![NodeId::new(u64::MAX - 1), NodeId::new(u64::MAX)]);
        assert_eq!(simulation.store().len(), 4);
        assert_eq!(simulation.store().get(NodeId::new(u64::MAX - 2)).unwrap().parent(), None);
    }

    #[test]
    fn test_expand_rejected_when_ids_run_out() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        simulation
            .reconcile(&GraphData::new(
                vec![NodeSpec::new(5), NodeSpec::new(u64::MAX)],
                vec![],
            ))
            .unwrap();
        simulation.run(10_000);
        let before = simulation.snapshot();

        assert_eq!(
            simulation.expand(NodeId::new(5), &[ChildSpec::new(), ChildSpec::new()]),
            Err(Error::IdsExhausted { requested: 2 })
        );
        assert_eq!(simulation.snapshot(), before);
        assert_eq!(simulation.store().len(), 2);
        assert!(!simulation.store().get(NodeId::new(5)).unwrap().is_expanded());
        assert_eq!(simulation.store().get(NodeId::new(u64::MAX)).unwrap().parent(), None);
        assert!(simulation.is_converged());
    }

    #[test]
    fn test_expand_rejects_invalid_children() {
        let mut simulation = simulation();
        let children = [
            ChildSpec::new(),
            ChildSpec::new().with_radius(-1.0),
            ChildSpec::new().with_rest_length(f64::INFINITY),
        ];

        assert_eq!(
            simulation.expand(NodeId::new(1), &children),
            Err(Error::InvalidChild(1))
        );
        assert_eq!(
            simulation.expand(NodeId::new(1), &[ChildSpec::new().with_strength(f64::NAN)]),
            Err(Error::InvalidChild(0))
        );
        assert_eq!(simulation.store().len(), 1);
        assert_eq!(simulation.store().link_count(), 0);
    }

    #[test]
    fn test_expand_twice_rejected() {
        let mut simulation = simulation();
        simulation.expand(NodeId::new(1), &[ChildSpec::new()]).unwrap();

        let before = simulation.snapshot();
        assert_eq!(
            simulation.expand(NodeId::new(1), &[ChildSpec::new()]),
            Err(Error::AlreadyExpanded(NodeId::new(1)))
        );
        assert_eq!(simulation.snapshot(), before);
    }

    #[test]
    fn test_expand_reheats() {
        let mut simulation = simulation();
        simulation.run(10_000);
        assert!(simulation.is_converged());

        simulation.expand(NodeId::new(1), &[ChildSpec::new()]).unwrap();
        assert!(!simulation.is_converged());
        assert!(!simulation.tick().converged);
    }

    #[test]
    fn test_expand_is_reproducible_with_injected_rng() {
        let run = |seed| {
            let mut simulation =
                Simulation::with_rng(SimulationConfig::default(), ChaCha8Rng::seed_from_u64(seed))
                    .unwrap();
            simulation
                .reconcile(&GraphData::positional(1, []))
                .unwrap();
            simulation
                .expand(NodeId::new(0), &[ChildSpec::new(), ChildSpec::new()])
                .unwrap();
            simulation.snapshot()
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }

    #[test]
    fn test_unknown_entity_errors() {
        let mut simulation = simulation();
        let missing = NodeId::new(99);
        let before = simulation.snapshot();

        assert_eq!(
            simulation.expand(missing, &[]),
            Err(Error::UnknownEntity(missing))
        );
        assert_eq!(
            simulation.pin(missing, Point::ORIGIN),
            Err(Error::UnknownEntity(missing))
        );
        assert_eq!(simulation.unpin(missing), Err(Error::UnknownEntity(missing)));
        assert_eq!(
            simulation.freeze_others(missing),
            Err(Error::UnknownEntity(missing))
        );
        assert_eq!(simulation.snapshot(), before);
    }

    #[test]
    fn test_pin_and_unpin() {
        let mut simulation = simulation();
        let id = NodeId::new(1);

        simulation.pin(id, Point::new(-3.0, 4.0)).unwrap();
        let node = simulation.store().get(id).unwrap();
        assert_eq!(node.fixed_position(), Some(Point::new(-3.0, 4.0)));
        assert_eq!(node.position(), Point::new(-3.0, 4.0));

        simulation.unpin(id).unwrap();
        assert!(!simulation.store().get(id).unwrap().is_fixed());
    }

    #[test]
    fn test_freeze_others() {
        let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
        simulation
            .reconcile(&GraphData::positional(4, [(0, 1), (1, 2), (2, 3)]))
            .unwrap();
        simulation.pin(NodeId::new(2), Point::new(1.0, 1.0)).unwrap();

        simulation.freeze_others(NodeId::new(2)).unwrap();
        for node in simulation.store().nodes() {
            if node.id() == NodeId::new(2) {
                assert!(!node.is_fixed());
            } else {
                assert_eq!(node.fixed_position(), Some(node.position()));
            }
        }
    }

    #[test]
    fn test_queue_applies_before_tick_and_skips_rejected() {
        let mut simulation = simulation();
        simulation.enqueue(Mutation::Pin {
            node: NodeId::new(1),
            at: Point::new(0.0, 0.0),
        });
        simulation.enqueue(Mutation::Unpin(NodeId::new(42)));
        simulation.enqueue(Mutation::Expand {
            node: NodeId::new(1),
            children: vec![ChildSpec::new()],
        });
        assert_eq!(simulation.pending(), 3);
        assert_eq!(simulation.store().len(), 1);

        let status = simulation.tick();
        assert!(!status.converged);
        assert_eq!(simulation.pending(), 0);
        assert_eq!(simulation.store().len(), 2);
        assert_eq!(
            simulation.store().get(NodeId::new(1)).unwrap().position(),
            Point::ORIGIN
        );
    }

    #[test]
    fn test_apply_pending_reports_rejections() {
        let mut simulation = simulation();
        simulation.enqueue(Mutation::FreezeOthers(NodeId::new(5)));
        simulation.enqueue(Mutation::Restart(0.4));

        let rejected = simulation.apply_pending();
        assert_eq!(rejected, vec![Error::UnknownEntity(NodeId::new(5))]);
        assert_eq!(simulation.alpha(), 0.4);
    }
}
