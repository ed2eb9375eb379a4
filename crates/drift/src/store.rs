//! Entity store and reconciliation.
//!
//! The [`EntityStore`] is the authoritative owner of every simulated node and
//! link, indexed by id. [`EntityStore::reconcile`] maps an incoming
//! [`GraphData`] snapshot onto the stored identities:
//!
//! - **entered** ids get fresh nodes, seeded next to their already-placed
//!   neighbours (or the layout center) with zero velocity;
//! - **updated** ids keep position, velocity and pin untouched;
//! - **exited** ids are dropped together with every link touching them.
//!
//! A snapshot that fails validation is rejected before anything is modified.

use std::f64::consts::PI;

use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use drift_core::{
    geometry::Point,
    identifier::{IdAllocator, LinkKey, NodeId},
};

use crate::error::{Error, IdentityError, Result};

/// A simulated node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    position: Point,
    velocity: Point,
    fixed: Option<Point>,
    depth: u32,
    parent: Option<NodeId>,
    radius: Option<f64>,
    expanded: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, position: Point) -> Self {
        Self {
            id,
            position,
            velocity: Point::ORIGIN,
            fixed: None,
            depth: 0,
            parent: None,
            radius: None,
            expanded: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    /// The pinned position, if the node is excluded from integration.
    pub fn fixed_position(&self) -> Option<Point> {
        self.fixed
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Id of the node this one was expanded from.
    ///
    /// This is a lookup key into the store, never ownership.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Collision radius override.
    pub fn radius(&self) -> Option<f64> {
        self.radius
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub(crate) fn set_motion(&mut self, position: Point, velocity: Point) {
        self.position = position;
        self.velocity = velocity;
    }

    pub(crate) fn pin(&mut self, at: Point) {
        self.fixed = Some(at);
        self.position = at;
        self.velocity = Point::ORIGIN;
    }

    pub(crate) fn unpin(&mut self) {
        self.fixed = None;
        self.velocity = Point::ORIGIN;
    }

    pub(crate) fn set_expanded(&mut self) {
        self.expanded = true;
    }

    pub(crate) fn with_lineage(mut self, parent: Option<NodeId>, depth: u32) -> Self {
        self.parent = parent;
        self.depth = depth;
        self
    }

    pub(crate) fn with_radius(mut self, radius: Option<f64>) -> Self {
        self.radius = radius;
        self
    }
}

/// A spring between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    key: LinkKey,
    rest_length: Option<f64>,
    strength: Option<f64>,
}

impl Link {
    pub(crate) fn new(key: LinkKey, rest_length: Option<f64>, strength: Option<f64>) -> Self {
        Self {
            key,
            rest_length,
            strength,
        }
    }

    pub fn key(&self) -> LinkKey {
        self.key
    }

    pub fn source(&self) -> NodeId {
        self.key.source
    }

    pub fn target(&self) -> NodeId {
        self.key.target
    }

    /// Explicit rest length, overriding the configured policy.
    pub fn rest_length(&self) -> Option<f64> {
        self.rest_length
    }

    /// Explicit strength, overriding the configured policy.
    pub fn strength(&self) -> Option<f64> {
        self.strength
    }
}

/// Description of one node in an incoming snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub id: NodeId,
    /// Initial position, used only when the node enters.
    #[serde(default)]
    pub position: Option<Point>,
    /// Initial pin, used only when the node enters.
    #[serde(default)]
    pub fixed: Option<Point>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub expanded: bool,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            position: None,
            fixed: None,
            depth: 0,
            parent: None,
            radius: None,
            expanded: false,
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_fixed(mut self, fixed: Point) -> Self {
        self.fixed = Some(fixed);
        self
    }

    pub fn with_parent(mut self, parent: NodeId, depth: u32) -> Self {
        self.parent = Some(parent);
        self.depth = depth;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }
}

/// Description of one link in an incoming snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub rest_length: Option<f64>,
    #[serde(default)]
    pub strength: Option<f64>,
}

impl LinkSpec {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rest_length: None,
            strength: None,
        }
    }

    pub fn with_rest_length(mut self, rest_length: f64) -> Self {
        self.rest_length = Some(rest_length);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.source, self.target)
    }
}

/// A complete node/link snapshot to reconcile against the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphData {
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
}

impl GraphData {
    pub fn new(nodes: Vec<NodeSpec>, links: Vec<LinkSpec>) -> Self {
        Self { nodes, links }
    }

    /// Builds a snapshot keyed by position: node `i` gets id `i`.
    ///
    /// Only suitable for data whose order never changes. Reordering a
    /// positionally keyed sequence silently hands one entity's motion state
    /// to another on the next reconcile; use explicit ids whenever nodes
    /// persist across updates.
    pub fn positional(count: usize, links: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            nodes: (0..count as u64).map(NodeSpec::new).collect(),
            links: links
                .into_iter()
                .map(|(source, target)| LinkSpec::new(source as u64, target as u64))
                .collect(),
        }
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub entered: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub exited: Vec<NodeId>,
    pub links_entered: Vec<LinkKey>,
    pub links_exited: Vec<LinkKey>,
}

impl ReconcileResult {
    /// Checks whether the snapshot described exactly the stored structure.
    pub fn is_unchanged(&self) -> bool {
        self.entered.is_empty()
            && self.exited.is_empty()
            && self.links_entered.is_empty()
            && self.links_exited.is_empty()
    }
}

/// Seeding parameters for entered nodes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Seeding {
    pub center: Point,
    pub initial_radius: f64,
}

/// A per-node radius must be a finite, non-negative number.
pub(crate) fn is_valid_radius(radius: Option<f64>) -> bool {
    radius.is_none_or(|radius| radius.is_finite() && radius >= 0.0)
}

/// A per-link rest length must be finite and non-negative, a strength finite.
pub(crate) fn is_valid_link_parameters(rest_length: Option<f64>, strength: Option<f64>) -> bool {
    rest_length.is_none_or(|length| length.is_finite() && length >= 0.0)
        && strength.is_none_or(f64::is_finite)
}

/// Offset of the `index`-th seeded node on a phyllotaxis spiral.
pub(crate) fn spiral_offset(index: usize, radius: f64) -> Point {
    let golden_angle = PI * (3.0 - 5f64.sqrt());
    let r = radius * (0.5 + index as f64).sqrt();
    let angle = index as f64 * golden_angle;
    Point::new(r * angle.cos(), r * angle.sin())
}

/// Owner of all simulated nodes and links.
///
/// Iteration order follows the order of the last reconciled snapshot, with
/// expanded children appended, so every pass over the store is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    nodes: IndexMap<NodeId, Node>,
    links: IndexMap<LinkKey, Link>,
    ids: IdAllocator,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Dense index of `id` in iteration order.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl ExactSizeIterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn links(&self) -> impl ExactSizeIterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of links touching each node, by dense index.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for link in self.links.values() {
            for endpoint in [link.source(), link.target()] {
                if let Some(index) = self.index_of(endpoint) {
                    degrees[index] += 1;
                }
            }
        }
        degrees
    }

    /// Hands out `count` fresh ids, or none at all if fewer are left.
    pub(crate) fn allocate_ids(&mut self, count: usize) -> Result<Vec<NodeId>> {
        let exhausted = Error::IdsExhausted { requested: count };
        if !u64::try_from(count).is_ok_and(|count| count <= self.ids.remaining()) {
            return Err(exhausted);
        }
        (0..count)
            .map(|_| self.ids.allocate().ok_or_else(|| exhausted.clone()))
            .collect()
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.ids.reserve(node.id);
        self.nodes.insert(node.id, node);
    }

    pub(crate) fn insert_link(&mut self, link: Link) {
        self.links.insert(link.key, link);
    }

    /// Maps a snapshot onto the stored identities.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] (wrapped in [`crate::Error::Identity`]) if
    /// the snapshot repeats a node id or a link, or contains a link whose
    /// endpoint is not among its nodes. The store is untouched in that case.
    pub(crate) fn reconcile(
        &mut self,
        data: &GraphData,
        seeding: Seeding,
    ) -> Result<ReconcileResult> {
        let incoming = Self::validate(data)?;

        let mut adjacency: IndexMap<NodeId, Vec<NodeId>> = IndexMap::new();
        for link in &data.links {
            adjacency.entry(link.source).or_default().push(link.target);
            adjacency.entry(link.target).or_default().push(link.source);
        }

        let mut result = ReconcileResult::default();
        let mut nodes: IndexMap<NodeId, Node> = IndexMap::with_capacity(data.nodes.len());
        let mut seeded = 0usize;

        for spec in &data.nodes {
            let node = match self.nodes.get(&spec.id) {
                Some(existing) => {
                    result.updated.push(spec.id);
                    let mut node = existing.clone();
                    node.depth = spec.depth;
                    node.parent = spec.parent;
                    node.radius = spec.radius;
                    node.expanded |= spec.expanded;
                    node
                }
                None => {
                    result.entered.push(spec.id);
                    let position = match spec.fixed.or(spec.position) {
                        Some(position) => position,
                        None => {
                            let anchors = adjacency
                                .get(&spec.id)
                                .into_iter()
                                .flatten()
                                .filter_map(|neighbor| {
                                    nodes.get(neighbor).map(Node::position).or_else(|| {
                                        incoming
                                            .contains(neighbor)
                                            .then(|| self.nodes.get(neighbor).map(Node::position))
                                            .flatten()
                                    })
                                });
                            let anchor = Point::centroid(anchors).unwrap_or(seeding.center);
                            let offset = spiral_offset(seeded, seeding.initial_radius);
                            seeded += 1;
                            anchor.add_point(offset)
                        }
                    };

                    let mut node = Node::new(spec.id, position)
                        .with_lineage(spec.parent, spec.depth)
                        .with_radius(spec.radius);
                    node.fixed = spec.fixed;
                    node.expanded = spec.expanded;
                    node
                }
            };
            nodes.insert(spec.id, node);
        }

        result.exited = self
            .nodes
            .keys()
            .filter(|id| !incoming.contains(*id))
            .copied()
            .collect();

        let links: IndexMap<LinkKey, Link> = data
            .links
            .iter()
            .map(|spec| {
                let key = spec.key();
                (key, Link::new(key, spec.rest_length, spec.strength))
            })
            .collect();

        result.links_entered = links
            .keys()
            .filter(|key| !self.links.contains_key(*key))
            .copied()
            .collect();
        result.links_exited = self
            .links
            .keys()
            .filter(|key| !links.contains_key(*key))
            .copied()
            .collect();

        for id in &incoming {
            self.ids.reserve(*id);
        }
        self.nodes = nodes;
        self.links = links;

        info!(
            entered = result.entered.len(),
            updated = result.updated.len(),
            exited = result.exited.len(),
            links = self.links.len();
            "Reconciled snapshot"
        );
        debug!(
            links_entered = result.links_entered.len(),
            links_exited = result.links_exited.len();
            "Rebuilt link set"
        );

        Ok(result)
    }

    fn validate(data: &GraphData) -> Result<IndexSet<NodeId>> {
        let mut ids = IndexSet::with_capacity(data.nodes.len());
        for spec in &data.nodes {
            if !ids.insert(spec.id) {
                return Err(IdentityError::DuplicateNode(spec.id).into());
            }
            if !is_valid_radius(spec.radius) {
                return Err(IdentityError::InvalidRadius(spec.id).into());
            }
        }

        let mut keys = IndexSet::with_capacity(data.links.len());
        for spec in &data.links {
            let key = spec.key();
            for endpoint in [spec.source, spec.target] {
                if !ids.contains(&endpoint) {
                    return Err(IdentityError::DanglingLink {
                        link: key,
                        missing: endpoint,
                    }
                    .into());
                }
            }
            if !keys.insert(key) {
                return Err(IdentityError::DuplicateLink(key).into());
            }
            if !is_valid_link_parameters(spec.rest_length, spec.strength) {
                return Err(IdentityError::InvalidLinkParameters(key).into());
            }
        }

        Ok(ids)
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    /// A connected-ish random graph over ids `0..n` plus a removal mask.
    fn graph_and_mask_strategy() -> impl Strategy<Value = (GraphData, Vec<bool>)> {
        (2usize..24).prop_flat_map(|n| {
            (
                prop::collection::vec((0..n, 0..n), 0..(n * 2)),
                prop::collection::vec(any::<bool>(), n),
            )
                .prop_map(move |(pairs, mask)| {
                    let mut seen = IndexSet::new();
                    let links = pairs
                        .into_iter()
                        .filter(|(s, t)| s != t && seen.insert((*s, *t)))
                        .collect::<Vec<_>>();
                    (GraphData::positional(n, links), mask)
                })
        })
    }

    fn seeding() -> Seeding {
        Seeding {
            center: Point::ORIGIN,
            initial_radius: 10.0,
        }
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Removing random nodes (and every link touching them) never leaves an orphan link.
    fn check_no_dangling_links(data: GraphData, mask: Vec<bool>) -> std::result::Result<(), TestCaseError> {
        let mut store = EntityStore::new();
        store.reconcile(&data, seeding()).unwrap();

        let kept: IndexSet<NodeId> = data
            .nodes
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(spec, _)| spec.id)
            .collect();
        let reduced = GraphData::new(
            data.nodes
                .iter()
                .filter(|spec| kept.contains(&spec.id))
                .cloned()
                .collect(),
            data.links
                .iter()
                .filter(|spec| kept.contains(&spec.source) && kept.contains(&spec.target))
                .cloned()
                .collect(),
        );
        store.reconcile(&reduced, seeding()).unwrap();

        for link in store.links() {
            prop_assert!(store.contains(link.source()));
            prop_assert!(store.contains(link.target()));
        }
        prop_assert_eq!(store.len(), kept.len());
        Ok(())
    }

    /// Reconciling the same snapshot twice leaves every node bit-identical.
    fn check_reconcile_is_idempotent(data: GraphData) -> std::result::Result<(), TestCaseError> {
        let mut store = EntityStore::new();
        store.reconcile(&data, seeding()).unwrap();
        let before: Vec<Node> = store.nodes().cloned().collect();

        let result = store.reconcile(&data, seeding()).unwrap();
        let after: Vec<Node> = store.nodes().cloned().collect();

        prop_assert!(result.is_unchanged());
        prop_assert_eq!(before, after);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn no_dangling_links((data, mask) in graph_and_mask_strategy()) {
            check_no_dangling_links(data, mask)?;
        }

        #[test]
        fn reconcile_is_idempotent((data, _mask) in graph_and_mask_strategy()) {
            check_reconcile_is_idempotent(data)?;
        }
    }
}
