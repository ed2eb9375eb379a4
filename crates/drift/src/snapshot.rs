//! Read-only views of the layout for renderers and persistence.

use serde::{Deserialize, Serialize};

use drift_core::{
    geometry::{Bounds, Point},
    identifier::{LinkKey, NodeId},
};

use crate::store::EntityStore;

/// Motion state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<Point>,
}

impl NodeState {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Endpoint positions of one link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub key: LinkKey,
    pub source: Point,
    pub target: Point,
}

/// Positions of every node and link, in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub nodes: Vec<NodeState>,
    pub links: Vec<LinkState>,
}

impl Snapshot {
    pub(crate) fn capture(store: &EntityStore) -> Self {
        let nodes = store
            .nodes()
            .map(|node| NodeState {
                id: node.id(),
                x: node.position().x(),
                y: node.position().y(),
                vx: node.velocity().x(),
                vy: node.velocity().y(),
                fixed: node.fixed_position(),
            })
            .collect();

        let links = store
            .links()
            .filter_map(|link| {
                let source = store.get(link.source())?.position();
                let target = store.get(link.target())?.position();
                Some(LinkState {
                    key: link.key(),
                    source,
                    target,
                })
            })
            .collect();

        Self { nodes, links }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Smallest rectangle containing every node position.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.nodes.iter().map(NodeState::position))
    }
}

/// Receiver of per-tick snapshots, such as a renderer.
pub trait RenderSink {
    fn on_tick(&mut self, snapshot: &Snapshot);
}

impl<F: FnMut(&Snapshot)> RenderSink for F {
    fn on_tick(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}
