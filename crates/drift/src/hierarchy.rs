//! Flattening of hierarchical data into a node/link snapshot.
//!
//! A [`TreeNode`] describes nested data; [`flatten`] turns it into a
//! [`GraphData`] with one node per tree node and one parent → child link per
//! edge. The input tree is never modified: ids missing from the tree come
//! from the caller's [`IdAllocator`].

use serde::{Deserialize, Serialize};

use drift_core::identifier::{IdAllocator, NodeId};

use crate::{
    error::{Error, Result},
    store::{GraphData, LinkSpec, NodeSpec},
};

/// One node of a hierarchical input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeNode {
    pub id: Option<NodeId>,
    pub radius: Option<f64>,
    /// Rest length of the link from this node's parent.
    pub rest_length: Option<f64>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    /// Total number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}

/// Flattens `tree` into nodes (children before parents) and parent → child links.
///
/// Explicit ids are kept. Every tree node without one takes the next id of
/// `ids`, after all explicit ids in the tree have been reserved, so an
/// allocated id never collides with an explicit one. Nodes with children are
/// marked expanded.
///
/// # Errors
///
/// Returns [`Error::IdsExhausted`] if `ids` cannot supply every missing id.
/// No id is consumed in that case.
///
/// # Examples
///
/// ```
/// use drift::hierarchy::{TreeNode, flatten};
/// use drift_core::identifier::{IdAllocator, NodeId};
///
/// let tree = TreeNode::new()
///     .with_id(1)
///     .with_children(vec![TreeNode::new(), TreeNode::new()]);
///
/// let mut ids = IdAllocator::new();
/// let data = flatten(&tree, &mut ids).unwrap();
///
/// assert_eq!(data.nodes.len(), 3);
/// assert_eq!(data.links.len(), 2);
/// assert!(data.links.iter().all(|link| link.source == NodeId::new(1)));
/// ```
pub fn flatten(tree: &TreeNode, ids: &mut IdAllocator) -> Result<GraphData> {
    reserve_explicit(tree, ids);

    let missing = count_missing(tree);
    if !u64::try_from(missing).is_ok_and(|missing| missing <= ids.remaining()) {
        return Err(Error::IdsExhausted { requested: missing });
    }

    let mut data = GraphData::default();
    visit(tree, None, 0, ids, &mut data)?;
    Ok(data)
}

fn reserve_explicit(node: &TreeNode, ids: &mut IdAllocator) {
    if let Some(id) = node.id {
        ids.reserve(id);
    }
    for child in &node.children {
        reserve_explicit(child, ids);
    }
}

fn count_missing(node: &TreeNode) -> usize {
    usize::from(node.id.is_none()) + node.children.iter().map(count_missing).sum::<usize>()
}

fn visit(
    node: &TreeNode,
    parent: Option<NodeId>,
    depth: u32,
    ids: &mut IdAllocator,
    data: &mut GraphData,
) -> Result<()> {
    let id = match node.id {
        Some(id) => id,
        None => ids
            .allocate()
            .ok_or(Error::IdsExhausted { requested: 1 })?,
    };

    if let Some(parent) = parent {
        let mut link = LinkSpec::new(parent, id);
        link.rest_length = node.rest_length;
        data.links.push(link);
    }

    for child in &node.children {
        visit(child, Some(id), depth + 1, ids, data)?;
    }

    let mut spec = NodeSpec::new(id).with_expanded(!node.children.is_empty());
    spec.parent = parent;
    spec.depth = depth;
    spec.radius = node.radius;
    data.nodes.push(spec);
    Ok(())
}
