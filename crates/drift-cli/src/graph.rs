//! Graph input files.
//!
//! A graph file is TOML describing either an explicit node/link list:
//!
//! ```toml
//! [[nodes]]
//! id = 1
//!
//! [[nodes]]
//! id = 2
//! fixed = { x = 0.0, y = 0.0 }
//!
//! [[links]]
//! source = 1
//! target = 2
//! ```
//!
//! or a nested `[tree]` that is flattened into one.

use log::debug;
use serde::Deserialize;

use drift::{
    GraphData, LinkSpec, NodeSpec,
    hierarchy::{TreeNode, flatten},
    identifier::IdAllocator,
};

use crate::error::GraphFileError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GraphFile {
    nodes: Vec<NodeSpec>,
    links: Vec<LinkSpec>,
    tree: Option<TreeNode>,
}

/// Parses the contents of a graph file.
///
/// # Errors
///
/// Returns [`GraphFileError`] if the TOML is malformed, the file mixes a
/// tree with explicit nodes or links, or the tree needs more fresh ids than
/// are left.
pub fn parse_graph(src: &str) -> Result<GraphData, GraphFileError> {
    let file: GraphFile = toml::from_str(src).map_err(|err| {
        GraphFileError::new(err.message(), src).with_span(err.span())
    })?;

    match file.tree {
        Some(tree) => {
            if !file.nodes.is_empty() || !file.links.is_empty() {
                return Err(GraphFileError::new(
                    "graph file describes both a tree and explicit nodes or links",
                    src,
                )
                .with_help("use either `[tree]` or `[[nodes]]` / `[[links]]`"));
            }
            let data = flatten(&tree, &mut IdAllocator::new())
                .map_err(|err| GraphFileError::new(err.to_string(), src))?;
            debug!(nodes = data.nodes.len(), links = data.links.len(); "Flattened tree");
            Ok(data)
        }
        None => Ok(GraphData::new(file.nodes, file.links)),
    }
}
