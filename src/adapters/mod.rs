/*!
Adapter layer: turns a `MetaNetwork` into an object of a target graph library, and any
such object back into a `MetaNetwork`.
*/

use std::borrow::Cow;

use thiserror::Error;
use tracing::debug;

use crate::model::{DynamicMetaNetwork, MetaNetwork, ModelError};

pub mod dict;
pub mod graphs;

pub use dict::{MetaNetworkDict, NetworkDict, NodeDict, NodeSetDict};
pub use graphs::{EdgeData, MergedGraph, MetaGraphs, NetworkGraph, RelationGraph, VertexRef};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Unsupported by the target representation: {0}")]
    UnsupportedFeature(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Target representation for `to_graph_library`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphLibrary {
    /// One `petgraph` graph per network.
    #[default]
    Petgraph,
    /// A single `petgraph` graph holding every node-set and network.
    PetgraphMerged,
    /// Nested maps, see `MetaNetworkDict`.
    Dict,
}

#[derive(Debug, Clone)]
pub enum GraphHandle {
    Networks(MetaGraphs),
    Merged(MergedGraph),
    Dict(MetaNetworkDict),
}

impl GraphHandle {
    pub fn library(&self) -> GraphLibrary {
        match self {
            GraphHandle::Networks(_) => GraphLibrary::Petgraph,
            GraphHandle::Merged(_) => GraphLibrary::PetgraphMerged,
            GraphHandle::Dict(_) => GraphLibrary::Dict,
        }
    }
}

impl MetaNetwork {
    pub fn to_graph_library(&self, library: GraphLibrary) -> Result<GraphHandle, AdapterError> {
        debug!("converting meta-network to {library:?}");
        Ok(match library {
            GraphLibrary::Petgraph => GraphHandle::Networks(MetaGraphs::build(self)?),
            GraphLibrary::PetgraphMerged => GraphHandle::Merged(MergedGraph::build(self)?),
            GraphLibrary::Dict => GraphHandle::Dict(self.to_dict()),
        })
    }

    pub fn to_dict(&self) -> MetaNetworkDict {
        MetaNetworkDict::from(self)
    }
}

impl DynamicMetaNetwork {
    /// Converts every slice, in order.
    pub fn to_graph_library(&self, library: GraphLibrary) -> Result<Vec<GraphHandle>, AdapterError> {
        self.metanetworks
            .iter()
            .map(|mn| mn.to_graph_library(library))
            .collect()
    }
}

/// Anything that can be written out as DyNetML.
pub trait ToMetaNetwork {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError>;
}

impl ToMetaNetwork for MetaNetwork {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError> {
        Ok(Cow::Borrowed(self))
    }
}

impl ToMetaNetwork for MetaGraphs {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError> {
        Ok(Cow::Owned(self.to_model()?))
    }
}

impl ToMetaNetwork for MergedGraph {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError> {
        Ok(Cow::Owned(self.to_model()?))
    }
}

impl ToMetaNetwork for MetaNetworkDict {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError> {
        Ok(Cow::Owned(self.to_model()?))
    }
}

impl ToMetaNetwork for GraphHandle {
    fn to_meta_network(&self) -> Result<Cow<'_, MetaNetwork>, AdapterError> {
        match self {
            GraphHandle::Networks(g) => g.to_meta_network(),
            GraphHandle::Merged(g) => g.to_meta_network(),
            GraphHandle::Dict(d) => d.to_meta_network(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, NetworkHeader, Node, NodeSet};

    fn pair() -> MetaNetwork {
        let mut mn = MetaNetwork::with_id("pair");
        mn.add_nodeset(NodeSet::new("Agent", "Agent")).unwrap();
        mn.add_node("Agent", Node::new("a")).unwrap();
        mn.add_node("Agent", Node::new("b")).unwrap();
        mn.add_network(NetworkHeader::new(
            "interacts",
            ("Agent", "Agent"),
            ("Agent", "Agent"),
            true,
        ))
        .unwrap();
        mn.add_link("interacts", Link::new("a", "b", 1.0)).unwrap();
        mn
    }

    #[test]
    fn test_every_handle_converts_back() {
        let mn = pair();
        for library in [
            GraphLibrary::Petgraph,
            GraphLibrary::PetgraphMerged,
            GraphLibrary::Dict,
        ] {
            let handle = mn.to_graph_library(library).unwrap();
            assert_eq!(handle.library(), library);
            assert_eq!(handle.to_meta_network().unwrap().as_ref(), &mn);
        }
    }

    #[test]
    fn test_dynamic_converts_each_slice() {
        let mut dmn = DynamicMetaNetwork::new();
        dmn.metanetworks.push(pair());
        dmn.metanetworks.push(MetaNetwork::with_id("empty"));
        let handles = dmn.to_graph_library(GraphLibrary::PetgraphMerged).unwrap();
        assert_eq!(handles.len(), 2);
        let GraphHandle::Merged(empty) = &handles[1] else {
            panic!("expected a merged graph");
        };
        assert_eq!(empty.graph.node_count(), 0);
    }
}
