/*!
`petgraph` renditions of a meta-network.

Vertices carry a `VertexRef` (node-set + node id); node attributes and properties stay on
the `NodeSet`s carried alongside the graph, so an edited graph can be folded back into a
`MetaNetwork`. Edges carry an `EdgeData` tagged with the network they came from.
*/

use std::collections::{BTreeMap, HashMap};

use petgraph::{
    EdgeType,
    graph::{DiGraph, Graph, NodeIndex, UnGraph},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    adapters::AdapterError,
    model::{
        Link, MetaNetwork, ModelError, Network, NetworkHeader, NodeSet, PropertyIdentity,
        PropertyValue,
    },
};

/// Vertex payload: which node of which node-set this vertex stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexRef {
    pub nodeset: String,
    pub node: String,
}

impl VertexRef {
    pub fn new(nodeset: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            nodeset: nodeset.into(),
            node: node.into(),
        }
    }
}

/// Edge payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Id of the network the link belongs to.
    pub network: String,
    pub weight: f64,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum RelationGraph {
    Directed(DiGraph<VertexRef, EdgeData>),
    Undirected(UnGraph<VertexRef, EdgeData>),
}

impl RelationGraph {
    pub fn is_directed(&self) -> bool {
        matches!(self, RelationGraph::Directed(_))
    }

    pub fn node_count(&self) -> usize {
        match self {
            RelationGraph::Directed(g) => g.node_count(),
            RelationGraph::Undirected(g) => g.node_count(),
        }
    }

    pub fn edge_count(&self) -> usize {
        match self {
            RelationGraph::Directed(g) => g.edge_count(),
            RelationGraph::Undirected(g) => g.edge_count(),
        }
    }

    pub fn vertices(&self) -> Vec<&VertexRef> {
        match self {
            RelationGraph::Directed(g) => g.node_weights().collect(),
            RelationGraph::Undirected(g) => g.node_weights().collect(),
        }
    }

    /// Every edge as (source vertex, target vertex, payload), in insertion order.
    pub fn edges(&self) -> Vec<(&VertexRef, &VertexRef, &EdgeData)> {
        match self {
            RelationGraph::Directed(g) => edge_triples(g),
            RelationGraph::Undirected(g) => edge_triples(g),
        }
    }
}

fn edge_triples<Ty: EdgeType>(
    graph: &Graph<VertexRef, EdgeData, Ty>,
) -> Vec<(&VertexRef, &VertexRef, &EdgeData)> {
    graph
        .edge_references()
        .map(|e| (&graph[e.source()], &graph[e.target()], e.weight()))
        .collect()
}

/// One graph per network.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    pub header: NetworkHeader,
    pub graph: RelationGraph,
    pub index: HashMap<VertexRef, NodeIndex>,
}

/// A meta-network as a set of per-network graphs sharing the same node-sets.
#[derive(Debug, Clone)]
pub struct MetaGraphs {
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    pub nodesets: BTreeMap<String, NodeSet>,
    pub networks: BTreeMap<String, NetworkGraph>,
}

/// Every node-set and every network folded into a single graph.
#[derive(Debug, Clone)]
pub struct MergedGraph {
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    pub nodesets: BTreeMap<String, NodeSet>,
    pub headers: BTreeMap<String, NetworkHeader>,
    pub graph: RelationGraph,
    pub index: HashMap<VertexRef, NodeIndex>,
}

impl MetaGraphs {
    pub fn build(mn: &MetaNetwork) -> Result<Self, AdapterError> {
        let mut networks = BTreeMap::new();
        for network in mn.networks() {
            let nodesets = endpoint_nodesets(mn, &network.header)?;
            let (graph, index) = if network.is_directed() {
                let (g, index) = build_graph::<petgraph::Directed>(&nodesets, [network])?;
                (RelationGraph::Directed(g), index)
            } else {
                let (g, index) = build_graph::<petgraph::Undirected>(&nodesets, [network])?;
                (RelationGraph::Undirected(g), index)
            };
            debug!(
                "network {}: {} vertices, {} edges",
                network.id(),
                graph.node_count(),
                graph.edge_count()
            );
            networks.insert(
                network.id().to_string(),
                NetworkGraph {
                    header: network.header.clone(),
                    graph,
                    index,
                },
            );
        }
        Ok(Self {
            attributes: mn.attributes.clone(),
            properties: mn.properties.clone(),
            property_identities: mn.property_identities.clone(),
            nodesets: mn.nodesets().map(|s| (s.id.clone(), s.clone())).collect(),
            networks,
        })
    }

    pub fn network(&self, network_id: &str) -> Option<&NetworkGraph> {
        self.networks.get(network_id)
    }

    /// Folds the graphs back into a model, re-checking every link endpoint.
    pub fn to_model(&self) -> Result<MetaNetwork, AdapterError> {
        let mut mn = shell(&self.attributes, &self.properties, &self.property_identities);
        for nodeset in self.nodesets.values() {
            mn.add_nodeset(nodeset.clone())?;
        }
        for network in self.networks.values() {
            mn.add_network(network.header.clone())?;
            for (source, target, data) in network.graph.edges() {
                let link = link_from_edge(&network.header, network.graph.is_directed(), source, target, data)?;
                mn.add_link(&network.header.id, link)?;
            }
        }
        Ok(mn)
    }
}

impl MergedGraph {
    pub fn build(mn: &MetaNetwork) -> Result<Self, AdapterError> {
        let directed = mn.networks().filter(|n| n.is_directed()).count();
        let undirected = mn.networks().count() - directed;
        if directed > 0 && undirected > 0 {
            return Err(AdapterError::UnsupportedFeature(format!(
                "a merged graph cannot mix {directed} directed and {undirected} undirected networks"
            )));
        }

        let nodesets: Vec<&NodeSet> = mn.nodesets().collect();
        let (graph, index) = if undirected > 0 {
            let (g, index) = build_graph::<petgraph::Undirected>(&nodesets, mn.networks())?;
            (RelationGraph::Undirected(g), index)
        } else {
            let (g, index) = build_graph::<petgraph::Directed>(&nodesets, mn.networks())?;
            (RelationGraph::Directed(g), index)
        };
        debug!(
            "merged graph: {} vertices, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Self {
            attributes: mn.attributes.clone(),
            properties: mn.properties.clone(),
            property_identities: mn.property_identities.clone(),
            nodesets: nodesets.iter().map(|s| (s.id.clone(), (*s).clone())).collect(),
            headers: mn
                .networks()
                .map(|n| (n.id().to_string(), n.header.clone()))
                .collect(),
            graph,
            index,
        })
    }

    pub fn to_model(&self) -> Result<MetaNetwork, AdapterError> {
        let mut mn = shell(&self.attributes, &self.properties, &self.property_identities);
        for nodeset in self.nodesets.values() {
            mn.add_nodeset(nodeset.clone())?;
        }
        for header in self.headers.values() {
            mn.add_network(header.clone())?;
        }
        for (source, target, data) in self.graph.edges() {
            let header = self
                .headers
                .get(&data.network)
                .ok_or_else(|| ModelError::UnknownNetwork(data.network.clone()))?;
            let link = link_from_edge(header, self.graph.is_directed(), source, target, data)?;
            mn.add_link(&header.id, link)?;
        }
        Ok(mn)
    }
}

fn shell(
    attributes: &BTreeMap<String, String>,
    properties: &BTreeMap<String, PropertyValue>,
    property_identities: &BTreeMap<String, PropertyIdentity>,
) -> MetaNetwork {
    let mut mn = MetaNetwork::new();
    mn.attributes = attributes.clone();
    mn.properties = properties.clone();
    mn.property_identities = property_identities.clone();
    mn
}

fn endpoint_nodesets<'a>(
    mn: &'a MetaNetwork,
    header: &NetworkHeader,
) -> Result<Vec<&'a NodeSet>, AdapterError> {
    let mut nodesets = vec![mn.nodeset(&header.source)?];
    if header.target != header.source {
        nodesets.push(mn.nodeset(&header.target)?);
    }
    Ok(nodesets)
}

/// Adds every node of `nodesets` as a vertex, then one edge per link of `networks`.
fn build_graph<'a, Ty: EdgeType>(
    nodesets: &[&NodeSet],
    networks: impl IntoIterator<Item = &'a Network>,
) -> Result<(Graph<VertexRef, EdgeData, Ty>, HashMap<VertexRef, NodeIndex>), AdapterError> {
    let mut graph = Graph::<VertexRef, EdgeData, Ty>::default();
    let mut index = HashMap::new();
    for nodeset in nodesets {
        for node_id in nodeset.node_ids() {
            let vertex = VertexRef::new(&nodeset.id, node_id);
            let node_index = graph.add_node(vertex.clone());
            index.insert(vertex, node_index);
        }
    }

    for network in networks {
        let header = &network.header;
        for link in &network.links {
            let source = lookup(&index, header, &header.source, &link.source)?;
            let target = lookup(&index, header, &header.target, &link.target)?;
            graph.add_edge(
                source,
                target,
                EdgeData {
                    network: header.id.clone(),
                    weight: link.weight,
                    attributes: link.attributes.clone(),
                },
            );
        }
    }
    Ok((graph, index))
}

fn lookup(
    index: &HashMap<VertexRef, NodeIndex>,
    header: &NetworkHeader,
    nodeset: &str,
    node: &str,
) -> Result<NodeIndex, AdapterError> {
    index
        .get(&VertexRef::new(nodeset, node))
        .copied()
        .ok_or_else(|| {
            ModelError::DanglingReference {
                network: header.id.clone(),
                nodeset: nodeset.to_string(),
                node: node.to_string(),
            }
            .into()
        })
}

/// Maps an edge back onto a link of `header`. Undirected edges may have been added in
/// either orientation, so the endpoints are swapped when only that order fits.
fn link_from_edge(
    header: &NetworkHeader,
    is_directed: bool,
    source: &VertexRef,
    target: &VertexRef,
    data: &EdgeData,
) -> Result<Link, AdapterError> {
    let fits = |s: &VertexRef, t: &VertexRef| s.nodeset == header.source && t.nodeset == header.target;
    let (source, target) = if fits(source, target) {
        (source, target)
    } else if !is_directed && fits(target, source) {
        (target, source)
    } else {
        let stray = if source.nodeset != header.source { source } else { target };
        return Err(ModelError::DanglingReference {
            network: header.id.clone(),
            nodeset: stray.nodeset.clone(),
            node: stray.node.clone(),
        }
        .into());
    };
    let mut link = Link::new(&source.node, &target.node, data.weight);
    link.attributes = data.attributes.clone();
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn bipartite(directed: bool) -> MetaNetwork {
        let mut mn = MetaNetwork::with_id("bipartite");
        mn.add_nodeset(NodeSet::new("Agent", "Agent")).unwrap();
        mn.add_nodeset(NodeSet::new("Tweet", "Event")).unwrap();
        for id in ["a1", "a2"] {
            mn.add_node("Agent", Node::new(id)).unwrap();
        }
        for id in ["t1", "t2", "t3"] {
            mn.add_node("Tweet", Node::new(id)).unwrap();
        }
        mn.add_network(NetworkHeader::new(
            "sent",
            ("Agent", "Agent"),
            ("Tweet", "Event"),
            directed,
        ))
        .unwrap();
        mn.add_link("sent", Link::new("a1", "t1", 1.0)).unwrap();
        mn.add_link("sent", Link::new("a2", "t3", 3.0)).unwrap();
        mn
    }

    #[test]
    fn test_per_network_graph_holds_both_nodesets() {
        let graphs = MetaGraphs::build(&bipartite(true)).unwrap();
        let sent = graphs.network("sent").unwrap();
        assert!(sent.graph.is_directed());
        assert_eq!(sent.graph.node_count(), 5);
        assert_eq!(sent.graph.edge_count(), 2);
        let (s, t, data) = sent.graph.edges()[1];
        assert_eq!(s, &VertexRef::new("Agent", "a2"));
        assert_eq!(t, &VertexRef::new("Tweet", "t3"));
        assert_eq!(data.weight, 3.0);
    }

    #[test]
    fn test_reversed_undirected_edge_folds_back() {
        let mut graphs = MetaGraphs::build(&bipartite(false)).unwrap();
        let sent = graphs.networks.get_mut("sent").unwrap();
        let t2 = sent.index[&VertexRef::new("Tweet", "t2")];
        let a1 = sent.index[&VertexRef::new("Agent", "a1")];
        let RelationGraph::Undirected(g) = &mut sent.graph else {
            panic!("expected an undirected graph");
        };
        g.add_edge(
            t2,
            a1,
            EdgeData {
                network: "sent".into(),
                weight: 2.0,
                attributes: BTreeMap::new(),
            },
        );

        let mn = graphs.to_model().unwrap();
        let links = &mn.network("sent").unwrap().links;
        assert_eq!(links.len(), 3);
        assert_eq!(links[2], Link::new("a1", "t2", 2.0));
    }

    #[test]
    fn test_edited_graph_with_foreign_vertex_is_rejected() {
        let mut graphs = MetaGraphs::build(&bipartite(true)).unwrap();
        let sent = graphs.networks.get_mut("sent").unwrap();
        let RelationGraph::Directed(g) = &mut sent.graph else {
            panic!("expected a directed graph");
        };
        let ghost = g.add_node(VertexRef::new("Agent", "ghost"));
        let t1 = sent.index[&VertexRef::new("Tweet", "t1")];
        g.add_edge(
            ghost,
            t1,
            EdgeData {
                network: "sent".into(),
                weight: 1.0,
                attributes: BTreeMap::new(),
            },
        );
        let err = graphs.to_model().unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Model(ModelError::DanglingReference { ref node, .. }) if node == "ghost"
        ));
    }

    #[test]
    fn test_merged_graph_rejects_mixed_directedness() {
        let mut mn = bipartite(true);
        mn.add_network(NetworkHeader::new(
            "co-tweet",
            ("Agent", "Agent"),
            ("Agent", "Agent"),
            false,
        ))
        .unwrap();
        assert!(matches!(
            MergedGraph::build(&mn),
            Err(AdapterError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_merged_graph_round_trip() {
        let mn = bipartite(false);
        let merged = MergedGraph::build(&mn).unwrap();
        assert!(!merged.graph.is_directed());
        assert_eq!(merged.graph.node_count(), 5);
        assert_eq!(merged.to_model().unwrap(), mn);
    }
}
