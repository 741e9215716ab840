/*!
Plain-data ("dictionary") form of a meta-network: nested maps that serialize straight to
JSON with `serde`.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    adapters::AdapterError,
    model::{Link, MetaNetwork, NetworkHeader, Node, NodeSet, PropertyIdentity, PropertyValue},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaNetworkDict {
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    pub nodesets: BTreeMap<String, NodeSetDict>,
    pub networks: BTreeMap<String, NetworkDict>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSetDict {
    pub node_type: String,
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    pub nodes: BTreeMap<String, NodeDict>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDict {
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDict {
    pub source: String,
    pub source_type: String,
    pub target: String,
    pub target_type: String,
    pub is_directed: bool,
    pub allow_self_loops: bool,
    pub is_binary: bool,
    pub attributes: BTreeMap<String, String>,
    pub links: Vec<Link>,
}

impl From<&MetaNetwork> for MetaNetworkDict {
    fn from(mn: &MetaNetwork) -> Self {
        let nodesets = mn
            .nodesets()
            .map(|set| {
                let nodes = set
                    .nodes
                    .values()
                    .map(|node| {
                        (
                            node.id.clone(),
                            NodeDict {
                                attributes: node.attributes.clone(),
                                properties: node.properties.clone(),
                            },
                        )
                    })
                    .collect();
                (
                    set.id.clone(),
                    NodeSetDict {
                        node_type: set.node_type.clone(),
                        property_identities: set.property_identities.clone(),
                        nodes,
                    },
                )
            })
            .collect();

        let networks = mn
            .networks()
            .map(|network| {
                let h = &network.header;
                (
                    h.id.clone(),
                    NetworkDict {
                        source: h.source.clone(),
                        source_type: h.source_type.clone(),
                        target: h.target.clone(),
                        target_type: h.target_type.clone(),
                        is_directed: h.is_directed,
                        allow_self_loops: h.allow_self_loops,
                        is_binary: h.is_binary,
                        attributes: h.attributes.clone(),
                        links: network.links.clone(),
                    },
                )
            })
            .collect();

        Self {
            attributes: mn.attributes.clone(),
            properties: mn.properties.clone(),
            property_identities: mn.property_identities.clone(),
            nodesets,
            networks,
        }
    }
}

impl MetaNetworkDict {
    pub fn node_count(&self) -> usize {
        self.nodesets.values().map(|set| set.nodes.len()).sum()
    }

    pub fn link_count(&self) -> usize {
        self.networks.values().map(|n| n.links.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Rebuilds the model through its checked constructors.
    pub fn to_model(&self) -> Result<MetaNetwork, AdapterError> {
        let mut mn = MetaNetwork::new();
        mn.attributes = self.attributes.clone();
        mn.properties = self.properties.clone();
        mn.property_identities = self.property_identities.clone();

        for (id, set) in &self.nodesets {
            let mut nodeset = NodeSet::new(id, &set.node_type);
            nodeset.property_identities = set.property_identities.clone();
            mn.add_nodeset(nodeset)?;
            for (node_id, node) in &set.nodes {
                let mut built = Node::with_properties(node_id, node.properties.clone());
                built.attributes = node.attributes.clone();
                mn.add_node(id, built)?;
            }
        }

        for (id, network) in &self.networks {
            let mut header = NetworkHeader::new(
                id,
                (&network.source, &network.source_type),
                (&network.target, &network.target_type),
                network.is_directed,
            );
            header.allow_self_loops = network.allow_self_loops;
            header.is_binary = network.is_binary;
            header.attributes = network.attributes.clone();
            mn.add_network(header)?;
            for link in &network.links {
                mn.add_link(id, link.clone())?;
            }
        }
        Ok(mn)
    }
}
