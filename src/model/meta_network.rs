/*!
The neutral intermediate representation of a single meta-network.

Node-sets and networks are private so that every mutation goes through a method that
keeps the central invariant: each link endpoint names a node of the node-set its network
declares for that side.
*/

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    edge::{Link, Network, NetworkHeader},
    node::{Node, NodeSet},
    value::{PropertyIdentity, PropertyType, PropertyValue, ValueError},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown node-set: {0}")]
    UnknownNodeSet(String),
    #[error("Unknown node {node} in node-set {nodeset}")]
    UnknownNode { nodeset: String, node: String },
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    #[error("Node-set {0} already exists")]
    DuplicateNodeSet(String),
    #[error("Node {node} already exists in node-set {nodeset}")]
    DuplicateNode { nodeset: String, node: String },
    #[error("Network {0} already exists")]
    DuplicateNetwork(String),
    #[error("Property {property} is not declared for {owner}")]
    UndeclaredProperty { owner: String, property: String },
    #[error("Property {property} is already declared for {owner}")]
    DuplicateProperty { owner: String, property: String },
    #[error("Property {property} is declared as {expected}, got a {found} value")]
    TypeMismatch {
        property: String,
        expected: PropertyType,
        found: &'static str,
    },
    #[error("Invalid value for property {property}: {error}")]
    InvalidValue { property: String, error: ValueError },
    #[error("Network {network} references node {node}, which is not in node-set {nodeset}")]
    DanglingReference {
        network: String,
        nodeset: String,
        node: String,
    },
    #[error("Network {network} expects node-set {nodeset} to have type {expected}, found {found}")]
    NodeTypeMismatch {
        network: String,
        nodeset: String,
        expected: String,
        found: String,
    },
    #[error("Property {property} is declared as {first} in one node-set and {second} in another")]
    ConflictingDeclaration {
        property: String,
        first: PropertyType,
        second: PropertyType,
    },
    #[error("Cannot union node-sets of different types: {0} and {1}")]
    MixedNodeTypes(String, String),
    #[error("Union needs at least two node-sets, got {0}")]
    NotEnoughNodeSets(usize),
}

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaNetwork {
    /// XML attributes of the `<MetaNetwork>` element (`id`, `date`, ...).
    pub attributes: BTreeMap<String, String>,
    /// Document-level `<properties>`.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Document-level `<propertyIdentities>`.
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    nodesets: BTreeMap<String, NodeSet>,
    networks: BTreeMap<String, Network>,
}

impl MetaNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let mut mn = Self::default();
        mn.attributes.insert("id".to_string(), id.into());
        mn
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    pub fn nodesets(&self) -> impl Iterator<Item = &NodeSet> {
        self.nodesets.values()
    }

    pub fn nodeset(&self, nodeset_id: &str) -> ModelResult<&NodeSet> {
        self.nodesets
            .get(nodeset_id)
            .ok_or_else(|| ModelError::UnknownNodeSet(nodeset_id.to_string()))
    }

    /// All node-sets carrying the given node type tag.
    pub fn nodeclass<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a NodeSet> + 'a {
        self.nodesets
            .values()
            .filter(move |set| set.node_type == node_type)
    }

    pub fn node_types(&self) -> BTreeSet<&str> {
        self.nodesets
            .values()
            .map(|set| set.node_type.as_str())
            .collect()
    }

    pub fn node(&self, nodeset_id: &str, node_id: &str) -> ModelResult<&Node> {
        self.nodeset(nodeset_id)?
            .nodes
            .get(node_id)
            .ok_or_else(|| ModelError::UnknownNode {
                nodeset: nodeset_id.to_string(),
                node: node_id.to_string(),
            })
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    pub fn network(&self, network_id: &str) -> ModelResult<&Network> {
        self.networks
            .get(network_id)
            .ok_or_else(|| ModelError::UnknownNetwork(network_id.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.nodesets.values().map(NodeSet::len).sum()
    }

    pub fn link_count(&self) -> usize {
        self.networks.values().map(Network::link_count).sum()
    }

    /// Adds a complete node-set. Every node's properties must match the set's declarations.
    pub fn add_nodeset(&mut self, nodeset: NodeSet) -> ModelResult<()> {
        if self.nodesets.contains_key(&nodeset.id) {
            return Err(ModelError::DuplicateNodeSet(nodeset.id));
        }
        for node in nodeset.nodes.values() {
            check_properties(&nodeset, &node.properties)?;
        }
        self.nodesets.insert(nodeset.id.clone(), nodeset);
        Ok(())
    }

    pub fn create_nodeset_property(
        &mut self,
        nodeset_id: &str,
        property: &str,
        identity: PropertyIdentity,
    ) -> ModelResult<()> {
        let nodeset = self.nodeset_mut(nodeset_id)?;
        if nodeset.property_identities.contains_key(property) {
            return Err(ModelError::DuplicateProperty {
                owner: format!("node-set {nodeset_id}"),
                property: property.to_string(),
            });
        }
        nodeset
            .property_identities
            .insert(property.to_string(), identity);
        Ok(())
    }

    pub fn add_node(&mut self, nodeset_id: &str, node: Node) -> ModelResult<()> {
        let nodeset = self.nodeset_mut(nodeset_id)?;
        if nodeset.contains(&node.id) {
            return Err(ModelError::DuplicateNode {
                nodeset: nodeset_id.to_string(),
                node: node.id,
            });
        }
        check_properties(nodeset, &node.properties)?;
        nodeset.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Sets a node property from its DyNetML text, coercing it by the declared type.
    pub fn set_node_property(
        &mut self,
        nodeset_id: &str,
        node_id: &str,
        property: &str,
        raw: &str,
    ) -> ModelResult<()> {
        let identity = declared(self.nodeset(nodeset_id)?, property)?;
        let value = identity
            .value_type
            .parse(raw)
            .map_err(|error| ModelError::InvalidValue {
                property: property.to_string(),
                error,
            })?;
        self.set_node_property_value(nodeset_id, node_id, property, value)
    }

    pub fn set_node_property_value(
        &mut self,
        nodeset_id: &str,
        node_id: &str,
        property: &str,
        value: PropertyValue,
    ) -> ModelResult<()> {
        let nodeset = self.nodeset_mut(nodeset_id)?;
        check_value(nodeset, property, &value)?;
        let node = nodeset
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| ModelError::UnknownNode {
                nodeset: nodeset_id.to_string(),
                node: node_id.to_string(),
            })?;
        node.properties.insert(property.to_string(), value);
        Ok(())
    }

    /// Renames a node and rewrites every link endpoint that referred to it.
    pub fn rename_node(&mut self, nodeset_id: &str, node_id: &str, new_id: &str) -> ModelResult<()> {
        let nodeset = self.nodeset_mut(nodeset_id)?;
        if nodeset.contains(new_id) {
            return Err(ModelError::DuplicateNode {
                nodeset: nodeset_id.to_string(),
                node: new_id.to_string(),
            });
        }
        let mut node = nodeset
            .nodes
            .remove(node_id)
            .ok_or_else(|| ModelError::UnknownNode {
                nodeset: nodeset_id.to_string(),
                node: node_id.to_string(),
            })?;
        node.id = new_id.to_string();
        nodeset.nodes.insert(new_id.to_string(), node);

        for network in self.networks.values_mut() {
            let rename_source = network.header.source == nodeset_id;
            let rename_target = network.header.target == nodeset_id;
            for link in network.links.iter_mut() {
                if rename_source && link.source == node_id {
                    link.source = new_id.to_string();
                }
                if rename_target && link.target == node_id {
                    link.target = new_id.to_string();
                }
            }
        }
        Ok(())
    }

    /// Combines node-sets into a new one named `new_id`.
    /// Nodes and declarations from earlier sets override those from later ones.
    /// A property declared with different types in two of the sets is an error.
    /// The source node-sets are left in place.
    pub fn union_nodesets(&mut self, sources: &[&str], new_id: &str) -> ModelResult<()> {
        if sources.len() < 2 {
            return Err(ModelError::NotEnoughNodeSets(sources.len()));
        }
        if self.nodesets.contains_key(new_id) {
            return Err(ModelError::DuplicateNodeSet(new_id.to_string()));
        }
        let first = self.nodeset(sources[0])?;
        let mut merged = NodeSet::new(new_id, first.node_type.clone());

        for source_id in sources.iter().rev() {
            let source = self.nodeset(source_id)?;
            if source.node_type != merged.node_type {
                return Err(ModelError::MixedNodeTypes(
                    sources[0].to_string(),
                    source_id.to_string(),
                ));
            }
            for (name, identity) in &source.property_identities {
                if let Some(known) = merged.property_identities.get(name) {
                    if known.value_type != identity.value_type {
                        return Err(ModelError::ConflictingDeclaration {
                            property: name.clone(),
                            first: identity.value_type.clone(),
                            second: known.value_type.clone(),
                        });
                    }
                }
                merged
                    .property_identities
                    .insert(name.clone(), identity.clone());
            }
            merged
                .nodes
                .extend(source.nodes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        self.nodesets.insert(new_id.to_string(), merged);
        Ok(())
    }

    /// Declares a network. Its node-sets must exist and carry the declared types.
    pub fn add_network(&mut self, header: NetworkHeader) -> ModelResult<()> {
        if self.networks.contains_key(&header.id) {
            return Err(ModelError::DuplicateNetwork(header.id));
        }
        for (nodeset_id, expected) in [
            (&header.source, &header.source_type),
            (&header.target, &header.target_type),
        ] {
            let nodeset = self.nodeset(nodeset_id)?;
            if &nodeset.node_type != expected {
                return Err(ModelError::NodeTypeMismatch {
                    network: header.id.clone(),
                    nodeset: nodeset_id.clone(),
                    expected: expected.clone(),
                    found: nodeset.node_type.clone(),
                });
            }
        }
        self.networks
            .insert(header.id.clone(), Network::new(header));
        Ok(())
    }

    pub fn add_link(&mut self, network_id: &str, link: Link) -> ModelResult<()> {
        let network = self
            .networks
            .get(network_id)
            .ok_or_else(|| ModelError::UnknownNetwork(network_id.to_string()))?;
        self.check_link(&network.header, &link)?;
        if let Some(network) = self.networks.get_mut(network_id) {
            network.links.push(link);
        }
        Ok(())
    }

    /// Checks every invariant of the model. Models built only through this type's
    /// methods always pass; this exists for models assembled from foreign representations.
    pub fn validate(&self) -> ModelResult<()> {
        for nodeset in self.nodesets.values() {
            for node in nodeset.nodes.values() {
                check_properties(nodeset, &node.properties)?;
            }
        }
        for network in self.networks.values() {
            for link in &network.links {
                self.check_link(&network.header, link)?;
            }
        }
        Ok(())
    }

    fn check_link(&self, header: &NetworkHeader, link: &Link) -> ModelResult<()> {
        for (nodeset_id, node_id) in [(&header.source, &link.source), (&header.target, &link.target)] {
            if !self.nodeset(nodeset_id)?.contains(node_id) {
                return Err(ModelError::DanglingReference {
                    network: header.id.clone(),
                    nodeset: nodeset_id.clone(),
                    node: node_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn nodeset_mut(&mut self, nodeset_id: &str) -> ModelResult<&mut NodeSet> {
        self.nodesets
            .get_mut(nodeset_id)
            .ok_or_else(|| ModelError::UnknownNodeSet(nodeset_id.to_string()))
    }
}

fn declared<'a>(nodeset: &'a NodeSet, property: &str) -> ModelResult<&'a PropertyIdentity> {
    nodeset
        .property_identities
        .get(property)
        .ok_or_else(|| ModelError::UndeclaredProperty {
            owner: format!("node-set {}", nodeset.id),
            property: property.to_string(),
        })
}

fn check_value(nodeset: &NodeSet, property: &str, value: &PropertyValue) -> ModelResult<()> {
    let identity = declared(nodeset, property)?;
    if !identity.value_type.accepts(value) {
        return Err(ModelError::TypeMismatch {
            property: property.to_string(),
            expected: identity.value_type.clone(),
            found: value.kind(),
        });
    }
    Ok(())
}

fn check_properties(
    nodeset: &NodeSet,
    properties: &BTreeMap<String, PropertyValue>,
) -> ModelResult<()> {
    for (property, value) in properties {
        check_value(nodeset, property, value)?;
    }
    Ok(())
}

impl Display for MetaNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " == Meta-Network ==")?;
        for (key, value) in &self.attributes {
            writeln!(f, "  {key}: {value}")?;
        }
        writeln!(f, " == Properties ==")?;
        for (key, value) in &self.properties {
            writeln!(f, "  {key}: {value}")?;
        }
        writeln!(f, " == Node-sets ==")?;
        for nodeset in self.nodesets.values() {
            writeln!(
                f,
                "  Node-set {} ({}): {} nodes",
                nodeset.id,
                nodeset.node_type,
                nodeset.len()
            )?;
            for (name, identity) in &nodeset.property_identities {
                writeln!(
                    f,
                    "   | {name}: {} (single-valued: {})",
                    identity.value_type, identity.single_valued
                )?;
            }
        }
        writeln!(f, " == Networks ==")?;
        for network in self.networks.values() {
            let header = &network.header;
            writeln!(
                f,
                "  Network {}: {} -> {} ({}, {} links)",
                header.id,
                header.source,
                header.target,
                if header.is_directed { "directed" } else { "undirected" },
                network.link_count()
            )?;
        }
        Ok(())
    }
}
