use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::value::{PropertyIdentity, PropertyValue};

/// A single node of a node-set.
///
/// `attributes` holds the raw XML attributes of the `<node>` element other than `id`
/// (e.g. `title`). `properties` holds the typed `<property>` children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_properties(
        id: impl Into<String>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// Nodes of one type (`<nodeclass type=".." id="..">`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSet {
    pub id: String,
    /// Node type tag (`Agent`, `Event`, `Knowledge`, ...).
    pub node_type: String,
    pub property_identities: BTreeMap<String, PropertyIdentity>,
    pub nodes: BTreeMap<String, Node>,
}

impl NodeSet {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            property_identities: BTreeMap::new(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}
