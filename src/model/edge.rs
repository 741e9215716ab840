use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Weight given to links that carry no `value` attribute.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// One `<link>` of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub weight: f64,
    /// Remaining XML attributes of the link element.
    pub attributes: BTreeMap<String, String>,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
            attributes: BTreeMap::new(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Everything about a network except its links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkHeader {
    pub id: String,
    /// Node-set the link sources belong to.
    pub source: String,
    pub source_type: String,
    /// Node-set the link targets belong to.
    pub target: String,
    pub target_type: String,
    pub is_directed: bool,
    pub allow_self_loops: bool,
    pub is_binary: bool,
    /// Remaining XML attributes of the network element.
    pub attributes: BTreeMap<String, String>,
}

impl NetworkHeader {
    pub fn new(
        id: impl Into<String>,
        (source, source_type): (impl Into<String>, impl Into<String>),
        (target, target_type): (impl Into<String>, impl Into<String>),
        is_directed: bool,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_type: source_type.into(),
            target: target.into(),
            target_type: target_type.into(),
            is_directed,
            allow_self_loops: false,
            is_binary: false,
            attributes: BTreeMap::new(),
        }
    }
}

/// A relation between two node-sets (`<network>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub header: NetworkHeader,
    pub links: Vec<Link>,
}

impl Network {
    pub fn new(header: NetworkHeader) -> Self {
        Self {
            header,
            links: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.header.id
    }

    pub fn is_directed(&self) -> bool {
        self.header.is_directed
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
