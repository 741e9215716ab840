/*!
Serializer: model → element tree → DyNetML text.

Everything that could make the output unreadable or lossy is rejected up front, so a
document that serializes always loads back into an equivalent model.
*/

use std::path::{Path, PathBuf};

use chrono::Timelike;
use thiserror::Error;
use tracing::debug;

use crate::{
    dynetml::{
        reader::{Document, META_NETWORK_TAG, NETWORK_KEYS},
        xml_tree::{XmlElement, XmlError, write_document},
    },
    model::{
        DEFAULT_WEIGHT, DynamicMetaNetwork, MetaNetwork, Network, NodeSet, PropertyIdentity,
        PropertyType, PropertyValue,
    },
};

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Property {property} of {owner} is declared as {expected}, got a {found} value")]
    TypeMismatch {
        owner: String,
        property: String,
        expected: PropertyType,
        found: &'static str,
    },
    #[error("Property {property} of {owner} has a {found} value but no declaration")]
    UndeclaredProperty {
        owner: String,
        property: String,
        found: &'static str,
    },
    #[error("{context} is not a finite number")]
    NonFiniteNumber { context: String },
    #[error("Date {value} of {context} has sub-second precision, which DyNetML cannot store")]
    LossyDate { context: String, value: String },
    #[error("'{name}' on <{element}> is not a valid XML attribute name")]
    InvalidAttributeName { element: String, name: String },
    #[error("{context} contains U+{code:04X}, which XML 1.0 cannot represent")]
    InvalidXmlChar { context: String, code: u32 },
    #[error("Target path {0} is a directory")]
    TargetIsDirectory(PathBuf),
    #[error("Failed to write {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
}

type SerResult<T> = Result<T, SerializationError>;

pub fn to_dynetml_string(mn: &MetaNetwork) -> SerResult<String> {
    Ok(write_document(&meta_network_to_element(mn)?)?)
}

pub fn document_to_string(document: &Document) -> SerResult<String> {
    let root = match document {
        Document::Meta(mn) => meta_network_to_element(mn)?,
        Document::Dynamic(dmn) => dynamic_to_element(dmn)?,
    };
    Ok(write_document(&root)?)
}

/// Writes serialized text to `path`, refusing directories.
pub fn write_to_path(path: &Path, text: &str) -> SerResult<()> {
    if path.is_dir() {
        return Err(SerializationError::TargetIsDirectory(path.to_path_buf()));
    }
    std::fs::write(path, text).map_err(|error| SerializationError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    debug!("wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

pub fn dynamic_to_element(dmn: &DynamicMetaNetwork) -> SerResult<XmlElement> {
    let mut root = XmlElement::new(dmn.root.tag());
    for (key, value) in &dmn.attributes {
        push_checked(&mut root, key, value)?;
    }
    for mn in &dmn.metanetworks {
        root.push_child(meta_network_to_element(mn)?);
    }
    Ok(root)
}

pub fn meta_network_to_element(mn: &MetaNetwork) -> SerResult<XmlElement> {
    let mut root = XmlElement::new(META_NETWORK_TAG);
    for (key, value) in &mn.attributes {
        push_checked(&mut root, key, value)?;
    }

    if !mn.property_identities.is_empty() {
        root.push_child(identities_element(&mn.property_identities)?);
    }

    if !mn.properties.is_empty() {
        let mut properties = XmlElement::new("properties");
        for (name, value) in &mn.properties {
            let identity = mn.property_identities.get(name);
            let text = property_text("meta-network", name, value, identity)?;
            properties.push_child(property_element(name, text)?);
        }
        root.push_child(properties);
    }

    let mut nodes = XmlElement::new("nodes");
    for nodeset in mn.nodesets() {
        nodes.push_child(nodeset_element(nodeset)?);
    }
    root.push_child(nodes);

    let mut networks = XmlElement::new("networks");
    for network in mn.networks() {
        networks.push_child(network_element(network)?);
    }
    root.push_child(networks);

    Ok(root)
}

fn nodeset_element(nodeset: &NodeSet) -> SerResult<XmlElement> {
    let mut element = XmlElement::new("nodeclass");
    push_checked(&mut element, "type", &nodeset.node_type)?;
    push_checked(&mut element, "id", &nodeset.id)?;
    if !nodeset.property_identities.is_empty() {
        element.push_child(identities_element(&nodeset.property_identities)?);
    }

    let owner = format!("node-set {}", nodeset.id);
    for node in nodeset.nodes.values() {
        let mut node_element = XmlElement::new("node");
        push_checked(&mut node_element, "id", &node.id)?;
        for (key, value) in node.attributes.iter().filter(|(k, _)| k.as_str() != "id") {
            push_checked(&mut node_element, key, value)?;
        }
        if !node.properties.is_empty() {
            let mut properties = XmlElement::new("properties");
            for (name, value) in &node.properties {
                let identity = nodeset.property_identities.get(name);
                let text = property_text(&owner, name, value, identity)?;
                properties.push_child(property_element(name, text)?);
            }
            node_element.push_child(properties);
        }
        element.push_child(node_element);
    }
    Ok(element)
}

fn network_element(network: &Network) -> SerResult<XmlElement> {
    let header = &network.header;
    let mut element = XmlElement::new("network");
    push_checked(&mut element, "id", &header.id)?;
    push_checked(&mut element, "source", &header.source)?;
    push_checked(&mut element, "sourceType", &header.source_type)?;
    push_checked(&mut element, "target", &header.target)?;
    push_checked(&mut element, "targetType", &header.target_type)?;
    element.push_attr("isDirected", header.is_directed.to_string());
    element.push_attr("allowSelfLoops", header.allow_self_loops.to_string());
    element.push_attr("isBinary", header.is_binary.to_string());
    for (key, value) in header
        .attributes
        .iter()
        .filter(|(k, _)| !NETWORK_KEYS.contains(&k.as_str()))
    {
        push_checked(&mut element, key, value)?;
    }

    for link in &network.links {
        if !link.weight.is_finite() {
            return Err(SerializationError::NonFiniteNumber {
                context: format!(
                    "Weight of link {} -> {} in network {}",
                    link.source, link.target, header.id
                ),
            });
        }
        let mut link_element = XmlElement::new("link");
        push_checked(&mut link_element, "source", &link.source)?;
        push_checked(&mut link_element, "target", &link.target)?;
        // A kept `weight` attribute would be read as the weight if `value` were missing.
        let unit_binary = header.is_binary && link.weight == DEFAULT_WEIGHT;
        if !unit_binary || link.attributes.contains_key("weight") {
            link_element.push_attr("value", link.weight.to_string());
        }
        for (key, value) in link
            .attributes
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "source" | "target" | "value"))
        {
            push_checked(&mut link_element, key, value)?;
        }
        element.push_child(link_element);
    }
    Ok(element)
}

fn identities_element(
    identities: &std::collections::BTreeMap<String, PropertyIdentity>,
) -> SerResult<XmlElement> {
    let mut element = XmlElement::new("propertyIdentities");
    for (name, identity) in identities {
        let mut child = XmlElement::new("propertyIdentity");
        push_checked(&mut child, "id", name)?;
        push_checked(&mut child, "type", identity.value_type.as_dynetml())?;
        child.push_attr("singleValued", identity.single_valued.to_string());
        element.push_child(child);
    }
    Ok(element)
}

fn property_element(name: &str, value: String) -> SerResult<XmlElement> {
    let mut element = XmlElement::new("property");
    push_checked(&mut element, "id", name)?;
    push_checked(&mut element, "value", &value)?;
    Ok(element)
}

/// Text form of a property value, checked against its declaration.
/// Undeclared properties may only hold text.
fn property_text(
    owner: &str,
    name: &str,
    value: &PropertyValue,
    identity: Option<&PropertyIdentity>,
) -> SerResult<String> {
    match identity {
        Some(identity) if !identity.value_type.accepts(value) => {
            return Err(SerializationError::TypeMismatch {
                owner: owner.to_string(),
                property: name.to_string(),
                expected: identity.value_type.clone(),
                found: value.kind(),
            });
        }
        None if !matches!(value, PropertyValue::Text(_)) => {
            return Err(SerializationError::UndeclaredProperty {
                owner: owner.to_string(),
                property: name.to_string(),
                found: value.kind(),
            });
        }
        _ => {}
    }

    match value {
        PropertyValue::Number(n) if !n.is_finite() => Err(SerializationError::NonFiniteNumber {
            context: format!("Property {name} of {owner}"),
        }),
        PropertyValue::Date(d) if d.nanosecond() != 0 => Err(SerializationError::LossyDate {
            context: format!("property {name} of {owner}"),
            value: d.to_string(),
        }),
        _ => Ok(value.to_dynetml()),
    }
}

fn push_checked(element: &mut XmlElement, key: &str, value: &str) -> SerResult<()> {
    if !is_xml_name(key) {
        return Err(SerializationError::InvalidAttributeName {
            element: element.name.clone(),
            name: key.to_string(),
        });
    }
    if let Some(c) = key.chars().chain(value.chars()).find(|c| !is_xml_char(*c)) {
        return Err(SerializationError::InvalidXmlChar {
            context: format!("Attribute {key} of <{}>", element.name),
            code: c as u32,
        });
    }
    element.push_attr(key, value);
    Ok(())
}

/// The XML 1.0 `Name` production.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn is_xml_char(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}
