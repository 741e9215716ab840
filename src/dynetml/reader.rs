/*!
Model builder: maps a parsed DyNetML element tree onto `MetaNetwork` / `DynamicMetaNetwork`.

Expected layout of a meta-network:

<MetaNetwork id="...">
    <propertyIdentities><propertyIdentity id type singleValued/>...</propertyIdentities>
    <properties><property id value/>...</properties>
    <nodes>
        <nodeclass type="Agent" id="Agent">
            <propertyIdentities>...</propertyIdentities>
            <node id="..." title="..."><properties><property id value/></properties></node>
        </nodeclass>
    </nodes>
    <networks>
        <network id source sourceType target targetType isDirected allowSelfLoops isBinary>
            <link source target value/>
        </network>
    </networks>
</MetaNetwork>

Every section is optional. A dynamic document wraps several `MetaNetwork` elements in a
`DynamicMetaNetwork` (or ORA's `DynamicNetwork`) root.
*/

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dynetml::{
        options::LoadFilter,
        xml_tree::{XmlElement, XmlError, parse_document},
    },
    model::{
        DEFAULT_WEIGHT, DynamicMetaNetwork, DynamicRoot, Link, MetaNetwork, ModelError, NetworkHeader, Node,
        NodeSet, PropertyIdentity, PropertyType, PropertyValue, SliceError, ValueError,
        dynamic::parse_slice_id, parse_finite,
    },
};

pub const META_NETWORK_TAG: &str = "MetaNetwork";
pub const DYNAMIC_META_NETWORK_TAG: &str = DynamicRoot::DynamicMetaNetwork.tag();
/// Root name ORA itself uses for dynamic documents.
pub const DYNAMIC_NETWORK_TAG: &str = DynamicRoot::DynamicNetwork.tag();

/// Attributes of `<network>` that map onto `NetworkHeader` fields.
pub(crate) const NETWORK_KEYS: [&str; 8] = [
    "id",
    "source",
    "sourceType",
    "target",
    "targetType",
    "isDirected",
    "allowSelfLoops",
    "isBinary",
];

#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("Expected a <{expected}> root element, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("Invalid value '{value}' for attribute '{attribute}' of <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("Invalid value for property {property} of {owner}: {error}")]
    InvalidProperty {
        owner: String,
        property: String,
        error: ValueError,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Slice(#[from] SliceError),
}

impl FormatError {
    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, FormatError::Model(ModelError::DanglingReference { .. }))
    }
}

/// A loaded DyNetML document of either shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Meta(MetaNetwork),
    Dynamic(DynamicMetaNetwork),
}

impl Document {
    pub fn meta_networks(&self) -> &[MetaNetwork] {
        match self {
            Document::Meta(mn) => std::slice::from_ref(mn),
            Document::Dynamic(dmn) => &dmn.metanetworks,
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Document::Meta(mn) => write!(f, "{mn}"),
            Document::Dynamic(dmn) => write!(f, "{dmn}"),
        }
    }
}

/// Reads a document whose root must be a single `<MetaNetwork>`.
pub fn read_meta_network(text: &str, filter: &LoadFilter) -> Result<MetaNetwork, FormatError> {
    let root = parse_document(text)?;
    if root.name != META_NETWORK_TAG {
        return Err(FormatError::UnexpectedRoot {
            expected: META_NETWORK_TAG,
            found: root.name,
        });
    }
    meta_network_from_element(&root, filter)
}

/// Reads a document with either a meta-network or a dynamic meta-network root.
pub fn read_document(text: &str, filter: &LoadFilter) -> Result<Document, FormatError> {
    let root = parse_document(text)?;
    match root.name.as_str() {
        META_NETWORK_TAG => Ok(Document::Meta(meta_network_from_element(&root, filter)?)),
        DYNAMIC_META_NETWORK_TAG | DYNAMIC_NETWORK_TAG => {
            Ok(Document::Dynamic(dynamic_from_element(&root, filter)?))
        }
        _ => Err(FormatError::UnexpectedRoot {
            expected: DYNAMIC_META_NETWORK_TAG,
            found: root.name,
        }),
    }
}

pub fn dynamic_from_element(
    root: &XmlElement,
    filter: &LoadFilter,
) -> Result<DynamicMetaNetwork, FormatError> {
    let mut dmn = DynamicMetaNetwork::new();
    if root.name == DYNAMIC_NETWORK_TAG {
        dmn.root = DynamicRoot::DynamicNetwork;
    }
    dmn.attributes = attribute_map(root, &[]);

    for (index, mn_element) in root.children_named(META_NETWORK_TAG).enumerate() {
        if filter.filters_time() {
            let id = mn_element.attr("id").ok_or(SliceError::MissingId(index))?;
            let ts = parse_slice_id(id)?;
            if !filter.admits_time(ts) {
                debug!("skipping meta-network {id} outside the time window");
                continue;
            }
        }
        dmn.metanetworks
            .push(meta_network_from_element(mn_element, filter)?);
    }
    debug!("loaded {} meta-network slices", dmn.metanetworks.len());
    Ok(dmn)
}

pub fn meta_network_from_element(
    root: &XmlElement,
    filter: &LoadFilter,
) -> Result<MetaNetwork, FormatError> {
    let mut mn = MetaNetwork::new();
    mn.attributes = attribute_map(root, &[]);

    if let Some(identities) = root.child("propertyIdentities") {
        mn.property_identities = read_property_identities(identities, filter)?;
    }

    if let Some(properties) = root.child("properties") {
        for property in properties.children_named("property") {
            let (name, raw) = property_pair(property)?;
            if !filter.properties.admits(name) {
                continue;
            }
            let value_type = mn
                .property_identities
                .get(name)
                .map(|identity| identity.value_type.clone())
                .unwrap_or(PropertyType::Text);
            let value = value_type
                .parse(raw)
                .map_err(|error| FormatError::InvalidProperty {
                    owner: "meta-network".to_string(),
                    property: name.to_string(),
                    error,
                })?;
            mn.properties.insert(name.to_string(), value);
        }
    }

    if let Some(nodes) = root.child("nodes") {
        for nodeclass in nodes.children_named("nodeclass") {
            let id = required(nodeclass, "id")?;
            if !filter.nodesets.admits(id) {
                debug!("skipping node-set {id}");
                continue;
            }
            let nodeset = read_nodeset(nodeclass, filter)?;
            debug!("node-set {} ({}): {} nodes", nodeset.id, nodeset.node_type, nodeset.len());
            mn.add_nodeset(nodeset)?;
        }
    }

    if let Some(networks) = root.child("networks") {
        for network in networks.children_named("network") {
            let id = required(network, "id")?;
            if !filter.networks.admits(id) {
                debug!("skipping network {id}");
                continue;
            }
            read_network(&mut mn, network, filter)?;
        }
    }

    Ok(mn)
}

fn read_nodeset(element: &XmlElement, filter: &LoadFilter) -> Result<NodeSet, FormatError> {
    let mut nodeset = NodeSet::new(required(element, "id")?, required(element, "type")?);
    if let Some(identities) = element.child("propertyIdentities") {
        nodeset.property_identities = read_property_identities(identities, filter)?;
    }

    for node_element in element.children_named("node") {
        let mut node = Node::new(required(node_element, "id")?);
        node.attributes = attribute_map(node_element, &["id"]);

        // ORA nests properties in <properties>; older writers put them directly on the node.
        let nested = node_element
            .child("properties")
            .into_iter()
            .flat_map(|p| p.children_named("property"));
        for property in node_element.children_named("property").chain(nested) {
            let (name, raw) = property_pair(property)?;
            if !filter.properties.admits(name) {
                continue;
            }
            let identity = nodeset.property_identities.get(name).ok_or_else(|| {
                ModelError::UndeclaredProperty {
                    owner: format!("node-set {}", nodeset.id),
                    property: name.to_string(),
                }
            })?;
            let value = identity
                .value_type
                .parse(raw)
                .map_err(|error| FormatError::InvalidProperty {
                    owner: format!("node {} of node-set {}", node.id, nodeset.id),
                    property: name.to_string(),
                    error,
                })?;
            node.properties.insert(name.to_string(), value);
        }

        if nodeset.contains(&node.id) {
            return Err(ModelError::DuplicateNode {
                nodeset: nodeset.id,
                node: node.id,
            }
            .into());
        }
        nodeset.nodes.insert(node.id.clone(), node);
    }
    Ok(nodeset)
}

fn read_network(
    mn: &mut MetaNetwork,
    element: &XmlElement,
    filter: &LoadFilter,
) -> Result<(), FormatError> {
    let id = required(element, "id")?;
    let source = required(element, "source")?;
    let target = required(element, "target")?;

    for side in [source, target] {
        if mn.nodeset(side).is_err() && !filter.nodesets.admits(side) {
            warn!("skipping network {id}: node-set {side} was filtered out");
            return Ok(());
        }
    }

    // The declared types default to the node-sets' own types when absent.
    let source_type = match element.attr("sourceType") {
        Some(t) => t.to_string(),
        None => mn.nodeset(source)?.node_type.clone(),
    };
    let target_type = match element.attr("targetType") {
        Some(t) => t.to_string(),
        None => mn.nodeset(target)?.node_type.clone(),
    };

    let mut header = NetworkHeader::new(
        id,
        (source, source_type),
        (target, target_type),
        bool_attr(element, "isDirected")?,
    );
    header.allow_self_loops = bool_attr(element, "allowSelfLoops")?;
    header.is_binary = bool_attr(element, "isBinary")?;
    header.attributes = attribute_map(element, &NETWORK_KEYS);
    mn.add_network(header)?;

    let mut count = 0usize;
    for link_element in element.children_named("link") {
        // `value` wins over `weight`; whichever is not used stays a plain attribute.
        let weight_key = if link_element.attr("value").is_some() {
            "value"
        } else {
            "weight"
        };
        let weight = match link_element.attr(weight_key) {
            Some(raw) => parse_finite(raw).ok_or_else(|| FormatError::InvalidAttribute {
                element: "link".to_string(),
                attribute: weight_key.to_string(),
                value: raw.to_string(),
            })?,
            None => DEFAULT_WEIGHT,
        };
        let mut link = Link::new(
            required(link_element, "source")?,
            required(link_element, "target")?,
            weight,
        );
        link.attributes = attribute_map(link_element, &["source", "target", weight_key]);
        mn.add_link(id, link)?;
        count += 1;
    }
    debug!("network {id}: {count} links");
    Ok(())
}

fn read_property_identities(
    element: &XmlElement,
    filter: &LoadFilter,
) -> Result<BTreeMap<String, PropertyIdentity>, FormatError> {
    let mut identities = BTreeMap::new();
    for identity in element.children_named("propertyIdentity") {
        let id = required(identity, "id")?;
        if !filter.properties.admits(id) {
            continue;
        }
        let value_type = PropertyType::from_dynetml(required(identity, "type")?);
        let single_valued = bool_attr(identity, "singleValued")?;
        identities.insert(
            id.to_string(),
            PropertyIdentity::new(value_type, single_valued),
        );
    }
    Ok(identities)
}

fn property_pair(element: &XmlElement) -> Result<(&str, &str), FormatError> {
    Ok((required(element, "id")?, required(element, "value")?))
}

fn required<'a>(element: &'a XmlElement, attribute: &'static str) -> Result<&'a str, FormatError> {
    element
        .attr(attribute)
        .ok_or_else(|| FormatError::MissingAttribute {
            element: element.name.clone(),
            attribute,
        })
}

/// Missing boolean attributes read as false.
fn bool_attr(element: &XmlElement, attribute: &str) -> Result<bool, FormatError> {
    match element.attr(attribute) {
        None => Ok(false),
        Some(raw) => match PropertyType::Bool.parse(raw) {
            Ok(PropertyValue::Bool(b)) => Ok(b),
            _ => Err(FormatError::InvalidAttribute {
                element: element.name.clone(),
                attribute: attribute.to_string(),
                value: raw.to_string(),
            }),
        },
    }
}

fn attribute_map(element: &XmlElement, skip: &[&str]) -> BTreeMap<String, String> {
    element
        .attributes
        .iter()
        .filter(|(k, _)| !skip.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynetml::options::LoadOptions;

    fn filter() -> LoadFilter {
        LoadFilter::default()
    }

    #[test]
    fn test_read_two_agents() {
        let text = include_str!("../../test_data/two_agents.xml");
        let mn = read_meta_network(text, &filter()).unwrap();

        assert_eq!(mn.id(), Some("two-agents"));
        let agents = mn.nodeset("Agent").unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents.nodes["alice"].attributes["title"], "Alice");
        assert_eq!(
            agents.nodes["alice"].property("age"),
            Some(&PropertyValue::Number(34.0))
        );

        let interacts = mn.network("interacts").unwrap();
        assert!(interacts.is_directed());
        assert_eq!(interacts.links.len(), 1);
        assert_eq!(interacts.links[0].weight, 2.5);
    }

    #[test]
    fn test_dangling_link_is_a_format_error() {
        let text = include_str!("../../test_data/dangling_link.xml");
        let err = read_meta_network(text, &filter()).unwrap_err();
        assert!(err.is_dangling_reference(), "{err}");
    }

    #[test]
    fn test_malformed_xml_is_a_format_error() {
        let err = read_meta_network("<MetaNetwork><nodes></MetaNetwork>", &filter()).unwrap_err();
        assert!(matches!(err, FormatError::Xml(_)));

        let err = read_meta_network("<blah><blah_child value=\"1.0\"/></blah>", &filter())
            .unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedRoot { .. }));
    }

    #[test]
    fn test_filters_drop_networks_of_skipped_nodesets() {
        let text = include_str!("../../test_data/tweets.xml");
        let filter = LoadOptions::new()
            .ignore_nodesets(["Concept"])
            .ignore_properties(["followers"])
            .to_filter()
            .unwrap();
        let mn = read_meta_network(text, &filter).unwrap();

        assert!(mn.nodeset("Concept").is_err());
        assert!(mn.network("Tweet x Concept").is_err());
        assert!(mn.network("Agent x Tweet - Sender").is_ok());
        let agents = mn.nodeset("Agent").unwrap();
        assert!(!agents.property_identities.contains_key("followers"));
        assert!(agents.nodes.values().all(|n| n.property("followers").is_none()));
    }

    #[test]
    fn test_invalid_property_value() {
        let text = r#"<MetaNetwork>
            <nodes>
                <nodeclass type="Agent" id="Agent">
                    <propertyIdentities>
                        <propertyIdentity id="age" type="number" singleValued="true"/>
                    </propertyIdentities>
                    <node id="a"><properties><property id="age" value="old"/></properties></node>
                </nodeclass>
            </nodes>
        </MetaNetwork>"#;
        let err = read_meta_network(text, &filter()).unwrap_err();
        assert!(matches!(err, FormatError::InvalidProperty { .. }));
    }

    #[test]
    fn test_non_finite_numbers_are_refused_on_load() {
        let with_age = |age: &str| {
            format!(
                r#"<MetaNetwork>
                <nodes>
                    <nodeclass type="Agent" id="Agent">
                        <propertyIdentities>
                            <propertyIdentity id="age" type="number" singleValued="true"/>
                        </propertyIdentities>
                        <node id="a"><properties><property id="age" value="{age}"/></properties></node>
                    </nodeclass>
                </nodes>
            </MetaNetwork>"#
            )
        };
        let with_weight = |key: &str, weight: &str| {
            format!(
                r#"<MetaNetwork>
                <nodes><nodeclass type="Agent" id="Agent"><node id="a"/><node id="b"/></nodeclass></nodes>
                <networks>
                    <network id="n" source="Agent" sourceType="Agent" target="Agent" targetType="Agent">
                        <link source="a" target="b" {key}="{weight}"/>
                    </network>
                </networks>
            </MetaNetwork>"#
            )
        };

        for raw in ["NaN", "inf", "-Infinity", "1e400"] {
            let err = read_meta_network(&with_age(raw), &filter()).unwrap_err();
            assert!(
                matches!(
                    err,
                    FormatError::InvalidProperty { error: ValueError::InvalidNumber(_), .. }
                ),
                "{raw}: {err}"
            );
            for key in ["value", "weight"] {
                let err = read_meta_network(&with_weight(key, raw), &filter()).unwrap_err();
                assert!(
                    matches!(err, FormatError::InvalidAttribute { ref attribute, .. } if attribute == key),
                    "{key}={raw}: {err}"
                );
            }
        }
        assert!(read_meta_network(&with_weight("value", "1e300"), &filter()).is_ok());
    }

    #[test]
    fn test_value_wins_and_weight_is_kept() {
        let text = r#"<MetaNetwork>
            <nodes><nodeclass type="Agent" id="Agent"><node id="a"/><node id="b"/></nodeclass></nodes>
            <networks>
                <network id="n" source="Agent" sourceType="Agent" target="Agent" targetType="Agent">
                    <link source="a" target="b" value="2" weight="5"/>
                    <link source="b" target="a" weight="3"/>
                </network>
            </networks>
        </MetaNetwork>"#;
        let mn = read_meta_network(text, &filter()).unwrap();
        let links = &mn.network("n").unwrap().links;
        assert_eq!(links[0].weight, 2.0);
        assert_eq!(links[0].attributes["weight"], "5");
        assert_eq!(links[1].weight, 3.0);
        assert!(links[1].attributes.is_empty());
    }

    #[test]
    fn test_read_dynamic_document_with_time_window() {
        let text = include_str!("../../test_data/dynamic.xml");
        let doc = read_document(text, &filter()).unwrap();
        assert_eq!(doc.meta_networks().len(), 3);

        let window = LoadOptions::new()
            .between(
                Some(parse_slice_id("20140224T22:00:00").unwrap()),
                None,
            )
            .to_filter()
            .unwrap();
        let Document::Dynamic(dmn) = read_document(text, &window).unwrap() else {
            panic!("expected a dynamic document");
        };
        assert_eq!(dmn.len(), 2);
        assert_eq!(dmn.attributes["id"], "tweets-by-hour");
        assert_eq!(dmn.root, DynamicRoot::DynamicMetaNetwork);
    }
}
