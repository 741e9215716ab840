/*!
Generic XML element tree.

DyNetML is attribute-heavy and small enough to hold in memory, so the reader first turns
the event stream from `quick-xml` into an owned `XmlElement` tree and the model builder
walks that. The writer goes the other way: model → tree → events.
*/

use std::borrow::Cow;

use quick_xml::{
    Reader, Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event, attributes::Attribute},
    name::QName,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    #[error("Malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("Document has no root element")]
    Empty,
    #[error("Unclosed element <{0}> at end of document")]
    Unclosed(String),
    #[error("Content after the root element at byte {0}")]
    TrailingContent(u64),
    #[error("Failed to write XML: {0}")]
    Write(String),
}

/// An owned XML element. Attribute order is kept as found in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attr(key, value);
        self
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn malformed(position: u64, err: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed {
        position,
        message: err.to_string(),
    }
}

/// Parses a complete document into its root element.
pub fn parse_document(text: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| malformed(position, e))?;
        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent(position));
                }
                stack.push(element_from(&start, position)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(position, "closing tag without opening tag"))?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(position, e))?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed(position, "text outside the root element")),
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::Empty)
}

fn element_from(start: &BytesStart<'_>, position: u64) -> Result<XmlElement, XmlError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(position, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(position, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    position: u64,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::TrailingContent(position)),
    }
    Ok(())
}

/// Serializes a root element as an indented UTF-8 document with an XML declaration.
pub fn write_document(root: &XmlElement) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    write_element(&mut writer, root)?;
    let mut out =
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    if element.children.is_empty() && element.text.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    if !element.text.is_empty() {
        emit(writer, Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

// Whitespace control characters are written as character references; a parser would
// otherwise normalize them to spaces.
fn escape_attribute(value: &str) -> String {
    escape(value)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = r#"<?xml version="1.0" standalone="yes"?>
            <!-- comment -->
            <root a="1" b="x &amp; y">
                <child id="c1"/>
                <child id="c2">text</child>
                <other/>
            </root>"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attr("b"), Some("x & y"));
        assert_eq!(root.children.len(), 3);
        let ids: Vec<_> = root
            .children_named("child")
            .filter_map(|c| c.attr("id"))
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(root.children[1].text, "text");
        assert!(root.child("missing").is_none());
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_document("<a><b></a>"),
            Err(XmlError::Malformed { .. })
        ));
        assert!(matches!(
            parse_document("<a><b/>"),
            Err(XmlError::Unclosed(_) | XmlError::Malformed { .. })
        ));
        assert!(matches!(parse_document("   "), Err(XmlError::Empty)));
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(XmlError::TrailingContent(_))
        ));
        assert!(matches!(
            parse_document(r#"<a x="1" x="2"/>"#),
            Err(XmlError::Malformed { .. })
        ));
    }

    #[test]
    fn test_write_then_parse_keeps_attribute_text() {
        let mut root = XmlElement::new("root");
        root.push_attr("quote", "say \"hi\" <now>");
        root.push_attr("lines", "one\ntwo\tthree");
        root.push_child(XmlElement::new("leaf").with_attr("id", "a&b"));

        let text = write_document(&root).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\""));

        let parsed = parse_document(&text).unwrap();
        assert_eq!(parsed, root);
    }
}
