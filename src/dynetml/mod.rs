/*
 * DyNetML input and output.
 *
 * Loading runs in two stages: `xml_tree` turns the text into an owned element tree and
 * `reader` builds the model from it, applying the `LoadFilter` derived from `LoadOptions`.
 * Saving reverses the stages through `writer`.
 */

pub mod options;
pub mod reader;
pub mod writer;
pub mod xml_tree;

pub use options::{ConfigError, LoadFilter, LoadOptions, Selection};
pub use reader::{Document, FormatError, read_document, read_meta_network};
pub use writer::{SerializationError, document_to_string, to_dynetml_string, write_to_path};
pub use xml_tree::{XmlElement, XmlError};
