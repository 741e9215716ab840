/*!
Conversion between DyNetML meta-network documents, a neutral in-memory model,
`petgraph` graphs and a plain dictionary form.

```text
DyNetML file ──load──▶ MetaNetwork ──to_graph_library──▶ GraphHandle (petgraph / dict)
     ▲                                                          │
     └───────────────────────────save───────────────────────────┘
```
*/

use std::path::Path;

use tracing::{debug, info};

pub mod adapters;
pub mod dynetml;
pub mod error;
pub mod model;

pub use adapters::{
    AdapterError, GraphHandle, GraphLibrary, MergedGraph, MetaGraphs, MetaNetworkDict,
    ToMetaNetwork,
};
pub use dynetml::{Document, LoadOptions};
pub use error::{Error, Result};
pub use model::{
    DynamicMetaNetwork, Link, MetaNetwork, NetworkHeader, Node, NodeSet, PropertyIdentity,
    PropertyType, PropertyValue,
};

/// Loads a single meta-network document with no filtering.
pub fn load(path: impl AsRef<Path>) -> Result<MetaNetwork> {
    load_with(path, &LoadOptions::default())
}

pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<MetaNetwork> {
    let text = read_file(path.as_ref())?;
    parse_str(&text, options)
}

pub fn parse_str(text: &str, options: &LoadOptions) -> Result<MetaNetwork> {
    let filter = options.to_filter()?;
    let mn = dynetml::read_meta_network(text, &filter)?;
    debug!(
        "parsed meta-network: {} nodes, {} links",
        mn.node_count(),
        mn.link_count()
    );
    Ok(mn)
}

/// Loads a document whose root is either a meta-network or a dynamic meta-network.
pub fn load_document(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Document> {
    let text = read_file(path.as_ref())?;
    let filter = options.to_filter()?;
    Ok(dynetml::read_document(&text, &filter)?)
}

pub fn to_graph_library(mn: &MetaNetwork, library: GraphLibrary) -> Result<GraphHandle> {
    Ok(mn.to_graph_library(library)?)
}

pub fn to_dict(mn: &MetaNetwork) -> MetaNetworkDict {
    mn.to_dict()
}

pub fn to_dynetml_string<T: ToMetaNetwork + ?Sized>(source: &T) -> Result<String> {
    let mn = source.to_meta_network()?;
    Ok(dynetml::to_dynetml_string(&mn)?)
}

/// Serializes a meta-network, or any representation that converts back into one.
/// Nothing is written if serialization fails.
pub fn save<T: ToMetaNetwork + ?Sized>(source: &T, path: impl AsRef<Path>) -> Result<()> {
    let text = to_dynetml_string(source)?;
    dynetml::write_to_path(path.as_ref(), &text)?;
    info!("saved meta-network to {}", path.as_ref().display());
    Ok(())
}

pub fn save_document(document: &Document, path: impl AsRef<Path>) -> Result<()> {
    let text = dynetml::document_to_string(document)?;
    dynetml::write_to_path(path.as_ref(), &text)?;
    info!("saved document to {}", path.as_ref().display());
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    debug!("reading {}", path.display());
    std::fs::read_to_string(path).map_err(|error| Error::Io {
        path: path.to_path_buf(),
        error,
    })
}
