/*
 * This module defines the library-agnostic meta-network model every other layer talks to.
 * The reader builds it, the adapters consume it, and the writer serializes it.
 */

pub mod dynamic;
pub mod edge;
pub mod meta_network;
pub mod node;
pub mod value;

pub use dynamic::{DynamicMetaNetwork, DynamicRoot, SliceError};
pub use edge::{Link, Network, NetworkHeader, DEFAULT_WEIGHT};
pub use meta_network::{MetaNetwork, ModelError};
pub use node::{Node, NodeSet};
pub use value::{PropertyIdentity, PropertyType, PropertyValue, ValueError, parse_finite};
