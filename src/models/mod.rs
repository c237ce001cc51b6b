//! Data models for the folder tree.
//!
//! The JSON shapes match the document exchanged with the origin host, the local
//! cache and the remote store, so one serialization serves all three.

mod document;
mod node;

pub use document::*;
pub use node::*;
