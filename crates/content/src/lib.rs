//! Clipweave Content
//!
//! Reads a markup document and builds the resolved content tree.
//!
//! The builder walks the markup once: each node's style is resolved before
//! its children, and a container's open length or box is filled in from
//! its finished children on the way back up.

pub mod aggregate;
pub mod builder;
pub mod markup_reader;

pub use builder::{build_document, ContentBuilder};
pub use markup_reader::{parse_document, read_document, Document};
