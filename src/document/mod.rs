//! Markdown document parsing.
//!
//! This module handles:
//! - Parsing markdown with comrak
//! - Translating the AST into a flat enter/leave event stream
//! - Building the persistent document tree the renderer walks every frame

mod builder;
mod events;
mod tree;

pub use builder::{TreeBuilder, TreeError};
pub use events::{Event, MarkdownEvents, markdown_options, parse_events};
pub use tree::{
    BlockKind, Bullet, Children, Descendants, DocumentTree, Node, NodeId, NodeKind, SpanKind, TextKind,
    TextNode,
};
