//! Builds a [`DocumentTree`] from a parser event stream.

use thiserror::Error;

use super::events::Event;
use super::tree::{BlockKind, DocumentTree, Node, NodeId, NodeKind, TextKind, TextNode};

/// Protocol violations in the event stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("leave event without an open node")]
    UnbalancedLeave,

    #[error("leave event closes a {found} while the open node is a {expected}")]
    MismatchedLeave {
        expected: &'static str,
        found: &'static str,
    },

    #[error("text event outside the document")]
    TextOutsideDocument,

    #[error("a second root node was entered")]
    MultipleRoots,

    #[error("event stream ended with {depth} unclosed node(s)")]
    Unclosed { depth: usize },

    #[error("event stream produced no root node")]
    Empty,
}

/// Stack-free tree builder.
///
/// `current` is the insertion cursor; it follows parent links on leave, so no
/// explicit stack is kept.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    current: Option<NodeId>,
    /// Accumulating text node of the code block the cursor is in
    code_text: Option<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a complete event stream.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] when the stream is not strictly nested.
    pub fn build(events: impl IntoIterator<Item = Event>) -> Result<DocumentTree, TreeError> {
        let mut builder = Self::new();
        for event in events {
            builder.feed(event)?;
        }
        builder.finish()
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] on any protocol violation.
    pub fn feed(&mut self, event: Event) -> Result<(), TreeError> {
        match event {
            Event::EnterBlock(kind) => {
                let is_code = matches!(kind, BlockKind::CodeBlock { .. });
                self.enter(NodeKind::Block(kind))?;
                if is_code {
                    self.code_text = None;
                }
                Ok(())
            }
            Event::EnterSpan(kind) => self.enter(NodeKind::Span(kind)),
            Event::LeaveBlock => self.leave(true),
            Event::LeaveSpan => self.leave(false),
            Event::Text(kind, content) => self.text(kind, content),
        }
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Fails if the root was never entered or some node was left open.
    pub fn finish(self) -> Result<DocumentTree, TreeError> {
        let root = self.root.ok_or(TreeError::Empty)?;
        if let Some(open) = self.current {
            return Err(TreeError::Unclosed {
                depth: self.depth_of(open) + 1,
            });
        }
        Ok(DocumentTree::from_parts(self.nodes, root))
    }

    /// True while a root has been entered and not yet left.
    pub const fn is_open(&self) -> bool {
        self.current.is_some()
    }

    fn enter(&mut self, kind: NodeKind) -> Result<(), TreeError> {
        let id = NodeId::from_index(self.nodes.len());
        match self.current {
            None => {
                if self.root.is_some() {
                    return Err(TreeError::MultipleRoots);
                }
                self.nodes.push(Node::new(kind, None));
                self.root = Some(id);
            }
            Some(parent) => {
                self.nodes.push(Node::new(kind, Some(parent)));
                self.append_child(parent, id);
            }
        }
        self.current = Some(id);
        Ok(())
    }

    fn leave(&mut self, block: bool) -> Result<(), TreeError> {
        let current = self.current.ok_or(TreeError::UnbalancedLeave)?;
        let node = &self.nodes[current.index()];
        let open_is_block = match node.kind {
            NodeKind::Block(_) => true,
            NodeKind::Span(_) => false,
            NodeKind::Text(_) => return Err(TreeError::UnbalancedLeave),
        };
        if open_is_block != block {
            return Err(TreeError::MismatchedLeave {
                expected: kind_name(open_is_block),
                found: kind_name(block),
            });
        }
        if matches!(node.kind, NodeKind::Block(BlockKind::CodeBlock { .. })) {
            self.code_text = None;
        }
        self.current = node.parent;
        Ok(())
    }

    fn text(&mut self, kind: TextKind, content: String) -> Result<(), TreeError> {
        let current = self.current.ok_or(TreeError::TextOutsideDocument)?;

        if matches!(
            self.nodes[current.index()].kind,
            NodeKind::Block(BlockKind::CodeBlock { .. })
        ) {
            if let Some(acc) = self.code_text {
                if let NodeKind::Text(text) = &mut self.nodes[acc.index()].kind {
                    text.content.push_str(&content);
                }
                return Ok(());
            }
            let id = self.push_text(current, TextKind::Code, content);
            self.code_text = Some(id);
            return Ok(());
        }

        self.push_text(current, kind, content);
        Ok(())
    }

    fn push_text(&mut self, parent: NodeId, kind: TextKind, content: String) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(
            NodeKind::Text(TextNode { kind, content }),
            Some(parent),
        ));
        self.append_child(parent, id);
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    fn depth_of(&self, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.nodes[id.index()].parent {
            depth += 1;
            id = parent;
        }
        depth
    }
}

const fn kind_name(block: bool) -> &'static str {
    if block { "block" } else { "span" }
}

impl DocumentTree {
    /// Parse markdown source into a document tree.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] if the parser produced an unbalanced stream.
    pub fn parse(source: &str) -> Result<Self, TreeError> {
        let arena = comrak::Arena::new();
        let root = comrak::parse_document(&arena, source, &super::events::markdown_options());
        TreeBuilder::build(super::events::MarkdownEvents::new(root))
    }
}
