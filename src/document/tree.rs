//! Core document tree types.

use std::fmt::Write as _;

/// Index of a node inside a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        // Documents never approach u32::MAX nodes; saturate instead of wrapping.
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Position of the node in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Flavor of a text leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Regular prose
    Normal,
    /// A line break in the source that renders as a space
    SoftBreak,
    /// A forced line break (two trailing spaces or backslash)
    HardBreak,
    /// Code, either inline or a code block line
    Code,
    /// Raw inline HTML
    Html,
}

/// A text leaf with its owned content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub kind: TextKind,
    pub content: String,
}

impl TextNode {
    /// Byte length of the content.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Inline span types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    Emphasis,
    Strong,
    Code,
    Strikethrough,
    Link {
        url: String,
        title: String,
    },
    Image {
        src: String,
        title: String,
    },
    /// Inline container the viewer does not style (underline, superscript, ...)
    Other(&'static str),
}

/// Unordered list bullet character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bullet {
    Dash,
    Star,
    Plus,
}

/// Block-level container types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Document,
    Paragraph,
    Heading {
        level: u8,
    },
    HorizontalRule,
    CodeBlock {
        info: String,
    },
    Quote,
    OrderedList {
        start: u64,
    },
    UnorderedList {
        bullet: Bullet,
    },
    /// `task` is `Some(checked)` for GFM task list items
    ListItem {
        task: Option<bool>,
    },
    /// Block container the viewer does not render (tables, HTML, footnotes, ...)
    Other(&'static str),
}

/// Payload of a document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(TextNode),
    Span(SpanKind),
    Block(BlockKind),
}

impl NodeKind {
    pub const fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    pub const fn as_text(&self) -> Option<&TextNode> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A node in the document arena.
///
/// `parent` is a plain back-reference; the arena owns every node and children
/// form an ordered sibling chain starting at `first_child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    pub(crate) const fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }
}

/// A parsed markdown document.
///
/// Built once at load, read every frame, dropped as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DocumentTree {
    pub(crate) const fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// The document container block.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node.
    ///
    /// Ids handed out by this tree are always valid, so indexing never fails
    /// for them.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the children of `id` in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).first_child,
        }
    }

    /// Concatenated text of every descendant of `id`.
    ///
    /// Soft and hard breaks become single spaces so the result is always one line.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for (node, _) in self.descendants(id) {
            if let NodeKind::Text(text) = &self.get(node).kind {
                match text.kind {
                    TextKind::SoftBreak | TextKind::HardBreak => out.push(' '),
                    TextKind::Html => {}
                    TextKind::Normal | TextKind::Code => out.push_str(&text.content),
                }
            }
        }
        out
    }

    /// Human-readable outline of the tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (id, depth) in self.descendants(self.root) {
            let indent = "  ".repeat(depth);
            let _ = match &self.get(id).kind {
                NodeKind::Text(text) => {
                    writeln!(out, "{indent}[TEXT] {:?} {:?}", text.kind, text.content)
                }
                NodeKind::Span(span) => writeln!(out, "{indent}[SPAN] {span:?}"),
                NodeKind::Block(block) => writeln!(out, "{indent}[BLOCK] {block:?}"),
            };
        }
        out
    }

    /// Pre-order walk of `id` and everything below it, with depth relative to `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![(id, 0)],
        }
    }
}

/// Pre-order iterator over a subtree.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    tree: &'a DocumentTree,
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for Descendants<'_> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let start = self.stack.len();
        self.stack
            .extend(self.tree.children(id).map(|child| (child, depth + 1)));
        self.stack[start..].reverse();
        Some((id, depth))
    }
}

/// Iterator over a node's children.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get(current).next_sibling;
        Some(current)
    }
}
