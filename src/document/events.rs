//! Enter/leave event stream over a comrak AST.
//!
//! The tree builder consumes a flat sequence of events in the shape of a
//! SAX-style markdown parser. This module walks comrak's AST with
//! `traverse()` and produces that sequence lazily.

use std::cell::RefCell;
use std::collections::VecDeque;

use comrak::arena_tree::{NodeEdge, Traverse};
use comrak::nodes::{Ast, AstNode, ListType, NodeValue};
use comrak::Options;

use super::tree::{BlockKind, Bullet, SpanKind, TextKind};

/// One parser event. All payloads are owned copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EnterBlock(BlockKind),
    LeaveBlock,
    EnterSpan(SpanKind),
    LeaveSpan,
    Text(TextKind, String),
}

/// Comrak options used for every document.
pub fn markdown_options() -> Options {
    let mut options = Options::default();

    // Enable GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;

    options
}

/// Pull-style event iterator over a parsed comrak document.
pub struct MarkdownEvents<'a> {
    traverse: Traverse<'a, RefCell<Ast>>,
    pending: VecDeque<Event>,
}

impl<'a> MarkdownEvents<'a> {
    pub fn new(root: &'a AstNode<'a>) -> Self {
        Self {
            traverse: root.traverse(),
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for MarkdownEvents<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            match self.traverse.next()? {
                NodeEdge::Start(node) => start_events(node, &mut self.pending),
                NodeEdge::End(node) => {
                    if let Some(event) = end_event(node) {
                        return Some(event);
                    }
                }
            }
        }
    }
}

/// Collect the full event sequence for `source`.
pub fn parse_events(source: &str) -> Vec<Event> {
    let arena = comrak::Arena::new();
    let root = comrak::parse_document(&arena, source, &markdown_options());
    MarkdownEvents::new(root).collect()
}

fn start_events<'a>(node: &'a AstNode<'a>, out: &mut VecDeque<Event>) {
    let value = &node.data.borrow().value;
    match value {
        NodeValue::Document => out.push_back(Event::EnterBlock(BlockKind::Document)),
        NodeValue::Paragraph => {
            if !in_tight_item(node) {
                out.push_back(Event::EnterBlock(BlockKind::Paragraph));
            }
        }
        NodeValue::Heading(heading) => out.push_back(Event::EnterBlock(BlockKind::Heading {
            level: heading.level,
        })),
        NodeValue::ThematicBreak => {
            out.push_back(Event::EnterBlock(BlockKind::HorizontalRule));
            out.push_back(Event::LeaveBlock);
        }
        NodeValue::CodeBlock(code) => {
            out.push_back(Event::EnterBlock(BlockKind::CodeBlock {
                info: code.info.clone(),
            }));
            for line in code.literal.split_inclusive('\n') {
                out.push_back(Event::Text(TextKind::Code, line.to_string()));
            }
            out.push_back(Event::LeaveBlock);
        }
        NodeValue::BlockQuote => out.push_back(Event::EnterBlock(BlockKind::Quote)),
        NodeValue::List(list) => {
            let kind = match list.list_type {
                ListType::Ordered => BlockKind::OrderedList {
                    start: list.start as u64,
                },
                ListType::Bullet => BlockKind::UnorderedList {
                    bullet: match list.bullet_char {
                        b'*' => Bullet::Star,
                        b'+' => Bullet::Plus,
                        _ => Bullet::Dash,
                    },
                },
            };
            out.push_back(Event::EnterBlock(kind));
        }
        NodeValue::Item(_) => out.push_back(Event::EnterBlock(BlockKind::ListItem { task: None })),
        NodeValue::TaskItem(symbol) => out.push_back(Event::EnterBlock(BlockKind::ListItem {
            task: Some(symbol.is_some()),
        })),
        NodeValue::Text(text) => out.push_back(Event::Text(TextKind::Normal, text.clone())),
        NodeValue::SoftBreak => out.push_back(Event::Text(TextKind::SoftBreak, "\n".to_string())),
        NodeValue::LineBreak => out.push_back(Event::Text(TextKind::HardBreak, "\n".to_string())),
        NodeValue::HtmlInline(html) => out.push_back(Event::Text(TextKind::Html, html.clone())),
        NodeValue::Code(code) => {
            out.push_back(Event::EnterSpan(SpanKind::Code));
            out.push_back(Event::Text(TextKind::Code, code.literal.clone()));
            out.push_back(Event::LeaveSpan);
        }
        NodeValue::Emph => out.push_back(Event::EnterSpan(SpanKind::Emphasis)),
        NodeValue::Strong => out.push_back(Event::EnterSpan(SpanKind::Strong)),
        NodeValue::Strikethrough => out.push_back(Event::EnterSpan(SpanKind::Strikethrough)),
        NodeValue::Link(link) => out.push_back(Event::EnterSpan(SpanKind::Link {
            url: link.url.clone(),
            title: link.title.clone(),
        })),
        NodeValue::Image(image) => out.push_back(Event::EnterSpan(SpanKind::Image {
            src: image.url.clone(),
            title: image.title.clone(),
        })),
        other => match classify_other(node, other) {
            Container::Block => out.push_back(Event::EnterBlock(BlockKind::Other(other_name(other)))),
            Container::Span => out.push_back(Event::EnterSpan(SpanKind::Other(other_name(other)))),
            Container::Leaf => {}
        },
    }
}

fn end_event<'a>(node: &'a AstNode<'a>) -> Option<Event> {
    let value = &node.data.borrow().value;
    match value {
        NodeValue::Document
        | NodeValue::Heading(_)
        | NodeValue::BlockQuote
        | NodeValue::List(_)
        | NodeValue::Item(_)
        | NodeValue::TaskItem(_) => Some(Event::LeaveBlock),
        NodeValue::Paragraph => (!in_tight_item(node)).then_some(Event::LeaveBlock),
        NodeValue::Emph
        | NodeValue::Strong
        | NodeValue::Strikethrough
        | NodeValue::Link(_)
        | NodeValue::Image(_) => Some(Event::LeaveSpan),
        // Emitted in full on the start edge.
        NodeValue::ThematicBreak
        | NodeValue::CodeBlock(_)
        | NodeValue::Code(_)
        | NodeValue::Text(_)
        | NodeValue::SoftBreak
        | NodeValue::LineBreak
        | NodeValue::HtmlInline(_) => None,
        other => match classify_other(node, other) {
            Container::Block => Some(Event::LeaveBlock),
            Container::Span => Some(Event::LeaveSpan),
            Container::Leaf => None,
        },
    }
}

enum Container {
    Block,
    Span,
    Leaf,
}

fn classify_other<'a>(node: &'a AstNode<'a>, value: &NodeValue) -> Container {
    if value.block() {
        Container::Block
    } else if node.first_child().is_some() {
        Container::Span
    } else {
        Container::Leaf
    }
}

fn other_name(value: &NodeValue) -> &'static str {
    match value {
        NodeValue::Table(_) => "table",
        NodeValue::TableRow(_) => "table_row",
        NodeValue::TableCell => "table_cell",
        NodeValue::HtmlBlock(_) => "html",
        NodeValue::FootnoteDefinition(_) => "footnote",
        NodeValue::DescriptionList => "description_list",
        NodeValue::Superscript => "superscript",
        _ => "unknown",
    }
}

/// Tight list items carry their inline content directly, without a paragraph.
fn in_tight_item<'a>(node: &'a AstNode<'a>) -> bool {
    let Some(item) = node.parent() else {
        return false;
    };
    if !matches!(
        item.data.borrow().value,
        NodeValue::Item(_) | NodeValue::TaskItem(_)
    ) {
        return false;
    }
    item.parent().is_some_and(|list| match &list.data.borrow().value {
        NodeValue::List(list) => list.tight,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_produces_balanced_events() {
        let events = parse_events("# Title\n");
        assert_eq!(
            events,
            vec![
                Event::EnterBlock(BlockKind::Document),
                Event::EnterBlock(BlockKind::Heading { level: 1 }),
                Event::Text(TextKind::Normal, "Title".to_string()),
                Event::LeaveBlock,
                Event::LeaveBlock,
            ]
        );
    }

    #[test]
    fn test_code_block_emits_one_text_per_line() {
        let events = parse_events("```rust\nfn a() {}\nfn b() {}\n```\n");
        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Text(TextKind::Code, s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["fn a() {}\n", "fn b() {}\n"]);
        assert!(events.contains(&Event::EnterBlock(BlockKind::CodeBlock {
            info: "rust".to_string()
        })));
    }

    #[test]
    fn test_tight_list_items_have_no_paragraph() {
        let events = parse_events("- one\n- two\n");
        assert!(!events.contains(&Event::EnterBlock(BlockKind::Paragraph)));
        assert!(events.contains(&Event::Text(TextKind::Normal, "one".to_string())));
    }

    #[test]
    fn test_loose_list_items_keep_paragraphs() {
        let events = parse_events("- one\n\n- two\n");
        let paragraphs = events
            .iter()
            .filter(|e| **e == Event::EnterBlock(BlockKind::Paragraph))
            .count();
        assert_eq!(paragraphs, 2);
    }

    #[test]
    fn test_inline_code_is_wrapped_in_span() {
        let events = parse_events("use `x` here\n");
        let pos = events
            .iter()
            .position(|e| *e == Event::EnterSpan(SpanKind::Code))
            .unwrap();
        assert_eq!(events[pos + 1], Event::Text(TextKind::Code, "x".to_string()));
        assert_eq!(events[pos + 2], Event::LeaveSpan);
    }

    #[test]
    fn test_soft_break_is_newline_text() {
        let events = parse_events("one\ntwo\n");
        assert!(events.contains(&Event::Text(TextKind::SoftBreak, "\n".to_string())));
    }

    #[test]
    fn test_task_item_reports_checked_state() {
        let events = parse_events("- [x] done\n- [ ] todo\n");
        assert!(events.contains(&Event::EnterBlock(BlockKind::ListItem { task: Some(true) })));
        assert!(events.contains(&Event::EnterBlock(BlockKind::ListItem { task: Some(false) })));
    }

    #[test]
    fn test_ordered_list_carries_start() {
        let events = parse_events("3. three\n4. four\n");
        assert!(events.contains(&Event::EnterBlock(BlockKind::OrderedList { start: 3 })));
    }

    #[test]
    fn test_image_span_carries_source() {
        let events = parse_events("![alt](pic.png \"t\")\n");
        assert!(events.contains(&Event::EnterSpan(SpanKind::Image {
            src: "pic.png".to_string(),
            title: "t".to_string(),
        })));
    }

    #[test]
    fn test_table_maps_to_other_block() {
        let events = parse_events("| a |\n|---|\n| b |\n");
        assert!(events.contains(&Event::EnterBlock(BlockKind::Other("table"))));
        let enters = events
            .iter()
            .filter(|e| matches!(e, Event::EnterBlock(_) | Event::EnterSpan(_)))
            .count();
        let leaves = events
            .iter()
            .filter(|e| matches!(e, Event::LeaveBlock | Event::LeaveSpan))
            .count();
        assert_eq!(enters, leaves);
    }
}
