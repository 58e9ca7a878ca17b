//! Greedy line packing under a character budget.

use std::num::NonZeroUsize;

use crate::ui::style::TextStyle;

/// A styled run of text on one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub style: TextStyle,
}

/// The row currently being filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine<'a> {
    pub fragments: Vec<Fragment<'a>>,
    /// Codepoints placed so far
    pub char_count: usize,
}

impl<'a> TextLine<'a> {
    fn push(&mut self, text: &'a str, chars: usize, style: TextStyle) {
        self.fragments.push(Fragment { text, style });
        self.char_count += chars;
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn clear(&mut self) {
        self.fragments.clear();
        self.char_count = 0;
    }
}

/// Receives each packed row as soon as it is flushed.
pub trait RowSink<'a> {
    fn emit_row(&mut self, fragments: &[Fragment<'a>]);
}

impl<'a> RowSink<'a> for Vec<Vec<Fragment<'a>>> {
    fn emit_row(&mut self, fragments: &[Fragment<'a>]) {
        self.push(fragments.to_vec());
    }
}

/// Packs styled fragments into rows of at most `budget` codepoints.
///
/// Overflowing fragments are split at the last space that still fits; the
/// space is dropped. A fragment with no usable space moves to a fresh row if it
/// fits one, and is split mid-word otherwise.
#[derive(Debug, Clone)]
pub struct LinePacker<'a> {
    budget: NonZeroUsize,
    line: TextLine<'a>,
}

impl<'a> LinePacker<'a> {
    pub const fn new(budget: NonZeroUsize) -> Self {
        Self {
            budget,
            line: TextLine {
                fragments: Vec::new(),
                char_count: 0,
            },
        }
    }

    pub const fn budget(&self) -> NonZeroUsize {
        self.budget
    }

    pub const fn line(&self) -> &TextLine<'a> {
        &self.line
    }

    pub fn push(&mut self, text: &'a str, style: TextStyle, sink: &mut impl RowSink<'a>) {
        let budget = self.budget.get();
        let mut rest = text;
        // The line is never full at the top of the loop, so `remaining >= 1`
        // and every branch consumes at least one codepoint or flushes a
        // non-empty line.
        loop {
            // Rows never start with a space, however the text was split.
            if self.line.is_empty() {
                rest = rest.trim_start_matches(' ');
            }
            if rest.is_empty() {
                return;
            }
            let len = rest.chars().count();
            let remaining = budget - self.line.char_count;

            if len <= remaining {
                self.line.push(rest, len, style);
                if self.line.char_count >= budget {
                    self.flush(sink);
                }
                return;
            }

            if let Some((byte, chars)) = last_space_within(rest, remaining) {
                if chars > 0 {
                    self.line.push(&rest[..byte], chars, style);
                }
                self.flush(sink);
                rest = rest[byte..].trim_start_matches(' ');
            } else if len <= budget {
                self.flush(sink);
            } else {
                let split = byte_offset(rest, remaining);
                self.line.push(&rest[..split], remaining, style);
                self.flush(sink);
                rest = &rest[split..];
            }
        }
    }

    /// A soft line break in the source becomes one space.
    pub fn push_soft_break(&mut self, style: TextStyle, sink: &mut impl RowSink<'a>) {
        self.push(" ", style, sink);
    }

    /// Emit the partial line, if any.
    pub fn flush(&mut self, sink: &mut impl RowSink<'a>) {
        if !self.line.is_empty() {
            sink.emit_row(&self.line.fragments);
            self.line.clear();
        }
    }
}

/// Byte offset and codepoint index of the last space at codepoint index
/// `<= limit`.
fn last_space_within(text: &str, limit: usize) -> Option<(usize, usize)> {
    text.char_indices()
        .take(limit.saturating_add(1))
        .enumerate()
        .filter(|(_, (_, c))| *c == ' ')
        .map(|(chars, (byte, _))| (byte, chars))
        .last()
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}
