//! Span registry: named text regions bounded by two marks.
//!
//! Spans are kept in a doubly-linked list sorted by name.  Every frame owns
//! one span carrying the frame's name; looking that span up re-anchors its
//! marks so it always covers the whole frame.

use tracing::debug;

use crate::cmd_result::CmdFailure;
use crate::code::CodeRef;
use crate::document::{Document, FrameId, MarkRef, SpanId};
use crate::limits::MAX_NAME_LEN;
use crate::position::Position;

pub struct Span {
    pub(crate) name: String,
    pub(crate) flink: Option<SpanId>,
    pub(crate) blink: Option<SpanId>,
    /// Set when this is the span of a frame.
    pub(crate) frame: Option<FrameId>,
    pub(crate) mark_one: MarkRef,
    pub(crate) mark_two: MarkRef,
    pub(crate) code: Option<CodeRef>,
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name)
            .field("frame", &self.frame)
            .finish()
    }
}

/// Result of [`Document::span_find`].  When the name is absent, `entry` is
/// the first span that sorts after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanLookup {
    pub found: bool,
    pub entry: Option<SpanId>,
    pub predecessor: Option<SpanId>,
}

/// Uppercases and trims a span or frame name, rejecting empty or overlong names.
pub fn normalize_name(name: &str) -> Result<String, CmdFailure> {
    let name = name.trim().to_uppercase();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN || name.contains('\n') {
        return Err(CmdFailure::BadParameter(name));
    }
    Ok(name)
}

impl Document {
    pub fn span_find(&mut self, name: &str) -> SpanLookup {
        let mut predecessor = None;
        let mut cursor = self.first_span;
        while let Some(span) = cursor {
            match self.spans[span].name.as_str().cmp(name) {
                std::cmp::Ordering::Less => {
                    predecessor = Some(span);
                    cursor = self.spans[span].flink;
                }
                std::cmp::Ordering::Equal => {
                    if let Some(frame) = self.spans[span].frame {
                        self.span_cover_frame(span, frame);
                    }
                    return SpanLookup {
                        found: true,
                        entry: Some(span),
                        predecessor,
                    };
                }
                std::cmp::Ordering::Greater => break,
            }
        }
        SpanLookup {
            found: false,
            entry: cursor,
            predecessor,
        }
    }

    /// The span called `name`, if any.
    pub fn span_named(&mut self, name: &str) -> Option<SpanId> {
        let lookup = self.span_find(name);
        lookup.found.then_some(lookup.entry).flatten()
    }

    fn span_cover_frame(&mut self, span: SpanId, frame: FrameId) {
        let first = self.first_line(frame);
        let eop = self.eop_line(frame);
        let (one, two) = (self.spans[span].mark_one, self.spans[span].mark_two);
        self.mark_move(one, Position::new(first, 1));
        self.mark_move(two, Position::new(eop, 1));
    }

    /// Defines `name` to cover the text between two positions in one frame.
    pub fn span_create(
        &mut self,
        name: &str,
        one: Position,
        two: Position,
    ) -> Result<SpanId, CmdFailure> {
        let name = normalize_name(name)?;
        match (self.frame_of_line(one.line), self.frame_of_line(two.line)) {
            (Some(a), Some(b)) if a == b => {}
            _ => return Err(CmdFailure::DifferentFrames),
        }
        let (one, two) = if self.position_le(one, two) {
            (one, two)
        } else {
            (two, one)
        };

        let lookup = self.span_find(&name);
        if lookup.found
            && let Some(span) = lookup.entry
        {
            if self.spans[span].frame.is_some() {
                return Err(CmdFailure::AlreadyExists(name));
            }
            let (m1, m2) = (self.spans[span].mark_one, self.spans[span].mark_two);
            self.mark_move(m1, one);
            self.mark_move(m2, two);
            if let Some(code) = self.spans[span].code.take() {
                self.code.discard(code);
            }
            debug!(name, "span redefined");
            return Ok(span);
        }

        let mark_one = self.mark_create(one);
        let mark_two = self.mark_create(two);
        let span = self.spans.alloc(Span {
            name,
            flink: None,
            blink: None,
            frame: None,
            mark_one,
            mark_two,
            code: None,
        });
        self.span_link(span, lookup.predecessor);
        Ok(span)
    }

    /// Links `span` into the list after `predecessor`, or at the head.
    pub(crate) fn span_link(&mut self, span: SpanId, predecessor: Option<SpanId>) {
        let next = match predecessor {
            Some(p) => self.spans[p].flink,
            None => self.first_span,
        };
        self.spans[span].blink = predecessor;
        self.spans[span].flink = next;
        match predecessor {
            Some(p) => self.spans[p].flink = Some(span),
            None => self.first_span = Some(span),
        }
        if let Some(n) = next {
            self.spans[n].blink = Some(span);
        }
    }

    /// Removes a span that does not belong to a frame.
    pub fn span_destroy(&mut self, span: SpanId) -> Result<(), CmdFailure> {
        if self.spans[span].frame.is_some() {
            return Err(CmdFailure::FrameInUse(self.spans[span].name.clone()));
        }
        self.span_free(span);
        Ok(())
    }

    /// Unlinks and frees a span with its marks and code.
    pub(crate) fn span_free(&mut self, span: SpanId) {
        let Some(removed) = self.spans.free(span) else {
            return;
        };
        match removed.blink {
            Some(p) => self.spans[p].flink = removed.flink,
            None => self.first_span = removed.flink,
        }
        if let Some(n) = removed.flink {
            self.spans[n].blink = removed.blink;
        }
        self.mark_destroy(removed.mark_one);
        self.mark_destroy(removed.mark_two);
        if let Some(code) = removed.code {
            self.code.discard(code);
        }
        debug!(name = removed.name, "span destroyed");
    }

    /// Spans in name order.
    pub fn span_list(&self) -> Vec<SpanId> {
        let mut out = Vec::new();
        let mut cursor = self.first_span;
        while let Some(span) = cursor {
            out.push(span);
            cursor = self.spans[span].flink;
        }
        out
    }

    pub fn span_name(&self, span: SpanId) -> &str {
        &self.spans[span].name
    }

    pub fn span_bounds(&self, span: SpanId) -> (Position, Position) {
        (
            self.mark_position(self.spans[span].mark_one),
            self.mark_position(self.spans[span].mark_two),
        )
    }

    /// The span's text, one string per line.
    pub fn span_text(&self, span: SpanId) -> Vec<String> {
        let (one, two) = self.span_bounds(span);
        self.text_between(one, two)
    }

    /// Text from `from` up to, not including, `to`.
    pub fn text_between(&self, from: Position, to: Position) -> Vec<String> {
        let mut out = Vec::new();
        for line in self.chain(from.line, to.line) {
            let chars = self.lines[line].chars();
            let start = if line == from.line { from.col } else { 1 };
            let end = if line == to.line {
                to.col.min(chars.len() + 1)
            } else {
                chars.len() + 1
            };
            let text: String = if start < end {
                chars[start - 1..end - 1].iter().collect()
            } else {
                String::new()
            };
            out.push(text);
        }
        out
    }
}
