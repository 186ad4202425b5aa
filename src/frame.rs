//! Frames: named, independently editable texts.
//!
//! A frame owns a chain of groups, the dot, a table of marks, margins and
//! options, an optional pair of attached files, and a space budget.  Frame
//! commands are grouped into traits implemented on [`Document`] and act on
//! the current frame.

use tracing::debug;

use crate::cmd_result::CmdFailure;
use crate::document::{Document, FrameId, GroupId, LineId, MarkRef, SpanId};
use crate::limits::MAX_STRLEN;
use crate::marks::{MARK_SLOTS, MarkId};
use crate::position::Position;
use crate::span::{Span, normalize_name};
use crate::trail_param::TrailParam;

mod edit;
mod motion;
mod predicate;
mod search;
mod spans;

#[cfg(test)]
mod tests;

pub use edit::{CaseMode, EditCommands};
pub use motion::MotionCommands;
pub use predicate::PredicateCommands;
pub use search::SearchCommands;
pub use spans::SpanCommands;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    pub auto_indent: bool,
    pub auto_wrap: bool,
    pub new_line: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            auto_indent: false,
            auto_wrap: false,
            new_line: true,
        }
    }
}

#[derive(Debug)]
pub struct Frame {
    pub(crate) first_group: GroupId,
    pub(crate) last_group: GroupId,
    pub(crate) dot: MarkRef,
    pub(crate) marks: [Option<MarkRef>; MARK_SLOTS],
    pub(crate) span: SpanId,
    pub(crate) return_frame: Option<FrameId>,
    pub(crate) margin_left: usize,
    pub(crate) margin_right: usize,
    pub(crate) margin_top: usize,
    pub(crate) margin_bottom: usize,
    pub(crate) tab_stops: Vec<bool>,
    pub(crate) options: FrameOptions,
    pub(crate) input_file: Option<usize>,
    pub(crate) output_file: Option<usize>,
    pub(crate) space_limit: usize,
    pub(crate) space_left: usize,
    pub(crate) text_modified: bool,
    /// Last search target, reused when a search parameter is empty.
    pub(crate) get_tpar: Option<TrailParam>,
    pub(crate) eqs_tpar: Option<TrailParam>,
    pub(crate) rep1_tpar: Option<TrailParam>,
    pub(crate) rep2_tpar: Option<TrailParam>,
    pub(crate) verify_tpar: Option<TrailParam>,
    pub(crate) scr_top_line: Option<LineId>,
    pub(crate) redraw: bool,
}

impl Frame {
    fn new(
        group: GroupId,
        dot: MarkRef,
        span: SpanId,
        space_limit: usize,
        margin_right: usize,
    ) -> Self {
        let tab_stops = (0..=MAX_STRLEN + 1).map(|col| col > 1 && col % 8 == 1).collect();
        Self {
            first_group: group,
            last_group: group,
            dot,
            marks: [None; MARK_SLOTS],
            span,
            return_frame: None,
            margin_left: 1,
            margin_right,
            margin_top: 0,
            margin_bottom: 0,
            tab_stops,
            options: FrameOptions::default(),
            input_file: None,
            output_file: None,
            space_limit,
            space_left: space_limit,
            text_modified: false,
            get_tpar: None,
            eqs_tpar: None,
            rep1_tpar: None,
            rep2_tpar: None,
            verify_tpar: None,
            scr_top_line: None,
            redraw: true,
        }
    }
}

impl Document {
    /// Creates a frame and its span.  The name must not be in use.
    pub(crate) fn frame_create(&mut self, name: &str) -> FrameId {
        let frame = self.frames.next_id();
        let (group, eop) = self.eop_create(frame);
        let dot = self.mark_create(Position::new(eop, 1));
        let mark_one = self.mark_create(Position::new(eop, 1));
        let mark_two = self.mark_create(Position::new(eop, 1));
        let lookup = self.span_find(name);
        let span = self.spans.alloc(Span {
            name: name.to_string(),
            flink: None,
            blink: None,
            frame: Some(frame),
            mark_one,
            mark_two,
            code: None,
        });
        self.span_link(span, lookup.predecessor);
        let allocated = self.frames.alloc(Frame::new(
            group,
            dot,
            span,
            self.space_limit,
            self.margin_right,
        ));
        debug_assert_eq!(allocated, frame);
        debug!(name, "frame created");
        frame
    }

    pub fn frame_name(&self, frame: FrameId) -> &str {
        &self.spans[self.frames[frame].span].name
    }

    /// Makes the frame called `name` current, creating it if needed.
    pub fn frame_edit(&mut self, name: &str) -> Result<(), CmdFailure> {
        let name = normalize_name(name)?;
        let lookup = self.span_find(&name);
        let target = match lookup.entry {
            Some(span) if lookup.found => match self.spans[span].frame {
                Some(frame) => frame,
                None => return Err(CmdFailure::AlreadyExists(name)),
            },
            _ => self.frame_create(&name),
        };
        if target != self.current {
            self.frames[target].return_frame = Some(self.current);
            self.current = target;
        }
        Ok(())
    }

    /// Returns to the frame that was current before this one, `count` times.
    pub fn frame_return(&mut self, count: usize) -> Result<(), CmdFailure> {
        let mut frame = self.current;
        for _ in 0..count {
            frame = self.frames[frame]
                .return_frame
                .ok_or(CmdFailure::OutOfRange)?;
        }
        self.current = frame;
        Ok(())
    }

    /// Destroys the frame called `name`, with its text, marks and the spans
    /// defined in it.
    pub fn frame_kill(&mut self, name: &str) -> Result<(), CmdFailure> {
        let name = normalize_name(name)?;
        let frame = self
            .span_named(&name)
            .and_then(|span| self.spans[span].frame)
            .ok_or_else(|| CmdFailure::NoSuchFrame(name.clone()))?;
        let f = &self.frames[frame];
        if frame == self.current
            || self.is_system_frame(frame)
            || f.input_file.is_some()
            || f.output_file.is_some()
        {
            return Err(CmdFailure::FrameInUse(name));
        }

        let doomed: Vec<SpanId> = self
            .span_list()
            .into_iter()
            .filter(|&s| {
                self.spans[s].frame.is_none()
                    && self.frame_of_line(self.marks[self.spans[s].mark_one].line) == Some(frame)
            })
            .collect();
        for span in doomed {
            self.span_free(span);
        }
        let frame_span = self.frames[frame].span;
        self.span_free(frame_span);

        let eop = self.eop_line(frame);
        let first = self.first_line(frame);
        for line in self.chain(first, eop) {
            if let Some(removed) = self.lines.free(line) {
                for mark in removed.marks {
                    self.marks.free(mark);
                }
            }
        }
        let mut group = Some(self.frames[frame].first_group);
        while let Some(g) = group {
            group = self.groups.free(g).and_then(|removed| removed.flink);
        }
        self.frames.free(frame);
        for (_, other) in self.frames.iter_mut() {
            if other.return_frame == Some(frame) {
                other.return_frame = None;
            }
        }
        debug!(name, "frame killed");
        Ok(())
    }

    pub fn dot(&self, frame: FrameId) -> Position {
        self.mark_position(self.frames[frame].dot)
    }

    pub fn set_dot(&mut self, frame: FrameId, pos: Position) {
        let dot = self.frames[frame].dot;
        self.mark_move(dot, pos);
    }

    pub fn mark_at(&self, frame: FrameId, id: MarkId) -> Option<Position> {
        self.frames[frame].marks[id.slot()].map(|m| self.mark_position(m))
    }

    pub fn set_mark(&mut self, frame: FrameId, id: MarkId, pos: Position) {
        match self.frames[frame].marks[id.slot()] {
            Some(mark) => self.mark_move(mark, pos),
            None => {
                let mark = self.mark_create(pos);
                self.frames[frame].marks[id.slot()] = Some(mark);
            }
        }
    }

    pub fn unset_mark(&mut self, frame: FrameId, id: MarkId) {
        if let Some(mark) = self.frames[frame].marks[id.slot()].take() {
            self.mark_destroy(mark);
        }
    }

    /// Records the dot as the `=` mark.
    pub(crate) fn remember_dot(&mut self, frame: FrameId) {
        let dot = self.dot(frame);
        self.set_mark(frame, MarkId::Equals, dot);
    }

    /// Records a modification at `pos`.
    pub(crate) fn note_modified(&mut self, frame: FrameId, pos: Position) {
        self.set_mark(frame, MarkId::Modified, pos);
        self.frames[frame].text_modified = true;
    }
}
