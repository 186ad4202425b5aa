//! The document model.
//!
//! Text lives in lines, lines are gathered into groups of at most
//! [`MAX_GROUP_LINES`](crate::limits::MAX_GROUP_LINES), and a frame owns a
//! doubly-linked chain of groups ending with a single end-of-page (EOP)
//! line.  Marks sit on lines and follow edits; spans are named pairs of
//! marks.  Every entity lives in an arena on [`Document`] and is referred to
//! by id.

use std::fmt;

use crate::arena::{Arena, Id};
use crate::code::CodeArena;
use crate::frame::Frame;
use crate::marks::Mark;
use crate::span::Span;

pub type FrameId = Id<Frame>;
pub type GroupId = Id<Group>;
pub type LineId = Id<Line>;
pub type MarkRef = Id<Mark>;
pub type SpanId = Id<Span>;

pub const DEFAULT_FRAME_NAME: &str = "LUDWIG";
pub const COMMAND_FRAME_NAME: &str = "COMMAND";
pub const HEAP_FRAME_NAME: &str = "HEAP";
pub const OOPS_FRAME_NAME: &str = "OOPS";

/// What the EOP line of a frame displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EopLabel {
    EndOfFile,
    PageBoundary,
}

impl fmt::Display for EopLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EopLabel::EndOfFile => f.write_str("<End of File>"),
            EopLabel::PageBoundary => f.write_str("<Page Boundary>"),
        }
    }
}

/// One line of text.
#[derive(Debug, Default)]
pub struct Line {
    pub(crate) flink: Option<LineId>,
    pub(crate) blink: Option<LineId>,
    /// `None` while the line is detached from any frame.
    pub(crate) group: Option<GroupId>,
    /// Index of the line within its group.
    pub(crate) offset_nr: usize,
    pub(crate) marks: Vec<MarkRef>,
    /// Blank-padded buffer of length `len`; absent when `len` is zero.
    pub(crate) text: Option<Vec<char>>,
    pub(crate) len: usize,
    /// Characters in use, trailing blanks excluded.
    pub(crate) used: usize,
    /// Screen row the line was last drawn on, 0 when not on screen.
    pub(crate) scr_row_nr: usize,
    pub(crate) eop: Option<EopLabel>,
}

impl Line {
    pub fn chars(&self) -> &[char] {
        match &self.text {
            Some(text) => &text[..self.used],
            None => &[],
        }
    }

    pub fn is_eop(&self) -> bool {
        self.eop.is_some()
    }
}

/// A run of consecutive lines in one frame.
#[derive(Debug)]
pub struct Group {
    pub(crate) flink: Option<GroupId>,
    pub(crate) blink: Option<GroupId>,
    pub(crate) frame: FrameId,
    pub(crate) first_line: LineId,
    pub(crate) last_line: LineId,
    /// Line number of `first_line` within the frame, counting from 1.
    pub(crate) first_line_nr: usize,
    pub(crate) nr_lines: usize,
}

/// All frames, groups, lines, marks, spans and compiled code.
#[derive(Debug)]
pub struct Document {
    pub(crate) frames: Arena<Frame>,
    pub(crate) groups: Arena<Group>,
    pub(crate) lines: Arena<Line>,
    pub(crate) marks: Arena<Mark>,
    pub(crate) spans: Arena<Span>,
    /// Head of the name-ordered span list.
    pub(crate) first_span: Option<SpanId>,
    pub(crate) code: CodeArena,
    pub(crate) current: FrameId,
    pub(crate) frame_cmd: FrameId,
    pub(crate) frame_heap: FrameId,
    pub(crate) frame_oops: FrameId,
    pub(crate) space_limit: usize,
    pub(crate) margin_right: usize,
}

impl Document {
    /// A document holding the main frame and the three system frames.
    pub fn new(space_limit: usize, margin_right: usize) -> Self {
        let mut doc = Document {
            frames: Arena::new(),
            groups: Arena::new(),
            lines: Arena::new(),
            marks: Arena::new(),
            spans: Arena::new(),
            first_span: None,
            code: CodeArena::new(),
            current: Id::default_frame(),
            frame_cmd: Id::default_frame(),
            frame_heap: Id::default_frame(),
            frame_oops: Id::default_frame(),
            space_limit,
            margin_right,
        };
        doc.current = doc.frame_create(DEFAULT_FRAME_NAME);
        doc.frame_cmd = doc.frame_create(COMMAND_FRAME_NAME);
        doc.frame_heap = doc.frame_create(HEAP_FRAME_NAME);
        doc.frame_oops = doc.frame_create(OOPS_FRAME_NAME);
        doc
    }

    pub fn current_frame(&self) -> FrameId {
        self.current
    }

    pub fn frame(&self, frame: FrameId) -> &Frame {
        &self.frames[frame]
    }

    pub fn frame_mut(&mut self, frame: FrameId) -> &mut Frame {
        &mut self.frames[frame]
    }

    pub fn line(&self, line: LineId) -> &Line {
        &self.lines[line]
    }

    pub fn is_system_frame(&self, frame: FrameId) -> bool {
        frame == self.frame_cmd || frame == self.frame_heap || frame == self.frame_oops
    }

    /// Text of a frame's lines, EOP excluded, joined with newlines.
    pub fn frame_text(&self, frame: FrameId) -> String {
        let mut out = Vec::new();
        let mut line = Some(self.first_line(frame));
        while let Some(l) = line {
            if self.lines[l].is_eop() {
                break;
            }
            out.push(self.line_text(l));
            line = self.lines[l].flink;
        }
        out.join("\n")
    }
}

impl Id<Frame> {
    /// Placeholder used only while the first frames are being created.
    fn default_frame() -> Self {
        Arena::<Frame>::new().next_id()
    }
}
