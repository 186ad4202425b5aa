use crate::document::LineId;

/// A position in a frame: a line and a 1-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: LineId,
    pub col: usize,
}

impl Position {
    pub fn new(line: LineId, col: usize) -> Self {
        Self { line, col }
    }
}
