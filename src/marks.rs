//! Marks: positions that follow the text they are attached to.
//!
//! Each mark records its line and column, and is also registered on that
//! line's mark list so that edits to a line can find the marks to adjust.

use crate::document::{Document, LineId, MarkRef};
use crate::limits::MAX_USER_MARK;
use crate::position::Position;

/// A unique identifier for a frame mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkId {
    /// `=`, the position before the last motion or the start of the last change.
    Equals,
    /// `%`, the position of the last modification.
    Modified,
    /// `@1` to `@9`.
    Numbered(u8),
}

pub const NUMBERED_MARK_RANGE: std::ops::RangeInclusive<u8> = 1u8..=MAX_USER_MARK;

/// Slots in a frame's mark table.
pub const MARK_SLOTS: usize = 2 + MAX_USER_MARK as usize;

impl MarkId {
    pub fn slot(self) -> usize {
        match self {
            MarkId::Equals => 0,
            MarkId::Modified => 1,
            MarkId::Numbered(n) => 1 + n as usize,
        }
    }

    pub fn numbered(n: usize) -> Option<Self> {
        u8::try_from(n)
            .ok()
            .filter(|n| NUMBERED_MARK_RANGE.contains(n))
            .map(MarkId::Numbered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub(crate) line: LineId,
    pub(crate) col: usize,
}

impl Document {
    pub fn mark_create(&mut self, pos: Position) -> MarkRef {
        let mark = self.marks.alloc(Mark {
            line: pos.line,
            col: pos.col,
        });
        self.lines[pos.line].marks.push(mark);
        mark
    }

    pub fn mark_destroy(&mut self, mark: MarkRef) {
        if let Some(removed) = self.marks.free(mark)
            && let Some(line) = self.lines.get_mut(removed.line)
        {
            line.marks.retain(|&m| m != mark);
        }
    }

    pub fn mark_move(&mut self, mark: MarkRef, pos: Position) {
        let old = self.marks[mark].line;
        if old != pos.line {
            self.lines[old].marks.retain(|&m| m != mark);
            self.lines[pos.line].marks.push(mark);
        }
        self.marks[mark] = Mark {
            line: pos.line,
            col: pos.col,
        };
    }

    pub fn mark_position(&self, mark: MarkRef) -> Position {
        let m = self.marks[mark];
        Position::new(m.line, m.col)
    }

    /// Orders two positions in the same frame.
    pub fn position_le(&self, a: Position, b: Position) -> bool {
        let na = self.line_to_number(a.line).unwrap_or(0);
        let nb = self.line_to_number(b.line).unwrap_or(0);
        (na, a.col) <= (nb, b.col)
    }

    /// Moves every mark in `[from, to)` to `to`.
    pub fn marks_squeeze(&mut self, from: Position, to: Position) {
        let mut line = Some(from.line);
        while let Some(l) = line {
            let moving: Vec<MarkRef> = self.lines[l]
                .marks
                .iter()
                .copied()
                .filter(|&m| {
                    let col = self.marks[m].col;
                    (l != from.line || col >= from.col) && (l != to.line || col < to.col)
                })
                .collect();
            for mark in moving {
                self.mark_move(mark, to);
            }
            if l == to.line {
                break;
            }
            line = self.lines[l].flink;
        }
    }

    /// Moves the marks on `line` in columns `col..col + width` to `dst`,
    /// keeping their offsets from `col`.
    pub fn marks_shift(&mut self, line: LineId, col: usize, width: usize, dst: Position) {
        let moving: Vec<MarkRef> = self.lines[line]
            .marks
            .iter()
            .copied()
            .filter(|&m| (col..col + width).contains(&self.marks[m].col))
            .collect();
        for mark in moving {
            let offset = self.marks[mark].col - col;
            self.mark_move(mark, Position::new(dst.line, dst.col + offset));
        }
    }

    /// Adds `n` to the column of every mark on `line` at or after `col`.
    pub(crate) fn marks_insert_gap(&mut self, line: LineId, col: usize, n: usize) {
        for &mark in &self.lines[line].marks {
            if self.marks[mark].col >= col {
                self.marks[mark].col += n;
            }
        }
    }

    /// Closes a gap of `n` columns starting at `col` on `line`: marks inside
    /// the gap move to `col`, marks after it shift left.
    pub(crate) fn marks_close_gap(&mut self, line: LineId, col: usize, n: usize) {
        for &mark in &self.lines[line].marks {
            let m = &mut self.marks[mark];
            if m.col >= col + n {
                m.col -= n;
            } else if m.col > col {
                m.col = col;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::DEFAULT_SPACE_LIMIT;

    fn doc_with_lines(texts: &[&str]) -> Document {
        let mut doc = Document::new(DEFAULT_SPACE_LIMIT, 80);
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        let (first, last) = doc.lines_from_text(texts).unwrap().unwrap();
        doc.lines_inject(first, last, eop).unwrap();
        doc
    }

    fn assert_registered(doc: &Document) {
        for (id, mark) in doc.marks.iter() {
            assert!(doc.lines[mark.line].marks.contains(&id));
        }
    }

    #[test]
    fn test_slots() {
        assert_eq!(MarkId::Equals.slot(), 0);
        assert_eq!(MarkId::Numbered(9).slot(), MARK_SLOTS - 1);
        assert_eq!(MarkId::numbered(0), None);
        assert_eq!(MarkId::numbered(10), None);
        assert_eq!(MarkId::numbered(3), Some(MarkId::Numbered(3)));
    }

    #[test]
    fn test_create_move_destroy() {
        let mut doc = doc_with_lines(&["abc", "def"]);
        let frame = doc.current_frame();
        let l1 = doc.line_from_number(frame, 1).unwrap();
        let l2 = doc.line_from_number(frame, 2).unwrap();
        let mark = doc.mark_create(Position::new(l1, 2));
        assert_registered(&doc);
        doc.mark_move(mark, Position::new(l2, 3));
        assert!(!doc.lines[l1].marks.contains(&mark));
        assert_eq!(doc.mark_position(mark), Position::new(l2, 3));
        assert_registered(&doc);
        doc.mark_destroy(mark);
        assert!(!doc.lines[l2].marks.contains(&mark));
    }

    #[test]
    fn test_squeeze() {
        let mut doc = doc_with_lines(&["abc", "def", "ghi"]);
        let frame = doc.current_frame();
        let l1 = doc.line_from_number(frame, 1).unwrap();
        let l2 = doc.line_from_number(frame, 2).unwrap();
        let l3 = doc.line_from_number(frame, 3).unwrap();
        let before = doc.mark_create(Position::new(l1, 1));
        let inside = doc.mark_create(Position::new(l2, 2));
        let at_end = doc.mark_create(Position::new(l3, 2));
        doc.marks_squeeze(Position::new(l1, 2), Position::new(l3, 2));
        assert_eq!(doc.mark_position(before), Position::new(l1, 1));
        assert_eq!(doc.mark_position(inside), Position::new(l3, 2));
        assert_eq!(doc.mark_position(at_end), Position::new(l3, 2));
        assert_registered(&doc);
    }

    #[test]
    fn test_gaps() {
        let mut doc = doc_with_lines(&["abcdef"]);
        let frame = doc.current_frame();
        let l1 = doc.first_line(frame);
        let a = doc.mark_create(Position::new(l1, 2));
        let b = doc.mark_create(Position::new(l1, 4));
        let c = doc.mark_create(Position::new(l1, 6));
        doc.marks_insert_gap(l1, 4, 3);
        assert_eq!(doc.marks[a].col, 2);
        assert_eq!(doc.marks[b].col, 7);
        assert_eq!(doc.marks[c].col, 9);
        doc.marks_close_gap(l1, 2, 6);
        assert_eq!(doc.marks[a].col, 2);
        assert_eq!(doc.marks[b].col, 2);
        assert_eq!(doc.marks[c].col, 3);
    }

    #[test]
    fn test_shift_to_other_line() {
        let mut doc = doc_with_lines(&["abcdef", "x"]);
        let frame = doc.current_frame();
        let l1 = doc.line_from_number(frame, 1).unwrap();
        let l2 = doc.line_from_number(frame, 2).unwrap();
        let a = doc.mark_create(Position::new(l1, 4));
        let b = doc.mark_create(Position::new(l1, 1));
        doc.marks_shift(l1, 3, 10, Position::new(l2, 1));
        assert_eq!(doc.mark_position(a), Position::new(l2, 2));
        assert_eq!(doc.mark_position(b), Position::new(l1, 1));
        assert_registered(&doc);
    }
}
