//! Text editing on the line model.
//!
//! These operations change the characters of lines and keep marks
//! attached to the text they sat beside.

use crate::cmd_result::CmdFailure;
use crate::document::{Document, FrameId, LineId};
use crate::limits::MAX_STRLEN;
use crate::position::Position;

/// Wider than any line, for moving all marks from a column onwards.
const WHOLE_LINE: usize = MAX_STRLEN + 2;

impl Document {
    /// Inserts `chars` at `pos`, moving later text and marks right.
    pub fn text_insert(&mut self, pos: Position, chars: &[char]) -> Result<(), CmdFailure> {
        let n = chars.len();
        if n == 0 {
            return Ok(());
        }
        if self.lines[pos.line].is_eop() {
            return Err(CmdFailure::OutOfRange);
        }
        let used = self.lines[pos.line].used;
        let end = used.max(pos.col - 1) + n;
        if end > MAX_STRLEN {
            return Err(CmdFailure::NoRoom);
        }
        if end > self.lines[pos.line].len {
            self.line_change_length(pos.line, end)?;
        }
        if let Some(text) = self.lines[pos.line].text.as_mut() {
            if pos.col <= used {
                text.copy_within(pos.col - 1..used, pos.col - 1 + n);
            }
            text[pos.col - 1..pos.col - 1 + n].copy_from_slice(chars);
        }
        self.line_trim(pos.line);
        self.marks_insert_gap(pos.line, pos.col, n);
        Ok(())
    }

    /// Writes `chars` over the text at `pos`.
    pub fn text_overtype(&mut self, pos: Position, chars: &[char]) -> Result<(), CmdFailure> {
        let n = chars.len();
        if n == 0 {
            return Ok(());
        }
        if self.lines[pos.line].is_eop() {
            return Err(CmdFailure::OutOfRange);
        }
        let end = pos.col - 1 + n;
        if end > MAX_STRLEN {
            return Err(CmdFailure::NoRoom);
        }
        if end > self.lines[pos.line].len {
            self.line_change_length(pos.line, end)?;
        }
        if let Some(text) = self.lines[pos.line].text.as_mut() {
            text[pos.col - 1..end].copy_from_slice(chars);
        }
        self.line_trim(pos.line);
        Ok(())
    }

    /// Removes `n` columns starting at `pos`, moving later text and marks left.
    pub fn text_remove(&mut self, pos: Position, n: usize) {
        let used = self.lines[pos.line].used;
        if pos.col <= used
            && let Some(text) = self.lines[pos.line].text.as_mut()
        {
            let k = n.min(used - pos.col + 1);
            text.copy_within(pos.col - 1 + k..used, pos.col - 1);
            text[used - k..used].fill(' ');
        }
        self.line_trim(pos.line);
        self.marks_close_gap(pos.line, pos.col, n);
    }

    /// Breaks the line at `pos`.  The text from `pos` onwards, and the marks
    /// on it, move to a new line after it.  Returns the new line.
    pub fn text_split_line(&mut self, pos: Position) -> Result<LineId, CmdFailure> {
        if self.lines[pos.line].is_eop() {
            return Err(CmdFailure::OutOfRange);
        }
        let next = self.lines[pos.line].flink.ok_or(CmdFailure::OutOfRange)?;
        let tail: Vec<char> = self.lines[pos.line]
            .chars()
            .iter()
            .skip(pos.col - 1)
            .copied()
            .collect();
        let (new_line, _) = self.lines_create(1).ok_or(CmdFailure::NoRoom)?;
        if let Err(err) = self.lines_inject(new_line, new_line, next) {
            self.lines_destroy(new_line, new_line)?;
            return Err(err);
        }
        self.line_set_text(new_line, &tail)?;
        self.marks_shift(pos.line, pos.col, WHOLE_LINE, Position::new(new_line, 1));
        if let Some(text) = self.lines[pos.line].text.as_mut()
            && pos.col <= text.len()
        {
            text[pos.col - 1..].fill(' ');
        }
        self.line_trim(pos.line);
        Ok(new_line)
    }

    /// Inserts possibly multi-line text at `pos` and returns the position
    /// just after it.
    pub fn text_insert_block(
        &mut self,
        pos: Position,
        texts: &[String],
    ) -> Result<Position, CmdFailure> {
        match texts {
            [] => Ok(pos),
            [single] => {
                let chars: Vec<char> = single.chars().collect();
                self.text_insert(pos, &chars)?;
                Ok(Position::new(pos.line, pos.col + chars.len()))
            }
            [first, middle @ .., last] => {
                let tail_line = self.text_split_line(pos)?;
                let first: Vec<char> = first.chars().collect();
                self.text_insert(pos, &first)?;
                if let Some((head, tail)) = self.lines_from_text(middle)? {
                    self.lines_inject(head, tail, tail_line)?;
                }
                let last: Vec<char> = last.chars().collect();
                self.text_insert(Position::new(tail_line, 1), &last)?;
                Ok(Position::new(tail_line, last.len() + 1))
            }
        }
    }

    /// Inserts possibly multi-line text at `pos`, which may be on the EOP
    /// line, and returns where the new text starts and ends.  At the EOP
    /// line the text becomes whole lines placed before it.
    pub fn text_place(
        &mut self,
        pos: Position,
        texts: &[String],
    ) -> Result<(Position, Position), CmdFailure> {
        if !self.lines[pos.line].is_eop() {
            let end = self.text_insert_block(pos, texts)?;
            return Ok((pos, end));
        }
        let (whole, open_end) = match texts.split_last() {
            None => return Ok((pos, pos)),
            Some((last, rest)) if last.is_empty() => (rest, false),
            Some(_) => (texts, true),
        };
        let Some((first, last)) = self.lines_from_text(whole)? else {
            return Ok((pos, pos));
        };
        if let Err(err) = self.lines_inject(first, last, pos.line) {
            self.lines_destroy(first, last)?;
            return Err(err);
        }
        let end = if open_end {
            let width = whole.last().map_or(0, |t| t.chars().count());
            Position::new(last, width + 1)
        } else {
            pos
        };
        Ok((Position::new(first, 1), end))
    }

    /// Deletes the text from `from` up to `to`, joining the end lines.
    /// Marks inside the region end up at `from`.
    pub fn text_delete_region(&mut self, from: Position, to: Position) -> Result<(), CmdFailure> {
        if from.line == to.line {
            if to.col > from.col {
                self.text_remove(from, to.col - from.col);
            }
            return Ok(());
        }
        let prefix_len = self.lines[from.line].used.min(from.col - 1);
        let tail: Vec<char> = self.lines[to.line]
            .chars()
            .iter()
            .skip(to.col - 1)
            .copied()
            .collect();
        if !tail.is_empty() && from.col - 1 + tail.len() > MAX_STRLEN {
            return Err(CmdFailure::NoRoom);
        }

        self.marks_squeeze(from, to);
        let mut joined: Vec<char> = self.lines[from.line].chars()[..prefix_len].to_vec();
        if !tail.is_empty() {
            joined.resize(from.col - 1, ' ');
            joined.extend(tail);
        }
        self.line_set_text(from.line, &joined)?;

        let to_is_eop = self.lines[to.line].is_eop();
        if !to_is_eop {
            self.marks_shift(to.line, to.col, WHOLE_LINE, from);
            self.marks_shift(to.line, 1, to.col - 1, from);
        }
        let first_gone = self.lines[from.line].flink.ok_or(CmdFailure::OutOfRange)?;
        let last_gone = if to_is_eop {
            match self.lines[to.line].blink {
                Some(l) if l != from.line => l,
                _ => return Ok(()),
            }
        } else {
            to.line
        };
        self.lines_extract(first_gone, last_gone)?;
        self.lines_destroy(first_gone, last_gone)
    }

    /// Makes sure the dot of `frame` is on a real line, adding an empty
    /// line before the EOP line when it is not.
    pub fn ensure_real_line(&mut self, frame: FrameId) -> Result<LineId, CmdFailure> {
        let dot = self.dot(frame);
        if !self.lines[dot.line].is_eop() {
            return Ok(dot.line);
        }
        let (line, _) = self.lines_create(1).ok_or(CmdFailure::NoRoom)?;
        if let Err(err) = self.lines_inject(line, line, dot.line) {
            self.lines_destroy(line, line)?;
            return Err(err);
        }
        self.set_dot(frame, Position::new(line, dot.col));
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::DEFAULT_SPACE_LIMIT;

    fn setup(texts: &[&str]) -> (Document, FrameId) {
        let mut doc = Document::new(DEFAULT_SPACE_LIMIT, 80);
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        if let Some((first, last)) = doc.lines_from_text(texts).unwrap() {
            doc.lines_inject(first, last, eop).unwrap();
        }
        (doc, frame)
    }

    fn line(doc: &Document, frame: FrameId, n: usize) -> LineId {
        doc.line_from_number(frame, n).unwrap()
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_insert_shifts_marks() {
        let (mut doc, frame) = setup(&["helloworld"]);
        let l = line(&doc, frame, 1);
        let m = doc.mark_create(Position::new(l, 6));
        doc.text_insert(Position::new(l, 6), &chars(", ")).unwrap();
        assert_eq!(doc.line_text(l), "hello, world");
        assert_eq!(doc.mark_position(m).col, 8);
    }

    #[test]
    fn test_insert_beyond_end_pads() {
        let (mut doc, frame) = setup(&["ab"]);
        let l = line(&doc, frame, 1);
        doc.text_insert(Position::new(l, 5), &chars("x")).unwrap();
        assert_eq!(doc.line_text(l), "ab  x");
    }

    #[test]
    fn test_insert_on_eop_fails() {
        let (mut doc, frame) = setup(&[]);
        let eop = doc.eop_line(frame);
        assert_eq!(
            doc.text_insert(Position::new(eop, 1), &chars("x")),
            Err(CmdFailure::OutOfRange)
        );
    }

    #[test]
    fn test_insert_too_long() {
        let (mut doc, frame) = setup(&["a"]);
        let l = line(&doc, frame, 1);
        let long = vec!['x'; MAX_STRLEN];
        assert_eq!(
            doc.text_insert(Position::new(l, 1), &long),
            Err(CmdFailure::NoRoom)
        );
        assert_eq!(doc.line_text(l), "a");
    }

    #[test]
    fn test_remove_and_overtype() {
        let (mut doc, frame) = setup(&["abcdef"]);
        let l = line(&doc, frame, 1);
        doc.text_remove(Position::new(l, 2), 2);
        assert_eq!(doc.line_text(l), "adef");
        doc.text_overtype(Position::new(l, 3), &chars("XYZ")).unwrap();
        assert_eq!(doc.line_text(l), "adXYZ");
    }

    #[test]
    fn test_split_moves_marks() {
        let (mut doc, frame) = setup(&["hello world"]);
        let l = line(&doc, frame, 1);
        let m = doc.mark_create(Position::new(l, 8));
        let new = doc.text_split_line(Position::new(l, 7)).unwrap();
        assert_eq!(doc.line_text(l), "hello");
        assert_eq!(doc.line_text(new), "world");
        assert_eq!(doc.mark_position(m), Position::new(new, 2));
    }

    #[test]
    fn test_insert_block_multi_line() {
        let (mut doc, frame) = setup(&["startend"]);
        let l = line(&doc, frame, 1);
        let end = doc
            .text_insert_block(
                Position::new(l, 6),
                &["A".to_string(), "B".to_string(), "C".to_string()],
            )
            .unwrap();
        assert_eq!(doc.frame_text(frame), "startA\nB\nCend");
        assert_eq!(end, Position::new(line(&doc, frame, 3), 2));
    }

    #[test]
    fn test_delete_region_joins_lines() {
        let (mut doc, frame) = setup(&["one two", "three", "four five"]);
        let l1 = line(&doc, frame, 1);
        let l3 = line(&doc, frame, 3);
        let m = doc.mark_create(Position::new(l3, 7));
        let inside = doc.mark_create(Position::new(line(&doc, frame, 2), 2));
        doc.text_delete_region(Position::new(l1, 4), Position::new(l3, 5))
            .unwrap();
        assert_eq!(doc.frame_text(frame), "one five");
        assert_eq!(doc.mark_position(m), Position::new(l1, 6));
        assert_eq!(doc.mark_position(inside), Position::new(l1, 4));
        assert_eq!(doc.total_lines(frame), 2);
    }

    #[test]
    fn test_delete_region_to_eop() {
        let (mut doc, frame) = setup(&["keep this", "drop", "drop too"]);
        let l1 = line(&doc, frame, 1);
        let eop = doc.eop_line(frame);
        doc.text_delete_region(Position::new(l1, 5), Position::new(eop, 1))
            .unwrap();
        assert_eq!(doc.frame_text(frame), "keep");
        assert_eq!(doc.total_lines(frame), 2);
    }

    #[test]
    fn test_ensure_real_line() {
        let (mut doc, frame) = setup(&[]);
        let l = doc.ensure_real_line(frame).unwrap();
        assert!(!doc.line(l).is_eop());
        assert_eq!(doc.dot(frame).line, l);
        assert_eq!(doc.total_lines(frame), 2);
    }

    #[test]
    fn test_place_at_eop_adds_lines() {
        let (mut doc, frame) = setup(&["top"]);
        let eop = doc.eop_line(frame);
        let texts = vec!["a".to_string(), "b".to_string(), String::new()];
        let (start, end) = doc.text_place(Position::new(eop, 1), &texts).unwrap();
        assert_eq!(doc.frame_text(frame), "top\na\nb");
        assert_eq!(start, Position::new(line(&doc, frame, 2), 1));
        assert_eq!(end, Position::new(eop, 1));

        let (_, end) = doc.text_place(Position::new(eop, 1), &["tail".to_string()]).unwrap();
        assert_eq!(doc.frame_text(frame), "top\na\nb\ntail");
        assert_eq!(end, Position::new(line(&doc, frame, 4), 5));
    }
}
