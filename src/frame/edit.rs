//! Text editing commands (insert, overtype, delete, case change).

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::document::{Document, LineId};
use crate::lead_param::LeadParam;
use crate::marks::MarkId;
use crate::position::Position;
use crate::strings::{locase, upcase};
use crate::trail_param::TrailParam;

/// How `*` commands change case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Upper,
    Lower,
    /// Uppercase letters that start a word, lowercase the rest.
    Edit,
}

/// Commands for editing text in the current frame.
pub trait EditCommands {
    /// I - insert text, repeated.
    fn cmd_insert_text(&mut self, lead_param: LeadParam, text: &TrailParam) -> CmdResult;

    /// O - overtype text, repeated.
    fn cmd_overtype_text(&mut self, lead_param: LeadParam, text: &TrailParam) -> CmdResult;

    /// C - insert blanks.
    fn cmd_insert_char(&mut self, lead_param: LeadParam) -> CmdResult;

    /// L - insert empty lines.
    fn cmd_insert_line(&mut self, lead_param: LeadParam) -> CmdResult;

    /// D - delete characters.
    fn cmd_delete_char(&mut self, lead_param: LeadParam) -> CmdResult;

    /// K - delete lines.  The lines are kept in the OOPS frame.
    fn cmd_delete_line(&mut self, lead_param: LeadParam) -> CmdResult;

    /// SL - split the line at the dot.
    fn cmd_split_line(&mut self, lead_param: LeadParam) -> CmdResult;

    /// SW - move the dot's line up or down past other lines.
    fn cmd_swap_line(&mut self, lead_param: LeadParam) -> CmdResult;

    /// ZZ - rub out the character before the dot.
    fn cmd_rubout(&mut self, lead_param: LeadParam, insert_mode: bool) -> CmdResult;

    /// *U, *L, *E - change the case of characters.
    fn cmd_case_change(&mut self, lead_param: LeadParam, mode: CaseMode) -> CmdResult;
}

impl EditCommands for Document {
    fn cmd_insert_text(&mut self, lead_param: LeadParam, text: &TrailParam) -> CmdResult {
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.ins_text(1, text),
            LeadParam::Pint(n) => self.ins_text(n, text),
            _ => CmdResult::Failure(CmdFailure::SyntaxError),
        }
    }

    fn cmd_overtype_text(&mut self, lead_param: LeadParam, text: &TrailParam) -> CmdResult {
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.ovr_text(1, text),
            LeadParam::Pint(n) => self.ovr_text(n, text),
            _ => CmdResult::Failure(CmdFailure::SyntaxError),
        }
    }

    fn cmd_insert_char(&mut self, lead_param: LeadParam) -> CmdResult {
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.insert_chars(1, false),
            LeadParam::Pint(n) => self.insert_chars(n, false),
            LeadParam::Minus => self.insert_chars(1, true),
            LeadParam::Nint(n) => self.insert_chars(n, true),
            _ => CmdResult::Failure(CmdFailure::SyntaxError),
        }
    }

    fn cmd_insert_line(&mut self, lead_param: LeadParam) -> CmdResult {
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.insert_lines(1, true),
            LeadParam::Pint(n) => self.insert_lines(n, true),
            LeadParam::Minus => self.insert_lines(1, false),
            LeadParam::Nint(n) => self.insert_lines(n, false),
            _ => CmdResult::Failure(CmdFailure::SyntaxError),
        }
    }

    fn cmd_delete_char(&mut self, lead_param: LeadParam) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        if self.lines[dot.line].is_eop() {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        let (from, to) = match lead_param {
            LeadParam::None | LeadParam::Plus => (dot, Position::new(dot.line, dot.col + 1)),
            LeadParam::Pint(n) => (dot, Position::new(dot.line, dot.col + n)),
            LeadParam::Minus | LeadParam::Nint(_) => {
                let n = lead_param.count().unwrap_or(1);
                if n >= dot.col {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                }
                (Position::new(dot.line, dot.col - n), dot)
            }
            LeadParam::Pindef => {
                let end = self.lines[dot.line].used + 1;
                (dot, Position::new(dot.line, end.max(dot.col)))
            }
            LeadParam::Nindef => (Position::new(dot.line, 1), dot),
            LeadParam::Marker(id) => match self.mark_at(frame, id) {
                Some(mark) if self.frame_of_line(mark.line) == Some(frame) => {
                    if self.position_le(dot, mark) {
                        (dot, mark)
                    } else {
                        (mark, dot)
                    }
                }
                Some(_) => return CmdResult::Failure(CmdFailure::DifferentFrames),
                None => return CmdResult::Failure(CmdFailure::MarkNotDefined),
            },
        };
        if let Err(failure) = self.text_delete_region(from, to) {
            return CmdResult::Failure(failure);
        }
        self.set_dot(frame, from);
        self.set_mark(frame, MarkId::Equals, from);
        self.note_modified(frame, from);
        CmdResult::Success
    }

    fn cmd_delete_line(&mut self, lead_param: LeadParam) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        let Some(dot_nr) = self.line_to_number(dot.line) else {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        };
        let eop_nr = self.total_lines(frame);
        // Inclusive range of line numbers to remove.
        let (first_nr, last_nr) = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                let n = lead_param.count().unwrap_or(1);
                (dot_nr, dot_nr + n - 1)
            }
            LeadParam::Minus | LeadParam::Nint(_) => {
                let n = lead_param.count().unwrap_or(1);
                if n >= dot_nr {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                }
                (dot_nr - n, dot_nr - 1)
            }
            LeadParam::Pindef => (dot_nr, eop_nr - 1),
            LeadParam::Nindef => (1, dot_nr - 1),
            LeadParam::Marker(id) => match self.mark_at(frame, id) {
                Some(mark) if self.frame_of_line(mark.line) == Some(frame) => {
                    let mark_nr = self.line_to_number(mark.line).unwrap_or(dot_nr);
                    let (a, b) = (dot_nr.min(mark_nr), dot_nr.max(mark_nr));
                    (a, b.min(eop_nr - 1))
                }
                Some(_) => return CmdResult::Failure(CmdFailure::DifferentFrames),
                None => return CmdResult::Failure(CmdFailure::MarkNotDefined),
            },
        };
        if first_nr > last_nr {
            return CmdResult::Success;
        }
        if last_nr >= eop_nr {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        let (Some(first), Some(last)) = (
            self.line_from_number(frame, first_nr),
            self.line_from_number(frame, last_nr),
        ) else {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        };
        match self.kill_lines(first, last) {
            Ok(after) => {
                if (first_nr..=last_nr).contains(&dot_nr) {
                    self.set_dot(frame, Position::new(after, dot.col));
                }
                self.note_modified(frame, Position::new(after, 1));
                CmdResult::Success
            }
            Err(failure) => CmdResult::Failure(failure),
        }
    }

    fn cmd_split_line(&mut self, lead_param: LeadParam) -> CmdResult {
        if !matches!(lead_param, LeadParam::None | LeadParam::Plus) {
            return CmdResult::Failure(CmdFailure::SyntaxError);
        }
        let frame = self.current;
        if let Err(failure) = self.ensure_real_line(frame) {
            return CmdResult::Failure(failure);
        }
        let dot = self.dot(frame);
        match self.text_split_line(dot) {
            Ok(new_line) => {
                self.set_mark(frame, MarkId::Equals, dot);
                self.set_dot(frame, Position::new(new_line, 1));
                self.note_modified(frame, Position::new(new_line, 1));
                CmdResult::Success
            }
            Err(failure) => CmdResult::Failure(failure),
        }
    }

    fn cmd_swap_line(&mut self, lead_param: LeadParam) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        if self.lines[dot.line].is_eop() {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        let Some(nr) = self.line_to_number(dot.line) else {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        };
        let last_nr = self.total_lines(frame) - 1;
        let target_nr = match lead_param {
            LeadParam::None | LeadParam::Plus => nr + 1,
            LeadParam::Pint(n) => nr + n,
            LeadParam::Minus => nr.wrapping_sub(1),
            LeadParam::Nint(n) => nr.wrapping_sub(n),
            LeadParam::Pindef => last_nr,
            LeadParam::Nindef => 1,
            LeadParam::Marker(_) => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        if target_nr == 0 || target_nr > last_nr {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        if target_nr == nr {
            return CmdResult::Success;
        }
        let Some(target) = self.line_from_number(frame, target_nr) else {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        };
        // Moving down lands after the target line, moving up lands before it.
        let before = if target_nr > nr {
            match self.lines[target].flink {
                Some(next) => next,
                None => return CmdResult::Failure(CmdFailure::OutOfRange),
            }
        } else {
            target
        };
        if let Err(failure) = self.lines_extract(dot.line, dot.line) {
            return CmdResult::Failure(failure);
        }
        if let Err(failure) = self.lines_inject(dot.line, dot.line, before) {
            return CmdResult::Failure(failure);
        }
        self.note_modified(frame, Position::new(dot.line, 1));
        CmdResult::Success
    }

    fn cmd_rubout(&mut self, lead_param: LeadParam, insert_mode: bool) -> CmdResult {
        let n = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                lead_param.count().unwrap_or(1)
            }
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let dot = self.dot(frame);
        if n >= dot.col || self.lines[dot.line].is_eop() {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        let from = Position::new(dot.line, dot.col - n);
        if insert_mode {
            self.text_remove(from, n);
        } else if let Err(failure) = self.text_overtype(from, &vec![' '; n]) {
            return CmdResult::Failure(failure);
        }
        self.set_dot(frame, from);
        self.note_modified(frame, from);
        CmdResult::Success
    }

    fn cmd_case_change(&mut self, lead_param: LeadParam, mode: CaseMode) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        if self.lines[dot.line].is_eop() {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }
        let used = self.lines[dot.line].used;
        let (from, to, dot_after) = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                let n = lead_param.count().unwrap_or(1);
                (dot.col, dot.col + n, dot.col + n)
            }
            LeadParam::Minus | LeadParam::Nint(_) => {
                let n = lead_param.count().unwrap_or(1);
                if n >= dot.col {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                }
                (dot.col - n, dot.col, dot.col - n)
            }
            LeadParam::Pindef => (dot.col, used + 1, (used + 1).max(dot.col)),
            LeadParam::Nindef => (1, dot.col, 1),
            LeadParam::Marker(_) => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let chars = self.lines[dot.line].chars().to_vec();
        let mut changed: Vec<char> = Vec::new();
        for col in from..to.min(used + 1) {
            let ch = chars[col - 1];
            let prev = (col > 1).then(|| chars[col - 2]);
            changed.push(match mode {
                CaseMode::Upper => upcase(ch),
                CaseMode::Lower => locase(ch),
                CaseMode::Edit if prev.is_some_and(char::is_alphanumeric) => locase(ch),
                CaseMode::Edit => upcase(ch),
            });
        }
        if let Err(failure) = self.text_overtype(Position::new(dot.line, from), &changed) {
            return CmdResult::Failure(failure);
        }
        self.set_dot(frame, Position::new(dot.line, dot_after));
        self.note_modified(frame, Position::new(dot.line, dot_after));
        CmdResult::Success
    }
}

// Private implementation helpers
impl Document {
    fn ins_text(&mut self, count: usize, text: &TrailParam) -> CmdResult {
        let frame = self.current;
        if count == 0 || text.content.is_empty() {
            return CmdResult::Success;
        }
        if let Err(failure) = self.ensure_real_line(frame) {
            return CmdResult::Failure(failure);
        }
        let start = self.dot(frame);
        let lines: Vec<String> = text.content.split('\n').map(str::to_string).collect();
        let block: Vec<String> = if lines.len() == 1 {
            vec![lines[0].repeat(count)]
        } else {
            let mut block: Vec<String> = Vec::new();
            for _ in 0..count {
                match block.last_mut() {
                    Some(last) => {
                        last.push_str(&lines[0]);
                        block.extend(lines[1..].iter().cloned());
                    }
                    None => block.extend(lines.iter().cloned()),
                }
            }
            block
        };
        match self.text_insert_block(start, &block) {
            Ok(end) => {
                self.set_dot(frame, end);
                self.set_mark(frame, MarkId::Equals, start);
                self.note_modified(frame, end);
                CmdResult::Success
            }
            Err(failure) => CmdResult::Failure(failure),
        }
    }

    fn ovr_text(&mut self, count: usize, text: &TrailParam) -> CmdResult {
        let frame = self.current;
        if count == 0 || text.content.is_empty() {
            return CmdResult::Success;
        }
        if text.is_multi_line() {
            return CmdResult::Failure(CmdFailure::MultiLine);
        }
        if let Err(failure) = self.ensure_real_line(frame) {
            return CmdResult::Failure(failure);
        }
        let start = self.dot(frame);
        let chars: Vec<char> = text.content.repeat(count).chars().collect();
        if let Err(failure) = self.text_overtype(start, &chars) {
            return CmdResult::Failure(failure);
        }
        let end = Position::new(start.line, start.col + chars.len());
        self.set_dot(frame, end);
        self.set_mark(frame, MarkId::Equals, start);
        self.note_modified(frame, end);
        CmdResult::Success
    }

    fn insert_chars(&mut self, count: usize, move_dot: bool) -> CmdResult {
        if count == 0 {
            return CmdResult::Success;
        }
        let frame = self.current;
        if let Err(failure) = self.ensure_real_line(frame) {
            return CmdResult::Failure(failure);
        }
        let dot = self.dot(frame);
        if let Err(failure) = self.text_insert(dot, &vec![' '; count]) {
            return CmdResult::Failure(failure);
        }
        if !move_dot {
            self.set_dot(frame, dot);
        }
        self.note_modified(frame, dot);
        CmdResult::Success
    }

    fn insert_lines(&mut self, count: usize, dot_to_new: bool) -> CmdResult {
        if count == 0 {
            return CmdResult::Success;
        }
        let frame = self.current;
        let dot = self.dot(frame);
        let Some((first, last)) = self.lines_create(count) else {
            return CmdResult::Success;
        };
        if let Err(failure) = self.lines_inject(first, last, dot.line) {
            if let Err(destroy) = self.lines_destroy(first, last) {
                return CmdResult::Failure(destroy);
            }
            return CmdResult::Failure(failure);
        }
        self.set_mark(frame, MarkId::Equals, dot);
        if dot_to_new {
            self.set_dot(frame, Position::new(first, dot.col));
        }
        self.note_modified(frame, Position::new(first, 1));
        CmdResult::Success
    }

    /// Moves `first..=last` to the end of the OOPS frame, squeezing their
    /// marks onto the following line.  Returns that line.
    pub(crate) fn kill_lines(&mut self, first: LineId, last: LineId) -> Result<LineId, CmdFailure> {
        let after = self.lines[last].flink.ok_or(CmdFailure::OutOfRange)?;
        self.marks_squeeze(Position::new(first, 1), Position::new(after, 1));
        self.lines_extract(first, last)?;
        let oops = self.frame_oops;
        let oops_eop = self.eop_line(oops);
        if oops != self.current {
            if self.lines_inject(first, last, oops_eop).is_err() {
                self.lines_destroy(first, last)?;
            }
        } else {
            self.lines_destroy(first, last)?;
        }
        Ok(after)
    }
}
