//! Motion commands: Advance, Jump and the cursor keys.

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::document::{Document, LineId};
use crate::lead_param::LeadParam;
use crate::limits::MAX_STRLEN;
use crate::marks::MarkId;
use crate::position::Position;

/// Commands for moving the dot within the current frame.
pub trait MotionCommands {
    /// Advance command - move to the start of a different line.
    fn cmd_advance(&mut self, lead_param: LeadParam) -> CmdResult;

    /// Jump command - move within the current line.
    fn cmd_jump(&mut self, lead_param: LeadParam) -> CmdResult;

    /// ZU / ZD - move up or down keeping the column.
    fn cmd_cursor_vertical(&mut self, lead_param: LeadParam, down: bool) -> CmdResult;

    /// ZL / ZR - move left or right.
    fn cmd_cursor_horizontal(&mut self, lead_param: LeadParam, right: bool) -> CmdResult;

    /// ZH - move to the left margin of the top line on screen.
    fn cmd_home(&mut self) -> CmdResult;

    /// ZC - move to the left margin of the next line, adding a line at the
    /// end of the text when the frame allows it.
    fn cmd_return(&mut self, lead_param: LeadParam) -> CmdResult;
}

impl MotionCommands for Document {
    fn cmd_advance(&mut self, lead_param: LeadParam) -> CmdResult {
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.advance_by(1),
            LeadParam::Pint(n) => self.advance_by(n as isize),
            LeadParam::Pindef => {
                let eop = self.eop_line(self.current);
                self.advance_to(Some(Position::new(eop, 1)))
            }
            LeadParam::Minus => self.advance_by(-1),
            LeadParam::Nint(n) => self.advance_by(-(n as isize)),
            LeadParam::Nindef => {
                let first = self.first_line(self.current);
                self.advance_to(Some(Position::new(first, 1)))
            }
            LeadParam::Marker(id) => self.advance_to(self.mark_at(self.current, id)),
        }
    }

    fn cmd_jump(&mut self, lead_param: LeadParam) -> CmdResult {
        let dot = self.dot(self.current);
        match lead_param {
            LeadParam::None | LeadParam::Plus => self.jump_by(1),
            LeadParam::Pint(n) => self.jump_by(n as isize),
            LeadParam::Minus => self.jump_by(-1),
            LeadParam::Nint(n) => self.jump_by(-(n as isize)),
            LeadParam::Pindef => {
                let end = self.lines[dot.line].used + 1;
                if end < dot.col {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                }
                self.jump_to(Some(Position::new(dot.line, end)))
            }
            LeadParam::Nindef => self.jump_to(Some(Position::new(dot.line, 1))),
            LeadParam::Marker(id) => self.jump_to(self.mark_at(self.current, id)),
        }
    }

    fn cmd_cursor_vertical(&mut self, lead_param: LeadParam, down: bool) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        let target = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                let n = lead_param.count().unwrap_or(1);
                let Some(nr) = self.line_to_number(dot.line) else {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                };
                let target = if down { nr.checked_add(n) } else { nr.checked_sub(n) };
                match target.and_then(|t| self.line_from_number(frame, t)) {
                    Some(line) => line,
                    None => return CmdResult::Failure(CmdFailure::OutOfRange),
                }
            }
            LeadParam::Pindef if down => self.eop_line(frame),
            LeadParam::Pindef => self.first_line(frame),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        self.set_dot(frame, Position::new(target, dot.col));
        CmdResult::Success
    }

    fn cmd_cursor_horizontal(&mut self, lead_param: LeadParam, right: bool) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        let col = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                let n = lead_param.count().unwrap_or(1);
                let col = if right {
                    dot.col + n
                } else {
                    dot.col.saturating_sub(n)
                };
                if col < 1 || col > MAX_STRLEN + 1 {
                    return CmdResult::Failure(CmdFailure::OutOfRange);
                }
                col
            }
            LeadParam::Pindef if right => self.lines[dot.line].used + 1,
            LeadParam::Pindef => self.frames[frame].margin_left,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        self.set_dot(frame, Position::new(dot.line, col));
        CmdResult::Success
    }

    fn cmd_home(&mut self) -> CmdResult {
        let frame = self.current;
        let top = self.frames[frame]
            .scr_top_line
            .filter(|&l| self.lines.contains(l) && self.frame_of_line(l) == Some(frame))
            .unwrap_or_else(|| self.first_line(frame));
        let col = self.frames[frame].margin_left;
        self.set_dot(frame, Position::new(top, col));
        CmdResult::Success
    }

    fn cmd_return(&mut self, lead_param: LeadParam) -> CmdResult {
        let count = match lead_param {
            LeadParam::None | LeadParam::Plus => 1,
            LeadParam::Pint(n) => n,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let col = self.frames[frame].margin_left;
        for _ in 0..count {
            let dot = self.dot(frame);
            let flink = self.lines[dot.line].flink;
            let next = match flink {
                Some(next) if !self.lines[next].is_eop() => next,
                _ if self.frames[frame].options.new_line => match self.new_line_before_eop() {
                    Ok(line) => line,
                    Err(failure) => return CmdResult::Failure(failure),
                },
                Some(next) => next,
                None => return CmdResult::Failure(CmdFailure::OutOfRange),
            };
            self.set_dot(frame, Position::new(next, col));
        }
        CmdResult::Success
    }
}

// Private implementation helpers
impl Document {
    fn advance_by(&mut self, delta: isize) -> CmdResult {
        let frame = self.current;
        let dot = self.dot(frame);
        let target = self
            .line_to_number(dot.line)
            .and_then(|nr| nr.checked_add_signed(delta))
            .and_then(|nr| self.line_from_number(frame, nr));
        match target {
            Some(line) => self.advance_to(Some(Position::new(line, 1))),
            None => CmdResult::Failure(CmdFailure::OutOfRange),
        }
    }

    fn advance_to(&mut self, target: Option<Position>) -> CmdResult {
        let frame = self.current;
        match target {
            Some(pos) if self.frame_of_line(pos.line) == Some(frame) => {
                self.remember_dot(frame);
                self.set_dot(frame, Position::new(pos.line, 1));
                CmdResult::Success
            }
            Some(_) => CmdResult::Failure(CmdFailure::DifferentFrames),
            None => CmdResult::Failure(CmdFailure::MarkNotDefined),
        }
    }

    fn jump_by(&mut self, delta: isize) -> CmdResult {
        let dot = self.dot(self.current);
        match dot.col.checked_add_signed(delta) {
            Some(col) if (1..=MAX_STRLEN + 1).contains(&col) => {
                self.jump_to(Some(Position::new(dot.line, col)))
            }
            _ => CmdResult::Failure(CmdFailure::OutOfRange),
        }
    }

    fn jump_to(&mut self, target: Option<Position>) -> CmdResult {
        let frame = self.current;
        match target {
            Some(pos) if self.frame_of_line(pos.line) == Some(frame) => {
                self.remember_dot(frame);
                self.set_dot(frame, pos);
                CmdResult::Success
            }
            Some(_) => CmdResult::Failure(CmdFailure::DifferentFrames),
            None => CmdResult::Failure(CmdFailure::MarkNotDefined),
        }
    }

    /// Adds an empty line just before the EOP line of the current frame.
    fn new_line_before_eop(&mut self) -> Result<LineId, CmdFailure> {
        let frame = self.current;
        let eop = self.eop_line(frame);
        let (line, _) = self.lines_create(1).ok_or(CmdFailure::NoRoom)?;
        if let Err(failure) = self.lines_inject(line, line, eop) {
            self.lines_destroy(line, line)?;
            return Err(failure);
        }
        let pos = Position::new(line, 1);
        self.set_mark(frame, MarkId::Modified, pos);
        Ok(line)
    }
}
