//! Predicate commands: EOL, EOP, EOF, EQC, EQM, EQS, and Mark (M).

use std::cmp::Ordering;

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::document::Document;
use crate::lead_param::LeadParam;
use crate::marks::MarkId;
use crate::strings::ch_compare;
use crate::trail_param::TrailParam;

/// Commands that test conditions and succeed/fail based on predicates.
pub trait PredicateCommands {
    /// EOL: succeeds if the dot is just past the last character of its line.
    /// Leading `-` inverts the test.
    fn cmd_eol(&mut self, lead_param: LeadParam) -> CmdResult;

    /// EOP: succeeds if the dot is on the EOP line.  Leading `-` inverts.
    fn cmd_eop(&mut self, lead_param: LeadParam) -> CmdResult;

    /// EOF: like EOP, but also requires the input file to be exhausted.
    fn cmd_eof(&mut self, lead_param: LeadParam, input_exhausted: bool) -> CmdResult;

    /// EQC: test the dot column against a number.
    /// `>EQC'N'` succeeds if the column is at least N, `<EQC'N'` if at most N.
    fn cmd_eqc(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult;

    /// EQM: test the dot position against a mark.
    fn cmd_eqm(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult;

    /// EQS: test the text at the dot against a string.
    /// Delimiter `"` compares exactly, any other delimiter ignores case.
    /// An empty string repeats the previous comparison.
    fn cmd_eqs(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult;

    /// M: `NM` sets mark N at the dot, `-NM` unsets it.
    fn cmd_mark(&mut self, lead_param: LeadParam) -> CmdResult;
}

impl PredicateCommands for Document {
    fn cmd_eol(&mut self, lead_param: LeadParam) -> CmdResult {
        let dot = self.dot(self.current);
        let end = self.lines[dot.line].used + 1;
        let result = match lead_param {
            LeadParam::None | LeadParam::Plus => dot.col == end,
            LeadParam::Minus => dot.col != end,
            LeadParam::Pindef => dot.col >= end,
            LeadParam::Nindef => dot.col <= end,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result(result)
    }

    fn cmd_eop(&mut self, lead_param: LeadParam) -> CmdResult {
        let invert = match lead_param {
            LeadParam::None | LeadParam::Plus => false,
            LeadParam::Minus => true,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result(self.is_at_eop() ^ invert)
    }

    fn cmd_eof(&mut self, lead_param: LeadParam, input_exhausted: bool) -> CmdResult {
        let invert = match lead_param {
            LeadParam::None | LeadParam::Plus => false,
            LeadParam::Minus => true,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result((self.is_at_eop() && input_exhausted) ^ invert)
    }

    fn cmd_eqc(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult {
        let Some(target_col) = parse_column_tpar(tpar) else {
            return CmdResult::Failure(CmdFailure::BadParameter(tpar.content.clone()));
        };
        let dot_col = self.dot(self.current).col;
        let result = match lead_param {
            LeadParam::None | LeadParam::Plus => dot_col == target_col,
            LeadParam::Minus => dot_col != target_col,
            LeadParam::Pindef => dot_col >= target_col,
            LeadParam::Nindef => dot_col <= target_col,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result(result)
    }

    fn cmd_eqm(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult {
        let Some(mark_id) = parse_mark_tpar(tpar) else {
            return CmdResult::Failure(CmdFailure::BadParameter(tpar.content.clone()));
        };
        let frame = self.current;
        let Some(mark) = self.mark_at(frame, mark_id) else {
            return CmdResult::Failure(CmdFailure::MarkNotDefined);
        };
        let dot = self.dot(frame);
        let result = match lead_param {
            LeadParam::None | LeadParam::Plus => dot == mark,
            LeadParam::Minus => dot != mark,
            LeadParam::Pindef => self.position_le(mark, dot),
            LeadParam::Nindef => self.position_le(dot, mark),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result(result)
    }

    fn cmd_eqs(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult {
        let frame = self.current;
        let tpar = if tpar.content.is_empty() {
            match self.frames[frame].eqs_tpar.clone() {
                Some(previous) => previous,
                None => return CmdResult::Failure(CmdFailure::BadParameter(String::new())),
            }
        } else {
            self.frames[frame].eqs_tpar = Some(tpar.clone());
            tpar.clone()
        };
        let target: Vec<char> = tpar.content.chars().collect();
        let dot = self.dot(frame);
        let chars = self.lines[dot.line].chars();
        let text: Vec<char> = (0..target.len())
            .map(|i| chars.get(dot.col - 1 + i).copied().unwrap_or(' '))
            .collect();
        let cmp = ch_compare(&text, &target, tpar.is_exact());

        let result = match lead_param {
            LeadParam::None | LeadParam::Plus => cmp == Ordering::Equal,
            LeadParam::Minus => cmp != Ordering::Equal,
            LeadParam::Pindef => cmp != Ordering::Less,
            LeadParam::Nindef => cmp != Ordering::Greater,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        bool_result(result)
    }

    fn cmd_mark(&mut self, lead_param: LeadParam) -> CmdResult {
        let frame = self.current;
        let (n, set) = match lead_param {
            LeadParam::None | LeadParam::Plus => (1, true),
            LeadParam::Pint(n) => (n, true),
            LeadParam::Minus => (1, false),
            LeadParam::Nint(n) => (n, false),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let Some(id) = MarkId::numbered(n) else {
            return CmdResult::Failure(CmdFailure::SyntaxError);
        };
        if set {
            let dot = self.dot(frame);
            self.set_mark(frame, id, dot);
        } else {
            self.unset_mark(frame, id);
        }
        CmdResult::Success
    }
}

impl Document {
    fn is_at_eop(&self) -> bool {
        let dot = self.dot(self.current);
        self.lines[dot.line].is_eop()
    }
}

/// Convert a boolean condition to a CmdResult.
fn bool_result(condition: bool) -> CmdResult {
    if condition {
        CmdResult::Success
    } else {
        CmdResult::Failure(CmdFailure::OutOfRange)
    }
}

/// Parse the trailing parameter for EQC as a 1-based column number.
fn parse_column_tpar(tpar: &TrailParam) -> Option<usize> {
    tpar.content.trim().parse().ok()
}

/// Parse the trailing parameter for EQM as a mark identifier.
fn parse_mark_tpar(tpar: &TrailParam) -> Option<MarkId> {
    match tpar.content.trim() {
        "=" => Some(MarkId::Equals),
        "%" => Some(MarkId::Modified),
        s => MarkId::numbered(s.parse().ok()?),
    }
}
