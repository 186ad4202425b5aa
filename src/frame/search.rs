//! Search commands: Get (G), Next (N) and Replace (R).

use std::collections::HashSet;

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::document::Document;
use crate::lead_param::LeadParam;
use crate::marks::MarkId;
use crate::position::Position;
use crate::strings::{ch_search, upcased};
use crate::trail_param::TrailParam;

/// Commands for searching within the frame.
pub trait SearchCommands {
    /// Get (G): find the Nth occurrence of the target.
    /// On success going forwards the dot is after the match and `=` at its
    /// start; going backwards the dot is at the start and `=` after it.
    fn cmd_get(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult;

    /// Next character command (N): find Nth occurrence of a character from a set.
    fn cmd_next(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult;

    /// Replace (R): replace occurrences of the target.
    fn cmd_replace(
        &mut self,
        lead_param: LeadParam,
        search: &TrailParam,
        replace: &TrailParam,
    ) -> CmdResult;
}

impl SearchCommands for Document {
    fn cmd_get(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult {
        let (count, backwards) = match lead_param {
            LeadParam::None | LeadParam::Plus => (1, false),
            LeadParam::Pint(n) => (n, false),
            LeadParam::Minus => (1, true),
            LeadParam::Nint(n) => (n, true),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let tpar = match cached(&mut self.frames[frame].get_tpar, tpar) {
            Ok(tpar) => tpar,
            Err(failure) => return CmdResult::Failure(failure),
        };
        let target = prepare_target(&tpar);
        if target.is_empty() {
            return CmdResult::Failure(CmdFailure::BadParameter(String::new()));
        }
        let len = target.len();
        let mut from = self.dot(frame);
        let mut found = None;
        for _ in 0..count {
            match self.find(from, &target, tpar.is_exact(), backwards) {
                Some(start) => {
                    found = Some(start);
                    from = if backwards {
                        start
                    } else {
                        Position::new(start.line, start.col + len)
                    };
                }
                None => return CmdResult::Failure(CmdFailure::NotFound),
            }
        }
        let Some(start) = found else {
            return CmdResult::Success;
        };
        let end = Position::new(start.line, start.col + len);
        if backwards {
            self.set_mark(frame, MarkId::Equals, end);
            self.set_dot(frame, start);
        } else {
            self.set_mark(frame, MarkId::Equals, start);
            self.set_dot(frame, end);
        }
        CmdResult::Success
    }

    fn cmd_next(&mut self, lead_param: LeadParam, tpar: &TrailParam) -> CmdResult {
        let (count, backwards) = match lead_param {
            LeadParam::None | LeadParam::Plus => (1, false),
            LeadParam::Pint(n) => (n, false),
            LeadParam::Minus => (1, true),
            LeadParam::Nint(n) => (n, true),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let original_dot = self.dot(frame);
        if count == 0 {
            self.set_mark(frame, MarkId::Equals, original_dot);
            return CmdResult::Success;
        }
        let chars = parse_char_set(tpar);
        let found = if backwards {
            self.next_backward(count, &chars)
        } else {
            self.next_forward(count, &chars)
        };
        match found {
            Some(pos) => {
                self.set_mark(frame, MarkId::Equals, original_dot);
                self.set_dot(frame, pos);
                CmdResult::Success
            }
            None => CmdResult::Failure(CmdFailure::OutOfRange),
        }
    }

    fn cmd_replace(
        &mut self,
        lead_param: LeadParam,
        search: &TrailParam,
        replace: &TrailParam,
    ) -> CmdResult {
        let (count, backwards) = match lead_param {
            LeadParam::None | LeadParam::Plus => (Some(1), false),
            LeadParam::Pint(n) => (Some(n), false),
            LeadParam::Minus => (Some(1), true),
            LeadParam::Nint(n) => (Some(n), true),
            LeadParam::Pindef => (None, false),
            LeadParam::Nindef => (None, true),
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let (search, replace) = if search.content.is_empty() {
            match (
                self.frames[frame].rep1_tpar.clone(),
                self.frames[frame].rep2_tpar.clone(),
            ) {
                (Some(s), Some(r)) => (s, r),
                _ => return CmdResult::Failure(CmdFailure::BadParameter(String::new())),
            }
        } else {
            self.frames[frame].rep1_tpar = Some(search.clone());
            self.frames[frame].rep2_tpar = Some(replace.clone());
            (search.clone(), replace.clone())
        };
        if replace.is_multi_line() {
            return CmdResult::Failure(CmdFailure::MultiLine);
        }
        let target = prepare_target(&search);
        if target.is_empty() {
            return CmdResult::Failure(CmdFailure::BadParameter(String::new()));
        }
        let replacement: Vec<char> = replace.content.chars().collect();

        let mut done = 0;
        let mut from = self.dot(frame);
        let mut last = None;
        while count.is_none_or(|n| done < n) {
            let Some(start) = self.find(from, &target, search.is_exact(), backwards) else {
                break;
            };
            self.text_remove(start, target.len());
            if let Err(failure) = self.text_insert(start, &replacement) {
                return CmdResult::Failure(failure);
            }
            let end = Position::new(start.line, start.col + replacement.len());
            from = if backwards { start } else { end };
            last = Some((start, end));
            done += 1;
        }
        if count.is_some_and(|n| done < n) {
            return CmdResult::Failure(CmdFailure::NotFound);
        }
        if let Some((start, end)) = last {
            self.set_mark(frame, MarkId::Equals, start);
            self.set_dot(frame, if backwards { start } else { end });
            self.note_modified(frame, end);
        }
        CmdResult::Success
    }
}

impl Document {
    /// Forward search for N.  Skips the character at the dot; the blank just
    /// past the end of each line takes part in the search.
    fn next_forward(&self, count: usize, chars: &HashSet<char>) -> Option<Position> {
        let dot = self.dot(self.current);
        let mut remaining = count;
        let mut line = dot.line;
        let mut col = dot.col + 1;
        loop {
            if self.lines[line].is_eop() {
                return None;
            }
            let text = self.lines[line].chars();
            while col <= text.len() + 1 {
                let ch = text.get(col - 1).copied().unwrap_or(' ');
                if chars.contains(&ch) {
                    remaining -= 1;
                    if remaining == 0 {
                        return Some(Position::new(line, col));
                    }
                }
                col += 1;
            }
            line = self.lines[line].flink?;
            col = 1;
        }
    }

    /// Backward search for N.  Skips the character before the dot and
    /// leaves the dot just after the character found.
    fn next_backward(&self, count: usize, chars: &HashSet<char>) -> Option<Position> {
        let dot = self.dot(self.current);
        let mut remaining = count;
        let mut line = dot.line;
        let mut col = if self.lines[line].is_eop() {
            line = self.lines[line].blink?;
            self.lines[line].used + 1
        } else {
            dot.col.saturating_sub(2).min(self.lines[line].used + 1)
        };
        loop {
            let text = self.lines[line].chars();
            while col >= 1 {
                let ch = text.get(col - 1).copied().unwrap_or(' ');
                if chars.contains(&ch) {
                    remaining -= 1;
                    if remaining == 0 {
                        return Some(Position::new(line, col + 1));
                    }
                }
                col -= 1;
            }
            line = self.lines[line].blink?;
            col = self.lines[line].used + 1;
        }
    }

    /// Finds the start of the next match of `target` from `from`, within
    /// the frame of `from`.  Backward matches must start before `from`.
    fn find(
        &self,
        from: Position,
        target: &[char],
        exact: bool,
        backwards: bool,
    ) -> Option<Position> {
        let mut line = Some(from.line);
        let mut first = true;
        while let Some(l) = line {
            if !backwards && self.lines[l].is_eop() {
                return None;
            }
            let chars = self.lines[l].chars();
            if backwards {
                let limit = if first {
                    (from.col - 1 + target.len() - 1).min(chars.len())
                } else {
                    chars.len()
                };
                if let Some(col) = ch_search(target, &chars[..limit], exact, true) {
                    return Some(Position::new(l, col));
                }
                line = self.lines[l].blink;
            } else {
                let skip = if first { from.col - 1 } else { 0 };
                if skip < chars.len()
                    && let Some(col) = ch_search(target, &chars[skip..], exact, false)
                {
                    return Some(Position::new(l, skip + col));
                }
                line = self.lines[l].flink;
            }
            first = false;
        }
        None
    }
}

/// Parse the trailing parameter into a character set.
///
/// Supports single characters and `..` ranges: `'abc'`, `'a..z'`, `'0..9A..Z'`.
fn parse_char_set(tpar: &TrailParam) -> HashSet<char> {
    let mut chars = HashSet::new();
    let s: Vec<char> = tpar.content.chars().collect();
    let mut i = 0;
    while i < s.len() {
        let ch1 = s[i];
        i += 1;
        if s.get(i) == Some(&'.')
            && s.get(i + 1) == Some(&'.')
            && let Some(&ch2) = s.get(i + 2)
        {
            i += 3;
            chars.extend(ch1..=ch2);
        } else {
            chars.insert(ch1);
        }
    }
    chars
}

/// Returns the parameter to use, remembering it, or the remembered one when
/// the parameter is empty.
fn cached(slot: &mut Option<TrailParam>, tpar: &TrailParam) -> Result<TrailParam, CmdFailure> {
    if tpar.content.is_empty() {
        return slot
            .clone()
            .ok_or_else(|| CmdFailure::BadParameter(String::new()));
    }
    *slot = Some(tpar.clone());
    Ok(tpar.clone())
}

/// Search targets are uppercased unless the match is exact.
fn prepare_target(tpar: &TrailParam) -> Vec<char> {
    let chars: Vec<char> = tpar.content.chars().collect();
    if tpar.is_exact() {
        chars
    } else {
        upcased(&chars)
    }
}
