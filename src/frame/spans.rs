//! Span commands (define, copy, transfer, jump, assign, kill, index).

use itertools::Itertools;
use tracing::debug;

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::document::{Document, SpanId};
use crate::lead_param::LeadParam;
use crate::marks::MarkId;
use crate::position::Position;
use crate::span::normalize_name;
use crate::trail_param::TrailParam;

/// Longest span preview shown by `SI`.
const PREVIEW_WIDTH: usize = 40;

/// Commands on named spans.
pub trait SpanCommands {
    /// SD - define a span from the dot to a mark (`@1` by default).
    fn cmd_span_define(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult;

    /// SC - copy a span's text to the dot, repeated.
    fn cmd_span_copy(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult;

    /// ST - move a span's text to the dot.  The span follows its text.
    fn cmd_span_transfer(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult;

    /// SJ - move the dot to the end of a span, or its start with `-`.
    fn cmd_span_jump(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult;

    /// SA - replace a span's text, creating the span in the HEAP frame if
    /// it does not exist.
    fn cmd_span_assign(
        &mut self,
        lead_param: LeadParam,
        name: &TrailParam,
        text: &TrailParam,
    ) -> CmdResult;

    /// SK - destroy a span.  `-SK` destroys every span that is not a frame.
    fn cmd_span_kill(&mut self, lead_param: LeadParam, name: Option<&TrailParam>) -> CmdResult;

    /// SI - one line describing each span, in name order.
    fn span_index(&self) -> Vec<String>;
}

impl SpanCommands for Document {
    fn cmd_span_define(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult {
        let id = match lead_param {
            LeadParam::None | LeadParam::Plus => MarkId::Numbered(1),
            LeadParam::Pint(n) => match MarkId::numbered(n) {
                Some(id) => id,
                None => return CmdResult::Failure(CmdFailure::SyntaxError),
            },
            LeadParam::Marker(id) => id,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let frame = self.current;
        let Some(other) = self.mark_at(frame, id) else {
            return CmdResult::Failure(CmdFailure::MarkNotDefined);
        };
        let dot = self.dot(frame);
        self.span_create(&name.content, dot, other).map(|_| ()).into()
    }

    fn cmd_span_copy(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult {
        let count = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                lead_param.count().unwrap_or(1)
            }
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let span = match self.lookup_span(name) {
            Ok(span) => span,
            Err(failure) => return CmdResult::Failure(failure),
        };
        if count == 0 {
            return CmdResult::Success;
        }
        let block = repeat_lines(&self.span_text(span), count);
        self.place_at_dot(&block).into()
    }

    fn cmd_span_transfer(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult {
        if !matches!(lead_param, LeadParam::None | LeadParam::Plus) {
            return CmdResult::Failure(CmdFailure::SyntaxError);
        }
        let span = match self.lookup_span(name) {
            Ok(span) => span,
            Err(failure) => return CmdResult::Failure(failure),
        };
        if self.spans[span].frame.is_some() {
            return CmdResult::Failure(CmdFailure::FrameInUse(self.span_name(span).to_string()));
        }
        let frame = self.current;
        let (one, two) = self.span_bounds(span);
        let dot = self.dot(frame);
        if self.frame_of_line(one.line) == Some(frame)
            && !self.position_le(dot, one)
            && !self.position_le(two, dot)
        {
            return CmdResult::Failure(CmdFailure::OutOfRange);
        }

        let texts = self.text_between(one, two);
        let source = self.frame_of_line(one.line);
        if let Err(failure) = self.text_delete_region(one, two) {
            return CmdResult::Failure(failure);
        }
        if let Some(source) = source {
            self.note_modified(source, one);
        }
        let dot = self.dot(frame);
        match self.text_place(dot, &texts) {
            Ok((start, end)) => {
                let (m1, m2) = (self.spans[span].mark_one, self.spans[span].mark_two);
                self.mark_move(m1, start);
                self.mark_move(m2, end);
                self.set_dot(frame, end);
                self.set_mark(frame, MarkId::Equals, start);
                self.note_modified(frame, end);
                CmdResult::Success
            }
            Err(failure) => CmdResult::Failure(failure),
        }
    }

    fn cmd_span_jump(&mut self, lead_param: LeadParam, name: &TrailParam) -> CmdResult {
        let to_start = match lead_param {
            LeadParam::None | LeadParam::Plus => false,
            LeadParam::Minus => true,
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let span = match self.lookup_span(name) {
            Ok(span) => span,
            Err(failure) => return CmdResult::Failure(failure),
        };
        let frame = self.current;
        let (one, two) = self.span_bounds(span);
        if self.frame_of_line(one.line) != Some(frame) {
            return CmdResult::Failure(CmdFailure::DifferentFrames);
        }
        self.remember_dot(frame);
        self.set_dot(frame, if to_start { one } else { two });
        CmdResult::Success
    }

    fn cmd_span_assign(
        &mut self,
        lead_param: LeadParam,
        name: &TrailParam,
        text: &TrailParam,
    ) -> CmdResult {
        let count = match lead_param {
            LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) => {
                lead_param.count().unwrap_or(1)
            }
            _ => return CmdResult::Failure(CmdFailure::SyntaxError),
        };
        let name = match normalize_name(&name.content) {
            Ok(name) => name,
            Err(failure) => return CmdResult::Failure(failure),
        };
        let lines: Vec<String> = text.content.split('\n').map(str::to_string).collect();
        let texts = if count == 0 {
            vec![String::new()]
        } else {
            repeat_lines(&lines, count)
        };
        self.assign(&name, &texts).map(|_| ()).into()
    }

    fn cmd_span_kill(&mut self, lead_param: LeadParam, name: Option<&TrailParam>) -> CmdResult {
        match (lead_param, name) {
            (LeadParam::Minus, _) => {
                for span in self.span_list() {
                    if self.spans[span].frame.is_none() {
                        self.span_free(span);
                    }
                }
                CmdResult::Success
            }
            (LeadParam::None | LeadParam::Plus, Some(name)) => {
                match self.lookup_span(name) {
                    Ok(span) => self.span_destroy(span).into(),
                    Err(failure) => CmdResult::Failure(failure),
                }
            }
            _ => CmdResult::Failure(CmdFailure::SyntaxError),
        }
    }

    fn span_index(&self) -> Vec<String> {
        self.span_list()
            .into_iter()
            .map(|span| {
                let name = self.span_name(span);
                if let Some(frame) = self.spans[span].frame {
                    let lines = self.total_lines(frame) - 1;
                    let modified = if self.frames[frame].text_modified { ", modified" } else { "" };
                    return format!("{name:<32}<frame: {lines} line{}{modified}>", plural(lines));
                }
                let preview = self.span_text(span).iter().map(|l| l.trim()).join(" ");
                if preview.chars().count() > PREVIEW_WIDTH {
                    let cut: String = preview.chars().take(PREVIEW_WIDTH - 3).collect();
                    format!("{name:<32}{cut}...")
                } else {
                    format!("{name:<32}{preview}")
                }
            })
            .collect()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `count` copies of a block of lines, each copy starting where the last
/// one ended.
fn repeat_lines(lines: &[String], count: usize) -> Vec<String> {
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
}

impl Document {
    fn lookup_span(&mut self, name: &TrailParam) -> Result<SpanId, CmdFailure> {
        let name = normalize_name(&name.content)?;
        self.span_named(&name).ok_or(CmdFailure::NoSuchSpan(name))
    }

    /// Places text at the dot of the current frame, leaving the dot after it.
    fn place_at_dot(&mut self, texts: &[String]) -> Result<(), CmdFailure> {
        let frame = self.current;
        let dot = self.dot(frame);
        let (start, end) = self.text_place(dot, texts)?;
        self.set_dot(frame, end);
        self.set_mark(frame, MarkId::Equals, start);
        self.note_modified(frame, end);
        Ok(())
    }

    /// Sets the text of span `name`.  A new span gets lines of its own at
    /// the end of the HEAP frame.
    pub(crate) fn assign(&mut self, name: &str, texts: &[String]) -> Result<SpanId, CmdFailure> {
        if let Some(span) = self.span_named(name) {
            if self.spans[span].frame.is_some() {
                return Err(CmdFailure::FrameInUse(name.to_string()));
            }
            let (one, two) = self.span_bounds(span);
            self.text_delete_region(one, two)?;
            let (start, end) = self.text_place(one, texts)?;
            let (m1, m2) = (self.spans[span].mark_one, self.spans[span].mark_two);
            self.mark_move(m1, start);
            self.mark_move(m2, end);
            if let Some(frame) = self.frame_of_line(start.line) {
                self.note_modified(frame, end);
            }
            if let Some(code) = self.spans[span].code.take() {
                self.code.discard(code);
            }
            return Ok(span);
        }

        let heap = self.frame_heap;
        let eop = self.eop_line(heap);
        let (line, _) = self.lines_create(1).ok_or(CmdFailure::NoRoom)?;
        if let Err(failure) = self.lines_inject(line, line, eop) {
            self.lines_destroy(line, line)?;
            return Err(failure);
        }
        let start = Position::new(line, 1);
        let end = self.text_insert_block(start, texts)?;
        debug!(name, "span created in heap");
        self.span_create(name, start, end)
    }
}
