//! Dispatch of editing primitives.
//!
//! The interpreter hands every non-intrinsic instruction to
//! [`Editor::execute`], which resolves the trailing parameters and calls the
//! primitive.  Primitives that only touch text live on [`Document`]; the
//! ones here also need files, keys, the terminal or the interpreter.

use std::path::Path;

use tracing::{debug, warn};

use crate::cmd_attrib;
use crate::cmd_result::{CmdFailure, CmdResult};
use crate::code::{CmdOp, CodeRef};
use crate::compiler::{self, CompileError, SpanSource};
use crate::document::{Document, FrameId, SpanId};
use crate::edit_mode::EditMode;
use crate::editor::Editor;
use crate::frame::{
    CaseMode, EditCommands, MotionCommands, PredicateCommands, SearchCommands, SpanCommands,
};
use crate::keybind::KeyBinding;
use crate::lead_param::LeadParam;
use crate::limits::MAX_EXEC_RECURSION;
use crate::pager;
use crate::position::Position;
use crate::span::normalize_name;
use crate::terminal::{Key, Terminal};
use crate::trail_param::TrailParam;

impl Editor {
    /// Runs one editing primitive against the current frame.
    pub(crate) fn execute(
        &mut self,
        term: &mut dyn Terminal,
        op: CmdOp,
        rep: LeadParam,
        tpars: &[TrailParam],
    ) -> CmdResult {
        let tpars = match self.resolve_tpars(term, op, rep, tpars) {
            Ok(tpars) => tpars,
            Err(failure) => return CmdResult::Failure(failure),
        };
        let t = tpars.as_slice();
        let frame = self.current_frame();
        let doc = &mut self.doc;
        match op {
            CmdOp::Up => doc.cmd_cursor_vertical(rep, false),
            CmdOp::Down => doc.cmd_cursor_vertical(rep, true),
            CmdOp::Left => doc.cmd_cursor_horizontal(rep, false),
            CmdOp::Right => doc.cmd_cursor_horizontal(rep, true),
            CmdOp::Home => doc.cmd_home(),
            CmdOp::Return => doc.cmd_return(rep),
            CmdOp::Rubout => doc.cmd_rubout(rep, self.mode != EditMode::Overtype),
            CmdOp::Advance => doc.cmd_advance(rep),
            CmdOp::Jump => doc.cmd_jump(rep),

            CmdOp::WindowForward
            | CmdOp::WindowBackward
            | CmdOp::WindowTop
            | CmdOp::WindowEnd
            | CmdOp::WindowMiddle
            | CmdOp::WindowNew => self.window_command(op, rep).into(),

            CmdOp::Get => doc.cmd_get(rep, &t[0]),
            CmdOp::Next => doc.cmd_next(rep, &t[0]),
            CmdOp::Replace => doc.cmd_replace(rep, &t[0], &t[1]),
            CmdOp::EqualString => doc.cmd_eqs(rep, &t[0]),
            CmdOp::EqualColumn => doc.cmd_eqc(rep, &t[0]),
            CmdOp::EqualMark => doc.cmd_eqm(rep, &t[0]),
            CmdOp::EqualEol => doc.cmd_eol(rep),
            CmdOp::EqualEop => doc.cmd_eop(rep),
            CmdOp::EqualEof => {
                let exhausted = doc
                    .frame(frame)
                    .input_file
                    .is_none_or(|slot| self.files.is_eof(slot));
                doc.cmd_eof(rep, exhausted)
            }

            CmdOp::InsertText => doc.cmd_insert_text(rep, &t[0]),
            CmdOp::OvertypeText => doc.cmd_overtype_text(rep, &t[0]),
            CmdOp::InsertChar => doc.cmd_insert_char(rep),
            CmdOp::InsertLine => doc.cmd_insert_line(rep),
            CmdOp::DeleteChar => doc.cmd_delete_char(rep),
            CmdOp::DeleteLine => doc.cmd_delete_line(rep),
            CmdOp::SplitLine => doc.cmd_split_line(rep),
            CmdOp::SwapLine => doc.cmd_swap_line(rep),
            CmdOp::CaseUp => doc.cmd_case_change(rep, CaseMode::Upper),
            CmdOp::CaseLow => doc.cmd_case_change(rep, CaseMode::Lower),
            CmdOp::CaseEdit => doc.cmd_case_change(rep, CaseMode::Edit),
            CmdOp::Mark => doc.cmd_mark(rep),

            CmdOp::SpanDefine => doc.cmd_span_define(rep, &t[0]),
            CmdOp::SpanCopy => doc.cmd_span_copy(rep, &t[0]),
            CmdOp::SpanTransfer => doc.cmd_span_transfer(rep, &t[0]),
            CmdOp::SpanJump => doc.cmd_span_jump(rep, &t[0]),
            CmdOp::SpanAssign => doc.cmd_span_assign(rep, &t[0], &t[1]),
            CmdOp::SpanKill => doc.cmd_span_kill(rep, t.first()),
            CmdOp::SpanIndex => {
                for line in doc.span_index() {
                    term.message(&line);
                }
                CmdResult::Success
            }
            CmdOp::SpanCompile => self.compile_span(term, &t[0].content).map(|_| ()).into(),
            CmdOp::SpanExecute => self.span_execute(term, rep, &t[0].content, true),
            CmdOp::SpanExecuteNoRecompile => self.span_execute(term, rep, &t[0].content, false),

            CmdOp::FrameEdit => doc.frame_edit(&t[0].content).into(),
            CmdOp::FrameReturn => doc.frame_return(rep.count().unwrap_or(1)).into(),
            CmdOp::FrameKill => doc.frame_kill(&t[0].content).into(),

            CmdOp::FileInput => self.file_input(frame, &t[0].content).into(),
            CmdOp::FileOutput => self.file_output(frame, &t[0].content).into(),
            CmdOp::FileEdit => self.file_edit(term, frame, &t[0].content).into(),
            CmdOp::FileClose => match self.close_frame_files(term, frame) {
                Ok(true) => CmdResult::Success,
                Ok(false) => CmdResult::Failure(CmdFailure::File("No file attached to frame".into())),
                Err(failure) => CmdResult::Failure(failure),
            },
            CmdOp::FileKill => self.file_kill(term, frame).into(),
            CmdOp::Page => pager::file_page(&mut self.doc, &mut self.files, frame).into(),

            CmdOp::UserKey => self.user_key(term, &t[0].content, &t[1].content).into(),
            CmdOp::UserMode => self.user_mode(&t[0].content).into(),
            CmdOp::UserCommandIntroducer => match Key::from_name(t[0].content.trim()) {
                Some(key) => {
                    self.keys.set_introducer(key);
                    CmdResult::Success
                }
                None => CmdResult::Failure(CmdFailure::BadParameter(t[0].content.clone())),
            },
            CmdOp::Quit => {
                debug!("quit requested");
                self.quit = true;
                CmdResult::Success
            }

            CmdOp::Noop
            | CmdOp::PcJump
            | CmdOp::ExitTo
            | CmdOp::FailTo
            | CmdOp::Iterate
            | CmdOp::ExitSuccess
            | CmdOp::ExitFail
            | CmdOp::ExitAbort
            | CmdOp::Extended
            | CmdOp::Verify => {
                warn!(?op, "intrinsic reached the dispatcher");
                CmdResult::Failure(CmdFailure::SyntaxError)
            }
        }
    }

    /// Substitutes every trailing parameter the command takes.  A missing
    /// one is asked for.
    fn resolve_tpars(
        &mut self,
        term: &mut dyn Terminal,
        op: CmdOp,
        rep: LeadParam,
        tpars: &[TrailParam],
    ) -> Result<Vec<TrailParam>, CmdFailure> {
        let attrib = cmd_attrib::attrib(op);
        let wanted = attrib.tpars_for(rep.is_positive());
        let mut resolved = Vec::with_capacity(wanted);
        for (i, info) in attrib.tpar_info.iter().enumerate().take(wanted) {
            let raw = tpars.get(i).cloned().unwrap_or_else(TrailParam::prompt);
            resolved.push(self.tpar_get(term, &raw, info)?);
        }
        Ok(resolved)
    }

    /// Compiles the text of span `name` and keeps the code with the span.
    pub(crate) fn compile_span(
        &mut self,
        term: &mut dyn Terminal,
        name: &str,
    ) -> Result<CodeRef, CmdFailure> {
        let name = normalize_name(name)?;
        let span = self
            .doc
            .span_named(&name)
            .ok_or_else(|| CmdFailure::NoSuchSpan(name.clone()))?;
        let text = self.doc.span_text(span);
        let mut source = SpanSource::new(&text);
        match compiler::compile(&mut self.doc.code, &mut source, None) {
            Ok(code) => {
                if let Some(old) = self.doc.spans[span].code.replace(code) {
                    self.doc.code.discard(old);
                }
                Ok(code)
            }
            Err(err) => {
                if let CompileError::Syntax { msg, line, col } = &err
                    && self.config.inject_error_marker
                {
                    self.doc.inject_error_marker(span, *line, *col, msg);
                }
                Err(self.compile_failed(term, err))
            }
        }
    }

    /// `EX` and `EN`: runs the code of a span, compiling it first when
    /// `recompile` is set or it has no code yet.
    fn span_execute(
        &mut self,
        term: &mut dyn Terminal,
        rep: LeadParam,
        name: &str,
        recompile: bool,
    ) -> CmdResult {
        if self.exec_depth >= MAX_EXEC_RECURSION {
            warn!(depth = self.exec_depth, name, "span execution too deep");
            return CmdResult::Failure(CmdFailure::ExecRecursion);
        }
        let cached = if recompile {
            None
        } else {
            normalize_name(name)
                .ok()
                .and_then(|name| self.doc.span_named(&name))
                .and_then(|span| self.doc.spans[span].code)
        };
        let code = match cached {
            Some(code) => code,
            None => match self.compile_span(term, name) {
                Ok(code) => code,
                Err(failure) => return CmdResult::Failure(failure),
            },
        };
        let count = match rep {
            LeadParam::Pint(n) => n,
            _ => 1,
        };
        self.exec_depth += 1;
        let result = self.interpret(term, rep, count, code, true);
        self.exec_depth -= 1;
        result
    }

    fn window_command(&mut self, op: CmdOp, rep: LeadParam) -> Result<(), CmdFailure> {
        let Some(height) = self.window_height else {
            return Ok(());
        };
        let height = height.max(1);
        let doc = &mut self.doc;
        let frame = doc.current_frame();
        let dot = doc.dot(frame);
        let dot_nr = doc.line_to_number(dot.line).ok_or(CmdFailure::OutOfRange)?;
        let total = doc.total_lines(frame);
        let top_nr = match op {
            CmdOp::WindowForward | CmdOp::WindowBackward => {
                let step = rep.count().unwrap_or(1) * height;
                let target = if op == CmdOp::WindowForward {
                    (dot_nr + step).min(total)
                } else {
                    dot_nr.saturating_sub(step).max(1)
                };
                if target == dot_nr {
                    return Err(CmdFailure::OutOfRange);
                }
                let line = doc.line_from_number(frame, target).ok_or(CmdFailure::OutOfRange)?;
                doc.set_dot(frame, Position::new(line, dot.col));
                target.saturating_sub(height / 2).max(1)
            }
            CmdOp::WindowTop => dot_nr,
            CmdOp::WindowEnd => (dot_nr + 1).saturating_sub(height).max(1),
            CmdOp::WindowMiddle => dot_nr.saturating_sub(height / 2).max(1),
            _ => {
                doc.frame_mut(frame).redraw = true;
                return Ok(());
            }
        };
        let top = doc.line_from_number(frame, top_nr);
        let f = doc.frame_mut(frame);
        f.scr_top_line = top;
        f.redraw = true;
        Ok(())
    }

    fn file_input(&mut self, frame: FrameId, path: &str) -> Result<(), CmdFailure> {
        if self.doc.frame(frame).input_file.is_some() {
            return Err(CmdFailure::FrameInUse(self.doc.frame_name(frame).to_string()));
        }
        let slot = self.files.open_input(path.trim())?;
        self.doc.frame_mut(frame).input_file = Some(slot);
        let was_empty = self.doc.first_line(frame) == self.doc.eop_line(frame);
        let filled = pager::file_fill(&mut self.doc, &mut self.files, frame);
        if was_empty {
            let first = self.doc.first_line(frame);
            self.doc.set_dot(frame, Position::new(first, 1));
        }
        filled
    }

    fn file_output(&mut self, frame: FrameId, path: &str) -> Result<(), CmdFailure> {
        if self.doc.frame(frame).output_file.is_some() {
            return Err(CmdFailure::FrameInUse(self.doc.frame_name(frame).to_string()));
        }
        let slot = self.files.open_output(path.trim(), false)?;
        self.doc.frame_mut(frame).output_file = Some(slot);
        Ok(())
    }

    /// `FE`: reads the file if it exists and writes it back on close.
    fn file_edit(&mut self, term: &mut dyn Terminal, frame: FrameId, path: &str) -> Result<(), CmdFailure> {
        let f = self.doc.frame(frame);
        if f.input_file.is_some() || f.output_file.is_some() {
            return Err(CmdFailure::FrameInUse(self.doc.frame_name(frame).to_string()));
        }
        let path = path.trim();
        if !Path::new(path).exists() {
            term.message(&format!("{path} is a new file."));
            return self.file_output(frame, path);
        }
        // A line too long to load stays in the input, and the output must
        // still be attached so closing the frame copies it through.
        let filled = self.file_input(frame, path);
        if let Err(failure) = &filled
            && !matches!(failure, CmdFailure::LineTooLong(_))
        {
            return filled;
        }
        let slot = self.files.open_output(path, true)?;
        self.doc.frame_mut(frame).output_file = Some(slot);
        filled
    }

    /// Closes the frame's files.  The frame's text and the rest of its
    /// input go to the output, unless the output was opened by `FE` and the
    /// frame was never changed.  Returns false when no file was attached.
    pub(crate) fn close_frame_files(
        &mut self,
        term: &mut dyn Terminal,
        frame: FrameId,
    ) -> Result<bool, CmdFailure> {
        let (input, output) = {
            let f = self.doc.frame(frame);
            (f.input_file, f.output_file)
        };
        if input.is_none() && output.is_none() {
            return Ok(false);
        }
        if let Some(out) = output {
            let paired = self.files.get(out).is_some_and(|f| f.paired);
            let discard = paired && !self.doc.frame(frame).text_modified;
            if !discard {
                for text in frame_lines(&self.doc, frame) {
                    self.files.write(out, &text)?;
                }
                if let Some(inp) = input {
                    pager::file_windthru(&mut self.files, inp, out)?;
                }
            }
            self.doc.frame_mut(frame).output_file = None;
            let report = self.files.close(out, discard)?;
            term.message(&report);
        }
        if let Some(inp) = input {
            self.doc.frame_mut(frame).input_file = None;
            let report = self.files.close(inp, false)?;
            term.message(&report);
        }
        self.doc.frame_mut(frame).text_modified = false;
        Ok(true)
    }

    /// Closes the frame's files without writing anything.
    pub(crate) fn abandon_frame_files(
        &mut self,
        term: &mut dyn Terminal,
        frame: FrameId,
    ) -> Result<(), CmdFailure> {
        if let Some(out) = self.doc.frame_mut(frame).output_file.take() {
            let report = self.files.close(out, true)?;
            term.message(&report);
        }
        if let Some(inp) = self.doc.frame_mut(frame).input_file.take() {
            let report = self.files.close(inp, false)?;
            term.message(&report);
        }
        Ok(())
    }

    fn file_kill(&mut self, term: &mut dyn Terminal, frame: FrameId) -> Result<(), CmdFailure> {
        let out = self
            .doc
            .frame(frame)
            .output_file
            .ok_or_else(|| CmdFailure::File("No output file".into()))?;
        self.doc.frame_mut(frame).output_file = None;
        let report = self.files.close(out, true)?;
        term.message(&report);
        Ok(())
    }

    /// `UK`: binds the command text to a key, releasing what was bound.
    fn user_key(&mut self, term: &mut dyn Terminal, key_name: &str, command: &str) -> Result<(), CmdFailure> {
        let key = Key::from_name(key_name.trim())
            .ok_or_else(|| CmdFailure::BadParameter(key_name.to_string()))?;
        let code = match compiler::compile_str(&mut self.doc.code, command) {
            Ok(code) => code,
            Err(err) => return Err(self.compile_failed(term, err)),
        };
        let binding = KeyBinding::from_code(&mut self.doc.code, code);
        self.keys.bind(&mut self.doc.code, key, binding);
        Ok(())
    }

    fn user_mode(&mut self, mode: &str) -> Result<(), CmdFailure> {
        let mode = match mode.trim().to_ascii_uppercase().as_str() {
            "C" | "COMMAND" => EditMode::Command,
            "I" | "INSERT" => EditMode::Insert,
            "O" | "OVERTYPE" => EditMode::Overtype,
            _ => return Err(CmdFailure::BadParameter(mode.to_string())),
        };
        self.previous_mode = self.mode;
        self.mode = mode;
        Ok(())
    }

    /// Replaces the COMMAND frame's text with `texts` and runs it once.
    pub(crate) fn execute_command_frame(&mut self, term: &mut dyn Terminal, texts: &[String]) -> CmdResult {
        if let Err(failure) = self.doc.replace_frame_text(self.doc.frame_cmd, texts) {
            return CmdResult::Failure(failure);
        }
        let name = self.doc.frame_name(self.doc.frame_cmd).to_string();
        let code = match self.compile_span(term, &name) {
            Ok(code) => code,
            Err(failure) => return CmdResult::Failure(failure),
        };
        self.interpret(term, LeadParam::None, 1, code, true)
    }
}

/// The text lines of a frame, without its EOP line.
fn frame_lines(doc: &Document, frame: FrameId) -> Vec<String> {
    let first = doc.first_line(frame);
    let eop = doc.eop_line(frame);
    doc.chain(first, eop)
        .into_iter()
        .filter(|&line| !doc.line(line).is_eop())
        .map(|line| doc.line_text(line))
        .collect()
}

impl Document {
    /// Puts a line pointing at the column of a compile error after line
    /// `line` of the span.
    fn inject_error_marker(&mut self, span: SpanId, line: usize, col: usize, msg: &str) {
        let (start, _) = self.span_bounds(span);
        let mut target = start.line;
        for _ in 1..line {
            match self.lines[target].flink {
                Some(next) => target = next,
                None => break,
            }
        }
        let before = match self.lines[target].flink {
            Some(next) if !self.lines[target].is_eop() => next,
            _ => target,
        };
        let marker = format!("{}! {msg}", " ".repeat(col.saturating_sub(1)));
        let injected = self.lines_from_text(&[marker]).and_then(|lines| match lines {
            Some((first, last)) => self.lines_inject(first, last, before).map(|()| first),
            None => Err(CmdFailure::NoRoom),
        });
        match injected {
            Ok(marker_line) => {
                if let Some(frame) = self.frame_of_line(marker_line) {
                    self.note_modified(frame, Position::new(marker_line, 1));
                }
            }
            Err(failure) => warn!(%failure, "error marker not placed"),
        }
    }

    /// Replaces every line of `frame` with `texts`.
    fn replace_frame_text(&mut self, frame: FrameId, texts: &[String]) -> Result<(), CmdFailure> {
        let first = self.first_line(frame);
        let eop = self.eop_line(frame);
        if first != eop
            && let Some(last) = self.lines[eop].blink
        {
            self.marks_squeeze(Position::new(first, 1), Position::new(eop, 1));
            self.lines_extract(first, last)?;
            self.lines_destroy(first, last)?;
        }
        if let Some((head, tail)) = self.lines_from_text(texts)? {
            if let Err(failure) = self.lines_inject(head, tail, eop) {
                self.lines_destroy(head, tail)?;
                return Err(failure);
            }
            self.set_dot(frame, Position::new(head, 1));
        }
        Ok(())
    }
}
