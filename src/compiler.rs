//! Recursive descent compiler for Ludwig commands.
//!
//! Reads command text from a [`CommandSource`] (a span's text, or keys typed
//! at the terminal) and emits flat code into the shared [`CodeArena`].
//! Exit handlers and compound commands become jumps and level instructions;
//! labels are 1-based offsets within the code, with `len + 1` meaning "end".

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, trace};

use crate::cmd_attrib::{self, CmdAttrib};
use crate::code::{CmdOp, CodeArena, CodeRef, Instruction};
use crate::keybind::KeyTable;
use crate::lead_param::LeadParam;
use crate::limits::{MAX_COUNT, MAX_VERIFY};
use crate::marks::MarkId;
use crate::terminal::{Key, Terminal};
use crate::trail_param::{TrailParam, is_delimiter};

#[derive(Debug, Error)]
pub enum CompileError {
    /// The command text is malformed.  `line` and `col` are 1-based and
    /// only meaningful when compiling a span.
    #[error("{msg}")]
    Syntax { msg: String, line: usize, col: usize },
    #[error("Interrupted")]
    Interrupted,
    /// The terminal failed while reading keys.
    #[error(transparent)]
    Input(#[from] anyhow::Error),
}

/// One unit of command input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Char(char),
    /// A key without a character, only from the terminal.
    Key(Key),
    /// A line break in a span, or Return at the terminal.
    Eoln,
    End,
}

/// Supplies command input to the compiler.
pub trait CommandSource {
    fn next_token(&mut self) -> Result<Token, CompileError>;

    /// True when the input is the text of a span.
    fn from_span(&self) -> bool;

    /// 1-based line and column of the last token returned.
    fn position(&self) -> (usize, usize) {
        (0, 0)
    }
}

/// Reads commands from a snapshot of span text.
///
/// The sequence `<>` ends the input early.
#[derive(Debug)]
pub struct SpanSource {
    lines: Vec<Vec<char>>,
    line: usize,
    col: usize,
}

impl SpanSource {
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.as_ref().chars().collect()).collect(),
            line: 0,
            col: 0,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(&text.split('\n').collect::<Vec<_>>())
    }
}

impl CommandSource for SpanSource {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        let Some(chars) = self.lines.get(self.line) else {
            return Ok(Token::End);
        };
        if let Some(&ch) = chars.get(self.col) {
            if ch == '<' && chars.get(self.col + 1) == Some(&'>') {
                self.line = self.lines.len();
                return Ok(Token::End);
            }
            self.col += 1;
            return Ok(Token::Char(ch));
        }
        self.line += 1;
        self.col = 0;
        if self.line >= self.lines.len() {
            return Ok(Token::End);
        }
        Ok(Token::Eoln)
    }

    fn from_span(&self) -> bool {
        true
    }

    fn position(&self) -> (usize, usize) {
        (self.line + 1, self.col.max(1))
    }
}

/// Reads a command typed at the terminal.  Return ends the command; the
/// command introducer also ends it and is pushed back for the caller.
pub struct TerminalSource<'a> {
    term: &'a mut dyn Terminal,
    introducer: Key,
    interrupt: &'a AtomicBool,
}

impl<'a> TerminalSource<'a> {
    pub fn new(term: &'a mut dyn Terminal, introducer: Key, interrupt: &'a AtomicBool) -> Self {
        Self {
            term,
            introducer,
            interrupt,
        }
    }
}

impl CommandSource for TerminalSource<'_> {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                return Err(CompileError::Interrupted);
            }
            let key = self.term.read_key()?;
            if self.interrupt.load(Ordering::SeqCst) {
                return Err(CompileError::Interrupted);
            }
            if key == self.introducer {
                self.term.take_back_key(key);
                return Ok(Token::End);
            }
            return Ok(match key {
                Key::Resize => continue,
                Key::Enter => Token::Eoln,
                Key::Tab => Token::Char('\t'),
                Key::Char(ch) => Token::Char(ch),
                key => Token::Key(key),
            });
        }
    }

    fn from_span(&self) -> bool {
        false
    }
}

/// Compiles everything `source` supplies into new code with one reference.
/// `keys` resolves keys typed at the terminal to their bindings.
pub fn compile(
    arena: &mut CodeArena,
    source: &mut dyn CommandSource,
    keys: Option<&KeyTable>,
) -> Result<CodeRef, CompileError> {
    let mut compiler = Compiler {
        source,
        keys,
        arena: &mut *arena,
        instrs: Vec::new(),
        peeked: None,
        verify_count: 0,
    };
    if let Err(err) = compiler.compile_sequence(true) {
        compiler.release();
        return Err(err);
    }
    let instrs = std::mem::take(&mut compiler.instrs);
    debug!(len = instrs.len(), "compiled");
    Ok(arena.new_code(instrs))
}

/// Compiles command text as if it were the text of a span.
pub fn compile_str(arena: &mut CodeArena, text: &str) -> Result<CodeRef, CompileError> {
    compile(arena, &mut SpanSource::from_text(text), None)
}

/// Leading parameters that can repeat compiled code.
fn repeats(lead: LeadParam) -> bool {
    matches!(
        lead,
        LeadParam::None | LeadParam::Plus | LeadParam::Pint(_) | LeadParam::Pindef
    )
}

struct Compiler<'a> {
    source: &'a mut dyn CommandSource,
    keys: Option<&'a KeyTable>,
    arena: &'a mut CodeArena,
    instrs: Vec<Instruction>,
    peeked: Option<Token>,
    verify_count: usize,
}

impl Compiler<'_> {
    fn peek(&mut self) -> Result<Token, CompileError> {
        match self.peeked {
            Some(token) => Ok(token),
            None => {
                let token = self.source.next_token()?;
                self.peeked = Some(token);
                Ok(token)
            }
        }
    }

    fn next(&mut self) -> Result<Token, CompileError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.source.next_token(),
        }
    }

    fn peek_char(&mut self) -> Result<Option<char>, CompileError> {
        Ok(match self.peek()? {
            Token::Char(ch) => Some(ch),
            _ => None,
        })
    }

    fn error(&self, msg: impl Into<String>) -> CompileError {
        let (line, col) = self.source.position();
        CompileError::Syntax {
            msg: msg.into(),
            line,
            col,
        }
    }

    /// Label of the next instruction to be emitted.
    fn next_pc(&self) -> usize {
        self.instrs.len() + 1
    }

    fn emit(&mut self, instr: Instruction) -> usize {
        self.instrs.push(instr);
        self.instrs.len()
    }

    fn patch(&mut self, pc: usize, label: usize) {
        self.instrs[pc - 1].label = label;
    }

    /// Gives back references taken on key-bound code.
    fn release(&mut self) {
        for code in self.instrs.drain(..).filter_map(|i| i.code) {
            self.arena.discard(code);
        }
    }

    /// Parse commands until the end of input, or until `)`, `]` or `:`
    /// when nested.
    fn compile_sequence(&mut self, top: bool) -> Result<(), CompileError> {
        loop {
            self.skip_blanks(top)?;
            match self.peek()? {
                Token::End => break,
                Token::Eoln => {
                    self.next()?;
                    break;
                }
                Token::Char(ch @ (')' | ']' | ':')) => {
                    if top {
                        return Err(self.error(format!("Syntax error: unexpected '{ch}'.")));
                    }
                    break;
                }
                _ => self.compile_command()?,
            }
        }
        Ok(())
    }

    /// Skip blanks, and comments when compiling a span.  At the top level of
    /// a terminal command, a line end is left for the caller.
    fn skip_blanks(&mut self, top: bool) -> Result<(), CompileError> {
        loop {
            match self.peek()? {
                Token::Char(' ' | '\t') => {
                    self.next()?;
                }
                Token::Eoln if !(top && !self.source.from_span()) => {
                    self.next()?;
                }
                Token::Char('!') => {
                    if !self.source.from_span() {
                        self.next()?;
                        return Err(self.error("Comments are only allowed in spans."));
                    }
                    while !matches!(self.peek()?, Token::Eoln | Token::End) {
                        self.next()?;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_spaces(&mut self) -> Result<(), CompileError> {
        while let Token::Char(' ' | '\t') = self.peek()? {
            self.next()?;
        }
        Ok(())
    }

    /// Parse one command: leading parameter, then a compound, a key, or a
    /// named command, then an optional exit handler.
    fn compile_command(&mut self) -> Result<(), CompileError> {
        let lead = self.parse_leading_param()?;
        self.skip_spaces()?;
        match self.peek()? {
            Token::Char('(') => self.compile_compound(lead),
            Token::Key(key) => self.compile_key(lead, key),
            _ => self.compile_simple(lead),
        }
    }

    fn compile_compound(&mut self, lead: LeadParam) -> Result<(), CompileError> {
        self.next()?;
        let repeat = match lead {
            LeadParam::None | LeadParam::Plus => Some(1),
            LeadParam::Pint(n) => Some(n),
            LeadParam::Pindef => None,
            _ => {
                return Err(self.error(
                    "Syntax error: invalid leading parameter for compound command.",
                ));
            }
        };

        let exit_to = self.emit(Instruction::jump(CmdOp::ExitTo, 0));
        let fail_to = self.emit(Instruction::jump(CmdOp::FailTo, 0));
        let loop_pc = match repeat {
            Some(n) => {
                let mut iterate = Instruction::new(CmdOp::Iterate, lead);
                iterate.cnt = n;
                self.emit(iterate)
            }
            None => self.next_pc(),
        };

        self.compile_sequence(false)?;
        if self.next()? != Token::Char(')') {
            return Err(self.error("Syntax error: unclosed parenthesis."));
        }
        self.emit(Instruction::jump(CmdOp::PcJump, loop_pc));

        let exit_label = self.next_pc();
        self.patch(exit_to, exit_label);
        let fail_label = self.parse_exit_handler()?;
        // An indefinite loop ends, successfully, when its body fails.
        let fail_label = if repeat.is_none() {
            exit_label
        } else {
            fail_label
        };
        self.patch(fail_to, fail_label);
        Ok(())
    }

    fn compile_simple(&mut self, lead: LeadParam) -> Result<(), CompileError> {
        let op = self.parse_command_name()?;
        let attrib = cmd_attrib::attrib(op);
        if !lead.allowed_by(attrib.lp_allowed) {
            return Err(self.error("Syntax error: illegal leading parameter."));
        }
        let mut instr = Instruction::new(op, lead);
        instr.cnt = lead.count().unwrap_or(0);
        if op == CmdOp::Verify {
            self.verify_count += 1;
            if self.verify_count > MAX_VERIFY {
                return Err(self.error("Too many verify commands."));
            }
            instr.cnt = self.verify_count;
        }
        instr.tpars = self.parse_trailing_params(&attrib, lead)?;
        let pc = self.emit(instr);
        let fail_label = self.parse_exit_handler()?;
        self.patch(pc, fail_label);
        Ok(())
    }

    /// A key typed at the terminal stands for the command bound to it.
    fn compile_key(&mut self, lead: LeadParam, key: Key) -> Result<(), CompileError> {
        self.next()?;
        let Some(binding) = self.keys.and_then(|keys| keys.get(key)).cloned() else {
            return Err(self.error(format!("Key {key} is not bound.")));
        };
        let instr = match binding.code {
            Some(code) if binding.op == CmdOp::Extended => {
                if !repeats(lead) {
                    return Err(self.error("Syntax error: illegal leading parameter."));
                }
                self.arena.add_ref(code);
                let mut instr = Instruction::new(CmdOp::Extended, lead);
                instr.cnt = lead.count().unwrap_or(0);
                instr.code = Some(code);
                instr
            }
            _ => {
                let attrib = cmd_attrib::attrib(binding.op);
                if !lead.allowed_by(attrib.lp_allowed) {
                    return Err(self.error("Syntax error: illegal leading parameter."));
                }
                let mut instr = Instruction::new(binding.op, lead);
                instr.cnt = lead.count().unwrap_or(0);
                instr.tpars = binding.tpars;
                let wanted = attrib.tpars_for(lead.is_positive());
                if instr.tpars.len() < wanted {
                    instr.tpars.resize(wanted, TrailParam::prompt());
                }
                instr
            }
        };
        let pc = self.emit(instr);
        let fail_label = self.parse_exit_handler()?;
        self.patch(pc, fail_label);
        Ok(())
    }

    /// Parse an optional exit handler `[success : failure]`, emitting both
    /// parts.  Returns the label a failing command should branch to: the
    /// failure part, the end of the handler when the failure part is empty,
    /// or 0 when there is no handler.
    fn parse_exit_handler(&mut self) -> Result<usize, CompileError> {
        self.skip_spaces()?;
        if self.peek()? != Token::Char('[') {
            return Ok(0);
        }
        self.next()?;

        self.compile_sequence(false)?;
        let mut fail_label = None;
        if self.peek()? == Token::Char(':') {
            self.next()?;
            let jump = self.emit(Instruction::jump(CmdOp::PcJump, 0));
            let fail_start = self.next_pc();
            self.compile_sequence(false)?;
            if self.next_pc() == fail_start {
                self.instrs.pop();
            } else {
                let end = self.next_pc();
                self.patch(jump, end);
                fail_label = Some(fail_start);
            }
        }
        if self.next()? != Token::Char(']') {
            return Err(self.error("Syntax error: unclosed exit handler bracket."));
        }
        Ok(fail_label.unwrap_or_else(|| self.next_pc()))
    }

    /// Parse a leading parameter (digits, `+`, `-`, `>`, `.`, `<`, `,`,
    /// `@n`, `=`, `%`).
    fn parse_leading_param(&mut self) -> Result<LeadParam, CompileError> {
        let Some(ch) = self.peek_char()? else {
            return Ok(LeadParam::None);
        };
        let lead = match ch {
            '+' | '-' => {
                self.next()?;
                match (ch, self.parse_count()?) {
                    ('+', None) => LeadParam::Plus,
                    ('+', Some(n)) => LeadParam::Pint(n),
                    (_, None) => LeadParam::Minus,
                    (_, Some(n)) => LeadParam::Nint(n),
                }
            }
            '0'..='9' => match self.parse_count()? {
                Some(n) => LeadParam::Pint(n),
                None => LeadParam::None,
            },
            '>' | '.' => {
                self.next()?;
                LeadParam::Pindef
            }
            '<' | ',' => {
                self.next()?;
                LeadParam::Nindef
            }
            '=' => {
                self.next()?;
                LeadParam::Marker(MarkId::Equals)
            }
            '%' => {
                self.next()?;
                LeadParam::Marker(MarkId::Modified)
            }
            '@' => {
                self.next()?;
                let mark = self.parse_count()?.and_then(MarkId::numbered);
                match mark {
                    Some(id) => LeadParam::Marker(id),
                    None => {
                        return Err(
                            self.error("Syntax error: mark number must be between 1 and 9.")
                        );
                    }
                }
            }
            _ => LeadParam::None,
        };
        trace!(?lead, "leading parameter");
        Ok(lead)
    }

    fn parse_count(&mut self) -> Result<Option<usize>, CompileError> {
        let mut value: Option<usize> = None;
        while let Some(digit) = self.peek_char()?.and_then(|ch| ch.to_digit(10)) {
            self.next()?;
            let n = value.unwrap_or(0) * 10 + digit as usize;
            if n > MAX_COUNT {
                return Err(self.error("Count too large."));
            }
            value = Some(n);
        }
        Ok(value)
    }

    /// Parse a command name.  Letters accumulate while they spell a prefix
    /// of a longer name.
    fn parse_command_name(&mut self) -> Result<CmdOp, CompileError> {
        let mut name = String::new();
        loop {
            match self.peek_char()? {
                Some(ch) if ch.is_ascii_alphabetic() || ch == '*' => {
                    self.next()?;
                    name.push(ch.to_ascii_lowercase());
                    if let Some(op) = cmd_attrib::lookup(&name) {
                        return Ok(op);
                    }
                    if !cmd_attrib::is_prefix(&name) {
                        break;
                    }
                }
                _ => break,
            }
        }
        if name.is_empty() {
            self.next()?;
            return Err(self.error("Syntax error: expected command name."));
        }
        Err(self.error(format!(
            "Syntax error: unknown command '{}'.",
            name.to_uppercase()
        )))
    }

    /// Parse the trailing parameters of a command.  All of them share the
    /// delimiter that follows the command name.
    fn parse_trailing_params(
        &mut self,
        attrib: &CmdAttrib,
        lead: LeadParam,
    ) -> Result<Vec<TrailParam>, CompileError> {
        let count = attrib.tpars_for(lead.is_positive());
        if count == 0 {
            return Ok(Vec::new());
        }
        if !self.source.from_span() && matches!(self.peek()?, Token::Eoln | Token::End) {
            return Ok(vec![TrailParam::prompt(); count]);
        }
        let dlm = match self.next()? {
            Token::Char(ch) if is_delimiter(ch) => ch,
            _ => return Err(self.error("Syntax error: expected trailing parameter delimiter.")),
        };
        let mut tpars = Vec::with_capacity(count);
        for info in &attrib.tpar_info[..count] {
            let mut content = String::new();
            loop {
                match self.next()? {
                    Token::Char(ch) if ch == dlm => break,
                    Token::Char(ch) => content.push(ch),
                    Token::Eoln if info.ml_allowed => content.push('\n'),
                    Token::Eoln => {
                        return Err(self.error("Multi-line parameter not allowed."));
                    }
                    Token::Key(key) => {
                        return Err(self.error(format!("Key {key} not allowed in parameter.")));
                    }
                    Token::End => {
                        return Err(self.error("Syntax error: unclosed trailing parameter."));
                    }
                }
            }
            tpars.push(TrailParam::new(dlm, content));
        }
        Ok(tpars)
    }
}
