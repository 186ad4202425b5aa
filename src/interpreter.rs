//! Command execution engine for Ludwig compiled code.
//!
//! Code is a flat run of instructions.  Compound commands push a level
//! recording where to go when they finish and where to go when they fail;
//! a failing command branches to its own label, or, when it has none, pops
//! levels until one has a failure label.  `XS`, `XF` and `XA` leave levels
//! explicitly.

use std::sync::atomic::Ordering;

use tracing::{debug, trace, warn};

use crate::cmd_attrib;
use crate::cmd_result::{CmdFailure, CmdResult};
use crate::code::{CmdOp, CodeRef, Instruction};
use crate::editor::Editor;
use crate::lead_param::LeadParam;
use crate::limits::{MAX_LEVEL, MAX_VERIFY};
use crate::terminal::Terminal;

/// One compound command in progress.
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    exit_label: usize,
    fail_label: usize,
    iter_count: usize,
}

/// What the user said to a verify prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyReply {
    Yes,
    No,
    Always,
    Quit,
}

impl VerifyReply {
    fn parse(reply: &str) -> Self {
        match reply.trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('Y') => VerifyReply::Yes,
            Some('A') => VerifyReply::Always,
            Some('Q') => VerifyReply::Quit,
            _ => VerifyReply::No,
        }
    }
}

/// How a round of the code ended.
enum Step {
    Continue,
    Done(CmdResult),
}

impl Editor {
    /// Runs `code` `count` times, or until it fails when `rep` is `>`.
    /// A failing round ends an indefinite run successfully unless the
    /// failure is fatal.
    pub fn interpret(
        &mut self,
        term: &mut dyn Terminal,
        rep: LeadParam,
        count: usize,
        code: CodeRef,
        from_span: bool,
    ) -> CmdResult {
        self.doc.code.add_ref(code);
        let indefinite = rep == LeadParam::Pindef;
        let mut verify_always = [false; MAX_VERIFY + 1];
        trace!(len = self.doc.code.len(code), count, indefinite, "interpret");

        let mut result = CmdResult::Success;
        let mut round = 0;
        while indefinite || round < count {
            round += 1;
            match self.run_round(term, code, from_span, &mut verify_always) {
                CmdResult::Success => {}
                CmdResult::Failure(failure) if indefinite && !failure.is_fatal() => break,
                failure => {
                    result = failure;
                    break;
                }
            }
            if self.quit {
                break;
            }
        }

        self.doc.code.discard(code);
        if result.is_fatal() {
            debug!(?result, rounds = round, "interpretation stopped");
        }
        result
    }

    fn run_round(
        &mut self,
        term: &mut dyn Terminal,
        code: CodeRef,
        mut from_span: bool,
        verify_always: &mut [bool],
    ) -> CmdResult {
        let mut levels: Vec<Level> = Vec::new();
        let mut pc = 1;
        loop {
            if self.interrupt.swap(false, Ordering::SeqCst) {
                warn!("interrupted");
                return CmdResult::Failure(CmdFailure::Interrupted);
            }
            if pc > self.doc.code.len(code) {
                return CmdResult::Success;
            }
            let instr: Instruction = self.doc.code.instruction(code, pc).clone();
            pc += 1;

            let status = match instr.op {
                CmdOp::PcJump => {
                    pc = instr.label;
                    continue;
                }
                CmdOp::ExitTo => {
                    if levels.len() >= MAX_LEVEL {
                        return CmdResult::Failure(CmdFailure::ExecRecursion);
                    }
                    from_span = true;
                    levels.push(Level {
                        exit_label: instr.label,
                        ..Level::default()
                    });
                    continue;
                }
                CmdOp::FailTo => {
                    if let Some(level) = levels.last_mut() {
                        level.fail_label = instr.label;
                    }
                    continue;
                }
                CmdOp::Iterate => {
                    if let Some(level) = levels.last_mut() {
                        if level.iter_count == instr.cnt {
                            pc = level.exit_label;
                            levels.pop();
                        } else {
                            level.iter_count += 1;
                        }
                    }
                    continue;
                }
                CmdOp::ExitSuccess => {
                    match exit_levels(&mut levels, &instr, |level| level.exit_label) {
                        Some(label) => {
                            pc = label;
                            continue;
                        }
                        None => return CmdResult::Success,
                    }
                }
                CmdOp::ExitFail => {
                    match exit_levels(&mut levels, &instr, |level| level.fail_label) {
                        Some(label) if label != 0 => {
                            pc = label;
                            continue;
                        }
                        _ => return CmdResult::Failure(CmdFailure::OutOfRange),
                    }
                }
                CmdOp::ExitAbort => {
                    debug!("abort requested");
                    self.aborted = true;
                    return CmdResult::Failure(CmdFailure::Aborted);
                }
                CmdOp::Extended => match instr.code {
                    Some(child) => self.interpret(term, instr.rep, instr.cnt, child, true),
                    None => CmdResult::Failure(CmdFailure::SyntaxError),
                },
                CmdOp::Verify => self.verify(term, &instr, verify_always),
                CmdOp::Noop => {
                    warn!(pc, "noop executed");
                    CmdResult::Failure(CmdFailure::SyntaxError)
                }
                op => self.execute(term, op, instr.rep, &instr.tpars),
            };

            let CmdResult::Failure(failure) = status else {
                if self.quit {
                    return CmdResult::Success;
                }
                continue;
            };
            if failure.is_fatal() || self.aborted {
                return CmdResult::Failure(failure);
            }
            if !from_span {
                term.message(&failure.to_string());
            }
            trace!(pc, %failure, "command failed");
            pc = instr.label;
            while pc == 0 {
                match levels.pop() {
                    Some(level) => pc = level.fail_label,
                    None => return CmdResult::Failure(failure),
                }
            }
        }
    }

    fn verify(
        &mut self,
        term: &mut dyn Terminal,
        instr: &Instruction,
        verify_always: &mut [bool],
    ) -> CmdResult {
        let id = instr.cnt;
        if verify_always.get(id).copied().unwrap_or(false) {
            return CmdResult::Success;
        }
        let info = cmd_attrib::attrib(CmdOp::Verify).tpar_info[0];
        let text = match instr.tpars.first() {
            Some(tpar) => match self.tpar_get(term, tpar, &info) {
                Ok(resolved) => resolved.content,
                Err(failure) => return CmdResult::Failure(failure),
            },
            None => String::new(),
        };
        let prompt = if text.is_empty() { info.prompt.to_string() } else { text };
        let reply = match self.prompt(term, &prompt) {
            Ok(reply) => reply,
            Err(failure) => return CmdResult::Failure(failure),
        };
        match VerifyReply::parse(&reply) {
            VerifyReply::Yes => CmdResult::Success,
            VerifyReply::Always => {
                if let Some(flag) = verify_always.get_mut(id) {
                    *flag = true;
                }
                CmdResult::Success
            }
            VerifyReply::No => CmdResult::Failure(CmdFailure::NotFound),
            VerifyReply::Quit => {
                self.aborted = true;
                CmdResult::Failure(CmdFailure::Aborted)
            }
        }
    }
}

/// Leaves levels for `XS` or `XF`.  `XSn` and `XFn` leave `n` levels (all
/// of them for `>`), landing on the outermost when `n` is too large.
/// Returns the chosen label of the level left last, or `None` when no
/// level is active.
fn exit_levels(
    levels: &mut Vec<Level>,
    instr: &Instruction,
    label: impl Fn(&Level) -> usize,
) -> Option<usize> {
    let depth = levels.len();
    if depth == 0 {
        return None;
    }
    let n = match instr.rep {
        LeadParam::Pindef => depth,
        _ => instr.cnt.max(1),
    };
    let target = depth.saturating_sub(n);
    let chosen = label(&levels[target]);
    levels.truncate(target);
    Some(chosen)
}
