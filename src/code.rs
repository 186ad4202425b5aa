//! Compiled command code.
//!
//! All compiled code shares one contiguous instruction store.  A code header
//! names the range `base..base + len` it owns and counts its references;
//! when the count reaches zero the range is removed and every higher range
//! slides down, so the store never has holes.  Labels inside an instruction
//! are 1-based offsets into its own code, which keeps them valid when the
//! code moves.

use tracing::trace;

use crate::arena::{Arena, Id};
use crate::lead_param::LeadParam;
use crate::trail_param::TrailParam;

pub type CodeRef = Id<CodeHeader>;

#[derive(Debug)]
pub struct CodeHeader {
    base: usize,
    len: usize,
    refs: usize,
}

/// A single compiled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub rep: LeadParam,
    /// Repeat count, exit depth, or verify id depending on `op`.
    pub cnt: usize,
    pub op: CmdOp,
    pub tpars: Vec<TrailParam>,
    /// Branch target within the same code, 0 for none.
    pub label: usize,
    /// Child code run by [`CmdOp::Extended`].
    pub code: Option<CodeRef>,
}

impl Instruction {
    pub fn new(op: CmdOp, rep: LeadParam) -> Self {
        Self {
            rep,
            cnt: 0,
            op,
            tpars: Vec::new(),
            label: 0,
            code: None,
        }
    }

    pub fn jump(op: CmdOp, label: usize) -> Self {
        Self {
            label,
            ..Self::new(op, LeadParam::None)
        }
    }
}

/// Opcode identifying a primitive command or an interpreter intrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdOp {
    Noop,

    // Intrinsics emitted by the compiler
    PcJump,
    ExitTo,
    FailTo,
    Iterate,
    ExitSuccess,
    ExitFail,
    ExitAbort,
    Extended,
    Verify,

    // Cursor movement
    Up,
    Down,
    Left,
    Right,
    Home,
    Return,
    Rubout,
    Advance,
    Jump,

    // Window control
    WindowForward,
    WindowBackward,
    WindowTop,
    WindowEnd,
    WindowMiddle,
    WindowNew,

    // Search and comparison
    Get,
    Next,
    Replace,
    EqualString,
    EqualColumn,
    EqualMark,
    EqualEol,
    EqualEop,
    EqualEof,

    // Text insertion and deletion
    InsertText,
    OvertypeText,
    InsertChar,
    InsertLine,
    DeleteChar,
    DeleteLine,
    SplitLine,
    SwapLine,
    CaseUp,
    CaseLow,
    CaseEdit,
    Mark,

    // Spans
    SpanDefine,
    SpanCopy,
    SpanTransfer,
    SpanJump,
    SpanAssign,
    SpanIndex,
    SpanCompile,
    SpanKill,

    // Frames
    FrameEdit,
    FrameReturn,
    FrameKill,
    SpanExecute,
    SpanExecuteNoRecompile,

    // Files
    FileInput,
    FileOutput,
    FileEdit,
    FileClose,
    FileKill,
    Page,

    // User interface
    UserKey,
    UserMode,
    UserCommandIntroducer,
    Quit,
}

impl CmdOp {
    /// True for opcodes handled by the interpreter rather than dispatched.
    pub fn is_intrinsic(self) -> bool {
        matches!(
            self,
            CmdOp::Noop
                | CmdOp::PcJump
                | CmdOp::ExitTo
                | CmdOp::FailTo
                | CmdOp::Iterate
                | CmdOp::ExitSuccess
                | CmdOp::ExitFail
                | CmdOp::ExitAbort
                | CmdOp::Extended
                | CmdOp::Verify
        )
    }
}

/// The shared instruction store.
#[derive(Debug, Default)]
pub struct CodeArena {
    instrs: Vec<Instruction>,
    headers: Arena<CodeHeader>,
}

impl CodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `instrs` as a new code with one reference.
    pub fn new_code(&mut self, instrs: Vec<Instruction>) -> CodeRef {
        let base = self.instrs.len();
        let len = instrs.len();
        self.instrs.extend(instrs);
        self.headers.alloc(CodeHeader { base, len, refs: 1 })
    }

    pub fn add_ref(&mut self, code: CodeRef) {
        self.headers[code].refs += 1;
    }

    /// Drops one reference.  At zero the code's range is removed from the
    /// store, and child code referenced by its instructions is discarded
    /// in turn.
    pub fn discard(&mut self, code: CodeRef) {
        let Some(header) = self.headers.get_mut(code) else {
            return;
        };
        header.refs -= 1;
        if header.refs > 0 {
            return;
        }
        let (base, len) = (header.base, header.len);
        self.headers.free(code);
        let removed: Vec<Instruction> = self.instrs.drain(base..base + len).collect();
        for (_, other) in self.headers.iter_mut() {
            if other.base > base {
                other.base -= len;
            }
        }
        trace!(base, len, "code discarded");
        for child in removed.into_iter().filter_map(|i| i.code) {
            self.discard(child);
        }
    }

    pub fn len(&self, code: CodeRef) -> usize {
        self.headers[code].len
    }

    pub fn refs(&self, code: CodeRef) -> usize {
        self.headers[code].refs
    }

    /// The instruction at 1-based `pc`.
    pub fn instruction(&self, code: CodeRef, pc: usize) -> &Instruction {
        &self.instrs[self.headers[code].base + pc - 1]
    }

    pub fn instructions(&self, code: CodeRef) -> &[Instruction] {
        let header = &self.headers[code];
        &self.instrs[header.base..header.base + header.len]
    }

    pub fn live_codes(&self) -> usize {
        self.headers.len()
    }

    pub fn stored_instructions(&self) -> usize {
        self.instrs.len()
    }

    /// Checks that the live headers tile the store exactly.
    pub fn is_compact(&self) -> bool {
        let mut ranges: Vec<(usize, usize)> =
            self.headers.iter().map(|(_, h)| (h.base, h.len)).collect();
        ranges.sort_unstable();
        let mut next = 0;
        for (base, len) in ranges {
            if base != next {
                return false;
            }
            next += len;
        }
        next == self.instrs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(arena: &mut CodeArena, ops: &[CmdOp]) -> CodeRef {
        let instrs = ops
            .iter()
            .map(|&op| Instruction::new(op, LeadParam::None))
            .collect();
        arena.new_code(instrs)
    }

    #[test]
    fn test_discard_compacts() {
        let mut arena = CodeArena::new();
        let a = code_of(&mut arena, &[CmdOp::Advance, CmdOp::Jump]);
        let b = code_of(&mut arena, &[CmdOp::InsertText]);
        let c = code_of(&mut arena, &[CmdOp::DeleteChar, CmdOp::Get, CmdOp::Mark]);
        arena.discard(b);
        assert!(arena.is_compact());
        assert_eq!(arena.stored_instructions(), 5);
        assert_eq!(arena.instruction(c, 1).op, CmdOp::DeleteChar);
        assert_eq!(arena.instruction(c, 3).op, CmdOp::Mark);
        assert_eq!(arena.instruction(a, 2).op, CmdOp::Jump);
    }

    #[test]
    fn test_references_keep_code_alive() {
        let mut arena = CodeArena::new();
        let a = code_of(&mut arena, &[CmdOp::Advance]);
        arena.add_ref(a);
        arena.discard(a);
        assert_eq!(arena.live_codes(), 1);
        assert_eq!(arena.refs(a), 1);
        arena.discard(a);
        assert_eq!(arena.live_codes(), 0);
        assert_eq!(arena.stored_instructions(), 0);
    }

    #[test]
    fn test_discard_releases_child_code() {
        let mut arena = CodeArena::new();
        let child = code_of(&mut arena, &[CmdOp::InsertText]);
        let mut call = Instruction::new(CmdOp::Extended, LeadParam::None);
        call.code = Some(child);
        let parent = arena.new_code(vec![call]);
        arena.discard(parent);
        assert_eq!(arena.live_codes(), 0);
        assert!(arena.is_compact());
    }

    #[test]
    fn test_store_matches_live_headers_after_churn() {
        let mut arena = CodeArena::new();
        let mut live = Vec::new();
        for round in 0..30usize {
            let ops = vec![CmdOp::Advance; round % 4 + 1];
            live.push(code_of(&mut arena, &ops));
            if round % 3 == 0 {
                let victim = live.remove(round % live.len());
                arena.discard(victim);
            }
            assert!(arena.is_compact());
        }
        let total: usize = live.iter().map(|&c| arena.len(c)).sum();
        assert_eq!(arena.stored_instructions(), total);
    }
}
