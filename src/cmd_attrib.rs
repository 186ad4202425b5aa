//! Static command attributes.
//!
//! Every command name maps to an opcode, and every opcode carries the
//! leading parameter shapes it accepts and the trailing parameters it takes.

use phf::{Map, phf_map};

use crate::code::CmdOp;
use crate::lead_param::LP_ALL;
use crate::lead_param_mask;

/// How one trailing parameter slot is prompted for and post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TparInfo {
    /// Prompt shown when the parameter is asked for interactively.
    pub prompt: &'static str,
    /// Strip blanks and uppercase the text after substitution.
    pub trim_reply: bool,
    /// A multi-line value is acceptable in this slot.
    pub ml_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdAttrib {
    pub lp_allowed: u8,
    /// Number of trailing parameters.  Negative means "only when the leading
    /// parameter is positive".
    pub tp_count: i8,
    pub tpar_info: [TparInfo; 2],
}

impl CmdAttrib {
    /// Trailing parameters to scan for the given leading parameter.
    pub fn tpars_for(&self, positive_lead: bool) -> usize {
        match self.tp_count {
            n if n >= 0 => n as usize,
            _ if positive_lead => self.tp_count.unsigned_abs() as usize,
            _ => 0,
        }
    }
}

const NONE: TparInfo = TparInfo {
    prompt: "",
    trim_reply: false,
    ml_allowed: false,
};

const fn text(prompt: &'static str) -> TparInfo {
    TparInfo {
        prompt,
        trim_reply: false,
        ml_allowed: false,
    }
}

const fn multi(prompt: &'static str) -> TparInfo {
    TparInfo {
        prompt,
        trim_reply: false,
        ml_allowed: true,
    }
}

const fn name(prompt: &'static str) -> TparInfo {
    TparInfo {
        prompt,
        trim_reply: true,
        ml_allowed: false,
    }
}

const fn make_attrib(lp_allowed: u8, tp_count: i8, tpar_info: [TparInfo; 2]) -> CmdAttrib {
    CmdAttrib {
        lp_allowed,
        tp_count,
        tpar_info,
    }
}

const LP_NONE: u8 = lead_param_mask!(None);
const LP_COUNT: u8 = lead_param_mask!(None, Plus, Pint);
const LP_COUNT_INDEF: u8 = lead_param_mask!(None, Plus, Pint, Pindef);
const LP_SIGNED: u8 = lead_param_mask!(None, Plus, Minus, Pint, Nint);
const LP_SIGNED_INDEF: u8 = lead_param_mask!(None, Plus, Minus, Pint, Nint, Pindef, Nindef);
const LP_PREDICATE: u8 = lead_param_mask!(None, Plus, Minus, Pindef, Nindef);
const LP_SIGN: u8 = lead_param_mask!(None, Plus, Minus);

/// Map of command names to opcodes.  Names are lowercase here and matched
/// case-insensitively.  Please keep names sorted alphabetically.
static NAME_TO_OP_MAP: Map<&'static str, CmdOp> = phf_map! {
    "*e" => CmdOp::CaseEdit,
    "*l" => CmdOp::CaseLow,
    "*u" => CmdOp::CaseUp,
    "a" => CmdOp::Advance,
    "c" => CmdOp::InsertChar,
    "d" => CmdOp::DeleteChar,
    "ed" => CmdOp::FrameEdit,
    "ek" => CmdOp::FrameKill,
    "en" => CmdOp::SpanExecuteNoRecompile,
    "eof" => CmdOp::EqualEof,
    "eol" => CmdOp::EqualEol,
    "eop" => CmdOp::EqualEop,
    "eqc" => CmdOp::EqualColumn,
    "eqm" => CmdOp::EqualMark,
    "eqs" => CmdOp::EqualString,
    "er" => CmdOp::FrameReturn,
    "ex" => CmdOp::SpanExecute,
    "fc" => CmdOp::FileClose,
    "fe" => CmdOp::FileEdit,
    "fi" => CmdOp::FileInput,
    "fk" => CmdOp::FileKill,
    "fo" => CmdOp::FileOutput,
    "fp" => CmdOp::Page,
    "g" => CmdOp::Get,
    "i" => CmdOp::InsertText,
    "j" => CmdOp::Jump,
    "k" => CmdOp::DeleteLine,
    "l" => CmdOp::InsertLine,
    "m" => CmdOp::Mark,
    "n" => CmdOp::Next,
    "o" => CmdOp::OvertypeText,
    "p" => CmdOp::Page,
    "q" => CmdOp::Quit,
    "r" => CmdOp::Replace,
    "sa" => CmdOp::SpanAssign,
    "sc" => CmdOp::SpanCopy,
    "sd" => CmdOp::SpanDefine,
    "si" => CmdOp::SpanIndex,
    "sj" => CmdOp::SpanJump,
    "sk" => CmdOp::SpanKill,
    "sl" => CmdOp::SplitLine,
    "sr" => CmdOp::SpanCompile,
    "st" => CmdOp::SpanTransfer,
    "sw" => CmdOp::SwapLine,
    "uc" => CmdOp::UserCommandIntroducer,
    "uk" => CmdOp::UserKey,
    "um" => CmdOp::UserMode,
    "v" => CmdOp::Verify,
    "wb" => CmdOp::WindowBackward,
    "we" => CmdOp::WindowEnd,
    "wf" => CmdOp::WindowForward,
    "wm" => CmdOp::WindowMiddle,
    "wn" => CmdOp::WindowNew,
    "wt" => CmdOp::WindowTop,
    "xa" => CmdOp::ExitAbort,
    "xf" => CmdOp::ExitFail,
    "xs" => CmdOp::ExitSuccess,
    "zc" => CmdOp::Return,
    "zd" => CmdOp::Down,
    "zh" => CmdOp::Home,
    "zl" => CmdOp::Left,
    "zr" => CmdOp::Right,
    "zu" => CmdOp::Up,
    "zz" => CmdOp::Rubout,
};

/// Letters that begin a longer command name rather than naming a command.
pub const PREFIXES: [&str; 10] = ["*", "e", "eo", "eq", "f", "s", "u", "w", "x", "z"];

/// Looks up a (lowercase) command name.
pub fn lookup(name: &str) -> Option<CmdOp> {
    NAME_TO_OP_MAP.get(name).copied()
}

pub fn is_prefix(name: &str) -> bool {
    PREFIXES.contains(&name)
}

/// The attributes of `op`.
pub fn attrib(op: CmdOp) -> CmdAttrib {
    match op {
        CmdOp::Noop | CmdOp::PcJump | CmdOp::ExitTo | CmdOp::FailTo | CmdOp::Iterate => {
            make_attrib(LP_NONE, 0, [NONE, NONE])
        }
        CmdOp::ExitSuccess | CmdOp::ExitFail => make_attrib(LP_COUNT_INDEF, 0, [NONE, NONE]),
        CmdOp::ExitAbort => make_attrib(LP_NONE, 0, [NONE, NONE]),
        CmdOp::Extended => make_attrib(LP_ALL, 0, [NONE, NONE]),
        CmdOp::Verify => make_attrib(LP_NONE, 1, [text("Verify ? "), NONE]),

        CmdOp::Up | CmdOp::Down | CmdOp::Left | CmdOp::Right => {
            make_attrib(LP_COUNT_INDEF, 0, [NONE, NONE])
        }
        CmdOp::Home => make_attrib(LP_NONE, 0, [NONE, NONE]),
        CmdOp::Return | CmdOp::Rubout => make_attrib(LP_COUNT, 0, [NONE, NONE]),
        CmdOp::Advance | CmdOp::Jump => make_attrib(LP_ALL, 0, [NONE, NONE]),

        CmdOp::WindowForward | CmdOp::WindowBackward => make_attrib(LP_COUNT, 0, [NONE, NONE]),
        CmdOp::WindowTop | CmdOp::WindowEnd | CmdOp::WindowMiddle | CmdOp::WindowNew => {
            make_attrib(LP_NONE, 0, [NONE, NONE])
        }

        CmdOp::Get => make_attrib(LP_SIGNED, 1, [text("Get     : "), NONE]),
        CmdOp::Next => make_attrib(LP_SIGNED, 1, [text("Next    : "), NONE]),
        CmdOp::Replace => make_attrib(
            LP_SIGNED_INDEF,
            2,
            [text("Replace : "), text("By      : ")],
        ),
        CmdOp::EqualString => make_attrib(LP_PREDICATE, 1, [text("Compare : "), NONE]),
        CmdOp::EqualColumn => make_attrib(LP_PREDICATE, 1, [name("Column  : "), NONE]),
        CmdOp::EqualMark => make_attrib(LP_PREDICATE, 1, [name("Mark    : "), NONE]),
        CmdOp::EqualEol => make_attrib(LP_PREDICATE, 0, [NONE, NONE]),
        CmdOp::EqualEop | CmdOp::EqualEof => make_attrib(LP_SIGN, 0, [NONE, NONE]),

        CmdOp::InsertText => make_attrib(LP_COUNT, 1, [multi("Text    : "), NONE]),
        CmdOp::OvertypeText => make_attrib(LP_COUNT, 1, [text("Text    : "), NONE]),
        CmdOp::InsertChar | CmdOp::InsertLine | CmdOp::Mark => make_attrib(LP_SIGNED, 0, [NONE, NONE]),
        CmdOp::DeleteChar | CmdOp::DeleteLine => make_attrib(LP_ALL, 0, [NONE, NONE]),
        CmdOp::SplitLine => make_attrib(LP_NONE, 0, [NONE, NONE]),
        CmdOp::SwapLine => make_attrib(LP_SIGNED_INDEF, 0, [NONE, NONE]),
        CmdOp::CaseUp | CmdOp::CaseLow | CmdOp::CaseEdit => {
            make_attrib(LP_SIGNED_INDEF, 0, [NONE, NONE])
        }

        CmdOp::SpanDefine => make_attrib(
            lead_param_mask!(None, Plus, Pint, Marker),
            1,
            [name("Span    : "), NONE],
        ),
        CmdOp::SpanCopy => make_attrib(LP_COUNT, 1, [name("Span    : "), NONE]),
        CmdOp::SpanTransfer | CmdOp::SpanCompile => make_attrib(LP_NONE, 1, [name("Span    : "), NONE]),
        CmdOp::SpanJump => make_attrib(LP_SIGN, 1, [name("Span    : "), NONE]),
        CmdOp::SpanAssign => make_attrib(
            LP_COUNT,
            2,
            [name("Span    : "), multi("Text    : ")],
        ),
        CmdOp::SpanIndex => make_attrib(LP_NONE, 0, [NONE, NONE]),
        CmdOp::SpanKill => make_attrib(LP_SIGN, -1, [name("Span    : "), NONE]),

        CmdOp::FrameEdit | CmdOp::FrameKill => make_attrib(LP_NONE, 1, [name("Frame   : "), NONE]),
        CmdOp::FrameReturn => make_attrib(LP_COUNT, 0, [NONE, NONE]),
        CmdOp::SpanExecute | CmdOp::SpanExecuteNoRecompile => {
            make_attrib(LP_COUNT_INDEF, 1, [name("Span    : "), NONE])
        }

        CmdOp::FileInput | CmdOp::FileOutput | CmdOp::FileEdit => {
            make_attrib(LP_NONE, 1, [text("File    : "), NONE])
        }
        CmdOp::FileClose | CmdOp::FileKill | CmdOp::Page | CmdOp::Quit => {
            make_attrib(LP_NONE, 0, [NONE, NONE])
        }

        CmdOp::UserKey => make_attrib(LP_NONE, 2, [text("Key     : "), multi("Command : ")]),
        CmdOp::UserMode => make_attrib(LP_NONE, 1, [name("Mode    : "), NONE]),
        CmdOp::UserCommandIntroducer => make_attrib(LP_NONE, 1, [text("Key     : "), NONE]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead_param::LeadParam;

    #[test]
    fn test_every_name_has_attributes() {
        for (name, op) in NAME_TO_OP_MAP.entries() {
            let attrib = attrib(*op);
            assert!(
                LeadParam::None.allowed_by(attrib.lp_allowed) || op.is_intrinsic(),
                "{name} rejects an empty leading parameter"
            );
        }
    }

    #[test]
    fn test_prefixes_never_name_commands() {
        for prefix in PREFIXES {
            assert!(lookup(prefix).is_none(), "{prefix} is both prefix and command");
            assert!(
                NAME_TO_OP_MAP.keys().any(|name| name.starts_with(prefix)),
                "{prefix} starts no command"
            );
        }
    }

    #[test]
    fn test_names_extend_prefixes() {
        for name in NAME_TO_OP_MAP.keys() {
            let mut end = name.len() - 1;
            while end > 0 {
                assert!(is_prefix(&name[..end]), "{} is not a prefix", &name[..end]);
                end -= 1;
            }
        }
    }

    #[test]
    fn test_negative_tpar_count() {
        let sk = attrib(CmdOp::SpanKill);
        assert_eq!(sk.tpars_for(true), 1);
        assert_eq!(sk.tpars_for(false), 0);
        assert_eq!(attrib(CmdOp::Replace).tpars_for(false), 2);
    }
}
