use thiserror::Error;

/// The result of executing a Ludwig command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdResult {
    Success,
    Failure(CmdFailure),
}

/// The reason a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmdFailure {
    /// Movement or deletion past frame boundaries.
    #[error("Out of range")]
    OutOfRange,
    /// A mark referenced by the command is not set.
    #[error("Mark not defined")]
    MarkNotDefined,
    /// The leading parameter is not valid for this command.
    #[error("Syntax error")]
    SyntaxError,
    /// A span or frame with the given name already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("No such span {0}")]
    NoSuchSpan(String),
    #[error("No such frame {0}")]
    NoSuchFrame(String),
    #[error("Frame {0} cannot be changed this way")]
    FrameInUse(String),
    #[error("Marks are in different frames")]
    DifferentFrames,
    /// Line or frame capacity exhausted.
    #[error("No room")]
    NoRoom,
    /// An input line is longer than a line can hold.  It stays unread.
    #[error("Line {0} of input is too long")]
    LineTooLong(usize),
    #[error("Not found")]
    NotFound,
    #[error("Invalid parameter: {0}")]
    BadParameter(String),
    #[error("Multi-line parameter not allowed")]
    MultiLine,
    #[error("Unknown enquiry item {0}")]
    UnknownEnquiry(String),
    #[error("Parameter substitution too deep")]
    TparRecursion,
    #[error("Span execution too deep")]
    ExecRecursion,
    #[error("{0}")]
    Compile(String),
    #[error("{0}")]
    File(String),
    #[error("Prompt cancelled")]
    Cancelled,
    #[error("Interrupted")]
    Interrupted,
    #[error("Aborted")]
    Aborted,
}

impl CmdFailure {
    /// Failures that stop interpretation outright instead of branching to
    /// a failure handler.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CmdFailure::Aborted | CmdFailure::Interrupted | CmdFailure::UnknownEnquiry(_)
        )
    }
}

impl CmdResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CmdResult::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, CmdResult::Failure(failure) if failure.is_fatal())
    }
}

impl From<Result<(), CmdFailure>> for CmdResult {
    fn from(result: Result<(), CmdFailure>) -> Self {
        match result {
            Ok(()) => CmdResult::Success,
            Err(failure) => CmdResult::Failure(failure),
        }
    }
}

impl From<bool> for CmdResult {
    fn from(ok: bool) -> Self {
        if ok {
            CmdResult::Success
        } else {
            CmdResult::Failure(CmdFailure::OutOfRange)
        }
    }
}
