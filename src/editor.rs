use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{debug, warn};

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::compiler::{self, CompileError};
use crate::config::{EditorConfig, RunMode};
use crate::document::{Document, FrameId};
use crate::edit_mode::EditMode;
use crate::file::FileTable;
use crate::keybind::{DEFAULT_BINDINGS, KeyBinding, KeyTable};
use crate::lead_param::LeadParam;
use crate::terminal::Terminal;

/// The whole editing state: documents, open files, key bindings and the
/// interactive mode.
pub struct Editor {
    pub doc: Document,
    pub files: FileTable,
    pub keys: KeyTable,
    pub mode: EditMode,
    pub previous_mode: EditMode,
    pub config: EditorConfig,
    /// Set by Ctrl-C; cleared by whoever acts on it.
    pub(crate) interrupt: Arc<AtomicBool>,
    /// Rows of text on the screen, only in screen mode.
    pub(crate) window_height: Option<usize>,
    /// Set when interpretation was stopped by `XA`, a `Q` verify reply or a
    /// prompt that could not be answered.
    pub aborted: bool,
    pub quit: bool,
    pub(crate) exec_depth: usize,
}

impl Editor {
    pub fn new(config: EditorConfig, interrupt: Arc<AtomicBool>) -> Self {
        let mut editor = Editor {
            doc: Document::new(config.space_limit, config.margin_right),
            files: FileTable::new(),
            keys: KeyTable::new(),
            mode: EditMode::Insert,
            previous_mode: EditMode::Insert,
            config,
            interrupt,
            window_height: None,
            aborted: false,
            quit: false,
            exec_depth: 0,
        };
        editor.bind_defaults();
        editor
    }

    fn bind_defaults(&mut self) {
        for (key, text) in DEFAULT_BINDINGS {
            match compiler::compile_str(&mut self.doc.code, text) {
                Ok(code) => {
                    let binding = KeyBinding::from_code(&mut self.doc.code, code);
                    self.keys.bind(&mut self.doc.code, key, binding);
                }
                Err(err) => warn!(%key, error = %err, "default binding failed to compile"),
            }
        }
    }

    pub fn current_frame(&self) -> FrameId {
        self.doc.current_frame()
    }

    pub(crate) fn is_batch(&self) -> bool {
        self.config.run_mode == RunMode::Batch
    }

    /// Asks the user for a line of text.
    pub(crate) fn prompt(&mut self, term: &mut dyn Terminal, prompt: &str) -> Result<String, CmdFailure> {
        if self.is_batch() {
            warn!(prompt, "prompt in batch mode");
            self.aborted = true;
            return Err(CmdFailure::Aborted);
        }
        match term.get_input(prompt) {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(CmdFailure::Cancelled),
            Err(err) => {
                warn!(error = %err, "terminal input failed");
                self.aborted = true;
                Err(CmdFailure::Aborted)
            }
        }
    }

    /// Compiles `text` as a span and runs it once.
    pub fn execute_text(&mut self, term: &mut dyn Terminal, text: &str) -> CmdResult {
        let code = match compiler::compile_str(&mut self.doc.code, text) {
            Ok(code) => code,
            Err(err) => return CmdResult::Failure(self.compile_failed(term, err)),
        };
        let result = self.interpret(term, LeadParam::None, 1, code, true);
        self.doc.code.discard(code);
        result
    }

    /// Reports a compile error and turns it into the failure of the
    /// command that asked for the compile.
    pub(crate) fn compile_failed(&mut self, term: &mut dyn Terminal, err: CompileError) -> CmdFailure {
        let msg = err.to_string();
        term.message(&msg);
        match err {
            CompileError::Interrupted => CmdFailure::Interrupted,
            CompileError::Input(_) => {
                self.aborted = true;
                CmdFailure::Aborted
            }
            CompileError::Syntax { .. } => CmdFailure::Compile(msg),
        }
    }

    /// Closes every frame's files, reporting each close.  Output is written
    /// as `FC` would write it, unless the session was aborted.
    pub fn windup(&mut self, term: &mut dyn Terminal) {
        let frames: Vec<FrameId> = self.doc.frames.iter().map(|(id, _)| id).collect();
        for frame in frames {
            let closed = if self.aborted {
                self.abandon_frame_files(term, frame)
            } else {
                self.close_frame_files(term, frame).map(|_| ())
            };
            if let Err(err) = closed {
                warn!(frame = self.doc.frame_name(frame), error = %err, "closing files failed");
                term.message(&err.to_string());
            }
        }
        debug!(aborted = self.aborted, "windup complete");
    }
}

impl fmt::Display for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.doc.frame_text(self.doc.current_frame()))
    }
}
