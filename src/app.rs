//! The top-level driver.
//!
//! `App` owns the editor and runs it in one of three ways: a full-screen
//! key loop, a hardcopy loop reading one command line at a time, or a
//! batch run of all of standard input as one span.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cmd_result::{CmdFailure, CmdResult};
use crate::code::CmdOp;
use crate::compiler::{self, TerminalSource};
use crate::config::EditorConfig;
use crate::edit_mode::EditMode;
use crate::editor::Editor;
use crate::frame::EditCommands;
use crate::keybind::KeyBinding;
use crate::lead_param::LeadParam;
use crate::position::Position;
use crate::screen::Screen;
use crate::terminal::{Key, Terminal};
use crate::trail_param::{TPD_LIT, TrailParam};

const COMMAND_PROMPT: &str = "Command: ";
const HARDCOPY_PROMPT: &str = "COMMAND: ";

/// The running editor.
pub struct App {
    pub editor: Editor,
}

impl App {
    pub fn new(config: EditorConfig, interrupt: Arc<AtomicBool>) -> Self {
        Self {
            editor: Editor::new(config, interrupt),
        }
    }

    /// Opens the file named on the command line, then runs the init file
    /// and the command file.
    pub fn startup(&mut self, term: &mut dyn Terminal) -> Result<()> {
        let config = self.editor.config.clone();
        if let Some(file) = &config.file {
            let op = match (file.exists(), config.read_only, config.create) {
                (true, true, _) => CmdOp::FileInput,
                (true, false, _) => CmdOp::FileEdit,
                (false, _, true) => CmdOp::FileOutput,
                (false, _, false) => bail!("{}: file does not exist", file.display()),
            };
            let path = TrailParam::new(TPD_LIT, file.display().to_string());
            if let CmdResult::Failure(failure) = self.editor.execute(term, op, LeadParam::None, &[path]) {
                bail!("{}: {failure}", file.display());
            }
        }
        for script in [&config.init_file, &config.command_file].into_iter().flatten() {
            self.run_script(term, script)?;
        }
        Ok(())
    }

    fn run_script(&mut self, term: &mut dyn Terminal, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        info!(path = %path.display(), "running command file");
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if let CmdResult::Failure(failure) = self.editor.execute_command_frame(term, &lines) {
            warn!(path = %path.display(), %failure, "command file failed");
            term.message(&format!("{}: {failure}", path.display()));
        }
        Ok(())
    }

    /// Runs the full-screen key loop until `Q` or an abort.
    pub fn run_screen(&mut self, term: &mut dyn Terminal) -> Result<()> {
        term.init()?;
        let result = self.screen_loop(term);
        term.cleanup()?;
        result
    }

    fn screen_loop(&mut self, term: &mut dyn Terminal) -> Result<()> {
        let mut screen = Screen::new(term.size());
        self.editor.window_height = Some(screen.text_height());
        term.clear_screen();
        while !self.editor.quit && !self.editor.aborted {
            screen.update(&mut self.editor.doc, term);
            let key = term.read_key()?;
            if key == Key::Resize {
                screen.resize(term.size());
                self.editor.window_height = Some(screen.text_height());
                term.clear_screen();
                continue;
            }
            self.handle_key(term, key);
        }
        Ok(())
    }

    /// Acts on one key typed in screen mode.
    pub fn handle_key(&mut self, term: &mut dyn Terminal, key: Key) {
        let introducer = self.editor.keys.introducer();
        let result = if key == introducer || self.editor.mode == EditMode::Command {
            if key != introducer {
                term.take_back_key(key);
            }
            self.command(term)
        } else if let Some(ch) = key.printable() {
            self.type_char(ch)
        } else if let Some(binding) = self.editor.keys.get(key).cloned() {
            self.run_binding(term, binding)
        } else {
            debug!(%key, "unbound key");
            CmdResult::Failure(CmdFailure::NotFound)
        };
        if result.is_failure() {
            term.beep();
        }
    }

    /// Compiles a command typed at the terminal and runs it.
    fn command(&mut self, term: &mut dyn Terminal) -> CmdResult {
        let row = term.size().height.saturating_sub(1);
        term.move_cursor(0, row);
        term.write_str(COMMAND_PROMPT);
        term.clear_eol();
        term.flush();

        let editor = &mut self.editor;
        let compiled = {
            let mut source = TerminalSource::new(term, editor.keys.introducer(), &editor.interrupt);
            compiler::compile(&mut editor.doc.code, &mut source, Some(&editor.keys))
        };
        let code = match compiled {
            Ok(code) => code,
            Err(err) => return CmdResult::Failure(self.editor.compile_failed(term, err)),
        };
        let result = self.editor.interpret(term, LeadParam::None, 1, code, false);
        self.editor.doc.code.discard(code);
        result
    }

    /// Inserts or overtypes a typed character, wrapping at the right margin
    /// when the frame asks for it.
    fn type_char(&mut self, ch: char) -> CmdResult {
        let text = TrailParam::new(TPD_LIT, ch.to_string());
        let doc = &mut self.editor.doc;
        let result = match self.editor.mode {
            EditMode::Overtype => doc.cmd_overtype_text(LeadParam::None, &text),
            _ => doc.cmd_insert_text(LeadParam::None, &text),
        };
        if result.is_success() && ch != ' ' {
            self.wrap();
        }
        result
    }

    fn wrap(&mut self) {
        let doc = &mut self.editor.doc;
        let frame = doc.current_frame();
        let f = doc.frame(frame);
        let dot = doc.dot(frame);
        if !f.options.auto_wrap || dot.col <= f.margin_right + 1 {
            return;
        }
        let chars = doc.line(dot.line).chars();
        let end = (dot.col - 1).min(chars.len());
        let Some(blank) = chars[..end].iter().rposition(|&c| c == ' ') else {
            return;
        };
        if let Err(failure) = doc.text_split_line(Position::new(dot.line, blank + 2)) {
            debug!(%failure, "wrap failed");
        }
    }

    fn run_binding(&mut self, term: &mut dyn Terminal, binding: KeyBinding) -> CmdResult {
        if let Some(code) = binding.code {
            return self.editor.interpret(term, LeadParam::None, 1, code, false);
        }
        let result = self.editor.execute(term, binding.op, LeadParam::None, &binding.tpars);
        if let CmdResult::Failure(failure) = &result
            && !matches!(failure, CmdFailure::Compile(_))
        {
            term.message(&failure.to_string());
        }
        result
    }

    /// Reads and runs one command line at a time until end of input.
    pub fn run_hardcopy(&mut self, term: &mut dyn Terminal) -> Result<()> {
        while !self.editor.quit && !self.editor.aborted {
            let Some(line) = term.get_input(HARDCOPY_PROMPT)? else {
                break;
            };
            let result = self.editor.execute_command_frame(term, &[line]);
            if let CmdResult::Failure(failure) = result {
                if !matches!(failure, CmdFailure::Compile(_)) {
                    term.message(&failure.to_string());
                }
                term.beep();
            }
        }
        Ok(())
    }

    /// Runs `script` as one span.
    pub fn run_batch(&mut self, term: &mut dyn Terminal, script: &str) -> CmdResult {
        let lines: Vec<String> = script.lines().map(str::to_string).collect();
        let result = self.editor.execute_command_frame(term, &lines);
        if result.is_failure() {
            term.beep();
            term.message("COMMAND FAILED");
            self.editor.aborted = true;
        }
        result
    }

    /// Closes all files.  Returns true when the session ended normally.
    pub fn windup(&mut self, term: &mut dyn Terminal) -> bool {
        self.editor.windup(term);
        !self.editor.aborted
    }
}
