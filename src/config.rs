//! Editor configuration, gathered from the command line and environment.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::limits::{DEFAULT_MARGIN_RIGHT, DEFAULT_SPACE_LIMIT};

/// Pause after each screen update, in milliseconds.
pub const REFRESH_DELAY_VAR: &str = "LUD_REFRESH_DELAY";
/// Startup command file used when none is named on the command line.
pub const INIT_FILE_VAR: &str = "LUDWIG_INIT";

/// How the editor talks to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Full screen, keys read one at a time.
    #[default]
    Screen,
    /// One command line at a time from standard input.
    Hardcopy,
    /// All of standard input run as one span; prompting is fatal.
    Batch,
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub run_mode: RunMode,
    /// File edited at start-up.
    pub file: Option<PathBuf>,
    /// Create `file` if it does not exist.
    pub create: bool,
    /// Open `file` for input only.
    pub read_only: bool,
    pub init_file: Option<PathBuf>,
    /// Commands run after the init file, before the first prompt.
    pub command_file: Option<PathBuf>,
    pub space_limit: usize,
    pub margin_right: usize,
    pub refresh_delay: Duration,
    /// Put a `!` line under the line of a span that fails to compile.
    pub inject_error_marker: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new(RunMode::default())
    }
}

impl EditorConfig {
    pub fn new(run_mode: RunMode) -> Self {
        Self {
            run_mode,
            file: None,
            create: false,
            read_only: false,
            init_file: None,
            command_file: None,
            space_limit: DEFAULT_SPACE_LIMIT,
            margin_right: DEFAULT_MARGIN_RIGHT,
            refresh_delay: Duration::ZERO,
            inject_error_marker: run_mode != RunMode::Screen,
        }
    }

    /// Fills in settings taken from the environment.  `var` looks up a
    /// variable; `no_init` suppresses the default init file.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>, no_init: bool) -> Self {
        if let Some(delay) = var(REFRESH_DELAY_VAR) {
            match delay.trim().parse::<u64>() {
                Ok(ms) => self.refresh_delay = Duration::from_millis(ms),
                Err(_) => warn!(value = %delay, "ignoring invalid {REFRESH_DELAY_VAR}"),
            }
        }
        if no_init {
            self.init_file = None;
        } else if self.init_file.is_none() {
            self.init_file = var(INIT_FILE_VAR).filter(|f| !f.is_empty()).map(PathBuf::from);
        }
        self
    }
}
