//! The command engine of the Ludwig text editor.
//!
//! Text lives in a [`document::Document`] of frames, lines and marks.
//! Commands are compiled to bytecode and run by the interpreter on an
//! [`Editor`], which ties the document to open files, key bindings and a
//! [`Terminal`].
//!
//! # Example
//!
//! ```rust
//! use ludwig::{Editor, EditorConfig, LineTerminal, RunMode};
//!
//! let mut editor = Editor::new(EditorConfig::new(RunMode::Batch), Default::default());
//! let mut term = LineTerminal::new(std::io::empty(), Vec::new(), "doc");
//!
//! // Insert three copies, go back to the start of the line, mark it.
//! assert!(editor.execute_text(&mut term, "3i/ab/ <j i/>/").is_success());
//! assert_eq!(editor.to_string(), ">ababab");
//!
//! // A failing command stops the rest of the line.
//! assert!(editor.execute_text(&mut term, "2a i/never/").is_failure());
//! assert_eq!(editor.to_string(), ">ababab");
//! ```

mod app;
mod arena;
mod cmd_attrib;
mod cmd_result;
pub mod code;
pub mod compiler;
mod config;
pub mod document;
mod edit_mode;
mod editor;
mod execute;
mod file;
mod frame;
mod interpreter;
mod keybind;
mod lead_param;
mod limits;
mod line;
mod marks;
mod pager;
mod position;
mod screen;
mod span;
mod strings;
mod terminal;
mod text;
mod tpar;
mod trail_param;

pub use app::App;
pub use cmd_result::{CmdFailure, CmdResult};
pub use compiler::{CompileError, compile, compile_str};
pub use config::{EditorConfig, RunMode};
pub use edit_mode::EditMode;
pub use editor::Editor;
pub use frame::{
    CaseMode, EditCommands, MotionCommands, PredicateCommands, SearchCommands, SpanCommands,
};
pub use keybind::{KeyBinding, KeyTable};
pub use lead_param::LeadParam;
pub use marks::MarkId;
pub use position::Position;
pub use terminal::{CrosstermTerminal, Key, LineTerminal, TermSize, Terminal};
pub use trail_param::TrailParam;
