//! Terminal abstraction layer.
//!
//! Provides a `Terminal` trait for keyboard input and screen output, and
//! three implementations:
//! - `CrosstermTerminal` for real terminal interaction
//! - `LineTerminal` for hardcopy and batch use over any reader and writer
//! - `MockTerminal` for testing

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

/// A keystroke.  Control characters arrive as `Char` with their control
/// code, so `CONTROL-A` is `Char('\x01')`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    Enter,
    Tab,
    Escape,
    F(u8),
    /// The terminal changed size.
    Resize,
}

const NAMED_KEYS: [(&str, Key); 14] = [
    ("UP-ARROW", Key::Up),
    ("DOWN-ARROW", Key::Down),
    ("LEFT-ARROW", Key::Left),
    ("RIGHT-ARROW", Key::Right),
    ("HOME", Key::Home),
    ("END", Key::End),
    ("PAGE-UP", Key::PageUp),
    ("PAGE-DOWN", Key::PageDown),
    ("INSERT", Key::Insert),
    ("DELETE", Key::Delete),
    ("BACKSPACE", Key::Backspace),
    ("RETURN", Key::Enter),
    ("TAB", Key::Tab),
    ("ESCAPE", Key::Escape),
];

const MAX_FUNCTION_KEY: u8 = 24;

impl Key {
    /// Resolves a key name.  A single character names itself; otherwise the
    /// name is one of the symbolic key names, `F1` to `F24`, or
    /// `CONTROL-A` to `CONTROL-Z`.  Matching ignores case.
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(ch));
        }
        let upper = name.trim().to_uppercase();
        if let Some((_, key)) = NAMED_KEYS.iter().find(|(n, _)| *n == upper) {
            return Some(*key);
        }
        if let Some(rest) = upper.strip_prefix("CONTROL-") {
            let mut letters = rest.chars();
            return match (letters.next(), letters.next()) {
                (Some(ch @ 'A'..='Z'), None) => Some(Key::Char(control(ch))),
                _ => None,
            };
        }
        upper
            .strip_prefix('F')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=MAX_FUNCTION_KEY).contains(n))
            .map(Key::F)
    }

    /// A printable character that can be inserted as text.
    pub fn printable(self) -> Option<char> {
        match self {
            Key::Char(ch) if !ch.is_control() => Some(ch),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = NAMED_KEYS.iter().find(|(_, k)| k == self) {
            return f.write_str(name);
        }
        match self {
            Key::Char(ch) if (*ch as u32) < 0x20 => {
                write!(f, "CONTROL-{}", char::from(*ch as u8 + b'@'))
            }
            Key::Char(ch) => write!(f, "{ch}"),
            Key::F(n) => write!(f, "F{n}"),
            _ => f.write_str("RESIZE"),
        }
    }
}

fn control(letter: char) -> char {
    char::from(letter as u8 & 0x1f)
}

/// Abstraction over terminal operations.
pub trait Terminal {
    /// Enter raw mode and prepare the terminal.
    fn init(&mut self) -> Result<()>;

    /// Restore the terminal to its original state.
    fn cleanup(&mut self) -> Result<()>;

    /// Get the current terminal dimensions.
    fn size(&self) -> TermSize;

    /// Move the cursor to (col, row), both 0-based.
    fn move_cursor(&mut self, col: u16, row: u16);

    /// Write a string at the current cursor position.
    fn write_str(&mut self, s: &str);

    /// Clear from cursor to end of line.
    fn clear_eol(&mut self);

    /// Clear the entire screen.
    fn clear_screen(&mut self);

    /// Sound the terminal bell.
    fn beep(&mut self);

    /// Flush output to the terminal.
    fn flush(&mut self);

    /// Block until a key is received.
    fn read_key(&mut self) -> Result<Key>;

    /// Push a key back so the next `read_key` returns it.
    fn take_back_key(&mut self, key: Key);

    /// Ask for a line of text.  `None` means the input was cancelled or
    /// has ended.
    fn get_input(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Report an informational message.
    fn message(&mut self, text: &str);

    /// Terminal type, as reported by `$TERMINAL-NAME`.
    fn name(&self) -> &str;

    /// Line speed, as reported by `$TERMINAL-SPEED`; 0 when unknown.
    fn speed(&self) -> u32 {
        0
    }
}

/// Real terminal using crossterm.
pub struct CrosstermTerminal {
    size: TermSize,
    cursor_visible: bool,
    pending: VecDeque<Key>,
    interrupt: Arc<AtomicBool>,
    refresh_delay: Duration,
    dirty: bool,
}

impl CrosstermTerminal {
    pub fn new(interrupt: Arc<AtomicBool>) -> Self {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        Self {
            size: TermSize {
                width: w,
                height: h,
            },
            cursor_visible: true,
            pending: VecDeque::new(),
            interrupt,
            refresh_delay: Duration::ZERO,
            dirty: false,
        }
    }

    /// Pause for `delay` after each flush that wrote something.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    fn cursor(&mut self, show: bool) {
        if show && !self.cursor_visible {
            crossterm::execute!(std::io::stdout(), crossterm::cursor::Show).ok();
            self.cursor_visible = true;
        } else if !show && self.cursor_visible {
            crossterm::execute!(std::io::stdout(), crossterm::cursor::Hide).ok();
            self.cursor_visible = false;
        }
    }

    fn translate(&self, key: KeyEvent) -> Option<Key> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && let KeyCode::Char(ch) = key.code
            && ch.is_ascii_alphabetic()
        {
            let code = control(ch.to_ascii_uppercase());
            if code == '\x03' {
                self.interrupt.store(true, Ordering::SeqCst);
            }
            return Some(Key::Char(code));
        }
        Some(match key.code {
            KeyCode::Char(ch) => Key::Char(ch),
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Insert => Key::Insert,
            KeyCode::Delete => Key::Delete,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::Esc => Key::Escape,
            KeyCode::F(n) if n <= MAX_FUNCTION_KEY => Key::F(n),
            _ => return None,
        })
    }
}

impl Terminal for CrosstermTerminal {
    fn init(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        self.cursor(false);
        let (w, h) = crossterm::terminal::size()?;
        self.size = TermSize {
            width: w,
            height: h,
        };
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn move_cursor(&mut self, col: u16, row: u16) {
        crossterm::queue!(std::io::stdout(), crossterm::cursor::MoveTo(col, row)).ok();
    }

    fn write_str(&mut self, s: &str) {
        // Hide the cursor while text is written; it is shown again when we
        // wait for a key.
        self.cursor(false);
        self.dirty = true;
        crossterm::queue!(std::io::stdout(), crossterm::style::Print(s)).ok();
    }

    fn clear_eol(&mut self) {
        crossterm::queue!(
            std::io::stdout(),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::UntilNewLine)
        )
        .ok();
    }

    fn clear_screen(&mut self) {
        self.dirty = true;
        crossterm::queue!(
            std::io::stdout(),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All)
        )
        .ok();
    }

    fn beep(&mut self) {
        crossterm::queue!(std::io::stdout(), crossterm::style::Print('\x07')).ok();
    }

    fn flush(&mut self) {
        std::io::stdout().flush().ok();
        if self.dirty && !self.refresh_delay.is_zero() {
            std::thread::sleep(self.refresh_delay);
        }
        self.dirty = false;
    }

    fn read_key(&mut self) -> Result<Key> {
        if let Some(key) = self.pending.pop_front() {
            return Ok(key);
        }
        self.flush();
        self.cursor(true);
        loop {
            match crossterm::event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if let Some(key) = self.translate(key) {
                        return Ok(key);
                    }
                }
                Event::Resize(w, h) => {
                    self.size = TermSize {
                        width: w,
                        height: h,
                    };
                    return Ok(Key::Resize);
                }
                _ => {} // Ignore mouse events etc.
            }
        }
    }

    fn take_back_key(&mut self, key: Key) {
        self.pending.push_front(key);
    }

    fn get_input(&mut self, prompt: &str) -> Result<Option<String>> {
        let row = self.size.height.saturating_sub(1);
        self.move_cursor(0, row);
        self.write_str(prompt);
        self.clear_eol();
        let mut reply = String::new();
        loop {
            match self.read_key()? {
                Key::Enter => return Ok(Some(reply)),
                Key::Escape => return Ok(None),
                Key::Char('\x03') => return Ok(None),
                Key::Backspace => {
                    if reply.pop().is_some() {
                        let col = (prompt.chars().count() + reply.chars().count()) as u16;
                        self.move_cursor(col, row);
                        self.clear_eol();
                    }
                }
                key => {
                    if let Some(ch) = key.printable() {
                        reply.push(ch);
                        self.write_str(ch.encode_utf8(&mut [0; 4]));
                    }
                }
            }
        }
    }

    fn message(&mut self, text: &str) {
        let row = self.size.height.saturating_sub(1);
        self.move_cursor(0, row);
        self.write_str(text);
        self.clear_eol();
        self.flush();
    }

    fn name(&self) -> &str {
        "crossterm"
    }
}

/// Line-oriented terminal for hardcopy and batch operation.
///
/// Keys are read a line at a time from `input`; the end of each line is
/// delivered as [`Key::Enter`].  Screen operations are ignored.
pub struct LineTerminal<R, W> {
    input: R,
    output: W,
    name: String,
    pending: VecDeque<Key>,
}

impl<R: BufRead, W: Write> LineTerminal<R, W> {
    pub fn new(input: R, output: W, name: impl Into<String>) -> Self {
        Self {
            input,
            output,
            name: name.into(),
            pending: VecDeque::new(),
        }
    }

    /// Reads one line without its terminator, or `None` at end of input.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Terminal for LineTerminal<R, W> {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }

    fn size(&self) -> TermSize {
        TermSize {
            width: 80,
            height: 24,
        }
    }

    fn move_cursor(&mut self, _col: u16, _row: u16) {}

    fn write_str(&mut self, s: &str) {
        self.output.write_all(s.as_bytes()).ok();
    }

    fn clear_eol(&mut self) {}

    fn clear_screen(&mut self) {}

    fn beep(&mut self) {
        self.output.write_all(b"\x07").ok();
    }

    fn flush(&mut self) {
        self.output.flush().ok();
    }

    fn read_key(&mut self) -> Result<Key> {
        if let Some(key) = self.pending.pop_front() {
            return Ok(key);
        }
        let Some(line) = self.read_line()? else {
            bail!("End of input");
        };
        self.pending.extend(line.chars().map(Key::Char));
        self.pending.push_back(Key::Enter);
        self.read_key()
    }

    fn take_back_key(&mut self, key: Key) {
        self.pending.push_front(key);
    }

    fn get_input(&mut self, prompt: &str) -> Result<Option<String>> {
        self.write_str(prompt);
        self.flush();
        self.read_line()
    }

    fn message(&mut self, text: &str) {
        writeln!(self.output, "{text}").ok();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Mock terminal for testing.  Records every operation.
#[cfg(test)]
pub struct MockTerminal {
    pub size: TermSize,
    pub cursor_col: u16,
    pub cursor_row: u16,
    pub ops: Vec<MockOp>,
    pub key_queue: VecDeque<Key>,
    pub input_queue: VecDeque<String>,
    pub prompts: Vec<String>,
    pub messages: Vec<String>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Init,
    Cleanup,
    MoveCursor(u16, u16),
    WriteStr(String),
    ClearEol,
    ClearScreen,
    Beep,
    Flush,
}

#[cfg(test)]
impl MockTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            size: TermSize { width, height },
            cursor_col: 0,
            cursor_row: 0,
            ops: Vec::new(),
            key_queue: VecDeque::new(),
            input_queue: VecDeque::new(),
            prompts: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn push_key(&mut self, key: Key) {
        self.key_queue.push_back(key);
    }

    /// Queues every character of `text` as a key.
    pub fn push_str(&mut self, text: &str) {
        self.key_queue.extend(text.chars().map(Key::Char));
    }

    pub fn push_input(&mut self, reply: &str) {
        self.input_queue.push_back(reply.to_string());
    }

    pub fn beeps(&self) -> usize {
        self.ops.iter().filter(|op| **op == MockOp::Beep).count()
    }
}

#[cfg(test)]
impl Terminal for MockTerminal {
    fn init(&mut self) -> Result<()> {
        self.ops.push(MockOp::Init);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.ops.push(MockOp::Cleanup);
        Ok(())
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn move_cursor(&mut self, col: u16, row: u16) {
        self.cursor_col = col;
        self.cursor_row = row;
        self.ops.push(MockOp::MoveCursor(col, row));
    }

    fn write_str(&mut self, s: &str) {
        self.ops.push(MockOp::WriteStr(s.to_string()));
    }

    fn clear_eol(&mut self) {
        self.ops.push(MockOp::ClearEol);
    }

    fn clear_screen(&mut self) {
        self.ops.push(MockOp::ClearScreen);
    }

    fn beep(&mut self) {
        self.ops.push(MockOp::Beep);
    }

    fn flush(&mut self) {
        self.ops.push(MockOp::Flush);
    }

    fn read_key(&mut self) -> Result<Key> {
        match self.key_queue.pop_front() {
            Some(key) => Ok(key),
            None => bail!("No more keys in mock queue"),
        }
    }

    fn take_back_key(&mut self, key: Key) {
        self.key_queue.push_front(key);
    }

    fn get_input(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        match self.input_queue.pop_front() {
            Some(reply) => Ok(Some(reply)),
            None => bail!("No more input in mock queue"),
        }
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn speed(&self) -> u32 {
        9600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("F1"), Some(Key::F(1)));
        assert_eq!(Key::from_name("f12"), Some(Key::F(12)));
        assert_eq!(Key::from_name("F25"), None);
        assert_eq!(Key::from_name("up-arrow"), Some(Key::Up));
        assert_eq!(Key::from_name("CONTROL-A"), Some(Key::Char('\x01')));
        assert_eq!(Key::from_name("x"), Some(Key::Char('x')));
        assert_eq!(Key::from_name("NOSUCHKEY"), None);
    }

    #[test]
    fn test_key_display_round_trips_names() {
        for key in [Key::F(3), Key::PageDown, Key::Char('\x1a'), Key::Char('q')] {
            assert_eq!(Key::from_name(&key.to_string()), Some(key));
        }
    }

    #[test]
    fn test_line_terminal_delivers_lines_as_keys() {
        let input = std::io::Cursor::new("ab\nc\n");
        let mut term = LineTerminal::new(input, Vec::new(), "batch");
        let mut keys = Vec::new();
        while let Ok(key) = term.read_key() {
            keys.push(key);
        }
        assert_eq!(
            keys,
            vec![Key::Char('a'), Key::Char('b'), Key::Enter, Key::Char('c'), Key::Enter]
        );
    }

    #[test]
    fn test_line_terminal_prompt_and_message() {
        let input = std::io::Cursor::new("yes\r\n");
        let mut term = LineTerminal::new(input, Vec::new(), "hardcopy");
        assert_eq!(term.get_input("OK? ").unwrap(), Some("yes".to_string()));
        assert_eq!(term.get_input("again? ").unwrap(), None);
        term.message("done");
        let output = String::from_utf8(term.into_output()).unwrap();
        assert_eq!(output, "OK? again? done\n");
    }

    #[test]
    fn test_take_back_key() {
        let mut term = MockTerminal::new(80, 24);
        term.push_key(Key::Char('a'));
        term.take_back_key(Key::Escape);
        assert_eq!(term.read_key().unwrap(), Key::Escape);
        assert_eq!(term.read_key().unwrap(), Key::Char('a'));
        assert!(term.read_key().is_err());
    }
}
