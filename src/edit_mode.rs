//! What a typed key does in screen mode.

/// The current editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Printable keys insert text at the dot.
    #[default]
    Insert,
    /// Printable keys overtype the text at the dot.
    Overtype,
    /// Every key starts a command, as if the introducer had been typed.
    Command,
}
