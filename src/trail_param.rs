/// Delimiter meaning "prompt the user for the value".
pub const TPD_PROMPT: char = '?';
/// Delimiter meaning "the value is the text of the named span".
pub const TPD_SPAN: char = '@';
/// Delimiter meaning "the value is the answer to an enquiry".
pub const TPD_ENVIRONMENT: char = '$';
/// Delimiter marking a literal that is never substituted.
pub const TPD_LIT: char = '\'';
/// Delimiter requesting case-sensitive matching.
pub const TPD_EXACT: char = '"';
/// Delimiter requesting pattern matching.
pub const TPD_SMART: char = '`';

/// Delimiters that are recognised again when they wrap a parameter's text.
pub const NESTED_DELIMITERS: [char; 5] = [TPD_SPAN, TPD_PROMPT, TPD_ENVIRONMENT, TPD_EXACT, TPD_SMART];

/// A trailing parameter: its delimiter and the text between the delimiters.
/// Multi-line text separates lines with `'\n'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailParam {
    pub dlm: char,
    pub content: String,
}

impl TrailParam {
    pub fn new(dlm: char, content: impl Into<String>) -> Self {
        Self {
            dlm,
            content: content.into(),
        }
    }

    /// The placeholder emitted when an interactive command omits its parameter.
    pub fn prompt() -> Self {
        Self::new(TPD_PROMPT, String::new())
    }

    pub fn is_exact(&self) -> bool {
        self.dlm == TPD_EXACT
    }

    pub fn is_multi_line(&self) -> bool {
        self.content.contains('\n')
    }

    /// If the text is wrapped in one of the nested delimiters, returns
    /// that delimiter and the inner text.
    pub fn unwrap_nested(text: &str) -> Option<(char, &str)> {
        let first = text.chars().next()?;
        if text.chars().count() < 2 || !NESTED_DELIMITERS.contains(&first) || !text.ends_with(first)
        {
            return None;
        }
        let inner = &text[first.len_utf8()..text.len() - first.len_utf8()];
        Some((first, inner))
    }
}

/// True for characters that may delimit a trailing parameter.
pub fn is_delimiter(ch: char) -> bool {
    ch.is_ascii_punctuation()
}
