//! Screen rendering for interactive mode.
//!
//! The screen shows a window onto the current frame in every row but the
//! last, which belongs to prompts and messages.  Each row remembers what
//! was last written to it, so an update only sends the rows that changed.

use crate::document::{Document, FrameId, LineId};
use crate::terminal::{TermSize, Terminal};

/// Manages screen rendering.
pub struct Screen {
    width: usize,
    height: usize,
    /// What is on each text row, `None` when unknown.
    rows: Vec<Option<String>>,
    /// Columns scrolled off to the left.
    offset: usize,
    /// The frame last drawn.
    shown: Option<FrameId>,
}

impl Screen {
    pub fn new(size: TermSize) -> Self {
        let mut screen = Self {
            width: 0,
            height: 0,
            rows: Vec::new(),
            offset: 0,
            shown: None,
        };
        screen.resize(size);
        screen
    }

    pub fn resize(&mut self, size: TermSize) {
        self.width = usize::from(size.width).max(1);
        self.height = usize::from(size.height).max(2);
        self.rows = vec![None; self.text_height()];
    }

    /// Forget what is on the terminal, so the next update redraws it all.
    pub fn invalidate(&mut self) {
        self.rows.iter_mut().for_each(|row| *row = None);
    }

    /// Rows available for text.
    pub fn text_height(&self) -> usize {
        self.height - 1
    }

    /// Brings the terminal up to date with the current frame, scrolling to
    /// keep the dot in view, and leaves the cursor at the dot.
    pub fn update(&mut self, doc: &mut Document, term: &mut dyn Terminal) {
        let frame = doc.current_frame();
        if self.shown != Some(frame) || doc.frame(frame).redraw {
            self.invalidate();
            self.shown = Some(frame);
            doc.frame_mut(frame).redraw = false;
        }

        let text_height = self.text_height();
        let dot = doc.dot(frame);
        let dot_nr = doc.line_to_number(dot.line).unwrap_or(1);
        let mut top_nr = doc
            .frame(frame)
            .scr_top_line
            .filter(|&line| doc.lines.get(line).is_some() && doc.frame_of_line(line) == Some(frame))
            .and_then(|line| doc.line_to_number(line))
            .unwrap_or(1);
        if dot_nr < top_nr || dot_nr >= top_nr + text_height {
            top_nr = dot_nr.saturating_sub(text_height / 2).max(1);
        }
        doc.frame_mut(frame).scr_top_line = doc.line_from_number(frame, top_nr);

        let col = dot.col - 1;
        if col < self.offset || col >= self.offset + self.width {
            self.offset = col.saturating_sub(self.width / 2);
            self.invalidate();
        }

        let mut line = doc.line_from_number(frame, top_nr);
        for row in 0..text_height {
            let text = line.map_or_else(String::new, |l| self.row_text(doc, l));
            if self.rows[row].as_deref() != Some(text.as_str()) {
                term.move_cursor(0, row as u16);
                term.write_str(&text);
                term.clear_eol();
                self.rows[row] = Some(text);
            }
            line = line.and_then(|l| doc.line(l).flink);
        }

        term.move_cursor((col - self.offset) as u16, (dot_nr - top_nr) as u16);
        term.flush();
    }

    /// The visible part of a line.  The EOP line shows its label.
    fn row_text(&self, doc: &Document, line: LineId) -> String {
        if let Some(label) = doc.line(line).eop {
            return label.to_string().chars().take(self.width).collect();
        }
        let mut out = String::with_capacity(self.width);
        for ch in doc.line(line).chars().iter().skip(self.offset).take(self.width) {
            if ch.is_control() {
                out.push('^');
                out.push(char::from((*ch as u8) ^ 0x40));
            } else {
                out.push(*ch);
            }
        }
        out.chars().take(self.width).collect()
    }
}
