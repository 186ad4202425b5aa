//! Paging a frame through its files.
//!
//! A frame attached to an input file holds a window of it.  Paging writes
//! the lines above the dot to the output file, if there is one, and reads
//! more input until the frame's space budget is nearly spent.

use tracing::{debug, warn};

use crate::cmd_result::CmdFailure;
use crate::document::{Document, EopLabel, FrameId};
use crate::file::FileTable;
use crate::limits::MAX_STRLEN;
use crate::position::Position;

/// Reads up to `n` lines from the frame's input and places them before its
/// EOP line.  Lines that do not fit are left unread, and so is a line
/// longer than `MAX_STRLEN`.
pub fn file_read(
    doc: &mut Document,
    files: &mut FileTable,
    frame: FrameId,
    n: usize,
    best_try: bool,
) -> Result<usize, CmdFailure> {
    let input = doc.frames[frame].input_file.ok_or(CmdFailure::File("No input file".into()))?;
    let first_nr = files.get(input).map_or(0, |f| f.line_counter) + 1;
    let texts = files.read(input, n, best_try)?;
    if let Some(long) = texts.iter().position(|t| t.chars().count() > MAX_STRLEN) {
        files.unread(input, texts)?;
        warn!(line = first_nr + long, "input line too long");
        return Err(CmdFailure::LineTooLong(first_nr + long));
    }
    let count = texts.len();
    let chain = match doc.lines_from_text(&texts) {
        Ok(chain) => chain,
        Err(e) => {
            files.unread(input, texts)?;
            return Err(e);
        }
    };
    if let Some((first, last)) = chain {
        let eop = doc.eop_line(frame);
        if let Err(e) = doc.lines_inject(first, last, eop) {
            doc.lines_destroy(first, last)?;
            files.unread(input, texts)?;
            return Err(e);
        }
    }
    update_eop_label(doc, files, frame);
    Ok(count)
}

/// Pages `frame` forward: lines above the dot go to the output file, then
/// input is read until the frame has little room left.
pub fn file_page(doc: &mut Document, files: &mut FileTable, frame: FrameId) -> Result<(), CmdFailure> {
    let f = &doc.frames[frame];
    if f.input_file.is_none() && f.output_file.is_none() {
        return Err(CmdFailure::File("No file attached to frame".into()));
    }

    if let Some(output) = f.output_file {
        let dot = doc.dot(frame);
        let first = doc.first_line(frame);
        if first != dot.line
            && let Some(last) = doc.lines[dot.line].blink
        {
            doc.marks_squeeze(Position::new(first, 1), Position::new(dot.line, 1));
            doc.lines_extract(first, last)?;
            for line in doc.chain(first, last) {
                let text = doc.line_text(line);
                files.write(output, &text)?;
            }
            doc.lines_destroy(first, last)?;
            debug!(frame = doc.frame_name(frame), "lines paged out");
        }
    }

    file_fill(doc, files, frame)?;

    let dot = doc.dot(frame);
    let eop = doc.eop_line(frame);
    if dot.line == eop {
        let first = doc.first_line(frame);
        if first != eop {
            doc.set_dot(frame, Position::new(first, 1));
        }
    }
    Ok(())
}

/// Reads input into `frame` until it is used up or the frame has less
/// than a tenth of its space left.
pub fn file_fill(doc: &mut Document, files: &mut FileTable, frame: FrameId) -> Result<(), CmdFailure> {
    let Some(input) = doc.frames[frame].input_file else {
        return Ok(());
    };
    let threshold = doc.frames[frame].space_limit / 10;
    let mut result = Ok(());
    while !files.is_eof(input) && doc.frames[frame].space_left > threshold {
        match file_read(doc, files, frame, 1, true) {
            Ok(0) => break,
            Ok(_) => {}
            // The frame is full; the line waits for the next page.
            Err(CmdFailure::NoRoom) => break,
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    update_eop_label(doc, files, frame);
    result
}

/// Sends the rest of the frame's input straight to its output.
pub fn file_windthru(files: &mut FileTable, input: usize, output: usize) -> Result<usize, CmdFailure> {
    files.windthru(input, output)
}

fn update_eop_label(doc: &mut Document, files: &FileTable, frame: FrameId) {
    let label = match doc.frames[frame].input_file {
        Some(input) if !files.is_eof(input) => EopLabel::PageBoundary,
        _ => EopLabel::EndOfFile,
    };
    let eop = doc.eop_line(frame);
    if doc.lines[eop].eop != Some(label) {
        doc.lines[eop].eop = Some(label);
        doc.frames[frame].redraw = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn lines(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_page_fills_to_space_limit() {
        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        doc.frames[frame].space_limit = 400;
        doc.frames[frame].space_left = 400;
        let input = files.open_reader("mem", Box::new(Cursor::new(lines(200))));
        doc.frames[frame].input_file = Some(input);

        file_page(&mut doc, &mut files, frame).unwrap();
        let loaded = doc.total_lines(frame) - 1;
        assert!(loaded > 0 && loaded < 200, "loaded {loaded}");
        assert_eq!(doc.lines[doc.eop_line(frame)].eop, Some(EopLabel::PageBoundary));
        assert_eq!(doc.dot(frame).line, doc.first_line(frame));
        assert_eq!(doc.line_text(doc.first_line(frame)), "line 1");
    }

    #[test]
    fn test_page_without_files_fails() {
        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        assert!(file_page(&mut doc, &mut files, frame).is_err());
    }

    #[test]
    fn test_short_file_reaches_end() {
        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        let input = files.open_reader("mem", Box::new(Cursor::new(lines(3))));
        doc.frames[frame].input_file = Some(input);

        file_page(&mut doc, &mut files, frame).unwrap();
        assert_eq!(doc.frame_text(frame), "line 1\nline 2\nline 3");
        assert_eq!(doc.lines[doc.eop_line(frame)].eop, Some(EopLabel::EndOfFile));
    }

    #[test]
    fn test_paging_through_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.txt");
        let text = lines(1000);

        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        doc.frames[frame].space_limit = 1200;
        doc.frames[frame].space_left = 1200;
        doc.frames[frame].input_file = Some(files.open_reader("mem", Box::new(Cursor::new(text.clone()))));
        let output = files.open_output(&out_path, false).unwrap();
        doc.frames[frame].output_file = Some(output);

        let mut pages = 0;
        loop {
            file_page(&mut doc, &mut files, frame).unwrap();
            pages += 1;
            let eop = doc.eop_line(frame);
            if doc.lines[eop].eop == Some(EopLabel::EndOfFile) {
                break;
            }
            doc.set_dot(frame, Position::new(eop, 1));
            assert!(pages < 1000);
        }
        assert!(pages > 1);

        let mut line = Some(doc.first_line(frame));
        while let Some(l) = line
            && !doc.lines[l].is_eop()
        {
            files.write(output, &doc.line_text(l)).unwrap();
            line = doc.lines[l].flink;
        }
        files.close(output, false).unwrap();
        assert_eq!(fs::read_to_string(&out_path).unwrap(), text);
    }

    #[test]
    fn test_paging_keeps_marks_valid() {
        use crate::marks::MarkId;

        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        doc.frames[frame].input_file = Some(files.open_reader("mem", Box::new(Cursor::new(lines(10)))));
        doc.frames[frame].output_file = Some(files.open_output(dir.path().join("o"), false).unwrap());
        file_page(&mut doc, &mut files, frame).unwrap();

        let first = doc.first_line(frame);
        doc.set_mark(frame, MarkId::Numbered(1), Position::new(first, 3));
        let fifth = doc.line_from_number(frame, 5).unwrap();
        doc.set_dot(frame, Position::new(fifth, 1));
        file_page(&mut doc, &mut files, frame).unwrap();

        assert_eq!(doc.line_text(doc.first_line(frame)), "line 5");
        let mark = doc.mark_at(frame, MarkId::Numbered(1)).unwrap();
        assert_eq!(mark.line, fifth);
    }

    #[test]
    fn test_long_input_line_is_left_unread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w");
        let long = "x".repeat(MAX_STRLEN + 1);
        let text = format!("one\ntwo\n{long}\nfour\n");

        let mut doc = Document::new(2000, 80);
        let mut files = FileTable::new();
        let frame = doc.current_frame();
        let input = files.open_reader("mem", Box::new(Cursor::new(text.clone())));
        doc.frames[frame].input_file = Some(input);
        let lines_before = doc.lines.len();

        assert_eq!(file_fill(&mut doc, &mut files, frame), Err(CmdFailure::LineTooLong(3)));
        assert_eq!(doc.frame_text(frame), "one\ntwo");
        assert_eq!(doc.lines.len(), lines_before + 2);
        assert_eq!(doc.lines[doc.eop_line(frame)].eop, Some(EopLabel::PageBoundary));

        // A second attempt reports the same line rather than skipping it.
        assert_eq!(file_read(&mut doc, &mut files, frame, 1, true), Err(CmdFailure::LineTooLong(3)));

        let output = files.open_output(&path, false).unwrap();
        assert_eq!(file_windthru(&mut files, input, output).unwrap(), 2);
        files.close(output, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{long}\nfour\n"));
    }

    #[test]
    fn test_windthru() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w");
        let mut files = FileTable::new();
        let input = files.open_reader("mem", Box::new(Cursor::new(lines(4))));
        let output = files.open_output(&path, false).unwrap();
        assert_eq!(file_windthru(&mut files, input, output).unwrap(), 4);
        files.close(output, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), lines(4));
    }
}
