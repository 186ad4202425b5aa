use super::*;
use crate::cmd_result::CmdResult;
use crate::lead_param::LeadParam;
use crate::limits::DEFAULT_SPACE_LIMIT;
use crate::marks::MarkId;
use crate::trail_param::TrailParam;

fn doc_from(texts: &[&str]) -> Document {
    let mut doc = Document::new(DEFAULT_SPACE_LIMIT, 80);
    let frame = doc.current_frame();
    let eop = doc.eop_line(frame);
    if let Some((first, last)) = doc.lines_from_text(texts).unwrap() {
        doc.lines_inject(first, last, eop).unwrap();
    }
    let first = doc.first_line(frame);
    doc.set_dot(frame, Position::new(first, 1));
    doc
}

fn tp(text: &str) -> TrailParam {
    TrailParam::new('/', text)
}

fn text(doc: &Document) -> String {
    doc.frame_text(doc.current_frame())
}

/// Line number and column of the dot.
fn dot(doc: &Document) -> (usize, usize) {
    let pos = doc.dot(doc.current_frame());
    (doc.line_to_number(pos.line).unwrap(), pos.col)
}

fn goto(doc: &mut Document, line: usize, col: usize) {
    let frame = doc.current_frame();
    let l = doc.line_from_number(frame, line).unwrap();
    doc.set_dot(frame, Position::new(l, col));
}

fn mark(doc: &Document, id: MarkId) -> Option<(usize, usize)> {
    doc.mark_at(doc.current_frame(), id)
        .map(|pos| (doc.line_to_number(pos.line).unwrap(), pos.col))
}

#[test]
fn test_new_document_is_empty() {
    let doc = Document::new(DEFAULT_SPACE_LIMIT, 80);
    assert_eq!(text(&doc), "");
    assert_eq!(dot(&doc), (1, 1));
    assert!(doc.line(doc.dot(doc.current_frame()).line).is_eop());
}

#[test]
fn test_insert_repeated_text() {
    let mut doc = Document::new(DEFAULT_SPACE_LIMIT, 80);
    assert!(doc.cmd_insert_text(LeadParam::Pint(5), &tp("hello")).is_success());
    assert_eq!(text(&doc), "hellohellohellohellohello");
    assert_eq!(dot(&doc), (1, 26));
    assert_eq!(mark(&doc, MarkId::Modified), Some((1, 26)));
    assert_eq!(mark(&doc, MarkId::Equals), Some((1, 1)));
    assert!(doc.frame(doc.current_frame()).text_modified);
}

#[test]
fn test_insert_multi_line_text() {
    let mut doc = doc_from(&["ab"]);
    goto(&mut doc, 1, 2);
    assert!(doc.cmd_insert_text(LeadParam::None, &tp("x\ny")).is_success());
    assert_eq!(text(&doc), "ax\nyb");
    assert_eq!(dot(&doc), (2, 2));
}

#[test]
fn test_insert_rejects_negative_count() {
    let mut doc = doc_from(&["ab"]);
    let result = doc.cmd_insert_text(LeadParam::Minus, &tp("x"));
    assert_eq!(result, CmdResult::Failure(CmdFailure::SyntaxError));
    assert_eq!(text(&doc), "ab");
}

#[test]
fn test_overtype_in_middle() {
    let mut doc = doc_from(&["abcdef"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_overtype_text(LeadParam::Pint(2), &tp("X")).is_success());
    assert_eq!(text(&doc), "abXXef");
    assert_eq!(dot(&doc), (1, 5));
}

#[test]
fn test_overtype_multi_line_fails() {
    let mut doc = doc_from(&["abc"]);
    let result = doc.cmd_overtype_text(LeadParam::None, &tp("a\nb"));
    assert_eq!(result, CmdResult::Failure(CmdFailure::MultiLine));
}

#[test]
fn test_insert_char_keeps_dot() {
    let mut doc = doc_from(&["ab"]);
    goto(&mut doc, 1, 2);
    assert!(doc.cmd_insert_char(LeadParam::Pint(3)).is_success());
    assert_eq!(text(&doc), "a   b");
    assert_eq!(dot(&doc), (1, 2));
    assert!(doc.cmd_insert_char(LeadParam::Minus).is_success());
    assert_eq!(text(&doc), "a    b");
    assert_eq!(dot(&doc), (1, 3));
}

#[test]
fn test_insert_line_before_dot() {
    let mut doc = doc_from(&["one", "two"]);
    goto(&mut doc, 2, 2);
    assert!(doc.cmd_insert_line(LeadParam::Pint(2)).is_success());
    assert_eq!(text(&doc), "one\n\n\ntwo");
    assert_eq!(dot(&doc), (2, 2));

    let mut doc = doc_from(&["one", "two"]);
    goto(&mut doc, 2, 1);
    assert!(doc.cmd_insert_line(LeadParam::Minus).is_success());
    assert_eq!(text(&doc), "one\n\ntwo");
    assert_eq!(dot(&doc), (3, 1));
}

#[test]
fn test_delete_char_variants() {
    let mut doc = doc_from(&["abcdef"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_delete_char(LeadParam::Pint(2)).is_success());
    assert_eq!(text(&doc), "abef");
    assert_eq!(dot(&doc), (1, 3));

    assert!(doc.cmd_delete_char(LeadParam::Minus).is_success());
    assert_eq!(text(&doc), "aef");
    assert_eq!(dot(&doc), (1, 2));

    assert!(doc.cmd_delete_char(LeadParam::Pindef).is_success());
    assert_eq!(text(&doc), "a");

    assert_eq!(
        doc.cmd_delete_char(LeadParam::Nint(5)),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
}

#[test]
fn test_delete_char_to_mark_joins_lines() {
    let mut doc = doc_from(&["abc", "def"]);
    goto(&mut doc, 2, 2);
    assert!(doc.cmd_mark(LeadParam::Pint(1)).is_success());
    goto(&mut doc, 1, 2);
    assert!(doc.cmd_delete_char(LeadParam::Marker(MarkId::Numbered(1))).is_success());
    assert_eq!(text(&doc), "aef");
    assert_eq!(dot(&doc), (1, 2));
}

#[test]
fn test_delete_line_moves_to_oops() {
    let mut doc = doc_from(&["one", "two", "three"]);
    goto(&mut doc, 2, 3);
    assert!(doc.cmd_delete_line(LeadParam::None).is_success());
    assert_eq!(text(&doc), "one\nthree");
    assert_eq!(dot(&doc), (2, 3));
    let oops = doc.frame_oops;
    assert_eq!(doc.frame_text(oops), "two");
}

#[test]
fn test_delete_line_range_checks() {
    let mut doc = doc_from(&["one", "two"]);
    goto(&mut doc, 2, 1);
    assert_eq!(
        doc.cmd_delete_line(LeadParam::Pint(2)),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
    assert!(doc.cmd_delete_line(LeadParam::Nindef).is_success());
    assert_eq!(text(&doc), "two");
    assert!(doc.cmd_delete_line(LeadParam::Pindef).is_success());
    assert_eq!(text(&doc), "");
}

#[test]
fn test_delete_line_in_oops_destroys() {
    let mut doc = doc_from(&[]);
    doc.frame_edit("OOPS").unwrap();
    let oops = doc.frame_oops;
    assert_eq!(doc.current_frame(), oops);
    assert!(doc.cmd_insert_text(LeadParam::None, &tp("gone")).is_success());
    goto(&mut doc, 1, 1);
    assert!(doc.cmd_delete_line(LeadParam::None).is_success());
    assert_eq!(doc.frame_text(oops), "");
}

#[test]
fn test_split_line() {
    let mut doc = doc_from(&["hello world"]);
    goto(&mut doc, 1, 6);
    assert!(doc.cmd_split_line(LeadParam::None).is_success());
    assert_eq!(text(&doc), "hello\n world");
    assert_eq!(dot(&doc), (2, 1));
}

#[test]
fn test_rubout_insert_and_overtype_mode() {
    let mut doc = doc_from(&["abcd"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_rubout(LeadParam::None, true).is_success());
    assert_eq!(text(&doc), "acd");
    assert_eq!(dot(&doc), (1, 2));

    assert!(doc.cmd_rubout(LeadParam::None, false).is_success());
    assert_eq!(text(&doc), " cd");
    assert_eq!(dot(&doc), (1, 1));

    assert_eq!(
        doc.cmd_rubout(LeadParam::None, true),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
}

#[test]
fn test_case_change() {
    let mut doc = doc_from(&["hello world"]);
    assert!(doc.cmd_case_change(LeadParam::Pint(5), CaseMode::Upper).is_success());
    assert_eq!(text(&doc), "HELLO world");
    assert_eq!(dot(&doc), (1, 6));

    goto(&mut doc, 1, 1);
    assert!(doc.cmd_case_change(LeadParam::Pindef, CaseMode::Lower).is_success());
    assert_eq!(text(&doc), "hello world");

    goto(&mut doc, 1, 1);
    assert!(doc.cmd_case_change(LeadParam::Pindef, CaseMode::Edit).is_success());
    assert_eq!(text(&doc), "Hello World");
}

#[test]
fn test_advance_and_jump() {
    let mut doc = doc_from(&["one", "two", "three"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_advance(LeadParam::Pint(2)).is_success());
    assert_eq!(dot(&doc), (3, 1));
    assert_eq!(mark(&doc, MarkId::Equals), Some((1, 3)));

    assert_eq!(
        doc.cmd_advance(LeadParam::Pint(2)),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
    assert!(doc.cmd_advance(LeadParam::Pindef).is_success());
    assert_eq!(dot(&doc), (4, 1));
    assert!(doc.cmd_advance(LeadParam::Nindef).is_success());
    assert_eq!(dot(&doc), (1, 1));

    assert!(doc.cmd_jump(LeadParam::Pindef).is_success());
    assert_eq!(dot(&doc), (1, 4));
    assert!(doc.cmd_jump(LeadParam::Nint(2)).is_success());
    assert_eq!(dot(&doc), (1, 2));
    assert_eq!(
        doc.cmd_jump(LeadParam::Nint(2)),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
}

#[test]
fn test_advance_to_undefined_mark_fails() {
    let mut doc = doc_from(&["one"]);
    assert_eq!(
        doc.cmd_advance(LeadParam::Marker(MarkId::Numbered(3))),
        CmdResult::Failure(CmdFailure::MarkNotDefined)
    );
}

#[test]
fn test_cursor_keys() {
    let mut doc = doc_from(&["one", "two"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_cursor_vertical(LeadParam::None, true).is_success());
    assert_eq!(dot(&doc), (2, 3));
    assert!(doc.cmd_cursor_horizontal(LeadParam::Pint(4), true).is_success());
    assert_eq!(dot(&doc), (2, 7));
    assert!(doc.cmd_cursor_vertical(LeadParam::Pint(5), false).is_failure());
    assert!(doc.cmd_cursor_horizontal(LeadParam::Pindef, false).is_success());
    assert_eq!(dot(&doc), (2, 1));
    assert!(doc.cmd_home().is_success());
    assert_eq!(dot(&doc), (1, 1));
}

#[test]
fn test_return_adds_line_at_end() {
    let mut doc = doc_from(&["one"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_return(LeadParam::None).is_success());
    assert_eq!(dot(&doc), (2, 1));
    assert_eq!(doc.total_lines(doc.current_frame()), 3);
    assert!(!doc.line(doc.dot(doc.current_frame()).line).is_eop());
}

#[test]
fn test_return_without_new_line_option() {
    let mut doc = doc_from(&["one"]);
    let frame = doc.current_frame();
    doc.frame_mut(frame).options.new_line = false;
    assert!(doc.cmd_return(LeadParam::None).is_success());
    assert!(doc.line(doc.dot(frame).line).is_eop());
    assert_eq!(
        doc.cmd_return(LeadParam::None),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
}

#[test]
fn test_predicates() {
    let mut doc = doc_from(&["abc"]);
    assert!(doc.cmd_eol(LeadParam::None).is_failure());
    assert!(doc.cmd_eol(LeadParam::Minus).is_success());
    goto(&mut doc, 1, 4);
    assert!(doc.cmd_eol(LeadParam::None).is_success());

    assert!(doc.cmd_eop(LeadParam::None).is_failure());
    goto(&mut doc, 2, 1);
    assert!(doc.cmd_eop(LeadParam::None).is_success());
    assert!(doc.cmd_eof(LeadParam::None, false).is_failure());
    assert!(doc.cmd_eof(LeadParam::None, true).is_success());
}

#[test]
fn test_eqc() {
    let mut doc = doc_from(&["abcdef"]);
    goto(&mut doc, 1, 4);
    assert!(doc.cmd_eqc(LeadParam::None, &tp("4")).is_success());
    assert!(doc.cmd_eqc(LeadParam::Pindef, &tp("3")).is_success());
    assert!(doc.cmd_eqc(LeadParam::Nindef, &tp("3")).is_failure());
    assert!(doc.cmd_eqc(LeadParam::None, &tp("x")).is_failure());
}

#[test]
fn test_eqm_compares_positions() {
    let mut doc = doc_from(&["abc", "def"]);
    goto(&mut doc, 1, 2);
    assert!(doc.cmd_mark(LeadParam::Pint(2)).is_success());
    goto(&mut doc, 2, 1);
    assert!(doc.cmd_eqm(LeadParam::None, &tp("2")).is_failure());
    assert!(doc.cmd_eqm(LeadParam::Pindef, &tp("2")).is_success());
    assert!(doc.cmd_eqm(LeadParam::Nindef, &tp("2")).is_failure());
    assert_eq!(
        doc.cmd_eqm(LeadParam::None, &tp("5")),
        CmdResult::Failure(CmdFailure::MarkNotDefined)
    );
}

#[test]
fn test_eqs_case_handling() {
    let mut doc = doc_from(&["Hello"]);
    assert!(doc.cmd_eqs(LeadParam::None, &tp("HELLO")).is_success());
    let exact = TrailParam::new('"', "HELLO");
    assert!(doc.cmd_eqs(LeadParam::None, &exact).is_failure());
    assert!(doc.cmd_eqs(LeadParam::None, &TrailParam::new('"', "Hel")).is_success());
    // An empty string repeats the previous comparison.
    assert!(doc.cmd_eqs(LeadParam::None, &tp("")).is_success());
}

#[test]
fn test_mark_set_and_unset() {
    let mut doc = doc_from(&["abc"]);
    goto(&mut doc, 1, 3);
    assert!(doc.cmd_mark(LeadParam::Pint(9)).is_success());
    assert_eq!(mark(&doc, MarkId::Numbered(9)), Some((1, 3)));
    assert!(doc.cmd_mark(LeadParam::Nint(9)).is_success());
    assert_eq!(mark(&doc, MarkId::Numbered(9)), None);
    assert!(doc.cmd_mark(LeadParam::Pint(10)).is_failure());
}

#[test]
fn test_get_forward_and_backward() {
    let mut doc = doc_from(&["the cat", "a Cat and a cat"]);
    assert!(doc.cmd_get(LeadParam::None, &tp("cat")).is_success());
    assert_eq!(dot(&doc), (1, 8));
    assert_eq!(mark(&doc, MarkId::Equals), Some((1, 5)));

    assert!(doc.cmd_get(LeadParam::Pint(2), &tp("cat")).is_success());
    assert_eq!(dot(&doc), (2, 16));

    assert!(doc.cmd_get(LeadParam::Minus, &tp("cat")).is_success());
    assert_eq!(dot(&doc), (2, 13));
    assert_eq!(mark(&doc, MarkId::Equals), Some((2, 16)));

    // Repeats the previous target.
    assert!(doc.cmd_get(LeadParam::Minus, &tp("")).is_success());
    assert_eq!(dot(&doc), (2, 3));
}

#[test]
fn test_get_exact_and_not_found() {
    let mut doc = doc_from(&["a Cat", "a cat"]);
    let exact = TrailParam::new('"', "cat");
    assert!(doc.cmd_get(LeadParam::None, &exact).is_success());
    assert_eq!(dot(&doc), (2, 6));
    assert_eq!(
        doc.cmd_get(LeadParam::None, &exact),
        CmdResult::Failure(CmdFailure::NotFound)
    );
    assert_eq!(dot(&doc), (2, 6));
}

#[test]
fn test_replace_counts() {
    let mut doc = doc_from(&["aaa bbb aaa", "aaa"]);
    assert!(doc.cmd_replace(LeadParam::None, &tp("aaa"), &tp("x")).is_success());
    assert_eq!(text(&doc), "x bbb aaa\naaa");
    assert_eq!(dot(&doc), (1, 2));

    assert!(doc.cmd_replace(LeadParam::Pindef, &tp("AAA"), &tp("yy")).is_success());
    assert_eq!(text(&doc), "x bbb yy\nyy");
    assert_eq!(
        doc.cmd_replace(LeadParam::None, &tp("aaa"), &tp("x")),
        CmdResult::Failure(CmdFailure::NotFound)
    );
}

#[test]
fn test_replace_backwards_reuses_previous() {
    let mut doc = doc_from(&["ab ab ab"]);
    goto(&mut doc, 1, 9);
    assert!(doc.cmd_replace(LeadParam::Minus, &tp("ab"), &tp("C")).is_success());
    assert_eq!(text(&doc), "ab ab C");
    assert_eq!(dot(&doc), (1, 7));
    assert!(doc.cmd_replace(LeadParam::Minus, &tp(""), &tp("")).is_success());
    assert_eq!(text(&doc), "ab C C");
}

#[test]
fn test_frame_edit_and_return() {
    let mut doc = doc_from(&["main"]);
    let main = doc.current_frame();
    doc.frame_edit("notes").unwrap();
    let notes = doc.current_frame();
    assert_ne!(main, notes);
    assert_eq!(doc.frame_name(notes), "NOTES");
    doc.frame_return(1).unwrap();
    assert_eq!(doc.current_frame(), main);
    assert_eq!(doc.frame_return(5), Err(CmdFailure::OutOfRange));
}

#[test]
fn test_frame_kill() {
    let mut doc = doc_from(&["main"]);
    doc.frame_edit("scratch").unwrap();
    assert!(doc.cmd_insert_text(LeadParam::None, &tp("temp")).is_success());
    assert_eq!(
        doc.frame_kill("scratch"),
        Err(CmdFailure::FrameInUse("SCRATCH".into()))
    );
    doc.frame_return(1).unwrap();
    doc.frame_kill("scratch").unwrap();
    assert!(doc.span_named("SCRATCH").is_none());
    assert_eq!(
        doc.frame_kill("heap"),
        Err(CmdFailure::FrameInUse("HEAP".into()))
    );
}

#[test]
fn test_next_character_from_set() {
    let mut doc = doc_from(&["abc 123", "x9"]);
    assert!(doc.cmd_next(LeadParam::None, &tp("0..9")).is_success());
    assert_eq!(dot(&doc), (1, 5));
    assert_eq!(mark(&doc, MarkId::Equals), Some((1, 1)));

    assert!(doc.cmd_next(LeadParam::Pint(3), &tp("0..9")).is_success());
    assert_eq!(dot(&doc), (2, 2));

    assert!(doc.cmd_next(LeadParam::Minus, &tp("a..c")).is_success());
    assert_eq!(dot(&doc), (1, 4));

    assert!(doc.cmd_next(LeadParam::None, &tp("#")).is_failure());
    assert_eq!(dot(&doc), (1, 4));
}

#[test]
fn test_next_matches_blank_at_end_of_line() {
    let mut doc = doc_from(&["ab", "cd"]);
    assert!(doc.cmd_next(LeadParam::None, &tp(" ")).is_success());
    assert_eq!(dot(&doc), (1, 3));
}

#[test]
fn test_swap_line_down_and_up() {
    let mut doc = doc_from(&["one", "two", "three"]);
    goto(&mut doc, 1, 2);
    assert!(doc.cmd_swap_line(LeadParam::None).is_success());
    assert_eq!(text(&doc), "two\none\nthree");
    assert_eq!(dot(&doc), (2, 2));

    assert!(doc.cmd_swap_line(LeadParam::Pindef).is_success());
    assert_eq!(text(&doc), "two\nthree\none");
    assert_eq!(dot(&doc), (3, 2));

    assert!(doc.cmd_swap_line(LeadParam::Nint(2)).is_success());
    assert_eq!(text(&doc), "one\ntwo\nthree");
    assert_eq!(
        doc.cmd_swap_line(LeadParam::Minus),
        CmdResult::Failure(CmdFailure::OutOfRange)
    );
}
