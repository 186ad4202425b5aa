//! Character-buffer primitives.
//!
//! Buffers are `[char]` slices addressed with 1-based columns, matching the
//! column numbering of the document model.

use std::cmp::Ordering;

/// Uppercases a single character, leaving characters whose uppercase form
/// is not a single character unchanged.
pub fn upcase(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => ch,
    }
}

pub fn locase(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => ch,
    }
}

pub fn upcased(text: &[char]) -> Vec<char> {
    text.iter().copied().map(upcase).collect()
}

/// Fills columns `from..=to` with `ch`.
pub fn ch_fill(buf: &mut [char], from: usize, to: usize, ch: char) {
    if from == 0 || from > to {
        return;
    }
    let to = to.min(buf.len());
    buf[from - 1..to].fill(ch);
}

/// Copies `len` characters from `src` at column `src_col` into `dst` at
/// column `dst_col`.  Source columns beyond the end of `src` read as blanks.
pub fn ch_copy(src: &[char], src_col: usize, len: usize, dst: &mut [char], dst_col: usize) {
    for i in 0..len {
        let ch = src.get(src_col - 1 + i).copied().unwrap_or(' ');
        if let Some(slot) = dst.get_mut(dst_col - 1 + i) {
            *slot = ch;
        }
    }
}

/// Length of `buf` ignoring trailing blanks.
pub fn ch_length(buf: &[char]) -> usize {
    buf.iter().rposition(|&c| c != ' ').map_or(0, |p| p + 1)
}

/// Compares two buffers.  Without `exact`, the comparison ignores case.
pub fn ch_compare(a: &[char], b: &[char], exact: bool) -> Ordering {
    if exact {
        a.cmp(b)
    } else {
        a.iter().copied().map(upcase).cmp(b.iter().copied().map(upcase))
    }
}

/// Finds `target` in `text`, returning the 1-based column of the match.
///
/// Without `exact` the text side is case-folded; the target is expected to
/// be uppercase already, and is folded again so that lowercase targets still
/// behave.  A backward search returns the rightmost match.
pub fn ch_search(target: &[char], text: &[char], exact: bool, backwards: bool) -> Option<usize> {
    if target.is_empty() || target.len() > text.len() {
        return None;
    }
    if backwards {
        let rev_target: Vec<char> = target.iter().rev().copied().collect();
        let rev_text: Vec<char> = text.iter().rev().copied().collect();
        let p = search_forward(&rev_target, &rev_text, exact)?;
        return Some(text.len() + 2 - p - target.len());
    }
    search_forward(target, text, exact)
}

fn search_forward(target: &[char], text: &[char], exact: bool) -> Option<usize> {
    let matches = |window: &[char]| {
        if exact {
            window == target
        } else {
            window
                .iter()
                .zip(target)
                .all(|(&t, &p)| upcase(t) == upcase(p))
        }
    };
    text.windows(target.len()).position(matches).map(|p| p + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_fill_and_length() {
        let mut buf = chars("abcdef");
        ch_fill(&mut buf, 3, 6, ' ');
        assert_eq!(buf.iter().collect::<String>(), "ab    ");
        assert_eq!(ch_length(&buf), 2);
        assert_eq!(ch_length(&chars("   ")), 0);
    }

    #[test]
    fn test_copy_pads_with_blanks() {
        let mut dst = chars("xxxxx");
        ch_copy(&chars("ab"), 1, 4, &mut dst, 2);
        assert_eq!(dst.iter().collect::<String>(), "xab  ");
    }

    #[test]
    fn test_compare() {
        assert_eq!(ch_compare(&chars("abc"), &chars("ABC"), false), Ordering::Equal);
        assert_ne!(ch_compare(&chars("abc"), &chars("ABC"), true), Ordering::Equal);
        assert_eq!(ch_compare(&chars("abd"), &chars("abc"), true), Ordering::Greater);
    }

    #[test]
    fn test_search_forward() {
        let text = chars("Hello hello");
        assert_eq!(ch_search(&chars("HELLO"), &text, false, false), Some(1));
        assert_eq!(ch_search(&chars("hello"), &text, true, false), Some(7));
        assert_eq!(ch_search(&chars("xyz"), &text, false, false), None);
    }

    #[test]
    fn test_search_backward_finds_rightmost() {
        let text = chars("abcabcab");
        assert_eq!(ch_search(&chars("ABC"), &text, false, true), Some(4));
        assert_eq!(ch_search(&chars("b"), &text, true, true), Some(8));
    }

    #[test]
    fn test_case_insensitive_search_matches_uppercased_exact_search() {
        let texts = ["The Quick brown fox", "quick QUICK quick", "nothing here", "qUiCk"];
        let targets = ["quick", "QUICK", "Qu", "k", "fox"];
        for text in texts {
            for target in targets {
                for backwards in [false, true] {
                    let folded = ch_search(&chars(target), &chars(text), false, backwards);
                    let upper = ch_search(
                        &upcased(&chars(target)),
                        &upcased(&chars(text)),
                        true,
                        backwards,
                    );
                    assert_eq!(folded, upper, "target {target:?} in {text:?}");
                }
            }
        }
    }
}
