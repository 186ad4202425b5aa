//! Line and group maintenance.
//!
//! These operations keep the group chain of a frame consistent as lines are
//! created, moved between frames and destroyed: each group holds between 1
//! and `MAX_GROUP_LINES` lines, offsets within a group are contiguous, and
//! `first_line_nr` of each group is one past the last line of its
//! predecessor.

use tracing::trace;

use crate::cmd_result::CmdFailure;
use crate::document::{Document, EopLabel, FrameId, Group, GroupId, Line, LineId};
use crate::limits::{LINE_QUANTUM, MAX_GROUP_LINES, MAX_STRLEN};
use crate::strings::ch_length;

impl Document {
    /// Creates a detached chain of `count` empty lines, returning its ends.
    pub fn lines_create(&mut self, count: usize) -> Option<(LineId, LineId)> {
        if count == 0 {
            return None;
        }
        let first = self.lines.alloc(Line::default());
        let mut last = first;
        for _ in 1..count {
            let line = self.lines.alloc(Line::default());
            self.lines[last].flink = Some(line);
            self.lines[line].blink = Some(last);
            last = line;
        }
        Some((first, last))
    }

    /// Creates a detached chain holding `texts`, one line each.
    pub fn lines_from_text<S: AsRef<str>>(
        &mut self,
        texts: &[S],
    ) -> Result<Option<(LineId, LineId)>, CmdFailure> {
        let Some((first, last)) = self.lines_create(texts.len()) else {
            return Ok(None);
        };
        let mut line = first;
        for text in texts {
            let chars: Vec<char> = text.as_ref().chars().collect();
            if let Err(err) = self.line_set_text(line, &chars) {
                self.lines_destroy(first, last)?;
                return Err(err);
            }
            if let Some(next) = self.lines[line].flink {
                line = next;
            }
        }
        Ok(Some((first, last)))
    }

    /// Creates the single group and EOP line of a new frame.
    pub(crate) fn eop_create(&mut self, frame: FrameId) -> (GroupId, LineId) {
        let eop = self.lines.alloc(Line {
            eop: Some(EopLabel::EndOfFile),
            ..Line::default()
        });
        let group = self.groups.alloc(Group {
            flink: None,
            blink: None,
            frame,
            first_line: eop,
            last_line: eop,
            first_line_nr: 1,
            nr_lines: 1,
        });
        self.lines[eop].group = Some(group);
        (group, eop)
    }

    /// Inserts the detached chain `first..=last` immediately before the
    /// attached line `before`.
    pub fn lines_inject(
        &mut self,
        first: LineId,
        last: LineId,
        before: LineId,
    ) -> Result<(), CmdFailure> {
        let end_group = self.lines[before].group.ok_or(CmdFailure::OutOfRange)?;
        let frame = self.groups[end_group].frame;

        let mut count = 0;
        let mut space = 0;
        for line in self.chain(first, last) {
            count += 1;
            space += self.lines[line].len;
        }
        if space > self.frames[frame].space_left {
            return Err(CmdFailure::NoRoom);
        }

        let prev = self.lines[before].blink;
        self.lines[first].blink = prev;
        if let Some(p) = prev {
            self.lines[p].flink = Some(first);
        }
        self.lines[last].flink = Some(before);
        self.lines[before].blink = Some(last);

        let top_group = self.groups[end_group].blink;
        let end_nr = self.groups[end_group].nr_lines;
        let overflow = (end_nr + count).saturating_sub(MAX_GROUP_LINES);
        let free_top = top_group.map_or(0, |g| MAX_GROUP_LINES - self.groups[g].nr_lines);
        let to_top = overflow.min(free_top);
        let mut remaining = overflow - to_top;

        // Lines of end_group ahead of `before`, followed by the new lines.
        let mut cursor = if self.groups[end_group].first_line == before {
            first
        } else {
            self.groups[end_group].first_line
        };
        let mut renumber_from = end_group;

        if let Some(top) = top_group
            && to_top > 0
        {
            for _ in 0..to_top {
                let offset = self.groups[top].nr_lines;
                self.attach_line(cursor, top, offset);
                self.groups[top].nr_lines += 1;
                self.groups[top].last_line = cursor;
                cursor = self.next_line(cursor);
            }
            renumber_from = top;
        }

        let mut prev_group = top_group;
        while remaining > 0 {
            let take = remaining.min(MAX_GROUP_LINES);
            let group = self.groups.alloc(Group {
                flink: Some(end_group),
                blink: prev_group,
                frame,
                first_line: cursor,
                last_line: cursor,
                first_line_nr: 0,
                nr_lines: take,
            });
            match prev_group {
                Some(p) => self.groups[p].flink = Some(group),
                None => self.frames[frame].first_group = group,
            }
            self.groups[end_group].blink = Some(group);
            for offset in 0..take {
                self.attach_line(cursor, group, offset);
                self.groups[group].last_line = cursor;
                cursor = self.next_line(cursor);
            }
            if renumber_from == end_group {
                renumber_from = group;
            }
            prev_group = Some(group);
            remaining -= take;
        }

        self.groups[end_group].first_line = cursor;
        self.groups[end_group].nr_lines = end_nr + count - overflow;
        self.renumber_group_lines(end_group);
        self.renumber_groups(renumber_from);

        self.frames[frame].space_left -= space;
        if self.lines[before].scr_row_nr != 0 && self.frames[frame].scr_top_line != Some(before) {
            self.frames[frame].redraw = true;
        }
        trace!(count, space, "lines injected");
        Ok(())
    }

    /// Detaches `first..=last` from their frame.  The EOP line cannot be
    /// extracted.
    pub fn lines_extract(&mut self, first: LineId, last: LineId) -> Result<(), CmdFailure> {
        let first_group = self.lines[first].group.ok_or(CmdFailure::OutOfRange)?;
        let last_group = self.lines[last].group.ok_or(CmdFailure::OutOfRange)?;
        let frame = self.groups[first_group].frame;

        let mut count = 0;
        let mut space = 0;
        let mut on_screen = false;
        for line in self.chain(first, last) {
            if self.lines[line].is_eop() {
                return Err(CmdFailure::OutOfRange);
            }
            count += 1;
            space += self.lines[line].len;
            on_screen |= self.lines[line].scr_row_nr != 0;
        }

        let prev = self.lines[first].blink;
        let next = self.lines[last].flink.ok_or(CmdFailure::OutOfRange)?;
        if let Some(p) = prev {
            self.lines[p].flink = Some(next);
        }
        self.lines[next].blink = prev;

        let kept_head = self.lines[first].offset_nr;
        let kept_tail = self.groups[last_group].nr_lines - self.lines[last].offset_nr - 1;
        let before_first = self.groups[first_group].blink;

        if first_group == last_group {
            let group = &mut self.groups[first_group];
            group.nr_lines = kept_head + kept_tail;
            if kept_head == 0 {
                group.first_line = next;
            }
            if kept_tail == 0
                && let Some(p) = prev
            {
                group.last_line = p;
            }
        } else {
            let mut middle = self.groups[first_group].flink;
            while let Some(group) = middle
                && group != last_group
            {
                middle = self.groups[group].flink;
                self.group_remove(group);
            }
            self.groups[first_group].nr_lines = kept_head;
            if let Some(p) = prev
                && kept_head > 0
            {
                self.groups[first_group].last_line = p;
            }
            self.groups[last_group].nr_lines = kept_tail;
            self.groups[last_group].first_line = next;
        }

        let mut touched = vec![first_group];
        if last_group != first_group {
            touched.push(last_group);
        }
        for group in touched {
            if self.groups[group].nr_lines == 0 {
                self.group_remove(group);
            } else {
                self.renumber_group_lines(group);
            }
        }
        let start = match before_first {
            Some(g) => self.groups[g].flink,
            None => Some(self.frames[frame].first_group),
        };
        if let Some(start) = start {
            self.renumber_groups(start);
        }

        self.lines[first].blink = None;
        self.lines[last].flink = None;
        for line in self.chain(first, last) {
            self.lines[line].group = None;
            self.lines[line].offset_nr = 0;
            self.lines[line].scr_row_nr = 0;
        }

        self.frames[frame].space_left += space;
        if on_screen {
            self.frames[frame].redraw = true;
        }
        trace!(count, space, "lines extracted");
        Ok(())
    }

    /// Frees the detached chain `first..=last`.  Marks still on the lines
    /// are freed with them.
    pub fn lines_destroy(&mut self, first: LineId, last: LineId) -> Result<(), CmdFailure> {
        if self.lines[first].group.is_some() {
            return Err(CmdFailure::OutOfRange);
        }
        for line in self.chain(first, last) {
            if let Some(removed) = self.lines.free(line) {
                for mark in removed.marks {
                    self.marks.free(mark);
                }
            }
        }
        Ok(())
    }

    /// Resizes the text buffer of `line` to hold at least `new_len`
    /// characters.  Capacity is rounded up to a multiple of
    /// `LINE_QUANTUM`; a length of zero releases the buffer.
    pub fn line_change_length(&mut self, line: LineId, new_len: usize) -> Result<(), CmdFailure> {
        if new_len > MAX_STRLEN {
            return Err(CmdFailure::NoRoom);
        }
        let capacity = if new_len == 0 {
            0
        } else {
            new_len.div_ceil(LINE_QUANTUM).saturating_mul(LINE_QUANTUM).min(MAX_STRLEN)
        };
        let old = self.lines[line].len;
        if capacity == old {
            return Ok(());
        }
        if let Some(frame) = self.frame_of_line(line) {
            let space_left = self.frames[frame].space_left;
            if capacity > old && capacity - old > space_left {
                return Err(CmdFailure::NoRoom);
            }
            self.frames[frame].space_left = space_left + old - capacity;
        }
        let entry = &mut self.lines[line];
        entry.len = capacity;
        if capacity == 0 {
            entry.text = None;
            entry.used = 0;
        } else {
            entry.text.get_or_insert_with(Vec::new).resize(capacity, ' ');
            entry.used = entry.used.min(capacity);
        }
        Ok(())
    }

    /// Replaces the text of `line`.
    pub fn line_set_text(&mut self, line: LineId, chars: &[char]) -> Result<(), CmdFailure> {
        let used = ch_length(chars);
        if used > self.lines[line].len {
            self.line_change_length(line, used)?;
        }
        let entry = &mut self.lines[line];
        if let Some(text) = entry.text.as_mut() {
            text.fill(' ');
            text[..used].copy_from_slice(&chars[..used]);
        }
        entry.used = used;
        Ok(())
    }

    /// Recomputes `used` after the buffer was written directly.
    pub(crate) fn line_trim(&mut self, line: LineId) {
        let entry = &mut self.lines[line];
        entry.used = entry.text.as_deref().map_or(0, ch_length);
    }

    pub fn line_text(&self, line: LineId) -> String {
        self.lines[line].chars().iter().collect()
    }

    /// 1-based number of `line` in its frame.
    pub fn line_to_number(&self, line: LineId) -> Option<usize> {
        let group = self.lines[line].group?;
        Some(self.groups[group].first_line_nr + self.lines[line].offset_nr)
    }

    /// The line numbered `n` in `frame`, the EOP line included.
    pub fn line_from_number(&self, frame: FrameId, n: usize) -> Option<LineId> {
        if n == 0 {
            return None;
        }
        let mut group = self.frames[frame].last_group;
        while self.groups[group].first_line_nr > n {
            group = self.groups[group].blink?;
        }
        let offset = n - self.groups[group].first_line_nr;
        if offset >= self.groups[group].nr_lines {
            return None;
        }
        let mut line = self.groups[group].first_line;
        for _ in 0..offset {
            line = self.lines[line].flink?;
        }
        Some(line)
    }

    pub fn frame_of_line(&self, line: LineId) -> Option<FrameId> {
        self.lines[line].group.map(|g| self.groups[g].frame)
    }

    pub fn first_line(&self, frame: FrameId) -> LineId {
        self.groups[self.frames[frame].first_group].first_line
    }

    pub fn eop_line(&self, frame: FrameId) -> LineId {
        self.groups[self.frames[frame].last_group].last_line
    }

    /// Number of lines in `frame`, the EOP line included.
    pub fn total_lines(&self, frame: FrameId) -> usize {
        let last = &self.groups[self.frames[frame].last_group];
        last.first_line_nr + last.nr_lines - 1
    }

    /// The lines from `first` to `last` inclusive, following forward links.
    pub fn chain(&self, first: LineId, last: LineId) -> Vec<LineId> {
        let mut out = Vec::new();
        let mut line = Some(first);
        while let Some(l) = line {
            out.push(l);
            if l == last {
                break;
            }
            line = self.lines[l].flink;
        }
        out
    }

    fn next_line(&self, line: LineId) -> LineId {
        self.lines[line].flink.unwrap_or(line)
    }

    fn attach_line(&mut self, line: LineId, group: GroupId, offset: usize) {
        self.lines[line].group = Some(group);
        self.lines[line].offset_nr = offset;
    }

    fn renumber_group_lines(&mut self, group: GroupId) {
        let mut line = self.groups[group].first_line;
        let count = self.groups[group].nr_lines;
        for offset in 0..count {
            self.attach_line(line, group, offset);
            self.groups[group].last_line = line;
            line = self.next_line(line);
        }
    }

    fn renumber_groups(&mut self, start: GroupId) {
        let mut nr = match self.groups[start].blink {
            Some(prev) => self.groups[prev].first_line_nr + self.groups[prev].nr_lines,
            None => 1,
        };
        let mut group = Some(start);
        while let Some(g) = group {
            self.groups[g].first_line_nr = nr;
            nr += self.groups[g].nr_lines;
            group = self.groups[g].flink;
        }
    }

    fn group_remove(&mut self, group: GroupId) {
        let Some(removed) = self.groups.free(group) else {
            return;
        };
        if let Some(prev) = removed.blink {
            self.groups[prev].flink = removed.flink;
        }
        if let Some(next) = removed.flink {
            self.groups[next].blink = removed.blink;
        }
        let frame = &mut self.frames[removed.frame];
        if frame.first_group == group
            && let Some(next) = removed.flink
        {
            frame.first_group = next;
        }
        if frame.last_group == group
            && let Some(prev) = removed.blink
        {
            frame.last_group = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::DEFAULT_SPACE_LIMIT;

    fn doc() -> Document {
        Document::new(DEFAULT_SPACE_LIMIT, 80)
    }

    /// Checks the structural invariants of every group of `frame`.
    fn check_frame(doc: &Document, frame: FrameId) {
        let mut group = Some(doc.frame(frame).first_group);
        let mut expected_nr = 1;
        let mut prev: Option<GroupId> = None;
        let mut used_space = 0;
        while let Some(g) = group {
            let entry = &doc.groups[g];
            assert_eq!(entry.blink, prev);
            assert_eq!(entry.frame, frame);
            assert!(entry.nr_lines >= 1 && entry.nr_lines <= MAX_GROUP_LINES);
            assert_eq!(entry.first_line_nr, expected_nr);
            let mut line = entry.first_line;
            for offset in 0..entry.nr_lines {
                assert_eq!(doc.lines[line].group, Some(g));
                assert_eq!(doc.lines[line].offset_nr, offset);
                used_space += doc.lines[line].len;
                if offset + 1 < entry.nr_lines {
                    line = doc.lines[line].flink.expect("chain ends inside group");
                }
            }
            assert_eq!(entry.last_line, line);
            expected_nr += entry.nr_lines;
            prev = Some(g);
            group = entry.flink;
        }
        assert_eq!(prev, Some(doc.frame(frame).last_group));
        assert!(doc.lines[doc.eop_line(frame)].is_eop());
        let f = doc.frame(frame);
        assert_eq!(f.space_limit - f.space_left, used_space);
    }

    fn inject_text(doc: &mut Document, frame: FrameId, before: LineId, texts: &[String]) {
        let (first, last) = doc.lines_from_text(texts).unwrap().unwrap();
        doc.lines_inject(first, last, before).unwrap();
        check_frame(doc, frame);
    }

    #[test]
    fn test_new_frame_has_only_eop() {
        let doc = doc();
        let frame = doc.current_frame();
        check_frame(&doc, frame);
        assert_eq!(doc.total_lines(frame), 1);
        assert_eq!(doc.first_line(frame), doc.eop_line(frame));
    }

    #[test]
    fn test_inject_small_chain() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &["one".into(), "two".into()]);
        assert_eq!(doc.frame_text(frame), "one\ntwo");
        assert_eq!(doc.total_lines(frame), 3);
        let two = doc.line_from_number(frame, 2).unwrap();
        assert_eq!(doc.line_text(two), "two");
        assert_eq!(doc.line_to_number(two), Some(2));
    }

    #[test]
    fn test_inject_spills_into_new_groups() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let texts: Vec<String> = (1..=300).map(|i| format!("line {i}")).collect();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &texts);
        assert_eq!(doc.total_lines(frame), 301);
        for n in [1, 64, 65, 200, 300] {
            let line = doc.line_from_number(frame, n).unwrap();
            assert_eq!(doc.line_text(line), format!("line {n}"));
            assert_eq!(doc.line_to_number(line), Some(n));
        }
        assert_eq!(doc.line_from_number(frame, 302), None);
    }

    #[test]
    fn test_inject_in_middle_of_full_group() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let texts: Vec<String> = (1..=100).map(|i| i.to_string()).collect();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &texts);
        let before = doc.line_from_number(frame, 30).unwrap();
        let extra: Vec<String> = (0..70).map(|i| format!("x{i}")).collect();
        inject_text(&mut doc, frame, before, &extra);
        assert_eq!(doc.total_lines(frame), 171);
        let l30 = doc.line_from_number(frame, 30).unwrap();
        assert_eq!(doc.line_text(l30), "x0");
        let l100 = doc.line_from_number(frame, 100).unwrap();
        assert_eq!(doc.line_text(l100), "30");
    }

    #[test]
    fn test_extract_and_reinject_into_other_frame() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let oops = doc.frame_oops;
        let texts: Vec<String> = (1..=150).map(|i| i.to_string()).collect();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &texts);

        let first = doc.line_from_number(frame, 10).unwrap();
        let last = doc.line_from_number(frame, 140).unwrap();
        doc.lines_extract(first, last).unwrap();
        check_frame(&doc, frame);
        assert_eq!(doc.total_lines(frame), 20);
        let l10 = doc.line_from_number(frame, 10).unwrap();
        assert_eq!(doc.line_text(l10), "141");

        let oops_eop = doc.eop_line(oops);
        doc.lines_inject(first, last, oops_eop).unwrap();
        check_frame(&doc, oops);
        assert_eq!(doc.total_lines(oops), 132);
    }

    #[test]
    fn test_extract_whole_text_leaves_eop() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &["a".into(), "b".into()]);
        let first = doc.first_line(frame);
        let last = doc.line_from_number(frame, 2).unwrap();
        doc.lines_extract(first, last).unwrap();
        check_frame(&doc, frame);
        assert_eq!(doc.total_lines(frame), 1);
        doc.lines_destroy(first, last).unwrap();
        assert!(!doc.lines.contains(first));
    }

    #[test]
    fn test_eop_cannot_be_extracted() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        assert_eq!(doc.lines_extract(eop, eop), Err(CmdFailure::OutOfRange));
    }

    #[test]
    fn test_line_change_length_quantizes() {
        let mut doc = doc();
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        inject_text(&mut doc, frame, eop, &["".into()]);
        let line = doc.first_line(frame);
        let before = doc.frame(frame).space_left;
        doc.line_change_length(line, 13).unwrap();
        assert_eq!(doc.lines[line].len, 20);
        assert_eq!(doc.frame(frame).space_left, before - 20);
        doc.line_change_length(line, 0).unwrap();
        assert!(doc.lines[line].text.is_none());
        assert_eq!(doc.lines[line].len, 0);
        assert_eq!(doc.frame(frame).space_left, before);
        assert_eq!(
            doc.line_change_length(line, MAX_STRLEN + 1),
            Err(CmdFailure::NoRoom)
        );
    }

    #[test]
    fn test_inject_respects_space_limit() {
        let mut doc = Document::new(30, 80);
        let frame = doc.current_frame();
        let eop = doc.eop_line(frame);
        let (first, last) = doc
            .lines_from_text(&["0123456789", "0123456789", "0123456789", "x"])
            .unwrap()
            .unwrap();
        assert_eq!(doc.lines_inject(first, last, eop), Err(CmdFailure::NoRoom));
    }

    #[test]
    fn test_over_long_text_releases_chain() {
        let mut doc = doc();
        let lines_before = doc.lines.len();
        let long = "x".repeat(MAX_STRLEN + 1);
        let texts = ["short".to_string(), long, "after".to_string()];
        assert_eq!(doc.lines_from_text(&texts), Err(CmdFailure::NoRoom));
        assert_eq!(doc.lines.len(), lines_before);
    }

    #[test]
    fn test_line_numbers_round_trip_after_many_edits() {
        let mut doc = doc();
        let frame = doc.current_frame();
        for round in 0..20 {
            let n = doc.total_lines(frame);
            let before = doc.line_from_number(frame, 1 + (round * 7) % n).unwrap();
            let texts: Vec<String> = (0..(round * 5 + 1)).map(|i| format!("{round}-{i}")).collect();
            inject_text(&mut doc, frame, before, &texts);
            if round % 3 == 2 {
                let first = doc.line_from_number(frame, 2).unwrap();
                let last = doc.line_from_number(frame, 2 + round).unwrap();
                doc.lines_extract(first, last).unwrap();
                check_frame(&doc, frame);
                doc.lines_destroy(first, last).unwrap();
            }
        }
        for k in 1..=doc.total_lines(frame) {
            let line = doc.line_from_number(frame, k).unwrap();
            assert_eq!(doc.line_to_number(line), Some(k));
        }
    }
}
