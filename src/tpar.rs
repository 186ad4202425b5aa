//! Trailing parameter substitution.
//!
//! Before a command runs, each of its trailing parameters is resolved to
//! literal text.  A parameter delimited by `?` is asked for, one delimited
//! by `@` is replaced by the text of the named span, and one delimited by
//! `$` is replaced by the answer to an enquiry.  Text wrapped in one of the
//! nested delimiters is unwrapped and resolved again.

use tracing::{trace, warn};

use crate::cmd_attrib::TparInfo;
use crate::cmd_result::CmdFailure;
use crate::edit_mode::EditMode;
use crate::editor::Editor;
use crate::limits::MAX_TPAR_RECURSION;
use crate::span::normalize_name;
use crate::terminal::Terminal;
use crate::trail_param::{TPD_ENVIRONMENT, TPD_LIT, TPD_PROMPT, TPD_SPAN, TrailParam};

fn yes_no(flag: bool) -> String {
    if flag { "Y" } else { "N" }.to_string()
}

impl Editor {
    /// Resolves `tpar` to the text a command acts on.
    pub(crate) fn tpar_get(
        &mut self,
        term: &mut dyn Terminal,
        tpar: &TrailParam,
        info: &TparInfo,
    ) -> Result<TrailParam, CmdFailure> {
        self.tpar_analyse(term, tpar, info, 0)
    }

    fn tpar_analyse(
        &mut self,
        term: &mut dyn Terminal,
        tpar: &TrailParam,
        info: &TparInfo,
        depth: usize,
    ) -> Result<TrailParam, CmdFailure> {
        if depth > MAX_TPAR_RECURSION {
            warn!(depth, "trailing parameter substitution too deep");
            return Err(CmdFailure::TparRecursion);
        }
        if tpar.dlm != TPD_LIT
            && let Some((dlm, inner)) = TrailParam::unwrap_nested(&tpar.content)
        {
            return self.tpar_analyse(term, &TrailParam::new(dlm, inner), info, depth + 1);
        }

        let value = match tpar.dlm {
            TPD_PROMPT => {
                let prompt = if tpar.content.is_empty() {
                    info.prompt
                } else {
                    tpar.content.as_str()
                };
                self.prompt(term, prompt)?
            }
            TPD_SPAN => self.span_value(&tpar.content, info)?,
            TPD_ENVIRONMENT => self.enquire(term, &tpar.content)?,
            _ => return Ok(finish(tpar.clone(), info)),
        };
        trace!(dlm = %tpar.dlm, depth, "parameter substituted");
        match TrailParam::unwrap_nested(&value) {
            Some((dlm, inner)) => {
                self.tpar_analyse(term, &TrailParam::new(dlm, inner), info, depth + 1)
            }
            None => Ok(finish(TrailParam::new(TPD_LIT, value), info)),
        }
    }

    fn span_value(&mut self, name: &str, info: &TparInfo) -> Result<String, CmdFailure> {
        let name = normalize_name(name)?;
        let span = self
            .doc
            .span_named(&name)
            .ok_or(CmdFailure::NoSuchSpan(name))?;
        let mut text = self.doc.span_text(span);
        if self.doc.spans[span].frame.is_some() {
            // A frame span runs to the start of the EOP line.
            text.pop();
        }
        if text.len() > 1 && !info.ml_allowed {
            return Err(CmdFailure::MultiLine);
        }
        Ok(text.join("\n"))
    }

    /// Answers a `$CATEGORY-ITEM` enquiry.
    fn enquire(&mut self, term: &mut dyn Terminal, item: &str) -> Result<String, CmdFailure> {
        let item = item.trim();
        let unknown = || CmdFailure::UnknownEnquiry(item.to_string());
        let (category, name) = item.split_once('-').ok_or_else(unknown)?;
        let category = category.to_uppercase();
        if category == "ENV" {
            return Ok(std::env::var(name).unwrap_or_default());
        }

        let frame = self.doc.current_frame();
        let file_name = |slot: Option<usize>| {
            slot.and_then(|s| self.files.get(s))
                .map(|f| f.path.display().to_string())
                .unwrap_or_default()
        };
        let answer = match (category.as_str(), name.to_uppercase().as_str()) {
            ("TERMINAL", "NAME") => term.name().to_string(),
            ("TERMINAL", "HEIGHT") => term.size().height.to_string(),
            ("TERMINAL", "WIDTH") => term.size().width.to_string(),
            ("TERMINAL", "SPEED") => term.speed().to_string(),
            ("FRAME", "NAME") => self.doc.frame_name(frame).to_string(),
            ("FRAME", "INPUT-FILE") => file_name(self.doc.frame(frame).input_file),
            ("FRAME", "OUTPUT-FILE") => file_name(self.doc.frame(frame).output_file),
            ("FRAME", "MODIFIED") => yes_no(self.doc.frame(frame).text_modified),
            ("LUDWIG", "VERSION") => env!("CARGO_PKG_VERSION").to_string(),
            ("LUDWIG", "OPSYS") => std::env::consts::OS.to_string(),
            ("LUDWIG", "COMMAND-INTRODUCER") => self.keys.introducer().to_string(),
            ("LUDWIG", "INSERT-MODE") => yes_no(self.mode == EditMode::Insert),
            ("LUDWIG", "OVERTYPE-MODE") => yes_no(self.mode == EditMode::Overtype),
            _ => {
                warn!(item, "unknown enquiry");
                return Err(unknown());
            }
        };
        Ok(answer)
    }
}

fn finish(mut tpar: TrailParam, info: &TparInfo) -> TrailParam {
    if info.trim_reply {
        tpar.content = tpar.content.trim().to_uppercase();
    }
    tpar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_attrib::{self, CmdAttrib};
    use crate::code::CmdOp;
    use crate::config::{EditorConfig, RunMode};
    use crate::terminal::MockTerminal;

    fn editor(mode: RunMode) -> Editor {
        Editor::new(EditorConfig::new(mode), Default::default())
    }

    fn info(op: CmdOp) -> TparInfo {
        let attrib: CmdAttrib = cmd_attrib::attrib(op);
        attrib.tpar_info[0]
    }

    fn assign(editor: &mut Editor, name: &str, text: &str) {
        let texts: Vec<String> = text.split('\n').map(str::to_string).collect();
        editor.doc.assign(name, &texts).unwrap();
    }

    #[test]
    fn test_literal_is_unchanged() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        let tpar = TrailParam::new('/', "  text ");
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got, tpar);
    }

    #[test]
    fn test_trim_reply_uppercases() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        let tpar = TrailParam::new('/', "  greet ");
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::SpanJump)).unwrap();
        assert_eq!(got.content, "GREET");
    }

    #[test]
    fn test_span_substitution() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        assign(&mut editor, "GREET", "hi");
        let tpar = TrailParam::new('@', "greet");
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got, TrailParam::new(TPD_LIT, "hi"));

        let nested = TrailParam::new('/', "@GREET@");
        let got = editor.tpar_get(&mut term, &nested, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got.content, "hi");
    }

    #[test]
    fn test_multi_line_span_needs_permission() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        assign(&mut editor, "TWO", "a\nb");
        let tpar = TrailParam::new('@', "two");
        assert_eq!(
            editor.tpar_get(&mut term, &tpar, &info(CmdOp::Get)),
            Err(CmdFailure::MultiLine)
        );
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got.content, "a\nb");
    }

    #[test]
    fn test_one_line_frame_is_single_line_text() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        assert!(editor.execute_text(&mut term, "i/hello/").is_success());
        let tpar = TrailParam::new('@', "ludwig");
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::Get)).unwrap();
        assert_eq!(got.content, "hello");

        assert!(editor.execute_text(&mut term, "zc i/world/").is_success());
        assert_eq!(
            editor.tpar_get(&mut term, &tpar, &info(CmdOp::Get)),
            Err(CmdFailure::MultiLine)
        );
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got.content, "hello\nworld");
    }

    #[test]
    fn test_self_referencing_span_is_bounded() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        assign(&mut editor, "LOOP", "@LOOP@");
        let tpar = TrailParam::new('@', "loop");
        assert_eq!(
            editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)),
            Err(CmdFailure::TparRecursion)
        );
    }

    #[test]
    fn test_prompt_uses_default_text() {
        let mut editor = editor(RunMode::Hardcopy);
        let mut term = MockTerminal::new(80, 24);
        term.push_input("found");
        let got = editor
            .tpar_get(&mut term, &TrailParam::prompt(), &info(CmdOp::Get))
            .unwrap();
        assert_eq!(got.content, "found");
        assert_eq!(term.prompts, vec!["Get     : "]);
    }

    #[test]
    fn test_prompt_in_batch_mode_aborts() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        let result = editor.tpar_get(&mut term, &TrailParam::prompt(), &info(CmdOp::Get));
        assert_eq!(result, Err(CmdFailure::Aborted));
        assert!(editor.aborted);
    }

    #[test]
    fn test_enquiries() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(100, 30);
        let mut ask = |item: &str| {
            editor
                .tpar_get(&mut term, &TrailParam::new('$', item), &info(CmdOp::InsertText))
                .map(|t| t.content)
        };
        assert_eq!(ask("terminal-width").unwrap(), "100");
        assert_eq!(ask("TERMINAL-HEIGHT").unwrap(), "30");
        assert_eq!(ask("TERMINAL-NAME").unwrap(), "mock");
        assert_eq!(ask("FRAME-NAME").unwrap(), "LUDWIG");
        assert_eq!(ask("FRAME-MODIFIED").unwrap(), "N");
        assert_eq!(ask("FRAME-INPUT-FILE").unwrap(), "");
        assert_eq!(ask("LUDWIG-VERSION").unwrap(), env!("CARGO_PKG_VERSION"));
        assert_eq!(ask("LUDWIG-INSERT-MODE").unwrap(), "Y");
        assert_eq!(ask("LUDWIG-COMMAND-INTRODUCER").unwrap(), "ESCAPE");
        assert_eq!(
            ask("LUDWIG-COLOUR"),
            Err(CmdFailure::UnknownEnquiry("LUDWIG-COLOUR".into()))
        );
        assert!(ask("NOCATEGORY").is_err());
    }

    #[test]
    fn test_environment_enquiry_keeps_case() {
        let mut editor = editor(RunMode::Batch);
        let mut term = MockTerminal::new(80, 24);
        let tpar = TrailParam::new('$', "ENV-LUDWIG_SURELY_UNSET_Var");
        let got = editor.tpar_get(&mut term, &tpar, &info(CmdOp::InsertText)).unwrap();
        assert_eq!(got.content, "");
    }
}
