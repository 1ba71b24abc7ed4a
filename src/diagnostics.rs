//! Shared diagnostic sink.
//!
//! Every pass (scanner, parser, resolver, evaluator) reports its errors here.
//! The sink renders them to stderr in the caret format and keeps the two
//! sticky flags the driver consults between phases: `had_error` for
//! compile-time diagnostics and `had_runtime_error` for evaluation failures.
//!
//! The sink is a constructor-injected collaborator, not a process-wide
//! singleton: the REPL creates a fresh one per line, which is what resets the
//! flags between inputs.

use log::debug;

use crate::error::VesperError;

const TAB_WIDTH: usize = 4;

pub struct Reporter {
    file: String,
    lines: Vec<String>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new<S: Into<String>>(file: S, source: &str) -> Self {
        Reporter {
            file: file.into(),
            lines: source.lines().map(str::to_string).collect(),
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Record `err`, set the matching sticky flag, and print the rendered
    /// diagnostic to stderr.
    pub fn report(&mut self, err: &VesperError) {
        debug!("Reporting diagnostic: {}", err);

        if err.is_static() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        eprint!("{}", self.render(err));
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Full diagnostic text: header, location, source excerpt, caret.
    pub fn render(&self, err: &VesperError) -> String {
        let mut out: String = format!("{}\n", err);

        if let Some((line, column)) = err.position() {
            out.push_str(&format!(
                "  At file {}, line {}, column {}\n",
                self.file, line, column
            ));

            if let Some(src_line) = self.lines.get(line.saturating_sub(1)) {
                let expanded: String = src_line.replace('\t', &" ".repeat(TAB_WIDTH));

                out.push_str(&expanded);
                out.push('\n');
                out.push_str(&" ".repeat(column));
                out.push_str("^ HERE\n");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VesperError;
    use crate::token::{Token, TokenType};

    #[test]
    fn render_points_caret_at_column() {
        let reporter = Reporter::new("demo.vsp", "var x = @;\n");
        let err = VesperError::lex(1, 8, "Unexpected character: @");

        assert_eq!(
            reporter.render(&err),
            "Error: Unexpected character: @\n\
             \x20 At file demo.vsp, line 1, column 8\n\
             var x = @;\n\
             \x20       ^ HERE\n"
        );
    }

    #[test]
    fn render_expands_tabs_to_width_four() {
        // The scanner counts a tab as four columns, so the caret lines up
        // against the expanded source text.
        let reporter = Reporter::new("demo.vsp", "\tvar y = ;\n");
        let token = Token::new(TokenType::SEMICOLON, ";".to_string(), 1, 12);
        let err = VesperError::parse(&token, "Expect expression.");

        let rendered = reporter.render(&err);

        assert!(rendered.starts_with("Error at ';': Expect expression.\n"));
        assert!(rendered.contains("    var y = ;\n"));
        assert!(rendered.ends_with("            ^ HERE\n"));
    }

    #[test]
    fn flags_are_sticky_and_kind_specific() {
        let mut reporter = Reporter::new("demo.vsp", "");

        assert!(!reporter.had_error());
        assert!(!reporter.had_runtime_error());

        reporter.report(&VesperError::lex(1, 0, "Unexpected character: $"));

        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());

        let token = Token::new(TokenType::MINUS, "-".to_string(), 1, 0);
        reporter.report(&VesperError::runtime(&token, "Operand must be a number."));

        assert!(reporter.had_error());
        assert!(reporter.had_runtime_error());
    }

    #[test]
    fn error_at_end_header() {
        let reporter = Reporter::new("demo.vsp", "var x = 1");
        let eof = Token::new(TokenType::EOF, String::new(), 1, 9);
        let err = VesperError::parse(&eof, "Expect ';' after variable declaration.");

        assert!(reporter
            .render(&err)
            .starts_with("Error at end: Expect ';' after variable declaration.\n"));
    }
}
