//! Redirections and here-documents.

use crate::ast::Token;
use crate::core::{Failure, PResult, Parser, Reason};
use crate::diagnostics::Severity;

/// File-operator spellings, longest first so `>>`/`<&` etc. are matched
/// before their single-char prefixes.
const FILE_OPS: &[&str] = &["<&", ">&", ">>", "<>", ">|", "<", ">"];

impl Parser {
    /// Parses one redirection: an optional leading fd-number, then either
    /// a here-string, a here-document, or a file redirection. Returns
    /// `None` if nothing here looks like a redirection at all.
    pub fn redirection(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let mark = self.mark();

        let fd = self.leading_fd_number();

        if self.try_literal("<<<") {
            self.spacing();
            let word = self.normal_word()?.ok_or_else(|| Failure {
                position: self.position(),
                reason: Reason::Custom("expected a word after '<<<'".into()),
            })?;
            let id = self.fresh_id_at(start);
            let here_string = Token::HereString(id, Box::new(word));
            let fd_id = self.fresh_id_at(start);
            return Ok(Some(Token::FdRedirect(fd_id, fd, Box::new(here_string))));
        }

        if self.peek() == Some('<') && self.peek_at(1) == Some('<') {
            let token = self.here_document(start, fd)?;
            return Ok(Some(token));
        }

        if let Some(op) = self.match_file_op() {
            self.spacing();
            let file = self.normal_word()?.ok_or_else(|| Failure {
                position: self.position(),
                reason: Reason::Custom(format!("expected a filename after '{op}'")),
            })?;
            let io_id = self.fresh_id_at(start);
            let io_file = Token::IoFile(io_id, op, Box::new(file));
            let fd_id = self.fresh_id_at(start);
            return Ok(Some(Token::FdRedirect(fd_id, fd, Box::new(io_file))));
        }

        self.reset(mark);
        Ok(None)
    }

    /// Decimal digits immediately before a redirection operator, e.g. the
    /// `2` in `2>&1`.
    fn leading_fd_number(&mut self) -> Option<String> {
        let mark = self.mark();
        let mut digits = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            digits.push(self.advance().unwrap());
        }
        if digits.is_empty() {
            return None;
        }
        let next_is_redir_start = matches!(self.peek(), Some('<') | Some('>'));
        if !next_is_redir_start {
            self.reset(mark);
            return None;
        }
        Some(digits)
    }

    fn match_file_op(&mut self) -> Option<String> {
        let mut ops: Vec<&&str> = FILE_OPS.iter().collect();
        ops.sort_by_key(|op| std::cmp::Reverse(op.len()));
        for op in ops {
            if self.try_literal(op) {
                return Some((*op).to_string());
            }
        }
        None
    }

    /// `<<` or `<<-`, followed by the end-token and, ultimately, the
    /// here-doc body. Because the body lives on subsequent lines, this
    /// reads past the rest of the current logical line greedily up to the
    /// newline, then captures the body itself.
    fn here_document(&mut self, start: crate::source::Position, fd: Option<String>) -> PResult<Token> {
        self.advance();
        self.advance();
        let dashed = self.eat('-');
        self.spacing();

        let (end_token, quoted) = self.here_doc_end_token()?;

        // Scan to the end of the current line; the body starts on the
        // next line. Whatever else is on this line (more words,
        // operators) is the caller's concern: the cursor is simply
        // advanced past the remaining characters on the line, since this
        // routine owns consuming up through the body.
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
        }
        if self.peek() == Some('\n') {
            self.advance();
        }

        let body = self.here_doc_body(&end_token, dashed)?;

        let id = self.fresh_id_at(start);
        let here_doc = Token::HereDoc(id, dashed, quoted, body);
        let fd_id = self.fresh_id_at(start);
        Ok(Token::FdRedirect(fd_id, fd, Box::new(here_doc)))
    }

    /// The end-token is read as a normal literal (parameter expansion
    /// still enabled in the body) or as a quoted literal (fully literal
    /// body). Either way only its textual content is retained here.
    fn here_doc_end_token(&mut self) -> PResult<(String, bool)> {
        match self.peek() {
            Some('\'') => {
                self.advance();
                let mut text = String::new();
                loop {
                    match self.peek() {
                        Some('\'') => {
                            self.advance();
                            break;
                        }
                        Some(c) => {
                            text.push(c);
                            self.advance();
                        }
                        None => {
                            return Err(Failure {
                                position: self.position(),
                                reason: Reason::UnclosedSingleQuote,
                            });
                        }
                    }
                }
                Ok((text, true))
            }
            Some('"') => {
                self.advance();
                let mut text = String::new();
                loop {
                    match self.peek() {
                        Some('"') => {
                            self.advance();
                            break;
                        }
                        Some('\\') => {
                            self.advance();
                            if let Some(c) = self.peek() {
                                text.push(c);
                                self.advance();
                            }
                        }
                        Some(c) => {
                            text.push(c);
                            self.advance();
                        }
                        None => {
                            return Err(Failure {
                                position: self.position(),
                                reason: Reason::UnclosedDoubleQuote,
                            });
                        }
                    }
                }
                Ok((text, true))
            }
            _ => {
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    if c == '\\' {
                        self.advance();
                        if let Some(escaped) = self.peek() {
                            text.push(escaped);
                            self.advance();
                        }
                        continue;
                    }
                    text.push(c);
                    self.advance();
                }
                if text.is_empty() {
                    return Err(Failure {
                        position: self.position(),
                        reason: Reason::Custom("expected a here-document end token".into()),
                    });
                }
                Ok((text, false))
            }
        }
    }

    /// Reads lines up to and including one whose trimmed content equals
    /// `end_token` and is followed by whitespace or EOF, diagnosing the
    /// indentation rules and an absent end-token best-effort.
    fn here_doc_body(&mut self, end_token: &str, dashed: bool) -> PResult<String> {
        let mut body = String::new();
        loop {
            let line_start = self.mark();
            let indent_start = self.position();
            let mut indent = String::new();
            while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
                indent.push(self.advance().unwrap());
            }
            let mut rest = String::new();
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                rest.push(c);
                self.advance();
            }
            let had_newline = self.peek() == Some('\n');
            if had_newline {
                self.advance();
            }

            if rest == end_token {
                if !dashed && !indent.is_empty() {
                    self.note_at(
                        indent_start,
                        Severity::Error,
                        "Use <<- instead of << if you want to indent the end token.",
                    );
                } else if dashed && indent.contains(' ') {
                    self.note_at(
                        indent_start,
                        Severity::Error,
                        "When using <<-, you can only indent with tabs.",
                    );
                }
                return Ok(body);
            }

            if !had_newline && self.at_eof() {
                self.reset(line_start);
                return self.here_doc_missing_end(end_token, body);
            }

            body.push_str(&indent);
            body.push_str(&rest);
            body.push('\n');
        }
    }

    fn here_doc_missing_end(&mut self, end_token: &str, mut body: String) -> PResult<String> {
        while let Some(c) = self.peek() {
            body.push(c);
            self.advance();
        }
        let lower_token = end_token.to_lowercase();
        let found_elsewhere = body.lines().any(|l| l.trim() == end_token);
        let found_case_insensitive = body.lines().any(|l| l.trim().to_lowercase() == lower_token);
        if found_elsewhere {
            self.note_here(
                Severity::Error,
                format!("Found {end_token} further down, but not by itself at the start of the line."),
            );
        } else if found_case_insensitive {
            self.note_here(
                Severity::Error,
                format!("Found {end_token} further down, but with wrong casing."),
            );
        } else {
            self.note_here(Severity::Error, format!("Couldn't find end token '{end_token}'."));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParserConfig;
    use assert_matches::assert_matches;
    use std::rc::Rc;

    fn parser(s: &str) -> Parser {
        Parser::new(Rc::from("t"), s, ParserConfig::new())
    }

    #[test]
    fn here_doc_body_runs_up_to_unindented_end_token() {
        let mut p = parser("<< foo\nlol\ncow\nfoo");
        let redir = p.redirection().unwrap().unwrap();
        let (_, notes) = p.into_state().into_parts();
        assert_eq!(notes, Vec::new());
        assert_matches!(redir, Token::FdRedirect(_, None, target) => {
            assert_matches!(*target, Token::HereDoc(_, false, false, body) => {
                assert_eq!(body, "lol\ncow\n");
            });
        });
    }

    /// A space-indented end token under `<<-` is an error (only tabs are
    /// allowed).
    #[test]
    fn dashed_here_doc_rejects_space_indentation() {
        let mut p = parser("<<- EOF\n  cow\n  EOF");
        p.redirection().unwrap().unwrap();
        let (_, notes) = p.into_state().into_parts();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("only indent with tabs"));
    }

    #[test]
    fn undashed_here_doc_with_indented_end_token_is_an_error() {
        let mut p = parser("<< EOF\ncow\n  EOF");
        p.redirection().unwrap().unwrap();
        let (_, notes) = p.into_state().into_parts();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("Use <<- instead of <<"));
    }

    #[test]
    fn quoted_end_token_marks_here_doc_as_quoted() {
        let mut p = parser("<< 'EOF'\n$x\nEOF");
        let redir = p.redirection().unwrap().unwrap();
        assert_matches!(redir, Token::FdRedirect(_, None, target) => {
            assert_matches!(*target, Token::HereDoc(_, false, true, body) => {
                assert_eq!(body, "$x\n");
            });
        });
    }

    #[test]
    fn here_string_wraps_a_normal_word() {
        let mut p = parser("<<< \"$x\"");
        let redir = p.redirection().unwrap().unwrap();
        assert_matches!(redir, Token::FdRedirect(_, None, target) => {
            assert_matches!(*target, Token::HereString(..));
        });
    }

    #[test]
    fn leading_fd_number_is_captured() {
        let mut p = parser("2>&1");
        let redir = p.redirection().unwrap().unwrap();
        assert_matches!(redir, Token::FdRedirect(_, Some(fd), target) => {
            assert_eq!(fd, "2");
            assert_matches!(*target, Token::IoFile(_, op, _) if op == ">&");
        });
    }

    #[test]
    fn missing_end_token_is_diagnosed_best_effort() {
        let mut p = parser("<< EOF\none\ntwo\n");
        p.redirection().unwrap().unwrap();
        let (_, notes) = p.into_state().into_parts();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("Couldn't find end token"));
    }

    #[test]
    fn not_a_redirection_returns_none() {
        let mut p = parser("echo hi");
        assert!(p.redirection().unwrap().is_none());
    }
}
