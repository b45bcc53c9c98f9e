//! Word grammar: quoted/unquoted word parts and their composition into
//! [`NormalWord`](crate::ast::Token::NormalWord)s.
//!
//! The alternation order at each word part is fixed: single-quoted,
//! double-quoted, extglob, dollar-form, brace-expansion, back-ticked,
//! normal literal. Every sub-rule peeks its own opening delimiter before
//! allocating an [`Id`](crate::ast::Id) or consuming anything, so a
//! mismatched delimiter costs nothing and the ordered choice falls
//! straight through to the next alternative — no `attempt` wrapper is
//! needed once a rule has committed past its opening delimiter, any
//! failure from then on is a genuine [`Failure`].

use crate::ast::Token;
use crate::core::{Failure, PResult, Parser, Reason};
use crate::diagnostics::Severity;
use crate::lexer::{is_extglob_start, is_quotable, is_variable_start};
use crate::source::Position;

/// Characters that terminate an unquoted normal word when not escaped.
fn is_word_delimiter(c: char) -> bool {
    is_quotable(c)
}

impl Parser {
    /// Parses a `NormalWord`: one-or-more word parts. Returns `Ok(None)`
    /// if zero parts could be parsed here: `NormalWord.parts` is always
    /// non-empty, so an empty result means "no word here" rather than an
    /// empty `NormalWord`.
    pub fn normal_word(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let mut parts = Vec::new();
        while let Some(part) = self.word_part()? {
            parts.push(part);
        }
        if parts.is_empty() {
            return Ok(None);
        }
        let id = self.fresh_id_at(start);
        let word = Token::NormalWord(id, parts);
        self.check_possible_termination(id, &word);
        Ok(Some(word))
    }

    /// After building a `NormalWord`, if it is exactly `[Literal "X"]` for
    /// a reserved-word-shaped `X`, warn that a separator is likely
    /// missing. Deliberately narrow: richer shapes such as a quoted
    /// `"done"` are not flagged.
    fn check_possible_termination(&mut self, id: crate::ast::Id, word: &Token) {
        const SHAPES: [&str; 6] = ["do", "done", "then", "fi", "esac", "}"];
        if let Token::NormalWord(_, parts) = word {
            if let [Token::Literal(_, text)] = parts.as_slice() {
                if SHAPES.contains(&text.as_str()) {
                    self.attach_note(
                        id,
                        Severity::Warning,
                        format!(
                            "Use semicolon or linefeed before '{text}' (or quote to make it literal)."
                        ),
                    );
                }
            }
        }
    }

    fn word_part(&mut self) -> PResult<Option<Token>> {
        const PRODUCTIONS: [fn(&mut Parser) -> PResult<Option<Token>>; 6] = [
            Parser::single_quoted,
            Parser::double_quoted,
            Parser::extglob,
            Parser::dollar_form,
            Parser::brace_expansion,
            Parser::backquoted,
        ];
        for production in PRODUCTIONS {
            if let Some(token) = production(self)? {
                return Ok(Some(token));
            }
        }
        self.normal_literal()
    }

    // --- single-quoted ----------------------------------------------------

    fn single_quoted(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('\'') {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        let id = self.fresh_id_at(opening);
        let mut content = String::new();
        let mut last_was_alpha = false;
        loop {
            match self.peek() {
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    content.push(c);
                    last_was_alpha = c.is_alphabetic();
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
        if last_was_alpha && self.peek().is_some_and(char::is_alphabetic) {
            self.attach_note(
                id,
                Severity::Warning,
                "This apostrophe terminated the single quoted string!",
            );
        }
        Ok(Some(Token::SingleQuoted(id, content)))
    }

    // --- double-quoted ----------------------------------------------------

    fn double_quoted(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('"') {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        let id = self.fresh_id_at(opening);
        let mut parts = Vec::new();
        let mut buf = String::new();
        let mut buf_start = None;
        loop {
            match self.peek() {
                Some('"') => {
                    self.flush_literal(&mut parts, &mut buf, &mut buf_start);
                    self.advance();
                    break;
                }
                None => {
                    self.flush_literal(&mut parts, &mut buf, &mut buf_start);
                    return Err(Failure {
                        position: self.position(),
                        reason: Reason::UnclosedDoubleQuote,
                    });
                }
                Some('$') => match self.dollar_form()? {
                    Some(token) => {
                        self.flush_literal(&mut parts, &mut buf, &mut buf_start);
                        parts.push(token);
                    }
                    None => unreachable!("dollar_form always matches on '$'"),
                },
                Some('`') => match self.backquoted()? {
                    Some(token) => {
                        self.flush_literal(&mut parts, &mut buf, &mut buf_start);
                        parts.push(token);
                    }
                    None => unreachable!("backquoted always matches on '`'"),
                },
                Some('\\') => {
                    if buf.is_empty() {
                        buf_start = Some(self.position());
                    }
                    self.advance();
                    match self.peek() {
                        Some(c @ ('"' | '$' | '`' | '\\')) => {
                            buf.push(c);
                            self.advance();
                        }
                        Some(c) => {
                            buf.push('\\');
                            buf.push(c);
                            self.advance();
                        }
                        None => buf.push('\\'),
                    }
                }
                Some(c) => {
                    if buf.is_empty() {
                        buf_start = Some(self.position());
                    }
                    buf.push(c);
                    self.advance();
                }
            }
        }
        Ok(Some(Token::DoubleQuoted(id, parts)))
    }

    fn flush_literal(&mut self, parts: &mut Vec<Token>, buf: &mut String, start: &mut Option<Position>) {
        if !buf.is_empty() {
            let id = self.fresh_id_at(start.take().unwrap());
            parts.push(Token::Literal(id, std::mem::take(buf)));
        }
    }

    // --- back-quoted --------------------------------------------------

    fn backquoted(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('`') {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        let id = self.fresh_id_at(opening);
        self.attach_note(
            id,
            Severity::Info,
            "Ignoring deprecated backtick expansion. Use $(..) instead.",
        );
        let mut content = String::new();
        loop {
            match self.peek() {
                Some('`') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    content.push('\\');
                    self.advance();
                    if let Some(c) = self.peek() {
                        content.push(c);
                        self.advance();
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
                None => {
                    return Err(Failure {
                        position: self.position(),
                        reason: Reason::UnclosedBackquote,
                    });
                }
            }
        }
        let body = self.with_nested_source(&content, |p| p.parse_embedded_list());
        Ok(Some(Token::DollarExpansion(id, body)))
    }

    // --- dollar forms ----------------------------------------------------

    fn dollar_form(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('$') {
            return Ok(None);
        }
        if let Some(token) = self.dollar_arithmetic()? {
            return Ok(Some(token));
        }
        if let Some(token) = self.dollar_parameter()? {
            return Ok(Some(token));
        }
        if let Some(token) = self.dollar_command_expansion()? {
            return Ok(Some(token));
        }
        Ok(Some(self.dollar_lonely()))
    }

    fn dollar_arithmetic(&mut self) -> PResult<Option<Token>> {
        if !(self.peek() == Some('$') && self.peek_at(1) == Some('(') && self.peek_at(2) == Some('('))
        {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        self.advance();
        self.advance();
        let id = self.fresh_id_at(opening);
        let expr = self.arithmetic_expr_until_double_close()?;
        Ok(Some(Token::DollarArithmetic(id, Box::new(expr))))
    }

    /// `${...}` or the brace-less forms `$name`, `$1`, `$@`, `$*`, ... The
    /// braced interior is kept as a generic literal scan, not a
    /// structured re-parse of nested expansions.
    fn dollar_parameter(&mut self) -> PResult<Option<Token>> {
        debug_assert_eq!(self.peek(), Some('$'));
        if self.peek_at(1) == Some('{') {
            let opening = self.position();
            self.advance();
            self.advance();
            let id = self.fresh_id_at(opening);
            let mut name = String::new();
            let mut depth = 1u32;
            loop {
                match self.peek() {
                    Some('{') => {
                        depth += 1;
                        name.push('{');
                        self.advance();
                    }
                    Some('}') => {
                        depth -= 1;
                        self.advance();
                        if depth == 0 {
                            break;
                        }
                        name.push('}');
                    }
                    Some('\\') => {
                        name.push('\\');
                        self.advance();
                        if let Some(c) = self.peek() {
                            name.push(c);
                            self.advance();
                        }
                    }
                    Some(c) => {
                        name.push(c);
                        self.advance();
                    }
                    None => {
                        return Err(Failure {
                            position: self.position(),
                            reason: Reason::UnclosedParam,
                        });
                    }
                }
            }
            return Ok(Some(Token::DollarBraced(id, name)));
        }

        let bare = match self.peek_at(1) {
            Some(c) if c.is_ascii_digit() => Some((c.to_string(), 1)),
            Some(c) if is_variable_start(c) => {
                let mut name = String::new();
                let mut offset = 1;
                while let Some(c) = self.peek_at(offset) {
                    if crate::lexer::is_variable_char(c) {
                        name.push(c);
                        offset += 1;
                    } else {
                        break;
                    }
                }
                Some((name, offset - 1))
            }
            Some(c) if crate::lexer::is_special_variable(c) => Some((c.to_string(), 1)),
            _ => None,
        };
        let Some((name, len)) = bare else { return Ok(None) };
        let opening = self.position();
        self.advance();
        let id = self.fresh_id_at(opening);
        for _ in 0..len {
            self.advance();
        }
        if name.chars().next().is_some_and(|c| c.is_ascii_digit() || crate::lexer::is_special_variable(c))
            && self.peek().is_some_and(|c| c.is_ascii_digit())
        {
            self.attach_note(
                id,
                Severity::Error,
                format!("`${name}...` is equivalent to `${{{name}}}...`."),
            );
        }
        Ok(Some(Token::DollarBraced(id, name)))
    }

    fn dollar_command_expansion(&mut self) -> PResult<Option<Token>> {
        if !(self.peek() == Some('$') && self.peek_at(1) == Some('(')) {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        self.advance();
        let id = self.fresh_id_at(opening);
        let body = self.parse_list_until(|p| p.peek() == Some(')'))?;
        if !self.eat(')') {
            return Err(Failure {
                position: self.position(),
                reason: Reason::UnclosedCommandSubstitution,
            });
        }
        Ok(Some(Token::DollarExpansion(id, body)))
    }

    fn dollar_lonely(&mut self) -> Token {
        let opening = self.position();
        self.advance();
        let id = self.fresh_id_at(opening);
        if self.peek() != Some('\'') {
            self.attach_note(
                id,
                Severity::Style,
                "$ is not followed by a variable or expansion; did you mean to escape it with \\$?",
            );
        }
        Token::Literal(id, "$".to_string())
    }

    // --- brace expansion ----------------------------------------------------

    fn brace_expansion(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('{') {
            return Ok(None);
        }
        let start_mark = self.mark();
        let opening = self.position();
        self.advance();
        let mut text = String::new();
        let mut ok = false;
        loop {
            match self.peek() {
                Some('"') => {
                    match self.double_quoted()? {
                        Some(Token::DoubleQuoted(_, parts)) => {
                            text.push('"');
                            for part in &parts {
                                if let Token::Literal(_, s) = part {
                                    text.push_str(s);
                                }
                            }
                            text.push('"');
                        }
                        _ => unreachable!(),
                    }
                }
                Some('}') => {
                    self.advance();
                    ok = true;
                    break;
                }
                Some(c) if c.is_whitespace() => break,
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        if !ok || !text.contains(',') && !text.contains("..") {
            self.reset(start_mark);
            return Ok(None);
        }
        let id = self.fresh_id_at(opening);
        Ok(Some(Token::BraceExpansion(id, text)))
    }

    // --- extglob ----------------------------------------------------

    fn extglob(&mut self) -> PResult<Option<Token>> {
        let Some(kind) = self.peek().filter(|&c| is_extglob_start(c)) else {
            return Ok(None);
        };
        if self.peek_at(1) != Some('(') {
            return Ok(None);
        }
        let opening = self.position();
        self.advance();
        self.advance();
        let id = self.fresh_id_at(opening);
        let mut alternatives = Vec::new();
        loop {
            let alt_start = self.position();
            let mut parts = Vec::new();
            loop {
                match self.peek() {
                    Some('|') | Some(')') => break,
                    None => {
                        return Err(Failure {
                            position: self.position(),
                            reason: Reason::UnclosedExtglob,
                        });
                    }
                    _ => match self.word_part()? {
                        Some(part) => parts.push(part),
                        None => {
                            return Err(Failure {
                                position: self.position(),
                                reason: Reason::UnclosedExtglob,
                            });
                        }
                    },
                }
            }
            let alt_id = self.fresh_id_at(alt_start);
            alternatives.push(Token::NormalWord(alt_id, parts));
            match self.peek() {
                Some('|') => {
                    self.advance();
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(Failure {
                        position: self.position(),
                        reason: Reason::UnclosedExtglob,
                    });
                }
            }
        }
        Ok(Some(Token::Extglob(id, kind, alternatives)))
    }

    // --- normal literal ----------------------------------------------------

    fn normal_literal(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    let escaped = self.peek_at(1);
                    match escaped {
                        None => break,
                        Some('\n') => {
                            self.advance();
                            self.advance();
                        }
                        Some(c) if is_quotable(c) || matches!(c, '?' | '*' | '@' | '!' | '+' | '[' | ']') => {
                            self.advance();
                            self.advance();
                            text.push(c);
                        }
                        Some(c) => {
                            let id_pos = self.position();
                            self.advance();
                            self.advance();
                            text.push(c);
                            self.note_at(
                                id_pos,
                                Severity::Warning,
                                "Did you mean printf-escape? The shell just ignores the \\ here.",
                            );
                        }
                    }
                }
                Some(c) if is_word_delimiter(c) => break,
                Some(c) if is_extglob_start(c) && self.peek_at(1) == Some('(') => break,
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        if text.is_empty() {
            return Ok(None);
        }
        let id = self.fresh_id_at(start);
        Ok(Some(Token::Literal(id, text)))
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
    fn single_quoted_preserves_content_verbatim() {
        let mut p = parser("'a\"b\\c'");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::SingleQuoted(_, s)] => {
                assert_eq!(s, "a\"b\\c");
            });
        });
    }

    #[test]
    fn single_quote_immediately_followed_by_letter_warns() {
        let mut p = parser("'foo'bar");
        let word = p.normal_word().unwrap().unwrap();
        let id = word.id();
        let (metadata, _) = p.into_state().into_parts();
        assert_eq!(metadata[&id].notes.len(), 0); // warning is on the inner SingleQuoted, not the word
        let Token::NormalWord(_, parts) = &word else { panic!() };
        let Token::SingleQuoted(inner_id, _) = &parts[0] else { panic!() };
        assert_eq!(metadata[inner_id].notes[0].severity, Severity::Warning);
    }

    #[test]
    fn double_quoted_keeps_unrecognized_backslash_escapes_as_two_chars() {
        let mut p = parser("\"a\\qb\"");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::DoubleQuoted(_, inner)] => {
                assert_matches!(&inner[..], [Token::Literal(_, s)] => {
                    assert_eq!(s, "a\\qb");
                });
            });
        });
    }

    #[test]
    fn backtick_expansion_emits_deprecation_note() {
        let mut p = parser("`echo hi`");
        let word = p.normal_word().unwrap().unwrap();
        let Token::NormalWord(_, parts) = &word else { panic!() };
        let id = parts[0].id();
        let (metadata, _) = p.into_state().into_parts();
        assert_eq!(metadata[&id].notes[0].severity, Severity::Info);
    }

    #[test]
    fn unclosed_backtick_is_a_failure() {
        let mut p = parser("`echo hi");
        assert_matches!(p.normal_word(), Err(_));
    }

    #[test]
    fn dollar_braced_parameter_expansion() {
        let mut p = parser("${foo:-bar}");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::DollarBraced(_, name)] => {
                assert_eq!(name, "foo:-bar");
            });
        });
    }

    #[test]
    fn bare_positional_parameter() {
        let mut p = parser("$1");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::DollarBraced(_, name)] => {
                assert_eq!(name, "1");
            });
        });
    }

    #[test]
    fn digits_after_positional_parameter_is_flagged() {
        let mut p = parser("$12");
        let word = p.normal_word().unwrap().unwrap();
        let Token::NormalWord(_, parts) = &word else { panic!() };
        let id = parts[0].id();
        let (metadata, _) = p.into_state().into_parts();
        assert_eq!(metadata[&id].notes[0].severity, Severity::Error);
    }

    #[test]
    fn lone_dollar_is_style_note() {
        let mut p = parser("$ ");
        let word = p.normal_word().unwrap().unwrap();
        let id = word.id();
        let (metadata, _) = p.into_state().into_parts();
        assert_eq!(metadata[&id].notes[0].severity, Severity::Style);
    }

    #[test]
    fn dollar_arithmetic_expansion() {
        let mut p = parser("$((1+2))");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::DollarArithmetic(..)]);
        });
    }

    #[test]
    fn extglob_alternatives() {
        let mut p = parser("@(foo|bar)");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::Extglob(_, '@', alts)] => {
                assert_eq!(alts.len(), 2);
            });
        });
    }

    #[test]
    fn extglob_start_without_paren_is_a_normal_literal() {
        let mut p = parser("@foo");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::Literal(_, s)] => assert_eq!(s, "@foo"));
        });
    }

    #[test]
    fn brace_expansion_requires_comma_or_range() {
        let mut p = parser("{foo,bar}");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::BraceExpansion(..)]);
        });

        let mut p2 = parser("{foo}");
        let word2 = p2.normal_word().unwrap().unwrap();
        assert_matches!(word2, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::Literal(_, s)] => assert_eq!(s, "{foo}"));
        });
    }

    #[test]
    fn stray_backslash_before_non_escapable_char_warns() {
        let mut p = parser("a\\qb");
        let word = p.normal_word().unwrap().unwrap();
        assert_matches!(word, Token::NormalWord(_, parts) => {
            assert_matches!(&parts[..], [Token::Literal(_, s)] => assert_eq!(s, "aqb"));
        });
        let (_, notes) = p.into_state().into_parts();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[test]
    fn reserved_word_shaped_literal_warns_after_the_fact() {
        let mut p = parser("done");
        let word = p.normal_word().unwrap().unwrap();
        let id = word.id();
        let (metadata, _) = p.into_state().into_parts();
        assert_eq!(metadata[&id].notes[0].severity, Severity::Warning);
    }

    #[test]
    fn normal_word_parts_are_never_empty() {
        let mut p = parser("");
        assert!(p.normal_word().unwrap().is_none());
    }
}
