//! Conditional expression sublanguage, invoked on reading `[`
//! (single-bracket, POSIX `test`) or `[[` (double-bracket, Bash extension).
//! Precedence-climbing like [`crate::arithmetic`], but every node
//! additionally carries the [`ConditionKind`] of the bracket form that
//! invoked it.

use crate::ast::{ConditionKind, Token};
use crate::core::{Failure, PResult, Parser, Reason};
use crate::diagnostics::Severity;

const UNARY_OPS: &[&str] = &[
    "-a", "-b", "-c", "-d", "-e", "-f", "-g", "-h", "-L", "-k", "-p", "-r", "-s", "-S", "-t", "-u",
    "-w", "-x", "-O", "-G", "-N", "-z", "-n", "-o",
];

/// Longest-match-first: multi-char spellings before their single-char
/// prefixes (`-eq` before... there is no overlap here, but `<=`/`>=` must
/// precede `<`/`>`, and `==` must precede nothing shorter — kept explicit
/// for clarity).
const BINARY_OPS: &[&str] = &[
    "-nt", "-ot", "-ef", "==", "!=", "<=", ">=", "-eq", "-ne", "-lt", "-le", "-gt", "-ge", "=~",
    ">", "<", "=",
];

impl Parser {
    /// Parses `[ … ]` or `[[ … ]]`, including both brackets, returning the
    /// `Condition` node. `self.peek()` must be at the opening `[`.
    pub fn condition_expr(&mut self) -> PResult<Option<Token>> {
        let opening = self.position();
        let kind = if self.peek() == Some('[') && self.peek_at(1) == Some('[') {
            self.advance();
            self.advance();
            ConditionKind::DoubleBracket
        } else if self.peek() == Some('[') {
            self.advance();
            ConditionKind::SingleBracket
        } else {
            return Ok(None);
        };
        let id = self.fresh_id_at(opening);

        let space = self.spacing();
        if space.is_empty() {
            self.note_here(Severity::Error, "Expected space after '['.");
        }

        let body = self.tc_or(kind)?;

        self.spacing();
        let close_position = self.position();
        let closed = match kind {
            ConditionKind::DoubleBracket => self.try_literal("]]"),
            ConditionKind::SingleBracket => self.eat(']'),
        };
        if !closed {
            return Err(Failure {
                position: close_position,
                reason: Reason::Custom(format!(
                    "expected closing '{}'",
                    if kind == ConditionKind::DoubleBracket {
                        "]]"
                    } else {
                        "]"
                    }
                )),
            });
        }

        Ok(Some(Token::Condition(id, kind, Box::new(body))))
    }

    fn tc_or(&mut self, kind: ConditionKind) -> PResult<Token> {
        let mut lhs = self.tc_and(kind)?;
        loop {
            let mark = self.mark();
            self.spacing();
            let matched = if self.try_literal("||") {
                true
            } else if self.try_literal("-o") {
                if kind == ConditionKind::DoubleBracket {
                    self.note_here(Severity::Error, "In `[[..]]`, use `||` instead of `-o`.");
                }
                true
            } else {
                false
            };
            if !matched {
                self.reset(mark);
                break;
            }
            self.soft_spacing();
            let start = self.node_position(&lhs);
            let rhs = self.tc_and(kind)?;
            let id = self.fresh_id_at(start);
            lhs = Token::TcOr(id, kind, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn tc_and(&mut self, kind: ConditionKind) -> PResult<Token> {
        let mut lhs = self.tc_term(kind)?;
        loop {
            let mark = self.mark();
            self.spacing();
            let matched = if self.try_literal("&&") {
                true
            } else if self.try_literal("-a") {
                if kind == ConditionKind::DoubleBracket {
                    self.note_here(Severity::Error, "In `[[..]]`, use `&&` instead of `-a`.");
                }
                true
            } else {
                false
            };
            if !matched {
                self.reset(mark);
                break;
            }
            self.soft_spacing();
            let start = self.node_position(&lhs);
            let rhs = self.tc_term(kind)?;
            let id = self.fresh_id_at(start);
            lhs = Token::TcAnd(id, kind, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// A leading term has no operator before it to check spacing against,
    /// so entry here only ever swallows stray whitespace silently. The
    /// soft-spacing note belongs to whichever site consumed the operator
    /// this term follows: `!` below, `&&`/`-a` and `||`/`-o` in
    /// [`tc_and`](Self::tc_and)/[`tc_or`](Self::tc_or), or the opening
    /// paren of a group in [`tc_group`](Self::tc_group).
    fn tc_term(&mut self, kind: ConditionKind) -> PResult<Token> {
        self.spacing();
        let start = self.position();
        if self.peek() == Some('!') && self.peek_at(1).is_some_and(char::is_whitespace) {
            self.advance();
            self.soft_spacing();
            let operand = self.tc_term(kind)?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TcNot(id, kind, Box::new(operand)));
        }
        if let Some(group) = self.tc_group(kind)? {
            return Ok(group);
        }
        self.tc_unary_or_binary(kind)
    }

    /// `\( expr \)` (single-bracket) or `( expr )` (double-bracket); a
    /// group whose open and close parens use mismatched escaping is a
    /// diagnosed error, not silently accepted.
    fn tc_group(&mut self, kind: ConditionKind) -> PResult<Option<Token>> {
        let mark = self.mark();
        let start = self.position();
        let escaped_open = self.peek() == Some('\\') && self.peek_at(1) == Some('(');
        let bare_open = self.peek() == Some('(');
        if !escaped_open && !bare_open {
            return Ok(None);
        }
        match kind {
            ConditionKind::SingleBracket if bare_open => {
                self.note_here(Severity::Error, "In `[..]`, use `\\(` instead of `(` for grouping.");
            }
            ConditionKind::DoubleBracket if escaped_open => {
                self.note_here(Severity::Error, "In `[[..]]`, use `(` without a backslash for grouping.");
            }
            _ => {}
        }
        if escaped_open {
            self.advance();
        }
        self.advance(); // '('
        if kind == ConditionKind::SingleBracket {
            // `\(` is a word of its own in `[ ]`, the same as `-a`/`-f`, so
            // it gets the same soft-spacing nudge as any other operator.
            // `[[ ]]`'s bare `(` is plain grouping syntax, not a separate
            // word, so it carries no such expectation.
            self.soft_spacing();
        }
        let inner = self.tc_or(kind)?;
        self.spacing();

        let close_escaped = self.peek() == Some('\\') && self.peek_at(1) == Some(')');
        let close_bare = self.peek() == Some(')');
        if !close_escaped && !close_bare {
            self.reset(mark);
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected closing ')' in condition group".into()),
            });
        }
        if close_escaped != escaped_open {
            self.note_here(
                Severity::Error,
                "The parentheses must balance, i.e. use either both escaped or both unescaped.",
            );
        }
        if close_escaped {
            self.advance();
        }
        self.advance(); // ')'

        let id = self.fresh_id_at(start);
        Ok(Some(Token::TcGroup(id, kind, Box::new(inner))))
    }

    /// `unary_op word`, `word binary_op word`, a bare `TC_Noary(word)`, or
    /// an erroneous leading `[`.
    fn tc_unary_or_binary(&mut self, kind: ConditionKind) -> PResult<Token> {
        let start = self.position();
        if self.peek() == Some('[') {
            self.note_here(Severity::Error, "Don't use [] for grouping. Use () for subshells or escape it.");
        }

        if let Some(op) = self.match_longest(UNARY_OPS) {
            self.hard_spacing();
            let word = self.require_word(kind)?;
            self.check_word_bracket_spacing(&word);
            let id = self.fresh_id_at(start);
            return Ok(Token::TcUnary(id, kind, op, Box::new(word)));
        }

        let lhs = self.require_word(kind)?;
        self.check_word_bracket_spacing(&lhs);

        let mark = self.mark();
        self.soft_spacing();
        if let Some(op) = self.match_longest(BINARY_OPS) {
            self.hard_spacing();
            let rhs = self.require_word(kind)?;
            self.check_word_bracket_spacing(&rhs);
            let id = self.fresh_id_at(start);
            return Ok(Token::TcBinary(id, kind, op, Box::new(lhs), Box::new(rhs)));
        }
        self.reset(mark);

        let id = self.fresh_id_at(start);
        Ok(Token::TcNoary(id, kind, Box::new(lhs)))
    }

    fn require_word(&mut self, kind: ConditionKind) -> PResult<Token> {
        let start = self.position();
        if self.peek() == Some(']') || self.at_eof() {
            return Err(Failure {
                position: start,
                reason: Reason::Custom("expected a word in condition expression".into()),
            });
        }
        self.normal_word()?.ok_or_else(|| Failure {
            position: start,
            reason: Reason::Custom("expected a word in condition expression".into()),
        }).map(|word| self.tag_common_utility(kind, word, start))
    }

    /// At the top of a conditional, a common utility name as the first
    /// word is almost always a mistake for `if foo | grep ...`.
    fn tag_common_utility(&mut self, _kind: ConditionKind, word: Token, _start: crate::source::Position) -> Token {
        if let Token::NormalWord(id, parts) = &word {
            if let [Token::Literal(_, text)] = parts.as_slice() {
                if self.config().is_common_utility(text) {
                    self.attach_note(
                        *id,
                        Severity::Warning,
                        "To check a command, skip [] and just do 'if foo | grep bar; then'.",
                    );
                }
            }
        }
        word
    }

    /// A word ending in `]` right before the closing bracket (no
    /// whitespace) means the literal `]` got swallowed into the word text.
    fn check_word_bracket_spacing(&mut self, word: &Token) {
        if let Token::NormalWord(id, parts) = word {
            if let Some(Token::Literal(_, text)) = parts.last() {
                if text.ends_with(']') && self.peek() != Some(' ') {
                    self.attach_note(*id, Severity::Error, "You need a space before the ].");
                }
            }
        }
    }

    fn match_longest(&mut self, ops: &[&str]) -> Option<String> {
        let mut candidates: Vec<&&str> = ops.iter().collect();
        candidates.sort_by_key(|op| std::cmp::Reverse(op.len()));
        for op in candidates {
            if self.try_literal(op) {
                if self.peek().is_some_and(|c| c.is_alphanumeric()) && op.chars().next().unwrap().is_alphabetic() {
                    let mark = self.mark();
                    self.advance();
                    self.reset(mark);
                    continue;
                }
                return Some((*op).to_string());
            }
        }
        None
    }

    /// Required spacing after a unary/binary operator: missing space is
    /// an `Error`.
    fn hard_spacing(&mut self) {
        if self.spacing().is_empty() && !self.at_eof() {
            self.note_here(Severity::Error, "Expected space after operator.");
        }
    }

    /// Spacing expected after `!`, group parens, and logical operators:
    /// missing space is only ever a soft `Info`-level note, never an
    /// `Error` (contrast [`hard_spacing`](Self::hard_spacing)).
    fn soft_spacing(&mut self) {
        if self.spacing().is_empty() && !self.at_eof() {
            self.note_here(Severity::Info, "Expected space after operator.");
        }
    }

    fn node_position(&self, token: &Token) -> crate::source::Position {
        self.state
            .metadata()
            .get(&token.id())
            .map(|m| m.position.clone())
            .unwrap_or_else(|| self.cursor.position())
    }
}
