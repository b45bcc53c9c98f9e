//! Arithmetic expression sublanguage, invoked within `$((…))` and `((…))`.
//! Standard C-like precedence, parsed as a chain of
//! precedence levels each built from [`Parser::chain_left`] /
//! [`Parser::chain_right`], cheapest (sequence) to tightest (primary term)
//! binding.

use crate::ast::Token;
use crate::core::{Failure, PResult, Parser, Reason};

impl Parser {
    /// Parses the content of `$((…))` or `((…))` up to and including the
    /// closing `))`. The opening `((` must already have been consumed by
    /// the caller.
    pub fn arithmetic_expr_until_double_close(&mut self) -> PResult<Token> {
        self.ws();
        let expr = self.ta_sequence()?;
        self.ws();
        if self.peek() == Some(')') && self.peek_at(1) == Some(')') {
            self.advance();
            self.advance();
            Ok(expr)
        } else {
            Err(Failure {
                position: self.position(),
                reason: Reason::UnclosedArith,
            })
        }
    }

    /// Arithmetic expressions ignore shell comments/line-continuations but
    /// do skip plain horizontal and vertical whitespace between tokens.
    pub(crate) fn ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn ta_sequence(&mut self) -> PResult<Token> {
        let start = self.position();
        let mut items = vec![self.ta_assignment()?];
        loop {
            self.ws();
            if self.peek() == Some(',') {
                self.advance();
                self.ws();
                items.push(self.ta_assignment()?);
            } else {
                break;
            }
        }
        let id = self.fresh_id_at(start);
        Ok(Token::TaSequence(id, items))
    }

    fn ta_assignment(&mut self) -> PResult<Token> {
        self.chain_right_required(Self::ta_trinary, |p| {
            p.ws();
            const OPS: [&str; 10] = [
                "<<=", ">>=", "*=", "/=", "%=", "+=", "-=", "&=", "^=", "|=",
            ];
            for op in OPS {
                if p.try_literal(op) {
                    return Some(op.to_string());
                }
            }
            if p.peek() == Some('=') && p.peek_at(1) != Some('=') {
                p.advance();
                return Some("=".to_string());
            }
            None
        })
    }

    fn ta_trinary(&mut self) -> PResult<Token> {
        let start = self.position();
        let cond = self.ta_logical_or()?;
        self.ws();
        if self.peek() == Some('?') {
            self.advance();
            self.ws();
            let then_branch = self.ta_assignment()?;
            self.ws();
            if !self.eat(':') {
                return Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("arithmetic conditional is missing ':'".into()),
                });
            }
            self.ws();
            let else_branch = self.ta_assignment()?;
            let id = self.fresh_id_at(start);
            Ok(Token::TaTrinary(
                id,
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ))
        } else {
            Ok(cond)
        }
    }

    fn ta_logical_or(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_logical_and, |p| {
            p.ws();
            p.try_literal("||").then(|| "||".to_string())
        })
    }

    fn ta_logical_and(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_bit_or, |p| {
            p.ws();
            p.try_literal("&&").then(|| "&&".to_string())
        })
    }

    fn ta_bit_or(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_bit_xor, |p| {
            p.ws();
            if p.peek() == Some('|') && !matches!(p.peek_at(1), Some('|') | Some('=')) {
                p.advance();
                Some("|".to_string())
            } else {
                None
            }
        })
    }

    fn ta_bit_xor(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_bit_and, |p| {
            p.ws();
            if p.peek() == Some('^') && p.peek_at(1) != Some('=') {
                p.advance();
                Some("^".to_string())
            } else {
                None
            }
        })
    }

    fn ta_bit_and(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_equated, |p| {
            p.ws();
            if p.peek() == Some('&') && !matches!(p.peek_at(1), Some('&') | Some('=')) {
                p.advance();
                Some("&".to_string())
            } else {
                None
            }
        })
    }

    fn ta_equated(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_compared, |p| {
            p.ws();
            for op in ["==", "!="] {
                if p.try_literal(op) {
                    return Some(op.to_string());
                }
            }
            None
        })
    }

    fn ta_compared(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_shift, |p| {
            p.ws();
            for op in ["<=", ">="] {
                if p.try_literal(op) {
                    return Some(op.to_string());
                }
            }
            if p.peek() == Some('<') && !matches!(p.peek_at(1), Some('<') | Some('=')) {
                p.advance();
                return Some("<".to_string());
            }
            if p.peek() == Some('>') && !matches!(p.peek_at(1), Some('>') | Some('=')) {
                p.advance();
                return Some(">".to_string());
            }
            None
        })
    }

    fn ta_shift(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_add, |p| {
            p.ws();
            for op in ["<<", ">>"] {
                if p.peek() == Some(op.chars().next().unwrap())
                    && p.peek_at(1) == op.chars().nth(1)
                    && p.peek_at(2) != Some('=')
                {
                    p.advance();
                    p.advance();
                    return Some(op.to_string());
                }
            }
            None
        })
    }

    fn ta_add(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_mul, |p| {
            p.ws();
            if p.peek() == Some('+') && !matches!(p.peek_at(1), Some('+') | Some('=')) {
                p.advance();
                return Some("+".to_string());
            }
            if p.peek() == Some('-') && !matches!(p.peek_at(1), Some('-') | Some('=')) {
                p.advance();
                return Some("-".to_string());
            }
            None
        })
    }

    fn ta_mul(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_exp, |p| {
            p.ws();
            if p.peek() == Some('*') && !matches!(p.peek_at(1), Some('*') | Some('=')) {
                p.advance();
                return Some("*".to_string());
            }
            if p.peek() == Some('/') && p.peek_at(1) != Some('=') {
                p.advance();
                return Some("/".to_string());
            }
            if p.peek() == Some('%') && p.peek_at(1) != Some('=') {
                p.advance();
                return Some("%".to_string());
            }
            None
        })
    }

    fn ta_exp(&mut self) -> PResult<Token> {
        self.chain_left_required(Self::ta_negated, |p| {
            p.ws();
            p.try_literal("**").then(|| "**".to_string())
        })
    }

    fn ta_negated(&mut self) -> PResult<Token> {
        self.ws();
        let start = self.position();
        if self.peek() == Some('!') {
            self.advance();
            let operand = self.ta_signed()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "!".to_string(), Box::new(operand)));
        }
        if self.peek() == Some('~') {
            self.advance();
            let operand = self.ta_signed()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "~".to_string(), Box::new(operand)));
        }
        self.ta_signed()
    }

    fn ta_signed(&mut self) -> PResult<Token> {
        self.ws();
        let start = self.position();
        if self.peek() == Some('+') && self.peek_at(1) != Some('+') {
            self.advance();
            let operand = self.ta_incremented()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "+".to_string(), Box::new(operand)));
        }
        if self.peek() == Some('-') && self.peek_at(1) != Some('-') {
            self.advance();
            let operand = self.ta_incremented()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "-".to_string(), Box::new(operand)));
        }
        self.ta_incremented()
    }

    fn ta_incremented(&mut self) -> PResult<Token> {
        self.ws();
        let start = self.position();
        if self.try_literal("++") {
            let operand = self.ta_term()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "++|".to_string(), Box::new(operand)));
        }
        if self.try_literal("--") {
            let operand = self.ta_term()?;
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "--|".to_string(), Box::new(operand)));
        }
        let term = self.ta_term()?;
        self.ws();
        if self.try_literal("++") {
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "|++".to_string(), Box::new(term)));
        }
        if self.try_literal("--") {
            let id = self.fresh_id_at(start);
            return Ok(Token::TaUnary(id, "|--".to_string(), Box::new(term)));
        }
        Ok(term)
    }

    fn ta_term(&mut self) -> PResult<Token> {
        self.ws();
        let start = self.position();
        if self.peek() == Some('(') {
            self.advance();
            self.ws();
            let inner = self.ta_sequence()?;
            self.ws();
            if !self.eat(')') {
                return Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("unclosed parenthesis in arithmetic expression".into()),
                });
            }
            return Ok(inner);
        }
        if self.peek() == Some('$') {
            if let Some(word) = self.normal_word()? {
                let id = self.fresh_id_at(start);
                return Ok(Token::TaExpansion(id, Box::new(word)));
            }
        }
        if self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            let mut text = String::new();
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                text.push(self.advance().unwrap());
            }
            let id = self.fresh_id_at(start);
            return Ok(Token::TaLiteral(id, text));
        }
        if self.peek().is_some_and(crate::lexer::is_variable_start) {
            let mut name = String::new();
            while self.peek().is_some_and(crate::lexer::is_variable_char) {
                name.push(self.advance().unwrap());
            }
            let id = self.fresh_id_at(start);
            return Ok(Token::TaVariable(id, name));
        }
        Err(Failure {
            position: self.position(),
            reason: Reason::Custom("expected an arithmetic expression".into()),
        })
    }

    /// Like [`Parser::chain_left`] but the term production is fallible:
    /// bails out of the whole chain on the first `Err` rather than
    /// treating it as "no match".
    fn chain_left_required(
        &mut self,
        mut term: impl FnMut(&mut Self) -> PResult<Token>,
        mut op: impl FnMut(&mut Self) -> Option<String>,
    ) -> PResult<Token> {
        let mut lhs = term(self)?;
        loop {
            let mark = self.mark();
            let Some(operator) = op(self) else {
                self.reset(mark);
                break;
            };
            let start = match &lhs {
                Token::TaSequence(..) => self.position(),
                other => self.metadata_position(other.id()),
            };
            let rhs = term(self)?;
            let id = self.fresh_id_at(start);
            lhs = Token::TaBinary(id, operator, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn chain_right_required(
        &mut self,
        mut term: impl FnMut(&mut Self) -> PResult<Token>,
        mut op: impl FnMut(&mut Self) -> Option<String>,
    ) -> PResult<Token> {
        let start = self.position();
        let first = term(self)?;
        let mark = self.mark();
        let Some(operator) = op(self) else {
            self.reset(mark);
            return Ok(first);
        };
        let rest = self.chain_right_required(term, op)?;
        let id = self.fresh_id_at(start);
        Ok(Token::TaBinary(id, operator, Box::new(first), Box::new(rest)))
    }

    fn metadata_position(&self, id: crate::ast::Id) -> crate::source::Position {
        self.state
            .metadata()
            .get(&id)
            .map(|m| m.position.clone())
            .unwrap_or_else(|| self.position())
    }
}
