//! Command grammar: simple commands, pipelines, and/or lists, compound
//! commands, function definitions, and the terminators that stitch them
//! into compound lists.

use crate::ast::{CaseArm, Id, IfBranch, Token};
use crate::core::{Failure, PResult, Parser, Reason};
use crate::diagnostics::Severity;
use crate::source::Position;

impl Parser {
    /// A full compound list up to (not including) whatever `end` matches,
    /// or EOF. Used for script bodies, brace groups, subshells, `do`/`if`
    /// bodies, and command-substitution interiors.
    pub fn parse_list_until(&mut self, mut end: impl FnMut(&mut Self) -> bool) -> PResult<Vec<Token>> {
        let mut terms = Vec::new();
        self.all_spacing();
        loop {
            if self.at_eof() || end(self) {
                break;
            }
            match self.term()? {
                Some(t) => terms.push(t),
                None => break,
            }
            self.all_spacing();
        }
        Ok(terms)
    }

    /// Parses a compound list up to EOF, swallowing the first fatal
    /// failure rather than propagating it: used for the contents of a
    /// backquoted command substitution, whose unescaping has already
    /// committed to treating the backtick span as a command list, so
    /// there is no outer alternative left to fall back to.
    pub fn parse_embedded_list(&mut self) -> Vec<Token> {
        self.parse_list_until(Parser::at_eof).unwrap_or_default()
    }

    /// `and_or` optionally followed by a separator (`;`, `&`, or a
    /// newline); `&` wraps the left operand in `Backgrounded`, and a
    /// `&` immediately followed by `;` is flagged.
    pub fn term(&mut self) -> PResult<Option<Token>> {
        self.all_spacing();
        let start = self.position();
        let Some(mut node) = self.and_or()? else {
            return Ok(None);
        };
        self.spacing();
        match self.peek() {
            Some('&') if self.peek_at(1) != Some('&') => {
                self.advance();
                let id = self.fresh_id_at(start);
                node = Token::Backgrounded(id, Box::new(node));
                self.spacing();
                if self.peek() == Some(';') {
                    self.note_here(Severity::Error, "It's not 'foo &; bar', just 'foo & bar'.");
                    self.advance();
                }
            }
            Some(';') => {
                self.advance();
            }
            Some('\n') => {
                self.advance();
            }
            _ => {}
        }
        Ok(Some(node))
    }

    /// Right-chained `&&`/`||` over pipelines, with a line-break permitted
    /// after the operator.
    fn and_or(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let Some(first) = self.pipeline()? else {
            return Ok(None);
        };
        let mark = self.mark();
        self.spacing();
        if self.try_literal("&&") {
            self.all_spacing();
            return match self.and_or()? {
                Some(rest) => {
                    let id = self.fresh_id_at(start);
                    Ok(Some(Token::AndIf(id, Box::new(first), Box::new(rest))))
                }
                None => Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected a command after '&&'".into()),
                }),
            };
        }
        if self.try_literal("||") {
            self.all_spacing();
            return match self.and_or()? {
                Some(rest) => {
                    let id = self.fresh_id_at(start);
                    Ok(Some(Token::OrIf(id, Box::new(first), Box::new(rest))))
                }
                None => Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected a command after '||'".into()),
                }),
            };
        }
        self.reset(mark);
        Ok(Some(first))
    }

    /// Optional leading `!`, then one-or-more commands separated by `|`
    /// (never `||`), with a line-break permitted after the pipe.
    fn pipeline(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let banged = self.peek() == Some('!') && self.peek_at(1).is_some_and(char::is_whitespace);
        if banged {
            self.advance();
            self.spacing();
        }
        let Some(first) = self.command()? else {
            return if banged {
                Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected a command after '!'".into()),
                })
            } else {
                Ok(None)
            };
        };
        let mut commands = vec![first];
        loop {
            let mark = self.mark();
            self.spacing();
            if self.peek() == Some('|') && self.peek_at(1) != Some('|') {
                self.advance();
                self.all_spacing();
                match self.command()? {
                    Some(cmd) => commands.push(cmd),
                    None => {
                        return Err(Failure {
                            position: self.position(),
                            reason: Reason::Custom("expected a command after '|'".into()),
                        });
                    }
                }
            } else {
                self.reset(mark);
                break;
            }
        }
        let id = self.fresh_id_at(start);
        let pipeline = Token::Pipeline(id, commands);
        if banged {
            let banged_id = self.fresh_id_at(start);
            Ok(Some(Token::Banged(banged_id, Box::new(pipeline))))
        } else {
            Ok(Some(pipeline))
        }
    }

    /// A compound command, or a simple command, followed in either case
    /// by any trailing redirections: any compound may be followed by
    /// redirections the same way a simple command can.
    fn command(&mut self) -> PResult<Option<Token>> {
        self.spacing();
        if let Some(inner) = self.compound_command()? {
            let start = self.id_position(inner.id());
            let mut redirs = Vec::new();
            loop {
                self.spacing();
                match self.redirection()? {
                    Some(r) => redirs.push(r),
                    None => break,
                }
            }
            let id = self.fresh_id_at(start);
            return Ok(Some(Token::Redirecting(id, redirs, Box::new(inner))));
        }
        self.simple_command()
    }

    fn compound_command(&mut self) -> PResult<Option<Token>> {
        if let Some(t) = self.arithmetic_compound()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.brace_group()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.subshell()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.condition_expr()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.if_command()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.while_or_until_command()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.for_command()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.case_command()? {
            return Ok(Some(t));
        }
        if let Some(t) = self.function_definition()? {
            return Ok(Some(t));
        }
        Ok(None)
    }

    // --- simple command ----------------------------------------------------

    /// Prefix (assignments/redirections) + optional command name + suffix
    /// (redirections/words). Fails only if nothing at all was recognized.
    fn simple_command(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let mut assignments = Vec::new();
        let mut redirs = Vec::new();
        let mut words = Vec::new();

        loop {
            self.spacing();
            if let Some(r) = self.redirection()? {
                redirs.push(r);
                continue;
            }
            if words.is_empty() {
                if let Some(a) = self.assignment_word()? {
                    assignments.push(a);
                    continue;
                }
            }
            match self.normal_word()? {
                Some(w) => words.push(w),
                None => break,
            }
        }

        if assignments.is_empty() && redirs.is_empty() && words.is_empty() {
            return Ok(None);
        }

        let cmd_id = self.fresh_id_at(start);
        let simple = Token::SimpleCommand(cmd_id, assignments, words);
        let id = self.fresh_id_at(start);
        Ok(Some(Token::Redirecting(id, redirs, Box::new(simple))))
    }

    /// `name(=|+=)value`, where value is an array literal `( words )` or a
    /// single normal word. Only tried while no command word has been read
    /// yet (assignments are a strict prefix of a simple command).
    fn assignment_word(&mut self) -> PResult<Option<Token>> {
        let mark = self.mark();
        let start = self.position();
        let leading_dollar = self.peek() == Some('$');
        if leading_dollar {
            self.advance();
        }
        if !self.peek().is_some_and(crate::lexer::is_variable_start) {
            self.reset(mark);
            return Ok(None);
        }
        let mut name = String::new();
        while self.peek().is_some_and(crate::lexer::is_variable_char) {
            name.push(self.advance().unwrap());
        }
        let space_before_operator = !self.spacing().is_empty();
        let plus = self.peek() == Some('+') && self.peek_at(1) == Some('=');
        if plus {
            self.advance();
        } else if self.peek() != Some('=') {
            self.reset(mark);
            return Ok(None);
        }
        if !self.eat('=') {
            self.reset(mark);
            return Ok(None);
        }
        let id = self.fresh_id_at(start);
        if leading_dollar {
            self.attach_note(id, Severity::Error, "Don't use $ on the left side of assignments.");
        }
        let space_after_operator = matches!(self.peek(), Some(' ') | Some('\t'));
        if space_before_operator || space_after_operator {
            self.attach_note(id, Severity::Error, "Don't put spaces around the = in assignments.");
        }
        self.spacing();
        let value = if self.peek() == Some('(') {
            self.advance();
            self.spacing();
            let mut items = Vec::new();
            while let Some(w) = self.normal_word()? {
                items.push(w);
                self.spacing();
            }
            if !self.eat(')') {
                return Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected ')' to close array literal".into()),
                });
            }
            let array_id = self.fresh_id_at(start);
            Token::Array(array_id, items)
        } else {
            match self.normal_word()? {
                Some(word) => word,
                None => {
                    let empty_id = self.fresh_id_at(self.position());
                    Token::NormalWord(empty_id, Vec::new())
                }
            }
        };
        Ok(Some(Token::Assignment(id, name, Box::new(value))))
    }

    // --- compound commands ---------------------------------------------------

    fn arithmetic_compound(&mut self) -> PResult<Option<Token>> {
        if !(self.peek() == Some('(') && self.peek_at(1) == Some('(')) {
            return Ok(None);
        }
        let start = self.position();
        self.advance();
        self.advance();
        let expr = self.arithmetic_expr_until_double_close()?;
        let id = self.fresh_id_at(start);
        Ok(Some(Token::Arithmetic(id, Box::new(expr))))
    }

    fn brace_group(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('{') {
            return Ok(None);
        }
        let mark = self.mark();
        let start = self.position();
        self.advance();
        if !self.at_keyword_separator() {
            self.reset(mark);
            return Ok(None);
        }
        let body = self.parse_list_until(|p| p.peek() == Some('}'))?;
        if !self.eat('}') {
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected closing '}'".into()),
            });
        }
        let id = self.fresh_id_at(start);
        Ok(Some(Token::BraceGroup(id, body)))
    }

    fn subshell(&mut self) -> PResult<Option<Token>> {
        if self.peek() != Some('(') {
            return Ok(None);
        }
        let start = self.position();
        self.advance();
        let body = self.parse_list_until(|p| p.peek() == Some(')'))?;
        if !self.eat(')') {
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected closing ')'".into()),
            });
        }
        let id = self.fresh_id_at(start);
        Ok(Some(Token::Subshell(id, body)))
    }

    fn if_command(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        if !self.try_keyword("if") {
            return Ok(None);
        }
        let mut branches = Vec::new();
        loop {
            self.all_spacing();
            let condition = self.parse_list_until(|p| p.peek_keyword("then"))?;
            self.all_spacing();
            if !self.try_keyword("then") {
                self.note_at(start, Severity::Error, "Couldn't find 'fi' for this 'if'.");
                return Err(Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected 'then'".into()),
                });
            }
            self.check_no_semicolon_after("then");
            let body = self.parse_list_until(|p| {
                p.peek_keyword("elif") || p.peek_keyword("else") || p.peek_keyword("fi")
            })?;
            branches.push(IfBranch { condition, body });
            self.all_spacing();
            if self.try_keyword("elif") {
                continue;
            }
            break;
        }
        let else_body = if self.try_keyword("else") {
            self.check_no_semicolon_after("else");
            Some(self.parse_list_until(|p| p.peek_keyword("fi"))?)
        } else {
            None
        };
        self.all_spacing();
        if !self.try_keyword("fi") {
            self.note_at(start, Severity::Error, "Couldn't find 'fi' for this 'if'.");
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'fi'".into()),
            });
        }
        let id = self.fresh_id_at(start);
        Ok(Some(Token::IfExpression(id, branches, else_body)))
    }

    /// A semicolon directly after `then`/`else` is diagnosed, then
    /// consumed so parsing can continue.
    fn check_no_semicolon_after(&mut self, keyword: &str) {
        self.spacing();
        if self.peek() == Some(';') {
            self.note_here(Severity::Error, format!("No semicolons directly after '{keyword}'."));
            self.advance();
        }
    }

    fn while_or_until_command(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let is_while = self.try_keyword("while");
        let is_until = !is_while && self.try_keyword("until");
        if !is_while && !is_until {
            return Ok(None);
        }
        self.all_spacing();
        let condition = self.parse_list_until(|p| p.peek_keyword("do"))?;
        self.all_spacing();
        if !self.try_keyword("do") {
            self.note_at(start, Severity::Error, "Couldn't find 'do' for this loop.");
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'do'".into()),
            });
        }
        let body = self.do_group_body(start)?;
        let id = self.fresh_id_at(start);
        if is_while {
            Ok(Some(Token::WhileExpression(id, condition, body)))
        } else {
            Ok(Some(Token::UntilExpression(id, condition, body)))
        }
    }

    /// The body of a `do ... done` group, with terminator-recovery: a
    /// missing `done` whose body contains a lone `done` word gets the
    /// error attached there instead of only at the opening keyword.
    fn do_group_body(&mut self, loop_start: Position) -> PResult<Vec<Token>> {
        let body = self.parse_list_until(|p| p.peek_keyword("done"))?;
        self.all_spacing();
        if !self.try_keyword("done") {
            if let Some(done_id) = find_lone_done(&body) {
                self.attach_note(done_id, Severity::Error, "Put a ; or \\n before the done.");
            }
            self.note_at(loop_start, Severity::Error, "Couldn't find 'done' for this loop.");
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'done'".into()),
            });
        }
        Ok(body)
    }

    fn for_command(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        if !self.try_keyword("for") {
            return Ok(None);
        }
        self.spacing();
        let name_start = self.position();
        let mut name = String::new();
        while self.peek().is_some_and(crate::lexer::is_variable_char) {
            name.push(self.advance().unwrap());
        }
        if name.is_empty() || !name.chars().next().is_some_and(crate::lexer::is_variable_start) {
            return Err(Failure {
                position: name_start,
                reason: Reason::Custom("expected a name after 'for'".into()),
            });
        }
        self.spacing();
        let words = if self.try_keyword("in") {
            self.spacing();
            let mut words = Vec::new();
            while let Some(w) = self.normal_word()? {
                words.push(w);
                self.spacing();
            }
            Some(words)
        } else {
            None
        };
        self.separator_before_do();
        self.all_spacing();
        if !self.try_keyword("do") {
            self.note_at(start, Severity::Error, "Couldn't find 'do' for this loop.");
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'do'".into()),
            });
        }
        let body = self.do_group_body(start)?;
        let id = self.fresh_id_at(start);
        Ok(Some(Token::ForIn(id, name, words, body)))
    }

    /// If `do` appears immediately with no separator before it, flag the
    /// missing `;`/linefeed rather than silently accepting it (bash does
    /// accept it, but it is the exact shape this diagnostic targets).
    fn separator_before_do(&mut self) {
        self.spacing();
        if self.eat(';') || self.peek() == Some('\n') {
            return;
        }
        if self.peek_keyword("do") {
            self.note_here(Severity::Error, "You need a line feed or semicolon before 'do'.");
        }
    }

    fn case_command(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        if !self.try_keyword("case") {
            return Ok(None);
        }
        self.spacing();
        let word = self.normal_word()?.ok_or_else(|| Failure {
            position: self.position(),
            reason: Reason::Custom("expected a word after 'case'".into()),
        })?;
        self.all_spacing();
        if !self.try_keyword("in") {
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'in' after the case word".into()),
            });
        }
        let mut arms = Vec::new();
        loop {
            self.all_spacing();
            if self.at_eof() || self.peek_keyword("esac") {
                break;
            }
            let arm = self.case_arm()?;
            let terminated = arm.terminated;
            arms.push(arm);
            if !terminated {
                break;
            }
        }
        self.all_spacing();
        if !self.try_keyword("esac") {
            self.note_at(start, Severity::Error, "Couldn't find 'esac' for this 'case'.");
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected 'esac'".into()),
            });
        }
        let id = self.fresh_id_at(start);
        Ok(Some(Token::CaseExpression(id, Box::new(word), arms)))
    }

    fn case_arm(&mut self) -> PResult<CaseArm> {
        self.eat('(');
        self.all_spacing();
        let mut patterns = vec![self.normal_word()?.ok_or_else(|| Failure {
            position: self.position(),
            reason: Reason::Custom("expected a case pattern".into()),
        })?];
        loop {
            self.all_spacing();
            if self.peek() == Some('|') {
                self.advance();
                self.all_spacing();
                patterns.push(self.normal_word()?.ok_or_else(|| Failure {
                    position: self.position(),
                    reason: Reason::Custom("expected a case pattern".into()),
                })?);
            } else {
                break;
            }
        }
        self.all_spacing();
        if !self.eat(')') {
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected ')' after case pattern".into()),
            });
        }
        let body = self.parse_list_until(|p| p.peek_lookahead(";;") || p.peek_keyword("esac"))?;
        self.all_spacing();
        let terminated = self.try_literal(";;");
        Ok(CaseArm { patterns, body, terminated })
    }

    fn function_definition(&mut self) -> PResult<Option<Token>> {
        let start = self.position();
        let mark = self.mark();
        let has_keyword = self.try_keyword("function");
        if has_keyword {
            self.note_here(Severity::Info, "Drop the keyword 'function'.");
            self.spacing();
        }
        let name_start = self.position();
        let mut name = String::new();
        while self.peek().is_some_and(crate::lexer::is_variable_char) {
            name.push(self.advance().unwrap());
        }
        if name.is_empty() || !name.chars().next().is_some_and(crate::lexer::is_variable_start) {
            self.reset(mark);
            return Ok(None);
        }
        self.spacing();
        if !(self.peek() == Some('(') && self.peek_at(1) == Some(')')) {
            if has_keyword {
                return Err(Failure {
                    position: name_start,
                    reason: Reason::Custom("expected '()' after the function name".into()),
                });
            }
            self.reset(mark);
            return Ok(None);
        }
        self.advance();
        self.advance();
        self.all_spacing();
        if self.peek() != Some('{') {
            return Err(Failure {
                position: self.position(),
                reason: Reason::Custom("expected a brace group as the function body".into()),
            });
        }
        let body = self
            .brace_group()?
            .expect("brace_group must match: '{' was just confirmed present");
        let id = self.fresh_id_at(start);
        Ok(Some(Token::Function(id, name, Box::new(body))))
    }

    // --- keyword helpers ----------------------------------------------------

    /// Consumes `keyword` only if it is immediately followed by a keyword
    /// separator; otherwise the keyword is just the start of a regular
    /// word and nothing is consumed.
    fn try_keyword(&mut self, keyword: &str) -> bool {
        let mark = self.mark();
        if self.try_literal(keyword) {
            if self.at_keyword_separator() {
                return true;
            }
            self.reset(mark);
        }
        false
    }

    /// Non-consuming lookahead version of [`try_keyword`](Self::try_keyword),
    /// used as an `end` predicate for [`parse_list_until`](Self::parse_list_until).
    fn peek_keyword(&mut self, keyword: &str) -> bool {
        let mark = self.mark();
        let matched = self.try_keyword(keyword);
        self.reset(mark);
        matched
    }

    /// Non-consuming lookahead for an exact literal (used for `;;`).
    fn peek_lookahead(&mut self, literal: &str) -> bool {
        let mark = self.mark();
        let matched = self.try_literal(literal);
        self.reset(mark);
        matched
    }

    fn id_position(&self, id: Id) -> Position {
        self.state
            .metadata()
            .get(&id)
            .map(|m| m.position.clone())
            .unwrap_or_else(|| self.cursor.position())
    }
}

/// Walks a compound-list body looking for a `SimpleCommand` whose sole
/// word is the literal `done` (used for the do-group recovery note).
fn find_lone_done(body: &[Token]) -> Option<Id> {
    body.iter().find_map(find_lone_done_in)
}

fn find_lone_done_in(token: &Token) -> Option<Id> {
    match token {
        Token::Redirecting(_, _, inner) => find_lone_done_in(inner),
        Token::Backgrounded(_, inner) | Token::Banged(_, inner) => find_lone_done_in(inner),
        Token::AndIf(_, l, r) | Token::OrIf(_, l, r) => {
            find_lone_done_in(l).or_else(|| find_lone_done_in(r))
        }
        Token::Pipeline(_, list) => list.iter().find_map(find_lone_done_in),
        Token::SimpleCommand(id, assignments, words) => {
            if assignments.is_empty() {
                if let [Token::NormalWord(_, parts)] = words.as_slice() {
                    if let [Token::Literal(_, text)] = parts.as_slice() {
                        if text == "done" {
                            return Some(*id);
                        }
                    }
                }
            }
            None
        }
        _ => None,
    }
}
