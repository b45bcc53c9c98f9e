//! Top-level driver: [`parse_shell`] reads a full script and produces a
//! [`ParseResult`], converting any fatal failure into a single
//! [`ParseNote`] rather than propagating a `Result` to callers.

use crate::ast::{MetadataMap, Token};
use crate::core::{FailureCategory, Parser, ParserConfig};
use crate::diagnostics::{sort_notes, ParseNote, Severity};
use std::rc::Rc;

/// The outcome of parsing one script: either a tree plus its metadata map,
/// or nothing (on fatal failure) — either way, the accumulated notes.
#[derive(Debug)]
pub struct ParseResult {
    pub tree: Option<(Token, MetadataMap)>,
    pub notes: Vec<ParseNote>,
}

/// Parses `contents` (attributed to `file_name` in positions) into a
/// [`ParseResult`], using the default [`ParserConfig`].
#[must_use]
pub fn parse_shell(file_name: &str, contents: &str) -> ParseResult {
    parse_shell_with_config(file_name, contents, ParserConfig::new())
}

/// Like [`parse_shell`] but with a caller-supplied [`ParserConfig`].
#[must_use]
pub fn parse_shell_with_config(file_name: &str, contents: &str, config: ParserConfig) -> ParseResult {
    let file_name: Rc<str> = Rc::from(file_name);
    let mut parser = Parser::new(file_name, contents, config);
    parser.all_spacing();

    let start = parser.position();
    let mut terms = Vec::new();
    let failure = loop {
        if parser.at_eof() {
            break None;
        }
        match parser.term() {
            Ok(Some(t)) => terms.push(t),
            Ok(None) => {
                let position = parser.position();
                break Some((position, unexpected_message(&parser)));
            }
            Err(f) => break Some((f.position.clone(), failure_message(&f.reason))),
        }
        parser.all_spacing();
    };

    match failure {
        Some((position, message)) => {
            parser.note_at(position, Severity::Error, message);
            let (_, mut notes) = parser.into_state().into_parts();
            sort_notes(&mut notes);
            ParseResult { tree: None, notes }
        }
        None => {
            let id = parser.fresh_id_at(start);
            let script = Token::Script(id, terms);
            let (metadata, mut notes) = parser.into_state().into_parts();
            notes.extend(notes_from_map(&metadata));
            sort_notes(&mut notes);
            ParseResult {
                tree: Some((script, metadata)),
                notes,
            }
        }
    }
}

fn unexpected_message(parser: &Parser) -> String {
    let rest = parser.rest();
    let token = rest.chars().next().map(String::from).unwrap_or_else(|| "eof".to_string());
    format!("Aborting due to unexpected {token}. Is this even valid?")
}

/// Converts a [`Reason`](crate::core::Reason) into user-facing text via the
/// Parsec-style category priority `UnExpect` > `SysUnExpect` > `Expect` >
/// `Message`.
fn failure_message(reason: &crate::core::Reason) -> String {
    match reason.category() {
        FailureCategory::UnExpect(token) | FailureCategory::SysUnExpect(token) => {
            let token = if token.is_empty() { "eof".to_string() } else { token };
            format!("Aborting due to unexpected {token}. Is this even valid?")
        }
        FailureCategory::Expect(what) => format!("Expected {what}"),
        FailureCategory::Message(msg) => format!("Message: {msg}"),
    }
}

/// Flattens every per-node [`Note`](crate::diagnostics::Note) in `map` into
/// a [`ParseNote`] at that node's recorded position.
#[must_use]
pub fn notes_from_map(map: &MetadataMap) -> Vec<ParseNote> {
    let mut notes = Vec::new();
    for metadata in map.values() {
        for note in &metadata.notes {
            notes.push(ParseNote::new(metadata.position.clone(), note.severity, note.message.clone()));
        }
    }
    notes
}
