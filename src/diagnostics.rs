//! Diagnostics: [`Severity`], [`Note`] and [`ParseNote`].
//!
//! Two channels exist: a [`Note`] is attached to a
//! specific AST node (via its [`Id`](crate::ast::Id), see
//! [`ParserState::attach_note`](crate::state::ParserState::attach_note));
//! a [`ParseNote`] stands on its own, anchored to a source
//! [`Position`] instead of a node, for problems that concern surrounding
//! source rather than a single construct (missing terminators, misplaced
//! semicolons, or the single note produced when parsing fails outright).

use crate::source::Position;
use std::cmp::Ordering;

/// Urgency of a [`Note`] or [`ParseNote`].
///
/// Ordered lowest to highest urgency; this order is exactly the order used
/// to sort diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Style,
    Info,
    Warning,
    Error,
}

/// A diagnostic attached to a specific AST node.
///
/// `Note`s carry no position of their own: they inherit the position of the
/// node they are attached to. See [`notes_from_map`](crate::driver::notes_from_map)
/// for how the two channels are merged into one stream of [`ParseNote`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Note {
    pub severity: Severity,
    pub message: String,
}

impl Note {
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Note {
            severity,
            message: message.into(),
        }
    }
}

/// A diagnostic anchored to a source position rather than a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseNote {
    pub position: Position,
    pub severity: Severity,
    pub message: String,
}

impl ParseNote {
    #[must_use]
    pub fn new(position: Position, severity: Severity, message: impl Into<String>) -> Self {
        ParseNote {
            position,
            severity,
            message: message.into(),
        }
    }
}

/// Orders by `(position, severity)`, the sort the final note list is
/// presented in. Message is used only to break ties between two
/// otherwise-identical-looking notes so the order stays total.
impl Ord for ParseNote {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.position, self.severity)
            .cmp(&(&other.position, other.severity))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for ParseNote {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts `notes` by `(position, severity)` and removes exact duplicates.
///
/// This is the function the driver applies to the merged note stream before
/// returning a [`ParseResult`](crate::driver::ParseResult).
pub fn sort_notes(notes: &mut Vec<ParseNote>) {
    notes.sort();
    notes.dedup();
}

#[cfg(feature = "pretty")]
pub(crate) mod pretty {
    use super::{ParseNote, Severity};
    use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

    fn level(severity: Severity) -> Level<'static> {
        match severity {
            Severity::Style => Level::NOTE,
            Severity::Info => Level::INFO,
            Severity::Warning => Level::WARNING,
            Severity::Error => Level::ERROR,
        }
    }

    /// Renders a single [`ParseNote`] against its source line as an
    /// `rustc`-style snippet, for callers who opted into the `pretty`
    /// feature. This is convenience presentation, not part of the crate's
    /// core contract: rendering is left to downstream consumers by
    /// default.
    #[must_use]
    pub fn render(note: &ParseNote, source_line: &str) -> String {
        let column = note.position.column.get() as usize;
        let start = column.saturating_sub(1).min(source_line.len());
        let end = (start + 1).min(source_line.len());
        let snippet = Snippet::source(source_line)
            .line_start(note.position.line.get() as usize)
            .path(&*note.position.file_name)
            .annotations(vec![AnnotationKind::Primary
                .span(start..end)
                .label(&note.message)]);
        let group = level(note.severity)
            .primary_title(&*note.message)
            .elements(std::iter::once(snippet));
        Renderer::plain().render(&[group]).to_string()
    }

    /// Renders every note in `notes` against `source`, looking up each
    /// note's line by its recorded line number. Convenience batch form of
    /// [`render`] for callers who just want `ParseResult::notes` printed.
    #[must_use]
    pub fn render_notes(notes: &[ParseNote], source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        notes
            .iter()
            .map(|note| {
                let line_index = note.position.line.get() as usize - 1;
                let line = lines.get(line_index).copied().unwrap_or("");
                render(note, line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
