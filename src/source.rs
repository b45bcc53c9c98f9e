//! Source positions.
//!
//! Every AST node and every [`ParseNote`](crate::diagnostics::ParseNote)
//! carries a [`Position`]: the file name plus a one-based line and column.
//! Positions are computed once, up front, for the whole input (see
//! [`Cursor::new`](crate::lexer::Cursor::new)) rather than recomputed on
//! every backtrack.

use std::fmt;
use std::num::NonZeroU32;
use std::rc::Rc;

/// A location in a named source file.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Name of the file the source text came from (or a synthetic name such
    /// as `"<script>"` when no real file is involved).
    pub file_name: Rc<str>,
    /// One-based line number.
    pub line: NonZeroU32,
    /// One-based column number, counted in `char`s rather than bytes.
    pub column: NonZeroU32,
}

impl Position {
    /// Creates the position of the first character of a file.
    #[must_use]
    pub fn start_of(file_name: Rc<str>) -> Self {
        Position {
            file_name,
            line: NonZeroU32::new(1).unwrap(),
            column: NonZeroU32::new(1).unwrap(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}
