//! Compile-time errors
//!
//! Everything here is an authoring mistake in a script: a line no parser
//! understands, an identifier nothing is registered under, or options that do
//! not bind. Compilation stops at the first one and reports its line.

use thiserror::Error;
use trellis_core::{BindError, DirectiveKind};

/// A line accepted by a parser that does not follow its grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("\"{line}\" does not start with '{prefix}'")]
    NotAccepted { line: String, prefix: char },

    #[error("Missing identifier in \"{line}\"")]
    MissingIdentifier { line: String },

    #[error("Unclosed node options in \"{line}\"")]
    UnclosedNodeOptions { line: String },

    #[error("Unexpected \"{rest}\" after identifier in \"{line}\"")]
    TrailingInput { line: String, rest: String },
}

/// Result type for line parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Turning a single directive into a node failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No {kind} with identifier \"{identifier}\" found")]
    UnknownIdentifier {
        kind: DirectiveKind,
        identifier: String,
    },

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Compilation of a script failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Unable to find matching parser for \"{line}\" on line {index}/{total}")]
    NoMatchingParser {
        line: String,
        index: usize,
        total: usize,
    },

    #[error("{source} on line {index}/{total}")]
    Line {
        index: usize,
        total: usize,
        source: DirectiveError,
    },
}

impl CompileError {
    pub(crate) fn at(index: usize, total: usize, source: impl Into<DirectiveError>) -> Self {
        CompileError::Line {
            index,
            total,
            source: source.into(),
        }
    }

    /// The 1-based line the error was raised for
    pub fn source_index(&self) -> usize {
        match self {
            CompileError::NoMatchingParser { index, .. } | CompileError::Line { index, .. } => {
                *index
            }
        }
    }

    /// Total number of lines in the compiled script
    pub fn total_lines(&self) -> usize {
        match self {
            CompileError::NoMatchingParser { total, .. } | CompileError::Line { total, .. } => {
                *total
            }
        }
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_message() {
        let err = CompileError::at(
            2,
            5,
            DirectiveError::UnknownIdentifier {
                kind: DirectiveKind::Action,
                identifier: "heal".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "No action with identifier \"heal\" found on line 2/5"
        );
        assert_eq!(err.source_index(), 2);
        assert_eq!(err.total_lines(), 5);
    }

    #[test]
    fn test_no_matching_parser_message() {
        let err = CompileError::NoMatchingParser {
            line: "heal".to_string(),
            index: 1,
            total: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unable to find matching parser for \"heal\" on line 1/1"
        );
    }
}
