//! Line-level directive parsers
//!
//! A script line looks like
//!
//! ```text
//! !heal(cooldown=5s, delay:1s) amount=4
//! ?health[negated] below=10
//! @join
//! ```
//!
//! The leading character selects the directive kind. The identifier follows
//! directly, then optional node options in `[...]` or `(...)`, then the
//! component's own options after whitespace.

use trellis_core::{Directive, DirectiveKind};

use crate::error::{ParseError, ParseResult};

/// Turns one script line into a [`Directive`]
pub trait LineParser: Send + Sync {
    /// Whether this parser is responsible for the line
    fn accept(&self, line: &str) -> bool;

    /// Parse an accepted line; `source_index` is its 1-based position
    fn parse(&self, line: &str, source_index: usize) -> ParseResult<Directive>;
}

/// Prefix-based parser for one directive kind
#[derive(Debug, Clone)]
pub struct FlowLineParser {
    kind: DirectiveKind,
    prefix: char,
}

impl FlowLineParser {
    pub fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            prefix: kind.prefix(),
        }
    }

    /// Use a non-default prefix character for this kind
    pub fn with_prefix(kind: DirectiveKind, prefix: char) -> Self {
        Self { kind, prefix }
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }
}

impl LineParser for FlowLineParser {
    fn accept(&self, line: &str) -> bool {
        line.trim_start().starts_with(self.prefix)
    }

    fn parse(&self, line: &str, source_index: usize) -> ParseResult<Directive> {
        let line = line.trim();
        let body = line
            .strip_prefix(self.prefix)
            .ok_or_else(|| ParseError::NotAccepted {
                line: line.to_string(),
                prefix: self.prefix,
            })?;

        let identifier_end = body
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(body.len());
        if identifier_end == 0 {
            return Err(ParseError::MissingIdentifier {
                line: line.to_string(),
            });
        }
        let identifier = &body[..identifier_end];
        let mut rest = &body[identifier_end..];

        let mut node_options = "";
        let closing = match rest.chars().next() {
            Some('[') => Some(']'),
            Some('(') => Some(')'),
            _ => None,
        };
        if let Some(closing) = closing {
            let end = rest
                .find(closing)
                .ok_or_else(|| ParseError::UnclosedNodeOptions {
                    line: line.to_string(),
                })?;
            node_options = rest[1..end].trim();
            rest = &rest[end + 1..];
        }

        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return Err(ParseError::TrailingInput {
                line: line.to_string(),
                rest: rest.to_string(),
            });
        }

        Ok(Directive::new(self.kind, identifier, source_index)
            .with_node_options(node_options)
            .with_options(rest.trim()))
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// One [`FlowLineParser`] per directive kind with the standard prefixes
pub fn default_parsers() -> Vec<Box<dyn LineParser>> {
    DirectiveKind::ALL
        .iter()
        .map(|kind| Box::new(FlowLineParser::new(*kind)) as Box<dyn LineParser>)
        .collect()
}
