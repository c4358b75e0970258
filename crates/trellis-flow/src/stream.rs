//! The ordered directive sequence fed to the compiler

use std::slice;

use tracing::trace;
use trellis_core::Directive;

use crate::error::{CompileError, CompileResult};
use crate::parser::LineParser;

/// Directives in script order, with the line count of their source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveStream {
    directives: Vec<Directive>,
    total_lines: usize,
}

impl DirectiveStream {
    /// Build a stream from already parsed directives
    pub fn new(directives: Vec<Directive>) -> Self {
        let total_lines = directives
            .iter()
            .map(Directive::source_index)
            .max()
            .unwrap_or(0)
            .max(directives.len());
        Self {
            directives,
            total_lines,
        }
    }

    /// Parse script lines with the first parser accepting each line
    ///
    /// Blank lines and `#` comments are skipped but still count towards line
    /// numbers.
    pub fn parse<S: AsRef<str>>(
        lines: &[S],
        parsers: &[Box<dyn LineParser>],
    ) -> CompileResult<Self> {
        let total = lines.len();
        let mut directives = Vec::with_capacity(total);

        for (offset, line) in lines.iter().enumerate() {
            let index = offset + 1;
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parser = parsers.iter().find(|parser| parser.accept(line)).ok_or_else(|| {
                CompileError::NoMatchingParser {
                    line: line.to_string(),
                    index,
                    total,
                }
            })?;
            let directive = parser
                .parse(line, index)
                .map_err(|err| CompileError::at(index, total, err))?;
            trace!(index, directive = %directive, "Parsed directive");
            directives.push(directive);
        }

        Ok(Self {
            directives,
            total_lines: total,
        })
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn iter(&self) -> slice::Iter<'_, Directive> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Line count of the source, used in error positions
    pub fn total_lines(&self) -> usize {
        self.total_lines
    }
}

impl FromIterator<Directive> for DirectiveStream {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DirectiveStream {
    type Item = &'a Directive;
    type IntoIter = slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectiveError;
    use crate::parser::default_parsers;
    use trellis_core::DirectiveKind;

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let lines = ["# greet new players", "", "@join", "  !greet hello"];
        let stream = DirectiveStream::parse(&lines, &default_parsers()).unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.total_lines(), 4);
        assert_eq!(stream.directives()[0].kind(), DirectiveKind::Trigger);
        assert_eq!(stream.directives()[0].source_index(), 3);
        assert_eq!(stream.directives()[1].options(), "hello");
        assert_eq!(stream.directives()[1].source_index(), 4);
    }

    #[test]
    fn test_parse_unmatched_line() {
        let lines = ["!greet", "greet"];
        let err = DirectiveStream::parse(&lines, &default_parsers()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to find matching parser for \"greet\" on line 2/2"
        );
        assert_eq!(err.source_index(), 2);
    }

    #[test]
    fn test_parse_malformed_line() {
        let lines = ["?alive", "!greet(delay=1s", "!other"];
        let err = DirectiveStream::parse(&lines, &default_parsers()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Line {
                index: 2,
                total: 3,
                source: DirectiveError::Parse(_)
            }
        ));
        assert!(err.to_string().ends_with("on line 2/3"));
    }

    #[test]
    fn test_from_directives() {
        let stream: DirectiveStream = vec![
            Directive::requirement("alive", 1),
            Directive::action("greet", 2),
        ]
        .into_iter()
        .collect();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.total_lines(), 2);
        assert_eq!(stream.iter().count(), 2);
    }
}
