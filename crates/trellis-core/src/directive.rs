//! Directives
//!
//! A directive is one parsed script line: its kind, the identifier of the
//! component it refers to and the raw option text still to be bound.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Action,
    Requirement,
    Trigger,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 3] = [
        DirectiveKind::Action,
        DirectiveKind::Requirement,
        DirectiveKind::Trigger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveKind::Action => "action",
            DirectiveKind::Requirement => "requirement",
            DirectiveKind::Trigger => "trigger",
        }
    }

    /// Line prefix marking this kind in flow scripts
    pub fn prefix(&self) -> char {
        match self {
            DirectiveKind::Action => '!',
            DirectiveKind::Requirement => '?',
            DirectiveKind::Trigger => '@',
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line of a script
///
/// `node_options` configures the node itself (cooldown, delay, ...) while
/// `options` configures the component behind the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    kind: DirectiveKind,
    identifier: String,
    #[serde(default)]
    node_options: String,
    #[serde(default)]
    options: String,
    source_index: usize,
}

impl Directive {
    /// Create a directive without options
    ///
    /// `source_index` is the 1-based script line it was parsed from.
    pub fn new(kind: DirectiveKind, identifier: impl Into<String>, source_index: usize) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            node_options: String::new(),
            options: String::new(),
            source_index,
        }
    }

    pub fn action(identifier: impl Into<String>, source_index: usize) -> Self {
        Self::new(DirectiveKind::Action, identifier, source_index)
    }

    pub fn requirement(identifier: impl Into<String>, source_index: usize) -> Self {
        Self::new(DirectiveKind::Requirement, identifier, source_index)
    }

    pub fn trigger(identifier: impl Into<String>, source_index: usize) -> Self {
        Self::new(DirectiveKind::Trigger, identifier, source_index)
    }

    /// Set the node option text
    pub fn with_node_options(mut self, options: impl Into<String>) -> Self {
        self.node_options = options.into();
        self
    }

    /// Set the component option text
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn node_options(&self) -> &str {
        &self.node_options
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.identifier)?;
        if !self.node_options.is_empty() {
            write!(f, "({})", self.node_options)?;
        }
        if !self.options.is_empty() {
            write!(f, " {}", self.options)?;
        }
        Ok(())
    }
}
