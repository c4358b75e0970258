//! Outcome algebra
//!
//! Every test and execution reports back through an [`Outcome`]. Outcomes
//! combine by conjunction: any failure fails the whole, at least one success
//! with no failure succeeds, and [`Outcome::Empty`] is the identity element.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an outcome without its messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failure,
    /// Not applicable, e.g. the target type did not match
    Empty,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failure => write!(f, "failure"),
            Status::Empty => write!(f, "empty"),
        }
    }
}

/// Result of testing a requirement or executing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "messages", rename_all = "snake_case")]
pub enum Outcome {
    /// Passed, with optional diagnostic messages
    Success(Vec<String>),

    /// Failed, with the reasons
    Failure(Vec<String>),

    /// Neither passed nor failed
    Empty,
}

impl Outcome {
    /// A success without messages
    pub fn success() -> Self {
        Outcome::Success(Vec::new())
    }

    /// A success carrying a single message
    pub fn success_with(message: impl Into<String>) -> Self {
        Outcome::Success(vec![message.into()])
    }

    /// A failure carrying a single message
    pub fn failure(message: impl Into<String>) -> Self {
        Outcome::Failure(vec![message.into()])
    }

    /// The not-applicable outcome
    pub fn empty() -> Self {
        Outcome::Empty
    }

    /// Get the status of this outcome
    pub fn status(&self) -> Status {
        match self {
            Outcome::Success(_) => Status::Success,
            Outcome::Failure(_) => Status::Failure,
            Outcome::Empty => Status::Empty,
        }
    }

    /// Messages attached to this outcome
    pub fn messages(&self) -> &[String] {
        match self {
            Outcome::Success(messages) | Outcome::Failure(messages) => messages,
            Outcome::Empty => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// Conjunction of two outcomes
    ///
    /// Messages of both sides are kept in order so that no diagnostic is lost.
    pub fn and(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Empty, other) => other,
            (this, Outcome::Empty) => this,
            (Outcome::Success(mut a), Outcome::Success(b)) => {
                a.extend(b);
                Outcome::Success(a)
            }
            (Outcome::Success(mut a), Outcome::Failure(b))
            | (Outcome::Failure(mut a), Outcome::Success(b))
            | (Outcome::Failure(mut a), Outcome::Failure(b)) => {
                a.extend(b);
                Outcome::Failure(a)
            }
        }
    }

    /// Swap success and failure, leaving empty untouched
    pub fn negate(self) -> Outcome {
        match self {
            Outcome::Success(messages) => Outcome::Failure(messages),
            Outcome::Failure(messages) => Outcome::Success(messages),
            Outcome::Empty => Outcome::Empty,
        }
    }

    /// Append a message, ignored for empty outcomes
    pub fn with_message(mut self, message: impl Into<String>) -> Outcome {
        match &mut self {
            Outcome::Success(messages) | Outcome::Failure(messages) => {
                messages.push(message.into())
            }
            Outcome::Empty => {}
        }
        self
    }

    /// Conjunction of every outcome in the iterator
    pub fn all(outcomes: impl IntoIterator<Item = Outcome>) -> Outcome {
        outcomes.into_iter().fold(Outcome::Empty, Outcome::and)
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Empty
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::success()
        } else {
            Outcome::Failure(Vec::new())
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status())?;
        if !self.messages().is_empty() {
            write!(f, ": {}", self.messages().join("; "))?;
        }
        Ok(())
    }
}

/// The conjunction of a list of outcomes
///
/// Keeps every constituent so callers can inspect which check produced which
/// message, while [`CombinedOutcome::outcome`] folds them into one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedOutcome {
    outcomes: Vec<Outcome>,
}

impl CombinedOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Merge another combined outcome into this one
    pub fn combine(mut self, other: CombinedOutcome) -> CombinedOutcome {
        self.outcomes.extend(other.outcomes);
        self
    }

    /// The individual outcomes in evaluation order
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn status(&self) -> Status {
        let mut status = Status::Empty;
        for outcome in &self.outcomes {
            match outcome.status() {
                Status::Failure => return Status::Failure,
                Status::Success => status = Status::Success,
                Status::Empty => {}
            }
        }
        status
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status() == Status::Failure
    }

    /// All messages of all constituents, in order
    pub fn messages(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|o| o.messages().iter().cloned())
            .collect()
    }

    /// Fold into a single outcome
    pub fn outcome(&self) -> Outcome {
        Outcome::all(self.outcomes.iter().cloned())
    }

    pub fn into_outcome(self) -> Outcome {
        Outcome::all(self.outcomes)
    }
}

impl From<Outcome> for CombinedOutcome {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcomes: vec![outcome],
        }
    }
}

impl FromIterator<Outcome> for CombinedOutcome {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

impl Extend<Outcome> for CombinedOutcome {
    fn extend<I: IntoIterator<Item = Outcome>>(&mut self, iter: I) {
        self.outcomes.extend(iter);
    }
}
