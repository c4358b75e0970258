//! Execution context passed to actions, requirements and triggers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Data provided when a trigger is fired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerData {
    /// Identifier of the fired trigger (e.g. "player.move")
    pub identifier: String,

    /// Variables describing the event that caused the firing
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,

    /// When the trigger was fired
    pub triggered_at: DateTime<Utc>,
}

impl TriggerData {
    /// Create new trigger data stamped with the current time
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            variables: HashMap::new(),
            triggered_at: Utc::now(),
        }
    }

    /// Add a variable
    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Override the firing time
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.triggered_at = time;
        self
    }

    pub fn get_var(&self, key: &str) -> Option<&serde_json::Value> {
        self.variables.get(key)
    }
}

/// Context for a single evaluation of a forest
///
/// Carries the trigger that started the evaluation (if any) and free-form
/// variables the host wants to expose to components.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Variables available to components
    pub variables: HashMap<String, serde_json::Value>,

    /// Trigger data (if started by a trigger)
    pub trigger: Option<TriggerData>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with trigger data
    pub fn with_trigger(trigger: TriggerData) -> Self {
        Self {
            trigger: Some(trigger),
            ..Self::new()
        }
    }

    /// Add a variable to the context
    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Set a variable
    pub fn set_var(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.variables.insert(key.into(), value);
    }

    /// Look up a variable, falling back to the trigger's variables
    pub fn get_var(&self, key: &str) -> Option<&serde_json::Value> {
        self.variables
            .get(key)
            .or_else(|| self.trigger.as_ref().and_then(|t| t.get_var(key)))
    }
}
