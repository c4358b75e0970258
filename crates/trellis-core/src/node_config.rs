//! Per-node configuration
//!
//! These are bound from the bracketed part of a script line, e.g.
//! `!heal(cooldown=5s, delay:1s)`, and control how the runtime treats the
//! node rather than what the component does.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::options::{parse_duration_value, parse_flag, ConfigSchema, Configurable};

/// Node options of an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Minimum time between two executions for the same target
    #[serde(default, with = "duration_millis")]
    pub cooldown: Duration,

    /// Time to wait before running the action body
    #[serde(default, with = "duration_millis")]
    pub delay: Duration,

    /// Only ever execute once per target
    #[serde(default)]
    pub execute_once: bool,
}

impl Configurable for ActionConfig {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("cooldown", |c: &mut ActionConfig, v| {
                c.cooldown = parse_duration_value(v)?;
                Ok(())
            })
            .describe("minimum time between two executions for the same target")
            .option("delay", |c: &mut ActionConfig, v| {
                c.delay = parse_duration_value(v)?;
                Ok(())
            })
            .describe("time to wait before executing")
            .option("execute_once", |c: &mut ActionConfig, v| {
                c.execute_once = parse_flag(v)?;
                Ok(())
            })
            .describe("only execute once per target")
    }
}

/// Node options of a requirement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementConfig {
    /// Invert the test outcome
    #[serde(default)]
    pub negated: bool,

    /// Once passed for a target, keep passing without testing again
    #[serde(default)]
    pub check_once: bool,
}

impl Configurable for RequirementConfig {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("negated", |c: &mut RequirementConfig, v| {
                c.negated = parse_flag(v)?;
                Ok(())
            })
            .describe("invert the test outcome")
            .option("check_once", |c: &mut RequirementConfig, v| {
                c.check_once = parse_flag(v)?;
                Ok(())
            })
            .describe("keep passing once passed for a target")
    }
}

/// Node options of a trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Minimum time between two firings for the same target
    #[serde(default, with = "duration_millis")]
    pub cooldown: Duration,

    /// Only ever fire once per target
    #[serde(default)]
    pub execute_once: bool,
}

impl Configurable for TriggerConfig {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("cooldown", |c: &mut TriggerConfig, v| {
                c.cooldown = parse_duration_value(v)?;
                Ok(())
            })
            .describe("minimum time between two firings for the same target")
            .option("execute_once", |c: &mut TriggerConfig, v| {
                c.execute_once = parse_flag(v)?;
                Ok(())
            })
            .describe("only fire once per target")
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
