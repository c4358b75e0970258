//! Shared test components
//!
//! A tiny game-like domain: players with health, a journal recording what
//! actions did, and a few actions, requirements and triggers over them.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use trellis_core::{
    parse_value, Action, ConfigSchema, Configurable, ExecutionContext, Outcome, Requirement,
    Target, Trigger, TriggerData,
};
use trellis_flow::Registry;

/// Records action side effects
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub health: u32,
    pub journal: Journal,
}

impl Player {
    pub fn new(name: &str, health: u32, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            health,
            journal: journal.clone(),
        }
    }

    pub fn target(&self) -> Target {
        Target::new(self.name.clone(), self.clone())
    }
}

/// `!heal <amount>`
#[derive(Debug, Default)]
pub struct Heal {
    amount: u32,
}

impl Configurable for Heal {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("amount", |c: &mut Heal, v| {
                c.amount = parse_value(v)?;
                Ok(())
            })
            .at(0)
    }
}

impl Action for Heal {
    type Target = Player;

    fn execute(&self, player: &Player, ctx: &ExecutionContext) -> Outcome {
        let source = ctx
            .get_var("source")
            .and_then(|v| v.as_str())
            .map(|s| format!(" from {}", s))
            .unwrap_or_default();
        player
            .journal
            .record(format!("heal {} {}{}", player.name, self.amount, source));
        Outcome::success()
    }
}

/// `!log <text>`
#[derive(Debug, Default)]
pub struct Log {
    text: String,
}

impl Configurable for Log {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("text", |c: &mut Log, v| {
                c.text = v.to_string();
                Ok(())
            })
            .at(0)
    }
}

impl Action for Log {
    type Target = Player;

    fn execute(&self, player: &Player, _ctx: &ExecutionContext) -> Outcome {
        player.journal.record(format!("log {}", self.text));
        Outcome::success()
    }
}

/// `!fail`, an action whose body always fails
#[derive(Debug, Default)]
pub struct Fail;

impl Configurable for Fail {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
    }
}

impl Action for Fail {
    type Target = Player;

    fn execute(&self, _player: &Player, _ctx: &ExecutionContext) -> Outcome {
        Outcome::failure("boom")
    }
}

/// `!explode`, an action whose body panics
#[derive(Debug, Default)]
pub struct Explode;

impl Configurable for Explode {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
    }
}

impl Action for Explode {
    type Target = Player;

    fn execute(&self, _player: &Player, _ctx: &ExecutionContext) -> Outcome {
        panic!("kaboom")
    }
}

/// `!shout`, an action on plain strings
#[derive(Debug, Default)]
pub struct Shout;

impl Configurable for Shout {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
    }
}

impl Action for Shout {
    type Target = String;

    fn execute(&self, _target: &String, _ctx: &ExecutionContext) -> Outcome {
        Outcome::success_with("shouted")
    }
}

/// `?health <min>`
#[derive(Debug, Default)]
pub struct MinHealth {
    min: u32,
}

impl Configurable for MinHealth {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("min", |c: &mut MinHealth, v| {
                c.min = parse_value(v)?;
                Ok(())
            })
            .at(0)
    }
}

impl Requirement for MinHealth {
    type Target = Player;

    fn test(&self, player: &Player, _ctx: &ExecutionContext) -> Outcome {
        if player.health >= self.min {
            Outcome::success()
        } else {
            Outcome::failure(format!("{} has less than {} health", player.name, self.min))
        }
    }
}

/// `?named <name>`, counting how often it was tested
#[derive(Debug, Default)]
pub struct Named {
    name: String,
}

impl Configurable for Named {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("name", |c: &mut Named, v| {
                c.name = v.to_string();
                Ok(())
            })
            .at(0)
    }
}

impl Requirement for Named {
    type Target = Player;

    fn test(&self, player: &Player, _ctx: &ExecutionContext) -> Outcome {
        player.journal.record(format!("tested {}", self.name));
        Outcome::from(player.name == self.name)
    }
}

/// `@join [region]`
#[derive(Debug, Default)]
pub struct Join {
    region: Option<String>,
}

impl Configurable for Join {
    fn schema() -> ConfigSchema<Self> {
        ConfigSchema::new()
            .option("region", |c: &mut Join, v| {
                c.region = Some(v.to_string());
                Ok(())
            })
            .at(0)
    }
}

impl Trigger for Join {
    type Target = Player;

    fn test(&self, _player: &Player, data: &TriggerData) -> Outcome {
        match &self.region {
            None => Outcome::success(),
            Some(region) => {
                let actual = data.get_var("region").and_then(|v| v.as_str());
                if actual == Some(region.as_str()) {
                    Outcome::success()
                } else {
                    Outcome::failure(format!("not in region {}", region))
                }
            }
        }
    }
}

/// Install a test log subscriber, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> Arc<Registry> {
    init_tracing();
    let registry = Registry::new();
    registry.register_action::<Heal>("heal");
    registry.register_action::<Log>("log");
    registry.register_action::<Fail>("fail");
    registry.register_action::<Explode>("explode");
    registry.register_action::<Shout>("shout");
    registry.register_requirement::<MinHealth>("health");
    registry.register_requirement::<Named>("named");
    registry.register_trigger::<Join>("join");
    registry.register_trigger::<Join>("leave");
    Arc::new(registry)
}
