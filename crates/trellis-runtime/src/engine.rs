//! Engine
//!
//! Ties the pieces together: scripts are compiled with the shared registry,
//! kept by id, and evaluated through the runtime. Native values are wrapped
//! into targets through the target registry; values without an adapter
//! evaluate to [`Outcome::Empty`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use trellis_config::{
    ConfigError, EngineSettings, ScriptConfig, ScriptLoader, ScriptSettings, FLOW_PARSER,
};
use trellis_core::{
    CombinedOutcome, ExecutionContext, FutureOutcome, Outcome, Target, TargetRegistry,
    TriggerData,
};
use trellis_flow::{CompileError, Compiler, Forest, Registry};

use crate::runtime::Runtime;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Failed to compile script '{id}': {source}")]
    Compile {
        id: String,
        #[source]
        source: CompileError,
    },

    #[error("Unsupported parser '{parser}' in script '{id}'")]
    UnsupportedParser { id: String, parser: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A compiled, loaded script
#[derive(Debug, Clone)]
pub struct Script {
    id: String,
    alias: Option<String>,
    settings: ScriptSettings,
    forest: Arc<Forest>,
    loaded_at: DateTime<Utc>,
}

impl Script {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }

    /// Settings in effect, with engine defaults applied
    pub fn settings(&self) -> ScriptSettings {
        self.settings
    }

    pub fn forest(&self) -> &Arc<Forest> {
        &self.forest
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Published after a trigger of a loaded script fired
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub script_id: String,
    pub trigger: String,
    pub target_id: String,
    pub data: TriggerData,
    /// Whether the trigger's actions were run
    pub executed: bool,
    pub outcome: Outcome,
}

/// Script engine
pub struct Engine {
    compiler: Compiler,
    targets: Arc<TargetRegistry>,
    runtime: Runtime,
    settings: EngineSettings,
    scripts: DashMap<String, Script>,
    events: broadcast::Sender<TriggerEvent>,
}

impl Engine {
    /// Engine with default settings, an empty target registry and a runtime
    /// on the system clock
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_settings(registry, EngineSettings::default())
    }

    pub fn with_settings(registry: Arc<Registry>, settings: EngineSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        Self {
            compiler: Compiler::new(registry),
            targets: Arc::new(TargetRegistry::new()),
            runtime: Runtime::new(),
            settings,
            scripts: DashMap::new(),
            events,
        }
    }

    pub fn with_targets(mut self, targets: Arc<TargetRegistry>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.compiler.registry()
    }

    pub fn targets(&self) -> &Arc<TargetRegistry> {
        &self.targets
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn compile(&self, config: &ScriptConfig) -> EngineResult<Script> {
        if !config.parser.eq_ignore_ascii_case(FLOW_PARSER) {
            return Err(EngineError::UnsupportedParser {
                id: config.id.clone(),
                parser: config.parser.clone(),
            });
        }

        let forest = self
            .compiler
            .compile_lines(config.lines.as_slice())
            .map_err(|source| EngineError::Compile {
                id: config.id.clone(),
                source,
            })?;

        Ok(Script {
            id: config.id.clone(),
            alias: config.alias.clone(),
            settings: config.effective_settings(&self.settings.default_settings),
            forest: Arc::new(forest),
            loaded_at: self.runtime.now(),
        })
    }

    /// Compile and add a script, replacing one with the same id
    pub fn load(&self, config: ScriptConfig) -> EngineResult<String> {
        let script = self.compile(&config)?;
        let id = script.id.clone();
        info!(
            "Loaded script: {} ({} nodes)",
            script.display_name(),
            script.forest.len()
        );
        self.scripts.insert(id.clone(), script);
        Ok(id)
    }

    /// Compile and add several scripts; nothing is added if any fails
    pub fn load_all(&self, configs: Vec<ScriptConfig>) -> EngineResult<usize> {
        let scripts = configs
            .iter()
            .map(|config| self.compile(config))
            .collect::<EngineResult<Vec<_>>>()?;
        let count = scripts.len();
        for script in scripts {
            self.scripts.insert(script.id.clone(), script);
        }
        info!("Loaded {} scripts", count);
        Ok(count)
    }

    /// Load every script in a file or directory
    pub fn load_path(&self, path: impl AsRef<Path>) -> EngineResult<usize> {
        let configs = ScriptLoader::new(path.as_ref()).load()?;
        self.load_all(configs)
    }

    /// Compile lines as a script with default settings
    pub fn load_lines<S: AsRef<str>>(&self, id: &str, lines: &[S]) -> EngineResult<String> {
        let lines = lines.iter().map(|l| l.as_ref().to_string()).collect();
        self.load(ScriptConfig::new(id, lines))
    }

    pub fn remove(&self, id: &str) -> EngineResult<Script> {
        let (_, script) = self
            .scripts
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        info!("Removed script: {}", script.display_name());
        Ok(script)
    }

    pub fn get(&self, id: &str) -> Option<Script> {
        self.scripts.get(id).map(|s| s.value().clone())
    }

    /// Ids of all loaded scripts, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.scripts.iter().map(|s| s.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.scripts.len()
    }

    fn forest(&self, id: &str) -> EngineResult<Arc<Forest>> {
        self.scripts
            .get(id)
            .map(|s| Arc::clone(&s.forest))
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn wrap<T: Any + Send + Sync>(&self, value: T) -> Option<Target> {
        let target = self.targets.wrap(value);
        if target.is_none() {
            debug!(
                value_type = std::any::type_name::<T>(),
                "No target adapter for value"
            );
        }
        target
    }

    /// Test the top-level requirements of a script against a value
    pub fn test<T: Any + Send + Sync>(&self, id: &str, value: T) -> EngineResult<CombinedOutcome> {
        let forest = self.forest(id)?;
        Ok(match self.wrap(value) {
            Some(target) => self
                .runtime
                .test(&forest, &target, &ExecutionContext::new()),
            None => CombinedOutcome::new(),
        })
    }

    /// Execute the top-level actions of a script against a value
    pub fn execute<T: Any + Send + Sync>(&self, id: &str, value: T) -> EngineResult<FutureOutcome> {
        let forest = self.forest(id)?;
        Ok(match self.wrap(value) {
            Some(target) => self
                .runtime
                .execute(&forest, &target, &ExecutionContext::new()),
            None => FutureOutcome::completed(Outcome::Empty),
        })
    }

    /// Fire `identifier` for a value across all loaded scripts
    pub fn trigger<T: Any + Send + Sync>(&self, identifier: &str, value: T) -> FutureOutcome {
        self.trigger_with(value, TriggerData::new(identifier))
    }

    /// Fire a trigger with data across all loaded scripts
    ///
    /// Scripts are dispatched when `auto_trigger` is set or while someone is
    /// subscribed to events. Dispatched scripts run the actions of every
    /// matching trigger unless `execute_actions` is off, in which case the
    /// triggers are only tested.
    pub fn trigger_with<T: Any + Send + Sync>(&self, value: T, data: TriggerData) -> FutureOutcome {
        let Some(target) = self.wrap(value) else {
            return FutureOutcome::completed(Outcome::Empty);
        };

        let scripts: Vec<Script> = self.scripts.iter().map(|s| s.value().clone()).collect();
        let mut results = Vec::new();

        for script in scripts {
            let settings = script.settings();
            let dispatch = settings.auto_trigger || self.events.receiver_count() > 0;
            if !dispatch {
                continue;
            }
            let execute = settings.execute_actions;

            for node in script.forest.triggers_for(&data.identifier) {
                if !node.trigger().accepts(&target) {
                    continue;
                }
                let result = if execute {
                    self.runtime.fire_trigger(node, &target, &data)
                } else {
                    FutureOutcome::completed(self.runtime.test_trigger(node, &target, &data))
                };
                trace!(
                    script = script.id(),
                    trigger = node.identifier(),
                    execute,
                    "Dispatched trigger"
                );

                let events = self.events.clone();
                let event = TriggerEvent {
                    script_id: script.id.clone(),
                    trigger: node.identifier().to_string(),
                    target_id: target.id().to_string(),
                    data: data.clone(),
                    executed: execute,
                    outcome: Outcome::Empty,
                };
                result.on_complete(move |outcome| {
                    // No receivers is not an error
                    let _ = events.send(TriggerEvent {
                        outcome: outcome.clone(),
                        ..event
                    });
                });
                results.push(result);
            }
        }

        FutureOutcome::all(results)
    }

    /// Subscribe to trigger events
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scripts", &self.scripts.len())
            .field("runtime", &self.runtime)
            .field("settings", &self.settings)
            .finish()
    }
}
