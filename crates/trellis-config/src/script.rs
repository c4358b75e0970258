//! Script and engine settings documents
//!
//! A script file looks like:
//!
//! ```yaml
//! id: welcome
//! alias: Welcome new players
//! settings:
//!   auto_trigger: true
//! lines:
//!   - "@join"
//!   - "!greet \"welcome!\""
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ulid::Ulid;

use crate::error::{ConfigError, ConfigResult};

/// The only line syntax currently understood
pub const FLOW_PARSER: &str = "flow";

/// How the engine treats a loaded script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Fire the script's triggers when the host fires a matching identifier
    #[serde(default = "default_true")]
    pub auto_trigger: bool,

    /// Run trigger actions; when off, firing only tests and publishes events
    #[serde(default = "default_true")]
    pub execute_actions: bool,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            auto_trigger: true,
            execute_actions: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_id() -> String {
    Ulid::new().to_string()
}

fn default_parser() -> String {
    FLOW_PARSER.to_string()
}

/// One script document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Unique identifier, generated when absent
    #[serde(default = "default_id")]
    pub id: String,

    /// Friendly name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Line syntax of `lines`
    #[serde(default = "default_parser")]
    pub parser: String,

    /// Per-script settings, falling back to the engine defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ScriptSettings>,

    /// Script lines
    #[serde(default, alias = "art")]
    pub lines: Vec<String>,
}

impl ScriptConfig {
    pub fn new(id: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            parser: default_parser(),
            settings: None,
            lines,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_settings(mut self, settings: ScriptSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Alias if set, otherwise the id
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id)
    }

    /// Settings to run this script with
    pub fn effective_settings(&self, defaults: &ScriptSettings) -> ScriptSettings {
        self.settings.unwrap_or(*defaults)
    }

    /// Parse a single script from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
            path: PathBuf::from("<string>"),
            source,
        })
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Settings for scripts that declare none
    #[serde(default)]
    pub default_settings: ScriptSettings,

    /// Directory scripts are loaded from at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_dir: Option<PathBuf>,

    /// Buffered trigger events per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_settings: ScriptSettings::default(),
            script_dir: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl EngineSettings {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let settings: Self =
            serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
                path: PathBuf::from("<string>"),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_defaults() {
        let script = ScriptConfig::from_yaml_str("lines:\n  - '!greet'\n").unwrap();
        assert!(Ulid::from_string(&script.id).is_ok());
        assert_eq!(script.parser, FLOW_PARSER);
        assert_eq!(script.settings, None);
        assert_eq!(script.lines, vec!["!greet"]);
        assert_eq!(script.display_name(), script.id);
    }

    #[test]
    fn test_art_alias_for_lines() {
        let yaml = r#"
id: welcome
alias: Welcome
art:
  - "@join"
  - "!greet"
"#;
        let script = ScriptConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(script.id, "welcome");
        assert_eq!(script.display_name(), "Welcome");
        assert_eq!(script.lines.len(), 2);
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let yaml = "id: quiet\nsettings:\n  execute_actions: false\n";
        let script = ScriptConfig::from_yaml_str(yaml).unwrap();
        let settings = script.effective_settings(&ScriptSettings::default());
        assert!(settings.auto_trigger);
        assert!(!settings.execute_actions);
    }

    #[test]
    fn test_effective_settings_fall_back() {
        let defaults = ScriptSettings {
            auto_trigger: false,
            execute_actions: true,
        };
        let script = ScriptConfig::new("a", vec![]);
        assert_eq!(script.effective_settings(&defaults), defaults);
    }

    #[test]
    fn test_engine_settings() {
        let settings = EngineSettings::from_yaml_str(
            "default_settings:\n  auto_trigger: false\nscript_dir: scripts\n",
        )
        .unwrap();
        assert!(!settings.default_settings.auto_trigger);
        assert_eq!(settings.script_dir, Some(PathBuf::from("scripts")));
        assert_eq!(settings.event_capacity, 256);

        assert!(matches!(
            EngineSettings::from_yaml_str("event_capacity: 0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
