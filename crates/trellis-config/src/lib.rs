//! Script and settings loading
//!
//! Scripts are YAML documents holding the lines to compile plus settings
//! controlling how the engine runs them. This crate only reads and validates
//! the documents; compiling the lines is up to the engine.
//!
//! # Example
//!
//! ```ignore
//! use trellis_config::ScriptLoader;
//!
//! let scripts = ScriptLoader::new("/etc/trellis/scripts").load()?;
//! ```

mod error;
mod loader;
mod script;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_file, load_settings, ScriptLoader};
pub use script::{EngineSettings, ScriptConfig, ScriptSettings, FLOW_PARSER};
