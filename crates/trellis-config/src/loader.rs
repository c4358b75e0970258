//! Script file loading
//!
//! A script file holds either one script document or a list of them. A
//! directory is loaded by reading every `*.yaml`/`*.yml` file in it, sorted by
//! name. Script ids must be unique across everything one loader returns.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::script::{EngineSettings, ScriptConfig};

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptDocument {
    Many(Vec<ScriptConfig>),
    One(ScriptConfig),
}

/// Loads scripts from a file or directory
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    path: PathBuf,
}

impl ScriptLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every script under the configured path
    pub fn load(&self) -> ConfigResult<Vec<ScriptConfig>> {
        let files = if self.path.is_dir() {
            yaml_files(&self.path)?
        } else if self.path.is_file() {
            vec![self.path.clone()]
        } else {
            return Err(ConfigError::NotFound {
                path: self.path.clone(),
            });
        };

        let mut scripts = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for file in files {
            for script in load_file(&file)? {
                if seen.contains_key(&script.id) {
                    return Err(ConfigError::DuplicateId {
                        id: script.id,
                        path: file,
                    });
                }
                seen.insert(script.id.clone(), file.clone());
                scripts.push(script);
            }
        }

        debug!(path = ?self.path, count = scripts.len(), "Loaded scripts");
        Ok(scripts)
    }
}

/// Load the scripts of a single file
pub fn load_file(path: &Path) -> ConfigResult<Vec<ScriptConfig>> {
    trace!("Loading script file: {:?}", path);
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: ScriptDocument =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(match document {
        ScriptDocument::Many(scripts) => scripts,
        ScriptDocument::One(script) => vec![script],
    })
}

/// Load engine settings from a YAML file
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<EngineSettings> {
    let path = path.as_ref();
    debug!("Loading engine settings: {:?}", path);
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let settings: EngineSettings =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })?;
    settings.validate()?;
    Ok(settings)
}

/// All YAML files in a directory, sorted by name
fn yaml_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "welcome.yaml",
            "id: welcome\nlines:\n  - '@join'\n  - '!greet'\n",
        );

        let scripts = ScriptLoader::new(dir.path().join("welcome.yaml"))
            .load()
            .unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].id, "welcome");
        assert_eq!(scripts[0].lines, vec!["@join", "!greet"]);
    }

    #[test]
    fn test_load_directory_sorted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.yaml", "id: second\nlines: []\n");
        write_file(dir.path(), "a.yml", "id: first\nlines: []\n");
        write_file(dir.path(), "notes.txt", "not a script");
        write_file(dir.path(), "nested/c.yaml", "id: ignored\n");

        let scripts = ScriptLoader::new(dir.path()).load().unwrap();
        let ids: Vec<_> = scripts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_load_list_document() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "many.yaml",
            "- id: one\n  lines: ['!a']\n- id: two\n  art: ['!b']\n",
        );

        let scripts = ScriptLoader::new(dir.path()).load().unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[1].lines, vec!["!b"]);
    }

    #[test]
    fn test_empty_file_has_no_scripts() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "empty.yaml", "\n");
        assert!(ScriptLoader::new(dir.path()).load().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_id() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.yaml", "id: same\n");
        write_file(dir.path(), "b.yaml", "id: same\n");

        let err = ScriptLoader::new(dir.path()).load().unwrap_err();
        match err {
            ConfigError::DuplicateId { id, path } => {
                assert_eq!(id, "same");
                assert!(path.ends_with("b.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "bad.yaml", "id: [unclosed\n");
        assert!(matches!(
            ScriptLoader::new(dir.path()).load(),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ScriptLoader::new(dir.path().join("missing")).load(),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_settings() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "engine.yaml",
            "default_settings:\n  execute_actions: false\nevent_capacity: 16\n",
        );

        let settings = load_settings(dir.path().join("engine.yaml")).unwrap();
        assert!(settings.default_settings.auto_trigger);
        assert!(!settings.default_settings.execute_actions);
        assert_eq!(settings.event_capacity, 16);
    }
}
