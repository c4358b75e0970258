//! Option binding
//!
//! Components declare their options through a [`ConfigSchema`]: a list of
//! option keys, each with a setter writing the parsed value into the config
//! struct. The binder tokenizes raw option text and applies it through the
//! schema.
//!
//! # Option grammar
//!
//! ```text
//! options  = entry { ("," | ";" | whitespace) entry }
//! entry    = key ("=" | ":") value | value
//! value    = bare | '"' any '"'
//! ```
//!
//! Bare values are positional and fill the options declared with a position,
//! in order. Nested configs are addressed with dotted keys (`spawn.x=10`).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::duration::parse_duration;

/// Option binding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("unknown option '{key}'")]
    UnknownOption { key: String },

    #[error("missing required option '{key}'")]
    MissingRequired { key: String },

    #[error("invalid value '{value}' for option '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unexpected positional value '{value}'")]
    UnexpectedValue { value: String },

    #[error("found same position {position} on options: {keys}")]
    DuplicatePosition { position: usize, keys: String },

    #[error("unterminated quote in options: {input}")]
    UnterminatedQuote { input: String },
}

/// Result type for option binding
pub type BindResult<T> = Result<T, BindError>;

/// A config type with a declared option schema
pub trait Configurable: Default + Send + Sync + 'static {
    fn schema() -> ConfigSchema<Self>;
}

/// Bind raw option text into a fresh config
pub fn bind<C: Configurable>(raw: &str) -> BindResult<C> {
    C::schema().bind(raw)
}

type Setter<C> = Box<dyn Fn(&mut C, &str) -> Result<(), String> + Send + Sync>;

/// A single declared option
pub struct ConfigOption<C> {
    key: String,
    position: Option<usize>,
    required: bool,
    description: Option<String>,
    setter: Setter<C>,
}

impl<C> ConfigOption<C> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn apply(&self, config: &mut C, value: &str) -> BindResult<()> {
        (self.setter)(config, value).map_err(|reason| BindError::InvalidValue {
            key: self.key.clone(),
            value: value.to_string(),
            reason,
        })
    }
}

impl<C> fmt::Debug for ConfigOption<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("key", &self.key)
            .field("position", &self.position)
            .field("required", &self.required)
            .finish()
    }
}

/// Declared options of a config type
pub struct ConfigSchema<C> {
    options: Vec<ConfigOption<C>>,
}

impl<C: 'static> ConfigSchema<C> {
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
        }
    }

    /// Declare a named option
    pub fn option<F>(mut self, key: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut C, &str) -> Result<(), String> + Send + Sync + 'static,
    {
        self.options.push(ConfigOption {
            key: key.into(),
            position: None,
            required: false,
            description: None,
            setter: Box::new(setter),
        });
        self
    }

    /// Make the last declared option fill the given positional slot
    pub fn at(mut self, position: usize) -> Self {
        if let Some(option) = self.options.last_mut() {
            option.position = Some(position);
        }
        self
    }

    /// Mark the last declared option as required
    pub fn required(mut self) -> Self {
        if let Some(option) = self.options.last_mut() {
            option.required = true;
        }
        self
    }

    /// Describe the last declared option
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        if let Some(option) = self.options.last_mut() {
            option.description = Some(description.into());
        }
        self
    }

    /// Embed the options of a nested config under `prefix.`
    ///
    /// Positions of nested options are not carried over.
    pub fn nest<N: 'static>(
        mut self,
        prefix: &str,
        accessor: fn(&mut C) -> &mut N,
        schema: ConfigSchema<N>,
    ) -> Self {
        for option in schema.options {
            let inner = option.setter;
            self.options.push(ConfigOption {
                key: format!("{}.{}", prefix, option.key),
                position: None,
                required: option.required,
                description: option.description,
                setter: Box::new(move |config: &mut C, value: &str| inner(accessor(config), value)),
            });
        }
        self
    }

    /// All declared options
    pub fn options(&self) -> &[ConfigOption<C>] {
        &self.options
    }

    /// Find an option by key (case-insensitive, `-` and `_` are equivalent)
    pub fn find(&self, key: &str) -> Option<&ConfigOption<C>> {
        let key = normalize_key(key);
        self.options.iter().find(|o| normalize_key(&o.key) == key)
    }

    /// Bind option text into a fresh default config
    pub fn bind(&self, raw: &str) -> BindResult<C>
    where
        C: Default,
    {
        let mut config = C::default();
        self.apply(&mut config, raw)?;
        Ok(config)
    }

    /// Apply option text onto an existing config
    pub fn apply(&self, config: &mut C, raw: &str) -> BindResult<()> {
        let positional = self.positional_options()?;
        let mut next_position = 0;
        let mut seen: HashSet<&str> = HashSet::new();

        for token in tokenize(raw)? {
            let (option, value) = match token.key {
                Some(key) => match self.find(&key) {
                    Some(option) => (option, token.value),
                    // `12:30` is a positional value, not a key
                    None if token.separator == ':' => {
                        let value = format!("{}:{}", key, token.value);
                        let option = positional
                            .get(next_position)
                            .copied()
                            .ok_or_else(|| BindError::UnexpectedValue {
                                value: value.clone(),
                            })?;
                        next_position += 1;
                        (option, value)
                    }
                    None => return Err(BindError::UnknownOption { key }),
                },
                None => {
                    let option = positional
                        .get(next_position)
                        .copied()
                        .ok_or_else(|| BindError::UnexpectedValue {
                            value: token.value.clone(),
                        })?;
                    next_position += 1;
                    (option, token.value)
                }
            };

            option.apply(config, &value)?;
            seen.insert(option.key.as_str());
        }

        if let Some(missing) = self
            .options
            .iter()
            .find(|o| o.required && !seen.contains(o.key.as_str()))
        {
            return Err(BindError::MissingRequired {
                key: missing.key.clone(),
            });
        }

        Ok(())
    }

    fn positional_options(&self) -> BindResult<Vec<&ConfigOption<C>>> {
        let mut positional: Vec<&ConfigOption<C>> =
            self.options.iter().filter(|o| o.position.is_some()).collect();
        positional.sort_by_key(|o| o.position);

        for pair in positional.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(BindError::DuplicatePosition {
                    position: pair[0].position.unwrap_or_default(),
                    keys: format!("{},{}", pair[0].key, pair[1].key),
                });
            }
        }

        Ok(positional)
    }
}

impl<C: 'static> Default for ConfigSchema<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ConfigSchema<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.options.iter()).finish()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "_")
}

/// Parse a value with its `FromStr` implementation
pub fn parse_value<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| e.to_string())
}

/// Parse a boolean flag
pub fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "" | "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}

/// Parse a duration value, see [`parse_duration`]
pub fn parse_duration_value(value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| "expected a duration like 500, 5s or 1h30m".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    key: Option<String>,
    separator: char,
    value: String,
}

/// Split option text into key/value tokens
fn tokenize(raw: &str) -> BindResult<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut key: Option<String> = None;
    let mut separator = '=';
    let mut buf = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    fn flush(
        tokens: &mut Vec<Token>,
        key: &mut Option<String>,
        separator: char,
        buf: &mut String,
        quoted: &mut bool,
    ) {
        if buf.is_empty() && key.is_none() && !*quoted {
            return;
        }
        tokens.push(Token {
            key: key.take(),
            separator,
            value: std::mem::take(buf),
        });
        *quoted = false;
    }

    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if in_quotes => buf.push(c),
            ',' | ';' => flush(&mut tokens, &mut key, separator, &mut buf, &mut quoted),
            c if c.is_whitespace() => {
                // `key= value` keeps waiting for the value
                if key.is_some() && buf.is_empty() && !quoted {
                    continue;
                }
                flush(&mut tokens, &mut key, separator, &mut buf, &mut quoted);
            }
            '=' | ':' if key.is_none() && !quoted => {
                if buf.is_empty() {
                    // `key = value`: the key was already flushed as a bare value
                    match tokens.last() {
                        Some(Token { key: None, .. }) => {
                            key = tokens.pop().map(|t| t.value);
                        }
                        _ => buf.push(c),
                    }
                } else {
                    key = Some(std::mem::take(&mut buf));
                }
                separator = c;
            }
            c => buf.push(c),
        }
    }

    if in_quotes {
        return Err(BindError::UnterminatedQuote {
            input: raw.to_string(),
        });
    }
    flush(&mut tokens, &mut key, separator, &mut buf, &mut quoted);

    Ok(tokens)
}
