//! Sequence definitions persisted as a simple config file
//!
//! ```text
//! # keyseq sequences
//! konami = up up down down left right left right b a
//! konami.timeout = 2000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ConfigError;
use crate::key::{codes, key_name, parse_key, KeyCode, KeyPress};
use crate::matcher::{SequenceMatcher, SequenceMatcherBuilder};

const TIMEOUT_SUFFIX: &str = ".timeout";

/// One named sequence as written in the config file.
///
/// Values are kept raw and validated when a matcher is built, so a bad
/// entry only disables its own sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceConfig {
    pub name: String,
    /// Key list, `None` if only a timeout line mentions this name
    pub keys: Option<String>,
    pub timeout: Option<String>,
}

impl SequenceConfig {
    pub fn new(name: impl Into<String>, keys: &[KeyCode], timeout_ms: u64) -> Self {
        let keys = keys
            .iter()
            .map(|&code| key_name(code).unwrap_or_else(|| code.to_string()))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            name: name.into(),
            keys: Some(keys),
            timeout: (timeout_ms > 0).then(|| timeout_ms.to_string()),
        }
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keys: None,
            timeout: None,
        }
    }

    /// Parse the key list
    pub fn keys(&self) -> Result<Vec<KeyCode>, ConfigError> {
        let raw = self.keys.as_deref().ok_or_else(|| ConfigError::MissingSequence {
            name: self.name.clone(),
        })?;

        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                parse_key(token).ok_or_else(|| ConfigError::InvalidKey {
                    name: self.name.clone(),
                    token: token.to_string(),
                })
            })
            .collect()
    }

    /// Parse the timeout, 0 when absent
    pub fn timeout_ms(&self) -> Result<u64, ConfigError> {
        match self.timeout.as_deref() {
            None => Ok(0),
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
                name: self.name.clone(),
                value: value.to_string(),
            }),
        }
    }

    /// Validated builder, ready for callbacks
    pub fn builder(&self) -> Result<SequenceMatcherBuilder<KeyPress>, ConfigError> {
        let result = self.keys().and_then(|keys| {
            let timeout_ms = self.timeout_ms()?;
            Ok(SequenceMatcher::builder(keys).timeout_ms(timeout_ms))
        });
        if let Err(ref e) = result {
            warn!("skipping sequence '{}': {}", self.name, e);
        }
        result
    }

    /// Build a matcher with no callbacks
    pub fn matcher(&self) -> Result<SequenceMatcher, ConfigError> {
        self.builder()?.build()
    }
}

/// All configured sequences, in file order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub sequences: Vec<SequenceConfig>,
}

impl Config {
    /// Built-in sequences used when no config file exists
    pub fn default_sequences() -> Self {
        let konami = [
            codes::UP,
            codes::UP,
            codes::DOWN,
            codes::DOWN,
            codes::LEFT,
            codes::RIGHT,
            codes::LEFT,
            codes::RIGHT,
            codes::B,
            codes::A,
        ];
        Self {
            sequences: vec![SequenceConfig::new("konami", &konami, 2000)],
        }
    }

    /// Load config from the default location
    ///
    /// Falls back to [`Config::default_sequences`] if the file can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("using built-in sequences, {} not loaded: {}", path.display(), e);
            Self::default_sequences()
        })
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())?;
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyseq")
            .join("sequences.conf")
    }

    pub fn get(&self, name: &str) -> Option<&SequenceConfig> {
        self.sequences.iter().find(|s| s.name == name)
    }

    fn entry(&mut self, name: &str) -> &mut SequenceConfig {
        let index = match self.sequences.iter().position(|s| s.name == name) {
            Some(i) => i,
            None => {
                self.sequences.push(SequenceConfig::named(name));
                self.sequences.len() - 1
            }
        };
        &mut self.sequences[index]
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                warn!("config line {}: expected 'name = keys'", lineno + 1);
                continue;
            };
            let key = key.trim();
            let value = value.trim().to_string();

            match key.strip_suffix(TIMEOUT_SUFFIX) {
                Some(name) if !name.is_empty() => config.entry(name).timeout = Some(value),
                _ if key.is_empty() || key == TIMEOUT_SUFFIX => {
                    warn!("config line {}: missing sequence name", lineno + 1);
                }
                _ => config.entry(key).keys = Some(value),
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec!["# keyseq sequences".to_string()];

        for seq in &self.sequences {
            if let Some(ref keys) = seq.keys {
                lines.push(format!("{} = {}", seq.name, keys));
            }
            if let Some(ref timeout) = seq.timeout {
                lines.push(format!("{}{} = {}", seq.name, TIMEOUT_SUFFIX, timeout));
            }
        }

        lines.join("\n")
    }
}
