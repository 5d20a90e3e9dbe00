use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AquiferError, ConfigError};

/// Engine configuration: mention grammar plus popup behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters and element names making up the mention grammar.
    pub syntax: SyntaxConfig,
    /// Candidate popup behaviour.
    pub popup: PopupConfig,
}

/// The mention grammar shared by the persisted token and the display markup.
///
/// Persisted tokens look like `{token_open}{sigil}{id}{id_separator}{name}{token_close}`,
/// display mentions like `<{mention_tag} class="{mention_class}">{sigil}{name}</{mention_tag}>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    pub sigil: char,
    pub token_open: char,
    pub token_close: char,
    pub id_separator: char,
    pub mention_tag: String,
    /// Class emitted on rendered mentions. Not required when reading markup back.
    pub mention_class: Option<String>,
    /// Punctuation allowed inside a mention that is still being typed.
    pub punctuation: String,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            sigil: '@',
            token_open: '{',
            token_close: '}',
            id_separator: '|',
            mention_tag: "span".to_owned(),
            mention_class: Some("mention".to_owned()),
            punctuation: ".'-".to_owned(),
        }
    }
}

impl SyntaxConfig {
    /// Check that the grammar is unambiguous.
    pub fn validate(&self) -> Result<(), AquiferError> {
        let markers = [
            ("sigil", self.sigil),
            ("token_open", self.token_open),
            ("token_close", self.token_close),
            ("id_separator", self.id_separator),
        ];
        for (name, c) in markers {
            if c.is_alphanumeric() || c.is_whitespace() || c == '<' || c == '>' {
                return Err(AquiferError::InvalidSyntax(format!(
                    "{name} {c:?} must be punctuation other than '<' and '>'"
                )));
            }
        }
        for (i, (a_name, a)) in markers.iter().enumerate() {
            for (b_name, b) in &markers[i + 1..] {
                if a == b {
                    return Err(AquiferError::InvalidSyntax(format!(
                        "{a_name} and {b_name} are both {a:?}"
                    )));
                }
            }
        }
        if self.mention_tag.is_empty()
            || !self.mention_tag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AquiferError::InvalidSyntax(format!(
                "mention_tag {:?} is not an element name",
                self.mention_tag
            )));
        }
        if let Some(class) = &self.mention_class {
            if class.contains(['"', '<', '>']) {
                return Err(AquiferError::InvalidSyntax(format!(
                    "mention_class {class:?} cannot be used as an attribute value"
                )));
            }
        }
        if let Some(c) = self
            .punctuation
            .chars()
            .find(|c| c.is_alphanumeric() || c.is_whitespace() || *c == self.sigil)
        {
            return Err(AquiferError::InvalidSyntax(format!(
                "punctuation contains {c:?}"
            )));
        }
        Ok(())
    }
}

/// Candidate popup behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PopupConfig {
    /// Truncate the filtered candidate list. None shows every match.
    pub max_candidates: Option<usize>,
    /// Arrow keys wrap around the list instead of stopping at the ends.
    pub wrap_selection: bool,
}

impl EngineConfig {
    /// Loads and validates the configuration from the provided loader.
    pub fn load(loader: &impl Loader) -> Result<Self, AquiferError> {
        let config = loader.load()?;
        config.syntax.validate()?;
        Ok(config)
    }

    /// Saves the configuration using the provided saver.
    pub fn save(&self, saver: &impl Saver) -> Result<(), AquiferError> {
        saver.save(self)?;
        Ok(())
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    fn load(&self) -> Result<EngineConfig, ConfigError>;
}

/// The trait for saving configuration data.
pub trait Saver {
    fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// The format is picked from the file extension: `.json` or `.toml`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<Format, ConfigError> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.map(str::to_owned))),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

enum Format {
    Json,
    Toml,
}

impl Loader for FileStore {
    fn load(&self) -> Result<EngineConfig, ConfigError> {
        let format = self.format()?;
        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let config = match format {
            Format::Json => serde_json::from_str(&raw)?,
            Format::Toml => toml::from_str(&raw)?,
        };
        tracing::debug!(
            target: "aquifer::config",
            path = %self.path.display(),
            "loaded configuration"
        );
        Ok(config)
    }
}

impl Saver for FileStore {
    fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        let raw = match self.format()? {
            Format::Json => serde_json::to_string_pretty(config)?,
            Format::Toml => toml::to_string_pretty(config)?,
        };
        std::fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_syntax_is_valid() {
        SyntaxConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_colliding_markers() {
        let syntax = SyntaxConfig {
            token_close: '{',
            ..SyntaxConfig::default()
        };
        assert!(matches!(
            syntax.validate(),
            Err(AquiferError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn rejects_alphanumeric_sigil() {
        let syntax = SyntaxConfig {
            sigil: 'a',
            ..SyntaxConfig::default()
        };
        assert!(syntax.validate().is_err());
    }

    #[test]
    fn rejects_bad_tag() {
        let syntax = SyntaxConfig {
            mention_tag: "span class".into(),
            ..SyntaxConfig::default()
        };
        assert!(syntax.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("[popup]\nwrap_selection = true\n").unwrap();
        assert!(config.popup.wrap_selection);
        assert_eq!(config.popup.max_candidates, None);
        assert_eq!(config.syntax, SyntaxConfig::default());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.popup.max_candidates = Some(8);
        config.syntax.sigil = '#';

        for name in ["aquifer.json", "aquifer.toml"] {
            let store = FileStore::new(dir.path().join(name));
            config.save(&store).unwrap();
            let loaded = EngineConfig::load(&store).unwrap();
            assert_eq!(loaded, config);
        }
    }

    #[test]
    fn unsupported_extension() {
        let store = FileStore::new("aquifer.yaml");
        match store.load() {
            Err(ConfigError::UnsupportedFormat(ext)) => assert_eq!(ext.as_deref(), Some("yaml")),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }
}
