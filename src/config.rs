use crate::error::SetupError;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration loaded from rerun.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct RerunConfig {
    pub invoke: InvokeConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InvokeConfig {
    /// Command run in invoke mode when none is given on the command line.
    pub default_command: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

// --- Default implementations ---

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            default_command: vec!["cargo".to_string(), "build".to_string()],
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl RerunConfig {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults unless `required` is set (the user
    /// named the file explicitly), in which case it is an error.
    pub fn load(path: &Path, required: bool) -> Result<Self, SetupError> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| SetupError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::parse(&contents).map_err(|e| SetupError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if config.invoke.default_command.is_empty() {
            return Err(SetupError::EmptyCommand {
                reason: "invoke.default_command is empty",
            });
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
