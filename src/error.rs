use std::path::PathBuf;

/// Fatal startup failures. Any of these terminates the process before the
/// supervisor loop begins.
#[derive(Debug)]
pub enum SetupError {
    /// The target is neither an existing path nor found on the search path.
    TargetNotFound { target: String },
    /// The target exists but its metadata or canonical path could not be read.
    TargetUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The watch root could not be monitored.
    Unwatchable {
        path: PathBuf,
        source: notify::Error,
    },
    /// The config file could not be read.
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid TOML for our schema.
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// The resolved command has no words in it.
    EmptyCommand { reason: &'static str },
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::TargetNotFound { target } => {
                write!(f, "can't find target {:?}", target)
            }
            SetupError::TargetUnreadable { path, source } => {
                write!(f, "can't read target {}: {}", path.display(), source)
            }
            SetupError::Unwatchable { path, source } => {
                write!(f, "can't watch {}: {}", path.display(), source)
            }
            SetupError::ConfigRead { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            SetupError::ConfigParse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            SetupError::EmptyCommand { reason } => {
                write!(f, "no command to run: {}", reason)
            }
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::TargetNotFound { .. } | SetupError::EmptyCommand { .. } => None,
            SetupError::TargetUnreadable { source, .. } => Some(source),
            SetupError::Unwatchable { source, .. } => Some(source),
            SetupError::ConfigRead { source, .. } => Some(source),
            SetupError::ConfigParse { source, .. } => Some(source),
        }
    }
}
