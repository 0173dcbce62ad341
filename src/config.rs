//! Daemon configuration and watch-root validation.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::limits::{DEFAULT_TTL, MAX_PATH_LEN};

/// Reasons a watch root is refused at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No root given, or nothing left after stripping trailing slashes
    #[error("invalid/empty watchpath")]
    EmptyRoot,

    /// Root starts with `..`
    #[error("invalid watchpath <{0}>, need absolute path")]
    ParentRelative(String),

    /// Root is `/` itself
    #[error("invalid watchpath <{0}>")]
    FilesystemRoot(String),

    /// Root leaves no room for child names
    #[error("watchpath <{path}> length ({len}) exceeds limit ({limit})")]
    RootTooLong {
        path: String,
        len: usize,
        limit: usize,
    },

    /// Root cannot be opened as a directory
    #[error("unable to search watchpath <{path}>: {source}")]
    Unsearchable {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Everything the daemon core needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Absolute directory to watch recursively
    pub root: PathBuf,
    /// Time a closed file stays cached before eviction
    pub ttl: Duration,
    /// Diagnostic verbosity (0 = warnings only)
    pub verbosity: u8,
    /// Detach from the controlling terminal; suppresses diagnostics
    pub background: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            ttl: DEFAULT_TTL,
            verbosity: 0,
            background: false,
        }
    }
}

impl DaemonConfig {
    /// Build a config from raw command-line values.
    ///
    /// Negative TTLs clamp to zero.
    pub fn new(root: PathBuf, ttl_secs: i64, verbosity: u8, background: bool) -> Self {
        Self {
            root,
            ttl: ttl_from_secs(ttl_secs),
            verbosity,
            background,
        }
    }

    /// Interval between two tombstone reclamation passes.
    pub fn reclaim_interval(&self) -> Duration {
        self.ttl * 2
    }
}

/// Convert a signed second count into a TTL, clamping negatives to zero.
pub fn ttl_from_secs(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}

/// Validate and normalise the watch root given on the command line.
///
/// Trailing slashes are stripped. A relative root that does not start with
/// `..` is resolved against the current directory, since daemonizing changes
/// the working directory to `/`. The result must be an openable directory.
pub fn validate_root(raw: &str) -> Result<PathBuf, ConfigError> {
    if raw.starts_with("..") {
        return Err(ConfigError::ParentRelative(raw.to_string()));
    }

    let mut trimmed = raw;
    while trimmed.len() > 1 && trimmed.ends_with('/') {
        trimmed = &trimmed[..trimmed.len() - 1];
    }

    if trimmed.is_empty() {
        return Err(ConfigError::EmptyRoot);
    }
    if trimmed == "/" {
        return Err(ConfigError::FilesystemRoot(raw.to_string()));
    }

    let candidate = Path::new(trimmed);
    let root = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Unsearchable {
            path: raw.to_string(),
            source,
        })?;
        cwd.join(candidate)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect::<PathBuf>()
    };

    let len = root.as_os_str().len();
    if len >= MAX_PATH_LEN - 1 {
        return Err(ConfigError::RootTooLong {
            path: root.display().to_string(),
            len,
            limit: MAX_PATH_LEN,
        });
    }

    fs::read_dir(&root).map_err(|source| ConfigError::Unsearchable {
        path: root.display().to_string(),
        source,
    })?;

    Ok(root)
}
