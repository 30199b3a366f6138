//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory
//! (`~/.config/netscan` on Linux). Every field is optional in the file.

use crate::error::{ConfigError, ConfigResult};
use crate::types::IdentityPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on concurrent workers; no range holds more addresses.
pub const MAX_THREADS: usize = 65_536;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/netscan)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the per-user directories.
    pub fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("org", "netscan", "netscan").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Persistent defaults for a scan. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Maximum number of hosts probed at once.
    pub threads: usize,
    /// Timeout for a single probe call, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Ports the TCP connect probe tries.
    pub tcp_ports: Vec<u16>,
    /// How conflicting host names and workgroups are recorded.
    pub identity_policy: IdentityPolicy,
    /// Accept link-local ranges as scan targets.
    pub allow_link_local: bool,
    /// Grace period after the worker pool finishes, in milliseconds.
    pub settle_delay_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            threads: 128,
            probe_timeout_ms: 1000,
            tcp_ports: vec![22, 80, 135, 139, 443, 445, 3389, 8080],
            identity_policy: IdentityPolicy::Overwrite,
            allow_link_local: false,
            settle_delay_ms: 500,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    ///
    /// A missing file, or a platform without a home directory, yields the
    /// defaults.
    pub fn load() -> ConfigResult<Self> {
        let paths = match Paths::new() {
            Ok(paths) => paths,
            Err(ConfigError::DirectoryNotFound) => {
                debug!("no config directory, using default settings");
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };
        let file = paths.settings_file();

        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file, which must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject values no scan can run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue("threads must be at least 1".into()));
        }
        if self.threads > MAX_THREADS {
            return Err(ConfigError::InvalidValue(format!(
                "threads must be at most {MAX_THREADS}"
            )));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "probe_timeout_ms must be at least 1".into(),
            ));
        }
        if self.tcp_ports.contains(&0) {
            return Err(ConfigError::InvalidValue("tcp_ports may not contain port 0".into()));
        }
        Ok(())
    }
}
