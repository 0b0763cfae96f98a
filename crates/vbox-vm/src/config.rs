//! Configuration for talking to VBoxManage.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use crate::error::{Result, VmError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[cfg(windows)]
const VBOXMANAGE_BIN: &str = "VBoxManage.exe";
#[cfg(not(windows))]
const VBOXMANAGE_BIN: &str = "VBoxManage";

/// Configuration for the VBoxManage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VBoxConfig {
    /// Path to the VBoxManage binary (bare name means `PATH` lookup)
    #[serde(default = "default_vboxmanage_path")]
    pub vboxmanage_path: PathBuf,
    /// Delay between power-button presses during a graceful stop, in milliseconds
    #[serde(default = "default_stop_poll_ms")]
    pub stop_poll_ms: u64,
    /// Power-button presses before a graceful stop gives up
    #[serde(default = "default_stop_max_attempts")]
    pub stop_max_attempts: u32,
}

fn default_vboxmanage_path() -> PathBuf {
    PathBuf::from(VBOXMANAGE_BIN)
}

fn default_stop_poll_ms() -> u64 {
    1000
}

fn default_stop_max_attempts() -> u32 {
    60
}

impl Default for VBoxConfig {
    fn default() -> Self {
        Self {
            vboxmanage_path: default_vboxmanage_path(),
            stop_poll_ms: default_stop_poll_ms(),
            stop_max_attempts: default_stop_max_attempts(),
        }
    }
}

impl VBoxConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VBOX_MANAGE_PATH` | unset |
    /// | `VBOX_INSTALL_PATH` | unset (VBoxManage is joined onto it) |
    /// | `VBOX_MSI_INSTALL_PATH` | unset (VBoxManage is joined onto it) |
    /// | `VBOX_STOP_POLL_MS` | `1000` |
    /// | `VBOX_STOP_MAX_ATTEMPTS` | `60` |
    ///
    /// With none of the path variables set, `VBoxManage` is resolved via `PATH`.
    pub fn from_env() -> Self {
        let default = Self::default();

        let vboxmanage_path = std::env::var_os("VBOX_MANAGE_PATH")
            .map(PathBuf::from)
            .or_else(|| {
                ["VBOX_INSTALL_PATH", "VBOX_MSI_INSTALL_PATH"]
                    .iter()
                    .filter_map(std::env::var_os)
                    .find(|dir| !dir.is_empty())
                    .map(|dir| PathBuf::from(dir).join(VBOXMANAGE_BIN))
            })
            .unwrap_or(default.vboxmanage_path);

        Self {
            vboxmanage_path,
            stop_poll_ms: std::env::var("VBOX_STOP_POLL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.stop_poll_ms),
            stop_max_attempts: std::env::var("VBOX_STOP_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.stop_max_attempts),
        }
    }

    /// Set the VBoxManage binary path.
    pub fn with_vboxmanage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vboxmanage_path = path.into();
        self
    }

    /// Set the graceful-stop poll interval.
    pub fn with_stop_poll_interval(mut self, interval: Duration) -> Self {
        self.stop_poll_ms = interval.as_millis() as u64;
        self
    }

    /// Set the maximum number of graceful-stop attempts.
    pub fn with_stop_max_attempts(mut self, attempts: u32) -> Self {
        self.stop_max_attempts = attempts;
        self
    }

    /// Get the graceful-stop poll interval as a Duration.
    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if the tool path is empty or the attempt bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.vboxmanage_path.as_os_str().is_empty() {
            return Err(VmError::InvalidInput("vboxmanage_path is empty".into()));
        }
        if self.stop_max_attempts == 0 {
            return Err(VmError::InvalidInput(
                "stop_max_attempts must be > 0".into(),
            ));
        }
        Ok(())
    }
}
