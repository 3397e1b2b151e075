//! Daemon configuration
//!
//! Handles:
//! - SNMP transport settings (timeout, tool paths)
//! - Thresholds and poll intervals
//! - Action script commands
//! - Device inventory

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use ups_kernel::{Action, DeviceSpec, ThresholdConfig};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "UPS_DAEMON_CONFIG";
const CONFIG_FILE: &str = "ups-daemon.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub snmp: SnmpConfig,
    pub thresholds: ThresholdConfig,
    pub scripts: ScriptConfig,
    pub devices: BTreeMap<String, DeviceSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpConfig {
    pub timeout_secs: u64,
    pub snmpget: String,
    pub ping: String,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2,
            snmpget: "snmpget".to_string(),
            ping: "ping".to_string(),
        }
    }
}

impl SnmpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub timeout_secs: u64,
    pub suspend: Option<String>,
    pub resume: Option<String>,
    pub shutdown: Option<String>,
    pub cancel_shutdown: Option<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            suspend: None,
            resume: None,
            shutdown: None,
            cancel_shutdown: None,
        }
    }
}

impl ScriptConfig {
    pub fn command(&self, action: Action) -> Option<&str> {
        match action {
            Action::Suspend => self.suspend.as_deref(),
            Action::Resume => self.resume.as_deref(),
            Action::Shutdown => self.shutdown.as_deref(),
            Action::CancelShutdown => self.cancel_shutdown.as_deref(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DaemonConfig {
    /// Load from the resolved config path, or defaults when no file exists.
    pub async fn load() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path).await,
            None => {
                info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// `UPS_DAEMON_CONFIG`, else `./ups-daemon.toml`, else the user config dir.
    pub fn config_file_path() -> Option<PathBuf> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let user = dirs::config_dir().map(|mut path| {
            path.push("ups-utils");
            path.push(CONFIG_FILE);
            path
        });
        resolve_config_path(explicit, PathBuf::from(CONFIG_FILE), user)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if self.snmp.timeout_secs == 0 {
            bail!("snmp.timeout_secs must be at least 1");
        }
        if self.scripts.timeout_secs == 0 {
            bail!("scripts.timeout_secs must be at least 1");
        }

        let daemons: Vec<&str> = self
            .devices
            .iter()
            .filter(|(_, spec)| spec.daemon)
            .map(|(id, _)| id.as_str())
            .collect();
        if daemons.len() > 1 {
            bail!("Only one device may set daemon = true, found: {}", daemons.join(", "));
        }

        for action in Action::ALL {
            if let Some(command) = self.scripts.command(*action) {
                let argv = shell_words::split(command)
                    .with_context(|| format!("Invalid {} command: {}", action, command))?;
                if argv.is_empty() {
                    bail!("Empty {} command", action);
                }
            }
        }
        Ok(())
    }
}

/// An explicit path always wins, even when missing, so a typo fails loudly.
fn resolve_config_path(explicit: Option<PathBuf>, local: PathBuf, user: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if local.exists() {
        return Some(local);
    }
    let user = user.filter(|p| p.exists());
    if user.is_none() {
        debug!("No local or user configuration file");
    }
    user
}
