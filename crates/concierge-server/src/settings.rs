//! Runtime settings.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults (including a small demo roster)
//! 2. A JSON settings file, deep-merged over the defaults
//! 3. Environment variables (`CONCIERGE_HOST`, `CONCIERGE_PORT`,
//!    `CONCIERGE_WEBHOOK_URL`)
//!
//! The settings file path comes from the CLI or `CONCIERGE_SETTINGS`; a
//! missing file is not an error and yields the defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use concierge_core::{Directory, StaffId, StaffIdentity};

/// Settings load failure.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON or has the wrong shape.
    #[error("invalid settings file {path}: {source}")]
    Parse {
        /// Offending path.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Bind address and WebSocket tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `8791`).
    pub port: u16,
    /// Ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound channel depth.
    pub outbox_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8791,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 60,
            max_message_size: 1024 * 1024, // 1 MB
            outbox_capacity: 256,
        }
    }
}

/// One staff roster entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StaffEntry {
    /// Short identifier used for login and presence.
    pub id: String,
    /// Full display name.
    pub name: String,
    /// Department or team.
    pub department: String,
    /// Contact address used for directory matching.
    pub contact: String,
    /// Shared secret checked at `auth.staff` time.
    pub secret: String,
}

/// Assistant reply configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Replies used when no generator is reachable. Empty means the
    /// built-in fallback line.
    pub fallback_replies: Vec<String>,
}

/// Analytics delivery configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Webhook that receives call analytics events. `None` disables
    /// delivery.
    pub webhook_url: Option<String>,
}

/// Full runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bind address and transport tuning.
    pub server: ServerSettings,
    /// Staff roster.
    pub staff: Vec<StaffEntry>,
    /// Assistant reply configuration.
    pub assistant: AssistantSettings,
    /// Analytics delivery.
    pub analytics: AnalyticsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            staff: demo_roster(),
            assistant: AssistantSettings::default(),
            analytics: AnalyticsSettings::default(),
        }
    }
}

/// Roster used when no settings file provides one.
fn demo_roster() -> Vec<StaffEntry> {
    vec![
        StaffEntry {
            id: "ACS".into(),
            name: "Dr. Alice Chen".into(),
            department: "Admissions".into(),
            contact: "alice.chen@example.org".into(),
            secret: "alice-demo".into(),
        },
        StaffEntry {
            id: "BOB".into(),
            name: "Bob Ortiz".into(),
            department: "Facilities".into(),
            contact: "bob.ortiz@example.org".into(),
            secret: "bob-demo".into(),
        },
    ]
}

impl Settings {
    /// Load settings from `path` (or `CONCIERGE_SETTINGS` when `None`),
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let env_path = std::env::var("CONCIERGE_SETTINGS").ok();
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into));

        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                info!(path = %path.display(), "settings file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: Value = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let mut base = serde_json::to_value(Self::default()).map_err(|source| {
            SettingsError::Parse {
                path: path.display().to_string(),
                source,
            }
        })?;
        deep_merge(&mut base, file);

        serde_json::from_value(base).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CONCIERGE_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("CONCIERGE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("CONCIERGE_WEBHOOK_URL") {
            if !url.is_empty() {
                self.analytics.webhook_url = Some(url);
            }
        }
    }

    /// Build the read-only staff directory from the roster.
    #[must_use]
    pub fn directory(&self) -> Directory {
        Directory::new(
            self.staff
                .iter()
                .map(|entry| StaffIdentity {
                    id: StaffId::from(entry.id.as_str()),
                    display_name: entry.name.clone(),
                    department: entry.department.clone(),
                    contact_address: entry.contact.clone(),
                })
                .collect(),
        )
    }

    /// Staff login secrets keyed by ID.
    #[must_use]
    pub fn credentials(&self) -> HashMap<StaffId, String> {
        self.staff
            .iter()
            .map(|entry| (StaffId::from(entry.id.as_str()), entry.secret.clone()))
            .collect()
    }
}

/// Merge `overlay` into `base`. Objects merge recursively; everything else
/// (arrays included) replaces wholesale.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
