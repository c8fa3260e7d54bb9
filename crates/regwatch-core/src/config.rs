//! Configuration types for the regwatch system
//!
//! The configuration is loaded once at startup and read-only for the
//! process lifetime. This module defines the already-parsed form the core
//! consumes; locating and reading the file is the daemon's job.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::image::{NotifyJob, TrackedImage};

/// Process-wide regwatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Registry credentials. Optional: anonymous access works but is
    /// rate-limited more aggressively.
    #[serde(default)]
    pub registry: Option<RegistryCredentials>,

    /// Minutes between check cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Images to watch and the actions to run when they update
    pub services: Vec<NotifyServiceConfig>,

    /// Named SMTP servers referenced by mail-hook actions
    #[serde(default)]
    pub smtp_servers: HashMap<String, SmtpServerConfig>,

    /// Named webhook targets referenced by web-hook actions
    #[serde(default)]
    pub webhooks: HashMap<String, WebhookConfig>,

    /// Path of the JSON state file
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl WatchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.services.is_empty() {
            return Err(crate::Error::config("no services configured"));
        }

        if self.interval_minutes == 0 {
            return Err(crate::Error::config("check interval must be > 0 minutes"));
        }

        if let Some(credentials) = &self.registry {
            if credentials.username.is_empty() || credentials.password.is_empty() {
                return Err(crate::Error::config(
                    "registry credentials must include both username and password",
                ));
            }
        }

        if self.state_path.is_empty() {
            return Err(crate::Error::config("state file path cannot be empty"));
        }

        for service in &self.services {
            TrackedImage::parse(&service.image)?;

            if service.actions.is_empty() {
                return Err(crate::Error::config(format!(
                    "service {:?} has no actions configured",
                    service.image
                )));
            }

            for action in &service.actions {
                if action.kind.is_empty() {
                    return Err(crate::Error::config(format!(
                        "service {:?} has an action without a kind",
                        service.image
                    )));
                }
                if action.instance.is_empty() {
                    return Err(crate::Error::config(format!(
                        "service {:?} has a {:?} action without an instance name",
                        service.image, action.kind
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build the read-only notification jobs from the service list
    pub fn jobs(&self) -> Result<Vec<NotifyJob>, crate::Error> {
        self.services
            .iter()
            .map(|service| {
                Ok(NotifyJob {
                    image: TrackedImage::parse(&service.image)?,
                    actions: service.actions.clone(),
                })
            })
            .collect()
    }
}

/// Registry login credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Registry account name (matched case-insensitively by the registry)
    pub username: String,

    /// Registry password or personal access token
    pub password: String,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// One watched image and its notification actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyServiceConfig {
    /// Image reference, e.g. "nginx", "grafana/loki:2.9"
    pub image: String,

    /// Actions to dispatch on update, in declared order
    pub actions: Vec<ActionConfig>,
}

/// One notification action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Handler kind, e.g. "mail-hook" or "web-hook"
    #[serde(rename = "type")]
    pub kind: String,

    /// Name of the backend instance this action targets
    pub instance: String,

    /// Recipient address (mail-hook actions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

/// One named SMTP server
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpServerConfig {
    /// Server hostname
    pub host: String,

    /// Submission port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Sender address for notification mail
    pub from: String,

    /// Optional SMTP AUTH username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional SMTP AUTH password
    #[serde(default)]
    pub password: Option<String>,

    /// Use STARTTLS when connecting
    #[serde(default = "default_starttls")]
    pub starttls: bool,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for SmtpServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// One named webhook target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL
    pub url: String,

    /// HTTP method to use
    #[serde(default = "default_webhook_method")]
    pub method: String,

    /// Optional request body. String values at the top level of an object
    /// or array may contain the `$msg` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_state_path() -> String {
    "/var/lib/regwatch/state.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_starttls() -> bool {
    true
}

fn default_webhook_method() -> String {
    "POST".to_string()
}
