// # Webhook Notification Handler
//
// This crate provides the web-hook notification handler.
//
// ## Purpose
//
// Delivers an update event to a configured HTTP endpoint using an
// arbitrary method and an optional JSON body. String values at the top
// level of an object or array body may carry the `$msg` placeholder,
// which is substituted with the event's message before sending.
//
// ## Error Handling
//
// Delivery failures (connection refused, non-2xx) are logged here and
// swallowed: one failing webhook must not abort sibling notifications.

use async_trait::async_trait;
use regwatch_core::config::{ActionConfig, WatchConfig, WebhookConfig};
use regwatch_core::image::UpdateEvent;
use regwatch_core::traits::NotifyHandler;
use regwatch_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Action kind served by [`WebHook`]
pub const KIND: &str = "web-hook";

/// Placeholder replaced with the event message in body strings
const MESSAGE_PLACEHOLDER: &str = "$msg";

/// Default HTTP timeout for webhook deliveries (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Webhook notification handler
#[derive(Debug, Clone)]
pub struct WebHook {
    client: reqwest::Client,
}

impl WebHook {
    /// Create a new webhook handler
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn deliver(&self, target: &WebhookConfig, event: &UpdateEvent) -> Result<()> {
        let method = reqwest::Method::from_bytes(target.method.to_uppercase().as_bytes())
            .map_err(|_| Error::notify(format!("invalid webhook method {:?}", target.method)))?;

        let mut request = self.client.request(method, &target.url);
        if let Some(body) = &target.body {
            request = request.json(&substitute_message(body.clone(), &event.message()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::notify(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::notify(format!(
                "webhook {} answered {}",
                target.url,
                response.status()
            )));
        }

        debug!("delivered webhook to {}", target.url);
        Ok(())
    }
}

impl Default for WebHook {
    fn default() -> Self {
        Self::new()
    }
}

/// Substitute the `$msg` placeholder into the body.
///
/// The substitution reaches string values at the top level of an object
/// or array (and a bare string body); non-string values are left
/// untouched, and a null body passes through unchanged.
pub fn substitute_message(body: Value, message: &str) -> Value {
    let replace = |s: String| Value::String(s.replace(MESSAGE_PLACEHOLDER, message));

    match body {
        Value::String(s) => replace(s),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| match value {
                    Value::String(s) => (key, replace(s)),
                    other => (key, other),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|value| match value {
                    Value::String(s) => replace(s),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

#[async_trait]
impl NotifyHandler for WebHook {
    async fn execute(&self, action: &ActionConfig, event: &UpdateEvent, config: &WatchConfig) {
        let Some(target) = config.webhooks.get(&action.instance) else {
            error!("webhook instance {:?} is not defined", action.instance);
            return;
        };

        if let Err(e) = self.deliver(target, event).await {
            error!(
                "webhook notification via {:?} for {} failed: {}",
                action.instance,
                event.image.identity(),
                e
            );
        }
    }

    fn validate_instance(&self, action: &ActionConfig, config: &WatchConfig) -> bool {
        config.webhooks.contains_key(&action.instance)
    }
}
