// # Mail Notification Handler
//
// This crate provides the mail-hook notification handler.
//
// ## Purpose
//
// Delivers an update event as a plain-text mail through a named SMTP
// server instance. Transports are pooled per instance name: the first
// send against an instance builds the transport, later sends (including
// in later cycles) reuse it instead of paying the reconnect cost.
// Connectivity is verified before each send so a dead pooled connection
// surfaces as a delivery failure, not a hang.
//
// ## Error Handling
//
// Delivery failures (connection refused, rejected recipients) are logged
// here and swallowed: one failing mail must not abort sibling
// notifications.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regwatch_core::config::{ActionConfig, SmtpServerConfig, WatchConfig};
use regwatch_core::image::UpdateEvent;
use regwatch_core::traits::NotifyHandler;
use regwatch_core::{Error, Result};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Action kind served by [`MailHook`]
pub const KIND: &str = "mail-hook";

/// Mail notification handler
///
/// The transport cache is scoped to this handler's lifetime, keyed by
/// SMTP-instance name. [`MailHook::reset`] clears it for test isolation.
pub struct MailHook {
    transports: Mutex<HashMap<String, AsyncSmtpTransport<Tokio1Executor>>>,
}

impl MailHook {
    /// Create a new mail handler with an empty transport cache
    pub fn new() -> Self {
        Self {
            transports: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every cached transport.
    ///
    /// The next send against each instance rebuilds its transport.
    pub async fn reset(&self) {
        self.transports.lock().await.clear();
    }

    /// Get or lazily build the pooled transport for an instance
    async fn transport(
        &self,
        instance: &str,
        server: &SmtpServerConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut transports = self.transports.lock().await;

        if let Some(transport) = transports.get(instance) {
            return Ok(transport.clone());
        }

        debug!("building SMTP transport for instance {:?}", instance);
        let transport = build_transport(server)?;
        transports.insert(instance.to_string(), transport.clone());
        Ok(transport)
    }

    async fn deliver(
        &self,
        instance: &str,
        server: &SmtpServerConfig,
        recipient: &str,
        event: &UpdateEvent,
    ) -> Result<()> {
        let transport = self.transport(instance, server).await?;

        let reachable = transport
            .test_connection()
            .await
            .map_err(|e| Error::notify(format!("SMTP connection check failed: {}", e)))?;
        if !reachable {
            return Err(Error::notify(format!(
                "SMTP server {:?} is not reachable",
                instance
            )));
        }

        let from: Mailbox = server
            .from
            .parse()
            .map_err(|e| Error::notify(format!("invalid sender address {:?}: {}", server.from, e)))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Error::notify(format!("invalid recipient address {:?}: {}", recipient, e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("Image update: {}", event.image.identity()))
            .body(event.message())
            .map_err(|e| Error::notify(format!("failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| Error::notify(format!("SMTP send failed: {}", e)))?;

        debug!("mailed {} via {:?}", recipient, instance);
        Ok(())
    }
}

impl Default for MailHook {
    fn default() -> Self {
        Self::new()
    }
}

fn build_transport(server: &SmtpServerConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = if server.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&server.host)
            .map_err(|e| Error::notify(format!("invalid SMTP relay {:?}: {}", server.host, e)))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
    };

    builder = builder.port(server.port);

    if let (Some(username), Some(password)) = (&server.username, &server.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}

#[async_trait]
impl NotifyHandler for MailHook {
    async fn execute(&self, action: &ActionConfig, event: &UpdateEvent, config: &WatchConfig) {
        let Some(server) = config.smtp_servers.get(&action.instance) else {
            error!("SMTP instance {:?} is not defined", action.instance);
            return;
        };

        let Some(recipient) = action.recipient.as_deref() else {
            error!(
                "mail action for instance {:?} has no recipient",
                action.instance
            );
            return;
        };

        if let Err(e) = self.deliver(&action.instance, server, recipient, event).await {
            error!(
                "mail notification to {} via {:?} for {} failed: {}",
                recipient,
                action.instance,
                event.image.identity(),
                e
            );
        }
    }

    fn validate_instance(&self, action: &ActionConfig, config: &WatchConfig) -> bool {
        config.smtp_servers.contains_key(&action.instance) && action.recipient.is_some()
    }
}
