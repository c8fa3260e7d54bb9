// # Notify Handler Trait
//
// Defines the interface for notification backends.
//
// ## Implementations
//
// - Mail (SMTP): `regwatch-notify-mail` crate, kind "mail-hook"
// - Webhook (HTTP): `regwatch-notify-webhook` crate, kind "web-hook"
//
// Handlers are looked up by kind tag in the [`crate::HandlerRegistry`];
// new kinds register there without the watcher changing.

use async_trait::async_trait;

use crate::config::{ActionConfig, WatchConfig};
use crate::image::UpdateEvent;

/// Trait for notification backend implementations
///
/// # Error Handling
///
/// `execute` returns nothing: delivery failures are the handler's own
/// problem. It must log them and swallow them so that one failing action
/// never aborts sibling notifications or a future cycle.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait NotifyHandler: Send + Sync {
    /// Deliver one notification for one update event.
    ///
    /// The named backend instance is resolved from `config`; a missing
    /// instance at this point (validation was skipped or config changed)
    /// is logged and dropped.
    async fn execute(&self, action: &ActionConfig, event: &UpdateEvent, config: &WatchConfig);

    /// Whether the backend instance the action references is defined in
    /// the configuration, including any kind-specific fields the handler
    /// needs (e.g. a recipient address for mail).
    fn validate_instance(&self, action: &ActionConfig, config: &WatchConfig) -> bool;
}
