//! Notification dispatcher
//!
//! The dispatcher maps action kinds ("mail-hook", "web-hook", ...) to
//! registered [`NotifyHandler`] implementations, avoiding hardcoded
//! if-else chains in the watcher. New kinds register at startup without
//! the watcher changing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use regwatch_core::HandlerRegistry;
//!
//! let handlers = HandlerRegistry::new();
//! handlers.register("mail-hook", Arc::new(MailHook::new()));
//! handlers.register("web-hook", Arc::new(WebHook::new()));
//!
//! // Fail fast before the run loop starts
//! if !handlers.validate_all(&config) {
//!     std::process::exit(2);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::config::{ActionConfig, WatchConfig};
use crate::image::UpdateEvent;
use crate::traits::NotifyHandler;

/// Registry of notification handlers keyed by action kind
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes. The lock is never held across an await: the handler
/// Arc is cloned out before `execute` runs.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn NotifyHandler>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a notification kind with a handler.
    ///
    /// Registering the same kind twice replaces the previous handler.
    pub fn register(&self, kind: impl Into<String>, handler: Arc<dyn NotifyHandler>) {
        let kind = kind.into();
        let mut handlers = self.handlers.write().unwrap();
        handlers.insert(kind, handler);
    }

    /// Check if a handler is registered for the given kind
    pub fn has_handler(&self, kind: &str) -> bool {
        let handlers = self.handlers.read().unwrap();
        handlers.contains_key(kind)
    }

    /// List all registered kinds
    pub fn kinds(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap();
        handlers.keys().cloned().collect()
    }

    /// Check every action of every configured service: a handler must be
    /// registered for its kind, and that handler's `validate_instance`
    /// must accept it (the named backend instance is actually defined).
    ///
    /// Returns false on the first violation. Intended for startup, so a
    /// dangling action reference fails fast instead of being discovered
    /// mid-cycle.
    pub fn validate_all(&self, config: &WatchConfig) -> bool {
        let handlers = self.handlers.read().unwrap();

        for service in &config.services {
            for action in &service.actions {
                let Some(handler) = handlers.get(&action.kind) else {
                    warn!(
                        "service {:?}: no handler registered for action kind {:?}",
                        service.image, action.kind
                    );
                    return false;
                };

                if !handler.validate_instance(action, config) {
                    warn!(
                        "service {:?}: {:?} action references undefined instance {:?}",
                        service.image, action.kind, action.instance
                    );
                    return false;
                }
            }
        }

        true
    }

    /// Execute the handler registered for the action's kind.
    ///
    /// An unknown kind is logged and skipped, never an error: one
    /// misconfigured action must not abort sibling notifications.
    /// Delivery failures are caught and logged inside the handler.
    pub async fn dispatch(&self, action: &ActionConfig, event: &UpdateEvent, config: &WatchConfig) {
        let handler = {
            let handlers = self.handlers.read().unwrap();
            handlers.get(&action.kind).cloned()
        };

        match handler {
            Some(handler) => handler.execute(action, event, config).await,
            None => {
                warn!(
                    "no handler registered for action kind {:?}, skipping notification for {}",
                    action.kind,
                    event.image.identity()
                );
            }
        }
    }
}
