// # regwatch-core
//
// Core library for the regwatch image-update watcher.
//
// ## Architecture Overview
//
// This library provides the core functionality for detecting registry
// image updates and fanning out notifications:
// - **ImageRegistry**: Trait for reading image/tag metadata from a registry
// - **ImageStateStore**: Trait for persisting last-seen state between cycles
// - **NotifyHandler**: Trait for notification backends (mail, webhook, ...)
// - **HandlerRegistry**: Kind-tag dispatch over registered handlers
// - **UpdateWatcher**: Control loop running fetch → diff → persist → notify
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the HTTP/SMTP
//    implementations, which live in sibling crates
// 2. **Plugin-Based**: Notification kinds are registered dynamically
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Failure Isolation**: One image or one notification failing never
//    takes down a cycle, and one failing cycle never takes down the loop

pub mod config;
pub mod dispatch;
pub mod error;
pub mod image;
pub mod state;
pub mod traits;
pub mod watcher;

// Re-export core types for convenience
pub use config::{
    ActionConfig, NotifyServiceConfig, RegistryCredentials, SmtpServerConfig, WatchConfig,
    WebhookConfig,
};
pub use dispatch::HandlerRegistry;
pub use error::{Error, Result};
pub use image::{NotifyJob, StateEntry, TrackedImage, UpdateEvent};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ImageRegistry, ImageStateStore, NotifyHandler};
pub use watcher::UpdateWatcher;
