//! Core traits for the regwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ImageRegistry`]: Fetch image and tag metadata from a registry API
//! - [`NotifyHandler`]: Deliver update notifications to one backend kind
//! - [`ImageStateStore`]: Persist the last-seen state between cycles

pub mod notify;
pub mod registry;
pub mod state_store;

pub use notify::NotifyHandler;
pub use registry::{ImageRegistry, RepositoryInfo, TAG_PAGE_SIZE, TagInfo, TagPage};
pub use state_store::{ImageStateStore, StateMap};
