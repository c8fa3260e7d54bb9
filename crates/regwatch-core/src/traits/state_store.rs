// # State Store Trait
//
// Defines the interface for persisting the last-seen state between cycles.
//
// ## Purpose
//
// The state store remembers the last update instant seen for each tracked
// image so the next cycle can tell a real update from a baseline. It is a
// disposable cache, not a source of truth: losing it only resets the
// baselines, it never produces wrong notifications for already-seen
// updates (a reset baseline is silent).
//
// ## Implementations
//
// - File-based: JSON file, `state::FileStateStore`
// - In-memory: `state::MemoryStateStore` (tests, ephemeral deployments)

use async_trait::async_trait;
use std::collections::HashMap;

use crate::image::StateEntry;

/// Mapping from identity key (`namespace/repository[:tag]`) to the entry
/// recorded for it
pub type StateMap = HashMap<String, StateEntry>;

/// Trait for state store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait ImageStateStore: Send + Sync {
    /// Load the last persisted state.
    ///
    /// Missing or unreadable content is not an error: implementations
    /// return an empty map, which resets every baseline on the next
    /// cycle.
    async fn load(&self) -> Result<StateMap, crate::Error>;

    /// Replace the persisted state wholesale.
    ///
    /// The previous content is discarded, never merged: entries for
    /// images that failed to fetch this cycle are dropped so the store
    /// always reflects only the most recent successful checks.
    async fn save(&self, state: &StateMap) -> Result<(), crate::Error>;
}
