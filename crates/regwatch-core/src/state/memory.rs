// # Memory State Store
//
// In-memory implementation of ImageStateStore.
//
// ## Purpose
//
// A state store that doesn't persist across restarts. Every restart
// re-baselines all images, which costs one silent cycle and nothing else.
//
// ## When to Use
//
// - Tests
// - Ephemeral deployments where a writable state path is unavailable

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{ImageStateStore, StateMap};

/// In-memory state store
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<StateMap>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with the given state (tests)
    pub fn with_state(state: StateMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Number of entries currently held
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ImageStateStore for MemoryStateStore {
    async fn load(&self) -> Result<StateMap, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &StateMap) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = state.clone();
        Ok(())
    }
}
