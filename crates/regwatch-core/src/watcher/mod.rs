//! Core update watcher
//!
//! The UpdateWatcher is responsible for:
//! - Driving one check cycle at startup, then on a fixed-period timer
//! - Fetching current image/tag metadata via ImageRegistry
//! - Diffing against the persisted state via ImageStateStore
//! - Dispatching update events through the HandlerRegistry
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │     timer     │─── tick ───┐
//! └───────────────┘            │
//!                              ▼
//!                     ┌────────────────┐
//!                     │ UpdateWatcher  │
//!                     └────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//! ┌───────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │ ImageRegistry │   │ ImageStateStore│   │ HandlerRegistry │
//! │ (fetch)       │   │ (load / save)  │   │ (notify)        │
//! └───────────────┘   └────────────────┘   └─────────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Authenticate once (optional, failure degrades to anonymous)
//! 2. Load persisted state
//! 3. Fetch all tracked images concurrently (failures isolated per image)
//! 4. Diff each fetched instant against the loaded state
//! 5. Persist the full new state map (replace, not merge)
//! 6. Dispatch every action of every updated image, in declared order

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::dispatch::HandlerRegistry;
use crate::error::{Error, Result};
use crate::image::{NotifyJob, StateEntry, TrackedImage, UpdateEvent};
use crate::traits::state_store::StateMap;
use crate::traits::{ImageRegistry, ImageStateStore};
use std::sync::Arc;
use std::time::Duration;

/// Core update watcher
///
/// The watcher orchestrates the entire fetch → diff → persist → notify
/// flow. It runs one cycle immediately at startup and then one per
/// configured interval.
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateWatcher::new()`]
/// 2. Start with [`UpdateWatcher::run()`]
/// 3. Runs until a shutdown signal is received
///
/// ## Scheduling
///
/// Cycles are serialized: the loop awaits each cycle before taking the
/// next tick, and missed ticks are skipped rather than queued. A slow
/// cycle therefore delays the next check instead of overlapping it, and
/// the state file is never written by two cycles at once.
pub struct UpdateWatcher {
    /// Registry client for image metadata
    registry: Box<dyn ImageRegistry>,

    /// State store for last-seen update instants
    state_store: Box<dyn ImageStateStore>,

    /// Notification handler registry
    handlers: Arc<HandlerRegistry>,

    /// Tracked images and their actions, built once from config
    jobs: Vec<NotifyJob>,

    /// Process configuration (read-only)
    config: WatchConfig,
}

impl UpdateWatcher {
    /// Create a new update watcher.
    ///
    /// Validates the configuration and parses every configured image
    /// string into its [`NotifyJob`] up front, so the run loop never
    /// sees an unparsable reference.
    pub fn new(
        registry: Box<dyn ImageRegistry>,
        state_store: Box<dyn ImageStateStore>,
        handlers: Arc<HandlerRegistry>,
        config: WatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let jobs = config.jobs()?;

        Ok(Self {
            registry,
            state_store,
            handlers,
            jobs,
            config,
        })
    }

    /// Run the watcher.
    ///
    /// One cycle fires immediately, then one per configured interval,
    /// until SIGINT is received.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only entry point with a controlled shutdown signal.
    ///
    /// Production code should use [`UpdateWatcher::run()`], which ties
    /// shutdown to OS signals instead of a programmatic channel.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            "watching {} image(s), checking every {} minute(s)",
            self.jobs.len(),
            self.config.interval_minutes
        );

        let period = Duration::from_secs(self.config.interval_minutes * 60);
        let mut ticker = tokio::time::interval(period);
        // A cycle slower than the interval delays the next check rather
        // than queuing a burst of immediate ticks behind it.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for the provided shutdown signal
            loop {
                tokio::select! {
                    // The first tick completes immediately (startup cycle)
                    _ = ticker.tick() => self.run_cycle_logged().await,

                    _ = &mut rx => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_cycle_logged().await,

                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!("watcher stopped");
        Ok(())
    }

    /// Run one cycle and swallow its error at the loop boundary.
    ///
    /// The process must never stop checking because one scheduled cycle
    /// failed; the timer keeps firing.
    async fn run_cycle_logged(&self) {
        if let Err(e) = self.run_cycle().await {
            error!("check cycle failed: {}", e);
        }
    }

    /// Run one complete fetch → diff → persist → notify cycle.
    ///
    /// Public so callers (and tests) can drive single cycles without the
    /// timer.
    pub async fn run_cycle(&self) -> Result<()> {
        let token = self.authenticate().await;
        let token = token.as_deref();
        let previous = self.state_store.load().await?;

        // Fetch all tracked images concurrently; one image's failure
        // must not abort the others' checks.
        let results = join_all(self.jobs.iter().map(|job| async move {
            let fetched = self.check_image(&job.image, token).await;
            (job, fetched)
        }))
        .await;

        let mut state = StateMap::new();
        let mut events: Vec<(&NotifyJob, UpdateEvent)> = Vec::new();

        for (job, fetched) in results {
            let last_updated = match fetched {
                Ok(last_updated) => last_updated,
                Err(e) => {
                    // Excluded from this cycle's state: the entry is
                    // dropped, not carried over, so the persisted map
                    // only ever reflects successful checks.
                    warn!("skipping {} this cycle: {}", job.image, e);
                    continue;
                }
            };

            let identity = job.image.identity();
            let was_updated = previous
                .get(&identity)
                .map(|prev| prev.is_older_than(&last_updated))
                .unwrap_or(false);

            if !was_updated && !previous.contains_key(&identity) {
                debug!("{} first seen, establishing baseline", identity);
            }

            state.insert(identity, StateEntry::new(&job.image, &last_updated));
            events.push((
                job,
                UpdateEvent {
                    image: job.image.clone(),
                    last_updated,
                    was_updated,
                },
            ));
        }

        self.state_store.save(&state).await?;

        for (job, event) in &events {
            if !event.was_updated {
                continue;
            }

            info!("{} updated at {}", event.image, event.last_updated);
            for action in &job.actions {
                self.handlers.dispatch(action, event, &self.config).await;
            }
        }

        Ok(())
    }

    /// Authenticate once for the whole cycle.
    ///
    /// A failure degrades to unauthenticated fetches for every image
    /// this cycle, logged once here rather than per image.
    async fn authenticate(&self) -> Option<String> {
        let credentials = self.config.registry.as_ref()?;

        match self
            .registry
            .authenticate(&credentials.username, &credentials.password)
            .await
        {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("registry authentication failed, continuing unauthenticated: {}", e);
                None
            }
        }
    }

    /// Resolve the image's current last-updated instant.
    ///
    /// A tagged image searches the full tag listing; an absent tag is a
    /// per-image error. An untagged image reads repository metadata.
    async fn check_image(&self, image: &TrackedImage, token: Option<&str>) -> Result<String> {
        match &image.tag {
            Some(tag) => {
                let tags = self
                    .registry
                    .fetch_all_tags(&image.namespace, &image.repository, token)
                    .await?;

                tags.into_iter()
                    .find(|t| t.name == *tag)
                    .map(|t| t.last_updated)
                    .ok_or_else(|| {
                        Error::not_found(format!(
                            "tag {:?} not found for {}/{}",
                            tag, image.namespace, image.repository
                        ))
                    })
            }
            None => Ok(self
                .registry
                .fetch_repository(&image.namespace, &image.repository, token)
                .await?
                .last_updated),
        }
    }
}
