//! Domain model for tracked images
//!
//! A [`TrackedImage`] is parsed once from a configured image string and is
//! immutable afterwards. Its identity key `namespace/repository[:tag]` is
//! what the state file and the update diff are keyed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ActionConfig;
use crate::error::{Error, Result};

/// Namespace assumed when a configured image string carries no slash
/// ("official images" on Docker Hub).
pub const OFFICIAL_NAMESPACE: &str = "library";

/// One image being watched for updates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedImage {
    /// Registry namespace (user or organization)
    pub namespace: String,

    /// Repository name within the namespace
    pub repository: String,

    /// Specific tag to watch; `None` watches repository-level metadata
    pub tag: Option<String>,
}

impl TrackedImage {
    /// Parse a configured image string.
    ///
    /// Accepted forms: `nginx`, `nginx:1.25`, `grafana/loki`,
    /// `grafana/loki:2.9`. A string without a slash resolves to the
    /// [`OFFICIAL_NAMESPACE`].
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::config("image reference cannot be empty"));
        }

        let (path, tag) = match s.rsplit_once(':') {
            // A colon inside the repository path would be a port or digest
            // syntax, which this watcher does not support.
            Some((path, tag)) if !tag.contains('/') => (path, Some(tag.to_string())),
            _ => (s, None),
        };

        let (namespace, repository) = match path.split_once('/') {
            Some((namespace, repository)) => {
                if repository.contains('/') {
                    return Err(Error::config(format!(
                        "nested repository paths are not supported: {:?}",
                        s
                    )));
                }
                (namespace.to_string(), repository.to_string())
            }
            None => (OFFICIAL_NAMESPACE.to_string(), path.to_string()),
        };

        if namespace.is_empty() || repository.is_empty() || tag.as_deref() == Some("") {
            return Err(Error::config(format!("invalid image reference: {:?}", s)));
        }

        Ok(Self {
            namespace,
            repository,
            tag,
        })
    }

    /// Identity key `namespace/repository[:tag]`
    pub fn identity(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}/{}:{}", self.namespace, self.repository, tag),
            None => format!("{}/{}", self.namespace, self.repository),
        }
    }
}

impl std::fmt::Display for TrackedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identity())
    }
}

/// A tracked image plus the ordered actions to run when it updates.
///
/// Built once at startup from configuration and read-only afterwards.
#[derive(Debug, Clone)]
pub struct NotifyJob {
    /// The image this job watches
    pub image: TrackedImage,

    /// Actions to dispatch, in declared order
    pub actions: Vec<ActionConfig>,
}

/// Persisted last-seen state for one tracked image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Registry namespace
    pub namespace: String,

    /// Repository name
    pub repository: String,

    /// Watched tag, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Last-seen update instant (ISO-8601, as reported by the registry)
    pub last_updated: String,
}

impl StateEntry {
    /// Create a state entry for an image with a freshly fetched timestamp
    pub fn new(image: &TrackedImage, last_updated: impl Into<String>) -> Self {
        Self {
            namespace: image.namespace.clone(),
            repository: image.repository.clone(),
            tag: image.tag.clone(),
            last_updated: last_updated.into(),
        }
    }

    /// Identity key `namespace/repository[:tag]`
    pub fn identity(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}/{}:{}", self.namespace, self.repository, tag),
            None => format!("{}/{}", self.namespace, self.repository),
        }
    }

    /// Whether `fetched` is a strictly later instant than this entry.
    ///
    /// Both timestamps must parse; an unparsable instant on either side
    /// compares as "not updated" so that corrupt registry data can never
    /// crash a cycle or fire a spurious notification.
    pub fn is_older_than(&self, fetched: &str) -> bool {
        match (parse_instant(&self.last_updated), parse_instant(fetched)) {
            (Some(previous), Some(current)) => current > previous,
            _ => {
                warn!(
                    "unparsable update instant for {} (stored: {:?}, fetched: {:?}), treating as unchanged",
                    self.identity(),
                    self.last_updated,
                    fetched
                );
                false
            }
        }
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Ephemeral result of checking one image in one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    /// The image that was checked
    pub image: TrackedImage,

    /// The freshly fetched update instant
    pub last_updated: String,

    /// True iff a prior state entry existed with an earlier instant.
    /// A first-seen image establishes a baseline silently.
    pub was_updated: bool,
}

impl UpdateEvent {
    /// One-line summary used as the notification message body
    pub fn message(&self) -> String {
        format!(
            "Image {} was updated at {}",
            self.image.identity(),
            self.last_updated
        )
    }
}
