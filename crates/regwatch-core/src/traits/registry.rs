// # Image Registry Trait
//
// Defines the interface for reading image metadata from a registry API.
//
// ## Implementations
//
// - Docker Hub: `regwatch-hub` crate
// - Future: GHCR, Quay, private v2 registries
//
// The trait is read-only: the watcher never writes to the registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fixed page size for tag listings. The page count for a repository is
/// `ceil(count / TAG_PAGE_SIZE)` where `count` comes from the first page.
pub const TAG_PAGE_SIZE: usize = 100;

/// Repository-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Update instant reported by the registry (ISO-8601)
    pub last_updated: String,
}

/// Metadata for one tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name
    pub name: String,

    /// Update instant reported by the registry (ISO-8601)
    pub last_updated: String,
}

/// One page of a repository's tag listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPage {
    /// Total number of tags across all pages
    pub count: usize,

    /// Tags on this page
    pub results: Vec<TagInfo>,
}

/// Trait for registry API implementations
///
/// Implementations are stateless HTTP clients: no caching, no retries
/// (scheduling is owned by the watcher) and no registry writes.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Exchange credentials for a bearer token.
    ///
    /// The username is lower-cased before submission; the registry is
    /// case-sensitive only on the password. Callers must treat a failure
    /// here as non-fatal and continue unauthenticated: the token only
    /// buys a higher rate limit, not correctness.
    async fn authenticate(&self, username: &str, password: &str) -> Result<String>;

    /// Fetch repository-level metadata.
    ///
    /// A missing repository surfaces as [`crate::Error::NotFound`],
    /// distinct from transport and server failures.
    async fn fetch_repository(
        &self,
        namespace: &str,
        name: &str,
        token: Option<&str>,
    ) -> Result<RepositoryInfo>;

    /// Fetch one page (1-based) of the repository's tag listing.
    async fn fetch_tag_page(
        &self,
        namespace: &str,
        name: &str,
        page: usize,
        token: Option<&str>,
    ) -> Result<TagPage>;

    /// Fetch every tag of a repository.
    ///
    /// The first page discloses the total count; the remaining pages are
    /// requested concurrently, bounding the total latency by the slowest
    /// single page, and concatenated in page order. Any single page
    /// failure fails the whole fetch: a partial tag list could hide
    /// exactly the tag the caller is looking for.
    async fn fetch_all_tags(
        &self,
        namespace: &str,
        name: &str,
        token: Option<&str>,
    ) -> Result<Vec<TagInfo>> {
        let first = self.fetch_tag_page(namespace, name, 1, token).await?;
        let pages = first.count.div_ceil(TAG_PAGE_SIZE);

        let mut tags = first.results;
        if pages > 1 {
            let rest = futures::future::try_join_all(
                (2..=pages).map(|page| self.fetch_tag_page(namespace, name, page, token)),
            )
            .await?;
            for page in rest {
                tags.extend(page.results);
            }
        }

        Ok(tags)
    }
}
