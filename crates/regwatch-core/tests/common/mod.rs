//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal doubles that verify the watcher's
//! contracts without any real network or filesystem I/O.

#![allow(dead_code)]

use async_trait::async_trait;
use regwatch_core::config::{ActionConfig, WatchConfig};
use regwatch_core::error::{Error, Result};
use regwatch_core::image::UpdateEvent;
use regwatch_core::traits::{
    ImageRegistry, NotifyHandler, RepositoryInfo, TAG_PAGE_SIZE, TagInfo, TagPage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A registry double serving fixed metadata and counting requests
pub struct MockRegistry {
    /// "ns/name" -> repository-level last_updated
    repos: HashMap<String, String>,
    /// "ns/name" -> full tag listing (the mock slices pages out of it)
    tags: HashMap<String, Vec<TagInfo>>,
    /// Page number whose fetch should fail (injected fault)
    fail_page: Option<usize>,
    /// Whether authenticate should fail
    fail_auth: bool,
    auth_calls: Arc<AtomicUsize>,
    repo_calls: Arc<AtomicUsize>,
    page_calls: Arc<AtomicUsize>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            repos: HashMap::new(),
            tags: HashMap::new(),
            fail_page: None,
            fail_auth: false,
            auth_calls: Arc::new(AtomicUsize::new(0)),
            repo_calls: Arc::new(AtomicUsize::new(0)),
            page_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve repository-level metadata for "ns/name"
    pub fn with_repository(mut self, reference: &str, last_updated: &str) -> Self {
        self.repos
            .insert(reference.to_string(), last_updated.to_string());
        self
    }

    /// Serve a tag listing for "ns/name"
    pub fn with_tags(mut self, reference: &str, tags: &[(&str, &str)]) -> Self {
        self.tags.insert(
            reference.to_string(),
            tags.iter()
                .map(|(name, last_updated)| TagInfo {
                    name: name.to_string(),
                    last_updated: last_updated.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Make the given page number fail when fetched
    pub fn failing_page(mut self, page: usize) -> Self {
        self.fail_page = Some(page);
        self
    }

    /// Make authenticate fail
    pub fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    /// Counter handles survive the registry being boxed into the watcher
    pub fn auth_call_counter(&self) -> Arc<AtomicUsize> {
        self.auth_calls.clone()
    }

    pub fn repo_call_counter(&self) -> Arc<AtomicUsize> {
        self.repo_calls.clone()
    }

    pub fn page_call_counter(&self) -> Arc<AtomicUsize> {
        self.page_calls.clone()
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageRegistry for MockRegistry {
    async fn authenticate(&self, username: &str, _password: &str) -> Result<String> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err(Error::auth("injected authentication failure"));
        }
        Ok(format!("token-for-{}", username))
    }

    async fn fetch_repository(
        &self,
        namespace: &str,
        name: &str,
        _token: Option<&str>,
    ) -> Result<RepositoryInfo> {
        self.repo_calls.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/{}", namespace, name);
        self.repos
            .get(&key)
            .map(|last_updated| RepositoryInfo {
                last_updated: last_updated.clone(),
            })
            .ok_or_else(|| Error::not_found(key))
    }

    async fn fetch_tag_page(
        &self,
        namespace: &str,
        name: &str,
        page: usize,
        _token: Option<&str>,
    ) -> Result<TagPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_page == Some(page) {
            return Err(Error::registry(format!("injected failure on page {}", page)));
        }

        let key = format!("{}/{}", namespace, name);
        let all = self.tags.get(&key).ok_or_else(|| Error::not_found(key))?;

        let results = all
            .iter()
            .skip((page - 1) * TAG_PAGE_SIZE)
            .take(TAG_PAGE_SIZE)
            .cloned()
            .collect();

        Ok(TagPage {
            count: all.len(),
            results,
        })
    }
}

/// A handler double recording every execution as "instance:identity"
pub struct RecordingHandler {
    executed: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the execution log, usable after the handler is
    /// registered
    pub fn execution_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.executed.clone()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifyHandler for RecordingHandler {
    async fn execute(&self, action: &ActionConfig, event: &UpdateEvent, _config: &WatchConfig) {
        self.executed
            .lock()
            .unwrap()
            .push(format!("{}:{}", action.instance, event.image.identity()));
    }

    fn validate_instance(&self, _action: &ActionConfig, _config: &WatchConfig) -> bool {
        true
    }
}

/// Build a WatchConfig from a JSON value (tests only)
pub fn config_from_json(value: serde_json::Value) -> WatchConfig {
    serde_json::from_value(value).expect("test config parses")
}
