//! Contract test: tag pagination
//!
//! Verifies the fetch_all_tags request plan:
//! - The first page discloses the total count
//! - count=150 with a 100-tag page size issues exactly 2 page requests
//! - count<=100 issues exactly 1 request
//! - Results are concatenated in page order
//! - Any single page failure fails the whole fetch (no partial listings)

mod common;

use common::MockRegistry;
use regwatch_core::traits::ImageRegistry;
use std::sync::atomic::Ordering;

fn tag_fixture(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("tag-{:03}", i), format!("2026-01-01T00:00:{:02}Z", i % 60)))
        .collect()
}

#[tokio::test]
async fn count_150_issues_exactly_two_page_requests() {
    let tags = tag_fixture(150);
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();

    let registry = MockRegistry::new().with_tags("library/app", &tag_refs);
    let page_calls = registry.page_call_counter();

    let all = registry
        .fetch_all_tags("library", "app", None)
        .await
        .unwrap();

    assert_eq!(page_calls.load(Ordering::SeqCst), 2);
    assert_eq!(all.len(), 150);

    // Page order preserved: the listing comes back exactly as served
    assert_eq!(all[0].name, "tag-000");
    assert_eq!(all[99].name, "tag-099");
    assert_eq!(all[100].name, "tag-100");
    assert_eq!(all[149].name, "tag-149");
}

#[tokio::test]
async fn small_listing_issues_exactly_one_request() {
    let tags = tag_fixture(5);
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();

    let registry = MockRegistry::new().with_tags("library/app", &tag_refs);
    let page_calls = registry.page_call_counter();

    let all = registry
        .fetch_all_tags("library", "app", None)
        .await
        .unwrap();

    assert_eq!(page_calls.load(Ordering::SeqCst), 1);
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn exact_page_boundary_issues_exactly_one_request() {
    let tags = tag_fixture(100);
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();

    let registry = MockRegistry::new().with_tags("library/app", &tag_refs);
    let page_calls = registry.page_call_counter();

    let all = registry
        .fetch_all_tags("library", "app", None)
        .await
        .unwrap();

    assert_eq!(page_calls.load(Ordering::SeqCst), 1);
    assert_eq!(all.len(), 100);
}

#[tokio::test]
async fn any_page_failure_fails_the_whole_fetch() {
    let tags = tag_fixture(250);
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();

    let registry = MockRegistry::new()
        .with_tags("library/app", &tag_refs)
        .failing_page(3);

    let result = registry.fetch_all_tags("library", "app", None).await;
    assert!(result.is_err(), "a failed page must fail the whole fetch");
}

#[tokio::test]
async fn empty_listing_is_a_single_request() {
    let registry = MockRegistry::new().with_tags("library/app", &[]);
    let page_calls = registry.page_call_counter();

    let all = registry
        .fetch_all_tags("library", "app", None)
        .await
        .unwrap();

    assert_eq!(page_calls.load(Ordering::SeqCst), 1);
    assert!(all.is_empty());
}
