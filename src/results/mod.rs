//! Cache-aside coordination for the reporting views.
//!
//! Every view follows the same protocol: read the cache by the view's key,
//! on a miss query the vote store, aggregate, write the serialized payload
//! back with the view's TTL, and return it. A hit returns the cached bytes
//! untouched, so staleness is bounded only by the TTL. Concurrent misses
//! for one key may each query the store and overwrite the entry; there is
//! no single-flight de-duplication.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};

use crate::aggregate;
use crate::cache::SummaryCache;
use crate::config::TtlPolicy;
use crate::db::VoteStore;
use crate::error::AppError;
use crate::models::CategorySummary;

/// One reporting surface. Each view owns a distinct cache key: a collision
/// would serve wrong-scope data, a needless split would defeat caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// All categories, summary TTL.
    Results,
    /// A single category, summary TTL.
    Category(i64),
    /// All categories under the short TTL, for frequent polling.
    Live,
}

impl View {
    pub fn cache_key(&self) -> String {
        match self {
            View::Results => "results:all".to_string(),
            View::Category(id) => format!("results:category:{id}"),
            View::Live => "results:live".to_string(),
        }
    }

    fn category_filter(&self) -> Option<i64> {
        match self {
            View::Category(id) => Some(*id),
            View::Results | View::Live => None,
        }
    }

    fn ttl_secs(&self, ttl: &TtlPolicy) -> u64 {
        match self {
            View::Live => ttl.live_secs,
            View::Results | View::Category(_) => ttl.summary_secs,
        }
    }
}

pub struct Coordinator {
    store: Arc<dyn VoteStore>,
    cache: Arc<dyn SummaryCache>,
    ttl: TtlPolicy,
}

impl Coordinator {
    pub fn new(store: Arc<dyn VoteStore>, cache: Arc<dyn SummaryCache>, ttl: TtlPolicy) -> Self {
        Self { store, cache, ttl }
    }

    /// Serve a view's JSON payload, from cache when possible.
    ///
    /// Cache failures degrade to a direct store read and are only logged;
    /// store failures propagate untouched rather than being masked with
    /// stale data.
    pub async fn get_summary(&self, view: View) -> Result<Vec<u8>, AppError> {
        let key = view.cache_key();

        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                debug!("cache hit for {key}");
                return Ok(payload);
            }
            Ok(None) => debug!("cache miss for {key}"),
            Err(e) => warn!("cache read failed for {key}, falling through to store: {e}"),
        }

        let payload = self.compute(view).await?;

        if let Err(e) = self
            .cache
            .set_with_ttl(&key, &payload, view.ttl_secs(&self.ttl))
            .await
        {
            warn!("cache write failed for {key}: {e}");
        }

        Ok(payload)
    }

    async fn compute(&self, view: View) -> Result<Vec<u8>, AppError> {
        let computed_at = Utc::now();

        if let View::Category(id) = view {
            let category = self
                .store
                .category(id)
                .await?
                .ok_or(AppError::NotFound(id))?;

            let rows = self.store.vote_rows(Some(id)).await?;
            let summaries = aggregate::summarize(&rows, computed_at)?;

            // An existing category without nominees still reports, it just
            // has nothing on the board yet.
            let summary = summaries
                .into_iter()
                .next()
                .unwrap_or_else(|| CategorySummary {
                    category_id: category.id,
                    category_name: category.name,
                    total_votes: 0,
                    nominees: Vec::new(),
                    computed_at,
                });

            return Ok(serde_json::to_vec(&summary)?);
        }

        let rows = self.store.vote_rows(view.category_filter()).await?;
        let summaries = aggregate::summarize(&rows, computed_at)?;
        Ok(serde_json::to_vec(&summaries)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::{Category, NomineeAttributes, VoteRow};

    struct FakeStore {
        categories: Vec<Category>,
        rows: Vec<VoteRow>,
        unavailable: bool,
        queries: AtomicUsize,
    }

    impl FakeStore {
        fn new(categories: Vec<Category>, rows: Vec<VoteRow>) -> Self {
            Self {
                categories,
                rows,
                unavailable: false,
                queries: AtomicUsize::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                categories: Vec::new(),
                rows: Vec::new(),
                unavailable: true,
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VoteStore for FakeStore {
        async fn category(&self, category_id: i64) -> Result<Option<Category>, AppError> {
            if self.unavailable {
                return Err(AppError::StoreUnavailable(sqlx::Error::PoolClosed));
            }
            Ok(self.categories.iter().find(|c| c.id == category_id).cloned())
        }

        async fn vote_rows(&self, category_id: Option<i64>) -> Result<Vec<VoteRow>, AppError> {
            if self.unavailable {
                return Err(AppError::StoreUnavailable(sqlx::Error::PoolClosed));
            }
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rows
                .iter()
                .filter(|r| category_id.is_none_or(|id| r.category_id == id))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeCache {
        entries: Mutex<HashMap<String, (Vec<u8>, u64)>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl FakeCache {
        fn ttl_of(&self, key: &str) -> Option<u64> {
            self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
        }
    }

    #[async_trait]
    impl SummaryCache for FakeCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
            if self.fail_reads {
                return Err(AppError::CacheUnavailable("connection refused".to_string()));
            }
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .map(|(payload, _)| payload.clone()))
        }

        async fn set_with_ttl(
            &self,
            key: &str,
            payload: &[u8],
            ttl_secs: u64,
        ) -> Result<(), AppError> {
            if self.fail_writes {
                return Err(AppError::CacheUnavailable("connection refused".to_string()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (payload.to_vec(), ttl_secs));
            Ok(())
        }
    }

    fn row(category_id: i64, nominee_id: i64, name: &str, votes: i64) -> VoteRow {
        VoteRow {
            category_id,
            category_name: format!("Category {category_id}"),
            nominee_id,
            nominee_name: name.to_string(),
            attributes: NomineeAttributes::default(),
            vote_total: votes,
        }
    }

    fn fixture_rows() -> Vec<VoteRow> {
        vec![row(1, 1, "A", 30), row(1, 2, "B", 30), row(2, 3, "C", 5)]
    }

    fn fixture_categories() -> Vec<Category> {
        vec![
            Category { id: 1, name: "Best Singer".to_string() },
            Category { id: 2, name: "Best Drummer".to_string() },
            Category { id: 3, name: "Newcomer".to_string() },
        ]
    }

    fn ttl() -> TtlPolicy {
        TtlPolicy { summary_secs: 60, live_secs: 10 }
    }

    fn coordinator(store: FakeStore, cache: FakeCache) -> (Coordinator, Arc<FakeStore>, Arc<FakeCache>) {
        let store = Arc::new(store);
        let cache = Arc::new(cache);
        let coordinator = Coordinator::new(store.clone(), cache.clone(), ttl());
        (coordinator, store, cache)
    }

    #[tokio::test]
    async fn second_call_is_a_byte_identical_cache_hit() {
        let (coordinator, store, _cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        let first = coordinator.get_summary(View::Results).await.unwrap();
        let second = coordinator.get_summary(View::Results).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn views_use_isolated_cache_keys() {
        let (coordinator, _store, cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        coordinator.get_summary(View::Results).await.unwrap();
        coordinator.get_summary(View::Category(1)).await.unwrap();
        coordinator.get_summary(View::Live).await.unwrap();

        let entries = cache.entries.lock().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.contains_key("results:all"));
        assert!(entries.contains_key("results:category:1"));
        assert!(entries.contains_key("results:live"));
    }

    #[tokio::test]
    async fn live_view_expires_faster_than_summary_views() {
        let (coordinator, _store, cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        coordinator.get_summary(View::Results).await.unwrap();
        coordinator.get_summary(View::Live).await.unwrap();

        assert_eq!(cache.ttl_of("results:all"), Some(60));
        assert_eq!(cache.ttl_of("results:live"), Some(10));
    }

    #[tokio::test]
    async fn cache_read_failure_falls_through_to_store() {
        let (coordinator, store, _cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache { fail_reads: true, ..FakeCache::default() },
        );

        let payload = coordinator.get_summary(View::Results).await.unwrap();
        let summaries: Vec<CategorySummary> = serde_json::from_slice(&payload).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_fresh_result() {
        let (coordinator, _store, _cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache { fail_writes: true, ..FakeCache::default() },
        );

        let payload = coordinator.get_summary(View::Category(2)).await.unwrap();
        let summary: CategorySummary = serde_json::from_slice(&payload).unwrap();
        assert_eq!(summary.category_id, 2);
        assert_eq!(summary.total_votes, 5);
    }

    #[tokio::test]
    async fn store_failure_propagates_instead_of_serving_stale_data() {
        let (coordinator, _store, _cache) =
            coordinator(FakeStore::unavailable(), FakeCache::default());

        let err = coordinator.get_summary(View::Results).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let (coordinator, _store, cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        let err = coordinator.get_summary(View::Category(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(99)));
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_category_without_nominees_reports_empty_board() {
        let (coordinator, _store, _cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        let payload = coordinator.get_summary(View::Category(3)).await.unwrap();
        let summary: CategorySummary = serde_json::from_slice(&payload).unwrap();

        assert_eq!(summary.category_id, 3);
        assert_eq!(summary.category_name, "Newcomer");
        assert_eq!(summary.total_votes, 0);
        assert!(summary.nominees.is_empty());
    }

    #[tokio::test]
    async fn scoped_view_serializes_a_single_object() {
        let (coordinator, _store, _cache) = coordinator(
            FakeStore::new(fixture_categories(), fixture_rows()),
            FakeCache::default(),
        );

        let payload = coordinator.get_summary(View::Category(1)).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        assert!(value.is_object());
        assert_eq!(value["category_id"], 1);
        assert_eq!(value["total_votes"], 60);
        assert_eq!(value["nominees"].as_array().unwrap().len(), 2);
        assert_eq!(value["nominees"][0]["is_leader"], true);
        assert_eq!(value["nominees"][1]["is_leader"], true);
    }

    #[tokio::test]
    async fn cached_entry_under_one_key_is_invisible_to_the_other() {
        let cache = FakeCache::default();
        cache
            .entries
            .lock()
            .unwrap()
            .insert("results:all".to_string(), (b"[]".to_vec(), 60));

        let (coordinator, store, _cache) =
            coordinator(FakeStore::new(fixture_categories(), fixture_rows()), cache);

        // The scoped view must not see the global entry.
        let payload = coordinator.get_summary(View::Category(1)).await.unwrap();
        assert_ne!(payload, b"[]".to_vec());
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }
}
