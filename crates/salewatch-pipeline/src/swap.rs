use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use salewatch_core::{CatalogFile, Product};
use salewatch_scraper::{AggregatedCatalog, CategoryFetcher, Fetch, IngestSignal, ProductAggregator};
use salewatch_store::{BlobStore, PersistentCache};
use tokio::sync::{Mutex, RwLock};

use crate::dataset::{Dataset, DatasetSource};
use crate::error::PipelineError;

/// Cycle number given to datasets seeded from the cache. Any live refresh
/// outranks them.
const CACHE_CYCLE: u64 = 0;

/// Stages of a refresh cycle, in order. An abort before `Publishing` returns
/// straight to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    FetchingCategories,
    Aggregating,
    Persisting,
    Diffing,
    Publishing,
}

impl fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingCategories => "fetching_categories",
            Self::Aggregating => "aggregating",
            Self::Persisting => "persisting",
            Self::Diffing => "diffing",
            Self::Publishing => "publishing",
        };
        f.write_str(name)
    }
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The cycle's dataset is now live.
    Published(Arc<Dataset>),
    /// A newer cycle published first; this one was discarded unpersisted.
    Superseded { cycle: u64, live_cycle: u64 },
}

impl RefreshOutcome {
    #[must_use]
    pub fn published(&self) -> Option<&Arc<Dataset>> {
        match self {
            Self::Published(dataset) => Some(dataset),
            Self::Superseded { .. } => None,
        }
    }
}

/// Counts a running refresh for as long as it is alive, including when its
/// future is dropped mid-cycle.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the live [`Dataset`] and runner of refresh cycles.
///
/// Every cycle aggregates into its own state. The live reference changes
/// only inside the commit section, which persists, diffs and publishes one
/// cycle at a time and refuses to replace a dataset from a newer cycle.
pub struct DatasetSwap<F, S> {
    fetcher: CategoryFetcher<F>,
    cache: PersistentCache<S>,
    categories: Vec<String>,
    sale_category: String,
    max_concurrent_fetches: usize,
    live: RwLock<Option<Arc<Dataset>>>,
    commit_lock: Mutex<()>,
    last_cycle: AtomicU64,
    in_flight: AtomicUsize,
}

impl<F: Fetch, S: BlobStore> DatasetSwap<F, S> {
    /// `max_concurrent_fetches` bounds the fan-out of one cycle; `0` is
    /// treated as `1`.
    pub fn new(
        fetcher: F,
        cache: PersistentCache<S>,
        catalog: &CatalogFile,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            fetcher: CategoryFetcher::new(fetcher, catalog.base_url.clone()),
            cache,
            categories: catalog.categories.clone(),
            sale_category: catalog.sale_category.clone(),
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            live: RwLock::new(None),
            commit_lock: Mutex::new(()),
            last_cycle: AtomicU64::new(CACHE_CYCLE),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The live dataset, if any. The returned `Arc` stays valid across later
    /// publishes.
    pub async fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.live.read().await.clone()
    }

    /// Whether at least one refresh cycle is currently running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    #[must_use]
    pub fn cache(&self) -> &PersistentCache<S> {
        &self.cache
    }

    /// Runs one full cycle: fetch every category, aggregate, persist both
    /// collections, diff, publish.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any fetch, ingest or save fails. The live
    /// dataset is untouched in that case.
    pub async fn refresh(&self) -> Result<RefreshOutcome, PipelineError> {
        let cycle = self.last_cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::enter(&self.in_flight);
        let started = Instant::now();

        tracing::info!(
            cycle,
            categories = self.categories.len(),
            phase = %RefreshPhase::FetchingCategories,
            "refresh cycle started"
        );

        let result = match self.collect(cycle).await {
            Ok(catalog) => {
                self.commit(
                    cycle,
                    DatasetSource::Refresh,
                    catalog.products,
                    catalog.sale_products,
                )
                .await
            }
            Err(e) => Err(e),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(RefreshOutcome::Published(dataset)) => tracing::info!(
                cycle,
                elapsed_ms,
                products = dataset.products.len(),
                sale_category = dataset.sale_category.len(),
                complete_sales = dataset.complete_sales.len(),
                unlisted_sales = dataset.unlisted_sales.len(),
                phase = %RefreshPhase::Idle,
                "refresh cycle published"
            ),
            Ok(RefreshOutcome::Superseded { live_cycle, .. }) => tracing::info!(
                cycle,
                live_cycle,
                elapsed_ms,
                phase = %RefreshPhase::Idle,
                "refresh cycle superseded by a newer cycle"
            ),
            Err(e) => tracing::error!(
                cycle,
                elapsed_ms,
                phase = %e.phase(),
                error = %e,
                "refresh cycle aborted, live dataset unchanged"
            ),
        }

        result
    }

    /// Publishes the cached snapshots when nothing is live yet.
    ///
    /// Returns `Ok(None)` when either snapshot is missing. A live dataset is
    /// never replaced by cached data.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] if a snapshot cannot be read
    /// or decoded.
    pub async fn load_from_cache(&self) -> Result<Option<RefreshOutcome>, PipelineError> {
        let Some(cached) = self.cache.load_collections().await? else {
            tracing::debug!("cache is cold");
            return Ok(None);
        };

        let outcome = self
            .publish(CACHE_CYCLE, DatasetSource::Cache, cached.products, cached.sale_category)
            .await;
        if let RefreshOutcome::Published(dataset) = &outcome {
            tracing::info!(
                products = dataset.products.len(),
                unlisted_sales = dataset.unlisted_sales.len(),
                "published dataset from cache"
            );
        }
        Ok(Some(outcome))
    }

    async fn collect(&self, cycle: u64) -> Result<AggregatedCatalog, PipelineError> {
        let mut aggregator = ProductAggregator::new(self.categories.len());

        // Owned requests keep the cycle future `Send` for spawned refreshes.
        let requests: Vec<(String, bool)> = self
            .categories
            .iter()
            .map(|c| (c.clone(), false))
            .chain(std::iter::once((self.sale_category.clone(), true)))
            .collect();

        let fetcher = &self.fetcher;
        let mut fetches = stream::iter(requests)
            .map(|(category, is_sale)| async move {
                let result = fetcher.fetch_category(&category, is_sale).await;
                (category, result)
            })
            .buffer_unordered(self.max_concurrent_fetches);

        // Returning early drops `fetches`, cancelling whatever is still in flight.
        while let Some((category, result)) = fetches.next().await {
            let fetched = result.map_err(|e| PipelineError::from_fetch(&category, e))?;
            let signal = aggregator
                .ingest(fetched.catalog, &fetched.category, fetched.is_sale_category)
                .map_err(PipelineError::Aggregation)?;
            if signal == IngestSignal::CategoriesComplete {
                tracing::debug!(
                    cycle,
                    received = aggregator.received(),
                    phase = %RefreshPhase::Aggregating,
                    "all categories received"
                );
            }
        }

        aggregator.finish().map_err(PipelineError::Aggregation)
    }

    async fn commit(
        &self,
        cycle: u64,
        source: DatasetSource,
        products: Vec<Product>,
        sale_category: Vec<Product>,
    ) -> Result<RefreshOutcome, PipelineError> {
        let _commit = self.commit_lock.lock().await;

        if let Some(live_cycle) = self.newer_live_cycle(cycle).await {
            return Ok(RefreshOutcome::Superseded { cycle, live_cycle });
        }

        tracing::debug!(cycle, phase = %RefreshPhase::Persisting, "persisting collections");
        self.cache.save_collections(&products, &sale_category).await?;

        Ok(self.install(cycle, source, products, sale_category).await)
    }

    async fn publish(
        &self,
        cycle: u64,
        source: DatasetSource,
        products: Vec<Product>,
        sale_category: Vec<Product>,
    ) -> RefreshOutcome {
        let _commit = self.commit_lock.lock().await;

        let live_cycle = self.live.read().await.as_ref().map(|live| live.cycle);
        if let Some(live_cycle) = live_cycle {
            return RefreshOutcome::Superseded { cycle, live_cycle };
        }

        self.install(cycle, source, products, sale_category).await
    }

    /// Diffs and swaps in a new dataset. Caller holds the commit lock.
    async fn install(
        &self,
        cycle: u64,
        source: DatasetSource,
        products: Vec<Product>,
        sale_category: Vec<Product>,
    ) -> RefreshOutcome {
        tracing::debug!(cycle, phase = %RefreshPhase::Diffing, "computing sales");
        let dataset = Arc::new(Dataset::build(cycle, source, products, sale_category));

        tracing::debug!(cycle, phase = %RefreshPhase::Publishing, "publishing dataset");
        *self.live.write().await = Some(Arc::clone(&dataset));
        RefreshOutcome::Published(dataset)
    }

    async fn newer_live_cycle(&self, cycle: u64) -> Option<u64> {
        self.live
            .read()
            .await
            .as_ref()
            .map(|live| live.cycle)
            .filter(|&live_cycle| live_cycle > cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_display_as_snake_case() {
        assert_eq!(RefreshPhase::FetchingCategories.to_string(), "fetching_categories");
        assert_eq!(RefreshPhase::Idle.to_string(), "idle");
    }

    #[test]
    fn in_flight_guard_decrements_on_drop() {
        let counter = AtomicUsize::new(0);
        {
            let _a = InFlight::enter(&counter);
            let _b = InFlight::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
