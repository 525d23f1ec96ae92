use std::sync::Arc;

use salewatch_core::Product;
use salewatch_scraper::Fetch;
use salewatch_store::BlobStore;
use serde::{Serialize, Serializer};
use tokio::sync::Mutex;

use crate::dataset::Dataset;
use crate::error::{PipelineError, ReadError};
use crate::swap::{DatasetSwap, RefreshOutcome};

/// Which derived collection a [`SalesView`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesKind {
    /// Discounted products missing from the retailer's sale listing.
    Unlisted,
    /// Every discounted product.
    Complete,
}

/// One collection of a published dataset.
///
/// Holds the whole dataset alive, so the items, cycle and timestamp always
/// come from the same publish. Serializes as a bare JSON array.
#[derive(Debug, Clone)]
pub struct SalesView {
    dataset: Arc<Dataset>,
    kind: SalesKind,
}

impl SalesView {
    #[must_use]
    pub fn items(&self) -> &[Product] {
        match self.kind {
            SalesKind::Unlisted => &self.dataset.unlisted_sales,
            SalesKind::Complete => &self.dataset.complete_sales,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SalesKind {
        self.kind
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl Serialize for SalesView {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.items().serialize(serializer)
    }
}

/// Read boundary over the live dataset.
///
/// Reads never block on a running refresh when something is already
/// published. With nothing published, the first reader loads on demand and
/// later readers either wait for that load or, when only a fetch could
/// satisfy them and one is already running, get [`ReadError::Loading`].
pub struct ReadApi<F, S> {
    swap: Arc<DatasetSwap<F, S>>,
    load_lock: Mutex<()>,
}

impl<F: Fetch, S: BlobStore> ReadApi<F, S> {
    pub fn new(swap: Arc<DatasetSwap<F, S>>) -> Self {
        Self {
            swap,
            load_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn swap(&self) -> &Arc<DatasetSwap<F, S>> {
        &self.swap
    }

    /// Published dataset without triggering a load.
    pub async fn current(&self) -> Option<Arc<Dataset>> {
        self.swap.snapshot().await
    }

    /// Discounted products absent from the sale listing, ascending by sale
    /// percent.
    ///
    /// # Errors
    ///
    /// See [`ReadApi::dataset`].
    pub async fn unlisted_sales(&self) -> Result<SalesView, ReadError> {
        Ok(SalesView {
            dataset: self.dataset().await?,
            kind: SalesKind::Unlisted,
        })
    }

    /// Every discounted product of the live dataset.
    ///
    /// # Errors
    ///
    /// See [`ReadApi::dataset`].
    pub async fn full_sales_view(&self) -> Result<SalesView, ReadError> {
        Ok(SalesView {
            dataset: self.dataset().await?,
            kind: SalesKind::Complete,
        })
    }

    /// The live dataset, loading it on demand if nothing is published.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Loading`] if the cache is cold and a refresh is
    ///   already running.
    /// - [`ReadError::CycleFailed`] if the on-demand load failed.
    pub async fn dataset(&self) -> Result<Arc<Dataset>, ReadError> {
        if let Some(dataset) = self.swap.snapshot().await {
            return Ok(dataset);
        }
        self.load_on_demand(LoadMode::OnDemand).await
    }

    /// Loads a dataset into an empty slot.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::StateConflict`] if a dataset is already live,
    /// otherwise the same errors as [`ReadApi::dataset`].
    pub async fn force_load(&self) -> Result<Arc<Dataset>, ReadError> {
        if let Some(live) = self.swap.snapshot().await {
            return Err(ReadError::StateConflict {
                live_cycle: live.cycle,
            });
        }
        self.load_on_demand(LoadMode::Forced).await
    }

    async fn load_on_demand(&self, mode: LoadMode) -> Result<Arc<Dataset>, ReadError> {
        let warm = self
            .swap
            .cache()
            .has_collections()
            .await
            .map_err(PipelineError::from)?;

        if !warm && self.swap.is_refreshing() {
            return Err(ReadError::Loading);
        }

        let _load = self.load_lock.lock().await;

        // Another reader may have finished loading while we waited.
        if let Some(dataset) = self.swap.snapshot().await {
            return mode.already_live(dataset);
        }

        if warm {
            tracing::info!("no dataset published, loading from cache");
            if let Some(outcome) = self.swap.load_from_cache().await? {
                return self.resolve(outcome, mode).await;
            }
        }

        if self.swap.is_refreshing() {
            return Err(ReadError::Loading);
        }

        tracing::info!("no dataset published and cache is cold, refreshing");
        let outcome = self.swap.refresh().await?;
        self.resolve(outcome, mode).await
    }

    async fn resolve(
        &self,
        outcome: RefreshOutcome,
        mode: LoadMode,
    ) -> Result<Arc<Dataset>, ReadError> {
        match outcome {
            RefreshOutcome::Published(dataset) => Ok(dataset),
            RefreshOutcome::Superseded { .. } => match self.swap.snapshot().await {
                Some(dataset) => mode.already_live(dataset),
                None => Err(ReadError::Loading),
            },
        }
    }
}

/// Whether a load was asked for explicitly or happens behind a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    OnDemand,
    Forced,
}

impl LoadMode {
    /// Outcome when a dataset went live before this load could publish.
    fn already_live(self, dataset: Arc<Dataset>) -> Result<Arc<Dataset>, ReadError> {
        match self {
            Self::OnDemand => Ok(dataset),
            Self::Forced => Err(ReadError::StateConflict {
                live_cycle: dataset.cycle,
            }),
        }
    }
}
