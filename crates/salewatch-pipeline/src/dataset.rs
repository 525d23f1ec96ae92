use chrono::{DateTime, Utc};
use salewatch_core::{compute_on_sale, compute_unlisted, Product};
use serde::Serialize;

/// Where a dataset's collections came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    /// A live fetch of every category.
    Refresh,
    /// Snapshots persisted by an earlier cycle.
    Cache,
}

/// Immutable result of one cycle. Shared as `Arc<Dataset>` once published.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub cycle: u64,
    pub published_at: DateTime<Utc>,
    pub source: DatasetSource,
    pub products: Vec<Product>,
    pub sale_category: Vec<Product>,
    /// Every discounted product, with `sale_percent` set.
    pub complete_sales: Vec<Product>,
    /// Discounted products missing from `sale_category`, ascending by
    /// sale percent.
    pub unlisted_sales: Vec<Product>,
}

impl Dataset {
    /// Runs the sale diff over freshly aggregated or cached collections.
    #[must_use]
    pub fn build(
        cycle: u64,
        source: DatasetSource,
        products: Vec<Product>,
        sale_category: Vec<Product>,
    ) -> Self {
        let complete_sales = compute_on_sale(&products);
        let unlisted_sales = compute_unlisted(&sale_category, &complete_sales);
        Self {
            cycle,
            published_at: Utc::now(),
            source,
            products,
            sale_category,
            complete_sales,
            unlisted_sales,
        }
    }
}
