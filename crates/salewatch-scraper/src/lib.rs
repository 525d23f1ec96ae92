pub mod aggregate;
pub mod client;
pub mod error;
pub mod fetcher;
mod retry;
pub mod types;

pub use aggregate::{AggregatedCatalog, IngestSignal, ProductAggregator};
pub use client::{Fetch, HttpFetcher};
pub use error::ScraperError;
pub use fetcher::{CategoryFetcher, FetchedCategory};
pub use types::{CatalogProduct, CatalogResponse, SubCategory};
