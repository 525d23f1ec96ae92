//! `refresh`: one full cycle against the live retailer.

use salewatch_core::AppConfig;
use salewatch_pipeline::{DatasetSwap, RefreshOutcome};
use salewatch_scraper::HttpFetcher;
use salewatch_store::{FsBlobStore, PersistentCache};

/// Runs one refresh cycle and writes both snapshots to the cache directory.
///
/// # Errors
///
/// Returns an error if the catalog file is invalid, the HTTP client cannot
/// be built, or the cycle aborts. Nothing is written in the last case.
pub(crate) async fn run_refresh(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = salewatch_core::load_catalog(&config.catalog_path)?;
    let fetcher = HttpFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )?;
    let cache = PersistentCache::new(FsBlobStore::new(&config.cache_dir));
    let swap = DatasetSwap::new(
        fetcher,
        cache,
        &catalog,
        config.scraper_max_concurrent_fetches,
    );

    let dataset = match swap.refresh().await? {
        RefreshOutcome::Published(dataset) => dataset,
        RefreshOutcome::Superseded { cycle, live_cycle } => {
            anyhow::bail!("cycle {cycle} was superseded by cycle {live_cycle}")
        }
    };

    println!(
        "refreshed {} categories into {}",
        catalog.expected_categories(),
        config.cache_dir.display()
    );
    println!("  products:        {}", dataset.products.len());
    println!("  sale category:   {}", dataset.sale_category.len());
    println!("  on sale:         {}", dataset.complete_sales.len());
    println!("  unlisted sales:  {}", dataset.unlisted_sales.len());
    Ok(())
}
