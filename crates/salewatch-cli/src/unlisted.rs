//! `unlisted`: report unlisted sales from the cached snapshots.

use salewatch_core::{AppConfig, Product};
use salewatch_pipeline::{Dataset, DatasetSource};
use salewatch_store::{FsBlobStore, PersistentCache};

/// Loads both snapshots, runs the sale diff and prints the result.
///
/// # Errors
///
/// Returns an error if either snapshot is missing or unreadable.
pub(crate) async fn run_unlisted(
    config: &AppConfig,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let cache = PersistentCache::new(FsBlobStore::new(&config.cache_dir));
    let Some(cached) = cache.load_collections().await? else {
        anyhow::bail!(
            "no cached snapshots in {}; run `salewatch-cli refresh` first",
            config.cache_dir.display()
        );
    };

    let dataset = Dataset::build(
        0,
        DatasetSource::Cache,
        cached.products,
        cached.sale_category,
    );
    let shown = limit.map_or(dataset.unlisted_sales.len(), |n| {
        n.min(dataset.unlisted_sales.len())
    });
    let rows = &dataset.unlisted_sales[..shown];

    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!(
        "{} of {} discounted products are missing from the sale page",
        dataset.unlisted_sales.len(),
        dataset.complete_sales.len()
    );
    for product in rows {
        println!("{}", format_row(product));
    }
    Ok(())
}

/// One table row: sale percent, id, category path and product name.
pub(crate) fn format_row(product: &Product) -> String {
    let percent = product.sale_percent.unwrap_or(0.0) * 100.0;
    let name = product
        .attributes
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("-");
    format!(
        "{percent:>5.1}%  {:<10}  {}/{}  {name}",
        product.entity_id.to_string(),
        product.category_link.cat,
        product.category_link.sub_cat.name,
    )
}
