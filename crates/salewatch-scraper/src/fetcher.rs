use crate::client::Fetch;
use crate::error::ScraperError;
use crate::types::CatalogResponse;

/// One category's parsed catalog, tagged with where it came from.
#[derive(Debug)]
pub struct FetchedCategory {
    pub category: String,
    pub is_sale_category: bool,
    pub catalog: CatalogResponse,
}

/// Fetches and parses retailer category catalogs.
///
/// Each call issues exactly one request (retries aside) to
/// `base_url + category + ".json"`. Transport failures and bodies that are
/// not catalog JSON are both returned as errors; callers must treat either
/// as fatal to the refresh cycle.
#[derive(Debug, Clone)]
pub struct CategoryFetcher<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> CategoryFetcher<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Deterministic catalog URL for `category`.
    #[must_use]
    pub fn category_url(&self, category: &str) -> String {
        format!("{}{category}.json", self.base_url)
    }

    /// Fetches and parses one category.
    ///
    /// # Errors
    ///
    /// - Whatever the underlying [`Fetch`] returns for transport failures.
    /// - [`ScraperError::Deserialize`] if the body is not a catalog document.
    pub async fn fetch_category(
        &self,
        category: &str,
        is_sale_category: bool,
    ) -> Result<FetchedCategory, ScraperError> {
        let url = self.category_url(category);
        tracing::info!(category, is_sale_category, url = %url, "loading category");

        let body = self.fetcher.fetch(&url).await?;
        let catalog = serde_json::from_slice::<CatalogResponse>(&body).map_err(|e| {
            tracing::warn!(category, error = %e, "category response is not catalog JSON");
            ScraperError::Deserialize {
                context: format!("category {category}"),
                source: e,
            }
        })?;

        Ok(FetchedCategory {
            category: category.to_owned(),
            is_sale_category,
            catalog,
        })
    }
}
