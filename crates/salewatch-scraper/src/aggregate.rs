//! Per-cycle aggregation of category catalogs into flat product lists.
//!
//! A [`ProductAggregator`] belongs to exactly one refresh cycle. Ingest order
//! does not matter; completion is decided purely by how many ordinary
//! categories have been ingested.

use salewatch_core::{CategoryLink, Product, SubCategoryRef};

use crate::error::ScraperError;
use crate::types::CatalogResponse;

/// What a single ingest changed about the cycle's completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestSignal {
    /// An ordinary category was added; more are outstanding.
    Pending { received: usize, expected: usize },
    /// The last expected ordinary category was just added.
    CategoriesComplete,
    /// The sale category was added. It never counts toward `expected`.
    SaleComplete,
}

/// Products gathered by a completed cycle.
#[derive(Debug, Clone, Default)]
pub struct AggregatedCatalog {
    /// Every product from the ordinary categories, in ingest order.
    pub products: Vec<Product>,
    /// Products from the retailer's own sale listing.
    pub sale_products: Vec<Product>,
}

#[derive(Debug)]
pub struct ProductAggregator {
    expected: usize,
    received: usize,
    sale_received: bool,
    catalog: AggregatedCatalog,
}

impl ProductAggregator {
    /// Starts a cycle waiting on `expected` ordinary categories.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            sale_received: false,
            catalog: AggregatedCatalog::default(),
        }
    }

    /// Flattens `catalog` into the target collection, stamping each product
    /// with `category` and the sub-category it was listed under.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedCategory`] for a second sale-category
    /// ingest or an ordinary ingest beyond the expected count. The collections
    /// are left untouched in that case.
    pub fn ingest(
        &mut self,
        catalog: CatalogResponse,
        category: &str,
        is_sale_category: bool,
    ) -> Result<IngestSignal, ScraperError> {
        if is_sale_category && self.sale_received {
            return Err(ScraperError::UnexpectedCategory {
                category: category.to_owned(),
                reason: "sale category already ingested this cycle".to_string(),
            });
        }
        if !is_sale_category && self.received >= self.expected {
            return Err(ScraperError::UnexpectedCategory {
                category: category.to_owned(),
                reason: format!("all {} expected categories already ingested", self.expected),
            });
        }

        let target = if is_sale_category {
            &mut self.catalog.sale_products
        } else {
            &mut self.catalog.products
        };

        let before = target.len();
        for sub_category in catalog.sub_categories {
            let link = CategoryLink {
                cat: category.to_owned(),
                sub_cat: SubCategoryRef {
                    id: sub_category.id,
                    name: sub_category.name.unwrap_or_default(),
                },
            };
            target.extend(
                sub_category
                    .products
                    .into_iter()
                    .map(|p| p.into_product(link.clone())),
            );
        }
        let added = target.len() - before;

        if is_sale_category {
            self.sale_received = true;
            tracing::debug!(category, added, "sale category ingested");
            return Ok(IngestSignal::SaleComplete);
        }

        self.received += 1;
        tracing::debug!(
            category,
            added,
            received = self.received,
            expected = self.expected,
            "category ingested"
        );

        if self.received == self.expected {
            Ok(IngestSignal::CategoriesComplete)
        } else {
            Ok(IngestSignal::Pending {
                received: self.received,
                expected: self.expected,
            })
        }
    }

    #[must_use]
    pub fn received(&self) -> usize {
        self.received
    }

    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// All ordinary categories and the sale category are in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sale_received && self.received == self.expected
    }

    /// Consumes the aggregator, yielding the collections of a complete cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Incomplete`] if any category is still missing.
    pub fn finish(self) -> Result<AggregatedCatalog, ScraperError> {
        if !self.is_complete() {
            return Err(ScraperError::Incomplete {
                received: self.received,
                expected: self.expected,
                sale_received: self.sale_received,
            });
        }
        Ok(self.catalog)
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
