//! Response shape of the retailer's per-category JSON (`/b/<category>.json`).
//!
//! ```text
//! { "sub_categories": [
//!     { "id": 12, "name": "Chinos",
//!       "products": [ { "entity_id": 1017, "price": 98, "special_price": 0, ... } ] } ] }
//! ```
//!
//! `special_price` is `0` for products at full price. Everything a product
//! carries beyond the three priced/identity fields is kept verbatim.

use salewatch_core::products::price_field;
use salewatch_core::{CatalogId, CategoryLink, Product};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Keys the aggregator owns. Upstream values under these names are dropped
/// so they never shadow the computed fields on output.
const RESERVED_KEYS: [&str; 2] = ["salePercent", "categoryLink"];

/// Top-level body of one category fetch.
#[derive(Debug, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SubCategory {
    pub id: CatalogId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
}

/// A product as listed by the retailer, before it is stamped with its
/// category link.
#[derive(Debug, Deserialize)]
pub struct CatalogProduct {
    pub entity_id: CatalogId,
    #[serde(default, deserialize_with = "price_field")]
    pub price: f64,
    #[serde(default, deserialize_with = "price_field")]
    pub special_price: f64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CatalogProduct {
    /// Converts into an aggregated [`Product`] attached to `link`.
    #[must_use]
    pub fn into_product(mut self, link: CategoryLink) -> Product {
        for key in RESERVED_KEYS {
            self.attributes.remove(key);
        }
        Product {
            entity_id: self.entity_id,
            price: self.price,
            special_price: self.special_price,
            sale_percent: None,
            category_link: link,
            attributes: self.attributes,
        }
    }
}
