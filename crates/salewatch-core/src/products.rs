//! Product records as aggregated from the retailer's category catalogs.
//!
//! The retailer's JSON carries many presentation fields (names, urls, image
//! sets) we never interpret. Those land in [`Product::attributes`] and are
//! written back out unchanged, so the served JSON keeps the retailer's shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Retailer identifier. Observed as a JSON number for products and
/// sub-categories, but strings are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogId::Number(n) => write!(f, "{n}"),
            CatalogId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CatalogId {
    fn from(value: i64) -> Self {
        CatalogId::Number(value)
    }
}

/// Sub-category a product was listed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryRef {
    pub id: CatalogId,
    #[serde(default)]
    pub name: String,
}

/// Where a product was found: primary category id plus sub-category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    /// Primary category id, e.g. `"mens-pants"`.
    pub cat: String,
    pub sub_cat: SubCategoryRef,
}

/// A single product in an aggregated collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub entity_id: CatalogId,

    #[serde(default, deserialize_with = "price_field")]
    pub price: f64,

    /// `0` when the product is not discounted.
    #[serde(default, deserialize_with = "price_field")]
    pub special_price: f64,

    /// Discount fraction. Only set on products that passed through
    /// [`crate::sales::compute_on_sale`].
    #[serde(
        rename = "salePercent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_percent: Option<f64>,

    #[serde(rename = "categoryLink")]
    pub category_link: CategoryLink,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_discounted(&self) -> bool {
        self.special_price != 0.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

/// Prices arrive as JSON numbers; numeric strings and `null` are tolerated.
/// `null` reads as `0`, i.e. "no special price".
pub fn price_field<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawPrice>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(RawPrice::Number(n)) => Ok(n),
        Some(RawPrice::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid price \"{s}\": {e}")))
        }
    }
}
