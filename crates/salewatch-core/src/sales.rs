//! Sale detection over aggregated product collections.
//!
//! Both operations are pure: they take slices and return new vectors, so a
//! published dataset is never mutated by a later diff.

use std::collections::HashSet;

use crate::products::{CatalogId, Product};

/// Fraction of `price` knocked off by `special_price`.
///
/// Returns `0.0` when the division is undefined (zero or non-finite price).
#[must_use]
pub fn discount_fraction(price: f64, special_price: f64) -> f64 {
    let fraction = (price - special_price) / price;
    if fraction.is_finite() {
        fraction
    } else {
        0.0
    }
}

/// Returns every discounted product (`special_price != 0`) with its
/// `sale_percent` recomputed from the current price fields. Any value the
/// input carried is overwritten. Input order is preserved.
#[must_use]
pub fn compute_on_sale(products: &[Product]) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.is_discounted())
        .map(|p| {
            let mut on_sale = p.clone();
            on_sale.sale_percent = Some(discount_fraction(p.price, p.special_price));
            on_sale
        })
        .collect()
}

/// Returns the discounted products whose identity does not appear in the
/// retailer's sale-category listing, sorted ascending by sale percent.
///
/// The difference is one-directional: sale-category entries missing from
/// `discounted` are ignored. The sort is stable, so products with equal
/// percentages keep their relative order from `discounted`.
#[must_use]
pub fn compute_unlisted(sale_category: &[Product], discounted: &[Product]) -> Vec<Product> {
    let listed: HashSet<&CatalogId> = sale_category.iter().map(|p| &p.entity_id).collect();

    let mut unlisted: Vec<Product> = discounted
        .iter()
        .filter(|p| !listed.contains(&p.entity_id))
        .cloned()
        .collect();

    unlisted.sort_by(|a, b| {
        a.sale_percent
            .unwrap_or(0.0)
            .total_cmp(&b.sale_percent.unwrap_or(0.0))
    });
    unlisted
}

#[cfg(test)]
#[path = "sales_test.rs"]
mod tests;
