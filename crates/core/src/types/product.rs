//! Catalog products and the consumer-side filters applied to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, ProductId, ValidationError};

/// Maximum number of related products shown next to a product.
pub const MAX_SUGGESTIONS: usize = 4;

/// A catalog product as stored in the `products` collection.
///
/// Field names follow the document layout (`imageURL`, `createdAt`).
/// Documents written by older tooling may miss optional fields, so
/// everything except the id falls back to a default. Fields this type does
/// not model (`promo`, `oldPrice`, ...) are kept in [`Product::extra`] and
/// written back unchanged, so cart snapshots carry them too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, rename = "imageURL")]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Marketing flag shown as a "new" badge.
    #[serde(default, rename = "isNew", skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fields of a product about to be created.
///
/// `createdAt` is not part of the payload; the backend stamps it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: i64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub category: String,
}

/// Raw product form input.
///
/// Every field is optional so that a half-filled form produces a
/// [`ValidationError`] instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<Price>,
    pub stock: Option<i64>,
    #[serde(default, rename = "imageURL")]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
}

impl ProductForm {
    /// Validate the form and produce a [`NewProduct`].
    ///
    /// Name, price and category are required; description and image are
    /// free-form; stock defaults to zero.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank required field
    /// and `ValidationError::NegativeStock` for a stock below zero.
    pub fn validate(self) -> Result<NewProduct, ValidationError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        let price = self.price.ok_or(ValidationError::MissingField("price"))?;
        let category = self.category.trim().to_owned();
        if category.is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        let stock = self.stock.unwrap_or(0);
        if stock < 0 {
            return Err(ValidationError::NegativeStock);
        }

        Ok(NewProduct {
            name,
            description: self.description.trim().to_owned(),
            price,
            stock,
            image_url: self.image_url.trim().to_owned(),
            category,
        })
    }
}

/// Search and category filter applied to a fetched product list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes the filter. Blank terms do not filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => product
                .name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };
        let category_ok = match self.category.as_deref() {
            Some(category) if !category.is_empty() => product.category == category,
            _ => true,
        };
        search_ok && category_ok
    }

    /// Keep the products that pass, preserving order.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Products from the same category as `product`, excluding itself.
#[must_use]
pub fn suggestions<'a>(product: &Product, all: &'a [Product]) -> Vec<&'a Product> {
    all.iter()
        .filter(|p| p.category == product.category && p.id != product.id)
        .take(MAX_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use rust_decimal::Decimal;

    use super::*;

    pub(crate) fn product(id: &str, name: &str, category: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: String::new(),
            price: Price::new(Decimal::from(price)).unwrap(),
            stock: 10,
            image_url: String::new(),
            category: category.to_owned(),
            created_at: None,
            is_new: false,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_filter_search_is_case_insensitive_substring() {
        let filter = ProductFilter {
            search: Some("LAPTOP".to_owned()),
            category: None,
        };
        assert!(filter.matches(&product("1", "Gaming laptop X", "gaming", 1)));
        assert!(!filter.matches(&product("2", "Monitor", "gaming", 1)));
    }

    #[test]
    fn test_filter_category_is_exact() {
        let filter = ProductFilter {
            search: None,
            category: Some("laptops".to_owned()),
        };
        assert!(filter.matches(&product("1", "A", "laptops", 1)));
        assert!(!filter.matches(&product("2", "B", "laptops/business", 1)));
    }

    #[test]
    fn test_blank_filter_keeps_everything() {
        let filter = ProductFilter {
            search: Some("  ".to_owned()),
            category: Some(String::new()),
        };
        let all = vec![product("1", "A", "x", 1), product("2", "B", "y", 1)];
        assert_eq!(filter.apply(all).len(), 2);
    }

    #[test]
    fn test_suggestions_same_category_without_self_capped() {
        let all: Vec<Product> = (0..7)
            .map(|i| product(&i.to_string(), "P", if i == 6 { "other" } else { "audio" }, 1))
            .collect();
        let picks = suggestions(&all[0], &all);
        assert_eq!(picks.len(), MAX_SUGGESTIONS);
        assert!(picks.iter().all(|p| p.id.as_str() != "0" && p.category == "audio"));
    }

    #[test]
    fn test_form_requires_name_price_category() {
        let form = ProductForm {
            name: "  ".to_owned(),
            ..ProductForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingField("name")));

        let form = ProductForm {
            name: "Mysz".to_owned(),
            ..ProductForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingField("price")));

        let form = ProductForm {
            name: "Mysz".to_owned(),
            price: Some(Price::ZERO),
            ..ProductForm::default()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::MissingField("category"))
        );
    }

    #[test]
    fn test_form_rejects_negative_stock() {
        let form = ProductForm {
            name: "Mysz".to_owned(),
            price: Some(Price::ZERO),
            category: "gaming".to_owned(),
            stock: Some(-1),
            ..ProductForm::default()
        };
        assert_eq!(form.validate(), Err(ValidationError::NegativeStock));
    }

    #[test]
    fn test_product_reads_document_field_names() {
        let json = serde_json::json!({
            "id": "p1",
            "name": "Słuchawki",
            "price": 199.99,
            "imageURL": "https://img/1.jpg",
            "category": "audio",
            "createdAt": "2025-03-01T10:00:00Z"
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.image_url, "https://img/1.jpg");
        assert_eq!(product.stock, 0);
        assert!(product.created_at.is_some());
        assert!(product.extra.is_empty());
    }

    #[test]
    fn test_unmodelled_fields_survive_snapshot() {
        let json = serde_json::json!({
            "id": "p1",
            "name": "Klawiatura",
            "price": 249.0,
            "category": "gaming",
            "promo": true,
            "oldPrice": 299.0,
            "details": {"switches": "red", "layout": ["pl", "us"]}
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.extra.len(), 3);
        assert_eq!(product.extra["promo"], serde_json::json!(true));

        let mut items = super::super::CartItems::new();
        items.add(&product, 2);
        let stored = serde_json::to_value(&items).unwrap();
        assert_eq!(stored[0]["promo"], serde_json::json!(true));
        assert_eq!(stored[0]["oldPrice"], serde_json::json!(299.0));
        assert_eq!(stored[0]["details"]["layout"][1], "us");
        assert_eq!(stored[0]["quantity"], 2);

        let back: super::super::CartItems = serde_json::from_value(stored).unwrap();
        let line = back.get(&product.id).unwrap();
        assert_eq!(line.product, product);
        assert!(!line.product.extra.contains_key("quantity"));
    }
}
