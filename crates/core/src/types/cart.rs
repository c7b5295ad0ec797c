//! Cart line items and the pure operations on them.
//!
//! These functions carry the cart invariants; the storefront's cart manager
//! only decides when to apply them and how to persist the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Product, ProductId};

/// Largest quantity a client may put on one line.
pub const MAX_QUANTITY: i64 = 999;

/// A product snapshot taken when it was added, plus a quantity.
///
/// Serialized flat, so a stored line item looks like the product document
/// with an extra `quantity` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: i64,
}

impl LineItem {
    /// Product id of this line.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.product.id
    }

    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// The items of one cart.
///
/// Invariant: at most one line per product id.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct CartItems(Vec<LineItem>);

impl CartItems {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from stored lines, merging duplicate product ids.
    ///
    /// Documents written by other clients can break the one-line-per-product
    /// invariant; the first occurrence keeps its snapshot and absorbs the
    /// quantities of later ones.
    #[must_use]
    pub fn from_stored(lines: Vec<LineItem>) -> Self {
        let mut items = Self::new();
        for line in lines {
            match items.position(line.id()) {
                Some(index) => {
                    if let Some(existing) = items.0.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => items.0.push(line),
            }
        }
        items
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.0.iter().position(|line| line.id() == id)
    }

    /// Add `quantity` of `product`: bump an existing line or append a snapshot.
    ///
    /// The sum saturates at the `i64` bounds.
    pub fn add(&mut self, product: &Product, quantity: i64) {
        match self.0.iter_mut().find(|line| line.id() == &product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.0.push(LineItem {
                product: product.clone(),
                quantity,
            }),
        }
    }

    /// Remove the line for `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.0.len();
        self.0.retain(|line| line.id() != id);
        self.0.len() != before
    }

    /// Replace the quantity of the line for `id` verbatim.
    ///
    /// No lower bound is applied here; callers validate input at the
    /// boundary. Returns whether a line was found.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        match self.0.iter_mut().find(|line| line.id() == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Look up the line for `id`.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.0.iter().find(|line| line.id() == id)
    }

    /// Sum of line totals, saturating at the `Decimal` range.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0
            .iter()
            .map(LineItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Sum of quantities, as shown on the cart badge.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.0
            .iter()
            .fold(0_i64, |count, line| count.saturating_add(line.quantity))
    }

    /// Quantity already held for `id`, zero when there is no line.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> i64 {
        self.get(id).map_or(0, |line| line.quantity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[LineItem] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CartItems {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<LineItem>::deserialize(deserializer).map(Self::from_stored)
    }
}

impl<'a> IntoIterator for &'a CartItems {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A cart change that can be replayed on a fresh copy of the items.
///
/// Persisting a cart is a conditional write; when another writer got there
/// first the mutation is applied again to the newer items.
#[derive(Debug, Clone, PartialEq)]
pub enum CartMutation {
    Add { product: Product, quantity: i64 },
    Remove(ProductId),
    SetQuantity { id: ProductId, quantity: i64 },
    Clear,
}

impl CartMutation {
    /// Apply to `items`.
    pub fn apply(&self, items: &mut CartItems) {
        match self {
            Self::Add { product, quantity } => items.add(product, *quantity),
            Self::Remove(id) => {
                items.remove(id);
            }
            Self::SetQuantity { id, quantity } => {
                items.set_quantity(id, *quantity);
            }
            Self::Clear => items.clear(),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove(_) => "remove",
            Self::SetQuantity { .. } => "update_quantity",
            Self::Clear => "clear",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::product::tests::product;
    use super::*;

    #[test]
    fn test_add_twice_merges_into_one_line() {
        let p = product("p1", "Kabel", "cables", 10);
        let mut items = CartItems::new();
        items.add(&p, 2);
        items.add(&p, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items.get(&p.id).unwrap().quantity, 5);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let mut items = CartItems::new();
        items.add(&product("p1", "A", "x", 1), 1);
        let before = items.clone();
        assert!(!items.remove(&ProductId::new("missing")));
        assert_eq!(items, before);
    }

    #[test]
    fn test_set_quantity_is_verbatim() {
        let p = product("p1", "A", "x", 1);
        let mut items = CartItems::new();
        items.add(&p, 1);
        assert!(items.set_quantity(&p.id, 0));
        assert_eq!(items.get(&p.id).unwrap().quantity, 0);
        assert!(items.set_quantity(&p.id, -2));
        assert_eq!(items.get(&p.id).unwrap().quantity, -2);
    }

    #[test]
    fn test_snapshot_is_not_a_live_reference() {
        let mut p = product("p1", "A", "x", 100);
        let mut items = CartItems::new();
        items.add(&p, 1);
        p.price = crate::Price::new(Decimal::from(5)).unwrap();
        assert_eq!(items.total(), Decimal::from(100));
    }

    #[test]
    fn test_total_and_item_count() {
        let mut items = CartItems::new();
        items.add(&product("a", "A", "x", 100), 2);
        items.add(&product("b", "B", "x", 15), 3);
        assert_eq!(items.total(), Decimal::from(245));
        assert_eq!(items.item_count(), 5);
    }

    #[test]
    fn test_stored_duplicates_are_merged() {
        let json = serde_json::json!([
            {"id": "p1", "name": "A", "price": 10, "quantity": 1},
            {"id": "p2", "name": "B", "price": 20, "quantity": 1},
            {"id": "p1", "name": "A", "price": 10, "quantity": 4}
        ]);
        let items: CartItems = serde_json::from_value(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&ProductId::new("p1")).unwrap().quantity, 5);
    }

    #[test]
    fn test_line_item_serializes_flat() {
        let mut items = CartItems::new();
        items.add(&product("p1", "A", "x", 100), 2);
        let value = serde_json::to_value(&items).unwrap();
        assert_eq!(value[0]["id"], "p1");
        assert_eq!(value[0]["quantity"], 2);
        assert_eq!(value[0]["price"], serde_json::json!(100.0));
    }

    #[test]
    fn test_quantities_saturate_instead_of_overflowing() {
        let p = product("p1", "A", "x", 1);
        let mut items = CartItems::new();
        items.add(&p, i64::MAX);
        items.add(&p, 1);
        assert_eq!(items.quantity_of(&p.id), i64::MAX);

        items.add(&product("p2", "B", "x", 1), 5);
        assert_eq!(items.item_count(), i64::MAX);
    }

    #[test]
    fn test_stored_duplicates_saturate() {
        let json = serde_json::json!([
            {"id": "p1", "price": 1, "quantity": i64::MAX},
            {"id": "p1", "price": 1, "quantity": i64::MAX}
        ]);
        let items: CartItems = serde_json::from_value(json).unwrap();
        assert_eq!(items.quantity_of(&ProductId::new("p1")), i64::MAX);
    }

    #[test]
    fn test_huge_total_saturates() {
        let mut expensive = product("p1", "A", "x", 1);
        expensive.price = crate::Price::new(Decimal::from(100_000_000_000_i64)).unwrap();
        let mut items = CartItems::new();
        items.add(&expensive, 1_000_000_000_000_000_000);
        items.add(&product("p2", "B", "x", 10), 1);
        assert_eq!(items.total(), Decimal::MAX);
    }

    #[test]
    fn test_mutation_replay() {
        let p = product("p1", "A", "x", 1);
        let mut items = CartItems::new();
        items.add(&p, 1);
        CartMutation::Add {
            product: p.clone(),
            quantity: 2,
        }
        .apply(&mut items);
        assert_eq!(items.get(&p.id).unwrap().quantity, 3);
        CartMutation::Clear.apply(&mut items);
        assert!(items.is_empty());
    }
}
