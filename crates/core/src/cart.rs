//! Session cart.
//!
//! [`Cart`] is an immutable value: every mutation produces a new cart.
//! [`CartStore`] holds the current cart behind an `Arc` and swaps it
//! atomically, so a reader either sees the whole mutation or none of it.
//!
//! Adding an item whose id is already in the cart merges into the existing
//! line: quantities are summed and the unit price is replaced by the newer
//! one. There is never more than one line per id.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::{BookId, Price};

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: BookId,
    pub title: String,
    /// Unit price.
    pub price: Price,
    pub quantity: u32,
}

impl CartItem {
    /// Create a line with quantity 1.
    #[must_use]
    pub fn new(id: impl Into<BookId>, title: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            quantity: 1,
        }
    }

    /// Set the quantity (clamped to at least 1).
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// What [`Cart::add`] did with the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The id was new; a line was appended.
    Added,
    /// The id was already present; the existing line was updated.
    Merged,
}

/// An ordered list of cart lines with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines (the navbar badge count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Look up a line by id.
    #[must_use]
    pub fn get(&self, id: &BookId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// True when a line with this id exists.
    #[must_use]
    pub fn contains(&self, id: &BookId) -> bool {
        self.get(id).is_some()
    }

    /// Cart total, recomputed from the current lines on every call.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Ids of every line, in cart order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<BookId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Return a cart with `item` added or merged.
    #[must_use]
    pub fn add(&self, item: CartItem) -> (Self, AddOutcome) {
        let mut items = self.items.clone();
        let quantity = item.quantity.max(1);
        if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.price = item.price;
            existing.title = item.title;
            (Self { items }, AddOutcome::Merged)
        } else {
            items.push(item.with_quantity(quantity));
            (Self { items }, AddOutcome::Added)
        }
    }

    /// Return a cart without the line for `id`, or `None` if absent.
    #[must_use]
    pub fn remove(&self, id: &BookId) -> Option<Self> {
        let position = self.items.iter().position(|item| &item.id == id)?;
        let mut items = self.items.clone();
        items.remove(position);
        Some(Self { items })
    }
}

/// Owner of the session's current cart.
///
/// Mutations are synchronous and publish a fresh [`Arc<Cart>`] snapshot.
/// Previously returned snapshots are never modified.
#[derive(Debug, Default)]
pub struct CartStore {
    current: RwLock<Arc<Cart>>,
}

impl CartStore {
    /// A store holding an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current cart.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Cart> {
        Arc::clone(&*self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Add an item, merging into an existing line with the same id.
    pub fn add(&self, item: CartItem) -> (Arc<Cart>, AddOutcome) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let (next, outcome) = current.add(item);
        *current = Arc::new(next);
        (Arc::clone(&*current), outcome)
    }

    /// Remove the line for `id`. Returns whether a line was removed.
    pub fn remove(&self, id: &BookId) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        match current.remove(id) {
            Some(next) => {
                *current = Arc::new(next);
                true
            }
            None => false,
        }
    }

    /// Empty the cart.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Cart::new());
    }

    /// Total of the current cart.
    #[must_use]
    pub fn total(&self) -> Price {
        self.snapshot().total()
    }

    /// Number of lines in the current cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True when the current cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, cents: i64) -> CartItem {
        CartItem::new(id, format!("Book {id}"), Price::from_cents(cents))
    }

    #[test]
    fn test_add_appends_in_order() {
        let store = CartStore::new();
        store.add(item("b1", 1000));
        store.add(item("b2", 500));

        let cart = store.snapshot();
        assert_eq!(cart.product_ids(), vec![BookId::new("b1"), BookId::new("b2")]);
        assert_eq!(store.total(), Price::from_cents(1500));
    }

    #[test]
    fn test_duplicate_add_merges_quantity() {
        let store = CartStore::new();
        let (_, first) = store.add(item("b1", 1000));
        let (cart, second) = store.add(item("b1", 1000));

        assert_eq!(first, AddOutcome::Added);
        assert_eq!(second, AddOutcome::Merged);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(), Price::from_cents(2000));
    }

    #[test]
    fn test_duplicate_add_takes_latest_price() {
        let store = CartStore::new();
        store.add(item("b1", 1000));
        let (cart, _) = store.add(item("b1", 800));

        assert_eq!(
            cart.get(&BookId::new("b1")).map(|line| line.price),
            Some(Price::from_cents(800))
        );
        assert_eq!(cart.total(), Price::from_cents(1600));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = CartStore::new();
        store.add(item("b1", 1000));
        let before = store.snapshot();

        assert!(!store.remove(&BookId::new("missing")));
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = CartStore::new();
        store.add(item("b1", 1000));
        store.add(item("b2", 250));

        assert!(store.remove(&BookId::new("b1")));
        assert_eq!(store.total(), Price::from_cents(250));

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.total(), Price::ZERO);
    }

    #[test]
    fn test_old_snapshot_is_not_mutated() {
        let store = CartStore::new();
        store.add(item("b1", 1000));
        let before = store.snapshot();

        store.add(item("b1", 1000));
        store.add(item("b2", 700));

        assert_eq!(before.len(), 1);
        assert_eq!(before.items()[0].quantity, 1);
        assert_eq!(before.total(), Price::from_cents(1000));
    }

    #[test]
    fn test_zero_quantity_is_clamped() {
        let (cart, _) = Cart::new().add(item("b1", 300).with_quantity(0));
        assert_eq!(cart.unit_count(), 1);
    }

    #[test]
    fn test_total_never_drifts_over_mixed_sequence() {
        let store = CartStore::new();
        let ops: [(&str, i64, bool); 9] = [
            ("a", 100, true),
            ("b", 250, true),
            ("a", 120, true),
            ("c", 999, true),
            ("b", 0, false),
            ("d", 1, true),
            ("a", 0, false),
            ("c", 500, true),
            ("zz", 0, false),
        ];

        for (id, cents, is_add) in ops {
            if is_add {
                store.add(item(id, cents));
            } else {
                store.remove(&BookId::new(id));
            }

            let cart = store.snapshot();
            let expected: Price = cart
                .items()
                .iter()
                .map(|line| line.price * line.quantity)
                .sum();
            assert_eq!(cart.total(), expected);

            let mut ids = cart.product_ids();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), cart.len());
        }

        // c: merged to quantity 2 at the latest price, d: single line
        assert_eq!(store.total(), Price::from_cents(2 * 500 + 1));
    }
}
