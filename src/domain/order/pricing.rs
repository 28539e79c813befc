use rust_decimal::Decimal;
use std::sync::Arc;

use crate::store::ItemStore;
use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::{CatalogItem, ItemId};

// ============================================================================
// Price Calculator
// ============================================================================
//
// total = Σ(unit price × quantity) over the current lines, exact decimal.
// Unit prices are read from the item store at recompute time.
//
// ============================================================================

#[derive(Clone)]
pub struct PriceCalculator {
    items: Arc<dyn ItemStore>,
}

impl PriceCalculator {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    /// Recompute and assign the order total. A line whose item has vanished
    /// is a consistency violation, reported as a non caller-supplied reference error.
    /// A total beyond the decimal range is rejected and the order keeps its old total.
    pub async fn recompute(&self, order: &mut Order) -> Result<Decimal, OrderError> {
        let mut total = Decimal::ZERO;

        for line in order.lines() {
            let item = self.lookup(line.item_id, false).await?;
            total = item
                .price
                .checked_mul(Decimal::from(line.quantity))
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| {
                    OrderError::InvalidArgument(format!(
                        "Order total out of range at item {} x {}",
                        line.item_id, line.quantity
                    ))
                })?;
        }

        order.apply_total(total);

        tracing::debug!(
            order_id = %order.id(),
            line_count = order.lines().len(),
            total = %total,
            "Recomputed order total"
        );

        Ok(total)
    }

    /// Confirm that a caller-supplied item reference exists
    pub async fn require_item(&self, item_id: ItemId) -> Result<CatalogItem, OrderError> {
        self.lookup(item_id, true).await
    }

    async fn lookup(&self, item_id: ItemId, caller_supplied: bool) -> Result<CatalogItem, OrderError> {
        self.items
            .find_by_id(item_id)
            .await?
            .ok_or(OrderError::ReferenceError { item_id, caller_supplied })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
