use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::errors::OrderError;
use super::status_machine::OrderStatusMachine;
use super::value_objects::{LineId, LineRequest, OrderId, OrderLine, OrderStatus, UserId};

// ============================================================================
// Order Aggregate - Order plus its exclusively owned lines
// ============================================================================
//
// Invariants held here:
// - lines always have quantity >= 1
// - status only moves along OrderStatusMachine
// - deleted is one-way
//
// The total is owned by PriceCalculator. Every line mutation flags the
// aggregate for repricing and the lifecycle service refuses to persist a
// flagged aggregate.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) user_id: UserId,
    pub(crate) status: OrderStatus,
    pub(crate) total_price: Decimal,
    pub(crate) deleted: bool,
    pub(crate) lines: Vec<OrderLine>,

    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,

    #[serde(skip)]
    pub(crate) repricing_needed: bool,
}

impl Order {
    /// Fresh order in the initial status with no lines
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            status: OrderStatusMachine::INITIAL,
            total_price: Decimal::ZERO,
            deleted: false,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
            repricing_needed: false,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, line_id: LineId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn needs_repricing(&self) -> bool {
        self.repricing_needed
    }

    // ------------------------------------------------------------------------
    // Line mutations
    // ------------------------------------------------------------------------

    /// Discard every current line and attach the requested ones
    pub fn replace_lines(&mut self, requests: &[LineRequest]) -> Result<(), OrderError> {
        for request in requests {
            validate_quantity(request.quantity)?;
        }

        self.lines = requests
            .iter()
            .map(|request| self.build_line(request))
            .collect();
        self.touch_lines();
        Ok(())
    }

    pub fn add_line(&mut self, request: &LineRequest) -> Result<OrderLine, OrderError> {
        validate_quantity(request.quantity)?;

        let line = self.build_line(request);
        self.lines.push(line.clone());
        self.touch_lines();
        Ok(line)
    }

    pub fn set_line_quantity(&mut self, line_id: LineId, quantity: u32) -> Result<OrderLine, OrderError> {
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or_else(OrderError::line_not_found)?;
        line.quantity = quantity;
        let updated = line.clone();

        self.touch_lines();
        Ok(updated)
    }

    pub fn remove_line(&mut self, line_id: LineId) -> Result<OrderLine, OrderError> {
        let position = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or_else(OrderError::line_not_found)?;

        let removed = self.lines.remove(position);
        self.touch_lines();
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Status and deletion
    // ------------------------------------------------------------------------

    /// Move to `to` if the status machine allows it. Returns the previous status.
    pub fn transition_to(&mut self, to: OrderStatus) -> Result<OrderStatus, OrderError> {
        let from = self.status;
        if !OrderStatusMachine::can_transition(from, to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        self.status = to;
        self.updated_at = Utc::now();
        Ok(from)
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.updated_at = Utc::now();
    }

    pub(crate) fn apply_total(&mut self, total: Decimal) {
        self.total_price = total;
        self.repricing_needed = false;
    }

    fn build_line(&self, request: &LineRequest) -> OrderLine {
        OrderLine {
            id: Uuid::new_v4(),
            order_id: self.id,
            item_id: request.item_id,
            quantity: request.quantity,
        }
    }

    fn touch_lines(&mut self) {
        self.repricing_needed = true;
        self.updated_at = Utc::now();
    }
}

fn validate_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity < 1 {
        return Err(OrderError::InvalidArgument(format!(
            "Quantity must be >= 1, got {quantity}"
        )));
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
