use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::access::Actor;
use crate::domain::order::{OrderError, OrderId, OrderLifecycleService, OrderStatus};
use crate::metrics::Metrics;

// ============================================================================
// Payment Events
// ============================================================================
//
// SUCCESS → COMPLETED, FAILED → CANCELLED, NEW → nothing.
// Transitions run as the system actor. Failures are logged and dropped;
// nothing here retries or re-queues an event.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Success,
    Failed,
    New,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Success => "SUCCESS",
            PaymentOutcome::Failed => "FAILED",
            PaymentOutcome::New => "NEW",
        }
    }

    /// Status the order should move to, if any
    pub fn target_status(&self) -> Option<OrderStatus> {
        match self {
            PaymentOutcome::Success => Some(OrderStatus::Completed),
            PaymentOutcome::Failed => Some(OrderStatus::Cancelled),
            PaymentOutcome::New => None,
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub order_id: OrderId,
    #[serde(rename = "status")]
    pub outcome: PaymentOutcome,
}

impl PaymentEvent {
    pub fn from_json(payload: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// What happened to one event; for logs and metrics only
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    Applied(OrderStatus),
    Ignored,
    Dropped(String),
}

impl HandleOutcome {
    fn label(&self) -> &'static str {
        match self {
            HandleOutcome::Applied(_) => "applied",
            HandleOutcome::Ignored => "ignored",
            HandleOutcome::Dropped(_) => "dropped",
        }
    }
}

pub struct PaymentEventHandler {
    orders: Arc<OrderLifecycleService>,
    metrics: Arc<Metrics>,
    actor: Actor,
}

impl PaymentEventHandler {
    pub fn new(orders: Arc<OrderLifecycleService>, metrics: Arc<Metrics>) -> Self {
        Self {
            orders,
            metrics,
            actor: Actor::system(),
        }
    }

    pub async fn handle(&self, event: &PaymentEvent) -> HandleOutcome {
        let outcome = match event.outcome.target_status() {
            None => {
                tracing::debug!(order_id = %event.order_id, "Payment still pending, nothing to do");
                HandleOutcome::Ignored
            }
            Some(status) => match self.orders.change_status(event.order_id, status, &self.actor).await {
                Ok(_) => {
                    tracing::info!(
                        order_id = %event.order_id,
                        payment = %event.outcome,
                        status = %status,
                        "Payment outcome applied"
                    );
                    HandleOutcome::Applied(status)
                }
                Err(e) => {
                    log_dropped(event, &e);
                    HandleOutcome::Dropped(e.to_string())
                }
            },
        };

        self.metrics
            .record_payment_event(event.outcome.as_str(), outcome.label());
        outcome
    }
}

fn log_dropped(event: &PaymentEvent, error: &OrderError) {
    match error {
        OrderError::NotFound(_) | OrderError::InvalidTransition { .. } => tracing::warn!(
            order_id = %event.order_id,
            payment = %event.outcome,
            error = %error,
            "Payment event dropped"
        ),
        _ => tracing::error!(
            order_id = %event.order_id,
            payment = %event.outcome,
            error = %error,
            "Payment event dropped"
        ),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
