use super::value_objects::{ItemId, OrderStatus};
use crate::domain::access::{AccessDenied, UnknownRole};

// ============================================================================
// Order Lifecycle Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Item not found: {item_id}")]
    ReferenceError { item_id: ItemId, caller_supplied: bool },

    #[error("Storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl OrderError {
    pub fn order_not_found() -> Self {
        OrderError::NotFound("Order".to_string())
    }

    pub fn line_not_found() -> Self {
        OrderError::NotFound("Order line".to_string())
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::NotFound(_) => "not_found",
            OrderError::AccessDenied(_) => "access_denied",
            OrderError::InvalidState(_) => "invalid_state",
            OrderError::InvalidArgument(_) => "invalid_argument",
            OrderError::InvalidTransition { .. } => "invalid_transition",
            OrderError::ReferenceError { .. } => "reference_error",
            OrderError::Store(_) => "store",
        }
    }
}

impl From<AccessDenied> for OrderError {
    fn from(err: AccessDenied) -> Self {
        OrderError::AccessDenied(err.to_string())
    }
}

impl From<UnknownRole> for OrderError {
    fn from(err: UnknownRole) -> Self {
        OrderError::InvalidArgument(err.to_string())
    }
}
