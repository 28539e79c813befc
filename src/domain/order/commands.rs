use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::user::UserInfo;
use crate::store::PageRequest;
use super::aggregate::Order;
use super::value_objects::{LineRequest, OrderStatus};

// ============================================================================
// Order Commands and Results
// ============================================================================

/// How the owner of a new order is found
#[derive(Debug, Clone, PartialEq)]
pub enum OwnerSelector {
    /// The acting user owns the order
    Actor,
    /// Look the owner up by email
    Email(String),
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub owner: OwnerSelector,
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub statuses: Vec<OrderStatus>,
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub page: PageRequest,
}

/// An order enriched with its owner as reported by the user directory
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithUser {
    pub order: Order,
    pub user: UserInfo,
}
