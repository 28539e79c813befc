use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::order::{Order, OrderStatus, UserId};

// ============================================================================
// Order Query - composed listing predicate
// ============================================================================

/// Predicate applied to orders when listing. Soft-deleted orders never match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    statuses: Vec<OrderStatus>,
    created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    owner: Option<UserId>,
}

impl OrderQuery {
    pub fn not_deleted() -> Self {
        Self::default()
    }

    /// Restrict to the given statuses. An empty set leaves the query unrestricted.
    pub fn with_statuses(mut self, statuses: &[OrderStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    /// Restrict to a creation window. Ignored unless `start <= end`.
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            self.created_between = Some((start, end));
        }
        self
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        if order.is_deleted() {
            return false;
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&order.status()) {
            return false;
        }

        if let Some((start, end)) = self.created_between {
            let created = order.created_at();
            if created < start || created > end {
                return false;
            }
        }

        match self.owner {
            Some(owner) => order.user_id() == owner,
            None => true,
        }
    }
}

// ============================================================================
// Paging
// ============================================================================

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Listing order shared by every store: creation time, then id
pub fn sort_for_listing(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
}

impl<T> Page<T> {
    /// Cut one page out of an already filtered and sorted list
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();

        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }
}
