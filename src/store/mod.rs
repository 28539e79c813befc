// ============================================================================
// Persistence Collaborators
// ============================================================================
//
// The order core only needs keyed lookup, predicate listing with paging,
// and save. Each call is atomic on its own. Nothing here locks an order
// row across calls, so two writers of the same order race and the later
// save wins.
//
// ============================================================================

mod memory;
mod query;
mod scylla;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::order::{CatalogItem, ItemId, Order, OrderId};

pub use memory::{InMemoryItemStore, InMemoryOrderStore};
pub use query::{sort_for_listing, OrderQuery, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use self::scylla::{ensure_schema, ScyllaItemStore, ScyllaOrderStore};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load an order unless it is soft-deleted
    async fn find_active(&self, id: OrderId) -> Result<Option<Order>>;

    /// Load an order regardless of the deleted flag
    async fn find_any(&self, id: OrderId) -> Result<Option<Order>>;

    async fn find_page(&self, query: &OrderQuery, page: PageRequest) -> Result<Page<Order>>;

    /// Insert or overwrite the whole aggregate
    async fn save(&self, order: &Order) -> Result<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>>;
}
