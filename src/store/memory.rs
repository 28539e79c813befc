use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::order::{CatalogItem, ItemId, Order, OrderId};
use super::query::{sort_for_listing, OrderQuery, Page, PageRequest};
use super::{ItemStore, OrderStore};

// ============================================================================
// In-Memory Stores - local runs and tests
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_active(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).filter(|order| !order.is_deleted()).cloned())
    }

    async fn find_any(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_page(&self, query: &OrderQuery, page: PageRequest) -> Result<Page<Order>> {
        let mut matching: Vec<Order> = {
            let orders = self.orders.read().await;
            orders.values().filter(|order| query.matches(order)).cloned().collect()
        };

        sort_for_listing(&mut matching);
        Ok(Page::slice(matching, page))
    }

    async fn save(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryItemStore {
    items: RwLock<HashMap<ItemId, CatalogItem>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: CatalogItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn remove(&self, id: ItemId) -> Option<CatalogItem> {
        self.items.write().await.remove(&id)
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        let items = self.items.read().await;
        Ok(items.values().find(|item| item.name == name).cloned())
    }
}
