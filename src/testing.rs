//! Fixtures shared by unit tests across modules.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::clients::{DirectoryError, UserDirectory, UserDirectoryClient};
use crate::domain::access::Actor;
use crate::domain::order::{CatalogItem, ItemId, OrderLifecycleService, UserId};
use crate::domain::user::UserInfo;
use crate::metrics::Metrics;
use crate::store::{InMemoryItemStore, InMemoryOrderStore};
use crate::utils::CircuitBreakerConfig;

/// Scripted user directory: answers from a map, or fails while unavailable
#[derive(Default)]
pub struct StubDirectory {
    users: RwLock<HashMap<UserId, UserInfo>>,
    unavailable: AtomicBool,
    calls: AtomicU32,
    last_actor: Mutex<Option<Actor>>,
}

impl StubDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, id: UserId, email: &str, active: bool) {
        let user = UserInfo {
            id: Some(id),
            name: format!("user-{id}"),
            surname: "Tester".to_string(),
            email: email.to_string(),
            birth_date: None,
            active,
        };
        self.users.write().await.insert(id, user);
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn last_actor(&self) -> Option<Actor> {
        self.last_actor.lock().await.clone()
    }

    async fn answer(&self, actor: &Actor, find: impl FnOnce(&HashMap<UserId, UserInfo>) -> Option<UserInfo>) -> Result<UserInfo, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_actor.lock().await = Some(actor.clone());

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Status { status: 503, body: "unavailable".to_string() });
        }

        let users = self.users.read().await;
        find(&users).ok_or(DirectoryError::Status { status: 404, body: "User not found".to_string() })
    }
}

#[async_trait]
impl UserDirectory for StubDirectory {
    async fn fetch_by_id(&self, user_id: UserId, actor: &Actor) -> Result<UserInfo, DirectoryError> {
        self.answer(actor, |users| users.get(&user_id).cloned()).await
    }

    async fn fetch_by_email(&self, email: &str, actor: &Actor) -> Result<UserInfo, DirectoryError> {
        self.answer(actor, |users| users.values().find(|u| u.email == email).cloned()).await
    }
}

/// Service wired to in-memory stores and a stub directory
pub struct Fixture {
    pub orders: Arc<InMemoryOrderStore>,
    pub items: Arc<InMemoryItemStore>,
    pub directory: Arc<StubDirectory>,
    pub metrics: Arc<Metrics>,
    pub service: Arc<OrderLifecycleService>,
}

impl Fixture {
    pub fn new() -> Self {
        let orders = Arc::new(InMemoryOrderStore::new());
        let items = Arc::new(InMemoryItemStore::new());
        let directory = Arc::new(StubDirectory::new());
        let metrics = Arc::new(Metrics::new().expect("metrics registry"));

        let users = UserDirectoryClient::new(directory.clone(), CircuitBreakerConfig::default(), metrics.clone());
        let service = Arc::new(OrderLifecycleService::new(
            orders.clone(),
            items.clone(),
            users,
            metrics.clone(),
        ));

        Self {
            orders,
            items,
            directory,
            metrics,
            service,
        }
    }

    pub async fn item(&self, name: &str, price: i64) -> ItemId {
        let item = CatalogItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: Decimal::new(price, 0),
        };
        let id = item.id;
        self.items.insert(item).await;
        id
    }

    pub async fn user(&self, id: UserId) -> Actor {
        self.directory.add_user(id, &format!("user{id}@mail.com"), true).await;
        Actor::user(id)
    }
}
