use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use rust_decimal::Decimal;
use scylla::client::session::Session;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{CatalogItem, ItemId, Order, OrderId, OrderLine, OrderStatus};
use super::query::{sort_for_listing, OrderQuery, Page, PageRequest};
use super::{ItemStore, OrderStore};

// ============================================================================
// ScyllaDB Stores
// ============================================================================
//
// orders: one row per aggregate. Lines live in a JSON text column and money
// is stored as decimal text so no precision is lost on the way through CQL.
//
// Listing streams the whole table and applies OrderQuery in memory.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, user_id, status, total_price, deleted, lines, created_at, updated_at";

type OrderRow = (Uuid, i64, String, String, bool, String, DateTime<Utc>, DateTime<Utc>);

/// Create keyspace and tables if missing, then switch the session to the keyspace
pub async fn ensure_schema(session: &Session, keyspace: &str) -> Result<()> {
    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
            ),
            &[],
        )
        .await
        .with_context(|| format!("Failed to create keyspace {keyspace}"))?;

    session.use_keyspace(keyspace, false).await?;

    session
        .query_unpaged(
            "CREATE TABLE IF NOT EXISTS orders (
                id uuid PRIMARY KEY,
                user_id bigint,
                status text,
                total_price text,
                deleted boolean,
                lines text,
                created_at timestamp,
                updated_at timestamp
            )",
            &[],
        )
        .await
        .context("Failed to create orders table")?;

    session
        .query_unpaged(
            "CREATE TABLE IF NOT EXISTS items (
                id uuid PRIMARY KEY,
                name text,
                price text
            )",
            &[],
        )
        .await
        .context("Failed to create items table")?;

    session
        .query_unpaged("CREATE INDEX IF NOT EXISTS ON items (name)", &[])
        .await
        .context("Failed to create items name index")?;

    tracing::info!(keyspace = %keyspace, "Schema ready");
    Ok(())
}

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn find_active(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.find_any(id).await?.filter(|order| !order.is_deleted()))
    }

    async fn find_any(&self, id: OrderId) -> Result<Option<Order>> {
        let result = self
            .session
            .query_unpaged(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"), (id,))
            .await?;

        let rows_result = result.into_rows_result()?;
        match rows_result.maybe_first_row::<OrderRow>()? {
            Some(row) => Ok(Some(order_from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn find_page(&self, query: &OrderQuery, page: PageRequest) -> Result<Page<Order>> {
        let mut rows = self
            .session
            .query_iter(format!("SELECT {ORDER_COLUMNS} FROM orders"), &[])
            .await?
            .rows_stream::<OrderRow>()?;

        let mut matching = Vec::new();
        while let Some(row) = rows.try_next().await? {
            let order = order_from_row(row)?;
            if query.matches(&order) {
                matching.push(order);
            }
        }

        sort_for_listing(&mut matching);
        Ok(Page::slice(matching, page))
    }

    async fn save(&self, order: &Order) -> Result<()> {
        let lines = serde_json::to_string(order.lines())?;

        self.session
            .query_unpaged(
                format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"),
                (
                    order.id(),
                    order.user_id(),
                    order.status().as_str(),
                    order.total_price().to_string(),
                    order.is_deleted(),
                    lines,
                    order.created_at(),
                    order.updated_at(),
                ),
            )
            .await?;

        tracing::debug!(order_id = %order.id(), status = %order.status(), "Saved order row");
        Ok(())
    }
}

fn order_from_row(row: OrderRow) -> Result<Order> {
    let (id, user_id, status, total_price, deleted, lines, created_at, updated_at) = row;

    let lines: Vec<OrderLine> =
        serde_json::from_str(&lines).with_context(|| format!("Corrupt lines column for order {id}"))?;

    Ok(Order {
        id,
        user_id,
        status: OrderStatus::from_str(&status)?,
        total_price: Decimal::from_str(&total_price)
            .with_context(|| format!("Corrupt total_price for order {id}"))?,
        deleted,
        lines,
        created_at,
        updated_at,
        repricing_needed: false,
    })
}

pub struct ScyllaItemStore {
    session: Arc<Session>,
}

impl ScyllaItemStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    async fn find_one(&self, cql: &str, key: impl scylla::serialize::row::SerializeRow) -> Result<Option<CatalogItem>> {
        let result = self.session.query_unpaged(cql, key).await?;
        let rows_result = result.into_rows_result()?;

        match rows_result.maybe_first_row::<(Uuid, String, String)>()? {
            Some((id, name, price)) => Ok(Some(CatalogItem {
                id,
                name,
                price: Decimal::from_str(&price).with_context(|| format!("Corrupt price for item {id}"))?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ItemStore for ScyllaItemStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        self.find_one("SELECT id, name, price FROM items WHERE id = ?", (id,)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        self.find_one("SELECT id, name, price FROM items WHERE name = ?", (name,)).await
    }
}
