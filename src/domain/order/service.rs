use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clients::UserDirectoryClient;
use crate::domain::access::{AccessPolicy, Actor};
use crate::domain::user::UserInfo;
use crate::metrics::Metrics;
use crate::store::{ItemStore, OrderQuery, OrderStore, Page, PageRequest, MAX_PAGE_SIZE};
use super::aggregate::Order;
use super::commands::{CreateOrder, ListOrders, OrderWithUser, OwnerSelector};
use super::errors::OrderError;
use super::pricing::PriceCalculator;
use super::value_objects::{LineId, LineRequest, OrderId, OrderLine, OrderStatus, UserId};

// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orchestrates: Actor → AccessPolicy → Order aggregate → PriceCalculator
//               → OrderStore → UserDirectoryClient (enrichment)
//
// Every operation loads the aggregate, mutates it in memory and saves it once
// at the end. A failure before the save leaves the stored order untouched.
//
// ============================================================================

pub struct OrderLifecycleService {
    orders: Arc<dyn OrderStore>,
    pricing: PriceCalculator,
    users: UserDirectoryClient,
    metrics: Arc<Metrics>,
}

impl OrderLifecycleService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        items: Arc<dyn ItemStore>,
        users: UserDirectoryClient,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            pricing: PriceCalculator::new(items),
            users,
            metrics,
        }
    }

    // ------------------------------------------------------------------------
    // Whole-order operations
    // ------------------------------------------------------------------------

    pub async fn create(&self, command: CreateOrder, actor: &Actor) -> Result<OrderWithUser, OrderError> {
        self.observe("create", async {
            let (owner_id, user) = self.resolve_owner(&command.owner, actor).await?;
            self.validate_lines(&command.lines).await?;

            let mut order = Order::new(owner_id);
            order.replace_lines(&command.lines)?;
            self.pricing.recompute(&mut order).await?;
            self.persist(&order).await?;

            self.metrics.record_order_created();
            info!(
                order_id = %order.id(),
                owner_id,
                actor_id = actor.id,
                total = %order.total_price(),
                "Order created"
            );

            Ok(OrderWithUser { order, user })
        })
        .await
    }

    pub async fn get_by_id(&self, id: OrderId, actor: &Actor) -> Result<OrderWithUser, OrderError> {
        self.observe("get", async {
            let order = self.load_owned(id, actor).await?;
            Ok(self.enrich(order, actor).await)
        })
        .await
    }

    /// Non-admins only ever see their own orders
    pub async fn list(&self, request: ListOrders, actor: &Actor) -> Result<Page<OrderWithUser>, OrderError> {
        self.observe("list", async {
            let mut query = OrderQuery::not_deleted().with_statuses(&request.statuses);
            if let Some((start, end)) = request.created_between {
                query = query.created_between(start, end);
            }
            if !actor.is_admin() {
                AccessPolicy::require_owner_or_admin(actor.id, actor.id, &actor.roles)?;
                query = query.owned_by(actor.id);
            }

            let page = self.orders.find_page(&query, request.page).await?;
            debug!(actor_id = actor.id, total = page.total, "Listed orders");

            // Each row degrades on its own; enrichment never fails the page
            let items = join_all(page.items.into_iter().map(|order| self.enrich(order, actor))).await;

            Ok(Page {
                items,
                total: page.total,
                page: page.page,
                size: page.size,
            })
        })
        .await
    }

    /// Replace the line collection wholesale
    pub async fn update(&self, id: OrderId, lines: Vec<LineRequest>, actor: &Actor) -> Result<OrderWithUser, OrderError> {
        self.observe("update", async {
            let mut order = self.load_owned(id, actor).await?;
            self.validate_lines(&lines).await?;

            order.replace_lines(&lines)?;
            self.pricing.recompute(&mut order).await?;
            self.persist(&order).await?;

            info!(order_id = %id, actor_id = actor.id, total = %order.total_price(), "Order lines replaced");
            Ok(self.enrich(order, actor).await)
        })
        .await
    }

    /// Administrative status change, also driven by payment events under the system actor
    pub async fn change_status(&self, id: OrderId, status: OrderStatus, actor: &Actor) -> Result<OrderWithUser, OrderError> {
        self.observe("change_status", async {
            let mut order = self.load_active(id).await?;
            AccessPolicy::require_admin(&actor.roles)?;

            let previous = order.transition_to(status)?;
            self.persist(&order).await?;

            self.metrics.record_status_transition(previous.as_str(), status.as_str());
            info!(order_id = %id, actor_id = actor.id, from = %previous, to = %status, "Order status changed");

            Ok(self.enrich(order, actor).await)
        })
        .await
    }

    /// Soft delete; the row stays in the store flagged as deleted
    pub async fn delete(&self, id: OrderId, actor: &Actor) -> Result<(), OrderError> {
        self.observe("delete", async {
            let mut order = self.load_owned(id, actor).await?;
            order.mark_deleted();
            self.persist(&order).await?;

            info!(order_id = %id, actor_id = actor.id, "Order soft-deleted");
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Per-line operations
    // ------------------------------------------------------------------------

    pub async fn add_line(&self, id: OrderId, request: LineRequest, actor: &Actor) -> Result<OrderLine, OrderError> {
        self.observe("add_line", async {
            let mut order = self.load_owned(id, actor).await?;
            self.pricing.require_item(request.item_id).await?;

            let line = order.add_line(&request)?;
            self.pricing.recompute(&mut order).await?;
            self.persist(&order).await?;

            info!(order_id = %id, line_id = %line.id, item_id = %line.item_id, "Order line added");
            Ok(line)
        })
        .await
    }

    pub async fn update_line_quantity(
        &self,
        id: OrderId,
        line_id: LineId,
        quantity: u32,
        actor: &Actor,
    ) -> Result<OrderLine, OrderError> {
        self.observe("update_line", async {
            let mut order = self.load_owned(id, actor).await?;

            let line = order.set_line_quantity(line_id, quantity)?;
            self.pricing.recompute(&mut order).await?;
            self.persist(&order).await?;

            info!(order_id = %id, line_id = %line_id, quantity, "Order line quantity changed");
            Ok(line)
        })
        .await
    }

    pub async fn remove_line(&self, id: OrderId, line_id: LineId, actor: &Actor) -> Result<(), OrderError> {
        self.observe("remove_line", async {
            let mut order = self.load_owned(id, actor).await?;

            order.remove_line(line_id)?;
            self.pricing.recompute(&mut order).await?;
            self.persist(&order).await?;

            info!(order_id = %id, line_id = %line_id, "Order line removed");
            Ok(())
        })
        .await
    }

    pub async fn get_line(&self, id: OrderId, line_id: LineId, actor: &Actor) -> Result<OrderLine, OrderError> {
        self.observe("get_line", async {
            let order = self.load_owned(id, actor).await?;
            order.line(line_id).cloned().ok_or_else(OrderError::line_not_found)
        })
        .await
    }

    /// Admin view of every line across live orders, in listing order
    pub async fn list_lines(&self, page: PageRequest, actor: &Actor) -> Result<Page<OrderLine>, OrderError> {
        self.observe("list_lines", async {
            AccessPolicy::require_admin(&actor.roles)?;

            let query = OrderQuery::not_deleted();
            let mut lines = Vec::new();
            let mut batch = 0;
            loop {
                let orders = self
                    .orders
                    .find_page(&query, PageRequest::new(batch, MAX_PAGE_SIZE))
                    .await?;
                let fetched = orders.items.len();
                lines.extend(orders.items.into_iter().flat_map(|order| order.lines().to_vec()));

                if fetched < MAX_PAGE_SIZE {
                    break;
                }
                batch += 1;
            }

            debug!(actor_id = actor.id, line_count = lines.len(), "Listed order lines");
            Ok(Page::slice(lines, page))
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn resolve_owner(&self, owner: &OwnerSelector, actor: &Actor) -> Result<(UserId, UserInfo), OrderError> {
        match owner {
            OwnerSelector::Actor => {
                AccessPolicy::require_owner_or_admin(actor.id, actor.id, &actor.roles)?;
                let user = self.users.lookup_by_id(actor.id, actor).await;
                usable_owner(user)
            }
            OwnerSelector::Email(email) => {
                let user = self.users.lookup_by_email(email, actor).await;
                let (owner_id, user) = usable_owner(user)?;
                AccessPolicy::require_owner_or_admin(owner_id, actor.id, &actor.roles)?;
                Ok((owner_id, user))
            }
        }
    }

    /// Every requested line must name an existing item with quantity >= 1
    async fn validate_lines(&self, lines: &[LineRequest]) -> Result<(), OrderError> {
        for line in lines {
            if line.quantity < 1 {
                return Err(OrderError::InvalidArgument(format!(
                    "Quantity must be >= 1, got {}",
                    line.quantity
                )));
            }
            self.pricing.require_item(line.item_id).await?;
        }
        Ok(())
    }

    async fn load_active(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .find_active(id)
            .await?
            .ok_or_else(OrderError::order_not_found)
    }

    async fn load_owned(&self, id: OrderId, actor: &Actor) -> Result<Order, OrderError> {
        let order = self.load_active(id).await?;
        AccessPolicy::require_owner_or_admin(order.user_id(), actor.id, &actor.roles)?;
        Ok(order)
    }

    /// Refuses to write an order whose total is stale relative to its lines
    async fn persist(&self, order: &Order) -> Result<(), OrderError> {
        if order.needs_repricing() {
            return Err(OrderError::Store(anyhow::anyhow!(
                "Order {} has unpriced line changes",
                order.id()
            )));
        }
        self.orders.save(order).await?;
        Ok(())
    }

    async fn enrich(&self, order: Order, actor: &Actor) -> OrderWithUser {
        let user = self.users.lookup_by_id(order.user_id(), actor).await;
        OrderWithUser { order, user }
    }

    async fn observe<T, F>(&self, operation: &'static str, work: F) -> Result<T, OrderError>
    where
        F: Future<Output = Result<T, OrderError>>,
    {
        let started = Instant::now();
        let result = work.await;

        let failure = result.as_ref().err().map(|e| e.kind());
        self.metrics
            .record_operation(operation, started.elapsed().as_secs_f64(), failure);

        if let Err(e) = &result {
            match e {
                OrderError::Store(_) => error!(operation, error = %e, "Order operation failed"),
                OrderError::ReferenceError { caller_supplied: false, .. } => {
                    error!(operation, error = %e, "Order references a missing item")
                }
                _ => warn!(operation, error = %e, "Order operation rejected"),
            }
        }

        result
    }
}

/// A placeholder or inactive user can never own a new order
fn usable_owner(user: UserInfo) -> Result<(UserId, UserInfo), OrderError> {
    match user.id {
        Some(id) if user.is_usable_owner() => Ok((id, user)),
        _ => Err(OrderError::InvalidState(format!(
            "User {} is unknown or inactive",
            user.email
        ))),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use crate::domain::order::{CatalogItem, ItemId};
    use crate::domain::user::PLACEHOLDER_NAME;
    use crate::store::PageRequest;
    use crate::testing::Fixture;

    fn create(lines: &[(ItemId, u32)]) -> CreateOrder {
        CreateOrder {
            owner: OwnerSelector::Actor,
            lines: lines.iter().map(|(item, qty)| LineRequest::new(*item, *qty)).collect(),
        }
    }

    async fn order_for(fx: &Fixture, actor: &Actor) -> Order {
        let pen = fx.item("pen", 10).await;
        fx.service.create(create(&[(pen, 1)]), actor).await.unwrap().order
    }

    #[tokio::test]
    async fn test_create_prices_lines_and_starts_new() {
        let fx = Fixture::new();
        let actor = fx.user(1).await;
        let a = fx.item("A", 10).await;
        let b = fx.item("B", 5).await;

        let created = fx.service.create(create(&[(a, 1), (b, 3)]), &actor).await.unwrap();

        assert_eq!(created.order.total_price(), Decimal::new(25, 0));
        assert_eq!(created.order.status(), OrderStatus::New);
        assert!(!created.order.is_deleted());
        assert_eq!(created.order.user_id(), 1);
        assert_eq!(created.user.id, Some(1));
        assert_eq!(fx.orders.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_or_unreachable_owner() {
        let fx = Fixture::new();
        let pen = fx.item("pen", 10).await;

        fx.directory.add_user(2, "idle@mail.com", false).await;
        let err = fx.service.create(create(&[(pen, 1)]), &Actor::user(2)).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));

        let err = fx.service.create(create(&[(pen, 1)]), &Actor::user(3)).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));

        fx.directory.add_user(4, "d@mail.com", true).await;
        fx.directory.set_available(false);
        let err = fx.service.create(create(&[(pen, 1)]), &Actor::user(4)).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));

        assert_eq!(fx.orders.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_by_email_requires_owner_or_admin() {
        let fx = Fixture::new();
        let pen = fx.item("pen", 10).await;
        fx.directory.add_user(5, "owner@mail.com", true).await;
        let command = CreateOrder {
            owner: OwnerSelector::Email("owner@mail.com".to_string()),
            lines: vec![LineRequest::new(pen, 2)],
        };

        let err = fx.service.create(command.clone(), &fx.user(6).await).await.unwrap_err();
        assert!(matches!(err, OrderError::AccessDenied(_)));

        let created = fx.service.create(command, &Actor::admin(99)).await.unwrap();
        assert_eq!(created.order.user_id(), 5);
        assert_eq!(created.order.total_price(), Decimal::new(20, 0));
    }

    #[tokio::test]
    async fn test_create_validates_requested_lines() {
        let fx = Fixture::new();
        let actor = fx.user(1).await;
        let pen = fx.item("pen", 10).await;

        let err = fx.service.create(create(&[(pen, 0)]), &actor).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidArgument(_)));

        let missing = uuid::Uuid::new_v4();
        let err = fx.service.create(create(&[(missing, 1)]), &actor).await.unwrap_err();
        assert!(matches!(err, OrderError::ReferenceError { caller_supplied: true, .. }));

        assert_eq!(fx.orders.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_total_out_of_range() {
        let fx = Fixture::new();
        let actor = fx.user(1).await;
        let gold = CatalogItem {
            id: uuid::Uuid::new_v4(),
            name: "gold".to_string(),
            price: Decimal::MAX,
        };
        fx.items.insert(gold.clone()).await;

        let err = fx.service.create(create(&[(gold.id, 3)]), &actor).await.unwrap_err();

        assert!(matches!(err, OrderError::InvalidArgument(_)));
        assert_eq!(fx.orders.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_without_roles_is_denied() {
        let fx = Fixture::new();
        let pen = fx.item("pen", 10).await;
        fx.directory.add_user(1, "a@mail.com", true).await;
        let actor = Actor::new(1, crate::domain::access::Roles::empty());

        let err = fx.service.create(create(&[(pen, 1)]), &actor).await.unwrap_err();
        assert!(matches!(err, OrderError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_strangers_are_denied_on_every_order_operation() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let stranger = fx.user(2).await;
        let order = order_for(&fx, &owner).await;
        let line_id = order.lines()[0].id;

        let results = vec![
            fx.service.get_by_id(order.id(), &stranger).await.map(|_| ()),
            fx.service.update(order.id(), vec![], &stranger).await.map(|_| ()),
            fx.service.delete(order.id(), &stranger).await,
            fx.service.get_line(order.id(), line_id, &stranger).await.map(|_| ()),
            fx.service.remove_line(order.id(), line_id, &stranger).await,
        ];
        for result in results {
            assert!(matches!(result, Err(OrderError::AccessDenied(_))));
        }

        let admin = Actor::admin(50);
        assert!(fx.service.get_by_id(order.id(), &admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_degrades_when_directory_is_down() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;

        fx.directory.set_available(false);
        let found = fx.service.get_by_id(order.id(), &owner).await.unwrap();

        assert_eq!(found.order.id(), order.id());
        assert!(!found.user.active);
        assert_eq!(found.user.name, PLACEHOLDER_NAME);
    }

    #[tokio::test]
    async fn test_status_scenario() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;
        let admin = Actor::admin(50);

        let moved = fx.service.change_status(order.id(), OrderStatus::Processing, &admin).await.unwrap();
        assert_eq!(moved.order.status(), OrderStatus::Processing);

        let err = fx.service.change_status(order.id(), OrderStatus::Cancelled, &admin).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition { from: OrderStatus::Processing, to: OrderStatus::Cancelled }
        ));

        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_change_status_requires_admin() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;

        let err = fx.service.change_status(order.id(), OrderStatus::Processing, &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::AccessDenied(_)));

        assert!(fx.service.change_status(order.id(), OrderStatus::Cancelled, &Actor::system()).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_but_keeps_row() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;

        fx.service.delete(order.id(), &owner).await.unwrap();

        let err = fx.service.get_by_id(order.id(), &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));

        let page = fx.service.list(ListOrders::default(), &owner).await.unwrap();
        assert_eq!(page.total, 0);

        let row = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert!(row.is_deleted());

        let err = fx.service.delete(order.id(), &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_scopes_to_owner_unless_admin() {
        let fx = Fixture::new();
        let ann = fx.user(1).await;
        let bob = fx.user(2).await;
        order_for(&fx, &ann).await;
        order_for(&fx, &ann).await;
        order_for(&fx, &bob).await;

        let mine = fx.service.list(ListOrders::default(), &ann).await.unwrap();
        assert_eq!(mine.total, 2);
        assert!(mine.items.iter().all(|row| row.order.user_id() == 1));

        let all = fx.service.list(ListOrders::default(), &Actor::admin(50)).await.unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_window_and_page() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let first = order_for(&fx, &owner).await;
        order_for(&fx, &owner).await;
        order_for(&fx, &owner).await;
        fx.service
            .change_status(first.id(), OrderStatus::Cancelled, &Actor::admin(50))
            .await
            .unwrap();

        let cancelled = ListOrders {
            statuses: vec![OrderStatus::Cancelled],
            ..Default::default()
        };
        let page = fx.service.list(cancelled, &owner).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].order.id(), first.id());

        let now = Utc::now();
        let future_window = ListOrders {
            created_between: Some((now + Duration::hours(1), now + Duration::hours(2))),
            ..Default::default()
        };
        assert_eq!(fx.service.list(future_window, &owner).await.unwrap().total, 0);

        // start after end: window ignored
        let inverted = ListOrders {
            created_between: Some((now + Duration::hours(2), now - Duration::hours(2))),
            ..Default::default()
        };
        assert_eq!(fx.service.list(inverted, &owner).await.unwrap().total, 3);

        let second_page = ListOrders {
            page: PageRequest::new(1, 2),
            ..Default::default()
        };
        let page = fx.service.list(second_page, &owner).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_degrades_rows_instead_of_failing() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        order_for(&fx, &owner).await;
        order_for(&fx, &owner).await;

        fx.directory.set_available(false);
        let page = fx.service.list(ListOrders::default(), &owner).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|row| !row.user.active));
    }

    #[tokio::test]
    async fn test_update_replaces_lines_and_reprices() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;
        let five = fx.item("five", 5).await;
        let three = fx.item("three", 3).await;

        let updated = fx
            .service
            .update(order.id(), vec![LineRequest::new(five, 2), LineRequest::new(three, 4)], &owner)
            .await
            .unwrap();

        assert_eq!(updated.order.lines().len(), 2);
        assert!(updated.order.lines().iter().all(|l| l.item_id != order.lines()[0].item_id));
        assert_eq!(updated.order.total_price(), Decimal::new(22, 0));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_order_untouched() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;

        let bogus = vec![LineRequest::new(uuid::Uuid::new_v4(), 1)];
        assert!(fx.service.update(order.id(), bogus, &owner).await.is_err());

        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.lines(), order.lines());
        assert_eq!(stored.total_price(), order.total_price());
    }

    #[tokio::test]
    async fn test_line_operations_keep_total_consistent() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;
        let first_line = order.lines()[0].id;
        let cup = fx.item("cup", 4).await;

        let added = fx.service.add_line(order.id(), LineRequest::new(cup, 2), &owner).await.unwrap();
        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.total_price(), Decimal::new(18, 0));

        fx.service.update_line_quantity(order.id(), added.id, 5, &owner).await.unwrap();
        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.total_price(), Decimal::new(30, 0));

        fx.service.remove_line(order.id(), first_line, &owner).await.unwrap();
        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.total_price(), Decimal::new(20, 0));

        let line = fx.service.get_line(order.id(), added.id, &owner).await.unwrap();
        assert_eq!(line.quantity, 5);

        let err = fx.service.get_line(order.id(), first_line, &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_line_operations_validate_input() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;
        let line_id = order.lines()[0].id;

        let err = fx.service.update_line_quantity(order.id(), line_id, 0, &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidArgument(_)));

        let err = fx
            .service
            .add_line(order.id(), LineRequest::new(uuid::Uuid::new_v4(), 1), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ReferenceError { caller_supplied: true, .. }));

        let err = fx.service.remove_line(order.id(), uuid::Uuid::new_v4(), &owner).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_lines_spans_owners_and_skips_deleted() {
        let fx = Fixture::new();
        let ann = fx.user(1).await;
        let bob = fx.user(2).await;
        let pen = fx.item("pen", 10).await;
        let cup = fx.item("cup", 4).await;

        let first = fx.service.create(create(&[(pen, 1), (cup, 2)]), &ann).await.unwrap().order;
        let second = fx.service.create(create(&[(cup, 3)]), &bob).await.unwrap().order;
        let gone = fx.service.create(create(&[(pen, 9)]), &bob).await.unwrap().order;
        fx.service.delete(gone.id(), &bob).await.unwrap();

        let page = fx.service.list_lines(PageRequest::default(), &Actor::admin(9)).await.unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.items.iter().map(|line| line.id).collect();
        let expected: Vec<_> = first.lines().iter().chain(second.lines()).map(|line| line.id).collect();
        assert_eq!(ids, expected);

        let second_page = fx.service.list_lines(PageRequest::new(1, 2), &Actor::admin(9)).await.unwrap();
        assert_eq!(second_page.items.len(), 1);
        assert_eq!(second_page.items[0].id, second.lines()[0].id);
    }

    #[tokio::test]
    async fn test_list_lines_reads_past_one_store_page() {
        let fx = Fixture::new();
        let pen = fx.item("pen", 1).await;
        for _ in 0..MAX_PAGE_SIZE + 5 {
            let mut order = Order::new(1);
            order.add_line(&LineRequest::new(pen, 1)).unwrap();
            fx.service.pricing.recompute(&mut order).await.unwrap();
            fx.orders.save(&order).await.unwrap();
        }

        let page = fx.service.list_lines(PageRequest::new(0, 1), &Actor::admin(9)).await.unwrap();

        assert_eq!(page.total, MAX_PAGE_SIZE + 5);
    }

    #[tokio::test]
    async fn test_list_lines_is_admin_only() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        order_for(&fx, &owner).await;

        let err = fx.service.list_lines(PageRequest::default(), &owner).await.unwrap_err();

        assert!(matches!(err, OrderError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_vanished_item_is_a_consistency_error() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        let order = order_for(&fx, &owner).await;
        fx.items.remove(order.lines()[0].item_id).await;
        let cup = fx.item("cup", 4).await;

        let err = fx.service.add_line(order.id(), LineRequest::new(cup, 1), &owner).await.unwrap_err();

        assert!(matches!(err, OrderError::ReferenceError { caller_supplied: false, .. }));
        let stored = fx.orders.find_any(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_created_orders_are_counted() {
        let fx = Fixture::new();
        let owner = fx.user(1).await;
        order_for(&fx, &owner).await;
        order_for(&fx, &owner).await;

        assert_eq!(fx.metrics.orders_created.get(), 2);
    }
}
