use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::access::Actor;
use crate::domain::order::{
    CreateOrder, LineId, LineRequest, ListOrders, OrderError, OrderId, OrderLifecycleService,
    OrderStatus, OwnerSelector,
};
use crate::store::{PageRequest, DEFAULT_PAGE_SIZE};

type Service = web::Data<Arc<OrderLifecycleService>>;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    #[serde(default)]
    email: Option<String>,
    lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
struct UpdateOrderBody {
    lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: u32,
}

/// `?statuses=NEW,PROCESSING&start=..&end=..&page=0&size=20`
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    statuses: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    page: Option<usize>,
    size: Option<usize>,
}

impl ListParams {
    fn into_command(self) -> Result<ListOrders, OrderError> {
        let statuses = self
            .statuses
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(OrderStatus::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        let created_between = match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        };

        Ok(ListOrders {
            statuses,
            created_between,
            page: PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE)),
        })
    }
}

/// `?page=0&size=20`
#[derive(Debug, Default, Deserialize)]
struct PageParams {
    page: Option<usize>,
    size: Option<usize>,
}

impl PageParams {
    fn into_request(self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Malformed bodies, query strings and path segments answer with the same
/// JSON error body as every other rejected request
fn rejected(message: String) -> actix_web::Error {
    OrderError::InvalidArgument(message).into()
}

pub fn configure_order_routes(service: Arc<OrderLifecycleService>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(service))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| rejected(err.to_string())))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| rejected(err.to_string())))
            .app_data(web::PathConfig::default().error_handler(|err, _req| rejected(err.to_string())))
            .service(
                web::scope("/orders")
                    .route("", web::get().to(list_orders))
                    .route("", web::post().to(create_order))
                    .route("/lines", web::get().to(list_lines))
                    .route("/{id}", web::get().to(get_order))
                    .route("/{id}", web::put().to(update_order))
                    .route("/{id}", web::delete().to(delete_order))
                    .route("/{id}/status", web::patch().to(change_status))
                    .route("/{id}/lines", web::post().to(add_line))
                    .route("/{id}/lines/{line_id}", web::get().to(get_line))
                    .route("/{id}/lines/{line_id}", web::put().to(update_line))
                    .route("/{id}/lines/{line_id}", web::delete().to(remove_line)),
            );
    }
}

async fn list_orders(service: Service, params: web::Query<ListParams>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let command = params.into_inner().into_command()?;
    let page = service.list(command, &actor).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn list_lines(service: Service, params: web::Query<PageParams>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let page = service.list_lines(params.into_inner().into_request(), &actor).await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn create_order(service: Service, body: web::Json<CreateOrderBody>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let body = body.into_inner();
    let owner = match body.email {
        Some(email) => OwnerSelector::Email(email),
        None => OwnerSelector::Actor,
    };

    let created = service
        .create(CreateOrder { owner, lines: body.lines }, &actor)
        .await?;
    Ok(HttpResponse::Created().json(created))
}

async fn get_order(service: Service, id: web::Path<OrderId>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let found = service.get_by_id(id.into_inner(), &actor).await?;
    Ok(HttpResponse::Ok().json(found))
}

async fn update_order(
    service: Service,
    id: web::Path<OrderId>,
    body: web::Json<UpdateOrderBody>,
    actor: Actor,
) -> Result<HttpResponse, OrderError> {
    let updated = service
        .update(id.into_inner(), body.into_inner().lines, &actor)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

async fn delete_order(service: Service, id: web::Path<OrderId>, actor: Actor) -> Result<HttpResponse, OrderError> {
    service.delete(id.into_inner(), &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn change_status(
    service: Service,
    id: web::Path<OrderId>,
    body: web::Json<StatusBody>,
    actor: Actor,
) -> Result<HttpResponse, OrderError> {
    let status = OrderStatus::from_str(&body.status)?;
    let updated = service.change_status(id.into_inner(), status, &actor).await?;
    Ok(HttpResponse::Ok().json(updated))
}

async fn add_line(
    service: Service,
    id: web::Path<OrderId>,
    body: web::Json<LineRequest>,
    actor: Actor,
) -> Result<HttpResponse, OrderError> {
    let line = service.add_line(id.into_inner(), body.into_inner(), &actor).await?;
    Ok(HttpResponse::Created().json(line))
}

async fn get_line(service: Service, path: web::Path<(OrderId, LineId)>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let (id, line_id) = path.into_inner();
    let line = service.get_line(id, line_id, &actor).await?;
    Ok(HttpResponse::Ok().json(line))
}

async fn update_line(
    service: Service,
    path: web::Path<(OrderId, LineId)>,
    body: web::Json<QuantityBody>,
    actor: Actor,
) -> Result<HttpResponse, OrderError> {
    let (id, line_id) = path.into_inner();
    let line = service
        .update_line_quantity(id, line_id, body.quantity, &actor)
        .await?;
    Ok(HttpResponse::Ok().json(line))
}

async fn remove_line(service: Service, path: web::Path<(OrderId, LineId)>, actor: Actor) -> Result<HttpResponse, OrderError> {
    let (id, line_id) = path.into_inner();
    service.remove_line(id, line_id, &actor).await?;
    Ok(HttpResponse::NoContent().finish())
}
