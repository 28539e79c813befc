// ============================================================================
// HTTP API - actix-web boundary around OrderLifecycleService
// ============================================================================
//
// - identity: Actor extractor over X-User-Id / X-User-Roles
// - error:    OrderError → status code + JSON body
// - routes:   /orders and /orders/{id}/lines
//
// ============================================================================

mod error;
mod identity;
mod routes;

pub use identity::actor_from_headers;
pub use routes::configure_order_routes;
