// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderStatus, OrderLine, CatalogItem)
// - Status machine (allowed transitions)
// - Errors (OrderError enum)
// - Aggregate (Order with its lines)
// - Pricing (total recomputation)
// - Commands and the lifecycle service that runs them
//
// ============================================================================

pub mod value_objects;
pub mod status_machine;
pub mod errors;
pub mod aggregate;
pub mod pricing;
pub mod commands;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use status_machine::*;
pub use errors::*;
pub use aggregate::*;
pub use pricing::*;
pub use commands::*;
pub use service::*;
