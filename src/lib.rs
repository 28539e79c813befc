// ============================================================================
// Order Lifecycle Service
// ============================================================================
//
// Orders made of catalog item lines: status machine, exact totals, access
// control on every mutation, and owner enrichment from a user directory that
// may fail independently.
//
// ============================================================================

pub mod api;
pub mod clients;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;
