// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - access: actor identity, roles and the access policy
// - order:  the order aggregate and its lifecycle service
// - user:   read-only snapshot of a user from the external directory
//
// Nothing here talks to the network directly; stores and the user directory
// come in through traits.
//
// ============================================================================

pub mod access;
pub mod order;
pub mod user;
