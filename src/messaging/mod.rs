// ============================================================================
// Messaging - asynchronous payment outcomes
// ============================================================================

pub mod kafka;
pub mod payment_events;

pub use kafka::PaymentEventConsumer;
pub use payment_events::{HandleOutcome, PaymentEvent, PaymentEventHandler, PaymentOutcome};
