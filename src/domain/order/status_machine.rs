use super::value_objects::OrderStatus;

// ============================================================================
// Order Status Machine
// ============================================================================
//
//   NEW ──► PROCESSING ──► COMPLETED
//    │
//    └────► CANCELLED
//
// COMPLETED and CANCELLED are terminal. Self-transitions are not allowed.
//
// ============================================================================

const TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (OrderStatus::New, &[OrderStatus::Processing, OrderStatus::Cancelled]),
    (OrderStatus::Processing, &[OrderStatus::Completed]),
    (OrderStatus::Completed, &[]),
    (OrderStatus::Cancelled, &[]),
];

pub struct OrderStatusMachine;

impl OrderStatusMachine {
    pub const INITIAL: OrderStatus = OrderStatus::New;

    /// Allowed successors of `from`
    pub fn successors(from: OrderStatus) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        Self::successors(from).contains(&to)
    }
}
