use crate::domain::order::{ActorId, NewOrder, OrderId, OrderStatus, RefundDecision};

/// A request against the order core, as the API layer would issue it.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Place(NewOrder),
    RecordPayment {
        order: OrderId,
        actor: ActorId,
    },
    /// `PUT /orders/{id}/status`
    Advance {
        order: OrderId,
        actor: ActorId,
        status: OrderStatus,
    },
    Override {
        order: OrderId,
        actor: ActorId,
        status: OrderStatus,
    },
    /// `PUT /orders/{id}/cancel`
    Cancel {
        order: OrderId,
        actor: ActorId,
        reason: Option<String>,
    },
    /// `POST /orders/{id}/request-refund`
    RequestRefund {
        order: OrderId,
        actor: ActorId,
        reason: Option<String>,
    },
    /// `PUT /admin/orders/{id}/refund`
    DecideRefund {
        order: OrderId,
        actor: ActorId,
        decision: RefundDecision,
        note: Option<String>,
    },
}

impl Command {
    pub fn order(&self) -> OrderId {
        match self {
            Self::Place(new) => new.id,
            Self::RecordPayment { order, .. }
            | Self::Advance { order, .. }
            | Self::Override { order, .. }
            | Self::Cancel { order, .. }
            | Self::RequestRefund { order, .. }
            | Self::DecideRefund { order, .. } => *order,
        }
    }
}
