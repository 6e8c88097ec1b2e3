use super::money::Money;
use super::order::{ActorId, ItemSnapshot, Order, OrderId, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    OrderPlaced,
    PaymentRecorded,
    StatusChanged,
    StatusOverridden,
    OrderCancelled,
    RefundRequested,
    RefundApproved,
    RefundDenied,
}

/// One entry of the audit trail shown on admin and customer dashboards.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Activity {
    pub kind: ActivityKind,
    pub order: OrderId,
    pub actor: ActorId,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub total: Money,
    pub items: Vec<ItemSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl Activity {
    /// Captures the order as it stands after the action.
    pub fn record(kind: ActivityKind, order: &Order, actor: &ActorId, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            order: order.id,
            actor: actor.clone(),
            previous_status: None,
            new_status: order.status,
            total: order.total_amount,
            items: order.items_snapshot(),
            note: None,
            at,
        }
    }

    pub fn with_previous(mut self, previous: OrderStatus) -> Self {
        self.previous_status = Some(previous);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}
