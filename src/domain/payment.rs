use super::money::Money;
use super::order::{Order, OrderId, PaymentMethod, RefundStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
        })
    }
}

/// Money movement for a single order.
///
/// `refund_amount` stays zero unless `refund_status` is `approved`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Payment {
    pub id: u32,
    pub order: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Money,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// A settled payment covering the order total. Payments share the id of
    /// the order they settle.
    pub fn completed(order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            id: order.id.0,
            order: order.id,
            amount: order.total_amount,
            method: order.payment_method,
            status: PaymentStatus::Completed,
            refund_status: None,
            refund_amount: Money::ZERO,
            paid_at: now,
        }
    }

    /// Marks the full order total as refunded.
    pub fn refund(&mut self, total: Money) {
        self.refund_status = Some(RefundStatus::Approved);
        self.status = PaymentStatus::Refunded;
        self.refund_amount = total;
    }
}
