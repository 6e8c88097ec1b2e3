use super::money::{Money, UnitPrice};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DENIAL_REASON: &str = "No reason provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whoever issues a command: a customer or an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// `delivered` and `cancelled` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Edges of the order state machine:
    ///
    /// ```text
    /// pending -> confirmed -> preparing -> out-for-delivery -> delivered
    /// pending | confirmed -> cancelled
    /// ```
    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out-for-delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "out-for-delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(OrderError::Validation(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Online,
    Cash,
}

impl PaymentMethod {
    /// Cash is collected on delivery, so no payment exists at placement.
    pub fn is_prepaid(self) -> bool {
        !matches!(self, Self::Cash)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct LineItem {
    pub product: String,
    pub quantity: u32,
    pub unit_price: UnitPrice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LineItem {
    pub fn subtotal(&self) -> Result<Money> {
        self.unit_price.times(self.quantity)
    }
}

/// Item name and quantity as recorded in the activity log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ItemSnapshot {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Requested,
    Approved,
    Denied,
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Denied => "denied",
        })
    }
}

/// Outcome an administrator can give a pending refund request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RefundDecision {
    Approved,
    Denied,
}

impl FromStr for RefundDecision {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            other => Err(OrderError::Validation(format!(
                "Refund decision must be approved or denied, got: {other}"
            ))),
        }
    }
}

impl From<RefundDecision> for RefundStatus {
    fn from(decision: RefundDecision) -> Self {
        match decision {
            RefundDecision::Approved => Self::Approved,
            RefundDecision::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RefundDetails {
    pub status: RefundStatus,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl RefundDetails {
    pub fn requested(reason: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: RefundStatus::Requested,
            reason,
            requested_at: now,
            approved_at: None,
            rejected_at: None,
        }
    }

    /// The only refund transition: `requested` into one of the terminal states.
    pub fn decide(
        &mut self,
        decision: RefundDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != RefundStatus::Requested {
            return Err(OrderError::invalid_state(
                "Refund is not in requested state",
            ));
        }
        self.status = decision.into();
        match decision {
            RefundDecision::Approved => self.approved_at = Some(now),
            RefundDecision::Denied => {
                self.rejected_at = Some(now);
                self.reason = Some(note.unwrap_or_else(|| DEFAULT_DENIAL_REASON.to_string()));
            }
        }
        Ok(())
    }
}

/// Everything the order-placement flow hands over to create an order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer: ActorId,
    pub items: Vec<LineItem>,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer: ActorId,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund: Option<RefundDetails>,
    pub payment: Option<u32>,
    /// Bumped by the store on every successful save.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a `pending` order. The total is fixed here and never recomputed.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<Self> {
        if new.items.is_empty() {
            return Err(OrderError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(item) = new.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::Validation(format!(
                "Quantity for {} must be at least 1",
                item.product
            )));
        }
        let total_amount = Money::checked_sum(new.items.iter().map(LineItem::subtotal))?;

        Ok(Self {
            id: new.id,
            customer: new.customer,
            items: new.items,
            total_amount,
            status: OrderStatus::Pending,
            delivery_address: new.delivery_address,
            payment_method: new.payment_method,
            actual_delivery_time: None,
            cancellation_reason: None,
            refund: None,
            payment: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, actor: &ActorId) -> bool {
        &self.customer == actor
    }

    pub fn items_snapshot(&self) -> Vec<ItemSnapshot> {
        self.items
            .iter()
            .map(|item| ItemSnapshot {
                name: item.product.clone(),
                quantity: item.quantity,
            })
            .collect()
    }

    /// Moves along one edge of the status graph, returning the previous status.
    pub fn advance_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<OrderStatus> {
        if self.status.is_terminal() {
            return Err(OrderError::invalid_state(format!(
                "Order is already {} and cannot change status",
                self.status
            )));
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::invalid_state(format!(
                "Cannot change order status from {} to {}",
                self.status, next
            )));
        }
        Ok(self.set_status(next, now))
    }

    /// Sets any status, ignoring the edge graph. An order carrying refund
    /// details stays `cancelled`.
    pub fn force_status(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<OrderStatus> {
        if self.refund.is_some() && next != OrderStatus::Cancelled {
            return Err(OrderError::invalid_state(
                "Order with a refund request must remain cancelled",
            ));
        }
        Ok(self.set_status(next, now))
    }

    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<OrderStatus> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return Err(OrderError::invalid_state(format!(
                "Cannot cancel order in {} status",
                self.status
            )));
        }
        self.cancellation_reason = reason;
        Ok(self.set_status(OrderStatus::Cancelled, now))
    }

    pub fn request_refund(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if self.status != OrderStatus::Cancelled {
            return Err(OrderError::invalid_state(
                "Refund can only be requested for cancelled orders",
            ));
        }
        if self.refund.is_some() {
            return Err(OrderError::Conflict(
                "Refund already requested for this order".to_string(),
            ));
        }
        if self.payment.is_none() {
            return Err(OrderError::invalid_state("No payment to refund"));
        }
        self.refund = Some(RefundDetails::requested(reason, now));
        self.updated_at = now;
        Ok(())
    }

    pub fn decide_refund(
        &mut self,
        decision: RefundDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let refund = self
            .refund
            .as_mut()
            .ok_or_else(|| OrderError::invalid_state("Refund is not in requested state"))?;
        refund.decide(decision, note, now)?;
        self.updated_at = now;
        Ok(())
    }

    fn set_status(&mut self, next: OrderStatus, now: DateTime<Utc>) -> OrderStatus {
        let previous = self.status;
        self.status = next;
        match next {
            OrderStatus::Delivered if self.actual_delivery_time.is_none() => {
                self.actual_delivery_time = Some(now);
            }
            OrderStatus::Delivered => {}
            // Only an override can leave `delivered`; the stamp goes with it.
            _ => self.actual_delivery_time = None,
        }
        self.updated_at = now;
        previous
    }
}
