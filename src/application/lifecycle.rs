use super::{
    load_order, log_activity, require_admin, require_owner_or_admin, with_stale_reloads,
};
use crate::config::EngineConfig;
use crate::domain::activity::{Activity, ActivityKind};
use crate::domain::order::{ActorId, NewOrder, Order, OrderId, OrderStatus};
use crate::domain::payment::Payment;
use crate::domain::ports::Ports;
use crate::error::{OrderError, Result};
use chrono::Utc;
use tracing::info;

/// Owns the order status machine.
///
/// Every status change goes through here so that admin and customer paths
/// share the same validation, the same delivery stamping and the same audit
/// trail.
#[derive(Clone)]
pub struct OrderLifecycleEngine {
    ports: Ports,
    config: EngineConfig,
}

impl OrderLifecycleEngine {
    pub fn new(ports: Ports, config: EngineConfig) -> Self {
        Self { ports, config }
    }

    /// Stores a new `pending` order. Prepaid orders get their completed
    /// payment in the same write.
    pub async fn place_order(&self, new: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let order = Order::place(new, now)?;
        let (order, payment) = if order.payment_method.is_prepaid() {
            let payment = Payment::completed(&order, now);
            let order = Order {
                payment: Some(payment.id),
                ..order
            };
            (order, Some(payment))
        } else {
            (order, None)
        };

        let order = self.ports.orders.insert(order, payment).await?;
        info!(order = %order.id, total = %order.total_amount, "order placed");
        log_activity(
            &self.ports,
            Activity::record(ActivityKind::OrderPlaced, &order, &order.customer, now),
        )
        .await;
        Ok(order)
    }

    /// Records the payment of a cash-on-delivery order.
    pub async fn record_payment(&self, id: OrderId, actor: &ActorId) -> Result<Order> {
        require_admin(&self.ports, actor, "record payments")?;
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_record_payment(id, actor)
        })
        .await
    }

    async fn try_record_payment(&self, id: OrderId, actor: &ActorId) -> Result<Order> {
        let mut order = load_order(&self.ports, id).await?;
        if order.payment.is_some() {
            return Err(OrderError::Conflict(format!(
                "Payment already recorded for order {id}"
            )));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::invalid_state(
                "Cannot record payment for a cancelled order",
            ));
        }

        let now = Utc::now();
        let payment = Payment::completed(&order, now);
        let expected = order.version;
        order.payment = Some(payment.id);
        order.updated_at = now;

        let order = self
            .ports
            .orders
            .save_with_payment(order, expected, payment)
            .await?;
        info!(order = %id, "payment recorded");
        log_activity(
            &self.ports,
            Activity::record(ActivityKind::PaymentRecorded, &order, actor, now),
        )
        .await;
        Ok(order)
    }

    /// Moves an order one step along the status graph.
    ///
    /// Asking for the status the order already has is a no-op: nothing is
    /// written and no activity is recorded.
    pub async fn advance_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: &ActorId,
    ) -> Result<Order> {
        require_admin(&self.ports, actor, "change order status")?;
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_change_status(id, new_status, actor, false)
        })
        .await
    }

    /// Sets any status regardless of the graph, for manual corrections.
    pub async fn override_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: &ActorId,
    ) -> Result<Order> {
        if !self.config.allow_status_override {
            return Err(OrderError::Forbidden(
                "Status override is disabled".to_string(),
            ));
        }
        require_admin(&self.ports, actor, "override order status")?;
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_change_status(id, new_status, actor, true)
        })
        .await
    }

    async fn try_change_status(
        &self,
        id: OrderId,
        new_status: OrderStatus,
        actor: &ActorId,
        forced: bool,
    ) -> Result<Order> {
        let mut order = load_order(&self.ports, id).await?;
        if order.status == new_status {
            return Ok(order);
        }

        let now = Utc::now();
        let expected = order.version;
        let (previous, kind) = if forced {
            (order.force_status(new_status, now)?, ActivityKind::StatusOverridden)
        } else {
            (order.advance_to(new_status, now)?, ActivityKind::StatusChanged)
        };

        let order = self.ports.orders.save(order, expected).await?;
        info!(order = %id, from = %previous, to = %new_status, forced, "order status changed");
        log_activity(
            &self.ports,
            Activity::record(kind, &order, actor, now).with_previous(previous),
        )
        .await;
        Ok(order)
    }

    /// Cancels an order that has not started preparation yet.
    pub async fn cancel_order(
        &self,
        id: OrderId,
        actor: &ActorId,
        reason: Option<&str>,
    ) -> Result<Order> {
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_cancel(id, actor, reason)
        })
        .await
    }

    async fn try_cancel(&self, id: OrderId, actor: &ActorId, reason: Option<&str>) -> Result<Order> {
        let mut order = load_order(&self.ports, id).await?;
        require_owner_or_admin(&self.ports, &order, actor, "cancel this order")?;

        let now = Utc::now();
        let expected = order.version;
        let reason = reason.map(str::to_string);
        let previous = order.cancel(reason.clone(), now)?;

        let order = self.ports.orders.save(order, expected).await?;
        info!(order = %id, from = %previous, "order cancelled");
        log_activity(
            &self.ports,
            Activity::record(ActivityKind::OrderCancelled, &order, actor, now)
                .with_previous(previous)
                .with_note(reason),
        )
        .await;
        Ok(order)
    }

    pub async fn order(&self, id: OrderId) -> Result<Order> {
        load_order(&self.ports, id).await
    }

    /// All orders, sorted by id.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        let mut orders = self.ports.orders.get_all().await?;
        orders.sort_by_key(|order| order.id);
        Ok(orders)
    }
}
