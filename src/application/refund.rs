use super::{
    load_order, log_activity, require_admin, require_owner_or_admin, with_stale_reloads,
};
use crate::config::EngineConfig;
use crate::domain::activity::{Activity, ActivityKind};
use crate::domain::order::{ActorId, Order, OrderId, RefundDecision};
use crate::domain::ports::Ports;
use crate::error::{OrderError, Result};
use chrono::Utc;
use tracing::info;

/// Drives the request/approve/deny sub-lifecycle of a cancelled, paid order
/// and keeps the payment record in step with it.
#[derive(Clone)]
pub struct RefundWorkflowEngine {
    ports: Ports,
    config: EngineConfig,
}

impl RefundWorkflowEngine {
    pub fn new(ports: Ports, config: EngineConfig) -> Self {
        Self { ports, config }
    }

    /// Opens the single refund request an order can ever have.
    pub async fn request_refund(
        &self,
        id: OrderId,
        requester: &ActorId,
        reason: Option<&str>,
    ) -> Result<Order> {
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_request(id, requester, reason)
        })
        .await
    }

    async fn try_request(
        &self,
        id: OrderId,
        requester: &ActorId,
        reason: Option<&str>,
    ) -> Result<Order> {
        let mut order = load_order(&self.ports, id).await?;
        require_owner_or_admin(&self.ports, &order, requester, "request a refund for this order")?;

        let now = Utc::now();
        let expected = order.version;
        let reason = reason.map(str::to_string);
        order.request_refund(reason.clone(), now)?;

        let order = self.ports.orders.save(order, expected).await?;
        info!(order = %id, "refund requested");
        log_activity(
            &self.ports,
            Activity::record(ActivityKind::RefundRequested, &order, requester, now)
                .with_note(reason),
        )
        .await;
        Ok(order)
    }

    /// Approves or denies a pending refund request.
    ///
    /// On approval the payment is marked refunded for the full order total,
    /// and the payment and the order are committed together. A denial only
    /// touches the order.
    pub async fn decide_refund(
        &self,
        id: OrderId,
        decision: RefundDecision,
        admin: &ActorId,
        note: Option<&str>,
    ) -> Result<Order> {
        require_admin(&self.ports, admin, "decide refunds")?;
        with_stale_reloads(self.config.max_stale_reloads, id, || {
            self.try_decide(id, decision, admin, note)
        })
        .await
    }

    async fn try_decide(
        &self,
        id: OrderId,
        decision: RefundDecision,
        admin: &ActorId,
        note: Option<&str>,
    ) -> Result<Order> {
        let mut order = load_order(&self.ports, id).await?;
        let now = Utc::now();
        let expected = order.version;
        order.decide_refund(decision, note.map(str::to_string), now)?;

        let (order, kind) = match decision {
            RefundDecision::Approved => {
                let mut payment = self.ports.payments.get(id).await?.ok_or_else(|| {
                    OrderError::not_found(format!("Payment for order {id} not found"))
                })?;
                payment.refund(order.total_amount);
                let order = self
                    .ports
                    .orders
                    .save_with_payment(order, expected, payment)
                    .await?;
                (order, ActivityKind::RefundApproved)
            }
            RefundDecision::Denied => (
                self.ports.orders.save(order, expected).await?,
                ActivityKind::RefundDenied,
            ),
        };

        info!(order = %id, decision = ?decision, "refund decided");
        let note = order.refund.as_ref().and_then(|refund| refund.reason.clone());
        log_activity(
            &self.ports,
            Activity::record(kind, &order, admin, now).with_note(note),
        )
        .await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::OrderLifecycleEngine;
    use crate::domain::money::{Money, UnitPrice};
    use crate::domain::order::{
        LineItem, NewOrder, OrderStatus, PaymentMethod, RefundStatus, DEFAULT_DENIAL_REASON,
    };
    use crate::domain::payment::PaymentStatus;
    use crate::infrastructure::in_memory::in_memory_ports;
    use rust_decimal_macros::dec;

    fn admin() -> ActorId {
        ActorId::new("admin")
    }

    fn bob() -> ActorId {
        ActorId::new("bob")
    }

    async fn setup(method: PaymentMethod) -> (OrderLifecycleEngine, RefundWorkflowEngine) {
        let ports = in_memory_ports(&["admin"]);
        let lifecycle = OrderLifecycleEngine::new(ports.clone(), EngineConfig::default());
        let refunds = RefundWorkflowEngine::new(ports, EngineConfig::default());
        lifecycle
            .place_order(NewOrder {
                id: OrderId(1),
                customer: bob(),
                items: vec![
                    LineItem {
                        product: "Burrito".to_string(),
                        quantity: 3,
                        unit_price: UnitPrice::new(dec!(12.00)).unwrap(),
                        notes: None,
                    },
                    LineItem {
                        product: "Horchata".to_string(),
                        quantity: 1,
                        unit_price: UnitPrice::new(dec!(6.50)).unwrap(),
                        notes: Some("no ice".to_string()),
                    },
                ],
                delivery_address: "12 Mission St".to_string(),
                payment_method: method,
            })
            .await
            .unwrap();
        (lifecycle, refunds)
    }

    #[tokio::test]
    async fn test_refund_requires_cancelled_order() {
        let (_, refunds) = setup(PaymentMethod::Card).await;
        let err = refunds
            .request_refund(OrderId(1), &bob(), Some("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_second_request_conflicts() {
        let (lifecycle, refunds) = setup(PaymentMethod::Card).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();

        let order = refunds
            .request_refund(OrderId(1), &bob(), Some("wrong item"))
            .await
            .unwrap();
        let refund = order.refund.unwrap();
        assert_eq!(refund.status, RefundStatus::Requested);
        assert_eq!(refund.reason.as_deref(), Some("wrong item"));

        let err = refunds
            .request_refund(OrderId(1), &bob(), Some("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unpaid_cash_order_cannot_be_refunded() {
        let (lifecycle, refunds) = setup(PaymentMethod::Cash).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();
        let err = refunds
            .request_refund(OrderId(1), &bob(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_approval_refunds_order_total() {
        let (lifecycle, refunds) = setup(PaymentMethod::Card).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();
        refunds.request_refund(OrderId(1), &bob(), None).await.unwrap();

        let order = refunds
            .decide_refund(OrderId(1), RefundDecision::Approved, &admin(), None)
            .await
            .unwrap();
        let refund = order.refund.as_ref().unwrap();
        assert_eq!(refund.status, RefundStatus::Approved);
        assert!(refund.approved_at.is_some());
        assert_eq!(order.status, OrderStatus::Cancelled);

        let payment = refunds.ports.payments.get(OrderId(1)).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert_eq!(payment.refund_status, Some(RefundStatus::Approved));
        assert_eq!(payment.refund_amount, order.total_amount);
        assert_eq!(payment.refund_amount, Money::new(dec!(42.50)));
    }

    #[tokio::test]
    async fn test_denial_leaves_payment_untouched() {
        let (lifecycle, refunds) = setup(PaymentMethod::Card).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();
        refunds.request_refund(OrderId(1), &bob(), None).await.unwrap();
        let before = refunds.ports.payments.get(OrderId(1)).await.unwrap();

        let order = refunds
            .decide_refund(OrderId(1), RefundDecision::Denied, &admin(), None)
            .await
            .unwrap();
        let refund = order.refund.unwrap();
        assert_eq!(refund.status, RefundStatus::Denied);
        assert_eq!(refund.reason.as_deref(), Some(DEFAULT_DENIAL_REASON));
        assert!(refund.rejected_at.is_some());

        let after = refunds.ports.payments.get(OrderId(1)).await.unwrap();
        assert_eq!(before, after);
        assert!(after.unwrap().refund_amount.is_zero());
    }

    #[tokio::test]
    async fn test_decide_requires_admin() {
        let (lifecycle, refunds) = setup(PaymentMethod::Card).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();
        refunds.request_refund(OrderId(1), &bob(), None).await.unwrap();

        let err = refunds
            .decide_refund(OrderId(1), RefundDecision::Approved, &bob(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_decide_without_request() {
        let (lifecycle, refunds) = setup(PaymentMethod::Card).await;
        lifecycle.cancel_order(OrderId(1), &bob(), None).await.unwrap();

        let err = refunds
            .decide_refund(OrderId(1), RefundDecision::Approved, &admin(), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Refund is not in requested state");

        let payment = refunds.ports.payments.get(OrderId(1)).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
    }
}
