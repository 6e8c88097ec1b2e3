use super::commands::Command;
use super::lifecycle::OrderLifecycleEngine;
use super::refund::RefundWorkflowEngine;
use crate::config::EngineConfig;
use crate::domain::activity::Activity;
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::Ports;
use crate::error::Result;

/// Single entry point that routes commands to the engine owning them.
pub struct OrderService {
    ports: Ports,
    lifecycle: OrderLifecycleEngine,
    refunds: RefundWorkflowEngine,
}

/// An order together with its payment record, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub payment: Option<Payment>,
}

impl OrderService {
    pub fn new(ports: Ports, config: EngineConfig) -> Self {
        Self {
            lifecycle: OrderLifecycleEngine::new(ports.clone(), config.clone()),
            refunds: RefundWorkflowEngine::new(ports.clone(), config),
            ports,
        }
    }

    /// Applies one command and returns the updated order.
    pub async fn execute(&self, command: Command) -> Result<Order> {
        match command {
            Command::Place(new) => self.lifecycle.place_order(new).await,
            Command::RecordPayment { order, actor } => {
                self.lifecycle.record_payment(order, &actor).await
            }
            Command::Advance {
                order,
                actor,
                status,
            } => self.lifecycle.advance_status(order, status, &actor).await,
            Command::Override {
                order,
                actor,
                status,
            } => self.lifecycle.override_status(order, status, &actor).await,
            Command::Cancel {
                order,
                actor,
                reason,
            } => {
                self.lifecycle
                    .cancel_order(order, &actor, reason.as_deref())
                    .await
            }
            Command::RequestRefund {
                order,
                actor,
                reason,
            } => {
                self.refunds
                    .request_refund(order, &actor, reason.as_deref())
                    .await
            }
            Command::DecideRefund {
                order,
                actor,
                decision,
                note,
            } => {
                self.refunds
                    .decide_refund(order, decision, &actor, note.as_deref())
                    .await
            }
        }
    }

    /// Final state of every order with its payment, sorted by order id.
    pub async fn into_results(self) -> Result<Vec<OrderView>> {
        let orders = self.lifecycle.orders().await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let payment = self.ports.payments.get(order.id).await?;
            views.push(OrderView { order, payment });
        }
        Ok(views)
    }

    pub async fn activity(&self) -> Result<Vec<Activity>> {
        self.ports.activity.entries().await
    }
}
