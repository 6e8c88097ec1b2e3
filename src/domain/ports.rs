use super::activity::Activity;
use super::order::{ActorId, Order, OrderId};
use super::payment::Payment;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence for orders.
///
/// Writes are compare-and-swap on `Order::version`: a write succeeds only when
/// the stored version still equals `expected_version`, and the stored copy is
/// saved with the version incremented. A stale write fails with
/// `OrderError::VersionMismatch` and changes nothing.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
    async fn get_all(&self) -> Result<Vec<Order>>;
    /// Inserts a new order, together with its payment when it was prepaid.
    /// `OrderError::Conflict` if the id is taken.
    async fn insert(&self, order: Order, payment: Option<Payment>) -> Result<Order>;
    async fn save(&self, order: Order, expected_version: u64) -> Result<Order>;
    /// Saves the order and its payment as one atomic unit, guarded by the
    /// order's version. Either both writes land or neither does.
    async fn save_with_payment(
        &self,
        order: Order,
        expected_version: u64,
        payment: Payment,
    ) -> Result<Order>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get(&self, order: OrderId) -> Result<Option<Payment>>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: Activity) -> Result<()>;
    async fn entries(&self) -> Result<Vec<Activity>>;
}

pub trait Authorizer: Send + Sync {
    fn is_admin(&self, actor: &ActorId) -> bool;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type ActivityLogRef = Arc<dyn ActivityLog>;
pub type AuthorizerRef = Arc<dyn Authorizer>;

/// The collaborators both engines work against.
#[derive(Clone)]
pub struct Ports {
    pub orders: OrderStoreRef,
    pub payments: PaymentStoreRef,
    pub activity: ActivityLogRef,
    pub authorizer: AuthorizerRef,
}
