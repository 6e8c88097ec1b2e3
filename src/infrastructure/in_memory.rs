use super::auth::StaticAuthorizer;
use crate::domain::activity::Activity;
use crate::domain::order::{Order, OrderId};
use crate::domain::payment::Payment;
use crate::domain::ports::{ActivityLog, AuthorizerRef, OrderStore, PaymentStore, Ports};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    payments: HashMap<OrderId, Payment>,
}

impl Tables {
    fn check_version(&self, id: OrderId, expected: u64) -> Result<()> {
        match self.orders.get(&id) {
            None => Err(OrderError::not_found(format!("Order {id} not found"))),
            Some(stored) if stored.version != expected => Err(OrderError::VersionMismatch {
                order: id.0,
                expected,
            }),
            Some(_) => Ok(()),
        }
    }
}

/// A thread-safe in-memory store for orders and their payments.
///
/// Both tables sit behind one `RwLock`, so a combined order and payment write
/// is a single critical section.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().cloned().collect())
    }

    async fn insert(&self, order: Order, payment: Option<Payment>) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(OrderError::Conflict(format!(
                "Order {} already exists",
                order.id
            )));
        }
        if let Some(payment) = payment {
            tables.payments.insert(order.id, payment);
        }
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn save(&self, mut order: Order, expected_version: u64) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check_version(order.id, expected_version)?;
        order.version = expected_version + 1;
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn save_with_payment(
        &self,
        mut order: Order,
        expected_version: u64,
        payment: Payment,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.check_version(order.id, expected_version)?;
        order.version = expected_version + 1;
        tables.payments.insert(order.id, payment);
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn get(&self, order: OrderId) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&order).cloned())
    }
}

/// Append-only activity trail kept in memory.
#[derive(Default, Clone)]
pub struct InMemoryActivityLog {
    entries: Arc<RwLock<Vec<Activity>>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, entry: Activity) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<Activity>> {
        Ok(self.entries.read().await.clone())
    }
}

/// Wires fresh in-memory stores behind the given authorizer.
pub fn in_memory_ports_with(authorizer: AuthorizerRef) -> Ports {
    let store = InMemoryStore::new();
    Ports {
        orders: Arc::new(store.clone()),
        payments: Arc::new(store),
        activity: Arc::new(InMemoryActivityLog::new()),
        authorizer,
    }
}

/// Wires fresh in-memory stores with the given admin ids.
pub fn in_memory_ports(admins: &[&str]) -> Ports {
    in_memory_ports_with(Arc::new(StaticAuthorizer::new(admins.iter().copied())))
}
