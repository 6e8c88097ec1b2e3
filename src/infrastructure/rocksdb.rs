use crate::domain::activity::Activity;
use crate::domain::order::{Order, OrderId};
use crate::domain::payment::Payment;
use crate::domain::ports::{ActivityLog, OrderStore, PaymentStore};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing payment records, keyed by order id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for the activity trail, keyed by sequence number.
pub const CF_ACTIVITY: &str = "activity";

/// A persistent store implementation using RocksDB.
///
/// Orders, payments and activity live in separate Column Families. Order
/// writes are version checked under a process-wide write lock, and a combined
/// order and payment write goes through a single `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    next_activity: Arc<AtomicU64>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| OrderError::storage(format!("Serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| OrderError::storage(format!("Deserialization error: {e}")))
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the
    /// activity sequence after the last stored entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_ORDERS, CF_PAYMENTS, CF_ACTIVITY]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        let next_activity = {
            let cf = db
                .cf_handle(CF_ACTIVITY)
                .ok_or_else(|| OrderError::storage("Activity column family not found"))?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    let bytes: [u8; 8] = key
                        .as_ref()
                        .try_into()
                        .map_err(|_| OrderError::storage("Malformed activity key"))?;
                    u64::from_be_bytes(bytes) + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            next_activity: Arc::new(AtomicU64::new(next_activity)),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::storage(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    /// Must be called with the write lock held.
    fn check_version(&self, id: OrderId, expected: u64) -> Result<()> {
        let stored: Order = self
            .read(CF_ORDERS, &id.0.to_be_bytes())?
            .ok_or_else(|| OrderError::not_found(format!("Order {id} not found")))?;
        if stored.version != expected {
            return Err(OrderError::VersionMismatch {
                order: id.0,
                expected,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, &id.0.to_be_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.read_all(CF_ORDERS)
    }

    async fn insert(&self, order: Order, payment: Option<Payment>) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = order.id.0.to_be_bytes();
        if self.db.get_pinned_cf(self.cf(CF_ORDERS)?, key)?.is_some() {
            return Err(OrderError::Conflict(format!(
                "Order {} already exists",
                order.id
            )));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, key, encode(&order)?);
        if let Some(payment) = &payment {
            batch.put_cf(self.cf(CF_PAYMENTS)?, key, encode(payment)?);
        }
        self.db.write(batch)?;
        Ok(order)
    }

    async fn save(&self, mut order: Order, expected_version: u64) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        self.check_version(order.id, expected_version)?;
        order.version = expected_version + 1;
        self.db
            .put_cf(self.cf(CF_ORDERS)?, order.id.0.to_be_bytes(), encode(&order)?)?;
        Ok(order)
    }

    async fn save_with_payment(
        &self,
        mut order: Order,
        expected_version: u64,
        payment: Payment,
    ) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        self.check_version(order.id, expected_version)?;
        order.version = expected_version + 1;

        let key = order.id.0.to_be_bytes();
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, key, encode(&order)?);
        batch.put_cf(self.cf(CF_PAYMENTS)?, key, encode(&payment)?);
        self.db.write(batch)?;
        Ok(order)
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn get(&self, order: OrderId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, &order.0.to_be_bytes())
    }
}

#[async_trait]
impl ActivityLog for RocksDBStore {
    async fn append(&self, entry: Activity) -> Result<()> {
        let seq = self.next_activity.fetch_add(1, Ordering::SeqCst);
        self.db
            .put_cf(self.cf(CF_ACTIVITY)?, seq.to_be_bytes(), encode(&entry)?)?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<Activity>> {
        self.read_all(CF_ACTIVITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityKind;
    use crate::domain::money::UnitPrice;
    use crate::domain::order::{ActorId, LineItem, NewOrder, PaymentMethod};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn order(id: u32) -> Order {
        Order::place(
            NewOrder {
                id: OrderId(id),
                customer: ActorId::new("erin"),
                items: vec![LineItem {
                    product: "Pho".to_string(),
                    quantity: 2,
                    unit_price: UnitPrice::new(dec!(10.25)).unwrap(),
                    notes: None,
                }],
                delivery_address: "8 River Ln".to_string(),
                payment_method: PaymentMethod::Card,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_ORDERS).is_some());
        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
        assert!(store.db.cf_handle(CF_ACTIVITY).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_order_and_payment() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let order = order(1);
        let payment = Payment::completed(&order, Utc::now());
        store.insert(order.clone(), Some(payment.clone())).await.unwrap();

        assert_eq!(OrderStore::get(&store, OrderId(1)).await.unwrap(), Some(order.clone()));
        assert_eq!(PaymentStore::get(&store, OrderId(1)).await.unwrap(), Some(payment));
        assert_eq!(store.get_all().await.unwrap().len(), 1);
        assert!(matches!(
            store.insert(order, None).await,
            Err(OrderError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_version_check() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        store.insert(order(1), None).await.unwrap();

        let saved = store.save(order(1), 0).await.unwrap();
        assert_eq!(saved.version, 1);
        assert!(matches!(
            store.save(order(1), 0).await,
            Err(OrderError::VersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_activity_sequence_survives_reopen() {
        let dir = tempdir().unwrap();
        let actor = ActorId::new("erin");
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store
                .append(Activity::record(ActivityKind::OrderPlaced, &order(1), &actor, Utc::now()))
                .await
                .unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        store
            .append(Activity::record(ActivityKind::OrderCancelled, &order(1), &actor, Utc::now()))
            .await
            .unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, ActivityKind::OrderPlaced);
        assert_eq!(entries[1].kind, ActivityKind::OrderCancelled);
    }
}
