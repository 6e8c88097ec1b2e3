//! Application layer: the order lifecycle and refund workflow engines.
//!
//! Each engine call is one read-validate-write cycle against the stores. Writes
//! are version checked; when a concurrent writer wins, the operation is
//! evaluated again against the order it left behind.

pub mod commands;
pub mod lifecycle;
pub mod refund;
pub mod service;

use crate::domain::activity::Activity;
use crate::domain::order::{ActorId, Order, OrderId};
use crate::domain::ports::Ports;
use crate::error::{OrderError, Result};
use std::future::Future;
use tracing::{debug, warn};

pub(crate) async fn load_order(ports: &Ports, id: OrderId) -> Result<Order> {
    ports
        .orders
        .get(id)
        .await?
        .ok_or_else(|| OrderError::not_found(format!("Order {id} not found")))
}

pub(crate) fn require_admin(ports: &Ports, actor: &ActorId, action: &str) -> Result<()> {
    if ports.authorizer.is_admin(actor) {
        Ok(())
    } else {
        Err(OrderError::Forbidden(format!(
            "{actor} is not allowed to {action}"
        )))
    }
}

pub(crate) fn require_owner_or_admin(
    ports: &Ports,
    order: &Order,
    actor: &ActorId,
    action: &str,
) -> Result<()> {
    if order.is_owned_by(actor) {
        Ok(())
    } else {
        require_admin(ports, actor, action)
    }
}

/// Runs `op`, re-running it while it fails on a stale order version. At least
/// one reload is always allowed.
pub(crate) async fn with_stale_reloads<T, F, Fut>(
    max_reloads: u32,
    order: OrderId,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_reloads = max_reloads.max(1);
    let mut reloads = 0;
    loop {
        match op().await {
            Err(OrderError::VersionMismatch { expected, .. }) if reloads < max_reloads => {
                reloads += 1;
                debug!(%order, expected, reloads, "stale order version, reloading");
            }
            result => return result,
        }
    }
}

/// Appends to the audit trail once the state change is committed. A failing
/// log does not undo the committed change.
pub(crate) async fn log_activity(ports: &Ports, entry: Activity) {
    let order = entry.order;
    if let Err(e) = ports.activity.append(entry).await {
        warn!(%order, error = %e, "failed to append activity");
    }
}
