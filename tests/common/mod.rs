#![allow(dead_code)]

use orderflow::application::lifecycle::OrderLifecycleEngine;
use orderflow::application::refund::RefundWorkflowEngine;
use orderflow::config::EngineConfig;
use orderflow::domain::money::UnitPrice;
use orderflow::domain::order::{ActorId, LineItem, NewOrder, OrderId, PaymentMethod};
use orderflow::domain::ports::Ports;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

pub const HEADER: &str = "type, order, actor, status, reason, items, method, address";

pub fn admin() -> ActorId {
    ActorId::new("admin")
}

pub fn customer() -> ActorId {
    ActorId::new("olivia")
}

pub fn new_order(id: u32, items: &[(&str, u32, Decimal)], method: PaymentMethod) -> NewOrder {
    NewOrder {
        id: OrderId(id),
        customer: customer(),
        items: items
            .iter()
            .map(|(product, quantity, price)| LineItem {
                product: product.to_string(),
                quantity: *quantity,
                unit_price: UnitPrice::new(*price).unwrap(),
                notes: None,
            })
            .collect(),
        delivery_address: "42 Wharf Rd".to_string(),
        payment_method: method,
    }
}

pub fn engines(ports: Ports) -> (OrderLifecycleEngine, RefundWorkflowEngine) {
    (
        OrderLifecycleEngine::new(ports.clone(), EngineConfig::default()),
        RefundWorkflowEngine::new(ports, EngineConfig::default()),
    )
}

/// Writes a command CSV with the standard header.
pub fn command_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
