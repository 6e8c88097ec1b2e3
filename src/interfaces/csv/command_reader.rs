use crate::application::commands::Command;
use crate::domain::money::UnitPrice;
use crate::domain::order::{ActorId, LineItem, NewOrder, OrderId, PaymentMethod};
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum CommandType {
    Place,
    Pay,
    Advance,
    Override,
    Cancel,
    RequestRefund,
    Refund,
}

/// One row of the command CSV.
///
/// `status` carries the target order status for `advance`/`override` and the
/// decision (`approved`/`denied`) for `refund`. `items` is a `;` separated list
/// of `product:quantity:unit_price[:notes]`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub order: u32,
    pub actor: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub address: Option<String>,
}

fn required<T>(value: Option<T>, field: &str, kind: CommandType) -> Result<T> {
    value.ok_or_else(|| OrderError::Validation(format!("{kind:?} command requires {field}")))
}

fn parse_item(spec: &str) -> Result<LineItem> {
    let mut parts = spec.splitn(4, ':').map(str::trim);
    let (Some(product), Some(quantity), Some(price)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(OrderError::Validation(format!(
            "Item must be product:quantity:unit_price, got: {spec}"
        )));
    };
    let quantity = quantity
        .parse::<u32>()
        .map_err(|e| OrderError::Validation(format!("Bad quantity for {product}: {e}")))?;
    let price = price
        .parse::<Decimal>()
        .map_err(|e| OrderError::Validation(format!("Bad unit price for {product}: {e}")))?;

    Ok(LineItem {
        product: product.to_string(),
        quantity,
        unit_price: UnitPrice::new(price)?,
        notes: parts.next().filter(|n| !n.is_empty()).map(str::to_string),
    })
}

pub fn parse_items(field: &str) -> Result<Vec<LineItem>> {
    field
        .split(';')
        .filter(|spec| !spec.trim().is_empty())
        .map(parse_item)
        .collect()
}

impl TryFrom<CommandRecord> for Command {
    type Error = OrderError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let order = OrderId(record.order);
        let actor = ActorId::new(record.actor);
        let kind = record.r#type;

        Ok(match kind {
            CommandType::Place => Command::Place(NewOrder {
                id: order,
                customer: actor,
                items: parse_items(&required(record.items, "items", kind)?)?,
                delivery_address: required(record.address, "address", kind)?,
                payment_method: required(record.method, "method", kind)?,
            }),
            CommandType::Pay => Command::RecordPayment { order, actor },
            CommandType::Advance => Command::Advance {
                order,
                actor,
                status: required(record.status, "status", kind)?.parse()?,
            },
            CommandType::Override => Command::Override {
                order,
                actor,
                status: required(record.status, "status", kind)?.parse()?,
            },
            CommandType::Cancel => Command::Cancel {
                order,
                actor,
                reason: record.reason,
            },
            CommandType::RequestRefund => Command::RequestRefund {
                order,
                actor,
                reason: record.reason,
            },
            CommandType::Refund => Command::DecideRefund {
                order,
                actor,
                decision: required(record.status, "status", kind)?.parse()?,
                note: record.reason,
            },
        })
    }
}

/// Reads order commands from a CSV source.
///
/// Whitespace around fields is trimmed and short rows are accepted, so
/// trailing empty columns may be omitted.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows and turns each into a `Command`.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(OrderError::from).and_then(Command::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, RefundDecision};
    use rust_decimal_macros::dec;

    const HEADER: &str = "type, order, actor, status, reason, items, method, address\n";

    fn read(rows: &str) -> Vec<Result<Command>> {
        let data = format!("{HEADER}{rows}");
        CommandReader::new(data.as_bytes()).commands().collect()
    }

    #[test]
    fn test_reader_place_and_advance() {
        let results = read(
            "place, 1, alice, , , Ramen:2:11.00;Gyoza:1:6.5:extra sauce, card, 5 Harbour Rd\n\
             advance, 1, admin, confirmed\n",
        );
        assert_eq!(results.len(), 2);

        let Command::Place(new) = results[0].as_ref().unwrap() else {
            panic!("expected place command");
        };
        assert_eq!(new.id, OrderId(1));
        assert_eq!(new.payment_method, PaymentMethod::Card);
        assert_eq!(new.items.len(), 2);
        assert_eq!(new.items[1].unit_price.value(), dec!(6.5));
        assert_eq!(new.items[1].notes.as_deref(), Some("extra sauce"));

        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::Advance {
                order: OrderId(1),
                actor: ActorId::new("admin"),
                status: OrderStatus::Confirmed,
            }
        );
    }

    #[test]
    fn test_reader_refund_commands() {
        let results = read(
            "request-refund, 4, bob, , wrong item\n\
             refund, 4, admin, denied, policy\n",
        );
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Command::RequestRefund {
                order: OrderId(4),
                actor: ActorId::new("bob"),
                reason: Some("wrong item".to_string()),
            }
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Command::DecideRefund {
                order: OrderId(4),
                actor: ActorId::new("admin"),
                decision: RefundDecision::Denied,
                note: Some("policy".to_string()),
            }
        );
    }

    #[test]
    fn test_reader_malformed_lines() {
        let results = read(
            "ship, 1, admin\n\
             advance, 1, admin, shipped\n\
             place, 2, alice, , , Soup:x:3.00, cash, 1 Road\n\
             place, 3, alice, , , , cash, 1 Road\n\
             cancel, 5, alice\n",
        );
        assert_eq!(results.len(), 5);
        assert!(results[0].is_err());
        assert!(matches!(results[1], Err(OrderError::Validation(_))));
        assert!(matches!(results[2], Err(OrderError::Validation(_))));
        assert!(matches!(results[3], Err(OrderError::Validation(_))));
        assert!(results[4].is_ok());
    }

    #[test]
    fn test_parse_items_rejects_non_positive_price() {
        assert!(parse_items("Water:1:0").is_err());
        assert!(parse_items("Water").is_err());
        assert_eq!(parse_items("Water:1:1.25;").unwrap().len(), 1);
    }
}
