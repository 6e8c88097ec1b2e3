use crate::application::service::OrderView;
use crate::domain::money::Money;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OrderRow {
    order: u32,
    customer: String,
    status: &'static str,
    total: String,
    refund: String,
    payment: String,
    refund_amount: String,
}

impl From<&OrderView> for OrderRow {
    fn from(view: &OrderView) -> Self {
        let order = &view.order;
        Self {
            order: order.id.0,
            customer: order.customer.to_string(),
            status: order.status.as_str(),
            total: order.total_amount.to_string(),
            refund: order
                .refund
                .as_ref()
                .map(|refund| refund.status.to_string())
                .unwrap_or_default(),
            payment: view
                .payment
                .as_ref()
                .map(|payment| payment.status.to_string())
                .unwrap_or_default(),
            refund_amount: view
                .payment
                .as_ref()
                .map_or(Money::ZERO, |payment| payment.refund_amount)
                .to_string(),
        }
    }
}

/// Writes the final order table as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, views: &[OrderView]) -> Result<()> {
        for view in views {
            self.writer.serialize(OrderRow::from(view))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
