//! Domain model: orders, payments, the activity trail, and the ports the
//! engines use to reach their collaborators.

pub mod activity;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
