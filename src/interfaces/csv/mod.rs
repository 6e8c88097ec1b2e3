//! CSV command input and order table output for the batch CLI.

pub mod command_reader;
pub mod order_writer;
