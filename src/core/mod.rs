//! Core state shared between the receive loop and the ack reader.

pub mod ack;
pub mod inflight;
pub mod lines;

pub use ack::{AckOutcome, AckReader, AckSummary};
pub use inflight::InflightTable;
