//! # pubsub-pipe
//!
//! A command-line adapter between line-oriented stdin/stdout and Google Cloud
//! Pub/Sub.
//!
//! - `push`: publish one message (argument or first stdin line)
//! - `publish`: publish every stdin line
//! - `subscribe`: print messages as JSON lines, acknowledge IDs read from stdin
//! - `drain`: print messages as JSON lines and acknowledge them immediately

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod pubsub;
pub mod shutdown;
pub mod types;

pub use error::{Error, Result};
