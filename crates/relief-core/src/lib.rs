//! relief-core — checksum, command framing, and configuration.
//! The device clients and the scan pipeline both depend on this crate.

pub mod checksum;
pub mod config;
pub mod frame;

pub use frame::{FrameError, Response};
