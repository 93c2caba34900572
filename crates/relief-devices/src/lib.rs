//! relief-devices — clients for the two bench devices: the laser rangefinder
//! behind its wireless link, and the motion stage behind its HTTP command API.

pub mod gatt;
pub mod rangefinder;
pub mod sim;
pub mod stage;

pub use gatt::{GattTransport, LinkConfig, TransportError};
pub use rangefinder::{DeviceError, Rangefinder};
pub use stage::{HttpStage, MotionStage, MoveTarget, StageError};
