//! Transport seam for the rangefinder link.
//!
//! Discovery, pairing, and the wireless session itself live behind this
//! trait. The protocol client needs exactly three operations: open the link,
//! subscribe to the device's notification stream, and write raw frames.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Identifies the device and GATT endpoints a link should attach to.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Advertised device name.
    pub device_name: String,
    /// Service carrying the command characteristic.
    pub service_uuid: String,
    /// Characteristic used for both writes and notifications.
    pub characteristic_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("device '{0}' not found")]
    DeviceNotFound(String),

    #[error("service {0} not found on device")]
    ServiceNotFound(String),

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(String),

    #[error("device rejected notification registration")]
    SubscribeRejected,

    #[error("write rejected by transport")]
    WriteRejected,

    #[error("link closed")]
    LinkClosed,
}

/// Byte-oriented bidirectional link to the rangefinder.
///
/// Implementations own device discovery and session setup. Notifications are
/// delivered through the channel returned by [`GattTransport::subscribe`];
/// the sender side closing is how a dropped link is observed.
#[allow(async_fn_in_trait)]
pub trait GattTransport: Send {
    /// Locate the device and open the link.
    async fn open(&mut self, link: &LinkConfig) -> Result<(), TransportError>;

    /// Register for the device's asynchronous notifications.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Bytes>, TransportError>;

    /// Write one request frame.
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}
