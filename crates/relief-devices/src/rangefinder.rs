//! Rangefinder protocol client.
//!
//! Commands go out as framed writes; the device answers through its
//! notification stream. Correlation is single-flight: a one-shot slot is
//! armed immediately before the write and resolved exactly once by the
//! notification pump, so the caller suspends until its response arrives,
//! the write fails, or the deadline passes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use relief_core::frame::{
    self, FrameError, Response, CMD_LASER_ON, CMD_MEASURE, DISTANCE_OFFSET,
    MM_PER_UNIT, MODE_FRONT_SINGLE_AUTO,
};

use crate::gatt::{GattTransport, LinkConfig, TransportError};

/// Default deadline for a command's notification to arrive.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The device answered with a nonzero status byte.
    #[error("device reported status 0x{0:02x}")]
    Status(u8),

    /// A previous command is still awaiting its response.
    #[error("a command is already in flight")]
    RequestInFlight,

    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    #[error("client is not connected")]
    NotConnected,

    #[error("notification stream ended while awaiting a response")]
    Disconnected,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Single-slot hand-off between the notification pump and the one caller
/// waiting in [`Rangefinder::send_command`].
type PendingSlot = Arc<Mutex<Option<oneshot::Sender<Bytes>>>>;

pub struct Rangefinder<T: GattTransport> {
    transport: T,
    link: LinkConfig,
    response_timeout: Duration,
    pending: PendingSlot,
    pump: Option<JoinHandle<()>>,
}

impl<T: GattTransport> Rangefinder<T> {
    pub fn new(transport: T, link: LinkConfig) -> Self {
        Self {
            transport,
            link,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            pending: Arc::new(Mutex::new(None)),
            pump: None,
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Open the link, register for notifications, and start the pump task
    /// that resolves in-flight requests.
    pub async fn connect(&mut self) -> Result<(), DeviceError> {
        self.transport.open(&self.link).await?;
        let notifications = self.transport.subscribe().await?;
        self.pump = Some(tokio::spawn(pump_notifications(
            notifications,
            self.pending.clone(),
        )));
        tracing::info!(device = %self.link.device_name, "rangefinder connected");
        Ok(())
    }

    /// Stop the notification pump. Safe to call on every exit path.
    pub fn disconnect(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            tracing::debug!("rangefinder disconnected");
        }
    }

    /// Send one framed command and suspend until the matching notification
    /// arrives, the write fails, or the response deadline passes.
    ///
    /// One request may be outstanding at a time. A wait that was cancelled
    /// mid-flight leaves the slot armed until the device's late notification
    /// drains it; a second command issued in that window is rejected rather
    /// than queued.
    pub async fn send_command(
        &mut self,
        command: u8,
        payload: &[u8],
    ) -> Result<Response, DeviceError> {
        if self.pump.is_none() {
            return Err(DeviceError::NotConnected);
        }

        let frame = frame::encode_command(command, payload)?;

        // Arm before the write so a fast notification cannot slip past.
        let response_rx = {
            let mut slot = self.pending.lock().await;
            if slot.is_some() {
                return Err(DeviceError::RequestInFlight);
            }
            let (tx, rx) = oneshot::channel();
            *slot = Some(tx);
            rx
        };

        tracing::debug!(command, frame = %hex::encode(&frame), "request");

        if let Err(e) = self.transport.write(&frame).await {
            // The frame never reached the device; nothing will resolve the slot.
            self.pending.lock().await.take();
            return Err(e.into());
        }

        let raw = match tokio::time::timeout(self.response_timeout, response_rx).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(_)) => return Err(DeviceError::Disconnected),
            Err(_) => {
                self.pending.lock().await.take();
                return Err(DeviceError::ResponseTimeout(self.response_timeout));
            }
        };

        tracing::debug!(command, response = %hex::encode(&raw), "notification");
        Ok(Response::from_notification(raw)?)
    }

    /// Trigger a single front-reference, auto-adjusted measurement and
    /// return the distance in millimeters.
    pub async fn measure_distance(&mut self) -> Result<f64, DeviceError> {
        let response = self
            .send_command(CMD_MEASURE, &[MODE_FRONT_SINGLE_AUTO])
            .await?;
        if !response.is_ok() {
            return Err(DeviceError::Status(response.status()));
        }
        let units = response.i32_le(DISTANCE_OFFSET)?;
        Ok(f64::from(units) * MM_PER_UNIT)
    }

    pub async fn turn_laser_on(&mut self) -> Result<(), DeviceError> {
        let response = self.send_command(CMD_LASER_ON, &[]).await?;
        if !response.is_ok() {
            return Err(DeviceError::Status(response.status()));
        }
        Ok(())
    }
}

impl<T: GattTransport> Drop for Rangefinder<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Resolve each delivered notification into the armed slot.
///
/// Exactly-once: the sender is taken out of the slot before use, so a burst
/// of notifications resolves at most one waiter and the rest are dropped.
async fn pump_notifications(mut notifications: mpsc::Receiver<Bytes>, pending: PendingSlot) {
    while let Some(raw) = notifications.recv().await {
        match pending.lock().await.take() {
            Some(waiter) => {
                if waiter.send(raw).is_err() {
                    tracing::warn!("response arrived after the caller stopped waiting");
                }
            }
            None => tracing::warn!(len = raw.len(), "unsolicited notification dropped"),
        }
    }
    // Stream ended. Drop any armed sender so a waiting caller observes the loss.
    pending.lock().await.take();
    tracing::debug!("notification pump stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
