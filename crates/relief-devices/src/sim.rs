//! Simulated bench devices.
//!
//! Drives the full pipeline without hardware: the simulated stage records
//! the commanded position, and the simulated rangefinder link answers
//! measurement frames with the distance a configurable surface would return
//! at that position. Faults can be scripted to exercise the abort paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use relief_core::frame::{CMD_LASER_ON, CMD_MEASURE, MM_PER_UNIT};

use crate::gatt::{GattTransport, LinkConfig, TransportError};
use crate::stage::{MotionStage, MoveTarget, StageError};

/// Scripted failures for the simulated bench.
#[derive(Debug, Clone, Copy)]
pub struct SimFaults {
    /// Fail the Nth measurement (0-based) with `measure_status`.
    pub fail_measure_at: Option<usize>,
    /// Status byte returned by the injected measurement failure.
    pub measure_status: u8,
    /// Reject every frame write at the transport.
    pub reject_writes: bool,
    /// Fail the auto-home sequence.
    pub fail_home: bool,
}

impl Default for SimFaults {
    fn default() -> Self {
        Self {
            fail_measure_at: None,
            measure_status: 0x01,
            reject_writes: false,
            fail_home: false,
        }
    }
}

/// Shared state behind one simulated transport/stage pair.
pub struct SimBench {
    distance_at: Box<dyn Fn(f64, f64) -> f64 + Send + Sync>,
    faults: SimFaults,
    position: Mutex<(f64, f64)>,
    visited: Mutex<Vec<(f64, f64)>>,
    frames: Mutex<Vec<Vec<u8>>>,
    measurements: AtomicUsize,
}

impl SimBench {
    /// A bench whose rangefinder reads `distance_at(x, y)` millimeters at
    /// the stage's current position.
    pub fn new(distance_at: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Arc<Self> {
        Self::with_faults(distance_at, SimFaults::default())
    }

    pub fn with_faults(
        distance_at: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
        faults: SimFaults,
    ) -> Arc<Self> {
        Arc::new(Self {
            distance_at: Box::new(distance_at),
            faults,
            position: Mutex::new((0.0, 0.0)),
            visited: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            measurements: AtomicUsize::new(0),
        })
    }

    pub fn transport(self: &Arc<Self>) -> SimTransport {
        SimTransport {
            bench: self.clone(),
            notify: None,
            opened: false,
        }
    }

    pub fn stage(self: &Arc<Self>) -> SimStage {
        SimStage { bench: self.clone() }
    }

    /// Every frame the protocol client wrote, in order.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    /// Every position the stage was commanded to, in order.
    pub fn visited(&self) -> Vec<(f64, f64)> {
        self.visited.lock().unwrap().clone()
    }

    /// Number of measurement commands answered so far.
    pub fn measurements(&self) -> usize {
        self.measurements.load(Ordering::SeqCst)
    }

    fn reply_for(&self, frame: &[u8]) -> Vec<u8> {
        match frame.get(1).copied() {
            Some(CMD_MEASURE) => {
                let n = self.measurements.fetch_add(1, Ordering::SeqCst);
                if self.faults.fail_measure_at == Some(n) {
                    return vec![self.faults.measure_status];
                }
                let (x, y) = *self.position.lock().unwrap();
                let units = ((self.distance_at)(x, y) / MM_PER_UNIT).round() as i32;
                let mut reply = vec![0x00, 0x00];
                reply.extend_from_slice(&units.to_le_bytes());
                reply
            }
            Some(CMD_LASER_ON) => vec![0x00],
            _ => vec![0xFF],
        }
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

pub struct SimTransport {
    bench: Arc<SimBench>,
    notify: Option<mpsc::Sender<Bytes>>,
    opened: bool,
}

impl GattTransport for SimTransport {
    async fn open(&mut self, _link: &LinkConfig) -> Result<(), TransportError> {
        self.opened = true;
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Bytes>, TransportError> {
        if !self.opened {
            return Err(TransportError::LinkClosed);
        }
        let (tx, rx) = mpsc::channel(16);
        self.notify = Some(tx);
        Ok(rx)
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.bench.faults.reject_writes {
            return Err(TransportError::WriteRejected);
        }
        let notify = self.notify.as_ref().ok_or(TransportError::LinkClosed)?;
        self.bench.frames.lock().unwrap().push(frame.to_vec());
        let reply = self.bench.reply_for(frame);
        notify
            .send(Bytes::from(reply))
            .await
            .map_err(|_| TransportError::LinkClosed)
    }
}

// ── Stage ─────────────────────────────────────────────────────────────────────

pub struct SimStage {
    bench: Arc<SimBench>,
}

impl MotionStage for SimStage {
    async fn home(&mut self) -> Result<(), StageError> {
        if self.bench.faults.fail_home {
            return Err(StageError::CommandRejected {
                code: "G28".to_string(),
                status: 500,
            });
        }
        *self.bench.position.lock().unwrap() = (0.0, 0.0);
        Ok(())
    }

    async fn move_to(&mut self, target: MoveTarget) -> Result<(), StageError> {
        let position = {
            let mut position = self.bench.position.lock().unwrap();
            if let Some(x) = target.x {
                position.0 = x;
            }
            if let Some(y) = target.y {
                position.1 = y;
            }
            *position
        };
        self.bench.visited.lock().unwrap().push(position);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
