//! Motion stage client.
//!
//! The stage speaks a text command API over HTTP: a token handshake opens
//! the session, commands are submitted as G-code lines, and a liveness poll
//! runs roughly once per second while the session is open. Moves are
//! absolute and complete before `move_to` returns — the finish-moves wait
//! is part of the command sequence, not the caller's problem.

use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("stage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stage rejected session handshake with HTTP {status}")]
    HandshakeRejected { status: u16 },

    #[error("stage rejected '{code}' with HTTP {status}")]
    CommandRejected { code: String, status: u16 },

    #[error("stage session is not connected")]
    NotConnected,
}

// ── Motion interface ──────────────────────────────────────────────────────────

/// A linear move target. Omitted axes are not commanded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// Feed rate, mm/min.
    pub feed: Option<f64>,
    pub e: Option<f64>,
}

impl MoveTarget {
    /// An X/Y move at the given feed rate.
    pub fn xy(x: f64, y: f64, feed: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            feed: Some(feed),
            ..Self::default()
        }
    }

    /// Render as a G0 linear move.
    pub fn gcode(&self) -> String {
        let mut code = String::from("G0");
        if let Some(x) = self.x {
            code.push_str(&format!(" X{x}"));
        }
        if let Some(y) = self.y {
            code.push_str(&format!(" Y{y}"));
        }
        if let Some(z) = self.z {
            code.push_str(&format!(" Z{z}"));
        }
        if let Some(feed) = self.feed {
            code.push_str(&format!(" F{feed}"));
        }
        if let Some(e) = self.e {
            code.push_str(&format!(" E{e}"));
        }
        code
    }
}

/// Operations the scan orchestrator needs from a motion stage.
///
/// `move_to` returns only once the stage is idle at the target.
#[allow(async_fn_in_trait)]
pub trait MotionStage: Send {
    async fn home(&mut self) -> Result<(), StageError>;
    async fn move_to(&mut self, target: MoveTarget) -> Result<(), StageError>;
}

// ── HTTP client ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ConnectReply {
    /// Session token issued by the stage; replaces the shared secret.
    token: Option<String>,
}

pub struct HttpStage {
    base_url: String,
    token: String,
    client: reqwest::Client,
    keep_alive_period: Duration,
    keep_alive: Option<JoinHandle<()>>,
}

impl HttpStage {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
            keep_alive_period: Duration::from_secs(1),
            keep_alive: None,
        }
    }

    pub fn with_keep_alive_period(mut self, period: Duration) -> Self {
        self.keep_alive_period = period;
        self
    }

    /// Exchange the shared secret for a session token and start the
    /// liveness poll.
    pub async fn connect(&mut self) -> Result<(), StageError> {
        let reply = self
            .client
            .post(format!("{}/connect", self.base_url))
            .form(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = reply.status();
        if !status.is_success() {
            return Err(StageError::HandshakeRejected {
                status: status.as_u16(),
            });
        }

        let body: ConnectReply = reply.json().await?;
        if let Some(token) = body.token {
            self.token = token;
        }

        self.keep_alive = Some(tokio::spawn(keep_alive_loop(
            self.client.clone(),
            format!("{}/status", self.base_url),
            self.token.clone(),
            self.keep_alive_period,
        )));

        tracing::info!(base_url = %self.base_url, "stage session open");
        Ok(())
    }

    /// Stop the liveness poll and end the session.
    pub fn close(&mut self) {
        if let Some(keep_alive) = self.keep_alive.take() {
            keep_alive.abort();
            tracing::debug!("stage session closed");
        }
    }

    /// Submit one G-code line.
    async fn exec(&self, code: &str) -> Result<(), StageError> {
        if self.keep_alive.is_none() {
            return Err(StageError::NotConnected);
        }

        tracing::debug!(code, "stage exec");
        let reply = self
            .client
            .post(format!("{}/execute_code", self.base_url))
            .form(&[("token", self.token.as_str()), ("code", code)])
            .send()
            .await?;

        let status = reply.status();
        if !status.is_success() {
            return Err(StageError::CommandRejected {
                code: code.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl MotionStage for HttpStage {
    async fn home(&mut self) -> Result<(), StageError> {
        // Machine coordinates, millimeter units, auto-home, absolute positioning.
        for code in ["G53", "G21", "G28", "G90"] {
            self.exec(code).await?;
        }
        Ok(())
    }

    async fn move_to(&mut self, target: MoveTarget) -> Result<(), StageError> {
        self.exec(&target.gcode()).await?;
        // Finish moves: the stage acknowledges once motion is complete.
        self.exec("M400").await
    }
}

impl Drop for HttpStage {
    fn drop(&mut self) {
        self.close();
    }
}

/// Poll the stage's status endpoint until the session closes.
async fn keep_alive_loop(client: reqwest::Client, url: String, token: String, period: Duration) {
    let mut interval = time::interval(period);
    loop {
        interval.tick().await;
        match client.get(&url).query(&[("token", token.as_str())]).send().await {
            Ok(reply) => tracing::trace!(status = reply.status().as_u16(), "stage status poll"),
            Err(e) => tracing::warn!(error = %e, "stage status poll failed"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
