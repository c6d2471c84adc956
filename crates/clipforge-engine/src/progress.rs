//! Session events and their broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::Phase;

/// Default broadcast capacity.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Convert an engine completion ratio to a whole percentage.
///
/// Engines overshoot and sometimes report garbage, so the ratio is clamped to
/// `[0, 1]`; non-finite ratios count as zero.
pub fn percent_from_ratio(ratio: f64) -> u8 {
    if !ratio.is_finite() {
        return 0;
    }
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Something observers of a session may care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session entered a new phase.
    Phase { phase: Phase },
    /// Run progress, 0-100.
    Progress { percent: u8 },
    /// A log line relayed verbatim from the engine.
    Log { line: String },
    /// A run produced an output.
    OutputReady { id: u64, name: String, bytes: u64 },
    /// An output was released.
    OutputReleased { id: u64 },
}

/// Broadcast fan-out of [`SessionEvent`]s.
///
/// Sending never fails: with no subscribers the event is simply dropped.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<SessionEvent>,
}

impl ProgressChannel {
    /// Create a channel buffering up to `capacity` events per lagging receiver.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects that.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send an event to every subscriber.
    pub fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for session event");
        }
    }

    pub fn phase(&self, phase: Phase) {
        self.emit(SessionEvent::Phase { phase });
    }

    pub fn progress(&self, percent: u8) {
        self.emit(SessionEvent::Progress { percent });
    }

    pub fn log(&self, line: impl Into<String>) {
        self.emit(SessionEvent::Log { line: line.into() });
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
