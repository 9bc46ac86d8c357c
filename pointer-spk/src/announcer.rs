//! Debounced announcement of pointed-at labels
//!
//! A label is never spoken the first time it shows up. It is spoken once the
//! same label has been held for a full interval since it last changed, and at
//! most once per interval after that.

use crate::sink::SpeechSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Last announced label and when it was announced or last changed
#[derive(Debug, Clone)]
pub struct AnnouncementState {
    last_label: Option<String>,
    last_time: Option<Instant>,
    interval: Duration,
}

impl AnnouncementState {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_label: None,
            last_time: None,
            interval,
        }
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Feed one cycle's label. Returns `true` when the label should be spoken.
    pub fn observe(&mut self, label: Option<&str>, now: Instant) -> bool {
        let Some(label) = label else {
            return false;
        };

        if self.last_label.as_deref() != Some(label) {
            self.last_label = Some(label.to_string());
            self.last_time = Some(now);
            return false;
        }

        let due = match self.last_time {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if due {
            self.last_time = Some(now);
        }
        due
    }
}

/// Debounce state wired to a speech sink
pub struct DebounceAnnouncer {
    state: AnnouncementState,
    sink: Arc<dyn SpeechSink>,
}

impl DebounceAnnouncer {
    pub fn new(sink: Arc<dyn SpeechSink>, interval: Duration) -> Self {
        Self {
            state: AnnouncementState::new(interval),
            sink,
        }
    }

    pub fn state(&self) -> &AnnouncementState {
        &self.state
    }

    pub fn sink(&self) -> &Arc<dyn SpeechSink> {
        &self.sink
    }

    /// Observe `label` now; speaks it when due. Returns whether it was spoken.
    pub fn announce(&mut self, label: Option<&str>) -> bool {
        self.announce_at(label, Instant::now())
    }

    pub fn announce_at(&mut self, label: Option<&str>, now: Instant) -> bool {
        if !self.state.observe(label, now) {
            return false;
        }
        if let Some(label) = label {
            debug!("Announcing {:?}", label);
            self.sink.speak(label);
        }
        true
    }
}
