//! Serialized announcement queue
//!
//! A single consumer task speaks utterances one at a time, so two
//! announcements never overlap. The queue is bounded; when it is full the
//! newest utterance is dropped.

use crate::config::{SpeechConfig, VoiceConfig};
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use crate::sink::SpeechSink;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Count of utterances accepted but not yet spoken
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *self.count.lock()
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

/// Bounded single-consumer speech queue
pub struct AnnouncementQueue {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    pending: Arc<Pending>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
    capacity: usize,
}

impl AnnouncementQueue {
    /// Start the consumer task on the current tokio runtime
    pub fn start(engine: Arc<dyn TtsEngine>, config: &SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::Queue(format!("No tokio runtime for speech queue: {}", e)))?;

        let (tx, mut rx) = mpsc::channel::<String>(config.queue_size);
        let pending = Arc::new(Pending::default());
        let voice: VoiceConfig = config.voice.clone();

        let worker_pending = pending.clone();
        let worker = runtime.spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = engine.speak(&text, &voice).await {
                    warn!("Failed to speak {:?}: {}", text, e);
                }
                worker_pending.finish();
            }
            debug!("Announcement queue consumer stopped");
        });

        info!("Announcement queue started (capacity {})", config.queue_size);
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            pending,
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
            capacity: config.queue_size,
        })
    }

    /// Utterances accepted but not yet fully spoken
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Utterances rejected because the queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop accepting utterances and let the consumer drain for up to `grace`.
    ///
    /// Returns `true` if everything queued was spoken in time; otherwise the
    /// consumer is aborted.
    pub async fn close(&self, grace: Duration) -> bool {
        drop(self.sender.lock().take());

        let Some(mut handle) = self.worker.lock().take() else {
            return true;
        };

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(_) => {
                info!("Announcement queue drained");
                true
            }
            Err(_) => {
                warn!("Announcement queue did not drain within {:?}, aborting", grace);
                handle.abort();
                false
            }
        }
    }
}

impl SpeechSink for AnnouncementQueue {
    fn speak(&self, text: &str) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Announcement queue closed, dropping {:?}", text);
            return;
        };

        self.pending.add();
        match sender.try_send(text.to_string()) {
            Ok(()) => {}
            Err(TrySendError::Full(text)) => {
                self.pending.finish();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Announcement queue full, dropping {:?}", text);
            }
            Err(TrySendError::Closed(text)) => {
                self.pending.finish();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Announcement queue consumer gone, dropping {:?}", text);
            }
        }
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        self.pending.wait_idle(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_wait_idle_when_empty() {
        let pending = Pending::default();
        assert!(pending.wait_idle(Duration::from_millis(1)));
    }

    #[test]
    fn test_pending_wait_idle_times_out() {
        let pending = Pending::default();
        pending.add();
        assert!(!pending.wait_idle(Duration::from_millis(20)));
        pending.finish();
        assert!(pending.wait_idle(Duration::from_millis(1)));
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let engine: Arc<dyn TtsEngine> = Arc::new(crate::engines::log::LogTtsEngine::new());
        let result = AnnouncementQueue::start(engine, &SpeechConfig::default());
        assert!(matches!(result, Err(SpeechError::Queue(_))));
    }
}
