//! Two-role pointing pipeline
//!
//! The capture role reads frames, publishes them, renders the latest
//! detection and drives the announcer. The detection role, on its own
//! thread, always works on the most recent frame and publishes the result.
//! The roles share one small mutex-guarded region; nothing is queued, so slow
//! inference never holds up frame acquisition.

use crate::camera::FrameSource;
use crate::config::VisionConfig;
use crate::display::FrameDisplay;
use crate::error::VisionError;
use crate::models::{DetectionModel, LandmarkModel};
use crate::navigation::Navigator;
use crate::overlay::Overlay;
use crate::processing::{resolve, DetectorSettings, HandPointingDetector, ObjectDetector};
use parking_lot::Mutex;
use pointer_core::{DetectionResult, Error as CoreError, Frame, ShutdownSignal};
use pointer_spk::{DebounceAnnouncer, SpeechSink};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const STARTED_MESSAGE: &str = "Point object detection started.";
pub const STOPPED_MESSAGE: &str = "Point object detection stopped";
pub const CAMERA_UNAVAILABLE_MESSAGE: &str = "Camera not available.";

const DETECTION_THREAD_NAME: &str = "pointer-detect";

/// Why a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The shutdown signal was observed
    Shutdown,
    /// A frame read failed mid-session
    CameraLost,
}

#[derive(Default)]
struct Slots {
    frame: Option<Arc<Frame>>,
    detection: Option<Arc<DetectionResult>>,
    failure: Option<VisionError>,
}

/// The region both roles share: latest frame, latest detection and a
/// detection failure slot. Every access holds the lock for a pointer copy.
#[derive(Clone, Default)]
pub struct SharedState {
    slots: Arc<Mutex<Slots>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_frame(&self, frame: Arc<Frame>) {
        self.slots.lock().frame = Some(frame);
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.slots.lock().frame.clone()
    }

    pub fn publish_detection(&self, result: DetectionResult) {
        self.slots.lock().detection = Some(Arc::new(result));
    }

    pub fn latest_detection(&self) -> Option<Arc<DetectionResult>> {
        self.slots.lock().detection.clone()
    }

    fn record_failure(&self, err: VisionError) {
        self.slots.lock().failure = Some(err);
    }

    fn take_failure(&self) -> Option<VisionError> {
        self.slots.lock().failure.take()
    }

    pub fn has_failed(&self) -> bool {
        self.slots.lock().failure.is_some()
    }
}

/// Hand tracking, object detection and resolution for one frame
pub struct FrameProcessor {
    hand: HandPointingDetector,
    objects: ObjectDetector,
    filter_above_fingertip: bool,
    exclude_hand_region: bool,
}

impl FrameProcessor {
    pub fn new(
        config: &VisionConfig,
        landmark_model: Box<dyn LandmarkModel>,
        detection_model: Box<dyn DetectionModel>,
    ) -> Self {
        Self {
            hand: HandPointingDetector::new(landmark_model, config.smoothing_alpha),
            objects: ObjectDetector::new(detection_model, DetectorSettings::from(config)),
            filter_above_fingertip: config.filter_above_fingertip,
            exclude_hand_region: config.exclude_hand_region,
        }
    }

    /// Objects are only detected once a pointing fingertip is found.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<DetectionResult, VisionError> {
        let Some(gesture) = self.hand.detect(frame)? else {
            return Ok(DetectionResult::empty(frame.sequence));
        };

        let fingertip_filter = self.filter_above_fingertip.then_some(gesture.fingertip);
        let hand_filter = self.exclude_hand_region.then_some(gesture.hand_box);
        let detections = self.objects.detect(frame, fingertip_filter, hand_filter)?;
        let pointed = resolve(gesture.fingertip, &detections);

        debug!(
            "Frame {}: fingertip {}, {} detections, pointed {:?}",
            frame.sequence,
            gesture.fingertip,
            detections.len(),
            pointed.as_ref().map(|p| p.label())
        );
        Ok(DetectionResult {
            pointed,
            fingertip: Some(gesture.fingertip),
            frame_sequence: frame.sequence,
        })
    }
}

struct DetectionWorker {
    processor: FrameProcessor,
    shared: SharedState,
    shutdown: ShutdownSignal,
    idle_backoff: Duration,
}

impl DetectionWorker {
    fn run(mut self) {
        info!("Detection role started");
        let mut last_sequence = None;

        while !self.shutdown.is_cancelled() {
            let frame = match self.shared.latest_frame() {
                Some(frame) if last_sequence != Some(frame.sequence) => frame,
                _ => {
                    thread::sleep(self.idle_backoff);
                    continue;
                }
            };
            last_sequence = Some(frame.sequence);

            match self.processor.process_frame(&frame) {
                Ok(result) => self.shared.publish_detection(result),
                Err(e) => {
                    error!("Detection failed on frame {}: {}", frame.sequence, e);
                    self.shared.record_failure(e);
                    return;
                }
            }
        }
        info!("Detection role stopped");
    }
}

/// Owns everything a pointing session needs
pub struct PointingPipeline {
    config: VisionConfig,
    processor: FrameProcessor,
    shared: SharedState,
}

impl PointingPipeline {
    pub fn new(
        config: VisionConfig,
        landmark_model: Box<dyn LandmarkModel>,
        detection_model: Box<dyn DetectionModel>,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        let processor = FrameProcessor::new(&config, landmark_model, detection_model);
        Ok(Self {
            config,
            processor,
            shared: SharedState::new(),
        })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Handle to the shared region, for observers
    pub fn shared(&self) -> SharedState {
        self.shared.clone()
    }

    /// Run a session until shutdown, camera loss or a detection failure.
    ///
    /// Blocks the calling thread with the capture role. On every exit path the
    /// stop message is spoken, speech gets up to the configured grace period,
    /// then the source is released and the display closed.
    pub fn run(
        self,
        mut source: Box<dyn FrameSource>,
        mut display: Box<dyn FrameDisplay>,
        sink: Arc<dyn SpeechSink>,
        shutdown: ShutdownSignal,
    ) -> Result<SessionOutcome, VisionError> {
        let Self {
            config,
            processor,
            shared,
        } = self;

        info!("Pointing session starting on {}", source.describe());
        sink.speak(STARTED_MESSAGE);

        let worker = DetectionWorker {
            processor,
            shared: shared.clone(),
            shutdown: shutdown.clone(),
            idle_backoff: config.idle_backoff(),
        };
        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(DETECTION_THREAD_NAME.to_string())
            .spawn(move || {
                // A panic must end the session like any other detection failure
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| worker.run())) {
                    let message = panic_message(payload.as_ref());
                    error!("Detection role panicked: {}", message);
                    worker_shared.record_failure(
                        CoreError::Concurrency(format!("Detection role panicked: {}", message)).into(),
                    );
                }
            })
            .map_err(|e| CoreError::Concurrency(format!("Failed to spawn detection thread: {}", e)))?;

        let mut capture = CaptureLoop {
            announcer: DebounceAnnouncer::new(sink.clone(), config.announce_interval()),
            guidance: config.guidance,
            shared: shared.clone(),
            shutdown: shutdown.clone(),
        };
        let outcome = capture.run(source.as_mut(), display.as_mut());

        // Stop the detection role whatever ended the capture loop
        shutdown.cancel();
        sink.speak(STOPPED_MESSAGE);

        let joined = handle.join();
        if !sink.wait_idle(config.shutdown_grace()) {
            warn!("Speech did not drain within {:?}", config.shutdown_grace());
        }
        source.release();
        display.close();

        if joined.is_err() {
            return Err(CoreError::Concurrency("Detection thread panicked".to_string()).into());
        }
        if let Some(failure) = shared.take_failure() {
            return Err(failure);
        }
        let outcome = outcome?;
        info!("Pointing session ended: {:?}", outcome);
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct CaptureLoop {
    announcer: DebounceAnnouncer,
    guidance: bool,
    shared: SharedState,
    shutdown: ShutdownSignal,
}

impl CaptureLoop {
    fn run(
        &mut self,
        source: &mut dyn FrameSource,
        display: &mut dyn FrameDisplay,
    ) -> Result<SessionOutcome, VisionError> {
        loop {
            if self.shutdown.is_cancelled() {
                info!("Shutdown requested");
                return Ok(SessionOutcome::Shutdown);
            }
            if self.shared.has_failed() {
                // The failure itself is reported by the caller
                return Ok(SessionOutcome::Shutdown);
            }

            let Some(frame) = source.capture() else {
                error!("Could not read frame from {}", source.describe());
                return Ok(SessionOutcome::CameraLost);
            };
            let frame = Arc::new(frame);
            self.shared.publish_frame(frame.clone());

            let detection = self.shared.latest_detection();
            let overlay = Overlay::from_result(detection.as_deref());

            let mut image = frame.image.clone();
            overlay.draw(&mut image);
            if let Err(e) = display.show(&image, &overlay) {
                warn!("Display failed: {}", e);
            }

            let pointed = detection.as_ref().and_then(|d| d.pointed.as_ref());
            let spoken = self.announcer.announce(pointed.map(|p| p.label()));
            if spoken && self.guidance {
                if let Some(pointed) = pointed {
                    let navigator = Navigator::new(frame.width(), frame.height());
                    let instruction = navigator.instruction(pointed.fingertip, &pointed.bbox());
                    self.announcer.sink().speak(&instruction);
                }
            }
        }
    }
}
