//! Pipeline runs over an image sequence on disk

use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use pointer_core::{Detection, Frame, HandLandmarks, ShutdownSignal};
use pointer_eye::{
    DetectionModel, HeadlessDisplay, ImageSequenceSource, LandmarkModel, PointingPipeline,
    SessionOutcome, VisionConfig, VisionError,
};
use pointer_spk::SpeechSink;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct CountingSink {
    spoken: Mutex<Vec<String>>,
}

impl SpeechSink for CountingSink {
    fn speak(&self, text: &str) {
        self.spoken.lock().push(text.to_string());
    }

    fn wait_idle(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Records the size of every frame it is shown
#[derive(Clone, Default)]
struct SizeRecorder(Arc<Mutex<Vec<(u32, u32)>>>);

impl LandmarkModel for SizeRecorder {
    fn detect_hand(&mut self, frame: &Frame) -> Result<Option<HandLandmarks>, VisionError> {
        self.0.lock().push((frame.width(), frame.height()));
        Ok(None)
    }
}

struct NoObjects;

impl DetectionModel for NoObjects {
    fn infer(&mut self, _frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        Ok(Vec::new())
    }
}

#[test]
fn test_sequence_end_is_camera_lost() {
    let dir = TempDir::new().unwrap();
    for i in 0..3 {
        RgbImage::from_pixel(32, 24, Rgb([i * 40, 0, 0]))
            .save(dir.path().join(format!("frame_{:03}.png", i)))
            .unwrap();
    }

    let recorder = SizeRecorder::default();
    let config = VisionConfig {
        display: false,
        shutdown_grace_ms: 10,
        ..VisionConfig::default()
    };
    let pipeline = PointingPipeline::new(config, Box::new(recorder.clone()), Box::new(NoObjects)).unwrap();
    let source = ImageSequenceSource::open(dir.path(), false).unwrap();
    let sink = Arc::new(CountingSink::default());

    let outcome = pipeline
        .run(
            Box::new(source),
            Box::new(HeadlessDisplay::new()),
            sink.clone(),
            ShutdownSignal::new(),
        )
        .unwrap();

    assert_eq!(outcome, SessionOutcome::CameraLost);
    assert!(recorder.0.lock().iter().all(|&size| size == (32, 24)));
    assert_eq!(sink.spoken.lock().len(), 2);
}

#[test]
fn test_looping_sequence_runs_until_shutdown() {
    let dir = TempDir::new().unwrap();
    RgbImage::new(16, 16).save(dir.path().join("a.png")).unwrap();

    let config = VisionConfig {
        display: false,
        shutdown_grace_ms: 10,
        ..VisionConfig::default()
    };
    let recorder = SizeRecorder::default();
    let pipeline = PointingPipeline::new(config, Box::new(recorder.clone()), Box::new(NoObjects)).unwrap();
    let source = ImageSequenceSource::open(dir.path(), true).unwrap();

    let shutdown = ShutdownSignal::new();
    let trigger = shutdown.clone();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let outcome = pipeline
        .run(
            Box::new(source),
            Box::new(HeadlessDisplay::new()),
            Arc::new(CountingSink::default()),
            shutdown,
        )
        .unwrap();
    stopper.join().unwrap();

    assert_eq!(outcome, SessionOutcome::Shutdown);
    assert!(!recorder.0.lock().is_empty());
}
