//! Edge case tests for pointer-spk configuration and debouncing

use pointer_spk::announcer::AnnouncementState;
use pointer_spk::config::{SpeechConfig, VoiceConfig};
use std::time::{Duration, Instant};

#[test]
fn test_config_boundary_values() {
    let mut config = SpeechConfig::default();
    config.rate = 0;
    config.volume = 0.0;
    config.pitch = -1.0;
    config.queue_size = 1;
    assert!(config.validate().is_ok());

    config.rate = 500;
    config.volume = 1.0;
    config.pitch = 1.0;
    config.queue_size = 1024;
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_just_over_boundary() {
    let mut config = SpeechConfig::default();
    config.volume = 1.0001;
    assert!(config.validate().is_err());

    config.volume = 1.0;
    config.pitch = 1.0001;
    assert!(config.validate().is_err());
}

#[test]
fn test_voice_config_max_length_language() {
    let mut voice = VoiceConfig::default();
    voice.language = "a".repeat(32);
    assert!(voice.validate().is_ok());
    voice.language = "a".repeat(33);
    assert!(voice.validate().is_err());
}

#[test]
fn test_zero_interval_speaks_every_repeat() {
    let mut state = AnnouncementState::new(Duration::ZERO);
    let t0 = Instant::now();
    assert!(!state.observe(Some("cup"), t0));
    assert!(state.observe(Some("cup"), t0));
    assert!(state.observe(Some("cup"), t0));
}

#[test]
fn test_alternating_labels_never_speak() {
    let mut state = AnnouncementState::new(Duration::from_secs(1));
    let t0 = Instant::now();
    for i in 0..20u64 {
        let label = if i % 2 == 0 { "cup" } else { "book" };
        assert!(!state.observe(Some(label), t0 + Duration::from_secs(i * 2)));
    }
}
