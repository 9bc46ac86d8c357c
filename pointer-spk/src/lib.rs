//! pointer-spk: Speech output for the pointing pipeline
//!
//! Provides:
//! - the `SpeechSink` capability the pipeline speaks through
//! - native TTS engines (espeak-ng / say) plus a log-only engine
//! - a serialized, bounded announcement queue so utterances never overlap
//! - the debounce state machine deciding when a pointed-at label is spoken

pub mod announcer;
pub mod config;
pub mod engines;
pub mod error;
pub mod queue;
pub mod sink;

pub use announcer::{AnnouncementState, DebounceAnnouncer};
pub use config::{SpeechConfig, TtsEngine, VoiceConfig};
pub use engines::TtsEngine as TtsEngineTrait;
pub use error::SpeechError;
pub use queue::AnnouncementQueue;
pub use sink::SpeechSink;
