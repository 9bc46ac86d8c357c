//! Native platform TTS engine

use crate::config::VoiceConfig;
use crate::engines::{sanitize_text, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Native TTS engine (platform-specific command-line synthesizer)
pub struct NativeTtsEngine {
    #[cfg(target_os = "linux")]
    synthesizer: Option<linux::EspeakEngine>,

    #[cfg(target_os = "macos")]
    synthesizer: Option<macos::SayEngine>,

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    synthesizer: Option<()>,

    rate: u32,
    volume: f32,
    pitch: f32,
}

#[async_trait]
impl TtsEngine for NativeTtsEngine {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        let sanitized = sanitize_text(text);
        if sanitized.is_empty() {
            return Err(SpeechError::Engine("Text is empty after sanitization".to_string()));
        }
        debug!("Speaking {:?} via {}", sanitized, self.name());

        #[cfg(target_os = "linux")]
        {
            if let Some(ref synth) = self.synthesizer {
                return linux::speak(synth, &sanitized, voice, self.rate, self.volume, self.pitch).await;
            }
        }

        #[cfg(target_os = "macos")]
        {
            if let Some(ref synth) = self.synthesizer {
                return macos::speak(synth, &sanitized, voice, self.rate).await;
            }
        }

        let _ = voice;
        Err(SpeechError::Engine("Native TTS engine not available".to_string()))
    }

    fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    fn name(&self) -> &str {
        "native"
    }
}

impl NativeTtsEngine {
    pub fn new() -> Self {
        Self::new_with_config(150, 1.0, 0.0)
    }

    pub fn new_with_config(rate: u32, volume: f32, pitch: f32) -> Self {
        #[cfg(target_os = "linux")]
        let synthesizer = linux::EspeakEngine::detect();

        #[cfg(target_os = "macos")]
        let synthesizer = macos::SayEngine::detect();

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        let synthesizer: Option<()> = {
            warn!("Native TTS not supported on this platform");
            None
        };

        if synthesizer.is_some() {
            info!("Native TTS engine initialized");
        } else {
            warn!("Native TTS engine not found on this host");
        }

        Self {
            synthesizer,
            rate,
            volume,
            pitch,
        }
    }
}

impl Default for NativeTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// espeak-ng amplitude from a 0.0-1.0 volume; full volume is espeak's
/// normal level (100), louder settings clip
pub(crate) fn espeak_amplitude(volume: f32) -> u32 {
    ((volume * 100.0).round().max(0.0) as u32).min(100)
}

/// espeak-ng pitch (0-99, 50 normal) from a -1.0..1.0 adjustment
pub(crate) fn espeak_pitch(pitch: f32) -> u32 {
    ((50.0 + pitch * 49.0).round().max(0.0) as u32).min(99)
}

#[cfg(target_os = "linux")]
mod linux {
    use super::*;
    use tokio::process::Command;

    pub struct EspeakEngine;

    impl EspeakEngine {
        pub fn detect() -> Option<Self> {
            std::process::Command::new("espeak-ng")
                .arg("--version")
                .output()
                .ok()
                .filter(|output| output.status.success())
                .map(|_| Self)
        }
    }

    pub async fn speak(
        _synth: &EspeakEngine,
        text: &str,
        voice: &VoiceConfig,
        rate: u32,
        volume: f32,
        pitch: f32,
    ) -> Result<(), SpeechError> {
        let mut cmd = Command::new("espeak-ng");
        cmd.arg("-s").arg(rate.to_string());
        cmd.arg("-a").arg(espeak_amplitude(volume).to_string());
        cmd.arg("-p").arg(espeak_pitch(pitch).to_string());

        let voice_name = voice.name.as_deref().unwrap_or(&voice.language);
        cmd.arg("-v").arg(voice_name);
        cmd.arg("--").arg(text);

        let output = cmd
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to run espeak-ng: {}", e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "espeak-ng failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use super::*;
    use tokio::process::Command;

    pub struct SayEngine;

    impl SayEngine {
        pub fn detect() -> Option<Self> {
            std::process::Command::new("say")
                .arg("-v")
                .arg("?")
                .output()
                .ok()
                .filter(|output| output.status.success())
                .map(|_| Self)
        }
    }

    pub async fn speak(
        _synth: &SayEngine,
        text: &str,
        voice: &VoiceConfig,
        rate: u32,
    ) -> Result<(), SpeechError> {
        let mut cmd = Command::new("say");
        if let Some(ref name) = voice.name {
            let sanitized_voice: String = name
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
                .take(256)
                .collect();
            if !sanitized_voice.is_empty() {
                cmd.arg("-v").arg(sanitized_voice);
            }
        }
        // say has no volume or pitch flags
        cmd.arg("-r").arg(rate.min(500).to_string());
        cmd.arg("--").arg(text);

        let output = cmd
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to execute say command: {}", e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "say command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}
