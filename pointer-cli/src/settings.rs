//! Layered settings: defaults, config file, environment, command line

use crate::Cli;
use pointer_eye::VisionConfig;
use pointer_spk::{SpeechConfig, TtsEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_CAMERA: &str = "POINTER_CAMERA";
pub const ENV_MODEL: &str = "POINTER_MODEL";
pub const ENV_PALM_MODEL: &str = "POINTER_PALM_MODEL";
pub const ENV_HAND_MODEL: &str = "POINTER_HAND_MODEL";
pub const ENV_LOG_LEVEL: &str = "POINTER_LOG_LEVEL";

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for {name}: {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Everything the binary needs to run a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vision: VisionConfig,
    pub speech: SpeechConfig,
    pub log_level: String,
    /// Created by an external controller to request shutdown
    pub stop_file: PathBuf,
    /// Replay images from this directory instead of opening a camera
    pub frames_dir: Option<PathBuf>,
    pub loop_frames: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vision: VisionConfig::default(),
            speech: SpeechConfig::default(),
            log_level: "info".to_string(),
            stop_file: PathBuf::from("stop_pointer.txt"),
            frames_dir: None,
            loop_frames: false,
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then environment, then flags
    pub fn load(cli: &Cli) -> Result<Self, SettingsError> {
        let mut settings = match cli.config.clone().or_else(default_config_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse JSON or TOML, whichever matches
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        if let Ok(settings) = serde_json::from_str::<Settings>(content) {
            return Ok(settings);
        }
        toml::from_str::<Settings>(content)
            .map_err(|e| SettingsError::Parse(format!("not valid JSON or TOML: {}", e)))
    }

    /// Apply `POINTER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CAMERA) {
            self.vision.camera_id = value.trim().parse().map_err(|_| SettingsError::Env {
                name: ENV_CAMERA,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_MODEL) {
            self.vision.model_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_PALM_MODEL) {
            self.vision.palm_model_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_HAND_MODEL) {
            self.vision.hand_model_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value.trim().to_lowercase();
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(camera) = cli.camera {
            self.vision.camera_id = camera;
        }
        if let Some(ref model) = cli.model {
            self.vision.model_path = model.clone();
        }
        if let Some(ref palm_model) = cli.palm_model {
            self.vision.palm_model_path = palm_model.clone();
        }
        if let Some(ref hand_model) = cli.hand_model {
            self.vision.hand_model_path = hand_model.clone();
        }
        if let Some(ref frames_dir) = cli.frames_dir {
            self.frames_dir = Some(frames_dir.clone());
        }
        if cli.loop_frames {
            self.loop_frames = true;
        }
        if let Some(ref stop_file) = cli.stop_file {
            self.stop_file = stop_file.clone();
        }
        if cli.headless {
            self.vision.display = false;
        }
        if cli.guidance {
            self.vision.guidance = true;
        }
        if cli.silent {
            self.speech.engine = TtsEngine::Log;
        }
        if let Some(ref level) = cli.log_level {
            self.log_level = level.to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.vision.validate().map_err(SettingsError::Validation)?;
        self.speech.validate().map_err(SettingsError::Validation)?;
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(SettingsError::Validation(format!(
                "Unknown log level {:?} (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.stop_file.as_os_str().is_empty() {
            return Err(SettingsError::Validation("Stop file path cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// `<config dir>/pointer/config.toml`, when it exists
fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("pointer").join("config.toml");
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.stop_file, PathBuf::from("stop_pointer.txt"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "debug"

[vision]
camera_id = 1
excluded_labels = ["person", "dining table"]
guidance = true

[speech]
rate = 170
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.vision.camera_id, 1);
        assert!(settings.vision.excluded_labels.contains("dining table"));
        assert!(settings.vision.guidance);
        assert_eq!(settings.speech.rate, 170);
        assert_eq!(settings.vision.confidence_threshold, 0.4);
    }

    #[test]
    fn test_json_content() {
        let settings = Settings::from_str(r#"{"vision": {"min_box_size": 20}, "loop_frames": true}"#).unwrap();
        assert_eq!(settings.vision.min_box_size, 20);
        assert!(settings.loop_frames);
    }

    #[test]
    fn test_unparseable_content() {
        assert!(matches!(Settings::from_str("vision = [1, 2"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::from_file(Path::new("/nonexistent/pointer.toml"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                (ENV_CAMERA, "2"),
                (ENV_MODEL, "/models/yolov8s.onnx"),
                (ENV_LOG_LEVEL, "WARN"),
            ]))
            .unwrap();
        assert_eq!(settings.vision.camera_id, 2);
        assert_eq!(settings.vision.model_path, PathBuf::from("/models/yolov8s.onnx"));
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_env_invalid_camera() {
        let mut settings = Settings::default();
        let result = settings.apply_env(env(&[(ENV_CAMERA, "front")]));
        assert!(matches!(result, Err(SettingsError::Env { name: ENV_CAMERA, .. })));
    }

    #[test]
    fn test_cli_beats_env() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[(ENV_CAMERA, "2")])).unwrap();
        let cli = Cli::parse_from(["pointer", "--camera", "3", "--headless", "--silent"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.vision.camera_id, 3);
        assert!(!settings.vision.display);
        assert_eq!(settings.speech.engine, TtsEngine::Log);
    }

    #[test]
    fn test_load_with_config_flag() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[vision]\ncamera_id = 4").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["pointer", "--config", path.as_str(), "--frames-dir", "/tmp/frames"]);
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(settings.frames_dir, Some(PathBuf::from("/tmp/frames")));
    }

    #[test]
    fn test_palm_model_from_env_and_flag() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[(ENV_PALM_MODEL, "/models/palm_env.onnx")]))
            .unwrap();
        assert_eq!(settings.vision.palm_model_path, PathBuf::from("/models/palm_env.onnx"));

        let cli = Cli::parse_from(["pointer", "--palm-model", "/models/palm_full.onnx"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.vision.palm_model_path, PathBuf::from("/models/palm_full.onnx"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.log_level = "loud".to_string();
        assert!(matches!(settings.validate(), Err(SettingsError::Validation(_))));
    }
}
