use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, RouteProfile, StereoMode, StreamConfig, StreamEndpoint, TunerError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tuner: TunerConfig,
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tuner: TunerConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads a JSON configuration file. Omitted fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that parse but would break the bring-up: a zero poll
    /// interval or stream geometry the audio transport cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.tuner.poll_interval_secs == 0 {
            return Err(TunerError::InvalidConfig(
                "tuner.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        self.audio
            .stream
            .validate()
            .map_err(|reason| TunerError::InvalidConfig(format!("audio.stream: {reason}")))
    }

    /// Whether the bring-up includes the audio route and stream phases.
    pub fn routing_enabled(&self) -> bool {
        self.audio.route != RouteProfile::None
    }
}

/// Target state driven into the tuner during bring-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub device: String,
    /// Station frequency in kHz.
    pub frequency_khz: u32,
    pub mode: StereoMode,
    pub volume: u8,
    pub poll_interval_secs: u64,
}

impl TunerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            device: "/dev/radio0".to_string(),
            frequency_khz: 104_400,
            mode: StereoMode::Stereo,
            volume: 255,
            poll_interval_secs: 5,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub route: RouteProfile,
    pub mixer_card: u32,
    pub capture: StreamEndpoint,
    pub playback: StreamEndpoint,
    pub stream: StreamConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            route: RouteProfile::Headphone,
            mixer_card: 0,
            capture: StreamEndpoint { card: 0, device: 6 },
            playback: StreamEndpoint { card: 0, device: 5 },
            stream: StreamConfig::default(),
        }
    }
}
