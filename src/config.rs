//! Configuration for the voice call HAL
//!
//! This module provides runtime configuration loading from JSON files, so
//! board-specific knobs (sound card, session count, voice stream shape,
//! loopback streams) can be changed without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::device::{PcmConfig, MAX_VOICE_SESSIONS};

/// Host-less loopback stream ids used when none are configured.
pub const DEFAULT_LOOPBACK_RX_DEVICE: u32 = 6;
pub const DEFAULT_LOOPBACK_TX_DEVICE: u32 = 7;

/// Complete HAL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalConfig {
    /// Sound card every voice stream is opened on
    #[serde(default)]
    pub snd_card: u32,
    #[serde(default)]
    pub voice: VoiceConfig,
}

/// Voice path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Session slots allocated when the multi-session extension is present
    pub max_voice_sessions: usize,
    /// Volume restored at init, on the caller scale (0 silent, 1 loud)
    pub default_volume: f32,
    /// Arm microphone-break detection when a call starts
    pub mic_break_enabled: bool,
    /// Shape of the voice rx/tx streams; the rate may be overridden by the platform
    pub pcm: PcmConfig,
    pub loopback: LoopbackConfig,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_voice_sessions: MAX_VOICE_SESSIONS,
            default_volume: 1.0,
            mic_break_enabled: false,
            pcm: PcmConfig::VOICE_CALL,
            loopback: LoopbackConfig::default(),
        }
    }
}

/// Host-less loopback streams opened next to the primary voice pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    pub enabled: bool,
    pub rx_device: u32,
    pub tx_device: u32,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rx_device: DEFAULT_LOOPBACK_RX_DEVICE,
            tx_device: DEFAULT_LOOPBACK_TX_DEVICE,
        }
    }
}

impl Default for HalConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            snd_card: 0,
            voice: VoiceConfig::default(),
        }
    }
}

impl HalConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file is missing or the
    /// JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }),
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(contents)?;
        log::info!(
            "[Config] Loaded configuration (card {}, {} voice sessions)",
            config.snd_card,
            config.voice.max_voice_sessions
        );
        Ok(config)
    }

    /// Load configuration from the vendor partition
    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        Self::load_from_file("/vendor/etc/voice_hal.json")
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/voice_hal.json")
    }
}
