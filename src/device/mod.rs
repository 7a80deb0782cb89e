//! Device context: the caller-owned state every voice operation works on.
//!
//! Nothing in this crate keeps process-wide statics; the audio-I/O layer owns
//! one [`AudioDevice`], serializes access to it, and passes it by reference
//! into the [`VoiceController`](crate::voice::VoiceController).

pub mod session;
pub mod types;
pub mod usecase;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::HalConfig;
use crate::engine::backend::PcmHandle;

pub use session::{
    CallState, SessionState, TtyMode, VoiceSession, VoiceState, MAX_VOICE_SESSIONS,
    TTY_MODE_CLEAR, VOICE_SESS_IDX, VOICE_VSID,
};
pub use types::{
    AudioDeviceType, AudioFormat, AudioMode, AudioSource, MuteDirection, PcmConfig,
    PcmDirection, RecordingSource, SndDevice, UsecaseId, UsecaseType,
};
pub use usecase::{Usecase, UsecaseList};

/// Output stream currently carrying the call, as chosen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutput {
    pub devices: Vec<AudioDeviceType>,
}

impl CallOutput {
    pub fn new(devices: Vec<AudioDeviceType>) -> Self {
        Self { devices }
    }

    pub fn single(device: AudioDeviceType) -> Self {
        Self {
            devices: vec![device],
        }
    }
}

/// Host-less loopback pair opened next to the primary voice streams.
#[derive(Debug, Default)]
pub struct LoopbackStreams {
    pub rx: Option<PcmHandle>,
    pub tx: Option<PcmHandle>,
}

impl LoopbackStreams {
    pub fn is_open(&self) -> bool {
        self.rx.is_some() || self.tx.is_some()
    }
}

/// Mutable audio device state shared by the voice path.
#[derive(Debug)]
pub struct AudioDevice {
    pub mode: AudioMode,
    pub voice: VoiceState,
    pub usecases: UsecaseList,
    pub current_call_output: Option<CallOutput>,
    pub bt_sco_on: bool,
    pub snd_card: u32,
    pub mic_break_enabled: bool,
    pub acdb_settings: u32,
    pub loopback: LoopbackStreams,
}

impl AudioDevice {
    pub fn new(snd_card: u32) -> Self {
        Self {
            mode: AudioMode::Normal,
            voice: VoiceState::default(),
            usecases: UsecaseList::new(),
            current_call_output: None,
            bt_sco_on: false,
            snd_card,
            mic_break_enabled: false,
            acdb_settings: TtyMode::Off.acdb_bits(),
            loopback: LoopbackStreams::default(),
        }
    }

    pub fn from_config(config: &HalConfig) -> Self {
        let mut dev = Self::new(config.snd_card);
        dev.mic_break_enabled = config.voice.mic_break_enabled;
        dev
    }

    pub fn is_in_call_mode(&self) -> bool {
        self.mode == AudioMode::InCall
    }

    /// Stream handles still owned by the device: session legs plus loopback.
    pub fn held_stream_count(&self) -> usize {
        let sessions: usize = self
            .voice
            .sessions()
            .map(|s| usize::from(s.pcm_rx.is_some()) + usize::from(s.pcm_tx.is_some()))
            .sum();
        sessions
            + usize::from(self.loopback.rx.is_some())
            + usize::from(self.loopback.tx.is_some())
    }
}

// Handles can only be released through the `PcmProvider` that opened them,
// so a device dropped mid-call leaks them. Call `VoiceController::shutdown`
// first.
impl Drop for AudioDevice {
    fn drop(&mut self) {
        let held = self.held_stream_count();
        if held > 0 {
            warn!("AudioDevice dropped holding {} open stream(s)", held);
        }
    }
}

impl Default for AudioDevice {
    fn default() -> Self {
        Self::new(0)
    }
}
