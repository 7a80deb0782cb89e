//! Per-call-leg session slots and the process-wide voice state.

use serde::{Deserialize, Serialize};

use crate::engine::backend::PcmHandle;

/// Default voice-session identifier for the primary call leg.
pub const VOICE_VSID: u32 = 0x10C0_1000;

/// Slot used when the multi-session extension is unavailable.
pub const VOICE_SESS_IDX: usize = 0;

/// Upper bound of concurrently supported call legs.
pub const MAX_VOICE_SESSIONS: usize = 7;

/// Bits of `acdb_settings` owned by the TTY mode.
pub const TTY_MODE_CLEAR: u32 = 0xFFFF_FFF0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Inactive,
    Active,
}

/// Teletypewriter mode, encoded as the calibration bit it contributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtyMode {
    #[default]
    Off,
    Full,
    Vco,
    Hco,
}

impl TtyMode {
    pub fn acdb_bits(self) -> u32 {
        match self {
            TtyMode::Off => 0x1,
            TtyMode::Full => 0x2,
            TtyMode::Vco => 0x4,
            TtyMode::Hco => 0x8,
        }
    }
}

/// Requested vs. applied state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current: CallState,
    /// Set by the telephony layer; consumed by a multi-session call update.
    pub new: CallState,
}

/// One call leg. Owns its stream handles only while active.
#[derive(Debug)]
pub struct VoiceSession {
    index: usize,
    pub vsid: u32,
    pub state: SessionState,
    pub pcm_rx: Option<PcmHandle>,
    pub pcm_tx: Option<PcmHandle>,
}

impl VoiceSession {
    fn new(index: usize) -> Self {
        Self {
            index,
            vsid: VOICE_VSID,
            state: SessionState::default(),
            pcm_rx: None,
            pcm_tx: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.state.current == CallState::Active
    }

    pub fn holds_streams(&self) -> bool {
        self.pcm_rx.is_some() || self.pcm_tx.is_some()
    }
}

/// Voice flags shared by every session on the device.
#[derive(Debug)]
pub struct VoiceState {
    sessions: Box<[VoiceSession]>,
    pub mic_mute: bool,
    /// Sticky: mute only the voice tx path while incall music is mixed in.
    pub use_device_mute: bool,
    pub volume: f32,
    pub tty_mode: TtyMode,
    pub hac: bool,
    pub in_call: bool,
    pub lte_call: bool,
    /// Toggled by usecase start/stop; consulted by the recording path.
    pub uc_active: bool,
}

impl VoiceState {
    /// Pre-allocate `capacity` slots (clamped to `1..=MAX_VOICE_SESSIONS`).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_VOICE_SESSIONS);
        Self {
            sessions: (0..capacity).map(VoiceSession::new).collect(),
            mic_mute: false,
            use_device_mute: false,
            volume: 1.0,
            tty_mode: TtyMode::Off,
            hac: false,
            in_call: false,
            lte_call: false,
            uc_active: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, index: usize) -> Option<&VoiceSession> {
        self.sessions.get(index)
    }

    pub fn session_mut(&mut self, index: usize) -> Option<&mut VoiceSession> {
        self.sessions.get_mut(index)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &VoiceSession> {
        self.sessions.iter()
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut VoiceSession> {
        self.sessions.iter_mut()
    }

    pub fn any_session_active(&self) -> bool {
        self.sessions.iter().any(VoiceSession::is_active)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_active()).count()
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::new(1)
    }
}
