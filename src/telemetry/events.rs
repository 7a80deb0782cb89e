//! Voice telemetry event types exposed to the simulator and to subscribers.

use serde::{Deserialize, Serialize};

use crate::device::{SndDevice, UsecaseId};

/// Path a mic-mute request ended up on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutePath {
    Hfp,
    DeviceMute,
    MicMute,
    Voip,
    /// Recorded only; applied when a call starts.
    Deferred,
}

/// Voice lifecycle and audio-path events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum VoiceEvent {
    CallStarted {
        usecase: UsecaseId,
        session: usize,
        vsid: u32,
    },
    CallStopped {
        usecase: UsecaseId,
        vsid: u32,
        status: i32,
    },
    StartRolledBack {
        usecase: UsecaseId,
        code: i32,
    },
    SidetoneChanged {
        device: SndDevice,
        enabled: bool,
    },
    AancChanged {
        device: SndDevice,
        enabled: bool,
    },
    MicMuteApplied {
        muted: bool,
        path: MutePath,
    },
    DeviceMuteFlagChanged {
        active: bool,
    },
    VolumeApplied {
        volume: f32,
        driver_value: Option<i32>,
    },
    RecordingSelected {
        usecase: UsecaseId,
        vsid: u32,
        channels: u32,
    },
}
