//! Hardware-facing collaborators of the voice controller.
//!
//! Each trait mirrors one layer the voice path talks to: the platform control
//! plane, the hardware stream provider, the route/mixer layer, the device
//! selection policy and the auxiliary (HFP, compress VoIP, compressed
//! capture) paths. All calls are synchronous and return the collaborator's
//! status unchanged.

use crate::device::{
    AudioDevice, AudioFormat, MuteDirection, PcmConfig, PcmDirection, RecordingSource,
    SndDevice, Usecase, UsecaseId,
};
use crate::error::VoiceError;
use crate::voice::Parameters;

/// Exclusive token for one open hardware stream.
///
/// Not `Clone`: the only way to release it is [`PcmProvider::close`], which
/// consumes it, so a stream can never be closed twice.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an open stream must be stored or closed"]
pub struct PcmHandle {
    id: u64,
    device: u32,
    direction: PcmDirection,
}

impl PcmHandle {
    pub fn new(id: u64, device: u32, direction: PcmDirection) -> Self {
        Self {
            id,
            device,
            direction,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> u32 {
        self.device
    }

    pub fn direction(&self) -> PcmDirection {
        self.direction
    }
}

/// Opens, starts and closes hardware PCM streams.
pub trait PcmProvider: Send {
    fn open(
        &mut self,
        card: u32,
        device: u32,
        direction: PcmDirection,
        config: &PcmConfig,
    ) -> Result<PcmHandle, VoiceError>;

    fn is_ready(&self, handle: &PcmHandle) -> bool;

    /// Last driver error text for the stream.
    fn error_text(&self, handle: &PcmHandle) -> String;

    fn start(&mut self, handle: &PcmHandle) -> Result<(), VoiceError>;

    fn close(&mut self, handle: PcmHandle);
}

/// Platform control plane (calibration, voice sessions, mixer shortcuts).
pub trait PlatformControl: Send {
    /// Hardware stream id serving `usecase` in `direction`, if any.
    fn pcm_device_id(&self, usecase: UsecaseId, direction: PcmDirection) -> Option<u32>;

    fn sample_rate(&self) -> Result<u32, VoiceError>;

    fn start_voice_call(&mut self, vsid: u32) -> Result<(), VoiceError>;

    fn stop_voice_call(&mut self, vsid: u32) -> Result<(), VoiceError>;

    fn set_mic_mute(&mut self, muted: bool) -> Result<(), VoiceError>;

    fn set_device_mute(&mut self, muted: bool, direction: MuteDirection)
        -> Result<(), VoiceError>;

    /// `driver_value` is on the driver scale: 0 loudest, 100 silent.
    fn set_voice_volume(&mut self, driver_value: i32) -> Result<(), VoiceError>;

    fn set_incall_recording_session(
        &mut self,
        vsid: u32,
        mode: RecordingSource,
    ) -> Result<(), VoiceError>;

    fn set_incall_recording_channels(&mut self, channels: u32);

    fn stop_incall_recording(&mut self) -> Result<(), VoiceError>;

    fn set_sidetone(
        &mut self,
        device: SndDevice,
        enable: bool,
        mixer_path: &str,
    ) -> Result<(), VoiceError>;

    fn update_aanc_path(
        &mut self,
        device: SndDevice,
        enable: bool,
        mixer_path: &str,
    ) -> Result<(), VoiceError>;

    fn set_mic_break_det(&mut self, enable: bool);

    fn start_incall_music(&mut self) -> Result<(), VoiceError>;

    fn stop_incall_music(&mut self) -> Result<(), VoiceError>;
}

/// Resolves concrete sound devices for a usecase and applies them.
pub trait DeviceSelector: Send {
    /// Fill in the usecase's in/out sound devices and enable its route.
    fn select_devices(
        &mut self,
        dev: &mut AudioDevice,
        usecase: UsecaseId,
    ) -> Result<(), VoiceError>;
}

/// Mixer route and sound-device enable/disable.
pub trait RouteControl: Send {
    fn enable_route(&mut self, usecase: &Usecase) -> Result<(), VoiceError>;

    fn disable_route(&mut self, usecase: &Usecase) -> Result<(), VoiceError>;

    fn enable_snd_device(&mut self, device: SndDevice) -> Result<(), VoiceError>;

    fn disable_snd_device(&mut self, device: SndDevice) -> Result<(), VoiceError>;
}

/// Audio paths that take over mute/volume outside the cellular voice path.
///
/// Defaults describe a build with none of them compiled in.
pub trait AuxiliaryPaths: Send {
    /// Hands-free profile (car kit) call in progress.
    fn hfp_is_active(&self) -> bool {
        false
    }

    fn hfp_set_mic_mute(&mut self, _muted: bool) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn voip_set_mic_mute(&mut self, _muted: bool) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn voip_set_volume(&mut self, _volume: f32) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn voip_set_parameters(&mut self, _params: &mut Parameters) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn compress_capture_enabled(&self) -> bool {
        false
    }

    fn compress_capture_supports(&self, _format: AudioFormat) -> bool {
        false
    }
}

/// No auxiliary paths available.
#[derive(Debug, Default)]
pub struct NoAuxiliaryPaths;

impl AuxiliaryPaths for NoAuxiliaryPaths {}

pub mod stub;

pub use stub::{FaultPoint, HwCall, StubHardware};
