//! Deterministic stub hardware used by the simulator binary and the tests.
//!
//! All stubs share one [`StubHardware`] state: every hardware call is appended
//! to an ordered log, open streams are tracked so leaks are observable, and
//! failures can be injected at any [`FaultPoint`].

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{
    AuxiliaryPaths, DeviceSelector, PcmHandle, PcmProvider, PlatformControl, RouteControl,
};
use crate::config::{DEFAULT_LOOPBACK_RX_DEVICE, DEFAULT_LOOPBACK_TX_DEVICE};
use crate::device::{
    AudioDevice, AudioDeviceType, AudioFormat, MuteDirection, PcmConfig, PcmDirection,
    RecordingSource, SndDevice, Usecase, UsecaseId,
};
use crate::engine::extension::{MultiSessionExtension, NoExtension, VoiceExtension};
use crate::error::VoiceError;
use crate::voice::{HalServices, Parameters};

/// Status the stubs report for injected I/O failures.
pub const STUB_IO_STATUS: i32 = -libc::EIO;

/// Step at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPoint {
    SelectDevices,
    PcmDeviceId,
    SampleRate,
    OpenCapture,
    CaptureNotReady,
    OpenPlayback,
    PlaybackNotReady,
    StartCapture,
    StartPlayback,
    OpenLoopback,
    StartVoiceCall,
    StopVoiceCall,
    IncallRecording,
}

impl FaultPoint {
    pub const ALL: [FaultPoint; 13] = [
        FaultPoint::SelectDevices,
        FaultPoint::PcmDeviceId,
        FaultPoint::SampleRate,
        FaultPoint::OpenCapture,
        FaultPoint::CaptureNotReady,
        FaultPoint::OpenPlayback,
        FaultPoint::PlaybackNotReady,
        FaultPoint::StartCapture,
        FaultPoint::StartPlayback,
        FaultPoint::OpenLoopback,
        FaultPoint::StartVoiceCall,
        FaultPoint::StopVoiceCall,
        FaultPoint::IncallRecording,
    ];
}

/// One recorded hardware interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HwCall {
    SelectDevices { usecase: UsecaseId },
    EnableRoute { usecase: UsecaseId },
    DisableRoute { usecase: UsecaseId },
    EnableSndDevice { device: SndDevice },
    DisableSndDevice { device: SndDevice },
    PcmOpen { direction: PcmDirection, device: u32, rate: u32 },
    PcmStart { direction: PcmDirection, device: u32 },
    PcmClose { direction: PcmDirection, device: u32 },
    StartVoiceCall { vsid: u32 },
    StopVoiceCall { vsid: u32 },
    SetMicMute { muted: bool },
    SetDeviceMute { muted: bool, direction: MuteDirection },
    SetVoiceVolume { driver_value: i32 },
    SetSidetone { device: SndDevice, enable: bool, path: String },
    UpdateAancPath { device: SndDevice, enable: bool, path: String },
    SetMicBreakDet { enable: bool },
    SetIncallRecordingSession { vsid: u32, mode: RecordingSource },
    SetIncallRecordingChannels { channels: u32 },
    StopIncallRecording,
    StartIncallMusic,
    StopIncallMusic,
    HfpSetMicMute { muted: bool },
    VoipSetMicMute { muted: bool },
    VoipSetVolume { volume: f32 },
}

#[derive(Debug)]
struct StubState {
    calls: Vec<HwCall>,
    faults: HashSet<FaultPoint>,
    open_streams: BTreeSet<u64>,
    next_stream: u64,
    sample_rate: u32,
    hfp_active: bool,
    voip_available: bool,
    compress_capture: bool,
    compress_formats: Vec<AudioFormat>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            faults: HashSet::new(),
            open_streams: BTreeSet::new(),
            next_stream: 1,
            sample_rate: PcmConfig::VOICE_CALL.rate,
            hfp_active: false,
            voip_available: false,
            compress_capture: false,
            compress_formats: Vec::new(),
        }
    }
}

/// Shared handle over the stub hardware state.
#[derive(Debug, Clone, Default)]
pub struct StubHardware {
    state: Arc<Mutex<StubState>>,
}

impl StubHardware {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        // A panicking test must not cascade into every other stub call.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Build a full service set wired to this stub state.
    pub fn services(&self, multi_session: bool) -> HalServices {
        let extension: Box<dyn VoiceExtension> = if multi_session {
            Box::new(MultiSessionExtension::new())
        } else {
            Box::new(NoExtension)
        };
        HalServices {
            platform: Box::new(StubPlatform { hw: self.clone() }),
            pcm: Box::new(StubPcm { hw: self.clone() }),
            selector: Box::new(StubSelector { hw: self.clone() }),
            routes: Box::new(StubRoutes { hw: self.clone() }),
            aux: Box::new(StubAuxiliary { hw: self.clone() }),
            extension,
        }
    }

    pub fn inject(&self, fault: FaultPoint) {
        self.lock().faults.insert(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.lock().sample_rate = rate;
    }

    pub fn set_hfp_active(&self, active: bool) {
        self.lock().hfp_active = active;
    }

    pub fn set_voip_available(&self, available: bool) {
        self.lock().voip_available = available;
    }

    pub fn set_compress_capture(&self, enabled: bool, formats: &[AudioFormat]) {
        let mut state = self.lock();
        state.compress_capture = enabled;
        state.compress_formats = formats.to_vec();
    }

    pub fn calls(&self) -> Vec<HwCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&HwCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Index of the first recorded call equal to `call`.
    pub fn position(&self, call: &HwCall) -> Option<usize> {
        self.lock().calls.iter().position(|c| c == call)
    }

    pub fn open_stream_count(&self) -> usize {
        self.lock().open_streams.len()
    }

    fn record(&self, call: HwCall) {
        self.lock().calls.push(call);
    }

    fn faulted(&self, fault: FaultPoint) -> bool {
        self.lock().faults.contains(&fault)
    }

    fn io_failure(&self, fault: FaultPoint, op: &'static str) -> Result<(), VoiceError> {
        if self.faulted(fault) {
            Err(VoiceError::Platform {
                op,
                status: STUB_IO_STATUS,
            })
        } else {
            Ok(())
        }
    }
}

pub const STUB_LOOPBACK_RX_DEVICE: u32 = DEFAULT_LOOPBACK_RX_DEVICE;
pub const STUB_LOOPBACK_TX_DEVICE: u32 = DEFAULT_LOOPBACK_TX_DEVICE;

/// Platform control plane stub.
pub struct StubPlatform {
    hw: StubHardware,
}

impl PlatformControl for StubPlatform {
    fn pcm_device_id(&self, usecase: UsecaseId, direction: PcmDirection) -> Option<u32> {
        if self.hw.faulted(FaultPoint::PcmDeviceId) || !usecase.is_voice_call() {
            return None;
        }
        let base = match usecase {
            UsecaseId::VoiceCall => 2,
            UsecaseId::Voice2Call => 13,
            UsecaseId::VolteCall => 14,
            UsecaseId::QchatCall => 20,
            UsecaseId::VowlanCall => 36,
            UsecaseId::VoicemmodeCall1 => 40,
            _ => 41,
        };
        Some(match direction {
            PcmDirection::Playback => base,
            PcmDirection::Capture => base + 100,
        })
    }

    fn sample_rate(&self) -> Result<u32, VoiceError> {
        self.hw.io_failure(FaultPoint::SampleRate, "get_sample_rate")?;
        Ok(self.hw.lock().sample_rate)
    }

    fn start_voice_call(&mut self, vsid: u32) -> Result<(), VoiceError> {
        self.hw.record(HwCall::StartVoiceCall { vsid });
        self.hw
            .io_failure(FaultPoint::StartVoiceCall, "start_voice_call")
    }

    fn stop_voice_call(&mut self, vsid: u32) -> Result<(), VoiceError> {
        self.hw.record(HwCall::StopVoiceCall { vsid });
        self.hw.io_failure(FaultPoint::StopVoiceCall, "stop_voice_call")
    }

    fn set_mic_mute(&mut self, muted: bool) -> Result<(), VoiceError> {
        self.hw.record(HwCall::SetMicMute { muted });
        Ok(())
    }

    fn set_device_mute(
        &mut self,
        muted: bool,
        direction: MuteDirection,
    ) -> Result<(), VoiceError> {
        self.hw.record(HwCall::SetDeviceMute { muted, direction });
        Ok(())
    }

    fn set_voice_volume(&mut self, driver_value: i32) -> Result<(), VoiceError> {
        self.hw.record(HwCall::SetVoiceVolume { driver_value });
        Ok(())
    }

    fn set_incall_recording_session(
        &mut self,
        vsid: u32,
        mode: RecordingSource,
    ) -> Result<(), VoiceError> {
        self.hw
            .record(HwCall::SetIncallRecordingSession { vsid, mode });
        self.hw
            .io_failure(FaultPoint::IncallRecording, "set_incall_recording_session")
    }

    fn set_incall_recording_channels(&mut self, channels: u32) {
        self.hw
            .record(HwCall::SetIncallRecordingChannels { channels });
    }

    fn stop_incall_recording(&mut self) -> Result<(), VoiceError> {
        self.hw.record(HwCall::StopIncallRecording);
        Ok(())
    }

    fn set_sidetone(
        &mut self,
        device: SndDevice,
        enable: bool,
        mixer_path: &str,
    ) -> Result<(), VoiceError> {
        self.hw.record(HwCall::SetSidetone {
            device,
            enable,
            path: mixer_path.to_string(),
        });
        Ok(())
    }

    fn update_aanc_path(
        &mut self,
        device: SndDevice,
        enable: bool,
        mixer_path: &str,
    ) -> Result<(), VoiceError> {
        self.hw.record(HwCall::UpdateAancPath {
            device,
            enable,
            path: mixer_path.to_string(),
        });
        Ok(())
    }

    fn set_mic_break_det(&mut self, enable: bool) {
        self.hw.record(HwCall::SetMicBreakDet { enable });
    }

    fn start_incall_music(&mut self) -> Result<(), VoiceError> {
        self.hw.record(HwCall::StartIncallMusic);
        Ok(())
    }

    fn stop_incall_music(&mut self) -> Result<(), VoiceError> {
        self.hw.record(HwCall::StopIncallMusic);
        Ok(())
    }
}

/// Hardware stream stub; tracks open handles so leaks are observable.
pub struct StubPcm {
    hw: StubHardware,
}

impl StubPcm {
    fn open_fault(direction: PcmDirection, device: u32) -> FaultPoint {
        if device == STUB_LOOPBACK_RX_DEVICE || device == STUB_LOOPBACK_TX_DEVICE {
            return FaultPoint::OpenLoopback;
        }
        match direction {
            PcmDirection::Capture => FaultPoint::OpenCapture,
            PcmDirection::Playback => FaultPoint::OpenPlayback,
        }
    }
}

impl PcmProvider for StubPcm {
    fn open(
        &mut self,
        _card: u32,
        device: u32,
        direction: PcmDirection,
        config: &PcmConfig,
    ) -> Result<PcmHandle, VoiceError> {
        self.hw.record(HwCall::PcmOpen {
            direction,
            device,
            rate: config.rate,
        });
        if self.hw.faulted(Self::open_fault(direction, device)) {
            return Err(VoiceError::StreamOpenFailed {
                direction,
                device,
                reason: "cannot open device".to_string(),
            });
        }
        let mut state = self.hw.lock();
        let id = state.next_stream;
        state.next_stream += 1;
        state.open_streams.insert(id);
        Ok(PcmHandle::new(id, device, direction))
    }

    fn is_ready(&self, handle: &PcmHandle) -> bool {
        let fault = match handle.direction() {
            PcmDirection::Capture => FaultPoint::CaptureNotReady,
            PcmDirection::Playback => FaultPoint::PlaybackNotReady,
        };
        !self.hw.faulted(fault)
    }

    fn error_text(&self, handle: &PcmHandle) -> String {
        format!(
            "stub {} stream {} on device {}",
            handle.direction(),
            handle.id(),
            handle.device()
        )
    }

    fn start(&mut self, handle: &PcmHandle) -> Result<(), VoiceError> {
        self.hw.record(HwCall::PcmStart {
            direction: handle.direction(),
            device: handle.device(),
        });
        let fault = match handle.direction() {
            PcmDirection::Capture => FaultPoint::StartCapture,
            PcmDirection::Playback => FaultPoint::StartPlayback,
        };
        if self.hw.faulted(fault) {
            return Err(VoiceError::StreamStartFailed {
                direction: handle.direction(),
                status: STUB_IO_STATUS,
                reason: self.error_text(handle),
            });
        }
        Ok(())
    }

    fn close(&mut self, handle: PcmHandle) {
        self.hw.record(HwCall::PcmClose {
            direction: handle.direction(),
            device: handle.device(),
        });
        self.hw.lock().open_streams.remove(&handle.id());
    }
}

/// Picks sound devices from the first framework device of the usecase.
pub struct StubSelector {
    hw: StubHardware,
}

fn voice_devices_for(device: Option<AudioDeviceType>) -> (SndDevice, SndDevice) {
    match device {
        Some(AudioDeviceType::Speaker) => {
            (SndDevice::OutVoiceSpeaker, SndDevice::InVoiceSpeakerDmic)
        }
        Some(AudioDeviceType::WiredHeadset) => {
            (SndDevice::OutVoiceHeadset, SndDevice::InVoiceHeadsetMic)
        }
        Some(AudioDeviceType::WiredHeadphone) => {
            (SndDevice::OutVoiceHeadphones, SndDevice::InHandsetMic)
        }
        Some(d) if d.is_sco() => (SndDevice::OutBtSco, SndDevice::InBtScoMic),
        Some(AudioDeviceType::UsbHeadset) | Some(AudioDeviceType::UsbDevice) => (
            SndDevice::OutVoiceUsbHeadset,
            SndDevice::InVoiceUsbHeadsetMic,
        ),
        _ => (SndDevice::OutVoiceHandset, SndDevice::InHandsetMic),
    }
}

impl DeviceSelector for StubSelector {
    fn select_devices(
        &mut self,
        dev: &mut AudioDevice,
        usecase: UsecaseId,
    ) -> Result<(), VoiceError> {
        self.hw.record(HwCall::SelectDevices { usecase });
        self.hw.io_failure(FaultPoint::SelectDevices, "select_devices")?;

        let uc = dev
            .usecases
            .get_mut(usecase)
            .ok_or(VoiceError::UsecaseNotFound { usecase })?;
        let (out_dev, in_dev) = voice_devices_for(uc.devices.first().copied());
        uc.out_snd_device = out_dev;
        uc.in_snd_device = in_dev;

        self.hw.record(HwCall::EnableSndDevice { device: out_dev });
        self.hw.record(HwCall::EnableSndDevice { device: in_dev });
        self.hw.record(HwCall::EnableRoute { usecase });
        Ok(())
    }
}

/// Route layer stub.
pub struct StubRoutes {
    hw: StubHardware,
}

impl RouteControl for StubRoutes {
    fn enable_route(&mut self, usecase: &Usecase) -> Result<(), VoiceError> {
        self.hw.record(HwCall::EnableRoute { usecase: usecase.id });
        Ok(())
    }

    fn disable_route(&mut self, usecase: &Usecase) -> Result<(), VoiceError> {
        self.hw.record(HwCall::DisableRoute { usecase: usecase.id });
        Ok(())
    }

    fn enable_snd_device(&mut self, device: SndDevice) -> Result<(), VoiceError> {
        self.hw.record(HwCall::EnableSndDevice { device });
        Ok(())
    }

    fn disable_snd_device(&mut self, device: SndDevice) -> Result<(), VoiceError> {
        self.hw.record(HwCall::DisableSndDevice { device });
        Ok(())
    }
}

/// HFP / compress VoIP / compressed capture stub.
pub struct StubAuxiliary {
    hw: StubHardware,
}

impl AuxiliaryPaths for StubAuxiliary {
    fn hfp_is_active(&self) -> bool {
        self.hw.lock().hfp_active
    }

    fn hfp_set_mic_mute(&mut self, muted: bool) -> Result<(), VoiceError> {
        self.hw.record(HwCall::HfpSetMicMute { muted });
        Ok(())
    }

    fn voip_set_mic_mute(&mut self, muted: bool) -> Result<(), VoiceError> {
        if !self.hw.lock().voip_available {
            return Err(VoiceError::NotSupported);
        }
        self.hw.record(HwCall::VoipSetMicMute { muted });
        Ok(())
    }

    fn voip_set_volume(&mut self, volume: f32) -> Result<(), VoiceError> {
        if !self.hw.lock().voip_available {
            return Err(VoiceError::NotSupported);
        }
        self.hw.record(HwCall::VoipSetVolume { volume });
        Ok(())
    }

    fn voip_set_parameters(&mut self, _params: &mut Parameters) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn compress_capture_enabled(&self) -> bool {
        self.hw.lock().compress_capture
    }

    fn compress_capture_supports(&self, format: AudioFormat) -> bool {
        self.hw.lock().compress_formats.contains(&format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_tracks_streams() {
        let hw = StubHardware::new();
        let mut pcm = StubPcm { hw: hw.clone() };

        let handle = pcm
            .open(0, 2, PcmDirection::Capture, &PcmConfig::VOICE_CALL)
            .unwrap();
        assert_eq!(hw.open_stream_count(), 1);
        assert!(pcm.is_ready(&handle));

        pcm.close(handle);
        assert_eq!(hw.open_stream_count(), 0);
        assert_eq!(hw.count(|c| matches!(c, HwCall::PcmClose { .. })), 1);
    }

    #[test]
    fn test_open_fault_is_reported() {
        let hw = StubHardware::new();
        hw.inject(FaultPoint::OpenPlayback);
        let mut pcm = StubPcm { hw: hw.clone() };

        let err = pcm
            .open(0, 2, PcmDirection::Playback, &PcmConfig::VOICE_CALL)
            .unwrap_err();
        assert!(matches!(err, VoiceError::StreamOpenFailed { .. }));
        assert_eq!(hw.open_stream_count(), 0);
    }

    #[test]
    fn test_pcm_ids_only_for_voice_usecases() {
        let platform = StubPlatform {
            hw: StubHardware::new(),
        };
        assert_eq!(
            platform.pcm_device_id(UsecaseId::VoiceCall, PcmDirection::Playback),
            Some(2)
        );
        assert_eq!(
            platform.pcm_device_id(UsecaseId::IncallRecUplink, PcmDirection::Capture),
            None
        );
    }
}
