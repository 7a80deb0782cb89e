//! Integration tests for the mute, volume, recording and parameter paths
//!
//! Covers:
//! - volume conversion and the per-mode volume path
//! - mic mute path selection and the device-mute switch ordering
//! - in-call recording usecase selection with and without compressed capture
//! - tty/hac/incall-music parameters and the multi-session call keys

use rstest::rstest;
use voice_call_hal::device::{
    AudioDeviceType, AudioFormat, AudioSource, CallState, MuteDirection, RecordingSource,
    SndDevice, TtyMode, TTY_MODE_CLEAR, VOICE_VSID,
};
use voice_call_hal::engine::backend::{FaultPoint, HwCall, StubHardware};
use voice_call_hal::engine::extension::{VOICE2_VSID, VOLTE_VSID};
use voice_call_hal::error::{ErrorCode, VoiceErrorCodes};
use voice_call_hal::telemetry::{MutePath, VoiceEvent};
use voice_call_hal::voice::{
    volume_to_driver, CaptureRequest, PARAM_HAC, PARAM_INCALL_MUSIC, PARAM_TTY_MODE, TTY_FULL,
    TTY_VCO,
};
use voice_call_hal::{
    AudioDevice, AudioMode, CallOutput, Parameters, UsecaseId, VoiceController, VoiceError,
};

fn setup(multi_session: bool) -> (StubHardware, VoiceController, AudioDevice) {
    let hw = StubHardware::new();
    let mut dev = AudioDevice::new(0);
    dev.mode = AudioMode::InCall;
    dev.current_call_output = Some(CallOutput::single(AudioDeviceType::Earpiece));
    let controller =
        VoiceController::with_device(hw.services(multi_session), Default::default(), &mut dev);
    (hw, controller, dev)
}

fn driver_values(hw: &StubHardware) -> Vec<i32> {
    hw.calls()
        .into_iter()
        .filter_map(|c| match c {
            HwCall::SetVoiceVolume { driver_value } => Some(driver_value),
            _ => None,
        })
        .collect()
}

#[rstest]
#[case(0.0, 100)]
#[case(1.0, 0)]
#[case(0.6, 40)]
#[case(0.5, 50)]
#[case(-3.0, 100)]
#[case(7.5, 0)]
fn volume_maps_to_driver_scale(#[case] volume: f32, #[case] expected: i32) {
    assert_eq!(volume_to_driver(volume), expected);
}

#[test]
fn test_volume_in_call_reaches_platform() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.set_volume(&mut dev, 0.6).unwrap();
    assert_eq!(driver_values(&hw), vec![40]);
    assert_eq!(dev.voice.volume, 0.6);
}

/// Outside a call the volume is only stored and replayed at start
#[test]
fn test_volume_stored_then_applied_at_start() {
    let (hw, mut controller, mut dev) = setup(false);
    dev.mode = AudioMode::Normal;
    controller.set_volume(&mut dev, 0.0).unwrap();
    assert!(driver_values(&hw).is_empty());

    dev.mode = AudioMode::InCall;
    controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
    assert_eq!(driver_values(&hw), vec![100]);
}

#[test]
fn test_volume_is_clamped_before_storing() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.set_volume(&mut dev, 7.5).unwrap();
    assert_eq!(dev.voice.volume, 1.0);
    assert_eq!(driver_values(&hw), vec![0]);
}

#[test]
fn test_volume_in_communication_uses_voip() {
    let (hw, mut controller, mut dev) = setup(false);
    dev.mode = AudioMode::InCommunication;

    // Without a VoIP path there is nothing to apply.
    controller.set_volume(&mut dev, 0.3).unwrap();
    assert_eq!(hw.count(|c| matches!(c, HwCall::VoipSetVolume { .. })), 0);

    hw.set_voip_available(true);
    controller.set_volume(&mut dev, 0.3).unwrap();
    assert_eq!(hw.count(|c| matches!(c, HwCall::VoipSetVolume { .. })), 1);
    assert!(driver_values(&hw).is_empty());
}

#[test]
fn test_mic_mute_prefers_hfp() {
    let (hw, mut controller, mut dev) = setup(false);
    hw.set_hfp_active(true);
    controller.set_mic_mute(&mut dev, true).unwrap();

    assert!(controller.mic_mute(&dev));
    assert_eq!(hw.calls(), vec![HwCall::HfpSetMicMute { muted: true }]);
    assert_eq!(
        controller
            .events()
            .count(|e| matches!(e, VoiceEvent::MicMuteApplied { path: MutePath::Hfp, .. })),
        1
    );
}

#[rstest]
#[case(false, HwCall::SetMicMute { muted: true })]
#[case(true, HwCall::SetDeviceMute { muted: true, direction: MuteDirection::Tx })]
fn mic_mute_in_call_path(#[case] device_mute: bool, #[case] expected: HwCall) {
    let (hw, mut controller, mut dev) = setup(false);
    dev.voice.use_device_mute = device_mute;
    controller.set_mic_mute(&mut dev, true).unwrap();
    assert_eq!(hw.calls(), vec![expected]);
}

/// Outside a call or VoIP the mute is only recorded
#[test]
fn test_mic_mute_deferred_in_normal_mode() {
    let (hw, mut controller, mut dev) = setup(false);
    dev.mode = AudioMode::Normal;
    controller.set_mic_mute(&mut dev, true).unwrap();
    assert!(dev.voice.mic_mute);
    assert!(hw.calls().is_empty());
}

/// The new mute engages before the old one releases
#[test]
fn test_device_mute_switch_never_unmutes() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.set_mic_mute(&mut dev, true).unwrap();
    hw.clear_calls();

    controller.set_device_mute_flag(&mut dev, true).unwrap();
    let engage = hw
        .position(&HwCall::SetDeviceMute {
            muted: true,
            direction: MuteDirection::Tx,
        })
        .unwrap();
    let release = hw.position(&HwCall::SetMicMute { muted: false }).unwrap();
    assert!(engage < release);
    assert!(dev.voice.use_device_mute);

    hw.clear_calls();
    controller.set_device_mute_flag(&mut dev, false).unwrap();
    let engage = hw.position(&HwCall::SetMicMute { muted: true }).unwrap();
    let release = hw
        .position(&HwCall::SetDeviceMute {
            muted: false,
            direction: MuteDirection::Tx,
        })
        .unwrap();
    assert!(engage < release);
    assert!(!dev.voice.use_device_mute);
}

/// An unmuted mic only flips the flag
#[test]
fn test_device_mute_flag_without_mute() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.set_device_mute_flag(&mut dev, true).unwrap();
    assert!(dev.voice.use_device_mute);
    assert!(hw.calls().is_empty());
}

#[test]
fn test_start_resets_device_mute_flag() {
    let (_, mut controller, mut dev) = setup(false);
    dev.voice.use_device_mute = true;
    controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
    assert!(!dev.voice.use_device_mute);
}

#[test]
fn test_recording_rejected_without_call() {
    let (hw, mut controller, dev) = setup(false);
    let mut request = CaptureRequest::new(AudioSource::VoiceUplink, AudioFormat::PcmS16Le, 1);
    let err = controller
        .check_and_set_incall_rec_usecase(&dev, &mut request)
        .unwrap_err();
    assert_eq!(err.code(), VoiceErrorCodes::INVALID_ARGUMENT);
    assert_eq!(request.usecase, None);
    assert!(hw.calls().is_empty());
}

#[test]
fn test_plain_capture_passes_without_call() {
    let (_, mut controller, dev) = setup(false);
    let mut request = CaptureRequest::new(AudioSource::Mic, AudioFormat::PcmS16Le, 1);
    controller
        .check_and_set_incall_rec_usecase(&dev, &mut request)
        .unwrap();
    assert_eq!(request.usecase, None);
}

#[rstest]
#[case(false, &[], AudioFormat::AmrWb, UsecaseId::IncallRecUplink)]
#[case(true, &[AudioFormat::AmrWb], AudioFormat::AmrWb, UsecaseId::IncallRecUplinkCompress)]
#[case(true, &[AudioFormat::AmrWb], AudioFormat::PcmS16Le, UsecaseId::IncallRecUplink)]
fn uplink_recording_during_call(
    #[case] compress_enabled: bool,
    #[case] formats: &[AudioFormat],
    #[case] format: AudioFormat,
    #[case] expected: UsecaseId,
) {
    let (hw, mut controller, mut dev) = setup(false);
    hw.set_compress_capture(compress_enabled, formats);
    controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
    hw.clear_calls();

    let mut request = CaptureRequest::new(AudioSource::VoiceUplink, format, 2);
    controller
        .check_and_set_incall_rec_usecase(&dev, &mut request)
        .unwrap();

    assert_eq!(request.usecase, Some(expected));
    assert_eq!(
        hw.calls(),
        vec![
            HwCall::SetIncallRecordingSession {
                vsid: VOICE_VSID,
                mode: RecordingSource::Uplink,
            },
            HwCall::SetIncallRecordingChannels { channels: 2 },
        ]
    );
}

/// Recording follows the first active session's VSID
#[test]
fn test_recording_uses_active_session_vsid() {
    let (hw, mut controller, mut dev) = setup(true);
    controller.start_usecase(&mut dev, UsecaseId::Voice2Call).unwrap();
    hw.clear_calls();

    let mut request = CaptureRequest::new(AudioSource::VoiceCall, AudioFormat::PcmS16Le, 1);
    controller
        .check_and_set_incall_rec_usecase(&dev, &mut request)
        .unwrap();
    assert_eq!(request.usecase, Some(UsecaseId::IncallRecUplinkAndDownlink));
    assert!(hw
        .position(&HwCall::SetIncallRecordingSession {
            vsid: VOICE2_VSID,
            mode: RecordingSource::UplinkAndDownlink,
        })
        .is_some());
}

/// A platform failure still reports the channel count and the chosen usecase
#[test]
fn test_recording_platform_failure_is_returned() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
    hw.inject(FaultPoint::IncallRecording);

    let mut request = CaptureRequest::new(AudioSource::VoiceDownlink, AudioFormat::PcmS16Le, 1);
    let err = controller
        .check_and_set_incall_rec_usecase(&dev, &mut request)
        .unwrap_err();
    assert_eq!(err.code(), -libc::EIO);
    assert_eq!(request.usecase, Some(UsecaseId::IncallRecDownlink));
    assert_eq!(
        hw.count(|c| matches!(c, HwCall::SetIncallRecordingChannels { .. })),
        1
    );
}

#[rstest]
#[case(AudioSource::VoiceUplink, 1)]
#[case(AudioSource::Mic, 0)]
fn stop_recording_only_for_call_sources(#[case] source: AudioSource, #[case] stops: usize) {
    let (hw, mut controller, _) = setup(false);
    let request = CaptureRequest::new(source, AudioFormat::PcmS16Le, 1);
    controller.check_and_stop_incall_rec_usecase(&request).unwrap();
    assert_eq!(hw.count(|c| matches!(c, HwCall::StopIncallRecording)), stops);
}

#[test]
fn test_tty_mode_updates_acdb_and_reroutes() {
    let (hw, mut controller, mut dev) = setup(false);
    controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
    hw.clear_calls();

    let mut params = Parameters::from_pairs([(PARAM_TTY_MODE, TTY_FULL)]);
    controller.set_parameters(&mut dev, &mut params).unwrap();

    assert_eq!(dev.voice.tty_mode, TtyMode::Full);
    assert_eq!(dev.acdb_settings & !TTY_MODE_CLEAR, TtyMode::Full.acdb_bits());
    assert!(!params.contains(PARAM_TTY_MODE));
    assert_eq!(hw.count(|c| matches!(c, HwCall::SelectDevices { .. })), 1);

    // Same value again is not a change.
    let mut params = Parameters::from_pairs([(PARAM_TTY_MODE, TTY_FULL)]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert_eq!(hw.count(|c| matches!(c, HwCall::SelectDevices { .. })), 1);
}

#[test]
fn test_tty_mode_without_call_only_records() {
    let (hw, mut controller, mut dev) = setup(false);
    let mut params = Parameters::from_pairs([(PARAM_TTY_MODE, TTY_VCO)]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert_eq!(dev.voice.tty_mode, TtyMode::Vco);
    assert!(hw.calls().is_empty());
}

#[test]
fn test_invalid_tty_mode_rejected() {
    let (_, mut controller, mut dev) = setup(false);
    let mut params = Parameters::from_pairs([(PARAM_TTY_MODE, "tty_loud")]);
    let err = controller.set_parameters(&mut dev, &mut params).unwrap_err();
    assert_eq!(
        err,
        VoiceError::InvalidParameter {
            key: PARAM_TTY_MODE.to_string(),
            value: "tty_loud".to_string(),
        }
    );
    assert_eq!(dev.voice.tty_mode, TtyMode::Off);
}

#[test]
fn test_hac_reroutes_only_in_call() {
    let (hw, mut controller, mut dev) = setup(false);
    let mut params = Parameters::from_pairs([(PARAM_HAC, "ON")]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert!(dev.voice.hac);
    assert_eq!(hw.count(|c| matches!(c, HwCall::SelectDevices { .. })), 0);

    controller.start_call(&mut dev).unwrap();
    hw.clear_calls();
    let mut params = Parameters::from_pairs([(PARAM_HAC, "OFF")]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert!(!dev.voice.hac);
    assert_eq!(hw.count(|c| matches!(c, HwCall::SelectDevices { .. })), 1);
    assert_eq!(
        dev.usecases
            .get(UsecaseId::VoiceCall)
            .map(|uc| uc.out_snd_device),
        Some(SndDevice::OutVoiceHandset)
    );
}

#[rstest]
#[case("true", HwCall::StartIncallMusic)]
#[case("false", HwCall::StopIncallMusic)]
fn incall_music_parameter(#[case] value: &str, #[case] expected: HwCall) {
    let (hw, mut controller, mut dev) = setup(false);
    let mut params = Parameters::from_pairs([(PARAM_INCALL_MUSIC, value)]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert_eq!(hw.calls(), vec![expected]);
    assert!(params.is_empty());
}

/// call_state keys drive the multi-session update while in a call
#[test]
fn test_call_state_parameters_start_sessions() {
    let (hw, mut controller, mut dev) = setup(true);
    dev.voice.in_call = true;

    let mut params = Parameters::from_pairs([
        ("vsid", format!("{:#x}", VOLTE_VSID)),
        ("call_state", "2".to_string()),
    ]);
    controller.set_parameters(&mut dev, &mut params).unwrap();

    let volte = dev.voice.session(2).unwrap();
    assert_eq!(volte.state.current, CallState::Active);
    assert!(hw.position(&HwCall::StartVoiceCall { vsid: VOLTE_VSID }).is_some());
    assert!(controller.is_lte_call_active(&dev));

    let mut params = Parameters::from_pairs([
        ("vsid", format!("{:#x}", VOLTE_VSID)),
        ("call_state", "1".to_string()),
    ]);
    controller.set_parameters(&mut dev, &mut params).unwrap();
    assert!(!dev.voice.session(2).unwrap().is_active());
    assert_eq!(hw.open_stream_count(), 0);
}

#[test]
fn test_get_parameters_delegates_to_extension() {
    let (_, controller, dev) = setup(false);
    let query = Parameters::from_pairs([("vsid", "")]);
    let mut reply = Parameters::new();
    controller.get_parameters(&dev, &query, &mut reply);
    assert!(reply.is_empty());
}
