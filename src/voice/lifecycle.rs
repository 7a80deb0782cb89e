//! Voice usecase lifecycle: bring-up, teardown and rollback.
//!
//! `start_usecase` either leaves the session `Active` with both streams held
//! or runs `stop_usecase` on the same id before returning, so a failed start
//! never leaves streams, usecase records or sidetone behind.

use log::{debug, info, warn};

use super::VoiceController;
use crate::device::{
    AudioDevice, AudioMode, CallState, PcmConfig, PcmDirection, TtyMode, Usecase, UsecaseId,
    UsecaseType, VoiceSession, VoiceState, TTY_MODE_CLEAR, VOICE_SESS_IDX,
};
use crate::engine::backend::PcmHandle;
use crate::error::{log_voice_error, status_of, ErrorCode, ExtensionResultExt, VoiceError};
use crate::telemetry::VoiceEvent;

impl VoiceController {
    /// Reset the voice state of `dev` to its power-on defaults.
    ///
    /// Streams still held by a previous session are closed first.
    pub fn init(&mut self, dev: &mut AudioDevice) {
        self.release_streams(dev);

        let capacity = if self.services.extension.is_multi_session_supported() {
            self.config.max_voice_sessions
        } else {
            1
        };
        dev.voice = VoiceState::new(capacity);
        dev.voice.volume = self.config.default_volume;
        dev.acdb_settings = (dev.acdb_settings & TTY_MODE_CLEAR) | TtyMode::Off.acdb_bits();

        self.services.extension.init(dev);
        debug!("init: {} voice session slot(s)", dev.voice.capacity());
    }

    fn resolve_session(&self, dev: &AudioDevice, usecase: UsecaseId) -> Result<usize, VoiceError> {
        let index = self
            .services
            .extension
            .session_for_usecase(dev, usecase)
            .or_base(|| Ok(VOICE_SESS_IDX))?;
        if dev.voice.session(index).is_none() {
            return Err(VoiceError::SessionNotFound { usecase });
        }
        Ok(index)
    }

    /// Bring up the voice usecase `id`.
    ///
    /// Argument and allocation failures abort before any hardware is touched.
    /// Any later failure rolls back through [`stop_usecase`](Self::stop_usecase)
    /// and returns the original error.
    pub fn start_usecase(&mut self, dev: &mut AudioDevice, id: UsecaseId) -> Result<(), VoiceError> {
        info!("start_usecase: enter usecase:{}", id);

        let session_idx = self
            .resolve_session(dev, id)
            .and_then(|idx| self.register_usecase(dev, id).map(|()| idx))
            .map_err(|err| {
                log_voice_error(&err, "start_usecase");
                err
            })?;

        match self.bring_up(dev, id, session_idx) {
            Ok(vsid) => {
                if let Some(session) = dev.voice.session_mut(session_idx) {
                    session.state.current = CallState::Active;
                }
                if id == UsecaseId::VolteCall {
                    dev.voice.lte_call = true;
                }
                self.publish(VoiceEvent::CallStarted {
                    usecase: id,
                    session: session_idx,
                    vsid,
                });
                info!("start_usecase: exit: status(0)");
                Ok(())
            }
            Err(err) => {
                log_voice_error(&err, "start_usecase");
                if let Err(stop_err) = self.stop_usecase(dev, id) {
                    debug!("start_usecase: rollback stop reported {}", stop_err);
                }
                self.publish(VoiceEvent::StartRolledBack {
                    usecase: id,
                    code: err.code(),
                });
                info!("start_usecase: exit: status({})", err.code());
                Err(err)
            }
        }
    }

    /// Allocate the usecase record, run the pre-hardware checks and link it.
    fn register_usecase(&mut self, dev: &mut AudioDevice, id: UsecaseId) -> Result<(), VoiceError> {
        if dev.usecases.contains(id) {
            return Err(VoiceError::UsecaseBusy { usecase: id });
        }
        let devices = dev
            .current_call_output
            .as_ref()
            .map(|output| output.devices.clone())
            .ok_or(VoiceError::NoCallOutput)?;
        let usecase = Usecase::new(id, UsecaseType::VoiceCall, devices);

        dev.voice.uc_active = true;

        if dev.is_in_call_mode() && usecase.devices.len() == 2 {
            dev.voice.in_call = false;
            refresh_usecase_active(dev);
            return Err(VoiceError::InvalidDeviceCombo {
                device_count: usecase.devices.len(),
            });
        }

        dev.voice.use_device_mute = false;

        if usecase.has_sco_device() && !dev.bt_sco_on {
            refresh_usecase_active(dev);
            return Err(VoiceError::ScoNotReady);
        }

        dev.usecases.try_push(usecase).map_err(|err| {
            refresh_usecase_active(dev);
            err
        })
    }

    /// Hardware part of the start sequence. Returns the session's VSID.
    fn bring_up(
        &mut self,
        dev: &mut AudioDevice,
        id: UsecaseId,
        session_idx: usize,
    ) -> Result<u32, VoiceError> {
        self.services.selector.select_devices(dev, id)?;

        let rx_id = self
            .services
            .platform
            .pcm_device_id(id, PcmDirection::Playback);
        let tx_id = self
            .services
            .platform
            .pcm_device_id(id, PcmDirection::Capture);
        let (Some(rx_id), Some(tx_id)) = (rx_id, tx_id) else {
            return Err(VoiceError::InvalidPcmDevice {
                usecase: id,
                rx: rx_id,
                tx: tx_id,
            });
        };

        let mut pcm_config = self.config.pcm;
        match self.services.platform.sample_rate() {
            Ok(rate) => pcm_config.rate = rate,
            Err(err) => warn!("start_usecase: get_sample_rate failed: {}", err),
        }
        debug!("start_usecase: voice stream rate {}", pcm_config.rate);

        let card = dev.snd_card;
        let tx = self.open_ready(card, tx_id, PcmDirection::Capture, &pcm_config);
        let tx = store(&mut session_of(dev, session_idx, id)?.pcm_tx, tx)?;
        let rx = self.open_ready(card, rx_id, PcmDirection::Playback, &pcm_config);
        let rx = store(&mut session_of(dev, session_idx, id)?.pcm_rx, rx)?;
        debug!("start_usecase: opened tx stream {} and rx stream {}", tx, rx);

        // One loopback pair serves every leg.
        let loopback = self.config.loopback.clone();
        let open_loopback = loopback.enabled && !dev.loopback.is_open();
        if open_loopback {
            let lb_rx =
                self.open_ready(card, loopback.rx_device, PcmDirection::Playback, &pcm_config);
            store(&mut dev.loopback.rx, lb_rx)?;
            let lb_tx =
                self.open_ready(card, loopback.tx_device, PcmDirection::Capture, &pcm_config);
            store(&mut dev.loopback.tx, lb_tx)?;
        }

        let muted = dev.voice.mic_mute;
        if let Err(err) = self.set_mic_mute(dev, muted) {
            warn!("start_usecase: applying mic mute failed: {}", err);
        }

        if dev.mic_break_enabled {
            self.services.platform.set_mic_break_det(true);
        }

        {
            let session = session_of(dev, session_idx, id)?;
            self.start_stream(session.pcm_tx.as_ref())?;
            self.start_stream(session.pcm_rx.as_ref())?;
        }
        if open_loopback {
            self.start_stream(dev.loopback.tx.as_ref())?;
            self.start_stream(dev.loopback.rx.as_ref())?;
        }

        let out_device = dev
            .usecases
            .get(id)
            .map(|uc| uc.out_snd_device)
            .ok_or(VoiceError::UsecaseNotFound { usecase: id })?;
        // This leg is not Active yet: any active session means the paths are already on.
        if dev.is_in_call_mode() && !self.is_call_state_active(dev) {
            self.update_aanc_path(out_device, true);
            self.set_sidetone(out_device, true);
        }

        let volume = dev.voice.volume;
        if let Err(err) = self.set_volume(dev, volume) {
            warn!("start_usecase: applying volume failed: {}", err);
        }

        let vsid = session_of(dev, session_idx, id)?.vsid;
        self.services.platform.start_voice_call(vsid)?;
        Ok(vsid)
    }

    /// Open a stream and check it came up ready.
    ///
    /// A stream that opened but is not ready is handed back in the error
    /// slot so the caller can store it for teardown.
    fn open_ready(
        &mut self,
        card: u32,
        device: u32,
        direction: PcmDirection,
        config: &PcmConfig,
    ) -> Result<PcmHandle, (Option<PcmHandle>, VoiceError)> {
        debug!(
            "start_usecase: opening {} stream card_id({}) device_id({})",
            direction, card, device
        );
        let handle = self
            .services
            .pcm
            .open(card, device, direction, config)
            .map_err(|err| (None, err))?;
        if !self.services.pcm.is_ready(&handle) {
            let reason = self.services.pcm.error_text(&handle);
            return Err((
                Some(handle),
                VoiceError::StreamNotReady { direction, reason },
            ));
        }
        Ok(handle)
    }

    fn start_stream(&mut self, handle: Option<&PcmHandle>) -> Result<(), VoiceError> {
        let Some(handle) = handle else {
            return Ok(());
        };
        self.services.pcm.start(handle).map_err(|err| {
            warn!(
                "start_usecase: {}",
                self.services.pcm.error_text(handle)
            );
            err
        })
    }

    /// Close every handle still held by a session slot or the loopback pair.
    fn release_streams(&mut self, dev: &mut AudioDevice) {
        for session in dev.voice.sessions_mut() {
            if let Some(handle) = session.pcm_rx.take() {
                self.services.pcm.close(handle);
            }
            if let Some(handle) = session.pcm_tx.take() {
                self.services.pcm.close(handle);
            }
        }
        self.close_loopback(dev);
    }

    fn close_loopback(&mut self, dev: &mut AudioDevice) {
        if let Some(handle) = dev.loopback.rx.take() {
            self.services.pcm.close(handle);
        }
        if let Some(handle) = dev.loopback.tx.take() {
            self.services.pcm.close(handle);
        }
    }

    /// Stop every linked voice usecase and release any stream still held.
    ///
    /// Use before dropping `dev`; leaves no handle open on the provider.
    pub fn shutdown(&mut self, dev: &mut AudioDevice) {
        for id in dev.usecases.voice_call_ids() {
            if let Err(err) = self.stop_usecase(dev, id) {
                warn!("shutdown: stopping {} failed: {}", id, err);
            }
        }
        self.release_streams(dev);
        dev.voice.in_call = false;
        debug!("shutdown: {} stream(s) left", dev.held_stream_count());
    }

    /// Tear down the voice usecase `id`.
    ///
    /// The session is marked inactive before any hardware is touched. The
    /// returned result is the platform stop status; later teardown steps do
    /// not fail the call.
    pub fn stop_usecase(&mut self, dev: &mut AudioDevice, id: UsecaseId) -> Result<(), VoiceError> {
        info!("stop_usecase: enter usecase:{}", id);

        let session_idx = self.resolve_session(dev, id).map_err(|err| {
            log_voice_error(&err, "stop_usecase");
            err
        })?;
        let Some((out_device, in_device)) = dev
            .usecases
            .get(id)
            .map(|uc| (uc.out_snd_device, uc.in_snd_device))
        else {
            let err = VoiceError::UsecaseNotFound { usecase: id };
            log_voice_error(&err, "stop_usecase");
            return Err(err);
        };

        let vsid = {
            let session = session_of(dev, session_idx, id)?;
            session.state.current = CallState::Inactive;
            session.vsid
        };

        // Only the last active leg switches these paths off, whatever the mode is now.
        if !self.is_call_state_active(dev) {
            self.set_sidetone(out_device, false);
            self.update_aanc_path(out_device, false);
        }

        let result = self.services.platform.stop_voice_call(vsid);

        if let Some(session) = dev.voice.session_mut(session_idx) {
            if let Some(handle) = session.pcm_rx.take() {
                self.services.pcm.close(handle);
            }
            if let Some(handle) = session.pcm_tx.take() {
                self.services.pcm.close(handle);
            }
        }
        if !dev.voice.sessions().any(|s| s.holds_streams()) {
            self.close_loopback(dev);
        }

        if let Some(usecase) = dev.usecases.remove(id) {
            if let Err(err) = self.services.routes.disable_route(&usecase) {
                warn!("stop_usecase: disable_route failed: {}", err);
            }
            for device in [usecase.out_snd_device, usecase.in_snd_device] {
                if device.is_none() {
                    continue;
                }
                if let Err(err) = self.services.routes.disable_snd_device(device) {
                    warn!("stop_usecase: disable {} failed: {}", device.name(), err);
                }
            }
        }
        debug!(
            "stop_usecase: released {} / {}",
            out_device.name(),
            in_device.name()
        );

        dev.voice.lte_call = false;
        refresh_usecase_active(dev);

        let status = status_of(&result);
        self.publish(VoiceEvent::CallStopped {
            usecase: id,
            vsid,
            status,
        });
        info!("stop_usecase: exit: status({})", status);
        result
    }

    /// Telephony layer entered a call.
    pub fn start_call(&mut self, dev: &mut AudioDevice) -> Result<(), VoiceError> {
        dev.voice.in_call = true;
        let muted = dev.voice.mic_mute;
        if let Err(err) = self.set_mic_mute(dev, muted) {
            warn!("start_call: applying mic mute failed: {}", err);
        }
        if self.services.extension.is_multi_session_supported() {
            self.update_calls(dev)
        } else {
            self.start_usecase(dev, UsecaseId::VoiceCall)
        }
    }

    /// Telephony layer left the call; every session is brought down.
    pub fn stop_call(&mut self, dev: &mut AudioDevice) -> Result<(), VoiceError> {
        dev.voice.in_call = false;
        if self.services.extension.is_multi_session_supported() {
            for session in dev.voice.sessions_mut() {
                session.state.new = CallState::Inactive;
            }
            self.update_calls(dev)
        } else {
            self.stop_usecase(dev, UsecaseId::VoiceCall)
        }
    }

    /// Reconcile every session's requested state with its current state.
    ///
    /// All sessions are processed; the first failure is returned.
    pub fn update_calls(&mut self, dev: &mut AudioDevice) -> Result<(), VoiceError> {
        let pending: Vec<(usize, CallState)> = dev
            .voice
            .sessions()
            .filter(|s| s.state.new != s.state.current)
            .map(|s| (s.index(), s.state.new))
            .collect();

        let mut first_err = None;
        for (index, requested) in pending {
            let result = self
                .services
                .extension
                .usecase_for_session(index)
                .and_then(|usecase| match requested {
                    CallState::Active => self.start_usecase(dev, usecase),
                    CallState::Inactive => self.stop_usecase(dev, usecase),
                });
            if let Err(err) = result {
                warn!("update_calls: session {} failed: {}", index, err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Point every voice usecase at the current call output and reselect devices.
    pub fn update_devices_for_all_voice_usecases(
        &mut self,
        dev: &mut AudioDevice,
    ) -> Result<(), VoiceError> {
        let ids = dev.usecases.voice_call_ids();
        let devices = dev
            .current_call_output
            .as_ref()
            .map(|output| output.devices.clone());
        let mut first_err = None;
        for id in ids {
            debug!("update_devices_for_all_voice_usecases: updating device for {}", id);
            if let (Some(devices), Some(usecase)) = (devices.as_ref(), dev.usecases.get_mut(id)) {
                usecase.devices = devices.clone();
            }
            if let Err(err) = self.services.selector.select_devices(dev, id) {
                warn!("update_devices_for_all_voice_usecases: {} failed: {}", id, err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// `uc_active` mirrors whether any voice usecase is still linked.
fn refresh_usecase_active(dev: &mut AudioDevice) {
    dev.voice.uc_active = dev.usecases.count_of(UsecaseType::VoiceCall) > 0;
}

fn session_of(
    dev: &mut AudioDevice,
    index: usize,
    usecase: UsecaseId,
) -> Result<&mut VoiceSession, VoiceError> {
    dev.voice
        .session_mut(index)
        .ok_or(VoiceError::SessionNotFound { usecase })
}

/// Store an opened stream in its slot, including one that failed readiness,
/// and return its id.
fn store(
    slot: &mut Option<PcmHandle>,
    opened: Result<PcmHandle, (Option<PcmHandle>, VoiceError)>,
) -> Result<u64, VoiceError> {
    match opened {
        Ok(handle) => {
            let id = handle.id();
            *slot = Some(handle);
            Ok(id)
        }
        Err((handle, err)) => {
            *slot = handle;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;
    use crate::device::{AudioDeviceType, CallOutput};
    use crate::engine::backend::{FaultPoint, HwCall, StubHardware};

    fn setup(multi_session: bool) -> (StubHardware, VoiceController, AudioDevice) {
        let hw = StubHardware::new();
        let mut dev = AudioDevice::new(0);
        dev.mode = AudioMode::InCall;
        dev.current_call_output = Some(CallOutput::single(AudioDeviceType::Earpiece));
        let controller =
            VoiceController::with_device(hw.services(multi_session), VoiceConfig::default(), &mut dev);
        (hw, controller, dev)
    }

    #[test]
    fn test_init_capacity_follows_extension() {
        let (_, _, dev) = setup(false);
        assert_eq!(dev.voice.capacity(), 1);
        let (_, _, dev) = setup(true);
        assert_eq!(dev.voice.capacity(), crate::device::MAX_VOICE_SESSIONS);
    }

    #[test]
    fn test_start_then_stop() {
        let (hw, mut controller, mut dev) = setup(false);
        controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
        let session = dev.voice.session(VOICE_SESS_IDX).unwrap();
        assert!(session.is_active());
        assert!(session.pcm_rx.is_some() && session.pcm_tx.is_some());
        assert_eq!(hw.open_stream_count(), 2);

        controller.stop_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
        let session = dev.voice.session(VOICE_SESS_IDX).unwrap();
        assert!(!session.is_active());
        assert!(!session.holds_streams());
        assert!(dev.usecases.is_empty());
        assert_eq!(hw.open_stream_count(), 0);
    }

    #[test]
    fn test_capture_opens_before_playback() {
        let (hw, mut controller, mut dev) = setup(false);
        controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
        let calls = hw.calls();
        let first_open = calls
            .iter()
            .find_map(|c| match c {
                HwCall::PcmOpen { direction, .. } => Some(*direction),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_open, PcmDirection::Capture);
    }

    #[test]
    fn test_rollback_releases_streams() {
        let (hw, mut controller, mut dev) = setup(false);
        hw.inject(FaultPoint::StartPlayback);
        let err = controller
            .start_usecase(&mut dev, UsecaseId::VoiceCall)
            .unwrap_err();
        assert!(matches!(err, VoiceError::StreamStartFailed { .. }));
        assert_eq!(hw.open_stream_count(), 0);
        assert!(dev.usecases.is_empty());
        assert!(!dev.voice.uc_active);
    }

    #[test]
    fn test_duplicate_start_is_rejected() {
        let (hw, mut controller, mut dev) = setup(false);
        controller.start_usecase(&mut dev, UsecaseId::VoiceCall).unwrap();
        let err = controller
            .start_usecase(&mut dev, UsecaseId::VoiceCall)
            .unwrap_err();
        assert_eq!(err, VoiceError::UsecaseBusy { usecase: UsecaseId::VoiceCall });
        assert_eq!(hw.open_stream_count(), 2);
    }

    #[test]
    fn test_stop_unknown_usecase() {
        let (_, mut controller, mut dev) = setup(false);
        let err = controller
            .stop_usecase(&mut dev, UsecaseId::VoiceCall)
            .unwrap_err();
        assert_eq!(err.code(), -libc::EINVAL);
    }

    #[test]
    fn test_stop_call_multi_session_stops_every_leg() {
        let (hw, mut controller, mut dev) = setup(true);
        for session in dev.voice.sessions_mut().take(2) {
            session.state.new = CallState::Active;
        }
        controller.start_call(&mut dev).unwrap();
        assert_eq!(dev.voice.active_session_count(), 2);

        controller.stop_call(&mut dev).unwrap();
        assert_eq!(dev.voice.active_session_count(), 0);
        assert_eq!(hw.open_stream_count(), 0);
        assert!(!dev.voice.in_call);
    }
}
