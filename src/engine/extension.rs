//! Optional voice extension (multi-session support).
//!
//! Every method defaults to [`VoiceError::NotSupported`]; the controller then
//! falls back to its single-session behavior via
//! [`ExtensionResultExt::or_base`](crate::error::ExtensionResultExt::or_base).

use log::{debug, warn};

use crate::device::{AudioDevice, CallState, UsecaseId};
use crate::error::VoiceError;
use crate::voice::Parameters;

pub const VOICE2_VSID: u32 = 0x10DC_1000;
pub const VOLTE_VSID: u32 = 0x10C0_2000;
pub const QCHAT_VSID: u32 = 0x1080_3000;
pub const VOWLAN_VSID: u32 = 0x1000_2000;
pub const VOICEMMODE1_VSID: u32 = 0x11C0_5000;
pub const VOICEMMODE2_VSID: u32 = 0x11DC_5000;

pub const PARAM_VSID: &str = "vsid";
pub const PARAM_CALL_STATE: &str = "call_state";

/// Hooks a platform extension may override.
pub trait VoiceExtension: Send {
    fn is_multi_session_supported(&self) -> bool {
        false
    }

    /// Runs after the voice state has been reset.
    fn init(&mut self, _dev: &mut AudioDevice) {}

    /// Session slot serving `usecase`.
    fn session_for_usecase(
        &self,
        _dev: &AudioDevice,
        _usecase: UsecaseId,
    ) -> Result<usize, VoiceError> {
        Err(VoiceError::NotSupported)
    }

    /// Voice usecase carried by session slot `index`.
    fn usecase_for_session(&self, _index: usize) -> Result<UsecaseId, VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn is_call_state_active(&self, _dev: &AudioDevice) -> Result<bool, VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn active_session_id(&self, _dev: &AudioDevice) -> Result<u32, VoiceError> {
        Err(VoiceError::NotSupported)
    }

    /// Consume the keys the extension understands.
    fn set_parameters(
        &mut self,
        _dev: &mut AudioDevice,
        _params: &mut Parameters,
    ) -> Result<(), VoiceError> {
        Err(VoiceError::NotSupported)
    }

    fn get_parameters(&self, _dev: &AudioDevice, _query: &Parameters, _reply: &mut Parameters) {}
}

/// Build without a voice extension.
#[derive(Debug, Default)]
pub struct NoExtension;

impl VoiceExtension for NoExtension {}

/// Slot layout used by the multi-session extension: (usecase, vsid).
pub const SESSION_TABLE: [(UsecaseId, u32); 7] = [
    (UsecaseId::VoiceCall, crate::device::VOICE_VSID),
    (UsecaseId::Voice2Call, VOICE2_VSID),
    (UsecaseId::VolteCall, VOLTE_VSID),
    (UsecaseId::QchatCall, QCHAT_VSID),
    (UsecaseId::VowlanCall, VOWLAN_VSID),
    (UsecaseId::VoicemmodeCall1, VOICEMMODE1_VSID),
    (UsecaseId::VoicemmodeCall2, VOICEMMODE2_VSID),
];

/// Multi-session extension: one slot per concurrently supported call leg.
#[derive(Debug, Default)]
pub struct MultiSessionExtension;

impl MultiSessionExtension {
    pub fn new() -> Self {
        Self
    }

    fn slot_for_vsid(dev: &AudioDevice, vsid: u32) -> Option<usize> {
        dev.voice
            .sessions()
            .find(|s| s.vsid == vsid)
            .map(|s| s.index())
    }
}

fn parse_vsid(value: &str) -> Option<u32> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_call_state(value: &str) -> Option<CallState> {
    match value {
        "active" | "2" => Some(CallState::Active),
        "inactive" | "1" => Some(CallState::Inactive),
        _ => None,
    }
}

impl VoiceExtension for MultiSessionExtension {
    fn is_multi_session_supported(&self) -> bool {
        true
    }

    fn init(&mut self, dev: &mut AudioDevice) {
        for session in dev.voice.sessions_mut() {
            if let Some((_, vsid)) = SESSION_TABLE.get(session.index()) {
                session.vsid = *vsid;
            }
        }
    }

    fn session_for_usecase(
        &self,
        dev: &AudioDevice,
        usecase: UsecaseId,
    ) -> Result<usize, VoiceError> {
        SESSION_TABLE
            .iter()
            .position(|(id, _)| *id == usecase)
            .filter(|idx| *idx < dev.voice.capacity())
            .ok_or(VoiceError::SessionNotFound { usecase })
    }

    fn usecase_for_session(&self, index: usize) -> Result<UsecaseId, VoiceError> {
        SESSION_TABLE
            .get(index)
            .map(|(id, _)| *id)
            .ok_or(VoiceError::NotSupported)
    }

    fn is_call_state_active(&self, dev: &AudioDevice) -> Result<bool, VoiceError> {
        Ok(dev.voice.any_session_active())
    }

    fn active_session_id(&self, dev: &AudioDevice) -> Result<u32, VoiceError> {
        dev.voice
            .sessions()
            .find(|s| s.is_active())
            .map(|s| s.vsid)
            .ok_or(VoiceError::NotSupported)
    }

    fn set_parameters(
        &mut self,
        dev: &mut AudioDevice,
        params: &mut Parameters,
    ) -> Result<(), VoiceError> {
        let (Some(vsid), Some(state)) = (params.get(PARAM_VSID), params.get(PARAM_CALL_STATE))
        else {
            return Ok(());
        };
        let vsid_text = vsid.to_string();
        let state_text = state.to_string();

        let vsid = parse_vsid(&vsid_text).ok_or_else(|| VoiceError::InvalidParameter {
            key: PARAM_VSID.to_string(),
            value: vsid_text.clone(),
        })?;
        let state = parse_call_state(&state_text).ok_or_else(|| VoiceError::InvalidParameter {
            key: PARAM_CALL_STATE.to_string(),
            value: state_text.clone(),
        })?;
        let Some(idx) = Self::slot_for_vsid(dev, vsid) else {
            warn!("set_parameters: no session slot for vsid {:#x}", vsid);
            return Err(VoiceError::InvalidParameter {
                key: PARAM_VSID.to_string(),
                value: vsid_text,
            });
        };

        params.remove(PARAM_VSID);
        params.remove(PARAM_CALL_STATE);
        if let Some(session) = dev.voice.session_mut(idx) {
            debug!(
                "set_parameters: session {} vsid {:#x} new state {:?}",
                idx, vsid, state
            );
            session.state.new = state;
        }
        Ok(())
    }

    fn get_parameters(&self, dev: &AudioDevice, query: &Parameters, reply: &mut Parameters) {
        if query.contains(PARAM_VSID) {
            if let Ok(vsid) = self.active_session_id(dev) {
                reply.insert(PARAM_VSID, format!("{:#x}", vsid));
            }
        }
    }
}
