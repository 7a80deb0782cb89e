//! Voice key/value parameters (TTY, HAC, incall music, extension keys).
//!
//! Splitting the framework's `key=value;...` string is done by the caller;
//! this module only interprets the pairs.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::mute::ignore_unsupported;
use super::VoiceController;
use crate::device::{AudioDevice, TtyMode, TTY_MODE_CLEAR};
use crate::error::{log_voice_error, VoiceError};

pub const PARAM_TTY_MODE: &str = "tty_mode";
pub const TTY_OFF: &str = "tty_off";
pub const TTY_VCO: &str = "tty_vco";
pub const TTY_HCO: &str = "tty_hco";
pub const TTY_FULL: &str = "tty_full";

pub const PARAM_HAC: &str = "hac";
pub const HAC_ON: &str = "ON";

pub const PARAM_INCALL_MUSIC: &str = "incall_music_enabled";

/// Ordered key/value parameter set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_tty_mode(value: &str) -> Option<TtyMode> {
    match value {
        TTY_OFF => Some(TtyMode::Off),
        TTY_VCO => Some(TtyMode::Vco),
        TTY_HCO => Some(TtyMode::Hco),
        TTY_FULL => Some(TtyMode::Full),
        _ => None,
    }
}

impl VoiceController {
    /// Apply the voice keys in `params`, removing each consumed key.
    pub fn set_parameters(
        &mut self,
        dev: &mut AudioDevice,
        params: &mut Parameters,
    ) -> Result<(), VoiceError> {
        debug!("set_parameters: enter: {:?}", params);
        let result = self.apply_parameters(dev, params);
        if let Err(err) = &result {
            log_voice_error(err, "set_parameters");
        }
        debug!("set_parameters: exit with {:?}", result);
        result
    }

    fn apply_parameters(
        &mut self,
        dev: &mut AudioDevice,
        params: &mut Parameters,
    ) -> Result<(), VoiceError> {
        ignore_unsupported(self.services.extension.set_parameters(dev, params))?;
        if self.services.extension.is_multi_session_supported()
            && dev.voice.in_call
            && dev
                .voice
                .sessions()
                .any(|s| s.state.new != s.state.current)
        {
            self.update_calls(dev)?;
        }

        ignore_unsupported(self.services.aux.voip_set_parameters(params))?;

        if let Some(value) = params.remove(PARAM_TTY_MODE) {
            let tty_mode = parse_tty_mode(&value).ok_or_else(|| VoiceError::InvalidParameter {
                key: PARAM_TTY_MODE.to_string(),
                value: value.clone(),
            })?;
            if tty_mode != dev.voice.tty_mode {
                dev.voice.tty_mode = tty_mode;
                dev.acdb_settings = (dev.acdb_settings & TTY_MODE_CLEAR) | tty_mode.acdb_bits();
                if self.is_call_state_active_in_call(dev) {
                    self.update_devices_for_all_voice_usecases(dev)?;
                }
            }
        }

        if let Some(value) = params.remove(PARAM_HAC) {
            let hac = value == HAC_ON;
            if hac != dev.voice.hac {
                dev.voice.hac = hac;
                if self.is_in_call(dev) {
                    self.update_devices_for_all_voice_usecases(dev)?;
                }
            }
        }

        if let Some(value) = params.remove(PARAM_INCALL_MUSIC) {
            let result = if value == "true" {
                self.services.platform.start_incall_music()
            } else {
                self.services.platform.stop_incall_music()
            };
            if let Err(err) = result {
                warn!("set_parameters: incall music update failed: {}", err);
            }
        }

        Ok(())
    }

    /// Answer voice queries; only the extension has voice keys to report.
    pub fn get_parameters(&self, dev: &AudioDevice, query: &Parameters, reply: &mut Parameters) {
        self.services.extension.get_parameters(dev, query, reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tty_mode() {
        assert_eq!(parse_tty_mode("tty_full"), Some(TtyMode::Full));
        assert_eq!(parse_tty_mode("tty_off"), Some(TtyMode::Off));
        assert_eq!(parse_tty_mode("TTY_FULL"), None);
        assert_eq!(parse_tty_mode(""), None);
    }

    #[test]
    fn test_parameters_basic_ops() {
        let mut params = Parameters::from_pairs([("hac", "ON"), ("tty_mode", "tty_vco")]);
        assert_eq!(params.get("hac"), Some("ON"));
        assert_eq!(params.remove("hac"), Some("ON".to_string()));
        assert!(!params.contains("hac"));
        params.insert("vsid", "1");
        assert_eq!(params.iter().count(), 2);
    }
}
