//! Value types shared by the voice path: sound devices, transports,
//! usecases, capture sources and PCM configuration.

use serde::{Deserialize, Serialize};

/// Device-wide audio mode set by the framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    #[default]
    Normal,
    Ringtone,
    InCall,
    InCommunication,
    CallScreen,
}

/// Resolved hardware endpoint (what the mixer paths and calibration key on).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SndDevice {
    #[default]
    None,

    // Playback endpoints
    OutHandset,
    OutSpeaker,
    OutVoiceHandset,
    OutVoiceSpeaker,
    OutVoiceHeadphones,
    OutVoiceHeadset,
    OutVoiceAncHeadset,
    OutVoiceAncFbHeadset,
    OutVoiceUsbHeadset,
    OutUsbHeadset,
    OutAncHandset,
    OutBtSco,

    // Capture endpoints
    InHandsetMic,
    InVoiceDmic,
    InAancHandsetMic,
    InVoiceSpeakerMic,
    InVoiceSpeakerDmic,
    InVoiceSpeakerDmicBroadside,
    InVoiceSpeakerQmic,
    InVoiceHeadsetMic,
    InVoiceUsbHeadsetMic,
    InBtScoMic,
    InIncallRecTx,
    InIncallRecRx,
    InIncallRecRxTx,
}

impl SndDevice {
    /// Platform name used in logs and mixer lookups.
    pub fn name(self) -> &'static str {
        match self {
            SndDevice::None => "none",
            SndDevice::OutHandset => "handset",
            SndDevice::OutSpeaker => "speaker",
            SndDevice::OutVoiceHandset => "voice-handset",
            SndDevice::OutVoiceSpeaker => "voice-speaker",
            SndDevice::OutVoiceHeadphones => "voice-headphones",
            SndDevice::OutVoiceHeadset => "voice-headset",
            SndDevice::OutVoiceAncHeadset => "voice-anc-headset",
            SndDevice::OutVoiceAncFbHeadset => "voice-anc-fb-headset",
            SndDevice::OutVoiceUsbHeadset => "voice-usb-headset",
            SndDevice::OutUsbHeadset => "usb-headset",
            SndDevice::OutAncHandset => "anc-handset",
            SndDevice::OutBtSco => "bt-sco-headset",
            SndDevice::InHandsetMic => "handset-mic",
            SndDevice::InVoiceDmic => "voice-dmic-ef",
            SndDevice::InAancHandsetMic => "aanc-handset-mic",
            SndDevice::InVoiceSpeakerMic => "voice-speaker-mic",
            SndDevice::InVoiceSpeakerDmic => "voice-speaker-dmic-ef",
            SndDevice::InVoiceSpeakerDmicBroadside => "voice-speaker-dmic-broadside",
            SndDevice::InVoiceSpeakerQmic => "voice-speaker-qmic",
            SndDevice::InVoiceHeadsetMic => "voice-headset-mic",
            SndDevice::InVoiceUsbHeadsetMic => "voice-usb-headset-mic",
            SndDevice::InBtScoMic => "bt-sco-mic",
            SndDevice::InIncallRecTx => "incall-rec-tx",
            SndDevice::InIncallRecRx => "incall-rec-rx",
            SndDevice::InIncallRecRxTx => "incall-rec-rx-tx",
        }
    }

    pub fn is_none(self) -> bool {
        self == SndDevice::None
    }
}

/// Framework-level output/input transport a stream is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDeviceType {
    Earpiece,
    Speaker,
    WiredHeadset,
    WiredHeadphone,
    BluetoothSco,
    BluetoothScoHeadset,
    BluetoothScoCarkit,
    UsbHeadset,
    UsbDevice,
    Telephony,
}

impl AudioDeviceType {
    pub fn is_sco(self) -> bool {
        matches!(
            self,
            AudioDeviceType::BluetoothSco
                | AudioDeviceType::BluetoothScoHeadset
                | AudioDeviceType::BluetoothScoCarkit
        )
    }
}

/// Named routing configurations known to the voice path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsecaseId {
    VoiceCall,
    Voice2Call,
    VolteCall,
    QchatCall,
    VowlanCall,
    VoicemmodeCall1,
    VoicemmodeCall2,
    IncallRecUplink,
    IncallRecUplinkCompress,
    IncallRecDownlink,
    IncallRecDownlinkCompress,
    IncallRecUplinkAndDownlink,
    IncallRecUplinkAndDownlinkCompress,
    IncallMusicUplink,
    IncallMusicUplink2,
}

impl UsecaseId {
    pub fn name(self) -> &'static str {
        match self {
            UsecaseId::VoiceCall => "voice-call",
            UsecaseId::Voice2Call => "voice2-call",
            UsecaseId::VolteCall => "volte-call",
            UsecaseId::QchatCall => "qchat-call",
            UsecaseId::VowlanCall => "vowlan-call",
            UsecaseId::VoicemmodeCall1 => "voicemmode1-call",
            UsecaseId::VoicemmodeCall2 => "voicemmode2-call",
            UsecaseId::IncallRecUplink => "incall-rec-uplink",
            UsecaseId::IncallRecUplinkCompress => "incall-rec-uplink-compress",
            UsecaseId::IncallRecDownlink => "incall-rec-downlink",
            UsecaseId::IncallRecDownlinkCompress => "incall-rec-downlink-compress",
            UsecaseId::IncallRecUplinkAndDownlink => "incall-rec-uplink-and-downlink",
            UsecaseId::IncallRecUplinkAndDownlinkCompress => {
                "incall-rec-uplink-and-downlink-compress"
            }
            UsecaseId::IncallMusicUplink => "incall-music-uplink",
            UsecaseId::IncallMusicUplink2 => "incall-music-uplink2",
        }
    }

    /// Usecases that carry a telephony call leg.
    pub fn is_voice_call(self) -> bool {
        matches!(
            self,
            UsecaseId::VoiceCall
                | UsecaseId::Voice2Call
                | UsecaseId::VolteCall
                | UsecaseId::QchatCall
                | UsecaseId::VowlanCall
                | UsecaseId::VoicemmodeCall1
                | UsecaseId::VoicemmodeCall2
        )
    }
}

impl std::fmt::Display for UsecaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Category of an active usecase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsecaseType {
    PcmPlayback,
    PcmCapture,
    VoiceCall,
    VoipCall,
}

/// Stream direction, from the hardware's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcmDirection {
    /// Rx leg, towards the speaker/earpiece.
    Playback,
    /// Tx leg, from the microphone.
    Capture,
}

impl std::fmt::Display for PcmDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PcmDirection::Playback => f.write_str("playback"),
            PcmDirection::Capture => f.write_str("capture"),
        }
    }
}

/// Capture source requested by an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Default,
    Mic,
    VoiceUplink,
    VoiceDownlink,
    VoiceCall,
    Camcorder,
    VoiceRecognition,
    VoiceCommunication,
    Unprocessed,
}

/// Which legs of the call a capture source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingSource {
    Uplink,
    Downlink,
    UplinkAndDownlink,
    None,
}

/// Path a mute request is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteDirection {
    Tx,
    Rx,
}

impl MuteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            MuteDirection::Tx => "tx",
            MuteDirection::Rx => "rx",
        }
    }
}

/// Sample formats an input stream may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    PcmS16Le,
    PcmS24Le,
    PcmS32Le,
    AmrNb,
    AmrWb,
    Aac,
}

/// Hardware stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmConfig {
    pub channels: u32,
    pub rate: u32,
    pub period_size: u32,
    pub period_count: u32,
}

impl PcmConfig {
    /// Mono, 8 kHz, 20 ms periods, double-buffered.
    pub const VOICE_CALL: PcmConfig = PcmConfig {
        channels: 1,
        rate: 8000,
        period_size: 160,
        period_count: 2,
    };
}

impl Default for PcmConfig {
    fn default() -> Self {
        Self::VOICE_CALL
    }
}
