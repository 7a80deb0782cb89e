// Voice error types and constants

use crate::device::{AudioSource, PcmDirection, UsecaseId};
use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Voice status code constants
///
/// Statuses follow the HAL convention: 0 on success, a negative errno on
/// failure. Platform failures keep the platform's own status.
pub struct VoiceErrorCodes {}

impl VoiceErrorCodes {
    /// Unresolvable session/usecase, bad argument or parameter value
    pub const INVALID_ARGUMENT: i32 = -libc::EINVAL;

    /// Usecase record could not be allocated
    pub const OUT_OF_MEMORY: i32 = -libc::ENOMEM;

    /// Stream or route failure after hardware was touched
    pub const IO: i32 = -libc::EIO;

    /// Optional extension does not implement the operation
    pub const NOT_SUPPORTED: i32 = -libc::ENOSYS;
}

/// Coarse classification used to decide how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected before any hardware mutation; simply aborts.
    InvalidArgument,
    /// Detected before any hardware mutation; simply aborts.
    ResourceExhausted,
    /// Detected after partial mutation; triggers rollback.
    HardwareIo,
    /// Extension signal meaning "use the base implementation".
    NotSupported,
}

/// Log a voice error with structured context
///
/// Fields: code (status returned to the caller), component, message, and the
/// operation in which the error surfaced.
pub fn log_voice_error(err: &VoiceError, context: &str) {
    error!(
        "Voice error in {}: code={}, component=VoiceHal, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Voice path errors
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceError {
    /// No session slot is mapped to the usecase
    SessionNotFound { usecase: UsecaseId },

    /// Usecase is not linked into the active list
    UsecaseNotFound { usecase: UsecaseId },

    /// Usecase is already linked; starting it again would orphan its streams
    UsecaseBusy { usecase: UsecaseId },

    /// Caller has not chosen a call output yet
    NoCallOutput,

    /// Usecase record allocation failed
    AllocationFailed { what: &'static str },

    /// Two-device combos cannot carry a voice call
    InvalidDeviceCombo { device_count: usize },

    /// Output is Bluetooth SCO but the SCO link is down
    ScoNotReady,

    /// Platform has no hardware stream id for the usecase
    InvalidPcmDevice {
        usecase: UsecaseId,
        rx: Option<u32>,
        tx: Option<u32>,
    },

    /// Hardware stream could not be opened
    StreamOpenFailed {
        direction: PcmDirection,
        device: u32,
        reason: String,
    },

    /// Hardware stream opened but did not become ready
    StreamNotReady {
        direction: PcmDirection,
        reason: String,
    },

    /// Hardware stream failed to start; status is kept verbatim
    StreamStartFailed {
        direction: PcmDirection,
        status: i32,
        reason: String,
    },

    /// Platform control-plane call failed; status is kept verbatim
    Platform { op: &'static str, status: i32 },

    /// Parameter value is not one of the accepted strings
    InvalidParameter { key: String, value: String },

    /// In-call capture requested while no call is active
    RecordingWithoutCall { source: AudioSource },

    /// Extension does not implement the requested operation
    NotSupported,
}

impl VoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VoiceError::SessionNotFound { .. }
            | VoiceError::UsecaseNotFound { .. }
            | VoiceError::UsecaseBusy { .. }
            | VoiceError::NoCallOutput
            | VoiceError::InvalidDeviceCombo { .. }
            | VoiceError::InvalidParameter { .. }
            | VoiceError::RecordingWithoutCall { .. } => ErrorKind::InvalidArgument,
            VoiceError::AllocationFailed { .. } => ErrorKind::ResourceExhausted,
            VoiceError::ScoNotReady
            | VoiceError::InvalidPcmDevice { .. }
            | VoiceError::StreamOpenFailed { .. }
            | VoiceError::StreamNotReady { .. }
            | VoiceError::StreamStartFailed { .. }
            | VoiceError::Platform { .. } => ErrorKind::HardwareIo,
            VoiceError::NotSupported => ErrorKind::NotSupported,
        }
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, VoiceError::NotSupported)
    }
}

impl ErrorCode for VoiceError {
    fn code(&self) -> i32 {
        match self {
            VoiceError::SessionNotFound { .. }
            | VoiceError::UsecaseNotFound { .. }
            | VoiceError::UsecaseBusy { .. }
            | VoiceError::NoCallOutput
            | VoiceError::InvalidParameter { .. }
            | VoiceError::RecordingWithoutCall { .. } => VoiceErrorCodes::INVALID_ARGUMENT,
            VoiceError::AllocationFailed { .. } => VoiceErrorCodes::OUT_OF_MEMORY,
            // A combo device is rejected with an I/O status, like the SCO check.
            VoiceError::InvalidDeviceCombo { .. }
            | VoiceError::ScoNotReady
            | VoiceError::InvalidPcmDevice { .. }
            | VoiceError::StreamOpenFailed { .. }
            | VoiceError::StreamNotReady { .. } => VoiceErrorCodes::IO,
            VoiceError::StreamStartFailed { status, .. } | VoiceError::Platform { status, .. } => {
                *status
            }
            VoiceError::NotSupported => VoiceErrorCodes::NOT_SUPPORTED,
        }
    }

    fn message(&self) -> String {
        match self {
            VoiceError::SessionNotFound { usecase } => {
                format!("Couldn't find voice session for usecase {}", usecase)
            }
            VoiceError::UsecaseNotFound { usecase } => {
                format!("Could not find the usecase ({}) in the list", usecase)
            }
            VoiceError::UsecaseBusy { usecase } => {
                format!("Usecase ({}) is already active", usecase)
            }
            VoiceError::NoCallOutput => "Invalid current call output".to_string(),
            VoiceError::AllocationFailed { what } => {
                format!("Couldn't allocate memory for {}", what)
            }
            VoiceError::InvalidDeviceCombo { device_count } => {
                format!(
                    "Invalid combo device ({} devices) for voice call",
                    device_count
                )
            }
            VoiceError::ScoNotReady => "Couldn't find BT SCO, SCO is not ready".to_string(),
            VoiceError::InvalidPcmDevice { usecase, rx, tx } => {
                format!(
                    "Invalid PCM devices (rx: {:?} tx: {:?}) for the usecase ({})",
                    rx, tx, usecase
                )
            }
            VoiceError::StreamOpenFailed {
                direction,
                device,
                reason,
            } => {
                format!(
                    "Failed to open {} stream on device {}: {}",
                    direction, device, reason
                )
            }
            VoiceError::StreamNotReady { direction, reason } => {
                format!("{} stream not ready: {}", direction, reason)
            }
            VoiceError::StreamStartFailed {
                direction,
                status,
                reason,
            } => {
                format!(
                    "Failed to start {} stream (status {}): {}",
                    direction, status, reason
                )
            }
            VoiceError::Platform { op, status } => {
                format!("Platform {} failed with status {}", op, status)
            }
            VoiceError::InvalidParameter { key, value } => {
                format!("Invalid value '{}' for parameter '{}'", value, key)
            }
            VoiceError::RecordingWithoutCall { source } => {
                format!(
                    "Voice call is not active, incall rec usecase can't be selected for source {:?}",
                    source
                )
            }
            VoiceError::NotSupported => "Operation not supported".to_string(),
        }
    }
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VoiceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for VoiceError {}

/// Two-tier dispatch for optional extensions
///
/// The base implementation runs only when the extension explicitly reports
/// [`VoiceError::NotSupported`]; every other outcome is returned untouched.
pub trait ExtensionResultExt<T> {
    fn or_base<F>(self, base: F) -> Result<T, VoiceError>
    where
        F: FnOnce() -> Result<T, VoiceError>;
}

impl<T> ExtensionResultExt<T> for Result<T, VoiceError> {
    fn or_base<F>(self, base: F) -> Result<T, VoiceError>
    where
        F: FnOnce() -> Result<T, VoiceError>,
    {
        match self {
            Err(err) if err.is_not_supported() => base(),
            other => other,
        }
    }
}
