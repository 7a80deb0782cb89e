// Error types for the voice call HAL
//
// This module defines the voice error type, its errno-style status codes and
// the structured logging helper shared by every voice operation.

mod voice;

pub use voice::{log_voice_error, ErrorKind, ExtensionResultExt, VoiceError, VoiceErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent status reporting across
/// the HAL boundary.
pub trait ErrorCode {
    /// Get the numeric status code (negative errno or verbatim platform status)
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Collapse a voice result into the HAL status convention (0 or negative).
pub fn status_of<T>(result: &Result<T, VoiceError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.code(),
    }
}
