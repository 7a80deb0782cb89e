// Voice Call HAL Core - Rust voice session lifecycle
// Call start/stop with rollback, mute/volume policy, in-call recording selection

// Module declarations
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod voice;

// Re-exports for convenience
pub use config::HalConfig;
pub use device::{AudioDevice, AudioMode, CallOutput, UsecaseId};
pub use error::{ErrorCode, VoiceError};
pub use voice::{HalServices, Parameters, VoiceController};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_from_config() {
        let config = HalConfig::default();
        let mut dev = AudioDevice::from_config(&config);
        let hw = engine::backend::StubHardware::new();
        let controller = VoiceController::with_device(hw.services(false), config.voice, &mut dev);
        assert!(!controller.is_call_state_active(&dev));
        assert_eq!(dev.voice.capacity(), 1);
    }
}
