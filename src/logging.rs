//! Logging setup
//!
//! Library code logs through the `log` facade. This installs a `tracing`
//! subscriber that also receives those records: logcat on Android, a
//! formatted stderr writer elsewhere.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the platform subscriber. Later calls are no-ops.
pub fn init_logging() {
    INIT.call_once(install);
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        fn install() {
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;

            match tracing_android::layer("VoiceHal") {
                Ok(layer) => {
                    if let Err(err) = tracing_subscriber::registry().with(layer).try_init() {
                        log::warn!("[Logging] subscriber already installed: {}", err);
                    }
                }
                Err(err) => eprintln!("VoiceHal: failed to open logcat: {err}"),
            }
        }
    } else {
        fn install() {
            let result = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_writer(std::io::stderr)
                .try_init();
            if let Err(err) = result {
                log::warn!("[Logging] subscriber already installed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging();
        log::info!("logging initialized twice without panicking");
    }
}
