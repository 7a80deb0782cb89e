use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use voice_call_hal::device::{AudioFormat, AudioSource, CallState};
use voice_call_hal::engine::backend::{FaultPoint, HwCall, StubHardware};
use voice_call_hal::error::ErrorCode;
use voice_call_hal::logging::init_logging;
use voice_call_hal::telemetry::TelemetrySnapshot;
use voice_call_hal::voice::CaptureRequest;
use voice_call_hal::{AudioDevice, AudioMode, CallOutput, HalConfig, VoiceController};

#[derive(Parser, Debug)]
#[command(
    name = "voice_sim",
    about = "Drive the voice call controller against stub hardware"
)]
struct Cli {
    /// JSON configuration file (defaults apply when missing)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use the multi-session extension
    #[arg(long)]
    multi_session: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start N call legs, then stop them all
    Call {
        #[arg(long, default_value_t = 1)]
        legs: usize,
        /// Inject a hardware failure (e.g. start_playback, open_capture)
        #[arg(long, value_parser = parse_snake::<FaultPoint>)]
        fail_at: Option<FaultPoint>,
    },
    /// Apply a voice volume during a call
    Volume { value: f32 },
    /// Select the in-call recording usecase for a capture source
    Record {
        #[arg(long, value_parser = parse_snake::<AudioSource>)]
        source: AudioSource,
        #[arg(long)]
        compressed: bool,
    },
    /// Toggle mic mute during a call
    Mute {
        #[arg(long)]
        device_mute: bool,
    },
}

#[derive(Serialize)]
struct SimReport {
    status: i32,
    calls: Vec<HwCall>,
    open_streams: usize,
    telemetry: TelemetrySnapshot,
}

fn parse_snake<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|err| format!("unknown value '{value}': {err}"))
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(HalConfig::load_from_file)
        .unwrap_or_default();

    let hw = StubHardware::new();
    let mut dev = AudioDevice::from_config(&config);
    dev.mode = AudioMode::InCall;
    dev.current_call_output = Some(CallOutput::single(
        voice_call_hal::device::AudioDeviceType::Earpiece,
    ));
    let mut controller =
        VoiceController::with_device(hw.services(cli.multi_session), config.voice, &mut dev);

    let status = match cli.command {
        Commands::Call { legs, fail_at } => {
            run_call(&hw, &mut controller, &mut dev, legs, fail_at, cli.multi_session)?
        }
        Commands::Volume { value } => {
            controller.start_call(&mut dev).context("starting call")?;
            let status = code_of(controller.set_volume(&mut dev, value));
            controller.stop_call(&mut dev).context("stopping call")?;
            status
        }
        Commands::Record { source, compressed } => {
            hw.set_compress_capture(compressed, &[AudioFormat::AmrWb]);
            let format = if compressed {
                AudioFormat::AmrWb
            } else {
                AudioFormat::PcmS16Le
            };
            controller.start_call(&mut dev).context("starting call")?;
            let mut request = CaptureRequest::new(source, format, 1);
            let status = code_of(controller.check_and_set_incall_rec_usecase(&dev, &mut request));
            println!("selected usecase: {:?}", request.usecase);
            controller.check_and_stop_incall_rec_usecase(&request)?;
            controller.stop_call(&mut dev).context("stopping call")?;
            status
        }
        Commands::Mute { device_mute } => {
            controller.start_call(&mut dev).context("starting call")?;
            if device_mute {
                controller.set_device_mute_flag(&mut dev, true)?;
            }
            let status = code_of(controller.set_mic_mute(&mut dev, true));
            controller.stop_call(&mut dev).context("stopping call")?;
            status
        }
    };

    let report = SimReport {
        status,
        calls: hw.calls(),
        open_streams: hw.open_stream_count(),
        telemetry: controller.events().snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.open_streams != 0 {
        bail!("{} stream(s) leaked", report.open_streams);
    }
    Ok(ExitCode::from(if status == 0 { 0 } else { 2 }))
}

fn run_call(
    hw: &StubHardware,
    controller: &mut VoiceController,
    dev: &mut AudioDevice,
    legs: usize,
    fail_at: Option<FaultPoint>,
    multi_session: bool,
) -> Result<i32> {
    if legs == 0 {
        bail!("--legs must be at least 1");
    }
    if legs > 1 && !multi_session {
        bail!("more than one leg needs --multi-session");
    }
    if legs > dev.voice.capacity() {
        bail!(
            "{} legs requested but only {} session slots exist",
            legs,
            dev.voice.capacity()
        );
    }
    if let Some(fault) = fail_at {
        hw.inject(fault);
    }

    for session in dev.voice.sessions_mut().take(legs) {
        session.state.new = CallState::Active;
    }
    let status = code_of(controller.start_call(dev));
    eprintln!(
        "start_call: status {}, {} active session(s)",
        status,
        dev.voice.active_session_count()
    );

    hw.clear_faults();
    let stop_status = code_of(controller.stop_call(dev));
    if status == 0 {
        Ok(stop_status)
    } else {
        Ok(status)
    }
}

fn code_of<E: ErrorCode>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.code(),
    }
}
