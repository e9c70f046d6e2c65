use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winmixer_rs::Target;

/// Control device, system and per-program volume.
#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Parser)]
#[command(name = "winmixer", version, about)]
struct Cli {
    /// Bind to this endpoint ID instead of the default playback device
    #[arg(long, global = true)]
    device: Option<String>,

    /// Bind to the default recording device
    #[arg(long, global = true, conflicts_with = "device")]
    capture: bool,

    #[command(subcommand)]
    command: Command,
}

#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Debug, Subcommand)]
enum Command {
    /// List active endpoints
    Devices,
    /// List programs with an audio session
    Programs,
    /// Print the volume of a target
    Get { target: Target },
    /// Set the volume of a target
    Set {
        target: Target,
        #[arg(allow_negative_numbers = true)]
        volume: i32,
    },
    /// Change the volume of a target
    Change {
        target: Target,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },
    /// Mute a target
    Mute { target: Target },
    /// Unmute a target
    Unmute { target: Target },
    /// Toggle the mute state of a target
    Toggle { target: Target },
    /// Print the mute state of a target
    IsMuted { target: Target },
    /// Serve a knob controller on a serial port
    Knob {
        /// Serial port, already configured (e.g. \\.\COM3)
        #[arg(long)]
        port: PathBuf,
        /// Knob bindings (TOML)
        #[arg(long)]
        config: PathBuf,
    },
}

/// `-` for targets with nothing playing.
#[cfg_attr(not(windows), allow(dead_code))]
fn print_value<T: std::fmt::Display>(value: Option<T>) {
    match value {
        Some(value) => println!("{}", value),
        None => println!("-"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

#[cfg(windows)]
fn run(cli: Cli) -> Result<()> {
    use anyhow::Context;
    use std::fs::OpenOptions;
    use std::io::BufReader;
    use winmixer_rs::{ComGuard, ControllerConfig, DataFlow, DeviceEnumerator, KnobController, SystemMixer};

    let _com = ComGuard::new()?;
    let enumerator = DeviceEnumerator::new()?;

    let open_mixer = || -> Result<SystemMixer> {
        let mixer = match (&cli.device, cli.capture) {
            (Some(id), _) => SystemMixer::for_device(&enumerator, id)?,
            (None, true) => SystemMixer::default_capture(&enumerator)?,
            (None, false) => SystemMixer::default_playback(&enumerator)?,
        };
        Ok(mixer)
    };

    match cli.command {
        Command::Devices => {
            let flow = if cli.capture {
                DataFlow::Capture
            } else {
                DataFlow::Render
            };
            for device in enumerator.devices(flow)? {
                println!("{}", device);
            }
        }
        Command::Programs => {
            let mixer = open_mixer()?;
            for name in mixer.enum_programs()? {
                println!("{}", name?);
            }
        }
        Command::Get { target } => print_value(open_mixer()?.get_volume(&target)?),
        Command::Set { target, volume } => print_value(open_mixer()?.set_volume(&target, volume)?),
        Command::Change { target, delta } => print_value(open_mixer()?.change_volume(&target, delta)?),
        Command::Mute { target } => print_value(open_mixer()?.set_muted(&target, true)?),
        Command::Unmute { target } => print_value(open_mixer()?.set_muted(&target, false)?),
        Command::Toggle { target } => print_value(open_mixer()?.toggle_muted(&target)?),
        Command::IsMuted { target } => print_value(open_mixer()?.is_muted(&target)?),
        Command::Knob { port, config } => {
            let config = ControllerConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let serial = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&port)
                .with_context(|| format!("opening {}", port.display()))?;
            let reader = BufReader::new(serial.try_clone()?);
            KnobController::new(config.encoders).run(&open_mixer()?, reader, serial)?;
        }
    }

    Ok(())
}

#[cfg(not(windows))]
fn run(_cli: Cli) -> Result<()> {
    Err(winmixer_rs::AudioError::Unsupported.into())
}
