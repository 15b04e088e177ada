use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fm_tuner_core::{AppConfig, CancellationToken, RouteProfile, StereoMode};
use tracing_subscriber::EnvFilter;

fn main() -> fm_tuner_core::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Profile { name } => print_profile(name),
    }
}

fn run(args: RunArgs) -> fm_tuner_core::Result<()> {
    let config = args.resolve()?;
    tracing::info!(
        device = %config.tuner.device,
        khz = config.tuner.frequency_khz,
        route = ?config.audio.route,
        routing = config.routing_enabled(),
        "starting fm radio"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || on_signal.cancel()) {
        tracing::warn!(%err, "could not install signal handler");
    }

    run_platform(config, &cancel)
}

#[cfg(target_os = "linux")]
fn run_platform(config: AppConfig, cancel: &CancellationToken) -> fm_tuner_core::Result<()> {
    use fm_tuner_core::{
        linux::{AlsaMixer, PcmTransport, V4l2Transport},
        BringUp,
    };

    let mixer = AlsaMixer::new(config.audio.mixer_card);
    let mut bringup = BringUp::new(config, V4l2Transport, mixer, PcmTransport);
    let report = bringup.run(cancel)?;
    tracing::info!(
        probes = report.probes,
        last_signal = report.last_signal.map(|level| level.raw()),
        "fm radio stopped"
    );
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run_platform(_config: AppConfig, _cancel: &CancellationToken) -> fm_tuner_core::Result<()> {
    Err(fm_tuner_core::TunerError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "V4L2 radio devices are only available on Linux",
    )))
}

fn print_profile(profile: RouteProfile) -> fm_tuner_core::Result<()> {
    match profile.sequence() {
        Some(sequence) => {
            let json = serde_json::to_string_pretty(&sequence)?;
            println!("{json}");
        }
        None => tracing::info!("profile `none` applies no mixer controls"),
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "FM tuner and audio path bring-up", long_about = None)]
struct Cli {
    /// Log every mixer write and state transition.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring the tuner up and poll signal strength until interrupted.
    Run(RunArgs),
    /// Print the mixer controls a routing profile writes, as JSON.
    Profile {
        /// headphone, speaker or none.
        name: RouteProfile,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// JSON configuration file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Radio device node.
    #[arg(long)]
    device: Option<String>,
    /// Station frequency in kHz.
    #[arg(short, long)]
    frequency: Option<u32>,
    /// Output volume, 0-255.
    #[arg(long)]
    volume: Option<u8>,
    /// Force mono reception.
    #[arg(long)]
    mono: bool,
    /// Audio routing profile: headphone, speaker or none.
    #[arg(short, long)]
    profile: Option<RouteProfile>,
    /// Seconds between signal strength probes.
    #[arg(long)]
    poll_interval: Option<u64>,
}

impl RunArgs {
    fn resolve(&self) -> fm_tuner_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_json_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(device) = &self.device {
            config.tuner.device = device.clone();
        }
        if let Some(frequency) = self.frequency {
            config.tuner.frequency_khz = frequency;
        }
        if let Some(volume) = self.volume {
            config.tuner.volume = volume;
        }
        if self.mono {
            config.tuner.mode = StereoMode::Mono;
        }
        if let Some(profile) = self.profile {
            config.audio.route = profile;
        }
        if let Some(interval) = self.poll_interval {
            config.tuner.poll_interval_secs = interval;
        }
        config.validate()?;
        Ok(config)
    }
}
