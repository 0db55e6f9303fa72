use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lx16a_artnet_bridge::{
    start_bridge, AppConfig, ArtNetReceiver, FrameDispatcher, SerialPortLine, Servo, ServoBus, ServoId,
};

/// Drive an LX-16A pan/tilt head from Art-Net universe data.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `lx16a_artnet_bridge=trace`.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = match &args.config {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };

    let line = SerialPortLine::open(&cfg.serial.port, cfg.serial.baud_rate, Duration::from_millis(1))
        .with_context(|| format!("opening servo line {}", cfg.serial.port))?;
    let bus = Arc::new(ServoBus::new(line, cfg.bus_config()));

    let pan = Servo::new(Arc::clone(&bus), ServoId(cfg.servos.pan_id)).with_limits(cfg.angle_limits());
    let tilt = Servo::new(Arc::clone(&bus), ServoId(cfg.servos.tilt_id)).with_limits(cfg.angle_limits());
    info!(pan = %pan.id(), tilt = %tilt.id(), "servos configured");

    let dispatcher = FrameDispatcher::new(pan, tilt, cfg.motion_constants()).with_universe(cfg.artnet.universe);
    let source = ArtNetReceiver::bind(cfg.artnet.bind)?;
    let handle = start_bridge(source, dispatcher, cfg.bridge_config())?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::Relaxed)).context("installing Ctrl-C handler")?;

    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    let stats = handle.stats()?;
    info!(
        frames = stats.frames_received,
        ignored = stats.frames_ignored,
        moves = stats.moves_issued,
        failures = stats.move_failures,
        "shutting down"
    );
    handle.join()?;
    Ok(())
}
