//! Veer entrypoint: wires the terminal-cursor back-end and a thread ticker
//! around the engine, then runs a short scripted motion demo. Useful for
//! eyeballing composition behavior and as a wiring reference for embedders.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use core_actions::Rig;
use core_backend::{BackendRegistry, TerminalCursorBackend, VirtualBackend};
use core_events::{ThreadTicker, WakeUp};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "veer", version, about = "Programmable cursor-motion engine demo")]
struct Args {
    /// Configuration file path (overrides discovery of `veer.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Drive an in-memory cursor instead of the terminal cursor.
    #[arg(long)]
    headless: bool,
    /// Which demo to run: sweep | boost | wind.
    #[arg(long, default_value = "sweep")]
    demo: String,
}

/// File logging with an env-filter; the guard must outlive `main`.
fn configure_logging() -> Result<Option<WorkerGuard>> {
    let appender = tracing_appender::rolling::never(".", "veer.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging()?;
    info!(target: "runtime", demo = %args.demo, "startup");

    let config = core_config::load_from(args.config.clone())?;
    let (ticker, wakeups) = ThreadTicker::with_channel();
    let registry = if args.headless {
        BackendRegistry::new(Box::new(VirtualBackend::new()))
    } else {
        BackendRegistry::new(Box::new(TerminalCursorBackend::new()))
    };
    let rig = Rig::with_parts(registry, Box::new(ticker), config);

    match args.demo.as_str() {
        "boost" => demo_boost(&rig),
        "wind" => demo_wind(&rig)?,
        _ => demo_sweep(&rig),
    }

    // Drive the engine from the ticker until it goes idle. The engine
    // schedules and cancels the periodic job itself; this loop only routes
    // wake-ups back onto the owning thread.
    while rig.wants_tick() {
        match wakeups.recv_timeout(Duration::from_secs(2)) {
            Ok(WakeUp::Tick) => {
                rig.tick();
            }
            Ok(WakeUp::Timer(_)) => {}
            Err(_) => break,
        }
    }

    let state = rig.state();
    info!(
        target: "runtime",
        pos = %state.pos(),
        speed = state.speed(),
        cardinal = state.direction_cardinal().map(|c| c.name()).unwrap_or("none"),
        "demo_finished"
    );
    rig.stop();
    Ok(())
}

/// Glide the cursor along a rectangle using absolute moves.
fn demo_sweep(rig: &Rig) {
    rig.pos().to(10.0, 4.0).over_eased(600.0, "ease_in_out");
    let corner = rig.clone();
    rig.pos()
        .to(60.0, 4.0)
        .over_eased(900.0, "ease_in_out")
        .then(move || {
            corner.pos().to(60.0, 16.0).over_eased(500.0, "ease_out");
        });
}

/// Constant velocity with a temporary speed boost layered on top.
fn demo_boost(rig: &Rig) {
    rig.speed().to(1.5);
    rig.direction().to(1.0, 0.0);
    rig.layer("boost")
        .speed()
        .offset()
        .add(4.0)
        .over(300.0)
        .hold(700.0)
        .revert(300.0)
        .then(|| info!(target: "runtime", "boost_released"));
    let slow = rig.clone();
    rig.layer("timer")
        .speed()
        .offset()
        .add(0.0)
        .hold(2000.0)
        .revert(0.0)
        .then(move || slow.stop_over(400.0, "ease_out").unwrap_or(()));
}

/// A wind gust captured as momentum and released to decay.
fn demo_wind(rig: &Rig) -> Result<()> {
    rig.layer("wind").vector().offset().add(3.0, 1.0);
    rig.layer("wind").emit(1500.0, "ease_out").map_err(anyhow::Error::from)?;
    Ok(())
}
