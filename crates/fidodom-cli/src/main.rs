//! `fidodom` – fiducial odometry fusion node.
//!
//! This binary wires the fusion loop to the simulated sensor stack.  It:
//!
//! 1. Loads `~/.fidodom/config.toml` (or `--config <path>`) and applies
//!    `FIDODOM_*` environment overrides, then validates the result.
//! 2. Builds the transform tree from the configured static transforms,
//!    filling in the simulated camera mount and bin anchor where missing.
//! 3. Runs the fixed-rate fusion loop until Ctrl-C or `--ticks` cycles.
//! 4. With `--print-json`, writes every odometry record to stdout as one
//!    JSON document per line.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use fidodom_hal::SensorRegistry;
use fidodom_hal::sim::{SimCamera, SimMarkerDetector, SimRegistry};
use fidodom_middleware::{BusOdometrySink, EventBus, Topic};
use fidodom_perception::TfEngine;
use fidodom_runtime::{CycleDriver, OdometryWatchdog, RunSummary, init_tracing, run};
use fidodom_types::{EventPayload, FusionError, Quaternion, Transform3D, Vec3};

use crate::config::{Config, SimSettings};

#[derive(Parser)]
#[command(name = "fidodom")]
#[command(about = "Fuse fiducial marker sightings into odometry")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file [default: ~/.fidodom/config.toml].
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many cycles instead of running until Ctrl-C.
    #[arg(long)]
    ticks: Option<u64>,

    /// Enable debug logging of intermediate pose stages.
    #[arg(long)]
    debug: bool,

    /// Print each odometry record to stdout as JSON.
    #[arg(long)]
    print_json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut cfg, source) = match config::resolve(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red());
            return ExitCode::FAILURE;
        }
    };
    if cli.debug {
        cfg.fusion.debug_logging = true;
    }

    let _guard = init_tracing("fidodom", cfg.fusion.debug_logging);

    if !cli.print_json {
        print_banner();
        match &source {
            Some(path) => println!("  Config loaded from {}", path.display().to_string().bold()),
            None => println!("  No config file found; using defaults."),
        }
    }

    match start(&cli, &cfg) {
        Ok(summary) => {
            if !cli.print_json {
                println!(
                    "\n  {} {} cycles, {} emitted, {} without detection, {} abandoned",
                    "✓".green().bold(),
                    summary.ticks,
                    summary.emitted,
                    summary.no_detection,
                    summary.abandoned
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", "Startup error".red());
            ExitCode::FAILURE
        }
    }
}

fn start(cli: &Cli, cfg: &Config) -> Result<RunSummary, FusionError> {
    cfg.fusion.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping after the current cycle …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let bus = EventBus::default();
    let mut driver = CycleDriver::new(
        &cfg.fusion,
        Box::new(sim_registry(cfg)),
        Box::new(transform_tree(cfg)),
        Box::new(BusOdometrySink::new(bus.clone())),
    )
    .with_diagnostics(bus.clone())
    .with_watchdog(OdometryWatchdog::new(cfg.fusion.stale_window()?));

    info!(
        sensor_order = ?cfg.fusion.sensor_order,
        camera_frame = %cfg.fusion.camera_frame,
        odom_frame = %cfg.fusion.odom_frame,
        "fusion node configured"
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| FusionError::Config(format!("failed to start async runtime: {e}")))?;
    runtime.block_on(async move {
        let printer = cli.print_json.then(|| {
            let mut odometry = bus.subscribe_to(Topic::Odometry);
            tokio::spawn(async move {
                while let Ok(event) = odometry.next_event().await {
                    if let EventPayload::Odometry(record) = event.payload {
                        match serde_json::to_string(&record) {
                            Ok(line) => println!("{line}"),
                            Err(e) => warn!(error = %e, "failed to encode odometry record"),
                        }
                    }
                }
            })
        });

        let summary = run(&mut driver, cfg.fusion.rate_hz, shutdown, cli.ticks).await;

        // Closing every sender lets the printer drain and finish.
        drop(driver);
        drop(bus);
        if let Some(handle) = printer
            && let Err(e) = handle.await
        {
            warn!(error = %e, "odometry printer task failed");
        }
        summary
    })
}

/// Static transforms from the config, plus the simulated camera mount and
/// bin anchor for any link the config leaves out.
fn transform_tree(cfg: &Config) -> TfEngine {
    let fusion = &cfg.fusion;
    let mut tf = fusion.tf_engine();
    if tf.lookup(&fusion.footprint_frame, &fusion.camera_frame).is_none() {
        tf.set_transform(&fusion.footprint_frame, &fusion.camera_frame, Transform3D::identity());
    }
    if tf.lookup(&fusion.odom_frame, &fusion.bin_frame).is_none() {
        tf.set_transform(
            &fusion.odom_frame,
            &fusion.bin_frame,
            Transform3D::new(vec3(cfg.sim.bin), Quaternion::identity()),
        );
    }
    tf
}

/// One simulated camera per configured source, all sharing one detector.
fn sim_registry(cfg: &Config) -> SensorRegistry {
    let SimSettings {
        bin,
        start,
        velocity,
        visible_one_in,
        dropout_every,
    } = &cfg.sim;

    let mut detector = SimMarkerDetector::new(vec3(*bin)).with_motion(vec3(*start), vec3(*velocity));
    for (source_id, n) in visible_one_in {
        detector = detector.occlude_source(source_id.clone(), *n);
    }

    let mut builder = SimRegistry::builder().with_detector(detector);
    for source_id in &cfg.fusion.sensor_order {
        let camera = SimCamera::new(source_id.clone(), cfg.fusion.camera_frame.clone())
            .with_dropout(dropout_every.get(source_id).copied().unwrap_or(0));
        builder = builder.with_sim_camera(camera);
    }
    builder.build()
}

fn vec3([x, y, z]: [f64; 3]) -> Vec3 {
    Vec3::new(x, y, z)
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____ _     __          __ "#.bold().cyan());
    println!("{}", r#"  / __/(_)___/ /__  ___  / /__  __ _ "#.bold().cyan());
    println!("{}", r#" / _/ / / _  / _ \/ _ \/ _  / _ \/  ' \"#.bold().cyan());
    println!("{}", r#"/_/  /_/\_,_/\___/\___/\_,_/\___/_/_/_/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "fidodom".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Fiducial marker odometry fusion");
    println!();
}
