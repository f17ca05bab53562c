//! `tremaux-cli` – Maze solver command line
//!
//! This binary is the process surface of the maze solver.  It:
//!
//! 1. Loads `~/.tremaux/config.toml` (or `$TREMAUX_CONFIG`), writing the
//!    defaults there on first run, then applies `TREMAUX_*` overrides.
//! 2. Initialises tracing (console, optional log file, optional OTLP).
//! 3. Builds the configured port backend and runs the control loop.
//! 4. Intercepts **Ctrl-C** to request a stop at the next cycle boundary.
//! 5. Prints a run summary and exits with the error's exit code (0 on
//!    success).
//!
//! `TREMAUX_SUMMARY_FORMAT=json` prints the run record as JSON instead of the
//! coloured summary.

mod config;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use uuid::Uuid;

use tremaux_hal::sim::SimPort;
use tremaux_hal::sysfs::SysfsPort;
use tremaux_hal::{ActuatorGateway, DigitalPort, SensorGateway};
use tremaux_kernel::VisitGrid;
use tremaux_runtime::{ControlLoop, RunSummary, Vehicle, init_tracing};
use tremaux_types::MazeError;

use config::{Backend, Config};

fn main() {
    let code = run_cli();
    std::process::exit(code);
}

/// Everything `main` does, returning the exit code so that the tracing
/// guard is dropped (and spans flushed) before the process exits.
fn run_cli() -> i32 {
    let (cfg, notes) = load_config();
    let _guard = init_tracing("tremaux", cfg.log_file.as_deref());

    print_banner();
    for note in notes {
        println!("  {note}");
    }

    let record = match cfg.backend {
        Backend::Sim => run(SimPort::new(), &cfg),
        Backend::Sysfs => run(SysfsPort::new(&cfg.gpio_root), &cfg),
    };

    if std::env::var("TREMAUX_SUMMARY_FORMAT").as_deref() == Ok("json") {
        match serde_json::to_string_pretty(&record) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!(error = %e, "could not serialise run record"),
        }
    } else {
        print_record(&record);
    }
    record.exit_code
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load the configuration, returning user-facing notes to print once the
/// console is set up.
fn load_config() -> (Config, Vec<String>) {
    let mut notes = Vec::new();
    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            notes.push(format!(
                "Config loaded from {}",
                config::config_path().display().to_string().bold()
            ));
            cfg
        }
        Ok(None) => {
            let cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => notes.push(format!(
                    "{} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                )),
                Err(e) => notes.push(format!("{}: {}", "Error saving config".red(), e)),
            }
            cfg
        }
        Err(e) => {
            notes.push(format!("{}: {}", "Config error".red(), e));
            notes.push("Using default configuration.".to_string());
            Config::default()
        }
    };
    config::apply_env_overrides(&mut cfg);
    if let Err(e) = cfg.validate() {
        notes.push(format!("{}: {}", "Config error".red(), e));
        notes.push("Using default configuration.".to_string());
        cfg = Config::default();
    }
    (cfg, notes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

/// What one invocation did, as printed at the end.
#[derive(Debug, Serialize)]
struct RunRecord {
    run_id: Uuid,
    backend: Backend,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
}

fn run<P: DigitalPort>(port: P, cfg: &Config) -> RunRecord {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, backend = %cfg.backend, start = %cfg.start_pose().position, "run starting");

    let vehicle = Vehicle::new(
        port,
        SensorGateway::new(cfg.sensor_lines(), cfg.sensor_open_level, cfg.retry()),
        ActuatorGateway::new(
            cfg.motor_lines(),
            cfg.motor_active_level,
            cfg.turn_unit(),
            cfg.retry(),
        ),
    );
    let grid = VisitGrid::new(cfg.grid.width, cfg.grid.height);
    let mut control =
        ControlLoop::new(vehicle, grid, cfg.control_loop_config()).with_start(cfg.start_pose());

    let stop = control.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current manoeuvre …"
                .yellow()
                .bold()
        );
        stop.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will abort without idling the motors");
    }

    let result = control.run();
    let finished_at = Utc::now();
    let (summary, error) = match result {
        Ok(summary) => (Some(summary), None),
        Err(e) => (None, Some(e)),
    };
    let exit_code = error.as_ref().map_or(0, MazeError::exit_code);
    info!(%run_id, exit_code, "run finished");

    RunRecord {
        run_id,
        backend: cfg.backend,
        started_at,
        finished_at,
        exit_code,
        error: error.map(|e| e.to_string()),
        summary,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_record(record: &RunRecord) {
    let elapsed = record.finished_at - record.started_at;
    println!();
    match (&record.summary, &record.error) {
        (Some(summary), _) => {
            println!("  {} Maze exited.", "✓".green().bold());
            println!(
                "    corridors      {}",
                summary.corridors.to_string().bold()
            );
            println!(
                "    intersections  {}",
                summary.intersections.len().to_string().bold()
            );
            println!(
                "    cells visited  {}",
                summary.visited_cells.to_string().bold()
            );
            let trace: Vec<String> = summary.trace().iter().map(ToString::to_string).collect();
            println!("    path           {}", trace.join(" → ").dimmed());
        }
        (None, Some(error)) => {
            println!("  {} {}", "✗".red().bold(), error.red());
        }
        (None, None) => {}
    }
    println!(
        "    run {} in {} ms, exit code {}",
        record.run_id.to_string().dimmed(),
        elapsed.num_milliseconds(),
        record.exit_code
    );
    println!();
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║   tremaux · maze-solving controller  ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}
