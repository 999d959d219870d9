//! corridor — one simulated day at a two-crossing border corridor.
//!
//! ```text
//! corridor [config.json] [scenario.csv]
//! ```
//!
//! `config.json` overrides any subset of `SimConfig` fields; `scenario.csv`
//! replaces the built-in hourly demand (see `bt_scenario::load_scenario_csv`
//! for the format).  Log verbosity follows `RUST_LOG` (default `info`).
//! Per-step metrics and per-second yard fill go to `output/corridor/`.

mod layout;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use bt_core::{LossCause, ModeKind};
use bt_output::{CsvWriter, SimOutputObserver};
use bt_scenario::{ScenarioBlend, load_scenario_csv};
use bt_sim::SimConfig;
use bt_transport::Crossing;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── Constants ─────────────────────────────────────────────────────────────────

const SIM_HOURS:       f64 = 24.0;
const STEP_SECS:       f64 = 1.0;
const START_HOUR:      u32 = 4;
const STEP_ROW_STRIDE: u64 = 60; // one metrics row per simulated minute
const OUTPUT_DIR:      &str = "output/corridor";

fn load_config(path: Option<&str>) -> Result<SimConfig> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {p}"))?
        }
        None => SimConfig { start_hour: START_HOUR, alt_crossing_share: 0.2, ..SimConfig::default() },
    };
    // The layout is drawn for 10 m cells on a 256 × 256 grid.
    config.grid_n = config.grid_n.max(256);
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    let scenario = match args.get(1) {
        Some(p) => load_scenario_csv(Path::new(p)).with_context(|| format!("loading scenario {p}"))?,
        None => layout::synthetic_scenario(),
    };

    println!("=== corridor — border_twin ===");
    println!(
        "Seed: {}  |  Hours: {SIM_HOURS}  |  Step: {STEP_SECS} s  |  Lanes: {} + {} alt",
        config.seed, config.lanes, config.alt_lanes
    );
    println!();

    // 1. Build.
    let mut sim = layout::corridor(config, ScenarioBlend::single(scenario)).build()?;
    info!(cells = sim.grid().len(), yards = sim.yards().len(), "corridor built");

    // 2. Output.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let mut obs = SimOutputObserver::new(writer).with_step_stride(STEP_ROW_STRIDE);

    // 3. Run.
    let t0 = Instant::now();
    sim.run_for(SIM_HOURS * 3_600.0, STEP_SECS, &mut obs)?;
    let elapsed = t0.elapsed();
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }

    // 4. Summary.
    let m = sim.metrics();
    println!("Simulation complete in {:.3} s (digest {:016x})", elapsed.as_secs_f64(), sim.state_digest());
    println!("  injected : {}", m.injected);
    println!("  exited   : {}", m.exited);
    println!("  expired  : {}", m.expired);
    println!("  live     : {}  (queued {})", m.live, m.queued);
    let stats = sim.routing_stats();
    println!("  routing  : {} issued, {} installed, {} discarded", stats.issued, stats.installed, stats.discarded);
    println!();

    println!("{:<14} {:>12}", "Loss cause", "Truck-hours");
    println!("{}", "-".repeat(27));
    for cause in LossCause::ALL {
        println!("{:<14} {:>12.2}", cause.as_str(), m.loss(cause));
    }
    println!();

    println!("{:<10} {:>8}", "Mode", "Trucks");
    println!("{}", "-".repeat(19));
    for (mode, n) in ModeKind::ALL.iter().zip(sim.mode_counts()) {
        println!("{:<10} {:>8}", mode.as_str(), n);
    }
    println!();

    println!("{:<12} {:<11} {:>6}", "Yard", "State", "Fill");
    println!("{}", "-".repeat(31));
    for y in sim.yards() {
        println!("{:<12} {:<11} {:>5.0}%", y.name(), y.state().as_str(), y.fill_ratio() * 100.0);
    }
    println!();

    for crossing in [Crossing::Main, Crossing::Alt] {
        let lanes = sim.lane_utilization(crossing);
        if lanes.is_empty() {
            continue;
        }
        let cells: Vec<String> = lanes.iter().map(|u| format!("{:.0}%", u * 100.0)).collect();
        println!("{crossing:?} lanes: {}", cells.join("  "));
    }

    Ok(())
}
