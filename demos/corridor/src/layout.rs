//! Synthetic corridor layout on a 2.56 km square.
//!
//! ```text
//!                                   overnight      staging
//!          north lot    south lot      [ ]           [ ]
//!   corridor ──────────────────────────────────────────────── main crossing
//!                                       │
//!                         industrial ───┘──────────────────── alt crossing
//! ```

use bt_admission::YardKind;
use bt_core::WorldPoint;
use bt_grid::RoadStamp;
use bt_scenario::{ALT_BORDER_CAPACITY, BORDER_CAPACITY, HourlyTable, ScenarioBlend, ScenarioData};
use bt_sim::{SimBuilder, SimConfig};
use bt_transport::Origin;

pub const CORRIDOR_KEY:   &str = "corridor_rate";
pub const INDUSTRIAL_KEY: &str = "industrial_rate";

const HIGHWAY: RoadStamp = RoadStamp { width_m: 14.0, conductance: 1.0, speed_mps: 25.0 };
const ARTERIAL: RoadStamp = RoadStamp { width_m: 8.0, conductance: 0.8, speed_mps: 14.0 };

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<WorldPoint> {
    vec![
        WorldPoint::new(x0, y0),
        WorldPoint::new(x1, y0),
        WorldPoint::new(x1, y1),
        WorldPoint::new(x0, y1),
    ]
}

/// Attach the corridor geometry to a builder.
pub fn corridor(config: SimConfig, scenario: ScenarioBlend) -> SimBuilder {
    let p = WorldPoint::new;
    SimBuilder::new(config, scenario)
        .road(vec![p(20.0, 1_280.0), p(2_540.0, 1_280.0)], HIGHWAY)
        .road(vec![p(1_600.0, 1_280.0), p(1_600.0, 600.0), p(2_540.0, 600.0)], ARTERIAL)
        .yard("north lot", YardKind::Conversion, rect(700.0, 1_320.0, 900.0, 1_480.0), 60)
        .yard("south lot", YardKind::Conversion, rect(1_100.0, 1_080.0, 1_300.0, 1_240.0), 40)
        .yard("overnight", YardKind::Overnight, rect(1_800.0, 1_320.0, 2_000.0, 1_520.0), 120)
        .yard("staging", YardKind::Staging, rect(2_250.0, 1_320.0, 2_400.0, 1_420.0), 50)
        .source("corridor", p(20.0, 1_280.0), Origin::Corridor, CORRIDOR_KEY)
        .source("industrial park", p(1_600.0, 800.0), Origin::Industrial, INDUSTRIAL_KEY)
        .crossing(p(2_540.0, 1_280.0))
        .alt_crossing(p(2_540.0, 600.0))
}

/// Hourly demand with a morning peak, a border shut from midnight to
/// 05:00, and a smaller alternate crossing that never closes.
pub fn synthetic_scenario() -> ScenarioData {
    let mut corridor = HourlyTable::default();
    let mut industrial = HourlyTable::default();
    let mut border = HourlyTable::constant(240.0);
    for hour in 0..24 {
        let peak = match hour {
            6..=10 => 180.0,
            11..=17 => 120.0,
            _ => 40.0,
        };
        corridor.set(hour, peak);
        industrial.set(hour, if (7..=19).contains(&hour) { 45.0 } else { 5.0 });
    }
    for hour in 0..5 {
        border.set(hour, 0.0);
    }
    ScenarioData::new()
        .with(CORRIDOR_KEY, corridor)
        .with(INDUSTRIAL_KEY, industrial)
        .with(BORDER_CAPACITY, border)
        .with(ALT_BORDER_CAPACITY, HourlyTable::constant(60.0))
}
