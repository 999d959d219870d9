//! `SimConfig` — every tunable of a run.

use std::time::Duration;

use bt_admission::AdmissionConfig;
use bt_transport::TransportParams;

use crate::{SimError, SimResult};

/// Run configuration.  `Default` is a calibrated single-crossing setup.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Master seed.  The same seed and scenario reproduce the run exactly
    /// when `frame_budget` is `None`.
    pub seed: u64,

    /// Local hour (0–23) at which the run starts.
    pub start_hour: u32,

    // ── Grid ──────────────────────────────────────────────────────────────
    /// Cells per side.
    pub grid_n:         usize,
    pub cell_size_m:    f64,
    /// Mass of one truck, in truck-equivalents.
    pub unit_mass:      f64,
    /// Longest synthetic connector bridging may pave, in cells.
    pub bridge_max_gap: usize,

    // ── Components ────────────────────────────────────────────────────────
    pub transport: TransportParams,
    pub admission: AdmissionConfig,

    // ── Border ────────────────────────────────────────────────────────────
    pub lanes:              usize,
    pub alt_lanes:          usize,
    /// Probability that a new truck is assigned the alternate crossing,
    /// when one exists.
    pub alt_crossing_share: f64,
    /// Border queue length at which cleared trucks divert to staging.
    pub staging_threshold:  usize,

    // ── Routing ───────────────────────────────────────────────────────────
    /// `None`: rebuild inline every time routing is dirty (reproducible).
    /// `Some`: rebuild in the background and keep stepping on old tables.
    pub frame_budget:         Option<Duration>,
    /// Minimum wall-clock gap between background rebuilds.
    pub min_rebuild_interval: Duration,
    /// Weight of the crossing potential added to yard-bound routing.
    pub yard_bias_weight:     f32,

    // ── Invariants & replay ───────────────────────────────────────────────
    pub check_invariants:       bool,
    /// Capture a snapshot every this many whole seconds; `0` disables.
    pub snapshot_interval_secs: u64,
    pub snapshot_capacity:      usize,
    pub event_log_capacity:     usize,

    // ── Lifecycle ─────────────────────────────────────────────────────────
    /// Remove trucks older than this (except those at the border).
    pub max_particle_age_secs: Option<f64>,
    /// How long a departed truck stays in the departure list.
    pub depart_anim_secs:      f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed:                   42,
            start_hour:             0,
            grid_n:                 256,
            cell_size_m:            10.0,
            unit_mass:              1.0,
            bridge_max_gap:         20,
            transport:              TransportParams::default(),
            admission:              AdmissionConfig::default(),
            lanes:                  4,
            alt_lanes:              2,
            alt_crossing_share:     0.0,
            staging_threshold:      40,
            frame_budget:           None,
            min_rebuild_interval:   Duration::from_millis(250),
            yard_bias_weight:       0.5,
            check_invariants:       true,
            snapshot_interval_secs: 60,
            snapshot_capacity:      32,
            event_log_capacity:     4_096,
            max_particle_age_secs:  None,
            depart_anim_secs:       30.0,
        }
    }
}

impl SimConfig {
    /// Reject settings the kernel cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        let bad = |msg: String| Err(SimError::Config(msg));
        if self.grid_n == 0 {
            return bad("grid_n must be positive".into());
        }
        if !(self.cell_size_m.is_finite() && self.cell_size_m > 0.0) {
            return bad(format!("cell_size_m {} must be positive", self.cell_size_m));
        }
        if !(self.unit_mass.is_finite() && self.unit_mass > 0.0) {
            return bad(format!("unit_mass {} must be positive", self.unit_mass));
        }
        if self.lanes == 0 {
            return bad("at least one border lane is required".into());
        }
        if !(0.0..=1.0).contains(&self.alt_crossing_share) {
            return bad(format!("alt_crossing_share {} must be in [0, 1]", self.alt_crossing_share));
        }
        let t = &self.transport;
        if !(t.cfl > 0.0 && t.cfl <= 1.0) {
            return bad(format!("cfl {} must be in (0, 1]", t.cfl));
        }
        if t.free_flow_mps <= 0.0 || t.max_substeps == 0 {
            return bad("free_flow_mps and max_substeps must be positive".into());
        }
        if self.max_particle_age_secs.is_some_and(|a| !(a > 0.0)) {
            return bad("max_particle_age_secs must be positive".into());
        }
        Ok(())
    }
}
