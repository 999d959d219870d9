//! Rebuild scheduling: build tokens, deferral, rate limiting, and
//! background execution.
//!
//! # Lifecycle of a request
//!
//! ```text
//! mark_dirty ──► service ──(rate limit ok, nothing in flight)──► issue token k
//!                   │                                              │
//!                   │              Blocking: build inline, install k
//!                   │              Background: rayon::spawn, result on channel
//!                   ▼
//!               service (later) ──► result k == current token? install : discard
//! ```
//!
//! A `mark_dirty` that arrives while a build is in flight is deferred: the
//! dirty flag stays set and a fresh build is issued once the in-flight one
//! resolves.  [`invalidate`](RebuildScheduler::invalidate) bumps the token
//! so that whatever is in flight is discarded on arrival; there is no
//! mid-computation abort.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use bt_grid::Grid;
use tracing::{debug, warn};

use crate::{FieldSpec, RoutingError, RoutingResult, RoutingTable, RoutingTables, SinkSet, compute_field};

/// Immutable input for one rebuild: a shared grid and owned field specs.
#[derive(Clone, Debug)]
pub struct RoutingInput {
    pub grid:   Arc<Grid>,
    pub fields: Vec<FieldSpec>,
}

/// How rebuilds execute.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RebuildMode {
    /// No frame budget: build inline and install before `service` returns.
    Blocking,
    /// Build on the Rayon pool; at most one build starts per `min_interval`
    /// of wall-clock time.
    Background { min_interval: Duration },
}

/// What one [`service`](RebuildScheduler::service) call did.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ServiceOutcome {
    /// Token of a build started during this call.
    pub started:   Option<u64>,
    /// Token of tables installed during this call.
    pub installed: Option<u64>,
    /// Token of a stale result dropped during this call.
    pub discarded: Option<u64>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SchedulerStats {
    pub issued:    u64,
    pub installed: u64,
    pub discarded: u64,
    /// Dirty marks that arrived while a build was in flight.
    pub deferred:  u64,
}

type BuildResult = RoutingResult<Vec<Arc<RoutingTable>>>;

struct InFlight {
    token: u64,
    rx:    Receiver<BuildResult>,
}

pub struct RebuildScheduler {
    mode:           RebuildMode,
    token:          u64,
    dirty:          bool,
    in_flight:      Option<InFlight>,
    last_started:   Option<Instant>,
    /// Crossing fields depend only on the grid; built once and reused.
    crossing_cache: Vec<Option<Arc<RoutingTable>>>,
    stats:          SchedulerStats,
}

impl RebuildScheduler {
    /// A scheduler that is dirty from the start, so the first `service`
    /// builds every table.
    pub fn new(mode: RebuildMode) -> Self {
        Self {
            mode,
            token: 0,
            dirty: true,
            in_flight: None,
            last_started: None,
            crossing_cache: vec![None; SinkSet::ALL.len()],
            stats: SchedulerStats::default(),
        }
    }

    #[inline]
    pub fn mode(&self) -> RebuildMode {
        self.mode
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Most recently issued token.
    #[inline]
    pub fn token(&self) -> u64 {
        self.token
    }

    #[inline]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Request a rebuild at the next opportunity.
    pub fn mark_dirty(&mut self) {
        if self.in_flight.is_some() {
            self.stats.deferred += 1;
        }
        self.dirty = true;
    }

    /// Orphan any in-flight build and request a fresh one.  Used on reset
    /// and snapshot restore.
    pub fn invalidate(&mut self) {
        self.token += 1;
        self.dirty = true;
        self.last_started = None;
    }

    /// Orphan any in-flight build without otherwise touching the dirty
    /// flag.  An orphaned build leaves the scheduler dirty so its request
    /// is re-issued.
    pub fn abandon(&mut self) {
        if self.in_flight.is_some() {
            self.token += 1;
            self.dirty = true;
            self.last_started = None;
        }
    }

    /// Collect a finished build if any, then issue a new one if dirty and
    /// allowed.  `make_input` is only called when a build is issued.
    pub fn service(
        &mut self,
        tables:     &mut RoutingTables,
        make_input: impl FnOnce() -> RoutingInput,
    ) -> RoutingResult<ServiceOutcome> {
        let mut out = ServiceOutcome::default();
        let block = self.mode == RebuildMode::Blocking;
        self.collect(tables, block, &mut out)?;

        let now = Instant::now();
        if !self.dirty || self.in_flight.is_some() || !self.rate_allows(now) {
            return Ok(out);
        }

        self.token += 1;
        let token = self.token;
        self.dirty = false;
        self.last_started = Some(now);
        self.stats.issued += 1;
        out.started = Some(token);

        let input = make_input();
        let cache = self.crossing_cache.clone();
        match self.mode {
            RebuildMode::Blocking => {
                let built = build_tables(&input, &cache, token)?;
                self.install(tables, token, built);
                out.installed = Some(token);
            }
            RebuildMode::Background { .. } => {
                let (tx, rx) = mpsc::channel();
                rayon::spawn(move || {
                    // The receiver may be gone after a reset; nothing to do then.
                    let _ = tx.send(build_tables(&input, &cache, token));
                });
                self.in_flight = Some(InFlight { token, rx });
                debug!(token, "routing rebuild dispatched");
            }
        }
        Ok(out)
    }

    /// Block until the in-flight build (if any) resolves, and install it
    /// unless stale.
    pub fn wait(&mut self, tables: &mut RoutingTables) -> RoutingResult<ServiceOutcome> {
        let mut out = ServiceOutcome::default();
        self.collect(tables, true, &mut out)?;
        Ok(out)
    }

    fn rate_allows(&self, now: Instant) -> bool {
        match self.mode {
            RebuildMode::Blocking => true,
            RebuildMode::Background { min_interval } => self
                .last_started
                .is_none_or(|t| now.duration_since(t) >= min_interval),
        }
    }

    fn collect(&mut self, tables: &mut RoutingTables, block: bool, out: &mut ServiceOutcome) -> RoutingResult<()> {
        let Some(flight) = self.in_flight.take() else {
            return Ok(());
        };
        let received = if block {
            flight.rx.recv().ok()
        } else {
            match flight.rx.try_recv() {
                Ok(r) => Some(r),
                Err(TryRecvError::Empty) => {
                    self.in_flight = Some(flight);
                    return Ok(());
                }
                Err(TryRecvError::Disconnected) => None,
            }
        };

        let Some(result) = received else {
            self.dirty = true;
            warn!(token = flight.token, "routing rebuild worker vanished; will re-issue");
            return Err(RoutingError::WorkerLost { token: flight.token });
        };

        if flight.token != self.token {
            self.stats.discarded += 1;
            out.discarded = Some(flight.token);
            debug!(token = flight.token, current = self.token, "discarded stale routing rebuild");
            return Ok(());
        }
        let built = result?;
        self.install(tables, flight.token, built);
        out.installed = Some(flight.token);
        Ok(())
    }

    fn install(&mut self, tables: &mut RoutingTables, token: u64, built: Vec<Arc<RoutingTable>>) {
        for t in &built {
            if t.sink_set().is_crossing() {
                self.crossing_cache[t.sink_set().index()] = Some(Arc::clone(t));
            }
        }
        tables.install(token, built);
        self.stats.installed += 1;
        debug!(token, "installed routing tables");
    }
}

/// Build every field in `input`, crossing fields first so they can serve as
/// bias for the rest.
fn build_tables(input: &RoutingInput, cache: &[Option<Arc<RoutingTable>>], token: u64) -> BuildResult {
    let mut ordered: Vec<&FieldSpec> = input.fields.iter().collect();
    ordered.sort_by_key(|f| !f.sink_set.is_crossing());

    let mut built: Vec<Arc<RoutingTable>> = Vec::with_capacity(ordered.len());
    for spec in ordered {
        if spec.sink_set.is_crossing() {
            if let Some(t) = &cache[spec.sink_set.index()] {
                built.push(Arc::clone(t));
                continue;
            }
        }
        let bias = spec
            .bias
            .and_then(|(set, _)| built.iter().find(|t| t.sink_set() == set))
            .map(|t| t.potentials());
        let table = compute_field(&input.grid, spec, bias, token)?;
        built.push(Arc::new(table));
    }
    Ok(built)
}
