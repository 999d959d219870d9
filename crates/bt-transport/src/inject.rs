//! Rate-limited injection at source cells.

use bt_core::{CellId, ParticleId};
use tracing::trace;

use crate::{Origin, Particle, TransportResult, TransportState};

/// One injection point.
#[derive(Clone, Debug)]
pub struct Source {
    pub name:   String,
    pub cell:   CellId,
    pub origin: Origin,
    /// Scenario key whose hourly value is this source's rate in trucks/h.
    pub key:    String,
    /// Fractional trucks owed; whole trucks are released when space allows.
    acc:        f64,
    blocked:    u64,
}

impl Source {
    pub fn new(name: impl Into<String>, cell: CellId, origin: Origin, key: impl Into<String>) -> Self {
        Self { name: name.into(), cell, origin, key: key.into(), acc: 0.0, blocked: 0 }
    }

    /// Trucks owed but not yet placed.
    #[inline]
    pub fn backlog(&self) -> f64 {
        self.acc
    }

    /// Injection attempts refused because the source cell was full.
    #[inline]
    pub fn blocked(&self) -> u64 {
        self.blocked
    }
}

/// All sources.  Rates are supplied per call so scenario blending stays
/// outside this crate.
#[derive(Clone, Debug, Default)]
pub struct Injector {
    sources: Vec<Source>,
}

impl Injector {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    #[inline]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Accrue `dt` seconds of demand at `rate_of(source)` trucks/h and spawn
    /// whole trucks, in source order, while the source cell has room.
    ///
    /// `make` builds each particle from its source and serial.
    pub fn inject(
        &mut self,
        state:         &mut TransportState,
        dt:            f64,
        road_capacity: u32,
        rate_of:       impl Fn(&Source) -> f64,
        mut make:      impl FnMut(&Source, u64) -> Particle,
    ) -> TransportResult<Vec<ParticleId>> {
        let mut spawned = Vec::new();
        for src in &mut self.sources {
            let rate = rate_of(&*src);
            if rate > 0.0 && dt > 0.0 {
                src.acc += rate * dt / 3600.0;
            }
            while src.acc >= 1.0 {
                if state.occupancy.count(src.cell) >= road_capacity as usize {
                    src.blocked += 1;
                    trace!(source = %src.name, backlog = src.acc, "source cell full; injection deferred");
                    break;
                }
                let serial = state.take_serial();
                let id = state.spawn(make(&*src, serial))?;
                src.acc -= 1.0;
                spawned.push(id);
            }
        }
        Ok(spawned)
    }

    /// Forget accrued demand.
    pub fn reset(&mut self) {
        for s in &mut self.sources {
            s.acc = 0.0;
            s.blocked = 0;
        }
    }
}
