//! `ParticleStore` and `TransportState`.

use bt_core::{CellId, ParticleId, WorldPoint, YardId};
use bt_grid::Occupancy;

use crate::{DwellQueue, Particle, TransportError, TransportResult};

// ── ParticleStore ─────────────────────────────────────────────────────────────

/// Slot storage indexed by `ParticleId`.
///
/// Freed slots are reused last-in first-out, so ids stay dense and the
/// ascending-id iteration order is a pure function of the event history.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    slots: Vec<Option<Particle>>,
    free:  Vec<u32>,
    live:  usize,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn insert(&mut self, p: Particle) -> ParticleId {
        self.live += 1;
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(p);
                ParticleId(i)
            }
            None => {
                self.slots.push(Some(p));
                ParticleId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn remove(&mut self, id: ParticleId) -> Option<Particle> {
        let p = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id.0);
        self.live -= 1;
        Some(p)
    }

    /// Live particles in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|p| (ParticleId(i as u32), p)))
    }

    /// Live ids, ascending.  Collected so the caller may mutate while walking.
    pub fn ids(&self) -> Vec<ParticleId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

// ── TransportState ────────────────────────────────────────────────────────────

/// Everything the integrator mutates: particles, cell occupancy, and the
/// dwell queue.  `Clone` so snapshots can capture it whole.
#[derive(Clone, Debug)]
pub struct TransportState {
    pub(crate) store:     ParticleStore,
    pub(crate) occupancy: Occupancy,
    pub dwell:            DwellQueue,
    next_serial:          u64,
}

impl TransportState {
    pub fn new(cells: usize, unit_mass: f64) -> Self {
        Self {
            store:       ParticleStore::new(),
            occupancy:   Occupancy::new(cells, unit_mass),
            dwell:       DwellQueue::new(),
            next_serial: 0,
        }
    }

    #[inline]
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    #[inline]
    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    #[inline]
    pub fn particle(&self, id: ParticleId) -> TransportResult<&Particle> {
        self.store.get(id).ok_or(TransportError::ParticleNotFound(id))
    }

    /// Mutable access for mode changes.  Cell and bucket stay untouchable.
    #[inline]
    pub fn particle_mut(&mut self, id: ParticleId) -> TransportResult<&mut Particle> {
        self.store.get_mut(id).ok_or(TransportError::ParticleNotFound(id))
    }

    /// Serial for the next particle created.
    pub fn take_serial(&mut self) -> u64 {
        let s = self.next_serial;
        self.next_serial += 1;
        s
    }

    // ── Authorised transitions ────────────────────────────────────────────

    /// Add a particle to the store and to its cell's bucket.
    pub fn spawn(&mut self, mut p: Particle) -> TransportResult<ParticleId> {
        let cell = p.cell;
        if cell.index() >= self.occupancy.len() {
            return Err(bt_grid::GridError::OutOfBounds(cell).into());
        }
        p.on_grid = true;
        let id = self.store.insert(p);
        self.occupancy.insert(cell, id)?;
        Ok(id)
    }

    /// Move a particle's bucket membership and cell to `to`, placing it at
    /// `pos`.
    pub fn relocate(&mut self, id: ParticleId, to: CellId, pos: WorldPoint) -> TransportResult<()> {
        let p = self.store.get_mut(id).ok_or(TransportError::ParticleNotFound(id))?;
        self.occupancy.transfer(id, p.cell, to)?;
        p.cell = to;
        p.pos = pos;
        Ok(())
    }

    /// Take a particle out of its bucket (it reached the border).  It stays
    /// in the store and still counts towards the live total.
    pub fn detach(&mut self, id: ParticleId) -> TransportResult<()> {
        let p = self.store.get_mut(id).ok_or(TransportError::ParticleNotFound(id))?;
        if p.on_grid {
            self.occupancy.remove(p.cell, id)?;
            p.on_grid = false;
        }
        Ok(())
    }

    /// Remove a particle entirely.  The caller settles any held lot.
    pub fn despawn(&mut self, id: ParticleId) -> TransportResult<Particle> {
        self.detach(id)?;
        self.store.remove(id).ok_or(TransportError::ParticleNotFound(id))
    }

    pub(crate) fn set_held(&mut self, id: ParticleId, yard: Option<YardId>) -> TransportResult<()> {
        self.particle_mut(id)?.held = yard;
        Ok(())
    }

    /// Drop every particle; the serial counter restarts too.
    pub fn clear(&mut self) {
        self.store.clear();
        self.occupancy.clear();
        self.dwell.clear();
        self.next_serial = 0;
    }

    // ── Consistency ───────────────────────────────────────────────────────

    /// First on-grid particle missing from its own cell's bucket.
    pub fn find_misplaced(&self) -> Option<(ParticleId, CellId)> {
        self.store
            .iter()
            .filter(|(_, p)| p.on_grid)
            .find(|(id, p)| !self.occupancy.particles(p.cell).contains(id))
            .map(|(id, p)| (id, p.cell))
    }

    /// Particles currently in buckets.
    pub fn on_grid_count(&self) -> usize {
        self.store.iter().filter(|(_, p)| p.on_grid).count()
    }
}
