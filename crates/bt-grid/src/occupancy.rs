//! Per-cell mass and particle buckets.
//!
//! `Occupancy` is the only place cell mass changes, and it only changes
//! together with bucket membership: [`insert`](Occupancy::insert),
//! [`remove`](Occupancy::remove), and [`transfer`](Occupancy::transfer) each
//! update both in one call.  Outside those calls
//! `mass(cell) == count(cell) * unit_mass` holds for every cell.

use bt_core::{CellId, ParticleId};

use crate::{GridError, GridResult};

#[derive(Clone, Debug)]
pub struct Occupancy {
    unit_mass: f64,
    mass:      Vec<f64>,
    buckets:   Vec<Vec<ParticleId>>,
    total:     usize,
}

impl Occupancy {
    /// Empty occupancy for a grid of `len` cells.
    pub fn new(len: usize, unit_mass: f64) -> Self {
        Self {
            unit_mass,
            mass:    vec![0.0; len],
            buckets: vec![Vec::new(); len],
            total:   0,
        }
    }

    #[inline]
    pub fn unit_mass(&self) -> f64 {
        self.unit_mass
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    #[inline]
    pub fn mass(&self, cell: CellId) -> f64 {
        self.mass[cell.index()]
    }

    #[inline]
    pub fn count(&self, cell: CellId) -> usize {
        self.buckets[cell.index()].len()
    }

    #[inline]
    pub fn particles(&self, cell: CellId) -> &[ParticleId] {
        &self.buckets[cell.index()]
    }

    /// Particles across all cells.
    #[inline]
    pub fn total_count(&self) -> usize {
        self.total
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.iter().sum()
    }

    // ── Authorised mutations ──────────────────────────────────────────────

    /// Add `particle` to `cell`.
    pub fn insert(&mut self, cell: CellId, particle: ParticleId) -> GridResult<()> {
        let i = self.slot(cell)?;
        self.buckets[i].push(particle);
        self.mass[i] += self.unit_mass;
        self.total += 1;
        Ok(())
    }

    /// Remove `particle` from `cell`.
    pub fn remove(&mut self, cell: CellId, particle: ParticleId) -> GridResult<()> {
        let i = self.slot(cell)?;
        let pos = self.buckets[i]
            .iter()
            .position(|&p| p == particle)
            .ok_or(GridError::NotInBucket { particle, cell })?;
        self.buckets[i].remove(pos);
        self.mass[i] -= self.unit_mass;
        if self.buckets[i].is_empty() {
            // Clear float residue so empty cells compare exactly.
            self.mass[i] = 0.0;
        }
        self.total -= 1;
        Ok(())
    }

    /// Move `particle` from `from` to `to`.  On error nothing changes.
    pub fn transfer(&mut self, particle: ParticleId, from: CellId, to: CellId) -> GridResult<()> {
        self.slot(to)?;
        self.remove(from, particle)?;
        self.insert(to, particle)
    }

    /// Drop every particle.
    pub fn clear(&mut self) {
        self.mass.iter_mut().for_each(|m| *m = 0.0);
        self.buckets.iter_mut().for_each(Vec::clear);
        self.total = 0;
    }

    /// First cell whose mass disagrees with its bucket, as
    /// `(cell, mass, count)`.
    pub fn find_mass_mismatch(&self) -> Option<(CellId, f64, usize)> {
        let tol = self.unit_mass * 1e-6;
        self.buckets.iter().zip(&self.mass).enumerate().find_map(|(i, (b, &m))| {
            let expected = b.len() as f64 * self.unit_mass;
            ((m - expected).abs() > tol).then_some((CellId(i as u32), m, b.len()))
        })
    }

    #[inline]
    fn slot(&self, cell: CellId) -> GridResult<usize> {
        if cell.index() < self.mass.len() {
            Ok(cell.index())
        } else {
            Err(GridError::OutOfBounds(cell))
        }
    }
}
