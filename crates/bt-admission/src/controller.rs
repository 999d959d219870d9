//! `AdmissionController` — the state machine over all lots.

use bt_core::{CellId, YardId};
use tracing::debug;

use crate::{AdmissionError, AdmissionResult, Yard, YardKind, YardState};

/// Tunables for admission and the routing entry penalty.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdmissionConfig {
    /// Fill fraction in `(0, 1]` at which a lot starts draining.
    pub cutoff:           f64,
    /// Seconds a lot stays closed after draining empty.
    pub cooldown_secs:    f64,
    /// Fill fraction above which entering a lot costs extra.
    pub penalty_soft:     f64,
    /// Penalty at 100 % fill, in routing cost units.
    pub penalty_scale:    u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            cutoff:        0.95,
            cooldown_secs: 900.0,
            penalty_soft:  0.6,
            penalty_scale: 8_000,
        }
    }
}

/// Why a truck was turned away.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Refusal {
    /// The lot is draining or cooling down.
    NotAvailable(YardState),
    /// The lot is at capacity (or has none).
    Full,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Decision {
    Admitted,
    Refused(Refusal),
}

impl Decision {
    #[inline]
    pub fn is_admitted(self) -> bool {
        self == Decision::Admitted
    }
}

/// All lots plus the admission settings.
#[derive(Clone, Debug)]
pub struct AdmissionController {
    yards:      Vec<Yard>,
    config:     AdmissionConfig,
    multiplier: f64,
    dirty:      bool,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> AdmissionResult<Self> {
        validate_cutoff(config.cutoff)?;
        Ok(Self { yards: Vec::new(), config, multiplier: 1.0, dirty: true })
    }

    /// Register a lot.  Ids are assigned densely in registration order.
    pub fn add_yard(&mut self, name: impl Into<String>, kind: YardKind, cells: Vec<CellId>, capacity: u32) -> YardId {
        let id = YardId(self.yards.len() as u16);
        let effective = scaled(capacity, self.multiplier);
        self.yards.push(Yard {
            id,
            name: name.into(),
            kind,
            cells,
            base_capacity: capacity,
            capacity: effective,
            bound: effective,
            occupants: 0,
            state: YardState::Available,
        });
        self.dirty = true;
        id
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn yards(&self) -> &[Yard] {
        &self.yards
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.yards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.yards.is_empty()
    }

    pub fn yard(&self, id: YardId) -> AdmissionResult<&Yard> {
        self.yards.get(id.index()).ok_or(AdmissionError::UnknownYard(id))
    }

    #[inline]
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    #[inline]
    pub fn capacity_multiplier(&self) -> f64 {
        self.multiplier
    }

    /// `true` if `id` would accept a truck right now.  Read-only, so the
    /// transport plan pass can ask without side effects.
    pub fn can_admit(&self, id: YardId) -> bool {
        self.yards.get(id.index()).is_some_and(|y| self.admissible(y))
    }

    fn admissible(&self, y: &Yard) -> bool {
        y.state == YardState::Available && y.capacity > 0 && y.occupants < y.threshold(self.config.cutoff)
    }

    /// `true` if some lot of `kind` could ever admit: it covers at least
    /// one cell and has capacity.
    pub fn any_of_kind(&self, kind: YardKind) -> bool {
        self.yards.iter().any(|y| y.kind == kind && y.capacity > 0 && !y.cells.is_empty())
    }

    /// Cells of every admissible lot of `kind`, in yard order.
    pub fn sink_cells(&self, kind: YardKind) -> Vec<CellId> {
        self.yards
            .iter()
            .filter(|y| y.kind == kind && self.admissible(y))
            .flat_map(|y| y.cells.iter().copied())
            .collect()
    }

    /// Per-yard wall mask for a field routing to `kind`: every lot that is
    /// not an admissible lot of that kind is closed.
    pub fn closed_mask(&self, kind: YardKind) -> Vec<bool> {
        self.yards.iter().map(|y| !(y.kind == kind && self.admissible(y))).collect()
    }

    /// Per-yard entry penalty: `scale · ((fill − soft) / (1 − soft))²` above
    /// the soft threshold, else 0.
    pub fn entry_penalties(&self) -> Vec<u32> {
        let soft = self.config.penalty_soft.clamp(0.0, 0.999);
        self.yards
            .iter()
            .map(|y| {
                let fill = y.fill_ratio().min(1.0);
                if fill <= soft {
                    0
                } else {
                    let x = (fill - soft) / (1.0 - soft);
                    (self.config.penalty_scale as f64 * x * x).round() as u32
                }
            })
            .collect()
    }

    /// First lot holding more trucks than its bound, as
    /// `(yard, occupants, bound)`.
    pub fn find_over_capacity(&self) -> Option<(YardId, u32, u32)> {
        self.yards
            .iter()
            .find(|y| y.occupants > y.bound)
            .map(|y| (y.id, y.occupants, y.bound))
    }

    pub fn total_occupants(&self) -> u64 {
        self.yards.iter().map(|y| y.occupants as u64).sum()
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Admit one truck into `id` if it is available and below capacity.
    ///
    /// Reaching the cutoff flips the lot to `Draining` immediately, so the
    /// admission that fills it is the last one.
    pub fn try_admit(&mut self, id: YardId, now: f64) -> AdmissionResult<Decision> {
        let cutoff = self.config.cutoff;
        let y = self.yards.get_mut(id.index()).ok_or(AdmissionError::UnknownYard(id))?;
        if y.state != YardState::Available {
            return Ok(Decision::Refused(Refusal::NotAvailable(y.state)));
        }
        if y.capacity == 0 || y.occupants >= y.threshold(cutoff) {
            return Ok(Decision::Refused(Refusal::Full));
        }
        y.occupants += 1;
        if y.occupants >= y.threshold(cutoff) {
            y.state = YardState::Draining;
            self.dirty = true;
            debug!(yard = %id, occupants = y.occupants, now, "yard draining");
        }
        Ok(Decision::Admitted)
    }

    /// One truck leaves `id`.  A draining lot that empties enters cooldown.
    pub fn release(&mut self, id: YardId, now: f64) -> AdmissionResult<()> {
        let cooldown = self.config.cooldown_secs;
        let y = self.yards.get_mut(id.index()).ok_or(AdmissionError::UnknownYard(id))?;
        if y.occupants == 0 {
            return Err(AdmissionError::Underflow(id));
        }
        y.occupants -= 1;
        y.bound = y.capacity.max(y.occupants.min(y.bound));
        if y.state == YardState::Draining && y.occupants == 0 {
            y.state = YardState::Cooldown { until: now + cooldown };
            debug!(yard = %id, until = now + cooldown, "yard cooling down");
        }
        Ok(())
    }

    /// Expire cooldowns and settle any lot whose occupancy no longer
    /// matches its state.  Returns the number of transitions.
    pub fn update(&mut self, now: f64) -> usize {
        let cutoff = self.config.cutoff;
        let cooldown = self.config.cooldown_secs;
        let mut changed = 0;
        for y in &mut self.yards {
            let next = match y.state {
                YardState::Available if y.capacity > 0 && y.occupants >= y.threshold(cutoff) => YardState::Draining,
                YardState::Draining if y.occupants == 0 => YardState::Cooldown { until: now + cooldown },
                YardState::Cooldown { until } if now >= until => YardState::Available,
                s => s,
            };
            if next != y.state {
                debug!(yard = %y.id, from = y.state.as_str(), to = next.as_str(), now, "yard transition");
                // Draining → Cooldown keeps the lot closed to routing.
                if !matches!((y.state, next), (YardState::Draining, YardState::Cooldown { .. })) {
                    self.dirty = true;
                }
                y.state = next;
                changed += 1;
            }
        }
        changed
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ── Scenario controls ─────────────────────────────────────────────────

    /// Change the cutoff.  Lots already at or above the new cutoff start
    /// draining on the next [`update`](Self::update).
    pub fn set_cutoff(&mut self, cutoff: f64) -> AdmissionResult<()> {
        validate_cutoff(cutoff)?;
        self.config.cutoff = cutoff;
        self.dirty = true;
        Ok(())
    }

    /// Scale every lot's capacity.  Occupants above a shrunken capacity stay
    /// where they are; the lot's bound tracks them down as they leave.
    pub fn set_capacity_multiplier(&mut self, multiplier: f64) -> AdmissionResult<()> {
        if !(multiplier.is_finite() && multiplier >= 0.0) {
            return Err(AdmissionError::Setting(format!("capacity multiplier {multiplier} must be ≥ 0")));
        }
        self.multiplier = multiplier;
        for y in &mut self.yards {
            y.capacity = scaled(y.base_capacity, multiplier);
            y.bound = y.capacity.max(y.occupants);
        }
        self.dirty = true;
        Ok(())
    }

    /// Empty every lot and reopen it.
    pub fn reset(&mut self) {
        for y in &mut self.yards {
            y.occupants = 0;
            y.bound = y.capacity;
            y.state = YardState::Available;
        }
        self.dirty = true;
    }
}

fn scaled(capacity: u32, multiplier: f64) -> u32 {
    (capacity as f64 * multiplier).floor() as u32
}

fn validate_cutoff(cutoff: f64) -> AdmissionResult<()> {
    if cutoff > 0.0 && cutoff <= 1.0 {
        Ok(())
    } else {
        Err(AdmissionError::Setting(format!("cutoff {cutoff} must be in (0, 1]")))
    }
}
