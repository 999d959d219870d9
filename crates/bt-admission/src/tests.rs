//! Unit tests for bt-admission.

#[cfg(test)]
mod helpers {
    use bt_core::{CellId, YardId};

    use crate::{AdmissionConfig, AdmissionController, YardKind};

    pub fn config(cutoff: f64, cooldown_secs: f64) -> AdmissionConfig {
        AdmissionConfig { cutoff, cooldown_secs, ..AdmissionConfig::default() }
    }

    /// Controller with one conversion yard of `capacity` trucks.
    pub fn one_yard(capacity: u32, cutoff: f64) -> (AdmissionController, YardId) {
        let mut ac = AdmissionController::new(config(cutoff, 60.0)).unwrap();
        let id = ac.add_yard("y0", YardKind::Conversion, vec![CellId(4), CellId(5)], capacity);
        ac.take_dirty();
        (ac, id)
    }
}

// ── Admission ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod admission {
    use super::helpers::{config, one_yard};
    use crate::{AdmissionController, AdmissionError, Decision, Refusal, YardState};
    use bt_core::YardId;

    #[test]
    fn capacity_one_never_double_admits() {
        let (mut ac, y) = one_yard(1, 0.9);
        assert_eq!(ac.try_admit(y, 0.0).unwrap(), Decision::Admitted);
        let second = ac.try_admit(y, 0.0).unwrap();
        assert_eq!(second, Decision::Refused(Refusal::NotAvailable(YardState::Draining)));
        assert_eq!(ac.yard(y).unwrap().occupants(), 1);
        assert!(ac.find_over_capacity().is_none());
    }

    #[test]
    fn reaching_cutoff_starts_draining_and_marks_dirty() {
        let (mut ac, y) = one_yard(10, 0.5);
        for _ in 0..4 {
            assert!(ac.try_admit(y, 0.0).unwrap().is_admitted());
        }
        assert!(!ac.is_dirty());
        assert!(ac.can_admit(y));
        assert!(ac.try_admit(y, 0.0).unwrap().is_admitted());
        assert_eq!(ac.yard(y).unwrap().state(), YardState::Draining);
        assert!(ac.take_dirty());
        assert!(!ac.can_admit(y));
        assert!(ac.sink_cells(crate::YardKind::Conversion).is_empty());
        assert_eq!(ac.closed_mask(crate::YardKind::Conversion), vec![true]);
    }

    #[test]
    fn zero_capacity_is_never_a_sink() {
        let (mut ac, y) = one_yard(0, 1.0);
        assert_eq!(ac.try_admit(y, 0.0).unwrap(), Decision::Refused(Refusal::Full));
        assert!(ac.sink_cells(crate::YardKind::Conversion).is_empty());
        assert!(!ac.any_of_kind(crate::YardKind::Conversion));
    }

    #[test]
    fn draining_lot_still_counts_as_existing() {
        let (mut ac, y) = one_yard(1, 1.0);
        assert!(ac.try_admit(y, 0.0).unwrap().is_admitted());
        assert!(ac.sink_cells(crate::YardKind::Conversion).is_empty());
        assert!(ac.any_of_kind(crate::YardKind::Conversion));
    }

    #[test]
    fn lot_without_cells_does_not_count() {
        let mut ac = AdmissionController::new(config(1.0, 0.0)).unwrap();
        ac.add_yard("nowhere", crate::YardKind::Overnight, Vec::new(), 10);
        assert!(!ac.any_of_kind(crate::YardKind::Overnight));
    }

    #[test]
    fn bookkeeping_defects_are_errors() {
        let (mut ac, y) = one_yard(2, 1.0);
        assert!(matches!(ac.release(y, 0.0), Err(AdmissionError::Underflow(_))));
        assert!(matches!(ac.try_admit(YardId(9), 0.0), Err(AdmissionError::UnknownYard(_))));
        assert!(ac.set_cutoff(0.0).is_err());
        assert!(ac.set_cutoff(1.5).is_err());
        assert!(ac.set_capacity_multiplier(-1.0).is_err());
    }
}

// ── Hysteresis ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod hysteresis {
    use super::helpers::one_yard;
    use crate::{Decision, Refusal, YardKind, YardState};
    use test_log::test;

    #[test]
    fn drained_yard_waits_out_cooldown_despite_pressure() {
        let (mut ac, y) = one_yard(2, 1.0);
        ac.try_admit(y, 0.0).unwrap();
        ac.try_admit(y, 0.0).unwrap();
        assert_eq!(ac.yard(y).unwrap().state(), YardState::Draining);

        ac.release(y, 10.0).unwrap();
        ac.release(y, 20.0).unwrap();
        assert_eq!(ac.yard(y).unwrap().state(), YardState::Cooldown { until: 80.0 });

        // Hammer it every second until just before expiry.
        for t in 20..80 {
            let now = t as f64;
            ac.update(now);
            let d = ac.try_admit(y, now).unwrap();
            assert!(matches!(d, Decision::Refused(Refusal::NotAvailable(YardState::Cooldown { .. }))), "t = {t}");
        }
        assert_eq!(ac.yard(y).unwrap().occupants(), 0);

        ac.take_dirty();
        assert_eq!(ac.update(80.0), 1);
        assert!(ac.take_dirty(), "reopening changes the admissible set");
        assert_eq!(ac.sink_cells(YardKind::Conversion).len(), 2);
        assert!(ac.try_admit(y, 80.0).unwrap().is_admitted());
    }

    #[test]
    fn draining_to_cooldown_does_not_dirty_routing() {
        let (mut ac, y) = one_yard(1, 1.0);
        ac.try_admit(y, 0.0).unwrap();
        ac.take_dirty();
        ac.release(y, 5.0).unwrap();
        ac.update(5.0);
        assert!(!ac.is_dirty());
    }

    #[test]
    fn lowering_cutoff_drains_on_update() {
        let (mut ac, y) = one_yard(10, 1.0);
        for _ in 0..5 {
            ac.try_admit(y, 0.0).unwrap();
        }
        ac.set_cutoff(0.5).unwrap();
        assert_eq!(ac.update(1.0), 1);
        assert_eq!(ac.yard(y).unwrap().state(), YardState::Draining);
    }
}

// ── Capacity controls ─────────────────────────────────────────────────────────

#[cfg(test)]
mod capacity {
    use super::helpers::one_yard;
    use crate::AdmissionController;
    use crate::{AdmissionConfig, YardKind};
    use bt_core::CellId;

    #[test]
    fn shrinking_capacity_grandfathers_occupants() {
        let (mut ac, y) = one_yard(10, 1.0);
        for _ in 0..6 {
            ac.try_admit(y, 0.0).unwrap();
        }
        ac.set_capacity_multiplier(0.5).unwrap();
        let yard = ac.yard(y).unwrap();
        assert_eq!(yard.capacity(), 5);
        assert_eq!(yard.bound(), 6);
        assert!(ac.find_over_capacity().is_none());
        assert!(!ac.can_admit(y));

        ac.release(y, 1.0).unwrap();
        assert_eq!(ac.yard(y).unwrap().bound(), 5);
    }

    #[test]
    fn entry_penalty_grows_past_soft_fill() {
        let cfg = AdmissionConfig { cutoff: 1.0, penalty_soft: 0.5, penalty_scale: 1_000, ..Default::default() };
        let mut ac = AdmissionController::new(cfg).unwrap();
        let y = ac.add_yard("p", YardKind::Staging, vec![CellId(0)], 4);
        assert_eq!(ac.entry_penalties(), vec![0]);
        ac.try_admit(y, 0.0).unwrap();
        ac.try_admit(y, 0.0).unwrap();
        assert_eq!(ac.entry_penalties(), vec![0], "50 % is the soft threshold itself");
        ac.try_admit(y, 0.0).unwrap();
        assert_eq!(ac.entry_penalties(), vec![250]);
    }

    #[test]
    fn reset_reopens_everything() {
        let (mut ac, y) = one_yard(1, 1.0);
        ac.try_admit(y, 0.0).unwrap();
        ac.reset();
        assert_eq!(ac.total_occupants(), 0);
        assert!(ac.can_admit(y));
        assert!(ac.is_dirty());
    }
}
