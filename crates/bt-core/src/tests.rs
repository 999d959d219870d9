//! Unit tests for bt-core primitives.

#[cfg(test)]
mod ids {
    use crate::{CellId, LaneId, ParticleId, YardId};

    #[test]
    fn index_roundtrip() {
        let id = CellId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(CellId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(CellId::INVALID.0, u32::MAX);
        assert_eq!(ParticleId::INVALID.0, u32::MAX);
        assert_eq!(YardId::INVALID.0, u16::MAX);
        assert!(!LaneId::default().is_valid());
    }

    #[test]
    fn yard_id_overflow_rejected() {
        assert!(YardId::try_from(70_000usize).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(ParticleId(7).to_string(), "ParticleId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::{GeoPoint, LocalProjection, WorldPoint};

    #[test]
    fn origin_projects_to_zero() {
        let origin = GeoPoint::new(26.0667, -98.2052);
        let proj = LocalProjection::new(origin);
        let p = proj.project(origin);
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
    }

    #[test]
    fn one_degree_latitude_is_fixed_metres() {
        let proj = LocalProjection::new(GeoPoint::new(26.0, -98.0));
        let p = proj.project(GeoPoint::new(27.0, -98.0));
        assert!((p.y - 111_320.0).abs() < 1e-6, "got {}", p.y);
    }

    #[test]
    fn longitude_shrinks_with_latitude() {
        let proj = LocalProjection::new(GeoPoint::new(60.0, 0.0));
        let p = proj.project(GeoPoint::new(60.0, 1.0));
        assert!((p.x - 55_660.0).abs() < 1.0, "got {}", p.x);
    }

    #[test]
    fn unproject_inverts_project() {
        let proj = LocalProjection::new(GeoPoint::new(26.07, -98.21));
        let g = GeoPoint::new(26.09, -98.18);
        let back = proj.unproject(proj.project(g));
        assert!((back.lat - g.lat).abs() < 1e-9);
        assert!((back.lon - g.lon).abs() < 1e-9);
    }

    #[test]
    fn world_distance_and_lerp() {
        let a = WorldPoint::new(0.0, 0.0);
        let b = WorldPoint::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.lerp(b, 0.5), WorldPoint::new(1.5, 2.0));
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, SimSecond};

    #[test]
    fn advance_accumulates() {
        let mut clock = SimClock::new(0);
        clock.advance(0.5);
        clock.advance(0.75);
        assert_eq!(clock.now(), 1.25);
        assert_eq!(clock.whole_second(), SimSecond(1));
        assert_eq!(clock.steps, 2);
    }

    #[test]
    fn negative_delta_ignored() {
        let mut clock = SimClock::new(0);
        clock.advance(-5.0);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn hour_of_day_wraps() {
        let mut clock = SimClock::new(22);
        assert_eq!(clock.hour_of_day(), 22);
        clock.advance(3.0 * 3_600.0);
        assert_eq!(clock.hour_of_day(), 1);
    }

    #[test]
    fn next_hour_boundary_from_offset_start() {
        let clock = SimClock::new(6);
        assert_eq!(clock.next_hour_boundary(0.0), 3_600.0);
        assert_eq!(clock.next_hour_boundary(1_800.0), 3_600.0);
        assert_eq!(clock.next_hour_boundary(3_600.0), 7_200.0);
    }

    #[test]
    fn display_contains_local_hour() {
        let mut clock = SimClock::new(7);
        clock.advance(90.0);
        assert!(clock.to_string().contains("local hour 07"));
    }
}

#[cfg(test)]
mod rng {
    use crate::{SimRng, particle_jitter};

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SimRng::new(99);
        let mut b = SimRng::new(99);
        for _ in 0..100 {
            assert_eq!(a.gen_bool(0.3), b.gen_bool(0.3));
        }
    }

    #[test]
    fn clone_resumes_identically() {
        let mut a = SimRng::new(5);
        let _ = a.gen_bool(0.5);
        let mut b = a.clone();
        let xs: Vec<bool> = (0..64).map(|_| a.gen_bool(0.5)).collect();
        let ys: Vec<bool> = (0..64).map(|_| b.gen_bool(0.5)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn gen_bool_clamps_probability() {
        let mut r = SimRng::new(7);
        assert!((0..50).all(|_| r.gen_bool(1.5)));
        assert!((0..50).all(|_| !r.gen_bool(-0.5)));
    }

    #[test]
    fn jitter_is_pure_and_bounded() {
        for serial in 0..500 {
            let j = particle_jitter(42, serial, 0.1);
            assert_eq!(j, particle_jitter(42, serial, 0.1));
            assert!((0.9..=1.1).contains(&j), "serial {serial}: {j}");
        }
    }

    #[test]
    fn zero_amplitude_is_unity() {
        assert_eq!(particle_jitter(1, 2, 0.0), 1.0);
    }
}

#[cfg(test)]
mod mode {
    use crate::{LossCause, ModeKind, StallReason};

    #[test]
    fn stall_reasons_map_to_loss_buckets() {
        assert_eq!(StallReason::LotFull.loss_cause(), LossCause::LotFull);
        assert_eq!(StallReason::BorderClosed.loss_cause(), LossCause::BorderQueue);
    }

    #[test]
    fn loss_cause_indices_are_dense() {
        for (i, c) in LossCause::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(ModeKind::Sleeping.to_string(), "sleeping");
        assert_eq!(StallReason::DeadEnd.as_str(), "dead_end");
    }
}
