//! Unit tests for bt-scenario.

#[cfg(test)]
mod loader {
    use std::io::{Cursor, Write};

    use crate::{BORDER_CAPACITY, ScenarioError, load_scenario_csv, load_scenario_reader};

    #[test]
    fn rows_fill_hourly_tables() {
        let csv = "hour,key,value\n0,corridor,120\n1,corridor,95.5\n0,border_capacity,inf\n23, corridor , 7\n";
        let data = load_scenario_reader(Cursor::new(csv)).unwrap();
        assert_eq!(data.len(), 2);
        let corridor = data.get("corridor").unwrap();
        assert_eq!(corridor.at(0), 120.0);
        assert_eq!(corridor.at(1), 95.5);
        assert_eq!(corridor.at(2), 0.0, "unlisted hours are zero");
        assert_eq!(corridor.at(23), 7.0);
        assert_eq!(corridor.at(24), 120.0, "hours wrap");
        assert!(data.value_or(BORDER_CAPACITY, 0, 0.0).is_infinite());
        assert_eq!(data.value_or(BORDER_CAPACITY, 5, 1.0), 0.0);
        assert_eq!(data.value_or("missing", 5, 3.0), 3.0);
    }

    #[test]
    fn later_rows_win() {
        let csv = "hour,key,value\n4,k,1\n4,k,2\n";
        let data = load_scenario_reader(Cursor::new(csv)).unwrap();
        assert_eq!(data.get("k").unwrap().at(4), 2.0);
    }

    #[test]
    fn bad_hour_is_rejected() {
        let csv = "hour,key,value\n24,corridor,1\n";
        let err = load_scenario_reader(Cursor::new(csv)).unwrap_err();
        assert!(matches!(err, ScenarioError::Hour { hour: 24, .. }));
    }

    #[test]
    fn negative_and_garbage_values_are_rejected() {
        let neg = "hour,key,value\n0,corridor,-1\n";
        assert!(matches!(load_scenario_reader(Cursor::new(neg)), Err(ScenarioError::Parse(_))));
        let junk = "hour,key,value\n0,corridor,lots\n";
        assert!(matches!(load_scenario_reader(Cursor::new(junk)), Err(ScenarioError::Parse(_))));
    }

    #[test]
    fn loads_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "hour,key,value\n3,industrial,40").unwrap();
        let data = load_scenario_csv(f.path()).unwrap();
        assert_eq!(data.value_or("industrial", 3, 0.0), 40.0);
    }
}

#[cfg(test)]
mod blend {
    use crate::{HourlyTable, ScenarioBlend, ScenarioData, ScenarioError};

    fn pair() -> (ScenarioData, ScenarioData) {
        let a = ScenarioData::new()
            .with("flow", HourlyTable::constant(100.0))
            .with("cap", HourlyTable::constant(f64::INFINITY))
            .with("only_a", HourlyTable::constant(1.0));
        let b = ScenarioData::new()
            .with("flow", HourlyTable::constant(300.0))
            .with("cap", HourlyTable::constant(60.0));
        (a, b)
    }

    #[test]
    fn interpolates_linearly() {
        let (a, b) = pair();
        let mut s = ScenarioBlend::new(a, b, 0.25).unwrap();
        assert_eq!(s.value_or("flow", 0, 0.0), 150.0);
        s.set_weight(1.0).unwrap();
        assert_eq!(s.value_or("flow", 0, 0.0), 300.0);
        assert_eq!(s.value_or("only_a", 0, 0.0), 1.0);
        assert_eq!(s.value_or("neither", 0, 9.0), 9.0);
    }

    #[test]
    fn infinite_capacity_is_exact_at_endpoints() {
        let (a, b) = pair();
        let mut s = ScenarioBlend::new(a, b, 0.0).unwrap();
        assert!(s.value_or("cap", 0, 0.0).is_infinite());
        s.set_weight(1.0).unwrap();
        assert_eq!(s.value_or("cap", 0, 0.0), 60.0);
        s.set_weight(0.5).unwrap();
        assert!(s.value_or("cap", 0, 0.0).is_infinite());
    }

    #[test]
    fn weight_outside_unit_interval_is_rejected() {
        let (a, b) = pair();
        assert!(matches!(ScenarioBlend::new(a.clone(), b, 1.5), Err(ScenarioError::Weight(_))));
        let mut s = ScenarioBlend::single(a);
        assert!(s.set_weight(f64::NAN).is_err());
        assert_eq!(s.weight(), 0.0);
        assert!(s.has_key("flow"));
    }
}
