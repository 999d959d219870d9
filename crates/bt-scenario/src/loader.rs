//! CSV scenario loader.
//!
//! # CSV format
//!
//! One row per key and hour:
//!
//! ```csv
//! hour,key,value
//! 0,corridor,120
//! 0,border_capacity,inf
//! 1,corridor,95.5
//! ```
//!
//! `value` accepts anything `f64::from_str` does, including `inf`.  Hours a
//! key does not list are `0` (no inflow, closed border).  A repeated
//! `(hour, key)` pair keeps the last row.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{HourlyTable, ScenarioData, ScenarioError, ScenarioResult};

#[derive(Deserialize)]
struct ScenarioRecord {
    hour:  u32,
    key:   String,
    value: f64,
}

/// Load a scenario dataset from a CSV file.
pub fn load_scenario_csv(path: &Path) -> ScenarioResult<ScenarioData> {
    let file = std::fs::File::open(path)?;
    let data = load_scenario_reader(file)?;
    debug!(path = %path.display(), keys = data.len(), "loaded scenario");
    Ok(data)
}

/// Like [`load_scenario_csv`] but accepts any `Read` source.
pub fn load_scenario_reader<R: Read>(reader: R) -> ScenarioResult<ScenarioData> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut data = ScenarioData::new();

    for result in rdr.deserialize::<ScenarioRecord>() {
        let row = result.map_err(|e| ScenarioError::Parse(e.to_string()))?;
        if row.hour > 23 {
            return Err(ScenarioError::Hour { key: row.key, hour: row.hour });
        }
        if row.value.is_nan() || row.value < 0.0 {
            return Err(ScenarioError::Parse(format!(
                "value {} for {:?} at hour {} must be non-negative",
                row.value, row.key, row.hour
            )));
        }
        match data.get_mut(&row.key) {
            Some(t) => t.set(row.hour, row.value),
            None => {
                let mut t = HourlyTable::default();
                t.set(row.hour, row.value);
                data.insert(row.key, t);
            }
        }
    }

    if data.is_empty() {
        warn!("scenario file has no rows; every inflow is zero");
    }
    Ok(data)
}
