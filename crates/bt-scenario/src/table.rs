//! `HourlyTable` and `ScenarioData`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One value per hour of day.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct HourlyTable {
    values: [f64; 24],
}

impl HourlyTable {
    pub fn new(values: [f64; 24]) -> Self {
        Self { values }
    }

    /// The same value every hour.
    pub fn constant(v: f64) -> Self {
        Self { values: [v; 24] }
    }

    /// Value for `hour`, wrapping past 23.
    #[inline]
    pub fn at(&self, hour: u32) -> f64 {
        self.values[(hour % 24) as usize]
    }

    #[inline]
    pub fn set(&mut self, hour: u32, v: f64) {
        self.values[(hour % 24) as usize] = v;
    }

    pub fn values(&self) -> &[f64; 24] {
        &self.values
    }
}

/// A named collection of hourly tables.
///
/// Keys are kept sorted so iteration (and therefore anything derived from
/// it) is deterministic.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct ScenarioData {
    tables: BTreeMap<String, HourlyTable>,
}

impl ScenarioData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, table: HourlyTable) -> Self {
        self.insert(key, table);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, table: HourlyTable) {
        self.tables.insert(key.into(), table);
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&HourlyTable> {
        self.tables.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut HourlyTable> {
        self.tables.get_mut(key)
    }

    /// Value of `key` at `hour`, or `default` if the key is absent.
    #[inline]
    pub fn value_or(&self, key: &str, hour: u32, default: f64) -> f64 {
        self.get(key).map_or(default, |t| t.at(hour))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
