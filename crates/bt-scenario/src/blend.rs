//! `ScenarioBlend` — interpolate between a base and an alternative dataset.
//!
//! ```text
//! value(key, hour) = (1 − w) · base + w · alt
//! ```
//!
//! `w = 0` returns the base value exactly and `w = 1` the alternative's, so
//! unlimited (`inf`) capacities survive at the endpoints.  Between them an
//! infinite side makes the blend infinite.  A key missing from one dataset
//! takes the other's value.

use crate::{ScenarioData, ScenarioError, ScenarioResult};

#[derive(Clone, Debug)]
pub struct ScenarioBlend {
    base:   ScenarioData,
    alt:    Option<ScenarioData>,
    weight: f64,
}

impl ScenarioBlend {
    /// A blend that always returns `base`.
    pub fn single(base: ScenarioData) -> Self {
        Self { base, alt: None, weight: 0.0 }
    }

    pub fn new(base: ScenarioData, alt: ScenarioData, weight: f64) -> ScenarioResult<Self> {
        let mut b = Self { base, alt: Some(alt), weight: 0.0 };
        b.set_weight(weight)?;
        Ok(b)
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn base(&self) -> &ScenarioData {
        &self.base
    }

    pub fn alt(&self) -> Option<&ScenarioData> {
        self.alt.as_ref()
    }

    /// Set the interpolation weight.  Takes effect on the next query.
    pub fn set_weight(&mut self, weight: f64) -> ScenarioResult<()> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(ScenarioError::Weight(weight));
        }
        self.weight = weight;
        Ok(())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.base.get(key).is_some() || self.alt.as_ref().is_some_and(|a| a.get(key).is_some())
    }

    /// Blended value of `key` at `hour`, or `default` if neither dataset
    /// has the key.
    pub fn value_or(&self, key: &str, hour: u32, default: f64) -> f64 {
        let a = self.base.get(key).map(|t| t.at(hour));
        let b = self.alt.as_ref().and_then(|d| d.get(key)).map(|t| t.at(hour));
        match (a, b) {
            (None, None) => default,
            (Some(v), None) | (None, Some(v)) => v,
            (Some(a), Some(b)) => lerp(a, b, self.weight),
        }
    }
}

fn lerp(a: f64, b: f64, w: f64) -> f64 {
    if w <= 0.0 {
        a
    } else if w >= 1.0 {
        b
    } else if a.is_infinite() || b.is_infinite() {
        f64::INFINITY
    } else {
        (1.0 - w) * a + w * b
    }
}
