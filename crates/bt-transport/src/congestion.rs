//! Congestion law.
//!
//! ```text
//! c(ρ) = 1 / (1 + (ρ / ρ₀)^p)
//! ```
//!
//! `ρ` is trucks per cell downstream, after cancelling trucks heading the
//! other way and adding commuter friction.  `c(0) = 1` and `c(ρ₀) = ½`.

/// Calibrated exponent.
pub const DEFAULT_EXPONENT: f32 = 3.7;

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CongestionLaw {
    /// Density at which speed halves, in trucks per cell.
    pub rho0:     f32,
    pub exponent: f32,
}

impl Default for CongestionLaw {
    fn default() -> Self {
        Self { rho0: 4.0, exponent: DEFAULT_EXPONENT }
    }
}

impl CongestionLaw {
    /// Speed factor in `(0, 1]`.
    #[inline]
    pub fn factor(&self, rho: f32) -> f32 {
        if rho <= 0.0 || self.rho0 <= 0.0 {
            return 1.0;
        }
        1.0 / (1.0 + (rho / self.rho0).powf(self.exponent))
    }

    /// Effective density: downstream count net of opposing trucks, plus
    /// friction.
    #[inline]
    pub fn effective_density(downstream: u32, opposing: u32, friction: f32) -> f32 {
        downstream.saturating_sub(opposing) as f32 + friction.max(0.0)
    }
}
