use qtty::{Degrees, Radian, Radians};

use crate::conditions::Conditions;
use crate::error::SchedulerResult;
use crate::models::Observation;

/// Altitude band and sky-mask checks for a single pointing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyConstraints {
    pub min_alt: Radians,
    pub max_alt: Radians,
}

impl SkyConstraints {
    pub const DEFAULT_MIN_ALT: f64 = 30.0;
    pub const DEFAULT_MAX_ALT: f64 = 85.0;

    pub fn new(min_alt: Degrees, max_alt: Degrees) -> Self {
        Self {
            min_alt: min_alt.to::<Radian>(),
            max_alt: max_alt.to::<Radian>(),
        }
    }

    /// Altitude at the observation's pixel lies strictly inside the band.
    pub fn in_alt_band(&self, conditions: &Conditions, observation: &Observation) -> SchedulerResult<bool> {
        let pixel = conditions.pixel_of(observation.ra, observation.dec);
        let alt = conditions.alt()?.get(pixel).copied().unwrap_or(f64::NEG_INFINITY);
        Ok(alt > self.min_alt.value() && alt < self.max_alt.value())
    }

    /// The pixel has a usable limiting magnitude in the observation's filter.
    pub fn is_observable(&self, conditions: &Conditions, observation: &Observation) -> SchedulerResult<bool> {
        let pixel = conditions.pixel_of(observation.ra, observation.dec);
        Ok(matches!(conditions.m5_at(observation.filter, pixel)?, Some(m5) if m5 > 0.0))
    }
}

impl Default for SkyConstraints {
    fn default() -> Self {
        Self::new(Degrees::new(Self::DEFAULT_MIN_ALT), Degrees::new(Self::DEFAULT_MAX_ALT))
    }
}
