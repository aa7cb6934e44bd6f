//! Feasibility basis functions.
//!
//! A survey is feasible only when every one of its basis functions says so.
//! Any `Fn(&Conditions) -> bool` closure is a basis function; the types in
//! this module cover the stock checks used by deep-drilling surveys.

use qtty::{Day, Degrees, Hours, Minutes, Radian};

use crate::conditions::Conditions;
use crate::features::ObservationCounter;
use crate::models::{FilterSet, Observation};

/// Feasibility predicate over the current conditions.
pub trait BasisFunction {
    fn check_feasibility(&self, conditions: &Conditions) -> bool;

    /// Bookkeeping hook for executed observations.
    fn add_observation(&mut self, _observation: &Observation) {}

    fn label(&self) -> &str {
        "basis function"
    }
}

impl<F> BasisFunction for F
where
    F: Fn(&Conditions) -> bool,
{
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        self(conditions)
    }
}

/// Feasible between the end of evening twilight and the start of morning
/// twilight.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotTwilight;

impl BasisFunction for NotTwilight {
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        match (
            conditions.mjd(),
            conditions.last_twilight_end(),
            conditions.next_twilight_start(),
        ) {
            (Some(now), Some(end), Some(start)) => now >= end && now < start,
            _ => false,
        }
    }

    fn label(&self) -> &str {
        "not twilight"
    }
}

/// Feasible when at least `time_needed` remains before morning twilight.
#[derive(Debug, Clone, Copy)]
pub struct TimeToTwilight {
    time_needed: Minutes,
}

impl TimeToTwilight {
    pub fn new(time_needed: Minutes) -> Self {
        Self { time_needed }
    }
}

impl BasisFunction for TimeToTwilight {
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        match (conditions.mjd(), conditions.next_twilight_start()) {
            (Some(now), Some(start)) => (start - now).value() > self.time_needed.to::<Day>().value(),
            _ => false,
        }
    }

    fn label(&self) -> &str {
        "time to twilight"
    }
}

/// Feasible when the hour angle at a fixed position lies inside one of a set
/// of half-open ranges `[lo, hi)` (hours, `0..24`).
#[derive(Debug, Clone)]
pub struct HourAngleLimit {
    ra: Degrees,
    dec: Degrees,
    limits: Vec<(Hours, Hours)>,
}

impl HourAngleLimit {
    pub fn new(ra: Degrees, dec: Degrees, limits: Vec<(Hours, Hours)>) -> Self {
        Self { ra, dec, limits }
    }
}

impl BasisFunction for HourAngleLimit {
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        let Ok(hour_angles) = conditions.hour_angle() else {
            return false;
        };
        let pixel = conditions.pixel_of(self.ra.to::<Radian>(), self.dec.to::<Radian>());
        let Some(&ha) = hour_angles.get(pixel) else {
            return false;
        };
        let ha_hours = ha.to_degrees() / 15.0;
        self.limits
            .iter()
            .any(|(lo, hi)| lo.value().min(hi.value()) <= ha_hours && ha_hours < lo.value().max(hi.value()))
    }

    fn label(&self) -> &str {
        "hour angle limit"
    }
}

/// Feasible while the moon is below the horizon.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoonDown;

impl BasisFunction for MoonDown {
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        conditions.moon().is_some_and(|moon| moon.alt.value() <= 0.0)
    }

    fn label(&self) -> &str {
        "moon down"
    }
}

/// Feasible while a survey's share of all observations stays at or below
/// `frac_total`.
#[derive(Debug, Clone)]
pub struct FractionOfObs {
    frac_total: f64,
    total: ObservationCounter,
    survey: ObservationCounter,
}

impl FractionOfObs {
    pub fn new(frac_total: f64, survey_name: impl Into<String>) -> Self {
        Self {
            frac_total,
            total: ObservationCounter::all(),
            survey: ObservationCounter::for_note(survey_name),
        }
    }

    pub fn fraction(&self) -> Option<f64> {
        if self.total.count() == 0 {
            None
        } else {
            Some(self.survey.count() as f64 / self.total.count() as f64)
        }
    }
}

impl BasisFunction for FractionOfObs {
    fn check_feasibility(&self, _conditions: &Conditions) -> bool {
        self.fraction().map_or(true, |f| f <= self.frac_total)
    }

    fn add_observation(&mut self, observation: &Observation) {
        self.total.add_observation(observation);
        self.survey.add_observation(observation);
    }

    fn label(&self) -> &str {
        "fraction of observations"
    }
}

/// Feasible when at least one of `filters` is mounted in the changer.
#[derive(Debug, Clone)]
pub struct FilterLoaded {
    filters: FilterSet,
}

impl FilterLoaded {
    pub fn new(filters: FilterSet) -> Self {
        Self { filters }
    }
}

impl BasisFunction for FilterLoaded {
    fn check_feasibility(&self, conditions: &Conditions) -> bool {
        conditions
            .mounted_filters()
            .is_some_and(|mounted| mounted.intersects(&self.filters))
    }

    fn label(&self) -> &str {
        "filter loaded"
    }
}

/// Default share of all visits a single deep-drilling field may take.
pub const DD_FRAC_TOTAL: f64 = 0.0185 / 2.0;

/// Minimum time a deep-drilling sequence needs before twilight.
pub const DD_TIME_NEEDED: f64 = 62.0;

/// Stock feasibility stack for a deep-drilling field.
pub fn dd_basis_functions(
    ra: Degrees,
    dec: Degrees,
    survey_name: &str,
    ha_limits: Vec<(Hours, Hours)>,
    frac_total: f64,
) -> Vec<Box<dyn BasisFunction>> {
    vec![
        Box::new(NotTwilight),
        Box::new(TimeToTwilight::new(Minutes::new(DD_TIME_NEEDED))),
        Box::new(HourAngleLimit::new(ra, dec, ha_limits)),
        Box::new(MoonDown),
        Box::new(FractionOfObs::new(frac_total, survey_name)),
    ]
}
