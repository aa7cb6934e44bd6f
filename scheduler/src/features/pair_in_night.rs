use qtty::{Day, Minutes};

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{FilterSet, Observation};

/// Per-pixel count of completed pairs in the current night.
///
/// A pixel's count goes up when it is observed again between `gap_min` and
/// `gap_max` after an earlier visit the same night. All counts reset when an
/// observation from a new night arrives. Observations are expected in
/// chronological order.
#[derive(Debug, Clone)]
pub struct PairInNight {
    filters: FilterSet,
    gap_min: f64,
    gap_max: f64,
    night: Option<u32>,
    counts: Vec<u32>,
    mjd_log: Vec<f64>,
    pixel_log: Vec<usize>,
}

impl PairInNight {
    pub const DEFAULT_GAP_MIN: f64 = 25.0;
    pub const DEFAULT_GAP_MAX: f64 = 45.0;

    pub fn new(npix: usize, filters: FilterSet) -> Self {
        Self::from_gaps(
            npix,
            filters,
            Minutes::new(Self::DEFAULT_GAP_MIN),
            Minutes::new(Self::DEFAULT_GAP_MAX),
        )
    }

    /// Fails unless `0 <= gap_min <= gap_max`.
    pub fn with_gaps(npix: usize, filters: FilterSet, gap_min: Minutes, gap_max: Minutes) -> SchedulerResult<Self> {
        if !(gap_min.value() >= 0.0 && gap_min.value() <= gap_max.value()) {
            return Err(SchedulerError::Configuration(format!(
                "Pair gap must satisfy 0 <= gap_min <= gap_max, got {} to {} minutes",
                gap_min.value(),
                gap_max.value()
            )));
        }
        Ok(Self::from_gaps(npix, filters, gap_min, gap_max))
    }

    fn from_gaps(npix: usize, filters: FilterSet, gap_min: Minutes, gap_max: Minutes) -> Self {
        Self {
            filters,
            gap_min: gap_min.to::<Day>().value(),
            gap_max: gap_max.to::<Day>().value(),
            night: None,
            counts: vec![0; npix],
            mjd_log: Vec::new(),
            pixel_log: Vec::new(),
        }
    }

    /// Pairs completed at `pixel` tonight.
    pub fn count(&self, pixel: usize) -> u32 {
        self.counts.get(pixel).copied().unwrap_or(0)
    }

    pub fn night(&self) -> Option<u32> {
        self.night
    }

    pub fn add_observation(&mut self, observation: &Observation, pixel: usize) {
        if !self.filters.contains(observation.filter) {
            return;
        }

        if self.night != Some(observation.night) {
            self.counts.iter_mut().for_each(|c| *c = 0);
            self.mjd_log.clear();
            self.pixel_log.clear();
            self.night = Some(observation.night);
        }

        let mjd = observation.mjd.value();
        let left = self.mjd_log.partition_point(|&t| t < mjd - self.gap_max);
        let right = self.mjd_log.partition_point(|&t| t <= mjd - self.gap_min);
        if self.pixel_log.get(left..right).is_some_and(|window| window.contains(&pixel)) {
            if let Some(count) = self.counts.get_mut(pixel) {
                *count += 1;
            }
        }

        self.mjd_log.push(mjd);
        self.pixel_log.push(pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Filter;
    use crate::time::ModifiedJulianDate;
    use qtty::Degrees;

    const MINUTE: f64 = 1.0 / 1440.0;

    fn visit(filter: Filter, mjd: f64, night: u32) -> Observation {
        Observation::new(Degrees::new(10.0), Degrees::new(-30.0), filter)
            .with_mjd(ModifiedJulianDate::new(mjd))
            .with_night(night)
    }

    #[test]
    fn test_revisit_inside_gap_counts() {
        let mut pairs = PairInNight::new(48, "gr".parse().unwrap());
        pairs.add_observation(&visit(Filter::R, 60000.0, 1), 5);
        assert_eq!(pairs.count(5), 0);

        pairs.add_observation(&visit(Filter::R, 60000.0 + 40.0 * MINUTE, 1), 5);
        assert_eq!(pairs.count(5), 1);
        assert_eq!(pairs.count(6), 0);
    }

    #[test]
    fn test_revisit_outside_gap_does_not_count() {
        let mut pairs = PairInNight::new(48, "gr".parse().unwrap());
        pairs.add_observation(&visit(Filter::G, 60000.0, 1), 5);
        pairs.add_observation(&visit(Filter::G, 60000.0 + 5.0 * MINUTE, 1), 5);
        pairs.add_observation(&visit(Filter::G, 60000.0 + 90.0 * MINUTE, 1), 5);
        // The 90 minute visit is 85 minutes after the 5 minute one; too late for both
        assert_eq!(pairs.count(5), 0);
    }

    #[test]
    fn test_other_filters_are_ignored() {
        let mut pairs = PairInNight::new(48, "gr".parse().unwrap());
        pairs.add_observation(&visit(Filter::Y, 60000.0, 1), 5);
        assert_eq!(pairs.night(), None);
    }

    #[test]
    fn test_new_night_resets() {
        let mut pairs = PairInNight::new(48, "r".parse().unwrap());
        pairs.add_observation(&visit(Filter::R, 60000.0, 1), 5);
        pairs.add_observation(&visit(Filter::R, 60000.0 + 30.0 * MINUTE, 1), 5);
        assert_eq!(pairs.count(5), 1);

        pairs.add_observation(&visit(Filter::R, 60001.0, 2), 5);
        assert_eq!(pairs.count(5), 0);
        assert_eq!(pairs.night(), Some(2));
    }

    #[test]
    fn test_inverted_or_negative_gaps_are_rejected() {
        let filters: FilterSet = "r".parse().unwrap();
        for (min, max) in [(45.0, 25.0), (-5.0, 25.0), (f64::NAN, 25.0)] {
            let result = PairInNight::with_gaps(48, filters.clone(), Minutes::new(min), Minutes::new(max));
            assert!(
                matches!(result, Err(SchedulerError::Configuration(_))),
                "accepted gap {} to {}",
                min,
                max
            );
        }
    }

    #[test]
    fn test_custom_gaps_count_revisits() {
        let mut pairs =
            PairInNight::with_gaps(48, "r".parse().unwrap(), Minutes::new(10.0), Minutes::new(20.0)).unwrap();
        pairs.add_observation(&visit(Filter::R, 60000.0, 1), 5);
        pairs.add_observation(&visit(Filter::R, 60000.0 + 30.0 * MINUTE, 1), 5);
        assert_eq!(pairs.count(5), 0);
        pairs.add_observation(&visit(Filter::R, 60000.0 + 45.0 * MINUTE, 1), 5);
        assert_eq!(pairs.count(5), 1);
    }
}
