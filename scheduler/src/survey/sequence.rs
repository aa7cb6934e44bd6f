//! Fixed batches of observations, e.g. deep-drilling sequences.

use std::collections::BTreeSet;

use qtty::{Day, Days, Degrees, Hours, Minutes, Seconds};

use super::{Survey, SurveyCore};
use crate::basis::{dd_basis_functions, BasisFunction, DD_FRAC_TOTAL};
use crate::conditions::Conditions;
use crate::error::{SchedulerError, SchedulerResult};
use crate::features::ObservationCounter;
use crate::models::{Filter, FilterSet, Observation};
use crate::sky::HealpixGrid;

/// Exposure and timing parameters for a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSettings {
    pub exptime: Seconds,
    pub nexp: u32,
    pub readtime: Seconds,
    pub filter_change_time: Seconds,
    /// Grace period past the estimated end before queued visits expire.
    pub flush_pad: Minutes,
    /// Constant reward; `None` rewards under-served sequences instead.
    pub reward_value: Option<f64>,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            exptime: Seconds::new(Observation::DEFAULT_EXPTIME),
            nexp: Observation::DEFAULT_NEXP,
            readtime: Seconds::new(2.0),
            filter_change_time: Seconds::new(120.0),
            flush_pad: Minutes::new(30.0),
            reward_value: None,
        }
    }
}

/// A pre-built batch taken in one go when feasible.
#[derive(Debug)]
pub struct SequenceSurvey {
    core: SurveyCore,
    observations: Vec<Observation>,
    settings: SequenceSettings,
    approx_time: Days,
    n_total: ObservationCounter,
    n_survey: ObservationCounter,
}

impl SequenceSurvey {
    /// Build `nvis[i]` visits in `sequence[i]` at one position.
    pub fn from_filter_sequence(
        core: SurveyCore,
        ra: Degrees,
        dec: Degrees,
        sequence: &str,
        nvis: &[u32],
        settings: SequenceSettings,
    ) -> SchedulerResult<Self> {
        let filters = sequence
            .chars()
            .map(|c| {
                Filter::from_char(c).ok_or_else(|| {
                    SchedulerError::Configuration(format!("Unknown filter '{}' in sequence '{}'", c, sequence))
                })
            })
            .collect::<SchedulerResult<Vec<_>>>()?;
        if filters.len() != nvis.len() {
            return Err(SchedulerError::Configuration(format!(
                "Sequence '{}' has {} filters but {} visit counts",
                sequence,
                filters.len(),
                nvis.len()
            )));
        }

        let observations = filters
            .iter()
            .zip(nvis)
            .flat_map(|(&filter, &n)| {
                let template = Observation::new(ra, dec, filter)
                    .with_exposure(settings.exptime, settings.nexp)
                    .with_note(core.name());
                std::iter::repeat(template).take(n as usize)
            })
            .collect();
        Self::from_observations(core, observations, settings)
    }

    /// Use an explicit batch; it must not be empty.
    pub fn from_observations(
        core: SurveyCore,
        observations: Vec<Observation>,
        settings: SequenceSettings,
    ) -> SchedulerResult<Self> {
        if observations.is_empty() {
            return Err(SchedulerError::Configuration(format!(
                "Sequence survey '{}' has no observations",
                core.name()
            )));
        }

        let exposure: f64 = observations
            .iter()
            .map(|o| o.exptime.value() + settings.readtime.value() * f64::from(o.nexp))
            .sum();
        let n_filters = observations.iter().map(|o| o.filter).collect::<BTreeSet<_>>().len();
        let seconds = Seconds::new(exposure + settings.filter_change_time.value() * n_filters as f64);
        let approx_time = seconds.to::<Day>();

        Ok(Self {
            n_total: ObservationCounter::all(),
            n_survey: ObservationCounter::for_note(core.name()),
            core,
            observations,
            settings,
            approx_time,
        })
    }

    /// Estimated wall-clock time to execute the whole batch.
    pub fn approx_time(&self) -> Days {
        self.approx_time
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn filters(&self) -> FilterSet {
        self.observations.iter().map(|o| o.filter).collect()
    }

    /// Fails when none of the batch's filters is mounted.
    pub fn validate_mounted(&self, mounted: &FilterSet) -> SchedulerResult<()> {
        let wanted = self.filters();
        if !wanted.intersects(mounted) {
            return Err(SchedulerError::Configuration(format!(
                "Sequence survey '{}' needs filters '{}' but only '{}' are mounted",
                self.core.name(),
                wanted,
                mounted
            )));
        }
        Ok(())
    }
}

impl Survey for SequenceSurvey {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn feasible(&self, conditions: &Conditions) -> bool {
        self.core.feasible(conditions)
    }

    fn reward(&mut self, conditions: &Conditions) -> SchedulerResult<f64> {
        self.core.check_resolution(conditions)?;
        if !self.feasible(conditions) {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(match self.settings.reward_value {
            Some(value) => value,
            None => self.n_total.count() as f64 / (self.n_survey.count() as f64 + 1.0),
        })
    }

    fn generate_observations(&mut self, conditions: &Conditions) -> SchedulerResult<Vec<Observation>> {
        self.core.check_resolution(conditions)?;
        let Some(now) = conditions.mjd() else {
            return Ok(Vec::new());
        };
        if !self.feasible(conditions) {
            return Ok(Vec::new());
        }

        let flush_by = now + self.approx_time + self.settings.flush_pad.to::<Day>();
        let mounted = conditions.mounted_filters();
        let (loaded, others): (Vec<_>, Vec<_>) = self
            .observations
            .iter()
            .filter(|o| mounted.map_or(true, |m| m.contains(o.filter)))
            .cloned()
            .map(|mut o| {
                o.flush_by_mjd = Some(flush_by);
                o
            })
            .partition(|o| Some(o.filter) == conditions.current_filter());

        let mut batch = loaded;
        batch.extend(others);
        if batch.is_empty() {
            log::warn!("{}: feasible but no batch filter is mounted", self.core.name());
        }
        Ok(batch)
    }

    fn add_observation(&mut self, observation: &Observation) {
        if self.core.add_observation(observation) {
            self.n_total.add_observation(observation);
            self.n_survey.add_observation(observation);
        }
    }

    fn validate(&self, conditions: &Conditions) -> SchedulerResult<()> {
        self.core.check_resolution(conditions)?;
        match conditions.mounted_filters() {
            Some(mounted) => self.validate_mounted(mounted),
            None => Ok(()),
        }
    }
}

/// Knobs shared by the standard deep-drilling surveys.
#[derive(Debug, Clone, PartialEq)]
pub struct DdSettings {
    pub nexp: u32,
    pub reward_value: Option<f64>,
    pub frac_total: f64,
}

impl Default for DdSettings {
    fn default() -> Self {
        Self {
            nexp: Observation::DEFAULT_NEXP,
            reward_value: Some(100.0),
            frac_total: DD_FRAC_TOTAL,
        }
    }
}

struct DdField {
    name: &'static str,
    ra: f64,
    dec: f64,
    ha_limits: [(f64, f64); 2],
}

const DD_SEQUENCE: &str = "urgizy";
const DD_NVIS: [u32; 6] = [8, 20, 10, 20, 26, 20];

const DD_FIELDS: [DdField; 4] = [
    DdField {
        name: "DD:ELAISS1",
        ra: 9.45,
        dec: -44.0,
        ha_limits: [(0.0, 1.5), (21.5, 24.0)],
    },
    DdField {
        name: "DD:XMM-LSS",
        ra: 35.708333,
        dec: -4.75,
        ha_limits: [(0.0, 1.5), (21.5, 24.0)],
    },
    DdField {
        name: "DD:ECDFS",
        ra: 53.125,
        dec: -28.1,
        ha_limits: [(0.5, 3.0), (20.0, 22.5)],
    },
    DdField {
        name: "DD:COSMOS",
        ra: 150.1,
        dec: 2.0 + 10.0 / 60.0 + 55.0 / 3600.0,
        ha_limits: [(0.0, 2.5), (21.5, 24.0)],
    },
];

fn hour_ranges(limits: &[(f64, f64)]) -> Vec<(Hours, Hours)> {
    limits.iter().map(|&(lo, hi)| (Hours::new(lo), Hours::new(hi))).collect()
}

/// The standard deep-drilling surveys: four single-pointing fields and the
/// two-pointing Euclid Deep Field South.
pub fn generate_dd_surveys(grid: HealpixGrid, dd: &DdSettings) -> SchedulerResult<Vec<SequenceSurvey>> {
    let settings = SequenceSettings {
        nexp: dd.nexp,
        reward_value: dd.reward_value,
        ..SequenceSettings::default()
    };

    let mut surveys = Vec::with_capacity(DD_FIELDS.len() + 1);
    for field in &DD_FIELDS {
        let (ra, dec) = (Degrees::new(field.ra), Degrees::new(field.dec));
        let basis = dd_basis_functions(ra, dec, field.name, hour_ranges(&field.ha_limits), dd.frac_total);
        let core = SurveyCore::new(field.name, basis, grid);
        surveys.push(SequenceSurvey::from_filter_sequence(
            core,
            ra,
            dec,
            DD_SEQUENCE,
            &DD_NVIS,
            settings.clone(),
        )?);
    }

    // Euclid fields alternate between two pointings within each filter
    let name = "DD:EDFS";
    let pointings = [(58.97, -49.28), (63.6, -47.60)];
    let nvis: [u32; 6] = [8, 5, 7, 19, 24, 5];
    let mut observations = Vec::new();
    for (filter, &n) in DD_SEQUENCE.chars().filter_map(Filter::from_char).zip(&nvis) {
        for &(ra, dec) in &pointings {
            let template = Observation::new(Degrees::new(ra), Degrees::new(dec), filter)
                .with_exposure(settings.exptime, settings.nexp)
                .with_note(name);
            observations.extend(std::iter::repeat(template).take(n as usize));
        }
    }
    let basis: Vec<Box<dyn BasisFunction>> = dd_basis_functions(
        Degrees::new(pointings[0].0),
        Degrees::new(pointings[0].1),
        name,
        hour_ranges(&[(0.0, 1.5), (22.5, 24.0)]),
        dd.frac_total,
    );
    surveys.push(SequenceSurvey::from_observations(
        SurveyCore::new(name, basis, grid),
        observations,
        settings,
    )?);

    Ok(surveys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{observable_conditions, NSIDE};
    use approx::assert_relative_eq;
    use qtty::Second;

    const NOW: f64 = 60000.2;

    fn core(name: &str) -> SurveyCore {
        SurveyCore::new(name, Vec::new(), HealpixGrid::new(NSIDE).unwrap())
    }

    fn rgiz() -> SequenceSurvey {
        SequenceSurvey::from_filter_sequence(
            core("DD:test"),
            Degrees::new(0.0),
            Degrees::new(-30.0),
            "rgiz",
            &[2, 2, 2, 2],
            SequenceSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let result = SequenceSurvey::from_filter_sequence(
            core("bad"),
            Degrees::new(0.0),
            Degrees::new(0.0),
            "rgi",
            &[1, 2],
            SequenceSettings::default(),
        );
        assert!(matches!(result, Err(SchedulerError::Configuration(_))));
    }

    #[test]
    fn test_empty_batch_fails() {
        let result = SequenceSurvey::from_observations(core("empty"), Vec::new(), SequenceSettings::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_approx_time() {
        let survey = rgiz();
        // 8 visits * (30 + 2 * 2) s + 4 filters * 120 s
        assert_relative_eq!(survey.approx_time().to::<Second>().value(), 752.0, epsilon = 1e-6);
    }

    #[test]
    fn test_generation_keeps_mounted_and_loaded_first() {
        let mut conditions = observable_conditions(NOW);
        conditions.set_mounted_filters("rg".parse().unwrap()).unwrap();
        conditions.set_current_filter(Some(Filter::G));
        let mut survey = rgiz();

        let batch = survey.generate_observations(&conditions).unwrap();
        let filters: String = batch.iter().map(|o| o.filter.as_char()).collect();
        assert_eq!(filters, "ggrr");

        let expected = NOW + 752.0 / 86400.0 + 30.0 / 1440.0;
        for obs in &batch {
            assert_relative_eq!(obs.flush_by_mjd.unwrap().value(), expected, epsilon = 1e-9);
            assert_eq!(obs.note, "DD:test");
        }
    }

    #[test]
    fn test_reward_ratio_from_counters() {
        let conditions = observable_conditions(NOW);
        let mut survey = rgiz();
        assert_eq!(survey.reward(&conditions).unwrap(), 0.0);

        let visit = Observation::new(Degrees::new(1.0), Degrees::new(1.0), Filter::R);
        for note in ["wfd", "wfd", "wfd", "DD:test"] {
            survey.add_observation(&visit.clone().with_note(note));
        }
        assert_eq!(survey.reward(&conditions).unwrap(), 2.0);
    }

    #[test]
    fn test_constant_reward_and_infeasible() {
        let conditions = observable_conditions(NOW);
        let settings = SequenceSettings {
            reward_value: Some(100.0),
            ..SequenceSettings::default()
        };
        let mut constant = SequenceSurvey::from_filter_sequence(
            core("const"),
            Degrees::new(0.0),
            Degrees::new(0.0),
            "r",
            &[3],
            settings.clone(),
        )
        .unwrap();
        assert_eq!(constant.reward(&conditions).unwrap(), 100.0);

        let never: Box<dyn BasisFunction> = Box::new(|_: &Conditions| false);
        let mut blocked = SequenceSurvey::from_filter_sequence(
            SurveyCore::new("blocked", vec![never], HealpixGrid::new(NSIDE).unwrap()),
            Degrees::new(0.0),
            Degrees::new(0.0),
            "r",
            &[3],
            settings,
        )
        .unwrap();
        assert_eq!(blocked.reward(&conditions).unwrap(), f64::NEG_INFINITY);
        assert!(blocked.generate_observations(&conditions).unwrap().is_empty());
    }

    #[test]
    fn test_validate_mounted() {
        let survey = rgiz();
        assert!(survey.validate_mounted(&"uy".parse().unwrap()).is_err());
        assert!(survey.validate_mounted(&"uz".parse().unwrap()).is_ok());
    }

    #[test]
    fn test_standard_dd_surveys() {
        let surveys = generate_dd_surveys(HealpixGrid::new(NSIDE).unwrap(), &DdSettings::default()).unwrap();
        let names: Vec<&str> = surveys.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["DD:ELAISS1", "DD:XMM-LSS", "DD:ECDFS", "DD:COSMOS", "DD:EDFS"]
        );
        assert_eq!(surveys[0].observations().len(), 104);
        assert_eq!(surveys[4].observations().len(), 2 * 68);
        assert_eq!(surveys[4].filters().to_string(), "ugrizy");
    }
}
