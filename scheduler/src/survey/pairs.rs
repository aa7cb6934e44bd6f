use qtty::{Days, Seconds};

use super::constraints::SkyConstraints;
use super::queue::ScriptQueue;
use super::{Survey, SurveyCore};
use crate::conditions::Conditions;
use crate::error::SchedulerResult;
use crate::features::PairInNight;
use crate::models::{Filter, FilterSet, Observation};

/// Tunables for [`PairsSurvey`].
#[derive(Debug, Clone)]
pub struct PairSettings {
    /// Filters in which visits get a follow-up.
    pub filters: FilterSet,
    /// Ideal gap between the two visits of a pair.
    pub dt: Days,
    /// How far from the ideal epoch a follow-up may still be taken.
    pub ttol: Days,
    pub max_slew: Seconds,
    pub reward_value: f64,
    /// Label of generated follow-ups, wrapped as `pair(<note>)`.
    pub note: String,
}

impl Default for PairSettings {
    fn default() -> Self {
        Self {
            filters: FilterSet::from_iter([Filter::G, Filter::R, Filter::I, Filter::Z]),
            dt: Days::new(40.0 / 1440.0),
            ttol: Days::new(10.0 / 1440.0),
            max_slew: Seconds::new(15.0),
            reward_value: 101.0,
            note: "scripted".to_string(),
        }
    }
}

/// Outcome of checking one queued follow-up against the conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCheck {
    pub in_time_window: bool,
    pub in_slew_window: bool,
    pub filter_ok: bool,
    pub observable: bool,
}

impl PairCheck {
    pub fn valid(&self) -> bool {
        self.in_time_window && self.in_slew_window && self.filter_ok && self.observable
    }
}

/// Queues a same-night revisit for every new visit in the pair filters,
/// and claims the telescope when one comes due.
#[derive(Debug)]
pub struct PairsSurvey {
    core: SurveyCore,
    queue: ScriptQueue,
    constraints: SkyConstraints,
    settings: PairSettings,
    pair_map: PairInNight,
}

impl PairsSurvey {
    pub const DEFAULT_IGNORE: &'static str = "ack";

    pub fn new(core: SurveyCore, constraints: SkyConstraints, settings: PairSettings) -> Self {
        let pair_map = PairInNight::new(core.grid().npix(), settings.filters.clone());
        Self {
            queue: ScriptQueue::new(settings.ttol),
            core,
            constraints,
            settings,
            pair_map,
        }
    }

    pub fn queue(&self) -> &ScriptQueue {
        &self.queue
    }

    pub fn settings(&self) -> &PairSettings {
        &self.settings
    }

    pub fn pair_map(&self) -> &PairInNight {
        &self.pair_map
    }

    pub fn check_observation(&self, observation: &Observation, conditions: &Conditions) -> SchedulerResult<PairCheck> {
        let Some(now) = conditions.mjd() else {
            return Ok(PairCheck {
                in_time_window: false,
                in_slew_window: false,
                filter_ok: false,
                observable: false,
            });
        };
        let delta = (observation.mjd - now).value();
        let pixel = conditions.pixel_of(observation.ra, observation.dec);
        let slew_ok = conditions
            .slewtime()
            .and_then(|map| map.get(pixel))
            .is_some_and(|slew| slew <= self.settings.max_slew.value());

        let check = PairCheck {
            in_time_window: delta.abs() <= self.settings.ttol.value(),
            in_slew_window: slew_ok || delta < 0.0,
            filter_ok: conditions
                .current_filter()
                .map_or(true, |loaded| self.settings.filters.contains(loaded)),
            observable: self.constraints.is_observable(conditions, observation)?,
        };
        log::trace!("{}: {:?} for entry at {}", self.core.name(), check, observation.mjd);
        Ok(check)
    }

    /// Index of the first valid follow-up. The scan gives up at the first
    /// entry outside its time window; later entries are even further out.
    fn scan(&self, conditions: &Conditions) -> SchedulerResult<Option<usize>> {
        for (i, entry) in self.queue.entries().iter().enumerate() {
            let check = self.check_observation(&entry.observation, conditions)?;
            if check.valid() {
                return Ok(Some(i));
            }
            if !check.in_time_window {
                break;
            }
        }
        Ok(None)
    }

    fn prepare(&mut self, conditions: &Conditions) -> SchedulerResult<()> {
        self.core.check_resolution(conditions)?;
        let dropped = self.queue.purge(conditions, &self.constraints)?;
        if dropped > 0 {
            log::debug!("{}: purged {} stale pairs", self.core.name(), dropped);
        }
        Ok(())
    }
}

impl Survey for PairsSurvey {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn feasible(&self, conditions: &Conditions) -> bool {
        self.core.feasible(conditions)
    }

    fn reward(&mut self, conditions: &Conditions) -> SchedulerResult<f64> {
        self.prepare(conditions)?;
        if !self.feasible(conditions) {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(match self.scan(conditions)? {
            Some(_) => self.settings.reward_value,
            None => f64::NEG_INFINITY,
        })
    }

    fn generate_observations(&mut self, conditions: &Conditions) -> SchedulerResult<Vec<Observation>> {
        self.prepare(conditions)?;
        let Some(index) = self.scan(conditions)? else {
            return Ok(Vec::new());
        };
        let Some(mut observation) = self.queue.remove(index) else {
            return Ok(Vec::new());
        };
        observation.note = format!("pair({})", self.settings.note);
        if let Some(loaded) = conditions.current_filter() {
            observation.filter = loaded;
        }
        Ok(vec![observation])
    }

    fn add_observation(&mut self, observation: &Observation) {
        if !self.core.add_observation(observation) {
            return;
        }
        let pixel = self.core.pixel_of(observation);
        self.pair_map.add_observation(observation, pixel);

        if self.settings.filters.contains(observation.filter) && self.pair_map.count(pixel) < 1 {
            let mut follow_up = observation.clone();
            follow_up.mjd = follow_up.mjd + self.settings.dt;
            follow_up.executed = false;
            follow_up.flush_by_mjd = None;
            log::debug!(
                "{}: queueing pair for pixel {} at {}",
                self.core.name(),
                pixel,
                follow_up.mjd
            );
            self.queue.push(follow_up);
        }
    }
}
