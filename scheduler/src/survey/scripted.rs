use qtty::Days;

use super::constraints::SkyConstraints;
use super::queue::ScriptQueue;
use super::{Survey, SurveyCore};
use crate::conditions::Conditions;
use crate::error::SchedulerResult;
use crate::models::Observation;

/// Serves observations from an externally supplied script.
///
/// The survey wants the telescope whenever a pending script entry is due
/// and above the altitude floor. Entries are marked matched when an
/// executed observation lines up with them, and purged once stale.
#[derive(Debug)]
pub struct ScriptedSurvey {
    core: SurveyCore,
    queue: ScriptQueue,
    constraints: SkyConstraints,
    reward_value: f64,
}

impl ScriptedSurvey {
    pub const DEFAULT_REWARD: f64 = 1e6;
    pub const DEFAULT_TOLERANCE_MINUTES: f64 = 15.0;
    pub const DEFAULT_IGNORE: &'static str = "dummy";

    pub fn new(core: SurveyCore, constraints: SkyConstraints, reward_value: f64, tolerance: Days) -> Self {
        Self {
            core,
            queue: ScriptQueue::new(tolerance),
            constraints,
            reward_value,
        }
    }

    pub fn set_script(&mut self, observations: Vec<Observation>, tolerance: Days) -> SchedulerResult<()> {
        log::debug!("{}: loading script of {} observations", self.core.name(), observations.len());
        self.queue.set_script(observations, tolerance)
    }

    pub fn add_to_script(&mut self, observation: Observation) {
        self.queue.push(observation);
    }

    pub fn queue(&self) -> &ScriptQueue {
        &self.queue
    }

    pub fn core(&self) -> &SurveyCore {
        &self.core
    }

    /// The first pending entry that could be observed right now.
    pub fn check_list(&self, conditions: &Conditions) -> SchedulerResult<Option<Observation>> {
        Ok(self
            .queue
            .select(conditions, &self.constraints)?
            .and_then(|i| self.queue.get(i))
            .map(|entry| entry.observation.clone()))
    }

    fn prepare(&mut self, conditions: &Conditions) -> SchedulerResult<()> {
        self.core.check_resolution(conditions)?;
        self.queue.purge(conditions, &self.constraints)?;
        Ok(())
    }
}

impl Survey for ScriptedSurvey {
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
        Ok(match self.check_list(conditions)? {
            Some(_) => self.reward_value,
            None => f64::NEG_INFINITY,
        })
    }

    fn generate_observations(&mut self, conditions: &Conditions) -> SchedulerResult<Vec<Observation>> {
        self.prepare(conditions)?;
        Ok(self.check_list(conditions)?.into_iter().collect())
    }

    fn add_observation(&mut self, observation: &Observation) {
        if self.core.add_observation(observation) {
            self.queue.match_observation(observation);
        }
    }
}
