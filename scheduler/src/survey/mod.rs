//! Surveys: the units that compete for telescope time.
//!
//! Every survey answers the same four questions each cycle: is it feasible,
//! how much does it want the telescope, what would it observe, and what
//! does it make of an observation that was just taken. [`SurveyCore`] holds
//! the state every implementation shares.

pub mod constraints;
pub mod pairs;
pub mod queue;
pub mod scripted;
pub mod sequence;

use crate::basis::BasisFunction;
use crate::conditions::Conditions;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::Observation;
use crate::sky::HealpixGrid;

pub use constraints::SkyConstraints;
pub use pairs::{PairCheck, PairSettings, PairsSurvey};
pub use queue::{QueueEntry, ScriptQueue};
pub use scripted::ScriptedSurvey;
pub use sequence::{generate_dd_surveys, DdSettings, SequenceSettings, SequenceSurvey};

/// Behaviour shared by every survey.
pub trait Survey {
    fn name(&self) -> &str;

    /// `true` when every basis function accepts the conditions.
    fn feasible(&self, conditions: &Conditions) -> bool;

    /// Selection score; `f64::NEG_INFINITY` when the survey cannot run.
    fn reward(&mut self, conditions: &Conditions) -> SchedulerResult<f64>;

    /// Observations to execute now. Only called on the winning survey, and
    /// may come back empty.
    fn generate_observations(&mut self, conditions: &Conditions) -> SchedulerResult<Vec<Observation>>;

    /// Bookkeeping for an executed observation, whichever survey produced it.
    fn add_observation(&mut self, observation: &Observation);

    /// Construction-time checks against the instrument state.
    fn validate(&self, conditions: &Conditions) -> SchedulerResult<()> {
        let _ = conditions;
        Ok(())
    }
}

/// State every survey carries: a name, its feasibility basis functions,
/// the note tags it ignores and the grid it indexes pixels on.
pub struct SurveyCore {
    name: String,
    basis_functions: Vec<Box<dyn BasisFunction>>,
    ignore_obs: Vec<String>,
    grid: HealpixGrid,
}

impl SurveyCore {
    pub fn new(name: impl Into<String>, basis_functions: Vec<Box<dyn BasisFunction>>, grid: HealpixGrid) -> Self {
        Self {
            name: name.into(),
            basis_functions,
            ignore_obs: Vec::new(),
            grid,
        }
    }

    /// Replace the ignore tags. Empty tags are dropped, since every note
    /// contains the empty string.
    pub fn with_ignore_obs<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_obs = tags
            .into_iter()
            .map(Into::into)
            .filter(|tag: &String| !tag.is_empty())
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &HealpixGrid {
        &self.grid
    }

    pub fn ignore_obs(&self) -> &[String] {
        &self.ignore_obs
    }

    pub fn feasible(&self, conditions: &Conditions) -> bool {
        self.basis_functions.iter().all(|bf| {
            let ok = bf.check_feasibility(conditions);
            if !ok {
                log::trace!("{}: {} not satisfied", self.name, bf.label());
            }
            ok
        })
    }

    /// Whether `observation` carries one of this survey's ignore tags.
    pub fn ignores(&self, observation: &Observation) -> bool {
        self.ignore_obs.iter().any(|tag| observation.note_contains(tag))
    }

    /// Feeds a non-ignored observation to the basis functions. Returns
    /// `false` if the observation was ignored.
    pub fn add_observation(&mut self, observation: &Observation) -> bool {
        if self.ignores(observation) {
            log::debug!("{}: ignoring observation '{}'", self.name, observation.note);
            return false;
        }
        for bf in &mut self.basis_functions {
            bf.add_observation(observation);
        }
        true
    }

    /// Fails if the conditions use a different grid than this survey.
    pub fn check_resolution(&self, conditions: &Conditions) -> SchedulerResult<()> {
        if conditions.nside() != self.grid.nside() {
            return Err(SchedulerError::ResolutionMismatch {
                survey: self.grid.nside(),
                conditions: conditions.nside(),
            });
        }
        Ok(())
    }

    pub fn pixel_of(&self, observation: &Observation) -> usize {
        self.grid.pixel_of(observation.ra, observation.dec)
    }
}

impl std::fmt::Debug for SurveyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurveyCore")
            .field("name", &self.name)
            .field("basis_functions", &self.basis_functions.len())
            .field("ignore_obs", &self.ignore_obs)
            .field("nside", &self.grid.nside())
            .finish()
    }
}
