//! The per-cycle driver that picks a survey and hands out observations.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::conditions::Conditions;
use crate::error::SchedulerResult;
use crate::models::Observation;
use crate::survey::Survey;

/// Holds the surveys and the current conditions, and runs selection.
///
/// Each time the observation queue runs dry, every survey is asked for its
/// reward and the best one generates the next batch. Ties are broken with a
/// seeded RNG so runs are reproducible.
pub struct CoreScheduler {
    surveys: Vec<Box<dyn Survey>>,
    conditions: Conditions,
    queue: VecDeque<Observation>,
    rng: ChaCha8Rng,
    flushed: usize,
}

impl CoreScheduler {
    pub fn new(surveys: Vec<Box<dyn Survey>>, conditions: Conditions, seed: u64) -> SchedulerResult<Self> {
        for survey in &surveys {
            survey.validate(&conditions)?;
        }
        log::info!("Scheduler ready with {} surveys (seed {})", surveys.len(), seed);
        Ok(Self {
            surveys,
            conditions,
            queue: VecDeque::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            flushed: 0,
        })
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Mutable access for the control loop to push new telemetry.
    pub fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }

    pub fn surveys(&self) -> &[Box<dyn Survey>] {
        &self.surveys
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Total number of queued observations dropped as expired.
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    pub fn flush_queue(&mut self) {
        self.flushed += self.queue.len();
        self.queue.clear();
    }

    /// Next observation to execute, refilling the queue if needed.
    pub fn request_observation(&mut self) -> SchedulerResult<Option<Observation>> {
        if self.queue.is_empty() {
            self.fill_queue()?;
        }

        let now = self.conditions.mjd();
        let expired = match (now, self.queue.front().and_then(|o| o.flush_by_mjd)) {
            (Some(now), Some(flush_by)) => now > flush_by,
            _ => false,
        };
        if expired {
            log::debug!("Queue expired, flushing {} observations", self.queue.len());
            self.flush_queue();
            self.fill_queue()?;
        }

        Ok(self.queue.pop_front())
    }

    /// Ask every survey for its reward and let the winner generate.
    pub fn fill_queue(&mut self) -> SchedulerResult<()> {
        let rewards = self
            .surveys
            .iter_mut()
            .map(|survey| survey.reward(&self.conditions))
            .collect::<SchedulerResult<Vec<f64>>>()?;

        let Some(winner) = self.pick_winner(&rewards) else {
            log::debug!("No feasible survey");
            return Ok(());
        };

        let survey = &mut self.surveys[winner];
        let observations = survey.generate_observations(&self.conditions)?;
        if observations.is_empty() {
            log::warn!(
                "{} won with reward {} but generated no observations",
                survey.name(),
                rewards[winner]
            );
        } else {
            log::debug!("{} generated {} observations", survey.name(), observations.len());
        }
        self.queue.extend(observations);
        Ok(())
    }

    /// Index of the highest finite reward; ties are drawn uniformly.
    fn pick_winner(&mut self, rewards: &[f64]) -> Option<usize> {
        let best = rewards
            .iter()
            .copied()
            .filter(|r| r.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return None;
        }
        let tied: Vec<usize> = rewards
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == best)
            .map(|(i, _)| i)
            .collect();
        match tied.len() {
            0 => None,
            1 => Some(tied[0]),
            n => Some(tied[self.rng.random_range(0..n)]),
        }
    }

    /// Record a completed observation with every survey.
    ///
    /// Surveys always receive the observation with `executed` set.
    pub fn add_observation(&mut self, observation: &Observation) {
        let mut executed = observation.clone();
        executed.mark_executed();
        for survey in &mut self.surveys {
            survey.add_observation(&executed);
        }
    }
}
