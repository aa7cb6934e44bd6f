//! Time-ordered queue of wanted observations.
//!
//! Entries stay sorted by target epoch; purge and the pair scan both stop
//! at the first entry that is not yet due, which is only correct on a sorted
//! queue. [`ScriptQueue::set_script`] rejects unsorted input and
//! [`ScriptQueue::push`] inserts at the sorted position.

use qtty::Days;

use super::constraints::SkyConstraints;
use crate::conditions::Conditions;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::Observation;
use crate::time::ModifiedJulianDate;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub observation: Observation,
    /// Set once an executed observation has been matched against this entry.
    pub matched: bool,
}

impl QueueEntry {
    pub fn pending(observation: Observation) -> Self {
        Self {
            observation,
            matched: false,
        }
    }

    pub fn mjd(&self) -> ModifiedJulianDate {
        self.observation.mjd
    }
}

#[derive(Debug, Clone)]
pub struct ScriptQueue {
    entries: Vec<QueueEntry>,
    tolerance: Days,
}

impl ScriptQueue {
    pub fn new(tolerance: Days) -> Self {
        Self {
            entries: Vec::new(),
            tolerance,
        }
    }

    pub fn tolerance(&self) -> Days {
        self.tolerance
    }

    /// Replace the queue with `observations`, which must be in
    /// non-decreasing order of target epoch.
    pub fn set_script(&mut self, observations: Vec<Observation>, tolerance: Days) -> SchedulerResult<()> {
        if let Some(i) = observations.windows(2).position(|w| w[1].mjd < w[0].mjd) {
            return Err(SchedulerError::Configuration(format!(
                "Script is not in chronological order: entry {} ({}) precedes entry {} ({})",
                i,
                observations[i].mjd,
                i + 1,
                observations[i + 1].mjd
            )));
        }
        self.entries = observations.into_iter().map(QueueEntry::pending).collect();
        self.tolerance = tolerance;
        Ok(())
    }

    /// Insert after every entry with the same or an earlier target epoch.
    pub fn push(&mut self, observation: Observation) {
        let at = self.entries.partition_point(|e| e.mjd() <= observation.mjd);
        self.entries.insert(at, QueueEntry::pending(observation));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.entries.iter().filter(|e| !e.matched).count()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Observation> {
        if index < self.entries.len() {
            Some(self.entries.remove(index).observation)
        } else {
            None
        }
    }

    /// `|target - now| <= tolerance`.
    pub fn in_window(&self, target: ModifiedJulianDate, now: ModifiedJulianDate) -> bool {
        (target - now).value().abs() <= self.tolerance.value()
    }

    /// Mark the first pending entry that is within tolerance of the executed
    /// observation's epoch and points at the same position in the same
    /// filter. At most one entry is matched.
    pub fn match_observation(&mut self, executed: &Observation) -> Option<usize> {
        let tolerance = self.tolerance.value();
        let index = self.entries.iter().position(|e| {
            !e.matched && (e.mjd() - executed.mjd).value().abs() <= tolerance && e.observation.same_pointing(executed)
        })?;
        self.entries[index].matched = true;
        log::debug!("Matched executed observation to script entry {}", index);
        Some(index)
    }

    /// First pending entry that is due now and inside the altitude band.
    pub fn select(&self, conditions: &Conditions, constraints: &SkyConstraints) -> SchedulerResult<Option<usize>> {
        let Some(now) = conditions.mjd() else {
            return Ok(None);
        };
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.matched || !self.in_window(entry.mjd(), now) {
                continue;
            }
            if constraints.in_alt_band(conditions, &entry.observation)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Drop stale entries from the head of the queue and return how many
    /// were dropped.
    ///
    /// The head is dropped when its target epoch has passed and `now` is
    /// outside its window, or when `now` is inside its window but the
    /// pointing is masked or outside the altitude band. Purging stops at the
    /// first entry that is kept.
    pub fn purge(&mut self, conditions: &Conditions, constraints: &SkyConstraints) -> SchedulerResult<usize> {
        let Some(now) = conditions.mjd() else {
            return Ok(0);
        };
        let mut dropped = 0;
        while let Some(head) = self.entries.first() {
            let in_window = self.in_window(head.mjd(), now);
            let reason = if head.mjd() < now && !in_window {
                Some("past its window")
            } else if in_window && !constraints.is_observable(conditions, &head.observation)? {
                Some("masked")
            } else if in_window && !constraints.in_alt_band(conditions, &head.observation)? {
                Some("outside the altitude band")
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    log::debug!("Purging queue entry at {}: {} (now {})", head.mjd(), reason, now);
                    self.entries.remove(0);
                    dropped += 1;
                }
                None => break,
            }
        }
        Ok(dropped)
    }
}
