use crate::models::Observation;

/// Counts executed observations, optionally only those whose note contains
/// a given tag.
///
/// A counter with no tag counts everything it is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationCounter {
    note: Option<String>,
    count: u64,
}

impl ObservationCounter {
    /// Counter for every observation.
    pub fn all() -> Self {
        Self::default()
    }

    /// Counter for observations tagged with `note`.
    pub fn for_note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            count: 0,
        }
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn add_observation(&mut self, observation: &Observation) {
        let matches = match &self.note {
            Some(note) => observation.note_contains(note),
            None => true,
        };
        if matches {
            self.count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Filter;
    use qtty::Degrees;

    #[test]
    fn test_counts_by_note() {
        let mut total = ObservationCounter::all();
        let mut cosmos = ObservationCounter::for_note("DD:COSMOS");
        let obs = Observation::new(Degrees::new(150.1), Degrees::new(2.18), Filter::R);

        for note in ["DD:COSMOS", "blob", "DD:COSMOS, 2"] {
            let tagged = obs.clone().with_note(note);
            total.add_observation(&tagged);
            cosmos.add_observation(&tagged);
        }

        assert_eq!(total.count(), 3);
        assert_eq!(cosmos.count(), 2);
        assert_eq!(cosmos.note(), Some("DD:COSMOS"));
    }
}
