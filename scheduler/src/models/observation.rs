use qtty::{Degree, Degrees, Radian, Radians, Seconds};
use serde::{Deserialize, Serialize};

use super::filter::Filter;
use crate::time::ModifiedJulianDate;

/// A single proposed (or executed) exposure.
///
/// Positions are stored in radians. `mjd` is the target epoch of a
/// scripted entry, or the execution epoch of an executed observation.
/// `note` doubles as a human label and as the tag surveys match their
/// ignore lists against.
///
/// # Examples
///
/// ```
/// use survey_scheduler::models::{Filter, Observation};
/// use survey_scheduler::time::ModifiedJulianDate;
/// use qtty::Degrees;
///
/// let obs = Observation::new(Degrees::new(150.1), Degrees::new(2.18), Filter::R)
///     .with_mjd(ModifiedJulianDate::new(60000.25))
///     .with_note("DD:COSMOS");
///
/// assert_eq!(obs.filter, Filter::R);
/// assert!(obs.note_contains("COSMOS"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ra: Radians,
    pub dec: Radians,
    pub filter: Filter,
    pub exptime: Seconds,
    pub nexp: u32,
    #[serde(default)]
    pub note: String,
    pub mjd: ModifiedJulianDate,
    #[serde(default)]
    pub flush_by_mjd: Option<ModifiedJulianDate>,
    #[serde(default)]
    pub night: u32,
    #[serde(default)]
    pub field_id: Option<i64>,
    #[serde(default)]
    pub executed: bool,
}

impl Observation {
    /// Default exposure time (seconds).
    pub const DEFAULT_EXPTIME: f64 = 30.0;
    /// Default number of snaps per visit.
    pub const DEFAULT_NEXP: u32 = 2;

    /// Creates an observation at the given position with default exposure
    /// settings and a zero epoch.
    pub fn new(ra: Degrees, dec: Degrees, filter: Filter) -> Self {
        Self::from_radians(ra.to::<Radian>(), dec.to::<Radian>(), filter)
    }

    pub fn from_radians(ra: Radians, dec: Radians, filter: Filter) -> Self {
        Self {
            ra,
            dec,
            filter,
            exptime: Seconds::new(Self::DEFAULT_EXPTIME),
            nexp: Self::DEFAULT_NEXP,
            note: String::new(),
            mjd: ModifiedJulianDate::new(0.0),
            flush_by_mjd: None,
            night: 0,
            field_id: None,
            executed: false,
        }
    }

    pub fn with_mjd(mut self, mjd: ModifiedJulianDate) -> Self {
        self.mjd = mjd;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_exposure(mut self, exptime: Seconds, nexp: u32) -> Self {
        self.exptime = exptime;
        self.nexp = nexp;
        self
    }

    pub fn with_night(mut self, night: u32) -> Self {
        self.night = night;
        self
    }

    pub fn ra_degrees(&self) -> Degrees {
        self.ra.to::<Degree>()
    }

    pub fn dec_degrees(&self) -> Degrees {
        self.dec.to::<Degree>()
    }

    /// Exact position and filter equality, used when matching an executed
    /// observation against a scripted entry.
    pub fn same_pointing(&self, other: &Observation) -> bool {
        self.ra == other.ra && self.dec == other.dec && self.filter == other.filter
    }

    pub fn note_contains(&self, tag: &str) -> bool {
        self.note.contains(tag)
    }

    /// Marks this observation as executed.
    pub fn mark_executed(&mut self) {
        self.executed = true;
    }
}
