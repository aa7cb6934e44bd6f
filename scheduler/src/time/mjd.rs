use chrono::{DateTime, TimeZone, Utc};
use qtty::{Day, Days, Second};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// MJD of the Unix epoch (1970-01-01T00:00:00 UTC).
pub const MJD_UNIX_EPOCH: f64 = 40587.0;

/// A Modified Julian Date.
///
/// Subtracting two dates yields a signed `Days` quantity; adding a `Days`
/// quantity shifts the date.
///
/// # Examples
///
/// ```
/// use survey_scheduler::time::ModifiedJulianDate;
/// use qtty::Days;
///
/// let t0 = ModifiedJulianDate::new(60000.0);
/// let t1 = t0 + Days::new(0.5);
/// assert_eq!((t1 - t0).value(), 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifiedJulianDate(Days);

impl ModifiedJulianDate {
    /// Create a new MJD value.
    pub fn new<V: Into<Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw MJD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// The MJD as a `Days` quantity.
    pub fn days(&self) -> Days {
        self.0
    }

    /// Build from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let seconds = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9;
        let days: Days = qtty::Seconds::new(seconds).to::<Day>();
        Self::new(days.value() + MJD_UNIX_EPOCH)
    }

    /// Convert to a UTC datetime. Returns `None` when the value is not
    /// representable (NaN or out of chrono's range).
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        if !self.value().is_finite() {
            return None;
        }
        let seconds = Days::new(self.value() - MJD_UNIX_EPOCH).to::<Second>().value();
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        Utc.timestamp_opt(whole as i64, nanos).single()
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

impl Add<Days> for ModifiedJulianDate {
    type Output = ModifiedJulianDate;

    fn add(self, rhs: Days) -> Self::Output {
        ModifiedJulianDate(self.0 + rhs)
    }
}

impl Sub<Days> for ModifiedJulianDate {
    type Output = ModifiedJulianDate;

    fn sub(self, rhs: Days) -> Self::Output {
        ModifiedJulianDate(self.0 - rhs)
    }
}

impl Sub for ModifiedJulianDate {
    type Output = Days;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl fmt::Display for ModifiedJulianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MJD {:.5}", self.value())
    }
}

/// Convert an MJD value to a UTC datetime.
pub fn mjd_to_datetime(mjd: f64) -> Option<DateTime<Utc>> {
    ModifiedJulianDate::new(mjd).to_utc()
}

/// Convert a UTC datetime to an MJD value.
pub fn datetime_to_mjd(dt: &DateTime<Utc>) -> f64 {
    ModifiedJulianDate::from_utc(*dt).value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_mjd_roundtrip() {
        let original_mjd = 59580.5;
        let dt = mjd_to_datetime(original_mjd).unwrap();
        let back_to_mjd = datetime_to_mjd(&dt);

        assert!((original_mjd - back_to_mjd).abs() < 1e-6);
    }

    #[test]
    fn test_known_mjd_conversion() {
        // MJD 59580.0 = 2022-01-01 00:00:00 UTC
        let datetime = mjd_to_datetime(59580.0).unwrap();

        assert_eq!(datetime.year(), 2022);
        assert_eq!(datetime.month(), 1);
        assert_eq!(datetime.day(), 1);
        assert_eq!(datetime.hour(), 0);
    }

    #[test]
    fn test_unix_epoch() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(datetime_to_mjd(&epoch), MJD_UNIX_EPOCH);
    }

    #[test]
    fn test_nan_has_no_datetime() {
        assert!(ModifiedJulianDate::new(f64::NAN).to_utc().is_none());
    }

    #[test]
    fn test_arithmetic() {
        let t0 = ModifiedJulianDate::new(100.0);
        let t1 = t0 + Days::new(0.25);
        assert_eq!(t1.value(), 100.25);
        assert_eq!((t0 - t1).value(), -0.25);
        assert_eq!((t1 - Days::new(0.25)).value(), 100.0);
        assert!(t0 < t1);
    }

    #[test]
    fn test_serde_is_plain_number() {
        let t = ModifiedJulianDate::new(60000.5);
        assert_eq!(serde_json::to_string(&t).unwrap(), "60000.5");
        let back: ModifiedJulianDate = serde_json::from_str("60000.5").unwrap();
        assert_eq!(back, t);
    }
}
