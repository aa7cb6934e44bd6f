//! Time handling for the scheduler.
//!
//! All epochs are Modified Julian Dates carried as [`ModifiedJulianDate`],
//! a thin wrapper over `qtty::Days`. Conversions to and from UTC datetimes
//! go through `chrono`.

pub mod mjd;

pub use mjd::{datetime_to_mjd, mjd_to_datetime, ModifiedJulianDate, MJD_UNIX_EPOCH};
