//! Survey scheduling core for a wide-field telescope.
//!
//! A [`Conditions`] snapshot holds the current telemetry over a HEALPix grid
//! and derives alt/az, hour angle and limiting depth lazily. Each
//! [`Survey`] turns that snapshot into a reward, and the winning survey
//! generates the next observations. The [`CoreScheduler`] runs that loop.
//!
//! # Example
//!
//! ```no_run
//! use survey_scheduler::config::SchedulerConfig;
//! use survey_scheduler::survey::Survey;
//! use survey_scheduler::CoreScheduler;
//!
//! let config = SchedulerConfig::from_default_location()?;
//! let conditions = config.build_conditions()?;
//! let surveys: Vec<Box<dyn Survey>> = config
//!     .dd_surveys()?
//!     .into_iter()
//!     .map(|s| Box::new(s) as Box<dyn Survey>)
//!     .collect();
//! let mut scheduler = CoreScheduler::new(surveys, conditions, config.scheduler.seed)?;
//! let next = scheduler.request_observation()?;
//! # Ok::<(), survey_scheduler::SchedulerError>(())
//! ```

pub mod basis;
pub mod conditions;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod parsing;
pub mod scheduler;
pub mod sky;
pub mod survey;
pub mod time;

#[cfg(test)]
mod testing;

pub use conditions::Conditions;
pub use error::{ConditionsError, SchedulerError, SchedulerResult};
pub use models::{Filter, FilterSet, Observation};
pub use scheduler::CoreScheduler;
pub use survey::Survey;
pub use time::ModifiedJulianDate;
