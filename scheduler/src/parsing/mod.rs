//! Loaders for externally supplied observation scripts.
//!
//! - [`script_parser`]: Parse JSON scripts of wanted observations
//!
//! # Example
//!
//! ```no_run
//! use survey_scheduler::parsing::script_parser::parse_script;
//! use std::path::Path;
//!
//! let script = parse_script(Path::new("script.json"))
//!     .expect("Failed to parse script");
//! ```

pub mod script_parser;

#[cfg(test)]
mod script_parser_tests;

pub use script_parser::{parse_script, parse_script_str};
