use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qtty::{Degrees, Seconds};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::models::{Filter, Observation};
use crate::time::ModifiedJulianDate;

/// Accepts either a string or an integer field id
fn deserialize_field_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    match Option::<StringOrInt>::deserialize(deserializer)? {
        Some(StringOrInt::String(s)) => s.trim().parse::<i64>().map(Some).map_err(D::Error::custom),
        Some(StringOrInt::Int(i)) => Ok(Some(i)),
        None => Ok(None),
    }
}

/// Raw JSON structure for one scripted visit
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    /// Degrees
    ra: f64,
    /// Degrees
    dec: f64,
    filter: Filter,
    #[serde(default)]
    mjd: Option<f64>,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
    #[serde(default)]
    exptime: Option<f64>,
    #[serde(default)]
    nexp: Option<u32>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    flush_by_mjd: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_field_id")]
    field_id: Option<i64>,
}

/// Container for the object form of a script file
#[derive(Debug, Deserialize)]
struct ScriptJson {
    observations: Vec<RawEntry>,
}

/// Parse a script file into observations sorted by target epoch.
pub fn parse_script(json_path: &Path) -> Result<Vec<Observation>> {
    let json_content = std::fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read script file: {}", json_path.display()))?;

    parse_script_str(&json_content).with_context(|| format!("Invalid script file: {}", json_path.display()))
}

/// Parse a script from a JSON string.
///
/// Each entry needs `ra`, `dec` (degrees), `filter`, and a target epoch
/// given either as `mjd` or as an RFC 3339 UTC `time`.
pub fn parse_script_str(json_str: &str) -> Result<Vec<Observation>> {
    let json_value: serde_json::Value = serde_json::from_str(json_str).context("Invalid JSON syntax")?;

    let entries: Vec<RawEntry> = if json_value.is_array() {
        serde_path_to_error::deserialize(json_value)
            .map_err(|e| anyhow::anyhow!("Invalid script entry at '{}': {}", e.path(), e.inner()))?
    } else if json_value.get("observations").is_some() {
        let script: ScriptJson = serde_path_to_error::deserialize(json_value)
            .map_err(|e| anyhow::anyhow!("Invalid script entry at '{}': {}", e.path(), e.inner()))?;
        script.observations
    } else {
        anyhow::bail!("Script must be a JSON array or an object with an 'observations' key");
    };

    let mut observations = entries
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| convert_raw_entry(raw).with_context(|| format!("Script entry {}", idx)))
        .collect::<Result<Vec<_>>>()?;

    let sorted = observations.windows(2).all(|w| w[0].mjd <= w[1].mjd);
    if !sorted {
        log::debug!("Sorting {} script entries by target epoch", observations.len());
        observations.sort_by(|a, b| a.mjd.value().total_cmp(&b.mjd.value()));
    }
    Ok(observations)
}

fn convert_raw_entry(raw: RawEntry) -> Result<Observation> {
    let mjd = match (raw.mjd, raw.time) {
        (Some(mjd), None) => ModifiedJulianDate::new(mjd),
        (None, Some(time)) => ModifiedJulianDate::from_utc(time),
        (Some(_), Some(_)) => anyhow::bail!("Give either 'mjd' or 'time', not both"),
        (None, None) => anyhow::bail!("Missing target epoch: give 'mjd' or 'time'"),
    };
    if !mjd.value().is_finite() {
        anyhow::bail!("Target epoch is not finite");
    }
    if !(-90.0..=90.0).contains(&raw.dec) {
        anyhow::bail!("Declination {} is outside [-90, 90] degrees", raw.dec);
    }

    let mut observation = Observation::new(Degrees::new(raw.ra.rem_euclid(360.0)), Degrees::new(raw.dec), raw.filter)
        .with_mjd(mjd)
        .with_exposure(
            Seconds::new(raw.exptime.unwrap_or(Observation::DEFAULT_EXPTIME)),
            raw.nexp.unwrap_or(Observation::DEFAULT_NEXP),
        );
    if let Some(note) = raw.note {
        observation = observation.with_note(note);
    }
    observation.flush_by_mjd = raw.flush_by_mjd.map(ModifiedJulianDate::new);
    observation.field_id = raw.field_id;
    Ok(observation)
}
