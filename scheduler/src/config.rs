//! Scheduler configuration file support.
//!
//! Settings are read from a TOML file. Every section and key is optional;
//! missing values fall back to the standard survey defaults. Angles and
//! durations are written in plain units (degrees, minutes, seconds) and
//! converted to typed quantities when components are built.

use qtty::{Day, Degrees, Minutes, Seconds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::basis::BasisFunction;
use crate::conditions::Conditions;
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::FilterSet;
use crate::sky::{HealpixGrid, Site};
use crate::survey::{
    generate_dd_surveys, DdSettings, PairSettings, PairsSurvey, ScriptedSurvey, SequenceSettings,
    SequenceSurvey, SkyConstraints, SurveyCore,
};

/// Scheduler configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub conditions: ConditionsSettings,
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub scripted: ScriptedSettings,
    #[serde(default)]
    pub pairs: PairsSettings,
    #[serde(default)]
    pub sequence: SequenceFileSettings,
    #[serde(default)]
    pub scheduler: CoreSettings,
}

/// Telemetry grid and depth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionsSettings {
    #[serde(default = "default_nside")]
    pub nside: u32,
    #[serde(default = "default_exptime_s")]
    pub exptime_s: f64,
}

/// Observatory location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_latitude_deg")]
    pub latitude_deg: f64,
    #[serde(default = "default_longitude_deg")]
    pub longitude_deg: f64,
    #[serde(default = "default_elevation_m")]
    pub elevation_m: f64,
}

/// Scripted survey settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedSettings {
    #[serde(default = "default_scripted_reward")]
    pub reward: f64,
    #[serde(default = "default_tolerance_min")]
    pub tolerance_min: f64,
    #[serde(default = "default_min_alt_deg")]
    pub min_alt_deg: f64,
    #[serde(default = "default_max_alt_deg")]
    pub max_alt_deg: f64,
    #[serde(default = "default_scripted_ignore")]
    pub ignore: Vec<String>,
}

/// Pair follow-up settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsSettings {
    #[serde(default = "default_pair_filters")]
    pub filters: String,
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,
    #[serde(default = "default_ttol_min")]
    pub ttol_min: f64,
    #[serde(default = "default_max_slew_s")]
    pub max_slew_s: f64,
    #[serde(default = "default_pair_reward")]
    pub reward: f64,
    #[serde(default = "default_pair_note")]
    pub note: String,
    #[serde(default = "default_pair_ignore")]
    pub ignore: Vec<String>,
}

/// Sequence (deep drilling) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceFileSettings {
    #[serde(default = "default_exptime_s")]
    pub exptime_s: f64,
    #[serde(default = "default_nexp")]
    pub nexp: u32,
    #[serde(default = "default_readtime_s")]
    pub readtime_s: f64,
    #[serde(default = "default_filter_change_s")]
    pub filter_change_s: f64,
    #[serde(default = "default_flush_pad_min")]
    pub flush_pad_min: f64,
    /// Constant reward; leave unset to reward under-served sequences.
    #[serde(default)]
    pub reward: Option<f64>,
    #[serde(default = "default_dd_reward")]
    pub dd_reward: Option<f64>,
    #[serde(default = "default_dd_frac_total")]
    pub dd_frac_total: f64,
}

/// Core scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSettings {
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_nside() -> u32 {
    32
}

fn default_exptime_s() -> f64 {
    30.0
}

fn default_latitude_deg() -> f64 {
    Site::lsst().latitude.value()
}

fn default_longitude_deg() -> f64 {
    Site::lsst().longitude.value()
}

fn default_elevation_m() -> f64 {
    Site::lsst().elevation_m
}

fn default_scripted_reward() -> f64 {
    ScriptedSurvey::DEFAULT_REWARD
}

fn default_tolerance_min() -> f64 {
    ScriptedSurvey::DEFAULT_TOLERANCE_MINUTES
}

fn default_min_alt_deg() -> f64 {
    SkyConstraints::DEFAULT_MIN_ALT
}

fn default_max_alt_deg() -> f64 {
    SkyConstraints::DEFAULT_MAX_ALT
}

fn default_scripted_ignore() -> Vec<String> {
    vec![ScriptedSurvey::DEFAULT_IGNORE.to_string()]
}

fn default_pair_filters() -> String {
    "griz".to_string()
}

fn default_dt_min() -> f64 {
    40.0
}

fn default_ttol_min() -> f64 {
    10.0
}

fn default_max_slew_s() -> f64 {
    15.0
}

fn default_pair_reward() -> f64 {
    101.0
}

fn default_pair_note() -> String {
    "scripted".to_string()
}

fn default_pair_ignore() -> Vec<String> {
    vec![PairsSurvey::DEFAULT_IGNORE.to_string()]
}

fn default_nexp() -> u32 {
    2
}

fn default_readtime_s() -> f64 {
    2.0
}

fn default_filter_change_s() -> f64 {
    120.0
}

fn default_flush_pad_min() -> f64 {
    30.0
}

fn default_dd_reward() -> Option<f64> {
    Some(100.0)
}

fn default_dd_frac_total() -> f64 {
    crate::basis::DD_FRAC_TOTAL
}

fn default_seed() -> u64 {
    42
}

impl Default for ConditionsSettings {
    fn default() -> Self {
        Self {
            nside: default_nside(),
            exptime_s: default_exptime_s(),
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            latitude_deg: default_latitude_deg(),
            longitude_deg: default_longitude_deg(),
            elevation_m: default_elevation_m(),
        }
    }
}

impl Default for ScriptedSettings {
    fn default() -> Self {
        Self {
            reward: default_scripted_reward(),
            tolerance_min: default_tolerance_min(),
            min_alt_deg: default_min_alt_deg(),
            max_alt_deg: default_max_alt_deg(),
            ignore: default_scripted_ignore(),
        }
    }
}

impl Default for PairsSettings {
    fn default() -> Self {
        Self {
            filters: default_pair_filters(),
            dt_min: default_dt_min(),
            ttol_min: default_ttol_min(),
            max_slew_s: default_max_slew_s(),
            reward: default_pair_reward(),
            note: default_pair_note(),
            ignore: default_pair_ignore(),
        }
    }
}

impl Default for SequenceFileSettings {
    fn default() -> Self {
        Self {
            exptime_s: default_exptime_s(),
            nexp: default_nexp(),
            readtime_s: default_readtime_s(),
            filter_change_s: default_filter_change_s(),
            flush_pad_min: default_flush_pad_min(),
            reward: None,
            dd_reward: default_dd_reward(),
            dd_frac_total: default_dd_frac_total(),
        }
    }
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self { seed: default_seed() }
    }
}

impl SchedulerConfig {
    /// Load scheduler configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(SchedulerConfig)` if successful
    /// * `Err(SchedulerError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchedulerResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SchedulerError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> SchedulerResult<Self> {
        let config: SchedulerConfig = toml::from_str(content)
            .map_err(|e| SchedulerError::Configuration(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load scheduler configuration from the default location.
    ///
    /// Searches for `scheduler.toml` in the current directory, then in
    /// `config/`, then in the parent directory.
    pub fn from_default_location() -> SchedulerResult<Self> {
        let search_paths = [
            PathBuf::from("scheduler.toml"),
            PathBuf::from("config/scheduler.toml"),
            PathBuf::from("../scheduler.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                log::info!("Loading scheduler configuration from {}", path.display());
                return Self::from_file(path);
            }
        }

        Err(SchedulerError::Configuration(
            "No scheduler.toml found in standard locations".to_string(),
        ))
    }

    fn validate(&self) -> SchedulerResult<()> {
        HealpixGrid::new(self.conditions.nside)?;
        self.pair_filters()?;
        if self.scripted.min_alt_deg >= self.scripted.max_alt_deg {
            return Err(SchedulerError::Configuration(format!(
                "scripted.min_alt_deg ({}) must be below scripted.max_alt_deg ({})",
                self.scripted.min_alt_deg, self.scripted.max_alt_deg
            )));
        }
        if self.scripted.tolerance_min < 0.0 || self.pairs.ttol_min < 0.0 {
            return Err(SchedulerError::Configuration(
                "Time tolerances must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> SchedulerResult<HealpixGrid> {
        Ok(HealpixGrid::new(self.conditions.nside)?)
    }

    pub fn site(&self) -> Site {
        Site {
            latitude: Degrees::new(self.site.latitude_deg),
            longitude: Degrees::new(self.site.longitude_deg),
            elevation_m: self.site.elevation_m,
        }
    }

    /// An empty telemetry snapshot on the configured grid and site.
    pub fn build_conditions(&self) -> SchedulerResult<Conditions> {
        Ok(Conditions::new(self.conditions.nside)?
            .with_site(self.site())
            .with_exptime(Seconds::new(self.conditions.exptime_s)))
    }

    pub fn sky_constraints(&self) -> SkyConstraints {
        SkyConstraints::new(
            Degrees::new(self.scripted.min_alt_deg),
            Degrees::new(self.scripted.max_alt_deg),
        )
    }

    fn pair_filters(&self) -> SchedulerResult<FilterSet> {
        self.pairs
            .filters
            .parse::<FilterSet>()
            .map_err(|e| SchedulerError::Configuration(format!("pairs.filters: {}", e)))
    }

    pub fn pair_settings(&self) -> SchedulerResult<PairSettings> {
        Ok(PairSettings {
            filters: self.pair_filters()?,
            dt: Minutes::new(self.pairs.dt_min).to::<Day>(),
            ttol: Minutes::new(self.pairs.ttol_min).to::<Day>(),
            max_slew: Seconds::new(self.pairs.max_slew_s),
            reward_value: self.pairs.reward,
            note: self.pairs.note.clone(),
        })
    }

    pub fn sequence_settings(&self) -> SequenceSettings {
        SequenceSettings {
            exptime: Seconds::new(self.sequence.exptime_s),
            nexp: self.sequence.nexp,
            readtime: Seconds::new(self.sequence.readtime_s),
            filter_change_time: Seconds::new(self.sequence.filter_change_s),
            flush_pad: Minutes::new(self.sequence.flush_pad_min),
            reward_value: self.sequence.reward,
        }
    }

    pub fn scripted_survey(
        &self,
        name: &str,
        basis_functions: Vec<Box<dyn BasisFunction>>,
    ) -> SchedulerResult<ScriptedSurvey> {
        let core = SurveyCore::new(name, basis_functions, self.grid()?).with_ignore_obs(self.scripted.ignore.clone());
        Ok(ScriptedSurvey::new(
            core,
            self.sky_constraints(),
            self.scripted.reward,
            Minutes::new(self.scripted.tolerance_min).to::<Day>(),
        ))
    }

    pub fn pairs_survey(&self, name: &str, basis_functions: Vec<Box<dyn BasisFunction>>) -> SchedulerResult<PairsSurvey> {
        let core = SurveyCore::new(name, basis_functions, self.grid()?).with_ignore_obs(self.pairs.ignore.clone());
        Ok(PairsSurvey::new(core, self.sky_constraints(), self.pair_settings()?))
    }

    /// The standard deep-drilling fields with the configured exposure count
    /// and reward.
    pub fn dd_surveys(&self) -> SchedulerResult<Vec<SequenceSurvey>> {
        let dd = DdSettings {
            nexp: self.sequence.nexp,
            reward_value: self.sequence.dd_reward,
            frac_total: self.sequence.dd_frac_total,
        };
        generate_dd_surveys(self.grid()?, &dd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::error::ConditionsError;
    use qtty::Second;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config.conditions.nside, 32);
        assert_eq!(config.scripted.reward, 1e6);
        assert_eq!(config.scripted.ignore, vec!["dummy".to_string()]);
        assert_eq!(config.pairs.ignore, vec!["ack".to_string()]);
        assert_eq!(config.scheduler.seed, 42);
        assert_eq!(config.sequence.dd_reward, Some(100.0));

        let pairs = config.pair_settings().unwrap();
        assert_eq!(pairs.filters.to_string(), "griz");
        assert_relative_eq!(pairs.dt.value(), 40.0 / 1440.0, epsilon = 1e-12);
        assert_relative_eq!(pairs.ttol.to::<Second>().value(), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[conditions]
nside = 16

[pairs]
filters = "gr"
dt_min = 30.0

[scheduler]
seed = 7
"#;
        let config = SchedulerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.conditions.nside, 16);
        assert_eq!(config.conditions.exptime_s, 30.0);
        assert_eq!(config.pairs.filters, "gr");
        assert_eq!(config.pairs.ttol_min, 10.0);
        assert_eq!(config.scheduler.seed, 7);

        let conditions = config.build_conditions().unwrap();
        assert_eq!(conditions.npix(), 12 * 16 * 16);
        let survey = config.pairs_survey("pairs", Vec::new()).unwrap();
        assert_eq!(survey.settings().filters.to_string(), "gr");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for toml in [
            "[conditions]\nnside = 0",
            "[pairs]\nfilters = \"rgq\"",
            "[scripted]\nmin_alt_deg = 60.0\nmax_alt_deg = 40.0",
            "[conditions]\nnside = \"big\"",
        ] {
            let result = SchedulerConfig::from_toml_str(toml);
            assert!(
                matches!(result, Err(SchedulerError::Configuration(_)) | Err(SchedulerError::Conditions(_))),
                "accepted: {}",
                toml
            );
        }
    }

    #[test]
    fn test_oversized_nside_fails_at_load() {
        let result = SchedulerConfig::from_toml_str("[conditions]\nnside = 4000000000");
        assert!(matches!(
            result,
            Err(SchedulerError::Conditions(ConditionsError::InvalidNside(4_000_000_000)))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[site]\nlatitude_deg = 19.82\nlongitude_deg = -155.47").unwrap();

        let config = SchedulerConfig::from_file(file.path()).unwrap();
        let site = config.site();
        assert_eq!(site.latitude.value(), 19.82);
        assert_eq!(site.longitude.value(), -155.47);
        assert_eq!(site.elevation_m, Site::lsst().elevation_m);
    }

    #[test]
    fn test_missing_file() {
        let result = SchedulerConfig::from_file("/nonexistent/scheduler.toml");
        assert!(matches!(result, Err(SchedulerError::Configuration(_))));
    }

    #[test]
    fn test_builders() {
        let config = SchedulerConfig::default();
        let scripted = config.scripted_survey("script", Vec::new()).unwrap();
        assert_eq!(scripted.core().ignore_obs(), &["dummy".to_string()]);
        assert_relative_eq!(scripted.queue().tolerance().value(), 15.0 / 1440.0, epsilon = 1e-12);

        let dd = config.dd_surveys().unwrap();
        assert_eq!(dd.len(), 5);
        assert_eq!(config.sequence_settings(), SequenceSettings::default());
    }
}
