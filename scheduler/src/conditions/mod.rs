//! Telemetry snapshot shared by every survey.
//!
//! [`Conditions`] holds the current time and the raw observational fields
//! reported by the observatory, plus a handful of per-pixel quantities that
//! are derived from them on demand. Raw fields start unset and become
//! available once written. Derived fields are computed on first read and
//! cached until one of the raw fields they depend on (see [`DEPENDENCIES`])
//! is written again.
//!
//! Per-pixel fields supplied at a different resolution than the snapshot's
//! grid are resampled before they are stored.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use qtty::{Hours, Radians, Seconds};
use serde::{Deserialize, Serialize};

use crate::error::ConditionsError;
use crate::models::{Filter, FilterSet};
use crate::sky::transform::{altaz_from_hour_angle, hour_angle, lmst};
use crate::sky::{DepthModel, FlatSedDepth, HealpixGrid, Site, SkyMap};
use crate::time::ModifiedJulianDate;


/// Raw (externally written) fields of a [`Conditions`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawField {
    Mjd,
    Lmst,
    Night,
    Clouds,
    BulkCloud,
    Slewtime,
    MountedFilters,
    CurrentFilter,
    SkyBrightness,
    FwhmEff,
    Airmass,
    Moon,
    Sun,
    Twilight,
    Telescope,
}

impl RawField {
    pub fn name(&self) -> &'static str {
        match self {
            RawField::Mjd => "mjd",
            RawField::Lmst => "lmst",
            RawField::Night => "night",
            RawField::Clouds => "clouds",
            RawField::BulkCloud => "bulk_cloud",
            RawField::Slewtime => "slewtime",
            RawField::MountedFilters => "mounted_filters",
            RawField::CurrentFilter => "current_filter",
            RawField::SkyBrightness => "sky_brightness",
            RawField::FwhmEff => "fwhm_eff",
            RawField::Airmass => "airmass",
            RawField::Moon => "moon",
            RawField::Sun => "sun",
            RawField::Twilight => "twilight",
            RawField::Telescope => "telescope",
        }
    }
}

/// Fields computed from raw telemetry and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedField {
    AltAz,
    HourAngle,
    M5Depth,
}

impl DerivedField {
    pub fn name(&self) -> &'static str {
        match self {
            DerivedField::AltAz => "alt/az",
            DerivedField::HourAngle => "hour_angle",
            DerivedField::M5Depth => "m5_depth",
        }
    }

    /// Raw fields this derived field is computed from.
    pub fn dependencies(&self) -> &'static [RawField] {
        DEPENDENCIES
            .iter()
            .find(|(derived, _)| derived == self)
            .map(|(_, raw)| *raw)
            .unwrap_or(&[])
    }
}

/// Which raw writes invalidate which derived caches.
pub const DEPENDENCIES: &[(DerivedField, &[RawField])] = &[
    (DerivedField::AltAz, &[RawField::Mjd]),
    (DerivedField::HourAngle, &[RawField::Lmst]),
    (
        DerivedField::M5Depth,
        &[RawField::SkyBrightness, RawField::FwhmEff, RawField::Airmass],
    ),
];

/// Moon position and illumination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonGeometry {
    pub alt: Radians,
    pub az: Radians,
    pub ra: Radians,
    pub dec: Radians,
    /// Illuminated fraction, in percent.
    pub phase: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunGeometry {
    pub alt: Radians,
    pub az: Radians,
}

/// Per-pixel altitude and azimuth, radians.
#[derive(Debug, Clone, PartialEq)]
pub struct AltAz {
    pub alt: Vec<f64>,
    pub az: Vec<f64>,
}

/// Telemetry snapshot over a fixed HEALPix grid.
///
/// # Examples
///
/// ```
/// use survey_scheduler::conditions::Conditions;
/// use survey_scheduler::time::ModifiedJulianDate;
///
/// let mut conditions = Conditions::new(8).unwrap();
/// assert!(conditions.alt().is_err());
///
/// conditions.set_mjd(ModifiedJulianDate::new(60000.2));
/// assert_eq!(conditions.alt().unwrap().len(), conditions.npix());
/// ```
#[derive(Debug)]
pub struct Conditions {
    grid: HealpixGrid,
    site: Site,
    exptime: Seconds,
    depth_model: Box<dyn DepthModel>,
    ra: Vec<f64>,
    dec: Vec<f64>,
    generation: u64,

    mjd: Option<ModifiedJulianDate>,
    lmst: Option<Hours>,
    night: Option<u32>,
    clouds: Option<f64>,
    bulk_cloud: Option<SkyMap>,
    slewtime: Option<SkyMap>,
    mounted_filters: Option<FilterSet>,
    current_filter: Option<Filter>,
    sky_brightness: Option<BTreeMap<Filter, SkyMap>>,
    fwhm_eff: Option<BTreeMap<Filter, SkyMap>>,
    airmass: Option<SkyMap>,
    moon: Option<MoonGeometry>,
    sun: Option<SunGeometry>,
    last_twilight_end: Option<ModifiedJulianDate>,
    next_twilight_start: Option<ModifiedJulianDate>,
    telescope: Option<(Radians, Radians)>,

    alt_az: OnceCell<AltAz>,
    hour_angle: OnceCell<Vec<f64>>,
    m5_depth: OnceCell<BTreeMap<Filter, SkyMap>>,
}

impl Conditions {
    /// Default exposure time used for limiting magnitudes (seconds).
    pub const DEFAULT_EXPTIME: f64 = 30.0;

    /// Empty snapshot at `nside`, at the LSST site, with the flat-SED depth model.
    pub fn new(nside: u32) -> Result<Self, ConditionsError> {
        let grid = HealpixGrid::new(nside)?;
        let (ra, dec) = grid.centers();
        Ok(Self {
            grid,
            site: Site::lsst(),
            exptime: Seconds::new(Self::DEFAULT_EXPTIME),
            depth_model: Box::new(FlatSedDepth),
            ra,
            dec,
            generation: 0,
            mjd: None,
            lmst: None,
            night: None,
            clouds: None,
            bulk_cloud: None,
            slewtime: None,
            mounted_filters: None,
            current_filter: None,
            sky_brightness: None,
            fwhm_eff: None,
            airmass: None,
            moon: None,
            sun: None,
            last_twilight_end: None,
            next_twilight_start: None,
            telescope: None,
            alt_az: OnceCell::new(),
            hour_angle: OnceCell::new(),
            m5_depth: OnceCell::new(),
        })
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.site = site;
        self.alt_az = OnceCell::new();
        self
    }

    pub fn with_exptime(mut self, exptime: Seconds) -> Self {
        self.exptime = exptime;
        self.m5_depth = OnceCell::new();
        self
    }

    pub fn with_depth_model(mut self, model: Box<dyn DepthModel>) -> Self {
        self.depth_model = model;
        self.m5_depth = OnceCell::new();
        self
    }

    // ---- geometry ----

    pub fn grid(&self) -> &HealpixGrid {
        &self.grid
    }

    pub fn nside(&self) -> u32 {
        self.grid.nside()
    }

    pub fn npix(&self) -> usize {
        self.grid.npix()
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn exptime(&self) -> Seconds {
        self.exptime
    }

    /// Pixel-center right ascensions, radians.
    pub fn ra(&self) -> &[f64] {
        &self.ra
    }

    /// Pixel-center declinations, radians.
    pub fn dec(&self) -> &[f64] {
        &self.dec
    }

    pub fn pixel_of(&self, ra: Radians, dec: Radians) -> usize {
        self.grid.pixel_of(ra, dec)
    }

    /// Number of raw writes so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_set(&self, field: RawField) -> bool {
        match field {
            RawField::Mjd => self.mjd.is_some(),
            RawField::Lmst => self.lmst.is_some(),
            RawField::Night => self.night.is_some(),
            RawField::Clouds => self.clouds.is_some(),
            RawField::BulkCloud => self.bulk_cloud.is_some(),
            RawField::Slewtime => self.slewtime.is_some(),
            RawField::MountedFilters => self.mounted_filters.is_some(),
            RawField::CurrentFilter => self.current_filter.is_some(),
            RawField::SkyBrightness => self.sky_brightness.is_some(),
            RawField::FwhmEff => self.fwhm_eff.is_some(),
            RawField::Airmass => self.airmass.is_some(),
            RawField::Moon => self.moon.is_some(),
            RawField::Sun => self.sun.is_some(),
            RawField::Twilight => self.last_twilight_end.is_some() || self.next_twilight_start.is_some(),
            RawField::Telescope => self.telescope.is_some(),
        }
    }

    /// Whether a derived field currently holds a cached value.
    pub fn is_cached(&self, field: DerivedField) -> bool {
        match field {
            DerivedField::AltAz => self.alt_az.get().is_some(),
            DerivedField::HourAngle => self.hour_angle.get().is_some(),
            DerivedField::M5Depth => self.m5_depth.get().is_some(),
        }
    }

    fn touch(&mut self, field: RawField) {
        self.generation += 1;
        for (derived, raw) in DEPENDENCIES {
            if raw.contains(&field) && self.is_cached(*derived) {
                log::debug!("{} written, invalidating {}", field.name(), derived.name());
                match derived {
                    DerivedField::AltAz => drop(self.alt_az.take()),
                    DerivedField::HourAngle => drop(self.hour_angle.take()),
                    DerivedField::M5Depth => drop(self.m5_depth.take()),
                }
            }
        }
    }

    fn canonical(&self, map: SkyMap) -> SkyMap {
        if map.nside() == self.grid.nside() {
            map
        } else {
            log::debug!("Resampling map from nside {} to {}", map.nside(), self.grid.nside());
            self.grid.resample(&map)
        }
    }

    fn canonical_per_filter(&self, maps: BTreeMap<Filter, SkyMap>) -> BTreeMap<Filter, SkyMap> {
        maps.into_iter().map(|(f, m)| (f, self.canonical(m))).collect()
    }

    // ---- raw setters ----

    pub fn set_mjd(&mut self, mjd: ModifiedJulianDate) {
        self.mjd = Some(mjd);
        self.touch(RawField::Mjd);
    }

    pub fn set_lmst(&mut self, lmst: Hours) {
        self.lmst = Some(Hours::new(lmst.value().rem_euclid(24.0)));
        self.touch(RawField::Lmst);
    }

    /// Sets `mjd` and the matching local sidereal time for the site.
    pub fn update_clock(&mut self, mjd: ModifiedJulianDate) {
        self.set_mjd(mjd);
        self.set_lmst(lmst(mjd, self.site.longitude));
    }

    pub fn set_night(&mut self, night: u32) {
        self.night = Some(night);
        self.touch(RawField::Night);
    }

    pub fn set_clouds(&mut self, clouds: f64) {
        self.clouds = Some(clouds);
        self.touch(RawField::Clouds);
    }

    pub fn set_bulk_cloud(&mut self, map: SkyMap) {
        self.bulk_cloud = Some(self.canonical(map));
        self.touch(RawField::BulkCloud);
    }

    pub fn set_slewtime(&mut self, map: SkyMap) {
        self.slewtime = Some(self.canonical(map));
        self.touch(RawField::Slewtime);
    }

    pub fn set_mounted_filters(&mut self, filters: FilterSet) -> Result<(), ConditionsError> {
        if filters.is_empty() {
            return Err(ConditionsError::EmptyFilterSet);
        }
        self.mounted_filters = Some(filters);
        self.touch(RawField::MountedFilters);
        Ok(())
    }

    /// `None` means no filter is loaded.
    pub fn set_current_filter(&mut self, filter: Option<Filter>) {
        self.current_filter = filter;
        self.touch(RawField::CurrentFilter);
    }

    pub fn set_sky_brightness(&mut self, maps: BTreeMap<Filter, SkyMap>) {
        self.sky_brightness = Some(self.canonical_per_filter(maps));
        self.touch(RawField::SkyBrightness);
    }

    pub fn set_fwhm_eff(&mut self, maps: BTreeMap<Filter, SkyMap>) {
        self.fwhm_eff = Some(self.canonical_per_filter(maps));
        self.touch(RawField::FwhmEff);
    }

    pub fn set_airmass(&mut self, map: SkyMap) {
        self.airmass = Some(self.canonical(map));
        self.touch(RawField::Airmass);
    }

    pub fn set_moon(&mut self, moon: MoonGeometry) {
        self.moon = Some(moon);
        self.touch(RawField::Moon);
    }

    pub fn set_sun(&mut self, sun: SunGeometry) {
        self.sun = Some(sun);
        self.touch(RawField::Sun);
    }

    pub fn set_twilight(&mut self, last_twilight_end: ModifiedJulianDate, next_twilight_start: ModifiedJulianDate) {
        self.last_twilight_end = Some(last_twilight_end);
        self.next_twilight_start = Some(next_twilight_start);
        self.touch(RawField::Twilight);
    }

    /// Sets the twilight bounds to the site's astronomical night around the
    /// current `mjd`. Returns `false`, leaving them unchanged, when the site
    /// has no astronomical night near that date.
    pub fn update_twilight(&mut self) -> Result<bool, ConditionsError> {
        let mjd = self.mjd.ok_or(ConditionsError::NotAvailable {
            field: RawField::Twilight.name(),
            missing: RawField::Mjd.name(),
        })?;
        match self.site.astronomical_night(mjd) {
            Some((start, end)) => {
                log::debug!("Astronomical night from {} to {}", start.value(), end.value());
                self.set_twilight(start, end);
                Ok(true)
            }
            None => {
                log::warn!("No astronomical night near MJD {}", mjd.value());
                Ok(false)
            }
        }
    }

    pub fn set_telescope(&mut self, ra: Radians, dec: Radians) {
        self.telescope = Some((ra, dec));
        self.touch(RawField::Telescope);
    }

    // ---- raw accessors ----

    pub fn mjd(&self) -> Option<ModifiedJulianDate> {
        self.mjd
    }

    pub fn lmst(&self) -> Option<Hours> {
        self.lmst
    }

    pub fn night(&self) -> Option<u32> {
        self.night
    }

    pub fn clouds(&self) -> Option<f64> {
        self.clouds
    }

    pub fn bulk_cloud(&self) -> Option<&SkyMap> {
        self.bulk_cloud.as_ref()
    }

    pub fn slewtime(&self) -> Option<&SkyMap> {
        self.slewtime.as_ref()
    }

    pub fn mounted_filters(&self) -> Option<&FilterSet> {
        self.mounted_filters.as_ref()
    }

    pub fn current_filter(&self) -> Option<Filter> {
        self.current_filter
    }

    pub fn sky_brightness(&self, filter: Filter) -> Option<&SkyMap> {
        self.sky_brightness.as_ref().and_then(|maps| maps.get(&filter))
    }

    pub fn fwhm_eff(&self, filter: Filter) -> Option<&SkyMap> {
        self.fwhm_eff.as_ref().and_then(|maps| maps.get(&filter))
    }

    pub fn airmass(&self) -> Option<&SkyMap> {
        self.airmass.as_ref()
    }

    pub fn moon(&self) -> Option<&MoonGeometry> {
        self.moon.as_ref()
    }

    pub fn sun(&self) -> Option<&SunGeometry> {
        self.sun.as_ref()
    }

    pub fn last_twilight_end(&self) -> Option<ModifiedJulianDate> {
        self.last_twilight_end
    }

    pub fn next_twilight_start(&self) -> Option<ModifiedJulianDate> {
        self.next_twilight_start
    }

    pub fn tel_ra(&self) -> Option<Radians> {
        self.telescope.map(|(ra, _)| ra)
    }

    pub fn tel_dec(&self) -> Option<Radians> {
        self.telescope.map(|(_, dec)| dec)
    }

    // ---- derived ----

    fn not_available(derived: DerivedField, missing: RawField) -> ConditionsError {
        ConditionsError::NotAvailable {
            field: derived.name(),
            missing: missing.name(),
        }
    }

    /// Per-pixel altitude and azimuth at the current `mjd`.
    pub fn alt_az(&self) -> Result<&AltAz, ConditionsError> {
        let mjd = self
            .mjd
            .ok_or_else(|| Self::not_available(DerivedField::AltAz, RawField::Mjd))?;
        Ok(self.alt_az.get_or_init(|| {
            let lst = lmst(mjd, self.site.longitude);
            let lat = self.site.latitude.to::<qtty::Radian>();
            let (alt, az) = self
                .ra
                .iter()
                .zip(&self.dec)
                .map(|(&ra, &dec)| {
                    let ha = hour_angle(lst, Radians::new(ra));
                    let (alt, az) = altaz_from_hour_angle(ha, Radians::new(dec), lat);
                    (alt.value(), az.value())
                })
                .unzip();
            AltAz { alt, az }
        }))
    }

    pub fn alt(&self) -> Result<&[f64], ConditionsError> {
        Ok(&self.alt_az()?.alt)
    }

    pub fn az(&self) -> Result<&[f64], ConditionsError> {
        Ok(&self.alt_az()?.az)
    }

    /// Per-pixel hour angle at the current `lmst`, radians in `[0, 2π)`.
    pub fn hour_angle(&self) -> Result<&[f64], ConditionsError> {
        let lst = self
            .lmst
            .ok_or_else(|| Self::not_available(DerivedField::HourAngle, RawField::Lmst))?;
        Ok(self.hour_angle.get_or_init(|| {
            self.ra
                .iter()
                .map(|&ra| hour_angle(lst, Radians::new(ra)).value())
                .collect()
        }))
    }

    /// Per-filter five-sigma depth maps.
    ///
    /// A pixel is `None` wherever the sky brightness, seeing or airmass has
    /// no data. Filters without a sky brightness map have no depth map.
    pub fn m5_depth(&self) -> Result<&BTreeMap<Filter, SkyMap>, ConditionsError> {
        let sky = self
            .sky_brightness
            .as_ref()
            .ok_or_else(|| Self::not_available(DerivedField::M5Depth, RawField::SkyBrightness))?;
        let fwhm = self
            .fwhm_eff
            .as_ref()
            .ok_or_else(|| Self::not_available(DerivedField::M5Depth, RawField::FwhmEff))?;
        let airmass = self
            .airmass
            .as_ref()
            .ok_or_else(|| Self::not_available(DerivedField::M5Depth, RawField::Airmass))?;

        Ok(self.m5_depth.get_or_init(|| {
            sky.iter()
                .map(|(&filter, sky_map)| {
                    let fwhm_map = fwhm.get(&filter);
                    let pixels = (0..self.grid.npix())
                        .map(|pix| {
                            let s = sky_map.get(pix)?;
                            let f = fwhm_map.and_then(|m| m.get(pix))?;
                            let a = airmass.get(pix)?;
                            Some(self.depth_model.m5(filter, s, f, self.exptime, a))
                        })
                        .collect();
                    (filter, SkyMap::on_grid(&self.grid, pixels))
                })
                .collect()
        }))
    }

    /// Depth at one pixel for one filter; `None` when masked or the filter
    /// has no sky brightness data.
    pub fn m5_at(&self, filter: Filter, pixel: usize) -> Result<Option<f64>, ConditionsError> {
        Ok(self.m5_depth()?.get(&filter).and_then(|m| m.get(pixel)))
    }
}
