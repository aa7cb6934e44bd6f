//! Conditions fixtures shared by unit tests.

use std::collections::BTreeMap;

use qtty::Radians;

use crate::conditions::Conditions;
use crate::models::{Filter, Observation};
use crate::sky::SkyMap;
use crate::time::ModifiedJulianDate;

pub const NSIDE: u32 = 8;

/// Dark-sky conditions at `mjd` with telemetry for every filter.
pub fn observable_conditions(mjd: f64) -> Conditions {
    let mut conditions = Conditions::new(NSIDE).unwrap();
    conditions.update_clock(ModifiedJulianDate::new(mjd));
    conditions.set_night(1);
    let npix = conditions.npix();
    let uniform = |v: f64| SkyMap::from_values(vec![v; npix]).unwrap();
    conditions.set_sky_brightness(Filter::ALL.iter().map(|&f| (f, uniform(21.0))).collect::<BTreeMap<_, _>>());
    conditions.set_fwhm_eff(Filter::ALL.iter().map(|&f| (f, uniform(0.8))).collect::<BTreeMap<_, _>>());
    conditions.set_airmass(uniform(1.2));
    conditions.set_slewtime(uniform(5.0));
    conditions.set_mounted_filters("ugrizy".parse().unwrap()).unwrap();
    conditions
}

/// Center of the first pixel whose altitude lies between `lo_deg` and `hi_deg`.
pub fn pointing_at_altitude(conditions: &Conditions, lo_deg: f64, hi_deg: f64) -> (Radians, Radians) {
    let alt = conditions.alt().unwrap();
    let pixel = alt
        .iter()
        .position(|a| {
            let deg = a.to_degrees();
            deg > lo_deg && deg < hi_deg
        })
        .unwrap();
    conditions.grid().center_of(pixel)
}

pub fn observation_at(ra: Radians, dec: Radians, filter: Filter, mjd: f64) -> Observation {
    Observation::from_radians(ra, dec, filter).with_mjd(ModifiedJulianDate::new(mjd))
}

/// Blank the sky brightness of `filter` at the observation's pixel.
pub fn mask_pointing(conditions: &mut Conditions, observation: &Observation) {
    let pixel = conditions.pixel_of(observation.ra, observation.dec);
    let mut maps: BTreeMap<Filter, SkyMap> = Filter::ALL
        .iter()
        .filter_map(|&f| conditions.sky_brightness(f).map(|m| (f, m.clone())))
        .collect();
    if let Some(map) = maps.get_mut(&observation.filter) {
        let mut pixels = map.pixels().to_vec();
        pixels[pixel] = None;
        *map = SkyMap::from_pixels(pixels).unwrap();
    }
    conditions.set_sky_brightness(maps);
}
