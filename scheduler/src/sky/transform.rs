//! Observatory site, sidereal time and the horizontal transform.
//!
//! Site geometry, the J2000 epoch and twilight come from siderust. The
//! per-pixel rotation from hour angle to alt/az stays here so a whole grid
//! is converted in one pass; it ignores precession, nutation, aberration and
//! refraction, which is plenty for altitude limits and masks.

use qtty::{Degrees, Hours, Meter, Quantity, Radian, Radians};
use serde::{Deserialize, Serialize};
use siderust::astro::JulianDate;
use siderust::astro::ModifiedJulianDate as SiderustMJD;
use siderust::calculus::solar::altitude_periods::{find_night_periods, twilight};
use siderust::coordinates::centers::ObserverSite;
use siderust::time::Period as SiderustPeriod;
use std::f64::consts::TAU;

use crate::time::ModifiedJulianDate;

/// JD - MJD.
const MJD_OFFSET: f64 = 2_400_000.5;

/// Observatory location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub latitude: Degrees,
    /// East-positive longitude.
    pub longitude: Degrees,
    #[serde(default)]
    pub elevation_m: f64,
}

impl Site {
    /// Cerro Pachón, home of the Rubin Observatory.
    pub fn lsst() -> Self {
        Self {
            latitude: Degrees::new(-30.2444),
            longitude: Degrees::new(-70.7494),
            elevation_m: 2650.0,
        }
    }

    pub fn observer_site(&self) -> ObserverSite {
        ObserverSite::new(self.longitude, self.latitude, Quantity::<Meter>::new(self.elevation_m))
    }

    /// Astronomical night (Sun below -18 degrees) containing `mjd`, or the
    /// next one when `mjd` falls in daytime, as `(start, end)`.
    ///
    /// `None` when the Sun never gets that low in the day on either side,
    /// as happens near the poles.
    pub fn astronomical_night(&self, mjd: ModifiedJulianDate) -> Option<(ModifiedJulianDate, ModifiedJulianDate)> {
        let search = SiderustPeriod::new(SiderustMJD::new(mjd.value() - 1.0), SiderustMJD::new(mjd.value() + 1.0));

        find_night_periods(self.observer_site(), search, twilight::ASTRONOMICAL)
            .unwrap_or_default()
            .into_iter()
            .map(|p| (ModifiedJulianDate::new(p.start.value()), ModifiedJulianDate::new(p.end.value())))
            .find(|(_, end)| end.value() > mjd.value())
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::lsst()
    }
}

fn mjd_j2000() -> f64 {
    JulianDate::J2000.value() - MJD_OFFSET
}

/// Greenwich mean sidereal time, in hours `[0, 24)`.
pub fn gmst(mjd: ModifiedJulianDate) -> Hours {
    let hours = 18.697374558 + 24.06570982441908 * (mjd.value() - mjd_j2000());
    Hours::new(hours.rem_euclid(24.0))
}

/// Local mean sidereal time at `longitude`, in hours `[0, 24)`.
pub fn lmst(mjd: ModifiedJulianDate, longitude: Degrees) -> Hours {
    let hours = gmst(mjd).value() + longitude.value() / 15.0;
    Hours::new(hours.rem_euclid(24.0))
}

/// Hour angle of `ra` for a given local sidereal time, wrapped to `[0, 2π)`.
pub fn hour_angle(lmst: Hours, ra: Radians) -> Radians {
    let lst = Degrees::new(lmst.value() * 15.0).to::<Radian>();
    Radians::new((lst.value() - ra.value()).rem_euclid(TAU))
}

/// `(alt, az)` of a position at hour angle `ha` for an observer at `lat`.
///
/// Azimuth is measured from north through east.
pub(crate) fn altaz_from_hour_angle(ha: Radians, dec: Radians, lat: Radians) -> (Radians, Radians) {
    let (sin_dec, cos_dec) = (dec.sin(), dec.cos());
    let (sin_lat, cos_lat) = (lat.sin(), lat.cos());

    let sin_alt = (sin_dec * sin_lat + cos_dec * cos_lat * ha.cos()).clamp(-1.0, 1.0);
    let alt = sin_alt.asin();

    let denom = alt.cos() * cos_lat;
    let mut az = if denom.abs() < 1e-12 {
        0.0
    } else {
        ((sin_dec - sin_alt * sin_lat) / denom).clamp(-1.0, 1.0).acos()
    };
    if ha.sin() > 0.0 {
        az = TAU - az;
    }
    (Radians::new(alt), Radians::new(az))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qtty::Degree;

    #[test]
    fn test_j2000_epoch() {
        assert_relative_eq!(mjd_j2000(), 51544.5, epsilon = 1e-9);
    }

    #[test]
    fn test_gmst_at_j2000() {
        let g = gmst(ModifiedJulianDate::new(51544.5));
        assert_relative_eq!(g.value(), 18.697374558, epsilon = 1e-9);
    }

    #[test]
    fn test_lmst_wraps() {
        let l = lmst(ModifiedJulianDate::new(51544.5), Degrees::new(90.0));
        // 18.697 + 6 h wraps past 24
        assert_relative_eq!(l.value(), 0.697374558, epsilon = 1e-9);
    }

    #[test]
    fn test_transit_altitude() {
        // A star on the meridian culminates at 90 - |lat - dec|
        let lat = Degrees::new(-30.0).to::<Radian>();
        let dec = Degrees::new(-10.0).to::<Radian>();
        let (alt, az) = altaz_from_hour_angle(Radians::new(0.0), dec, lat);
        assert_relative_eq!(alt.to::<Degree>().value(), 70.0, epsilon = 1e-9);
        // North of zenith for a southern site
        assert_relative_eq!(az.value(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_east_is_rising() {
        let lat = Degrees::new(-30.0).to::<Radian>();
        let dec = Radians::new(0.0);
        // Negative hour angle (wrapped) means east of the meridian
        let (_, az) = altaz_from_hour_angle(Radians::new(TAU - 0.5), dec, lat);
        assert!(az.value() < std::f64::consts::PI);
    }

    #[test]
    fn test_pole_always_at_latitude() {
        let site = Site::lsst();
        let lat = site.latitude.to::<Radian>();
        let south_pole = Degrees::new(-90.0).to::<Radian>();
        for mjd in [60000.0, 60000.3, 60000.7] {
            let ha = hour_angle(lmst(ModifiedJulianDate::new(mjd), site.longitude), Radians::new(1.0));
            let (alt, _) = altaz_from_hour_angle(ha, south_pole, lat);
            assert_relative_eq!(alt.to::<Degree>().value(), 30.2444, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_astronomical_night_brackets_local_midnight() {
        // 2023-02-25 04:48 UTC, shortly after local midnight at Cerro Pachón
        let mjd = ModifiedJulianDate::new(60000.2);
        let (start, end) = Site::lsst().astronomical_night(mjd).expect("no night found");

        assert!(start.value() < mjd.value() && mjd.value() < end.value());
        let hours = (end.value() - start.value()) * 24.0;
        assert!(hours > 6.0 && hours < 11.0, "night lasts {} h", hours);
    }

    #[test]
    fn test_daytime_picks_next_night() {
        // 2023-02-25 18:00 UTC, mid afternoon in Chile
        let mjd = ModifiedJulianDate::new(60000.75);
        let (start, end) = Site::lsst().astronomical_night(mjd).expect("no night found");

        assert!(start.value() > mjd.value());
        assert!(start.value() - mjd.value() < 0.5);
        assert!(end.value() > start.value());
    }
}
