//! Five-sigma limiting magnitude models.

use qtty::Seconds;

use crate::models::Filter;

/// Per-pixel limiting magnitude from observing conditions.
pub trait DepthModel: std::fmt::Debug {
    /// `sky_brightness` in mag/arcsec², `fwhm_eff` in arcseconds.
    fn m5(&self, filter: Filter, sky_brightness: f64, fwhm_eff: f64, exptime: Seconds, airmass: f64) -> f64;
}

/// Flat-SED point source depth with instrument constants for the six
/// LSST filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatSedDepth;

struct FilterConstants {
    cm: f64,
    dcm_inf: f64,
    k_atm: f64,
    msky: f64,
}

fn constants(filter: Filter) -> FilterConstants {
    let (cm, dcm_inf, k_atm, msky) = match filter {
        Filter::U => (22.74, 0.75, 0.50, 22.95),
        Filter::G => (24.38, 0.19, 0.21, 22.24),
        Filter::R => (24.43, 0.10, 0.13, 21.20),
        Filter::I => (24.30, 0.07, 0.10, 20.47),
        Filter::Z => (24.15, 0.05, 0.07, 19.60),
        Filter::Y => (23.70, 0.04, 0.18, 18.63),
    };
    FilterConstants {
        cm,
        dcm_inf,
        k_atm,
        msky,
    }
}

impl DepthModel for FlatSedDepth {
    fn m5(&self, filter: Filter, sky_brightness: f64, fwhm_eff: f64, exptime: Seconds, airmass: f64) -> f64 {
        let c = constants(filter);
        let t = exptime.value() / 30.0;

        // Readout-noise correction shrinks as the sky background grows
        let t_scale = t * 10f64.powf(-0.4 * (sky_brightness - c.msky));
        let dcm = c.dcm_inf - 1.25 * (1.0 + (10f64.powf(0.8 * c.dcm_inf) - 1.0) / t_scale).log10();

        c.cm + dcm + 0.5 * (sky_brightness - 21.0) + 2.5 * (0.7 / fwhm_eff).log10() + 1.25 * t.log10()
            - c.k_atm * (airmass - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_r_band_depth() {
        let m5 = FlatSedDepth.m5(Filter::R, 21.2, 0.7, Seconds::new(30.0), 1.0);
        assert_relative_eq!(m5, 24.53, epsilon = 0.01);
    }

    #[test]
    fn test_worse_conditions_are_shallower() {
        let model = FlatSedDepth;
        let base = model.m5(Filter::G, 22.0, 0.8, Seconds::new(30.0), 1.2);
        assert!(model.m5(Filter::G, 21.0, 0.8, Seconds::new(30.0), 1.2) < base);
        assert!(model.m5(Filter::G, 22.0, 1.2, Seconds::new(30.0), 1.2) < base);
        assert!(model.m5(Filter::G, 22.0, 0.8, Seconds::new(30.0), 2.0) < base);
        assert!(model.m5(Filter::G, 22.0, 0.8, Seconds::new(60.0), 1.2) > base);
    }
}
