//! Equal-area HEALPix pixelization (RING ordering) and per-pixel sky maps.
//!
//! Only what the scheduler needs is implemented: pixel <-> angle conversion
//! at pixel centers, and resampling of a map between resolutions.
//! Resampling relies on HEALPix nesting: every fine pixel center lies inside
//! exactly one coarse pixel, so degrading averages the valid children of each
//! coarse pixel (all children have equal area) and upgrading copies the
//! parent value.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use qtty::Radians;

use crate::error::ConditionsError;

/// Finest supported resolution (about 12.6 million pixels).
pub const MAX_NSIDE: u32 = 1 << 10;

/// A HEALPix grid at a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealpixGrid {
    nside: u32,
}

impl HealpixGrid {
    /// Fails unless `nside` lies in `1..=MAX_NSIDE`.
    pub fn new(nside: u32) -> Result<Self, ConditionsError> {
        if nside == 0 || nside > MAX_NSIDE {
            return Err(ConditionsError::InvalidNside(nside));
        }
        Ok(Self { nside })
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn npix(&self) -> usize {
        // nside <= MAX_NSIDE keeps this well inside usize
        12 * (self.nside as usize) * (self.nside as usize)
    }

    /// Pixel containing the given position.
    pub fn pixel_of(&self, ra: Radians, dec: Radians) -> usize {
        let z = dec.value().sin();
        ang2pix_ring(i64::from(self.nside), z, ra.value()) as usize
    }

    /// Center of a pixel as `(ra, dec)` in radians.
    pub fn center_of(&self, pixel: usize) -> (Radians, Radians) {
        let (z, phi) = pix2ang_ring(i64::from(self.nside), pixel as i64);
        (Radians::new(phi), Radians::new(z.clamp(-1.0, 1.0).asin()))
    }

    /// Centers of every pixel, as parallel `(ra, dec)` vectors in radians.
    pub fn centers(&self) -> (Vec<f64>, Vec<f64>) {
        (0..self.npix())
            .map(|pix| {
                let (ra, dec) = self.center_of(pix);
                (ra.value(), dec.value())
            })
            .unzip()
    }

    /// A map at this resolution with every pixel set to `value`.
    pub fn filled(&self, value: Option<f64>) -> SkyMap {
        SkyMap {
            nside: self.nside,
            pixels: vec![value; self.npix()],
        }
    }

    /// Resample `map` onto this grid's resolution.
    pub fn resample(&self, map: &SkyMap) -> SkyMap {
        if map.nside == self.nside {
            return map.clone();
        }

        let source = HealpixGrid { nside: map.nside };
        if map.nside > self.nside {
            // Degrade: mean of the valid fine pixels inside each coarse pixel
            let mut sums = vec![0.0; self.npix()];
            let mut counts = vec![0usize; self.npix()];
            for (pix, value) in map.pixels.iter().enumerate() {
                if let Some(v) = value {
                    let (ra, dec) = source.center_of(pix);
                    let target = self.pixel_of(ra, dec);
                    sums[target] += v;
                    counts[target] += 1;
                }
            }
            let pixels = sums
                .into_iter()
                .zip(counts)
                .map(|(sum, n)| if n > 0 { Some(sum / n as f64) } else { None })
                .collect();
            SkyMap {
                nside: self.nside,
                pixels,
            }
        } else {
            let pixels = (0..self.npix())
                .map(|pix| {
                    let (ra, dec) = self.center_of(pix);
                    map.pixels[source.pixel_of(ra, dec)]
                })
                .collect();
            SkyMap {
                nside: self.nside,
                pixels,
            }
        }
    }
}

/// A per-pixel field. `None` marks a pixel with no data.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMap {
    nside: u32,
    pixels: Vec<Option<f64>>,
}

impl SkyMap {
    /// Build a map from pixel values; the resolution is inferred from the
    /// length. Non-finite values are stored as no-data.
    pub fn from_values(values: Vec<f64>) -> Result<Self, ConditionsError> {
        Self::from_pixels(
            values
                .into_iter()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .collect(),
        )
    }

    /// Build a map from pixels that may carry no-data markers.
    pub fn from_pixels(pixels: Vec<Option<f64>>) -> Result<Self, ConditionsError> {
        if pixels.is_empty() {
            return Err(ConditionsError::DegenerateField);
        }
        let nside = nside_for_npix(pixels.len())
            .ok_or(ConditionsError::InvalidPixelCount { len: pixels.len() })?;
        Ok(Self { nside, pixels })
    }

    /// Build a map already known to be at `grid`'s resolution.
    pub(crate) fn on_grid(grid: &HealpixGrid, pixels: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(pixels.len(), grid.npix());
        Self {
            nside: grid.nside,
            pixels,
        }
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, pixel: usize) -> Option<f64> {
        self.pixels.get(pixel).copied().flatten()
    }

    pub fn pixels(&self) -> &[Option<f64>] {
        &self.pixels
    }

    /// Number of pixels that carry data.
    pub fn valid_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_some()).count()
    }
}

/// Pixel count `12 * nside^2`, or `None` if it does not fit in `usize`.
pub fn npix_for(nside: u32) -> Option<usize> {
    let n = usize::try_from(nside).ok()?;
    n.checked_mul(n)?.checked_mul(12)
}

pub fn nside_for_npix(npix: usize) -> Option<u32> {
    if npix == 0 || npix % 12 != 0 {
        return None;
    }
    let nside = isqrt((npix / 12) as i64);
    let nside = u32::try_from(nside).ok()?;
    if nside > 0 && npix_for(nside) == Some(npix) {
        Some(nside)
    } else {
        None
    }
}

fn isqrt(x: i64) -> i64 {
    let mut r = (x as f64).sqrt() as i64;
    while r * r > x {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= x {
        r += 1;
    }
    r
}

fn ang2pix_ring(nside: i64, z: f64, phi: f64) -> i64 {
    let npix = 12 * nside * nside;
    let ncap = 2 * nside * (nside - 1);
    let za = z.abs();
    let tt = phi.rem_euclid(TAU) / FRAC_PI_2;

    if za <= 2.0 / 3.0 {
        // Equatorial belt
        let nl4 = 4 * nside;
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ir = (nside + 1 + jp - jm).clamp(1, 2 * nside + 1);
        let kshift = 1 - (ir & 1);
        let ip = ((jp + jm - nside + kshift + 1) / 2).rem_euclid(nl4);
        ncap + (ir - 1) * nl4 + ip
    } else {
        // Polar caps
        let tp = tt - tt.floor();
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;
        let ir = (jp + jm + 1).min(nside);
        let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            npix - 2 * ir * (ir + 1) + ip
        }
    }
}

fn pix2ang_ring(nside: i64, pix: i64) -> (f64, f64) {
    let npix = 12 * nside * nside;
    let ncap = 2 * nside * (nside - 1);
    let fact2 = 4.0 / npix as f64;

    if pix < ncap {
        let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (z, phi)
    } else if pix < npix - ncap {
        let fact1 = (2 * nside) as f64 * fact2;
        let ip = pix - ncap;
        let tmp = ip / (4 * nside);
        let iring = tmp + nside;
        let iphi = ip - 4 * nside * tmp + 1;
        let fodd = if (iring + nside) & 1 == 1 { 1.0 } else { 0.5 };
        let z = (2 * nside - iring) as f64 * fact1;
        let phi = (iphi as f64 - fodd) * PI * 0.75 * fact1;
        (z, phi)
    } else {
        let ip = npix - pix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (z, phi)
    }
}
