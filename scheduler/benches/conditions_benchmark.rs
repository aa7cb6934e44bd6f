use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::hint::black_box;
use survey_scheduler::sky::SkyMap;
use survey_scheduler::{Conditions, Filter, ModifiedJulianDate};

fn uniform(npix: usize, value: f64) -> SkyMap {
    SkyMap::from_values(vec![value; npix]).unwrap()
}

fn conditions(nside: u32) -> Conditions {
    let mut conditions = Conditions::new(nside).unwrap();
    let npix = conditions.npix();
    conditions.update_clock(ModifiedJulianDate::new(60000.2));
    conditions.set_sky_brightness(Filter::ALL.iter().map(|&f| (f, uniform(npix, 21.0))).collect::<BTreeMap<_, _>>());
    conditions.set_fwhm_eff(Filter::ALL.iter().map(|&f| (f, uniform(npix, 0.8))).collect::<BTreeMap<_, _>>());
    conditions.set_airmass(uniform(npix, 1.2));
    conditions
}

fn bench_alt_az(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_fields");

    for nside in [16u32, 32, 64] {
        let mut conds = conditions(nside);
        let mut mjd = 60000.2;
        group.bench_with_input(BenchmarkId::new("alt_az", nside), &nside, |b, _| {
            b.iter(|| {
                // A clock update invalidates the cache so every pass recomputes
                mjd += 1e-5;
                conds.update_clock(ModifiedJulianDate::new(mjd));
                black_box(conds.alt_az().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_m5_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_fields");

    for nside in [16u32, 32, 64] {
        let mut conds = conditions(nside);
        let airmass = uniform(conds.npix(), 1.2);
        group.bench_with_input(BenchmarkId::new("m5_depth", nside), &nside, |b, _| {
            b.iter(|| {
                conds.set_airmass(airmass.clone());
                black_box(conds.m5_depth().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling");

    let mut conds = conditions(32);
    let coarse = uniform(12 * 16 * 16, 5.0);
    let fine = uniform(12 * 64 * 64, 5.0);
    group.bench_function("upgrade_16_to_32", |b| {
        b.iter(|| conds.set_slewtime(black_box(coarse.clone())));
    });
    group.bench_function("degrade_64_to_32", |b| {
        b.iter(|| conds.set_slewtime(black_box(fine.clone())));
    });

    group.finish();
}

criterion_group!(benches, bench_alt_az, bench_m5_depth, bench_resample);
criterion_main!(benches);
