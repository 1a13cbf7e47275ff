use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::fs;

use mzmirror::io::{format_peaks, parse_peaks, read_results};
use mzmirror::{classify, MeasuredPeak, PeakMatcher, PredictedPeak, Tolerance, UnannotatedPolicy};

/// Spread the fixture's peaks over a wider m/z range so each spectrum is a realistic size
fn widen<P: Clone>(peaks: &[P], copies: usize, shift: impl Fn(&P, f64) -> P) -> Vec<P> {
    (0..copies)
        .flat_map(|i| peaks.iter().map(move |p| (i, p)))
        .map(|(i, p)| shift(p, i as f64 * 50.0))
        .collect()
}

fn load() -> (Vec<MeasuredPeak>, Vec<PredictedPeak>) {
    let results = read_results(fs::File::open("./test/data/results.json").unwrap()).unwrap();
    let record = &results.spectra[0];
    let measured = widen(&record.msrd_spectrum, 100, |p, d| {
        let mut p = p.clone();
        p.mz += d;
        p
    });
    let predicted = widen(&record.pred_spectrum, 100, |p, d| {
        let mut p = p.clone();
        p.mz += d;
        p
    });
    (measured, predicted)
}

fn classification(c: &mut Criterion) {
    let (measured, predicted) = load();
    let text = format_peaks(&predicted);

    c.bench_function("parse_bracketed", |b| {
        b.iter(|| parse_peaks(black_box(&text)).unwrap())
    });
    c.bench_function("label_peaks", |b| {
        let matcher = PeakMatcher::new(Tolerance::PPM(15.0));
        b.iter(|| matcher.label(black_box(&measured), black_box(&predicted)))
    });
    c.bench_function("classify", |b| {
        b.iter(|| classify(black_box(&measured), UnannotatedPolicy::Distinct))
    });
}

criterion_group!(benches, classification);
criterion_main!(benches);
