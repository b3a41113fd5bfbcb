use criterion::{black_box, criterion_group, criterion_main, Criterion};
use zonecut::*;

fn landscape() -> Raster {
    Raster::from_rgb_fn(128, 128, |row, col| {
        let sky = row < 48;
        let band = (col / 32) as u8;
        if sky {
            [90, 140, 230u8.saturating_sub(row as u8)]
        } else {
            [40 + band * 30, 120, 40]
        }
    })
}

fn bench_kmeans(c: &mut Criterion) {
    let image = landscape();
    let mut group = c.benchmark_group("kmeans");
    for metric in DistanceMetric::ALL {
        group.bench_function(metric.key(), |b| {
            b.iter(|| {
                let mut engine = KMeansEngine::new(4, metric, 10).unwrap();
                black_box(engine.run(black_box(&image)).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_regions(c: &mut Criterion) {
    let image = landscape();
    let config = RegionConfig::default();
    c.bench_function("regions_split", |b| {
        b.iter(|| {
            let mut engine = RegionSimilarityEngine::new(&config, black_box(&image)).unwrap();
            black_box(engine.process().unwrap())
        });
    });

    let merging = RegionConfig {
        merge_regions: true,
        ..config
    };
    c.bench_function("regions_split_merge", |b| {
        b.iter(|| {
            let mut engine = RegionSimilarityEngine::new(&merging, black_box(&image)).unwrap();
            black_box(engine.process().unwrap())
        });
    });
}

fn bench_borders(c: &mut Criterion) {
    let zones = landscape().to_gray();
    c.bench_function("borders", |b| {
        b.iter(|| black_box(get_borders(black_box(&zones), 0, 2)))
    });
}

fn bench_framing(c: &mut Criterion) {
    let image = landscape();
    let config = FramingConfig::default();
    c.bench_function("framing_grid", |b| {
        b.iter(|| black_box(create_zones(black_box(&image), &config).unwrap()))
    });
}

criterion_group!(benches, bench_kmeans, bench_regions, bench_borders, bench_framing);
criterion_main!(benches);
