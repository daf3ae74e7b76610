//! Benchmarks pour la classification des points clients

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{polygon, MultiPolygon};
use zonage::classify::classify;
use zonage::{CustomerPoint, SelectionSet, Tier, Zone, ZoneCatalog, ZoneRecord};

/// Grille de `n × n` zones de base de 1° de côté
fn grid_catalog(n: usize) -> ZoneCatalog {
    let mut records = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f64, j as f64);
            records.push(ZoneRecord {
                raw_key: format!("W{}", i * n + j),
                label: String::new(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: x, y: y),
                    (x: x + 1.0, y: y),
                    (x: x + 1.0, y: y + 1.0),
                    (x: x, y: y + 1.0)
                ]]),
            });
        }
    }

    let mut catalog = ZoneCatalog::new();
    catalog.load(Tier::Base, "Monday", records);
    catalog
}

/// Points pseudo-aléatoires déterministes dans la grille
fn points(count: usize, extent: f64) -> Vec<CustomerPoint> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 1_000_000) as f64 / 1_000_000.0 * extent
    };
    (0..count)
        .filter_map(|_| {
            let lng = next();
            let lat = next();
            CustomerPoint::new(lat, lng, "")
        })
        .collect()
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for size in [10usize, 30] {
        let catalog = grid_catalog(size);
        let keys: Vec<String> = (0..size * size).step_by(3).map(|k| format!("W{}", k)).collect();
        let resolution = zonage::selection::resolve(&SelectionSet::from_keys(&keys), &catalog);
        let visible: Vec<&Zone> = resolution.visible_zones(&catalog).collect();
        let selected: Vec<&Zone> = resolution.selected_zones(&catalog).collect();
        let customers = points(5_000, size as f64);

        group.throughput(Throughput::Elements(customers.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size * size), &customers, |b, pts| {
            b.iter(|| black_box(classify(black_box(pts), &visible, &selected)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
