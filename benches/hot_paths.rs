use cattle_risk_map::data::{CountryRecord, RiskTable};
use cattle_risk_map::figure::build_figure;
use cattle_risk_map::map::{ChoroplethRenderer, Viewport};
use cattle_risk_map::risk::{normalize, Taxonomy};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A grid of jagged country-sized polygons covering the inhabited latitudes
fn synthetic_table() -> RiskTable {
    let mut records = Vec::new();
    for i in 0..36 {
        for j in 0..14 {
            let lon = -180.0 + i as f64 * 10.0;
            let lat = -60.0 + j as f64 * 10.0;
            let mut ring: Vec<(f64, f64)> = (0..64)
                .map(|k| {
                    let t = k as f64 / 64.0 * std::f64::consts::TAU;
                    let r = 4.0 + (k % 3) as f64 * 0.5;
                    (lon + 5.0 + r * t.cos(), lat + 5.0 + r * t.sin())
                })
                .collect();
            ring.push(ring[0]);
            let n = records.len();
            records.push(CountryRecord {
                country: format!("Country {n}"),
                iso3: format!("C{n:02}"),
                bbox: Some((lon + 0.5, lat + 0.5, lon + 9.5, lat + 9.5)),
                polygons: vec![vec![ring]],
                cumulative_contribution: (n % 5 != 0).then_some(n as f64 / 5.04),
                aggregated_category: Some(if n % 2 == 0 { "at-risk country" } else { "DCF country" }.to_string()),
                detailed_category: Some("At risk of ecosystem conversion".to_string()),
                ..CountryRecord::default()
            });
        }
    }
    let mut table = RiskTable::new(records);
    normalize(&mut table);
    table
}

fn bench_build_figure(c: &mut Criterion) {
    let table = synthetic_table();
    c.bench_function("build_figure_detailed", |b| {
        b.iter(|| build_figure(black_box(&table), black_box(50.0), Taxonomy::Detailed))
    });
}

fn bench_render(c: &mut Criterion) {
    let table = synthetic_table();
    let figure = build_figure(&table, 100.001, Taxonomy::Aggregated);
    let renderer = ChoroplethRenderer::new();

    let world = Viewport::world(400, 200);
    c.bench_function("render_world_200x50", |b| {
        b.iter(|| renderer.render(&table, &figure, None, 200, 50, black_box(&world)))
    });

    let zoomed = Viewport::new(-55.0, -10.0, 6.0, 400, 200);
    c.bench_function("render_zoomed_200x50", |b| {
        b.iter(|| renderer.render(&table, &figure, None, 200, 50, black_box(&zoomed)))
    });
}

criterion_group!(benches, bench_build_figure, bench_render);
criterion_main!(benches);
