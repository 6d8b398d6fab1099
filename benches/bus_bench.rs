use std::hint::black_box;
use std::rc::Rc;

use chart_plugin_bus::api::ChartHost;
use chart_plugin_bus::bus::{BusKey, BusPath, PluginBus};
use chart_plugin_bus::core::{HeadlessChart, LinearScale, SeriesConfig};
use chart_plugin_bus::extensions::{
    FocusSeriesOptions, cursor, cursor_snapshot, focus_series, focus_targets,
};
use chart_plugin_bus::interaction::{CursorState, PointerEventKind};
use criterion::{Criterion, criterion_group, criterion_main};

struct Tick;

impl BusKey for Tick {
    const NAME: &'static str = "tick";
    type Message = u64;
}

fn wide_chart(id: &str, series: usize, points: usize) -> Rc<HeadlessChart> {
    let mut builder = HeadlessChart::builder(id).series(SeriesConfig::default());
    let mut data = vec![(0..points).map(|i| Some(i as f64)).collect::<Vec<_>>()];
    for s in 0..series {
        builder = builder.series(SeriesConfig::default());
        data.push(
            (0..points)
                .map(|i| Some(((i * 7 + s * 13) % 100) as f64))
                .collect(),
        );
    }
    builder
        .data(data)
        .scale("y", LinearScale::new(0.0, 100.0).expect("valid scale"))
        .build()
        .expect("valid chart")
}

fn bench_bus_fan_out_100_subscribers(c: &mut Criterion) {
    let bus = PluginBus::new();
    let subscriptions: Vec<_> = (0..100)
        .map(|i| {
            let path = BusPath::new("tick", &[]).child(format!("{}", i % 4));
            bus.subscribe_path(path, |bus| {
                black_box(bus.read::<Tick>());
            })
        })
        .collect();

    let mut value = 0_u64;
    c.bench_function("bus_fan_out_100_subscribers", |b| {
        b.iter(|| {
            value += 1;
            bus.set::<Tick>(Some(black_box(value)));
        })
    });
    drop(subscriptions);
}

fn bench_focus_targets_64_series(c: &mut Criterion) {
    let chart = wide_chart("bench", 64, 1_000);
    chart.set_cursor(CursorState::at(500, 0.0, 150.0));
    let snapshot = cursor_snapshot(chart.as_ref()).expect("cursor snapshot");

    c.bench_function("focus_targets_64_series", |b| {
        b.iter(|| focus_targets(chart.as_ref(), black_box(&snapshot), 5.0))
    });
}

fn bench_synced_cursor_move_4_charts(c: &mut Criterion) {
    let bus = PluginBus::new();
    let charts: Vec<_> = (0..4)
        .map(|i| wide_chart(&format!("chart-{i}"), 8, 1_000))
        .collect();
    let mut hosts: Vec<ChartHost> = charts
        .iter()
        .map(|chart| {
            let mut host = ChartHost::new(
                chart.clone(),
                vec![cursor(), focus_series(FocusSeriesOptions::default())],
                Some(bus.clone()),
            );
            host.ready();
            host
        })
        .collect();
    charts[0].surface().dispatch(PointerEventKind::Enter);

    let mut idx = 0_usize;
    c.bench_function("synced_cursor_move_4_charts", |b| {
        b.iter(|| {
            idx = (idx + 1) % 1_000;
            charts[0].set_cursor(CursorState::at(idx, 0.0, 150.0));
            hosts[0].set_cursor();
        })
    });
    for host in &mut hosts {
        host.destroy();
    }
}

criterion_group!(
    benches,
    bench_bus_fan_out_100_subscribers,
    bench_focus_targets_64_series,
    bench_synced_cursor_move_4_charts
);
criterion_main!(benches);
