use std::rc::Rc;

use approx::assert_relative_eq;
use chart_plugin_bus::api::ChartHost;
use chart_plugin_bus::bus::PluginBus;
use chart_plugin_bus::core::{
    ChartId, HeadlessChart, LinearScale, ScaleOrientation, SeriesConfig,
};
use chart_plugin_bus::extensions::{
    CursorSnapshot, FocusSeriesKey, FocusSeriesMessage, FocusSeriesOptions, SeriesFocusTarget,
    cursor, cursor_snapshot, focus_series, focus_targets,
};
use chart_plugin_bus::interaction::{CursorState, PointerEventKind};
use proptest::prelude::*;

// Plot height 300 on a 0..100 y scale: value v is drawn at (100 - v) * 3.
fn chart(id: &str) -> Rc<HeadlessChart> {
    HeadlessChart::builder(id)
        .series(SeriesConfig::default())
        .series(SeriesConfig::labeled("cpu"))
        .series(SeriesConfig::labeled("mem"))
        .series(SeriesConfig::default())
        .data(vec![
            vec![Some(0.0), Some(1.0), Some(2.0)],
            vec![Some(50.0), Some(10.0), Some(90.0)],
            vec![Some(51.0), Some(80.0), None],
            vec![Some(20.0), Some(30.0), Some(40.0)],
        ])
        .scale(
            "x",
            LinearScale::new(0.0, 2.0)
                .expect("x scale")
                .with_orientation(ScaleOrientation::Horizontal),
        )
        .scale("y", LinearScale::new(0.0, 100.0).expect("y scale"))
        .build()
        .expect("chart")
}

fn mounted(chart: &Rc<HeadlessChart>, bus: &PluginBus) -> ChartHost {
    let mut host = ChartHost::builder(chart.clone())
        .bus(bus.clone())
        .plugin(cursor())
        .plugin(focus_series(FocusSeriesOptions::default()))
        .build();
    host.ready();
    host.run_microtasks();
    host
}

fn alphas(chart: &HeadlessChart) -> Vec<f64> {
    (1..=3)
        .map(|idx| chart.series_alpha(idx).expect("series alpha"))
        .collect()
}

fn hover(chart: &HeadlessChart, host: &mut ChartHost, idx: usize, top: f64) {
    chart.set_cursor(CursorState::at(idx, 10.0, top));
    chart.surface().dispatch(PointerEventKind::Enter);
    host.set_cursor();
}

#[test]
fn targets_within_threshold_use_labels_in_series_order() {
    let a = chart("a");
    let snapshot = CursorSnapshot {
        plot_id: ChartId::from("a"),
        idx: 0,
        x_value: 0.0,
        position: chart_plugin_bus::core::Position::new(10.0, 149.0),
        visible: true,
    };

    let targets = focus_targets(a.as_ref(), &snapshot, 5.0);
    assert_eq!(
        targets,
        vec![
            SeriesFocusTarget::Label("cpu".to_owned()),
            SeriesFocusTarget::Label("mem".to_owned()),
        ]
    );
    assert!(focus_targets(a.as_ref(), &snapshot, 0.5).is_empty());
}

#[test]
fn unlabeled_series_is_targeted_by_engine_index() {
    let a = chart("a");
    a.set_cursor(CursorState::at(0, 10.0, 241.0));
    let snapshot = cursor_snapshot(a.as_ref()).expect("snapshot");
    assert_eq!(
        focus_targets(a.as_ref(), &snapshot, 5.0),
        vec![SeriesFocusTarget::Index(3)]
    );
}

#[test]
fn hidden_series_and_gaps_are_never_targets() {
    let a = chart("a");
    a.set_series_show(1, false);
    a.set_cursor(CursorState::at(0, 10.0, 149.0));
    let snapshot = cursor_snapshot(a.as_ref()).expect("snapshot");
    assert_eq!(
        focus_targets(a.as_ref(), &snapshot, 5.0),
        vec![SeriesFocusTarget::Label("mem".to_owned())]
    );

    a.set_cursor(CursorState::at(2, 10.0, 30.0));
    let snapshot = cursor_snapshot(a.as_ref()).expect("snapshot");
    assert!(focus_targets(a.as_ref(), &snapshot, 1_000.0)
        .iter()
        .all(|target| *target != SeriesFocusTarget::Label("mem".to_owned())));
}

#[test]
fn hovering_source_chart_publishes_focus_and_dims_others() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = mounted(&a, &bus);

    hover(&a, &mut host, 1, 270.0);

    let focus = bus.read::<FocusSeriesKey>().expect("focus message");
    assert_eq!(focus.source_id, ChartId::from("a"));
    assert_eq!(focus.targets, vec![SeriesFocusTarget::Label("cpu".to_owned())]);
    assert_eq!(alphas(&a), vec![1.0, 0.1, 0.1]);
    assert_eq!(a.last_redraw(), Some(false));
}

#[test]
fn no_nearby_series_publishes_absence_and_restores_alpha() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = mounted(&a, &bus);

    hover(&a, &mut host, 1, 270.0);
    hover(&a, &mut host, 1, 5.0);

    assert_eq!(bus.read::<FocusSeriesKey>(), None);
    assert_eq!(alphas(&a), vec![1.0, 1.0, 1.0]);
}

#[test]
fn sibling_chart_mirrors_focus_from_the_bus() {
    let bus = PluginBus::new();
    let a = chart("a");
    let b = chart("b");
    let mut host_a = mounted(&a, &bus);
    let _host_b = mounted(&b, &bus);

    hover(&a, &mut host_a, 0, 241.0);

    assert_eq!(alphas(&b), vec![0.1, 0.1, 1.0]);
    assert_eq!(alphas(&a), alphas(&b));
}

#[test]
fn identical_focus_does_not_redraw_again() {
    let bus = PluginBus::new();
    let a = chart("a");
    let b = chart("b");
    let mut host_a = mounted(&a, &bus);
    let _host_b = mounted(&b, &bus);

    hover(&a, &mut host_a, 1, 270.0);
    let redraws_a = a.redraw_count();
    let redraws_b = b.redraw_count();

    a.set_cursor(CursorState::at(1, 12.0, 271.0));
    host_a.set_cursor();

    assert_eq!(a.redraw_count(), redraws_a);
    assert_eq!(b.redraw_count(), redraws_b);
}

#[test]
fn pointer_leave_clears_focus_everywhere() {
    let bus = PluginBus::new();
    let a = chart("a");
    let b = chart("b");
    let mut host_a = mounted(&a, &bus);
    let _host_b = mounted(&b, &bus);

    hover(&a, &mut host_a, 1, 270.0);
    a.surface().dispatch(PointerEventKind::Leave);

    assert_eq!(bus.read::<FocusSeriesKey>(), None);
    assert_eq!(alphas(&a), vec![1.0, 1.0, 1.0]);
    assert_eq!(alphas(&b), vec![1.0, 1.0, 1.0]);
}

#[test]
fn non_source_set_cursor_does_not_publish() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = mounted(&a, &bus);

    a.set_cursor(CursorState::at(1, 10.0, 270.0));
    host.set_cursor();

    assert_eq!(bus.read::<FocusSeriesKey>(), None);
    assert_eq!(a.redraw_count(), 0);
}

#[test]
fn custom_alphas_and_rebuild_flag_are_applied() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = ChartHost::builder(a.clone())
        .bus(bus.clone())
        .plugin(cursor())
        .plugin(focus_series(
            FocusSeriesOptions::default()
                .with_alphas(0.9, 0.25)
                .with_rebuild_paths(true),
        ))
        .build();
    host.ready();

    hover(&a, &mut host, 1, 270.0);

    let observed = alphas(&a);
    assert_relative_eq!(observed[0], 0.9);
    assert_relative_eq!(observed[1], 0.25);
    assert_eq!(a.last_redraw(), Some(true));
}

#[test]
fn seeded_focus_is_applied_on_mount() {
    let bus = PluginBus::new();
    bus.set::<FocusSeriesKey>(Some(FocusSeriesMessage {
        source_id: ChartId::from("elsewhere"),
        targets: vec![SeriesFocusTarget::ZeroIndex(1)],
    }));

    let a = chart("a");
    let _host = mounted(&a, &bus);
    assert_eq!(alphas(&a), vec![0.1, 1.0, 0.1]);
}

#[test]
fn deferred_reconcile_is_inert_after_destroy() {
    let bus = PluginBus::new();
    bus.set::<FocusSeriesKey>(Some(FocusSeriesMessage {
        source_id: ChartId::from("elsewhere"),
        targets: vec![SeriesFocusTarget::Index(2)],
    }));
    let a = chart("a");
    let mut host = ChartHost::builder(a.clone())
        .bus(bus.clone())
        .plugin(cursor())
        .plugin(focus_series(FocusSeriesOptions::default()))
        .build();
    host.ready();
    let redraws = a.redraw_count();
    host.destroy();

    assert_eq!(host.run_microtasks(), 1);
    assert_eq!(a.redraw_count(), redraws);
}

#[test]
fn without_cursor_plugin_focus_is_inert() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = ChartHost::builder(a.clone())
        .bus(bus.clone())
        .plugin(focus_series(FocusSeriesOptions::default()))
        .build();
    host.ready();

    hover(&a, &mut host, 1, 270.0);

    assert!(bus.keys().is_empty());
    assert_eq!(a.surface().listener_count(), 0);
    assert_eq!(a.redraw_count(), 0);
}

#[test]
fn destroy_detaches_leave_listener_and_effect() {
    let bus = PluginBus::new();
    let a = chart("a");
    let mut host = mounted(&a, &bus);
    let subscribers = bus.subscriber_count();
    assert!(subscribers > 0);

    host.destroy();
    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(a.surface().listener_count(), 0);
}

#[test]
fn options_deserialize_with_defaults() {
    let options: FocusSeriesOptions =
        serde_json::from_str(r#"{"px_threshold": 12.0}"#).expect("options json");
    assert_eq!(options.px_threshold, 12.0);
    assert_eq!(options.unfocused_alpha, 0.1);
    assert_eq!(options.focused_alpha, 1.0);
    assert!(!options.rebuild_paths);
}

proptest! {
    #[test]
    fn targets_are_sorted_and_within_threshold(
        values in proptest::collection::vec(0.0f64..100.0, 1..8),
        top in 0.0f64..300.0,
        threshold in 0.0f64..60.0,
    ) {
        let mut builder = HeadlessChart::builder("p").series(SeriesConfig::default());
        let mut data = vec![vec![Some(0.0)]];
        for value in &values {
            builder = builder.series(SeriesConfig::default());
            data.push(vec![Some(*value)]);
        }
        let chart = builder
            .data(data)
            .scale("y", LinearScale::new(0.0, 100.0).expect("y scale"))
            .build()
            .expect("chart");
        chart.set_cursor(CursorState::at(0, 0.0, top));
        let snapshot = cursor_snapshot(chart.as_ref()).expect("snapshot");

        let targets = focus_targets(chart.as_ref(), &snapshot, threshold);
        let indices: Vec<usize> = targets
            .iter()
            .map(|target| match target {
                SeriesFocusTarget::Index(idx) => *idx,
                other => panic!("unexpected target {other:?}"),
            })
            .collect();

        prop_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        for (offset, value) in values.iter().enumerate() {
            let y = (1.0 - value / 100.0) * 300.0;
            let expected = (y - top).abs() <= threshold;
            prop_assert_eq!(indices.contains(&(offset + 1)), expected);
        }
    }
}
