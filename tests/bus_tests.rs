use std::cell::RefCell;
use std::rc::Rc;

use chart_plugin_bus::bus::{BusKey, BusPath, Merge, PluginBus};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Default)]
struct Pair {
    left: u32,
    right: u32,
}

#[derive(Debug, Default)]
struct PairPatch {
    left: Option<u32>,
    right: Option<u32>,
}

impl Merge for Pair {
    type Patch = PairPatch;

    fn merge(&mut self, patch: PairPatch) -> SmallVec<[&'static str; 4]> {
        let mut touched = SmallVec::new();
        if let Some(left) = patch.left {
            self.left = left;
            touched.push("left");
        }
        if let Some(right) = patch.right {
            self.right = right;
            touched.push("right");
        }
        touched
    }
}

struct PairKey;

impl BusKey for PairKey {
    const NAME: &'static str = "pair";
    type Message = Pair;
}

struct Label;

impl BusKey for Label {
    const NAME: &'static str = "label";
    type Message = String;
}

fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(&PluginBus)>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let shared = Rc::clone(&log);
    let make = move |tag: &'static str| -> Box<dyn Fn(&PluginBus)> {
        let log = Rc::clone(&shared);
        Box::new(move |_: &PluginBus| log.borrow_mut().push(tag))
    };
    (log, make)
}

#[test]
fn absent_key_reads_none_and_set_none_removes_slot() {
    let bus = PluginBus::new();
    assert_eq!(bus.read::<Label>(), None);
    assert!(!bus.contains::<Label>());

    bus.set::<Label>(Some("hello".to_owned()));
    assert_eq!(bus.read::<Label>().as_deref(), Some("hello"));
    assert_eq!(bus.keys(), vec!["label"]);

    bus.set::<Label>(None);
    assert!(!bus.contains::<Label>());
    assert!(bus.keys().is_empty());
}

#[test]
fn merge_notifies_only_subscribers_of_assigned_fields() {
    let bus = PluginBus::new();
    bus.set::<PairKey>(Some(Pair::default()));

    let (log, make) = recorder();
    let _left = bus.subscribe_path(BusPath::new("pair", &["left"]), make("left"));
    let _right = bus.subscribe_path(BusPath::new("pair", &["right"]), make("right"));
    let _whole = bus.subscribe::<PairKey>(make("whole"));

    bus.merge::<PairKey>(PairPatch {
        left: Some(3),
        right: None,
    });

    assert_eq!(*log.borrow(), vec!["left", "whole"]);
    assert_eq!(
        bus.read::<PairKey>(),
        Some(Pair { left: 3, right: 0 })
    );
}

#[test]
fn merge_into_absent_slot_starts_from_default_and_notifies_whole_key() {
    let bus = PluginBus::new();
    let (log, make) = recorder();
    let _right = bus.subscribe_path(BusPath::new("pair", &["right"]), make("right"));

    bus.merge::<PairKey>(PairPatch {
        left: Some(1),
        right: None,
    });

    assert_eq!(bus.read::<PairKey>(), Some(Pair { left: 1, right: 0 }));
    assert_eq!(*log.borrow(), vec!["right"]);
}

#[test]
fn write_path_reaches_prefix_and_exact_subscribers_only() {
    let bus = PluginBus::new();
    bus.set::<PairKey>(Some(Pair::default()));

    let (log, make) = recorder();
    let _whole = bus.subscribe::<PairKey>(make("whole"));
    let _left = bus.subscribe_path(BusPath::new("pair", &["left"]), make("left"));
    let _right = bus.subscribe_path(BusPath::new("pair", &["right"]), make("right"));

    bus.write_path::<PairKey>(&["right"], |pair| pair.right = 9);
    assert_eq!(*log.borrow(), vec!["whole", "right"]);
}

#[test]
fn batch_coalesces_repeated_writes_into_one_notification() {
    let bus = PluginBus::new();
    let (log, make) = recorder();
    let _sub = bus.subscribe::<Label>(make("label"));

    bus.batch(|| {
        bus.set::<Label>(Some("a".to_owned()));
        bus.set::<Label>(Some("b".to_owned()));
        bus.set::<Label>(Some("c".to_owned()));
        assert!(log.borrow().is_empty());
    });

    assert_eq!(*log.borrow(), vec!["label"]);
    assert_eq!(bus.read::<Label>().as_deref(), Some("c"));
}

#[test]
fn update_sees_previous_value() {
    let bus = PluginBus::new();
    bus.set::<Label>(Some("a".to_owned()));
    bus.update::<Label>(|previous| previous.map(|value| format!("{value}b")));
    assert_eq!(bus.read::<Label>().as_deref(), Some("ab"));
}

#[test]
fn effect_runs_immediately_and_retracks_dependencies() {
    let bus = PluginBus::new();
    bus.set::<Label>(Some("pair".to_owned()));
    let runs = Rc::new(RefCell::new(Vec::new()));

    let seen = Rc::clone(&runs);
    let _effect = bus.create_effect(move |bus| {
        let label = bus.read::<Label>();
        let left = if label.is_some() {
            bus.select::<PairKey, _>(&["left"], |pair| Some(pair.left))
        } else {
            None
        };
        seen.borrow_mut().push((label, left));
    });
    assert_eq!(runs.borrow().len(), 1);

    bus.set::<PairKey>(Some(Pair { left: 2, right: 0 }));
    assert_eq!(runs.borrow().len(), 2);

    // Stops reading `pair` once the label is gone.
    bus.set::<Label>(None);
    assert_eq!(runs.borrow().len(), 3);
    bus.set::<PairKey>(Some(Pair { left: 5, right: 0 }));
    assert_eq!(runs.borrow().len(), 3);

    assert_eq!(
        runs.borrow().last().cloned(),
        Some((None, None))
    );
}

#[test]
fn effect_selecting_a_field_ignores_sibling_writes() {
    let bus = PluginBus::new();
    bus.set::<PairKey>(Some(Pair::default()));
    let runs = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&runs);
    let _effect = bus.create_effect(move |bus| {
        let _ = bus.select::<PairKey, _>(&["left"], |pair| Some(pair.left));
        *counter.borrow_mut() += 1;
    });

    bus.merge::<PairKey>(PairPatch {
        left: None,
        right: Some(4),
    });
    assert_eq!(*runs.borrow(), 1);

    bus.merge::<PairKey>(PairPatch {
        left: Some(4),
        right: None,
    });
    assert_eq!(*runs.borrow(), 2);
}

#[test]
fn subscriber_dropped_during_delivery_is_skipped() {
    let bus = PluginBus::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let victim = Rc::new(RefCell::new(None));

    let first_log = Rc::clone(&log);
    let first_victim = Rc::clone(&victim);
    let _first = bus.subscribe::<Label>(move |_| {
        first_log.borrow_mut().push("first");
        first_victim.borrow_mut().take();
    });

    let second_log = Rc::clone(&log);
    *victim.borrow_mut() = Some(bus.subscribe::<Label>(move |_| {
        second_log.borrow_mut().push("second");
    }));

    bus.set::<Label>(Some("x".to_owned()));
    assert_eq!(*log.borrow(), vec!["first"]);
    assert_eq!(bus.subscriber_count(), 1);
}

#[test]
fn clones_share_one_store() {
    let bus = PluginBus::new();
    let other = bus.clone();
    other.set::<Label>(Some("shared".to_owned()));

    assert!(bus.ptr_eq(&other));
    assert!(!bus.ptr_eq(&PluginBus::new()));
    assert_eq!(bus.read::<Label>().as_deref(), Some("shared"));
}

#[test]
fn batch_touching_two_fields_notifies_whole_key_subscriber_once() {
    let bus = PluginBus::new();
    bus.set::<PairKey>(Some(Pair::default()));

    let (log, make) = recorder();
    let _whole = bus.subscribe::<PairKey>(make("whole"));
    let _left = bus.subscribe_path(BusPath::new("pair", &["left"]), make("left"));
    let _right = bus.subscribe_path(BusPath::new("pair", &["right"]), make("right"));

    bus.batch(|| {
        bus.merge::<PairKey>(PairPatch {
            left: Some(1),
            right: None,
        });
        bus.write_path::<PairKey>(&["right"], |pair| pair.right = 2);
    });

    assert_eq!(*log.borrow(), vec!["whole", "left", "right"]);
}
