//! Reactive message bus shared by chart plugins.
//!
//! A bus holds one message per key. Keys are declared statically with
//! [`BusKey`], so every slot has exactly one message type. Writers replace,
//! merge, or write a nested path; readers subscribe to a key or to a nested
//! path and are notified only when a write can change what they see.
//!
//! # Invariants
//!
//! 1. Writes to a key are applied in call order.
//! 2. Writing a value equal to the current one is a no-op with no
//!    notification.
//! 3. Subscribers are notified in registration order. Notifications raised
//!    while a notification is running are queued and delivered afterwards.
//! 4. A write at path `P` notifies subscribers whose path is a prefix of `P`
//!    or has `P` as a prefix, and nobody else. A subscriber overlapping
//!    several paths dirtied in the same round (e.g. one batch) is notified
//!    once.
//! 5. Dropping a [`Subscription`] removes the callback before the next
//!    delivery.
//!
//! The bus is single-threaded (`Rc`) and cheap to clone; clones share state.

mod path;
mod tasks;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::{SmallVec, smallvec};
use tracing::{trace, warn};

pub use path::BusPath;
pub use tasks::TaskQueue;

/// Static declaration of one bus slot.
pub trait BusKey: 'static {
    const NAME: &'static str;
    type Message: Clone + PartialEq + fmt::Debug + 'static;
}

/// Shallow merge of a partial update into a message.
pub trait Merge {
    type Patch;

    /// Applies `patch` and returns the names of the fields it assigned.
    fn merge(&mut self, patch: Self::Patch) -> SmallVec<[&'static str; 4]>;
}

type Callback = Rc<dyn Fn(&PluginBus)>;
type Paths = SmallVec<[BusPath; 2]>;

struct Subscriber {
    id: u64,
    paths: Paths,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    slots: RefCell<IndexMap<&'static str, Box<dyn Any>>>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<BusPath>>,
    flushing: Cell<bool>,
    batch_depth: Cell<usize>,
    tracking: RefCell<Vec<Paths>>,
}

#[derive(Clone, Default)]
pub struct PluginBus {
    inner: Rc<BusInner>,
}

impl PluginBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when both handles point at the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current message of `K`. Inside an effect, tracks the whole key.
    #[must_use]
    pub fn read<K: BusKey>(&self) -> Option<K::Message> {
        self.track(BusPath::key(K::NAME));
        self.load::<K>()
    }

    #[must_use]
    pub fn contains<K: BusKey>(&self) -> bool {
        self.track(BusPath::key(K::NAME));
        self.inner.slots.borrow().contains_key(K::NAME)
    }

    /// Projects a nested part of `K`. Inside an effect, tracks only `path`.
    pub fn select<K: BusKey, R>(
        &self,
        path: &[&str],
        project: impl FnOnce(&K::Message) -> Option<R>,
    ) -> Option<R> {
        self.track(BusPath::new(K::NAME, path));
        let message = self.load::<K>()?;
        project(&message)
    }

    /// Replaces the message of `K`; `None` removes the slot.
    pub fn set<K: BusKey>(&self, value: Option<K::Message>) {
        self.store::<K>(value, smallvec![BusPath::key(K::NAME)]);
    }

    /// Replaces the message of `K` with a value computed from the previous one.
    pub fn update<K: BusKey>(&self, updater: impl FnOnce(Option<K::Message>) -> Option<K::Message>) {
        let next = updater(self.load::<K>());
        self.set::<K>(next);
    }

    /// Shallow-merges `patch` into `K`, leaving untouched fields intact.
    ///
    /// Only subscribers of the assigned fields (and of the whole key) are
    /// notified. A missing slot starts from `Default`.
    pub fn merge<K: BusKey>(&self, patch: <K::Message as Merge>::Patch)
    where
        K::Message: Merge + Default,
    {
        let previous = self.load::<K>();
        let existed = previous.is_some();
        let mut next = previous.unwrap_or_default();
        let touched = next.merge(patch);

        let dirty: Paths = if existed {
            touched
                .iter()
                .map(|field| BusPath::key(K::NAME).child(*field))
                .collect()
        } else {
            smallvec![BusPath::key(K::NAME)]
        };
        self.store::<K>(Some(next), dirty);
    }

    /// Mutates the value at `path` inside `K`.
    ///
    /// `writer` must confine itself to `path`; only subscribers overlapping
    /// `path` are notified. A missing slot starts from `Default`.
    pub fn write_path<K: BusKey>(&self, path: &[&str], writer: impl FnOnce(&mut K::Message))
    where
        K::Message: Default,
    {
        let previous = self.load::<K>();
        let existed = previous.is_some();
        let mut next = previous.unwrap_or_default();
        writer(&mut next);

        let dirty = if existed {
            BusPath::new(K::NAME, path)
        } else {
            BusPath::key(K::NAME)
        };
        self.store::<K>(Some(next), smallvec![dirty]);
    }

    /// Defers notifications until `f` returns, delivering each dirty path once.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.batch_depth.set(self.inner.batch_depth.get() + 1);
        let result = f();
        self.inner.batch_depth.set(self.inner.batch_depth.get() - 1);
        self.flush();
        result
    }

    pub fn subscribe<K: BusKey>(&self, callback: impl Fn(&PluginBus) + 'static) -> Subscription {
        self.subscribe_path(BusPath::key(K::NAME), callback)
    }

    pub fn subscribe_path(
        &self,
        path: BusPath,
        callback: impl Fn(&PluginBus) + 'static,
    ) -> Subscription {
        let id = self.allocate_id();
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            paths: smallvec![path],
            callback: Rc::new(callback),
        });
        Subscription::new(id, &self.inner)
    }

    /// Runs `effect` now and again whenever anything it read changes.
    ///
    /// Dependencies are re-tracked on every run, so an effect that stops
    /// reading a key stops hearing about it. The effect receives the bus;
    /// capturing a bus clone inside it would keep the store alive until the
    /// subscription is dropped.
    pub fn create_effect(&self, effect: impl Fn(&PluginBus) + 'static) -> Subscription {
        let id = self.allocate_id();
        let effect = Rc::new(effect);
        let rerun = Rc::clone(&effect);
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            paths: SmallVec::new(),
            callback: Rc::new(move |bus: &PluginBus| bus.run_effect(id, rerun.as_ref())),
        });
        self.run_effect(id, effect.as_ref());
        Subscription::new(id, &self.inner)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        self.inner.slots.borrow().keys().copied().collect()
    }

    fn allocate_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    fn load<K: BusKey>(&self) -> Option<K::Message> {
        let slots = self.inner.slots.borrow();
        let slot = slots.get(K::NAME)?;
        let message = slot.downcast_ref::<K::Message>();
        if message.is_none() {
            warn!(key = K::NAME, "bus slot holds a different message type");
        }
        message.cloned()
    }

    fn store<K: BusKey>(&self, value: Option<K::Message>, dirty: Paths) {
        let unchanged = {
            let slots = self.inner.slots.borrow();
            let current = slots
                .get(K::NAME)
                .and_then(|slot| slot.downcast_ref::<K::Message>());
            current == value.as_ref() && slots.contains_key(K::NAME) == value.is_some()
        };
        if unchanged {
            trace!(key = K::NAME, "skip unchanged bus write");
            return;
        }

        {
            let mut slots = self.inner.slots.borrow_mut();
            match value {
                Some(message) => {
                    slots.insert(K::NAME, Box::new(message));
                }
                None => {
                    slots.shift_remove(K::NAME);
                }
            }
        }

        {
            let mut pending = self.inner.pending.borrow_mut();
            for path in dirty {
                trace!(path = %path, "bus write");
                if !pending.contains(&path) {
                    pending.push_back(path);
                }
            }
        }
        self.flush();
    }

    fn track(&self, path: BusPath) {
        let mut tracking = self.inner.tracking.borrow_mut();
        let Some(frame) = tracking.last_mut() else {
            return;
        };
        if !frame.contains(&path) {
            frame.push(path);
        }
    }

    fn run_effect(&self, id: u64, effect: &dyn Fn(&PluginBus)) {
        self.inner.tracking.borrow_mut().push(SmallVec::new());
        effect(self);
        let tracked = self.inner.tracking.borrow_mut().pop().unwrap_or_default();

        if let Some(subscriber) = self
            .inner
            .subscribers
            .borrow_mut()
            .iter_mut()
            .find(|subscriber| subscriber.id == id)
        {
            subscriber.paths = tracked;
        }
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .any(|subscriber| subscriber.id == id)
    }

    fn flush(&self) {
        if self.inner.batch_depth.get() > 0 || self.inner.flushing.get() {
            return;
        }
        self.inner.flushing.set(true);

        loop {
            let dirty: Paths = self.inner.pending.borrow_mut().drain(..).collect();
            if dirty.is_empty() {
                break;
            }

            // One callback per subscriber per round, however many dirty
            // paths it overlaps.
            let targets: SmallVec<[(u64, Callback); 4]> = self
                .inner
                .subscribers
                .borrow()
                .iter()
                .filter(|subscriber| {
                    subscriber
                        .paths
                        .iter()
                        .any(|p| dirty.iter().any(|path| p.overlaps(path)))
                })
                .map(|subscriber| (subscriber.id, Rc::clone(&subscriber.callback)))
                .collect();
            trace!(paths = dirty.len(), subscribers = targets.len(), "bus flush round");

            for (id, callback) in targets {
                if self.is_subscribed(id) {
                    callback(self);
                }
            }
        }

        self.inner.flushing.set(false);
    }
}

impl fmt::Debug for PluginBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBus")
            .field("keys", &self.keys())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registration guard returned by subscriptions and effects.
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    fn new(id: u64, bus: &Rc<BusInner>) -> Self {
        Self {
            id,
            bus: Rc::downgrade(bus),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|inner| {
            inner
                .subscribers
                .borrow()
                .iter()
                .any(|subscriber| subscriber.id == self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            // Take the callback out before dropping it: its captures may own
            // other subscriptions whose drop borrows the list again.
            let removed = {
                let mut subscribers = inner.subscribers.borrow_mut();
                subscribers
                    .iter()
                    .position(|subscriber| subscriber.id == self.id)
                    .map(|position| subscribers.remove(position))
            };
            drop(removed);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
