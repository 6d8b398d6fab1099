use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

/// Engine cursor state as reported by a chart handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    /// Closest index into the x series, if the cursor resolved one.
    pub idx: Option<usize>,
    /// Offset within the plotting area, in CSS pixels.
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub show: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            idx: None,
            left: None,
            top: None,
            show: true,
        }
    }
}

impl CursorState {
    #[must_use]
    pub fn at(idx: usize, left: f64, top: f64) -> Self {
        Self {
            idx: Some(idx),
            left: Some(left),
            top: Some(top),
            show: true,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.show = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type PointerListener = Rc<dyn Fn(PointerEventKind)>;

struct ListenerEntry {
    id: ListenerId,
    kind: PointerEventKind,
    listener: PointerListener,
}

/// Interaction surface over a chart's plotting area.
///
/// Listeners are invoked in registration order. Dispatch snapshots the
/// listener list first, so listeners may add or remove listeners while
/// running.
#[derive(Default)]
pub struct PointerSurface {
    listeners: RefCell<Vec<ListenerEntry>>,
    next_id: Cell<u64>,
}

impl PointerSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, kind: PointerEventKind, listener: PointerListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(ListenerEntry { id, kind, listener });
        id
    }

    /// Removes a listener. Returns `true` when it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|entry| entry.id == id) {
            Some(position) => {
                listeners.remove(position);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[must_use]
    pub fn listener_count_for(&self, kind: PointerEventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    pub fn dispatch(&self, kind: PointerEventKind) {
        let targets: SmallVec<[(ListenerId, PointerListener); 4]> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| (entry.id, Rc::clone(&entry.listener)))
            .collect();
        trace!(?kind, listeners = targets.len(), "dispatch pointer event");

        for (id, listener) in targets {
            let still_registered = self.listeners.borrow().iter().any(|entry| entry.id == id);
            if still_registered {
                listener(kind);
            }
        }
    }
}

impl fmt::Debug for PointerSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerSurface")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
