//! Change notification: stage events and the listener list that delivers them.
//!
//! Delivery is synchronous. While the notifier is suspended, events are
//! queued with duplicates dropped, and the queue is flushed in order when the
//! outermost suspension ends. A batch of configuration edits therefore
//! produces a single [`StageEvent::ConfigurationChanged`].

use crate::matrix::ElementType;
use std::fmt;

/// Something observable changed on a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageEvent {
    /// Anchor mode or per-dimension bounds were edited.
    ConfigurationChanged,

    /// The number of configured dimensions followed the input.
    ShapeChanged { old_len: usize, new_len: usize },

    /// The output buffer changed shape or element type.
    OutputPropertiesChanged {
        shape: Vec<usize>,
        element_type: ElementType,
    },
}

/// Handle returned by [`Notifier::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&StageEvent)>;

/// Listener list with suspend-then-fire-once batching.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
    suspended: usize,
    pending: Vec<StageEvent>,
}

impl Notifier {
    /// A notifier with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it is called for every event from now on.
    pub fn subscribe(&mut self, listener: impl FnMut(&StageEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver `event`, or queue it while suspended.
    pub fn notify(&mut self, event: StageEvent) {
        if self.suspended > 0 {
            if !self.pending.contains(&event) {
                self.pending.push(event);
            }
            return;
        }
        self.emit(&event);
    }

    /// Hold events until the matching [`resume`](Self::resume).
    ///
    /// Suspensions nest.
    pub fn suspend(&mut self) {
        self.suspended += 1;
    }

    /// End one suspension, flushing queued events when it was the last.
    pub fn resume(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
        if self.suspended == 0 {
            for event in std::mem::take(&mut self.pending) {
                self.emit(&event);
            }
        }
    }

    /// Drop every queued event without delivering it.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Whether events are currently being held back.
    pub fn is_suspended(&self) -> bool {
        self.suspended > 0
    }

    fn emit(&mut self, event: &StageEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .field("suspended", &self.suspended)
            .field("pending", &self.pending)
            .finish()
    }
}
