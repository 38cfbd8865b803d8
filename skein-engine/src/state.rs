//! Run-scoped execution state.
//!
//! Everything in this module lives for a single `run` call. The graph
//! itself is read-only while a run is in flight; pending inputs, visit
//! counters, and the work queues are created fresh every time, so
//! sequential runs on the same pipeline never see each other's state.

use skein_core::component::ValueMap;
use skein_core::types::ComponentId;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Mutable state shared by the acyclic runner and the cyclic subgraph
/// runner within one `run` call.
pub(crate) struct RunState {
    /// Accumulated inputs per component, indexed by component id.
    pub pending: Vec<ValueMap>,
    /// Visit counters per component, indexed by component id.
    pub visits: Vec<u32>,
    /// Last-produced outputs of components the caller asked to retain even
    /// though they are not leaves, keyed by component name.
    pub extra_outputs: BTreeMap<String, ValueMap>,
}

impl RunState {
    pub fn new(components: usize) -> Self {
        Self {
            pending: vec![ValueMap::new(); components],
            visits: vec![0; components],
            extra_outputs: BTreeMap::new(),
        }
    }
}

/// The run queue and waiting queue driving one scheduling loop, plus the
/// waiting-set snapshots used to detect stuck loops.
///
/// The acyclic runner and each cyclic subgraph activation own their own
/// `WorkQueue`; pending inputs and visit counters are shared through
/// [`RunState`].
pub(crate) struct WorkQueue {
    run: VecDeque<ComponentId>,
    waiting: Vec<ComponentId>,
    /// Waiting-set snapshot from the previous drain of the run queue.
    last_waiting: Option<BTreeSet<ComponentId>>,
    /// Waiting-set snapshot from the drain before that.
    before_last_waiting: Option<BTreeSet<ComponentId>>,
    /// Components force-enqueued out of the waiting queue since the last
    /// successful execution. Once every waiting component has been forced
    /// without progress, the loop is stuck.
    forced_since_progress: BTreeSet<ComponentId>,
}

impl WorkQueue {
    /// Create a queue seeded with the given execution order.
    pub fn seeded(order: impl IntoIterator<Item = ComponentId>) -> Self {
        Self {
            run: order.into_iter().collect(),
            waiting: Vec::new(),
            last_waiting: None,
            before_last_waiting: None,
            forced_since_progress: BTreeSet::new(),
        }
    }

    /// Pop the next scheduled component.
    pub fn pop(&mut self) -> Option<ComponentId> {
        self.run.pop_front()
    }

    /// Iterate the components currently scheduled to run.
    pub fn run_iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.run.iter().copied()
    }

    pub fn run_is_empty(&self) -> bool {
        self.run.is_empty()
    }

    pub fn waiting_is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// The components parked for lack of input, in parking order.
    pub fn waiting(&self) -> &[ComponentId] {
        &self.waiting
    }

    /// True when the component is in the run queue.
    pub fn run_contains(&self, id: ComponentId) -> bool {
        self.run.contains(&id)
    }

    /// Schedule a component: remove it from the waiting queue and append it
    /// to the run queue unless it is already scheduled.
    pub fn enqueue(&mut self, id: ComponentId) {
        self.unpark(id);
        if !self.run.contains(&id) {
            self.run.push_back(id);
        }
    }

    /// Schedule a component at the front of the run queue, removing it from
    /// both queues first. Used for greedy variadic receivers.
    pub fn enqueue_front(&mut self, id: ComponentId) {
        self.dequeue(id);
        self.run.push_front(id);
    }

    /// Remove a component from both queues.
    pub fn dequeue(&mut self, id: ComponentId) {
        self.run.retain(|c| *c != id);
        self.unpark(id);
    }

    /// Park a component in the waiting queue unless it is already there.
    pub fn park(&mut self, id: ComponentId) {
        if !self.waiting.contains(&id) {
            self.waiting.push(id);
        }
    }

    /// Remove a component from the waiting queue.
    pub fn unpark(&mut self, id: ComponentId) {
        self.waiting.retain(|c| *c != id);
    }

    /// Drop everything scheduled to run. The caller re-derives the next
    /// runnable set after a cyclic subgraph completes.
    pub fn clear_run(&mut self) {
        self.run.clear();
    }

    /// A component executed: reset the stuck detector to an unknown
    /// baseline.
    pub fn note_progress(&mut self) {
        self.last_waiting = None;
        self.before_last_waiting = None;
        self.forced_since_progress.clear();
    }

    /// Record that a component was force-enqueued out of the waiting queue.
    pub fn mark_forced(&mut self, id: ComponentId) {
        self.forced_since_progress.insert(id);
    }

    /// True when the component was already force-enqueued since the last
    /// successful execution.
    pub fn was_forced(&self, id: ComponentId) -> bool {
        self.forced_since_progress.contains(&id)
    }

    /// True when the waiting set has been identical across the two most
    /// recent drains of the run queue, i.e. no progress is being made.
    pub fn no_progress_repeating(&self) -> bool {
        match (&self.before_last_waiting, &self.last_waiting) {
            (Some(before), Some(last)) => before == last,
            _ => false,
        }
    }

    /// Record the current waiting set as the most recent snapshot.
    pub fn snapshot_waiting(&mut self) {
        self.before_last_waiting = self.last_waiting.take();
        self.last_waiting = Some(self.waiting.iter().copied().collect());
    }
}
