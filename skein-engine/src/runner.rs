//! The pipeline: component registration, input validation, and the
//! acyclic runner.
//!
//! `run` builds and validates the input state, breaks cycles, orders the
//! acyclic skeleton, and then drains the run queue: components that are
//! part of a cycle are handed to the cyclic subgraph runner, everything
//! else runs directly and has its outputs distributed downstream. The run
//! ends when both the run queue and the waiting queue are empty, or when
//! the stuck-loop detector gives up and returns partial outputs.

use crate::cycles::break_cycles;
use crate::graph::PipelineGraph;
use crate::schedule::{
    add_missing_defaults, distribute_output, has_enough_inputs, is_stuck, next_defaulted_or_lazy,
    next_runnable, starved_receivers,
};
use crate::state::{RunState, WorkQueue};
use skein_core::component::{Component, ValueMap};
use skein_core::error::{Result, SkeinError};
use skein_core::types::ComponentId;
use skein_core::value::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

/// Final pipeline outputs: each component's contribution, keyed by
/// component name.
pub type PipelineOutputs = BTreeMap<String, ValueMap>;

/// Default per-component visit cap, guarding against runaway cycles.
pub const DEFAULT_MAX_RUNS_PER_COMPONENT: u32 = 100;

/// A runnable component graph.
///
/// The graph structure is configured once through [`Pipeline::add_component`]
/// and [`Pipeline::connect`] and is read-only while a run is in flight; all
/// mutable run state is scoped to a single [`Pipeline::run`] call, so
/// sequential runs on the same instance are independent.
pub struct Pipeline {
    graph: PipelineGraph,
    max_runs_per_component: u32,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create an empty pipeline with the default visit cap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: PipelineGraph::new(),
            max_runs_per_component: DEFAULT_MAX_RUNS_PER_COMPONENT,
        }
    }

    /// Set the per-component visit cap.
    ///
    /// With a cap of `n`, the `n + 1`-th attempted visit of any single
    /// component within one run fails with
    /// [`SkeinError::MaxRunsExceeded`].
    #[must_use]
    pub fn with_max_runs_per_component(mut self, max_runs: u32) -> Self {
        self.max_runs_per_component = max_runs;
        self
    }

    /// Register a uniquely-named component.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        instance: Box<dyn Component>,
    ) -> Result<ComponentId> {
        self.graph.add_component(name, instance)
    }

    /// Connect a sender output to a receiver input, both written as
    /// `"component.socket"`.
    pub fn connect(&mut self, sender: &str, receiver: &str) -> Result<()> {
        self.graph.connect(sender, receiver)
    }

    /// The underlying graph, for structural queries.
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Warm up every component once, before the first run.
    ///
    /// `run` assumes warm-up has already happened; components that load
    /// resources lazily should do so here.
    pub fn warm_up(&mut self) -> Result<()> {
        self.graph.warm_up()
    }

    /// Run the pipeline with the given inputs.
    ///
    /// `data` maps component names to that component's input-socket values.
    /// Returns the outputs of leaf components, plus any output key that had
    /// no registered receiver.
    pub fn run(&self, data: BTreeMap<String, ValueMap>) -> Result<PipelineOutputs> {
        self.run_with_outputs(data, &BTreeSet::new())
    }

    /// Run the pipeline with a flat input map.
    ///
    /// Each key names an input socket rather than a component; the value is
    /// routed to every component declaring an unconnected input socket of
    /// that name. Keys that match nothing are logged and dropped.
    pub fn run_flat(&self, data: ValueMap) -> Result<PipelineOutputs> {
        self.run(self.expand_flat_inputs(data))
    }

    /// Run the pipeline, additionally retaining the last-produced outputs
    /// of the named components even if they are not leaves.
    #[instrument(
        skip(self, data, include_outputs_from),
        fields(
            components = self.graph.len(),
            max_runs_per_component = self.max_runs_per_component,
        )
    )]
    pub fn run_with_outputs(
        &self,
        data: BTreeMap<String, ValueMap>,
        include_outputs_from: &BTreeSet<String>,
    ) -> Result<PipelineOutputs> {
        self.validate_input(&data)?;

        let analysis = break_cycles(&self.graph)?;
        let mut state = RunState::new(self.graph.len());
        self.seed_inputs(data, &mut state);

        let order = self.graph.topological_sort(analysis.removed_connections());
        let mut queue = WorkQueue::seeded(order);
        let mut final_outputs = PipelineOutputs::new();

        while let Some(id) = queue.pop() {
            let node = self.graph.node(id);

            if node.is_lazy_variadic()
                && !queue
                    .run_iter()
                    .all(|other| self.graph.node(other).is_lazy_variadic())
            {
                // Ordinary components still scheduled may feed this one.
                queue.park(id);
            } else if has_enough_inputs(&self.graph, id, &state.pending)
                && !analysis.cycles_of(id).is_empty()
            {
                // Cycle-affiliated: hand the first cycle to the subgraph
                // runner, which loops it to convergence.
                let cycle = &analysis.cycles()[analysis.cycles_of(id)[0]];
                let (subgraph_outputs, subgraph_extra) =
                    self.run_subgraph(cycle, id, &mut state, include_outputs_from)?;

                // The next runnable set is re-derived from what the cycle
                // produced.
                queue.clear_run();
                queue.note_progress();
                state.extra_outputs.extend(subgraph_extra);

                for (member, outputs) in subgraph_outputs {
                    let leftover = distribute_output(
                        &self.graph,
                        member,
                        outputs,
                        &mut state.pending,
                        &mut queue,
                        None,
                    );
                    if !leftover.is_empty() {
                        final_outputs.insert(self.graph.node(member).name().to_string(), leftover);
                    }
                }
            } else if has_enough_inputs(&self.graph, id, &state.pending) {
                let produced = final_outputs.keys().cloned().collect();
                let res = self.run_component(id, &mut state, produced)?;

                // Consumed inputs fed by other components are deleted;
                // values supplied directly by the caller stay for re-runs.
                let slot = &mut state.pending[id.index()];
                let consumed: Vec<String> = slot.keys().cloned().collect();
                for key in consumed {
                    let fed_by_senders = node.input(&key).is_some_and(|s| !s.senders.is_empty());
                    if fed_by_senders {
                        slot.remove(&key);
                    }
                }

                if include_outputs_from.contains(node.name()) {
                    state
                        .extra_outputs
                        .insert(node.name().to_string(), res.clone());
                }

                queue.note_progress();
                queue.unpark(id);
                for starved in starved_receivers(&self.graph, id, &res, &state.pending) {
                    queue.dequeue(starved);
                }

                let leftover =
                    distribute_output(&self.graph, id, res, &mut state.pending, &mut queue, None);
                if !leftover.is_empty() {
                    final_outputs.insert(node.name().to_string(), leftover);
                }
            } else {
                queue.park(id);
            }

            if queue.run_is_empty() && !queue.waiting_is_empty() {
                if queue.no_progress_repeating() {
                    if is_stuck(&self.graph, queue.waiting()) {
                        tracing::warn!(
                            waiting = ?self.waiting_names(&queue),
                            "pipeline is stuck running in a loop; partial outputs will be returned"
                        );
                        break;
                    }
                    let Some(next) = next_defaulted_or_lazy(&self.graph, &queue) else {
                        tracing::warn!(
                            waiting = ?self.waiting_names(&queue),
                            "no waiting component can make progress; partial outputs will be returned"
                        );
                        break;
                    };
                    queue.mark_forced(next);
                    add_missing_defaults(&self.graph, next, &mut state.pending);
                    queue.enqueue(next);
                    continue;
                }

                queue.snapshot_waiting();
                if let Some(next) = next_runnable(&self.graph, &state.pending, &queue) {
                    add_missing_defaults(&self.graph, next, &mut state.pending);
                    queue.enqueue(next);
                }
            }
        }

        if !include_outputs_from.is_empty() {
            let extra = std::mem::take(&mut state.extra_outputs);
            for (name, outputs) in extra {
                match final_outputs.entry(name) {
                    Entry::Vacant(entry) => {
                        entry.insert(outputs);
                    }
                    Entry::Occupied(mut entry) => {
                        // Keys already collected for this component may
                        // differ from the cached copy when loops are
                        // involved; they win.
                        let inner = entry.get_mut();
                        for (key, value) in outputs {
                            inner.entry(key).or_insert(value);
                        }
                    }
                }
            }
        }

        Ok(final_outputs)
    }

    /// Run a single component with its accumulated inputs.
    ///
    /// Shared by the acyclic and cyclic runners: guards the visit cap,
    /// invokes the component, bumps its visit counter, and resets consumed
    /// variadic sockets so stale values are not replayed on the next visit.
    pub(crate) fn run_component(
        &self,
        id: ComponentId,
        state: &mut RunState,
        produced: Vec<String>,
    ) -> Result<ValueMap> {
        let node = self.graph.node(id);
        let visits = state.visits[id.index()];
        if visits >= self.max_runs_per_component {
            return Err(SkeinError::MaxRunsExceeded {
                component: node.name().to_string(),
                max_runs: self.max_runs_per_component,
                produced,
            });
        }

        let inputs = state.pending[id.index()].clone();
        tracing::info!(component = %node.name(), visits, "running component");

        let outputs = node
            .instance()
            .run(inputs)
            .map_err(|e| SkeinError::ComponentRun {
                component: node.name().to_string(),
                cause: e.to_string(),
                produced,
            })?;
        state.visits[id.index()] = visits + 1;

        let slot = &mut state.pending[id.index()];
        for socket in node.inputs() {
            if socket.is_variadic && slot.contains_key(&socket.name) {
                slot.insert(socket.name.clone(), Value::array(Vec::new()));
            }
        }

        Ok(outputs)
    }

    /// Resolve a flat socket-name keyed map into per-component inputs.
    fn expand_flat_inputs(&self, data: ValueMap) -> BTreeMap<String, ValueMap> {
        let mut nested: BTreeMap<String, ValueMap> = BTreeMap::new();
        for (input_name, value) in data {
            let mut resolved = false;
            for (_, node) in self.graph.nodes() {
                let declares = node
                    .inputs()
                    .iter()
                    .any(|s| s.senders.is_empty() && s.name == input_name);
                if declares {
                    nested
                        .entry(node.name().to_string())
                        .or_default()
                        .insert(input_name.clone(), value.clone());
                    resolved = true;
                }
            }
            if !resolved {
                tracing::warn!(
                    input = %input_name,
                    "input was not matched to any component input socket; check run parameters"
                );
            }
        }
        nested
    }

    /// Reject malformed input before anything runs.
    fn validate_input(&self, data: &BTreeMap<String, ValueMap>) -> Result<()> {
        for (component_name, component_inputs) in data {
            let Some(id) = self.graph.id_of(component_name) else {
                return Err(SkeinError::UnknownComponent {
                    name: component_name.clone(),
                });
            };
            let node = self.graph.node(id);
            for input_name in component_inputs.keys() {
                if node.input(input_name).is_none() {
                    return Err(SkeinError::UnknownInput {
                        component: component_name.clone(),
                        socket: input_name.clone(),
                    });
                }
            }
        }

        for (_, node) in self.graph.nodes() {
            let supplied = data.get(node.name());
            for socket in node.inputs() {
                let externally_fed =
                    supplied.map_or(false, |inputs| inputs.contains_key(&socket.name));
                if socket.senders.is_empty() && socket.is_mandatory() && !externally_fed {
                    return Err(SkeinError::MissingInput {
                        component: node.name().to_string(),
                        socket: socket.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Initialize the pending-inputs state from validated caller data.
    ///
    /// External values for variadic sockets are wrapped in a one-element
    /// list; sockets fed neither by the caller nor by another component are
    /// seeded with their default so variadic consumers of external input
    /// are not scheduled earlier than they should be.
    fn seed_inputs(&self, data: BTreeMap<String, ValueMap>, state: &mut RunState) {
        for (component_name, component_inputs) in data {
            let Some(id) = self.graph.id_of(&component_name) else {
                continue;
            };
            let node = self.graph.node(id);
            for (input_name, value) in component_inputs {
                let wrapped = match node.input(&input_name) {
                    Some(socket) if socket.is_variadic => Value::array(vec![value]),
                    _ => value,
                };
                state.pending[id.index()].insert(input_name, wrapped);
            }
        }

        for (id, node) in self.graph.nodes() {
            for socket in node.inputs() {
                if !socket.senders.is_empty()
                    || state.pending[id.index()].contains_key(&socket.name)
                {
                    continue;
                }
                if let Some(default) = &socket.default {
                    let value = if socket.is_variadic {
                        Value::array(vec![default.clone()])
                    } else {
                        default.clone()
                    };
                    state.pending[id.index()].insert(socket.name.clone(), value);
                }
            }
        }
    }

    fn waiting_names(&self, queue: &WorkQueue) -> Vec<&str> {
        queue
            .waiting()
            .iter()
            .map(|id| self.graph.node(*id).name())
            .collect()
    }
}
