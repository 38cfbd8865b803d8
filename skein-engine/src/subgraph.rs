//! Cyclic subgraph execution.
//!
//! A feedback loop is executed to convergence before control returns to the
//! acyclic runner: the cycle's members run in rotation, re-feeding each
//! other through the original (unbroken) connections, until a member
//! produces no output for any receiver inside the cycle. Outputs destined
//! for receivers outside the cycle are accumulated and distributed by the
//! caller once the loop exits.

use crate::runner::Pipeline;
use crate::schedule::{
    add_missing_defaults, distribute_output, has_enough_inputs, is_stuck, next_defaulted_or_lazy,
    next_runnable, starved_receivers,
};
use crate::state::{RunState, WorkQueue};
use skein_core::component::ValueMap;
use skein_core::error::Result;
use skein_core::types::ComponentId;
use std::collections::{BTreeMap, BTreeSet};

impl Pipeline {
    /// Execute one cycle as an inner loop, starting from `entry`.
    ///
    /// Returns the outputs sent to receivers outside the cycle, keyed by the
    /// producing member, and the cached outputs of members named in
    /// `include_outputs_from`. Pending inputs and visit counters are shared
    /// with the caller through `state`.
    pub(crate) fn run_subgraph(
        &self,
        cycle: &[ComponentId],
        entry: ComponentId,
        state: &mut RunState,
        include_outputs_from: &BTreeSet<String>,
    ) -> Result<(BTreeMap<ComponentId, ValueMap>, BTreeMap<String, ValueMap>)> {
        let graph = self.graph();
        let members: BTreeSet<ComponentId> = cycle.iter().copied().collect();
        let start = cycle.iter().position(|c| *c == entry).unwrap_or(0);
        let mut queue = WorkQueue::seeded(cycle[start..].iter().copied());

        let mut subgraph_outputs: BTreeMap<ComponentId, ValueMap> = BTreeMap::new();
        let mut extra_outputs: BTreeMap<String, ValueMap> = BTreeMap::new();

        // The loop keeps going while each executed member keeps feeding a
        // receiver inside the cycle; once one stops, the cycle has produced
        // its final values for this activation.
        let mut fed_the_cycle = true;

        while fed_the_cycle {
            let Some(id) = queue.pop() else {
                break;
            };
            let node = graph.node(id);

            if node.is_lazy_variadic()
                && !queue
                    .run_iter()
                    .all(|other| graph.node(other).is_lazy_variadic())
            {
                queue.park(id);
            } else if has_enough_inputs(graph, id, &state.pending) {
                let produced = subgraph_outputs
                    .keys()
                    .map(|member| graph.node(*member).name().to_string())
                    .collect();
                let res = self.run_component(id, state, produced)?;

                // Consumed scalar inputs fed exclusively from inside the
                // cycle will be re-sent on the next lap; values arriving
                // from outside (or the caller) may be needed again.
                let slot = &mut state.pending[id.index()];
                let consumed: Vec<String> = slot.keys().cloned().collect();
                for key in consumed {
                    let Some(socket) = node.input(&key) else {
                        continue;
                    };
                    if socket.is_variadic || socket.senders.is_empty() {
                        continue;
                    }
                    if socket.senders.iter().all(|s| members.contains(s)) {
                        slot.remove(&key);
                    }
                }

                if include_outputs_from.contains(node.name()) {
                    extra_outputs.insert(node.name().to_string(), res.clone());
                }

                queue.note_progress();

                fed_the_cycle = node.outputs().iter().any(|socket| {
                    res.contains_key(&socket.name)
                        && socket
                            .receivers
                            .iter()
                            .any(|(receiver, _)| members.contains(receiver))
                });

                queue.unpark(id);
                for starved in starved_receivers(graph, id, &res, &state.pending) {
                    queue.dequeue(starved);
                }

                let leftover = distribute_output(
                    graph,
                    id,
                    res,
                    &mut state.pending,
                    &mut queue,
                    Some(&members),
                );
                if !leftover.is_empty() {
                    subgraph_outputs.insert(id, leftover);
                }
            } else {
                queue.park(id);
            }

            if queue.run_is_empty() && !queue.waiting_is_empty() {
                if queue.no_progress_repeating() {
                    if is_stuck(graph, queue.waiting()) {
                        tracing::warn!(
                            "cycle is stuck; partial outputs will be returned"
                        );
                        break;
                    }
                    let Some(next) = next_defaulted_or_lazy(graph, &queue) else {
                        tracing::warn!(
                            "no cycle member can make progress; partial outputs will be returned"
                        );
                        break;
                    };
                    queue.mark_forced(next);
                    add_missing_defaults(graph, next, &mut state.pending);
                    queue.enqueue(next);
                    continue;
                }

                queue.snapshot_waiting();
                if let Some(next) = next_runnable(graph, &state.pending, &queue) {
                    add_missing_defaults(graph, next, &mut state.pending);
                    queue.enqueue(next);
                }
            }
        }

        Ok((subgraph_outputs, extra_outputs))
    }
}
