//! Readiness checks and output distribution.
//!
//! These routines gate execution and route data: deciding whether a
//! component has accumulated enough input to run, writing a component's
//! outputs into its receivers' pending inputs, and picking the next
//! candidate when the run queue drains with components still waiting.

use crate::graph::PipelineGraph;
use crate::state::WorkQueue;
use serde_json::Value as JsonValue;
use skein_core::component::ValueMap;
use skein_core::types::ComponentId;
use skein_core::value::Value;
use std::collections::BTreeSet;

/// True when the component has enough input to run.
///
/// Every mandatory non-variadic socket must have a pending value, and every
/// variadic socket with at least one sender must have accumulated at least
/// one contribution. A variadic socket with no senders is externally
/// optional and never blocks readiness.
pub(crate) fn has_enough_inputs(
    graph: &PipelineGraph,
    id: ComponentId,
    pending: &[ValueMap],
) -> bool {
    let slot = &pending[id.index()];
    for socket in graph.node(id).inputs() {
        if socket.is_variadic {
            if socket.senders.is_empty() {
                continue;
            }
            let has_contribution = match slot.get(&socket.name) {
                Some(v) => v.inner().as_array().map_or(true, |items| !items.is_empty()),
                None => false,
            };
            if !has_contribution {
                return false;
            }
        } else if socket.is_mandatory() && !slot.contains_key(&socket.name) {
            return false;
        }
    }
    true
}

/// Route a component's output to its connected receivers.
///
/// For each produced `(socket, value)` pair, the value is written into every
/// registered receiver's pending inputs: appended when the receiving socket
/// is variadic, overwriting otherwise. Receivers are scheduled as values
/// arrive: greedy variadic receivers jump to the front of the run queue,
/// lazy variadic receivers are parked to accumulate more input, and anything
/// not yet tracked is appended to the run queue.
///
/// When `restrict_to` is set (cyclic subgraph execution), receivers outside
/// the set are skipped entirely; their values stay in the returned map.
///
/// Returns the subset of the output that reached no receiver, i.e. the
/// component's contribution to the final result for this invocation.
pub(crate) fn distribute_output(
    graph: &PipelineGraph,
    sender: ComponentId,
    mut result: ValueMap,
    pending: &mut [ValueMap],
    queue: &mut WorkQueue,
    restrict_to: Option<&BTreeSet<ComponentId>>,
) -> ValueMap {
    let mut distributed: BTreeSet<String> = BTreeSet::new();
    let node = graph.node(sender);

    for socket in node.outputs() {
        // Conditional outputs: a socket the component did not produce this
        // visit has nothing to route.
        let Some(value) = result.get(&socket.name) else {
            continue;
        };
        for (receiver, receiver_socket) in &socket.receivers {
            if let Some(allowed) = restrict_to {
                if !allowed.contains(receiver) {
                    continue;
                }
            }
            let Some(input) = graph.node(*receiver).input(receiver_socket) else {
                continue;
            };
            distributed.insert(socket.name.clone());

            let slot = &mut pending[receiver.index()];
            if input.is_variadic {
                let entry = slot
                    .entry(receiver_socket.clone())
                    .or_insert_with(|| Value::array(Vec::new()));
                match entry.inner_mut() {
                    JsonValue::Array(items) => items.push(value.clone().into_inner()),
                    other => *other = JsonValue::Array(vec![value.clone().into_inner()]),
                }
            } else {
                slot.insert(receiver_socket.clone(), value.clone());
            }
            tracing::debug!(
                from = %node.name(),
                socket = %socket.name,
                to = %graph.node(*receiver).name(),
                input = %receiver_socket,
                "distributed output"
            );

            if input.is_variadic {
                if input.is_lazy {
                    // Parked so it can collect as much input as possible
                    // before running.
                    queue.park(*receiver);
                } else {
                    queue.enqueue_front(*receiver);
                }
            } else if !queue.run_contains(*receiver) {
                // Schedule the receiver, moving it out of the waiting queue
                // if it was parked there.
                queue.enqueue(*receiver);
            }
        }
    }

    result.retain(|k, _| !distributed.contains(k));
    result
}

/// Fill still-missing defaulted inputs for a component about to be forced
/// out of the waiting queue.
pub(crate) fn add_missing_defaults(
    graph: &PipelineGraph,
    id: ComponentId,
    pending: &mut [ValueMap],
) {
    let slot = &mut pending[id.index()];
    for socket in graph.node(id).inputs() {
        if slot.contains_key(&socket.name) {
            continue;
        }
        let Some(default) = &socket.default else {
            continue;
        };
        let value = if socket.is_variadic {
            Value::array(vec![default.clone()])
        } else {
            default.clone()
        };
        slot.insert(socket.name.clone(), value);
    }
}

/// Components connected to `sender` that will receive no input this round:
/// every receiver registered on an output socket the component did NOT
/// produce, except receivers whose variadic socket already accumulated
/// contributions (those can still run on what they have).
pub(crate) fn starved_receivers(
    graph: &PipelineGraph,
    sender: ComponentId,
    result: &ValueMap,
    pending: &[ValueMap],
) -> BTreeSet<ComponentId> {
    let mut starved = BTreeSet::new();
    let node = graph.node(sender);

    for socket in node.outputs() {
        if result.contains_key(&socket.name) {
            continue;
        }
        for (receiver, _) in &socket.receivers {
            let keeps_going = graph.node(*receiver).inputs().iter().any(|rs| {
                rs.is_variadic
                    && rs.senders.contains(&sender)
                    && pending[receiver.index()]
                        .get(&rs.name)
                        .and_then(|v| v.inner().as_array())
                        .is_some_and(|items| !items.is_empty())
            });
            if !keeps_going {
                starved.insert(*receiver);
            }
        }
    }

    starved
}

/// Pick the next component to force out of the waiting queue: the first one
/// with enough inputs, falling back to the first waiting component.
pub(crate) fn next_runnable(
    graph: &PipelineGraph,
    pending: &[ValueMap],
    queue: &WorkQueue,
) -> Option<ComponentId> {
    let waiting = queue.waiting();
    waiting
        .iter()
        .copied()
        .find(|id| has_enough_inputs(graph, *id, pending))
        .or_else(|| waiting.first().copied())
}

/// Pick the first waiting component that is a lazy variadic consumer or has
/// defaults for every input, falling back to the first waiting component.
/// Used when the stuck detector sees repeated no-progress drains.
///
/// Components already force-enqueued since the last successful execution
/// are skipped; `None` means every waiting component has been tried and the
/// loop is stuck.
pub(crate) fn next_defaulted_or_lazy(
    graph: &PipelineGraph,
    queue: &WorkQueue,
) -> Option<ComponentId> {
    let candidates: Vec<ComponentId> = queue
        .waiting()
        .iter()
        .copied()
        .filter(|id| !queue.was_forced(*id))
        .collect();
    candidates
        .iter()
        .copied()
        .find(|id| {
            let node = graph.node(*id);
            node.is_lazy_variadic() || node.all_inputs_defaulted()
        })
        .or_else(|| candidates.first().copied())
}

/// True when the waiting components can never become ready.
///
/// No waiting component being a lazy variadic consumer or fully defaulted
/// means there is nothing left to force-run. A single waiting component has
/// already survived two no-progress drains and will never run either.
pub(crate) fn is_stuck(graph: &PipelineGraph, waiting: &[ComponentId]) -> bool {
    let candidate = waiting.iter().any(|id| {
        let node = graph.node(*id);
        node.is_lazy_variadic() || node.all_inputs_defaulted()
    });
    if !candidate {
        return true;
    }
    waiting.len() == 1
}
