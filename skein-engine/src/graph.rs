//! Pipeline graph representation and structural queries.
//!
//! The graph owns the registered components and the socket-level
//! connections between them, and answers the structural questions the
//! runners need: who sends into a socket, who receives a component's
//! output, which components are leaves.
//!
//! Components are stored in an arena indexed by [`ComponentId`]; run-scoped
//! state elsewhere is kept in plain vectors indexed the same way.

use skein_core::component::Component;
use skein_core::error::{Result, SkeinError};
use skein_core::socket::{types_compatible, InputSocket, OutputSocket};
use skein_core::types::ComponentId;
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed socket-level connection between two components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Sending component.
    pub sender: ComponentId,
    /// Output socket name on the sender.
    pub sender_socket: String,
    /// Receiving component.
    pub receiver: ComponentId,
    /// Input socket name on the receiver.
    pub receiver_socket: String,
}

/// A registered component together with its socket tables.
///
/// The socket tables start from the component's own declaration; the graph
/// fills in sender and receiver relationships as connections are made.
pub struct ComponentNode {
    name: String,
    instance: Box<dyn Component>,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
}

impl ComponentNode {
    /// The component's unique name within the graph.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying executable unit.
    #[must_use]
    pub fn instance(&self) -> &dyn Component {
        self.instance.as_ref()
    }

    /// The input socket table.
    #[must_use]
    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }

    /// The output socket table.
    #[must_use]
    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }

    /// Get an input socket by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Get an output socket by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.iter().find(|s| s.name == name)
    }

    /// True when the component has at least one variadic input socket and
    /// every variadic socket it has is lazy.
    ///
    /// Lazy variadic consumers are deferred so ordinary components can feed
    /// them as much input as possible first.
    #[must_use]
    pub fn is_lazy_variadic(&self) -> bool {
        let mut has_variadic = false;
        for socket in &self.inputs {
            if socket.is_variadic {
                has_variadic = true;
                if !socket.is_lazy {
                    return false;
                }
            }
        }
        has_variadic
    }

    /// True when every input socket carries a default value.
    #[must_use]
    pub fn all_inputs_defaulted(&self) -> bool {
        self.inputs.iter().all(|s| !s.is_mandatory())
    }
}

/// The pipeline graph: components and the connections between their sockets.
#[derive(Default)]
pub struct PipelineGraph {
    /// Component arena; a [`ComponentId`] indexes directly into it.
    nodes: Vec<ComponentNode>,
    /// Name lookup into the arena.
    index: HashMap<String, ComponentId>,
    /// All connections, in the order they were made.
    connections: Vec<Connection>,
}

impl PipelineGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a uniquely-named component.
    ///
    /// The component's declared sockets become its socket tables; any
    /// sender/receiver entries in the declaration are discarded, since the
    /// graph derives those from connections.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        instance: Box<dyn Component>,
    ) -> Result<ComponentId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(SkeinError::DuplicateComponent { name });
        }

        let info = instance.info();
        let mut inputs = info.inputs;
        for socket in &mut inputs {
            socket.senders.clear();
        }
        let mut outputs = info.outputs;
        for socket in &mut outputs {
            socket.receivers.clear();
        }

        let id = ComponentId::new(self.nodes.len() as u32);
        self.index.insert(name.clone(), id);
        self.nodes.push(ComponentNode {
            name,
            instance,
            inputs,
            outputs,
        });
        Ok(id)
    }

    /// Connect a sender output socket to a receiver input socket.
    ///
    /// Both endpoints are written as `"component.socket"`. Fails when either
    /// socket does not exist, the declared types are incompatible, or the
    /// receiving socket is non-variadic and already has a sender.
    /// Reconnecting the exact same edge is a no-op.
    pub fn connect(&mut self, sender: &str, receiver: &str) -> Result<()> {
        let err = |cause: String| SkeinError::Connection {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            cause,
        };

        let Some((sender_name, sender_socket)) = sender.split_once('.') else {
            return Err(err("sender must be written as 'component.socket'".to_string()));
        };
        let Some((receiver_name, receiver_socket)) = receiver.split_once('.') else {
            return Err(err(
                "receiver must be written as 'component.socket'".to_string()
            ));
        };

        let Some(sender_id) = self.id_of(sender_name) else {
            return Err(err(format!("component '{sender_name}' not found")));
        };
        let Some(receiver_id) = self.id_of(receiver_name) else {
            return Err(err(format!("component '{receiver_name}' not found")));
        };

        let Some(out_idx) = self.nodes[sender_id.index()]
            .outputs
            .iter()
            .position(|s| s.name == sender_socket)
        else {
            return Err(err(format!(
                "component '{sender_name}' has no output socket '{sender_socket}'"
            )));
        };
        let Some(in_idx) = self.nodes[receiver_id.index()]
            .inputs
            .iter()
            .position(|s| s.name == receiver_socket)
        else {
            return Err(err(format!(
                "component '{receiver_name}' has no input socket '{receiver_socket}'"
            )));
        };

        let out_type = self.nodes[sender_id.index()].outputs[out_idx]
            .type_name
            .clone();
        let input = &self.nodes[receiver_id.index()].inputs[in_idx];
        if !types_compatible(&out_type, &input.type_name) {
            return Err(err(format!(
                "type mismatch: {} -> {}",
                out_type, input.type_name
            )));
        }

        let connection = Connection {
            sender: sender_id,
            sender_socket: sender_socket.to_string(),
            receiver: receiver_id,
            receiver_socket: receiver_socket.to_string(),
        };
        if self.connections.contains(&connection) {
            return Ok(());
        }

        if !input.is_variadic && !input.senders.is_empty() {
            let existing = self.nodes[input.senders[0].index()].name.clone();
            return Err(err(format!(
                "input '{receiver_name}.{receiver_socket}' is not variadic and \
                 already receives input from '{existing}'"
            )));
        }

        self.nodes[sender_id.index()].outputs[out_idx]
            .receivers
            .push((receiver_id, receiver_socket.to_string()));
        self.nodes[receiver_id.index()].inputs[in_idx]
            .senders
            .push(sender_id);
        self.connections.push(connection);

        tracing::debug!(%sender, %receiver, "connected sockets");
        Ok(())
    }

    /// Look up a component by name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.index.get(name).copied()
    }

    /// Get a component node by ID.
    #[must_use]
    pub fn node(&self, id: ComponentId) -> &ComponentNode {
        &self.nodes[id.index()]
    }

    /// Iterate all components in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = (ComponentId, &ComponentNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (ComponentId::new(i as u32), n))
    }

    /// All connections in the order they were made.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The `(receiver, input socket)` pairs reached directly from any output
    /// of the given component, in socket then connection order.
    #[must_use]
    pub fn receivers_of(&self, id: ComponentId) -> Vec<(ComponentId, String)> {
        self.nodes[id.index()]
            .outputs
            .iter()
            .flat_map(|s| s.receivers.iter().cloned())
            .collect()
    }

    /// The components feeding the given input socket.
    #[must_use]
    pub fn senders_of(&self, id: ComponentId, input_socket: &str) -> &[ComponentId] {
        self.nodes[id.index()]
            .input(input_socket)
            .map_or(&[], |s| s.senders.as_slice())
    }

    /// Components with no outgoing connections. Their outputs are part of
    /// the final result by default.
    #[must_use]
    pub fn leaves(&self) -> Vec<ComponentId> {
        (0..self.nodes.len())
            .map(|i| ComponentId::new(i as u32))
            .filter(|id| self.connections.iter().all(|c| c.sender != *id))
            .collect()
    }

    /// Warm up every component once, in registration order.
    pub fn warm_up(&mut self) -> Result<()> {
        for node in &mut self.nodes {
            tracing::debug!(component = %node.name, "warming up component");
            node.instance
                .warm_up()
                .map_err(|e| SkeinError::WarmUp {
                    component: node.name.clone(),
                    cause: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Perform a topological sort using Kahn's algorithm.
    ///
    /// Connections whose index appears in `skip_connections` are ignored;
    /// the runner passes the edges removed during cycle breaking so the
    /// acyclic skeleton can be ordered. Seeding and traversal follow
    /// registration order, so the result is deterministic.
    #[must_use]
    pub fn topological_sort(&self, skip_connections: &HashSet<usize>) -> Vec<ComponentId> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for (idx, conn) in self.connections.iter().enumerate() {
            if skip_connections.contains(&idx) {
                continue;
            }
            in_degree[conn.receiver.index()] += 1;
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|i| in_degree[*i] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(self.nodes.len());

        while let Some(i) = queue.pop_front() {
            sorted.push(ComponentId::new(i as u32));
            for (idx, conn) in self.connections.iter().enumerate() {
                if skip_connections.contains(&idx) || conn.sender.index() != i {
                    continue;
                }
                let r = conn.receiver.index();
                in_degree[r] -= 1;
                if in_degree[r] == 0 {
                    queue.push_back(r);
                }
            }
        }

        debug_assert_eq!(
            sorted.len(),
            self.nodes.len(),
            "graph must be acyclic once broken edges are skipped"
        );
        sorted
    }
}
