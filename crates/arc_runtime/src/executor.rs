//! Node execution.
//!
//! Executing a node never touches runtime state other than its own
//! activation cache. Everything the execution consumes or produces is
//! returned as [`Effects`], which the engine commits according to its
//! [`CommitPolicy`](crate::CommitPolicy).

use crate::channel::ChannelState;
use crate::error::NodeError;
use crate::node::{EdgeRoute, NodeState};
use crate::stage::{Invocation, Sample, StateVars};
use arc_core::{Alignment, ChannelKey, Value};
use arc_ir::Param;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Everything one node execution consumed and produced
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Effects {
    pub node: usize,
    pub watermarks: Vec<Option<Alignment>>,
    pub state: StateVars,
    pub last_values: Vec<Option<Value>>,
    /// Values appended to each outgoing edge buffer
    pub edges: Vec<(usize, Vec<Value>)>,
    /// Values written to each channel, by channel index
    pub writes: Vec<(usize, Vec<Value>)>,
    pub invocations: usize,
}

/// What happened when a node was asked to run
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// A required channel has never delivered data
    Dormant,
    /// No new input since the last execution
    Idle,
    /// The stage ran at least once
    Executed(Effects),
}

/// A failed execution and the watermarks its collection advanced to
///
/// Consumed samples stay consumed: the engine commits these watermarks even
/// though every other effect of the execution is discarded.
#[derive(Debug)]
pub(crate) struct Failure {
    pub error: NodeError,
    pub watermarks: Vec<Option<Alignment>>,
}

/// Run node `index` against the current channel and edge-buffer contents
pub(crate) fn execute(
    index: usize,
    node: &mut NodeState,
    channels: &IndexMap<ChannelKey, ChannelState>,
    edge_buffers: &[Vec<Value>],
    routes: &[EdgeRoute],
) -> Result<Outcome, Failure> {
    if !activate(node, channels) {
        return Ok(Outcome::Dormant);
    }

    let (arrays, watermarks) = collect(node, channels, edge_buffers);
    let len = arrays.iter().map(Vec::len).max().unwrap_or(0);
    if len == 0 {
        trace!(node = %node.key, "no new input");
        return Ok(Outcome::Idle);
    }

    match run(node, &arrays, len, routes) {
        Ok((state, last_values, edges, writes)) => {
            debug!(node = %node.key, samples = len, "executed");
            Ok(Outcome::Executed(Effects {
                node: index,
                watermarks,
                state,
                last_values,
                edges,
                writes,
                invocations: len,
            }))
        }
        Err(error) => Err(Failure { error, watermarks }),
    }
}

type Routed = Vec<(usize, Vec<Value>)>;

/// Align, invoke and route `len` samples, leaving node state uncommitted
fn run(
    node: &mut NodeState,
    arrays: &[Vec<Value>],
    len: usize,
    routes: &[EdgeRoute],
) -> Result<(StateVars, Vec<Option<Value>>, Routed, Routed), NodeError> {
    let mut last_values = node.last_values.clone();
    let samples = align(&node.stage.params, arrays, &mut last_values, len)?;

    let mut state = node.state.clone();
    let mut outputs = Vec::with_capacity(len);
    for (i, sample) in samples.iter().enumerate() {
        let out = node
            .executor
            .invoke(Invocation {
                stage: &node.stage,
                node: &node.key,
                config: &node.config,
                state: &state,
                sample,
                index: i,
            })
            .map_err(|source| NodeError::Invoke { sample: i, source })?;
        if node.stage.is_stateful() {
            if let Some(next) = out.state {
                state = next;
            }
        }
        outputs.push(out.outputs);
    }

    let mut edges = Vec::with_capacity(node.outgoing.len());
    for &edge in &node.outgoing {
        let output = &node.stage.outputs[routes[edge].output];
        edges.push((edge, gather(&outputs, output)?));
    }
    let mut writes = Vec::with_capacity(node.writes.len());
    for write in &node.writes {
        let output = &node.stage.outputs[write.output];
        writes.push((write.channel, gather(&outputs, output)?));
    }
    Ok((state, last_values, edges, writes))
}

/// First-activation gate: true once every read channel has delivered data
fn activate(node: &mut NodeState, channels: &IndexMap<ChannelKey, ChannelState>) -> bool {
    if node.activated {
        return true;
    }
    for (slot, read) in node.reads.iter().enumerate() {
        if !node.seen[slot] && channels[read.channel].has_data {
            node.seen.set(slot, true);
        }
    }
    if node.seen.all() {
        node.activated = true;
        debug!(node = %node.key, "first activation");
    } else {
        trace!(
            node = %node.key,
            waiting = node.seen.count_zeros(),
            "dormant: required channels missing"
        );
    }
    node.activated
}

/// Gather unconsumed channel samples and this frame's edge values per
/// parameter, along with the advanced watermarks
fn collect(
    node: &NodeState,
    channels: &IndexMap<ChannelKey, ChannelState>,
    edge_buffers: &[Vec<Value>],
) -> (Vec<Vec<Value>>, Vec<Option<Alignment>>) {
    let mut arrays = vec![Vec::new(); node.stage.params.len()];
    let mut watermarks = node.watermarks.clone();

    for (slot, read) in node.reads.iter().enumerate() {
        let from = node.watermarks[slot];
        for series in &channels[read.channel].series {
            for (alignment, value) in series.after(from) {
                arrays[read.param].push(value.clone());
                watermarks[slot] = Some(alignment);
            }
        }
    }
    for input in &node.inputs {
        arrays[input.param].extend(edge_buffers[input.edge].iter().cloned());
    }
    (arrays, watermarks)
}

/// Build `len` samples: own value, else last value, else the parameter's
/// default or zero value
fn align(
    params: &[Param],
    arrays: &[Vec<Value>],
    last_values: &mut [Option<Value>],
    len: usize,
) -> Result<Vec<Sample>, NodeError> {
    let mut samples = Vec::with_capacity(len);
    for i in 0..len {
        let mut values = Vec::with_capacity(params.len());
        for (p, param) in params.iter().enumerate() {
            let value = match arrays[p].get(i) {
                Some(value) => {
                    last_values[p] = Some(value.clone());
                    value.clone()
                }
                None => match &last_values[p] {
                    Some(last) => last.clone(),
                    None => param.fallback().ok_or_else(|| NodeError::NoValue {
                        param: param.name.clone(),
                    })?,
                },
            };
            values.push(value);
        }
        samples.push(Sample::new(values));
    }
    Ok(samples)
}

/// Values of one output across every invocation, type checked
fn gather(outputs: &[IndexMap<String, Value>], output: &Param) -> Result<Vec<Value>, NodeError> {
    outputs
        .iter()
        .enumerate()
        .map(|(sample, values)| {
            let value = values.get(&output.name).ok_or_else(|| NodeError::MissingOutput {
                param: output.name.clone(),
                sample,
            })?;
            if value.data_type() != output.data_type {
                return Err(NodeError::OutputType {
                    param: output.name.clone(),
                    expected: output.data_type,
                    actual: value.data_type(),
                });
            }
            Ok(value.clone())
        })
        .collect()
}
