//! The runtime engine.
//!
//! Combines ingestion, the stratified scheduler, node execution and garbage
//! collection into one run-to-completion step per frame.

use crate::channel::{ChannelState, Subscriber};
use crate::config::{CommitPolicy, RuntimeConfig};
use crate::error::{NodeError, RuntimeError, RuntimeResult};
use crate::executor::{self, Effects, Outcome};
use crate::gc;
use crate::monitor::Stats;
use crate::node::{EdgeRoute, EdgeSlot, NodeState, WriteSlot};
use crate::scheduler::{Affected, Plan};
use crate::stage::StageFactory;
use crate::view::{ChannelView, NodeView};
use arc_core::{ChannelKey, Frame, FrameEntry, Series, Value};
use arc_ir::{IrError, Ir, Stage};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, trace, warn};

/// Reactive dataflow runtime for one compiled graph
///
/// Channel and node state live in arenas indexed by dense positions assigned
/// at construction; all cross references are indices into them.
pub struct Runtime {
    config: RuntimeConfig,
    channels: IndexMap<ChannelKey, ChannelState>,
    nodes: IndexMap<String, NodeState>,
    edges: Vec<EdgeRoute>,
    /// Per-frame values flowing along each edge
    edge_buffers: Vec<Vec<Value>>,
    plan: Plan,
    affected: Affected,
    /// Channel writes since the last flush
    writes: Vec<FrameEntry>,
    frame: u64,
    stats: Stats,
    cancel: CancellationToken,
}

impl Runtime {
    /// Build a runtime for `ir`, instantiating every node through `factory`
    ///
    /// # Errors
    ///
    /// Returns error if the graph is structurally invalid, a node references a
    /// missing stage, or a stage cannot be instantiated
    pub fn new(ir: &Ir, factory: &dyn StageFactory, config: RuntimeConfig) -> RuntimeResult<Self> {
        ir.check()?;

        let channels: IndexMap<ChannelKey, ChannelState> = ir
            .channel_types()?
            .into_iter()
            .map(|(key, data_type)| (key, ChannelState::new(key, data_type)))
            .collect();
        let stages: IndexMap<&str, Arc<Stage>> = ir
            .stages
            .iter()
            .map(|s| (s.key.as_str(), Arc::new(s.clone())))
            .collect();

        let mut runtime = Self {
            config,
            channels,
            nodes: IndexMap::with_capacity(ir.nodes.len()),
            edges: Vec::with_capacity(ir.edges.len()),
            edge_buffers: vec![Vec::new(); ir.edges.len()],
            plan: Plan::default(),
            affected: Affected::new(ir.nodes.len()),
            writes: Vec::new(),
            frame: 0,
            stats: Stats::new(),
            cancel: CancellationToken::new(),
        };

        for node in &ir.nodes {
            let stage = stages
                .get(node.stage.as_str())
                .ok_or_else(|| RuntimeError::MissingStage {
                    node: node.key.clone(),
                    stage: node.stage.clone(),
                })?;
            let level = ir
                .strata
                .level(&node.key)
                .ok_or_else(|| IrError::MissingStratum(node.key.clone()))?;
            let executor = factory
                .instantiate(stage, node)
                .map_err(|source| RuntimeError::Instantiate {
                    node: node.key.clone(),
                    source,
                })?;

            let mut state = NodeState::new(
                node.key.clone(),
                Arc::clone(stage),
                level,
                node.config.clone(),
                executor,
            );
            let index = runtime.nodes.len();
            for binding in &node.reads {
                let channel = runtime.channel_index(binding.channel)?;
                let param = stage
                    .param_index(&binding.param)
                    .ok_or_else(|| unknown_param(&node.key, &binding.param))?;
                let slot = state.add_read(channel, param);
                runtime.channels[channel].subscribers.push(Subscriber { node: index, slot });
            }
            for binding in &node.writes {
                let channel = runtime.channel_index(binding.channel)?;
                let output = stage
                    .output_index(&binding.param)
                    .ok_or_else(|| unknown_param(&node.key, &binding.param))?;
                state.writes.push(WriteSlot { channel, output });
                runtime.channels[channel].writers.push(index);
            }
            runtime.nodes.insert(node.key.clone(), state);
        }

        for (edge_index, edge) in ir.edges.iter().enumerate() {
            let source = runtime.node_index(&edge.source.node)?;
            let target = runtime.node_index(&edge.target.node)?;
            let output = runtime.nodes[source]
                .stage
                .output_index(&edge.source.param)
                .ok_or_else(|| unknown_param(&edge.source.node, &edge.source.param))?;
            let param = runtime.nodes[target]
                .stage
                .param_index(&edge.target.param)
                .ok_or_else(|| unknown_param(&edge.target.node, &edge.target.param))?;
            runtime.edges.push(EdgeRoute { source, output, target });
            runtime.nodes[source].outgoing.push(edge_index);
            runtime.nodes[target].inputs.push(EdgeSlot { edge: edge_index, param });
        }

        runtime.plan = Plan::new(
            runtime
                .nodes
                .values()
                .enumerate()
                .map(|(i, n)| (i, n.key.as_str(), n.level)),
            ir.strata.max,
        );

        info!(
            nodes = runtime.nodes.len(),
            channels = runtime.channels.len(),
            edges = runtime.edges.len(),
            strata = runtime.plan.depth(),
            "runtime constructed"
        );
        Ok(runtime)
    }

    /// Abort frame processing when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Process one frame: ingest, run affected nodes stratum by stratum,
    /// collect consumed series and clear edge buffers
    ///
    /// Garbage collection and edge-buffer clearing happen whether or not the
    /// frame succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if an ingested series has the wrong type, a node fails,
    /// or processing is cancelled. What was committed before the failure
    /// stays applied; see [`CommitPolicy`].
    pub fn next(&mut self, frame: Frame) -> RuntimeResult<()> {
        self.frame += 1;
        let span = debug_span!("frame", number = self.frame);
        let _guard = span.enter();

        let result = self.ingest(frame).and_then(|()| self.run_strata());

        let collected = gc::collect(&mut self.channels, &self.nodes, self.config.retain_unsubscribed);
        self.stats.record_collected(collected);
        for buffer in &mut self.edge_buffers {
            buffer.clear();
        }
        self.affected.clear();
        self.stats.record_frame();

        if let Err(err) = &result {
            warn!(error = %err, node = err.node().unwrap_or("-"), "frame failed");
        }
        result
    }

    /// Drain the channel writes made since the last flush, in write order
    pub fn flush_writes(&mut self) -> Vec<FrameEntry> {
        std::mem::take(&mut self.writes)
    }

    /// View a channel
    #[must_use]
    pub fn channel(&self, key: ChannelKey) -> Option<ChannelView<'_>> {
        self.channels.get(&key).map(|channel| ChannelView {
            channel,
            nodes: &self.nodes,
        })
    }

    /// Keys of every channel the graph references
    pub fn channel_keys(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.channels.keys().copied()
    }

    /// View a node
    #[must_use]
    pub fn node(&self, key: &str) -> Option<NodeView<'_>> {
        self.nodes.get(key).map(|node| NodeView {
            node,
            channels: &self.channels,
        })
    }

    /// Statistics accumulated so far
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Number of frames processed
    #[must_use]
    pub fn frame_number(&self) -> u64 {
        self.frame
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Release every node's stage instance
    ///
    /// Every instance is closed even if one fails; the first failure is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns error if any stage instance fails to close
    pub fn close(mut self) -> RuntimeResult<()> {
        let mut first_error = None;
        for node in self.nodes.values_mut() {
            if let Err(source) = node.executor.close() {
                warn!(node = %node.key, error = %source, "failed to close stage instance");
                if first_error.is_none() {
                    first_error = Some(RuntimeError::Close {
                        node: node.key.clone(),
                        source,
                    });
                }
            }
        }
        info!(frames = self.frame, "runtime closed");
        first_error.map_or(Ok(()), Err)
    }

    fn channel_index(&self, key: ChannelKey) -> RuntimeResult<usize> {
        self.channels
            .get_index_of(&key)
            .ok_or_else(|| {
                RuntimeError::InvalidIr(IrError::Decode(format!("channel {key} has no type")))
            })
    }

    fn node_index(&self, key: &str) -> RuntimeResult<usize> {
        self.nodes
            .get_index_of(key)
            .ok_or_else(|| RuntimeError::InvalidIr(IrError::UnknownNode(key.to_string())))
    }

    /// Append each series to its channel and mark subscribers affected.
    /// Types are checked for the whole frame before anything is applied.
    fn ingest(&mut self, frame: Frame) -> RuntimeResult<()> {
        for (key, series) in frame.iter() {
            if let Some(channel) = self.channels.get(&key) {
                if !series.is_empty() && series.data_type() != channel.data_type {
                    return Err(RuntimeError::ChannelType {
                        channel: key,
                        expected: channel.data_type,
                        actual: series.data_type(),
                    });
                }
            }
        }

        for (key, series) in frame {
            if series.is_empty() {
                continue;
            }
            let Some(channel) = self.channels.get_mut(&key) else {
                trace!(channel = %key, "ignoring unknown channel");
                self.stats.record_dropped();
                continue;
            };
            if channel.append(series, self.frame) {
                for subscriber in &channel.subscribers {
                    self.affected.mark(subscriber.node);
                }
            }
        }
        debug!(affected = self.affected.count(), "ingested");
        Ok(())
    }

    fn run_strata(&mut self) -> RuntimeResult<()> {
        for level in 0..self.plan.depth() {
            let members = self.affected.select(self.plan.level(level));
            if members.is_empty() {
                continue;
            }
            trace!(level, nodes = members.len(), "stratum");

            let mut pending = Vec::new();
            let mut dormant = 0;
            for index in members {
                if self.cancel.is_cancelled() {
                    return Err(RuntimeError::Cancelled);
                }
                let outcome = match executor::execute(
                    index,
                    &mut self.nodes[index],
                    &self.channels,
                    &self.edge_buffers,
                    &self.edges,
                ) {
                    Ok(outcome) => outcome,
                    Err(failure) => {
                        // Samples a failed execution collected are not retried
                        let node = &mut self.nodes[index];
                        node.watermarks = failure.watermarks;
                        return Err(RuntimeError::Node {
                            node: node.key.clone(),
                            source: failure.error,
                        });
                    }
                };

                match outcome {
                    Outcome::Dormant => dormant += 1,
                    Outcome::Idle => {}
                    Outcome::Executed(effects) => {
                        for &edge in &self.nodes[index].outgoing {
                            self.affected.mark(self.edges[edge].target);
                        }
                        match self.config.commit {
                            CommitPolicy::Node => self.commit(effects)?,
                            CommitPolicy::Stratum => pending.push(effects),
                        }
                    }
                }
                if self.config.commit == CommitPolicy::Node {
                    self.stats.record_skips(std::mem::take(&mut dormant));
                }
            }
            for effects in pending {
                self.commit(effects)?;
            }
            self.stats.record_skips(dormant);
        }
        Ok(())
    }

    /// Apply one execution's effects to node, edge and channel state
    fn commit(&mut self, effects: Effects) -> RuntimeResult<()> {
        self.stats.record_execution(effects.invocations);
        let node = &mut self.nodes[effects.node];
        node.watermarks = effects.watermarks;
        node.state = effects.state;
        node.last_values = effects.last_values;

        for (edge, values) in effects.edges {
            self.edge_buffers[edge].extend(values);
        }
        for (index, values) in effects.writes {
            let channel = &mut self.channels[index];
            let series = Series::new(channel.data_type, channel.next_alignment(), values)
                .map_err(|source| RuntimeError::Node {
                    node: node.key.clone(),
                    source: NodeError::Write {
                        channel: channel.key,
                        source,
                    },
                })?;
            self.writes.push(FrameEntry {
                channel: channel.key,
                series: series.clone(),
            });
            channel.append(series, self.frame);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("frame", &self.frame)
            .field("nodes", &self.nodes.len())
            .field("channels", &self.channels.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn unknown_param(node: &str, param: &str) -> RuntimeError {
    RuntimeError::InvalidIr(IrError::UnknownParam {
        node: node.to_string(),
        param: param.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{FnFactory, StageError, StageOutput};
    use arc_core::{Alignment, DataType};
    use arc_ir::{Edge, Handle, Node, Param, Strata};

    fn f64s(start: u64, values: &[f64]) -> Series {
        Series::from_values(Alignment::from_raw(start), values.iter().copied()).unwrap()
    }

    fn scale_stage() -> Stage {
        Stage::new("scale")
            .with_param(Param::new("input", DataType::F64))
            .with_output(Param::new("output", DataType::F64))
    }

    fn factory() -> FnFactory {
        FnFactory::new().with_stage("scale", |inv| {
            let x = inv.input("input").and_then(Value::as_f64).unwrap_or_default();
            if x < 0.0 {
                return Err(StageError::Failed("negative".to_string()));
            }
            Ok(StageOutput::new().with_output("output", x * 10.0))
        })
    }

    /// 100 -> a -> (edge) -> b -> 200
    fn chain() -> Ir {
        let mut ir = Ir::new();
        ir.stages.push(scale_stage());
        ir.nodes.push(Node::new("a", "scale").reading(100, "input"));
        ir.nodes.push(Node::new("b", "scale").writing(200, "output"));
        ir.edges
            .push(Edge::new(Handle::new("a", "output"), Handle::new("b", "input")));
        ir.strata = Strata::new().with("a", 0).with("b", 1);
        ir
    }

    #[test]
    fn test_construction_wires_channels() {
        let rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        let input = rt.channel(ChannelKey::new(100)).unwrap();
        assert_eq!(input.subscribers().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(input.writers().count(), 0);
        let output = rt.channel(ChannelKey::new(200)).unwrap();
        assert_eq!(output.writers().collect::<Vec<_>>(), vec!["b"]);
        assert!(!output.has_data());
        assert!(rt.channel(ChannelKey::new(999)).is_none());
        assert_eq!(rt.node("b").unwrap().level(), 1);
    }

    #[test]
    fn test_missing_stage_is_fatal() {
        let mut ir = chain();
        ir.nodes[0].stage = "ghost".to_string();
        let err = Runtime::new(&ir, &factory(), RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::MissingStage { .. }));
    }

    #[test]
    fn test_instantiate_failure_is_fatal() {
        let err = Runtime::new(&chain(), &FnFactory::new(), RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::Instantiate { .. }));
    }

    #[test]
    fn test_chain_propagates_through_edge() {
        let mut rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        rt.next(Frame::unary(ChannelKey::new(100), f64s(0, &[1.0, 2.0]))).unwrap();

        let writes = rt.flush_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].channel, ChannelKey::new(200));
        assert_eq!(writes[0].series.values(), &[Value::F64(100.0), Value::F64(200.0)]);
        assert_eq!(writes[0].series.alignment(), Alignment::zero());
        assert!(rt.flush_writes().is_empty());

        let stats = rt.stats();
        assert_eq!(stats.node_executions, 2);
        assert_eq!(stats.invocations, 4);
    }

    #[test]
    fn test_writes_continue_alignment() {
        let mut rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        rt.next(Frame::unary(ChannelKey::new(100), f64s(0, &[1.0, 2.0]))).unwrap();
        rt.next(Frame::unary(ChannelKey::new(100), f64s(2, &[3.0]))).unwrap();

        let writes = rt.flush_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].series.alignment(), Alignment::from_raw(2));
        let out = rt.channel(ChannelKey::new(200)).unwrap();
        assert_eq!(out.latest(), Some(&Value::F64(300.0)));
        assert_eq!(out.last_frame(), Some(2));
        // Unsubscribed: only the newest series is kept
        assert_eq!(out.series().count(), 1);
    }

    #[test]
    fn test_unknown_and_empty_series_ignored() {
        let mut rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        let frame = Frame::new()
            .with(ChannelKey::new(7), f64s(0, &[1.0]))
            .unwrap()
            .with(ChannelKey::new(100), Series::empty(DataType::F64, Alignment::zero()))
            .unwrap();
        rt.next(frame).unwrap();

        assert_eq!(rt.stats().series_dropped, 1);
        assert!(!rt.channel(ChannelKey::new(100)).unwrap().has_data());
        assert_eq!(rt.stats().node_executions, 0);
    }

    #[test]
    fn test_ingest_type_mismatch_applies_nothing() {
        let mut rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        let ints = Series::from_values(Alignment::zero(), [1i32, 2]).unwrap();
        let err = rt.next(Frame::unary(ChannelKey::new(100), ints)).unwrap_err();
        assert!(matches!(err, RuntimeError::ChannelType { .. }));
        assert!(!rt.channel(ChannelKey::new(100)).unwrap().has_data());
        assert_eq!(rt.stats().frames, 1);
    }

    /// `a` on channel 1 and `b` on channel 2, both in stratum 0
    fn siblings() -> Ir {
        let mut ir = Ir::new();
        ir.stages.push(scale_stage());
        ir.nodes.push(Node::new("a", "scale").reading(1, "input"));
        ir.nodes.push(Node::new("b", "scale").reading(2, "input"));
        ir.strata = Strata::new().with("a", 0).with("b", 0);
        ir
    }

    fn sibling_frame(a: f64, b: f64) -> Frame {
        Frame::new()
            .with(ChannelKey::new(1), f64s(0, &[a]))
            .unwrap()
            .with(ChannelKey::new(2), f64s(0, &[b]))
            .unwrap()
    }

    #[test]
    fn test_stratum_commit_rolls_back_failed_stratum() {
        let mut rt = Runtime::new(&siblings(), &factory(), RuntimeConfig::default()).unwrap();
        let err = rt.next(sibling_frame(1.0, -1.0)).unwrap_err();
        assert_eq!(err.node(), Some("b"));

        assert_eq!(rt.node("a").unwrap().watermark(ChannelKey::new(1)), None);
        assert_eq!(
            rt.node("b").unwrap().watermark(ChannelKey::new(2)),
            Some(Alignment::zero())
        );
        assert_eq!(rt.stats().node_executions, 0);
        assert_eq!(rt.stats().invocations, 0);
    }

    #[test]
    fn test_node_commit_keeps_earlier_nodes() {
        let config = RuntimeConfig::new().with_commit(CommitPolicy::Node);
        let mut rt = Runtime::new(&siblings(), &factory(), config).unwrap();
        let err = rt.next(sibling_frame(1.0, -1.0)).unwrap_err();
        assert_eq!(err.node(), Some("b"));
        assert_eq!(
            rt.node("a").unwrap().watermark(ChannelKey::new(1)),
            Some(Alignment::zero())
        );
        assert_eq!(
            rt.node("b").unwrap().watermark(ChannelKey::new(2)),
            Some(Alignment::zero())
        );
        assert_eq!(rt.stats().node_executions, 1);
    }

    #[test]
    fn test_rejected_sample_is_not_redelivered() {
        for policy in [CommitPolicy::Node, CommitPolicy::Stratum] {
            let mut ir = Ir::new();
            ir.stages.push(scale_stage());
            ir.nodes
                .push(Node::new("n", "scale").reading(1, "input").writing(2, "output"));
            ir.strata = Strata::new().with("n", 0);
            let config = RuntimeConfig::new().with_commit(policy);
            let mut rt = Runtime::new(&ir, &factory(), config).unwrap();

            let input = ChannelKey::new(1);
            assert!(rt.next(Frame::unary(input, f64s(0, &[-1.0]))).is_err());
            assert_eq!(rt.node("n").unwrap().watermark(input), Some(Alignment::zero()));
            rt.flush_writes();

            for i in 1..6u64 {
                rt.next(Frame::unary(input, f64s(i, &[i as f64]))).unwrap();
                let writes = rt.flush_writes();
                assert_eq!(writes.len(), 1);
                assert_eq!(writes[0].series.values(), &[Value::F64(i as f64 * 10.0)]);
                assert_eq!(rt.node("n").unwrap().watermark(input), Some(Alignment::from_raw(i)));
                assert_eq!(rt.channel(input).unwrap().series().count(), 0);
            }
            assert_eq!(rt.stats().node_executions, 5);
        }
    }

    #[test]
    fn test_cancelled_frame_runs_nothing() {
        let token = CancellationToken::new();
        let mut rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default())
            .unwrap()
            .with_cancellation(token.clone());
        token.cancel();
        let err = rt
            .next(Frame::unary(ChannelKey::new(100), f64s(0, &[1.0])))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Cancelled));
        assert_eq!(rt.stats().node_executions, 0);
        // Ingestion already happened
        assert!(rt.channel(ChannelKey::new(100)).unwrap().has_data());
    }

    #[test]
    fn test_close_releases_instances() {
        let rt = Runtime::new(&chain(), &factory(), RuntimeConfig::default()).unwrap();
        assert!(rt.close().is_ok());
    }

    fn gated_pair() -> Ir {
        let mut ir = Ir::new();
        ir.stages.push(scale_stage());
        ir.stages.push(
            Stage::new("pair")
                .with_param(Param::new("a", DataType::F64))
                .with_param(Param::new("b", DataType::F64)),
        );
        ir.nodes.push(Node::new("fast", "scale").reading(1, "input"));
        ir.nodes.push(Node::new("gated", "pair").reading(1, "a").reading(2, "b"));
        ir.strata = Strata::new().with("fast", 0).with("gated", 0);
        ir
    }

    proptest::proptest! {
        #[test]
        fn prop_watermarks_monotonic_and_gc_safe(
            frames in proptest::collection::vec((0u64..3, 0usize..5, proptest::bool::ANY), 1..16),
        ) {
            let factory = FnFactory::new()
                .with_stage("scale", |_| Ok(StageOutput::new()))
                .with_stage("pair", |_| Ok(StageOutput::new()));
            let mut rt = Runtime::new(&gated_pair(), &factory, RuntimeConfig::default()).unwrap();
            let (one, two) = (ChannelKey::new(1), ChannelKey::new(2));
            let mut next_one = 0u64;
            let mut next_two = 0u64;
            let mut previous = vec![None; 3];

            for (gap, len, with_two) in frames {
                let mut frame = Frame::new();
                if len > 0 {
                    let start = next_one + gap;
                    frame.push(one, f64s(start, &vec![1.0; len])).unwrap();
                    next_one = start + len as u64;
                }
                if with_two {
                    frame.push(two, f64s(next_two, &[1.0])).unwrap();
                    next_two += 1;
                }
                rt.next(frame).unwrap();

                let fast = rt.node("fast").unwrap();
                let gated = rt.node("gated").unwrap();
                let marks = vec![fast.watermark(one), gated.watermark(one), gated.watermark(two)];
                for (before, now) in previous.iter().zip(&marks) {
                    proptest::prop_assert!(now >= before);
                }

                let floors = [(one, marks[0].min(marks[1])), (two, marks[2])];
                for (key, floor) in floors {
                    if let Some(floor) = floor {
                        for series in rt.channel(key).unwrap().series() {
                            proptest::prop_assert!(series.last_alignment() > Some(floor));
                        }
                    }
                }
                previous = marks;
            }
        }
    }
}
