//! End-to-end frame processing scenarios driven through closure stages.

use arc_core::{Alignment, ChannelKey, DataType, Frame, Series, Value};
use arc_ir::{Edge, Handle, Ir, Node, Param, Stage, Strata};
use arc_runtime::{FnFactory, Runtime, RuntimeConfig, StageError, StageOutput};
use std::sync::{Arc, Mutex};

type Recorded = Arc<Mutex<Vec<Vec<Value>>>>;

fn series(start: u64, values: &[f64]) -> Series {
    Series::from_values(Alignment::from_raw(start), values.iter().copied()).unwrap()
}

fn ch(key: u32) -> ChannelKey {
    ChannelKey::new(key)
}

fn f64s(values: &[f64]) -> Vec<Value> {
    values.iter().copied().map(Value::F64).collect()
}

/// Factory whose stages record every sample and sum their inputs into "output"
fn recording_factory(stages: &[&str]) -> (FnFactory, Recorded) {
    let recorded: Recorded = Arc::default();
    let mut factory = FnFactory::new();
    for &key in stages {
        let sink = Arc::clone(&recorded);
        factory = factory.with_stage(key, move |inv| {
            sink.lock().unwrap().push(inv.sample.values().to_vec());
            let sum: f64 = inv.sample.values().iter().filter_map(Value::as_f64).sum();
            Ok(StageOutput::new().with_output("output", sum))
        });
    }
    (factory, recorded)
}

fn unary_stage(key: &str) -> Stage {
    Stage::new(key)
        .with_param(Param::new("input", DataType::F64))
        .with_output(Param::new("output", DataType::F64))
}

fn binary_stage(key: &str) -> Stage {
    Stage::new(key)
        .with_param(Param::new("a", DataType::F64))
        .with_param(Param::new("b", DataType::F64))
        .with_output(Param::new("output", DataType::F64))
}

#[test]
fn test_single_node_consumes_frame() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.nodes
        .push(Node::new("n", "pass").reading(100, "input").writing(200, "output"));
    ir.strata = Strata::new().with("n", 0);

    let (factory, recorded) = recording_factory(&["pass"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    rt.next(Frame::unary(ch(100), series(0, &[1.0, 2.0, 3.0, 4.0]))).unwrap();

    let n = rt.node("n").unwrap();
    assert!(n.is_activated());
    assert_eq!(n.watermark(ch(100)), Some(Alignment::from_raw(3)));

    let out = rt.channel(ch(200)).unwrap();
    let written: Vec<_> = out.series().collect();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].len(), 4);
    assert_eq!(written[0].alignment(), Alignment::zero());
    assert_eq!(written[0].last_alignment(), Some(Alignment::from_raw(3)));
    assert_eq!(recorded.lock().unwrap().len(), 4);
}

#[test]
fn test_first_activation_waits_for_every_input() {
    let mut ir = Ir::new();
    ir.stages.push(binary_stage("add"));
    ir.nodes
        .push(Node::new("m", "add").reading(10, "a").reading(20, "b"));
    ir.strata = Strata::new().with("m", 0);

    let (factory, recorded) = recording_factory(&["add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();

    rt.next(Frame::unary(ch(10), series(0, &[1.0]))).unwrap();
    assert!(!rt.node("m").unwrap().is_activated());
    assert!(recorded.lock().unwrap().is_empty());
    assert_eq!(rt.stats().nodes_skipped, 1);

    rt.next(Frame::unary(ch(20), series(0, &[2.0]))).unwrap();
    assert!(rt.node("m").unwrap().is_activated());
    assert_eq!(rt.stats().node_executions, 1);
    assert_eq!(*recorded.lock().unwrap(), vec![f64s(&[1.0, 2.0])]);
}

#[test]
fn test_shorter_input_repeats_last_value() {
    let mut ir = Ir::new();
    ir.stages.push(binary_stage("add"));
    ir.nodes.push(Node::new("m", "add").reading(1, "a").reading(2, "b"));
    ir.strata = Strata::new().with("m", 0);

    let (factory, recorded) = recording_factory(&["add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    let frame = Frame::new()
        .with(ch(1), series(0, &[1.0, 2.0, 3.0]))
        .unwrap()
        .with(ch(2), series(0, &[10.0, 20.0, 30.0, 40.0, 50.0]))
        .unwrap();
    rt.next(frame).unwrap();

    let recorded = recorded.lock().unwrap();
    let a: Vec<_> = recorded.iter().map(|s| s[0].clone()).collect();
    let b: Vec<_> = recorded.iter().map(|s| s[1].clone()).collect();
    assert_eq!(a, f64s(&[1.0, 2.0, 3.0, 3.0, 3.0]));
    assert_eq!(b, f64s(&[10.0, 20.0, 30.0, 40.0, 50.0]));
}

#[test]
fn test_unseen_edge_input_takes_zero_value() {
    // src reads 2 and feeds sum.b; sum reads 1 into sum.a
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.stages.push(binary_stage("add"));
    ir.nodes.push(Node::new("src", "pass").reading(2, "input"));
    ir.nodes.push(Node::new("sum", "add").reading(1, "a"));
    ir.edges
        .push(Edge::new(Handle::new("src", "output"), Handle::new("sum", "b")));
    ir.strata = Strata::new().with("src", 0).with("sum", 1);

    let (factory, recorded) = recording_factory(&["pass", "add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    rt.next(Frame::unary(ch(1), series(0, &[5.0]))).unwrap();

    assert!(rt.node("sum").unwrap().is_activated());
    assert!(!rt.node("src").unwrap().is_activated());
    assert_eq!(*recorded.lock().unwrap(), vec![f64s(&[5.0, 0.0])]);
}

#[test]
fn test_declared_default_beats_zero_value() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.stages.push(
        Stage::new("add")
            .with_param(Param::new("a", DataType::F64))
            .with_param(Param::new("b", DataType::F64).with_default(Value::F64(1.5)))
            .with_output(Param::new("output", DataType::F64)),
    );
    ir.nodes.push(Node::new("src", "pass").reading(2, "input"));
    ir.nodes.push(Node::new("sum", "add").reading(1, "a"));
    ir.edges
        .push(Edge::new(Handle::new("src", "output"), Handle::new("sum", "b")));
    ir.strata = Strata::new().with("src", 0).with("sum", 1);

    let (factory, recorded) = recording_factory(&["pass", "add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    rt.next(Frame::unary(ch(1), series(0, &[5.0]))).unwrap();
    assert_eq!(*recorded.lock().unwrap(), vec![f64s(&[5.0, 1.5])]);
}

#[test]
fn test_edge_buffers_do_not_leak_across_frames() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.stages.push(binary_stage("add"));
    ir.nodes.push(Node::new("src", "pass").reading(1, "input"));
    ir.nodes.push(Node::new("sink", "add").reading(2, "a"));
    ir.edges
        .push(Edge::new(Handle::new("src", "output"), Handle::new("sink", "b")));
    ir.strata = Strata::new().with("src", 0).with("sink", 1);

    let (factory, recorded) = recording_factory(&["pass", "add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();

    let frame = Frame::new()
        .with(ch(1), series(0, &[1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap()
        .with(ch(2), series(0, &[100.0]))
        .unwrap();
    rt.next(frame).unwrap();
    // src ran 5 times, sink ran 5 times against the edge values
    assert_eq!(recorded.lock().unwrap().len(), 10);

    recorded.lock().unwrap().clear();
    rt.next(Frame::unary(ch(2), series(1, &[200.0]))).unwrap();
    // Only sink runs, once, for its single new channel sample
    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0][0], Value::F64(200.0));
}

#[test]
fn test_gc_waits_for_slowest_subscriber() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.stages.push(binary_stage("add"));
    ir.nodes.push(Node::new("fast", "pass").reading(1, "input"));
    ir.nodes.push(Node::new("slow", "add").reading(1, "a").reading(2, "b"));
    ir.strata = Strata::new().with("fast", 0).with("slow", 0);

    let (factory, _) = recording_factory(&["pass", "add"]);
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();

    rt.next(Frame::unary(ch(1), series(0, &[1.0, 2.0]))).unwrap();
    rt.next(Frame::unary(ch(1), series(2, &[3.0]))).unwrap();
    // slow is dormant and has consumed nothing, so every series stays
    assert_eq!(rt.channel(ch(1)).unwrap().series().count(), 2);
    assert_eq!(
        rt.node("fast").unwrap().watermark(ch(1)),
        Some(Alignment::from_raw(2))
    );

    rt.next(Frame::unary(ch(2), series(0, &[9.0]))).unwrap();
    assert_eq!(
        rt.node("slow").unwrap().watermark(ch(1)),
        Some(Alignment::from_raw(2))
    );
    assert_eq!(rt.channel(ch(1)).unwrap().series().count(), 0);
    assert_eq!(rt.stats().series_collected, 3);
}

#[test]
fn test_stateful_variables_persist_across_invocations() {
    let mut ir = Ir::new();
    ir.stages.push(
        unary_stage("count").with_stateful(Param::new("seen", DataType::U64)),
    );
    ir.nodes
        .push(Node::new("c", "count").reading(1, "input").writing(2, "output"));
    ir.strata = Strata::new().with("c", 0);

    let factory = FnFactory::new().with_stage("count", |inv| {
        let seen = inv.state_var("seen").and_then(Value::as_i64).unwrap_or(0) as u64 + 1;
        let mut state = inv.state.clone();
        state.insert("seen".to_string(), Value::U64(seen));
        Ok(StageOutput::new()
            .with_output("output", seen as f64)
            .with_state(state))
    });
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    assert_eq!(rt.node("c").unwrap().state_var("seen"), Some(&Value::U64(0)));

    rt.next(Frame::unary(ch(1), series(0, &[1.0, 1.0, 1.0]))).unwrap();
    rt.next(Frame::unary(ch(1), series(3, &[1.0, 1.0]))).unwrap();

    assert_eq!(rt.node("c").unwrap().state_var("seen"), Some(&Value::U64(5)));
    let writes = rt.flush_writes();
    let counts: Vec<_> = writes
        .iter()
        .flat_map(|w| w.series.values().to_vec())
        .collect();
    assert_eq!(counts, f64s(&[1.0, 2.0, 3.0, 4.0, 5.0]));
}

#[test]
fn test_missing_routed_output_fails_node() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.nodes
        .push(Node::new("n", "pass").reading(1, "input").writing(2, "output"));
    ir.strata = Strata::new().with("n", 0);

    let factory = FnFactory::new().with_stage("pass", |_| Ok(StageOutput::new()));
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();
    let err = rt.next(Frame::unary(ch(1), series(0, &[1.0]))).unwrap_err();
    assert_eq!(err.node(), Some("n"));
    assert!(rt.flush_writes().is_empty());

    // The runtime stays usable
    assert_eq!(rt.frame_number(), 1);
    assert!(rt.next(Frame::new()).is_ok());
}

#[test]
fn test_frame_after_failure_sees_fresh_edges() {
    let mut ir = Ir::new();
    ir.stages.push(unary_stage("pass"));
    ir.stages.push(binary_stage("add"));
    ir.nodes.push(Node::new("src", "pass").reading(1, "input"));
    ir.nodes.push(Node::new("sink", "add").reading(2, "a"));
    ir.edges
        .push(Edge::new(Handle::new("src", "output"), Handle::new("sink", "b")));
    ir.strata = Strata::new().with("src", 0).with("sink", 1);

    let recorded: Recorded = Arc::default();
    let sink = Arc::clone(&recorded);
    let factory = FnFactory::new()
        .with_stage("pass", |inv| {
            let x = inv.input("input").and_then(Value::as_f64).unwrap_or_default();
            Ok(StageOutput::new().with_output("output", x))
        })
        .with_stage("add", move |inv| {
            let a = inv.input("a").and_then(Value::as_f64).unwrap_or_default();
            if a < 0.0 {
                return Err(StageError::Failed("negative".to_string()));
            }
            sink.lock().unwrap().push(inv.sample.values().to_vec());
            Ok(StageOutput::new().with_output("output", a))
        });
    let mut rt = Runtime::new(&ir, &factory, RuntimeConfig::default()).unwrap();

    let frame = Frame::new()
        .with(ch(1), series(0, &[1.0, 2.0, 3.0]))
        .unwrap()
        .with(ch(2), series(0, &[-1.0]))
        .unwrap();
    let err = rt.next(frame).unwrap_err();
    assert_eq!(err.node(), Some("sink"));
    assert!(recorded.lock().unwrap().is_empty());

    rt.next(Frame::unary(ch(2), series(1, &[10.0]))).unwrap();
    // One sample from the channel, no edge values carried over from the
    // failed frame, and the rejected sample is not delivered again
    assert_eq!(*recorded.lock().unwrap(), vec![f64s(&[10.0, 0.0])]);
    assert_eq!(
        rt.node("sink").unwrap().watermark(ch(2)),
        Some(Alignment::from_raw(1))
    );
    assert_eq!(rt.channel(ch(2)).unwrap().series().count(), 0);
}
