//! Integration tests for cyclic pipeline execution.
//!
//! A feedback loop must run to convergence, stop as soon as it no longer
//! feeds itself, and respect the per-component visit cap.

mod common;

use common::{component_inputs, AddValue, Double, Echo, Threshold};
use skein_core::prelude::*;
use skein_engine::Pipeline;
use std::collections::BTreeSet;

/// add_one feeds threshold; threshold sends the value back to add_one
/// while it is under the limit, and forward to double once it reaches it.
fn counting_loop(limit: i64) -> Pipeline {
    let mut pipeline = Pipeline::new();
    pipeline
        .add_component("add_one", Box::new(AddValue::new(1)))
        .unwrap();
    pipeline
        .add_component("threshold", Box::new(Threshold::new(limit)))
        .unwrap();
    pipeline.add_component("double", Box::new(Double)).unwrap();
    pipeline.connect("add_one.sum", "threshold.value").unwrap();
    pipeline.connect("threshold.below", "add_one.value").unwrap();
    pipeline.connect("threshold.above", "double.sum").unwrap();
    pipeline
}

#[test]
fn cycle_runs_until_it_stops_feeding_itself() {
    let pipeline = counting_loop(3);
    let outputs = pipeline
        .run(component_inputs("add_one", "value", Value::int(0)))
        .unwrap();

    // The loop counts 1, 2, 3; only then does threshold release the value
    // downstream. Nothing loops forever and nothing exits early.
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs["double"]["doubled"], Value::int(6));
}

#[test]
fn cycle_members_can_be_retained_in_outputs() {
    let pipeline = counting_loop(3);
    let include: BTreeSet<String> = ["add_one".to_string()].into();
    let outputs = pipeline
        .run_with_outputs(component_inputs("add_one", "value", Value::int(0)), &include)
        .unwrap();

    // Only the last-produced output of a looping component is kept.
    assert_eq!(outputs["add_one"]["sum"], Value::int(3));
    assert_eq!(outputs["double"]["doubled"], Value::int(6));
}

#[test]
fn rerunning_a_cyclic_pipeline_resets_visit_counters() {
    let pipeline = counting_loop(5).with_max_runs_per_component(8);

    let first = pipeline
        .run(component_inputs("add_one", "value", Value::int(0)))
        .unwrap();
    // Visit counters are per run; a second run must not inherit them.
    let second = pipeline
        .run(component_inputs("add_one", "value", Value::int(0)))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first["double"]["doubled"], Value::int(10));
}

#[test]
fn runaway_cycle_hits_the_visit_cap() {
    let mut pipeline = Pipeline::new().with_max_runs_per_component(3);
    pipeline.add_component("echo", Box::new(Echo)).unwrap();
    pipeline.connect("echo.value", "echo.value").unwrap();

    let err = pipeline
        .run(component_inputs("echo", "value", Value::int(1)))
        .unwrap_err();

    match err {
        SkeinError::MaxRunsExceeded {
            component,
            max_runs,
            ..
        } => {
            assert_eq!(component, "echo");
            assert_eq!(max_runs, 3);
        }
        other => panic!("expected MaxRunsExceeded error, got {other}"),
    }
}

#[test]
fn unbreakable_cycle_is_rejected_before_running() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("a", Box::new(Double)).unwrap();
    pipeline.add_component("b", Box::new(Double)).unwrap();
    pipeline.connect("a.doubled", "b.sum").unwrap();
    pipeline.connect("b.doubled", "a.sum").unwrap();

    // Both sockets in the cycle are mandatory scalars; there is no
    // connection the engine may remove to seed an execution order.
    let err = pipeline.run(Default::default()).unwrap_err();
    assert!(matches!(err, SkeinError::UnbreakableCycle { .. }));
    assert!(err.is_config_error());
}

#[test]
fn cycle_output_unblocks_downstream_components() {
    // Same loop, but the downstream component also has a second upstream
    // branch that is only runnable after the cycle completes.
    let mut pipeline = Pipeline::new();
    pipeline
        .add_component("add_one", Box::new(AddValue::new(1)))
        .unwrap();
    pipeline
        .add_component("threshold", Box::new(Threshold::new(2)))
        .unwrap();
    pipeline
        .add_component("after", Box::new(AddValue::new(10)))
        .unwrap();
    pipeline.connect("add_one.sum", "threshold.value").unwrap();
    pipeline.connect("threshold.below", "add_one.value").unwrap();
    pipeline.connect("threshold.above", "after.value").unwrap();

    let outputs = pipeline
        .run(component_inputs("add_one", "value", Value::int(0)))
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs["after"]["sum"], Value::int(12));
}
