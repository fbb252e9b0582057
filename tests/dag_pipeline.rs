// tests/dag_pipeline.rs

mod common;

use std::time::Duration;

use benchdag::dag::{BoxFuture, DagGraph, Node, Pipeline, SharedContext, Slot};
use benchdag::errors::BenchError;

#[derive(Debug, Default)]
struct Ctx {
    b: Slot<String>,
    c: Slot<String>,
    d: Slot<String>,
    log: Vec<String>,
}

fn slot_b(c: &mut Ctx) -> &mut Slot<String> {
    &mut c.b
}

fn slot_c(c: &mut Ctx) -> &mut Slot<String> {
    &mut c.c
}

/// Logs its start and end, sleeping in between, and optionally fills a slot.
struct Work {
    name: &'static str,
    delay: Duration,
    slot: Option<fn(&mut Ctx) -> &mut Slot<String>>,
    writes: &'static [&'static str],
}

impl Work {
    fn plain(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::from_millis(5),
            slot: None,
            writes: &[],
        }
    }

    fn filling(name: &'static str, slot: fn(&mut Ctx) -> &mut Slot<String>) -> Self {
        Self {
            slot: Some(slot),
            ..Self::plain(name)
        }
    }

    fn writing(mut self, keys: &'static [&'static str]) -> Self {
        self.writes = keys;
        self
    }
}

impl Node<Ctx> for Work {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<Ctx>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.write(|c| c.log.push(format!("start:{}", self.name)));
            tokio::time::sleep(self.delay).await;
            ctx.write(|c| {
                if let Some(slot) = self.slot {
                    slot(c).set(format!("from {}", self.name));
                }
                c.log.push(format!("end:{}", self.name));
            });
            Ok(())
        })
    }

    fn writes(&self) -> &[&'static str] {
        self.writes
    }
}

/// Joins B and C, or records a failure if either is missing.
struct Join;

impl Node<Ctx> for Join {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<Ctx>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let joined = ctx.write(|c| {
                c.log.push("start:D".to_string());
                match (c.b.get(), c.c.get()) {
                    (Some(b), Some(c_val)) => {
                        let v = format!("{b} + {c_val}");
                        c.d.set(v.clone());
                        Some(v)
                    }
                    _ => None,
                }
            });
            if joined.is_none() {
                ctx.fail("D ran before both inputs were ready");
            }
            Ok(())
        })
    }
}

struct Broken;

impl Node<Ctx> for Broken {
    fn execute<'a>(&'a self, _ctx: &'a SharedContext<Ctx>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { anyhow::bail!("disk on fire") })
    }
}

/// Records a recoverable failure instead of erroring.
struct SoftFail;

impl Node<Ctx> for SoftFail {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<Ctx>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.fail("no input");
            ctx.fail("second reason is ignored");
            Ok(())
        })
    }
}

/// Skips its work when an earlier node recorded a failure.
struct Guarded;

impl Node<Ctx> for Guarded {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<Ctx>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            if ctx.has_failed() {
                ctx.write(|c| c.log.push("skipped".to_string()));
                return Ok(());
            }
            ctx.write(|c| c.log.push("worked".to_string()));
            Ok(())
        })
    }
}

fn diamond() -> DagGraph<Ctx> {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("B", Work::filling("B", slot_b)).unwrap();
    g.add_named("C", Work::filling("C", slot_c)).unwrap();
    g.add_named("D", Join).unwrap();
    g.add_edges("A", &["B", "C"]).unwrap();
    g.add_edge("B", "D").unwrap();
    g.add_edge("C", "D").unwrap();
    g
}

fn pos(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{entry} missing from {log:?}"))
}

#[tokio::test]
async fn diamond_join_sees_both_branches() {
    common::init_tracing();

    let pipeline = Pipeline::new(diamond(), "A").unwrap();
    let ctx = common::with_timeout(pipeline.run_with(Ctx::default()))
        .await
        .unwrap();
    let (state, error) = ctx.into_parts();

    assert_eq!(error, None);
    assert_eq!(state.d.get().map(String::as_str), Some("from B + from C"));

    let log = &state.log;
    assert_eq!(log.len(), 7, "every node runs once: {log:?}");
    assert!(pos(log, "end:A") < pos(log, "start:B"));
    assert!(pos(log, "end:A") < pos(log, "start:C"));
    assert!(pos(log, "end:B") < pos(log, "start:D"));
    assert!(pos(log, "end:C") < pos(log, "start:D"));

    // B and C share a frontier, so both start before either finishes.
    assert!(pos(log, "start:C") < pos(log, "end:B"));
    assert!(pos(log, "start:B") < pos(log, "end:C"));
}

#[tokio::test]
async fn cycle_is_reported_not_hung() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("B", Work::plain("B")).unwrap();
    g.add_named("C", Work::plain("C")).unwrap();
    g.chain(&["A", "B", "C", "B"]).unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    let ctx = SharedContext::new(Ctx::default());
    let err = common::with_timeout(pipeline.run(&ctx)).await.unwrap_err();

    match err {
        BenchError::CycleDetected(msg) => {
            assert!(msg.contains('B') && msg.contains('C'), "got: {msg}");
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
    // Work before the cycle still ran; nothing inside it did.
    ctx.read(|c| assert_eq!(c.log, vec!["start:A", "end:A"]));
}

#[tokio::test]
async fn root_inside_cycle_is_a_cycle() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("B", Work::plain("B")).unwrap();
    g.chain(&["A", "B", "A"]).unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    let err = pipeline.run_with(Ctx::default()).await.unwrap_err();
    assert!(matches!(err, BenchError::CycleDetected(_)));
}

#[tokio::test]
async fn predecessor_outside_the_run_is_rejected() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("B", Work::plain("B")).unwrap();
    g.add_named("X", Work::plain("X")).unwrap();
    g.add_edge("A", "B").unwrap();
    g.add_edge("X", "B").unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    assert_eq!(pipeline.collect_nodes(), vec!["A", "B"]);

    let ctx = SharedContext::new(Ctx::default());
    let err = pipeline.run(&ctx).await.unwrap_err();
    match err {
        BenchError::UnreachablePredecessor { node, predecessor } => {
            assert_eq!(node, "B");
            assert_eq!(predecessor, "X");
        }
        other => panic!("expected UnreachablePredecessor, got {other:?}"),
    }
    ctx.read(|c| assert!(c.log.is_empty()));
}

#[tokio::test]
async fn declared_write_conflict_in_one_frontier_aborts() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("B", Work::plain("B").writing(&["summary"])).unwrap();
    g.add_named("C", Work::plain("C").writing(&["notes", "summary"])).unwrap();
    g.add_edges("A", &["B", "C"]).unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    let ctx = SharedContext::new(Ctx::default());
    let err = pipeline.run(&ctx).await.unwrap_err();

    match err {
        BenchError::ConflictingWrites { key, first, second } => {
            assert_eq!(key, "summary");
            assert_eq!((first.as_str(), second.as_str()), ("B", "C"));
        }
        other => panic!("expected ConflictingWrites, got {other:?}"),
    }
    ctx.read(|c| assert!(!c.log.iter().any(|e| e == "start:B" || e == "start:C")));
}

#[tokio::test]
async fn same_key_in_different_frontiers_is_fine() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A").writing(&["summary"])).unwrap();
    g.add_named("B", Work::plain("B").writing(&["summary"])).unwrap();
    g.add_edge("A", "B").unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    pipeline.run_with(Ctx::default()).await.unwrap();
}

#[tokio::test]
async fn node_error_is_fatal_to_the_run() {
    let mut g = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();
    g.add_named("bad", Broken).unwrap();
    g.add_named("sibling", Work::plain("sibling")).unwrap();
    g.add_named("after", Work::plain("after")).unwrap();
    g.add_edges("A", &["bad", "sibling"]).unwrap();
    g.add_edge("bad", "after").unwrap();

    let pipeline = Pipeline::new(g, "A").unwrap();
    let ctx = SharedContext::new(Ctx::default());
    let err = pipeline.run(&ctx).await.unwrap_err();

    match &err {
        BenchError::NodeFailed { node, source } => {
            assert_eq!(node, "bad");
            assert!(source.to_string().contains("disk on fire"));
        }
        other => panic!("expected NodeFailed, got {other:?}"),
    }
    ctx.read(|c| {
        // The frontier settles before the run stops.
        assert!(c.log.contains(&"end:sibling".to_string()));
        assert!(!c.log.iter().any(|e| e.contains("after")));
    });
}

#[tokio::test]
async fn recorded_failure_lets_later_nodes_short_circuit() {
    let mut g = DagGraph::new();
    let first = g.add_node(SoftFail);
    let second = g.add_node(Guarded);
    g.add_edge(&first, &second).unwrap();

    let pipeline = Pipeline::new(g, first.clone()).unwrap();
    let ctx = pipeline.run_with(Ctx::default()).await.unwrap();
    let (state, error) = ctx.into_parts();

    assert_eq!(error.as_deref(), Some("no input"));
    assert_eq!(state.log, vec!["skipped"]);
}

#[test]
fn graph_builder_rejects_bad_ids() {
    let mut g: DagGraph<Ctx> = DagGraph::new();
    g.add_named("A", Work::plain("A")).unwrap();

    assert!(matches!(
        g.add_named("A", Work::plain("A")),
        Err(BenchError::DuplicateNode(id)) if id == "A"
    ));
    assert!(matches!(
        g.add_edge("A", "missing"),
        Err(BenchError::UnknownNode(id)) if id == "missing"
    ));
    assert!(matches!(
        Pipeline::new(g, "nope"),
        Err(BenchError::UnknownNode(_))
    ));
}

#[test]
fn generated_ids_are_short_and_unique() {
    let mut g: DagGraph<Ctx> = DagGraph::new();
    let a = g.add_node(Work::plain("a"));
    let b = g.add_node(Work::plain("b"));
    assert_eq!(a.len(), 8);
    assert_ne!(a, b);
    assert_eq!(g.len(), 2);
}

#[test]
fn visualize_lists_every_edge() {
    let pipeline = Pipeline::new(diamond(), "A").unwrap();
    let chart = pipeline.visualize();
    let lines: Vec<&str> = chart.lines().map(str::trim).collect();

    assert_eq!(lines[0], "graph TD");
    for edge in ["A --> B", "A --> C", "B --> D", "C --> D"] {
        assert!(lines.contains(&edge), "missing {edge} in:\n{chart}");
    }
    assert!(lines.contains(&"A"));
}

#[test]
fn chain_links_consecutive_nodes() {
    let mut g: DagGraph<Ctx> = DagGraph::new();
    for id in ["one", "two", "three"] {
        g.add_named(id, Work::plain("x")).unwrap();
    }
    g.chain(&["one", "two", "three"]).unwrap();

    assert_eq!(g.successors_of("one"), vec!["two"]);
    assert_eq!(g.predecessors_of("three"), vec!["two"]);

    let pipeline = Pipeline::new(g, "one").unwrap();
    assert_eq!(pipeline.collect_nodes(), vec!["one", "two", "three"]);
}
