// tests/scheduler_properties.rs

use std::collections::BTreeSet;

use benchdag::dag::{BoxFuture, DagGraph, Node, Pipeline, SharedContext};
use benchdag::errors::BenchError;
use proptest::prelude::*;

#[derive(Debug, Default)]
struct Trace {
    /// `(node, started)` in the order the events happened.
    events: Vec<(usize, bool)>,
}

struct Probe(usize);

impl Node<Trace> for Probe {
    fn execute<'a>(&'a self, ctx: &'a SharedContext<Trace>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.write(|t| t.events.push((self.0, true)));
            tokio::task::yield_now().await;
            ctx.write(|t| t.events.push((self.0, false)));
            Ok(())
        })
    }
}

fn name(i: usize) -> String {
    format!("n{i}")
}

// Node i may only depend on nodes 0..i, which keeps the graph acyclic.
// Node 0 is the root and feeds every node that has no other predecessor,
// so everything is reachable.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let mut deps: BTreeSet<usize> = BTreeSet::new();
                        if i > 0 {
                            deps.extend(picks.into_iter().map(|p| p % i));
                            if deps.is_empty() {
                                deps.insert(0);
                            }
                        }
                        deps
                    })
                    .collect()
            },
        )
    })
}

fn build(deps: &[BTreeSet<usize>]) -> DagGraph<Trace> {
    let mut g = DagGraph::new();
    for i in 0..deps.len() {
        g.add_named(name(i), Probe(i)).unwrap();
    }
    for (i, preds) in deps.iter().enumerate() {
        for &p in preds {
            g.add_edge(&name(p), &name(i)).unwrap();
        }
    }
    g
}

fn run(pipeline: &Pipeline<Trace>) -> (Result<(), BenchError>, Trace) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let ctx = SharedContext::new(Trace::default());
    let result = rt.block_on(pipeline.run(&ctx));
    (result, ctx.into_parts().0)
}

proptest! {
    #[test]
    fn every_node_runs_once_after_its_predecessors(deps in dag_strategy(12)) {
        let pipeline = Pipeline::new(build(&deps), name(0)).unwrap();
        let (result, trace) = run(&pipeline);
        prop_assert!(result.is_ok(), "run failed: {:?}", result);

        let position = |node: usize, started: bool| {
            let hits: Vec<usize> = trace
                .events
                .iter()
                .enumerate()
                .filter(|(_, e)| **e == (node, started))
                .map(|(at, _)| at)
                .collect();
            hits
        };

        for (i, preds) in deps.iter().enumerate() {
            let starts = position(i, true);
            let ends = position(i, false);
            prop_assert_eq!(starts.len(), 1, "node {} started {} times", i, starts.len());
            prop_assert_eq!(ends.len(), 1);

            for &p in preds {
                let pred_end = position(p, false)[0];
                prop_assert!(pred_end < starts[0], "node {} started before {} finished", i, p);
            }
        }
    }

    #[test]
    fn any_back_edge_is_reported_as_a_cycle(
        deps in dag_strategy(8).prop_filter("needs two nodes", |d| d.len() >= 2),
        pick in any::<usize>(),
    ) {
        let mut g = build(&deps);
        // Close a loop from some node back to the root.
        let last = 1 + pick % (deps.len() - 1);
        g.add_edge(&name(last), &name(0)).unwrap();

        let pipeline = Pipeline::new(g, name(0)).unwrap();
        let (result, _) = run(&pipeline);
        prop_assert!(matches!(result, Err(BenchError::CycleDetected(_))), "got {:?}", result);
    }
}
