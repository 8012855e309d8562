//! Benchmarks for knowledge base entailment.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use warehouse_kb::agent::Agent;
use warehouse_kb::config::AgentConfig;
use warehouse_kb::grid::{Cell, GridBounds};
use warehouse_kb::kb::KnowledgeBase;
use warehouse_kb::oracle::SafetyOracle;
use warehouse_kb::percept::{Percept, interpret_all};
use warehouse_kb::world::{Layout, Warehouse};

/// A knowledge base after walking the bottom row of the example layout.
fn explored_kb() -> (KnowledgeBase, GridBounds) {
    let bounds = GridBounds::new(4, 4).unwrap();
    let mut kb = KnowledgeBase::new();
    let creaking = Percept {
        creaking: true,
        ..Percept::quiet()
    };
    let rumbling = Percept {
        rumbling: true,
        ..Percept::quiet()
    };
    interpret_all(&mut kb, bounds, Cell::new(1, 1), &Percept::quiet()).unwrap();
    interpret_all(&mut kb, bounds, Cell::new(2, 1), &creaking).unwrap();
    interpret_all(&mut kb, bounds, Cell::new(1, 2), &rumbling).unwrap();
    interpret_all(&mut kb, bounds, Cell::new(2, 2), &Percept::quiet()).unwrap();
    (kb, bounds)
}

fn bench_classify_all(c: &mut Criterion) {
    let (kb, bounds) = explored_kb();
    let oracle = SafetyOracle::default();
    let cells: Vec<Cell> = bounds.cells().collect();

    c.bench_function("classify_all_4x4", |bench| {
        bench.iter(|| black_box(oracle.classify_all(&kb, &cells).unwrap()))
    });
}

fn bench_consistency(c: &mut Criterion) {
    let (kb, _) = explored_kb();

    c.bench_function("is_consistent_4x4", |bench| {
        bench.iter(|| black_box(kb.is_consistent().unwrap()))
    });
}

fn bench_full_run(c: &mut Criterion) {
    c.bench_function("example_run", |bench| {
        bench.iter(|| {
            let mut world = Warehouse::new(Layout::example()).unwrap();
            let mut agent = Agent::for_environment(AgentConfig::default(), &world);
            black_box(agent.run(&mut world).unwrap())
        })
    });

    let layout = Layout::random(6, 6, 4, 7).unwrap();
    c.bench_function("random_run_6x6", |bench| {
        bench.iter(|| {
            let mut world = Warehouse::new(layout.clone()).unwrap();
            let mut agent = Agent::for_environment(AgentConfig::default(), &world);
            black_box(agent.run(&mut world).unwrap())
        })
    });
}

criterion_group!(benches, bench_classify_all, bench_consistency, bench_full_run);
criterion_main!(benches);
