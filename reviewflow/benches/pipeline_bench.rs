//! Benchmarks for routing and pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reviewflow::core::{StageId, Verdict};
use reviewflow::pipeline::Executor;
use reviewflow::testing::{ScriptedCapabilities, ScriptedReviewer};

fn routing_benchmark(c: &mut Criterion) {
    let graph = ScriptedCapabilities::new().graph();

    c.bench_function("route_security_rejection", |b| {
        b.iter(|| graph.next(black_box(StageId::Security), black_box(Verdict::FeedBack)))
    });
}

fn run_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    c.bench_function("run_all_approved", |b| {
        b.iter(|| {
            let caps = ScriptedCapabilities::new();
            let mut executor = Executor::new(caps.graph());
            runtime.block_on(executor.run(black_box("todo app"), 20))
        })
    });

    c.bench_function("run_with_revisions", |b| {
        b.iter(|| {
            let caps = ScriptedCapabilities::new()
                .with_reviewer(
                    StageId::Code,
                    ScriptedReviewer::new(StageId::Code).then_reject("a").then_reject("b"),
                )
                .with_reviewer(
                    StageId::Security,
                    ScriptedReviewer::new(StageId::Security).then_reject("c"),
                );
            let mut executor = Executor::new(caps.graph());
            runtime.block_on(executor.run(black_box("todo app"), 20))
        })
    });
}

criterion_group!(benches, routing_benchmark, run_benchmark);
criterion_main!(benches);
