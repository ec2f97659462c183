//! Benchmarks for pipe composition and linked operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pipeworks::pipe::{AnyPipe, FnPipe, Pipe, PipeExt, PipeResult};
use pipeworks::pipeline::Pipeline;
use pipeworks::testing::AppendPipe;

fn increment() -> AnyPipe<u64, u64> {
    FnPipe::new(|n: u64| Ok(n + 1)).erase()
}

fn joint_benchmark(c: &mut Criterion) {
    let chained = (0..8).fold(increment(), |acc, _| acc + increment());

    c.bench_function("joint_8_stages", |b| {
        b.iter(|| {
            let (tx, rx) = std::sync::mpsc::channel::<PipeResult<u64>>();
            chained.begin(
                black_box(0),
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
            );
            black_box(rx.recv().ok())
        });
    });
}

fn operation_chain_benchmark(c: &mut Criterion) {
    c.bench_function("pipeline_5_operations", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::from_pipe(AppendPipe::foo());
            for _ in 0..4 {
                pipeline = match pipeline.then_pipe(AppendPipe::foo()) {
                    Ok(pipeline) => pipeline,
                    Err(e) => panic!("link failed: {e}"),
                };
            }
            pipeline.set_input(String::new());
            for op in pipeline.operations() {
                op.start();
            }
            black_box(pipeline.result())
        });
    });
}

criterion_group!(benches, joint_benchmark, operation_chain_benchmark);
criterion_main!(benches);
