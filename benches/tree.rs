use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use trace_tree::{Endpoint, Kind, NoopLogger, Span, TraceId, TreeBuilder};

const TRACE_ID: u128 = 0x86154a4ba6e91385;

/// A trace shaped like production data: an RPC fan-out two levels deep,
/// every server half sharing its client's span id.
fn synthetic_trace(fanout: u64) -> Vec<Span> {
    let trace_id = TraceId::from(TRACE_ID);
    let mut spans = vec![Span::builder().trace_id(trace_id).id(1u64).build()];
    for client in 0..fanout {
        let client_id = 2 + client * 2;
        spans.push(
            Span::builder()
                .trace_id(trace_id)
                .id(client_id)
                .parent_id(1u64)
                .kind(Kind::Client)
                .build(),
        );
        spans.push(
            Span::builder()
                .trace_id(trace_id)
                .id(client_id)
                .parent_id(1u64)
                .kind(Kind::Server)
                .shared(true)
                .local_endpoint(
                    Endpoint::builder()
                        .service_name(format!("svc-{client}"))
                        .build(),
                )
                .build(),
        );
        spans.push(
            Span::builder()
                .trace_id(trace_id)
                .id(client_id + 1)
                .parent_id(client_id)
                .local_endpoint(
                    Endpoint::builder()
                        .service_name(format!("svc-{client}"))
                        .build(),
                )
                .build(),
        );
    }
    spans
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_builder");
    for fanout in [8, 64, 512] {
        group.bench_function(format!("build_{}_spans", 1 + fanout * 3), |b| {
            b.iter_batched(
                || synthetic_trace(fanout as u64),
                |spans| {
                    let mut builder = TreeBuilder::new(TraceId::from(TRACE_ID), NoopLogger);
                    for span in spans {
                        builder.add_node(span);
                    }
                    builder.build()
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
