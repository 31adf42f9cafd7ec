//! Benchmarks for scope operations

use std::sync::Arc;

use arbor_scope::{injectable, Scope, ScopeConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct Database {
    url: String,
}

struct RequestId(u64);

#[derive(Default)]
struct Handler {
    db: Option<Arc<Database>>,
    request: Option<Arc<RequestId>>,
    scope: Option<Scope>,
}

injectable!(Handler {
    field db,
    field request,
    scope scope,
});

fn root_with_database() -> Scope {
    let root = Scope::root();
    root.set(Database {
        url: "postgres://localhost/app".to_string(),
    });
    root
}

fn benchmark_lifecycle(c: &mut Criterion) {
    c.bench_function("fork_dispose", |b| {
        let root = Scope::root();
        b.iter(|| {
            let child = root.fork();
            black_box(child.id());
        })
    });

    c.bench_function("fork_dispose_prewarmed", |b| {
        let mut config = ScopeConfig::default();
        config.node_pool.prewarm = 64;
        let root = Scope::with_config(&config);
        b.iter(|| {
            let child = root.fork();
            black_box(child.id());
        })
    });

    c.bench_function("cascade_depth_32", |b| {
        let root = Scope::root();
        b.iter(|| {
            let mut chain = vec![root.fork()];
            for _ in 0..31 {
                let next = chain.last().unwrap().fork();
                chain.push(next);
            }
            black_box(chain.len())
        })
    });
}

fn benchmark_resolution(c: &mut Criterion) {
    let root = root_with_database();
    root.set_factory(|_| Arc::new(RequestId(7)));

    c.bench_function("resolve_value_local", |b| {
        b.iter(|| black_box(root.resolve::<Database>()))
    });

    c.bench_function("resolve_factory_local", |b| {
        b.iter(|| black_box(root.resolve::<RequestId>()))
    });

    c.bench_function("resolve_value_depth_16", |b| {
        let mut chain = vec![root.fork()];
        for _ in 0..15 {
            let next = chain.last().unwrap().fork();
            chain.push(next);
        }
        let leaf = chain.last().unwrap();
        b.iter(|| black_box(leaf.resolve::<Database>().map(|db| db.url.len())))
    });
}

fn benchmark_injection(c: &mut Criterion) {
    let root = root_with_database();

    c.bench_function("inject_request_handler", |b| {
        b.iter(|| {
            let request = root.fork();
            request.set(RequestId(1));
            let handler: Handler = request.build();
            black_box(handler.db.is_some())
        })
    });
}

criterion_group!(
    benches,
    benchmark_lifecycle,
    benchmark_resolution,
    benchmark_injection
);
criterion_main!(benches);
