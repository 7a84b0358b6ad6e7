use consjs::JsRuntime;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

fn bench_fib_recursive(c: &mut Criterion) {
    let script = "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(20)";
    c.bench_function("fib_recursive", |b| {
        b.iter(|| {
            let mut rt = JsRuntime::new();
            black_box(rt.evaluate(script).unwrap());
        })
    });
}

fn bench_promise_resolution(c: &mut Criterion) {
    let script = "let r; new Promise((resolve) => resolve(42)).then(v => { r = v; }); r";
    c.bench_function("promise_basic_resolution", |b| {
        b.iter(|| {
            let mut rt = JsRuntime::new();
            black_box(rt.evaluate(script).unwrap());
        })
    });
}

fn bench_generator_drain(c: &mut Criterion) {
    let script = "function* range(n) { for (let i = 0; i < n; i = i + 1) { yield i; } } let t = 0; for (const v of range(200)) { t += v; } t";
    c.bench_function("generator_drain_200", |b| {
        b.iter(|| {
            let mut rt = JsRuntime::new();
            black_box(rt.evaluate(script).unwrap());
        })
    });
}

criterion_group!(benches, bench_fib_recursive, bench_promise_resolution, bench_generator_drain);
criterion_main!(benches);
