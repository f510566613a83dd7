use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kava_engine::{Engine, EngineConfig, Program, StepOutcome, TryBlock};

fn spinner() -> Program {
    Program::new("Spin.run")
        .step(|_| Ok(StepOutcome::Next))
        .step(|_| Ok(StepOutcome::Jump(0)))
}

fn bench_round_robin(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_robin");
    for threads in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &n| {
            let mut engine = Engine::new(EngineConfig::default()).unwrap();
            let program = spinner().into_arc();
            for i in 0..n {
                engine.spawn(format!("t{}", i), program.clone(), vec![]).unwrap();
            }
            b.iter(|| black_box(engine.run(1_000)));
        });
    }
    group.finish();
}

fn bench_monitor_contention(c: &mut Criterion) {
    c.bench_function("monitor_contention_8", |b| {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let lock = engine.context().new_object("Object").unwrap();
        let program = Program::new("Locker.run")
            .step({
                let lock = lock.clone();
                move |_| Ok(StepOutcome::MonitorEnter(lock.clone()))
            })
            .step(move |_| Ok(StepOutcome::MonitorExit(lock.clone())))
            .step(|_| Ok(StepOutcome::Jump(0)))
            .into_arc();
        for i in 0..8 {
            engine.spawn(format!("t{}", i), program.clone(), vec![]).unwrap();
        }
        b.iter(|| black_box(engine.run(1_000)));
    });
}

fn bench_catch_and_resume(c: &mut Criterion) {
    c.bench_function("throw_catch_loop", |b| {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let program = Program::new("Thrower.run")
            .step(|_| Ok(StepOutcome::EnterTry(TryBlock::new().catch(["Exception"], 2))))
            .step(|ctx| ctx.throw("IllegalArgumentException", "bench"))
            .step(|ctx| {
                ctx.pop()?;
                Ok(StepOutcome::Jump(0))
            })
            .into_arc();
        engine.spawn_main(program, vec![]).unwrap();
        b.iter(|| black_box(engine.run(1_000)));
    });
}

criterion_group!(
    benches,
    bench_round_robin,
    bench_monitor_contention,
    bench_catch_and_resume
);
criterion_main!(benches);
