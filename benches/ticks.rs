use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use ecosync::{EnergyEngine, EnergyEngineConfig, StepEngine, StepEngineConfig};

fn step_engine() -> StepEngine {
    let engine = StepEngine::new(StepEngineConfig {
        seed: Some(42),
        ..StepEngineConfig::default()
    })
    .unwrap();
    // A few goals so each tick recomputes real progress.
    for name in ["France (Paris)", "Japan (Tokyo)", "Mars", "Neptune"] {
        engine.add_or_select_goal_by_name(name);
    }
    engine
}

fn energy_engine() -> EnergyEngine {
    EnergyEngine::new(EnergyEngineConfig {
        seed: Some(42),
        ..EnergyEngineConfig::default()
    })
    .unwrap()
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.throughput(Throughput::Elements(1));

    let steps = step_engine();
    group.bench_function("steps_step_once", |b| {
        b.iter(|| steps.step_once());
    });

    let energy = energy_engine();
    group.bench_function("energy_step_once", |b| {
        b.iter(|| energy.step_once());
    });

    // Same tick with a live subscriber draining the stream.
    let energy = energy_engine();
    let stream = energy.subscribe();
    group.bench_function("energy_step_once_subscribed", |b| {
        b.iter(|| {
            energy.step_once();
            stream.latest().unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
