use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frr_adapters::DemoProvider;
use frr_core::provider::{RaceDataProvider, RACE_SESSION};
use frr_core::replay::{FrameMask, Replay};
use std::time::Duration;

fn loaded_replay() -> Replay {
    let provider = DemoProvider::new();
    let session = provider
        .race_data(2024, "Demo", RACE_SESSION)
        .expect("demo session");
    let outline = provider.track_outline(2024, "Demo").expect("demo outline");

    let mut replay = Replay::new();
    replay.load(session, outline).expect("load demo session");
    replay
}

fn bench_frame_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_assembly");
    let replay = loaded_replay();
    let len = replay.scrubber().len();

    group.bench_function("frame_mid_race", |b| {
        let index = (len / 2) as f64;
        b.iter(|| black_box(replay.frame_at(black_box(index))));
    });

    group.bench_function("frame_sweep_100", |b| {
        b.iter(|| {
            for i in 0..100 {
                let index = (i * len / 100) as f64;
                black_box(replay.frame_at(index));
            }
        });
    });

    group.finish();
}

fn bench_frame_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_serialization");
    let replay = loaded_replay();
    let frame = replay
        .frame_at((replay.scrubber().len() / 2) as f64)
        .expect("mid-race frame");
    let mask = FrameMask::parse("leaderboard,track");

    group.bench_function("full_frame_json", |b| {
        b.iter(|| black_box(frame.to_json_filtered(None)));
    });

    group.bench_function("masked_frame_json", |b| {
        b.iter(|| black_box(frame.to_json_filtered(Some(&mask))));
    });

    group.finish();
}

fn bench_playback_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("playback");

    group.bench_function("tick_and_frame_60hz_second", |b| {
        b.iter_batched(
            || {
                let mut replay = loaded_replay();
                replay.play();
                replay
            },
            |mut replay| {
                let generation = replay.generation();
                for frame in 0..60u64 {
                    replay.tick(generation, Duration::from_millis(frame * 16));
                    black_box(replay.frame());
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_assembly,
    bench_frame_serialization,
    bench_playback_ticks
);
criterion_main!(benches);
