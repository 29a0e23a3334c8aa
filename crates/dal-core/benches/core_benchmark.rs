//! Benchmark tests for dal-core operations
//!
//! Run with: cargo bench -p dal-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use dal_core::captions::{self, WebVttParser};
use dal_core::events::{self, handler, EventHub, EventPayload};
use dal_core::{AdItem, AdsPlugin, HeadlessSurface, Player, PlayerOptions};

// ============================================================================
// Helpers
// ============================================================================

fn mid_roll_schedule(count: usize) -> Vec<AdItem> {
    (0..count)
        .map(|i| AdItem::mid("mid.mp4", 10_000.0 + i as f64))
        .collect()
}

fn timestamp(seconds: usize) -> String {
    format!(
        "{:02}:{:02}:{:02}.000",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    )
}

fn create_test_vtt(cues: usize) -> String {
    let mut vtt = String::from("WEBVTT\n\n");
    for i in 0..cues {
        let start = i * 4;
        vtt.push_str(&format!(
            "{}\n{} --> {}\nLine number {}\n\n",
            i + 1,
            timestamp(start),
            timestamp(start + 3),
            i
        ));
    }
    vtt
}

// ============================================================================
// Event Hub Benchmarks
// ============================================================================

fn bench_hub_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("Event Hub Fan-out");

    for &subscribers in &[1, 10, 100] {
        let hub = EventHub::new();
        for _ in 0..subscribers {
            hub.subscribe(events::TIME_UPDATE, handler(|payload| {
                black_box(payload.as_time());
            }));
        }

        group.bench_with_input(
            BenchmarkId::new("publish", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| hub.publish(events::TIME_UPDATE, black_box(&EventPayload::Time(12.5))))
            },
        );
    }

    group.finish();
}

// ============================================================================
// Ad Engine Benchmarks
// ============================================================================

fn bench_engine_time_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ad Engine Position Scan");

    for &ads in &[1, 10, 100] {
        let surface = Arc::new(HeadlessSurface::default().with_media("content.mp4", 20_000.0));
        let player = Player::new(surface, PlayerOptions::with_source("content.mp4"));
        player.register(Arc::new(AdsPlugin::new(mid_roll_schedule(ads))));

        // Mid-rolls sit past every position published here
        group.bench_with_input(BenchmarkId::new("timeupdate", ads), &ads, |b, _| {
            let mut position = 0.0;
            b.iter(|| {
                position = (position + 0.25) % 5_000.0;
                player.emit(events::TIME_UPDATE, EventPayload::Time(black_box(position)))
            })
        });
    }

    group.finish();
}

// ============================================================================
// Caption Benchmarks
// ============================================================================

fn bench_caption_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Caption Parsing");

    for &cues in &[10, 100, 1000] {
        let vtt = create_test_vtt(cues);
        group.bench_with_input(BenchmarkId::new("webvtt", cues), &vtt, |b, vtt| {
            b.iter(|| WebVttParser::parse(black_box(vtt)).unwrap())
        });
    }

    let parsed = WebVttParser::parse(&create_test_vtt(1000)).unwrap();
    group.bench_function("cues_at_time", |b| {
        b.iter(|| captions::cues_at_time(&parsed, black_box(1234.0)).len())
    });

    group.finish();
}

criterion_group!(hub_benches, bench_hub_fan_out);

criterion_group!(engine_benches, bench_engine_time_update);

criterion_group!(caption_benches, bench_caption_parsing);

criterion_main!(hub_benches, engine_benches, caption_benches);
