//! Scalability benchmarks for the Ant Arena simulation
//!
//! Measures tick cost as the ant population grows, on both sides of the
//! parallel decision threshold.
//!
//! Run with: cargo bench --bench scalability

use std::collections::HashSet;

use ant_arena_server::game::snapshot::GameSnapshot;
use ant_arena_server::game::spatial::ChunkIndex;
use ant_arena_server::game::state::{Position, Rule, TurnDirection};
use ant_arena_server::{GameConfig, GameEngine};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

const GRID: u32 = 1000;

/// Langton-style two-color rules plus a third color to keep ants busy
fn busy_rules(color: &str) -> Vec<Rule> {
    vec![
        Rule::new("#FFFFFF", color, TurnDirection::Right),
        Rule::new(color, "#000000", TurnDirection::Left),
        Rule::new("#000000", "#FFFFFF", TurnDirection::Right),
    ]
}

/// Create an engine with the specified number of randomly placed ants
fn create_engine_with_ants(count: usize) -> GameEngine {
    let mut engine = GameEngine::new(GameConfig {
        grid_width: GRID,
        grid_height: GRID,
        chunk_size: 50,
        max_players: count,
        ..GameConfig::default()
    });
    let mut rng = rand::thread_rng();
    let mut used = HashSet::new();

    for _ in 0..count {
        let player = engine.add_player().expect("capacity sized to count");
        let position = loop {
            let p = Position::new(rng.gen_range(0..GRID), rng.gen_range(0..GRID));
            if used.insert(p) {
                break p;
            }
        };
        engine
            .place_ant(player.id, position, busy_rules(&player.color))
            .expect("free cell");
    }

    engine
}

/// Benchmark a full tick at various ant counts
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(50);

    for count in [10, 100, 500, 1000, 2000] {
        let mut engine = create_engine_with_ants(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("ants", count), &count, |b, _| {
            b.iter(|| black_box(engine.tick()))
        });
    }
    group.finish();
}

/// Benchmark ticks on a crowded board where most moves collide
fn bench_contended_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_tick");
    group.sample_size(30);

    for count in [100, 400] {
        let side = (count as f64).sqrt().ceil() as u32 + 2;
        let mut engine = GameEngine::new(GameConfig {
            grid_width: side,
            grid_height: side,
            chunk_size: 4,
            max_players: count,
            ..GameConfig::default()
        });
        let mut placed = 0u32;
        while (placed as usize) < count {
            let player = engine.add_player().expect("capacity sized to count");
            let position = Position::new(placed % side, placed / side);
            engine
                .place_ant(player.id, position, busy_rules(&player.color))
                .expect("free cell");
            placed += 1;
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("dense", count), &count, |b, _| {
            b.iter(|| black_box(engine.tick()))
        });
    }
    group.finish();
}

/// Benchmark snapshot capture and encoding after the board has filled in
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    group.sample_size(30);

    for count in [100, 500] {
        let mut engine = create_engine_with_ants(count);
        for _ in 0..200 {
            engine.tick();
        }

        group.bench_with_input(BenchmarkId::new("encode", count), &count, |b, _| {
            b.iter(|| {
                let snapshot: GameSnapshot = engine.snapshot();
                black_box(serde_json::to_string(&snapshot).expect("snapshot encodes"))
            })
        });
    }
    group.finish();
}

/// Benchmark chunk index churn (remove + insert per move)
fn bench_chunk_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_index");
    group.sample_size(50);

    for count in [100, 1000, 5000] {
        let mut rng = rand::thread_rng();
        let positions: Vec<Position> = (0..count)
            .map(|_| Position::new(rng.gen_range(0..GRID), rng.gen_range(0..GRID)))
            .collect();
        let mut index = ChunkIndex::new(GRID, GRID, 50);
        for p in &positions {
            index.insert(*p);
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("move", count), &count, |b, _| {
            b.iter(|| {
                for p in &positions {
                    index.remove(*p);
                    let moved = Position::new((p.x + 1) % GRID, p.y);
                    index.insert(moved);
                    index.remove(moved);
                    index.insert(*p);
                }
                black_box(index.occupied_count())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tick,
    bench_contended_tick,
    bench_snapshot,
    bench_chunk_index,
);

criterion_main!(benches);
