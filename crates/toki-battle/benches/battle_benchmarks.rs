//! Battle core benchmarks.
//!
//! Measures the three hot paths of a headless battle: scheduling a batch of
//! turns, hashing a snapshot, and resolving a complete AI-vs-AI battle.
//!
//! Run with: `cargo bench --bench battle_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use toki_battle::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn skills() -> Vec<Skill> {
    vec![
        Skill::new("Strike").with_effect(
            EffectDefinition::new(TargetType::SingleEnemy)
                .with(EffectCalculator::Attack { base_power: 100 }),
        ),
        Skill::new("Scorch").with_cooldown(2).with_effect(
            EffectDefinition::new(TargetType::AllEnemies)
                .with(EffectCalculator::Attack { base_power: 50 })
                .with(EffectCalculator::StatusEffect {
                    kind: StatusKind::Burn,
                    chance: 0.5,
                    duration: 2,
                    strength: 2,
                }),
        ),
    ]
}

fn team(prefix: &str, size: usize) -> Vec<ComponentBundle<BattleComponent>> {
    (0..size)
        .map(|i| {
            ComponentBundle::new(format!("{prefix}{i}"))
                .with(StatsComponent::new(120, 15, 5, 8 + (i as i32 * 3) % 11).with_crit_chance(0.1))
                .with(SkillsComponent::new(skills()))
                .with(StatusEffectsComponent::new())
                .with(AiComponent::new().with_rule(0, AiCondition::EnemiesAtLeast { count: 2 }, 1))
        })
        .collect()
}

fn engine(size: usize, seed: u64) -> BattleEngine {
    let config = BattleConfig {
        max_turns: Some(2_000),
        ..BattleConfig::default().with_seed(seed)
    };
    BattleEngine::new(config, team("P", size), team("O", size)).unwrap()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_100_turns");
    for count in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let config = BattleConfig::default();
            b.iter(|| {
                let mut world = BattleWorld::new();
                let order: Vec<EntityId> = team("U", count)
                    .into_iter()
                    .map(|bundle| world.spawn_bundle(bundle))
                    .collect();
                let mut scheduler = TurnScheduler::new(&config);
                for _ in 0..100 {
                    if let Some(id) = scheduler.next_ready(&mut world, &order) {
                        scheduler.consume(&mut world, id);
                    }
                }
                black_box(scheduler.ticks_elapsed());
            });
        });
    }
    group.finish();
}

fn bench_state_hash(c: &mut Criterion) {
    let engine = engine(8, 1);
    c.bench_function("state_hash_16_entities", |b| {
        b.iter(|| black_box(engine.state_hash().unwrap()));
    });
}

fn bench_full_battle(c: &mut Criterion) {
    let mut group = c.benchmark_group("ai_battle");
    for size in [1usize, 3, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut seed = 0;
            b.iter(|| {
                seed += 1;
                let mut engine = engine(size, seed);
                engine.start_battle().unwrap();
                black_box(engine.turns_taken());
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_scheduler, bench_state_hash, bench_full_battle);
criterion_main!(benches);
