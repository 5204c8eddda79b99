//! Performance benchmarks for goldfish trials and graph construction
//!
//! Three groups:
//!
//! 1. **trial** - one goldfish trial, with allocation metrics from a warmup run
//! 2. **simulation** - a full parallel run of 1000 trials
//! 3. **graph** - building the synergy graph for the fixture card store
//!
//! All use the red aggro deck from `test_decks/`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mtg_goldfish::{
    game::{GoldfishConfig, GoldfishSimulator},
    loader::{CardStore, Deck, DeckFormat, DeckLoader},
    simulation::{run_simulation, SimulationConfig},
    synergy::{GraphBuilder, RuleSet},
    Result,
};
use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};
use std::alloc::System;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

struct BenchmarkSetup {
    store: CardStore,
    deck: Deck,
}

impl BenchmarkSetup {
    fn load() -> Result<Self> {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let runtime = Runtime::new()?;
        let rules = RuleSet::standard()?;
        let (store, _, _) = runtime.block_on(CardStore::load_path(&root.join("test_data/cards"), rules))?;
        let list = DeckLoader::load_from_file(&root.join("test_decks/red_aggro.dck"))?;
        let deck = Deck::build(&list, &store, &DeckFormat::limited())?;
        Ok(BenchmarkSetup { store, deck })
    }
}

fn bench_trial(c: &mut Criterion) {
    let setup = match BenchmarkSetup::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Skipping benchmark - failed to load resources: {}", e);
            return;
        }
    };
    let config = GoldfishConfig::default();
    let simulator = GoldfishSimulator::new(&setup.deck, &config);

    let seed = 42u64;
    {
        let reg = Region::new(GLOBAL);
        let start = std::time::Instant::now();
        let outcome = simulator.run_trial(0, seed);
        let duration = start.elapsed();
        let stats = reg.change();

        println!("\nWarmup trial (seed {}):", seed);
        println!("  Turns: {}", outcome.turns_played);
        println!("  Spells cast: {}", outcome.spells_cast);
        println!("  Duration: {:?}", duration);
        println!("  Trials/sec: {:.2}", 1.0 / duration.as_secs_f64());
        println!("  Bytes allocated: {}", stats.bytes_allocated);
        println!("  Bytes deallocated: {}", stats.bytes_deallocated);
        println!(
            "  Bytes/turn: {:.2}",
            stats.bytes_allocated as f64 / outcome.turns_played.max(1) as f64
        );
    }

    let mut group = c.benchmark_group("trial");
    group.bench_with_input(BenchmarkId::new("red_aggro", seed), &seed, |b, &seed| {
        b.iter(|| simulator.run_trial(0, black_box(seed)));
    });
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let setup = match BenchmarkSetup::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Skipping benchmark - failed to load resources: {}", e);
            return;
        }
    };
    let config = SimulationConfig::default().with_trials(1000);

    let mut group = c.benchmark_group("simulation");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));
    group.bench_function(BenchmarkId::new("red_aggro", config.trials), |b| {
        b.iter(|| run_simulation(&setup.deck, black_box(&config), None).expect("simulation should complete"));
    });
    group.finish();
}

fn bench_graph_build(c: &mut Criterion) {
    let setup = match BenchmarkSetup::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Skipping benchmark - failed to load resources: {}", e);
            return;
        }
    };
    let rules = match RuleSet::standard() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Skipping benchmark - failed to compile rules: {}", e);
            return;
        }
    };

    let mut group = c.benchmark_group("graph");
    group.bench_function(BenchmarkId::new("build", setup.store.len()), |b| {
        b.iter(|| {
            GraphBuilder::new(rules)
                .build(black_box(&setup.store))
                .expect("graph should build")
        });
    });
    group.finish();
}

criterion_group!(benches, bench_trial, bench_simulation, bench_graph_build);
criterion_main!(benches);
