//! MTG Goldfish - Main Binary
//!
//! Simulate decks, explore card synergies and inspect mana curves from the
//! command line.

use clap::{Parser, Subcommand};
use mtg_goldfish::{
    analysis::CurveSummary,
    config::{load_config, Config},
    core::CardId,
    game::{GoldfishSimulator, OutputMode, VerbosityLevel},
    loader::{CardStore, Deck, DeckFormat, DeckLoader},
    simulation::{run_simulation_with_progress, trial_seed, CancelToken, SimulationReport},
    synergy::{GraphCache, RuleSet, SynergyGraph, SynergyQuery},
    GoldfishError, Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Verbosity level for trial output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<VerbosityLevel>().map(VerbosityArg).map_err(|_| {
            format!("invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)")
        })
    }
}

#[derive(Parser)]
#[command(name = "goldfish")]
#[command(about = "MTG Goldfish - deck consistency simulator and synergy explorer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Monte Carlo goldfish trials for a deck
    Simulate {
        /// Card records: a JSON file or a directory of JSON files
        #[arg(long, value_name = "PATH")]
        cards: PathBuf,

        /// Deck list (.dck or plain text)
        #[arg(long, short = 'd')]
        deck: PathBuf,

        /// Deck format (limited, constructed, commander)
        #[arg(long)]
        format: Option<String>,

        /// Number of trials
        #[arg(long, short = 'n')]
        trials: Option<usize>,

        /// Base random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Stop launching trials after this many seconds
        #[arg(long)]
        seconds: Option<u64>,

        /// Draw a card on the first turn
        #[arg(long)]
        on_the_draw: bool,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the log of a single trial before the run
        #[arg(long, value_name = "INDEX")]
        trace: Option<usize>,

        /// Verbosity of the traced trial (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, short = 'v')]
        verbosity: Option<VerbosityArg>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the synergy neighbors and combo chains of one card
    Synergy {
        #[arg(long, value_name = "PATH")]
        cards: PathBuf,

        /// Card name or id
        #[arg(long)]
        card: String,

        #[arg(long, default_value_t = 0.1)]
        min_weight: f64,

        /// Also list combo chains up to this many hops
        #[arg(long, value_name = "DEPTH")]
        chains: Option<usize>,

        /// Use a graph saved by `build-graph` instead of building one
        #[arg(long)]
        graph: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Suggest cards to add to a deck
    Suggest {
        #[arg(long, value_name = "PATH")]
        cards: PathBuf,

        #[arg(long, short = 'd')]
        deck: PathBuf,

        #[arg(long)]
        format: Option<String>,

        #[arg(long, default_value_t = 10)]
        top: usize,

        #[arg(long)]
        graph: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Build the synergy graph for a card store and save it as JSON
    BuildGraph {
        #[arg(long, value_name = "PATH")]
        cards: PathBuf,

        #[arg(long, short = 'o')]
        out: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Static mana curve of a deck
    Curve {
        #[arg(long, value_name = "PATH")]
        cards: PathBuf,

        #[arg(long, short = 'd')]
        deck: PathBuf,

        #[arg(long)]
        format: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            cards,
            deck,
            format,
            trials,
            seed,
            seconds,
            on_the_draw,
            config,
            trace,
            verbosity,
            json,
        } => {
            let mut config = read_config(config.as_deref())?;
            if let Some(trials) = trials {
                config.simulation.trials = trials;
            }
            if let Some(seed) = seed {
                config.simulation.base_seed = seed;
            }
            if format.is_some() {
                config.format = format;
            }
            if on_the_draw {
                config.simulation.goldfish = config.simulation.goldfish.with_draw_on_first_turn(true);
            }
            config.validate()?;
            let verbosity = match verbosity {
                Some(v) => v.0,
                None if config.verbosity != VerbosityLevel::Silent => config.verbosity,
                None => VerbosityLevel::Normal,
            };
            run_simulate(&cards, &deck, &config, seconds, trace, verbosity, json).await?
        }
        Commands::Synergy {
            cards,
            card,
            min_weight,
            chains,
            graph,
            config,
            json,
        } => {
            let config = read_config(config.as_deref())?;
            run_synergy(&cards, &card, min_weight, chains, graph.as_deref(), &config, json).await?
        }
        Commands::Suggest {
            cards,
            deck,
            format,
            top,
            graph,
            config,
            json,
        } => {
            let mut config = read_config(config.as_deref())?;
            if format.is_some() {
                config.format = format;
            }
            run_suggest(&cards, &deck, top, graph.as_deref(), &config, json).await?
        }
        Commands::BuildGraph { cards, out, config } => {
            let config = read_config(config.as_deref())?;
            run_build_graph(&cards, &out, &config).await?
        }
        Commands::Curve {
            cards,
            deck,
            format,
            json,
        } => {
            let format = match format {
                Some(name) => DeckFormat::by_name(&name)?,
                None => DeckFormat::limited(),
            };
            let store = load_store(&cards, json).await?;
            let deck = load_deck(&deck, &store, &format)?;
            print_curve(&CurveSummary::from_deck(&deck), json)?;
        }
    }

    Ok(())
}

fn read_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

async fn load_store(path: &Path, quiet: bool) -> Result<CardStore> {
    let rules = RuleSet::standard()?;
    let (store, summary, duration) = CardStore::load_path(path, rules).await?;
    if !quiet {
        println!(
            "Loaded {} cards from {} file(s) in {:.2}ms (skipped {}), snapshot {}",
            summary.loaded,
            summary.files,
            duration.as_secs_f64() * 1000.0,
            summary.skipped,
            store.version().short()
        );
    }
    Ok(store)
}

/// Build a deck, printing every violation when it is invalid
fn load_deck(path: &Path, store: &CardStore, format: &DeckFormat) -> Result<Deck> {
    let list = DeckLoader::load_from_file(path)?;
    Deck::build(&list, store, format).inspect_err(|e| {
        if !e.violations().is_empty() {
            eprintln!("Deck {} is not valid for {}:", path.display(), format.name);
            for violation in e.violations() {
                eprintln!("  - {violation}");
            }
        }
    })
}

/// Graph for `store`: the saved one at `saved` if given, otherwise built
fn obtain_graph(store: &CardStore, config: &Config, saved: Option<&Path>) -> Result<Arc<SynergyGraph>> {
    let rules = RuleSet::standard()?;
    let cache = GraphCache::new(config.builder.clone());
    if let Some(path) = saved {
        let graph = SynergyGraph::load(path)?;
        if graph.ruleset_version() == rules.version() {
            cache.insert(Arc::new(graph));
            if let Some(graph) = cache.cached(store)? {
                return Ok(graph);
            }
        } else {
            eprintln!(
                "Saved graph uses rule set v{}, current is v{}; rebuilding",
                graph.ruleset_version(),
                rules.version()
            );
        }
    }
    cache.get_or_build(store, rules)
}

fn resolve_card(store: &CardStore, key: &str) -> Result<CardId> {
    store
        .resolve(key)
        .map(|card| card.id.clone())
        .ok_or_else(|| GoldfishError::NotFound(key.to_string()))
}

async fn run_simulate(
    cards: &Path,
    deck_path: &Path,
    config: &Config,
    seconds: Option<u64>,
    trace: Option<usize>,
    verbosity: VerbosityLevel,
    json: bool,
) -> Result<()> {
    let store = load_store(cards, json).await?;
    let format = config.deck_format()?;
    let deck = load_deck(deck_path, &store, &format)?;
    let sim = &config.simulation;

    let mut trace_log = None;
    if let Some(index) = trace {
        let seed = trial_seed(sim.base_seed, index);
        let simulator = GoldfishSimulator::new(&deck, &sim.goldfish).with_verbosity(verbosity);
        if json {
            trace_log = Some(simulator.run_trial_logged(index, seed).1);
        } else {
            println!("=== Trial {index} (seed {seed}) ===");
            simulator.with_output_mode(OutputMode::Stdout).run_trial(index, seed);
            println!();
        }
    }

    if !json {
        println!(
            "Running {} trials of {} ({} cards, {} lands) with seed {}",
            sim.trials,
            deck_path.display(),
            deck.library_size(),
            deck.land_count(),
            sim.base_seed
        );
    }

    let cancel = seconds.map(|s| CancelToken::with_deadline(Duration::from_secs(s)));
    let deck = Arc::new(deck);
    let sim = sim.clone();
    let quiet = json;
    let report = tokio::task::spawn_blocking(move || {
        let progress = |done: usize| {
            if !quiet {
                println!("Completed {done} trials");
            }
        };
        run_simulation_with_progress(&deck, &sim, cancel.as_ref(), &progress)
    })
    .await??;

    match (json, trace_log) {
        (true, Some(log)) => {
            let out = serde_json::json!({ "report": report, "trace": log });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        (true, None) => println!("{}", serde_json::to_string_pretty(&report)?),
        (false, _) => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("\n=== Simulation Complete ===");
    println!(
        "Trials: {}/{}{}",
        report.trials_completed,
        report.trials_requested,
        if report.partial { " (partial)" } else { "" }
    );
    println!("Base seed: {}", report.base_seed);

    let pct = |p: &mtg_goldfish::simulation::Proportion| {
        format!("{:.1}% [{:.1}%, {:.1}%]", 100.0 * p.rate, 100.0 * p.ci_low, 100.0 * p.ci_high)
    };
    println!("\n=== Consistency ===");
    println!("Keep rate (first hand): {}", pct(&report.keep_rate));
    println!("Mana screw:             {}", pct(&report.screw_rate));
    println!("Curve-out rate:         {}", pct(&report.curve_out.rate));
    if let (Some(mean), Some(median), Some(se)) = (
        report.curve_out.mean_turn,
        report.curve_out.median_turn,
        report.curve_out.std_error,
    ) {
        println!("Turns to curve-out:     mean {mean:.2} (se {se:.2}), median {median:.1}");
    }
    println!("Mean mulligans:         {:.2}", report.mean_mulligans);

    println!("\n=== Opening Hand Lands ===");
    for (lands, count) in &report.opening_lands {
        let share = *count as f64 / report.trials_completed.max(1) as f64;
        println!("  {lands}: {count:>6} ({:.1}%)", 100.0 * share);
    }

    println!("\n=== Per Turn ===");
    println!("  turn  trials  spells  mana  cast%");
    for turn in &report.turns {
        println!(
            "  {:>4}  {:>6}  {:>6.2}  {:>4.2}  {:>5.1}",
            turn.turn,
            turn.trials_reaching,
            turn.avg_spells,
            turn.avg_mana,
            100.0 * turn.cast_rate
        );
    }
}

async fn run_synergy(
    cards: &Path,
    key: &str,
    min_weight: f64,
    chains: Option<usize>,
    saved: Option<&Path>,
    config: &Config,
    json: bool,
) -> Result<()> {
    let store = load_store(cards, json).await?;
    let graph = obtain_graph(&store, config, saved)?;
    let query = SynergyQuery::bound(&graph, &store)?;
    let id = resolve_card(&store, key)?;

    let neighbors = query.neighbors(&id, min_weight)?;
    let chains: Vec<_> = match chains {
        Some(depth) => query.combo_chains(&id, depth)?.take(50).collect(),
        None => Vec::new(),
    };

    if json {
        let out = serde_json::json!({ "card": id, "neighbors": neighbors, "combo_chains": chains });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("\n=== Synergies for {key} ===");
    if neighbors.is_empty() {
        println!("  (none at weight >= {min_weight})");
    }
    for n in &neighbors {
        println!("  {:.3}  {:<14}  {}  ({})", n.weight, n.kind.to_string(), n.name, n.reasons.join(", "));
    }
    if !chains.is_empty() {
        println!("\n=== Combo Chains ===");
        for chain in &chains {
            let names: Vec<String> = chain
                .cards
                .iter()
                .map(|id| store.get(id).map(|c| c.name.to_string()).unwrap_or_else(|| id.to_string()))
                .collect();
            println!("  {:.3}  {}", chain.strength, names.join(" -> "));
        }
    }
    Ok(())
}

async fn run_suggest(
    cards: &Path,
    deck_path: &Path,
    top: usize,
    saved: Option<&Path>,
    config: &Config,
    json: bool,
) -> Result<()> {
    let store = load_store(cards, json).await?;
    let deck = load_deck(deck_path, &store, &config.deck_format()?)?;
    let graph = obtain_graph(&store, config, saved)?;
    let suggestions = SynergyQuery::bound(&graph, &store)?.rank_for_deck(&deck, top)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }
    println!("\n=== Suggestions for {} ===", deck_path.display());
    for (i, s) in suggestions.iter().enumerate() {
        let partner = store.get(&s.strongest_with).map(|c| c.name.to_string()).unwrap_or_default();
        println!(
            "  {:>2}. {:<30} score {:.3}  ({} links, best with {})",
            i + 1,
            s.name.to_string(),
            s.score,
            s.connections,
            partner
        );
    }
    Ok(())
}

async fn run_build_graph(cards: &Path, out: &Path, config: &Config) -> Result<()> {
    let store = load_store(cards, false).await?;
    let start = std::time::Instant::now();
    let graph = obtain_graph(&store, config, None)?;
    let stats = SynergyQuery::new(&graph).stats();
    println!(
        "Built graph with {} cards and {} edges ({} combo, {} tribal, {} overlap) in {:.2}ms",
        stats.cards,
        stats.edges,
        stats.combo_edges,
        stats.tribal_edges,
        stats.overlap_edges,
        start.elapsed().as_secs_f64() * 1000.0
    );
    graph.save(out)?;
    println!("Saved to {}", out.display());
    Ok(())
}

fn print_curve(curve: &CurveSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(curve)?);
        return Ok(());
    }
    println!("\n=== Mana Curve ===");
    println!(
        "Cards: {}  Lands: {}  Spells: {}  Land ratio: {:.1}%",
        curve.total_cards,
        curve.lands,
        curve.spells,
        100.0 * curve.land_ratio
    );
    println!(
        "CMC: avg {:.2}, median {:.1}, mode {}",
        curve.avg_cmc,
        curve.median_cmc,
        curve.mode_cmc.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string())
    );
    for (cmc, count) in &curve.cmc_distribution {
        println!("  {cmc:>2}: {} {count}", "#".repeat(*count as usize));
    }
    if !curve.color_pips.is_empty() {
        println!("\nColor  pips  sources");
        for (color, pips) in &curve.color_pips {
            println!("  {color}    {pips:>4}  {:>7}", curve.color_sources.get(color).copied().unwrap_or(0));
        }
    }
    Ok(())
}
