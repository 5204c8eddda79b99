//! Monte Carlo aggregation over many goldfish trials
//!
//! Trials run in parallel with rayon. Each one builds its own game state from
//! a seed derived from the base seed and its index, so a report depends only
//! on the deck, the config and the base seed, never on the worker count.

use crate::analysis::CurveSummary;
use crate::game::{GoldfishConfig, GoldfishSimulator, TrialEnd, TrialOutcome};
use crate::loader::Deck;
use crate::{GoldfishError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// z for a two-sided 95% interval
const Z_95: f64 = 1.96;

/// Progress callback granularity
const PROGRESS_EVERY: usize = 100;

/// Settings for one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub trials: usize,
    pub base_seed: u64,
    pub goldfish: GoldfishConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            trials: 1000,
            base_seed: 42,
            goldfish: GoldfishConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn with_goldfish(mut self, goldfish: GoldfishConfig) -> Self {
        self.goldfish = goldfish;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(GoldfishError::InvalidConfig("trials must be at least 1".to_string()));
        }
        self.goldfish.validate()
    }
}

/// Seed for trial `index`: golden-ratio spacing keeps neighbouring trials apart
pub fn trial_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add((index as u64).wrapping_mul(0x9E3779B97F4A7C15))
}

/// Stops a run between trials, on request or at a deadline
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel automatically once `limit` has elapsed from now
    pub fn with_deadline(limit: Duration) -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + limit),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// An empirical rate with its 95% Wilson score interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proportion {
    pub successes: usize,
    pub trials: usize,
    pub rate: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

impl Proportion {
    pub fn new(successes: usize, trials: usize) -> Self {
        if trials == 0 {
            return Proportion {
                successes,
                trials,
                rate: 0.0,
                ci_low: 0.0,
                ci_high: 1.0,
            };
        }
        let n = trials as f64;
        let p = successes as f64 / n;
        let z2 = Z_95 * Z_95;
        let denom = 1.0 + z2 / n;
        let center = (p + z2 / (2.0 * n)) / denom;
        let half = Z_95 * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
        Proportion {
            successes,
            trials,
            rate: p,
            ci_low: (center - half).max(0.0),
            ci_high: (center + half).min(1.0),
        }
    }
}

/// Turns-to-curve-out over the trials that curved out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveOutStats {
    pub rate: Proportion,
    pub mean_turn: Option<f64>,
    /// Sample variance (n - 1)
    pub variance: Option<f64>,
    pub median_turn: Option<f64>,
    pub std_error: Option<f64>,
}

impl CurveOutStats {
    fn from_turns(turns: &[u32], trials: usize) -> Self {
        let rate = Proportion::new(turns.len(), trials);
        if turns.is_empty() {
            return CurveOutStats {
                rate,
                mean_turn: None,
                variance: None,
                median_turn: None,
                std_error: None,
            };
        }
        let n = turns.len() as f64;
        let mean = turns.iter().map(|&t| t as f64).sum::<f64>() / n;
        let variance = if turns.len() > 1 {
            turns.iter().map(|&t| (t as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let mut sorted = turns.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 1 {
            sorted[mid] as f64
        } else {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        };
        CurveOutStats {
            rate,
            mean_turn: Some(mean),
            variance: Some(variance),
            median_turn: Some(median),
            std_error: Some((variance / n).sqrt()),
        }
    }
}

/// Casting statistics for one turn number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnStats {
    pub turn: u32,
    /// Trials whose main phase reached this turn
    pub trials_reaching: usize,
    pub avg_spells: f64,
    pub avg_mana: f64,
    /// Share of reaching trials that cast at least one spell
    pub cast_rate: f64,
}

/// How the completed trials ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndReasons {
    pub curved_out: usize,
    pub turn_limit: usize,
    pub library_exhausted: usize,
}

/// Aggregate result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub trials_requested: usize,
    pub trials_completed: usize,
    /// Set when the run was cancelled before every trial finished
    pub partial: bool,
    pub base_seed: u64,
    pub curve_out: CurveOutStats,
    pub keep_rate: Proportion,
    pub screw_rate: Proportion,
    pub mean_mulligans: f64,
    pub max_mulligans_seen: u32,
    pub mean_turns_played: f64,
    pub mean_hand_to_board: f64,
    pub end_reasons: EndReasons,
    pub turns: Vec<TurnStats>,
    /// Trials per land count in the first hand drawn
    pub opening_lands: BTreeMap<u32, usize>,
    pub curve: CurveSummary,
    pub config: SimulationConfig,
}

impl SimulationReport {
    /// Reduce outcomes in the order given (trial index order)
    pub fn from_outcomes(deck: &Deck, config: &SimulationConfig, outcomes: &[TrialOutcome]) -> Self {
        let n = outcomes.len();
        let mean = |sum: f64| if n == 0 { 0.0 } else { sum / n as f64 };

        let curve_turns: Vec<u32> = outcomes.iter().filter_map(|o| o.curve_out_turn).collect();
        let kept = outcomes.iter().filter(|o| o.kept_first_hand).count();
        let screwed = outcomes.iter().filter(|o| o.screwed).count();

        let mut opening_lands = BTreeMap::new();
        let mut end_reasons = EndReasons::default();
        for outcome in outcomes {
            *opening_lands.entry(outcome.opening_lands).or_insert(0) += 1;
            match outcome.end_reason {
                TrialEnd::CurvedOut => end_reasons.curved_out += 1,
                TrialEnd::TurnLimit => end_reasons.turn_limit += 1,
                TrialEnd::LibraryExhausted => end_reasons.library_exhausted += 1,
            }
        }

        let longest = outcomes.iter().map(|o| o.spells_cast.len()).max().unwrap_or(0);
        let turns = (0..longest)
            .map(|t| {
                let reaching: Vec<&TrialOutcome> = outcomes.iter().filter(|o| o.spells_cast.len() > t).collect();
                let count = reaching.len();
                let avg = |sum: u32| if count == 0 { 0.0 } else { sum as f64 / count as f64 };
                TurnStats {
                    turn: t as u32 + 1,
                    trials_reaching: count,
                    avg_spells: avg(reaching.iter().map(|o| o.spells_cast[t]).sum()),
                    avg_mana: avg(reaching.iter().map(|o| o.mana_spent[t]).sum()),
                    cast_rate: avg(reaching.iter().filter(|o| o.spells_cast[t] > 0).count() as u32),
                }
            })
            .collect();

        SimulationReport {
            trials_requested: config.trials,
            trials_completed: n,
            partial: n < config.trials,
            base_seed: config.base_seed,
            curve_out: CurveOutStats::from_turns(&curve_turns, n),
            keep_rate: Proportion::new(kept, n),
            screw_rate: Proportion::new(screwed, n),
            mean_mulligans: mean(outcomes.iter().map(|o| o.mulligans as f64).sum()),
            max_mulligans_seen: outcomes.iter().map(|o| o.mulligans).max().unwrap_or(0),
            mean_turns_played: mean(outcomes.iter().map(|o| o.turns_played as f64).sum()),
            mean_hand_to_board: mean(outcomes.iter().map(|o| o.hand_to_board).sum()),
            end_reasons,
            turns,
            opening_lands,
            curve: CurveSummary::from_deck(deck),
            config: config.clone(),
        }
    }
}

/// Run `config.trials` goldfish trials and aggregate them
pub fn run_simulation(deck: &Deck, config: &SimulationConfig, cancel: Option<&CancelToken>) -> Result<SimulationReport> {
    run_simulation_with_progress(deck, config, cancel, &|_| {})
}

/// Same as [`run_simulation`], calling `progress` with the completed count
/// every hundred trials
pub fn run_simulation_with_progress(
    deck: &Deck,
    config: &SimulationConfig,
    cancel: Option<&CancelToken>,
    progress: &(dyn Fn(usize) + Sync),
) -> Result<SimulationReport> {
    config.validate()?;

    let simulator = GoldfishSimulator::new(deck, &config.goldfish);
    let completed = AtomicUsize::new(0);

    let outcomes: Vec<TrialOutcome> = (0..config.trials)
        .into_par_iter()
        .filter_map(|index| {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return None;
            }
            let outcome = simulator.run_trial(index, trial_seed(config.base_seed, index));
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_EVERY == 0 {
                progress(done);
            }
            Some(outcome)
        })
        .collect();

    Ok(SimulationReport::from_outcomes(deck, config, &outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_seed_spacing() {
        assert_eq!(trial_seed(7, 0), 7);
        assert_ne!(trial_seed(7, 1), trial_seed(7, 2));
        assert_eq!(trial_seed(u64::MAX, 1), u64::MAX.wrapping_add(0x9E3779B97F4A7C15));
    }

    #[test]
    fn test_wilson_interval() {
        let p = Proportion::new(50, 100);
        assert_eq!(p.rate, 0.5);
        assert!(p.ci_low < 0.5 && p.ci_high > 0.5);
        assert!((p.ci_low - 0.4038).abs() < 1e-3);
        assert!((p.ci_high - 0.5962).abs() < 1e-3);

        let all = Proportion::new(10, 10);
        assert_eq!(all.rate, 1.0);
        assert!(all.ci_high <= 1.0);
        assert!(all.ci_low > 0.6);

        let none = Proportion::new(0, 0);
        assert_eq!((none.ci_low, none.ci_high), (0.0, 1.0));
    }

    #[test]
    fn test_curve_out_stats() {
        let stats = CurveOutStats::from_turns(&[4, 5, 5, 6], 8);
        assert_eq!(stats.rate.rate, 0.5);
        assert_eq!(stats.mean_turn, Some(5.0));
        assert_eq!(stats.median_turn, Some(5.0));
        let var = stats.variance.unwrap();
        assert!((var - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.std_error.unwrap() - (var / 4.0).sqrt()).abs() < 1e-12);

        let empty = CurveOutStats::from_turns(&[], 3);
        assert_eq!(empty.mean_turn, None);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());

        assert!(CancelToken::with_deadline(Duration::ZERO).is_cancelled());
        assert!(!CancelToken::with_deadline(Duration::from_secs(3600)).is_cancelled());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let config = SimulationConfig::default().with_trials(0);
        assert!(matches!(config.validate(), Err(GoldfishError::InvalidConfig(_))));
    }
}
