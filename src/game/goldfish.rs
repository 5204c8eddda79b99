//! Goldfish trial runner
//!
//! Plays one deck alone against an empty board: keep or mulligan, then each
//! turn untap, draw, make a land drop and greedily cast the most expensive
//! payable spell until nothing else fits. A trial ends when the deck curves
//! out, at the turn cap, or when a draw finds the library empty.

use crate::core::{Card, ManaCost};
use crate::game::mana_tracker::ManaSource;
use crate::game::mulligan::{resolve_opening_hand, MulliganPolicy};
use crate::game::{GameState, LogEntry, OutputMode, TrialLogger, TrialPhase, VerbosityLevel};
use crate::loader::Deck;
use crate::zones::Zone;
use crate::{GoldfishError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;

/// Per-trial play settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldfishConfig {
    /// Opening hand size
    pub hand_size: u32,
    /// Cleanup discards down to this many cards
    pub max_hand_size: u32,
    /// Draw on turn 1 (false for the player on the play)
    pub draw_on_first_turn: bool,
    /// Turn cap
    pub max_turns: u32,
    /// Turn whose on-curve mana total counts as a curve-out
    pub curve_out_turn: u32,
    pub mulligan: MulliganPolicy,
}

impl Default for GoldfishConfig {
    fn default() -> Self {
        GoldfishConfig {
            hand_size: 7,
            max_hand_size: 7,
            draw_on_first_turn: false,
            max_turns: 10,
            curve_out_turn: 4,
            mulligan: MulliganPolicy::default(),
        }
    }
}

impl GoldfishConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_turns == 0 {
            return Err(GoldfishError::InvalidConfig("max_turns must be at least 1".to_string()));
        }
        if self.curve_out_turn == 0 {
            return Err(GoldfishError::InvalidConfig(
                "curve_out_turn must be at least 1".to_string(),
            ));
        }
        self.mulligan.validate(self.hand_size)
    }

    /// Cumulative mana spent that counts as curving out: 1 + 2 + ... + T
    pub fn curve_out_target(&self) -> u32 {
        self.curve_out_turn * (self.curve_out_turn + 1) / 2
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_mulligan(mut self, mulligan: MulliganPolicy) -> Self {
        self.mulligan = mulligan;
        self
    }

    pub fn with_draw_on_first_turn(mut self, draw: bool) -> Self {
        self.draw_on_first_turn = draw;
        self
    }
}

/// Reason a trial stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialEnd {
    CurvedOut,
    TurnLimit,
    LibraryExhausted,
}

/// Everything one trial reports back to the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub index: usize,
    pub seed: u64,
    /// Turns whose end step was reached
    pub turns_played: u32,
    /// Spells cast on each turn, index 0 is turn 1
    pub spells_cast: Vec<u32>,
    /// Mana spent on each turn
    pub mana_spent: Vec<u32>,
    pub lands_played: u32,
    pub mulligans: u32,
    pub kept_first_hand: bool,
    pub opening_lands: u32,
    pub screwed: bool,
    /// Turns ending with two or more uncastable cards in hand
    pub screwed_turns: u32,
    pub curve_out_turn: Option<u32>,
    pub end_reason: TrialEnd,
    /// Cards in hand per permanent on the battlefield at the end
    pub hand_to_board: f64,
}

/// Runs goldfish trials for one deck
#[derive(Debug, Clone)]
pub struct GoldfishSimulator<'a> {
    deck: &'a Deck,
    config: &'a GoldfishConfig,
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
}

impl<'a> GoldfishSimulator<'a> {
    pub fn new(deck: &'a Deck, config: &'a GoldfishConfig) -> Self {
        GoldfishSimulator {
            deck,
            config,
            verbosity: VerbosityLevel::Silent,
            output_mode: OutputMode::Stdout,
        }
    }

    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Play one trial with its own fresh state
    pub fn run_trial(&self, index: usize, seed: u64) -> TrialOutcome {
        let mut state = self.new_state(index, seed);
        self.play(&mut state, index, seed)
    }

    /// Play one trial, capturing its log
    pub fn run_trial_logged(&self, index: usize, seed: u64) -> (TrialOutcome, Vec<LogEntry>) {
        let mut state = self.new_state(index, seed);
        if !state.logger.is_capturing() {
            state.logger.set_output_mode(OutputMode::Memory);
        }
        let outcome = self.play(&mut state, index, seed);
        (outcome, state.logger.take_logs())
    }

    fn new_state(&self, index: usize, seed: u64) -> GameState {
        let mut state = GameState::new(self.deck, seed);
        let mut logger = TrialLogger::with_verbosity(self.verbosity).with_prefix(format!("[trial {index}]"));
        logger.set_output_mode(self.output_mode);
        state.logger = logger;
        state
    }

    fn play(&self, state: &mut GameState, index: usize, seed: u64) -> TrialOutcome {
        let target = self.config.curve_out_target();
        let mut outcome = TrialOutcome {
            index,
            seed,
            turns_played: 0,
            spells_cast: Vec::new(),
            mana_spent: Vec::new(),
            lands_played: 0,
            mulligans: 0,
            kept_first_hand: true,
            opening_lands: 0,
            screwed: false,
            screwed_turns: 0,
            curve_out_turn: None,
            end_reason: TrialEnd::TurnLimit,
            hand_to_board: 0.0,
        };
        let mut screw_streak = 0;
        let mut cumulative_mana = 0;

        let end = loop {
            let turn = state.turn.turn_number;
            match state.turn.current_phase {
                TrialPhase::MulliganDecision => {
                    let result = resolve_opening_hand(state, &self.config.mulligan, self.config.hand_size);
                    outcome.mulligans = result.mulligans;
                    outcome.kept_first_hand = result.kept_first_hand;
                    outcome.opening_lands = result.opening_lands;
                    log_if_verbose!(
                        state,
                        "mulligan",
                        "keeps {} cards with {} lands after {} mulligans",
                        state.zones.hand.len(),
                        result.kept_lands,
                        result.mulligans
                    );
                }
                TrialPhase::DrawStep => {
                    state.untap();
                    if (turn > 1 || self.config.draw_on_first_turn) && state.draw_card().is_none() {
                        break TrialEnd::LibraryExhausted;
                    }
                }
                TrialPhase::MainPhase => {
                    if let Some(index) = choose_land(state) {
                        if let Some(land) = state.play_land(index) {
                            outcome.lands_played += 1;
                            log_if_verbose!(state, "land", "turn {turn}: plays {}", land.name);
                        }
                    }
                    let spells = cast_spells(state);
                    let mana = state.mana.spent_this_turn();
                    outcome.spells_cast.push(spells);
                    outcome.mana_spent.push(mana);
                    cumulative_mana += mana;
                }
                TrialPhase::EndStep => {
                    if count_uncastable(state) >= 2 {
                        screw_streak += 1;
                        outcome.screwed_turns += 1;
                        if screw_streak >= 2 {
                            outcome.screwed = true;
                        }
                    } else {
                        screw_streak = 0;
                    }
                    self.discard_to_hand_size(state);
                    state.mana.end_turn();
                    outcome.turns_played = turn;

                    if cumulative_mana >= target {
                        outcome.curve_out_turn = Some(turn);
                        break TrialEnd::CurvedOut;
                    }
                    if turn >= self.config.max_turns {
                        break TrialEnd::TurnLimit;
                    }
                }
            }
            state.turn.advance();
        };

        outcome.end_reason = end;
        outcome.hand_to_board = state.zones.hand.len() as f64 / state.battlefield.len().max(1) as f64;
        if state.logger.enabled(VerbosityLevel::Minimal) {
            state.logger.minimal(&format!(
                "{end:?} after {} turns: {} spells, {} mana{}",
                outcome.turns_played,
                outcome.spells_cast.iter().sum::<u32>(),
                cumulative_mana,
                if outcome.screwed { ", mana screwed" } else { "" }
            ));
        }
        outcome
    }

    fn discard_to_hand_size(&self, state: &mut GameState) {
        while state.zones.hand.len() > self.config.max_hand_size as usize {
            let hand = &state.zones.hand;
            let index = hand
                .iter()
                .enumerate()
                .max_by_key(|(i, card)| (!card.is_land(), card.cmc, *i))
                .map(|(i, _)| i);
            let Some(index) = index else {
                break;
            };
            if let Some(card) = state.discard(index) {
                log_if_verbose!(state, "discard", "discards {}", card.name);
            }
        }
    }
}

/// Nonland cards that could be cast from the hand or the command zone
fn castable_candidates(state: &GameState) -> Vec<(Zone, usize, Arc<Card>)> {
    let hand = state.zones.hand.iter().enumerate().map(|(i, c)| (Zone::Hand, i, c));
    let command = state.zones.command.iter().enumerate().map(|(i, c)| (Zone::Command, i, c));
    hand.chain(command)
        .filter(|(_, _, card)| !card.is_land())
        .map(|(zone, i, card)| (zone, i, Arc::clone(card)))
        .collect()
}

/// Pick the land that enables the most spells that cannot be cast right now
///
/// Ties go to the land whose colors are scarcest on the battlefield, then to
/// the earlier card in hand.
fn choose_land(state: &GameState) -> Option<usize> {
    if state.lands_played_this_turn() > 0 || !state.turn.current_phase.can_play_lands() {
        return None;
    }
    let turn = state.turn.turn_number;
    let pool = state.mana.pool();
    let costs: Vec<ManaCost> = castable_candidates(state)
        .into_iter()
        .map(|(_, _, card)| card.mana_cost.clone())
        .filter(|cost| !pool.can_pay(cost))
        .collect();

    let mut best: Option<(usize, usize, u32)> = None;
    for (i, card) in state.zones.hand.iter().enumerate() {
        if !card.is_land() {
            continue;
        }
        let mut with_land = pool.clone();
        if ManaSource::new(Arc::clone(card), turn).is_usable(turn) {
            with_land.add_source(card.produces, card.mana_per_tap);
        }
        let enabled = costs.iter().filter(|cost| with_land.can_pay(cost)).count();
        let scarcity = card
            .produces
            .iter()
            .map(|color| state.mana.sources_of(color))
            .min()
            .unwrap_or(u32::MAX);

        let better = match best {
            None => true,
            Some((_, best_enabled, best_scarcity)) => {
                enabled > best_enabled || (enabled == best_enabled && scarcity < best_scarcity)
            }
        };
        if better {
            best = Some((i, enabled, scarcity));
        }
    }
    best.map(|(i, _, _)| i)
}

/// Cast the most expensive payable spell until none is left; returns the
/// number of spells cast
fn cast_spells(state: &mut GameState) -> u32 {
    let mut cast = 0;
    loop {
        let mut candidates = castable_candidates(state);
        candidates.sort_by(|(za, ia, a), (zb, ib, b)| {
            (Reverse(a.cmc), &a.name, *za == Zone::Hand, *ia).cmp(&(Reverse(b.cmc), &b.name, *zb == Zone::Hand, *ib))
        });

        let chosen = candidates
            .into_iter()
            .find(|(_, _, card)| state.mana.pay(&card.mana_cost).is_ok())
            .map(|(zone, index, _)| (zone, index));

        let Some((zone, index)) = chosen else {
            return cast;
        };
        let card = match zone {
            Zone::Command => state.zones.command.take(index),
            _ => state.zones.hand.take(index),
        };
        if let Some(card) = card {
            log_if_verbose!(state, "cast", "casts {} ({})", card.name, card.mana_cost);
            state.resolve(card);
            cast += 1;
        }
    }
}

/// Nonland cards in hand that even a fully untapped battlefield cannot pay for
fn count_uncastable(state: &GameState) -> usize {
    let full = state.mana.full_pool();
    state
        .zones
        .hand
        .iter()
        .filter(|card| !card.is_land() && !full.can_pay(&card.mana_cost))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardId, CardType, Color, ColorSet};
    use crate::loader::{CardStore, DeckEntry, DeckFormat, DeckList};

    fn basic(name: &str, color: Color) -> Card {
        let mut card = Card::new(CardId::new(name.to_lowercase()), name);
        card.types.push(CardType::Land);
        card.supertypes.push("basic".to_string());
        card.produces = ColorSet::single(color);
        card
    }

    fn spell(id: &str, cost: &str, card_type: CardType) -> Card {
        let mut card = Card::new(CardId::new(id), id);
        card.types.push(card_type);
        card.mana_cost = ManaCost::parse(cost);
        card.cmc = card.mana_cost.cmc();
        card
    }

    fn build(cards: Vec<Card>, entries: Vec<(&str, u32)>) -> Deck {
        let store = CardStore::from_cards(cards);
        let list = DeckList::from_entries(entries.into_iter().map(|(c, n)| DeckEntry::new(c, n)).collect());
        Deck::build(&list, &store, &DeckFormat::limited()).unwrap()
    }

    #[test]
    fn test_curve_out_target() {
        let config = GoldfishConfig::default();
        assert_eq!(config.curve_out_target(), 10);
        assert!(config.validate().is_ok());
        assert!(GoldfishConfig::default().with_max_turns(0).validate().is_err());
    }

    #[test]
    fn test_zero_land_deck_is_screwed() {
        let deck = build(vec![spell("bear", "{1}{G}", CardType::Creature)], vec![("bear", 40)]);
        let config = GoldfishConfig::default();
        let outcome = GoldfishSimulator::new(&deck, &config).run_trial(0, 42);

        assert!(outcome.screwed);
        assert_eq!(outcome.lands_played, 0);
        assert_eq!(outcome.end_reason, TrialEnd::TurnLimit);
        assert_eq!(outcome.turns_played, 10);
        assert_eq!(outcome.mulligans, config.mulligan.max_mulligans);
        assert!(outcome.spells_cast.iter().all(|&n| n == 0));
    }

    #[test]
    fn test_all_one_drops_curve_out() {
        let deck = build(
            vec![basic("Mountain", Color::Red), spell("goblin", "{R}", CardType::Creature)],
            vec![("mountain", 20), ("goblin", 20)],
        );
        let config = GoldfishConfig::default();
        let sim = GoldfishSimulator::new(&deck, &config);
        for i in 0..20 {
            let outcome = sim.run_trial(i, 1000 + i as u64);
            assert_eq!(outcome.spells_cast.len() as u32, outcome.turns_played);
            for (turn, (&spells, &mana)) in outcome.spells_cast.iter().zip(&outcome.mana_spent).enumerate() {
                assert_eq!(spells, mana);
                assert!(mana <= turn as u32 + 1);
            }
            if let Some(turn) = outcome.curve_out_turn {
                assert!(turn >= 4);
                assert_eq!(outcome.end_reason, TrialEnd::CurvedOut);
                assert!(outcome.mana_spent.iter().sum::<u32>() >= 10);
            }
        }
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let deck = build(
            vec![
                basic("Forest", Color::Green),
                spell("bear", "{1}{G}", CardType::Creature),
                spell("giant", "{4}{G}", CardType::Creature),
                spell("growth", "{G}", CardType::Instant),
            ],
            vec![("forest", 17), ("bear", 10), ("giant", 5), ("growth", 8)],
        );
        let config = GoldfishConfig::default();
        let sim = GoldfishSimulator::new(&deck, &config);
        assert_eq!(sim.run_trial(3, 99), sim.run_trial(3, 99));
    }

    #[test]
    fn test_logged_trial_captures_decisions() {
        let deck = build(
            vec![basic("Forest", Color::Green), spell("elf", "{G}", CardType::Creature)],
            vec![("forest", 20), ("elf", 20)],
        );
        let config = GoldfishConfig::default();
        let sim = GoldfishSimulator::new(&deck, &config);
        let (outcome, logs) = sim.run_trial_logged(0, 5);
        if outcome.lands_played > 0 {
            assert!(logs.iter().any(|e| e.category.as_deref() == Some("land")));
        }
        assert!(logs.iter().any(|e| e.level == VerbosityLevel::Minimal));
    }

    #[test]
    fn test_land_choice_enables_blocked_spell() {
        let deck = build(
            vec![
                basic("Forest", Color::Green),
                basic("Island", Color::Blue),
                spell("counter", "{U}", CardType::Instant),
            ],
            vec![("forest", 20), ("island", 10), ("counter", 10)],
        );
        let mut state = GameState::new(&deck, 0);
        let forest = Arc::clone(&state.zones.library.cards[0]);
        let island = Arc::clone(&state.zones.library.cards[20]);
        let counter = Arc::clone(&state.zones.library.cards[30]);
        state.zones.hand.add(forest);
        state.zones.hand.add(island);
        state.zones.hand.add(counter);

        state.turn.advance();
        state.untap();
        state.turn.advance();
        assert_eq!(choose_land(&state), Some(1));
    }

    #[test]
    fn test_commander_is_cast_from_command_zone() {
        let mut store_cards = vec![basic("Mountain", Color::Red)];
        let mut krenko = spell("krenko", "{R}", CardType::Creature);
        krenko.supertypes.push("legendary".to_string());
        store_cards.push(krenko);
        let store = CardStore::from_cards(store_cards);
        let list = DeckList {
            main_deck: vec![DeckEntry::new("mountain", 99)],
            sideboard: vec![],
            commander: vec![DeckEntry::new("krenko", 1)],
        };
        let deck = Deck::build(&list, &store, &DeckFormat::commander()).unwrap();
        let config = GoldfishConfig::default().with_mulligan(MulliganPolicy {
            max_lands: 7,
            ..MulliganPolicy::default()
        });
        let outcome = GoldfishSimulator::new(&deck, &config).run_trial(0, 8);
        assert_eq!(outcome.spells_cast[0], 1);
        assert!(!outcome.screwed);
    }
}
