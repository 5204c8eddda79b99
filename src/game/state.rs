//! Per-trial game state
//!
//! A `GameState` is built fresh for every trial and dropped when the trial
//! ends, so nothing leaks between trials running on different threads.

use crate::core::Card;
use crate::game::mana_tracker::ManaTracker;
use crate::game::{TrialLogger, TurnStructure};
use crate::loader::Deck;
use crate::zones::PlayerZones;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::sync::Arc;

/// A card on the battlefield
#[derive(Debug, Clone)]
pub struct Permanent {
    pub card: Arc<Card>,
    pub entered_turn: u32,
    pub tapped: bool,
}

/// Complete solitaire game state for one trial
#[derive(Debug)]
pub struct GameState {
    pub turn: TurnStructure,

    pub life: i32,

    pub zones: PlayerZones,

    pub battlefield: Vec<Permanent>,

    pub mana: ManaTracker,

    /// Trial RNG, seeded from the base seed and the trial index
    pub rng: ChaCha12Rng,

    pub logger: TrialLogger,

    lands_played_this_turn: u32,
}

impl GameState {
    /// Library in deck order (unshuffled), commander in the command zone
    pub fn new(deck: &Deck, seed: u64) -> Self {
        let mut zones = PlayerZones::new();
        zones.library.cards = deck.expand();
        if let Some(commander) = deck.commander() {
            zones.command.add(Arc::clone(commander));
        }

        GameState {
            turn: TurnStructure::new(),
            life: if deck.commander().is_some() { 40 } else { 20 },
            zones,
            battlefield: Vec::new(),
            mana: ManaTracker::new(),
            rng: ChaCha12Rng::seed_from_u64(seed),
            logger: TrialLogger::new(),
            lands_played_this_turn: 0,
        }
    }

    /// Shuffle the library using the trial's RNG
    pub fn shuffle_library(&mut self) {
        self.zones.library.shuffle(&mut self.rng);
    }

    /// Draw the top card into hand; `None` when the library is empty
    pub fn draw_card(&mut self) -> Option<Arc<Card>> {
        let card = self.zones.library.draw_top()?;
        if self.logger.enabled(crate::game::VerbosityLevel::Verbose) {
            self.logger.verbose(&format!("draws {}", card.name));
        }
        self.zones.hand.add(Arc::clone(&card));
        Some(card)
    }

    /// Return the hand to the library (for a mulligan)
    pub fn hand_to_library(&mut self) {
        let PlayerZones { hand, library, .. } = &mut self.zones;
        hand.drain_into(library);
    }

    /// Start of turn: untap permanents and rebuild the mana pool
    pub fn untap(&mut self) {
        let turn = self.turn.turn_number;
        for permanent in &mut self.battlefield {
            permanent.tapped = false;
        }
        self.mana.untap(turn);
        self.lands_played_this_turn = 0;
    }

    pub fn lands_played_this_turn(&self) -> u32 {
        self.lands_played_this_turn
    }

    /// Move the land at `hand_index` onto the battlefield
    pub fn play_land(&mut self, hand_index: usize) -> Option<Arc<Card>> {
        let card = self.zones.hand.take(hand_index)?;
        self.lands_played_this_turn += 1;
        self.enter_battlefield(Arc::clone(&card));
        Some(card)
    }

    /// Put a resolved spell where it belongs
    pub fn resolve(&mut self, card: Arc<Card>) {
        if card.is_permanent() {
            self.enter_battlefield(card);
        } else {
            self.zones.graveyard.add(card);
        }
    }

    fn enter_battlefield(&mut self, card: Arc<Card>) {
        let turn = self.turn.turn_number;
        self.mana.add_source(Arc::clone(&card));
        let tapped = self
            .mana
            .sources()
            .last()
            .is_some_and(|s| Arc::ptr_eq(&s.card, &card) && s.entered_tapped);
        self.battlefield.push(Permanent {
            card,
            entered_turn: turn,
            tapped,
        });
    }

    /// Discard the card at `hand_index`
    pub fn discard(&mut self, hand_index: usize) -> Option<Arc<Card>> {
        let card = self.zones.hand.take(hand_index)?;
        self.zones.graveyard.add(Arc::clone(&card));
        Some(card)
    }

    pub fn lands_on_battlefield(&self) -> usize {
        self.battlefield.iter().filter(|p| p.card.is_land()).count()
    }
}
