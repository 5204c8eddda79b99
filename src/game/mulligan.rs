//! Opening hand and mulligan decisions
//!
//! London-style: every mulligan redraws a full hand, and once a hand is kept
//! one card per mulligan (beyond the free ones) goes to the bottom.

use crate::game::GameState;
use crate::{GoldfishError, Result};
use serde::{Deserialize, Serialize};

/// When to keep an opening hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MulliganPolicy {
    /// Fewest lands in a keepable hand (inclusive)
    pub min_lands: u32,
    /// Most lands in a keepable hand (inclusive)
    pub max_lands: u32,
    /// After this many mulligans the hand is kept regardless
    pub max_mulligans: u32,
    /// Mulligans that do not cost a card (e.g. the first one in multiplayer)
    pub free_mulligans: u32,
}

impl Default for MulliganPolicy {
    fn default() -> Self {
        MulliganPolicy {
            min_lands: 2,
            max_lands: 5,
            max_mulligans: 3,
            free_mulligans: 0,
        }
    }
}

impl MulliganPolicy {
    pub fn validate(&self, hand_size: u32) -> Result<()> {
        if self.min_lands > self.max_lands {
            return Err(GoldfishError::InvalidConfig(format!(
                "mulligan band is empty: min_lands {} > max_lands {}",
                self.min_lands, self.max_lands
            )));
        }
        if self.min_lands > hand_size {
            return Err(GoldfishError::InvalidConfig(format!(
                "min_lands {} exceeds hand size {hand_size}",
                self.min_lands
            )));
        }
        Ok(())
    }

    pub fn keeps(&self, lands: u32) -> bool {
        (self.min_lands..=self.max_lands).contains(&lands)
    }

    /// Cards to put on the bottom after keeping on mulligan `mulligans`
    pub fn cards_to_bottom(&self, mulligans: u32) -> u32 {
        mulligans.saturating_sub(self.free_mulligans)
    }

    /// Target land count when trimming a hand: the middle of the band
    fn target_land_ratio(&self, hand_size: u32) -> f64 {
        if hand_size == 0 {
            return 0.0;
        }
        (self.min_lands + self.max_lands) as f64 / 2.0 / hand_size as f64
    }
}

/// What happened before the first turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulliganResult {
    pub mulligans: u32,
    pub kept_first_hand: bool,
    /// Lands in the first hand drawn
    pub opening_lands: u32,
    /// Lands in the hand that was finally kept, after bottoming
    pub kept_lands: u32,
}

/// Draw opening hands until one is kept
///
/// The library is shuffled before every draw. A library smaller than the hand
/// size simply yields a smaller hand.
pub fn resolve_opening_hand(state: &mut GameState, policy: &MulliganPolicy, hand_size: u32) -> MulliganResult {
    let mut mulligans = 0;
    let mut opening_lands = None;

    loop {
        state.shuffle_library();
        for _ in 0..hand_size {
            if state.draw_card().is_none() {
                break;
            }
        }

        let lands = state.zones.hand.land_count() as u32;
        opening_lands.get_or_insert(lands);

        if policy.keeps(lands) || mulligans >= policy.max_mulligans {
            break;
        }

        log_if_verbose!(
            state,
            "mulligan",
            "mulligans a {}-card hand with {lands} lands",
            state.zones.hand.len()
        );
        state.hand_to_library();
        mulligans += 1;
    }

    let to_bottom = policy.cards_to_bottom(mulligans).min(state.zones.hand.len() as u32);
    for _ in 0..to_bottom {
        let index = choose_card_to_bottom(state, policy, hand_size);
        if let Some(card) = state.zones.hand.take(index) {
            log_if_verbose!(state, "mulligan", "puts {} on the bottom", card.name);
            state.zones.library.add_to_bottom(card);
        }
    }

    MulliganResult {
        mulligans,
        kept_first_hand: mulligans == 0,
        opening_lands: opening_lands.unwrap_or(0),
        kept_lands: state.zones.hand.land_count() as u32,
    }
}

/// Bottom a land when the hand is land-heavy for the band, otherwise the
/// most expensive spell. Ties go to the later card in hand.
fn choose_card_to_bottom(state: &GameState, policy: &MulliganPolicy, hand_size: u32) -> usize {
    let hand = &state.zones.hand;
    let lands = hand.land_count();
    let spells = hand.len() - lands;
    let target = policy.target_land_ratio(hand_size);

    // Compare the land ratio after removing a land against removing a spell
    let ratio = |l: usize, total: usize| if total == 0 { 0.0 } else { l as f64 / total as f64 };
    let remaining = hand.len().saturating_sub(1);
    let drop_land = lands > 0
        && (spells == 0
            || (ratio(lands - 1, remaining) - target).abs() <= (ratio(lands, remaining) - target).abs());

    let mut best: Option<(usize, u8)> = None;
    for (i, card) in hand.iter().enumerate() {
        if card.is_land() != drop_land {
            continue;
        }
        if best.map_or(true, |(_, cmc)| card.cmc >= cmc) {
            best = Some((i, card.cmc));
        }
    }
    best.map(|(i, _)| i).unwrap_or(hand.len().saturating_sub(1))
}
