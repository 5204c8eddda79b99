//! Mana sources on the battlefield and the pool they produce each turn

use crate::core::{Card, Color, ManaCost, ManaPool};
use crate::Result;
use std::sync::Arc;

/// A permanent that can tap for mana
#[derive(Debug, Clone)]
pub struct ManaSource {
    pub card: Arc<Card>,
    pub entered_turn: u32,
    /// Lands and rocks that say they enter tapped
    pub entered_tapped: bool,
}

impl ManaSource {
    pub fn new(card: Arc<Card>, entered_turn: u32) -> Self {
        let entered_tapped = enters_tapped(&card);
        ManaSource {
            card,
            entered_turn,
            entered_tapped,
        }
    }

    /// Can this source be tapped on `turn`?
    ///
    /// Creatures need to have been under control since the start of the turn
    /// unless they have haste. Sources that entered tapped wait a turn.
    pub fn is_usable(&self, turn: u32) -> bool {
        if self.entered_turn < turn {
            return true;
        }
        if self.entered_tapped {
            return false;
        }
        !self.card.is_creature() || self.card.has_keyword("haste")
    }
}

fn enters_tapped(card: &Card) -> bool {
    let text = card.oracle_text.to_lowercase();
    // Conditional taplands ("unless you control ...") are treated as untapped
    (text.contains("enters tapped") || text.contains("enters the battlefield tapped"))
        && !text.contains("unless")
}

/// Tracks mana sources and the current turn's untapped pool
///
/// The pool never carries over between turns: `untap` rebuilds it from the
/// sources and `end_turn` empties it.
#[derive(Debug, Clone, Default)]
pub struct ManaTracker {
    sources: Vec<ManaSource>,
    pool: ManaPool,
    turn: u32,
    spent_this_turn: u32,
}

impl ManaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of turn: every usable source is available again
    pub fn untap(&mut self, turn: u32) {
        self.turn = turn;
        self.spent_this_turn = 0;
        self.pool.clear();
        for source in &self.sources {
            if source.is_usable(turn) {
                self.pool.add_source(source.card.produces, source.card.mana_per_tap);
            }
        }
    }

    /// A land or mana permanent entered the battlefield this turn
    pub fn add_source(&mut self, card: Arc<Card>) {
        if card.produces.is_empty() {
            return;
        }
        let source = ManaSource::new(card, self.turn);
        if source.is_usable(self.turn) {
            self.pool.add_source(source.card.produces, source.card.mana_per_tap);
        }
        self.sources.push(source);
    }

    /// Unspent mana is lost
    pub fn end_turn(&mut self) {
        self.pool.clear();
    }

    pub fn can_pay(&self, cost: &ManaCost) -> bool {
        self.pool.can_pay(cost)
    }

    /// Pay from the current pool; leaves the pool untouched on failure
    pub fn pay(&mut self, cost: &ManaCost) -> Result<()> {
        self.pool.pay(cost)?;
        self.spent_this_turn += cost.cmc() as u32;
        Ok(())
    }

    /// Untapped mana left this turn
    pub fn pool(&self) -> &ManaPool {
        &self.pool
    }

    /// Pool as it would be with every source on the battlefield untapped,
    /// sickness and enter-tapped ignored
    pub fn full_pool(&self) -> ManaPool {
        let mut pool = ManaPool::new();
        for source in &self.sources {
            pool.add_source(source.card.produces, source.card.mana_per_tap);
        }
        pool
    }

    pub fn sources(&self) -> &[ManaSource] {
        &self.sources
    }

    /// Number of sources on the battlefield able to produce `color`
    pub fn sources_of(&self, color: Color) -> u32 {
        self.sources
            .iter()
            .filter(|s| s.card.produces.contains(color))
            .count() as u32
    }

    pub fn spent_this_turn(&self) -> u32 {
        self.spent_this_turn
    }
}
