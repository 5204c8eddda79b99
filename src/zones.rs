//! Game zones (Library, Hand, Graveyard, Command)

use crate::core::Card;
use std::sync::Arc;

/// Different zones where cards can exist during a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Library,
    Hand,
    Graveyard,
    Command,
}

/// An ordered zone of card instances
///
/// Copies of the same card share one `Arc<Card>`; instances are told apart by
/// position only. The top of a library is the end of the vector.
#[derive(Debug, Clone)]
pub struct CardZone {
    pub zone_type: Zone,
    pub cards: Vec<Arc<Card>>,
}

impl CardZone {
    pub fn new(zone_type: Zone) -> Self {
        CardZone {
            zone_type,
            cards: Vec::new(),
        }
    }

    pub fn add(&mut self, card: Arc<Card>) {
        self.cards.push(card);
    }

    /// Remove the card at `index`, keeping the order of the rest
    pub fn take(&mut self, index: usize) -> Option<Arc<Card>> {
        if index < self.cards.len() {
            Some(self.cards.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Card>> {
        self.cards.iter()
    }

    pub fn land_count(&self) -> usize {
        self.cards.iter().filter(|c| c.is_land()).count()
    }

    /// Draw from top (for Library)
    pub fn draw_top(&mut self) -> Option<Arc<Card>> {
        self.cards.pop()
    }

    /// Look at top card without removing it
    pub fn peek_top(&self) -> Option<&Arc<Card>> {
        self.cards.last()
    }

    /// Add to bottom (for Library)
    pub fn add_to_bottom(&mut self, card: Arc<Card>) {
        self.cards.insert(0, card);
    }

    /// Shuffle the zone (for Library)
    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        use rand::seq::SliceRandom;
        self.cards.shuffle(rng);
    }

    /// Move every card into another zone, preserving order
    pub fn drain_into(&mut self, other: &mut CardZone) {
        other.cards.append(&mut self.cards);
    }
}

/// The zones owned by the goldfishing player
#[derive(Debug, Clone)]
pub struct PlayerZones {
    pub library: CardZone,
    pub hand: CardZone,
    pub graveyard: CardZone,
    pub command: CardZone,
}

impl PlayerZones {
    pub fn new() -> Self {
        PlayerZones {
            library: CardZone::new(Zone::Library),
            hand: CardZone::new(Zone::Hand),
            graveyard: CardZone::new(Zone::Graveyard),
            command: CardZone::new(Zone::Command),
        }
    }

    pub fn get_zone(&self, zone: Zone) -> &CardZone {
        match zone {
            Zone::Library => &self.library,
            Zone::Hand => &self.hand,
            Zone::Graveyard => &self.graveyard,
            Zone::Command => &self.command,
        }
    }
}

impl Default for PlayerZones {
    fn default() -> Self {
        Self::new()
    }
}
