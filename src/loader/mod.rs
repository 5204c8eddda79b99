//! Card and deck loaders
//!
//! Card records come from Scryfall-style JSON; decks from `.dck` text lists
//! or `{card, count}` entries.

pub mod card;
pub mod database;
pub mod deck;

pub use card::{CardFace, CardRecord};
pub use database::{CardStore, LoadSummary, SnapshotVersion};
pub use deck::{Deck, DeckEntry, DeckFormat, DeckList, DeckLoader, DeckSize, DeckViolation};
