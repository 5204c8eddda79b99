//! Core card types and entities

pub mod card;
pub mod entity;
pub mod mana;
pub mod types;

pub use card::{Card, CardType};
pub use entity::{CardId, EdgeIndex, NodeIndex};
pub use mana::{Color, ColorSet, ManaCost, ManaPool};
pub use types::{CardName, Subtype, Tag};
