//! Error types for MTG Goldfish

use crate::core::ManaCost;
use crate::loader::deck::DeckViolation;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoldfishError {
    /// Query for a card id that the graph or store has never seen
    #[error("Card not found: {0}")]
    NotFound(String),

    /// Payment attempted without a sufficient pool. Expected during simulation.
    #[error("Insufficient mana to pay {cost} (pool has {available} usable sources)")]
    InsufficientMana { cost: ManaCost, available: u32 },

    #[error("Deck is invalid: {}", DisplayViolations(.0))]
    DeckInvalid(Vec<DeckViolation>),

    #[error("Synergy graph is stale: built from snapshot {built}, store is at {current}")]
    GraphStale { built: String, current: String },

    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),

    #[error("Invalid deck format: {0}")]
    InvalidDeckFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl GoldfishError {
    /// Every violation behind a `DeckInvalid`, empty for other variants
    pub fn violations(&self) -> &[DeckViolation] {
        match self {
            GoldfishError::DeckInvalid(v) => v,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for GoldfishError {
    fn from(e: serde_json::Error) -> Self {
        GoldfishError::SerializationError(e.to_string())
    }
}

struct DisplayViolations<'a>(&'a [DeckViolation]);

impl fmt::Display for DisplayViolations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, GoldfishError>;
