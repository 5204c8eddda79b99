//! MTG Goldfish - deck evaluation by synergy graph and Monte Carlo goldfishing
//!
//! Builds a weighted card-synergy graph from oracle text, and plays a deck
//! alone against an empty board many times over to measure its mana
//! consistency and curve.

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod loader;
pub mod simulation;
pub mod synergy;
pub mod zones;

pub use error::{GoldfishError, Result};
