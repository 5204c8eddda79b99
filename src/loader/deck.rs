//! Deck lists, formats and validation
//!
//! A [`DeckList`] is what a user typed (a `.dck` file or `{card, count}`
//! entries). A [`Deck`] only exists once that list has been resolved against a
//! card store and checked against a [`DeckFormat`].

use crate::core::Card;
use crate::loader::database::CardStore;
use crate::{GoldfishError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Deck loader for .dck and plain text lists
pub struct DeckLoader;

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Main,
    Sideboard,
    Commander,
    Other,
}

impl DeckLoader {
    /// Load a deck from a .dck file
    pub fn load_from_file(path: &Path) -> Result<DeckList> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a deck from its text content
    ///
    /// Lines are "4 Lightning Bolt", "4x Lightning Bolt" or
    /// "1 Lightning Bolt|M10". `[Main]`, `[Sideboard]` and `[Commander]`
    /// switch sections; any other `[section]` (such as `[metadata]`) is
    /// skipped along with `#` comments.
    pub fn parse(content: &str) -> Result<DeckList> {
        let mut list = DeckList::default();
        let mut section = Section::Main;

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            if line.starts_with('[') {
                section = match line.trim_matches(|c| c == '[' || c == ']').to_lowercase().as_str() {
                    "main" | "deck" => Section::Main,
                    "sideboard" => Section::Sideboard,
                    "commander" => Section::Commander,
                    _ => Section::Other,
                };
                continue;
            }
            if section == Section::Other {
                continue;
            }

            let Some((count_str, rest)) = line.split_once(' ') else {
                return Err(GoldfishError::InvalidDeckFormat(format!(
                    "line {}: expected '<count> <card name>', got '{line}'",
                    line_no + 1
                )));
            };
            let count: u32 = count_str.trim_end_matches(['x', 'X']).parse().map_err(|_| {
                GoldfishError::InvalidDeckFormat(format!(
                    "line {}: invalid card count '{count_str}'",
                    line_no + 1
                ))
            })?;

            // Drop a trailing set code
            let card = match rest.split_once('|') {
                Some((name, _set)) => name.trim(),
                None => rest.trim(),
            };
            if card.is_empty() || count == 0 {
                continue;
            }

            let entry = DeckEntry::new(card, count);
            match section {
                Section::Main => list.main_deck.push(entry),
                Section::Sideboard => list.sideboard.push(entry),
                Section::Commander => list.commander.push(entry),
                Section::Other => {}
            }
        }

        if list.main_deck.is_empty() && list.commander.is_empty() {
            return Err(GoldfishError::InvalidDeckFormat("Empty deck".to_string()));
        }

        Ok(list)
    }
}

/// A deck entry: a card id or name and how many copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    #[serde(alias = "card_id", alias = "card_name")]
    pub card: String,
    pub count: u32,
}

impl DeckEntry {
    pub fn new(card: impl Into<String>, count: u32) -> Self {
        DeckEntry {
            card: card.into(),
            count,
        }
    }
}

/// An unvalidated deck list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckList {
    pub main_deck: Vec<DeckEntry>,
    #[serde(default)]
    pub sideboard: Vec<DeckEntry>,
    #[serde(default)]
    pub commander: Vec<DeckEntry>,
}

impl DeckList {
    /// Main deck only
    pub fn from_entries(entries: Vec<DeckEntry>) -> Self {
        DeckList {
            main_deck: entries,
            ..DeckList::default()
        }
    }

    /// Total cards in main deck
    pub fn total_cards(&self) -> usize {
        self.main_deck.iter().map(|e| e.count as usize).sum()
    }

    /// Total cards in sideboard
    pub fn sideboard_size(&self) -> usize {
        self.sideboard.iter().map(|e| e.count as usize).sum()
    }
}

/// Required deck size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckSize {
    Exactly(u32),
    AtLeast(u32),
}

impl DeckSize {
    pub fn accepts(self, size: u32) -> bool {
        match self {
            DeckSize::Exactly(n) => size == n,
            DeckSize::AtLeast(n) => size >= n,
        }
    }
}

impl fmt::Display for DeckSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckSize::Exactly(n) => write!(f, "exactly {n}"),
            DeckSize::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Construction rules a deck is validated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckFormat {
    pub name: String,
    pub size: DeckSize,
    /// Copy limit per card; basic lands are exempt. `None` means unlimited.
    pub max_copies: Option<u32>,
}

impl DeckFormat {
    /// Sealed and draft: exactly 40 cards, no copy limit
    pub fn limited() -> Self {
        DeckFormat {
            name: "limited".to_string(),
            size: DeckSize::Exactly(40),
            max_copies: None,
        }
    }

    /// Exactly 60 cards, up to 4 copies
    pub fn constructed() -> Self {
        DeckFormat {
            name: "constructed".to_string(),
            size: DeckSize::Exactly(60),
            max_copies: Some(4),
        }
    }

    /// Exactly 100 cards including the commander, singleton
    pub fn commander() -> Self {
        DeckFormat {
            name: "commander".to_string(),
            size: DeckSize::Exactly(100),
            max_copies: Some(1),
        }
    }

    pub fn custom(name: impl Into<String>, size: DeckSize, max_copies: Option<u32>) -> Self {
        DeckFormat {
            name: name.into(),
            size,
            max_copies,
        }
    }

    /// Look up a preset by name
    pub fn by_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "limited" | "draft" | "sealed" => Ok(DeckFormat::limited()),
            "constructed" | "standard" | "modern" | "legacy" | "vintage" | "pioneer" => {
                Ok(DeckFormat::constructed())
            }
            "commander" | "edh" => Ok(DeckFormat::commander()),
            other => Err(GoldfishError::InvalidConfig(format!("unknown deck format '{other}'"))),
        }
    }
}

/// One way a deck list breaks its format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckViolation {
    TooManyCopies { card: String, count: u32, max: u32 },
    WrongSize { expected: DeckSize, actual: u32 },
    UnknownCard { card: String },
    TooManyCommanders { count: u32 },
}

impl fmt::Display for DeckViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckViolation::TooManyCopies { card, count, max } => {
                write!(f, "{count} copies of '{card}' (limit {max})")
            }
            DeckViolation::WrongSize { expected, actual } => {
                write!(f, "deck has {actual} cards, format requires {expected}")
            }
            DeckViolation::UnknownCard { card } => write!(f, "unknown card '{card}'"),
            DeckViolation::TooManyCommanders { count } => {
                write!(f, "{count} commanders listed, only one is supported")
            }
        }
    }
}

/// A validated deck, immutable for the length of a simulation run
#[derive(Debug, Clone)]
pub struct Deck {
    entries: Vec<(Arc<Card>, u32)>,
    commander: Option<Arc<Card>>,
    format: DeckFormat,
}

impl Deck {
    /// Resolve `list` against `store` and validate it against `format`
    ///
    /// Every violation is collected before returning, so a caller can report
    /// all of them at once. Repeated lines for the same card are merged, in
    /// first-appearance order. The sideboard is ignored. Counts saturate at
    /// `u32::MAX`; a deck whose total overflows is always the wrong size.
    pub fn build(list: &DeckList, store: &CardStore, format: &DeckFormat) -> Result<Deck> {
        let mut violations = Vec::new();
        let mut entries: Vec<(Arc<Card>, u32)> = Vec::new();
        let mut copies: BTreeMap<&str, (u32, &Arc<Card>)> = BTreeMap::new();
        let mut overflowed = false;

        for entry in &list.main_deck {
            match store.resolve(&entry.card) {
                Some(card) => {
                    match entries.iter_mut().find(|(c, _)| c.id == card.id) {
                        Some((_, count)) => {
                            overflowed |= count.checked_add(entry.count).is_none();
                            *count = count.saturating_add(entry.count);
                        }
                        None => entries.push((Arc::clone(card), entry.count)),
                    }
                    let copy = &mut copies.entry(card.id.as_str()).or_insert((0, card)).0;
                    *copy = copy.saturating_add(entry.count);
                }
                None => violations.push(DeckViolation::UnknownCard {
                    card: entry.card.clone(),
                }),
            }
        }

        let mut commander = None;
        let commander_count = list.commander.iter().fold(0u32, |n, e| n.saturating_add(e.count));
        if commander_count > 1 {
            violations.push(DeckViolation::TooManyCommanders {
                count: commander_count,
            });
        }
        if let Some(entry) = list.commander.first() {
            match store.resolve(&entry.card) {
                Some(card) => {
                    let copy = &mut copies.entry(card.id.as_str()).or_insert((0, card)).0;
                    *copy = copy.saturating_add(1);
                    commander = Some(Arc::clone(card));
                }
                None => violations.push(DeckViolation::UnknownCard {
                    card: entry.card.clone(),
                }),
            }
        }

        if let Some(max) = format.max_copies {
            for (count, card) in copies.values() {
                if *count > max && !card.is_basic() {
                    violations.push(DeckViolation::TooManyCopies {
                        card: card.name.to_string(),
                        count: *count,
                        max,
                    });
                }
            }
        }

        let total = entries
            .iter()
            .map(|(_, n)| *n)
            .chain(commander.iter().map(|_| 1))
            .try_fold(0u32, u32::checked_add);
        match total {
            Some(total) if !overflowed && format.size.accepts(total) => {}
            _ => violations.push(DeckViolation::WrongSize {
                expected: format.size,
                actual: total.unwrap_or(u32::MAX),
            }),
        }

        if !violations.is_empty() {
            return Err(GoldfishError::DeckInvalid(violations));
        }

        Ok(Deck {
            entries,
            commander,
            format: format.clone(),
        })
    }

    /// Card instances of the library, in list order (commander excluded)
    pub fn expand(&self) -> Vec<Arc<Card>> {
        self.entries
            .iter()
            .flat_map(|(card, count)| std::iter::repeat(card).take(*count as usize).cloned())
            .collect()
    }

    pub fn entries(&self) -> &[(Arc<Card>, u32)] {
        &self.entries
    }

    pub fn commander(&self) -> Option<&Arc<Card>> {
        self.commander.as_ref()
    }

    pub fn format(&self) -> &DeckFormat {
        &self.format
    }

    /// Library size (commander excluded)
    pub fn library_size(&self) -> usize {
        self.entries.iter().map(|(_, n)| *n as usize).sum()
    }

    pub fn land_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(card, _)| card.is_land())
            .map(|(_, n)| *n as usize)
            .sum()
    }

    /// Every distinct card in the deck, commander included
    pub fn unique_cards(&self) -> impl Iterator<Item = &Arc<Card>> {
        self.entries.iter().map(|(card, _)| card).chain(self.commander.iter())
    }
}
