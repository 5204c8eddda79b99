//! Static mana curve analysis of a deck list

use crate::core::Color;
use crate::loader::Deck;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Curve statistics computed from the deck list alone, no simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSummary {
    pub total_cards: u32,
    pub lands: u32,
    pub spells: u32,
    pub land_ratio: f64,
    /// Mean converted cost of nonland cards
    pub avg_cmc: f64,
    pub median_cmc: f64,
    /// Most common converted cost; the lowest one when several tie
    pub mode_cmc: Option<u8>,
    /// Nonland card count per converted cost
    pub cmc_distribution: BTreeMap<u8, u32>,
    /// Colored pips across all nonland costs
    pub color_pips: BTreeMap<Color, u32>,
    /// Cards able to produce each color
    pub color_sources: BTreeMap<Color, u32>,
}

impl CurveSummary {
    /// Summarize a deck, commander included
    pub fn from_deck(deck: &Deck) -> Self {
        let mut cards = deck.expand();
        if let Some(commander) = deck.commander() {
            cards.push(commander.clone());
        }

        let mut lands = 0;
        let mut cmcs = Vec::new();
        let mut cmc_distribution = BTreeMap::new();
        let mut color_pips = BTreeMap::new();
        let mut color_sources = BTreeMap::new();

        for card in &cards {
            for color in card.produces.iter() {
                *color_sources.entry(color).or_insert(0) += 1;
            }
            if card.is_land() {
                lands += 1;
                continue;
            }
            cmcs.push(card.cmc);
            *cmc_distribution.entry(card.cmc).or_insert(0) += 1;
            for color in Color::ALL {
                let pips = card.mana_cost.pips(color) as u32;
                if pips > 0 {
                    *color_pips.entry(color).or_insert(0) += pips;
                }
            }
        }

        let total_cards = cards.len() as u32;
        let spells = cmcs.len() as u32;
        cmcs.sort_unstable();

        CurveSummary {
            total_cards,
            lands,
            spells,
            land_ratio: if total_cards == 0 { 0.0 } else { lands as f64 / total_cards as f64 },
            avg_cmc: if cmcs.is_empty() {
                0.0
            } else {
                cmcs.iter().map(|&c| c as f64).sum::<f64>() / cmcs.len() as f64
            },
            median_cmc: median(&cmcs),
            mode_cmc: cmc_distribution
                .iter()
                .max_by_key(|(cmc, count)| (**count, std::cmp::Reverse(**cmc)))
                .map(|(cmc, _)| *cmc),
            cmc_distribution,
            color_pips,
            color_sources,
        }
    }
}

fn median(sorted: &[u8]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardId, CardType, ColorSet, ManaCost};
    use crate::loader::{CardStore, DeckEntry, DeckFormat, DeckList};

    #[test]
    fn test_curve_summary() {
        let mut island = Card::new(CardId::new("island"), "Island");
        island.types.push(CardType::Land);
        island.supertypes.push("basic".to_string());
        island.produces = ColorSet::single(Color::Blue);

        let mut spells = Vec::new();
        for (id, cost) in [("opt", "{U}"), ("divination", "{2}{U}"), ("thoughtcast", "{4}{U}{U}")] {
            let mut card = Card::new(CardId::new(id), id);
            card.types.push(CardType::Sorcery);
            card.mana_cost = ManaCost::parse(cost);
            card.cmc = card.mana_cost.cmc();
            spells.push(card);
        }
        let mut all = vec![island];
        all.extend(spells);
        let store = CardStore::from_cards(all);
        let list = DeckList::from_entries(vec![
            DeckEntry::new("island", 16),
            DeckEntry::new("opt", 12),
            DeckEntry::new("divination", 8),
            DeckEntry::new("thoughtcast", 4),
        ]);
        let deck = Deck::build(&list, &store, &DeckFormat::limited()).unwrap();
        let curve = CurveSummary::from_deck(&deck);

        assert_eq!(curve.total_cards, 40);
        assert_eq!(curve.lands, 16);
        assert_eq!(curve.spells, 24);
        assert!((curve.land_ratio - 0.4).abs() < 1e-12);
        assert_eq!(curve.mode_cmc, Some(1));
        assert_eq!(curve.median_cmc, 2.0);
        assert!((curve.avg_cmc - (12.0 + 24.0 + 24.0) / 24.0).abs() < 1e-12);
        assert_eq!(curve.cmc_distribution.get(&3), Some(&8));
        assert_eq!(curve.color_pips.get(&Color::Blue), Some(&(12 + 8 + 8)));
        assert_eq!(curve.color_sources.get(&Color::Blue), Some(&16));
    }
}
