//! Card types and definitions

use crate::core::{CardId, CardName, ColorSet, ManaCost, Subtype, Tag};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Card types in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardType {
    Creature,
    Instant,
    Sorcery,
    Enchantment,
    Artifact,
    Land,
    Planeswalker,
    Battle,
    Kindred,
}

impl CardType {
    pub fn from_word(word: &str) -> Option<CardType> {
        match word.to_lowercase().as_str() {
            "creature" => Some(CardType::Creature),
            "instant" => Some(CardType::Instant),
            "sorcery" => Some(CardType::Sorcery),
            "enchantment" => Some(CardType::Enchantment),
            "artifact" => Some(CardType::Artifact),
            "land" => Some(CardType::Land),
            "planeswalker" => Some(CardType::Planeswalker),
            "battle" => Some(CardType::Battle),
            "kindred" | "tribal" => Some(CardType::Kindred),
            _ => None,
        }
    }

    /// Does a card of this type stay on the battlefield after it resolves?
    pub fn is_permanent(self) -> bool {
        !matches!(self, CardType::Instant | CardType::Sorcery)
    }
}

/// An immutable card definition
///
/// Created once when the card store ingests a record and shared by `Arc`
/// between the store, the synergy graph, decks and every simulated trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    /// Card name (e.g., "Lightning Bolt")
    pub name: CardName,

    pub mana_cost: ManaCost,

    /// Converted mana cost as printed by the record store
    pub cmc: u8,

    pub color_identity: ColorSet,

    /// Card types (a card can be multiple types)
    pub types: SmallVec<[CardType; 2]>,

    /// Card subtypes (e.g., "goblin", "warrior", "forest")
    pub subtypes: SmallVec<[Subtype; 2]>,

    /// Supertypes such as "basic" or "legendary"
    pub supertypes: SmallVec<[String; 1]>,

    /// Oracle text, empty when the record had none
    pub oracle_text: String,

    /// Printed keyword abilities ("Flying", "Haste")
    pub keywords: Vec<String>,

    /// Synergy tags derived from the oracle text and keywords
    pub tags: BTreeSet<Tag>,

    /// Colors of mana this card can produce once on the battlefield
    pub produces: ColorSet,

    /// Mana added per tap ({T}: Add {C}{C} is 2)
    pub mana_per_tap: u8,
}

impl Card {
    pub fn new(id: CardId, name: impl Into<CardName>) -> Self {
        Card {
            id,
            name: name.into(),
            mana_cost: ManaCost::new(),
            cmc: 0,
            color_identity: ColorSet::empty(),
            types: SmallVec::new(),
            subtypes: SmallVec::new(),
            supertypes: SmallVec::new(),
            oracle_text: String::new(),
            keywords: Vec::new(),
            tags: BTreeSet::new(),
            produces: ColorSet::empty(),
            mana_per_tap: 1,
        }
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    pub fn is_creature(&self) -> bool {
        self.is_type(CardType::Creature)
    }

    pub fn is_land(&self) -> bool {
        self.is_type(CardType::Land)
    }

    pub fn is_basic(&self) -> bool {
        self.supertypes.iter().any(|s| s == "basic")
    }

    pub fn is_permanent(&self) -> bool {
        !self.types.is_empty() && self.types.iter().all(|t| t.is_permanent())
    }

    pub fn has_subtype(&self, subtype: &Subtype) -> bool {
        self.subtypes.contains(subtype)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }

    /// Nonland permanent that taps for mana (Llanowar Elves, Sol Ring)
    pub fn is_mana_rock_or_dork(&self) -> bool {
        !self.is_land() && !self.produces.is_empty() && self.is_permanent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    #[test]
    fn test_card_creation() {
        let card = Card::new(CardId::new("bolt"), "Lightning Bolt");
        assert_eq!(card.id.as_str(), "bolt");
        assert_eq!(card.name.as_str(), "Lightning Bolt");
        assert!(card.tags.is_empty());
        assert!(!card.is_permanent());
    }

    #[test]
    fn test_permanence() {
        let mut elves = Card::new(CardId::new("elves"), "Llanowar Elves");
        elves.types.push(CardType::Creature);
        elves.produces.insert(Color::Green);
        assert!(elves.is_permanent());
        assert!(elves.is_mana_rock_or_dork());

        let mut forest = Card::new(CardId::new("forest"), "Forest");
        forest.types.push(CardType::Land);
        forest.supertypes.push("basic".to_string());
        forest.produces.insert(Color::Green);
        assert!(forest.is_basic());
        assert!(!forest.is_mana_rock_or_dork());

        let mut adventure = Card::new(CardId::new("x"), "Kindred Instant");
        adventure.types.push(CardType::Kindred);
        adventure.types.push(CardType::Instant);
        assert!(!adventure.is_permanent());
    }
}
