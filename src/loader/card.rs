//! Card record ingestion (Scryfall-style JSON)
//!
//! Every field except `name` is optional. Missing or malformed fields degrade
//! to empty values so a single odd record never fails a whole load.

use crate::core::{Card, CardId, CardType, Color, ColorSet, ManaCost, Subtype};
use crate::synergy::rules::RuleSet;
use crate::{GoldfishError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One card as it appears in a card data dump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub color_identity: Vec<String>,
    pub type_line: Option<String>,
    pub cmc: Option<f64>,
    pub oracle_text: Option<String>,
    pub keywords: Vec<String>,
    pub produced_mana: Vec<String>,
    pub card_faces: Vec<CardFace>,
}

/// One face of a double-faced, split or adventure card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFace {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
}

impl CardRecord {
    /// Build the immutable card, deriving tags with `rules`
    pub fn into_card(self, rules: &RuleSet) -> Result<Card> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GoldfishError::InvalidCardFormat("Missing card name".to_string()))?
            .to_string();

        let front = self.card_faces.first();
        let mana_cost_str = non_empty(self.mana_cost.as_deref())
            .or_else(|| front.and_then(|f| non_empty(f.mana_cost.as_deref())))
            .unwrap_or("");
        let type_line = non_empty(self.type_line.as_deref())
            .or_else(|| front.and_then(|f| non_empty(f.type_line.as_deref())))
            .unwrap_or("");
        let oracle_text = non_empty(self.oracle_text.as_deref())
            .or_else(|| front.and_then(|f| non_empty(f.oracle_text.as_deref())))
            .unwrap_or("")
            .to_string();

        let id = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(CardId::new)
            .unwrap_or_else(|| CardId::new(name.to_lowercase()));

        let mut card = Card::new(id, name.as_str());
        card.mana_cost = ManaCost::parse(mana_cost_str);
        card.cmc = match self.cmc {
            Some(cmc) if cmc.is_finite() && cmc >= 0.0 => cmc.round().min(u8::MAX as f64) as u8,
            _ => card.mana_cost.cmc(),
        };

        let parsed = parse_type_line(type_line);
        card.types = parsed.types;
        card.supertypes = parsed.supertypes;
        card.subtypes = parsed.subtypes;

        card.color_identity = if self.color_identity.is_empty() {
            card.mana_cost.colors()
        } else {
            self.color_identity
                .iter()
                .filter_map(|c| c.chars().next().and_then(Color::from_symbol))
                .filter(|c| *c != Color::Colorless)
                .collect()
        };

        card.keywords = self.keywords;
        card.tags = rules.derive_tags(&name, &oracle_text, &card.keywords);
        let (produces, mana_per_tap) = derive_production(&card, &oracle_text, &self.produced_mana);
        card.produces = produces;
        card.mana_per_tap = mana_per_tap;
        card.oracle_text = oracle_text;

        Ok(card)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) struct TypeLine {
    pub types: SmallVec<[CardType; 2]>,
    pub supertypes: SmallVec<[String; 1]>,
    pub subtypes: SmallVec<[Subtype; 2]>,
}

/// Split "Legendary Creature — Elf Druid" into types, supertypes and subtypes
///
/// Only the front face of "A // B" type lines is read. An ASCII " - " is
/// accepted in place of the em dash.
pub(crate) fn parse_type_line(line: &str) -> TypeLine {
    let front = line.split("//").next().unwrap_or("").trim();
    let (left, right) = match front.split_once('—') {
        Some((l, r)) => (l, r),
        None => match front.split_once(" - ") {
            Some((l, r)) => (l, r),
            None => (front, ""),
        },
    };

    let mut parsed = TypeLine {
        types: SmallVec::new(),
        supertypes: SmallVec::new(),
        subtypes: SmallVec::new(),
    };

    for word in left.split_whitespace() {
        match CardType::from_word(word) {
            Some(t) if !parsed.types.contains(&t) => parsed.types.push(t),
            Some(_) => {}
            None => parsed.supertypes.push(word.to_lowercase()),
        }
    }
    for word in right.split_whitespace() {
        let subtype = Subtype::new(word);
        if !parsed.subtypes.contains(&subtype) {
            parsed.subtypes.push(subtype);
        }
    }
    parsed
}

/// Colors a permanent can tap for, and how much mana one tap adds
///
/// Sources, in order: `{T}: Add ...` abilities in the oracle text, the
/// record's `produced_mana` list, then basic land types. Instants and
/// sorceries never count as sources. The amount is the largest run of
/// symbols in one option of an `Add` effect, so `{C}{C}` is 2 and
/// `{R} or {G}` is 1.
fn derive_production(card: &Card, oracle_text: &str, produced_mana: &[String]) -> (ColorSet, u8) {
    if !card.is_permanent() {
        return (ColorSet::empty(), 1);
    }

    let mut produces = ColorSet::empty();
    let mut amount = 1u8;
    for ability in oracle_text.to_lowercase().lines() {
        let Some(tap) = ability.find("{t}") else {
            continue;
        };
        let Some(add) = ability[tap..].find("add ") else {
            continue;
        };
        let effect = &ability[tap + add + 4..];
        let effect = effect.split('.').next().unwrap_or("");
        if effect.contains("any color") || effect.contains("any one color") {
            produces = produces.union(ColorSet::wubrg());
        }
        produces = produces.union(symbols_in(effect));
        for option in effect.split(" or ") {
            amount = amount.max(symbol_count(option));
        }
    }

    if produces.is_empty() {
        produces = produced_mana
            .iter()
            .filter_map(|c| c.chars().next().and_then(Color::from_symbol))
            .collect();
    }

    if produces.is_empty() && card.is_land() {
        for subtype in &card.subtypes {
            let color = match subtype.as_str() {
                "plains" => Some(Color::White),
                "island" => Some(Color::Blue),
                "swamp" => Some(Color::Black),
                "mountain" => Some(Color::Red),
                "forest" => Some(Color::Green),
                _ => None,
            };
            if let Some(color) = color {
                produces.insert(color);
            }
        }
    }
    (produces, amount)
}

/// Number of single-color `{W}`/`{C}` symbols in `text`
fn symbol_count(text: &str) -> u8 {
    let mut count = 0u8;
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let mut symbol = after[..close].chars();
        if let (Some(c), None) = (symbol.next(), symbol.next()) {
            if Color::from_symbol(c).is_some() {
                count = count.saturating_add(1);
            }
        }
        rest = &after[close + 1..];
    }
    count
}

/// Colors named by `{W}`-style symbols in a fragment of text
fn symbols_in(text: &str) -> ColorSet {
    let mut set = ColorSet::empty();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let symbol = &after[..close];
        if symbol.len() == 1 {
            if let Some(color) = symbol.chars().next().and_then(Color::from_symbol) {
                set.insert(color);
            }
        }
        rest = &after[close + 1..];
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> &'static RuleSet {
        RuleSet::standard().unwrap()
    }

    fn record(json: &str) -> CardRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_record() {
        let card = record(
            r#"{
                "id": "llanowar-elves",
                "name": "Llanowar Elves",
                "mana_cost": "{G}",
                "cmc": 1.0,
                "color_identity": ["G"],
                "type_line": "Creature — Elf Druid",
                "oracle_text": "{T}: Add {G}.",
                "keywords": []
            }"#,
        )
        .into_card(rules())
        .unwrap();

        assert_eq!(card.id.as_str(), "llanowar-elves");
        assert_eq!(card.cmc, 1);
        assert_eq!(card.mana_cost.green, 1);
        assert!(card.is_creature());
        assert!(card.has_subtype(&Subtype::new("elf")));
        assert!(card.has_subtype(&Subtype::new("druid")));
        assert_eq!(card.produces, ColorSet::single(Color::Green));
        assert!(card.has_tag("mana-producer"));
    }

    #[test]
    fn test_missing_fields_degrade() {
        let card = record(r#"{"name": "Mystery Card"}"#).into_card(rules()).unwrap();
        assert_eq!(card.id.as_str(), "mystery card");
        assert_eq!(card.cmc, 0);
        assert!(card.types.is_empty());
        assert!(card.tags.is_empty());
        assert!(card.produces.is_empty());
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = record(r#"{"id": "x"}"#).into_card(rules()).unwrap_err();
        assert!(matches!(err, GoldfishError::InvalidCardFormat(_)));
    }

    #[test]
    fn test_basic_land_without_text() {
        let card = record(r#"{"name": "Forest", "type_line": "Basic Land — Forest"}"#)
            .into_card(rules())
            .unwrap();
        assert!(card.is_land());
        assert!(card.is_basic());
        assert_eq!(card.produces, ColorSet::single(Color::Green));
    }

    #[test]
    fn test_dual_land_and_any_color() {
        let taiga = record(
            r#"{"name": "Taiga", "type_line": "Land — Mountain Forest", "oracle_text": "({T}: Add {R} or {G}.)"}"#,
        )
        .into_card(rules())
        .unwrap();
        assert_eq!(taiga.produces.len(), 2);

        let birds = record(
            r#"{"name": "Birds of Paradise", "type_line": "Creature — Bird",
                "oracle_text": "Flying\n{T}: Add one mana of any color.", "keywords": ["Flying"]}"#,
        )
        .into_card(rules())
        .unwrap();
        assert_eq!(birds.produces, ColorSet::wubrg());
        assert!(birds.has_tag("kw:flying"));
    }

    #[test]
    fn test_multi_mana_sources() {
        let sol_ring = record(
            r#"{"name": "Sol Ring", "type_line": "Artifact", "mana_cost": "{1}", "oracle_text": "{T}: Add {C}{C}."}"#,
        )
        .into_card(rules())
        .unwrap();
        assert_eq!(sol_ring.produces, ColorSet::single(Color::Colorless));
        assert_eq!(sol_ring.mana_per_tap, 2);

        let karplusan = record(
            r#"{"name": "Karplusan Forest", "type_line": "Land",
                "oracle_text": "{T}: Add {C}.\n{T}: Add {R} or {G}. This land deals 1 damage to you."}"#,
        )
        .into_card(rules())
        .unwrap();
        assert_eq!(karplusan.mana_per_tap, 1);
        assert_eq!(karplusan.produces.len(), 3);

        let forest = record(r#"{"name": "Forest", "type_line": "Basic Land — Forest"}"#)
            .into_card(rules())
            .unwrap();
        assert_eq!(forest.mana_per_tap, 1);
    }

    #[test]
    fn test_rituals_are_not_sources() {
        let ritual = record(
            r#"{"name": "Dark Ritual", "type_line": "Instant", "mana_cost": "{B}", "oracle_text": "Add {B}{B}{B}."}"#,
        )
        .into_card(rules())
        .unwrap();
        assert!(ritual.produces.is_empty());
    }

    #[test]
    fn test_double_faced_front_face() {
        let card = record(
            r#"{
                "name": "Delver of Secrets // Insectile Aberration",
                "type_line": "Creature — Human Wizard // Creature — Human Insect",
                "card_faces": [
                    {"name": "Delver of Secrets", "mana_cost": "{U}", "oracle_text": "At the beginning of your upkeep, look at the top card of your library."},
                    {"name": "Insectile Aberration", "mana_cost": "", "oracle_text": "Flying"}
                ]
            }"#,
        )
        .into_card(rules())
        .unwrap();
        assert_eq!(card.mana_cost.blue, 1);
        assert_eq!(card.cmc, 1);
        assert!(card.has_subtype(&Subtype::new("wizard")));
        assert!(!card.has_subtype(&Subtype::new("insect")));
        assert!(card.oracle_text.starts_with("At the beginning"));
    }

    #[test]
    fn test_type_line_with_ascii_dash() {
        let parsed = parse_type_line("Legendary Creature - Goblin Warrior");
        assert_eq!(parsed.types.as_slice(), &[CardType::Creature]);
        assert_eq!(parsed.supertypes.as_slice(), &["legendary".to_string()]);
        assert_eq!(parsed.subtypes.len(), 2);
    }
}
