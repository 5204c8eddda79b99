//! Versioned oracle-text rule tables
//!
//! Tag derivation is an ordered list of `(pattern, tag)` rules evaluated
//! against lowercased oracle text. Complementary pairs carry a curated rarity
//! score: the rarer the interaction, the heavier the resulting combo edge.
//!
//! Both tables are fixture data. Any change to them must bump
//! [`RULESET_VERSION`] so cached graphs built from older rules are rejected.

use crate::core::{Subtype, Tag};
use crate::{GoldfishError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const RULESET_VERSION: u32 = 1;

/// One oracle-text pattern and the canonical tag it yields
#[derive(Debug, Clone, Copy)]
pub struct TagRule {
    pub tag: &'static str,
    pub pattern: &'static str,
}

/// Two tags that interact, with the rarity of the interaction in (0, 1)
#[derive(Debug, Clone, Copy)]
pub struct Complement {
    pub left: &'static str,
    pub right: &'static str,
    pub rarity: f64,
}

pub const TAG_RULES: &[TagRule] = &[
    TagRule { tag: "sac-outlet", pattern: r"\bsacrifice (?:a|an|another|one or more|two|x) (?:other )?(?:nonland |nontoken )?(?:creature|artifact|permanent|token)s?\b" },
    TagRule { tag: "death-payoff", pattern: r"whenever (?:a|an|another|one or more) (?:other )?(?:nontoken )?creatures? (?:you control )?(?:dies|die|is put into a graveyard)" },
    TagRule { tag: "token-maker", pattern: r"\bcreates? (?:a|an|one|two|three|four|five|x|that many|[a-z]+) .{0,60}?tokens?\b" },
    TagRule { tag: "artifact-token", pattern: r"\b(?:treasure|clue|food|blood|map) tokens?\b" },
    TagRule { tag: "token-payoff", pattern: r"whenever (?:a|one or more) (?:[a-z]+ )?(?:creature )?tokens? (?:you control )?enters?" },
    TagRule { tag: "card-draw", pattern: r"\bdraws? (?:a|an|one|two|three|four|x|that many|[a-z]+) (?:additional )?cards?\b" },
    TagRule { tag: "discard-outlet", pattern: r"\bdiscard (?:a|one|two|three|x|[a-z]+) cards?\b" },
    TagRule { tag: "discard-payoff", pattern: r"whenever you discard|\bmadness\b" },
    TagRule { tag: "counterspell", pattern: r"\bcounter target (?:spell|creature spell|noncreature spell|activated|triggered|instant|sorcery)" },
    TagRule { tag: "plus-one-counters", pattern: r"\+1/\+1 counters?" },
    TagRule { tag: "proliferate", pattern: r"\bproliferate\b" },
    TagRule { tag: "lifegain", pattern: r"\byou gain (?:\d+|x|that much|life)|\blifelink\b" },
    TagRule { tag: "lifegain-payoff", pattern: r"whenever you gain life" },
    TagRule { tag: "self-mill", pattern: r"\bmills? (?:\d+|a|two|three|four|five|x|[a-z]+) cards?|put the top .{0,30} of your library into your graveyard" },
    TagRule { tag: "graveyard-payoff", pattern: r"\bfrom your graveyard\b" },
    TagRule { tag: "reanimation", pattern: r"return (?:target|up to one target|a|another target) creature cards? from (?:your|a) graveyard to the battlefield" },
    TagRule { tag: "etb-value", pattern: r"when(?:ever)? (?:~|this creature|this permanent) enters" },
    TagRule { tag: "blink", pattern: r"exile (?:another |up to one )?target (?:creature|permanent|nonland permanent)(?: you control)?, then return" },
    TagRule { tag: "untapper", pattern: r"\buntap (?:target|another target|all|up to)" },
    TagRule { tag: "mana-producer", pattern: r"\{t\}: add|add (?:one|two|three) mana of any" },
    TagRule { tag: "ramp", pattern: r"search your library for (?:a|up to two|two|up to one) (?:basic )?lands? cards?|search your library for (?:a|up to [a-z]+) basic land" },
    TagRule { tag: "extra-land", pattern: r"play an additional land" },
    TagRule { tag: "landfall", pattern: r"\blandfall\b|whenever a land (?:you control )?enters" },
    TagRule { tag: "spellslinger", pattern: r"whenever you cast (?:an|a|your first) (?:instant|sorcery|noncreature)" },
    TagRule { tag: "copy-spell", pattern: r"\bcopy target (?:instant|sorcery|spell)" },
    TagRule { tag: "cost-reduction", pattern: r"spells you cast cost \{\d\} less|costs? \{\d\} less to cast" },
    TagRule { tag: "artifact-payoff", pattern: r"whenever (?:an|another) artifact (?:you control )?enters|for each artifact you control" },
    TagRule { tag: "removal", pattern: r"\b(?:destroy|exile) target (?:creature|permanent|nonland permanent|artifact|enchantment|planeswalker)" },
    TagRule { tag: "tutor", pattern: r"search your library for an? (?:card|creature card|instant|sorcery|artifact card|enchantment card)" },
    TagRule { tag: "haste-enabler", pattern: r"creatures you control have haste|gains? haste until" },
];

pub const COMPLEMENTS: &[Complement] = &[
    Complement { left: "sac-outlet", right: "death-payoff", rarity: 0.9 },
    Complement { left: "self-mill", right: "reanimation", rarity: 0.85 },
    Complement { left: "etb-value", right: "blink", rarity: 0.85 },
    Complement { left: "plus-one-counters", right: "proliferate", rarity: 0.8 },
    Complement { left: "discard-outlet", right: "discard-payoff", rarity: 0.8 },
    Complement { left: "token-maker", right: "token-payoff", rarity: 0.75 },
    Complement { left: "lifegain", right: "lifegain-payoff", rarity: 0.75 },
    Complement { left: "extra-land", right: "landfall", rarity: 0.75 },
    Complement { left: "token-maker", right: "sac-outlet", rarity: 0.7 },
    Complement { left: "mana-producer", right: "untapper", rarity: 0.7 },
    Complement { left: "artifact-token", right: "artifact-payoff", rarity: 0.7 },
    Complement { left: "spellslinger", right: "copy-spell", rarity: 0.7 },
    Complement { left: "ramp", right: "landfall", rarity: 0.65 },
    Complement { left: "self-mill", right: "graveyard-payoff", rarity: 0.6 },
    Complement { left: "artifact-token", right: "sac-outlet", rarity: 0.6 },
    Complement { left: "cost-reduction", right: "spellslinger", rarity: 0.6 },
    Complement { left: "spellslinger", right: "card-draw", rarity: 0.4 },
    Complement { left: "haste-enabler", right: "etb-value", rarity: 0.4 },
];

/// Oracle phrasings that name a creature type the card cares about
const TRIBAL_REFERENCE_PATTERNS: &[&str] = &[
    r"\b([a-z]+) creatures? you control\b",
    r"\b(?:other|each) ([a-z]+) you control\b",
    r"\b([a-z]+) spells? you cast\b",
    r"\bwhenever (?:a|an|another) ([a-z]+) (?:you control )?(?:enters|dies|attacks)",
];

/// Words the tribal patterns capture that are never creature types
const NOT_A_CREATURE_TYPE: &[&str] = &[
    "other", "each", "all", "another", "the", "token", "nontoken", "attacking", "blocking",
    "tapped", "untapped", "legendary", "artifact", "enchantment", "noncreature", "creature",
    "instant", "sorcery", "your", "that", "and", "or",
];

/// Compiled rule tables
#[derive(Debug)]
pub struct RuleSet {
    version: u32,
    tag_rules: Vec<(Regex, Tag)>,
    complements: Vec<(Tag, Tag, f64)>,
    tribal_patterns: Vec<Regex>,
}

impl RuleSet {
    /// Compile a rule set from tables
    pub fn compile(version: u32, tag_rules: &[TagRule], complements: &[Complement]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(tag_rules.len());
        for rule in tag_rules {
            compiled.push((compile_pattern(rule.pattern)?, Tag::new(rule.tag)));
        }

        let mut pairs = Vec::with_capacity(complements.len());
        for c in complements {
            if !(c.rarity > 0.0 && c.rarity < 1.0) {
                return Err(GoldfishError::InvalidConfig(format!(
                    "complement {}+{} has rarity {} outside (0, 1)",
                    c.left, c.right, c.rarity
                )));
            }
            pairs.push((Tag::new(c.left), Tag::new(c.right), c.rarity));
        }

        let tribal_patterns = TRIBAL_REFERENCE_PATTERNS
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(RuleSet {
            version,
            tag_rules: compiled,
            complements: pairs,
            tribal_patterns,
        })
    }

    /// The built-in tables at [`RULESET_VERSION`], compiled once per process
    pub fn standard() -> Result<&'static RuleSet> {
        static STANDARD: OnceLock<std::result::Result<RuleSet, String>> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                RuleSet::compile(RULESET_VERSION, TAG_RULES, COMPLEMENTS).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| GoldfishError::InvalidConfig(e.clone()))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Derive the synergy tags of a card
    ///
    /// Self references by name are replaced with `~` before matching, so
    /// "When Mulldrifter enters" and "When this creature enters" tag alike.
    /// Empty text yields only keyword tags.
    pub fn derive_tags(&self, name: &str, oracle_text: &str, keywords: &[String]) -> BTreeSet<Tag> {
        let mut tags: BTreeSet<Tag> = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| Tag::keyword(k))
            .collect();

        let text = normalize_oracle(name, oracle_text);
        if text.is_empty() {
            return tags;
        }

        for (pattern, tag) in &self.tag_rules {
            if pattern.is_match(&text) {
                tags.insert(tag.clone());
            }
        }
        tags
    }

    /// Rarity of the interaction between a tag on one card and a tag on another
    pub fn complement(&self, a: &Tag, b: &Tag) -> Option<f64> {
        self.complements
            .iter()
            .find(|(l, r, _)| (l == a && r == b) || (l == b && r == a))
            .map(|(_, _, rarity)| *rarity)
    }

    /// Curated pairs in table order
    pub fn complements(&self) -> impl Iterator<Item = (&Tag, &Tag, f64)> + '_ {
        self.complements.iter().map(|(l, r, rarity)| (l, r, *rarity))
    }

    /// Does this tag take part in any curated complement?
    pub fn has_complement(&self, tag: &Tag) -> bool {
        self.complements.iter().any(|(l, r, _)| l == tag || r == tag)
    }

    /// Creature types the oracle text refers to ("Other Elf creatures you
    /// control", "Goblin spells you cast"), singularized
    pub fn tribal_references(&self, name: &str, oracle_text: &str) -> BTreeSet<Subtype> {
        let text = normalize_oracle(name, oracle_text);
        let mut refs = BTreeSet::new();
        for pattern in &self.tribal_patterns {
            for caps in pattern.captures_iter(&text) {
                if let Some(word) = caps.get(1) {
                    if !NOT_A_CREATURE_TYPE.contains(&word.as_str()) {
                        refs.insert(Subtype::new(singularize(word.as_str())));
                    }
                }
            }
        }
        refs
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| GoldfishError::InvalidConfig(format!("invalid tag rule regex '{pattern}': {e}")))
}

/// Lowercase, drop parenthesized reminder text and replace self-references
/// with `~`
fn normalize_oracle(name: &str, oracle_text: &str) -> String {
    let mut text = strip_reminder_text(&oracle_text.to_lowercase());
    let name = name.trim().to_lowercase();
    if !name.is_empty() {
        text = text.replace(&name, "~");
        // Legends are often referred to by the part before the comma
        if let Some((short, _)) = name.split_once(", ") {
            text = text.replace(short, "~");
        }
    }
    text
}

fn strip_reminder_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ves") {
        format!("{stem}f")
    } else if word.ends_with("ss") {
        word.to_string()
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> &'static RuleSet {
        RuleSet::standard().unwrap()
    }

    fn tags_of(name: &str, text: &str) -> Vec<String> {
        rules()
            .derive_tags(name, text, &[])
            .into_iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_standard_rules_compile() {
        assert_eq!(rules().version(), RULESET_VERSION);
    }

    #[test]
    fn test_sacrifice_outlet_and_death_payoff() {
        let viscera = tags_of("Viscera Seer", "Sacrifice a creature: Scry 1.");
        assert!(viscera.contains(&"sac-outlet".to_string()));

        let blood_artist = tags_of(
            "Blood Artist",
            "Whenever Blood Artist or another creature dies, target player loses 1 life and you gain 1 life.",
        );
        assert!(blood_artist.contains(&"lifegain".to_string()));

        let grim = tags_of(
            "Grim Haruspex",
            "Whenever another nontoken creature you control dies, draw a card.",
        );
        assert!(grim.contains(&"death-payoff".to_string()));
        assert!(grim.contains(&"card-draw".to_string()));
    }

    #[test]
    fn test_self_reference_is_normalized() {
        let tags = tags_of("Mulldrifter", "When Mulldrifter enters, draw two cards.");
        assert!(tags.contains(&"etb-value".to_string()));
        assert!(tags.contains(&"card-draw".to_string()));
    }

    #[test]
    fn test_reminder_text_is_ignored() {
        assert!(tags_of("Forest", "({T}: Add {G}.)").is_empty());
        let tags = tags_of("Llanowar Elves", "{T}: Add {G}. (Mana abilities don't use the stack.)");
        assert_eq!(tags, vec!["mana-producer".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_keywords_only() {
        let tags = rules().derive_tags("Grizzly Bears", "", &["Trample".to_string()]);
        assert_eq!(tags.len(), 1);
        assert!(tags.contains(&Tag::new("kw:trample")));
    }

    #[test]
    fn test_complement_is_symmetric() {
        let a = Tag::new("sac-outlet");
        let b = Tag::new("death-payoff");
        assert_eq!(rules().complement(&a, &b), Some(0.9));
        assert_eq!(rules().complement(&b, &a), Some(0.9));
        assert_eq!(rules().complement(&a, &a), None);
        assert!(rules().has_complement(&a));
        assert!(!rules().has_complement(&Tag::new("kw:flying")));
    }

    #[test]
    fn test_tribal_references() {
        let refs = rules().tribal_references("Elvish Archdruid", "Other Elf creatures you control get +1/+1.");
        assert!(refs.contains(&Subtype::new("elf")));

        let refs = rules().tribal_references("Elvish Champion", "Other Elves you control get +1/+1.");
        assert!(refs.contains(&Subtype::new("elf")));

        let refs = rules().tribal_references("Goblin Warchief", "Goblin spells you cast cost {1} less to cast.");
        assert!(refs.contains(&Subtype::new("goblin")));

        let refs = rules().tribal_references("Glorious Anthem", "Creatures you control get +1/+1.");
        assert!(refs.is_empty());
        let refs = rules().tribal_references("Intangible Virtue", "Other creature tokens you control get +1/+1.");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_invalid_rarity_rejected() {
        let bad = [Complement { left: "a", right: "b", rarity: 1.5 }];
        assert!(RuleSet::compile(1, TAG_RULES, &bad).is_err());
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("elves"), "elf");
        assert_eq!(singularize("goblins"), "goblin");
        assert_eq!(singularize("zombies"), "zombie");
        assert_eq!(singularize("elf"), "elf");
    }
}
