//! Synergy graph construction
//!
//! Candidate pairs come from posting lists (tag or creature type to the nodes
//! carrying it), never from an all-pairs scan. Evidence for each pair is kept
//! in a `BTreeMap` keyed by the ordered node pair and sorted before it is
//! aggregated, so the same store always yields the same bytes.

use crate::core::{Card, CardId, NodeIndex, Subtype, Tag};
use crate::loader::{CardStore, Deck};
use crate::synergy::graph::{EdgeKind, SynergyEdge, SynergyGraph};
use crate::synergy::rules::RuleSet;
use crate::{GoldfishError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Keyword overlap weight is this times the Jaccard index of the tag sets,
/// which keeps it below every curated combo rarity
pub const OVERLAP_SCALE: f64 = 0.35;

/// Two creatures sharing a creature type
pub const TRIBAL_SHARED_WEIGHT: f64 = 0.4;

/// A card that cares about a creature type, and a creature of that type
pub const TRIBAL_LORD_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Edges lighter than this are dropped
    pub min_edge_weight: f64,
    /// Tags carried by more cards than this are too common to mean anything
    /// and are skipped for overlap edges. Combos and tribal edges are uncapped.
    pub max_overlap_fanout: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            min_edge_weight: 0.05,
            max_overlap_fanout: 500,
        }
    }
}

/// What the builder needs to know about one node
struct NodeFeatures {
    tags: BTreeSet<Tag>,
    /// Subtypes of creature cards only
    creature_types: BTreeSet<Subtype>,
    /// Creature types the text cares about
    references: BTreeSet<Subtype>,
}

/// Candidate pairs plus the tags too common to count as overlap
struct Evidence {
    pairs: BTreeMap<(usize, usize), PairEvidence>,
    common_tags: BTreeSet<Tag>,
}

#[derive(Default)]
struct PairEvidence {
    combos: Vec<(f64, String)>,
    tribal: Vec<(f64, String)>,
    shares_tag: bool,
}

/// Builds a [`SynergyGraph`] from a card store under one rule set
pub struct GraphBuilder<'r> {
    rules: &'r RuleSet,
    config: BuilderConfig,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        GraphBuilder {
            rules,
            config: BuilderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Graph over every card in the store
    pub fn build(&self, store: &CardStore) -> Result<SynergyGraph> {
        self.build_nodes(store, store.iter().cloned().collect())
    }

    /// Graph over a subset of the store, stamped with the store's version
    pub fn build_subset<'a>(&self, store: &CardStore, ids: impl IntoIterator<Item = &'a CardId>) -> Result<SynergyGraph> {
        let mut cards = Vec::new();
        for id in ids {
            let card = store.get(id).ok_or_else(|| GoldfishError::NotFound(id.to_string()))?;
            cards.push(Arc::clone(card));
        }
        self.build_nodes(store, cards)
    }

    /// Graph over the distinct cards of a deck
    pub fn build_for_deck(&self, store: &CardStore, deck: &Deck) -> Result<SynergyGraph> {
        let ids: Vec<CardId> = deck.unique_cards().map(|c| c.id.clone()).collect();
        self.build_subset(store, &ids)
    }

    fn build_nodes(&self, store: &CardStore, mut nodes: Vec<Arc<Card>>) -> Result<SynergyGraph> {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes.dedup_by(|a, b| a.id == b.id);

        let features: Vec<NodeFeatures> = nodes.iter().map(|card| self.features(card)).collect();
        let Evidence { pairs, common_tags } = self.collect_evidence(&features);

        let mut edges = Vec::new();
        for ((a, b), pair) in pairs {
            if let Some((weight, kind, reasons)) = self.strongest(&features[a], &features[b], pair, &common_tags) {
                if weight >= self.config.min_edge_weight {
                    edges.push(SynergyEdge {
                        a: NodeIndex::new(a),
                        b: NodeIndex::new(b),
                        kind,
                        weight,
                        reasons,
                    });
                }
            }
        }

        SynergyGraph::from_parts(nodes, edges, store.version().clone(), self.rules.version())
    }

    fn features(&self, card: &Card) -> NodeFeatures {
        let name = card.name.as_str();
        NodeFeatures {
            tags: self.rules.derive_tags(name, &card.oracle_text, &card.keywords),
            creature_types: if card.is_creature() {
                card.subtypes.iter().cloned().collect()
            } else {
                BTreeSet::new()
            },
            references: self.rules.tribal_references(name, &card.oracle_text),
        }
    }

    fn collect_evidence(&self, features: &[NodeFeatures]) -> Evidence {
        let mut tag_postings: BTreeMap<&Tag, Vec<usize>> = BTreeMap::new();
        let mut type_postings: BTreeMap<&Subtype, Vec<usize>> = BTreeMap::new();
        for (node, f) in features.iter().enumerate() {
            for tag in &f.tags {
                tag_postings.entry(tag).or_default().push(node);
            }
            for subtype in &f.creature_types {
                type_postings.entry(subtype).or_default().push(node);
            }
        }

        let mut evidence: BTreeMap<(usize, usize), PairEvidence> = BTreeMap::new();
        let fanout = self.config.max_overlap_fanout;

        for (left, right, rarity) in self.rules.complements() {
            let (Some(lefts), Some(rights)) = (tag_postings.get(left), tag_postings.get(right)) else {
                continue;
            };
            let reason = format!("{left}+{right}");
            for &x in lefts {
                for &y in rights {
                    if x == y {
                        continue;
                    }
                    let pair = evidence.entry(ordered(x, y)).or_default();
                    // A pair holding both tags on both sides matches once
                    if !pair.combos.iter().any(|(_, r)| *r == reason) {
                        pair.combos.push((rarity, reason.clone()));
                    }
                }
            }
        }

        let mut common_tags = BTreeSet::new();
        for (tag, nodes) in &tag_postings {
            if nodes.len() > fanout {
                common_tags.insert((*tag).clone());
                continue;
            }
            for (i, &x) in nodes.iter().enumerate() {
                for &y in &nodes[i + 1..] {
                    evidence.entry((x, y)).or_default().shares_tag = true;
                }
            }
        }

        for (subtype, nodes) in &type_postings {
            for (i, &x) in nodes.iter().enumerate() {
                for &y in &nodes[i + 1..] {
                    let reason = format!("tribe:{subtype}");
                    evidence.entry((x, y)).or_default().tribal.push((TRIBAL_SHARED_WEIGHT, reason));
                }
            }
        }

        for (x, f) in features.iter().enumerate() {
            for subtype in &f.references {
                let Some(nodes) = type_postings.get(subtype) else {
                    continue;
                };
                for &y in nodes {
                    if y != x {
                        let reason = format!("lord:{subtype}");
                        evidence.entry(ordered(x, y)).or_default().tribal.push((TRIBAL_LORD_WEIGHT, reason));
                    }
                }
            }
        }

        Evidence {
            pairs: evidence,
            common_tags,
        }
    }

    /// Collapse every relation between two nodes into the strongest one
    fn strongest(
        &self,
        a: &NodeFeatures,
        b: &NodeFeatures,
        mut pair: PairEvidence,
        common_tags: &BTreeSet<Tag>,
    ) -> Option<(f64, EdgeKind, Vec<String>)> {
        let mut candidates = Vec::new();

        if !pair.combos.is_empty() {
            pair.combos.sort_by(|(ra, na), (rb, nb)| rb.total_cmp(ra).then_with(|| na.cmp(nb)));
            let miss: f64 = pair.combos.iter().map(|(r, _)| 1.0 - r).product();
            let weight = (1.0 - miss).clamp(f64::MIN_POSITIVE, 1.0);
            let reasons = pair.combos.into_iter().map(|(_, r)| r).collect();
            candidates.push((weight, EdgeKind::ComboPair, reasons));
        } else if pair.shares_tag {
            let shared: Vec<String> = a
                .tags
                .intersection(&b.tags)
                .filter(|t| !common_tags.contains(*t))
                .map(|t| t.to_string())
                .collect();
            let union = a.tags.union(&b.tags).count();
            if !shared.is_empty() {
                let weight = OVERLAP_SCALE * shared.len() as f64 / union as f64;
                candidates.push((weight, EdgeKind::KeywordOverlap, shared));
            }
        }

        if !pair.tribal.is_empty() {
            let weight = pair.tribal.iter().map(|(w, _)| *w).fold(0.0, f64::max);
            let mut reasons: Vec<String> = pair.tribal.into_iter().map(|(_, r)| r).collect();
            reasons.sort();
            reasons.dedup();
            candidates.push((weight, EdgeKind::TribalMatch, reasons));
        }

        candidates
            .into_iter()
            .max_by(|(wa, ka, _), (wb, kb, _)| wa.total_cmp(wb).then_with(|| ka.priority().cmp(&kb.priority())))
    }
}

fn ordered(x: usize, y: usize) -> (usize, usize) {
    if x < y {
        (x, y)
    } else {
        (y, x)
    }
}
