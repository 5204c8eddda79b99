//! Read-only queries over a built synergy graph

use crate::core::{CardId, CardName, NodeIndex};
use crate::loader::{CardStore, Deck};
use crate::synergy::graph::{EdgeKind, SynergyGraph};
use crate::{GoldfishError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A card adjacent to the queried one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub card_id: CardId,
    pub name: CardName,
    pub kind: EdgeKind,
    pub weight: f64,
    pub reasons: Vec<String>,
}

/// A card outside the deck that connects to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub card_id: CardId,
    pub name: CardName,
    /// Summed edge weight to the deck's cards
    pub score: f64,
    /// Deck cards it has an edge to
    pub connections: usize,
    /// Deck card behind the heaviest of those edges
    pub strongest_with: CardId,
}

/// One path of combo edges, starting at the queried card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboChain {
    pub cards: Vec<CardId>,
    /// Product of the edge weights along the path
    pub strength: f64,
}

impl ComboChain {
    pub fn hops(&self) -> usize {
        self.cards.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub cards: usize,
    pub edges: usize,
    pub combo_edges: usize,
    pub tribal_edges: usize,
    pub overlap_edges: usize,
    pub average_degree: f64,
    pub density: f64,
    pub snapshot: String,
    pub ruleset_version: u32,
}

/// Query handle over one graph
#[derive(Debug, Clone, Copy)]
pub struct SynergyQuery<'g> {
    graph: &'g SynergyGraph,
}

impl<'g> SynergyQuery<'g> {
    /// Query a graph without checking it against a store
    pub fn new(graph: &'g SynergyGraph) -> Self {
        SynergyQuery { graph }
    }

    /// Query a graph on behalf of `store`; fails with `GraphStale` if the
    /// graph was built from a different snapshot
    pub fn bound(graph: &'g SynergyGraph, store: &CardStore) -> Result<Self> {
        if graph.snapshot() != store.version() {
            return Err(GoldfishError::GraphStale {
                built: graph.snapshot().short().to_string(),
                current: store.version().short().to_string(),
            });
        }
        Ok(SynergyQuery { graph })
    }

    pub fn graph(&self) -> &'g SynergyGraph {
        self.graph
    }

    fn node(&self, card: &CardId) -> Result<NodeIndex> {
        self.graph
            .node_of(card)
            .ok_or_else(|| GoldfishError::NotFound(card.to_string()))
    }

    /// Neighbors with weight at least `min_weight`, heaviest first, then by
    /// name and id
    pub fn neighbors(&self, card: &CardId, min_weight: f64) -> Result<Vec<Neighbor>> {
        let node = self.node(card)?;
        let mut found: Vec<Neighbor> = self
            .graph
            .edges_of(node)
            .filter(|e| e.weight >= min_weight)
            .map(|e| {
                let other = self.graph.card(e.other(node));
                Neighbor {
                    card_id: other.id.clone(),
                    name: other.name.clone(),
                    kind: e.kind,
                    weight: e.weight,
                    reasons: e.reasons.clone(),
                }
            })
            .collect();
        found.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.card_id.cmp(&b.card_id))
        });
        Ok(found)
    }

    /// Neighbors at or above `threshold` regardless of kind
    pub fn combo_pieces(&self, card: &CardId, threshold: f64) -> Result<Vec<Neighbor>> {
        self.neighbors(card, threshold)
    }

    /// Lazy depth-first walk of acyclic combo paths of 1 to `max_depth` hops
    pub fn combo_chains(&self, card: &CardId, max_depth: usize) -> Result<ComboChains<'g>> {
        let start = self.node(card)?;
        let stack = if max_depth == 0 {
            Vec::new()
        } else {
            vec![combo_successors(self.graph, start)]
        };
        Ok(ComboChains {
            graph: self.graph,
            max_depth,
            path: vec![start],
            weights: Vec::new(),
            stack,
        })
    }

    /// Cards outside the deck ranked by summed synergy weight to it
    ///
    /// Deck cards missing from the graph contribute nothing. A deck with no
    /// card in the graph at all is `NotFound`.
    pub fn rank_for_deck(&self, deck: &Deck, top_n: usize) -> Result<Vec<Suggestion>> {
        let in_deck: FxHashSet<NodeIndex> = deck.unique_cards().filter_map(|c| self.graph.node_of(&c.id)).collect();
        if in_deck.is_empty() {
            let first = deck.unique_cards().next().map(|c| c.id.to_string()).unwrap_or_default();
            return Err(GoldfishError::NotFound(first));
        }
        let mut deck_nodes: Vec<NodeIndex> = in_deck.iter().copied().collect();
        deck_nodes.sort_unstable();

        // candidate -> (score, connections, best weight, best partner)
        let mut scores: FxHashMap<NodeIndex, (f64, usize, f64, NodeIndex)> = FxHashMap::default();
        for &node in &deck_nodes {
            for edge in self.graph.edges_of(node) {
                let other = edge.other(node);
                if in_deck.contains(&other) {
                    continue;
                }
                let entry = scores.entry(other).or_insert((0.0, 0, 0.0, node));
                entry.0 += edge.weight;
                entry.1 += 1;
                if edge.weight > entry.2 {
                    entry.2 = edge.weight;
                    entry.3 = node;
                }
            }
        }

        let mut ranked: Vec<Suggestion> = scores
            .into_iter()
            .map(|(node, (score, connections, _, partner))| {
                let card = self.graph.card(node);
                Suggestion {
                    card_id: card.id.clone(),
                    name: card.name.clone(),
                    score,
                    connections,
                    strongest_with: self.graph.card(partner).id.clone(),
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.card_id.cmp(&b.card_id))
        });
        ranked.truncate(top_n);
        Ok(ranked)
    }

    pub fn stats(&self) -> GraphStats {
        let count = |kind: EdgeKind| self.graph.edges().iter().filter(|e| e.kind == kind).count();
        let cards = self.graph.node_count();
        let edges = self.graph.edge_count();
        GraphStats {
            cards,
            edges,
            combo_edges: count(EdgeKind::ComboPair),
            tribal_edges: count(EdgeKind::TribalMatch),
            overlap_edges: count(EdgeKind::KeywordOverlap),
            average_degree: if cards == 0 { 0.0 } else { 2.0 * edges as f64 / cards as f64 },
            density: if cards < 2 {
                0.0
            } else {
                edges as f64 / (cards as f64 * (cards - 1) as f64 / 2.0)
            },
            snapshot: self.graph.snapshot().to_string(),
            ruleset_version: self.graph.ruleset_version(),
        }
    }
}

/// Combo-edge neighbors of `node`, heaviest first, ties by name then id
fn combo_successors(graph: &SynergyGraph, node: NodeIndex) -> std::vec::IntoIter<(NodeIndex, f64)> {
    let mut next: Vec<(NodeIndex, f64)> = graph
        .edges_of(node)
        .filter(|e| e.kind == EdgeKind::ComboPair)
        .map(|e| (e.other(node), e.weight))
        .collect();
    next.sort_by(|(na, wa), (nb, wb)| match wb.total_cmp(wa) {
        Ordering::Equal => {
            let (a, b) = (graph.card(*na), graph.card(*nb));
            a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
        }
        other => other,
    });
    next.into_iter()
}

/// Iterator returned by [`SynergyQuery::combo_chains`]
///
/// `stack` holds one successor iterator per node on `path`.
pub struct ComboChains<'g> {
    graph: &'g SynergyGraph,
    max_depth: usize,
    path: Vec<NodeIndex>,
    weights: Vec<f64>,
    stack: Vec<std::vec::IntoIter<(NodeIndex, f64)>>,
}

impl Iterator for ComboChains<'_> {
    type Item = ComboChain;

    fn next(&mut self) -> Option<ComboChain> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some((next, weight)) = frame.next() else {
                self.stack.pop();
                self.path.pop();
                self.weights.pop();
                continue;
            };
            if self.path.contains(&next) {
                continue;
            }

            self.path.push(next);
            self.weights.push(weight);
            let successors = if self.path.len() <= self.max_depth {
                combo_successors(self.graph, next)
            } else {
                Vec::new().into_iter()
            };
            self.stack.push(successors);

            return Some(ComboChain {
                cards: self.path.iter().map(|n| self.graph.card(*n).id.clone()).collect(),
                strength: self.weights.iter().product(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardType, Subtype};
    use crate::loader::{DeckEntry, DeckFormat, DeckList};
    use crate::synergy::{GraphBuilder, RuleSet};

    fn creature(id: &str, name: &str, subtypes: &[&str], text: &str) -> Card {
        let mut card = Card::new(CardId::new(id), name);
        card.types.push(CardType::Creature);
        card.subtypes.extend(subtypes.iter().map(|s| Subtype::new(*s)));
        card.oracle_text = text.to_string();
        card
    }

    fn aristocrats() -> CardStore {
        CardStore::from_cards(vec![
            creature("seer", "Viscera Seer", &["vampire"], "Sacrifice a creature: Scry 1."),
            creature(
                "haruspex",
                "Grim Haruspex",
                &["human"],
                "Whenever another nontoken creature you control dies, draw a card.",
            ),
            creature(
                "pawn",
                "Pawn of Ulamog",
                &["vampire"],
                "Whenever another nontoken creature you control dies, you may create a 0/1 colorless Eldrazi Spawn creature token.",
            ),
            creature("bears", "Grizzly Bears", &["bear"], ""),
        ])
    }

    fn graph(store: &CardStore) -> SynergyGraph {
        GraphBuilder::new(RuleSet::standard().unwrap()).build(store).unwrap()
    }

    #[test]
    fn test_unknown_card_is_not_found() {
        let store = aristocrats();
        let graph = graph(&store);
        let query = SynergyQuery::new(&graph);
        let missing = CardId::new("black-lotus");
        assert!(matches!(query.neighbors(&missing, 0.0), Err(GoldfishError::NotFound(_))));
        assert!(query.combo_chains(&missing, 2).is_err());

        let bears = CardId::new("bears");
        assert!(query.neighbors(&bears, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_neighbors_sorted_by_weight() {
        let store = aristocrats();
        let graph = graph(&store);
        let query = SynergyQuery::new(&graph);
        let found = query.neighbors(&CardId::new("seer"), 0.0).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].weight >= found[1].weight);
        // Pawn adds token-maker + sac-outlet on top of the death trigger
        assert_eq!(found[0].card_id, CardId::new("pawn"));

        let heavy = query.neighbors(&CardId::new("seer"), 0.95).unwrap();
        assert_eq!(heavy.len(), 1);
        assert_eq!(query.combo_pieces(&CardId::new("seer"), 0.95).unwrap(), heavy);
    }

    #[test]
    fn test_combo_chains_are_acyclic_and_bounded() {
        let store = aristocrats();
        let graph = graph(&store);
        let query = SynergyQuery::new(&graph);

        let chains: Vec<ComboChain> = query.combo_chains(&CardId::new("haruspex"), 3).unwrap().collect();
        assert!(!chains.is_empty());
        for chain in &chains {
            assert!(chain.hops() >= 1 && chain.hops() <= 3);
            let unique: FxHashSet<_> = chain.cards.iter().collect();
            assert_eq!(unique.len(), chain.cards.len());
            assert_eq!(chain.cards[0], CardId::new("haruspex"));
        }
        let first = &chains[0];
        assert_eq!(first.cards, vec![CardId::new("haruspex"), CardId::new("seer")]);
        assert!(chains
            .iter()
            .any(|c| c.cards == vec![CardId::new("haruspex"), CardId::new("seer"), CardId::new("pawn")]));

        assert_eq!(query.combo_chains(&CardId::new("haruspex"), 0).unwrap().count(), 0);
        assert!(query.combo_chains(&CardId::new("haruspex"), 1).unwrap().all(|c| c.hops() == 1));
    }

    #[test]
    fn test_rank_for_deck() {
        let mut cards = vec![
            creature("seer", "Viscera Seer", &["vampire"], "Sacrifice a creature: Scry 1."),
            creature(
                "haruspex",
                "Grim Haruspex",
                &["human"],
                "Whenever another nontoken creature you control dies, draw a card.",
            ),
            creature(
                "pawn",
                "Pawn of Ulamog",
                &["vampire"],
                "Whenever another nontoken creature you control dies, you may create a 0/1 colorless Eldrazi Spawn creature token.",
            ),
        ];
        let mut swamp = Card::new(CardId::new("swamp"), "Swamp");
        swamp.types.push(CardType::Land);
        swamp.supertypes.push("basic".to_string());
        cards.push(swamp);
        let store = CardStore::from_cards(cards);
        let graph = graph(&store);

        let list = DeckList::from_entries(vec![DeckEntry::new("swamp", 36), DeckEntry::new("seer", 4)]);
        let deck = Deck::build(&list, &store, &DeckFormat::limited()).unwrap();
        let ranked = SynergyQuery::bound(&graph, &store).unwrap().rank_for_deck(&deck, 5).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].card_id, CardId::new("pawn"));
        assert_eq!(ranked[0].strongest_with, CardId::new("seer"));
        assert_eq!(ranked[1].connections, 1);
        assert!(ranked.iter().all(|s| s.card_id != CardId::new("seer")));

        // None of the deck's cards are in this graph
        let others = GraphBuilder::new(RuleSet::standard().unwrap())
            .build_subset(&store, &[CardId::new("haruspex"), CardId::new("pawn")])
            .unwrap();
        let err = SynergyQuery::new(&others).rank_for_deck(&deck, 5).unwrap_err();
        assert!(matches!(err, GoldfishError::NotFound(_)));
    }

    #[test]
    fn test_stale_graph_is_rejected() {
        let mut store = aristocrats();
        let graph = graph(&store);
        assert!(SynergyQuery::bound(&graph, &store).is_ok());

        store.insert(creature("elf", "Llanowar Elves", &["elf"], "{T}: Add {G}."));
        assert!(matches!(
            SynergyQuery::bound(&graph, &store),
            Err(GoldfishError::GraphStale { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let store = aristocrats();
        let graph = graph(&store);
        let stats = SynergyQuery::new(&graph).stats();
        assert_eq!(stats.cards, 4);
        assert_eq!(stats.edges, stats.combo_edges + stats.tribal_edges + stats.overlap_edges);
        assert!((stats.average_degree - 2.0 * stats.edges as f64 / 4.0).abs() < 1e-12);
    }
}
