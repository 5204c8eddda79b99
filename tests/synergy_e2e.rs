//! End-to-end synergy graph tests over the fixture card store

use mtg_goldfish::{
    core::CardId,
    loader::{CardStore, Deck, DeckFormat, DeckLoader},
    synergy::{EdgeKind, GraphBuilder, GraphCache, RuleSet, SynergyGraph, SynergyQuery},
    GoldfishError,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

async fn fixture_store() -> CardStore {
    let rules = RuleSet::standard().unwrap();
    let (store, _, _) = CardStore::load_path(&manifest_dir().join("test_data/cards"), rules)
        .await
        .unwrap();
    store
}

fn fixture_graph(store: &CardStore) -> SynergyGraph {
    GraphBuilder::new(RuleSet::standard().unwrap()).build(store).unwrap()
}

#[tokio::test]
async fn test_one_edge_per_pair() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    assert_eq!(graph.node_count(), store.len());
    assert!(graph.edge_count() > 0);

    let mut seen = HashSet::new();
    for edge in graph.edges() {
        assert!(edge.a < edge.b);
        assert!(edge.weight > 0.0 && edge.weight <= 1.0);
        assert!(seen.insert((edge.a, edge.b)), "duplicate edge {} {}", edge.a, edge.b);
        assert_eq!(graph.edge_between(edge.b, edge.a), Some(edge));
    }
}

#[tokio::test]
async fn test_sacrifice_outlet_pairs_with_death_payoff() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    let query = SynergyQuery::bound(&graph, &store).unwrap();

    let neighbors = query.neighbors(&CardId::new("grim-haruspex"), 0.5).unwrap();
    let top = &neighbors[0];
    assert_eq!(top.card_id, CardId::new("viscera-seer"));
    assert_eq!(top.kind, EdgeKind::ComboPair);
    assert!((top.weight - 0.9).abs() < 1e-9);

    // Listing is heaviest first
    let all = query.neighbors(&CardId::new("grim-haruspex"), 0.0).unwrap();
    assert!(all.windows(2).all(|w| w[0].weight >= w[1].weight));
    assert!(all.len() >= neighbors.len());
}

#[tokio::test]
async fn test_lord_links_to_its_tribe() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    let query = SynergyQuery::new(&graph);

    let neighbors = query.neighbors(&CardId::new("goblin-guide"), 0.0).unwrap();
    let chieftain = neighbors
        .iter()
        .find(|n| n.card_id == CardId::new("goblin-chieftain"))
        .unwrap();
    assert_eq!(chieftain.kind, EdgeKind::TribalMatch);
    assert!((chieftain.weight - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_combo_chains_from_outlet() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    let query = SynergyQuery::new(&graph);

    let chains: Vec<_> = query.combo_chains(&CardId::new("viscera-seer"), 2).unwrap().collect();
    assert!(!chains.is_empty());
    assert_eq!(
        chains[0].cards,
        vec![CardId::new("viscera-seer"), CardId::new("grim-haruspex")]
    );
    assert!((chains[0].strength - 0.9).abs() < 1e-9);
    for chain in &chains {
        assert_eq!(chain.cards[0], CardId::new("viscera-seer"));
        assert!(chain.hops() >= 1 && chain.hops() <= 2);
        let unique: HashSet<_> = chain.cards.iter().collect();
        assert_eq!(unique.len(), chain.cards.len());
    }

    assert_eq!(query.combo_chains(&CardId::new("viscera-seer"), 0).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unknown_card_is_not_found() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    let query = SynergyQuery::new(&graph);

    let err = query.neighbors(&CardId::new("black-lotus"), 0.0).unwrap_err();
    assert!(matches!(err, GoldfishError::NotFound(ref id) if id == "black-lotus"));
    assert!(query.combo_chains(&CardId::new("black-lotus"), 3).is_err());
}

#[tokio::test]
async fn test_suggestions_for_aristocrats() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);
    let list = DeckLoader::load_from_file(&manifest_dir().join("test_decks/aristocrats.dck")).unwrap();
    let deck = Deck::build(&list, &store, &DeckFormat::limited()).unwrap();

    let suggestions = SynergyQuery::bound(&graph, &store).unwrap().rank_for_deck(&deck, 5).unwrap();
    assert!(!suggestions.is_empty() && suggestions.len() <= 5);
    assert_eq!(suggestions[0].card_id, CardId::new("imperious-perfect"));
    assert_eq!(suggestions[0].strongest_with, CardId::new("viscera-seer"));

    let in_deck: HashSet<&CardId> = deck.unique_cards().map(|c| &c.id).collect();
    assert!(suggestions.iter().all(|s| !in_deck.contains(&s.card_id)));
    assert!(suggestions.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_saved_graph_round_trip_and_staleness() {
    let store = fixture_store().await;
    let graph = fixture_graph(&store);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    graph.save(&path).unwrap();
    let loaded = SynergyGraph::load(&path).unwrap();

    assert_eq!(loaded.edges(), graph.edges());
    assert_eq!(loaded.node_count(), graph.node_count());
    assert_eq!(loaded.snapshot(), store.version());
    assert!(SynergyQuery::bound(&loaded, &store).is_ok());

    // A store with one more record is a different snapshot
    let extra = dir.path().join("extra.json");
    std::fs::write(
        &extra,
        r#"[{"id": "gravecrawler", "name": "Gravecrawler", "mana_cost": "{B}", "type_line": "Creature — Zombie"}]"#,
    )
    .unwrap();
    let mut grown = fixture_store().await;
    let (more, _) = CardStore::load_json_file(&extra, RuleSet::standard().unwrap()).unwrap();
    grown.extend(more.iter().map(|c| (**c).clone()));

    let err = SynergyQuery::bound(&loaded, &grown).unwrap_err();
    assert!(matches!(err, GoldfishError::GraphStale { .. }));
}

#[tokio::test]
async fn test_deck_subgraph_keeps_store_snapshot() {
    let store = fixture_store().await;
    let list = DeckLoader::load_from_file(&manifest_dir().join("test_decks/elves.dck")).unwrap();
    let deck = Deck::build(&list, &store, &DeckFormat::limited()).unwrap();

    let sub = GraphBuilder::new(RuleSet::standard().unwrap())
        .build_for_deck(&store, &deck)
        .unwrap();
    assert_eq!(sub.node_count(), deck.unique_cards().count());
    assert!(!sub.contains(&CardId::new("grizzly-bears")), "sideboard is not part of the deck");
    assert!(SynergyQuery::bound(&sub, &store).is_ok());
}

#[tokio::test]
async fn test_cache_serves_until_store_changes() {
    let store = fixture_store().await;
    let rules = RuleSet::standard().unwrap();
    let cache = GraphCache::default();

    let first = cache.get_or_build(&store, rules).unwrap();
    let second = cache.get_or_build(&store, rules).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.edges(), fixture_graph(&store).edges());
}
