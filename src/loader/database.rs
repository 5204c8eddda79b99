//! Card record store
//!
//! Holds every ingested card keyed by id, with a secondary index on the
//! normalized name. Each mutation produces a new [`SnapshotVersion`] so graphs
//! built from an older set of records can be detected.

use crate::core::types::normalize_name;
use crate::core::{Card, CardId};
use crate::loader::card::CardRecord;
use crate::synergy::rules::RuleSet;
use crate::{GoldfishError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;

/// BLAKE3 digest of the store contents, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(String);

impl SnapshotVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of ingesting a batch of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    /// Records that could not become cards (no name)
    pub skipped: usize,
    pub files: usize,
}

/// Either a bare array of records or a Scryfall list page (`{"data": [...]}`)
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    List(Vec<CardRecord>),
    Page { data: Vec<CardRecord> },
}

impl RecordFile {
    fn into_records(self) -> Vec<CardRecord> {
        match self {
            RecordFile::List(records) => records,
            RecordFile::Page { data } => data,
        }
    }
}

/// In-memory card store
#[derive(Debug, Clone)]
pub struct CardStore {
    cards: BTreeMap<CardId, Arc<Card>>,
    by_name: FxHashMap<String, CardId>,
    version: SnapshotVersion,
}

impl CardStore {
    /// Create an empty store
    pub fn new() -> Self {
        CardStore {
            cards: BTreeMap::new(),
            by_name: FxHashMap::default(),
            version: fingerprint(&BTreeMap::new()),
        }
    }

    /// Build a store from ready-made cards
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut store = CardStore::new();
        store.extend(cards);
        store
    }

    /// Insert or replace a single card
    pub fn insert(&mut self, card: Card) {
        self.extend(std::iter::once(card));
    }

    /// Insert or replace many cards, recomputing the version once
    pub fn extend(&mut self, cards: impl IntoIterator<Item = Card>) {
        for card in cards {
            let key = card.name.normalized();
            // A renamed card must not keep its old name key
            if let Some(old) = self.cards.get(&card.id) {
                let old_key = old.name.normalized();
                if self.by_name.get(&old_key) == Some(&card.id) {
                    self.by_name.remove(&old_key);
                }
            }
            self.by_name.entry(key).or_insert_with(|| card.id.clone());
            self.cards.insert(card.id.clone(), Arc::new(card));
        }
        self.version = fingerprint(&self.cards);
    }

    /// Ingest raw records, skipping those without a name
    pub fn ingest(&mut self, records: Vec<CardRecord>, rules: &RuleSet) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut cards = Vec::with_capacity(records.len());
        for record in records {
            match record.into_card(rules) {
                Ok(card) => cards.push(card),
                Err(_) => summary.skipped += 1,
            }
        }
        summary.loaded = cards.len();
        self.extend(cards);
        summary
    }

    /// Parse a JSON document of records
    pub fn ingest_json(&mut self, json: &str, rules: &RuleSet) -> Result<LoadSummary> {
        let file: RecordFile = serde_json::from_str(json)?;
        let mut summary = self.ingest(file.into_records(), rules);
        summary.files = 1;
        Ok(summary)
    }

    /// Load a single JSON file of records
    pub fn load_json_file(path: &Path, rules: &RuleSet) -> Result<(Self, LoadSummary)> {
        let content = std::fs::read_to_string(path)?;
        let mut store = CardStore::new();
        let summary = store.ingest_json(&content, rules)?;
        Ok((store, summary))
    }

    /// Load a JSON file, or every `.json` file under a directory
    ///
    /// Directory walks run on a blocking thread (jwalk is rayon backed). Files
    /// are read concurrently but ingested in sorted path order, so a later
    /// file replaces records with the same id from an earlier one.
    pub async fn load_path(path: &Path, rules: &RuleSet) -> Result<(Self, LoadSummary, std::time::Duration)> {
        let start = Instant::now();

        if !path.exists() {
            return Err(GoldfishError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Card data not found: {path:?}"),
            )));
        }

        let paths = if path.is_dir() {
            let root = path.to_path_buf();
            tokio::task::spawn_blocking(move || json_files_under(&root)).await??
        } else {
            vec![path.to_path_buf()]
        };

        let mut tasks = Vec::with_capacity(paths.len());
        for file in paths {
            tasks.push((
                file.clone(),
                tokio::spawn(async move { tokio::fs::read_to_string(&file).await }),
            ));
        }

        let mut store = CardStore::new();
        let mut summary = LoadSummary::default();
        for (file, task) in tasks {
            let content = task.await??;
            let parsed: RecordFile = serde_json::from_str(&content).map_err(|e| {
                GoldfishError::InvalidCardFormat(format!(
                    "Failed to parse card file '{}': {e}",
                    file.display()
                ))
            })?;
            let part = store.ingest(parsed.into_records(), rules);
            summary.loaded += part.loaded;
            summary.skipped += part.skipped;
            summary.files += 1;
        }

        Ok((store, summary, start.elapsed()))
    }

    pub fn version(&self) -> &SnapshotVersion {
        &self.version
    }

    pub fn get(&self, id: &CardId) -> Option<&Arc<Card>> {
        self.cards.get(id)
    }

    /// Look up a card by name (case and diacritic insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Card>> {
        self.by_name.get(&normalize_name(name)).and_then(|id| self.cards.get(id))
    }

    /// Look up by id first, then by name
    pub fn resolve(&self, key: &str) -> Option<&Arc<Card>> {
        self.cards
            .get(&CardId::new(key.trim()))
            .or_else(|| self.get_by_name(key))
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.cards.contains_key(id)
    }

    /// Cards in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Card>> {
        self.cards.values()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for CardStore {
    fn default() -> Self {
        Self::new()
    }
}

fn json_files_under(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in jwalk::WalkDir::new(root).skip_hidden(false) {
        let entry = entry.map_err(|e| GoldfishError::IoError(std::io::Error::other(e.to_string())))?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json") {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Digest of the id-ordered card serialization
fn fingerprint(cards: &BTreeMap<CardId, Arc<Card>>) -> SnapshotVersion {
    let mut hasher = blake3::Hasher::new();
    for card in cards.values() {
        if serde_json::to_writer(&mut hasher, card.as_ref()).is_err() {
            hasher.update(card.id.as_str().as_bytes());
        }
        hasher.update(b"\n");
    }
    SnapshotVersion(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardType;

    fn rules() -> &'static RuleSet {
        RuleSet::standard().unwrap()
    }

    fn land(id: &str, name: &str) -> Card {
        let mut card = Card::new(CardId::new(id), name);
        card.types.push(CardType::Land);
        card
    }

    #[test]
    fn test_empty_store() {
        let store = CardStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(store.get_by_name("Lightning Bolt").is_none());
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let store = CardStore::from_cards(vec![land("vault", "Lim-Dûl's Vault")]);
        assert!(store.contains(&CardId::new("vault")));
        assert!(store.get_by_name("lim-dul's vault").is_some());
        assert!(store.get_by_name("LIM-DÛL'S   VAULT").is_some());
        assert_eq!(store.resolve("vault").unwrap().name.as_str(), "Lim-Dûl's Vault");
        assert!(store.resolve("nothing").is_none());
    }

    #[test]
    fn test_version_changes_on_insert() {
        let mut store = CardStore::from_cards(vec![land("a", "Alpha")]);
        let before = store.version().clone();

        store.insert(land("b", "Beta"));
        assert_ne!(&before, store.version());

        let same = CardStore::from_cards(vec![land("b", "Beta"), land("a", "Alpha")]);
        assert_eq!(same.version(), store.version());
    }

    #[test]
    fn test_replace_renamed_card() {
        let mut store = CardStore::from_cards(vec![land("a", "Alpha")]);
        store.insert(land("a", "Aleph"));
        assert_eq!(store.len(), 1);
        assert!(store.get_by_name("alpha").is_none());
        assert!(store.get_by_name("aleph").is_some());
    }

    #[test]
    fn test_ingest_json_list_and_page() {
        let mut store = CardStore::new();
        let summary = store
            .ingest_json(r#"[{"name": "Forest", "type_line": "Basic Land — Forest"}, {"id": "nameless"}]"#, rules())
            .unwrap();
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 1);

        let summary = store
            .ingest_json(r#"{"object": "list", "data": [{"name": "Island", "type_line": "Basic Land — Island"}]}"#, rules())
            .unwrap();
        assert_eq!(summary.loaded, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"[{"id": "x", "name": "Old Name"}]"#).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested").join("b.json"),
            r#"[{"id": "x", "name": "New Name"}, {"name": "Forest"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (store, summary, _) = CardStore::load_path(dir.path(), rules()).await.unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.loaded, 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&CardId::new("x")).unwrap().name.as_str(), "New Name");
    }

    #[tokio::test]
    async fn test_load_missing_path() {
        let err = CardStore::load_path(Path::new("/definitely/not/here"), rules()).await.unwrap_err();
        assert!(matches!(err, GoldfishError::IoError(_)));
    }
}
