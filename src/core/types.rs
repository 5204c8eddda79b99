//! Strongly-typed wrappers for card concepts
//!
//! Instead of passing bare Strings around for names, subtypes and synergy
//! tags, we wrap them in distinct types that cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Card subtype (creature type, artifact type, land type, etc.)
///
/// Stored lowercased so "Elf" on a type line and "elves" in oracle text can be
/// compared after singularization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subtype(String);

impl Subtype {
    pub fn new(s: impl Into<String>) -> Self {
        Subtype(s.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Subtype {
    fn from(s: &str) -> Self {
        Subtype::new(s)
    }
}

/// Canonical synergy tag derived from oracle text (e.g. "sac-outlet")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(s: impl Into<String>) -> Self {
        Tag(s.into())
    }

    /// Tag for a printed keyword ability, e.g. "kw:flying"
    pub fn keyword(keyword: &str) -> Self {
        Tag(format!("kw:{}", keyword.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_keyword(&self) -> bool {
        self.0.starts_with("kw:")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Tag(s.to_string())
    }
}

/// Card name (distinct from other string types)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardName(String);

impl CardName {
    pub fn new(s: impl Into<String>) -> Self {
        CardName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup key: ASCII-folded, lowercased, whitespace collapsed
    ///
    /// "Lim-Dûl's Vault" and "lim-dul's vault" share a key.
    pub fn normalized(&self) -> String {
        normalize_name(&self.0)
    }
}

impl fmt::Display for CardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CardName {
    fn from(s: String) -> Self {
        CardName(s)
    }
}

impl From<&str> for CardName {
    fn from(s: &str) -> Self {
        CardName(s.to_string())
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    deunicode::deunicode(name)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_lowercases() {
        let subtype = Subtype::new("Goblin");
        assert_eq!(subtype.as_str(), "goblin");
        assert_eq!(subtype.to_string(), "goblin");
    }

    #[test]
    fn test_keyword_tag() {
        let tag = Tag::keyword(" Flying ");
        assert_eq!(tag.as_str(), "kw:flying");
        assert!(tag.is_keyword());
        assert!(!Tag::new("sac-outlet").is_keyword());
    }

    #[test]
    fn test_card_name_normalization() {
        let name = CardName::new("Lim-Dûl's   Vault");
        assert_eq!(name.normalized(), "lim-dul's vault");
        assert_eq!(name.as_str(), "Lim-Dûl's   Vault");
    }
}
