//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Store-assigned recipe identifier. Never reused once deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the textual form used on the wire. Returns `None` for anything
    /// that cannot name a stored recipe.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for RecipeId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub id: RecipeId,
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

impl RecipeRecord {
    /// Case-insensitive tag membership under [`fold_tag`].
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = fold_tag(tag);
        self.tags.iter().any(|candidate| fold_tag(candidate) == needle)
    }
}

/// Comparison key for tags. Every store matches on this key, so they agree on
/// non-ASCII tags regardless of database collation.
///
/// Lowercases per character (no context-sensitive final sigma) and maps `ς`
/// to `σ`, so all three sigma forms compare equal.
pub fn fold_tag(tag: &str) -> String {
    tag.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| if ch == 'ς' { 'σ' } else { ch })
        .collect()
}
