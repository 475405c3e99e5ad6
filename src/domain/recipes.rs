//! Recipe input rules shared by creation and update.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::domain::error::DomainError;

/// Caller-supplied recipe content. Identity and publication time are never
/// taken from here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecipeInput {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl RecipeInput {
    /// Trims the name and rejects a blank one. List entries are kept as given.
    pub fn validate(self) -> Result<Self, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("recipe `name` must not be empty"));
        }

        Ok(Self { name, ..self })
    }
}

/// Creation timestamp at the precision the store keeps (microseconds), so a
/// record returned from creation equals the one later read back.
pub fn publication_time(now: OffsetDateTime) -> Result<OffsetDateTime, DomainError> {
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.replace_nanosecond(micros)
        .map_err(|err| DomainError::invariant(format!("publication timestamp: {err}")))
}
