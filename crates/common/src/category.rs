//! Department labels for the integer category codes stored in the index.

use crate::error::GiftGuideError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used for codes that have no entry in the table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Static mapping from category code to department name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    labels: BTreeMap<i64, String>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::from_pairs([
            (0, "Darčeky"),
            (1, "Drogéria"),
            (2, "Hry a hračky"),
            (3, "Knihy beletria"),
            (4, "Školské potreby"),
        ])
    }
}

impl CategoryTable {
    /// Build a table from `(code, label)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        }
    }

    /// Parse a table from `code:label` entries separated by commas
    ///
    /// e.g. `0:Darčeky,1:Drogéria`. Codes must be integers, labels non-empty and
    /// each code may appear only once.
    pub fn parse(labels: &str) -> Result<Self, GiftGuideError> {
        let mut table = BTreeMap::new();

        for entry in labels.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (code, label) = entry.split_once(':').ok_or_else(|| {
                GiftGuideError::config(format!("Category entry '{}' is not code:label", entry))
            })?;

            let code: i64 = code.trim().parse().map_err(|_| {
                GiftGuideError::config(format!("Category code '{}' is not an integer", code.trim()))
            })?;

            let label = label.trim();
            if label.is_empty() {
                return Err(GiftGuideError::config(format!(
                    "Category {} has an empty label",
                    code
                )));
            }

            if table.insert(code, label.to_string()).is_some() {
                return Err(GiftGuideError::config(format!(
                    "Category code {} is defined twice",
                    code
                )));
            }
        }

        if table.is_empty() {
            return Err(GiftGuideError::config("Category table cannot be empty"));
        }

        Ok(Self { labels: table })
    }

    /// Resolve a code to its label, falling back to [`UNKNOWN_LABEL`]
    pub fn label(&self, code: Option<i64>) -> &str {
        code.and_then(|c| self.labels.get(&c))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Number of known codes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
