use serde::{Deserialize, Serialize};

/// The current search string. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub term: String,
}

impl SearchState {
    /// Replaces the term as-is; trimming is left to whoever displays it.
    pub fn set_term(&self, value: impl Into<String>) -> SearchState {
        SearchState { term: value.into() }
    }
}
