//! Run identifiers issued by the tracking backend
//!
//! A [`RunId`] can only be obtained by parsing, so an empty or placeholder
//! identifier never reaches the cleanup step.

use crate::errors::RunIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque token naming one training or staging run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Parse a token; it must be non-empty ASCII alphanumeric
    pub fn parse(token: &str) -> Result<Self, RunIdError> {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RunIdError::Invalid(token.to_string()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = RunIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RunId {
    type Error = RunIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

/// Non-empty, de-duplicated list of run identifiers in capture order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunIds(Vec<RunId>);

impl RunIds {
    /// Returns `None` when `ids` is empty
    pub fn new(ids: impl IntoIterator<Item = RunId>) -> Option<Self> {
        let mut unique: Vec<RunId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            None
        } else {
            Some(Self(unique))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &RunId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunId> {
        self.0.iter()
    }
}
