use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A vote choice after folding both historical vocabularies together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    For,
    Against,
    Abstain,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("unrecognized choice: {0:?}")]
    Unrecognized(String),
}

impl Choice {
    /// Maps a raw token to its canonical choice, ignoring case.
    ///
    /// "yes" and "no" come from the manually created polls that predate
    /// the for/against wording.
    pub fn normalize(raw: &str) -> Result<Self, ChoiceError> {
        match raw.trim().to_lowercase().as_str() {
            "for" | "yes" => Ok(Choice::For),
            "against" | "no" => Ok(Choice::Against),
            "abstain" => Ok(Choice::Abstain),
            _ => Err(ChoiceError::Unrecognized(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::For => "for",
            Choice::Against => "against",
            Choice::Abstain => "abstain",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Choice::normalize(s)
    }
}
