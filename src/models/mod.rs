use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub guild_id: String,
    pub config_id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: PollStatus,
    pub roster: Roster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Open,
    Closed,
    Cancelled,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Open => "open",
            PollStatus::Closed => "closed",
            PollStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PollStatus::Closed)
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PollStatus::Open),
            "closed" => Ok(PollStatus::Closed),
            // Older records use the American spelling.
            "cancelled" | "canceled" => Ok(PollStatus::Cancelled),
            other => Err(format!("Unknown poll status: {}", other)),
        }
    }
}

/// One eligible voter on a poll's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub voter: String,
    pub participated: bool,
    /// Set by the legacy flow where abstaining never produced a vote record.
    pub abstained: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("voter {0} is not on the poll roster")]
    UnknownVoter(String),
}

/// The complete set of voters eligible for a poll, in the order they were
/// added, each carrying its participation and abstain flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a voter, or updates the participation flag of one already present
    /// without changing its position.
    pub fn insert(&mut self, voter: impl Into<String>, participated: bool) {
        let voter = voter.into();
        match self.entries.iter_mut().find(|entry| entry.voter == voter) {
            Some(entry) => entry.participated = participated,
            None => self.entries.push(RosterEntry {
                voter,
                participated,
                abstained: false,
            }),
        }
    }

    pub fn mark_abstained(&mut self, voter: &str, abstained: bool) -> Result<(), RosterError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.voter == voter)
            .ok_or_else(|| RosterError::UnknownVoter(voter.to_string()))?;
        entry.abstained = abstained;
        Ok(())
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, voter: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.voter == voter)
    }

    pub fn voters(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.voter.as_str())
    }

    pub fn eligible_count(&self) -> usize {
        self.entries.len()
    }

    pub fn participated_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.participated).count()
    }

    pub fn abstained_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.abstained).count()
    }
}

/// Governance parameters of a poll channel. Percentages are of eligible
/// voters, from 0 to 100, and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollChannel {
    pub id: String,
    pub channel_id: String,
    pub quorum: f64,
    pub vote_threshold: f64,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub poll_id: String,
    pub voter: String,
    pub choices: Vec<String>,
    pub reason: String,
}

impl Vote {
    pub fn has_reason(&self) -> bool {
        !self.reason.trim().is_empty()
    }
}

/// Block range of an on-chain proposal, as reported by the proposal indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub proposal_id: u64,
    pub start_block: u64,
    pub end_block: u64,
}
