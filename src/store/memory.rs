//! In-memory collaborators for tests.

use super::{
    ChannelConfigStore, IdentityResolver, MetadataError, PollStore, ProposalMetadataService,
    StoreError, VoteStore,
};
use crate::models::{Poll, PollChannel, PollStatus, ProposalMetadata, Roster, Vote};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    pub polls: Vec<Poll>,
    pub votes: Vec<Vote>,
    pub channels: Vec<PollChannel>,
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        Ok(self.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn polls_for_channel(&self, channel_id: &str) -> Result<Vec<Poll>, StoreError> {
        let config_ids: Vec<&str> = self
            .channels
            .iter()
            .filter(|c| c.channel_id == channel_id)
            .map(|c| c.id.as_str())
            .collect();
        let mut polls: Vec<Poll> = self
            .polls
            .iter()
            .filter(|p| config_ids.contains(&p.config_id.as_str()))
            .cloned()
            .collect();
        polls.sort_by_key(|p| p.created_at);
        Ok(polls)
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes.iter().filter(|v| v.poll_id == poll_id).cloned().collect())
    }
}

#[async_trait]
impl ChannelConfigStore for MemoryStore {
    async fn channel_config(&self, config_id: &str) -> Result<Option<PollChannel>, StoreError> {
        Ok(self.channels.iter().find(|c| c.id == config_id).cloned())
    }

    async fn channel_config_for_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<PollChannel>, StoreError> {
        Ok(self.channels.iter().find(|c| c.channel_id == channel_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryIdentities {
    pub names: HashMap<String, String>,
    pub fail: bool,
}

impl MemoryIdentities {
    pub fn with_name(mut self, voter: &str, name: &str) -> Self {
        self.names.insert(voter.to_string(), name.to_string());
        self
    }
}

#[async_trait]
impl IdentityResolver for MemoryIdentities {
    async fn display_name(&self, voter: &str) -> Result<Option<String>, StoreError> {
        if self.fail {
            return Err(StoreError::Corrupt {
                id: voter.to_string(),
                field: "name_history",
                reason: "unreadable".to_string(),
            });
        }
        Ok(self.names.get(voter).cloned())
    }
}

/// Proposal service answering from a fixed map; unknown ids are reported as
/// an outage unless listed in `missing`.
#[derive(Default)]
pub struct MemoryProposals {
    pub proposals: HashMap<u64, ProposalMetadata>,
    pub missing: Vec<u64>,
}

impl MemoryProposals {
    pub fn with_proposal(mut self, proposal_id: u64, start_block: u64, end_block: u64) -> Self {
        self.proposals.insert(
            proposal_id,
            ProposalMetadata { proposal_id, start_block, end_block },
        );
        self
    }
}

#[async_trait]
impl ProposalMetadataService for MemoryProposals {
    async fn proposal(&self, proposal_id: u64) -> Result<ProposalMetadata, MetadataError> {
        if self.missing.contains(&proposal_id) {
            return Err(MetadataError::NotFound(proposal_id));
        }
        self.proposals
            .get(&proposal_id)
            .copied()
            .ok_or_else(|| MetadataError::Unavailable("connection refused".to_string()))
    }
}

/// Closed poll with five eligible voters: alice, bob and dave voted, carol
/// did not, frank abstained through the legacy roster flag.
pub fn sample_poll(id: &str, title: &str) -> Poll {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut roster = Roster::new();
    roster.insert("alice", true);
    roster.insert("bob", true);
    roster.insert("carol", false);
    roster.insert("dave", true);
    roster.insert("frank", true);
    roster.mark_abstained("frank", true).unwrap();

    Poll {
        id: id.to_string(),
        guild_id: "guild-1".to_string(),
        config_id: "cfg-1".to_string(),
        title: title.to_string(),
        description: "Should Nouncil support this proposal?".to_string(),
        created_at,
        ends_at: created_at + Duration::days(3),
        status: PollStatus::Closed,
        roster,
    }
}

pub fn sample_channel(anonymous: bool) -> PollChannel {
    PollChannel {
        id: "cfg-1".to_string(),
        channel_id: "chan-1".to_string(),
        quorum: 50.0,
        vote_threshold: 20.0,
        anonymous,
    }
}

pub fn vote(poll_id: &str, voter: &str, choices: &[&str], reason: &str) -> Vote {
    Vote {
        poll_id: poll_id.to_string(),
        voter: voter.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        reason: reason.to_string(),
    }
}
