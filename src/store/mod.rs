//! Read-only collaborators the report pipeline depends on.

use crate::models::{Poll, PollChannel, ProposalMetadata, Vote};
use async_trait::async_trait;
use log::warn;

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt {field} on record {id}: {reason}")]
    Corrupt {
        id: String,
        field: &'static str,
        reason: String,
    },
}

#[async_trait]
pub trait PollStore: Send + Sync {
    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError>;

    /// Polls whose config belongs to the Discord channel, oldest first.
    async fn polls_for_channel(&self, channel_id: &str) -> Result<Vec<Poll>, StoreError>;
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError>;
}

#[async_trait]
pub trait ChannelConfigStore: Send + Sync {
    async fn channel_config(&self, config_id: &str) -> Result<Option<PollChannel>, StoreError>;

    async fn channel_config_for_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<PollChannel>, StoreError>;
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Current display name of a voter, `None` when the voter is unknown.
    async fn display_name(&self, voter: &str) -> Result<Option<String>, StoreError>;
}

/// Display name for a voter, falling back to an empty string. Names are
/// cosmetic, so a failed lookup never fails the report.
pub async fn resolve_display_name(resolver: &dyn IdentityResolver, voter: &str) -> String {
    match resolver.display_name(voter).await {
        Ok(Some(name)) => name,
        Ok(None) => String::new(),
        Err(e) => {
            warn!("Failed to resolve display name for {}: {}", voter, e);
            String::new()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("proposal {0} not found")]
    NotFound(u64),
    #[error("proposal service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ProposalMetadataService: Send + Sync {
    async fn proposal(&self, proposal_id: u64) -> Result<ProposalMetadata, MetadataError>;
}
