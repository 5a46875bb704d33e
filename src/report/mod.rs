pub mod summary;

use crate::error::ReportError;
use crate::models::{Poll, PollChannel, PollStatus, Vote};
use crate::store::{
    ChannelConfigStore, IdentityResolver, PollStore, ProposalMetadataService, VoteStore,
    resolve_display_name,
};
use crate::voting::{
    FeedEntry, PollOutcome, ProposalClass, VoteCounts, build_public_feed, classify_proposal,
    compute_tally, count_eligibility, evaluate_outcome, extract_proposal_id,
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use summary::{ANONYMOUS_NAME, NamedVote, format_vote_reasons};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollReport {
    pub title: String,
    pub description: String,
    /// Unix milliseconds.
    pub time_start: i64,
    pub time_end: i64,
    pub status: PollStatus,
    pub reference_data: ReferenceData,
    pub public_vote_feed: Vec<FeedEntry>,
    pub vote_result: VoteResult,
    /// Only present once the poll is closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_participation: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_reasons_formatted: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub nouns_prop_id: String,
    pub nouns_prop_start: u64,
    pub nouns_prop_end: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteResult {
    pub counts: VoteCounts,
    pub outcome: PollOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub voter_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPollStats {
    pub proposal_id: u64,
    pub users_eligible: usize,
    pub users_participated: usize,
    pub for_votes: u32,
    pub against_votes: u32,
    pub abstain_votes: u32,
}

/// How often a Nouncil member voted on the channel's polls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NouncillorStats {
    pub voter_id: String,
    pub display_name: String,
    pub polls_eligible: usize,
    pub polls_participated: usize,
    /// From 0 to 1.
    pub participation_rate: f64,
}

/// Builds poll reports from the stores. Every call re-reads its inputs, so
/// one assembler can serve concurrent requests.
pub struct ReportAssembler {
    polls: Arc<dyn PollStore>,
    votes: Arc<dyn VoteStore>,
    channels: Arc<dyn ChannelConfigStore>,
    identities: Arc<dyn IdentityResolver>,
    proposals: Arc<dyn ProposalMetadataService>,
}

impl ReportAssembler {
    pub fn new(
        polls: Arc<dyn PollStore>,
        votes: Arc<dyn VoteStore>,
        channels: Arc<dyn ChannelConfigStore>,
        identities: Arc<dyn IdentityResolver>,
        proposals: Arc<dyn ProposalMetadataService>,
    ) -> Self {
        Self {
            polls,
            votes,
            channels,
            identities,
            proposals,
        }
    }

    pub async fn assemble_report(&self, poll_id: &str) -> Result<PollReport, ReportError> {
        let poll = self
            .polls
            .poll(poll_id)
            .await?
            .ok_or_else(|| ReportError::PollNotFound(poll_id.to_string()))?;
        self.build_report(&poll).await
    }

    /// Report for the channel's poll on the given proposal. When a proposal
    /// was polled more than once the latest poll wins.
    pub async fn report_for_proposal(
        &self,
        channel_id: &str,
        proposal_id: u64,
    ) -> Result<PollReport, ReportError> {
        let polls = self.channel_polls(channel_id).await?;
        let mut target = None;
        for poll in &polls {
            if classify_proposal(&poll.title)?.proposal_id() == Some(proposal_id) {
                target = Some(poll);
            }
        }
        let poll = target.ok_or(ReportError::ProposalPollNotFound(proposal_id))?;
        self.build_report(poll).await
    }

    /// Participation and tally figures for every proposal poll in the
    /// channel, ordered by proposal number.
    pub async fn proposal_poll_stats(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ProposalPollStats>, ReportError> {
        let polls = self.channel_polls(channel_id).await?;

        let mut stats = Vec::new();
        for poll in &polls {
            let proposal_id = match classify_proposal(&poll.title)? {
                ProposalClass::Proposal(id) => id,
                ProposalClass::NotProposal => continue,
            };
            let votes = self.votes.votes_for_poll(&poll.id).await?;
            let counts = compute_tally(&votes, &poll.roster)?;
            let eligibility = count_eligibility(&poll.roster);
            stats.push(ProposalPollStats {
                proposal_id,
                users_eligible: eligibility.eligible,
                users_participated: eligibility.participated,
                for_votes: counts.for_votes,
                against_votes: counts.against_votes,
                abstain_votes: counts.abstain_votes,
            });
        }

        stats.sort_by_key(|s| s.proposal_id);
        Ok(stats)
    }

    /// Participation statistics for every voter on the roster of the
    /// channel's most recent poll, highest participation rate first.
    pub async fn nouncillors(&self, channel_id: &str) -> Result<Vec<NouncillorStats>, ReportError> {
        let polls = self.channel_polls(channel_id).await?;
        let latest = latest_poll(&polls, channel_id)?;

        let mut stats = Vec::with_capacity(latest.roster.eligible_count());
        for voter in latest.roster.voters() {
            stats.push(self.member_stats(&polls, voter).await);
        }
        stats.sort_by(|a, b| b.participation_rate.total_cmp(&a.participation_rate));
        Ok(stats)
    }

    /// Participation statistics for one member of the current Nouncil.
    pub async fn nouncillor(
        &self,
        channel_id: &str,
        voter: &str,
    ) -> Result<NouncillorStats, ReportError> {
        let polls = self.channel_polls(channel_id).await?;
        if latest_poll(&polls, channel_id)?.roster.get(voter).is_none() {
            return Err(ReportError::NotANouncillor(voter.to_string()));
        }
        Ok(self.member_stats(&polls, voter).await)
    }

    async fn member_stats(&self, polls: &[Poll], voter: &str) -> NouncillorStats {
        let mut polls_eligible: usize = 0;
        let mut polls_participated: usize = 0;
        for entry in polls.iter().filter_map(|poll| poll.roster.get(voter)) {
            polls_eligible += 1;
            if entry.participated {
                polls_participated += 1;
            }
        }
        let participation_rate = if polls_eligible == 0 {
            0.0
        } else {
            polls_participated as f64 / polls_eligible as f64
        };

        NouncillorStats {
            voter_id: voter.to_string(),
            display_name: resolve_display_name(self.identities.as_ref(), voter).await,
            polls_eligible,
            polls_participated,
            participation_rate,
        }
    }

    async fn channel_polls(&self, channel_id: &str) -> Result<Vec<Poll>, ReportError> {
        if self.channels.channel_config_for_channel(channel_id).await?.is_none() {
            error!("Unable to find a poll channel for id {}", channel_id);
            return Err(ReportError::ChannelConfigNotFound(channel_id.to_string()));
        }
        Ok(self.polls.polls_for_channel(channel_id).await?)
    }

    async fn build_report(&self, poll: &Poll) -> Result<PollReport, ReportError> {
        let proposal_id = extract_proposal_id(&poll.title).inspect_err(|e| {
            error!("Poll {} cannot be reported: {}", poll.id, e);
        })?;
        let proposal = self.proposals.proposal(proposal_id).await.inspect_err(|e| {
            warn!("Proposal lookup for poll {} failed: {}", poll.id, e);
        })?;

        let channel = self
            .channels
            .channel_config(&poll.config_id)
            .await?
            .ok_or_else(|| {
                error!("Unable to find poll config related to poll {}", poll.id);
                ReportError::ChannelConfigNotFound(poll.config_id.clone())
            })?;
        let votes = self.votes.votes_for_poll(&poll.id).await?;

        let counts = compute_tally(&votes, &poll.roster)?;
        let verdict = evaluate_outcome(&counts, poll.roster.eligible_count(), &channel, poll.status);
        let public_vote_feed =
            build_public_feed(poll, &channel, &votes, self.identities.as_ref()).await?;

        let (vote_participation, vote_reasons_formatted) = if poll.status.is_closed() {
            let participation = self.participation(poll).await;
            let named = self.name_votes(&channel, &votes).await;
            let description = verdict.description().unwrap_or_default();
            let formatted = format_vote_reasons(poll, &description, &named, &counts)?;
            (Some(participation), Some(formatted))
        } else {
            (None, None)
        };

        info!(
            "Built report for poll {} (proposal {}): {:?}",
            poll.id, proposal_id, verdict
        );

        Ok(PollReport {
            title: poll.title.clone(),
            description: poll.description.clone(),
            time_start: poll.created_at.timestamp_millis(),
            time_end: poll.ends_at.timestamp_millis(),
            status: poll.status,
            reference_data: ReferenceData {
                nouns_prop_id: proposal_id.to_string(),
                nouns_prop_start: proposal.start_block,
                nouns_prop_end: proposal.end_block,
            },
            public_vote_feed,
            vote_result: VoteResult {
                counts,
                outcome: PollOutcome::from(&verdict),
            },
            vote_participation,
            vote_reasons_formatted,
        })
    }

    async fn participation(&self, poll: &Poll) -> Vec<Participant> {
        let mut participants = Vec::new();
        for entry in poll.roster.entries().iter().filter(|e| e.participated) {
            participants.push(Participant {
                voter_id: entry.voter.clone(),
                display_name: resolve_display_name(self.identities.as_ref(), &entry.voter).await,
            });
        }
        participants
    }

    async fn name_votes<'a>(
        &self,
        channel: &PollChannel,
        votes: &'a [Vote],
    ) -> Vec<NamedVote<'a>> {
        let mut named = Vec::with_capacity(votes.len());
        for vote in votes {
            let name = if channel.anonymous {
                ANONYMOUS_NAME.to_string()
            } else {
                resolve_display_name(self.identities.as_ref(), &vote.voter).await
            };
            named.push(NamedVote { name, vote });
        }
        named
    }
}

// The current Nouncil is the roster of the newest poll.
fn latest_poll<'a>(polls: &'a [Poll], channel_id: &str) -> Result<&'a Poll, ReportError> {
    polls.last().ok_or_else(|| {
        error!("Unable to find most recent poll for channel {}", channel_id);
        ReportError::NoPollsInChannel(channel_id.to_string())
    })
}
