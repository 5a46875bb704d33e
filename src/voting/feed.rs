use crate::error::ReportError;
use crate::models::{Poll, PollChannel, Vote};
use crate::store::{IdentityResolver, resolve_display_name};
use crate::voting::choice::Choice;
use log::error;
use serde::Serialize;
use std::collections::HashMap;

/// A reasoned for/against vote that may be shown publicly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// `None` on anonymous channels.
    pub voter_id: Option<String>,
    pub display_name: Option<String>,
    pub vote: Choice,
    pub reason: String,
}

/// Builds the public vote feed in roster order.
///
/// Roster abstainers, abstain votes and votes without a reason are left out.
/// Every other participant must have a vote on record.
pub async fn build_public_feed(
    poll: &Poll,
    channel: &PollChannel,
    votes: &[Vote],
    identities: &dyn IdentityResolver,
) -> Result<Vec<FeedEntry>, ReportError> {
    // A voter's earliest vote row is the one that counts.
    let mut by_voter: HashMap<&str, &Vote> = HashMap::new();
    for vote in votes {
        by_voter.entry(vote.voter.as_str()).or_insert(vote);
    }

    let mut feed = Vec::new();
    for entry in poll.roster.entries() {
        if !entry.participated || entry.abstained {
            continue;
        }

        let missing_vote = || {
            error!("Unable to find vote for {} on poll {}", entry.voter, poll.id);
            ReportError::MissingVote {
                poll_id: poll.id.clone(),
                voter: entry.voter.clone(),
            }
        };
        let vote = by_voter.get(entry.voter.as_str()).ok_or_else(missing_vote)?;
        let first_choice = vote.choices.first().ok_or_else(missing_vote)?;

        let choice = Choice::normalize(first_choice).inspect_err(|e| {
            error!("Vote by {} on poll {} has {}", entry.voter, poll.id, e);
        })?;
        if choice == Choice::Abstain || !vote.has_reason() {
            continue;
        }

        let (voter_id, display_name) = if channel.anonymous {
            (None, None)
        } else {
            let name = resolve_display_name(identities, &entry.voter).await;
            (Some(entry.voter.clone()), Some(name))
        };

        feed.push(FeedEntry {
            voter_id,
            display_name,
            vote: choice,
            reason: vote.reason.clone(),
        });
    }

    Ok(feed)
}
