use crate::models::{Roster, Vote};
use crate::voting::choice::{Choice, ChoiceError};
use log::{debug, error};
use serde::Serialize;

/// Roster size and how many of those voters took part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible: usize,
    pub participated: usize,
}

pub fn count_eligibility(roster: &Roster) -> Eligibility {
    Eligibility {
        eligible: roster.eligible_count(),
        participated: roster.participated_count(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteCounts {
    #[serde(rename = "for")]
    pub for_votes: u32,
    #[serde(rename = "against")]
    pub against_votes: u32,
    #[serde(rename = "abstain")]
    pub abstain_votes: u32,
}

impl VoteCounts {
    pub fn record(&mut self, choice: Choice) {
        match choice {
            Choice::For => self.for_votes += 1,
            Choice::Against => self.against_votes += 1,
            Choice::Abstain => self.abstain_votes += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.for_votes + self.against_votes + self.abstain_votes
    }
}

/// Counts every choice token on every vote, then adds the roster's legacy
/// abstains, which never produced a vote record.
///
/// A vote carrying several tokens lands in several buckets. The first token
/// that does not normalize aborts the tally.
pub fn compute_tally(votes: &[Vote], roster: &Roster) -> Result<VoteCounts, ChoiceError> {
    let mut counts = VoteCounts::default();

    for vote in votes {
        for token in &vote.choices {
            let choice = Choice::normalize(token).inspect_err(|e| {
                error!("Vote by {} on poll {} has {}", vote.voter, vote.poll_id, e);
            })?;
            counts.record(choice);
        }
    }

    let legacy_abstains = roster.abstained_count() as u32;
    counts.abstain_votes += legacy_abstains;

    debug!(
        "Tallied {} votes ({} legacy abstains): {:?}",
        votes.len(),
        legacy_abstains,
        counts
    );
    Ok(counts)
}
