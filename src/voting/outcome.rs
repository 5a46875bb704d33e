use crate::models::{PollChannel, PollStatus};
use crate::voting::choice::Choice;
use crate::voting::tally::VoteCounts;
use serde::Serialize;

/// A pass condition a closed poll can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Quorum,
    VoteThreshold,
}

impl Requirement {
    fn label(&self) -> &'static str {
        match self {
            Requirement::Quorum => "quorum",
            Requirement::VoteThreshold => "vote threshold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The poll is open or cancelled; nothing may be reported yet.
    Undetermined,
    Failed(Vec<Requirement>),
    Tied,
    Won(Choice),
}

impl Verdict {
    pub fn winner(&self) -> Option<Choice> {
        match self {
            Verdict::Won(choice) => Some(*choice),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<String> {
        match self {
            Verdict::Undetermined => None,
            Verdict::Failed(failed) => {
                let labels: Vec<&str> = failed.iter().map(Requirement::label).collect();
                Some(format!("poll failed to meet {}.", labels.join(" and ")))
            }
            Verdict::Tied => Some("poll tied".to_string()),
            Verdict::Won(choice) => Some(format!("{} won", choice)),
        }
    }
}

/// Serialized form of a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    pub winner: Option<Choice>,
    pub description: Option<String>,
}

impl From<&Verdict> for PollOutcome {
    fn from(verdict: &Verdict) -> Self {
        Self {
            winner: verdict.winner(),
            description: verdict.description(),
        }
    }
}

/// Smallest whole number of voters that is at least `percent` of `eligible`.
pub fn percent_of_eligible(eligible: usize, percent: f64) -> u64 {
    // Multiplying first keeps whole-number percentages exact.
    (eligible as f64 * percent / 100.0).ceil() as u64
}

pub fn quorum_threshold(eligible: usize, channel: &PollChannel) -> u64 {
    percent_of_eligible(eligible, channel.quorum)
}

pub fn vote_threshold(eligible: usize, channel: &PollChannel) -> u64 {
    percent_of_eligible(eligible, channel.vote_threshold)
}

/// Decides a poll from its tally. Only closed polls get a verdict.
///
/// The leading side has to strictly exceed the vote threshold; meeting it
/// exactly is a failure.
pub fn evaluate_outcome(
    counts: &VoteCounts,
    eligible: usize,
    channel: &PollChannel,
    status: PollStatus,
) -> Verdict {
    if !status.is_closed() {
        return Verdict::Undetermined;
    }

    let passed_quorum = u64::from(counts.total()) >= quorum_threshold(eligible, channel);
    let leading = counts.for_votes.max(counts.against_votes);
    let passed_threshold = u64::from(leading) > vote_threshold(eligible, channel);

    let mut failed = Vec::new();
    if !passed_quorum {
        failed.push(Requirement::Quorum);
    }
    if !passed_threshold {
        failed.push(Requirement::VoteThreshold);
    }
    if !failed.is_empty() {
        return Verdict::Failed(failed);
    }

    if counts.for_votes == counts.against_votes {
        Verdict::Tied
    } else if counts.for_votes > counts.against_votes {
        Verdict::Won(Choice::For)
    } else {
        Verdict::Won(Choice::Against)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(quorum: f64, vote_threshold: f64) -> PollChannel {
        PollChannel {
            id: "cfg".to_string(),
            channel_id: "chan".to_string(),
            quorum,
            vote_threshold,
            anonymous: false,
        }
    }

    fn counts(for_votes: u32, against_votes: u32, abstain_votes: u32) -> VoteCounts {
        VoteCounts { for_votes, against_votes, abstain_votes }
    }

    #[test]
    fn thresholds_round_up() {
        assert_eq!(percent_of_eligible(10, 50.0), 5);
        assert_eq!(percent_of_eligible(7, 50.0), 4);
        assert_eq!(percent_of_eligible(0, 50.0), 0);
        assert_eq!(percent_of_eligible(3, 100.0), 3);
        assert_eq!(percent_of_eligible(10, 30.0), 3);
    }

    #[test]
    fn fractional_percentages_round_up() {
        assert_eq!(percent_of_eligible(10, 33.5), 4);
        assert_eq!(percent_of_eligible(200, 33.5), 67);
        assert_eq!(percent_of_eligible(9, 0.0), 0);

        // quorum 4 of 10 at 33.5%
        let passed = evaluate_outcome(&counts(4, 0, 0), 10, &channel(33.5, 20.0), PollStatus::Closed);
        assert_eq!(passed, Verdict::Won(Choice::For));
        let short = evaluate_outcome(&counts(3, 0, 0), 10, &channel(33.5, 20.0), PollStatus::Closed);
        assert_eq!(short, Verdict::Failed(vec![Requirement::Quorum]));
    }

    #[test]
    fn tie_after_both_requirements_pass() {
        let verdict = evaluate_outcome(&counts(3, 3, 0), 6, &channel(50.0, 20.0), PollStatus::Closed);
        assert_eq!(verdict, Verdict::Tied);
        let outcome = PollOutcome::from(&verdict);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.description.as_deref(), Some("poll tied"));
    }

    #[test]
    fn reports_both_failures() {
        let verdict = evaluate_outcome(&counts(1, 1, 0), 100, &channel(50.0, 50.0), PollStatus::Closed);
        assert_eq!(
            verdict.description().as_deref(),
            Some("poll failed to meet quorum and vote threshold.")
        );
        assert_eq!(verdict.winner(), None);
    }

    #[test]
    fn reports_single_failure() {
        // quorum 5 met by abstains, threshold 3 not exceeded
        let verdict = evaluate_outcome(&counts(3, 0, 4), 10, &channel(50.0, 30.0), PollStatus::Closed);
        assert_eq!(
            verdict.description().as_deref(),
            Some("poll failed to meet vote threshold.")
        );

        let verdict = evaluate_outcome(&counts(4, 0, 0), 10, &channel(50.0, 30.0), PollStatus::Closed);
        assert_eq!(verdict.description().as_deref(), Some("poll failed to meet quorum."));
    }

    #[test]
    fn threshold_is_strict() {
        let at = evaluate_outcome(&counts(5, 0, 0), 10, &channel(50.0, 50.0), PollStatus::Closed);
        assert_eq!(at, Verdict::Failed(vec![Requirement::VoteThreshold]));

        let above = evaluate_outcome(&counts(6, 0, 0), 10, &channel(50.0, 50.0), PollStatus::Closed);
        assert_eq!(above, Verdict::Won(Choice::For));
        assert_eq!(above.description().as_deref(), Some("for won"));
    }

    #[test]
    fn against_can_win() {
        let verdict = evaluate_outcome(&counts(2, 7, 1), 10, &channel(50.0, 50.0), PollStatus::Closed);
        assert_eq!(verdict.winner(), Some(Choice::Against));
        assert_eq!(verdict.description().as_deref(), Some("against won"));
    }

    #[test]
    fn open_and_cancelled_polls_are_undetermined() {
        for status in [PollStatus::Open, PollStatus::Cancelled] {
            let verdict = evaluate_outcome(&counts(9, 0, 0), 10, &channel(10.0, 10.0), status);
            let outcome = PollOutcome::from(&verdict);
            assert_eq!(outcome, PollOutcome { winner: None, description: None });
        }
    }

    #[test]
    fn same_inputs_same_verdict() {
        let c = counts(4, 2, 1);
        let ch = channel(40.0, 30.0);
        let first = evaluate_outcome(&c, 9, &ch, PollStatus::Closed);
        let second = evaluate_outcome(&c, 9, &ch, PollStatus::Closed);
        assert_eq!(first, second);
    }
}
