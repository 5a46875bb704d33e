pub mod choice;
pub mod feed;
pub mod outcome;
pub mod proposal;
pub mod tally;

pub use choice::{Choice, ChoiceError};
pub use feed::{FeedEntry, build_public_feed};
pub use outcome::{PollOutcome, Verdict, evaluate_outcome};
pub use proposal::{ProposalClass, ProposalTitleError, classify_proposal, extract_proposal_id};
pub use tally::{Eligibility, VoteCounts, compute_tally, count_eligibility};
