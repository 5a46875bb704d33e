use crate::models::{Poll, Vote};
use crate::voting::choice::{Choice, ChoiceError};
use crate::voting::tally::VoteCounts;

/// Name shown for every voter on anonymous channels.
pub const ANONYMOUS_NAME: &str = "anonymous";

/// A vote paired with the name it is shown under.
pub struct NamedVote<'a> {
    pub name: String,
    pub vote: &'a Vote,
}

/// Renders the closing summary posted for a finished poll.
///
/// Votes are grouped under each for/against token they carry. Group sizes
/// count every vote; only votes with a reason are quoted.
pub fn format_vote_reasons(
    poll: &Poll,
    outcome_description: &str,
    votes: &[NamedVote<'_>],
    counts: &VoteCounts,
) -> Result<String, ChoiceError> {
    let mut groups: [(Choice, Vec<&NamedVote<'_>>); 2] =
        [(Choice::For, Vec::new()), (Choice::Against, Vec::new())];

    for named in votes {
        for token in &named.vote.choices {
            let choice = Choice::normalize(token)?;
            if let Some((_, group)) = groups.iter_mut().find(|(c, _)| *c == choice) {
                group.push(named);
            }
        }
    }

    let mut output = format!("{}\n", poll.title);
    output.push_str(&format!("\nThe poll is {}.\n", poll.status));
    output.push_str(&format!("\n{}\n", outcome_description));

    for (choice, group) in groups.iter().filter(|(_, group)| !group.is_empty()) {
        output.push_str(&format!(
            "\n**{} - {} VOTES**\n",
            choice.as_str().to_uppercase(),
            group.len()
        ));
        for named in group.iter().filter(|named| named.vote.has_reason()) {
            output.push_str(&format!("\n**{}** | *\"{}\"*\n", named.name, named.vote.reason));
        }
    }

    output.push_str(&format!("\n**ABSTAINS - {} VOTES**", counts.abstain_votes));
    Ok(output)
}
