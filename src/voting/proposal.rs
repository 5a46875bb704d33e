//! Recognizes polls that mirror an on-chain proposal from their title.
//!
//! Automatically created polls are titled `Prop <n>: ...`; the manual polls
//! before proposal 80 used `Proposal <n> ...`.

use lazy_static::lazy_static;
use regex::Regex;

const KEYWORDS: [&str; 2] = ["Prop", "Proposal"];

lazy_static! {
    static ref LEADING_DIGITS: Regex = Regex::new(r"^[0-9]+").expect("valid digit pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalClass {
    NotProposal,
    Proposal(u64),
}

impl ProposalClass {
    pub fn proposal_id(&self) -> Option<u64> {
        match self {
            ProposalClass::Proposal(id) => Some(*id),
            ProposalClass::NotProposal => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProposalTitleError {
    #[error("{0:?} is not a proposal poll title")]
    NoMatch(String),
    #[error("no proposal number in {0:?}")]
    NoIdToken(String),
    #[error("proposal number {token:?} in {title:?} is not numeric")]
    NonNumericId { title: String, token: String },
}

/// Text after the proposal keyword, when the title's first word is one.
fn strip_keyword(title: &str) -> Option<&str> {
    KEYWORDS.iter().find_map(|keyword| {
        let rest = title.strip_prefix(keyword)?;
        (rest.is_empty() || rest.starts_with(' ')).then_some(rest)
    })
}

/// A proposal title is a keyword, a single space and then a digit.
pub fn is_proposal_title(title: &str) -> bool {
    strip_keyword(title)
        .and_then(|rest| rest.strip_prefix(' '))
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Reads the proposal number out of a proposal title. Only the digits at the
/// start of the second word count, so `80:` yields 80.
pub fn extract_proposal_id(title: &str) -> Result<u64, ProposalTitleError> {
    if strip_keyword(title).is_none() {
        return Err(ProposalTitleError::NoMatch(title.to_string()));
    }

    let token = title
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ProposalTitleError::NoIdToken(title.to_string()))?;

    let non_numeric = || ProposalTitleError::NonNumericId {
        title: title.to_string(),
        token: token.to_string(),
    };
    let digits = LEADING_DIGITS.find(token).ok_or_else(non_numeric)?;
    digits.as_str().parse::<u64>().map_err(|_| non_numeric())
}

/// Classifies a poll title. Titles without the proposal prefix are not an
/// error; a prefixed title whose number cannot be read is.
pub fn classify_proposal(title: &str) -> Result<ProposalClass, ProposalTitleError> {
    if !is_proposal_title(title) {
        return Ok(ProposalClass::NotProposal);
    }
    extract_proposal_id(title).map(ProposalClass::Proposal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_title() {
        assert_eq!(
            classify_proposal("Prop 80: Upgrade treasury"),
            Ok(ProposalClass::Proposal(80))
        );
    }

    #[test]
    fn legacy_title() {
        assert_eq!(
            classify_proposal("Proposal 12 Fund the hackathon"),
            Ok(ProposalClass::Proposal(12))
        );
        assert_eq!(classify_proposal("Proposal 7"), Ok(ProposalClass::Proposal(7)));
    }

    #[test]
    fn ordinary_poll_is_not_a_proposal() {
        assert_eq!(classify_proposal("Community update"), Ok(ProposalClass::NotProposal));
        assert_eq!(classify_proposal(""), Ok(ProposalClass::NotProposal));
    }

    #[test]
    fn prefix_needs_exactly_one_space_then_digit() {
        assert_eq!(classify_proposal("Prop80: merged"), Ok(ProposalClass::NotProposal));
        assert_eq!(classify_proposal("Prop  80"), Ok(ProposalClass::NotProposal));
        assert_eq!(classify_proposal("Prop: 80"), Ok(ProposalClass::NotProposal));
        assert_eq!(classify_proposal("prop 80"), Ok(ProposalClass::NotProposal));
        assert_eq!(classify_proposal("Proposals 80"), Ok(ProposalClass::NotProposal));
    }

    #[test]
    fn embedded_punctuation_keeps_leading_digits() {
        assert_eq!(classify_proposal("Prop 8-0 recount"), Ok(ProposalClass::Proposal(8)));
        assert_eq!(classify_proposal("Prop 123abc"), Ok(ProposalClass::Proposal(123)));
    }

    #[test]
    fn oversized_number_is_malformed() {
        let title = "Prop 99999999999999999999999: overflow";
        assert_eq!(
            classify_proposal(title),
            Err(ProposalTitleError::NonNumericId {
                title: title.to_string(),
                token: "99999999999999999999999:".to_string(),
            })
        );
    }

    #[test]
    fn extracting_from_unprefixed_titles_fails() {
        assert_eq!(
            extract_proposal_id("Community update"),
            Err(ProposalTitleError::NoMatch("Community update".to_string()))
        );
        assert!(matches!(extract_proposal_id("Props 4"), Err(ProposalTitleError::NoMatch(_))));
    }

    #[test]
    fn keyword_without_number_token() {
        assert_eq!(
            extract_proposal_id("Prop"),
            Err(ProposalTitleError::NoIdToken("Prop".to_string()))
        );
        assert_eq!(
            extract_proposal_id("Proposal  80"),
            Err(ProposalTitleError::NoIdToken("Proposal  80".to_string()))
        );
    }

    #[test]
    fn keyword_with_non_numeric_token() {
        assert_eq!(
            extract_proposal_id("Prop #80: renumbered"),
            Err(ProposalTitleError::NonNumericId {
                title: "Prop #80: renumbered".to_string(),
                token: "#80:".to_string(),
            })
        );
    }

    #[test]
    fn proposal_id_accessor() {
        assert_eq!(ProposalClass::Proposal(3).proposal_id(), Some(3));
        assert_eq!(ProposalClass::NotProposal.proposal_id(), None);
    }
}
