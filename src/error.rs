use crate::store::{MetadataError, StoreError};
use crate::voting::choice::ChoiceError;
use crate::voting::proposal::ProposalTitleError;

/// How a caller should treat a failed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DataIntegrity,
    UpstreamUnavailable,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("poll {0} not found")]
    PollNotFound(String),
    #[error("poll channel config {0} not found")]
    ChannelConfigNotFound(String),
    #[error("no proposal poll found for proposal {0}")]
    ProposalPollNotFound(u64),
    #[error("channel {0} has no polls")]
    NoPollsInChannel(String),
    #[error("proposal {0} not found")]
    ProposalNotFound(u64),
    #[error("{0} is not on the current Nouncil")]
    NotANouncillor(String),
    #[error("malformed proposal title: {0}")]
    MalformedProposalTitle(#[from] ProposalTitleError),
    #[error("encountered unexpected voting results: {0}")]
    UnrecognizedChoice(#[from] ChoiceError),
    #[error("unable to find vote information for {voter} on poll {poll_id}")]
    MissingVote { poll_id: String, voter: String },
    #[error("report unavailable: {0}")]
    ReportUnavailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::PollNotFound(_)
            | ReportError::ChannelConfigNotFound(_)
            | ReportError::ProposalPollNotFound(_)
            | ReportError::NoPollsInChannel(_)
            | ReportError::ProposalNotFound(_)
            | ReportError::NotANouncillor(_) => ErrorKind::NotFound,
            ReportError::MalformedProposalTitle(_)
            | ReportError::UnrecognizedChoice(_)
            | ReportError::MissingVote { .. } => ErrorKind::DataIntegrity,
            ReportError::ReportUnavailable(_) => ErrorKind::UpstreamUnavailable,
            ReportError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Only upstream outages are worth retrying; everything else fails the
    /// same way on the same records.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::UpstreamUnavailable
    }
}

impl From<MetadataError> for ReportError {
    fn from(value: MetadataError) -> Self {
        match value {
            MetadataError::NotFound(id) => ReportError::ProposalNotFound(id),
            MetadataError::Unavailable(reason) => ReportError::ReportUnavailable(reason),
        }
    }
}
