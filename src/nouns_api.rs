use crate::models::ProposalMetadata;
use crate::store::{MetadataError, ProposalMetadataService};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const RETRY_BACKOFF_MS: u64 = 500;

/// Block numbers arrive as JSON numbers or numeric strings depending on the
/// indexer version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlockNumber {
    Number(u64),
    Text(String),
}

impl BlockNumber {
    fn value(&self) -> Result<u64, MetadataError> {
        match self {
            BlockNumber::Number(n) => Ok(*n),
            BlockNumber::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| MetadataError::Unavailable(format!("invalid block number {:?}", s))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexerProposal {
    proposal_id: u64,
    start_block: BlockNumber,
    end_block: BlockNumber,
}

impl IndexerProposal {
    fn into_metadata(self) -> Result<ProposalMetadata, MetadataError> {
        Ok(ProposalMetadata {
            proposal_id: self.proposal_id,
            start_block: self.start_block.value()?,
            end_block: self.end_block.value()?,
        })
    }
}

/// Client for the Nouns proposal indexer. Each request is bounded by the
/// configured timeout and retried a fixed number of times on outages.
pub struct NounsApi {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl NounsApi {
    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
        })
    }

    fn proposal_url(&self, proposal_id: u64) -> String {
        format!("{}/proposal/{}", self.base_url, proposal_id)
    }

    async fn fetch_once(&self, proposal_id: u64) -> Result<ProposalMetadata, MetadataError> {
        let url = self.proposal_url(proposal_id);
        debug!("Fetching proposal metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MetadataError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(MetadataError::NotFound(proposal_id)),
            status if !status.is_success() => {
                return Err(MetadataError::Unavailable(format!(
                    "unable to fetch proposal {}: {}",
                    proposal_id, status
                )));
            }
            _ => {}
        }

        response
            .json::<IndexerProposal>()
            .await
            .map_err(|e| MetadataError::Unavailable(e.to_string()))?
            .into_metadata()
    }
}

#[async_trait]
impl ProposalMetadataService for NounsApi {
    async fn proposal(&self, proposal_id: u64) -> Result<ProposalMetadata, MetadataError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(proposal_id).await {
                Err(MetadataError::Unavailable(reason)) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Proposal {} lookup failed ({}), retry {}/{}",
                        proposal_id, reason, attempt, self.retries
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
                result => return result,
            }
        }
    }
}
