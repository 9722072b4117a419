use std::num::NonZeroUsize;
use std::sync::Arc;

use log::{debug, info};
use serde_json::{json, Value};

use crate::core::report_store::ReportStore;
use crate::core::throttle::RequestThrottle;
use crate::error::{ArchiveError, Result};
use crate::http::{Transport, TransportError};
use crate::model::{DetailOutcome, DetailRecord, SummaryRecord};
use crate::utils::unix_millis;

const SEARCH_QUERY: &str = r#"
query {
  search(
    index: CompleteHacktivityReportIndex
    query_string: "disclosed:true"
    from: 0
    size: {size}
    sort: { field: "latest_disclosable_activity_at", direction: DESC }
  ) {
    __typename
    total_count
    nodes {
      __typename
      ... on HacktivityDocument {
        _id
        reporter {
          _id
          username
        }
        cve_ids
        cwe
        severity_rating
        votes
        program: team {
          _id
          handle
          name
          currency
        }
        total_awarded_amount
        latest_disclosable_activity_at
        submitted_at
        report {
          _id
          substate
          comments: activities {
            nodes {
              ...ActivityFragment
            }
          }
        }
      }
    }
  }
}

fragment ActivityFragment on ActivityUnion {
  ... on ReportActivityInterface {
    message
    actor {
      ... on User {
        username
      }
    }
    attachments {
      _id
      file_name
      url: expiring_url
      content_type
      file_size
      moderated
    }
  }
}
"#;

/// Builds the hacktivity search query for a page of `size` results.
pub fn build_search_query(size: NonZeroUsize) -> String {
    SEARCH_QUERY.replace("{size}", &size.to_string())
}

/// Talks to the search index and the per-report detail endpoint.
pub struct ReportFetcher {
    transport: Arc<dyn Transport>,
    base_url: String,
    store: ReportStore,
    throttle: RequestThrottle,
}

impl ReportFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        store: ReportStore,
        throttle: RequestThrottle,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            throttle,
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base_url)
    }

    pub fn detail_url(&self, report_id: &str) -> String {
        format!("{}/reports/{}.json?_={}", self.base_url, report_id, unix_millis())
    }

    /// Fetches one page of the most recently disclosed reports.
    pub async fn fetch_summary_page(&self, count: NonZeroUsize) -> Result<Vec<SummaryRecord>> {
        let endpoint = self.graphql_url();
        let body = json!({ "query": build_search_query(count) });

        info!("Requesting {} disclosed report(s) from {}", count, endpoint);
        let response = self.transport.post_json(&endpoint, &body).await?;

        let nodes = match response.pointer("/data/search/nodes") {
            Some(Value::Array(nodes)) => nodes,
            Some(_) => return Err(malformed(&endpoint, "`data.search.nodes` is not an array")),
            None => {
                let reason = match response.pointer("/errors/0/message").and_then(Value::as_str) {
                    Some(message) => format!("GraphQL error: {}", message),
                    None => "missing `data.search.nodes`".to_string(),
                };
                return Err(malformed(&endpoint, &reason));
            }
        };

        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                serde_json::from_value::<SummaryRecord>(node.clone())
                    .map_err(|e| malformed(&endpoint, &format!("search node {}: {}", i, e)))
            })
            .collect()
    }

    /// Returns `Cached` without touching the network when the report has
    /// already been rendered. Otherwise fetches the detail payload and then
    /// waits out the rate-limit delay, whatever the outcome.
    pub async fn fetch_detail(&self, report_id: &str) -> Result<DetailOutcome> {
        if self.store.contains(report_id).await {
            debug!("Report {} already archived, skipping fetch", report_id);
            return Ok(DetailOutcome::Cached);
        }

        let url = self.detail_url(report_id);
        let response = self.transport.get_json(&url).await;
        self.throttle.wait().await;

        let detail = serde_json::from_value::<DetailRecord>(response?).map_err(|e| {
            ArchiveError::Transport(TransportError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })
        })?;

        Ok(DetailOutcome::Fetched(detail))
    }
}

fn malformed(endpoint: &str, reason: &str) -> ArchiveError {
    ArchiveError::MalformedResponse {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    }
}
