//! Typed records for the payloads the archiver consumes and produces.
//!
//! Fields the platform is known to omit or null out are `Option`s; presence
//! is validated when a summary and its detail are merged, so one incomplete
//! report never poisons the rest of a page.

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub handle: Option<String>,
    pub name: Option<String>,
    pub currency: Option<String>,
}

/// One search hit from the hacktivity index.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryRecord {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub reporter: Option<Reporter>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cve_ids: Vec<String>,
    pub cwe: Option<String>,
    pub severity_rating: Option<String>,
    pub votes: Option<i64>,
    pub program: Option<Program>,
    pub total_awarded_amount: Option<f64>,
    pub report: Option<ReportStub>,
    pub submitted_at: Option<String>,
    pub latest_disclosable_activity_at: Option<String>,
}

impl SummaryRecord {
    /// Raw timeline entries nested under `report.comments.nodes`.
    pub fn raw_comments(&self) -> &[RawActivity] {
        self.report
            .as_ref()
            .map(|r| r.comments.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn substate(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.substate.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportStub {
    pub substate: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: ActivityConnection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityConnection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<RawActivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Actor {
    pub username: Option<String>,
}

/// A report timeline entry as returned by the GraphQL activity fragment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawActivity {
    pub message: Option<String>,
    pub actor: Option<Actor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<RawAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttachment {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub file_name: Option<String>,
    pub url: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<u64>,
    pub moderated: Option<bool>,
}

/// Payload of `/reports/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetailRecord {
    pub title: Option<String>,
    pub vulnerability_information: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summaries: Vec<SummaryFragment>,
    pub url: Option<String>,
    pub disclosed_at: Option<String>,
}

impl DetailRecord {
    /// Non-empty summary contents joined with single spaces.
    pub fn impact_summary(&self) -> String {
        self.summaries
            .iter()
            .filter_map(|s| s.content.as_deref())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryFragment {
    pub content: Option<String>,
}

/// Result of asking for a report's detail.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// The rendered artifact already exists; nothing was fetched.
    Cached,
    Fetched(DetailRecord),
}

/// An attachment after content-type filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Fetched { content: String },
    /// Disallowed content type, kept as received and never dereferenced.
    Passthrough(RawAttachment),
}

impl Attachment {
    pub fn content(&self) -> Option<&str> {
        match self {
            Attachment::Fetched { content } => Some(content),
            Attachment::Passthrough(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub message: Option<String>,
    pub author: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Summary and detail joined for rendering. Built per report, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedReport {
    pub id: String,
    pub title: String,
    pub vulnerability_information: String,
    pub impact_summary: String,
    pub link: Option<String>,
    pub disclosed_at: Option<String>,
    pub submitted_at: Option<String>,
    pub latest_activity_at: Option<String>,
    pub reporter: String,
    pub cve_ids: Vec<String>,
    pub weakness: Option<String>,
    pub severity_rating: String,
    pub votes: Option<i64>,
    pub awarded_amount: Option<f64>,
    pub substate: String,
    pub program_name: String,
    pub program_handle: Option<String>,
    pub currency: Option<String>,
    pub comments: Vec<Comment>,
}
