use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use disclosure_archiver_core::{
    ArchiveConfig, NullSink, Pipeline, RecordOutcome, Transport, TransportError,
};

/// Serves canned bodies by exact URL path (query string ignored) and records
/// every URL requested.
#[derive(Default)]
struct ScriptedTransport {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn with(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(path.to_string(), body.into());
        self
    }

    fn calls_to(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    fn serve(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        let path = url.split('?').next().unwrap_or(url);
        self.bodies
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        assert!(body["query"].as_str().unwrap().contains("CompleteHacktivityReportIndex"));
        let bytes = self.serve(url)?;
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.serve(url)
    }
}

const BASE: &str = "https://h1.test";

fn search_node(id: &str, comments: Value) -> Value {
    json!({
        "__typename": "HacktivityDocument",
        "_id": id,
        "reporter": { "_id": "77", "username": "reporter_one" },
        "cve_ids": ["CVE-2023-1234"],
        "cwe": "Server-Side Request Forgery (SSRF)",
        "severity_rating": "critical",
        "votes": 120,
        "program": { "handle": "acme", "name": "Acme", "currency": "USD" },
        "total_awarded_amount": 2500.0,
        "report": {
            "substate": "resolved",
            "comments": { "nodes": comments }
        }
    })
}

fn detail(title: &str) -> Vec<u8> {
    json!({
        "title": title,
        "vulnerability_information": "The webhook URL is fetched server side.",
        "summaries": [ { "content": "Internal metadata was reachable." }, { "content": null } ],
        "url": "https://h1.test/reports/x",
        "disclosed_at": "2024-02-02T00:00:00.000Z"
    })
    .to_string()
    .into_bytes()
}

fn page(nodes: Vec<Value>) -> Vec<u8> {
    json!({ "data": { "search": { "nodes": nodes } } })
        .to_string()
        .into_bytes()
}

fn config(dir: &TempDir, count: usize) -> ArchiveConfig {
    ArchiveConfig {
        base_url: BASE.to_string(),
        downloads_dir: dir.path().join("downloads"),
        count,
        rate_limit_delay_ms: 0,
        ..Default::default()
    }
}

fn report_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join("downloads/reports"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_two_records_produce_two_report_files() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(
        ScriptedTransport::default()
            .with(
                "https://h1.test/graphql",
                page(vec![search_node("101", json!([])), search_node("102", json!([]))]),
            )
            .with("https://h1.test/reports/101.json", detail("SSRF in webhooks"))
            .with("https://h1.test/reports/102.json", detail("Stored XSS | in <title>")),
    );

    let pipeline = Pipeline::new(config(&dir, 2), transport, NullSink::new_ref());
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.archived_count(), 2);
    assert_eq!(report_files(&dir), vec!["101.md", "102.md"]);

    for (id, title) in [("101", "SSRF in webhooks"), ("102", "Stored XSS | in <title>")] {
        let text =
            std::fs::read_to_string(dir.path().join(format!("downloads/reports/{}.md", id)))
                .unwrap();
        let metadata = text.lines().next().unwrap();
        assert!(metadata.starts_with(&format!("[Report ID: {} |", id)));
        assert!(metadata.contains("| Bounty: 2500 $]"));
        assert!(text.contains(&format!("Title:\n{}\n", title)));
    }
}

#[tokio::test]
async fn test_second_run_skips_archived_reports() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(
        ScriptedTransport::default()
            .with("https://h1.test/graphql", page(vec![search_node("201", json!([]))]))
            .with("https://h1.test/reports/201.json", detail("First title")),
    );

    let first = Pipeline::new(config(&dir, 1), transport.clone(), NullSink::new_ref())
        .run()
        .await
        .unwrap();
    assert_eq!(first.archived_count(), 1);

    let path = dir.path().join("downloads/reports/201.md");
    let before = std::fs::read_to_string(&path).unwrap();

    let second = Pipeline::new(config(&dir, 1), transport.clone(), NullSink::new_ref())
        .run()
        .await
        .unwrap();

    assert_eq!(
        second.outcomes,
        vec![RecordOutcome::Cached {
            report_id: "201".to_string()
        }]
    );
    assert_eq!(transport.calls_to("/reports/201.json"), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_only_allowed_attachments_become_technical_details() {
    let dir = TempDir::new().unwrap();
    let comments = json!([
        {
            "message": "Here is the PoC",
            "actor": { "username": "reporter_one" },
            "attachments": [
                {
                    "_id": "a1",
                    "file_name": "poc.md",
                    "url": "https://files.test/att/poc.md?expires=1",
                    "content_type": "text/markdown",
                    "file_size": 20,
                    "moderated": false
                },
                {
                    "_id": "a2",
                    "file_name": "screenshot.png",
                    "url": "https://files.test/att/screenshot.png?expires=1",
                    "content_type": "image/png",
                    "file_size": 2048,
                    "moderated": false
                }
            ]
        },
        { "message": null, "attachments": [] },
        { "message": "", "actor": { "username": "triage" } }
    ]);
    let transport = Arc::new(
        ScriptedTransport::default()
            .with("https://h1.test/graphql", page(vec![search_node("301", comments)]))
            .with("https://h1.test/reports/301.json", detail("SSRF"))
            .with("https://files.test/att/poc.md", "curl http://169.254.169.254/")
            .with("https://files.test/att/screenshot.png", vec![0x89, b'P', b'N', b'G']),
    );

    let summary = Pipeline::new(config(&dir, 1), transport.clone(), NullSink::new_ref())
        .run()
        .await
        .unwrap();
    assert_eq!(summary.archived_count(), 1);

    let text = std::fs::read_to_string(dir.path().join("downloads/reports/301.md")).unwrap();
    let headings = text
        .lines()
        .filter(|l| l.starts_with("Technical Details ") && l.ends_with(':'))
        .count();
    assert_eq!(headings, 1);
    assert!(text.contains(
        "Technical Details 1.1:\n```\ncurl http://169.254.169.254/\n```\n\
         [Report ID: 301 | Section: Technical Details | Comment: 1 | Attachment: 1 | Author: reporter_one]"
    ));
    assert!(text.contains("Comment 1:\nHere is the PoC\n"));
    assert!(!text.contains("Comment 2:"));
    assert!(!text.contains("screenshot.png"));

    assert_eq!(transport.calls_to("screenshot.png"), 0);
    assert!(dir.path().join("downloads/attachments/poc.md").exists());
    assert!(!dir.path().join("downloads/attachments/screenshot.png").exists());
}

#[tokio::test]
async fn test_unknown_currency_skips_only_that_report() {
    let dir = TempDir::new().unwrap();
    let mut odd = search_node("401", json!([]));
    odd["program"]["currency"] = json!("DOGE");
    let transport = Arc::new(
        ScriptedTransport::default()
            .with(
                "https://h1.test/graphql",
                page(vec![odd, search_node("402", json!([]))]),
            )
            .with("https://h1.test/reports/401.json", detail("A"))
            .with("https://h1.test/reports/402.json", detail("B")),
    );

    let summary = Pipeline::new(config(&dir, 2), transport, NullSink::new_ref())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed_count(), 1);
    assert_eq!(report_files(&dir), vec!["402.md"]);
}
