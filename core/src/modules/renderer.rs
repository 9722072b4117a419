use crate::error::{ArchiveError, Result};
use crate::model::{Comment, DetailRecord, MergedReport, SummaryRecord};

pub const NO_CVES: &str = "None";
pub const NO_BOUNTY: &str = "No bounty information";
const UNKNOWN_AUTHOR: &str = "Unknown";

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("AUD", "A$"),
    ("CAD", "C$"),
    ("CHF", "CHF"),
];

/// Looks up the display symbol for an ISO currency code, ignoring case.
pub fn currency_symbol(code: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code.trim()))
        .map(|(_, symbol)| *symbol)
}

/// Joins a summary and its detail into one report and renders it as text.
pub struct ReportRenderer;

impl ReportRenderer {
    /// Validates every required field, bounty currency included, so a record
    /// that cannot be rendered is rejected before its attachments are fetched.
    pub fn merge(
        summary: &SummaryRecord,
        detail: &DetailRecord,
        comments: Vec<Comment>,
    ) -> Result<MergedReport> {
        let id = summary
            .id
            .clone()
            .ok_or_else(|| ArchiveError::incomplete("<unknown>", "_id"))?;
        let missing = |field: &'static str| ArchiveError::incomplete(&id, field);

        let reporter = summary
            .reporter
            .as_ref()
            .and_then(|r| r.username.clone())
            .ok_or_else(|| missing("reporter.username"))?;
        let program = summary.program.as_ref().ok_or_else(|| missing("program"))?;
        let program_name = program.name.clone().ok_or_else(|| missing("program.name"))?;
        let severity_rating = summary
            .severity_rating
            .clone()
            .ok_or_else(|| missing("severity_rating"))?;
        let substate = summary
            .substate()
            .map(str::to_string)
            .ok_or_else(|| missing("report.substate"))?;
        let title = detail.title.clone().ok_or_else(|| missing("title"))?;
        let vulnerability_information = detail
            .vulnerability_information
            .clone()
            .ok_or_else(|| missing("vulnerability_information"))?;

        let merged = MergedReport {
            impact_summary: detail.impact_summary(),
            link: detail.url.clone(),
            disclosed_at: detail.disclosed_at.clone(),
            submitted_at: summary.submitted_at.clone(),
            latest_activity_at: summary.latest_disclosable_activity_at.clone(),
            reporter,
            cve_ids: summary.cve_ids.clone(),
            weakness: summary.cwe.clone(),
            severity_rating,
            votes: summary.votes,
            awarded_amount: summary.total_awarded_amount,
            substate,
            program_name,
            program_handle: program.handle.clone(),
            currency: program.currency.clone(),
            comments,
            title,
            vulnerability_information,
            id,
        };
        bounty_line(&merged)?;
        Ok(merged)
    }

    pub fn render(report: &MergedReport) -> Result<String> {
        let mut out = String::new();

        out.push_str(&format!(
            "[Report ID: {} | Reporter: {} | Program: {} | Severity: {} | State: {} | CVEs: {} | Bounty: {}]\n\n",
            report.id,
            report.reporter,
            report.program_name,
            report.severity_rating,
            report.substate,
            cve_list(&report.cve_ids),
            bounty_line(report)?,
        ));

        push_section(&mut out, "Title:", &report.title);
        push_section(&mut out, "Technical Description:", &report.vulnerability_information);
        push_section(&mut out, "Impact Summary:", &report.impact_summary);

        let reference = reference_lines(report);
        if !reference.is_empty() {
            push_section(&mut out, "Reference:", &reference.join("\n"));
        }

        for (i, comment) in report.comments.iter().enumerate() {
            push_comment(&mut out, &report.id, i + 1, comment);
        }

        Ok(out)
    }
}

fn push_section(out: &mut String, heading: &str, body: &str) {
    out.push_str(heading);
    out.push('\n');
    out.push_str(body);
    out.push_str("\n\n");
}

fn push_comment(out: &mut String, report_id: &str, number: usize, comment: &Comment) {
    let author = comment.author.as_deref().unwrap_or(UNKNOWN_AUTHOR);

    if let Some(ref message) = comment.message {
        out.push_str(&format!("Comment {}:\n{}\n", number, message));
        out.push_str(&format!(
            "[Report ID: {} | Section: Comment | Comment: {} | Author: {}]\n\n",
            report_id, number, author
        ));
    }

    for (j, attachment) in comment.attachments.iter().enumerate() {
        let Some(content) = attachment.content() else {
            continue;
        };
        let fence = fence_for(content);
        out.push_str(&format!("Technical Details {}.{}:\n", number, j + 1));
        out.push_str(&format!("{}\n{}\n{}\n", fence, content.trim_end_matches('\n'), fence));
        out.push_str(&format!(
            "[Report ID: {} | Section: Technical Details | Comment: {} | Attachment: {} | Author: {}]\n\n",
            report_id,
            number,
            j + 1,
            author
        ));
    }
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn cve_list(cve_ids: &[String]) -> String {
    if cve_ids.is_empty() {
        NO_CVES.to_string()
    } else {
        cve_ids.join(", ")
    }
}

fn bounty_line(report: &MergedReport) -> Result<String> {
    let amount = match report.awarded_amount {
        Some(amount) if amount > 0.0 => amount,
        _ => return Ok(NO_BOUNTY.to_string()),
    };

    let code = report
        .currency
        .as_deref()
        .ok_or_else(|| ArchiveError::incomplete(&report.id, "program.currency"))?;
    let symbol = currency_symbol(code).ok_or_else(|| ArchiveError::UnknownCurrency {
        report_id: report.id.clone(),
        code: code.to_string(),
    })?;

    Ok(format!("{} {}", format_amount(amount), symbol))
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}

fn reference_lines(report: &MergedReport) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(ref link) = report.link {
        lines.push(format!("URL: {}", link));
    }
    if let Some(ref handle) = report.program_handle {
        lines.push(format!("Program Handle: {}", handle));
    }
    if let Some(ref submitted_at) = report.submitted_at {
        lines.push(format!("Submitted At: {}", submitted_at));
    }
    if let Some(ref disclosed_at) = report.disclosed_at {
        lines.push(format!("Disclosed At: {}", disclosed_at));
    }
    if let Some(ref latest) = report.latest_activity_at {
        lines.push(format!("Latest Activity At: {}", latest));
    }
    if let Some(ref weakness) = report.weakness {
        lines.push(format!("Weakness: {}", weakness));
    }
    if let Some(votes) = report.votes {
        lines.push(format!("Votes: {}", votes));
    }
    lines
}
