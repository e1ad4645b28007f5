use crate::csv::write_row;
use crate::model::{KeywordReport, KeywordStatus, ProductVerdict, ReportError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const REPORT_HEADER: [&str; 10] = [
    "row",
    "keyword",
    "status",
    "flagged",
    "failing_products",
    "total_products",
    "relevance_pct",
    "tokens",
    "token_failures",
    "discrepancies",
];

/// Writes the validation report, one CSV row per keyword, and returns the
/// number of keywords written. Takes the reports by value: once written, a
/// keyword's run is finished.
pub fn write_report(path: &Path, reports: Vec<KeywordReport>) -> Result<usize, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let written = render_report(&mut writer, &reports)?;
    writer.flush()?;
    info!("Report written: {} ({} keywords)", path.display(), written);
    Ok(written)
}

pub fn render_report<W: Write>(mut w: W, reports: &[KeywordReport]) -> Result<usize, ReportError> {
    write_row(&mut w, &REPORT_HEADER, ',')?;
    for report in reports {
        write_row(&mut w, &report_row(report), ',')?;
    }
    Ok(reports.len())
}

fn report_row(report: &KeywordReport) -> Vec<String> {
    let tokens = report
        .tokens
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(" ");
    let token_failures = report
        .token_failures
        .iter()
        .map(|(token, count)| format!("{}={}", token.label(), count))
        .collect::<Vec<_>>()
        .join("; ");
    let relevance = report
        .relevance_pct()
        .map(|pct| format!("{:.1}", pct))
        .unwrap_or_default();

    vec![
        report.keyword.row.to_string(),
        report.keyword.text.clone(),
        report.status.as_str().to_string(),
        report.flagged().to_string(),
        report.failing_count.to_string(),
        report.total_count.to_string(),
        relevance,
        tokens,
        token_failures,
        describe_discrepancies(report),
    ]
}

/// Human-readable account of why a keyword did not simply pass.
pub fn describe_discrepancies(report: &KeywordReport) -> String {
    match &report.status {
        KeywordStatus::Passed => String::new(),
        KeywordStatus::Unconstrained => "keyword has no tokens; nothing to check".into(),
        KeywordStatus::NoData(reason) => reason.to_string(),
        KeywordStatus::InvalidInput(reason) => format!("invalid input: {}", reason),
        KeywordStatus::Flagged => report
            .verdicts
            .iter()
            .filter(|v| !v.passed)
            .map(describe_verdict)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// `#2 sku-9 "Red Runner": missing blue[color] (color: red)`
fn describe_verdict(verdict: &ProductVerdict) -> String {
    let missing = verdict
        .unmatched
        .iter()
        .map(|token| {
            let observed = verdict
                .results
                .iter()
                .find(|r| r.position == token.position)
                .and_then(|r| r.observed.as_ref());
            match observed {
                Some((field, value)) => format!("{} ({}: {})", token.label(), field, value),
                None => token.label(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "#{} {} \"{}\": missing {}",
        verdict.position, verdict.product_id, verdict.title, missing
    )
}
