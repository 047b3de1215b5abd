use std::path::Path;

use anyhow::{Context, Result};
use jira_update_bulk::BulkExecutor;
use serde::{Deserialize, Serialize};

use super::issues::{apply_field_update, FieldUpdate};
use super::utils::{report_failure, JiraContext, Outcome};
use crate::query::SearchQuery;

/// One CSV row, by position:
/// `search_field,search_value,update_field,update_value`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkRow {
    pub search_field: String,
    pub search_value: String,
    pub update_field: String,
    pub update_value: String,
}

impl BulkRow {
    /// The search field is quoted so custom field names with spaces work.
    pub fn to_field_update(&self) -> FieldUpdate {
        FieldUpdate {
            query: SearchQuery::quoted_field(&self.search_field, self.search_value.clone()),
            field_name: self.update_field.clone(),
            field_value: self.update_value.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ParsedRows {
    /// `(line, row)` in file order.
    pub rows: Vec<(u64, BulkRow)>,
    /// `(line, reason)` for rows that could not be read.
    pub rejected: Vec<(u64, String)>,
}

/// Reads the headerless four-column CSV. Malformed rows are collected in
/// `rejected` so the remaining rows still run.
pub fn read_rows(path: &Path) -> Result<ParsedRows> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let mut parsed = ParsedRows::default();
    for (idx, record) in reader.records().enumerate() {
        let fallback_line = (idx + 1) as u64;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(fallback_line);
                parsed.rejected.push((line, err.to_string()));
                continue;
            }
        };

        let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
        match record.deserialize::<BulkRow>(None) {
            Ok(row) => parsed.rows.push((line, row)),
            Err(err) => parsed.rejected.push((line, err.to_string())),
        }
    }

    Ok(parsed)
}

#[derive(Serialize)]
struct RowReport {
    line: u64,
    key: String,
    status: &'static str,
}

pub async fn bulk_update(
    ctx: &JiraContext<'_>,
    file: &Path,
    dry_run: bool,
    show_progress: bool,
) -> Result<Outcome> {
    let parsed = read_rows(file)?;

    for (line, reason) in &parsed.rejected {
        tracing::warn!(line, %reason, "Skipping malformed row");
        println!("Skipping line {line}: {reason}");
    }

    if parsed.rows.is_empty() {
        println!("No rows to process in {}", file.display());
        return Ok(Outcome::from_failures(parsed.rejected.len()));
    }

    println!("Found {} rows to process", parsed.rows.len());

    if dry_run {
        println!("🔍 Dry run mode - no changes will be made:");
        for (line, row) in &parsed.rows {
            let update = row.to_field_update();
            println!(
                "  line {}: would set {} = '{}' on issue matching {}",
                line, update.field_name, update.field_value, update.query
            );
        }
    }

    let executor = BulkExecutor::new(dry_run).with_progress(show_progress);

    let lines: Vec<u64> = parsed.rows.iter().map(|(line, _)| *line).collect();
    let rows: Vec<BulkRow> = parsed.rows.into_iter().map(|(_, row)| row).collect();

    let result = executor
        .run(rows, |_, row| {
            let client = &ctx.client;
            let renderer = ctx.renderer;
            async move {
                apply_field_update(client, &row.to_field_update())
                    .await
                    .map_err(|err| {
                        report_failure(&err);
                        renderer.failure("see output");
                        anyhow::Error::new(err)
                    })
            }
        })
        .await;

    if dry_run {
        return Ok(Outcome::from_failures(parsed.rejected.len()));
    }

    let mut reports: Vec<RowReport> = result
        .successful
        .iter()
        .map(|(idx, key)| RowReport {
            line: lines[*idx],
            key: key.clone(),
            status: "updated",
        })
        .chain(result.failed.iter().map(|(idx, _)| RowReport {
            line: lines[*idx],
            key: String::new(),
            status: "failed",
        }))
        .collect();
    reports.sort_by_key(|r| r.line);

    if !matches!(ctx.renderer.format(), jira_update_output::OutputFormat::Text) {
        ctx.renderer.render(&reports)?;
    }

    let failures = result.failure_count() + parsed.rejected.len();
    println!(
        "Processed {} rows: {} updated, {} failed",
        lines.len() + parsed.rejected.len(),
        result.success_count(),
        failures
    );

    Ok(Outcome::from_failures(failures))
}
