//! Input dataset loading and final-table / failure-log writing.
//!
//! The dataset is tabular, one row per task record, and is assumed to fit
//! in memory. Missing required columns fail fast before any stage runs.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::model::{RecordId, TaskRecord, WorkTable};

pub const ID_COLUMN: &str = "Task ID";
pub const TITLE_COLUMN: &str = "Title";
pub const TASK_COLUMN: &str = "Task";
pub const SUMMARY_COLUMN: &str = "consensus_summary";

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> anyhow::Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("'{}' column not found in {}", name, path.display()))
}

/// Load the input dataset. Fails fast when a required column is missing.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<TaskRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("reading input dataset {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let id_idx = column_index(&headers, ID_COLUMN, path)?;
    let title_idx = column_index(&headers, TITLE_COLUMN, path)?;
    let task_idx = column_index(&headers, TASK_COLUMN, path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("bad row in {}", path.display()))?;
        records.push(TaskRecord {
            id: RecordId::new(row.get(id_idx).unwrap_or("").to_string()),
            title: row.get(title_idx).unwrap_or("").to_string(),
            task: row.get(task_idx).unwrap_or("").to_string(),
        });
    }
    Ok(records)
}

/// Load a summarized table (final-table format) for the standalone
/// classification entry point: records plus their consensus summaries.
pub fn load_summarized(
    path: &Path,
) -> anyhow::Result<(Vec<TaskRecord>, HashMap<RecordId, String>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("reading input table {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let id_idx = column_index(&headers, ID_COLUMN, path)?;
    let title_idx = column_index(&headers, TITLE_COLUMN, path)?;
    let task_idx = column_index(&headers, TASK_COLUMN, path)?;
    let summary_idx = column_index(&headers, SUMMARY_COLUMN, path)?;

    let mut records = Vec::new();
    let mut summaries = HashMap::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("bad row in {}", path.display()))?;
        let id = RecordId::new(row.get(id_idx).unwrap_or("").to_string());
        records.push(TaskRecord {
            id: id.clone(),
            title: row.get(title_idx).unwrap_or("").to_string(),
            task: row.get(task_idx).unwrap_or("").to_string(),
        });
        let summary = row.get(summary_idx).unwrap_or("");
        if !summary.is_empty() {
            summaries.insert(id, summary.to_string());
        }
    }
    Ok((records, summaries))
}

/// Write the final merged table: input columns, per-rater columns,
/// consensus, and secondary-stage columns. Single writer, written once.
pub fn write_final_table(
    path: &Path,
    table: &WorkTable,
    rater_names: &[String],
) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;

    let mut headers = vec![
        ID_COLUMN.to_string(),
        TITLE_COLUMN.to_string(),
        TASK_COLUMN.to_string(),
    ];
    for name in rater_names {
        headers.push(format!("{name}_rating"));
        headers.push(format!("{name}_justification"));
    }
    headers.push("consensus_rating".to_string());
    headers.push(SUMMARY_COLUMN.to_string());
    headers.push("ai_engagement_level".to_string());
    headers.push("flag_complementary".to_string());
    headers.push("engagement_reasoning".to_string());
    writer.write_record(&headers)?;

    for record in table.records() {
        let mut row = vec![
            record.id.as_str().to_string(),
            record.title.clone(),
            record.task.clone(),
        ];
        for name in rater_names {
            match table.rater_outcome(name, &record.id) {
                Some(outcome) => {
                    row.push(outcome.rating.map(|r| r.to_string()).unwrap_or_default());
                    row.push(outcome.justification.clone());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        row.push(
            table
                .consensus(&record.id)
                .map(|r| r.to_string())
                .unwrap_or_default(),
        );
        row.push(table.summary(&record.id).unwrap_or_default().to_string());
        match table.secondary(&record.id) {
            Some(outcome) => {
                row.push(outcome.engagement.to_string());
                row.push(outcome.complementary.to_string());
                row.push(outcome.reasoning.clone());
            }
            None => {
                row.push(String::new());
                row.push(String::new());
                row.push(String::new());
            }
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Append-only failure log: one record identifier per line, written once at
/// the end of a stage. Re-running the stage rewrites it.
pub fn write_failure_log(path: &Path, failures: &[RecordId]) -> anyhow::Result<()> {
    if failures.is_empty() {
        // Leave no stale log behind from a previous run.
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("removing stale failure log {}", path.display()))?;
        }
        return Ok(());
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("writing {}", path.display()))?;
    for id in failures {
        writeln!(file, "{id}")?;
    }
    Ok(())
}
