//! Durable per-stage checkpoints.
//!
//! One CSV file per stage, named `<stage>_partial.csv`, keyed by record
//! identity. Absence of the file is "no prior progress", not an error. A
//! record present in a rater checkpoint with a non-absent rating is never
//! reprocessed; absent-rating rows are kept too so their raw justification
//! survives for debugging, and those records are picked up again on the
//! next run.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::model::{RaterOutcome, RecordId, SecondaryOutcome};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct RaterRow {
    #[serde(rename = "Task ID")]
    id: String,
    rating: Option<u8>,
    justification: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SummaryRow {
    #[serde(rename = "Task ID")]
    id: String,
    summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SecondaryRow {
    #[serde(rename = "Task ID")]
    id: String,
    ai_engagement_level: u8,
    flag_complementary: bool,
    reasoning: String,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}_partial.csv"))
    }

    /// Load a rater checkpoint, or `None` if the stage has no prior
    /// progress.
    pub fn load_rater(
        &self,
        stage: &str,
    ) -> anyhow::Result<Option<HashMap<RecordId, RaterOutcome>>> {
        let path = self.path_for(stage);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv_reader(&path)?;
        let mut outcomes = HashMap::new();
        for row in reader.deserialize() {
            let row: RaterRow =
                row.with_context(|| format!("bad checkpoint row in {}", path.display()))?;
            outcomes.insert(
                RecordId::new(row.id),
                RaterOutcome {
                    rating: row.rating,
                    justification: row.justification,
                },
            );
        }
        Ok(Some(outcomes))
    }

    pub fn flush_rater<'a>(
        &self,
        stage: &str,
        outcomes: impl Iterator<Item = (&'a RecordId, &'a RaterOutcome)>,
    ) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut rows: Vec<RaterRow> = outcomes
            .map(|(id, o)| RaterRow {
                id: id.as_str().to_string(),
                rating: o.rating,
                justification: o.justification.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        for row in rows {
            writer.serialize(row)?;
        }
        self.persist(stage, writer)
    }

    pub fn load_summaries(&self, stage: &str) -> anyhow::Result<Option<HashMap<RecordId, String>>> {
        let path = self.path_for(stage);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv_reader(&path)?;
        let mut summaries = HashMap::new();
        for row in reader.deserialize() {
            let row: SummaryRow =
                row.with_context(|| format!("bad checkpoint row in {}", path.display()))?;
            summaries.insert(RecordId::new(row.id), row.summary);
        }
        Ok(Some(summaries))
    }

    pub fn flush_summaries<'a>(
        &self,
        stage: &str,
        summaries: impl Iterator<Item = (&'a RecordId, &'a str)>,
    ) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut rows: Vec<SummaryRow> = summaries
            .map(|(id, s)| SummaryRow {
                id: id.as_str().to_string(),
                summary: s.to_string(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        for row in rows {
            writer.serialize(row)?;
        }
        self.persist(stage, writer)
    }

    pub fn load_secondary(
        &self,
        stage: &str,
    ) -> anyhow::Result<Option<HashMap<RecordId, SecondaryOutcome>>> {
        let path = self.path_for(stage);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv_reader(&path)?;
        let mut outcomes = HashMap::new();
        for row in reader.deserialize() {
            let row: SecondaryRow =
                row.with_context(|| format!("bad checkpoint row in {}", path.display()))?;
            outcomes.insert(
                RecordId::new(row.id),
                SecondaryOutcome {
                    engagement: row.ai_engagement_level,
                    complementary: row.flag_complementary,
                    reasoning: row.reasoning,
                },
            );
        }
        Ok(Some(outcomes))
    }

    pub fn flush_secondary<'a>(
        &self,
        stage: &str,
        outcomes: impl Iterator<Item = (&'a RecordId, &'a SecondaryOutcome)>,
    ) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut rows: Vec<SecondaryRow> = outcomes
            .map(|(id, o)| SecondaryRow {
                id: id.as_str().to_string(),
                ai_engagement_level: o.engagement,
                flag_complementary: o.complementary,
                reasoning: o.reasoning.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        for row in rows {
            writer.serialize(row)?;
        }
        self.persist(stage, writer)
    }

    fn persist(&self, stage: &str, writer: csv::Writer<Vec<u8>>) -> anyhow::Result<()> {
        let bytes = writer.into_inner().context("finalizing checkpoint csv")?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating checkpoint dir {}", self.dir.display()))?;
        let path = self.path_for(stage);
        fs::write(&path, bytes)
            .with_context(|| format!("writing checkpoint {}", path.display()))?;
        Ok(())
    }
}

fn csv_reader(path: &Path) -> anyhow::Result<csv::Reader<fs::File>> {
    csv::Reader::from_path(path)
        .with_context(|| format!("opening checkpoint {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_checkpoint_is_no_prior_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.load_rater("mistral").unwrap().is_none());
    }

    #[test]
    fn rater_checkpoint_round_trips_including_absent_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        let outcomes = HashMap::from([
            (RecordId::new("t1"), RaterOutcome::resolved(4, "good, clear")),
            (RecordId::new("t2"), RaterOutcome::unresolved("raw\nmultiline")),
        ]);
        store.flush_rater("mistral", outcomes.iter()).unwrap();

        let loaded = store.load_rater("mistral").unwrap().unwrap();
        assert_eq!(loaded, outcomes);
    }

    #[test]
    fn flushing_twice_leaves_the_checkpoint_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let outcomes = HashMap::from([(RecordId::new("t1"), RaterOutcome::resolved(3, "ok"))]);

        store.flush_rater("orca_mini", outcomes.iter()).unwrap();
        let first = fs::read(store.path_for("orca_mini")).unwrap();
        store.flush_rater("orca_mini", outcomes.iter()).unwrap();
        let second = fs::read(store.path_for("orca_mini")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn secondary_checkpoint_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let outcomes = HashMap::from([(
            RecordId::new("t9"),
            SecondaryOutcome {
                engagement: 5,
                complementary: false,
                reasoning: "fully automatable".into(),
            },
        )]);
        store.flush_secondary("engagement", outcomes.iter()).unwrap();
        let loaded = store.load_secondary("engagement").unwrap().unwrap();
        assert_eq!(loaded, outcomes);
    }
}
