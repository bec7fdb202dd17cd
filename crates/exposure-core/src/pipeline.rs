//! Stage orchestration.
//!
//! A run walks the stages in order (local raters, consensus, summary,
//! secondary classification), merging each stage's checkpoint before doing
//! any work, so an interrupted run resumes by re-invoking it. The pipeline
//! owns the table; worker pools report back through [`raters::dispatch`] and
//! never touch it directly.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::{PipelineConfig, RaterConfig};
use crate::consensus;
use crate::dataset;
use crate::engine::{BatchEngine, SamplingParams};
use crate::judge::JudgeClient;
use crate::model::{RecordId, SecondaryOutcome, TaskRecord, WorkTable};
use crate::raters::{self, LocalBatchRater};

const SUMMARY_STAGE: &str = "summary";
const SECONDARY_STAGE: &str = "engagement";

/// Batch failure threshold between incremental secondary-stage flushes.
const FLUSH_EVERY_FAILURES: usize = 20;

/// Builds the inference engine for one rater. Invoked lazily, only when the
/// rater still has unresolved records, so a fully checkpointed run never
/// loads a model.
pub type EngineFactory = Box<dyn Fn(&RaterConfig) -> anyhow::Result<Box<dyn BatchEngine>> + Send + Sync>;

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub records: usize,
    pub consensus: usize,
    pub summary_failures: usize,
    pub secondary_failures: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
    judge: JudgeClient,
    checkpoints: CheckpointStore,
    engines: EngineFactory,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, judge: JudgeClient, engines: EngineFactory) -> Self {
        let checkpoints = CheckpointStore::new(config.work_dir());
        Self {
            config,
            judge,
            checkpoints,
            engines,
        }
    }

    /// Run the full pipeline: rate, reconcile, summarize, classify, write.
    pub async fn run(&self) -> anyhow::Result<PipelineReport> {
        let records = dataset::load_records(&self.config.dataset)?;
        info!(records = records.len(), "dataset loaded");
        eprintln!("loaded {} records", records.len());
        let mut table = WorkTable::new(records);
        let mut report = PipelineReport {
            records: table.len(),
            ..PipelineReport::default()
        };

        self.run_raters(&mut table)?;
        report.consensus = self.reconcile(&mut table);
        report.summary_failures = self.run_summaries(&mut table).await?;
        report.secondary_failures = self.run_secondary(&mut table).await?;

        let rater_names = self.rater_names();
        dataset::write_final_table(&self.config.output, &table, &rater_names)?;
        eprintln!("wrote {}", self.config.output.display());
        Ok(report)
    }

    /// Standalone secondary classification over an already-summarized table.
    pub async fn run_classification(
        &self,
        input: &std::path::Path,
        output: &std::path::Path,
    ) -> anyhow::Result<PipelineReport> {
        let (records, summaries) = dataset::load_summarized(input)?;
        eprintln!("loaded {} summarized records", records.len());
        let mut table = WorkTable::new(records);
        table.merge_summaries(summaries);

        let mut report = PipelineReport {
            records: table.len(),
            ..PipelineReport::default()
        };
        report.secondary_failures = self.run_secondary(&mut table).await?;

        dataset::write_final_table(output, &table, &[])?;
        eprintln!("wrote {}", output.display());
        Ok(report)
    }

    fn rater_names(&self) -> Vec<String> {
        self.config.raters.iter().map(|r| r.name.clone()).collect()
    }

    /// One batched pass per rater, in config order. Each rater's engine is
    /// built only if needed and dropped before the next rater starts.
    fn run_raters(&self, table: &mut WorkTable) -> anyhow::Result<()> {
        for rater in &self.config.raters {
            if let Some(prior) = self.checkpoints.load_rater(&rater.name)? {
                info!(rater = %rater.name, resumed = prior.len(), "checkpoint loaded");
                table.merge_rater(&rater.name, prior);
            }
            let todo = table.unresolved_for_rater(&rater.name);
            if todo.is_empty() {
                eprintln!("rater {}: nothing to do", rater.name);
                continue;
            }
            eprintln!("rater {}: evaluating {} records", rater.name, todo.len());

            let engine = (self.engines)(rater)
                .with_context(|| format!("building engine for rater {}", rater.name))?;
            let batch_rater = LocalBatchRater::new(
                engine,
                SamplingParams {
                    seed: self.config.seed,
                    ..SamplingParams::default()
                },
            );
            let outcomes = batch_rater
                .run(&todo)
                .with_context(|| format!("rater {} failed", rater.name))?;
            // Release the model before anything else happens.
            drop(batch_rater);

            table.merge_rater(&rater.name, outcomes);
            self.checkpoints
                .flush_rater(&rater.name, table.rater_outcomes(&rater.name))?;
        }
        Ok(())
    }

    /// Reconcile per-rater ratings into one consensus score per record.
    fn reconcile(&self, table: &mut WorkTable) -> usize {
        let names = self.rater_names();
        let mut reconciled = 0usize;
        for record in table.records().to_vec() {
            let ratings: Vec<Option<u8>> = names
                .iter()
                .map(|n| table.rater_outcome(n, &record.id).and_then(|o| o.rating))
                .collect();
            if let Some(rating) = consensus::aggregate(&ratings, names.len()) {
                table.set_consensus(record.id, rating);
                reconciled += 1;
            }
        }
        eprintln!("consensus reached for {reconciled} records");
        reconciled
    }

    async fn run_summaries(&self, table: &mut WorkTable) -> anyhow::Result<usize> {
        if let Some(prior) = self.checkpoints.load_summaries(SUMMARY_STAGE)? {
            info!(resumed = prior.len(), "summary checkpoint loaded");
            table.merge_summaries(prior);
        }
        let todo = table.unresolved_for_summary();
        if todo.is_empty() {
            eprintln!("summary: nothing to do");
            return Ok(0);
        }
        eprintln!("summary: {} records", todo.len());

        let names = self.rater_names();
        let justifications: Arc<HashMap<RecordId, Vec<String>>> = Arc::new(
            table
                .records()
                .iter()
                .map(|record| {
                    let texts = names
                        .iter()
                        .filter_map(|n| table.rater_outcome(n, &record.id))
                        .map(|o| o.justification.clone())
                        .filter(|j| !j.is_empty())
                        .collect();
                    (record.id.clone(), texts)
                })
                .collect(),
        );

        let judge = self.judge.clone();
        let report = raters::dispatch(
            &todo,
            self.config.max_in_flight,
            move |record: TaskRecord| {
                let judge = judge.clone();
                let justifications = Arc::clone(&justifications);
                async move {
                    let texts = justifications.get(&record.id).cloned().unwrap_or_default();
                    judge.summarize(&record, &texts).await
                }
            },
            |_, _| {},
        )
        .await;

        let failed = report.failures.len();
        table.merge_summaries(report.outcomes);
        self.checkpoints
            .flush_summaries(SUMMARY_STAGE, table.summaries())?;
        dataset::write_failure_log(
            &self.config.work_dir().join("summary_failed.log"),
            &report.failures,
        )?;
        eprintln!("summary: {failed} failures");
        Ok(failed)
    }

    async fn run_secondary(&self, table: &mut WorkTable) -> anyhow::Result<usize> {
        if let Some(prior) = self.checkpoints.load_secondary(SECONDARY_STAGE)? {
            info!(resumed = prior.len(), "secondary checkpoint loaded");
            table.merge_secondary(prior);
        }
        // Classification needs a summary to work from.
        let todo: Vec<TaskRecord> = table
            .unresolved_for_secondary()
            .into_iter()
            .filter(|r| table.summary(&r.id).is_some())
            .collect();
        if todo.is_empty() {
            eprintln!("classification: nothing to do");
            return Ok(0);
        }
        eprintln!("classification: {} records", todo.len());

        let summaries: Arc<HashMap<RecordId, String>> = Arc::new(
            table
                .summaries()
                .map(|(id, s)| (id.clone(), s.to_string()))
                .collect(),
        );

        // Incremental durability while the pool drains: fresh outcomes pile
        // up beside the already-checkpointed ones, and every twentieth
        // failure triggers a flush of both.
        let mut fresh: HashMap<RecordId, SecondaryOutcome> = HashMap::new();
        let mut failures_seen = 0usize;

        let judge = self.judge.clone();
        let report = raters::dispatch(
            &todo,
            self.config.max_in_flight,
            move |record: TaskRecord| {
                let judge = judge.clone();
                let summaries = Arc::clone(&summaries);
                async move {
                    let summary = summaries.get(&record.id).cloned().unwrap_or_default();
                    judge.classify(&record, &summary).await
                }
            },
            |id, result| match result {
                Ok(outcome) => {
                    fresh.insert(id.clone(), outcome.clone());
                }
                Err(_) => {
                    failures_seen += 1;
                    if failures_seen % FLUSH_EVERY_FAILURES == 0 {
                        let merged = table.secondary_outcomes().chain(fresh.iter());
                        if let Err(e) = self.checkpoints.flush_secondary(SECONDARY_STAGE, merged) {
                            warn!(error = %e, "incremental checkpoint flush failed");
                        }
                        eprintln!("classification: {failures_seen} failures so far, checkpoint flushed");
                    }
                }
            },
        )
        .await;

        let failed = report.failures.len();
        table.merge_secondary(report.outcomes);
        self.checkpoints
            .flush_secondary(SECONDARY_STAGE, table.secondary_outcomes())?;
        dataset::write_failure_log(
            &self.config.work_dir().join("engagement_failed.log"),
            &report.failures,
        )?;
        eprintln!("classification: {failed} failures");
        Ok(failed)
    }
}
