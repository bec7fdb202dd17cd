//! End-to-end pipeline runs against scripted engines and a scripted judge:
//! consensus semantics, checkpoint resumption, and failure-log handling.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use exposure_core::config::{EngineConfig, JudgeConfig, PipelineConfig, RaterConfig};
use exposure_core::engine::{BatchEngine, ScriptedEngine};
use exposure_core::pipeline::EngineFactory;
use exposure_core::providers::FakeChatClient;
use exposure_core::{JudgeClient, Pipeline, RateLimiter};

const CLASSIFY_OK: &str = r#"{"job_title": "Architect", "job_task": "Designing a building",
    "ai_engagement_level": 4, "flag": 1, "reasoning": "mostly automatable"}"#;

fn write_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("tasks.csv");
    std::fs::write(
        &path,
        "Task ID,Title,Task\n\
         t1,Architect,Designing a building\n\
         t2,Architect,Designing a building\n\
         t3,Architect,Designing a building\n",
    )
    .unwrap();
    path
}

fn make_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        dataset: write_dataset(dir),
        output: dir.join("final.csv"),
        work_dir: Some(dir.join("work")),
        seed: 28,
        rate_limit_per_minute: 60_000,
        max_in_flight: 4,
        judge: JudgeConfig::default(),
        raters: ["orca_mini", "mistral", "openchat"]
            .into_iter()
            .map(|name| RaterConfig {
                name: name.to_string(),
                model_path: dir.join(name),
            })
            .collect(),
        engine: EngineConfig {
            command: vec!["unused".to_string()],
        },
    }
}

/// Factory handing each rater one scripted batch; raters absent from the
/// map fail the run, which is how tests assert a rater was skipped.
fn scripted_factory(batches: HashMap<String, Vec<String>>) -> EngineFactory {
    Box::new(move |rater: &RaterConfig| {
        let batch = batches
            .get(&rater.name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unexpected engine build for {}", rater.name))?;
        Ok(Box::new(ScriptedEngine::new(rater.name.clone(), vec![batch])) as Box<dyn BatchEngine>)
    })
}

fn failing_factory() -> EngineFactory {
    scripted_factory(HashMap::new())
}

fn judge_with(client: Arc<FakeChatClient>) -> JudgeClient {
    JudgeClient::new(client, Arc::new(RateLimiter::per_minute(60_000)))
}

fn scripted_judge() -> JudgeClient {
    judge_with(Arc::new(FakeChatClient::scripted(|message| {
        if message.contains("text summarization model") {
            Ok("[combined summary]".to_string())
        } else {
            Ok(CLASSIFY_OK.to_string())
        }
    })))
}

fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn full_run_reconciles_ratings_and_writes_the_final_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = make_config(dir.path());
    let output = config.output.clone();
    let work = config.work_dir();

    let factory = scripted_factory(HashMap::from([
        (
            "orca_mini".to_string(),
            vec![
                "[4, \"a\"]".to_string(),
                "garbage".to_string(),
                "[1, \"c\"]".to_string(),
            ],
        ),
        (
            "mistral".to_string(),
            vec![
                "[4, \"b1\"]".to_string(),
                "[3, \"b2\"]".to_string(),
                "[3, \"b3\"]".to_string(),
            ],
        ),
        (
            "openchat".to_string(),
            vec![
                "[4, \"c1\"]".to_string(),
                "[5, \"c2\"]".to_string(),
                "[5, \"c3\"]".to_string(),
            ],
        ),
    ]));

    let pipeline = Pipeline::new(config, scripted_judge(), factory);
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.records, 3);
    assert_eq!(report.consensus, 3);
    assert_eq!(report.summary_failures, 0);
    assert_eq!(report.secondary_failures, 0);

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 3);
    // Unanimous ratings pass through.
    assert_eq!(rows[0]["consensus_rating"], "4");
    // One unparsable rater leaves [3, 5]: tied mode, lower wins.
    assert_eq!(rows[1]["consensus_rating"], "3");
    assert_eq!(rows[1]["orca_mini_rating"], "");
    assert_eq!(rows[1]["orca_mini_justification"], "garbage");
    // Three distinct ratings: the most conservative wins.
    assert_eq!(rows[2]["consensus_rating"], "1");

    for row in &rows {
        assert_eq!(row["consensus_summary"], "combined summary");
        assert_eq!(row["ai_engagement_level"], "4");
        assert_eq!(row["flag_complementary"], "true");
    }

    assert!(work.join("orca_mini_partial.csv").exists());
    assert!(work.join("summary_partial.csv").exists());
    assert!(work.join("engagement_partial.csv").exists());
    assert!(!work.join("summary_failed.log").exists());
}

#[tokio::test]
async fn fully_checkpointed_run_builds_no_engine_and_calls_no_judge() {
    let dir = tempfile::tempdir().unwrap();
    let config = make_config(dir.path());

    let all_parse = |r: u8| {
        vec![
            format!("[{r}, \"x\"]"),
            format!("[{r}, \"y\"]"),
            format!("[{r}, \"z\"]"),
        ]
    };
    let factory = scripted_factory(HashMap::from([
        ("orca_mini".to_string(), all_parse(4)),
        ("mistral".to_string(), all_parse(4)),
        ("openchat".to_string(), all_parse(4)),
    ]));
    Pipeline::new(config.clone(), scripted_judge(), factory)
        .run()
        .await
        .unwrap();

    // Second run: any engine build or judge call would fail it.
    let idle_client = Arc::new(FakeChatClient::with_responses(Vec::new()));
    let pipeline = Pipeline::new(config, judge_with(idle_client.clone()), failing_factory());
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.consensus, 3);
    assert_eq!(report.summary_failures, 0);
    assert_eq!(report.secondary_failures, 0);
    assert_eq!(idle_client.calls(), 0);
}

#[tokio::test]
async fn failed_records_are_logged_and_recovered_on_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = make_config(dir.path());
    let work = config.work_dir();

    // First run: orca_mini cannot rate t2, and the judge refuses to
    // summarize anything mentioning its raw output.
    let factory = scripted_factory(HashMap::from([
        (
            "orca_mini".to_string(),
            vec![
                "[4, \"a\"]".to_string(),
                "garbage".to_string(),
                "[4, \"c\"]".to_string(),
            ],
        ),
        (
            "mistral".to_string(),
            vec![
                "[4, \"b1\"]".to_string(),
                "[3, \"b2\"]".to_string(),
                "[4, \"b3\"]".to_string(),
            ],
        ),
        (
            "openchat".to_string(),
            vec![
                "[4, \"c1\"]".to_string(),
                "[5, \"c2\"]".to_string(),
                "[4, \"c3\"]".to_string(),
            ],
        ),
    ]));
    let flaky_judge = judge_with(Arc::new(FakeChatClient::scripted(|message| {
        if message.contains("text summarization model") {
            if message.contains("garbage") {
                anyhow::bail!("scripted outage");
            }
            Ok("[combined summary]".to_string())
        } else {
            Ok(CLASSIFY_OK.to_string())
        }
    })));

    let report = Pipeline::new(config.clone(), flaky_judge, factory)
        .run()
        .await
        .unwrap();
    assert_eq!(report.summary_failures, 1);
    assert_eq!(
        std::fs::read_to_string(work.join("summary_failed.log")).unwrap(),
        "t2\n"
    );
    // No summary means no classification attempt for that record.
    let rows = read_rows(&config.output);
    assert_eq!(rows[1]["consensus_summary"], "");
    assert_eq!(rows[1]["ai_engagement_level"], "");

    // Second run: only orca_mini's unresolved record is retried, the judge
    // cooperates, and the failure log is cleared.
    let retry_factory = scripted_factory(HashMap::from([(
        "orca_mini".to_string(),
        vec!["[2, \"fixed\"]".to_string()],
    )]));
    let report = Pipeline::new(config.clone(), scripted_judge(), retry_factory)
        .run()
        .await
        .unwrap();
    assert_eq!(report.summary_failures, 0);
    assert_eq!(report.secondary_failures, 0);
    assert!(!work.join("summary_failed.log").exists());

    let rows = read_rows(&config.output);
    // t2 now rates [2, 3, 5]: all distinct, most conservative wins.
    assert_eq!(rows[1]["orca_mini_rating"], "2");
    assert_eq!(rows[1]["consensus_rating"], "2");
    assert_eq!(rows[1]["consensus_summary"], "combined summary");
    assert_eq!(rows[1]["ai_engagement_level"], "4");
}

#[tokio::test]
async fn classification_entry_point_reuses_existing_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let config = make_config(dir.path());
    let input = dir.path().join("summarized.csv");
    std::fs::write(
        &input,
        "Task ID,Title,Task,consensus_summary\n\
         t1,Architect,Designing a building,AI can help\n\
         t2,Architect,Designing a building,\n",
    )
    .unwrap();
    let output = dir.path().join("classified.csv");

    let pipeline = Pipeline::new(config, scripted_judge(), failing_factory());
    let report = pipeline.run_classification(&input, &output).await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.secondary_failures, 0);
    let rows = read_rows(&output);
    assert_eq!(rows[0]["ai_engagement_level"], "4");
    // A record without a summary is skipped, not failed.
    assert_eq!(rows[1]["ai_engagement_level"], "");
}
