//! Concurrent dispatch of single-record judge calls.
//!
//! One task per unresolved record, bounded by a semaphore; every task sends
//! its `(id, result)` down an mpsc channel consumed by a single aggregating
//! loop, so no table is mutated by more than one worker. Completion order is
//! irrelevant, since results are keyed by record identity, and one record's
//! failure never blocks or aborts the others.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::debug;

use crate::errors::JudgeError;
use crate::model::{RecordId, TaskRecord};

/// Outcome of one dispatch run: resolved values plus the records that
/// failed this time around (sorted for deterministic logs).
#[derive(Debug)]
pub struct DispatchReport<T> {
    pub outcomes: HashMap<RecordId, T>,
    pub failures: Vec<RecordId>,
}

/// Run `op` once per record with at most `max_in_flight` calls in flight.
///
/// `sink` is invoked by the aggregating consumer for every completed record,
/// in completion order; the secondary stage uses it to merge results and
/// flush its checkpoint incrementally while the pool is still draining.
pub async fn dispatch<T, F, Fut>(
    records: &[TaskRecord],
    max_in_flight: usize,
    op: F,
    mut sink: impl FnMut(&RecordId, &Result<T, JudgeError>),
) -> DispatchReport<T>
where
    T: Send + 'static,
    F: Fn(TaskRecord) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, JudgeError>> + Send,
{
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut join_set = JoinSet::new();

    for record in records.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let op = op.clone();
        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let id = record.id.clone();
            let result = op(record).await;
            let _ = tx.send((id, result));
        });
    }
    drop(tx);

    let mut outcomes = HashMap::new();
    let mut failures = Vec::new();
    while let Some((id, result)) = rx.recv().await {
        sink(&id, &result);
        match result {
            Ok(value) => {
                outcomes.insert(id, value);
            }
            Err(err) => {
                debug!(record = %id, error = %err, "judge call failed");
                failures.push(id);
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    failures.sort();

    DispatchReport { outcomes, failures }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<TaskRecord> {
        (0..n)
            .map(|i| TaskRecord {
                id: RecordId::new(format!("t{i:03}")),
                title: "Architect".into(),
                task: "Designing a building".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn failing_subset_is_reported_exactly() {
        let input = records(50);
        let report = dispatch(
            &input,
            10,
            |record: TaskRecord| async move {
                // Every fifth record hits a scripted transient failure.
                if record.id.as_str().ends_with('0') || record.id.as_str().ends_with('5') {
                    Err(JudgeError::Transient("scripted outage".into()))
                } else {
                    Ok(record.id.as_str().to_string())
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(report.failures.len(), 10);
        assert!(report
            .failures
            .iter()
            .all(|id| id.as_str().ends_with('0') || id.as_str().ends_with('5')));
        assert_eq!(report.outcomes.len(), 40);
        // Each resolved record carries its own result.
        assert_eq!(report.outcomes[&RecordId::new("t001")], "t001");
    }

    #[tokio::test]
    async fn sink_sees_every_completion() {
        let input = records(20);
        let mut seen = 0usize;
        let mut sink_failures = 0usize;
        let report = dispatch(
            &input,
            4,
            |record: TaskRecord| async move {
                if record.id.as_str() == "t000" {
                    Err(JudgeError::Malformed("scripted".into()))
                } else {
                    Ok(())
                }
            },
            |_, result| {
                seen += 1;
                if result.is_err() {
                    sink_failures += 1;
                }
            },
        )
        .await;

        assert_eq!(seen, 20);
        assert_eq!(sink_failures, 1);
        assert_eq!(report.failures, vec![RecordId::new("t000")]);
    }

    #[tokio::test]
    async fn in_flight_count_stays_bounded() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let input = records(32);

        let in_flight_op = Arc::clone(&in_flight);
        let peak_op = Arc::clone(&peak);
        let report = dispatch(
            &input,
            4,
            move |_record: TaskRecord| {
                let in_flight = Arc::clone(&in_flight_op);
                let peak = Arc::clone(&peak_op);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(report.outcomes.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }
}
