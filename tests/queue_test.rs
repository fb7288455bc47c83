//! Integration tests for the command queue.

use std::collections::HashSet;
use std::sync::Arc;

use mcq::{CommandQueue, Error, Metadata, Status};
use serde_json::json;

fn meta(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("metadata must be an object, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[test]
fn submit_records_pending_command() {
    let queue = CommandQueue::new();

    let id = queue
        .submit("say hello", meta(json!({"source": "unit-test"})))
        .unwrap();

    let recent = queue.recent(1).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, id);
    assert_eq!(recent[0].status, Status::Pending);
    assert_eq!(recent[0].text, "say hello");
    assert_eq!(recent[0].metadata["source"], "unit-test");
    assert!(recent[0].result.is_none());
    assert!(recent[0].finalized_at.is_none());
}

#[test]
fn empty_submit_is_rejected_without_side_effects() {
    let queue = CommandQueue::new();
    queue.submit("say before", Metadata::new()).unwrap();

    let result = queue.submit("", Metadata::new());
    assert!(matches!(result, Err(Error::InvalidCommand(_))));

    assert_eq!(queue.history_len(), 1);
    assert_eq!(queue.pending_len(), 1);
}

#[test]
fn whitespace_text_is_queued_verbatim() {
    let queue = CommandQueue::new();

    let id = queue.submit("   ", Metadata::new()).unwrap();

    let command = queue.get(id).unwrap();
    assert_eq!(command.text, "   ");
    assert_eq!(command.status, Status::Pending);
    assert_eq!(queue.pending_len(), 1);
}

#[test]
fn ids_are_distinct_and_order_is_stable() {
    let queue = CommandQueue::new();

    let ids: Vec<_> = (0..200)
        .map(|i| queue.submit(format!("say {i}"), Metadata::new()).unwrap())
        .collect();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());

    let history = queue.recent(200).unwrap();
    for window in history.windows(2) {
        // most recent first
        assert!(window[0].seq > window[1].seq);
        assert!(window[0].submitted_at >= window[1].submitted_at);
    }
    assert_eq!(history.last().unwrap().seq, 1);
}

// ---------------------------------------------------------------------------
// Draining
// ---------------------------------------------------------------------------

#[test]
fn drain_returns_submission_order_and_recent_is_reversed() {
    let queue = CommandQueue::new();

    let a = queue.submit("A", Metadata::new()).unwrap();
    let b = queue.submit("B", Metadata::new()).unwrap();
    let c = queue.submit("C", Metadata::new()).unwrap();

    let drained: Vec<_> = queue.drain_pending().into_iter().map(|c| c.id).collect();
    assert_eq!(drained, [a, b, c]);

    let recent: Vec<_> = queue.recent(2).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(recent, [c, b]);
}

#[test]
fn second_drain_is_empty() {
    let queue = CommandQueue::new();
    queue.submit("say once", Metadata::new()).unwrap();

    assert_eq!(queue.drain_pending().len(), 1);
    assert!(queue.drain_pending().is_empty());

    // Drained commands stay in history.
    assert_eq!(queue.history_len(), 1);
    assert_eq!(queue.pending_len(), 0);
}

// ---------------------------------------------------------------------------
// Result correlation
// ---------------------------------------------------------------------------

#[test]
fn success_report_completes_command() {
    let queue = CommandQueue::new();
    let id = queue.submit("A", Metadata::new()).unwrap();
    queue.drain_pending();

    queue.report_result(id, true, json!({"x": 1})).unwrap();

    let recent = queue.recent(1).unwrap();
    assert_eq!(recent[0].status, Status::Completed);
    assert_eq!(recent[0].result, Some(json!({"x": 1})));
    assert!(recent[0].finalized_at.unwrap() >= recent[0].submitted_at);
}

#[test]
fn failure_report_fails_command() {
    let queue = CommandQueue::new();
    let id = queue.submit("give @p diamond 64", Metadata::new()).unwrap();

    let command = queue
        .report_result(id, false, json!("no player found"))
        .unwrap();

    assert_eq!(command.status, Status::Failed);
    assert_eq!(queue.get(id).unwrap().result, Some(json!("no player found")));
}

#[test]
fn double_report_is_rejected_and_first_outcome_kept() {
    let queue = CommandQueue::new();
    let id = queue.submit("A", Metadata::new()).unwrap();

    queue.report_result(id, true, json!({"x": 1})).unwrap();

    for success in [true, false] {
        let again = queue.report_result(id, success, json!({"x": 2}));
        assert!(matches!(
            again,
            Err(Error::AlreadyFinalized {
                status: Status::Completed,
                ..
            })
        ));
    }

    let stored = queue.get(id).unwrap();
    assert_eq!(stored.status, Status::Completed);
    assert_eq!(stored.result, Some(json!({"x": 1})));
}

#[test]
fn unknown_report_leaves_history_untouched() {
    let queue = CommandQueue::new();
    queue.submit("A", Metadata::new()).unwrap();
    queue.submit("B", Metadata::new()).unwrap();
    let before = queue.recent(10).unwrap();

    let stranger = mcq::CommandId::new();
    let result = queue.report_result(stranger, true, json!(null));
    assert!(matches!(result, Err(Error::UnknownCommand(id)) if id == stranger));

    assert_eq!(queue.recent(10).unwrap(), before);
    assert!(matches!(queue.get(stranger), Err(Error::UnknownCommand(_))));
}

#[test]
fn report_before_drain_withdraws_the_command() {
    let queue = CommandQueue::new();
    let a = queue.submit("A", Metadata::new()).unwrap();
    let b = queue.submit("B", Metadata::new()).unwrap();

    queue.report_result(a, true, json!("ok")).unwrap();
    assert_eq!(queue.pending_len(), 1);

    // Only the unfinished command reaches the executor.
    let drained: Vec<_> = queue.drain_pending().into_iter().map(|c| c.id).collect();
    assert_eq!(drained, [b]);
    assert_eq!(queue.get(a).unwrap().status, Status::Completed);
    assert_eq!(queue.history_len(), 2);
}

// ---------------------------------------------------------------------------
// History reads
// ---------------------------------------------------------------------------

#[test]
fn recent_rejects_non_positive_limits() {
    let queue = CommandQueue::new();
    queue.submit("A", Metadata::new()).unwrap();

    assert!(matches!(queue.recent(0), Err(Error::InvalidArgument(_))));
    assert!(matches!(queue.recent(-1), Err(Error::InvalidArgument(_))));
}

#[test]
fn recent_larger_than_history_returns_everything() {
    let queue = CommandQueue::new();
    assert!(queue.recent(5).unwrap().is_empty());

    queue.submit("A", Metadata::new()).unwrap();
    queue.submit("B", Metadata::new()).unwrap();
    assert_eq!(queue.recent(i64::MAX).unwrap().len(), 2);
}

#[test]
fn history_order_is_submission_order_not_completion_order() {
    let queue = CommandQueue::new();
    let a = queue.submit("A", Metadata::new()).unwrap();
    let b = queue.submit("B", Metadata::new()).unwrap();

    queue.report_result(b, true, json!(null)).unwrap();
    queue.report_result(a, true, json!(null)).unwrap();

    let recent: Vec<_> = queue.recent(2).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(recent, [b, a]);
}

#[test]
fn command_serializes_with_snake_case_status() {
    let queue = CommandQueue::new();
    let id = queue.submit("say hi", Metadata::new()).unwrap();

    let value = serde_json::to_value(queue.get(id).unwrap()).unwrap();
    assert_eq!(value["status"], "pending");
    assert_eq!(value["id"], id.to_string());
    assert_eq!(value["result"], serde_json::Value::Null);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_submits_are_unique_and_all_recorded() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;
    let queue = Arc::new(CommandQueue::new());

    let ids: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let queue = Arc::clone(&queue);
                s.spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| {
                            queue
                                .submit(format!("say {t}-{i}"), Metadata::new())
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total = THREADS * PER_THREAD;
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), total);

    let recorded: HashSet<_> = queue
        .recent(total as i64)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(recorded, unique);
}

#[test]
fn drain_racing_submit_loses_and_duplicates_nothing() {
    const TOTAL: usize = 500;
    let queue = Arc::new(CommandQueue::new());

    let drained: Vec<_> = std::thread::scope(|s| {
        let producer = {
            let queue = Arc::clone(&queue);
            s.spawn(move || {
                for i in 0..TOTAL {
                    queue.submit(format!("say {i}"), Metadata::new()).unwrap();
                }
            })
        };

        let mut drained = Vec::new();
        while !producer.is_finished() {
            drained.extend(queue.drain_pending());
        }
        producer.join().unwrap();
        drained.extend(queue.drain_pending());
        drained
    });

    assert_eq!(drained.len(), TOTAL);
    let unique: HashSet<_> = drained.iter().map(|c| c.id).collect();
    assert_eq!(unique.len(), TOTAL);
    for window in drained.windows(2) {
        assert!(window[0].seq < window[1].seq);
    }
}

#[tokio::test]
async fn notified_wakes_after_submit() {
    let queue = Arc::new(CommandQueue::new());

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue.notified().await;
            queue.drain_pending().len()
        })
    };

    queue.submit("say wake", Metadata::new()).unwrap();

    let drained = tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
        .await
        .expect("waiter should wake")
        .unwrap();
    assert_eq!(drained, 1);
}
