use crate::fixtures::*;
use blockpost_core::application::{PollerSettings, RequestEventPoller, SkipReason};
use blockpost_core::infrastructure::config::StartBlock;
use blockpost_core::infrastructure::rpc::ScriptedFailure;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[tokio::test]
async fn duplicate_events_while_pending_are_signed_once() {
    let harness = HarnessBuilder::new().confirmation_delay(Duration::from_millis(50)).build();
    let request = harness.ledger.emit_request("only once");

    harness.run_events(vec![event_for(&request), event_for(&request), event_for(&request)]).await.expect("monitor run");

    assert_eq!(harness.observer.signed_count(request.id.value()), 1);
    assert_eq!(harness.ledger.submitted().len(), 1);
    assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
    let recorded = harness.observer.snapshot();
    assert_eq!(recorded.observed.len(), 3);
    assert_eq!(recorded.skipped, vec![(request.id, SkipReason::Pending), (request.id, SkipReason::Pending)]);
}

#[tokio::test]
async fn redelivery_after_completion_is_ignored() {
    let harness = HarnessBuilder::new().build();
    let request = harness.ledger.emit_request("finished");

    harness.run_events(vec![event_for(&request)]).await.expect("first run");
    harness.run_events(vec![event_for(&request)]).await.expect("second run");

    assert_eq!(harness.observer.signed_count(request.id.value()), 1);
    assert_eq!(harness.ledger.submitted().len(), 1);
    assert_eq!(harness.observer.snapshot().skipped, vec![(request.id, SkipReason::Completed)]);
}

#[tokio::test(start_paused = true)]
async fn redelivery_after_a_failed_attempt_is_processed_again() {
    let harness = HarnessBuilder::new().submitter_settings(fast_submitter_settings(2)).build();
    let request = harness.ledger.emit_request("try again later");
    for _ in 0..2 {
        harness.ledger.script_send_failure(ScriptedFailure::SendTransport("connection refused".to_string()));
    }

    harness.run_events(vec![event_for(&request)]).await.expect("first run");
    assert!(!harness.monitor.tracker().is_pending(request.id));
    assert!(!harness.monitor.tracker().is_completed(request.id));
    assert_eq!(harness.observer.snapshot().failed.len(), 1);

    harness.run_events(vec![event_for(&request)]).await.expect("second run");
    assert!(harness.monitor.tracker().is_completed(request.id));
    assert_eq!(harness.observer.signed_count(request.id.value()), 2);
    assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
}

#[tokio::test]
async fn duplicated_logs_from_the_poller_are_answered_once() {
    let harness = HarnessBuilder::new().build();
    let first = harness.ledger.emit_request("first");
    let second = harness.ledger.emit_request("second");
    assert!(harness.ledger.redeliver_request(first.id));

    let settings = PollerSettings {
        service_manager: SERVICE_MANAGER,
        start_block: StartBlock::Number(0),
        poll_interval: Duration::from_millis(10),
        max_block_range: 1,
    };
    let mut poller = RequestEventPoller::new(harness.ledger.clone(), settings);
    let (tx, rx) = mpsc::channel(8);
    assert_eq!(poller.poll_once(&tx).await.expect("poll"), 3);
    drop(tx);

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    harness.monitor.clone().run(rx, shutdown_rx).await.expect("monitor run");

    for request in [&first, &second] {
        assert_eq!(harness.observer.signed_count(request.id.value()), 1);
        assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
    }
    assert_eq!(harness.observer.snapshot().skipped.len(), 1);
}

#[tokio::test]
async fn shutdown_signal_stops_the_pipeline_after_in_flight_work() {
    let harness = HarnessBuilder::new().confirmation_delay(Duration::from_millis(20)).build();
    let request = harness.ledger.emit_request("in flight at shutdown");

    let (tx, rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = tokio::spawn(harness.monitor.clone().run(rx, shutdown_rx));
    tx.send(event_for(&request)).await.expect("send");
    while harness.observer.signed_count(request.id.value()) == 0 {
        tokio::task::yield_now().await;
    }
    shutdown_tx.send(true).expect("signal shutdown");

    monitor.await.expect("join").expect("monitor run");
    assert!(harness.monitor.tracker().is_completed(request.id));
    assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
}

#[tokio::test]
async fn shutdown_is_honoured_while_every_worker_is_busy() {
    let harness = HarnessBuilder::new().max_concurrency(1).confirmation_delay(Duration::from_millis(300)).build();
    let busy = harness.ledger.emit_request("holds the only worker");
    let waiting = harness.ledger.emit_request("waits for a worker");

    let (tx, rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = tokio::spawn(harness.monitor.clone().run(rx, shutdown_rx));
    tx.send(event_for(&busy)).await.expect("send");
    tx.send(event_for(&waiting)).await.expect("send");
    while harness.observer.signed_count(busy.id.value()) == 0 || harness.observer.snapshot().observed.len() < 2 {
        tokio::task::yield_now().await;
    }
    shutdown_tx.send(true).expect("signal shutdown");

    monitor.await.expect("join").expect("monitor run");
    assert!(harness.monitor.tracker().is_completed(busy.id));
    assert_eq!(harness.observer.signed_count(waiting.id.value()), 0);
    assert!(!harness.monitor.tracker().is_pending(waiting.id));
    assert!(!harness.monitor.tracker().is_completed(waiting.id));
    assert!(harness.ledger.responders(waiting.id).is_empty());
}
