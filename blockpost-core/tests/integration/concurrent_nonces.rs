use crate::fixtures::*;
use blockpost_core::application::{ResponseSigner, SubmissionOutcome};
use blockpost_core::infrastructure::rpc::ScriptedFailure;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_take_distinct_contiguous_nonces() {
    for seed in [3u64, 17, 101, 4242] {
        let mut rng = Lcg::new(seed);
        let count = rng.next_in(2, 12) as usize;
        let harness = HarnessBuilder::new().confirmation_delay(Duration::from_millis(rng.next_in(0, 3))).build();
        for _ in 0..rng.next_in(0, 3) {
            harness.ledger.script_send_failure(ScriptedFailure::SendTransport("connection reset by peer".to_string()));
        }

        let signer = ResponseSigner::new(harness.identity.clone());
        let responses: Vec<_> = (0..count)
            .map(|i| signer.sign(&harness.ledger.emit_request(format!("seed {} message {}", seed, i))).expect("sign"))
            .collect();

        let barrier = Arc::new(Barrier::new(count));
        let handles: Vec<_> = responses
            .into_iter()
            .map(|response| {
                let submitter = harness.submitter.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    submitter.submit(&response).await
                })
            })
            .collect();
        for handle in handles {
            let outcome = handle.await.expect("join").expect("submit");
            assert!(matches!(outcome, SubmissionOutcome::Confirmed(_)), "seed {}", seed);
        }

        // Sends are strictly ordered, so the ledger sees 0, 1, 2, ... with no gaps or reuse.
        let nonces: Vec<_> = harness.ledger.submitted().iter().map(|tx| tx.nonce).collect();
        assert_eq!(nonces, (0..count as u64).collect::<Vec<_>>(), "seed {}", seed);
        assert_eq!(harness.ledger.max_in_flight(), 1, "seed {}", seed);
        assert_eq!(harness.ledger.nonce_of(DEV_ADDRESS), count as u64);
        assert_eq!(harness.submitter.sequence().peek(), Some(count as u64));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simultaneous_requests_never_overlap_their_critical_sections() {
    let harness = HarnessBuilder::new().max_concurrency(2).confirmation_delay(Duration::from_millis(20)).build();
    let _warmup = harness.ledger.emit_request("request zero");
    let first = harness.ledger.emit_request("request one");
    let second = harness.ledger.emit_request("request two");
    assert_eq!((first.id.value(), second.id.value()), (1, 2));

    harness.run_events(vec![event_for(&first), event_for(&second)]).await.expect("monitor run");

    let mut nonces = harness.observer.submitted_nonces();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(harness.ledger.max_in_flight(), 1);
    for request in [&first, &second] {
        assert_eq!(harness.observer.signed_count(request.id.value()), 1);
        assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
    }
}
