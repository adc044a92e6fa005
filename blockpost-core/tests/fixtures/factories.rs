#![allow(dead_code)]

use crate::fixtures::{DEV_PRIVATE_KEY, SCENARIO_BLOCK_NUMBER, SCENARIO_MESSAGE, SCENARIO_REQUEST_ID};
use alloy::primitives::TxHash;
use blockpost_core::application::{LifecycleObserver, RegistrationOutcome, SkipReason, SubmissionOutcome, SubmitterSettings};
use blockpost_core::domain::{Request, RequestEvent, Response};
use blockpost_core::foundation::{ErrorClass, Nonce, OperatorError, RequestId};
use blockpost_core::infrastructure::keys::{OperatorIdentity, SecretBytes};
use blockpost_core::infrastructure::rpc::RetryPolicy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub fn dev_identity() -> Arc<OperatorIdentity> {
    Arc::new(OperatorIdentity::from_secret_bytes(&SecretBytes::new(DEV_PRIVATE_KEY.as_bytes().to_vec())).expect("dev identity"))
}

pub fn scenario_request() -> Request {
    Request::new(SCENARIO_REQUEST_ID, SCENARIO_BLOCK_NUMBER, SCENARIO_MESSAGE)
}

pub fn event_for(request: &Request) -> RequestEvent {
    RequestEvent::new(request.clone(), u64::from(request.block_number))
}

/// 100ms initial backoff doubling to a 1s cap; 2s confirmation timeout.
pub fn fast_submitter_settings(max_attempts: u32) -> SubmitterSettings {
    SubmitterSettings {
        policy: RetryPolicy::new(max_attempts, Duration::from_millis(100), Duration::from_secs(1)),
        confirmation_timeout: Duration::from_secs(2),
        max_sequence_resyncs: 3,
    }
}

/// Deterministic 64-bit LCG (Knuth MMIX constants) for seeded property loops.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn next_in(&mut self, low: u64, high_inclusive: u64) -> u64 {
        low + self.next_u64() % (high_inclusive - low + 1)
    }
}

/// Records every lifecycle hook for assertions.
#[derive(Default)]
pub struct RecordingObserver {
    state: Mutex<Recorded>,
}

#[derive(Default, Clone)]
pub struct Recorded {
    pub observed: Vec<RequestId>,
    pub skipped: Vec<(RequestId, SkipReason)>,
    pub signed: HashMap<RequestId, usize>,
    pub submitted: Vec<(String, Nonce, TxHash)>,
    pub retries: Vec<(String, u32, ErrorClass)>,
    pub completed: Vec<(RequestId, SubmissionOutcome)>,
    pub failed: Vec<(RequestId, String)>,
    pub registrations: Vec<RegistrationOutcome>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Recorded {
        self.state.lock().clone()
    }

    pub fn signed_count(&self, id: u32) -> usize {
        self.state.lock().signed.get(&RequestId::new(id)).copied().unwrap_or(0)
    }

    pub fn submitted_nonces(&self) -> Vec<Nonce> {
        self.state.lock().submitted.iter().map(|(_, nonce, _)| *nonce).collect()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_request_observed(&self, event: &RequestEvent) {
        self.state.lock().observed.push(event.request_id());
    }

    fn on_duplicate_skipped(&self, request_id: RequestId, reason: SkipReason) {
        self.state.lock().skipped.push((request_id, reason));
    }

    fn on_response_signed(&self, response: &Response) {
        *self.state.lock().signed.entry(response.request_id).or_default() += 1;
    }

    fn on_submitted(&self, label: &str, nonce: Nonce, tx_hash: &TxHash) {
        self.state.lock().submitted.push((label.to_string(), nonce, *tx_hash));
    }

    fn on_retry(&self, label: &str, attempt: u32, class: ErrorClass) {
        self.state.lock().retries.push((label.to_string(), attempt, class));
    }

    fn on_response_completed(&self, request_id: RequestId, outcome: &SubmissionOutcome) {
        self.state.lock().completed.push((request_id, outcome.clone()));
    }

    fn on_request_failed(&self, request_id: RequestId, error: &OperatorError) {
        self.state.lock().failed.push((request_id, error.to_string()));
    }

    fn on_registration(&self, outcome: &RegistrationOutcome) {
        self.state.lock().registrations.push(outcome.clone());
    }
}
