use alloy::primitives::TxHash;
use blockpost_core::application::{LifecycleObserver, RegistrationOutcome, SkipReason, SubmissionOutcome};
use blockpost_core::domain::{RequestEvent, Response};
use blockpost_core::foundation::{ErrorClass, Nonce, OperatorError, RequestId};
use log::debug;
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub requests_observed: u64,
    pub duplicates_skipped: u64,
    pub responses_signed: u64,
    pub responses_confirmed: u64,
    pub responses_already_recorded: u64,
    pub responses_failed: u64,
    pub transactions_submitted: u64,
    pub submission_retries: u64,
}

/// Prometheus counters for the operator pipeline, fed through `LifecycleObserver`.
pub struct Metrics {
    registry: Registry,
    requests_observed_total: IntCounter,
    duplicates_skipped_total: IntCounterVec,
    responses_signed_total: IntCounter,
    responses_total: IntCounterVec,
    transactions_submitted_total: IntCounter,
    submission_retries_total: IntCounterVec,
    registrations_total: IntCounterVec,
    started_at: Instant,
    requests_observed: AtomicU64,
    duplicates_skipped: AtomicU64,
    responses_signed: AtomicU64,
    responses_confirmed: AtomicU64,
    responses_already_recorded: AtomicU64,
    responses_failed: AtomicU64,
    transactions_submitted: AtomicU64,
    submission_retries: AtomicU64,
}

fn metric_error(err: prometheus::Error) -> OperatorError {
    OperatorError::Message(format!("metrics: {}", err))
}

impl Metrics {
    pub fn new() -> Result<Self, OperatorError> {
        debug!("initializing prometheus metrics");
        let registry = Registry::new();
        let requests_observed_total =
            IntCounter::new("requests_observed_total", "Request events received from the ledger").map_err(metric_error)?;
        let duplicates_skipped_total = IntCounterVec::new(
            prometheus::Opts::new("duplicates_skipped_total", "Request events skipped as duplicates"),
            &["reason"],
        )
        .map_err(metric_error)?;
        let responses_signed_total = IntCounter::new("responses_signed_total", "Responses signed").map_err(metric_error)?;
        let responses_total =
            IntCounterVec::new(prometheus::Opts::new("responses_total", "Finished requests by outcome"), &["outcome"])
                .map_err(metric_error)?;
        let transactions_submitted_total =
            IntCounter::new("transactions_submitted_total", "Transactions accepted by the ledger node").map_err(metric_error)?;
        let submission_retries_total =
            IntCounterVec::new(prometheus::Opts::new("submission_retries_total", "Submission retries by error class"), &["class"])
                .map_err(metric_error)?;
        let registrations_total =
            IntCounterVec::new(prometheus::Opts::new("registrations_total", "Registration handshakes by outcome"), &["outcome"])
                .map_err(metric_error)?;

        registry.register(Box::new(requests_observed_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(duplicates_skipped_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(responses_signed_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(responses_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(transactions_submitted_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(submission_retries_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(registrations_total.clone())).map_err(metric_error)?;

        let out = Self {
            registry,
            requests_observed_total,
            duplicates_skipped_total,
            responses_signed_total,
            responses_total,
            transactions_submitted_total,
            submission_retries_total,
            registrations_total,
            started_at: Instant::now(),
            requests_observed: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            responses_signed: AtomicU64::new(0),
            responses_confirmed: AtomicU64::new(0),
            responses_already_recorded: AtomicU64::new(0),
            responses_failed: AtomicU64::new(0),
            transactions_submitted: AtomicU64::new(0),
            submission_retries: AtomicU64::new(0),
        };
        debug!("prometheus metrics registered metric_count=7");
        Ok(out)
    }

    fn inc_response(&self, outcome: &str) {
        self.responses_total.with_label_values(&[outcome]).inc();
        let counter = match outcome {
            "confirmed" => &self.responses_confirmed,
            "already_recorded" => &self.responses_already_recorded,
            _ => &self.responses_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.started_at.elapsed(),
            requests_observed: self.requests_observed.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            responses_signed: self.responses_signed.load(Ordering::Relaxed),
            responses_confirmed: self.responses_confirmed.load(Ordering::Relaxed),
            responses_already_recorded: self.responses_already_recorded.load(Ordering::Relaxed),
            responses_failed: self.responses_failed.load(Ordering::Relaxed),
            transactions_submitted: self.transactions_submitted.load(Ordering::Relaxed),
            submission_retries: self.submission_retries.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, OperatorError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer).map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|err| OperatorError::EncodingError(err.to_string()))
    }
}

impl LifecycleObserver for Metrics {
    fn on_request_observed(&self, _event: &RequestEvent) {
        self.requests_observed_total.inc();
        self.requests_observed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_duplicate_skipped(&self, _request_id: RequestId, reason: SkipReason) {
        self.duplicates_skipped_total.with_label_values(&[reason.to_string().as_str()]).inc();
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn on_response_signed(&self, _response: &Response) {
        self.responses_signed_total.inc();
        self.responses_signed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_submitted(&self, _label: &str, _nonce: Nonce, _tx_hash: &TxHash) {
        self.transactions_submitted_total.inc();
        self.transactions_submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn on_retry(&self, _label: &str, _attempt: u32, class: ErrorClass) {
        self.submission_retries_total.with_label_values(&[class.to_string().as_str()]).inc();
        self.submission_retries.fetch_add(1, Ordering::Relaxed);
    }

    fn on_response_completed(&self, _request_id: RequestId, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Confirmed(_) => self.inc_response("confirmed"),
            SubmissionOutcome::AlreadyRecorded => self.inc_response("already_recorded"),
        }
    }

    fn on_request_failed(&self, _request_id: RequestId, _error: &OperatorError) {
        self.inc_response("failed");
    }

    fn on_registration(&self, outcome: &RegistrationOutcome) {
        let label = match outcome {
            RegistrationOutcome::Registered { .. } => "registered",
            RegistrationOutcome::AlreadyRegistered => "already_registered",
        };
        self.registrations_total.with_label_values(&[label]).inc();
    }
}
