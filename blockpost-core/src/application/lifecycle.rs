use crate::application::registration::RegistrationOutcome;
use crate::application::submitter::SubmissionOutcome;
use crate::domain::{RequestEvent, Response};
use crate::foundation::util::hx;
use crate::foundation::{ErrorClass, Nonce, OperatorError, RequestId};
use alloy::primitives::TxHash;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Why an observed event was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another handler is processing this request right now.
    Pending,
    /// This process already finished the request.
    Completed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Pending => f.write_str("pending"),
            SkipReason::Completed => f.write_str("completed"),
        }
    }
}

/// Hooks for every stage of a request's life. All methods default to no-ops.
pub trait LifecycleObserver: Send + Sync {
    fn on_request_observed(&self, _event: &RequestEvent) {}
    fn on_duplicate_skipped(&self, _request_id: RequestId, _reason: SkipReason) {}
    fn on_response_signed(&self, _response: &Response) {}
    fn on_submitted(&self, _label: &str, _nonce: Nonce, _tx_hash: &TxHash) {}
    fn on_retry(&self, _label: &str, _attempt: u32, _class: ErrorClass) {}
    fn on_response_completed(&self, _request_id: RequestId, _outcome: &SubmissionOutcome) {}
    fn on_request_failed(&self, _request_id: RequestId, _error: &OperatorError) {}
    fn on_registration(&self, _outcome: &RegistrationOutcome) {}
}

pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

/// Fans every hook out to the registered observers in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.add_observer(observer);
        self
    }
}

impl LifecycleObserver for CompositeObserver {
    fn on_request_observed(&self, event: &RequestEvent) {
        for observer in &self.observers {
            observer.on_request_observed(event);
        }
    }

    fn on_duplicate_skipped(&self, request_id: RequestId, reason: SkipReason) {
        for observer in &self.observers {
            observer.on_duplicate_skipped(request_id, reason);
        }
    }

    fn on_response_signed(&self, response: &Response) {
        for observer in &self.observers {
            observer.on_response_signed(response);
        }
    }

    fn on_submitted(&self, label: &str, nonce: Nonce, tx_hash: &TxHash) {
        for observer in &self.observers {
            observer.on_submitted(label, nonce, tx_hash);
        }
    }

    fn on_retry(&self, label: &str, attempt: u32, class: ErrorClass) {
        for observer in &self.observers {
            observer.on_retry(label, attempt, class);
        }
    }

    fn on_response_completed(&self, request_id: RequestId, outcome: &SubmissionOutcome) {
        for observer in &self.observers {
            observer.on_response_completed(request_id, outcome);
        }
    }

    fn on_request_failed(&self, request_id: RequestId, error: &OperatorError) {
        for observer in &self.observers {
            observer.on_request_failed(request_id, error);
        }
    }

    fn on_registration(&self, outcome: &RegistrationOutcome) {
        for observer in &self.observers {
            observer.on_registration(outcome);
        }
    }
}

/// Emits the per-stage lifecycle log lines.
pub struct LoggingObserver;

impl LifecycleObserver for LoggingObserver {
    fn on_request_observed(&self, event: &RequestEvent) {
        info!(
            "request observed request_id={} block_number={} observed_block={} message_len={}",
            event.request.id,
            event.request.block_number,
            event.observed_block,
            event.request.message.len()
        );
    }

    fn on_duplicate_skipped(&self, request_id: RequestId, reason: SkipReason) {
        debug!("request skipped request_id={} reason={}", request_id, reason);
    }

    fn on_response_signed(&self, response: &Response) {
        info!("request signed request_id={} signature={:#}", response.request_id, hx(&response.signature));
    }

    fn on_submitted(&self, label: &str, nonce: Nonce, tx_hash: &TxHash) {
        info!("transaction submitted call={} nonce={} tx_hash={}", label, nonce, tx_hash);
    }

    fn on_retry(&self, label: &str, attempt: u32, class: ErrorClass) {
        warn!("submission retry call={} attempt={} class={}", label, attempt, class);
    }

    fn on_response_completed(&self, request_id: RequestId, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Confirmed(confirmation) => info!(
                "response confirmed request_id={} tx_hash={} block_number={:?} gas_used={}",
                request_id, confirmation.tx_hash, confirmation.block_number, confirmation.gas_used
            ),
            SubmissionOutcome::AlreadyRecorded => info!("response already recorded request_id={}", request_id),
        }
    }

    fn on_request_failed(&self, request_id: RequestId, err: &OperatorError) {
        error!("request failed request_id={} class={} reason={}", request_id, err.class(), err);
    }

    fn on_registration(&self, outcome: &RegistrationOutcome) {
        match outcome {
            RegistrationOutcome::Registered { tx_hash } => info!("registration succeeded tx_hash={}", tx_hash),
            RegistrationOutcome::AlreadyRegistered => info!("registration skipped: operator already registered"),
        }
    }
}
