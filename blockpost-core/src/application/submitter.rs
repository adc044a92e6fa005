use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::domain::Response;
use crate::foundation::{ErrorClass, Nonce, OperatorError};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::rpc::contracts::respond_to_request_calldata;
use crate::infrastructure::rpc::{Confirmation, LedgerClient, LedgerTransaction, RetryPolicy};
use alloy::primitives::{Address, Bytes, TxHash};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Owner of the operator account's next sequence number.
///
/// Only one `SequenceLease` exists at a time; holding it is the critical section around
/// "acquire nonce, send, wait for confirmation".
#[derive(Clone)]
pub struct SequenceNumberManager {
    ledger: Arc<dyn LedgerClient>,
    account: Address,
    next: Arc<Mutex<Option<Nonce>>>,
}

impl SequenceNumberManager {
    pub fn new(ledger: Arc<dyn LedgerClient>, account: Address) -> Self {
        Self { ledger, account, next: Arc::new(Mutex::new(None)) }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Waits for exclusive use of the sequence number. A cold cache is filled from the ledger's
    /// pending nonce.
    pub async fn lease(&self) -> Result<SequenceLease, OperatorError> {
        let mut guard = self.next.clone().lock_owned().await;
        let nonce = match *guard {
            Some(nonce) => nonce,
            None => {
                let nonce = self.ledger.pending_nonce(self.account).await?;
                debug!("sequence number loaded from ledger account={} nonce={}", self.account, nonce);
                *guard = Some(nonce);
                nonce
            }
        };
        Ok(SequenceLease { guard, nonce })
    }

    /// Cached next nonce, if known and not currently leased.
    pub fn peek(&self) -> Option<Nonce> {
        self.next.try_lock().ok().and_then(|guard| *guard)
    }
}

/// Exclusive reservation of one sequence number. Dropping it leaves the nonce unconsumed.
pub struct SequenceLease {
    guard: OwnedMutexGuard<Option<Nonce>>,
    nonce: Nonce,
}

impl SequenceLease {
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// The leased nonce was consumed on the ledger; the lease moves to the next one.
    pub fn advance(&mut self) {
        self.nonce = self.nonce.saturating_add(1);
        *self.guard = Some(self.nonce);
    }

    /// The nonce was consumed on the ledger; releases the lease.
    pub fn commit(mut self) {
        self.advance();
    }

    /// The ledger's view is unknown; the next lease re-reads it.
    pub fn invalidate(mut self) {
        *self.guard = None;
    }
}

/// A contract write to push through the sequenced submission path.
#[derive(Clone, Debug)]
pub struct SubmissionCall {
    pub to: Address,
    pub input: Bytes,
    /// Short description used in logs and metrics, e.g. `respondToRequest request_id=7`.
    pub label: String,
}

impl SubmissionCall {
    pub fn new(to: Address, input: Bytes, label: impl Into<String>) -> Self {
        Self { to, input, label: label.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed(Confirmation),
    /// The ledger reported that the effect already exists.
    AlreadyRecorded,
}

#[derive(Clone, Copy, Debug)]
pub struct SubmitterSettings {
    pub policy: RetryPolicy,
    pub confirmation_timeout: Duration,
    pub max_sequence_resyncs: u32,
}

impl SubmitterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: config.submission.retry_policy(),
            confirmation_timeout: config.ledger.confirmation_timeout(),
            max_sequence_resyncs: config.submission.max_sequence_resyncs,
        }
    }
}

impl Default for SubmitterSettings {
    fn default() -> Self {
        Self { policy: RetryPolicy::default(), confirmation_timeout: Duration::from_secs(120), max_sequence_resyncs: 3 }
    }
}

/// Transactions sent at the currently leased nonce whose fate is not yet known.
///
/// While this is non-empty the nonce must not move: the node may already hold one of them in
/// its mempool, and a fresh nonce would put a second copy of the call on the ledger.
#[derive(Debug, Default)]
struct Unsettled {
    sent: Vec<TxHash>,
    /// A send failed in a way that does not tell whether the node accepted it.
    ambiguous: bool,
}

impl Unsettled {
    fn is_empty(&self) -> bool {
        self.sent.is_empty() && !self.ambiguous
    }

    fn clear(&mut self) {
        self.sent.clear();
        self.ambiguous = false;
    }
}

/// Sends signed responses (and registration writes) with ordered nonces, bounded retries and
/// duplicate-as-success semantics.
///
/// Once a send may have reached the node, the lease is held across retries until the nonce is
/// known to be mined or free, so one account never has two unconfirmed reservations.
pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
    sequence: SequenceNumberManager,
    service_manager: Address,
    settings: SubmitterSettings,
    observer: Arc<dyn LifecycleObserver>,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, account: Address, service_manager: Address, settings: SubmitterSettings) -> Self {
        let sequence = SequenceNumberManager::new(ledger.clone(), account);
        Self { ledger, sequence, service_manager, settings, observer: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn sequence(&self) -> &SequenceNumberManager {
        &self.sequence
    }

    pub fn settings(&self) -> &SubmitterSettings {
        &self.settings
    }

    pub async fn submit(&self, response: &Response) -> Result<SubmissionOutcome, OperatorError> {
        let call = SubmissionCall::new(
            self.service_manager,
            respond_to_request_calldata(response),
            format!("respondToRequest request_id={}", response.request_id),
        );
        self.submit_call(call).await
    }

    pub async fn submit_call(&self, call: SubmissionCall) -> Result<SubmissionOutcome, OperatorError> {
        let started = Instant::now();
        let policy = self.settings.policy;
        let max_attempts = policy.max_attempts.max(1);
        let mut transient_failures = 0u32;
        let mut resyncs = 0u32;
        let mut lease: Option<SequenceLease> = None;
        let mut unsettled = Unsettled::default();

        loop {
            let acquired = match lease.take() {
                Some(held) => Ok(held),
                None => self.sequence.lease().await,
            };
            let result = match acquired {
                Ok(mut held) => {
                    let result = self.attempt(&call, &mut held, &mut unsettled).await;
                    lease = Some(held);
                    result
                }
                Err(err) => Err(err),
            };
            let err = match result {
                Ok(outcome) => {
                    debug!(
                        "submission finished call={} transient_failures={} resyncs={} elapsed_ms={}",
                        call.label,
                        transient_failures,
                        resyncs,
                        started.elapsed().as_millis()
                    );
                    release(lease.take(), &unsettled);
                    return Ok(outcome);
                }
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::IdempotentSuccess => {
                    info!("submission already recorded on ledger call={} details={}", call.label, err);
                    release(lease.take(), &unsettled);
                    return Ok(SubmissionOutcome::AlreadyRecorded);
                }
                ErrorClass::SequenceConflict => {
                    // Nothing of ours is outstanding at this point; re-read the nonce.
                    if let Some(held) = lease.take() {
                        held.invalidate();
                    }
                    resyncs += 1;
                    if resyncs > self.settings.max_sequence_resyncs {
                        return Err(OperatorError::RetriesExhausted {
                            operation: call.label.clone(),
                            attempts: resyncs,
                            last_error: err.to_string(),
                        });
                    }
                    warn!("sequence conflict; re-acquiring nonce call={} resync={} error={}", call.label, resyncs, err);
                    self.observer.on_retry(&call.label, resyncs, ErrorClass::SequenceConflict);
                }
                ErrorClass::Transient => {
                    transient_failures += 1;
                    if transient_failures >= max_attempts {
                        warn!("submission retries exhausted call={} attempts={} error={}", call.label, transient_failures, err);
                        release(lease.take(), &unsettled);
                        return Err(OperatorError::RetriesExhausted {
                            operation: call.label.clone(),
                            attempts: transient_failures,
                            last_error: err.to_string(),
                        });
                    }
                    if unsettled.is_empty() {
                        drop(lease.take());
                    }
                    let delay = policy.backoff_for(transient_failures);
                    warn!(
                        "transient submission failure call={} attempt={} max_attempts={} backoff_ms={} holding_nonce={} error={}",
                        call.label,
                        transient_failures,
                        max_attempts,
                        delay.as_millis(),
                        lease.is_some(),
                        err
                    );
                    self.observer.on_retry(&call.label, transient_failures, ErrorClass::Transient);
                    tokio::time::sleep(delay).await;
                }
                ErrorClass::Terminal | ErrorClass::Fatal => {
                    release(lease.take(), &unsettled);
                    return Err(err);
                }
            }
        }
    }

    /// One pass through the critical section: settle earlier sends, then send and confirm.
    async fn attempt(
        &self,
        call: &SubmissionCall,
        lease: &mut SequenceLease,
        unsettled: &mut Unsettled,
    ) -> Result<SubmissionOutcome, OperatorError> {
        if let Some(confirmation) = self.find_receipt(&unsettled.sent).await? {
            debug!("earlier send mined call={} nonce={} tx_hash={}", call.label, lease.nonce(), confirmation.tx_hash);
            return settle(lease, unsettled, confirmation);
        }

        let nonce = lease.nonce();
        let tx = LedgerTransaction { from: self.sequence.account(), to: call.to, input: call.input.clone(), nonce };
        let tx_hash = match self.ledger.send_transaction(tx).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                return match err.class() {
                    ErrorClass::Transient => {
                        unsettled.ambiguous = true;
                        Err(err)
                    }
                    ErrorClass::SequenceConflict if !unsettled.is_empty() => self.recheck_nonce(call, lease, unsettled, err).await,
                    _ => Err(err),
                };
            }
        };
        unsettled.sent.push(tx_hash);
        self.observer.on_submitted(&call.label, nonce, &tx_hash);

        let confirmation = self.ledger.wait_for_confirmation(tx_hash, self.settings.confirmation_timeout).await?;
        settle(lease, unsettled, confirmation)
    }

    /// The node refused the leased nonce while an earlier send at it is unsettled.
    ///
    /// If the nonce has been mined, the earlier send is looked up; when it is not ours the
    /// conflict is returned and the nonce is re-read. Otherwise the earlier send is still
    /// pending and the caller waits with the nonce held.
    async fn recheck_nonce(
        &self,
        call: &SubmissionCall,
        lease: &mut SequenceLease,
        unsettled: &mut Unsettled,
        conflict: OperatorError,
    ) -> Result<SubmissionOutcome, OperatorError> {
        let confirmed = self.ledger.confirmed_nonce(self.sequence.account()).await?;
        if confirmed <= lease.nonce() {
            info!("earlier send still pending call={} nonce={} conflict={}", call.label, lease.nonce(), conflict);
            return Err(OperatorError::transport(
                call.label.clone(),
                format!("nonce {} held by an unconfirmed transaction", lease.nonce()),
            ));
        }
        if let Some(confirmation) = self.find_receipt(&unsettled.sent).await? {
            return settle(lease, unsettled, confirmation);
        }
        debug!("leased nonce consumed elsewhere call={} nonce={} confirmed_nonce={}", call.label, lease.nonce(), confirmed);
        unsettled.clear();
        Err(conflict)
    }

    async fn find_receipt(&self, sent: &[TxHash]) -> Result<Option<Confirmation>, OperatorError> {
        for tx_hash in sent {
            if let Some(confirmation) = self.ledger.transaction_receipt(*tx_hash).await? {
                return Ok(Some(confirmation));
            }
        }
        Ok(None)
    }
}

/// A send at the leased nonce was mined: the nonce is consumed whatever the outcome.
fn settle(lease: &mut SequenceLease, unsettled: &mut Unsettled, confirmation: Confirmation) -> Result<SubmissionOutcome, OperatorError> {
    lease.advance();
    unsettled.clear();
    if confirmation.success {
        Ok(SubmissionOutcome::Confirmed(confirmation))
    } else {
        Err(OperatorError::Reverted { tx_hash: confirmation.tx_hash.to_string() })
    }
}

/// Gives up the lease. A nonce left unsettled is forgotten so the next lease reads the ledger.
fn release(lease: Option<SequenceLease>, unsettled: &Unsettled) {
    match lease {
        Some(held) if !unsettled.is_empty() => held.invalidate(),
        Some(held) => drop(held),
        None => {}
    }
}
