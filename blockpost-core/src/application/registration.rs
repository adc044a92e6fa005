use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::application::submitter::{SubmissionCall, SubmissionOutcome, TransactionSubmitter};
use crate::domain::RegistrationParams;
use crate::foundation::util::now_secs;
use crate::foundation::OperatorError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::keys::OperatorIdentity;
use crate::infrastructure::rpc::contracts::{
    decode_bool, decode_word, is_operator_calldata, operator_registered_calldata, register_as_operator_calldata,
    register_operator_calldata, registration_digest_calldata,
};
use crate::infrastructure::rpc::{retry_transient, LedgerClient, RetryPolicy};
use alloy::primitives::{Address, Bytes, TxHash};
use log::{debug, info};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered { tx_hash: TxHash },
    AlreadyRegistered,
}

#[derive(Clone, Debug)]
pub struct RegistrationSettings {
    pub service_manager: Address,
    pub stake_registry: Address,
    pub avs_directory: Address,
    pub delegation_manager: Option<Address>,
    pub register_with_delegation_manager: bool,
    pub metadata_uri: String,
    pub expiry_window_secs: u64,
    pub read_policy: RetryPolicy,
}

impl RegistrationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let submission = &config.submission;
        Self {
            service_manager: config.contracts.service_manager,
            stake_registry: config.contracts.stake_registry,
            avs_directory: config.contracts.avs_directory,
            delegation_manager: config.contracts.delegation_manager,
            register_with_delegation_manager: config.registration.register_with_delegation_manager,
            metadata_uri: config.registration.metadata_uri.clone(),
            expiry_window_secs: config.registration.expiry_window_secs,
            read_policy: RetryPolicy::new(
                config.registration.read_max_attempts,
                std::time::Duration::from_millis(submission.initial_backoff_ms),
                std::time::Duration::from_millis(submission.max_backoff_ms),
            ),
        }
    }
}

/// Runs the one-time handshake that makes the operator eligible to respond.
///
/// salt + expiry, directory digest, raw-digest signature, `registerOperatorWithSignature`.
/// Every failure that escapes is fatal; "already registered" is success.
pub struct RegistrationCoordinator {
    ledger: Arc<dyn LedgerClient>,
    identity: Arc<OperatorIdentity>,
    submitter: Arc<TransactionSubmitter>,
    settings: RegistrationSettings,
    observer: Arc<dyn LifecycleObserver>,
}

impl RegistrationCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<OperatorIdentity>,
        submitter: Arc<TransactionSubmitter>,
        settings: RegistrationSettings,
    ) -> Self {
        Self { ledger, identity, submitter, settings, observer: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn register_operator(&self) -> Result<RegistrationOutcome, OperatorError> {
        let operator = self.identity.address();
        info!(
            "registration started operator={} stake_registry={} avs={}",
            operator, self.settings.stake_registry, self.settings.service_manager
        );
        let outcome = self.run(operator).await.map_err(|err| into_fatal("registration", err))?;
        self.observer.on_registration(&outcome);
        Ok(outcome)
    }

    async fn run(&self, operator: Address) -> Result<RegistrationOutcome, OperatorError> {
        if self.settings.register_with_delegation_manager {
            self.ensure_delegation_operator(operator).await?;
        }

        if self.read_bool("operatorRegistered", self.settings.stake_registry, operator_registered_calldata(operator)).await? {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let params = RegistrationParams::fresh(operator, self.settings.service_manager, now_secs(), self.settings.expiry_window_secs)?;
        let digest_call = registration_digest_calldata(params.operator, params.service, params.salt, params.expiry);
        let output = self.read("calculateOperatorAVSRegistrationDigestHash", self.settings.avs_directory, digest_call).await?;
        let digest = decode_word("calculateOperatorAVSRegistrationDigestHash", &output)?;
        debug!("registration digest fetched digest={} salt={} expiry={}", digest, params.salt, params.expiry);

        let signature = self.identity.sign_digest(&digest)?;
        let operator_signature = params.into_signature(signature);
        let call = SubmissionCall::new(
            self.settings.stake_registry,
            register_operator_calldata(&operator_signature, operator),
            "registerOperatorWithSignature",
        );
        match self.submitter.submit_call(call).await? {
            SubmissionOutcome::Confirmed(confirmation) => Ok(RegistrationOutcome::Registered { tx_hash: confirmation.tx_hash }),
            SubmissionOutcome::AlreadyRecorded => Ok(RegistrationOutcome::AlreadyRegistered),
        }
    }

    async fn ensure_delegation_operator(&self, operator: Address) -> Result<(), OperatorError> {
        let manager = self.settings.delegation_manager.ok_or_else(|| OperatorError::MissingConfig {
            field: "contracts.delegation_manager".to_string(),
        })?;
        if self.read_bool("isOperator", manager, is_operator_calldata(operator)).await? {
            debug!("delegation manager already lists operator operator={}", operator);
            return Ok(());
        }
        info!("registering with delegation manager operator={} manager={}", operator, manager);
        let call = SubmissionCall::new(manager, register_as_operator_calldata(operator, &self.settings.metadata_uri), "registerAsOperator");
        match self.submitter.submit_call(call).await? {
            SubmissionOutcome::Confirmed(confirmation) => {
                info!("delegation manager registration confirmed tx_hash={}", confirmation.tx_hash)
            }
            SubmissionOutcome::AlreadyRecorded => info!("delegation manager reports operator already registered"),
        }
        Ok(())
    }

    async fn read(&self, operation: &str, to: Address, input: Bytes) -> Result<Bytes, OperatorError> {
        retry_transient(&self.settings.read_policy, operation, || self.ledger.call(to, input.clone())).await
    }

    async fn read_bool(&self, operation: &str, to: Address, input: Bytes) -> Result<bool, OperatorError> {
        let output = self.read(operation, to, input).await?;
        decode_bool(operation, &output)
    }
}

fn into_fatal(step: &str, err: OperatorError) -> OperatorError {
    if err.is_fatal() {
        err
    } else {
        OperatorError::Registration(format!("{} failed ({}): {}", step, err.class(), err))
    }
}
