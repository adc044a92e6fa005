use crate::service::metrics::Metrics;
use blockpost_core::application::{
    CompositeObserver, LifecycleObserver, LoggingObserver, MonitorSettings, PollerSettings, RegistrationCoordinator,
    RegistrationOutcome, RegistrationSettings, RequestEventPoller, RequestMonitor, ResponseSigner, SubmitterSettings,
    TransactionSubmitter,
};
use blockpost_core::foundation::OperatorError;
use blockpost_core::infrastructure::config::AppConfig;
use blockpost_core::infrastructure::keys::OperatorIdentity;
use blockpost_core::infrastructure::rpc::{AlloyLedgerClient, LedgerClient};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// One operator node: registration plus the poll, sign, submit pipeline over a shared ledger client.
pub struct OperatorFlow {
    config: Arc<AppConfig>,
    ledger: Arc<dyn LedgerClient>,
    identity: Arc<OperatorIdentity>,
    submitter: Arc<TransactionSubmitter>,
    monitor: Arc<RequestMonitor>,
    metrics: Arc<Metrics>,
    lifecycle: Arc<dyn LifecycleObserver>,
}

impl OperatorFlow {
    /// Connects to the configured JSON-RPC endpoint, signing transactions with `identity`.
    pub fn connect(config: Arc<AppConfig>, identity: Arc<OperatorIdentity>) -> Result<Self, OperatorError> {
        let ledger =
            AlloyLedgerClient::<()>::connect_http(&config.ledger.rpc_url, identity.tx_signer()?, config.ledger.receipt_poll_interval())?;
        Self::new_with_ledger(config, ledger, identity)
    }

    pub fn new_with_ledger(
        config: Arc<AppConfig>,
        ledger: Arc<dyn LedgerClient>,
        identity: Arc<OperatorIdentity>,
    ) -> Result<Self, OperatorError> {
        let metrics = Arc::new(Metrics::new()?);
        let lifecycle: Arc<dyn LifecycleObserver> =
            Arc::new(CompositeObserver::new().with_observer(Arc::new(LoggingObserver)).with_observer(metrics.clone()));

        let submitter = Arc::new(
            TransactionSubmitter::new(
                ledger.clone(),
                identity.address(),
                config.contracts.service_manager,
                SubmitterSettings::from_config(&config),
            )
            .with_observer(lifecycle.clone()),
        );
        let monitor = Arc::new(
            RequestMonitor::new(ResponseSigner::new(identity.clone()), submitter.clone(), MonitorSettings::from_config(&config))
                .with_observer(lifecycle.clone()),
        );
        Ok(Self { config, ledger, identity, submitter, monitor, metrics, lifecycle })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn identity(&self) -> &OperatorIdentity {
        &self.identity
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn monitor(&self) -> &Arc<RequestMonitor> {
        &self.monitor
    }

    pub fn submitter(&self) -> &Arc<TransactionSubmitter> {
        &self.submitter
    }

    /// Runs the registration handshake unless the config opts out. Errors are fatal.
    pub async fn register(&self) -> Result<Option<RegistrationOutcome>, OperatorError> {
        if self.config.registration.skip {
            info!("registration skipped by configuration operator={}", self.identity.address());
            return Ok(None);
        }
        let coordinator = RegistrationCoordinator::new(
            self.ledger.clone(),
            self.identity.clone(),
            self.submitter.clone(),
            RegistrationSettings::from_config(&self.config),
        )
        .with_observer(self.lifecycle.clone());
        coordinator.register_operator().await.map(Some)
    }

    /// Polls for requests and answers them until `shutdown` flips to true or a fatal error occurs.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), OperatorError> {
        let (sender, receiver) = mpsc::channel(self.config.monitor.queue_capacity.max(1));
        let poller = RequestEventPoller::new(self.ledger.clone(), PollerSettings::from_config(&self.config));
        let poller_task = tokio::spawn(poller.run(sender, shutdown.clone()));
        info!(
            "operator pipeline started operator={} service_manager={} queue_capacity={}",
            self.identity.address(),
            self.config.contracts.service_manager,
            self.config.monitor.queue_capacity
        );

        let monitor_result = self.monitor.clone().run(receiver, shutdown).await;

        // A finished poller keeps its result; a running one is cancelled.
        poller_task.abort();
        let poller_result = match poller_task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(OperatorError::Message(format!("request poller panicked: {}", err))),
        };

        match (monitor_result, poller_result) {
            (Err(err), _) | (Ok(()), Err(err)) => {
                error!("operator pipeline stopped with error class={} error={}", err.class(), err);
                Err(err)
            }
            (Ok(()), Ok(())) => {
                info!("operator pipeline stopped");
                Ok(())
            }
        }
    }
}
