use blockpost_core::foundation::OperatorError;
use blockpost_core::infrastructure::config::{AppConfig, KeySource};
use blockpost_core::infrastructure::keys::{EnvSecretStore, FileSecretStore, OperatorIdentity};
use blockpost_core::infrastructure::logging::init_logger;
use blockpost_core::infrastructure::rpc::redact_url;
use log::{info, warn};

pub fn init_logging(app_config: &AppConfig) -> Result<(), OperatorError> {
    init_logger(app_config.logging.log_dir.as_deref(), &app_config.logging.filters)
}

pub async fn load_identity(app_config: &AppConfig) -> Result<OperatorIdentity, OperatorError> {
    info!("loading operator key key_source={}", app_config.operator.key_source);
    match app_config.operator.key_source {
        KeySource::Env => OperatorIdentity::load(&EnvSecretStore::new()).await,
        KeySource::File => {
            let path = app_config
                .operator
                .key_file
                .as_deref()
                .ok_or_else(|| OperatorError::MissingConfig { field: "operator.key_file".to_string() })?;
            OperatorIdentity::load(&FileSecretStore::open(path).await?).await
        }
    }
}

pub fn log_startup_banner(app_config: &AppConfig, identity: &OperatorIdentity) {
    info!(
        "blockpost operator configured operator={} rpc_url={} service_manager={} stake_registry={} avs_directory={} profile={}",
        identity.address(),
        redact_url(&app_config.ledger.rpc_url),
        app_config.contracts.service_manager,
        app_config.contracts.stake_registry,
        app_config.contracts.avs_directory,
        app_config.service.active_profile.as_deref().unwrap_or("default")
    );
    info!(
        "pipeline settings start_block={} max_concurrency={} poll_interval_ms={} max_attempts={} confirmation_timeout_secs={}",
        app_config.monitor.start_block,
        app_config.monitor.max_concurrency,
        app_config.monitor.poll_interval_ms,
        app_config.submission.max_attempts,
        app_config.ledger.confirmation_timeout_secs
    );
    if app_config.registration.skip {
        warn!("registration disabled; responses will be rejected unless the operator is already registered");
    }
}
