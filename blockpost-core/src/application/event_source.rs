use crate::domain::RequestEvent;
use crate::foundation::{ErrorClass, OperatorError};
use crate::infrastructure::config::{AppConfig, StartBlock};
use crate::infrastructure::rpc::contracts::{decode_request_log, message_request_created_topic};
use crate::infrastructure::rpc::{LedgerClient, LogQuery};
use alloy::primitives::Address;
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Clone, Copy, Debug)]
pub struct PollerSettings {
    pub service_manager: Address,
    pub start_block: StartBlock,
    pub poll_interval: Duration,
    pub max_block_range: u64,
}

impl PollerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            service_manager: config.contracts.service_manager,
            start_block: config.monitor.start_block,
            poll_interval: config.monitor.poll_interval(),
            max_block_range: config.monitor.max_block_range,
        }
    }
}

/// Turns `MessageRequestCreated` logs into a stream of `RequestEvent`s by polling the ledger.
pub struct RequestEventPoller {
    ledger: Arc<dyn LedgerClient>,
    settings: PollerSettings,
    next_block: Option<u64>,
}

impl RequestEventPoller {
    pub fn new(ledger: Arc<dyn LedgerClient>, settings: PollerSettings) -> Self {
        Self { ledger, settings, next_block: None }
    }

    /// First block not yet scanned. `None` until the first poll resolves the start block.
    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    /// Scans from the cursor up to the current head and forwards decoded events.
    ///
    /// The cursor advances chunk by chunk, so a failure part way keeps the already-sent range.
    pub async fn poll_once(&mut self, sender: &mpsc::Sender<RequestEvent>) -> Result<usize, OperatorError> {
        let head = self.ledger.block_number().await?;
        let mut cursor = match (self.next_block, self.settings.start_block) {
            (Some(next), _) => next,
            (None, StartBlock::Latest) => head,
            (None, StartBlock::Number(block)) => block,
        };
        if self.next_block.is_none() {
            info!("request poller starting from_block={} head={} start_block={}", cursor, head, self.settings.start_block);
            self.next_block = Some(cursor);
        }

        let range = self.settings.max_block_range.max(1);
        let topic0 = message_request_created_topic();
        let mut forwarded = 0usize;
        while cursor <= head {
            let to_block = cursor.saturating_add(range - 1).min(head);
            let query = LogQuery { address: self.settings.service_manager, topic0, from_block: cursor, to_block };
            let logs = self.ledger.get_logs(&query).await?;
            trace!("request logs fetched from_block={} to_block={} count={}", cursor, to_block, logs.len());

            for log in &logs {
                let request = match decode_request_log(log) {
                    Ok(request) => request,
                    Err(err) => {
                        warn!("skipping undecodable request log block_number={:?} tx_hash={:?} error={}", log.block_number, log.transaction_hash, err);
                        continue;
                    }
                };
                let event = RequestEvent {
                    request,
                    observed_block: log.block_number.unwrap_or(to_block),
                    tx_hash: log.transaction_hash,
                    log_index: log.log_index,
                };
                sender.send(event).await.map_err(|_| OperatorError::Shutdown)?;
                forwarded += 1;
            }

            cursor = to_block + 1;
            self.next_block = Some(cursor);
        }
        if forwarded > 0 {
            debug!("request events forwarded count={} next_block={}", forwarded, cursor);
        }
        Ok(forwarded)
    }

    /// Polls until shutdown or until the consumer goes away. Transient and per-poll errors are
    /// logged and retried on the next tick; fatal ones end the loop.
    pub async fn run(mut self, sender: mpsc::Sender<RequestEvent>, mut shutdown: watch::Receiver<bool>) -> Result<(), OperatorError> {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("request poller stopping next_block={:?}", self.next_block);
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    match self.poll_once(&sender).await {
                        Ok(_) => {}
                        Err(OperatorError::Shutdown) => {
                            info!("request consumer closed; poller stopping");
                            return Ok(());
                        }
                        Err(err) if err.class() == ErrorClass::Fatal => return Err(err),
                        Err(err) => warn!("request poll failed next_block={:?} class={} error={}", self.next_block, err.class(), err),
                    }
                }
            }
        }
    }
}
