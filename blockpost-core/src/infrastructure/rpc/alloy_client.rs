use crate::domain::classify::ledger_error;
use crate::foundation::{Nonce, OperatorError};
use crate::infrastructure::rpc::{redact_url, Confirmation, LedgerClient, LedgerLog, LedgerTransaction, LogQuery};
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// JSON-RPC ledger client over HTTP.
///
/// Transactions are signed locally by the wallet filler; nonces are always taken from the
/// `LedgerTransaction` so the provider's own nonce management never runs.
pub struct AlloyLedgerClient<P> {
    provider: P,
    redacted_url: String,
    receipt_poll_interval: Duration,
}

impl AlloyLedgerClient<()> {
    pub fn connect_http(
        url: &str,
        signer: PrivateKeySigner,
        receipt_poll_interval: Duration,
    ) -> Result<Arc<dyn LedgerClient>, OperatorError> {
        let redacted_url = redact_url(url);
        let parsed: Url = url
            .trim()
            .parse()
            .map_err(|err| OperatorError::ConfigError(format!("invalid ledger rpc url {}: {}", redacted_url, err)))?;
        let sender = signer.address();
        info!("connecting ledger rpc url={} sender={}", redacted_url, sender);
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().with_recommended_fillers().wallet(wallet).on_http(parsed);
        Ok(Arc::new(AlloyLedgerClient { provider, redacted_url, receipt_poll_interval }))
    }
}

impl<P> AlloyLedgerClient<P> {
    pub fn url(&self) -> &str {
        &self.redacted_url
    }
}

#[async_trait]
impl<P> LedgerClient for AlloyLedgerClient<P>
where
    P: Provider<Http<Client>> + Send + Sync + 'static,
{
    async fn block_number(&self) -> Result<u64, OperatorError> {
        trace!("ledger block_number request");
        self.provider.get_block_number().await.map_err(|err| ledger_error("block_number", err.to_string()))
    }

    async fn pending_nonce(&self, account: Address) -> Result<Nonce, OperatorError> {
        let nonce = self
            .provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|err| ledger_error("pending_nonce", err.to_string()))?;
        debug!("ledger pending nonce account={} nonce={}", account, nonce);
        Ok(nonce)
    }

    async fn confirmed_nonce(&self, account: Address) -> Result<Nonce, OperatorError> {
        let nonce = self
            .provider
            .get_transaction_count(account)
            .latest()
            .await
            .map_err(|err| ledger_error("confirmed_nonce", err.to_string()))?;
        debug!("ledger confirmed nonce account={} nonce={}", account, nonce);
        Ok(nonce)
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, OperatorError> {
        let started = Instant::now();
        let request = TransactionRequest::default().to(to).input(input.into());
        let output = self.provider.call(&request).await.map_err(|err| {
            warn!("ledger call failed to={} error={}", to, err);
            ledger_error("call", err.to_string())
        })?;
        trace!("ledger call to={} output_len={} elapsed_ms={}", to, output.len(), started.elapsed().as_millis());
        Ok(output)
    }

    async fn send_transaction(&self, tx: LedgerTransaction) -> Result<TxHash, OperatorError> {
        let started = Instant::now();
        let LedgerTransaction { from, to, input, nonce } = tx;
        let request = TransactionRequest::default().from(from).to(to).input(input.into()).nonce(nonce);
        let pending = self.provider.send_transaction(request).await.map_err(|err| {
            error!("ledger send_transaction failed to={} nonce={} error={}", to, nonce, err);
            ledger_error("send_transaction", err.to_string())
        })?;
        let tx_hash = *pending.tx_hash();
        debug!(
            "ledger send_transaction to={} nonce={} tx_hash={} elapsed_ms={}",
            to,
            nonce,
            tx_hash,
            started.elapsed().as_millis()
        );
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash, timeout: Duration) -> Result<Confirmation, OperatorError> {
        let poll = async {
            loop {
                match self.transaction_receipt(tx_hash).await {
                    Ok(Some(confirmation)) => return confirmation,
                    Ok(None) => trace!("receipt not yet available tx_hash={}", tx_hash),
                    Err(err) => warn!("receipt poll failed tx_hash={} error={}", tx_hash, err),
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.map_err(|_| OperatorError::Timeout {
            operation: format!("wait_for_confirmation tx_hash={}", tx_hash),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Confirmation>, OperatorError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|err| ledger_error("transaction_receipt", err.to_string()))?;
        Ok(receipt.map(|receipt| Confirmation {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
            success: receipt.status(),
        }))
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LedgerLog>, OperatorError> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.topic0)
            .from_block(query.from_block)
            .to_block(query.to_block);
        let logs = self.provider.get_logs(&filter).await.map_err(|err| ledger_error("get_logs", err.to_string()))?;
        debug!(
            "ledger get_logs address={} from_block={} to_block={} log_count={}",
            query.address,
            query.from_block,
            query.to_block,
            logs.len()
        );
        Ok(logs
            .into_iter()
            .map(|log| LedgerLog {
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
                block_number: log.block_number,
                transaction_hash: log.transaction_hash,
                log_index: log.log_index,
            })
            .collect())
    }
}
