//! In-memory ledger used by tests and local dry runs.
//!
//! Models just enough of the service manager, stake registry, AVS directory and delegation
//! manager to exercise the operator: strict per-account nonces, signature-checked registration
//! and responses, duplicate rejection, request events and scriptable failures.

use crate::domain::classify::ledger_error;
use crate::domain::hashes::response_signing_hash;
use crate::domain::request::Request;
use crate::foundation::util::now_secs;
use crate::foundation::{Nonce, OperatorError, RequestId};
use crate::infrastructure::keys::identity::recover_address;
use crate::infrastructure::rpc::contracts::{IAVSDirectory, IBlockpostServiceManager, IDelegationManager, IStakeRegistry};
use crate::infrastructure::rpc::{Confirmation, LedgerClient, LedgerLog, LedgerTransaction, LogQuery};
use alloy::primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Duration;

/// A one-shot failure consumed by the next matching ledger operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// `send_transaction` fails with a network error before reaching the ledger.
    SendTransport(String),
    /// Another writer consumed the account's next nonce just before this send.
    SendNonceConflict,
    /// The transaction is mined but reverts.
    RevertOnChain,
    /// The transaction is mined but the confirmation wait times out.
    ConfirmTimeout,
    /// `call` fails with a network error.
    CallTransport(String),
    /// `call` returns a truncated word.
    MalformedCall,
}

/// A transaction accepted by the mock ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTx {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub nonce: Nonce,
    pub selector: [u8; 4],
    pub block_number: u64,
}

struct MinedTx {
    confirmation: Confirmation,
    confirm_timeout: bool,
    resolved: bool,
}

#[derive(Default)]
struct MockState {
    head: u64,
    nonces: HashMap<Address, Nonce>,
    stake_registered: HashSet<Address>,
    delegation_operators: HashSet<Address>,
    spent_salts: HashSet<B256>,
    requests: BTreeMap<u32, Request>,
    next_request_id: u32,
    responses: HashMap<u32, Vec<Address>>,
    logs: Vec<LedgerLog>,
    mined: HashMap<TxHash, MinedTx>,
    submitted: Vec<SubmittedTx>,
    in_flight: usize,
    max_in_flight: usize,
    send_failures: VecDeque<ScriptedFailure>,
    call_failures: VecDeque<ScriptedFailure>,
    send_attempts: usize,
}

pub struct MockLedger {
    service_manager: Address,
    confirmation_delay: Duration,
    state: Mutex<MockState>,
}

const REGISTRATION_TYPEHASH_PREIMAGE: &[u8] = b"OperatorAVSRegistration(address operator,address avs,bytes32 salt,uint256 expiry)";

impl MockLedger {
    pub fn new(service_manager: Address) -> Self {
        Self { service_manager, confirmation_delay: Duration::ZERO, state: Mutex::new(MockState { head: 1, ..Default::default() }) }
    }

    /// Every confirmation wait takes at least `delay`.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn service_manager(&self) -> Address {
        self.service_manager
    }

    /// Digest the directory returns for these registration parameters.
    pub fn registration_digest(operator: Address, avs: Address, salt: B256, expiry: U256) -> B256 {
        keccak256((keccak256(REGISTRATION_TYPEHASH_PREIMAGE), operator, avs, salt, expiry).abi_encode())
    }

    pub fn script_send_failure(&self, failure: ScriptedFailure) {
        self.state.lock().send_failures.push_back(failure);
    }

    pub fn script_call_failure(&self, failure: ScriptedFailure) {
        self.state.lock().call_failures.push_back(failure);
    }

    /// Creates a request as `createNewRequest` would, mining it in a new block.
    pub fn emit_request(&self, message: impl Into<String>) -> Request {
        let mut state = self.state.lock();
        let (request, _) = Self::create_request(&mut state, self.service_manager, message.into(), None);
        request
    }

    /// Appends a log for an existing request again, as a redelivering transport would.
    pub fn redeliver_request(&self, id: RequestId) -> bool {
        let mut state = self.state.lock();
        let Some(existing) = state.logs.iter().find(|log| log.topics.get(1) == Some(&request_topic(id))).cloned() else {
            return false;
        };
        state.logs.push(existing);
        true
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().head = head;
    }

    pub fn head(&self) -> u64 {
        self.state.lock().head
    }

    pub fn nonce_of(&self, account: Address) -> Nonce {
        self.state.lock().nonces.get(&account).copied().unwrap_or(0)
    }

    pub fn mark_registered(&self, operator: Address) {
        self.state.lock().stake_registered.insert(operator);
    }

    pub fn is_registered(&self, operator: Address) -> bool {
        self.state.lock().stake_registered.contains(&operator)
    }

    pub fn is_delegation_operator(&self, operator: Address) -> bool {
        self.state.lock().delegation_operators.contains(&operator)
    }

    pub fn responders(&self, id: RequestId) -> Vec<Address> {
        self.state.lock().responses.get(&id.value()).cloned().unwrap_or_default()
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().submitted.clone()
    }

    /// Number of `send_transaction` calls, including failed ones.
    pub fn send_attempts(&self) -> usize {
        self.state.lock().send_attempts
    }

    /// Highest number of sent-but-unconfirmed transactions observed at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    fn create_request(state: &mut MockState, address: Address, message: String, tx_hash: Option<B256>) -> (Request, u64) {
        state.head += 1;
        let id = state.next_request_id;
        state.next_request_id += 1;
        let block_number = state.head;
        let request = Request::new(id, u32::try_from(block_number).unwrap_or(u32::MAX), message);
        let event = IBlockpostServiceManager::MessageRequestCreated {
            requestId: id,
            request: IBlockpostServiceManager::Request { message: request.message.clone(), blocknumber: request.block_number },
        };
        let data = event.encode_log_data();
        state.logs.push(LedgerLog {
            address,
            topics: data.topics().to_vec(),
            data: data.data.clone(),
            block_number: Some(block_number),
            transaction_hash: tx_hash,
            log_index: Some(0),
        });
        state.requests.insert(id, request.clone());
        (request, block_number)
    }

    /// Applies the call's state change, or returns the revert reason.
    fn execute(&self, state: &mut MockState, from: Address, input: &[u8]) -> Result<(), String> {
        let selector: [u8; 4] = input.get(..4).and_then(|s| s.try_into().ok()).ok_or("missing selector")?;
        match selector {
            IBlockpostServiceManager::respondToRequestCall::SELECTOR => {
                let call = IBlockpostServiceManager::respondToRequestCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                if !state.stake_registered.contains(&from) {
                    return Err("Operator must be the caller".to_string());
                }
                let id = call.referenceRequestIndex;
                let recorded = state.requests.get(&id).ok_or("supplied request does not match the one recorded in the contract")?;
                if recorded.message != call.request.message || recorded.block_number != call.request.blocknumber {
                    return Err("supplied request does not match the one recorded in the contract".to_string());
                }
                if state.responses.get(&id).is_some_and(|r| r.contains(&from)) {
                    return Err("Operator has already responded to the task".to_string());
                }
                let signer = recover_address(&response_signing_hash(&call.request.message), &call.signature)
                    .map_err(|e| format!("Invalid signature: {}", e))?;
                if signer != from {
                    return Err("Invalid signature".to_string());
                }
                state.responses.entry(id).or_default().push(from);
                Ok(())
            }
            IStakeRegistry::registerOperatorWithSignatureCall::SELECTOR => {
                let call = IStakeRegistry::registerOperatorWithSignatureCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                if state.stake_registered.contains(&from) {
                    return Err("OperatorAlreadyRegistered()".to_string());
                }
                let sig = call.operatorSignature;
                if sig.expiry <= U256::from(now_secs()) {
                    return Err("AVSDirectory.registerOperatorToAVS: operator signature expired".to_string());
                }
                if state.spent_salts.contains(&sig.salt) {
                    return Err("AVSDirectory.registerOperatorToAVS: salt already spent".to_string());
                }
                let digest = Self::registration_digest(from, self.service_manager, sig.salt, sig.expiry);
                let signer = recover_address(&digest, &sig.signature).map_err(|e| format!("InvalidSignature: {}", e))?;
                if signer != from {
                    return Err("EIP1271SignatureUtils.checkSignature_EIP1271: signature not from signer".to_string());
                }
                state.spent_salts.insert(sig.salt);
                state.stake_registered.insert(from);
                Ok(())
            }
            IDelegationManager::registerAsOperatorCall::SELECTOR => {
                IDelegationManager::registerAsOperatorCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                if !state.delegation_operators.insert(from) {
                    return Err("DelegationManager.registerAsOperator: operator has already registered".to_string());
                }
                Ok(())
            }
            IBlockpostServiceManager::createNewRequestCall::SELECTOR => {
                let call = IBlockpostServiceManager::createNewRequestCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                Self::create_request(state, self.service_manager, call.message, None);
                Ok(())
            }
            _ => Err(format!("unknown selector 0x{}", hex::encode(selector))),
        }
    }

    fn read(&self, state: &MockState, input: &[u8]) -> Result<Bytes, String> {
        let selector: [u8; 4] = input.get(..4).and_then(|s| s.try_into().ok()).ok_or("missing selector")?;
        match selector {
            IAVSDirectory::calculateOperatorAVSRegistrationDigestHashCall::SELECTOR => {
                let call = IAVSDirectory::calculateOperatorAVSRegistrationDigestHashCall::abi_decode(input, true)
                    .map_err(|e| e.to_string())?;
                let digest = Self::registration_digest(call.operator, call.avs, call.salt, call.expiry);
                Ok(Bytes::copy_from_slice(digest.as_slice()))
            }
            IStakeRegistry::operatorRegisteredCall::SELECTOR => {
                let call = IStakeRegistry::operatorRegisteredCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                Ok(bool_word(state.stake_registered.contains(&call.operator)))
            }
            IDelegationManager::isOperatorCall::SELECTOR => {
                let call = IDelegationManager::isOperatorCall::abi_decode(input, true).map_err(|e| e.to_string())?;
                Ok(bool_word(state.delegation_operators.contains(&call.operator)))
            }
            IBlockpostServiceManager::latestRequestNumCall::SELECTOR => {
                Ok(Bytes::copy_from_slice(&U256::from(state.next_request_id).to_be_bytes::<32>()))
            }
            _ => Err(format!("unknown selector 0x{}", hex::encode(selector))),
        }
    }
}

fn bool_word(value: bool) -> Bytes {
    let mut word = [0u8; 32];
    word[31] = u8::from(value);
    Bytes::copy_from_slice(&word)
}

fn request_topic(id: RequestId) -> B256 {
    B256::from(U256::from(id.value()))
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn block_number(&self) -> Result<u64, OperatorError> {
        Ok(self.state.lock().head)
    }

    async fn pending_nonce(&self, account: Address) -> Result<Nonce, OperatorError> {
        Ok(self.nonce_of(account))
    }

    async fn confirmed_nonce(&self, account: Address) -> Result<Nonce, OperatorError> {
        Ok(self.nonce_of(account))
    }

    async fn call(&self, _to: Address, input: Bytes) -> Result<Bytes, OperatorError> {
        let mut state = self.state.lock();
        match state.call_failures.pop_front() {
            Some(ScriptedFailure::CallTransport(msg)) => return Err(OperatorError::transport("call", msg)),
            Some(ScriptedFailure::MalformedCall) => return Ok(Bytes::from(vec![0u8; 20])),
            Some(other) => state.call_failures.push_front(other),
            None => {}
        }
        self.read(&state, &input).map_err(|reason| ledger_error("call", format!("execution reverted: {}", reason)))
    }

    async fn send_transaction(&self, tx: LedgerTransaction) -> Result<TxHash, OperatorError> {
        let mut state = self.state.lock();
        state.send_attempts += 1;
        let scripted = state.send_failures.pop_front();
        match &scripted {
            Some(ScriptedFailure::SendTransport(msg)) => return Err(OperatorError::transport("send_transaction", msg)),
            Some(ScriptedFailure::SendNonceConflict) => {
                *state.nonces.entry(tx.from).or_insert(0) += 1;
            }
            _ => {}
        }

        let expected = state.nonces.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce < expected {
            return Err(ledger_error("send_transaction", format!("nonce too low: next nonce {}, tx nonce {}", expected, tx.nonce)));
        }
        if tx.nonce > expected {
            return Err(ledger_error("send_transaction", format!("nonce too high: next nonce {}, tx nonce {}", expected, tx.nonce)));
        }

        let reverted = scripted == Some(ScriptedFailure::RevertOnChain);
        if !reverted {
            self.execute(&mut state, tx.from, &tx.input)
                .map_err(|reason| ledger_error("send_transaction", format!("execution reverted: {}", reason)))?;
        }

        state.nonces.insert(tx.from, expected + 1);
        state.head += 1;
        let block_number = state.head;
        let tx_hash = keccak256((tx.from, U256::from(tx.nonce), tx.input.clone()).abi_encode());
        let selector = tx.input.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()).unwrap_or_default();
        state.mined.insert(
            tx_hash,
            MinedTx {
                confirmation: Confirmation { tx_hash, block_number: Some(block_number), gas_used: 21_000, success: !reverted },
                confirm_timeout: scripted == Some(ScriptedFailure::ConfirmTimeout),
                resolved: false,
            },
        );
        state.submitted.push(SubmittedTx { tx_hash, from: tx.from, to: tx.to, nonce: tx.nonce, selector, block_number });
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash, timeout: Duration) -> Result<Confirmation, OperatorError> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay.min(timeout)).await;
        }
        let (confirmation, timed_out) = {
            let mut state = self.state.lock();
            let Some(mined) = state.mined.get_mut(&tx_hash) else {
                return Err(OperatorError::rejected("wait_for_confirmation", format!("unknown transaction {}", tx_hash)));
            };
            let first_resolution = !mined.resolved;
            mined.resolved = true;
            let result = (mined.confirmation.clone(), mined.confirm_timeout);
            if first_resolution {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
            result
        };
        if timed_out {
            tokio::time::sleep(timeout.saturating_sub(self.confirmation_delay)).await;
            return Err(OperatorError::Timeout {
                operation: format!("wait_for_confirmation tx_hash={}", tx_hash),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(confirmation)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Confirmation>, OperatorError> {
        let mut state = self.state.lock();
        let Some(mined) = state.mined.get_mut(&tx_hash) else {
            return Ok(None);
        };
        let first_resolution = !mined.resolved;
        mined.resolved = true;
        let confirmation = mined.confirmation.clone();
        if first_resolution {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        Ok(Some(confirmation))
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LedgerLog>, OperatorError> {
        let state = self.state.lock();
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == query.address)
            .filter(|log| log.topics.first() == Some(&query.topic0))
            .filter(|log| log.block_number.is_some_and(|b| b >= query.from_block && b <= query.to_block))
            .cloned()
            .collect())
    }
}
