//! Solidity bindings for the service manager, stake registry, AVS directory and delegation manager.

use crate::domain::registration::OperatorSignature;
use crate::domain::request::{Request, Response};
use crate::foundation::{OperatorError, RequestId, ABI_WORD_LEN};
use crate::infrastructure::rpc::LedgerLog;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

sol! {
    interface IBlockpostServiceManager {
        struct Request {
            string message;
            uint32 blocknumber;
        }

        event MessageRequestCreated(uint32 indexed requestId, Request request);

        function createNewRequest(string memory message) external;
        function respondToRequest(Request calldata request, uint32 referenceRequestIndex, bytes calldata signature) external;
        function latestRequestNum() external view returns (uint32);
    }

    interface IStakeRegistry {
        struct SignatureWithSaltAndExpiry {
            bytes signature;
            bytes32 salt;
            uint256 expiry;
        }

        error OperatorAlreadyRegistered();

        function registerOperatorWithSignature(SignatureWithSaltAndExpiry memory operatorSignature, address signingKey) external;
        function operatorRegistered(address operator) external view returns (bool);
    }

    interface IAVSDirectory {
        function calculateOperatorAVSRegistrationDigestHash(address operator, address avs, bytes32 salt, uint256 expiry)
            external
            view
            returns (bytes32);
    }

    interface IDelegationManager {
        struct OperatorDetails {
            address earningsReceiver;
            address delegationApprover;
            uint32 stakerOptOutWindowBlocks;
        }

        function registerAsOperator(OperatorDetails calldata registeringOperatorDetails, string calldata metadataURI) external;
        function isOperator(address operator) external view returns (bool);
    }
}

pub fn respond_to_request_calldata(response: &Response) -> Bytes {
    IBlockpostServiceManager::respondToRequestCall {
        request: IBlockpostServiceManager::Request {
            message: response.message.clone(),
            blocknumber: response.block_number,
        },
        referenceRequestIndex: response.request_id.value(),
        signature: response.signature.clone(),
    }
    .abi_encode()
    .into()
}

pub fn register_operator_calldata(signature: &OperatorSignature, signing_key: Address) -> Bytes {
    IStakeRegistry::registerOperatorWithSignatureCall {
        operatorSignature: IStakeRegistry::SignatureWithSaltAndExpiry {
            signature: signature.signature.clone(),
            salt: signature.salt,
            expiry: U256::from(signature.expiry),
        },
        signingKey: signing_key,
    }
    .abi_encode()
    .into()
}

pub fn registration_digest_calldata(operator: Address, avs: Address, salt: B256, expiry: u64) -> Bytes {
    IAVSDirectory::calculateOperatorAVSRegistrationDigestHashCall { operator, avs, salt, expiry: U256::from(expiry) }
        .abi_encode()
        .into()
}

pub fn operator_registered_calldata(operator: Address) -> Bytes {
    IStakeRegistry::operatorRegisteredCall { operator }.abi_encode().into()
}

pub fn is_operator_calldata(operator: Address) -> Bytes {
    IDelegationManager::isOperatorCall { operator }.abi_encode().into()
}

pub fn register_as_operator_calldata(operator: Address, metadata_uri: &str) -> Bytes {
    IDelegationManager::registerAsOperatorCall {
        registeringOperatorDetails: IDelegationManager::OperatorDetails {
            earningsReceiver: operator,
            delegationApprover: Address::ZERO,
            stakerOptOutWindowBlocks: 0,
        },
        metadataURI: metadata_uri.to_string(),
    }
    .abi_encode()
    .into()
}

/// Topic0 of `MessageRequestCreated`.
pub fn message_request_created_topic() -> B256 {
    IBlockpostServiceManager::MessageRequestCreated::SIGNATURE_HASH
}

/// Decodes a single 32-byte return word, rejecting anything else.
pub fn decode_word(operation: &str, output: &[u8]) -> Result<B256, OperatorError> {
    if output.len() != ABI_WORD_LEN {
        return Err(OperatorError::malformed(operation, format!("expected {} bytes, got {}", ABI_WORD_LEN, output.len())));
    }
    Ok(B256::from_slice(output))
}

pub fn decode_bool(operation: &str, output: &[u8]) -> Result<bool, OperatorError> {
    let word = decode_word(operation, output)?;
    if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
        return Err(OperatorError::malformed(operation, format!("not an ABI bool: {}", word)));
    }
    Ok(word[31] == 1)
}

/// Decodes a `MessageRequestCreated` log into a domain request.
pub fn decode_request_log(log: &LedgerLog) -> Result<Request, OperatorError> {
    let event = IBlockpostServiceManager::MessageRequestCreated::decode_raw_log(log.topics.iter().copied(), &log.data, true)
        .map_err(|err| OperatorError::EncodingError(format!("MessageRequestCreated decode failed: {}", err)))?;
    Ok(Request {
        id: RequestId::new(event.requestId),
        block_number: event.request.blocknumber,
        message: event.request.message,
    })
}
