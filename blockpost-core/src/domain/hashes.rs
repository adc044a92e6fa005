use alloy::primitives::{eip191_hash_message, keccak256, Address, B256};

/// Canonical digest of a request payload: `keccak256(abi.encodePacked(message))`.
///
/// Any operator computes the same value for the same message.
pub fn response_digest(message: &str) -> B256 {
    keccak256(message.as_bytes())
}

/// Hash actually signed for a response: the EIP-191 personal-message hash of the 32-byte digest.
///
/// The service manager recovers the signer with `toEthSignedMessageHash(digest)`.
pub fn response_signing_hash(message: &str) -> B256 {
    eip191_hash_message(response_digest(message))
}

/// EVM address of an uncompressed secp256k1 public key (`0x04 || x || y`).
pub fn evm_address_from_uncompressed(uncompressed: &[u8; 65]) -> Address {
    let digest = keccak256(&uncompressed[1..]);
    Address::from_slice(&digest[12..])
}
