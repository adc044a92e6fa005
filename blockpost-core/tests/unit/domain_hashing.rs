use crate::fixtures::SCENARIO_MESSAGE;
use alloy::primitives::keccak256;
use blockpost_core::domain::{response_digest, response_signing_hash};

#[test]
fn response_digest_is_keccak_of_message_bytes() {
    assert_eq!(response_digest(SCENARIO_MESSAGE), keccak256(SCENARIO_MESSAGE.as_bytes()));
    assert_ne!(response_digest("Hello Eve 42"), response_digest("Hello Eve 43"));
}

#[test]
fn signing_hash_applies_personal_message_prefix_to_digest() {
    let digest = response_digest(SCENARIO_MESSAGE);
    let mut preimage = b"\x19Ethereum Signed Message:\n32".to_vec();
    preimage.extend_from_slice(digest.as_slice());
    assert_eq!(response_signing_hash(SCENARIO_MESSAGE), keccak256(&preimage));
}

#[test]
fn empty_message_still_hashes() {
    assert_eq!(response_digest(""), keccak256(b""));
}
