use crate::fixtures::{dev_identity, scenario_request, DEV_ADDRESS, SCENARIO_MESSAGE};
use blockpost_core::application::{verify_response_signature, ResponseSigner};
use blockpost_core::infrastructure::keys::{recover_address, OperatorIdentity};
use blockpost_core::domain::response_signing_hash;
use std::sync::Arc;

#[test]
fn scenario_response_verifies_against_operator_address() {
    let signer = ResponseSigner::new(dev_identity());
    assert_eq!(signer.operator(), DEV_ADDRESS);

    let response = signer.sign(&scenario_request()).expect("sign");
    assert_eq!(response.request_id.value(), 7);
    assert_eq!(response.block_number, 1000);
    assert_eq!(response.message, SCENARIO_MESSAGE);
    assert_eq!(response.signature.len(), 65);
    assert!(verify_response_signature(SCENARIO_MESSAGE, &response.signature, DEV_ADDRESS).expect("verify"));
    assert_eq!(recover_address(&response_signing_hash(SCENARIO_MESSAGE), &response.signature).expect("recover"), DEV_ADDRESS);
}

#[test]
fn repeated_signing_always_verifies() {
    let identity = Arc::new(OperatorIdentity::random());
    let signer = ResponseSigner::new(identity.clone());
    let request = scenario_request();
    for _ in 0..8 {
        let response = signer.sign(&request).expect("sign");
        assert!(verify_response_signature(&request.message, &response.signature, identity.address()).expect("verify"));
    }
}

#[test]
fn signature_from_another_key_does_not_verify() {
    let response = ResponseSigner::new(Arc::new(OperatorIdentity::random())).sign(&scenario_request()).expect("sign");
    assert!(!verify_response_signature(SCENARIO_MESSAGE, &response.signature, DEV_ADDRESS).expect("verify"));
}
