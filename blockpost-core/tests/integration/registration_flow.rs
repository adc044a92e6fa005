use crate::fixtures::*;
use blockpost_core::application::{RegistrationOutcome, ResponseSigner};
use blockpost_core::foundation::OperatorError;
use blockpost_core::infrastructure::rpc::contracts::{IDelegationManager, IStakeRegistry};
use blockpost_core::infrastructure::rpc::ScriptedFailure;
use alloy::sol_types::SolCall;

#[tokio::test]
async fn registers_once_then_reports_already_registered() {
    let harness = HarnessBuilder::new().unregistered().build();
    let coordinator = harness.registration(harness.registration_settings());

    let outcome = coordinator.register_operator().await.expect("register");
    let RegistrationOutcome::Registered { tx_hash } = outcome else {
        panic!("expected a fresh registration, got {:?}", outcome);
    };
    assert!(harness.ledger.is_registered(DEV_ADDRESS));
    let submitted = harness.ledger.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].tx_hash, tx_hash);
    assert_eq!(submitted[0].to, STAKE_REGISTRY);
    assert_eq!(submitted[0].selector, IStakeRegistry::registerOperatorWithSignatureCall::SELECTOR);

    assert_eq!(coordinator.register_operator().await.expect("rerun"), RegistrationOutcome::AlreadyRegistered);
    assert_eq!(harness.ledger.submitted().len(), 1);
    assert_eq!(harness.observer.snapshot().registrations, vec![outcome, RegistrationOutcome::AlreadyRegistered]);
}

#[tokio::test]
async fn responses_after_registration_continue_the_sequence() {
    let harness = HarnessBuilder::new().unregistered().build();
    harness.registration(harness.registration_settings()).register_operator().await.expect("register");

    let request = harness.ledger.emit_request("first task");
    let response = ResponseSigner::new(harness.identity.clone()).sign(&request).expect("sign");
    harness.submitter.submit(&response).await.expect("respond");

    let nonces: Vec<_> = harness.ledger.submitted().iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(harness.ledger.responders(request.id), vec![DEV_ADDRESS]);
}

#[tokio::test]
async fn delegation_registration_precedes_stake_registration() {
    let harness = HarnessBuilder::new().unregistered().build();
    let mut settings = harness.registration_settings();
    settings.register_with_delegation_manager = true;
    let coordinator = harness.registration(settings);

    assert!(matches!(coordinator.register_operator().await.expect("register"), RegistrationOutcome::Registered { .. }));
    assert!(harness.ledger.is_delegation_operator(DEV_ADDRESS));
    let submitted = harness.ledger.submitted();
    let calls: Vec<_> = submitted.iter().map(|tx| (tx.to, tx.selector, tx.nonce)).collect();
    assert_eq!(
        calls,
        vec![
            (DELEGATION_MANAGER, IDelegationManager::registerAsOperatorCall::SELECTOR, 0),
            (STAKE_REGISTRY, IStakeRegistry::registerOperatorWithSignatureCall::SELECTOR, 1),
        ]
    );

    assert_eq!(coordinator.register_operator().await.expect("rerun"), RegistrationOutcome::AlreadyRegistered);
    assert_eq!(harness.ledger.submitted().len(), 2);
}

#[tokio::test]
async fn delegation_without_manager_address_is_fatal() {
    let harness = HarnessBuilder::new().unregistered().build();
    let mut settings = harness.registration_settings();
    settings.register_with_delegation_manager = true;
    settings.delegation_manager = None;

    let err = harness.registration(settings).register_operator().await.expect_err("missing manager");
    assert!(err.is_fatal());
    assert!(matches!(err, OperatorError::MissingConfig { ref field } if field == "contracts.delegation_manager"));
}

#[tokio::test(start_paused = true)]
async fn transient_reads_are_retried() {
    let harness = HarnessBuilder::new().unregistered().build();
    harness.ledger.script_call_failure(ScriptedFailure::CallTransport("error sending request".to_string()));
    harness.ledger.script_call_failure(ScriptedFailure::CallTransport("503 service unavailable".to_string()));

    let outcome = harness.registration(harness.registration_settings()).register_operator().await.expect("register");
    assert!(matches!(outcome, RegistrationOutcome::Registered { .. }));
    assert!(harness.ledger.is_registered(DEV_ADDRESS));
}

#[tokio::test(start_paused = true)]
async fn persistent_read_failures_abort_registration() {
    let harness = HarnessBuilder::new().unregistered().build();
    for _ in 0..3 {
        harness.ledger.script_call_failure(ScriptedFailure::CallTransport("connection refused".to_string()));
    }

    let err = harness.registration(harness.registration_settings()).register_operator().await.expect_err("unreachable");
    assert!(err.is_fatal());
    assert!(matches!(err, OperatorError::Registration(_)));
    assert!(harness.ledger.submitted().is_empty());
}

#[tokio::test]
async fn malformed_read_is_fatal() {
    let harness = HarnessBuilder::new().unregistered().build();
    harness.ledger.script_call_failure(ScriptedFailure::MalformedCall);

    let err = harness.registration(harness.registration_settings()).register_operator().await.expect_err("malformed");
    assert!(err.is_fatal());
    assert!(matches!(err, OperatorError::MalformedResponse { .. }));
    assert!(harness.ledger.submitted().is_empty());
}

#[tokio::test]
async fn rejected_registration_write_is_fatal() {
    let harness = HarnessBuilder::new().unregistered().build();
    harness.ledger.script_send_failure(ScriptedFailure::RevertOnChain);

    let err = harness.registration(harness.registration_settings()).register_operator().await.expect_err("reverted");
    assert!(err.is_fatal());
    assert!(matches!(err, OperatorError::Registration(ref details) if details.contains("reverted")));
    assert!(!harness.ledger.is_registered(DEV_ADDRESS));
    assert!(harness.observer.snapshot().registrations.is_empty());
}
