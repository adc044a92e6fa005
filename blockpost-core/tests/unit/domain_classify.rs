use blockpost_core::domain::classify::{ledger_error, operator_already_registered_selector};
use blockpost_core::domain::{classify_ledger_failure, LedgerFailure};
use blockpost_core::foundation::ErrorClass;

#[test]
fn node_messages_map_onto_failure_classes() {
    let cases = [
        ("execution reverted: Operator has already responded to the task", LedgerFailure::Duplicate),
        ("execution reverted: OperatorAlreadyRegistered()", LedgerFailure::Duplicate),
        ("DelegationManager.registerAsOperator: operator has already registered", LedgerFailure::Duplicate),
        ("nonce too low: next nonce 4, tx nonce 3", LedgerFailure::SequenceConflict),
        ("replacement transaction underpriced", LedgerFailure::SequenceConflict),
        ("error sending request for url (http://127.0.0.1:8545/)", LedgerFailure::Transient),
        ("HTTP error 503 with body: upstream unavailable", LedgerFailure::Transient),
        ("operation timed out", LedgerFailure::Transient),
        ("execution reverted: Invalid signature", LedgerFailure::Rejected),
        ("insufficient funds for gas * price + value", LedgerFailure::Rejected),
    ];
    for (message, expected) in cases {
        assert_eq!(classify_ledger_failure(message), expected, "message: {}", message);
    }
}

#[test]
fn custom_error_selector_in_revert_data_is_duplicate() {
    let message = format!("execution reverted, data: \"0x{}\"", operator_already_registered_selector());
    assert_eq!(classify_ledger_failure(&message), LedgerFailure::Duplicate);
}

#[test]
fn ledger_errors_carry_the_matching_class() {
    assert_eq!(ledger_error("send_transaction", "nonce too high").class(), ErrorClass::SequenceConflict);
    assert_eq!(ledger_error("send_transaction", "connection refused").class(), ErrorClass::Transient);
    assert_eq!(ledger_error("send_transaction", "already responded").class(), ErrorClass::IdempotentSuccess);
    assert_eq!(ledger_error("send_transaction", "out of gas").class(), ErrorClass::Terminal);
}
