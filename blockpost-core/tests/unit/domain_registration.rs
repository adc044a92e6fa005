use alloy::primitives::Address;
use blockpost_core::domain::registration::expiry_after;
use blockpost_core::domain::RegistrationParams;
use blockpost_core::foundation::DEFAULT_REGISTRATION_EXPIRY_SECS;

#[test]
fn fresh_params_use_new_salt_and_future_expiry() {
    let operator = Address::repeat_byte(0x01);
    let service = Address::repeat_byte(0x02);
    let first = RegistrationParams::fresh(operator, service, 1_700_000_000, 600).expect("params");
    let second = RegistrationParams::fresh(operator, service, 1_700_000_000, 600).expect("params");

    assert_eq!(first.expiry, 1_700_000_600);
    assert_ne!(first.salt, second.salt);
    assert_eq!(first.operator, operator);
    assert_eq!(first.service, service);
}

#[test]
fn zero_window_uses_default_and_overflow_is_rejected() {
    assert_eq!(expiry_after(10, 0).expect("expiry"), 10 + DEFAULT_REGISTRATION_EXPIRY_SECS);
    assert!(expiry_after(u64::MAX, 1).is_err());
}
