mod domain_classify;
mod domain_hashing;
mod domain_registration;
mod request_tracker;
mod response_signing;
