//! Operator key material: secret stores and the signing identity built from them.

pub mod backends;
pub mod identity;
pub mod secret_store;

pub use backends::{EnvSecretStore, FileSecretStore};
pub use identity::{recover_address, OperatorIdentity};
pub use secret_store::{SecretBytes, SecretName, SecretStore, OPERATOR_KEY_SECRET};
