//! Secret store backends.

pub mod env_secret_store;
pub mod file_secret_store;

pub use env_secret_store::EnvSecretStore;
pub use file_secret_store::FileSecretStore;
