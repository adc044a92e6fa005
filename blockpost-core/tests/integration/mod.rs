mod concurrent_nonces;
mod config_loading;
mod redelivery;
mod registration_flow;
mod secrets;
