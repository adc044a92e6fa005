#![allow(dead_code)]

use alloy::primitives::{address, Address};

/// First anvil/hardhat development account.
pub const DEV_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

pub const SERVICE_MANAGER: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const STAKE_REGISTRY: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const AVS_DIRECTORY: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
pub const DELEGATION_MANAGER: Address = address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");

pub const SCENARIO_REQUEST_ID: u32 = 7;
pub const SCENARIO_BLOCK_NUMBER: u32 = 1000;
pub const SCENARIO_MESSAGE: &str = "Hello Eve 42";
