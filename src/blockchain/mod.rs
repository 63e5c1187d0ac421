// src/blockchain/mod.rs

// Re-export the client module with the voting client facade
pub mod client;
pub use client::VotingClient;

// Re-export other modules
pub mod cache;
pub mod gateway;
pub mod mapper;
pub mod models;
pub mod provider;
pub mod retry;
pub mod services;
pub mod throttle;

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256, U64};
