// src/lib.rs

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256, U64};

// Re-export modules
pub mod blockchain;
pub mod config;
pub mod error;
pub mod utils;

pub use blockchain::client::VotingClient;
pub use blockchain::models::{Contestant, Poll, PollParams, TransactionRecord, TxOutcome};
pub use blockchain::provider::{LocalWalletBridge, WalletBridge};
pub use config::{Config, ExecutionMode};
pub use error::{ChainError, ErrorKind, Reporter};
