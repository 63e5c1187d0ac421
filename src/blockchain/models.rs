// src/blockchain/models.rs

use ethers::contract::EthAbiType;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

// --- Raw contract tuples ---

/// `PollStruct` exactly as the voting contract returns it. Field order must
/// match the tuple layout in the ABI.
#[derive(Clone, Debug, EthAbiType)]
pub struct RawPoll {
    pub id: U256,
    pub image: String,
    pub title: String,
    pub description: String,
    pub votes: U256,
    pub contestants: U256,
    pub deleted: bool,
    pub director: Address,
    pub starts_at: U256,
    pub ends_at: U256,
    pub timestamp: U256,
    pub voters: Vec<Address>,
    pub avatars: Vec<String>,
}

/// `ContestantStruct` exactly as the voting contract returns it.
#[derive(Clone, Debug, EthAbiType)]
pub struct RawContestant {
    pub id: U256,
    pub image: String,
    pub name: String,
    pub voter: Address,
    pub votes: U256,
    pub voters: Vec<Address>,
}

// --- Domain records ---

/// A votable election record with a fixed time window and contestant set.
///
/// `votes` and `contestants` are server-computed counters, never mutated on
/// this side. Addresses are normalized to lowercase hex. Timestamps are Unix
/// milliseconds with `starts_at < ends_at`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: u64,
    pub image: String,
    pub title: String,
    pub description: String,
    pub votes: u64,
    pub contestants: u64,
    pub deleted: bool,
    pub director: String,
    pub starts_at: u64,
    pub ends_at: u64,
    pub timestamp: u64,
    pub voters: Vec<String>,
    pub avatars: Vec<String>,
}

impl Poll {
    /// Labeled stand-in returned when a single-poll read cannot be served,
    /// so detail views can render a failed-to-load state instead of crashing.
    pub fn placeholder(id: u64) -> Self {
        Poll {
            id,
            image: String::new(),
            title: "Unable to load poll".to_string(),
            description: "Poll data could not be loaded due to a contract error".to_string(),
            votes: 0,
            contestants: 0,
            deleted: false,
            director: String::new(),
            starts_at: 0,
            ends_at: 0,
            timestamp: 0,
            voters: Vec::new(),
            avatars: Vec::new(),
        }
    }
}

/// A candidate entry within a poll. `voters` is disjoint across contestants
/// of the same poll and subset-consistent with the poll's voter set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contestant {
    pub id: u64,
    pub image: String,
    pub name: String,
    pub voter: String,
    pub votes: u64,
    pub voters: Vec<String>,
}

/// Parameters for creating or updating a poll.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollParams {
    pub image: String,
    pub title: String,
    pub description: String,
    pub starts_at: u64,
    pub ends_at: u64,
}

// --- Transaction models ---

/// A confirmed write, as returned to callers of the mutation operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub tx_hash: String,
    pub block_number: u64,
    pub status: bool,
    pub gas_used: String,
}

/// One contract-directed transaction found by the history scanner.
/// Derived per query, read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub block_number: u64,
    pub timestamp: u64,
    pub from: String,
    pub to: String,
    pub transaction_type: String,
    pub status: bool,
    pub gas_used: String,
    pub gas_price: String,
    pub value: String,
}
