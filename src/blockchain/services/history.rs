// src/blockchain/services/history.rs
//! Transaction history via a full linear block scan.
//!
//! The target chain is assumed low-volume and local (Hardhat-style), so the
//! scanner walks every block from 1 to the latest, inspects each transaction
//! directed at the voting contract, and decodes the invoked function from
//! the call selector. Per-block and per-transaction failures are logged and
//! skipped; the scan as a whole never fails.

use std::collections::HashSet;

use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Transaction, TransactionReceipt, H256, U64};
use ethers::utils::format_ether;
use tracing::{debug, warn};

use crate::blockchain::models::TransactionRecord;
use crate::error::ChainError;

/// The slice of a block the scanner needs.
#[derive(Clone, Debug)]
pub struct BlockView {
    pub timestamp: u64,
    pub tx_hashes: Vec<H256>,
}

/// Node read surface the scanner walks through. Mockable in tests.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_block(&self) -> Result<u64, ChainError>;
    async fn block(&self, number: u64) -> Result<Option<BlockView>, ChainError>;
    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, ChainError>;
    async fn receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>, ChainError>;
}

/// `ChainReader` over a JSON-RPC provider.
pub struct NodeReader {
    provider: Provider<Http>,
}

impl NodeReader {
    pub fn new(provider: Provider<Http>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainReader for NodeReader {
    async fn latest_block(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(ChainError::from_provider)
    }

    async fn block(&self, number: u64) -> Result<Option<BlockView>, ChainError> {
        let block = self
            .provider
            .get_block(number)
            .await
            .map_err(ChainError::from_provider)?;

        Ok(block.map(|b| BlockView {
            timestamp: b.timestamp.low_u64(),
            tx_hashes: b.transactions,
        }))
    }

    async fn transaction(&self, hash: H256) -> Result<Option<Transaction>, ChainError> {
        self.provider
            .get_transaction(hash)
            .await
            .map_err(ChainError::from_provider)
    }

    async fn receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>, ChainError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(ChainError::from_provider)
    }
}

/// Human label for the invoked contract function, decoded from the leading
/// four bytes of the call data.
pub fn transaction_label(abi: &Abi, input: &[u8]) -> String {
    if input.len() < 4 {
        return "Unknown Transaction".to_string();
    }

    let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];
    let Some(function) = abi.functions().find(|f| f.short_signature() == selector) else {
        return "Unknown Transaction".to_string();
    };

    match function.name.as_str() {
        "createPoll" => "Poll Created".to_string(),
        "updatePoll" => "Poll Updated".to_string(),
        "deletePoll" => "Poll Deleted".to_string(),
        // The deployed function is `contest`; older interface drafts named
        // it `contestPoll`.
        "contest" | "contestPoll" => "Contestant Added".to_string(),
        "vote" => "Vote Cast".to_string(),
        other => other.to_string(),
    }
}

/// Walk blocks 1..=latest and collect every transaction directed at the
/// contract, sorted by block number descending (chain-local timestamps are
/// not trusted for ordering), then sliced by `offset`/`limit`.
pub async fn scan(
    reader: &dyn ChainReader,
    abi: &Abi,
    contract_address: Address,
    limit: usize,
    offset: usize,
) -> Vec<TransactionRecord> {
    let latest = match reader.latest_block().await {
        Ok(latest) => latest,
        Err(err) => {
            warn!("failed to query latest block: {}", err.message());
            return Vec::new();
        }
    };

    debug!("scanning blocks 1..={} for contract transactions", latest);

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for number in 1..=latest {
        let block = match reader.block(number).await {
            Ok(Some(block)) => block,
            Ok(None) => continue,
            Err(err) => {
                warn!("error getting block {}: {}", number, err.message());
                continue;
            }
        };

        for &hash in &block.tx_hashes {
            if !seen.insert(hash) {
                continue;
            }

            match collect(reader, abi, contract_address, &block, hash).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    warn!("error processing transaction {:#x}: {}", hash, err.message());
                }
            }
        }
    }

    debug!("found {} contract transactions", records.len());

    records.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    records.into_iter().skip(offset).take(limit).collect()
}

async fn collect(
    reader: &dyn ChainReader,
    abi: &Abi,
    contract_address: Address,
    block: &BlockView,
    hash: H256,
) -> Result<Option<TransactionRecord>, ChainError> {
    let Some(tx) = reader.transaction(hash).await? else {
        return Ok(None);
    };

    // Address comparison is byte-level, which subsumes the original's
    // case-insensitive match.
    if tx.to != Some(contract_address) {
        return Ok(None);
    }

    let Some(receipt) = reader.receipt(hash).await? else {
        return Ok(None);
    };

    Ok(Some(TransactionRecord {
        hash: format!("{:#x}", tx.hash),
        block_number: tx.block_number.map(|b| b.as_u64()).unwrap_or(0),
        timestamp: block.timestamp,
        from: format!("{:#x}", tx.from),
        to: format!("{:#x}", contract_address),
        transaction_type: transaction_label(abi, tx.input.as_ref()),
        status: receipt.status == Some(U64::from(1u64)),
        gas_used: receipt
            .gas_used
            .map(|g| g.to_string())
            .unwrap_or_else(|| "0".to_string()),
        gas_price: tx
            .gas_price
            .map(|g| g.to_string())
            .unwrap_or_else(|| "0".to_string()),
        value: format_ether(tx.value).to_string(),
    }))
}

/// Case-insensitive substring filter over `from`/`to`, applied client-side
/// after a scan completes.
pub fn filter_by_address(records: &[TransactionRecord], needle: &str) -> Vec<TransactionRecord> {
    let needle = needle.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.from.to_lowercase().contains(&needle) || r.to.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
