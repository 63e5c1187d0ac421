// src/blockchain/services/transactions.rs
//! Write operations: createPoll / updatePoll / deletePoll / contest / vote.
//!
//! Every write requires the user's wallet signer, waits for on-chain
//! confirmation, applies the settle delay to absorb node-side propagation
//! lag, then refreshes the affected cached resources. Write failures are
//! classified, reported, and always propagated; refresh failures after a
//! confirmed write are only logged.

use std::time::Duration;

use ethers::contract::ContractCall;
use ethers::types::U256;
use tracing::warn;

use crate::blockchain::cache::{keys, CacheStore};
use crate::blockchain::gateway::{ContractGateway, PollReader, VotingMiddleware};
use crate::blockchain::mapper::{structure_contestants, structure_polls};
use crate::blockchain::models::{PollParams, TxOutcome};
use crate::blockchain::retry::{retry_operation, RetryPolicy};
use crate::error::{ChainError, ErrorKind, Reporter};

/// Settle-then-refresh windows around a write, shared by every mutation.
#[derive(Clone, Copy)]
pub struct WritePolicy {
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
}

pub async fn create_poll(
    gateway: &ContractGateway,
    cache: &CacheStore,
    reporter: &Reporter,
    policy: WritePolicy,
    params: PollParams,
) -> Result<TxOutcome, ChainError> {
    let contract = acquire(gateway, reporter).await?;

    let call = contract
        .method::<_, ()>(
            "createPoll",
            (
                params.image,
                params.title,
                params.description,
                U256::from(params.starts_at),
                U256::from(params.ends_at),
            ),
        )
        .map_err(|err| abi_failure(reporter, err))?;

    let outcome = submit(call, reporter).await?;

    tokio::time::sleep(policy.settle_delay).await;
    refresh_polls(gateway, cache, policy.retry).await;

    Ok(outcome)
}

pub async fn update_poll(
    gateway: &ContractGateway,
    cache: &CacheStore,
    reporter: &Reporter,
    policy: WritePolicy,
    id: u64,
    params: PollParams,
) -> Result<TxOutcome, ChainError> {
    let contract = acquire(gateway, reporter).await?;

    let call = contract
        .method::<_, ()>(
            "updatePoll",
            (
                U256::from(id),
                params.image,
                params.title,
                params.description,
                U256::from(params.starts_at),
                U256::from(params.ends_at),
            ),
        )
        .map_err(|err| abi_failure(reporter, err))?;

    let outcome = submit(call, reporter).await?;

    tokio::time::sleep(policy.settle_delay).await;
    refresh_poll(gateway, cache, policy.retry, id).await;
    refresh_polls(gateway, cache, policy.retry).await;

    Ok(outcome)
}

pub async fn delete_poll(
    gateway: &ContractGateway,
    cache: &CacheStore,
    reporter: &Reporter,
    policy: WritePolicy,
    id: u64,
) -> Result<TxOutcome, ChainError> {
    let contract = acquire(gateway, reporter).await?;

    let call = contract
        .method::<_, ()>("deletePoll", U256::from(id))
        .map_err(|err| abi_failure(reporter, err))?;

    let outcome = submit(call, reporter).await?;

    tokio::time::sleep(policy.settle_delay).await;
    refresh_polls(gateway, cache, policy.retry).await;

    Ok(outcome)
}

pub async fn contest_poll(
    gateway: &ContractGateway,
    cache: &CacheStore,
    reporter: &Reporter,
    policy: WritePolicy,
    poll_id: u64,
    name: String,
    image: String,
) -> Result<TxOutcome, ChainError> {
    let contract = acquire(gateway, reporter).await?;

    let call = contract
        .method::<_, ()>("contest", (U256::from(poll_id), name, image))
        .map_err(|err| abi_failure(reporter, err))?;

    let outcome = submit(call, reporter).await?;

    tokio::time::sleep(policy.settle_delay).await;
    refresh_contestants(gateway, cache, policy.retry, poll_id).await;

    Ok(outcome)
}

pub async fn vote(
    gateway: &ContractGateway,
    cache: &CacheStore,
    reporter: &Reporter,
    policy: WritePolicy,
    poll_id: u64,
    contestant_id: u64,
) -> Result<TxOutcome, ChainError> {
    let contract = acquire(gateway, reporter).await?;

    let call = contract
        .method::<_, ()>("vote", (U256::from(poll_id), U256::from(contestant_id)))
        .map_err(|err| abi_failure(reporter, err))?;

    let outcome = match submit_unreported(call).await {
        Ok(outcome) => outcome,
        Err(err) => {
            // The contract reverts with "Already voted" on a repeat vote;
            // surface that as a friendly transaction error.
            let err = if err.message().contains("Already voted") {
                ChainError::Transaction("You have already voted in this poll".to_string())
            } else {
                err
            };
            reporter.report(&err);
            return Err(err);
        }
    };

    tokio::time::sleep(policy.settle_delay).await;
    refresh_poll(gateway, cache, policy.retry, poll_id).await;
    refresh_contestants(gateway, cache, policy.retry, poll_id).await;

    Ok(outcome)
}

async fn acquire(
    gateway: &ContractGateway,
    reporter: &Reporter,
) -> Result<crate::blockchain::gateway::VotingContract, ChainError> {
    gateway.contract_with_wallet().await.map_err(|err| {
        reporter.report(&err);
        err
    })
}

fn abi_failure(reporter: &Reporter, err: ethers::abi::AbiError) -> ChainError {
    let err = ChainError::Critical(format!("contract ABI mismatch: {}", err));
    reporter.report(&err);
    err
}

async fn submit(
    call: ContractCall<VotingMiddleware, ()>,
    reporter: &Reporter,
) -> Result<TxOutcome, ChainError> {
    submit_unreported(call).await.map_err(|err| {
        reporter.report(&err);
        err
    })
}

/// Send the call and block until the submitting block is mined.
async fn submit_unreported(
    call: ContractCall<VotingMiddleware, ()>,
) -> Result<TxOutcome, ChainError> {
    let pending = call
        .send()
        .await
        .map_err(|err| ChainError::from_contract(err, ErrorKind::Transaction))?;

    let receipt = pending
        .await
        .map_err(ChainError::from_provider)?
        .ok_or_else(|| {
            ChainError::Connection("transaction dropped before confirmation".to_string())
        })?;

    Ok(TxOutcome {
        tx_hash: format!("{:#x}", receipt.transaction_hash),
        block_number: receipt.block_number.map(|b| b.as_u64()).unwrap_or(0),
        status: receipt.status == Some(1u64.into()),
        gas_used: receipt
            .gas_used
            .map(|g| g.to_string())
            .unwrap_or_else(|| "0".to_string()),
    })
}

// Post-confirmation re-reads. A confirmed write stays a success even when
// the refresh fails; the cache just keeps its previous entry.

async fn refresh_polls(gateway: &ContractGateway, cache: &CacheStore, retry: RetryPolicy) {
    let refreshed = retry_operation(
        || async move {
            let raw = gateway.fetch_polls().await?;
            structure_polls(raw)
        },
        retry,
    )
    .await;

    match refreshed {
        Ok(polls) => cache.save(keys::POLLS, &polls),
        Err(err) => warn!("error refreshing polls after write: {}", err.message()),
    }
}

async fn refresh_poll(gateway: &ContractGateway, cache: &CacheStore, retry: RetryPolicy, id: u64) {
    let refreshed = retry_operation(
        || async move {
            let raw = gateway.fetch_poll(id).await?;
            Ok(structure_polls(vec![raw])?.remove(0))
        },
        retry,
    )
    .await;

    match refreshed {
        Ok(poll) => cache.save(&keys::poll(id), &poll),
        Err(err) => warn!(
            "error refreshing poll #{} after write: {}",
            id,
            err.message()
        ),
    }
}

async fn refresh_contestants(
    gateway: &ContractGateway,
    cache: &CacheStore,
    retry: RetryPolicy,
    poll_id: u64,
) {
    let refreshed = retry_operation(
        || async move {
            let raw = gateway.fetch_contestants(poll_id).await?;
            structure_contestants(raw)
        },
        retry,
    )
    .await;

    match refreshed {
        Ok(contestants) => cache.save(&keys::contestants(poll_id), &contestants),
        Err(err) => warn!(
            "error refreshing contestants for poll #{} after write: {}",
            poll_id,
            err.message()
        ),
    }
}
