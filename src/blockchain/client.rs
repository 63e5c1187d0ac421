//! Client facade for the voting contract.
//!
//! This module provides the main interface for interacting with the voting
//! contract: cached and throttled reads, confirmed writes, wallet state, and
//! the transaction history scan. All shared state (cache, throttle map,
//! reporter) is constructed once here and passed by reference to the service
//! layer; there is no ambient module state.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::Address;

use crate::blockchain::cache::{keys, CacheStore};
use crate::blockchain::gateway::ContractGateway;
use crate::blockchain::models::{Contestant, Poll, PollParams, TransactionRecord, TxOutcome};
use crate::blockchain::provider::{ProviderResolver, WalletBridge};
use crate::blockchain::retry::RetryPolicy;
use crate::blockchain::services::transactions::WritePolicy;
use crate::blockchain::services::{history, polls, transactions};
use crate::blockchain::throttle::ThrottleGuard;
use crate::config::Config;
use crate::error::{ChainError, Reporter};

/// Main client for the voting contract. Construct once at process start and
/// share by reference; every operation goes through the same cache,
/// throttle, and reporter instances.
pub struct VotingClient {
    config: Arc<Config>,
    resolver: Arc<ProviderResolver>,
    gateway: ContractGateway,
    cache: CacheStore,
    throttle: ThrottleGuard,
    reporter: Reporter,
    retry: RetryPolicy,
}

impl VotingClient {
    /// Build a client from configuration and an optional wallet bridge
    /// (absent in headless contexts).
    pub fn new(config: Config, bridge: Option<Arc<dyn WalletBridge>>) -> Result<Self, ChainError> {
        let config = Arc::new(config);
        let resolver = Arc::new(ProviderResolver::new(config.clone(), bridge));
        let gateway = ContractGateway::new(config.clone(), resolver.clone())?;

        let cache = CacheStore::new(
            config.cache_path.clone(),
            Duration::from_millis(config.cache_ttl_ms),
        );
        let throttle = ThrottleGuard::new(Duration::from_millis(config.throttle_interval_ms));
        let reporter = Reporter::new(config.development);
        let retry = RetryPolicy::from_config(&config);

        Ok(Self {
            config,
            resolver,
            gateway,
            cache,
            throttle,
            reporter,
            retry,
        })
    }

    /// Route user-facing error messages (everything except ViewFunction
    /// failures) to `notifier`, the UI toast seam.
    pub fn with_notifier(mut self, notifier: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.reporter = self.reporter.with_notifier(notifier);
        self
    }

    fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            settle_delay: Duration::from_millis(self.config.settle_delay_ms),
            retry: self.retry,
        }
    }

    // --- Wallet state ---

    /// Prompt the user to authorize an account and return it.
    pub async fn connect_wallet(&self) -> Result<Address, ChainError> {
        self.resolver.connect_wallet().await.map_err(|err| {
            self.reporter.report(&err);
            err
        })
    }

    /// The currently authorized account, if any.
    pub async fn check_wallet(&self) -> Result<Address, ChainError> {
        self.resolver.check_wallet().await.map_err(|err| {
            self.reporter.report(&err);
            err
        })
    }

    /// Whether the voting contract has bytecode at its configured address.
    pub async fn is_deployed(&self) -> bool {
        self.gateway.is_deployed().await
    }

    // --- Reads ---

    pub async fn get_polls(&self) -> Vec<Poll> {
        polls::get_polls(
            &self.gateway,
            &self.cache,
            &self.throttle,
            &self.reporter,
            self.retry,
        )
        .await
    }

    pub async fn get_poll(&self, id: u64) -> Poll {
        polls::get_poll(
            &self.gateway,
            &self.cache,
            &self.throttle,
            &self.reporter,
            self.retry,
            id,
        )
        .await
    }

    pub async fn get_contestants(&self, poll_id: u64) -> Vec<Contestant> {
        polls::get_contestants(
            &self.gateway,
            &self.cache,
            &self.throttle,
            &self.reporter,
            self.retry,
            poll_id,
        )
        .await
    }

    // --- Writes ---

    pub async fn create_poll(&self, params: PollParams) -> Result<TxOutcome, ChainError> {
        transactions::create_poll(
            &self.gateway,
            &self.cache,
            &self.reporter,
            self.write_policy(),
            params,
        )
        .await
    }

    pub async fn update_poll(&self, id: u64, params: PollParams) -> Result<TxOutcome, ChainError> {
        transactions::update_poll(
            &self.gateway,
            &self.cache,
            &self.reporter,
            self.write_policy(),
            id,
            params,
        )
        .await
    }

    pub async fn delete_poll(&self, id: u64) -> Result<TxOutcome, ChainError> {
        transactions::delete_poll(
            &self.gateway,
            &self.cache,
            &self.reporter,
            self.write_policy(),
            id,
        )
        .await
    }

    pub async fn contest_poll(
        &self,
        poll_id: u64,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Result<TxOutcome, ChainError> {
        transactions::contest_poll(
            &self.gateway,
            &self.cache,
            &self.reporter,
            self.write_policy(),
            poll_id,
            name.into(),
            image.into(),
        )
        .await
    }

    pub async fn vote(&self, poll_id: u64, contestant_id: u64) -> Result<TxOutcome, ChainError> {
        transactions::vote(
            &self.gateway,
            &self.cache,
            &self.reporter,
            self.write_policy(),
            poll_id,
            contestant_id,
        )
        .await
    }

    // --- History ---

    /// Scan the chain for contract-directed transactions, newest block
    /// first, sliced by `offset`/`limit`. Never fails; partial results are
    /// returned as-is and cached under the query's own key.
    pub async fn get_transaction_history(
        &self,
        limit: usize,
        offset: usize,
    ) -> Vec<TransactionRecord> {
        let handle = match self.resolver.resolve().await {
            Ok(handle) => handle,
            Err(err) => {
                self.reporter.report(&err);
                return Vec::new();
            }
        };

        let reader = history::NodeReader::new(handle.provider);
        let records = history::scan(
            &reader,
            self.gateway.abi(),
            self.config.contract_address,
            limit,
            offset,
        )
        .await;

        self.cache.save(keys::TRANSACTIONS, &records);
        records
    }
}
