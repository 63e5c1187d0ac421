//! Tests for the cached, throttled poll read operations.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, U256};

use dappvote_client::blockchain::cache::CacheStore;
use dappvote_client::blockchain::gateway::PollReader;
use dappvote_client::blockchain::models::{RawContestant, RawPoll};
use dappvote_client::blockchain::retry::RetryPolicy;
use dappvote_client::blockchain::services::polls;
use dappvote_client::blockchain::throttle::ThrottleGuard;
use dappvote_client::error::{ChainError, Reporter};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dappvote_client=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn raw_poll(id: u64, timestamp: u64) -> RawPoll {
    RawPoll {
        id: U256::from(id),
        image: "img".to_string(),
        title: format!("poll-{}", id),
        description: String::new(),
        votes: U256::zero(),
        contestants: U256::zero(),
        deleted: false,
        director: Address::repeat_byte(0x01),
        starts_at: U256::from(timestamp),
        ends_at: U256::from(timestamp + 10),
        timestamp: U256::from(timestamp),
        voters: Vec::new(),
        avatars: Vec::new(),
    }
}

/// Scripted contract reader that counts how often the chain is hit.
struct MockReader {
    calls: AtomicU32,
    fail_with: Option<ChainError>,
}

impl MockReader {
    fn ok() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_with: None,
        }
    }

    fn failing(err: ChainError) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_with: Some(err),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollReader for MockReader {
    async fn fetch_polls(&self) -> Result<Vec<RawPoll>, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(vec![raw_poll(1, 100), raw_poll(2, 200)]),
        }
    }

    async fn fetch_poll(&self, id: u64) -> Result<RawPoll, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(raw_poll(id, 100)),
        }
    }

    async fn fetch_contestants(&self, _poll_id: u64) -> Result<Vec<RawContestant>, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(vec![RawContestant {
                id: U256::from(1u64),
                image: String::new(),
                name: "alice".to_string(),
                voter: Address::repeat_byte(0x02),
                votes: U256::from(3u64),
                voters: Vec::new(),
            }]),
        }
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(1),
    }
}

fn fresh_cache() -> CacheStore {
    CacheStore::new(None, Duration::from_secs(30))
}

#[tokio::test]
async fn second_get_poll_within_the_window_is_served_from_cache() {
    init_logging();
    let reader = MockReader::ok();
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let first = polls::get_poll(&reader, &cache, &throttle, &reporter, fast_retry(), 7).await;
    let second = polls::get_poll(&reader, &cache, &throttle, &reporter, fast_retry(), 7).await;

    assert_eq!(first, second);
    // The second call never reached the contract.
    assert_eq!(reader.calls(), 1);
}

#[tokio::test]
async fn different_poll_ids_throttle_independently() {
    init_logging();
    let reader = MockReader::ok();
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    polls::get_poll(&reader, &cache, &throttle, &reporter, fast_retry(), 1).await;
    polls::get_poll(&reader, &cache, &throttle, &reporter, fast_retry(), 2).await;

    assert_eq!(reader.calls(), 2);
}

#[tokio::test]
async fn polls_come_back_sorted_and_are_cached() {
    init_logging();
    let reader = MockReader::ok();
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let polls_list = polls::get_polls(&reader, &cache, &throttle, &reporter, fast_retry()).await;

    assert_eq!(polls_list.len(), 2);
    assert_eq!(polls_list[0].title, "poll-2"); // newest first
    assert!(cache.is_valid("polls"));
}

#[tokio::test]
async fn failed_fetch_falls_back_to_the_stale_cache() {
    init_logging();
    // Tiny freshness window so the entry is stale by the second call.
    let cache = CacheStore::new(None, Duration::from_millis(5));
    let throttle = ThrottleGuard::new(Duration::from_millis(1));
    let reporter = Reporter::new(true);

    let good = MockReader::ok();
    let seeded = polls::get_polls(&good, &cache, &throttle, &reporter, fast_retry()).await;
    assert_eq!(seeded.len(), 2);

    tokio::time::sleep(Duration::from_millis(10)).await;

    let broken = MockReader::failing(ChainError::Connection("node down".into()));
    let fallback = polls::get_polls(&broken, &cache, &throttle, &reporter, fast_retry()).await;

    assert_eq!(fallback, seeded);
    assert_eq!(broken.calls(), 3); // all retry attempts were spent first
}

#[tokio::test]
async fn failed_fetch_with_no_cache_degrades_to_empty() {
    init_logging();
    let reader = MockReader::failing(ChainError::Connection("node down".into()));
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let result = polls::get_polls(&reader, &cache, &throttle, &reporter, fast_retry()).await;
    assert!(result.is_empty());
}

#[tokio::test]
async fn selector_failure_on_single_poll_yields_the_placeholder() {
    init_logging();
    let reader = MockReader::failing(ChainError::ViewFunction(
        "function selector was not recognized".into(),
    ));
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let poll = polls::get_poll(&reader, &cache, &throttle, &reporter, fast_retry(), 9).await;

    assert_eq!(poll.id, 9);
    assert_eq!(poll.title, "Unable to load poll");
    assert_eq!(poll.votes, 0);
}

#[tokio::test]
async fn selector_failure_on_contestants_yields_an_empty_list() {
    init_logging();
    let reader = MockReader::failing(ChainError::ViewFunction(
        "function selector was not recognized".into(),
    ));
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let contestants =
        polls::get_contestants(&reader, &cache, &throttle, &reporter, fast_retry(), 3).await;
    assert!(contestants.is_empty());
}

#[tokio::test]
async fn contestants_are_fetched_sorted_and_cached() {
    init_logging();
    let reader = MockReader::ok();
    let cache = fresh_cache();
    let throttle = ThrottleGuard::new(Duration::from_secs(2));
    let reporter = Reporter::new(true);

    let contestants =
        polls::get_contestants(&reader, &cache, &throttle, &reporter, fast_retry(), 3).await;

    assert_eq!(contestants.len(), 1);
    assert_eq!(contestants[0].name, "alice");
    assert!(cache.is_valid("contestants_3"));
}
