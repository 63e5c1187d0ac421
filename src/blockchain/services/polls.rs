// src/blockchain/services/polls.rs
//! Read operations: getPolls / getPoll / getContestants.
//!
//! Control flow per operation: throttle gate, fresh-cache shortcut, then a
//! retry-wrapped contract call mapped into domain records and written back
//! to the cache. On failure the stale cache entry is the fallback; reads
//! degrade to an empty or placeholder result instead of propagating.

use tracing::debug;

use crate::blockchain::cache::{keys, CacheStore};
use crate::blockchain::gateway::PollReader;
use crate::blockchain::mapper::{structure_contestants, structure_polls};
use crate::blockchain::models::{Contestant, Poll};
use crate::blockchain::retry::{retry_operation, RetryPolicy};
use crate::blockchain::throttle::ThrottleGuard;
use crate::error::{ErrorKind, Reporter};

pub async fn get_polls(
    reader: &dyn PollReader,
    cache: &CacheStore,
    throttle: &ThrottleGuard,
    reporter: &Reporter,
    retry: RetryPolicy,
) -> Vec<Poll> {
    if !throttle.allow("getPolls") {
        if let Some(cached) = cache.load::<Vec<Poll>>(keys::POLLS) {
            debug!("returning cached polls due to throttling");
            return cached;
        }
    }

    let fetched = retry_operation(
        || async move {
            let raw = reader.fetch_polls().await?;
            structure_polls(raw)
        },
        retry,
    )
    .await;

    match fetched {
        Ok(polls) => {
            cache.save(keys::POLLS, &polls);
            polls
        }
        Err(err) => {
            reporter.report(&err);
            if let Some(stale) = cache.load_stale::<Vec<Poll>>(keys::POLLS) {
                debug!("returning stale cached polls after fetch failure");
                stale
            } else {
                Vec::new()
            }
        }
    }
}

pub async fn get_poll(
    reader: &dyn PollReader,
    cache: &CacheStore,
    throttle: &ThrottleGuard,
    reporter: &Reporter,
    retry: RetryPolicy,
    id: u64,
) -> Poll {
    let cache_key = keys::poll(id);

    if !throttle.allow(&format!("getPoll_{}", id)) {
        if let Some(cached) = cache.load::<Poll>(&cache_key) {
            debug!("returning cached poll #{} due to throttling", id);
            return cached;
        }
    }

    let fetched = retry_operation(
        || async move {
            let raw = reader.fetch_poll(id).await?;
            Ok(structure_polls(vec![raw])?.remove(0))
        },
        retry,
    )
    .await;

    match fetched {
        Ok(poll) => {
            cache.save(&cache_key, &poll);
            poll
        }
        Err(err) => {
            reporter.report(&err);
            if let Some(stale) = cache.load_stale::<Poll>(&cache_key) {
                debug!("returning stale cached poll #{} after fetch failure", id);
                stale
            } else {
                Poll::placeholder(id)
            }
        }
    }
}

pub async fn get_contestants(
    reader: &dyn PollReader,
    cache: &CacheStore,
    throttle: &ThrottleGuard,
    reporter: &Reporter,
    retry: RetryPolicy,
    poll_id: u64,
) -> Vec<Contestant> {
    let cache_key = keys::contestants(poll_id);

    if !throttle.allow(&format!("getContestants_{}", poll_id)) {
        if let Some(cached) = cache.load::<Vec<Contestant>>(&cache_key) {
            debug!(
                "returning cached contestants for poll #{} due to throttling",
                poll_id
            );
            return cached;
        }
    }

    let fetched = retry_operation(
        || async move {
            let raw = reader.fetch_contestants(poll_id).await?;
            structure_contestants(raw)
        },
        retry,
    )
    .await;

    match fetched {
        Ok(contestants) => {
            cache.save(&cache_key, &contestants);
            contestants
        }
        Err(err) => {
            // An unrecognized selector means this contract version has no
            // contestants yet; an empty list, not a failure.
            if err.kind() == ErrorKind::ViewFunction {
                reporter.report(&err);
                return Vec::new();
            }

            reporter.report(&err);
            cache
                .load_stale::<Vec<Contestant>>(&cache_key)
                .unwrap_or_default()
        }
    }
}
