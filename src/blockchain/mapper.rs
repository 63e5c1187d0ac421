// src/blockchain/mapper.rs

use ethers::types::{Address, U256};

use crate::blockchain::models::{Contestant, Poll, RawContestant, RawPoll};
use crate::error::ChainError;

/// Narrow an on-chain counter or timestamp to `u64`, failing fast on
/// out-of-range values. Vote counts are integrity-critical; silently
/// truncating them would mask data corruption.
fn coerce_u64(value: U256, field: &str) -> Result<u64, ChainError> {
    if value.bits() > 64 {
        return Err(ChainError::Critical(format!(
            "on-chain field '{}' out of range: {}",
            field, value
        )));
    }
    Ok(value.as_u64())
}

fn normalize_address(address: Address) -> String {
    format!("{:#x}", address)
}

/// Convert raw poll tuples into domain records, sorted newest-first by
/// creation timestamp. Stable: input order is preserved on ties.
pub fn structure_polls(raw: Vec<RawPoll>) -> Result<Vec<Poll>, ChainError> {
    let mut polls = raw
        .into_iter()
        .map(|poll| {
            Ok(Poll {
                id: coerce_u64(poll.id, "id")?,
                image: poll.image,
                title: poll.title,
                description: poll.description,
                votes: coerce_u64(poll.votes, "votes")?,
                contestants: coerce_u64(poll.contestants, "contestants")?,
                deleted: poll.deleted,
                director: normalize_address(poll.director),
                starts_at: coerce_u64(poll.starts_at, "startsAt")?,
                ends_at: coerce_u64(poll.ends_at, "endsAt")?,
                timestamp: coerce_u64(poll.timestamp, "timestamp")?,
                voters: poll.voters.into_iter().map(normalize_address).collect(),
                avatars: poll.avatars,
            })
        })
        .collect::<Result<Vec<_>, ChainError>>()?;

    // sort_by is stable, which keeps input order on equal timestamps
    polls.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(polls)
}

/// Convert raw contestant tuples into domain records, sorted by vote count
/// descending. Stable on ties.
pub fn structure_contestants(raw: Vec<RawContestant>) -> Result<Vec<Contestant>, ChainError> {
    let mut contestants = raw
        .into_iter()
        .map(|contestant| {
            Ok(Contestant {
                id: coerce_u64(contestant.id, "id")?,
                image: contestant.image,
                name: contestant.name,
                voter: normalize_address(contestant.voter),
                votes: coerce_u64(contestant.votes, "votes")?,
                voters: contestant
                    .voters
                    .into_iter()
                    .map(normalize_address)
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, ChainError>>()?;

    contestants.sort_by(|a, b| b.votes.cmp(&a.votes));
    Ok(contestants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw_poll(id: u64, title: &str, timestamp: u64) -> RawPoll {
        RawPoll {
            id: U256::from(id),
            image: String::new(),
            title: title.to_string(),
            description: String::new(),
            votes: U256::zero(),
            contestants: U256::zero(),
            deleted: false,
            director: Address::repeat_byte(0xAB),
            starts_at: U256::from(timestamp),
            ends_at: U256::from(timestamp + 1),
            timestamp: U256::from(timestamp),
            voters: vec![Address::repeat_byte(0xCD)],
            avatars: vec!["a.png".to_string()],
        }
    }

    fn raw_contestant(id: u64, name: &str, votes: u64) -> RawContestant {
        RawContestant {
            id: U256::from(id),
            image: String::new(),
            name: name.to_string(),
            voter: Address::repeat_byte(0xEF),
            votes: U256::from(votes),
            voters: Vec::new(),
        }
    }

    #[test]
    fn polls_are_sorted_by_timestamp_descending() {
        let polls = structure_polls(vec![
            raw_poll(1, "old", 100),
            raw_poll(2, "new", 300),
            raw_poll(3, "mid", 200),
        ])
        .unwrap();

        let titles: Vec<_> = polls.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn poll_sort_is_stable_on_equal_timestamps() {
        let polls = structure_polls(vec![
            raw_poll(1, "first", 100),
            raw_poll(2, "second", 100),
            raw_poll(3, "third", 100),
        ])
        .unwrap();

        let titles: Vec<_> = polls.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn addresses_come_out_lowercase() {
        let polls = structure_polls(vec![raw_poll(1, "p", 1)]).unwrap();
        assert_eq!(polls[0].director, format!("0x{}", "ab".repeat(20)));
        assert_eq!(polls[0].voters[0], format!("0x{}", "cd".repeat(20)));
        assert!(polls[0].director.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn contestants_are_sorted_by_votes_descending_and_stable() {
        let contestants = structure_contestants(vec![
            raw_contestant(1, "low", 2),
            raw_contestant(2, "high", 5),
            raw_contestant(3, "also-low", 2),
        ])
        .unwrap();

        let names: Vec<_> = contestants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "also-low"]);
    }

    #[test]
    fn contestant_votes_sum_to_poll_votes() {
        let mut poll = raw_poll(1, "p", 1);
        poll.votes = U256::from(5u64);
        let poll = &structure_polls(vec![poll]).unwrap()[0];

        let contestants = structure_contestants(vec![
            raw_contestant(1, "a", 3),
            raw_contestant(2, "b", 2),
        ])
        .unwrap();

        let total: u64 = contestants.iter().map(|c| c.votes).sum();
        assert_eq!(total, poll.votes);
    }

    #[test]
    fn out_of_range_numerics_fail_fast_as_critical() {
        let mut poll = raw_poll(1, "p", 1);
        poll.votes = U256::MAX;

        let err = structure_polls(vec![poll]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Critical);
        assert!(err.message().contains("votes"));
    }
}
