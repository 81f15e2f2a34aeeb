//! # Domain Services
//!
//! Pure functions over domain types: hashing, input validation, and the
//! payout formula.

use crate::domain::entities::LedgerConfig;
use crate::domain::value_objects::{Hash, Timestamp, U256};
use crate::errors::LedgerError;
use sha3::{Digest, Keccak256};

/// Computes the Keccak-256 hash of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Validates a market question against the configuration.
///
/// # Errors
///
/// `EmptyQuestion` for empty/whitespace text, `QuestionTooLong` above the limit.
pub fn validate_question(question: &str, config: &LedgerConfig) -> Result<(), LedgerError> {
    if question.trim().is_empty() {
        return Err(LedgerError::EmptyQuestion);
    }
    if question.len() > config.max_question_len {
        return Err(LedgerError::QuestionTooLong {
            len: question.len(),
            max: config.max_question_len,
        });
    }
    Ok(())
}

/// Computes the end time of a market created at `now` lasting `duration` seconds.
///
/// # Errors
///
/// `InvalidDuration` for zero, `DurationOverflow` if the sum overflows.
pub fn compute_end_time(now: Timestamp, duration: u64) -> Result<Timestamp, LedgerError> {
    if duration == 0 {
        return Err(LedgerError::InvalidDuration);
    }
    now.checked_add(duration)
        .ok_or(LedgerError::DurationOverflow)
}

/// Validates a stake against the configured bounds.
///
/// # Errors
///
/// `StakeOutOfRange` when below `min_stake` or above `max_stake`.
pub fn validate_stake(stake: U256, config: &LedgerConfig) -> Result<(), LedgerError> {
    if config.stake_in_bounds(stake) {
        Ok(())
    } else {
        Err(LedgerError::StakeOutOfRange {
            stake,
            min: config.min_stake,
            max: config.max_stake,
        })
    }
}

/// Pari-mutuel payout: the stake back plus a pro-rata share of the losing pool.
///
/// `payout = stake + stake * losing_pool / winning_pool`, integer division.
/// An empty winning pool pays the stake alone.
///
/// # Errors
///
/// `Overflow` if the intermediate product overflows 256 bits.
pub fn compute_payout(
    stake: U256,
    winning_pool: U256,
    losing_pool: U256,
) -> Result<U256, LedgerError> {
    if winning_pool.is_zero() {
        return Ok(stake);
    }
    let share = stake
        .checked_mul(losing_pool)
        .ok_or(LedgerError::Overflow)?
        / winning_pool;
    stake.checked_add(share).ok_or(LedgerError::Overflow)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::milli_ether;

    #[test]
    fn test_keccak256_empty() {
        // keccak256("") = c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
        let hash = keccak256(&[]);
        assert_eq!(hash.0[0], 0xc5);
        assert_eq!(hash.0[1], 0xd2);
        assert_eq!(hash.0[31], 0x70);
    }

    #[test]
    fn test_validate_question() {
        let config = LedgerConfig::default();
        assert!(validate_question("Will BTC close above 100k?", &config).is_ok());
        assert_eq!(validate_question("", &config), Err(LedgerError::EmptyQuestion));
        assert_eq!(validate_question("   ", &config), Err(LedgerError::EmptyQuestion));

        let long = "x".repeat(config.max_question_len + 1);
        assert!(matches!(
            validate_question(&long, &config),
            Err(LedgerError::QuestionTooLong { .. })
        ));
    }

    #[test]
    fn test_compute_end_time() {
        assert_eq!(compute_end_time(1_000, 86_400), Ok(87_400));
        assert_eq!(compute_end_time(1_000, 0), Err(LedgerError::InvalidDuration));
        assert_eq!(
            compute_end_time(u64::MAX, 1),
            Err(LedgerError::DurationOverflow)
        );
    }

    #[test]
    fn test_validate_stake_bounds() {
        let config = LedgerConfig::default();
        assert!(validate_stake(milli_ether(10), &config).is_ok());
        assert!(matches!(
            validate_stake(U256::from(1), &config),
            Err(LedgerError::StakeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_compute_payout() {
        // Stake 10 of a 40 winning pool, 60 losing: 10 + 10*60/40 = 25
        let payout =
            compute_payout(U256::from(10), U256::from(40), U256::from(60)).unwrap();
        assert_eq!(payout, U256::from(25));

        // Nobody on the other side: stake back
        let payout = compute_payout(U256::from(10), U256::from(10), U256::zero()).unwrap();
        assert_eq!(payout, U256::from(10));

        // Empty winning pool
        let payout = compute_payout(U256::from(10), U256::zero(), U256::from(50)).unwrap();
        assert_eq!(payout, U256::from(10));
    }

    #[test]
    fn test_compute_payout_overflow() {
        let result = compute_payout(U256::MAX, U256::from(1), U256::from(2));
        assert_eq!(result, Err(LedgerError::Overflow));
    }
}
