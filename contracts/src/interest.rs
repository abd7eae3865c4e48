//! # Interest Accrual
//!
//! Simple, non-compounding interest over a fixed term:
//!
//! ```text
//! owed = principal * rate_bps * elapsed / (10_000 * term)
//! elapsed = min(now, due_at) - opened_at
//! ```
//!
//! Accrual stops at the due date. Past that point a loan is a liquidation
//! candidate, not an ever-growing debt. The result is denominated in the
//! reward unit; raw value and raw reward units convert one to one, so
//! `rate_bps` alone sets the exchange.

use nftlend_protocol::config::BPS_DENOMINATOR;
use nftlend_protocol::units::{Amount, RewardAmount, Timestamp};

use crate::error::LendingError;
use crate::loan::Loan;

/// Interest owed on `loan` as of `now`, truncating toward zero.
pub fn interest_owed(loan: &Loan, rate_bps: u32, now: Timestamp) -> Result<RewardAmount, LendingError> {
    let term = loan.term_secs() as u128;
    if term == 0 {
        return Ok(RewardAmount::ZERO);
    }
    let elapsed = now.min(loan.due_at).saturating_sub(loan.opened_at) as u128;

    let numerator = loan
        .principal
        .raw()
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(elapsed))
        .ok_or(LendingError::ArithmeticOverflow)?;
    let denominator = BPS_DENOMINATOR
        .checked_mul(term)
        .ok_or(LendingError::ArithmeticOverflow)?;

    Ok(RewardAmount::from_raw(numerator / denominator))
}

/// Interest owed minus what has already been settled.
pub fn outstanding_interest(
    loan: &Loan,
    rate_bps: u32,
    now: Timestamp,
) -> Result<RewardAmount, LendingError> {
    Ok(interest_owed(loan, rate_bps, now)?.saturating_sub(loan.interest_paid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftlend_protocol::units::{AssetId, LoanId, ValueAmount};

    const TERM: u64 = 1_000;

    fn loan(principal: u64) -> Loan {
        Loan::open(
            LoanId(1),
            "alice",
            AssetId(1),
            ValueAmount::from_whole(principal),
            5_000,
            TERM,
        )
    }

    #[test]
    fn nothing_owed_at_open() {
        let l = loan(500);
        assert_eq!(interest_owed(&l, 500, 5_000).unwrap(), RewardAmount::ZERO);
    }

    #[test]
    fn accrues_linearly() {
        let l = loan(500);
        // half the term at 5% → 2.5% of 500 = 12.5
        let owed = interest_owed(&l, 500, 5_500).unwrap();
        assert_eq!(owed.to_string(), "12.5");
    }

    #[test]
    fn full_term_charges_full_rate() {
        let l = loan(500);
        assert_eq!(
            interest_owed(&l, 500, 6_000).unwrap(),
            RewardAmount::from_whole(25)
        );
    }

    #[test]
    fn stops_accruing_at_due_date() {
        let l = loan(500);
        let at_due = interest_owed(&l, 500, l.due_at).unwrap();
        let long_after = interest_owed(&l, 500, l.due_at + 1_000_000).unwrap();
        assert_eq!(at_due, long_after);
    }

    #[test]
    fn clock_before_open_owes_nothing() {
        let l = loan(500);
        assert_eq!(interest_owed(&l, 500, 1).unwrap(), RewardAmount::ZERO);
    }

    #[test]
    fn truncates_toward_zero() {
        let l = Loan::open(LoanId(1), "a", AssetId(1), ValueAmount::new(3), 0, 7);
        // 3 * 10_000 * 1 / (10_000 * 7) = 0.43 → 0
        assert_eq!(interest_owed(&l, 10_000, 1).unwrap(), RewardAmount::ZERO);
        assert_eq!(interest_owed(&l, 10_000, 7).unwrap(), RewardAmount::new(3));
    }

    #[test]
    fn outstanding_subtracts_paid() {
        let mut l = loan(500);
        l.interest_paid = RewardAmount::from_whole(10);
        assert_eq!(
            outstanding_interest(&l, 500, 6_000).unwrap(),
            RewardAmount::from_whole(15)
        );
    }

    #[test]
    fn overflow_reported() {
        let l = Loan::open(LoanId(1), "a", AssetId(1), ValueAmount::new(u128::MAX), 0, 10);
        assert_eq!(
            interest_owed(&l, 500, 5),
            Err(LendingError::ArithmeticOverflow)
        );
    }
}
