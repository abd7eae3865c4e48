//! # Loan Records
//!
//! The data the loan ledger keeps per borrowing relationship, the receipts
//! handed back to callers, and the event journal entries.
//!
//! ## State Machine
//!
//! ```text
//!              repay (now <= due_at)
//!   ┌──────┐ ───────────────────────► ┌──────────┐
//!   │ Open │                          │  Repaid  │ terminal
//!   └──────┘ ───────────────────────► └──────────┘
//!              liquidate (now > due_at)
//!                                     ┌────────────┐
//!                                     │ Liquidated │ terminal
//!                                     └────────────┘
//! ```
//!
//! Repayment stays available after the due date for as long as nobody has
//! liquidated; the first of the two to commit wins.

use nftlend_protocol::units::{AccountId, AssetId, LoanId, RewardAmount, Timestamp, ValueAmount};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Collateral in custody, principal outstanding.
    Open,
    /// Principal and interest settled, collateral returned.
    Repaid,
    /// Defaulted past due, collateral seized.
    Liquidated,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Open)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Open => write!(f, "Open"),
            LoanStatus::Repaid => write!(f, "Repaid"),
            LoanStatus::Liquidated => write!(f, "Liquidated"),
        }
    }
}

/// One borrowing relationship. Never deleted; closed loans stay as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// The only identity allowed to repay or pay interest.
    pub borrower: AccountId,
    pub collateral_asset_id: AssetId,
    /// Disbursed at open. Immutable.
    pub principal: ValueAmount,
    pub opened_at: Timestamp,
    /// `opened_at + term`.
    pub due_at: Timestamp,
    /// Reward units already settled. Never decreases.
    pub interest_paid: RewardAmount,
    pub status: LoanStatus,
    /// When the loan left `Open`, if it has.
    pub closed_at: Option<Timestamp>,
}

impl Loan {
    pub(crate) fn open(
        id: LoanId,
        borrower: &str,
        collateral_asset_id: AssetId,
        principal: ValueAmount,
        opened_at: Timestamp,
        term_secs: u64,
    ) -> Self {
        Self {
            id,
            borrower: borrower.to_string(),
            collateral_asset_id,
            principal,
            opened_at,
            due_at: opened_at.saturating_add(term_secs),
            interest_paid: RewardAmount::ZERO,
            status: LoanStatus::Open,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }

    /// Length of the loan's term in seconds.
    pub fn term_secs(&self) -> u64 {
        self.due_at - self.opened_at
    }
}

/// Returned by a successful repayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptClosed {
    pub loan_id: LoanId,
    pub borrower: AccountId,
    pub collateral_asset_id: AssetId,
    /// Value units burned from the borrower.
    pub principal_repaid: ValueAmount,
    /// Reward units collected by this call (owed minus previously paid).
    pub interest_settled: RewardAmount,
    /// Total interest charged over the loan's life.
    pub interest_total: RewardAmount,
    pub closed_at: Timestamp,
}

/// Returned by a successful liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLiquidated {
    pub loan_id: LoanId,
    pub borrower: AccountId,
    pub collateral_asset_id: AssetId,
    pub liquidator: AccountId,
    /// Who received the collateral.
    pub beneficiary: AccountId,
    /// Principal removed from the outstanding total without repayment.
    pub principal_written_off: ValueAmount,
    pub liquidated_at: Timestamp,
}

/// Journal entry for every committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanEvent {
    Opened {
        loan_id: LoanId,
        borrower: AccountId,
        asset_id: AssetId,
        principal: ValueAmount,
        due_at: Timestamp,
    },
    InterestPaid {
        loan_id: LoanId,
        amount: RewardAmount,
        interest_paid: RewardAmount,
    },
    Repaid {
        loan_id: LoanId,
        principal: ValueAmount,
        interest_settled: RewardAmount,
        at: Timestamp,
    },
    Liquidated {
        loan_id: LoanId,
        liquidator: AccountId,
        beneficiary: AccountId,
        at: Timestamp,
    },
}

impl LoanEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            LoanEvent::Opened { loan_id, .. }
            | LoanEvent::InterestPaid { loan_id, .. }
            | LoanEvent::Repaid { loan_id, .. }
            | LoanEvent::Liquidated { loan_id, .. } => *loan_id,
        }
    }
}
