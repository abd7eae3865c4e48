//! Error types for the lending contracts.
//!
//! Every rejection is local and synchronous: the operation is aborted with
//! no partial effect, and the variant tells the caller exactly why.

use nftlend_protocol::ledger::{LedgerError, RegistryError};
use nftlend_protocol::units::{AccountId, AssetId, LoanId, RewardAmount, Timestamp, ValueAmount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loan::LoanStatus;

/// Which fungible unit a funds check was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundsUnit {
    Value,
    Reward,
}

impl std::fmt::Display for FundsUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundsUnit::Value => write!(f, "value"),
            FundsUnit::Reward => write!(f, "reward"),
        }
    }
}

/// Errors that can occur during lending operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    /// The caller does not hold the asset it tried to pledge.
    #[error("{caller} does not own asset {asset_id}")]
    NotOwner { asset_id: AssetId, caller: AccountId },

    /// The asset is already in custody against an open loan.
    #[error("asset {0} is already pledged")]
    AlreadyPledged(AssetId),

    /// Requested principal exceeds the loan-to-value limit.
    #[error("insufficient collateral: requested {requested}, at most {max_allowed} allowed")]
    InsufficientCollateral {
        requested: ValueAmount,
        max_allowed: ValueAmount,
    },

    /// No loan with this id exists.
    #[error("loan {0} not found")]
    LoanNotFound(LoanId),

    /// Only the borrower may act on an open loan.
    #[error("{caller} is not the borrower of loan {loan_id}")]
    NotBorrower { loan_id: LoanId, caller: AccountId },

    /// The loan is already `Repaid` or `Liquidated`.
    #[error("loan {loan_id} is already closed ({status})")]
    AlreadyClosed { loan_id: LoanId, status: LoanStatus },

    /// The caller's ledger balance cannot cover the payment.
    #[error("insufficient {unit} funds: {account} holds {available} raw, needs {required} raw")]
    InsufficientFunds {
        account: AccountId,
        unit: FundsUnit,
        available: u128,
        required: u128,
    },

    /// Opening this loan would push outstanding principal past the cap.
    #[error("reserve exceeded: {outstanding} outstanding + {requested} requested > cap {cap}")]
    ReserveExceeded {
        outstanding: ValueAmount,
        requested: ValueAmount,
        cap: ValueAmount,
    },

    /// Liquidation attempted on or before the due date.
    #[error("loan {loan_id} is not past due (due at {due_at}, now {now})")]
    NotYetDue {
        loan_id: LoanId,
        due_at: Timestamp,
        now: Timestamp,
    },

    /// Seized collateral cannot go to the custodian or back to the
    /// defaulting borrower.
    #[error("{beneficiary} cannot receive collateral seized from loan {loan_id}")]
    InvalidBeneficiary {
        loan_id: LoanId,
        beneficiary: AccountId,
    },

    /// The vault does not hold the asset it was asked to hand out.
    #[error("asset {0} is not in custody")]
    NotInCustody(AssetId),

    /// Principal or payment of zero.
    #[error("amount must be positive")]
    ZeroAmount,

    /// Interest payment larger than the interest owed so far.
    #[error("interest payment {attempted} exceeds outstanding interest {outstanding} on loan {loan_id}")]
    ExcessInterestPayment {
        loan_id: LoanId,
        attempted: RewardAmount,
        outstanding: RewardAmount,
    },

    /// Interest or reserve arithmetic left the representable range.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// A fungible ledger rejected a primitive the preconditions said would pass.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The asset registry rejected a primitive the preconditions said would pass.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LendingError {
    /// Stable machine-readable name of the variant, for metrics labels and
    /// API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LendingError::NotOwner { .. } => "not_owner",
            LendingError::AlreadyPledged(_) => "already_pledged",
            LendingError::InsufficientCollateral { .. } => "insufficient_collateral",
            LendingError::LoanNotFound(_) => "loan_not_found",
            LendingError::NotBorrower { .. } => "not_borrower",
            LendingError::AlreadyClosed { .. } => "already_closed",
            LendingError::InsufficientFunds { .. } => "insufficient_funds",
            LendingError::ReserveExceeded { .. } => "reserve_exceeded",
            LendingError::NotYetDue { .. } => "not_yet_due",
            LendingError::InvalidBeneficiary { .. } => "invalid_beneficiary",
            LendingError::NotInCustody(_) => "not_in_custody",
            LendingError::ZeroAmount => "zero_amount",
            LendingError::ExcessInterestPayment { .. } => "excess_interest_payment",
            LendingError::ArithmeticOverflow => "arithmetic_overflow",
            LendingError::Ledger(_) => "ledger",
            LendingError::Registry(_) => "registry",
        }
    }

    /// Maps a ledger debit failure onto the caller-facing funds error.
    pub(crate) fn from_debit(err: LedgerError, unit: FundsUnit) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                account,
                available,
                requested,
                ..
            } => LendingError::InsufficientFunds {
                account,
                unit,
                available,
                required: requested,
            },
            other => LendingError::Ledger(other),
        }
    }
}
