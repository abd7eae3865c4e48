//! # Protocol Configuration & Constants
//!
//! Every magic number of the lending engine lives here, together with the
//! [`LendingParams`] bundle handed to the loan ledger at construction.
//! Parameters are fixed for the lifetime of a deployment: there is no
//! setter, no governance hook, no hot reload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{AccountId, Amount, ValueAmount};

// ---------------------------------------------------------------------------
// Unit Scale
// ---------------------------------------------------------------------------

/// Fractional decimal digits of every fungible unit. Matches the 18-decimal
/// fixtures of the collaborating token contracts.
pub const UNIT_DECIMALS: u32 = 18;

/// One whole unit in raw fixed-point form (`10^18`).
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Denominator for every ratio expressed in basis points. 1 bp = 0.01%.
pub const BPS_DENOMINATOR: u128 = 10_000;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default loan term: 30 days.
pub const DEFAULT_LOAN_TERM_SECS: u64 = 30 * 24 * 60 * 60;

/// Default interest over one full term, in basis points of principal.
/// 500 bps = 5.00% for a loan held to its due date.
pub const DEFAULT_INTEREST_RATE_BPS: u32 = 500;

/// Default maximum loan-to-value ratio: 50%.
pub const DEFAULT_MAX_LTV_BPS: u32 = 5_000;

/// Default fixed valuation of one collateral asset, in whole value units.
/// There is no oracle; every asset of the single collateral class is worth
/// the same.
pub const DEFAULT_COLLATERAL_VALUE: u64 = 1_000;

/// Default cap on aggregate outstanding principal, in whole value units.
pub const DEFAULT_RESERVE_CAP: u64 = 1_000_000;

/// Holding identity that takes custody of pledged collateral.
pub const DEFAULT_CUSTODIAN: &str = "protocol:custody";

/// Treasury identity that receives interest and (by default) seized collateral.
pub const DEFAULT_TREASURY: &str = "protocol:treasury";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by [`LendingParams::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A loan term of zero would make every loan due at open time.
    #[error("loan term must be positive")]
    ZeroTerm,

    /// LTV must be within `1..=10_000` basis points.
    #[error("max loan-to-value {0} bps is outside 1..=10000")]
    InvalidLoanToValue(u32),

    /// The fixed collateral valuation must be positive.
    #[error("collateral value must be positive")]
    ZeroCollateralValue,

    /// An identity parameter was left empty.
    #[error("{0} identity must not be empty")]
    EmptyIdentity(&'static str),

    /// Custodian and treasury must be distinct identities so that custody
    /// can be told apart from forfeiture.
    #[error("custodian and treasury must be different identities (both {0:?})")]
    SharedIdentity(AccountId),
}

// ---------------------------------------------------------------------------
// Liquidation beneficiary
// ---------------------------------------------------------------------------

/// Who receives the collateral of a liquidated loan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationBeneficiary {
    /// Collateral is forfeited to the protocol treasury.
    #[default]
    Treasury,
    /// Collateral goes to whoever triggered the liquidation.
    Liquidator,
}

// ---------------------------------------------------------------------------
// LendingParams
// ---------------------------------------------------------------------------

/// Deployment-time parameters of the lending engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingParams {
    /// Loan term in seconds: `due_at = opened_at + term_secs`.
    pub term_secs: u64,

    /// Interest over one full term, in basis points of principal, paid in
    /// the reward unit.
    pub interest_rate_bps: u32,

    /// Maximum principal as a fraction of the collateral value, in bps.
    pub max_ltv_bps: u32,

    /// Fixed valuation of one collateral asset.
    pub collateral_value: ValueAmount,

    /// Maximum aggregate principal outstanding across open loans.
    pub reserve_cap: ValueAmount,

    /// Holding identity for collateral in custody.
    pub custodian: AccountId,

    /// Treasury identity receiving interest payments.
    pub treasury: AccountId,

    /// Recipient policy for seized collateral.
    pub liquidation_beneficiary: LiquidationBeneficiary,
}

impl Default for LendingParams {
    fn default() -> Self {
        Self {
            term_secs: DEFAULT_LOAN_TERM_SECS,
            interest_rate_bps: DEFAULT_INTEREST_RATE_BPS,
            max_ltv_bps: DEFAULT_MAX_LTV_BPS,
            collateral_value: ValueAmount::from_whole(DEFAULT_COLLATERAL_VALUE),
            reserve_cap: ValueAmount::from_whole(DEFAULT_RESERVE_CAP),
            custodian: DEFAULT_CUSTODIAN.to_string(),
            treasury: DEFAULT_TREASURY.to_string(),
            liquidation_beneficiary: LiquidationBeneficiary::Treasury,
        }
    }
}

impl LendingParams {
    /// Checks the parameter bundle for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.term_secs == 0 {
            return Err(ConfigError::ZeroTerm);
        }
        if self.max_ltv_bps == 0 || self.max_ltv_bps as u128 > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidLoanToValue(self.max_ltv_bps));
        }
        if self.collateral_value.is_zero() {
            return Err(ConfigError::ZeroCollateralValue);
        }
        if self.custodian.is_empty() {
            return Err(ConfigError::EmptyIdentity("custodian"));
        }
        if self.treasury.is_empty() {
            return Err(ConfigError::EmptyIdentity("treasury"));
        }
        if self.custodian == self.treasury {
            return Err(ConfigError::SharedIdentity(self.custodian.clone()));
        }
        Ok(())
    }

    /// Largest principal a single collateral asset can secure.
    ///
    /// `collateral_value * max_ltv_bps / 10_000`, truncating. The LTV is at
    /// most 10 000 so the product only overflows for valuations within a
    /// factor of 10^4 of `u128::MAX`; those saturate.
    pub fn max_principal(&self) -> ValueAmount {
        let raw = self
            .collateral_value
            .raw()
            .checked_mul(self.max_ltv_bps as u128)
            .map(|v| v / BPS_DENOMINATOR)
            .unwrap_or(u128::MAX);
        ValueAmount::new(raw)
    }
}
