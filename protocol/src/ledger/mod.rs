//! # Collaborator Ledgers
//!
//! The lending engine does not own money or collateral. It drives two
//! external ledgers through narrow interfaces:
//!
//! ```text
//! FungibleLedger<U>  : balances of one fungible unit (value or reward)
//! AssetRegistry      : single ownership of non-fungible collateral assets
//! ```
//!
//! Implementations are expected to guarantee their own internal
//! correctness: no negative balances, exactly one owner per asset, and
//! every primitive applied atomically. The in-memory implementations in
//! [`token`] and [`registry`] hold their state behind a single lock each
//! so that holds.

pub mod registry;
pub mod token;

pub use registry::{AssetTransfer, CollateralRegistry};
pub use token::{FungibleToken, TokenInfo};

use thiserror::Error;

use crate::units::{AccountId, Amount, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a fungible ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Debit larger than the account balance.
    #[error("insufficient {unit} balance: {account} holds {available}, requested {requested}")]
    InsufficientBalance {
        /// Unit of the ledger that rejected the debit.
        unit: &'static str,
        /// The account being debited.
        account: AccountId,
        /// Raw balance at the time of the request.
        available: u128,
        /// Raw amount requested.
        requested: u128,
    },

    /// A credit would overflow the balance or the total supply.
    #[error("{unit} supply overflow: crediting {requested}")]
    SupplyOverflow {
        /// Unit of the ledger that rejected the credit.
        unit: &'static str,
        /// Raw amount that could not be credited.
        requested: u128,
    },

    /// Empty account identity.
    #[error("invalid account identity")]
    InvalidAccount,
}

/// Errors raised by the asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No asset with this id has been minted.
    #[error("asset {0} does not exist")]
    AssetNotFound(AssetId),

    /// `from` does not own the asset. The actual owner is reported so
    /// callers can tell "someone else holds it" apart from custody.
    #[error("asset {asset_id} is owned by {actual}, not {claimed}")]
    NotOwner {
        asset_id: AssetId,
        claimed: AccountId,
        actual: AccountId,
    },

    /// Empty account identity.
    #[error("invalid account identity")]
    InvalidAccount,
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Balance tracking for one fungible unit `U`.
///
/// The handle given to the lending engine carries mint and burn authority
/// for the value unit; authorization is the implementor's concern.
pub trait FungibleLedger<U: Amount>: Send + Sync {
    /// Creates `amount` out of thin air in `to`'s balance.
    fn mint(&self, to: &str, amount: U) -> Result<(), LedgerError>;

    /// Destroys `amount` from `from`'s balance.
    fn burn(&self, from: &str, amount: U) -> Result<(), LedgerError>;

    /// Moves `amount` from `from` to `to`. Supply is unchanged.
    fn transfer(&self, from: &str, to: &str, amount: U) -> Result<(), LedgerError>;

    /// Current balance of `account` (zero if never seen).
    fn balance_of(&self, account: &str) -> U;

    /// Sum of all balances.
    fn total_supply(&self) -> U;
}

/// Single-owner registry of collateral assets.
pub trait AssetRegistry: Send + Sync {
    /// Mints a fresh asset to `to` and returns its id.
    fn mint(&self, to: &str) -> Result<AssetId, RegistryError>;

    /// Current owner of `asset_id`.
    fn owner_of(&self, asset_id: AssetId) -> Result<AccountId, RegistryError>;

    /// Moves `asset_id` from `from` to `to`. Fails unless `from` is the
    /// current owner; the check and the move are one atomic step.
    fn transfer_from(&self, from: &str, to: &str, asset_id: AssetId) -> Result<(), RegistryError>;

    /// Number of assets held by `owner`.
    fn balance_of(&self, owner: &str) -> u64;
}
