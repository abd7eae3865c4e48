// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # nftlend Protocol: Shared Primitives
//!
//! Everything the lending contracts need that is not itself lending logic:
//!
//! - **units**: fixed-point value and reward amounts, asset and loan ids.
//! - **clock**: injectable time source (wall clock or manual).
//! - **config**: protocol constants and the deployment parameter bundle.
//! - **ledger**: the collaborator interfaces (fungible ledger, asset
//!   registry) plus in-memory implementations of both.
//!
//! ## Design Philosophy
//!
//! 1. No floating point anywhere near money. Raw `u128`, 18 decimals.
//! 2. Value and reward units are different types. The compiler refuses
//!    to add interest to principal.
//! 3. Collaborators are traits. The engine never reaches into a ledger's
//!    storage, it calls `mint`, `burn`, `transfer`, `transfer_from`.

pub mod clock;
pub mod config;
pub mod ledger;
pub mod units;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LendingParams, LiquidationBeneficiary};
pub use ledger::{
    AssetRegistry, CollateralRegistry, FungibleLedger, FungibleToken, LedgerError, RegistryError,
};
pub use units::{AccountId, Amount, AssetId, LoanId, RewardAmount, Timestamp, ValueAmount};
