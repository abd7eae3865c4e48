// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NFT Lending Contracts
//!
//! The loan accounting and lifecycle engine. A borrower pledges a collateral
//! asset, receives principal in the value unit, and later repays principal
//! plus interest (in the reward unit) to recover the asset, or forfeits it
//! to liquidation after the due date.
//!
//! - **Collateral Vault**: custody as registry ownership by a holding identity.
//! - **Loan Ledger**: the authoritative loan store and state machine.
//! - **Treasury**: the cap on aggregate outstanding principal.
//! - **Interest Accrual**: pure time-based interest computation.
//! - **Liquidation Engine**: permissionless seizure of overdue collateral.
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked. Wrapping arithmetic and money do
//!    not mix.
//! 2. State transitions are explicit enum variants and only ever leave `Open`.
//! 3. Identity checks (owner, borrower) run before any mutation.
//! 4. Every operation is all-or-nothing; partial collaborator effects are
//!    reversed before an error is returned.

pub mod error;
pub mod interest;
pub mod ledger;
pub mod liquidation;
pub mod loan;
pub mod treasury;
pub mod vault;

pub use error::{FundsUnit, LendingError};
pub use ledger::{BookSnapshot, InterestQuote, LoanLedger};
pub use liquidation::is_liquidatable;
pub use loan::{Loan, LoanEvent, LoanStatus, ReceiptClosed, ReceiptLiquidated};
pub use treasury::Treasury;
pub use vault::{CollateralVault, CustodyReceipt, VaultError};
