//! # Loan Ledger
//!
//! The authoritative record of every loan and the only place loan state is
//! mutated. Each operation validates every precondition it can before the
//! first side effect, then applies effects in a fixed order. If a
//! collaborator fails midway, the effects already applied are reversed
//! before the error is returned, so callers only ever observe all or
//! nothing.
//!
//! ## Serialization
//!
//! Every record sits behind its own mutex, and the book as a whole behind a
//! commit lock. Mutations hold the commit lock exclusively from their first
//! check to their last effect: custody, balances, the record and the
//! reserve counter change together. Queries hold it shared, so a snapshot
//! never shows a half-applied operation. Lock order is commit lock, then
//! record mutex.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nftlend_protocol::clock::Clock;
use nftlend_protocol::config::{ConfigError, LendingParams};
use nftlend_protocol::ledger::{AssetRegistry, FungibleLedger};
use nftlend_protocol::units::{Amount, AssetId, LoanId, RewardAmount, Timestamp, ValueAmount};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{FundsUnit, LendingError};
use crate::interest;
use crate::loan::{Loan, LoanEvent, LoanStatus, ReceiptClosed};
use crate::treasury::Treasury;
use crate::vault::CollateralVault;

/// Interest position of a loan at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestQuote {
    pub loan_id: LoanId,
    /// Total interest charged up to `as_of`.
    pub owed: RewardAmount,
    pub paid: RewardAmount,
    /// `owed - paid`. What a repayment at `as_of` would collect.
    pub outstanding: RewardAmount,
    pub as_of: Timestamp,
}

/// Consistent view of the book at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Every loan ever opened, by id.
    pub loans: Vec<Loan>,
    pub total_outstanding_principal: ValueAmount,
    /// Assets referenced by any listed loan that the custodian currently
    /// holds, ascending.
    pub in_custody: Vec<AssetId>,
    pub as_of: Timestamp,
}

pub struct LoanLedger {
    pub(crate) params: LendingParams,
    pub(crate) value: Arc<dyn FungibleLedger<ValueAmount>>,
    pub(crate) reward: Arc<dyn FungibleLedger<RewardAmount>>,
    pub(crate) vault: CollateralVault,
    pub(crate) treasury: Treasury,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) loans: DashMap<LoanId, Arc<Mutex<Loan>>>,
    pub(crate) commit: RwLock<()>,
    next_id: AtomicU64,
    events: RwLock<Vec<LoanEvent>>,
}

impl std::fmt::Debug for LoanLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanLedger")
            .field("params", &self.params)
            .field("loans", &self.loans.len())
            .field("outstanding", &self.treasury.outstanding())
            .finish_non_exhaustive()
    }
}

impl LoanLedger {
    /// Wires the engine to its collaborators.
    ///
    /// The value ledger handle must carry mint and burn authority. Parameters
    /// are validated here and never change afterwards.
    pub fn new(
        params: LendingParams,
        value: Arc<dyn FungibleLedger<ValueAmount>>,
        reward: Arc<dyn FungibleLedger<RewardAmount>>,
        assets: Arc<dyn AssetRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;

        let vault = CollateralVault::new(assets, params.custodian.clone());
        let treasury = Treasury::new(params.treasury.clone(), params.reserve_cap);

        tracing::info!(
            term_secs = params.term_secs,
            interest_rate_bps = params.interest_rate_bps,
            max_ltv_bps = params.max_ltv_bps,
            reserve_cap = %params.reserve_cap,
            "loan ledger initialized"
        );

        Ok(Self {
            params,
            value,
            reward,
            vault,
            treasury,
            clock,
            loans: DashMap::new(),
            commit: RwLock::new(()),
            next_id: AtomicU64::new(0),
            events: RwLock::new(Vec::new()),
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Pledges `asset_id` and disburses `principal` to `borrower`.
    ///
    /// # Errors
    ///
    /// `ZeroAmount`, `InsufficientCollateral`, `NotOwner`, `AlreadyPledged`
    /// or `ReserveExceeded`. Nothing is mutated on failure.
    pub fn open_loan(
        &self,
        borrower: &str,
        asset_id: AssetId,
        principal: ValueAmount,
    ) -> Result<LoanId, LendingError> {
        self.try_open_loan(borrower, asset_id, principal)
            .map_err(|err| rejected("open_loan", err))
    }

    fn try_open_loan(
        &self,
        borrower: &str,
        asset_id: AssetId,
        principal: ValueAmount,
    ) -> Result<LoanId, LendingError> {
        if principal.is_zero() {
            return Err(LendingError::ZeroAmount);
        }
        let _commit = self.commit.write();
        let max_allowed = self.params.max_principal();
        if principal > max_allowed {
            return Err(LendingError::InsufficientCollateral {
                requested: principal,
                max_allowed,
            });
        }
        self.vault.check_depositable(asset_id, borrower)?;
        self.treasury.reserve(principal)?;

        let now = self.clock.now();
        let receipt = match self.vault.deposit(asset_id, borrower, now) {
            Ok(receipt) => receipt,
            Err(err) => {
                self.treasury.restore(principal);
                return Err(err.into());
            }
        };

        if let Err(err) = self.value.mint(borrower, principal) {
            self.compensate("return collateral", self.vault.release(asset_id, borrower));
            self.treasury.restore(principal);
            return Err(err.into());
        }

        let id = LoanId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let loan = Loan::open(id, borrower, asset_id, principal, now, self.params.term_secs);
        let due_at = loan.due_at;
        self.loans.insert(id, Arc::new(Mutex::new(loan)));
        self.record(LoanEvent::Opened {
            loan_id: id,
            borrower: borrower.to_string(),
            asset_id,
            principal,
            due_at,
        });

        tracing::info!(
            loan_id = %id,
            borrower,
            asset_id = %asset_id,
            principal = %principal,
            due_at,
            receipt = %receipt.receipt_id,
            "loan opened"
        );
        Ok(id)
    }

    /// Settles principal and outstanding interest and returns the collateral.
    ///
    /// Principal is burned from `caller` in value units; interest not yet
    /// settled is transferred from `caller` to the treasury in reward units.
    ///
    /// # Errors
    ///
    /// `LoanNotFound`, `AlreadyClosed`, `NotBorrower` or `InsufficientFunds`.
    /// The loan stays `Open` and in custody on any failure.
    pub fn repay(&self, loan_id: LoanId, caller: &str) -> Result<ReceiptClosed, LendingError> {
        self.try_repay(loan_id, caller)
            .map_err(|err| rejected("repay", err))
    }

    fn try_repay(&self, loan_id: LoanId, caller: &str) -> Result<ReceiptClosed, LendingError> {
        let _commit = self.commit.write();
        let handle = self.loan_handle(loan_id)?;
        let mut loan = handle.lock();
        ensure_open(&loan)?;
        ensure_borrower(&loan, caller)?;

        let now = self.clock.now();
        let owed = interest::interest_owed(&loan, self.params.interest_rate_bps, now)?;
        let settle = owed.saturating_sub(loan.interest_paid);
        let principal = loan.principal;

        let value_balance = self.value.balance_of(caller);
        if value_balance < principal {
            return Err(LendingError::InsufficientFunds {
                account: caller.to_string(),
                unit: FundsUnit::Value,
                available: value_balance.raw(),
                required: principal.raw(),
            });
        }
        let reward_balance = self.reward.balance_of(caller);
        if reward_balance < settle {
            return Err(LendingError::InsufficientFunds {
                account: caller.to_string(),
                unit: FundsUnit::Reward,
                available: reward_balance.raw(),
                required: settle.raw(),
            });
        }

        self.value
            .burn(caller, principal)
            .map_err(|err| LendingError::from_debit(err, FundsUnit::Value))?;

        if !settle.is_zero() {
            if let Err(err) = self.reward.transfer(caller, self.treasury.account(), settle) {
                self.compensate("re-mint principal", self.value.mint(caller, principal));
                return Err(LendingError::from_debit(err, FundsUnit::Reward));
            }
        }

        if let Err(err) = self.vault.release(loan.collateral_asset_id, &loan.borrower) {
            if !settle.is_zero() {
                self.compensate(
                    "refund interest",
                    self.reward.transfer(self.treasury.account(), caller, settle),
                );
            }
            self.compensate("re-mint principal", self.value.mint(caller, principal));
            return Err(err.into());
        }

        loan.status = LoanStatus::Repaid;
        loan.interest_paid = owed;
        loan.closed_at = Some(now);
        self.treasury.restore(principal);
        self.record(LoanEvent::Repaid {
            loan_id,
            principal,
            interest_settled: settle,
            at: now,
        });

        tracing::info!(
            loan_id = %loan_id,
            borrower = %loan.borrower,
            principal = %principal,
            interest_settled = %settle,
            interest_total = %owed,
            "loan repaid"
        );

        Ok(ReceiptClosed {
            loan_id,
            borrower: loan.borrower.clone(),
            collateral_asset_id: loan.collateral_asset_id,
            principal_repaid: principal,
            interest_settled: settle,
            interest_total: owed,
            closed_at: now,
        })
    }

    /// Settles part of the accrued interest without closing the loan.
    /// Returns the interest still outstanding afterwards.
    ///
    /// # Errors
    ///
    /// `ZeroAmount`, `LoanNotFound`, `AlreadyClosed`, `NotBorrower`,
    /// `ExcessInterestPayment` if `amount` is more than has accrued, or
    /// `InsufficientFunds`.
    pub fn partial_interest_payment(
        &self,
        loan_id: LoanId,
        caller: &str,
        amount: RewardAmount,
    ) -> Result<RewardAmount, LendingError> {
        self.try_partial_interest_payment(loan_id, caller, amount)
            .map_err(|err| rejected("partial_interest_payment", err))
    }

    fn try_partial_interest_payment(
        &self,
        loan_id: LoanId,
        caller: &str,
        amount: RewardAmount,
    ) -> Result<RewardAmount, LendingError> {
        if amount.is_zero() {
            return Err(LendingError::ZeroAmount);
        }
        let _commit = self.commit.write();
        let handle = self.loan_handle(loan_id)?;
        let mut loan = handle.lock();
        ensure_open(&loan)?;
        ensure_borrower(&loan, caller)?;

        let now = self.clock.now();
        let outstanding =
            interest::outstanding_interest(&loan, self.params.interest_rate_bps, now)?;
        if amount > outstanding {
            return Err(LendingError::ExcessInterestPayment {
                loan_id,
                attempted: amount,
                outstanding,
            });
        }
        let interest_paid = loan
            .interest_paid
            .checked_add(amount)
            .ok_or(LendingError::ArithmeticOverflow)?;

        self.reward
            .transfer(caller, self.treasury.account(), amount)
            .map_err(|err| LendingError::from_debit(err, FundsUnit::Reward))?;
        loan.interest_paid = interest_paid;
        self.record(LoanEvent::InterestPaid {
            loan_id,
            amount,
            interest_paid,
        });

        let remaining = outstanding.saturating_sub(amount);
        tracing::info!(
            loan_id = %loan_id,
            amount = %amount,
            interest_paid = %interest_paid,
            remaining = %remaining,
            "interest paid"
        );
        Ok(remaining)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of one loan.
    pub fn get_loan(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        let _book = self.commit.read();
        let handle = self.loan_handle(loan_id)?;
        let loan = handle.lock().clone();
        Ok(loan)
    }

    /// Sum of principal over all open loans.
    pub fn total_outstanding_principal(&self) -> ValueAmount {
        let _book = self.commit.read();
        self.treasury.outstanding()
    }

    /// Interest owed on the loan as of now. For a closed loan this is the
    /// total it was charged.
    pub fn interest_owed(&self, loan_id: LoanId) -> Result<RewardAmount, LendingError> {
        Ok(self.interest_quote(loan_id)?.owed)
    }

    pub fn interest_quote(&self, loan_id: LoanId) -> Result<InterestQuote, LendingError> {
        let loan = self.get_loan(loan_id)?;
        let as_of = self.clock.now();
        let owed = if loan.is_open() {
            interest::interest_owed(&loan, self.params.interest_rate_bps, as_of)?
        } else {
            loan.interest_paid
        };
        Ok(InterestQuote {
            loan_id,
            owed,
            paid: loan.interest_paid,
            outstanding: owed.saturating_sub(loan.interest_paid),
            as_of,
        })
    }

    /// Every loan ever opened, by id.
    pub fn loans(&self) -> Vec<Loan> {
        let _book = self.commit.read();
        self.collect_loans()
    }

    /// Loans, reserve and custody read under one shared commit guard.
    pub fn snapshot(&self) -> BookSnapshot {
        let _book = self.commit.read();
        let loans = self.collect_loans();
        let pledged: BTreeSet<AssetId> = loans.iter().map(|l| l.collateral_asset_id).collect();
        let in_custody = pledged
            .into_iter()
            .filter(|asset_id| self.vault.in_custody(*asset_id))
            .collect();
        BookSnapshot {
            loans,
            total_outstanding_principal: self.treasury.outstanding(),
            in_custody,
            as_of: self.clock.now(),
        }
    }

    pub fn loans_by_borrower(&self, borrower: &str) -> Vec<Loan> {
        self.loans()
            .into_iter()
            .filter(|l| l.borrower == borrower)
            .collect()
    }

    /// The open loan currently pledging `asset_id`, if any.
    pub fn open_loan_for_asset(&self, asset_id: AssetId) -> Option<Loan> {
        let _book = self.commit.read();
        self.handles()
            .iter()
            .map(|h| h.lock().clone())
            .find(|l| l.is_open() && l.collateral_asset_id == asset_id)
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    pub fn open_loan_count(&self) -> usize {
        let _book = self.commit.read();
        self.handles().iter().filter(|h| h.lock().is_open()).count()
    }

    /// Journal of committed state changes, oldest first.
    pub fn events(&self) -> Vec<LoanEvent> {
        self.events.read().clone()
    }

    pub fn params(&self) -> &LendingParams {
        &self.params
    }

    /// Principal that can still be disbursed before hitting the reserve cap.
    pub fn reserve_available(&self) -> ValueAmount {
        let _book = self.commit.read();
        self.treasury.available()
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn vault(&self) -> &CollateralVault {
        &self.vault
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Clones the record handle out of the map so the shard lock is released
    /// before the record's own mutex is taken.
    pub(crate) fn loan_handle(&self, loan_id: LoanId) -> Result<Arc<Mutex<Loan>>, LendingError> {
        self.loans
            .get(&loan_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LendingError::LoanNotFound(loan_id))
    }

    fn collect_loans(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self.handles().iter().map(|h| h.lock().clone()).collect();
        loans.sort_by_key(|l| l.id);
        loans
    }

    pub(crate) fn handles(&self) -> Vec<Arc<Mutex<Loan>>> {
        self.loans
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub(crate) fn record(&self, event: LoanEvent) {
        self.events.write().push(event);
    }

    /// Applies a reversing step. A failure here means a collaborator broke
    /// its own contract; it is logged, and the triggering error is returned.
    fn compensate<E: std::fmt::Display>(&self, action: &'static str, result: Result<(), E>) {
        match result {
            Ok(()) => tracing::warn!(action, "compensated partial operation"),
            Err(err) => tracing::error!(action, error = %err, "compensation failed"),
        }
    }
}

pub(crate) fn ensure_open(loan: &Loan) -> Result<(), LendingError> {
    if loan.status.is_terminal() {
        return Err(LendingError::AlreadyClosed {
            loan_id: loan.id,
            status: loan.status,
        });
    }
    Ok(())
}

fn ensure_borrower(loan: &Loan, caller: &str) -> Result<(), LendingError> {
    if loan.borrower != caller {
        return Err(LendingError::NotBorrower {
            loan_id: loan.id,
            caller: caller.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn rejected(op: &'static str, err: LendingError) -> LendingError {
    tracing::warn!(op, kind = err.kind(), error = %err, "request rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftlend_protocol::clock::ManualClock;
    use nftlend_protocol::ledger::{CollateralRegistry, FungibleToken};

    const ALICE: &str = "alice";
    const TERM: u64 = 1_000;

    struct Fixture {
        ledger: LoanLedger,
        value: Arc<FungibleToken<ValueAmount>>,
        reward: Arc<FungibleToken<RewardAmount>>,
        assets: Arc<CollateralRegistry>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let value = Arc::new(FungibleToken::<ValueAmount>::new("USD Coin", "USDC"));
        let reward = Arc::new(FungibleToken::<RewardAmount>::new("EmpowerDefi", "ED"));
        let assets = Arc::new(CollateralRegistry::new("EmpowerDefi NFT", "DefiNFT"));
        let clock = Arc::new(ManualClock::new(10_000));
        let params = LendingParams {
            term_secs: TERM,
            ..LendingParams::default()
        };
        let ledger = LoanLedger::new(
            params,
            value.clone(),
            reward.clone(),
            assets.clone(),
            clock.clone(),
        )
        .unwrap();
        Fixture {
            ledger,
            value,
            reward,
            assets,
            clock,
        }
    }

    #[test]
    fn invalid_params_rejected_at_construction() {
        let f = fixture();
        let params = LendingParams {
            term_secs: 0,
            ..LendingParams::default()
        };
        let result = LoanLedger::new(params, f.value, f.reward, f.assets, f.clock);
        assert!(matches!(result, Err(ConfigError::ZeroTerm)));
    }

    #[test]
    fn open_assigns_monotonic_ids() {
        let f = fixture();
        let a = f.assets.mint(ALICE).unwrap();
        let b = f.assets.mint(ALICE).unwrap();
        let first = f.ledger.open_loan(ALICE, a, ValueAmount::from_whole(100)).unwrap();
        let second = f.ledger.open_loan(ALICE, b, ValueAmount::from_whole(100)).unwrap();
        assert_eq!(first, LoanId(1));
        assert_eq!(second, LoanId(2));
        assert_eq!(f.ledger.loan_count(), 2);
    }

    #[test]
    fn open_disburses_and_takes_custody() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();

        let loan = f.ledger.get_loan(id).unwrap();
        assert_eq!(loan.status, LoanStatus::Open);
        assert_eq!(loan.opened_at, 10_000);
        assert_eq!(loan.due_at, 10_000 + TERM);
        assert_eq!(f.value.balance_of(ALICE), ValueAmount::from_whole(500));
        assert!(f.ledger.vault().in_custody(asset));
        assert_eq!(
            f.ledger.total_outstanding_principal(),
            ValueAmount::from_whole(500)
        );
        assert_eq!(f.ledger.open_loan_for_asset(asset).map(|l| l.id), Some(id));
    }

    #[test]
    fn zero_principal_rejected() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        assert_eq!(
            f.ledger.open_loan(ALICE, asset, ValueAmount::ZERO),
            Err(LendingError::ZeroAmount)
        );
    }

    #[test]
    fn principal_above_ltv_rejected() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        // default: 1000 collateral at 50% LTV
        let err = f
            .ledger
            .open_loan(ALICE, asset, ValueAmount::from_whole(501))
            .unwrap_err();
        assert_eq!(
            err,
            LendingError::InsufficientCollateral {
                requested: ValueAmount::from_whole(501),
                max_allowed: ValueAmount::from_whole(500),
            }
        );
        assert_eq!(f.assets.owner_of(asset).unwrap(), ALICE);
        assert_eq!(f.ledger.loan_count(), 0);
    }

    #[test]
    fn reserve_cap_enforced() {
        let f = fixture();
        let params = LendingParams {
            reserve_cap: ValueAmount::from_whole(600),
            ..LendingParams::default()
        };
        let ledger = LoanLedger::new(
            params,
            f.value.clone(),
            f.reward.clone(),
            f.assets.clone(),
            f.clock.clone(),
        )
        .unwrap();
        let a = f.assets.mint(ALICE).unwrap();
        let b = f.assets.mint(ALICE).unwrap();
        ledger.open_loan(ALICE, a, ValueAmount::from_whole(500)).unwrap();

        let err = ledger
            .open_loan(ALICE, b, ValueAmount::from_whole(200))
            .unwrap_err();
        assert_eq!(err.kind(), "reserve_exceeded");
        assert_eq!(f.assets.owner_of(b).unwrap(), ALICE);
        assert_eq!(ledger.reserve_available(), ValueAmount::from_whole(100));
    }

    #[test]
    fn repay_with_interest_pays_treasury() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();
        f.reward.mint(ALICE, RewardAmount::from_whole(100)).unwrap();
        f.clock.advance(TERM / 2);

        let receipt = f.ledger.repay(id, ALICE).unwrap();
        assert_eq!(receipt.interest_settled.to_string(), "12.5");
        assert_eq!(receipt.interest_total, receipt.interest_settled);
        assert_eq!(
            f.reward.balance_of("protocol:treasury").to_string(),
            "12.5"
        );
        assert_eq!(f.value.balance_of(ALICE), ValueAmount::ZERO);
        assert_eq!(f.value.total_supply(), ValueAmount::ZERO);
        assert_eq!(f.assets.owner_of(asset).unwrap(), ALICE);
    }

    #[test]
    fn repay_by_stranger_rejected() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();

        assert_eq!(
            f.ledger.repay(id, "bob"),
            Err(LendingError::NotBorrower {
                loan_id: id,
                caller: "bob".into(),
            })
        );
        assert!(f.ledger.get_loan(id).unwrap().is_open());
    }

    #[test]
    fn repay_short_of_interest_changes_nothing() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();
        f.clock.advance(TERM);

        let err = f.ledger.repay(id, ALICE).unwrap_err();
        assert!(matches!(
            err,
            LendingError::InsufficientFunds {
                unit: FundsUnit::Reward,
                ..
            }
        ));
        assert_eq!(f.value.balance_of(ALICE), ValueAmount::from_whole(500));
        assert!(f.ledger.vault().in_custody(asset));
        assert!(f.ledger.get_loan(id).unwrap().is_open());
    }

    #[test]
    fn partial_interest_tracks_paid() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();
        f.reward.mint(ALICE, RewardAmount::from_whole(100)).unwrap();
        f.clock.advance(TERM);

        let remaining = f
            .ledger
            .partial_interest_payment(id, ALICE, RewardAmount::from_whole(10))
            .unwrap();
        assert_eq!(remaining, RewardAmount::from_whole(15));
        assert_eq!(
            f.ledger.get_loan(id).unwrap().interest_paid,
            RewardAmount::from_whole(10)
        );

        let err = f
            .ledger
            .partial_interest_payment(id, ALICE, RewardAmount::from_whole(16))
            .unwrap_err();
        assert_eq!(err.kind(), "excess_interest_payment");

        let receipt = f.ledger.repay(id, ALICE).unwrap();
        assert_eq!(receipt.interest_settled, RewardAmount::from_whole(15));
        assert_eq!(receipt.interest_total, RewardAmount::from_whole(25));
        assert_eq!(
            f.reward.balance_of("protocol:treasury"),
            RewardAmount::from_whole(25)
        );
    }

    #[test]
    fn interest_quote_reflects_elapsed_time() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(500)).unwrap();
        f.clock.advance(TERM / 5);

        let quote = f.ledger.interest_quote(id).unwrap();
        assert_eq!(quote.owed, RewardAmount::from_whole(5));
        assert_eq!(quote.outstanding, RewardAmount::from_whole(5));
        assert_eq!(quote.as_of, 10_000 + TERM / 5);
        assert_eq!(f.ledger.interest_owed(id).unwrap(), RewardAmount::from_whole(5));
    }

    #[test]
    fn unknown_loan_reported() {
        let f = fixture();
        assert_eq!(
            f.ledger.get_loan(LoanId(9)),
            Err(LendingError::LoanNotFound(LoanId(9)))
        );
        assert_eq!(
            f.ledger.repay(LoanId(9), ALICE),
            Err(LendingError::LoanNotFound(LoanId(9)))
        );
    }

    #[test]
    fn events_journal_in_commit_order() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let id = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(100)).unwrap();
        f.ledger.repay(id, ALICE).unwrap();

        let events = f.ledger.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LoanEvent::Opened { .. }));
        assert!(matches!(events[1], LoanEvent::Repaid { .. }));
        assert!(events.iter().all(|e| e.loan_id() == id));
    }

    #[test]
    fn snapshot_lists_custody_once_per_asset() {
        let f = fixture();
        let asset = f.assets.mint(ALICE).unwrap();
        let first = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(100)).unwrap();
        f.ledger.repay(first, ALICE).unwrap();
        let second = f.ledger.open_loan(ALICE, asset, ValueAmount::from_whole(200)).unwrap();

        let snap = f.ledger.snapshot();
        assert_eq!(snap.loans.len(), 2);
        assert_eq!(snap.loans[1].id, second);
        assert_eq!(snap.in_custody, vec![asset]);
        assert_eq!(snap.total_outstanding_principal, ValueAmount::from_whole(200));
        assert_eq!(snap.as_of, f.clock.now());
    }
}
