//! # Liquidation Engine
//!
//! Permissionless closure of overdue loans. Anyone may call
//! [`LoanLedger::liquidate`] once a loan is strictly past its due date; the
//! collateral is seized to the configured beneficiary and the principal is
//! written off the reserve. No interest is charged or refunded.
//!
//! Nothing runs on a timer. Default watchers poll
//! [`LoanLedger::liquidatable_loans`] and call `liquidate` themselves.

use nftlend_protocol::config::LiquidationBeneficiary;
use nftlend_protocol::units::{LoanId, Timestamp};

use crate::error::LendingError;
use crate::ledger::{ensure_open, rejected, LoanLedger};
use crate::loan::{Loan, LoanEvent, LoanStatus, ReceiptLiquidated};

/// Whether `loan` may be liquidated at `now`. The due date itself still
/// belongs to the borrower.
pub fn is_liquidatable(loan: &Loan, now: Timestamp) -> bool {
    loan.is_open() && now > loan.due_at
}

impl LoanLedger {
    /// Seizes the collateral of an overdue loan.
    ///
    /// # Errors
    ///
    /// `LoanNotFound`, `AlreadyClosed`, `NotYetDue` while `now <= due_at`,
    /// or `InvalidBeneficiary` when the collateral would go to the custodian
    /// or, under the liquidator policy, back to the borrower.
    pub fn liquidate(&self, loan_id: LoanId, caller: &str) -> Result<ReceiptLiquidated, LendingError> {
        self.try_liquidate(loan_id, caller)
            .map_err(|err| rejected("liquidate", err))
    }

    fn try_liquidate(&self, loan_id: LoanId, caller: &str) -> Result<ReceiptLiquidated, LendingError> {
        let _commit = self.commit.write();
        let handle = self.loan_handle(loan_id)?;
        let mut loan = handle.lock();
        ensure_open(&loan)?;

        let now = self.clock.now();
        if now <= loan.due_at {
            return Err(LendingError::NotYetDue {
                loan_id,
                due_at: loan.due_at,
                now,
            });
        }

        let beneficiary = match self.params.liquidation_beneficiary {
            LiquidationBeneficiary::Treasury => self.treasury.account().to_string(),
            LiquidationBeneficiary::Liquidator if caller == loan.borrower => {
                return Err(LendingError::InvalidBeneficiary {
                    loan_id,
                    beneficiary: caller.to_string(),
                });
            }
            LiquidationBeneficiary::Liquidator => caller.to_string(),
        };
        if beneficiary == self.vault.custodian() {
            return Err(LendingError::InvalidBeneficiary {
                loan_id,
                beneficiary,
            });
        }
        self.vault.seize(loan.collateral_asset_id, &beneficiary)?;

        loan.status = LoanStatus::Liquidated;
        loan.closed_at = Some(now);
        self.treasury.restore(loan.principal);
        self.record(LoanEvent::Liquidated {
            loan_id,
            liquidator: caller.to_string(),
            beneficiary: beneficiary.clone(),
            at: now,
        });

        tracing::info!(
            loan_id = %loan_id,
            borrower = %loan.borrower,
            liquidator = caller,
            beneficiary = %beneficiary,
            principal = %loan.principal,
            overdue_secs = now - loan.due_at,
            "loan liquidated"
        );

        Ok(ReceiptLiquidated {
            loan_id,
            borrower: loan.borrower.clone(),
            collateral_asset_id: loan.collateral_asset_id,
            liquidator: caller.to_string(),
            beneficiary,
            principal_written_off: loan.principal,
            liquidated_at: now,
        })
    }

    /// Ids of every open loan past its due date, ascending.
    pub fn liquidatable_loans(&self) -> Vec<LoanId> {
        let _book = self.commit.read();
        let now = self.clock.now();
        let mut ids: Vec<LoanId> = self
            .handles()
            .iter()
            .filter_map(|handle| {
                let loan = handle.lock();
                is_liquidatable(&loan, now).then_some(loan.id)
            })
            .collect();
        ids.sort();
        tracing::debug!(count = ids.len(), now, "scanned for liquidatable loans");
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nftlend_protocol::clock::ManualClock;
    use nftlend_protocol::config::LendingParams;
    use nftlend_protocol::ledger::{AssetRegistry, CollateralRegistry, FungibleToken};
    use nftlend_protocol::units::{Amount, AssetId, RewardAmount, ValueAmount};

    const TERM: u64 = 100;

    fn setup(
        beneficiary: LiquidationBeneficiary,
    ) -> (LoanLedger, Arc<CollateralRegistry>, Arc<ManualClock>) {
        let assets = Arc::new(CollateralRegistry::new("EmpowerDefi NFT", "DefiNFT"));
        let clock = Arc::new(ManualClock::new(0));
        let params = LendingParams {
            term_secs: TERM,
            liquidation_beneficiary: beneficiary,
            ..LendingParams::default()
        };
        let ledger = LoanLedger::new(
            params,
            Arc::new(FungibleToken::<ValueAmount>::new("USD Coin", "USDC")),
            Arc::new(FungibleToken::<RewardAmount>::new("EmpowerDefi", "ED")),
            assets.clone(),
            clock.clone(),
        )
        .unwrap();
        (ledger, assets, clock)
    }

    fn open(ledger: &LoanLedger, assets: &CollateralRegistry) -> (LoanId, AssetId) {
        let asset = assets.mint("alice").unwrap();
        let id = ledger
            .open_loan("alice", asset, ValueAmount::from_whole(100))
            .unwrap();
        (id, asset)
    }

    #[test]
    fn eligibility_is_strictly_after_due() {
        let loan = Loan::open(LoanId(1), "a", AssetId(1), ValueAmount::new(1), 0, TERM);
        assert!(!is_liquidatable(&loan, TERM));
        assert!(is_liquidatable(&loan, TERM + 1));
    }

    #[test]
    fn not_yet_due_on_due_date() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Treasury);
        let (id, _) = open(&ledger, &assets);
        clock.set(TERM);

        assert_eq!(
            ledger.liquidate(id, "bot"),
            Err(LendingError::NotYetDue {
                loan_id: id,
                due_at: TERM,
                now: TERM,
            })
        );
        assert!(ledger.liquidatable_loans().is_empty());
    }

    #[test]
    fn seizes_to_treasury_by_default() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Treasury);
        let (id, asset) = open(&ledger, &assets);
        clock.set(TERM + 1);
        assert_eq!(ledger.liquidatable_loans(), vec![id]);

        let receipt = ledger.liquidate(id, "bot").unwrap();
        assert_eq!(receipt.beneficiary, "protocol:treasury");
        assert_eq!(receipt.liquidator, "bot");
        assert_eq!(receipt.liquidated_at, TERM + 1);
        assert_eq!(assets.owner_of(asset).unwrap(), "protocol:treasury");
        assert_eq!(ledger.total_outstanding_principal(), ValueAmount::ZERO);
        assert_eq!(ledger.get_loan(id).unwrap().status, LoanStatus::Liquidated);
    }

    #[test]
    fn seizes_to_liquidator_when_configured() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Liquidator);
        let (id, asset) = open(&ledger, &assets);
        clock.set(TERM + 50);

        ledger.liquidate(id, "keeper").unwrap();
        assert_eq!(assets.owner_of(asset).unwrap(), "keeper");
    }

    #[test]
    fn custodian_cannot_claim_seized_collateral() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Liquidator);
        let (id, asset) = open(&ledger, &assets);
        clock.set(TERM + 1);

        assert_eq!(
            ledger.liquidate(id, "protocol:custody"),
            Err(LendingError::InvalidBeneficiary {
                loan_id: id,
                beneficiary: "protocol:custody".into(),
            })
        );
        let loan = ledger.get_loan(id).unwrap();
        assert_eq!(loan.status, LoanStatus::Open);
        assert!(ledger.vault().in_custody(asset));
        assert_eq!(
            ledger.total_outstanding_principal(),
            ValueAmount::from_whole(100)
        );

        ledger.liquidate(id, "keeper").unwrap();
        assert_eq!(assets.owner_of(asset).unwrap(), "keeper");
    }

    #[test]
    fn borrower_cannot_liquidate_to_itself() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Liquidator);
        let (id, asset) = open(&ledger, &assets);
        clock.set(TERM + 1);

        assert_eq!(
            ledger.liquidate(id, "alice").unwrap_err().kind(),
            "invalid_beneficiary"
        );
        assert!(ledger.vault().in_custody(asset));
        assert_eq!(ledger.liquidatable_loans(), vec![id]);
    }

    #[test]
    fn borrower_may_trigger_treasury_liquidation() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Treasury);
        let (id, asset) = open(&ledger, &assets);
        clock.set(TERM + 1);

        let receipt = ledger.liquidate(id, "alice").unwrap();
        assert_eq!(receipt.beneficiary, "protocol:treasury");
        assert_eq!(assets.owner_of(asset).unwrap(), "protocol:treasury");
    }

    #[test]
    fn second_liquidation_reports_closed() {
        let (ledger, assets, clock) = setup(LiquidationBeneficiary::Treasury);
        let (id, _) = open(&ledger, &assets);
        clock.set(TERM + 1);
        ledger.liquidate(id, "bot").unwrap();

        assert_eq!(
            ledger.liquidate(id, "bot"),
            Err(LendingError::AlreadyClosed {
                loan_id: id,
                status: LoanStatus::Liquidated,
            })
        );
        assert_eq!(ledger.events().len(), 2);
    }
}
