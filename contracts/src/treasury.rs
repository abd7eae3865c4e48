//! # Treasury / Value Reserve
//!
//! Tracks aggregate principal outstanding across open loans and refuses
//! any disbursement that would push it past the reserve cap. The engine
//! holds mint authority over the value unit; this cap is the only thing
//! bounding how much it can create.

use nftlend_protocol::units::{AccountId, Amount, ValueAmount};
use parking_lot::Mutex;

use crate::error::LendingError;

#[derive(Debug)]
pub struct Treasury {
    account: AccountId,
    cap: ValueAmount,
    outstanding: Mutex<ValueAmount>,
}

impl Treasury {
    pub fn new(account: impl Into<AccountId>, cap: ValueAmount) -> Self {
        Self {
            account: account.into(),
            cap,
            outstanding: Mutex::new(ValueAmount::ZERO),
        }
    }

    /// Identity that receives interest payments.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn cap(&self) -> ValueAmount {
        self.cap
    }

    /// Principal currently lent out.
    pub fn outstanding(&self) -> ValueAmount {
        *self.outstanding.lock()
    }

    /// Headroom left under the cap.
    pub fn available(&self) -> ValueAmount {
        self.cap.saturating_sub(self.outstanding())
    }

    /// Claims `principal` against the cap.
    ///
    /// # Errors
    ///
    /// [`LendingError::ReserveExceeded`] if `outstanding + principal > cap`.
    pub fn reserve(&self, principal: ValueAmount) -> Result<(), LendingError> {
        let mut outstanding = self.outstanding.lock();
        let exceeded = || LendingError::ReserveExceeded {
            outstanding: *outstanding,
            requested: principal,
            cap: self.cap,
        };
        let next = outstanding.checked_add(principal).ok_or_else(exceeded)?;
        if next > self.cap {
            return Err(exceeded());
        }
        *outstanding = next;
        Ok(())
    }

    /// Returns `principal` to the reserve when a loan closes or an open
    /// is rolled back.
    pub fn restore(&self, principal: ValueAmount) {
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(principal);
    }
}
