//! # Fungible Token
//!
//! In-memory ERC-20 style ledger for one unit. Used for both the value unit
//! (principal) and the reward unit (interest); the type parameter keeps the
//! two from ever being mixed up at compile time.
//!
//! Supply tracking is exact: `total_supply` always equals the sum of all
//! balances, because both are updated under the same write lock.

use std::collections::HashMap;
use std::marker::PhantomData;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{FungibleLedger, LedgerError};
use crate::config::UNIT_DECIMALS;
use crate::units::{AccountId, Amount};

/// Display metadata. Never consulted by arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<AccountId, u128>,
    total_supply: u128,
}

/// A fungible token ledger denominated in `U`.
#[derive(Debug)]
pub struct FungibleToken<U: Amount> {
    info: TokenInfo,
    state: RwLock<TokenState>,
    _unit: PhantomData<U>,
}

impl<U: Amount> FungibleToken<U> {
    /// Creates an empty token with the standard 18 decimals.
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            info: TokenInfo {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals: UNIT_DECIMALS,
            },
            state: RwLock::new(TokenState::default()),
            _unit: PhantomData,
        }
    }

    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn symbol(&self) -> &str {
        &self.info.symbol
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.state
            .read()
            .balances
            .values()
            .filter(|b| **b > 0)
            .count()
    }

    fn insufficient(account: &str, available: u128, requested: u128) -> LedgerError {
        LedgerError::InsufficientBalance {
            unit: U::UNIT,
            account: account.to_string(),
            available,
            requested,
        }
    }
}

impl<U: Amount> FungibleLedger<U> for FungibleToken<U> {
    fn mint(&self, to: &str, amount: U) -> Result<(), LedgerError> {
        if to.is_empty() {
            return Err(LedgerError::InvalidAccount);
        }
        let raw = amount.raw();
        let overflow = LedgerError::SupplyOverflow {
            unit: U::UNIT,
            requested: raw,
        };

        let mut state = self.state.write();
        let new_supply = state.total_supply.checked_add(raw).ok_or(overflow)?;
        // Any balance is bounded by the supply, so this cannot overflow
        // once the supply check has passed.
        *state.balances.entry(to.to_string()).or_insert(0) += raw;
        state.total_supply = new_supply;

        tracing::trace!(unit = U::UNIT, to, amount = %amount, "mint");
        Ok(())
    }

    fn burn(&self, from: &str, amount: U) -> Result<(), LedgerError> {
        let raw = amount.raw();
        let mut state = self.state.write();
        let balance = state.balances.get(from).copied().unwrap_or(0);
        if balance < raw {
            return Err(Self::insufficient(from, balance, raw));
        }
        state.balances.insert(from.to_string(), balance - raw);
        state.total_supply -= raw;

        tracing::trace!(unit = U::UNIT, from, amount = %amount, "burn");
        Ok(())
    }

    fn transfer(&self, from: &str, to: &str, amount: U) -> Result<(), LedgerError> {
        if to.is_empty() {
            return Err(LedgerError::InvalidAccount);
        }
        let raw = amount.raw();
        let mut state = self.state.write();
        let balance = state.balances.get(from).copied().unwrap_or(0);
        if balance < raw {
            return Err(Self::insufficient(from, balance, raw));
        }
        state.balances.insert(from.to_string(), balance - raw);
        *state.balances.entry(to.to_string()).or_insert(0) += raw;

        tracing::trace!(unit = U::UNIT, from, to, amount = %amount, "transfer");
        Ok(())
    }

    fn balance_of(&self, account: &str) -> U {
        U::from_raw(self.state.read().balances.get(account).copied().unwrap_or(0))
    }

    fn total_supply(&self) -> U {
        U::from_raw(self.state.read().total_supply)
    }
}
