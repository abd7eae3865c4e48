//! # Collateral Registry
//!
//! In-memory ERC-721 style registry for the single collateral class. Asset
//! ids are sequential from 1. Every mint and transfer is appended to a
//! transfer log, one entry per ERC-721 `Transfer` event. A transfer from
//! the owner to itself succeeds without touching ownership, holdings or
//! the log.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{AssetRegistry, RegistryError};
use crate::units::{AccountId, AssetId};

/// One entry of the transfer log. `from` is `None` for a mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    pub from: Option<AccountId>,
    pub to: AccountId,
    pub asset_id: AssetId,
}

#[derive(Debug, Default)]
struct RegistryState {
    owners: HashMap<AssetId, AccountId>,
    holdings: HashMap<AccountId, u64>,
    next_id: u64,
    log: Vec<AssetTransfer>,
}

/// Single-owner registry of collateral assets.
#[derive(Debug)]
pub struct CollateralRegistry {
    name: String,
    symbol: String,
    state: RwLock<RegistryState>,
}

impl CollateralRegistry {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of assets ever minted.
    pub fn asset_count(&self) -> u64 {
        self.state.read().next_id
    }

    /// Snapshot of the transfer log, oldest first.
    pub fn transfer_log(&self) -> Vec<AssetTransfer> {
        self.state.read().log.clone()
    }
}

impl AssetRegistry for CollateralRegistry {
    fn mint(&self, to: &str) -> Result<AssetId, RegistryError> {
        if to.is_empty() {
            return Err(RegistryError::InvalidAccount);
        }
        let mut state = self.state.write();
        state.next_id += 1;
        let asset_id = AssetId(state.next_id);
        state.owners.insert(asset_id, to.to_string());
        *state.holdings.entry(to.to_string()).or_insert(0) += 1;
        state.log.push(AssetTransfer {
            from: None,
            to: to.to_string(),
            asset_id,
        });

        tracing::debug!(asset_id = %asset_id, to, "collateral asset minted");
        Ok(asset_id)
    }

    fn owner_of(&self, asset_id: AssetId) -> Result<AccountId, RegistryError> {
        self.state
            .read()
            .owners
            .get(&asset_id)
            .cloned()
            .ok_or(RegistryError::AssetNotFound(asset_id))
    }

    fn transfer_from(&self, from: &str, to: &str, asset_id: AssetId) -> Result<(), RegistryError> {
        if to.is_empty() {
            return Err(RegistryError::InvalidAccount);
        }
        let mut state = self.state.write();
        let owner = state
            .owners
            .get(&asset_id)
            .ok_or(RegistryError::AssetNotFound(asset_id))?;
        if owner != from {
            return Err(RegistryError::NotOwner {
                asset_id,
                claimed: from.to_string(),
                actual: owner.clone(),
            });
        }
        if from == to {
            return Ok(());
        }

        state.owners.insert(asset_id, to.to_string());
        if let Some(count) = state.holdings.get_mut(from) {
            *count = count.saturating_sub(1);
        }
        *state.holdings.entry(to.to_string()).or_insert(0) += 1;
        state.log.push(AssetTransfer {
            from: Some(from.to_string()),
            to: to.to_string(),
            asset_id,
        });

        tracing::debug!(asset_id = %asset_id, from, to, "collateral asset transferred");
        Ok(())
    }

    fn balance_of(&self, owner: &str) -> u64 {
        self.state.read().holdings.get(owner).copied().unwrap_or(0)
    }
}
