//! # Collateral Vault
//!
//! Custody of pledged collateral is nothing more than registry ownership by
//! the protocol's holding identity. The vault keeps no books of its own:
//!
//! ```text
//! deposit   borrower  ──► custodian
//! release   custodian ──► borrower
//! seize     custodian ──► treasury | liquidator
//! ```
//!
//! Single ownership in the [`AssetRegistry`] is what makes double pledging
//! impossible: of two racing deposits for the same asset, only one
//! `transfer_from` can succeed, and the loser sees the custodian as owner.

use std::sync::Arc;

use nftlend_protocol::ledger::{AssetRegistry, RegistryError};
use nftlend_protocol::units::{AccountId, AssetId, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::LendingError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by custody operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The depositor does not hold the asset.
    #[error("{depositor} does not own asset {asset_id}")]
    NotOwner {
        /// The asset being pledged.
        asset_id: AssetId,
        /// The identity that tried to pledge it.
        depositor: AccountId,
    },

    /// The asset is already held by the custodian.
    #[error("asset {0} is already in custody")]
    AlreadyPledged(AssetId),

    /// Release or seizure naming the custodian itself as recipient.
    #[error("asset {0} cannot be handed out to the custodian")]
    CustodianRecipient(AssetId),

    /// Release or seizure of an asset the custodian does not hold.
    #[error("asset {0} is not in custody")]
    NotInCustody(AssetId),

    /// Any other registry failure (unknown asset, bad identity).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<VaultError> for LendingError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotOwner {
                asset_id,
                depositor,
            } => LendingError::NotOwner {
                asset_id,
                caller: depositor,
            },
            VaultError::AlreadyPledged(asset_id) => LendingError::AlreadyPledged(asset_id),
            VaultError::NotInCustody(asset_id) => LendingError::NotInCustody(asset_id),
            VaultError::CustodianRecipient(_) => LendingError::Registry(RegistryError::InvalidAccount),
            VaultError::Registry(err) => LendingError::Registry(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Proof that an asset entered custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyReceipt {
    /// Unique identifier of this custody event.
    pub receipt_id: Uuid,
    pub asset_id: AssetId,
    /// The owner the asset was taken from.
    pub depositor: AccountId,
    /// The holding identity now owning the asset.
    pub custodian: AccountId,
    pub deposited_at: Timestamp,
}

/// Custody front-end over the asset registry.
#[derive(Clone)]
pub struct CollateralVault {
    registry: Arc<dyn AssetRegistry>,
    custodian: AccountId,
}

impl std::fmt::Debug for CollateralVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollateralVault")
            .field("custodian", &self.custodian)
            .finish_non_exhaustive()
    }
}

impl CollateralVault {
    pub fn new(registry: Arc<dyn AssetRegistry>, custodian: impl Into<AccountId>) -> Self {
        Self {
            registry,
            custodian: custodian.into(),
        }
    }

    /// The holding identity for assets in custody.
    pub fn custodian(&self) -> &str {
        &self.custodian
    }

    /// Whether the custodian currently owns `asset_id`.
    pub fn in_custody(&self, asset_id: AssetId) -> bool {
        matches!(self.registry.owner_of(asset_id), Ok(owner) if owner == self.custodian)
    }

    /// Read-only precheck for [`deposit`](Self::deposit). Reports the same
    /// errors without moving anything.
    pub fn check_depositable(&self, asset_id: AssetId, owner: &str) -> Result<(), VaultError> {
        let current = self.registry.owner_of(asset_id)?;
        if current == self.custodian {
            return Err(VaultError::AlreadyPledged(asset_id));
        }
        if current != owner {
            return Err(VaultError::NotOwner {
                asset_id,
                depositor: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Takes custody of `asset_id` from `owner`.
    ///
    /// # Errors
    ///
    /// [`VaultError::AlreadyPledged`] if the custodian already holds it,
    /// [`VaultError::NotOwner`] if somebody other than `owner` does.
    pub fn deposit(
        &self,
        asset_id: AssetId,
        owner: &str,
        now: Timestamp,
    ) -> Result<CustodyReceipt, VaultError> {
        self.check_depositable(asset_id, owner)?;

        // The precheck can go stale; the registry transfer is the real gate.
        self.registry
            .transfer_from(owner, &self.custodian, asset_id)
            .map_err(|err| match err {
                RegistryError::NotOwner { actual, .. } if actual == self.custodian => {
                    VaultError::AlreadyPledged(asset_id)
                }
                RegistryError::NotOwner { .. } => VaultError::NotOwner {
                    asset_id,
                    depositor: owner.to_string(),
                },
                other => VaultError::Registry(other),
            })?;

        tracing::debug!(asset_id = %asset_id, depositor = owner, "collateral taken into custody");
        Ok(CustodyReceipt {
            receipt_id: Uuid::new_v4(),
            asset_id,
            depositor: owner.to_string(),
            custodian: self.custodian.clone(),
            deposited_at: now,
        })
    }

    /// Returns `asset_id` from custody to its borrower.
    pub fn release(&self, asset_id: AssetId, to_owner: &str) -> Result<(), VaultError> {
        self.hand_out(asset_id, to_owner)?;
        tracing::debug!(asset_id = %asset_id, to = to_owner, "collateral released");
        Ok(())
    }

    /// Redirects `asset_id` from custody to a liquidation beneficiary.
    pub fn seize(&self, asset_id: AssetId, to_beneficiary: &str) -> Result<(), VaultError> {
        self.hand_out(asset_id, to_beneficiary)?;
        tracing::debug!(asset_id = %asset_id, to = to_beneficiary, "collateral seized");
        Ok(())
    }

    fn hand_out(&self, asset_id: AssetId, to: &str) -> Result<(), VaultError> {
        if to == self.custodian {
            return Err(VaultError::CustodianRecipient(asset_id));
        }
        self.registry
            .transfer_from(&self.custodian, to, asset_id)
            .map_err(|err| match err {
                RegistryError::NotOwner { .. } => VaultError::NotInCustody(asset_id),
                other => VaultError::Registry(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftlend_protocol::ledger::CollateralRegistry;

    const CUSTODY: &str = "protocol:custody";

    fn setup() -> (Arc<CollateralRegistry>, CollateralVault) {
        let registry = Arc::new(CollateralRegistry::new("EmpowerDefi NFT", "DefiNFT"));
        let vault = CollateralVault::new(registry.clone(), CUSTODY);
        (registry, vault)
    }

    #[test]
    fn deposit_moves_asset_to_custodian() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();

        let receipt = vault.deposit(id, "alice", 10).unwrap();
        assert_eq!(receipt.asset_id, id);
        assert_eq!(receipt.depositor, "alice");
        assert_eq!(receipt.custodian, CUSTODY);
        assert_eq!(receipt.deposited_at, 10);
        assert!(vault.in_custody(id));
        assert_eq!(registry.owner_of(id).unwrap(), CUSTODY);
    }

    #[test]
    fn deposit_by_non_owner_rejected() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();

        let err = vault.deposit(id, "mallory", 0).unwrap_err();
        assert_eq!(
            err,
            VaultError::NotOwner {
                asset_id: id,
                depositor: "mallory".into(),
            }
        );
        assert_eq!(registry.owner_of(id).unwrap(), "alice");
    }

    #[test]
    fn second_deposit_reports_already_pledged() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();
        vault.deposit(id, "alice", 0).unwrap();

        assert_eq!(
            vault.deposit(id, "alice", 0).unwrap_err(),
            VaultError::AlreadyPledged(id)
        );
    }

    #[test]
    fn release_returns_to_owner() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();
        vault.deposit(id, "alice", 0).unwrap();

        vault.release(id, "alice").unwrap();
        assert_eq!(registry.owner_of(id).unwrap(), "alice");
        assert!(!vault.in_custody(id));
    }

    #[test]
    fn seize_redirects_to_beneficiary() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();
        vault.deposit(id, "alice", 0).unwrap();

        vault.seize(id, "protocol:treasury").unwrap();
        assert_eq!(registry.owner_of(id).unwrap(), "protocol:treasury");
    }

    #[test]
    fn release_without_custody_fails() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();

        assert_eq!(
            vault.release(id, "alice").unwrap_err(),
            VaultError::NotInCustody(id)
        );
        assert_eq!(
            vault.seize(id, "bob").unwrap_err(),
            VaultError::NotInCustody(id)
        );
    }

    #[test]
    fn custodian_cannot_be_recipient() {
        let (registry, vault) = setup();
        let id = registry.mint("alice").unwrap();
        vault.deposit(id, "alice", 0).unwrap();

        assert_eq!(
            vault.seize(id, CUSTODY).unwrap_err(),
            VaultError::CustodianRecipient(id)
        );
        assert_eq!(
            vault.release(id, CUSTODY).unwrap_err(),
            VaultError::CustodianRecipient(id)
        );
        assert!(vault.in_custody(id));
        assert_eq!(registry.transfer_log().len(), 2);
    }

    #[test]
    fn unknown_asset_surfaces_registry_error() {
        let (_, vault) = setup();
        assert_eq!(
            vault.deposit(AssetId(42), "alice", 0).unwrap_err(),
            VaultError::Registry(RegistryError::AssetNotFound(AssetId(42)))
        );
    }

    #[test]
    fn converts_into_lending_error() {
        let err: LendingError = VaultError::NotOwner {
            asset_id: AssetId(1),
            depositor: "bob".into(),
        }
        .into();
        assert_eq!(
            err,
            LendingError::NotOwner {
                asset_id: AssetId(1),
                caller: "bob".into(),
            }
        );
    }
}
