//! The storage collaborator interface and the records that cross it.

use crate::keys::KeyMaterial;
use crate::types::SvrCredentials;
use async_trait::async_trait;
use registration_crypto::{AccountEntropyPool, Aci, IdentityKeyPair, MasterKey, Pni};
use secrecy::SecretString;

/// Data persisted after any successful registration.
#[derive(Debug, Clone)]
pub struct NewRegistrationData {
    pub e164: String,
    pub aci: Aci,
    pub pni: Pni,
    pub service_password: SecretString,
    pub aep: AccountEntropyPool,
}

/// Bundle from a prior registration on this device. Present only for
/// device-local re-registrations; lets the flow skip key regeneration and
/// attempt a silent recovery-password re-registration before falling back to
/// full phone verification.
#[derive(Debug, Clone)]
pub struct PreExistingRegistrationData {
    pub e164: String,
    pub aci: Aci,
    pub pni: Pni,
    pub service_password: SecretString,
    pub aep: AccountEntropyPool,
    pub registration_lock_enabled: bool,
    pub aci_identity_key_pair: IdentityKeyPair,
    pub pni_identity_key_pair: IdentityKeyPair,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageController: Send + Sync {
    /// Persist freshly provisioned key material.
    async fn store_key_material(&self, key_material: &KeyMaterial) -> anyhow::Result<()>;

    /// Called after a successful registration to store the new account data.
    async fn save_new_registration_data(&self, data: &NewRegistrationData) -> anyhow::Result<()>;

    /// Data from a prior registration on this install, if any.
    async fn get_pre_existing_registration_data(&self) -> Option<PreExistingRegistrationData>;

    /// SVR credentials restored through an OS-level backup channel. May be
    /// empty.
    async fn get_restored_svr_credentials(&self) -> Vec<SvrCredentials>;

    /// Append known-good SVR credentials to the local store. Implementations
    /// must bound the stored count to some reasonable maximum and serialize
    /// writes; the store is append-only.
    async fn append_svr_credentials(&self, credentials: &[SvrCredentials]) -> anyhow::Result<()>;

    /// Save a PIN that was just verified against SVR, together with the
    /// restored master key. The key is temporary: it only unlocks the initial
    /// storage-service restore and is discarded once a new entropy pool
    /// takes over.
    async fn save_validated_pin_and_temporary_master_key(
        &self,
        pin: &str,
        is_alphanumeric: bool,
        master_key: &MasterKey,
        registration_lock_enabled: bool,
    ) -> anyhow::Result<()>;

    /// Save a newly created PIN.
    async fn save_newly_created_pin(&self, pin: &str, is_alphanumeric: bool)
        -> anyhow::Result<()>;

    /// Wipe all registration data. Invoked by hosts on a full flow reset.
    async fn clear_all_data(&self) -> anyhow::Result<()>;
}
