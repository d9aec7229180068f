//! Account registration, including silent recovery-password re-registration
//! and the registration-lock challenge-response protocol.

use crate::error::{RegisterAccountError, RegistrationNetworkResult};
use crate::keys::{KeyMaterial, KeyMaterialProvisioner};
use crate::network::NetworkController;
use crate::storage::{NewRegistrationData, PreExistingRegistrationData, StorageController};
use crate::types::{
    AccountAttributes, AccountCapabilities, PreKeyCollection, RegisterAccountRequest,
    RegisterAccountResponse, RegistrationProof,
};
use registration_crypto::MasterKey;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Outcome of a master-key-driven registration attempt, after the bounded
/// registration-lock retry has been applied. Consumed by screen flows, which
/// map each arm onto navigation and one-time events.
#[derive(Debug)]
pub enum MasterKeyRegistrationOutcome {
    Registered {
        response: RegisterAccountResponse,
        key_material: KeyMaterial,
    },
    /// The server will not accept this recovery password; it must be marked
    /// invalid and never retried for this flow instance.
    RecoveryPasswordRejected,
    /// Local and remote state disagree in a way recovery-password logic can
    /// never produce; the whole flow must reset.
    ProtocolInconsistency,
    RateLimited {
        retry_after: Duration,
    },
    TransportFailure,
    Unexpected,
}

/// Registers accounts: provisions key material, builds account attributes,
/// and drives the registration endpoint with either a verified session or a
/// recovery password.
#[derive(Clone)]
pub struct RecoveryPasswordRegistrar {
    network: Arc<dyn NetworkController>,
    storage: Arc<dyn StorageController>,
}

impl RecoveryPasswordRegistrar {
    pub fn new(network: Arc<dyn NetworkController>, storage: Arc<dyn StorageController>) -> Self {
        Self { network, storage }
    }

    /// Register using a recovery password, optionally presenting a
    /// registration-lock token. A single network attempt; retry policy lives
    /// in [`Self::register_with_restored_master_key`].
    pub async fn register_with_recovery_password(
        &self,
        e164: &str,
        recovery_password: SecretString,
        registration_lock: Option<String>,
        pre_existing: Option<&PreExistingRegistrationData>,
    ) -> RegistrationNetworkResult<(RegisterAccountResponse, KeyMaterial), RegisterAccountError>
    {
        self.register_account(
            e164,
            RegistrationProof::RecoveryPassword { recovery_password },
            registration_lock,
            pre_existing,
        )
        .await
    }

    /// Register using a verified session.
    pub async fn register_with_session(
        &self,
        e164: &str,
        session_id: &str,
    ) -> RegistrationNetworkResult<(RegisterAccountResponse, KeyMaterial), RegisterAccountError>
    {
        self.register_account(
            e164,
            RegistrationProof::Session {
                session_id: session_id.to_string(),
            },
            None,
            None,
        )
        .await
    }

    /// Register with the recovery password derived from a master key,
    /// handling registration lock with a single bounded retry.
    ///
    /// The first attempt presents a lock token only when
    /// `supply_registration_lock` is set (the caller already knows the
    /// account is locked). A `RegistrationLock` rejection on a lock-less
    /// attempt earns exactly one retry with the token derived from the same
    /// master key; a rejection on an attempt that already carried the token
    /// means the recovery password itself is not trustworthy. A transient
    /// failure on the retry is surfaced as-is; no third attempt is made.
    #[instrument(skip(self, master_key, pre_existing))]
    pub async fn register_with_restored_master_key(
        &self,
        e164: &str,
        master_key: &MasterKey,
        supply_registration_lock: bool,
        pre_existing: Option<&PreExistingRegistrationData>,
    ) -> MasterKeyRegistrationOutcome {
        let recovery_password =
            SecretString::new(master_key.derive_registration_recovery_password());

        let mut with_lock = supply_registration_lock;
        let mut retried = false;
        loop {
            let registration_lock =
                with_lock.then(|| master_key.derive_registration_lock_token());

            let result = self
                .register_with_recovery_password(
                    e164,
                    recovery_password.clone(),
                    registration_lock,
                    pre_existing,
                )
                .await;

            return match result {
                RegistrationNetworkResult::Success((response, key_material)) => {
                    MasterKeyRegistrationOutcome::Registered {
                        response,
                        key_material,
                    }
                }
                RegistrationNetworkResult::Failure(RegisterAccountError::RegistrationLock(_))
                    if !with_lock && !retried =>
                {
                    warn!("Hit registration lock without a token, retrying once with the derived token");
                    with_lock = true;
                    retried = true;
                    continue;
                }
                RegistrationNetworkResult::Failure(RegisterAccountError::RegistrationLock(_)) => {
                    warn!("Registration lock rejected even with the derived token, recovery password is not trustworthy");
                    MasterKeyRegistrationOutcome::RecoveryPasswordRejected
                }
                RegistrationNetworkResult::Failure(
                    RegisterAccountError::RegistrationRecoveryPasswordIncorrect(message),
                ) => {
                    warn!(%message, "Recovery password rejected");
                    MasterKeyRegistrationOutcome::RecoveryPasswordRejected
                }
                RegistrationNetworkResult::Failure(RegisterAccountError::InvalidRequest(
                    message,
                )) => {
                    warn!(%message, "Invalid recovery-password registration request");
                    MasterKeyRegistrationOutcome::RecoveryPasswordRejected
                }
                RegistrationNetworkResult::Failure(
                    RegisterAccountError::SessionNotFoundOrNotVerified(message),
                ) => {
                    warn!(%message, "Session error on a session-less registration, resetting");
                    MasterKeyRegistrationOutcome::ProtocolInconsistency
                }
                RegistrationNetworkResult::Failure(
                    RegisterAccountError::DeviceTransferPossible,
                ) => {
                    warn!("Device transfer reported on a recovery-password registration, resetting");
                    MasterKeyRegistrationOutcome::ProtocolInconsistency
                }
                RegistrationNetworkResult::Failure(RegisterAccountError::RateLimited {
                    retry_after,
                }) => MasterKeyRegistrationOutcome::RateLimited { retry_after },
                RegistrationNetworkResult::NetworkError(e) => {
                    warn!(error = %e, "Network error registering with recovery password");
                    MasterKeyRegistrationOutcome::TransportFailure
                }
                RegistrationNetworkResult::ApplicationError(e) => {
                    warn!(error = %e, "Application error registering with recovery password");
                    MasterKeyRegistrationOutcome::Unexpected
                }
            };
        }
    }

    #[instrument(skip(self, proof, registration_lock, pre_existing), fields(
        has_session = matches!(proof, RegistrationProof::Session { .. }),
        has_lock = registration_lock.is_some(),
        reregistration = pre_existing.is_some(),
    ))]
    async fn register_account(
        &self,
        e164: &str,
        proof: RegistrationProof,
        registration_lock: Option<String>,
        pre_existing: Option<&PreExistingRegistrationData>,
    ) -> RegistrationNetworkResult<(RegisterAccountResponse, KeyMaterial), RegisterAccountError>
    {
        let key_material = KeyMaterialProvisioner::provision(pre_existing);
        if let Err(e) = self.storage.store_key_material(&key_material).await {
            return RegistrationNetworkResult::ApplicationError(
                e.context("failed to store provisioned key material"),
            );
        }

        let push_token = self.network.get_push_token().await;

        // The attributes always carry a recovery password derived from the
        // *new* entropy pool, so the next re-registration can be silent.
        let new_master_key = key_material.account_entropy_pool.derive_master_key();
        let new_recovery_password =
            SecretString::new(new_master_key.derive_registration_recovery_password());

        let attributes = AccountAttributes {
            registration_id: key_material.aci_registration_id,
            pni_registration_id: key_material.pni_registration_id,
            fetches_messages: push_token.is_none(),
            registration_lock,
            unidentified_access_key: key_material.unidentified_access_key,
            unrestricted_unidentified_access: false,
            discoverable_by_phone_number: false,
            capabilities: AccountCapabilities::default(),
            recovery_password: new_recovery_password,
        };

        let request = RegisterAccountRequest {
            e164: e164.to_string(),
            service_password: key_material.service_password.clone(),
            proof,
            attributes,
            aci_pre_keys: PreKeyCollection {
                identity_key: key_material.aci_identity_key_pair.public_key_bytes(),
                signed_pre_key: key_material.aci_signed_pre_key.clone(),
                last_resort_kyber_pre_key: key_material.aci_last_resort_kyber_pre_key.clone(),
            },
            pni_pre_keys: PreKeyCollection {
                identity_key: key_material.pni_identity_key_pair.public_key_bytes(),
                signed_pre_key: key_material.pni_signed_pre_key.clone(),
                last_resort_kyber_pre_key: key_material.pni_last_resort_kyber_pre_key.clone(),
            },
            push_token,
            skip_device_transfer: true,
        };

        let result = self.network.register_account(request).await;

        if let RegistrationNetworkResult::Success(response) = &result {
            info!(reregistration = response.reregistration, "Account registered");
            let data = NewRegistrationData {
                e164: response.e164.clone(),
                aci: response.aci,
                pni: response.pni,
                service_password: key_material.service_password.clone(),
                aep: key_material.account_entropy_pool.clone(),
            };
            if let Err(e) = self.storage.save_new_registration_data(&data).await {
                warn!(error = %e, "Failed to persist new registration data");
            }
        }

        result.map_success(|response| (response, key_material))
    }
}
