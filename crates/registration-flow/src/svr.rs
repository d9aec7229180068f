//! Secure value recovery orchestration: the credential-check shortcut and
//! PIN-based master key restore/backup.

use crate::config::SvrConfig;
use crate::error::{
    BackupMasterKeyError, GetSvrCredentialsError, RegistrationNetworkResult, RestoreMasterKeyError,
};
use crate::network::NetworkController;
use crate::storage::StorageController;
use crate::types::{CredentialVerdict, SvrCredentials};
use registration_crypto::MasterKey;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Asks the server which previously-known SVR credentials are still valid for
/// a phone number, enabling the SMS-bypass shortcut.
///
/// This check is an optimization, never a hard dependency: any failure is
/// collapsed to "no match" and the flow falls through to ordinary
/// session-based verification with exactly zero retries.
#[derive(Clone)]
pub struct SvrCredentialChecker {
    network: Arc<dyn NetworkController>,
}

impl SvrCredentialChecker {
    pub fn new(network: Arc<dyn NetworkController>) -> Self {
        Self { network }
    }

    /// Returns the first candidate the server still considers valid for
    /// `e164`, or `None`. Skips the network call entirely when there are no
    /// candidates.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn check(
        &self,
        e164: &str,
        candidates: &[SvrCredentials],
    ) -> Option<SvrCredentials> {
        if candidates.is_empty() {
            return None;
        }

        match self.network.check_svr_credentials(e164, candidates).await {
            RegistrationNetworkResult::Success(response) => {
                let matched = candidates.iter().find(|candidate| {
                    response.matches.get(&candidate.credential_key())
                        == Some(&CredentialVerdict::Match)
                });
                match matched {
                    Some(credential) => {
                        info!("Found a matching SVR credential, SMS bypass available");
                        Some(credential.clone())
                    }
                    None => {
                        debug!("No SVR credential matched");
                        None
                    }
                }
            }
            RegistrationNetworkResult::Failure(e) => {
                warn!(error = %e, "SVR credential check rejected, falling through");
                None
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error checking SVR credentials, falling through");
                None
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error checking SVR credentials, falling through");
                None
            }
        }
    }
}

/// Restores and backs up the master key against the secure value recovery
/// service, persisting validated PINs and known-good credentials as it goes.
#[derive(Clone)]
pub struct MasterKeyRecoveryOrchestrator {
    network: Arc<dyn NetworkController>,
    storage: Arc<dyn StorageController>,
    config: SvrConfig,
}

impl MasterKeyRecoveryOrchestrator {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: SvrConfig,
    ) -> Self {
        Self {
            network,
            storage,
            config,
        }
    }

    /// Restore the master key from SVR with a user-entered PIN.
    ///
    /// On success the PIN and the restored key are persisted (the key only as
    /// a temporary bootstrap for the initial storage restore) and the
    /// credential is recorded as known-good. `WrongPin` carries the remaining
    /// guess count for the caller's UI; `NoDataFound` means the SVR slot is
    /// gone and the associated recovery password must not be trusted.
    #[instrument(skip(self, credentials, pin))]
    pub async fn restore_master_key(
        &self,
        credentials: &SvrCredentials,
        pin: &str,
        is_alphanumeric: bool,
        for_registration_lock: bool,
    ) -> RegistrationNetworkResult<MasterKey, RestoreMasterKeyError> {
        let result = self.network.restore_master_key_from_svr(credentials, pin).await;

        if let RegistrationNetworkResult::Success(master_key) = &result {
            info!("Restored master key from SVR");
            if let Err(e) = self
                .storage
                .save_validated_pin_and_temporary_master_key(
                    pin,
                    is_alphanumeric,
                    master_key,
                    for_registration_lock,
                )
                .await
            {
                warn!(error = %e, "Failed to persist validated PIN and temporary master key");
            }
            self.append_credentials(std::slice::from_ref(credentials)).await;
        }

        result
    }

    /// Fetch fresh SVR credentials for the now-authenticated account and
    /// record them locally so a future install can use the SMS bypass.
    pub async fn fetch_svr_credentials(
        &self,
    ) -> RegistrationNetworkResult<SvrCredentials, GetSvrCredentialsError> {
        let result = self.network.get_svr_credentials().await;

        if let RegistrationNetworkResult::Success(credentials) = &result {
            self.append_credentials(std::slice::from_ref(credentials)).await;
        }

        result
    }

    /// Back up the master key to SVR under a newly created PIN.
    #[instrument(skip(self, pin, master_key))]
    pub async fn backup_master_key(
        &self,
        pin: &str,
        is_alphanumeric: bool,
        master_key: &MasterKey,
    ) -> RegistrationNetworkResult<Option<SvrCredentials>, BackupMasterKeyError> {
        let result = self.network.set_pin_and_master_key_on_svr(pin, master_key).await;

        if let RegistrationNetworkResult::Success(credentials) = &result {
            if let Err(e) = self.storage.save_newly_created_pin(pin, is_alphanumeric).await {
                warn!(error = %e, "Failed to persist newly created PIN");
            }
            if let Some(credentials) = credentials {
                self.append_credentials(std::slice::from_ref(credentials)).await;
            }
        }

        result
    }

    /// Enqueue the server-side guess counter reset after a successful
    /// PIN-based restore.
    pub async fn reset_guess_count(&self) {
        self.network.enqueue_svr_guess_reset_job().await;
    }

    async fn append_credentials(&self, credentials: &[SvrCredentials]) {
        debug!(
            count = credentials.len(),
            cap = self.config.max_stored_credentials,
            "Appending known-good SVR credentials"
        );
        if let Err(e) = self.storage.append_svr_credentials(credentials).await {
            warn!(error = %e, "Failed to append SVR credentials");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckSvrCredentialsError;
    use crate::network::MockNetworkController;
    use crate::storage::MockStorageController;
    use crate::types::CheckSvrCredentialsResponse;
    use std::collections::HashMap;

    fn credentials() -> SvrCredentials {
        SvrCredentials {
            username: "user".into(),
            password: "pass".into(),
        }
    }

    fn check_response(verdict: CredentialVerdict) -> CheckSvrCredentialsResponse {
        let mut matches = HashMap::new();
        matches.insert("user:pass".to_string(), verdict);
        CheckSvrCredentialsResponse { matches }
    }

    #[tokio::test]
    async fn empty_candidate_list_skips_the_network_call() {
        let network = MockNetworkController::new();
        // No expectation set: any call would panic the mock.
        let checker = SvrCredentialChecker::new(Arc::new(network));

        assert_eq!(checker.check("+15551234567", &[]).await, None);
    }

    #[tokio::test]
    async fn match_returns_the_matching_credential() {
        let mut network = MockNetworkController::new();
        network
            .expect_check_svr_credentials()
            .times(1)
            .return_once(|_, _| {
                RegistrationNetworkResult::Success(check_response(CredentialVerdict::Match))
            });

        let checker = SvrCredentialChecker::new(Arc::new(network));
        let result = checker.check("+15551234567", &[credentials()]).await;
        assert_eq!(result, Some(credentials()));
    }

    #[tokio::test]
    async fn no_match_and_errors_fall_through_without_retry() {
        for result in [
            RegistrationNetworkResult::Success(check_response(CredentialVerdict::NoMatch)),
            RegistrationNetworkResult::Failure(CheckSvrCredentialsError::Unauthorized),
            RegistrationNetworkResult::NetworkError(anyhow::anyhow!("connection lost")),
            RegistrationNetworkResult::ApplicationError(anyhow::anyhow!("unexpected")),
        ] {
            let mut network = MockNetworkController::new();
            network
                .expect_check_svr_credentials()
                .times(1)
                .return_once(move |_, _| result);

            let checker = SvrCredentialChecker::new(Arc::new(network));
            assert_eq!(checker.check("+15551234567", &[credentials()]).await, None);
        }
    }

    #[tokio::test]
    async fn successful_restore_persists_pin_key_and_credential() {
        let mut network = MockNetworkController::new();
        network
            .expect_restore_master_key_from_svr()
            .return_once(|_, _| RegistrationNetworkResult::Success(MasterKey::generate()));

        let mut storage = MockStorageController::new();
        storage
            .expect_save_validated_pin_and_temporary_master_key()
            .withf(|pin, is_alphanumeric, _, for_reglock| {
                pin == "123456" && !*is_alphanumeric && !*for_reglock
            })
            .times(1)
            .return_once(|_, _, _, _| Ok(()));
        storage
            .expect_append_svr_credentials()
            .times(1)
            .return_once(|_| Ok(()));

        let orchestrator = MasterKeyRecoveryOrchestrator::new(
            Arc::new(network),
            Arc::new(storage),
            SvrConfig::default(),
        );
        let result = orchestrator
            .restore_master_key(&credentials(), "123456", false, false)
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn wrong_pin_surfaces_tries_remaining_and_persists_nothing() {
        let mut network = MockNetworkController::new();
        network
            .expect_restore_master_key_from_svr()
            .return_once(|_, _| {
                RegistrationNetworkResult::Failure(RestoreMasterKeyError::WrongPin {
                    tries_remaining: 3,
                })
            });

        let storage = MockStorageController::new();
        let orchestrator = MasterKeyRecoveryOrchestrator::new(
            Arc::new(network),
            Arc::new(storage),
            SvrConfig::default(),
        );

        match orchestrator
            .restore_master_key(&credentials(), "000000", false, false)
            .await
        {
            RegistrationNetworkResult::Failure(RestoreMasterKeyError::WrongPin {
                tries_remaining,
            }) => assert_eq!(tries_remaining, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetched_credentials_are_appended() {
        let mut network = MockNetworkController::new();
        network
            .expect_get_svr_credentials()
            .return_once(|| RegistrationNetworkResult::Success(credentials()));

        let mut storage = MockStorageController::new();
        storage
            .expect_append_svr_credentials()
            .times(1)
            .return_once(|_| Ok(()));

        let orchestrator = MasterKeyRecoveryOrchestrator::new(
            Arc::new(network),
            Arc::new(storage),
            SvrConfig::default(),
        );
        assert!(orchestrator.fetch_svr_credentials().await.is_success());
    }

    #[tokio::test]
    async fn backup_saves_pin_and_returned_credential() {
        let mut network = MockNetworkController::new();
        network
            .expect_set_pin_and_master_key_on_svr()
            .return_once(|_, _| RegistrationNetworkResult::Success(Some(credentials())));

        let mut storage = MockStorageController::new();
        storage
            .expect_save_newly_created_pin()
            .withf(|pin, is_alphanumeric| pin == "4321" && !*is_alphanumeric)
            .times(1)
            .return_once(|_, _| Ok(()));
        storage
            .expect_append_svr_credentials()
            .times(1)
            .return_once(|_| Ok(()));

        let orchestrator = MasterKeyRecoveryOrchestrator::new(
            Arc::new(network),
            Arc::new(storage),
            SvrConfig::default(),
        );
        let result = orchestrator
            .backup_master_key("4321", false, &MasterKey::generate())
            .await;
        assert!(result.is_success());
    }
}
