//! PIN entry: SVR restore in its three guises — SMS bypass, post-registration
//! storage restore, and registration-lock unlock.

use super::{EventEmitter, StateEmitter};
use crate::config::FlowConfig;
use crate::error::{RegistrationNetworkResult, RestoreMasterKeyError};
use crate::event::RegistrationFlowEvent;
use crate::network::NetworkController;
use crate::recovery::{MasterKeyRegistrationOutcome, RecoveryPasswordRegistrar};
use crate::state::{RegistrationFlowState, RegistrationRoute};
use crate::storage::StorageController;
use crate::svr::MasterKeyRecoveryOrchestrator;
use crate::types::SvrCredentials;
use registration_crypto::MasterKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which restore path this screen instance is serving.
#[derive(Debug, Clone)]
pub enum PinEntryMode {
    /// A known-valid SVR credential lets the user skip SMS verification.
    SmsBypass { svr_credentials: SvrCredentials },
    /// The account is registered; the PIN unlocks the storage-service
    /// restore.
    SvrRestore,
    /// Registration was rejected by a registration lock; the PIN proves
    /// ownership.
    RegistrationLock {
        time_remaining: Duration,
        svr_credentials: SvrCredentials,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PinEntryOneTimeEvent {
    RateLimited { retry_after: Duration },
    NetworkError,
    UnknownError,
}

/// State for a PIN entry screen.
#[derive(Debug, Clone, Default)]
pub struct PinEntryState {
    pub e164: Option<String>,
    pub tries_remaining: Option<u32>,
    pub is_alphanumeric_keyboard: bool,
    pub loading: bool,
    pub one_time_event: Option<PinEntryOneTimeEvent>,
}

impl PinEntryState {
    fn with_one_time(mut self, event: PinEntryOneTimeEvent) -> Self {
        self.one_time_event = Some(event);
        self
    }
}

#[derive(Debug, Clone)]
pub enum PinEntryEvent {
    PinEntered(String),
    ToggleKeyboard,
    ConsumeOneTimeEvent,
}

pub struct PinEntryFlow {
    recovery: MasterKeyRecoveryOrchestrator,
    registrar: RecoveryPasswordRegistrar,
    network: Arc<dyn NetworkController>,
    mode: PinEntryMode,
}

impl PinEntryFlow {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: &FlowConfig,
        mode: PinEntryMode,
    ) -> Self {
        Self {
            recovery: MasterKeyRecoveryOrchestrator::new(
                network.clone(),
                storage.clone(),
                config.svr.clone(),
            ),
            registrar: RecoveryPasswordRegistrar::new(network.clone(), storage),
            network,
            mode,
        }
    }

    /// The PIN screens read the chosen number from flow state rather than a
    /// route payload.
    pub fn apply_parent_state(
        &self,
        mut state: PinEntryState,
        parent: &RegistrationFlowState,
    ) -> PinEntryState {
        state.e164 = parent.session_e164.clone();
        state
    }

    pub async fn apply_event(
        &self,
        state: PinEntryState,
        event: PinEntryEvent,
        emit_state: StateEmitter<'_, PinEntryState>,
        emit: EventEmitter<'_>,
    ) {
        match event {
            PinEntryEvent::ToggleKeyboard => {
                let mut next = state;
                next.is_alphanumeric_keyboard = !next.is_alphanumeric_keyboard;
                emit_state(next);
            }
            PinEntryEvent::ConsumeOneTimeEvent => {
                let mut next = state;
                next.one_time_event = None;
                emit_state(next);
            }
            PinEntryEvent::PinEntered(pin) => {
                if state.loading {
                    return;
                }
                let mut working = state;
                working.loading = true;
                emit_state(working.clone());

                let mut finished = self.handle_pin(working, &pin, emit).await;
                finished.loading = false;
                emit_state(finished);
            }
        }
    }

    async fn handle_pin(
        &self,
        state: PinEntryState,
        pin: &str,
        emit: EventEmitter<'_>,
    ) -> PinEntryState {
        match &self.mode {
            PinEntryMode::SmsBypass { svr_credentials } => {
                self.restore_and_register(state, pin, svr_credentials.clone(), false, emit)
                    .await
            }
            PinEntryMode::RegistrationLock {
                svr_credentials, ..
            } => {
                self.restore_and_register(state, pin, svr_credentials.clone(), true, emit)
                    .await
            }
            PinEntryMode::SvrRestore => self.restore_for_storage(state, pin, emit).await,
        }
    }

    /// SMS bypass and reglock unlock share a spine: restore the master key
    /// with the PIN, then register with the recovery password derived from it.
    async fn restore_and_register(
        &self,
        mut state: PinEntryState,
        pin: &str,
        credentials: SvrCredentials,
        for_registration_lock: bool,
        emit: EventEmitter<'_>,
    ) -> PinEntryState {
        let Some(e164) = state.e164.clone() else {
            warn!("PIN entered without a chosen number, resetting");
            emit(RegistrationFlowEvent::ResetState);
            return state;
        };

        let master_key = match self
            .recovery
            .restore_master_key(
                &credentials,
                pin,
                state.is_alphanumeric_keyboard,
                for_registration_lock,
            )
            .await
        {
            RegistrationNetworkResult::Success(master_key) => master_key,
            RegistrationNetworkResult::Failure(RestoreMasterKeyError::WrongPin {
                tries_remaining,
            }) => {
                warn!(tries_remaining, "Wrong PIN");
                state.tries_remaining = Some(tries_remaining);
                if for_registration_lock && tries_remaining == 0 {
                    if let PinEntryMode::RegistrationLock { time_remaining, .. } = &self.mode {
                        emit(RegistrationFlowEvent::NavigateToScreen(
                            RegistrationRoute::AccountLocked {
                                time_remaining: *time_remaining,
                            },
                        ));
                    }
                }
                return state;
            }
            RegistrationNetworkResult::Failure(RestoreMasterKeyError::NoDataFound) => {
                warn!("No SVR data behind this credential, recovery path is dead");
                emit(RegistrationFlowEvent::RecoveryPasswordInvalid);
                emit(RegistrationFlowEvent::NavigateBack);
                return state;
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error restoring master key");
                return state.with_one_time(PinEntryOneTimeEvent::NetworkError);
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error restoring master key");
                return state.with_one_time(PinEntryOneTimeEvent::UnknownError);
            }
        };

        emit(RegistrationFlowEvent::MasterKeyRestoredFromSvr(
            master_key.clone(),
        ));

        match self
            .registrar
            .register_with_restored_master_key(&e164, &master_key, for_registration_lock, None)
            .await
        {
            MasterKeyRegistrationOutcome::Registered { .. } => {
                if for_registration_lock {
                    self.reenable_registration_lock(&master_key).await;
                }
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::FullyComplete,
                ));
                self.recovery.reset_guess_count().await;
                state
            }
            MasterKeyRegistrationOutcome::RecoveryPasswordRejected => {
                emit(RegistrationFlowEvent::RecoveryPasswordInvalid);
                emit(RegistrationFlowEvent::NavigateBack);
                state
            }
            MasterKeyRegistrationOutcome::ProtocolInconsistency => {
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            MasterKeyRegistrationOutcome::RateLimited { retry_after } => {
                state.with_one_time(PinEntryOneTimeEvent::RateLimited { retry_after })
            }
            MasterKeyRegistrationOutcome::TransportFailure => {
                state.with_one_time(PinEntryOneTimeEvent::NetworkError)
            }
            MasterKeyRegistrationOutcome::Unexpected => {
                state.with_one_time(PinEntryOneTimeEvent::UnknownError)
            }
        }
    }

    /// The account just proved its PIN; keep the lock in force for the new
    /// registration. Best effort: a failure here never blocks completion.
    async fn reenable_registration_lock(&self, master_key: &MasterKey) {
        let token = master_key.derive_registration_lock_token();
        match self.network.enable_registration_lock(&token).await {
            RegistrationNetworkResult::Success(()) => {
                info!("Registration lock re-enabled");
            }
            RegistrationNetworkResult::Failure(e) => {
                warn!(error = %e, "Could not re-enable registration lock");
            }
            RegistrationNetworkResult::NetworkError(e)
            | RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Could not re-enable registration lock");
            }
        }
    }

    /// Post-registration restore: fetch credentials for the authenticated
    /// account, then unlock the master key so storage data (and conversation
    /// history) can be pulled immediately.
    async fn restore_for_storage(
        &self,
        mut state: PinEntryState,
        pin: &str,
        emit: EventEmitter<'_>,
    ) -> PinEntryState {
        let credentials = match self.recovery.fetch_svr_credentials().await {
            RegistrationNetworkResult::Success(credentials) => credentials,
            RegistrationNetworkResult::Failure(error) => {
                warn!(%error, "Could not fetch SVR credentials");
                return state.with_one_time(PinEntryOneTimeEvent::UnknownError);
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error fetching SVR credentials");
                return state.with_one_time(PinEntryOneTimeEvent::NetworkError);
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error fetching SVR credentials");
                return state.with_one_time(PinEntryOneTimeEvent::UnknownError);
            }
        };

        match self
            .recovery
            .restore_master_key(&credentials, pin, state.is_alphanumeric_keyboard, false)
            .await
        {
            RegistrationNetworkResult::Success(master_key) => {
                emit(RegistrationFlowEvent::MasterKeyRestoredFromSvr(master_key));
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::FullyComplete,
                ));
                self.recovery.reset_guess_count().await;
                state
            }
            RegistrationNetworkResult::Failure(RestoreMasterKeyError::WrongPin {
                tries_remaining,
            }) => {
                warn!(tries_remaining, "Wrong PIN during storage restore");
                state.tries_remaining = Some(tries_remaining);
                state
            }
            RegistrationNetworkResult::Failure(RestoreMasterKeyError::NoDataFound) => {
                // Nothing left to restore; the account starts fresh with a
                // new PIN instead.
                debug!("No SVR data to restore, moving to PIN creation");
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::PinCreate,
                ));
                state
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error restoring master key");
                state.with_one_time(PinEntryOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error restoring master key");
                state.with_one_time(PinEntryOneTimeEvent::UnknownError)
            }
        }
    }
}
