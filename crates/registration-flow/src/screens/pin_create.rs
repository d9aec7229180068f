//! PIN creation: back the freshly derived master key up to SVR under a new
//! PIN so the account can be recovered later.

use super::{EventEmitter, StateEmitter};
use crate::config::FlowConfig;
use crate::error::{BackupMasterKeyError, RegistrationNetworkResult};
use crate::event::RegistrationFlowEvent;
use crate::network::NetworkController;
use crate::state::{RegistrationFlowState, RegistrationRoute};
use crate::storage::StorageController;
use crate::svr::MasterKeyRecoveryOrchestrator;
use registration_crypto::AccountEntropyPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum PinCreationOneTimeEvent {
    RateLimited { retry_after: Duration },
    NetworkError,
    UnknownError,
}

/// State for the PIN creation screen.
#[derive(Debug, Clone, Default)]
pub struct PinCreationState {
    pub account_entropy_pool: Option<AccountEntropyPool>,
    pub is_alphanumeric_keyboard: bool,
    pub loading: bool,
    pub one_time_event: Option<PinCreationOneTimeEvent>,
}

impl PinCreationState {
    fn with_one_time(mut self, event: PinCreationOneTimeEvent) -> Self {
        self.one_time_event = Some(event);
        self
    }
}

#[derive(Debug, Clone)]
pub enum PinCreationEvent {
    PinConfirmed(String),
    ToggleKeyboard,
    ConsumeOneTimeEvent,
}

pub struct PinCreationFlow {
    recovery: MasterKeyRecoveryOrchestrator,
}

impl PinCreationFlow {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: &FlowConfig,
    ) -> Self {
        Self {
            recovery: MasterKeyRecoveryOrchestrator::new(network, storage, config.svr.clone()),
        }
    }

    /// The entropy pool lands in flow state via the `Registered` event.
    pub fn apply_parent_state(
        &self,
        mut state: PinCreationState,
        parent: &RegistrationFlowState,
    ) -> PinCreationState {
        state.account_entropy_pool = parent.account_entropy_pool.clone();
        state
    }

    pub async fn apply_event(
        &self,
        state: PinCreationState,
        event: PinCreationEvent,
        emit_state: StateEmitter<'_, PinCreationState>,
        emit: EventEmitter<'_>,
    ) {
        match event {
            PinCreationEvent::ToggleKeyboard => {
                let mut next = state;
                next.is_alphanumeric_keyboard = !next.is_alphanumeric_keyboard;
                emit_state(next);
            }
            PinCreationEvent::ConsumeOneTimeEvent => {
                let mut next = state;
                next.one_time_event = None;
                emit_state(next);
            }
            PinCreationEvent::PinConfirmed(pin) => {
                if state.loading {
                    return;
                }
                let mut working = state;
                working.loading = true;
                emit_state(working.clone());

                let mut finished = self.create_pin(working, &pin, emit).await;
                finished.loading = false;
                emit_state(finished);
            }
        }
    }

    async fn create_pin(
        &self,
        state: PinCreationState,
        pin: &str,
        emit: EventEmitter<'_>,
    ) -> PinCreationState {
        let Some(aep) = state.account_entropy_pool.clone() else {
            warn!("PIN creation reached without an entropy pool, resetting");
            emit(RegistrationFlowEvent::ResetState);
            return state;
        };

        let master_key = aep.derive_master_key();
        match self
            .recovery
            .backup_master_key(pin, state.is_alphanumeric_keyboard, &master_key)
            .await
        {
            RegistrationNetworkResult::Success(_) => {
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::FullyComplete,
                ));
                state
            }
            RegistrationNetworkResult::Failure(BackupMasterKeyError::RateLimited {
                retry_after,
            }) => state.with_one_time(PinCreationOneTimeEvent::RateLimited { retry_after }),
            RegistrationNetworkResult::Failure(BackupMasterKeyError::InvalidRequest(message)) => {
                warn!(%message, "SVR rejected the new PIN");
                state.with_one_time(PinCreationOneTimeEvent::UnknownError)
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error backing up the master key");
                state.with_one_time(PinCreationOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error backing up the master key");
                state.with_one_time(PinCreationOneTimeEvent::UnknownError)
            }
        }
    }
}
