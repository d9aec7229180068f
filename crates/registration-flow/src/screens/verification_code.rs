//! Verification code entry: code submission, resend, and the session-proof
//! registration that follows a verified session.

use super::phone_number::post_registration_route;
use super::{EventEmitter, StateEmitter};
use crate::config::FlowConfig;
use crate::error::{
    RegisterAccountError, RegistrationNetworkResult, RequestVerificationCodeError,
    SubmitVerificationCodeError,
};
use crate::event::RegistrationFlowEvent;
use crate::network::NetworkController;
use crate::recovery::RecoveryPasswordRegistrar;
use crate::session::SessionController;
use crate::state::RegistrationRoute;
use crate::storage::StorageController;
use crate::types::{SessionMetadata, VerificationCodeTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const VERIFICATION_CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationCodeOneTimeEvent {
    RateLimited { retry_after: Duration },
    IncorrectCode,
    NetworkError,
    UnknownError,
    CouldNotRequestCodeWithSelectedTransport,
    ThirdPartyError,
}

/// State for the verification code entry screen.
#[derive(Debug, Clone)]
pub struct VerificationCodeEntryState {
    pub e164: String,
    pub session_metadata: SessionMetadata,
    pub code: String,
    pub in_flight: bool,
    pub one_time_event: Option<VerificationCodeOneTimeEvent>,
}

impl VerificationCodeEntryState {
    /// Built from the route payload that navigated here.
    pub fn new(session: SessionMetadata, e164: String) -> Self {
        Self {
            e164,
            session_metadata: session,
            code: String::new(),
            in_flight: false,
            one_time_event: None,
        }
    }

    fn with_one_time(mut self, event: VerificationCodeOneTimeEvent) -> Self {
        self.one_time_event = Some(event);
        self
    }
}

#[derive(Debug, Clone)]
pub enum VerificationCodeEvent {
    CodeChanged(String),
    CodeSubmitted,
    ResendCode(VerificationCodeTransport),
    ConsumeOneTimeEvent,
}

pub struct VerificationCodeEntryFlow {
    sessions: SessionController,
    registrar: RecoveryPasswordRegistrar,
}

impl VerificationCodeEntryFlow {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: &FlowConfig,
    ) -> Self {
        Self {
            sessions: SessionController::new(network.clone(), config.session.clone()),
            registrar: RecoveryPasswordRegistrar::new(network, storage),
        }
    }

    pub async fn apply_event(
        &self,
        state: VerificationCodeEntryState,
        event: VerificationCodeEvent,
        emit_state: StateEmitter<'_, VerificationCodeEntryState>,
        emit: EventEmitter<'_>,
    ) {
        match event {
            VerificationCodeEvent::CodeChanged(raw) => {
                let mut next = state;
                next.code = raw
                    .chars()
                    .filter(char::is_ascii_digit)
                    .take(VERIFICATION_CODE_LEN)
                    .collect();
                emit_state(next);
            }
            VerificationCodeEvent::ConsumeOneTimeEvent => {
                let mut next = state;
                next.one_time_event = None;
                emit_state(next);
            }
            VerificationCodeEvent::CodeSubmitted => {
                if state.in_flight {
                    return;
                }
                let mut working = state;
                working.in_flight = true;
                emit_state(working.clone());

                let mut finished = self.submit_code(working, emit).await;
                finished.in_flight = false;
                emit_state(finished);
            }
            VerificationCodeEvent::ResendCode(transport) => {
                if state.in_flight {
                    return;
                }
                let mut working = state;
                working.in_flight = true;
                emit_state(working.clone());

                let mut finished = self.resend_code(working, transport, emit).await;
                finished.in_flight = false;
                emit_state(finished);
            }
        }
    }

    async fn submit_code(
        &self,
        mut state: VerificationCodeEntryState,
        emit: EventEmitter<'_>,
    ) -> VerificationCodeEntryState {
        let session_id = state.session_metadata.id.clone();
        let code = state.code.clone();

        match self.sessions.submit_verification_code(&session_id, &code).await {
            RegistrationNetworkResult::Success(session) => {
                emit(RegistrationFlowEvent::SessionUpdated(session.clone()));
                state.session_metadata = session.clone();
                if session.verified {
                    self.register_with_verified_session(state, emit).await
                } else {
                    warn!("Code accepted but session still unverified");
                    state.with_one_time(VerificationCodeOneTimeEvent::UnknownError)
                }
            }
            RegistrationNetworkResult::Failure(SubmitVerificationCodeError::IncorrectCode {
                session,
            }) => {
                emit(RegistrationFlowEvent::SessionUpdated(session.clone()));
                state.session_metadata = session;
                state.with_one_time(VerificationCodeOneTimeEvent::IncorrectCode)
            }
            RegistrationNetworkResult::Failure(SubmitVerificationCodeError::RateLimited {
                retry_after,
                session,
            }) => {
                emit(RegistrationFlowEvent::SessionUpdated(session.clone()));
                state.session_metadata = session;
                state.with_one_time(VerificationCodeOneTimeEvent::RateLimited { retry_after })
            }
            RegistrationNetworkResult::Failure(SubmitVerificationCodeError::SessionNotFound(
                message,
            )) => {
                warn!(%message, "Session vanished during code submission, resetting");
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error submitting verification code");
                state.with_one_time(VerificationCodeOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error submitting verification code");
                state.with_one_time(VerificationCodeOneTimeEvent::UnknownError)
            }
        }
    }

    async fn register_with_verified_session(
        &self,
        state: VerificationCodeEntryState,
        emit: EventEmitter<'_>,
    ) -> VerificationCodeEntryState {
        match self
            .registrar
            .register_with_session(&state.e164, &state.session_metadata.id)
            .await
        {
            RegistrationNetworkResult::Success((response, key_material)) => {
                emit(RegistrationFlowEvent::Registered(
                    key_material.account_entropy_pool.clone(),
                ));
                emit(RegistrationFlowEvent::NavigateToScreen(
                    post_registration_route(response.storage_capable),
                ));
                state
            }
            RegistrationNetworkResult::Failure(RegisterAccountError::RegistrationLock(data)) => {
                // The account is reglocked and we hold no local master key;
                // only the user's PIN can unlock it now.
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::PinEntryForRegistrationLock {
                        time_remaining: data.time_remaining,
                        svr_credentials: data.svr_credentials,
                    },
                ));
                state
            }
            RegistrationNetworkResult::Failure(RegisterAccountError::RateLimited {
                retry_after,
            }) => state.with_one_time(VerificationCodeOneTimeEvent::RateLimited { retry_after }),
            RegistrationNetworkResult::Failure(RegisterAccountError::DeviceTransferPossible)
            | RegistrationNetworkResult::Failure(
                RegisterAccountError::SessionNotFoundOrNotVerified(_),
            ) => {
                warn!("Inconsistent registration state after a verified session, resetting");
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            RegistrationNetworkResult::Failure(error) => {
                warn!(%error, "Unexpected registration failure after a verified session");
                state.with_one_time(VerificationCodeOneTimeEvent::UnknownError)
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error registering account");
                state.with_one_time(VerificationCodeOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error registering account");
                state.with_one_time(VerificationCodeOneTimeEvent::UnknownError)
            }
        }
    }

    async fn resend_code(
        &self,
        mut state: VerificationCodeEntryState,
        transport: VerificationCodeTransport,
        emit: EventEmitter<'_>,
    ) -> VerificationCodeEntryState {
        match self
            .sessions
            .request_verification_code(&state.session_metadata.id, transport)
            .await
        {
            RegistrationNetworkResult::Success(session) => {
                emit(RegistrationFlowEvent::SessionUpdated(session.clone()));
                state.session_metadata = session;
                state
            }
            RegistrationNetworkResult::Failure(RequestVerificationCodeError::RateLimited {
                retry_after,
                session,
            }) => {
                state.session_metadata = session;
                state.with_one_time(VerificationCodeOneTimeEvent::RateLimited { retry_after })
            }
            RegistrationNetworkResult::Failure(RequestVerificationCodeError::SessionNotFound(
                message,
            )) => {
                warn!(%message, "Session vanished during resend, resetting");
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            RegistrationNetworkResult::Failure(
                RequestVerificationCodeError::CouldNotFulfillWithRequestedTransport { session },
            ) => {
                state.session_metadata = session;
                state.with_one_time(
                    VerificationCodeOneTimeEvent::CouldNotRequestCodeWithSelectedTransport,
                )
            }
            RegistrationNetworkResult::Failure(
                RequestVerificationCodeError::ThirdPartyServiceError { message, .. },
            ) => {
                warn!(%message, "Third-party delivery failure on resend");
                state.with_one_time(VerificationCodeOneTimeEvent::ThirdPartyError)
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error resending code");
                state.with_one_time(VerificationCodeOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error resending code");
                state.with_one_time(VerificationCodeOneTimeEvent::UnknownError)
            }
        }
    }
}
