//! Phone number entry: input normalization plus the submission pipeline that
//! reconciles silent re-registration, the SVR bypass shortcut, and ordinary
//! session creation.

use super::{EventEmitter, StateEmitter};
use crate::config::FlowConfig;
use crate::error::{
    CreateSessionError, RegistrationNetworkResult, RequestVerificationCodeError,
    UpdateSessionError,
};
use crate::event::RegistrationFlowEvent;
use crate::network::NetworkController;
use crate::phone;
use crate::recovery::{MasterKeyRegistrationOutcome, RecoveryPasswordRegistrar};
use crate::session::SessionController;
use crate::state::{RegistrationFlowState, RegistrationRoute};
use crate::storage::{PreExistingRegistrationData, StorageController};
use crate::svr::SvrCredentialChecker;
use crate::types::{SessionMetadata, SvrCredentials, VerificationCodeTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One-shot signals for the screen to render and then consume.
#[derive(Debug, Clone, PartialEq)]
pub enum PhoneNumberEntryOneTimeEvent {
    RateLimited { retry_after: Duration },
    NetworkError,
    UnknownError,
    CouldNotRequestCodeWithSelectedTransport,
    ThirdPartyError,
}

/// State for the phone number entry screen.
#[derive(Debug, Clone)]
pub struct PhoneNumberEntryState {
    pub region_code: String,
    pub country_code: String,
    pub national_number: String,
    pub formatted_number: String,
    pub session_metadata: Option<SessionMetadata>,
    pub restored_svr_credentials: Vec<SvrCredentials>,
    pub pre_existing_registration_data: Option<PreExistingRegistrationData>,
    pub one_time_event: Option<PhoneNumberEntryOneTimeEvent>,
    pub show_full_screen_spinner: bool,
}

impl Default for PhoneNumberEntryState {
    fn default() -> Self {
        Self {
            region_code: "US".into(),
            country_code: "1".into(),
            national_number: String::new(),
            formatted_number: String::new(),
            session_metadata: None,
            restored_svr_credentials: Vec::new(),
            pre_existing_registration_data: None,
            one_time_event: None,
            show_full_screen_spinner: false,
        }
    }
}

impl PhoneNumberEntryState {
    fn with_one_time(mut self, event: PhoneNumberEntryOneTimeEvent) -> Self {
        self.one_time_event = Some(event);
        self
    }

    fn e164(&self) -> String {
        phone::to_e164(&self.country_code, &self.national_number)
    }
}

/// Screen events.
#[derive(Debug, Clone)]
pub enum PhoneNumberEntryEvent {
    PhoneNumberChanged(String),
    CountryCodeChanged(String),
    CountrySelected(phone::Country),
    OpenCountryPicker,
    PhoneNumberSubmitted,
    CaptchaCompleted(String),
    ConsumeOneTimeEvent,
}

/// The submission pipeline behind the phone number entry screen.
pub struct PhoneNumberEntryFlow {
    sessions: SessionController,
    svr_checker: SvrCredentialChecker,
    registrar: RecoveryPasswordRegistrar,
    storage: Arc<dyn StorageController>,
}

impl PhoneNumberEntryFlow {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: &FlowConfig,
    ) -> Self {
        Self {
            sessions: SessionController::new(network.clone(), config.session.clone()),
            svr_checker: SvrCredentialChecker::new(network.clone()),
            registrar: RecoveryPasswordRegistrar::new(network, storage.clone()),
            storage,
        }
    }

    /// Build the screen's initial state: seed the region from config, then
    /// pull in whatever the parent flow and local storage already know.
    pub async fn initial_state(
        &self,
        parent: &RegistrationFlowState,
        config: &FlowConfig,
    ) -> PhoneNumberEntryState {
        let region = config.phone.default_region.clone();
        let country_code = phone::calling_code_for_region(&region)
            .unwrap_or(1)
            .to_string();

        let state = PhoneNumberEntryState {
            region_code: region,
            country_code,
            restored_svr_credentials: self.storage.get_restored_svr_credentials().await,
            ..PhoneNumberEntryState::default()
        };
        self.apply_parent_state(state, parent)
    }

    /// Fold the parent flow state into the screen state: pre-existing
    /// registration data flows down, and a poisoned recovery password clears
    /// the SVR shortcut (it is itself a recovery-password path).
    pub fn apply_parent_state(
        &self,
        mut state: PhoneNumberEntryState,
        parent: &RegistrationFlowState,
    ) -> PhoneNumberEntryState {
        state.pre_existing_registration_data = parent.pre_existing_registration_data.clone();
        if parent.do_not_attempt_recovery_password {
            state.restored_svr_credentials.clear();
        }
        state
    }

    pub async fn apply_event(
        &self,
        state: PhoneNumberEntryState,
        event: PhoneNumberEntryEvent,
        emit_state: StateEmitter<'_, PhoneNumberEntryState>,
        emit: EventEmitter<'_>,
    ) {
        match event {
            PhoneNumberEntryEvent::PhoneNumberChanged(raw) => {
                let digits = phone::extract_digits(&raw);
                if digits == state.national_number {
                    emit_state(state);
                    return;
                }
                let mut next = state;
                next.formatted_number = phone::format_national(&digits, &next.region_code);
                next.national_number = digits;
                emit_state(next);
            }
            PhoneNumberEntryEvent::CountryCodeChanged(raw) => {
                let digits: String = raw.chars().filter(char::is_ascii_digit).take(3).collect();
                let mut next = state;
                if let Some(region) = phone::region_for_calling_code(&digits) {
                    next.region_code = region.to_string();
                }
                next.country_code = digits;
                next.formatted_number =
                    phone::format_national(&next.national_number, &next.region_code);
                emit_state(next);
            }
            PhoneNumberEntryEvent::CountrySelected(country) => {
                let mut next = state;
                next.region_code = country.region_code.to_string();
                next.country_code = country.calling_code.to_string();
                next.formatted_number =
                    phone::format_national(&next.national_number, &next.region_code);
                emit_state(next);
            }
            PhoneNumberEntryEvent::OpenCountryPicker => {
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::CountryCodePicker,
                ));
            }
            PhoneNumberEntryEvent::ConsumeOneTimeEvent => {
                let mut next = state;
                next.one_time_event = None;
                emit_state(next);
            }
            PhoneNumberEntryEvent::PhoneNumberSubmitted => {
                if state.show_full_screen_spinner {
                    debug!("Submission already in flight, ignoring");
                    return;
                }
                let mut working = state;
                working.show_full_screen_spinner = true;
                emit_state(working.clone());

                let mut finished = self.submit_phone_number(working, emit).await;
                finished.show_full_screen_spinner = false;
                emit_state(finished);
            }
            PhoneNumberEntryEvent::CaptchaCompleted(token) => {
                let finished = self.submit_captcha(state, &token, emit).await;
                emit_state(finished);
            }
        }
    }

    async fn submit_phone_number(
        &self,
        state: PhoneNumberEntryState,
        emit: EventEmitter<'_>,
    ) -> PhoneNumberEntryState {
        let e164 = state.e164();

        if let Some(pre_existing) = state.pre_existing_registration_data.clone() {
            if pre_existing.e164 == e164 {
                return self
                    .attempt_silent_reregistration(state, &e164, &pre_existing, emit)
                    .await;
            }
            debug!("Pre-existing registration is for a different number, skipping silent path");
        }

        if let Some(credential) = self
            .svr_checker
            .check(&e164, &state.restored_svr_credentials)
            .await
        {
            emit(RegistrationFlowEvent::E164Chosen(e164));
            emit(RegistrationFlowEvent::NavigateToScreen(
                RegistrationRoute::PinEntryForSmsBypass {
                    svr_credentials: credential,
                },
            ));
            return state;
        }

        self.start_session_verification(state, &e164, emit).await
    }

    /// A device-local re-registration for the same number: try the recovery
    /// password derived from the prior entropy pool before creating any
    /// session. Success skips phone verification entirely.
    async fn attempt_silent_reregistration(
        &self,
        state: PhoneNumberEntryState,
        e164: &str,
        pre_existing: &PreExistingRegistrationData,
        emit: EventEmitter<'_>,
    ) -> PhoneNumberEntryState {
        let master_key = pre_existing.aep.derive_master_key();

        match self
            .registrar
            .register_with_restored_master_key(
                e164,
                &master_key,
                pre_existing.registration_lock_enabled,
                Some(pre_existing),
            )
            .await
        {
            MasterKeyRegistrationOutcome::Registered {
                response,
                key_material,
            } => {
                emit(RegistrationFlowEvent::Registered(
                    key_material.account_entropy_pool.clone(),
                ));
                emit(RegistrationFlowEvent::NavigateToScreen(
                    post_registration_route(response.storage_capable),
                ));
                state
            }
            MasterKeyRegistrationOutcome::RecoveryPasswordRejected => {
                warn!("Silent re-registration rejected, falling back to phone verification");
                emit(RegistrationFlowEvent::RecoveryPasswordInvalid);
                let mut next = state;
                next.pre_existing_registration_data = None;
                next.restored_svr_credentials.clear();
                self.start_session_verification(next, e164, emit).await
            }
            MasterKeyRegistrationOutcome::ProtocolInconsistency => {
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            MasterKeyRegistrationOutcome::RateLimited { retry_after } => {
                state.with_one_time(PhoneNumberEntryOneTimeEvent::RateLimited { retry_after })
            }
            MasterKeyRegistrationOutcome::TransportFailure => {
                state.with_one_time(PhoneNumberEntryOneTimeEvent::NetworkError)
            }
            MasterKeyRegistrationOutcome::Unexpected => {
                state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError)
            }
        }
    }

    async fn start_session_verification(
        &self,
        state: PhoneNumberEntryState,
        e164: &str,
        emit: EventEmitter<'_>,
    ) -> PhoneNumberEntryState {
        let session = match state.session_metadata.clone() {
            Some(existing) => existing,
            None => match self.sessions.create_session(e164).await {
                RegistrationNetworkResult::Success(session) => session,
                RegistrationNetworkResult::Failure(CreateSessionError::RateLimited {
                    retry_after,
                }) => {
                    return state
                        .with_one_time(PhoneNumberEntryOneTimeEvent::RateLimited { retry_after });
                }
                RegistrationNetworkResult::Failure(CreateSessionError::InvalidRequest(message)) => {
                    warn!(%message, "Session creation rejected");
                    return state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError);
                }
                RegistrationNetworkResult::NetworkError(e) => {
                    warn!(error = %e, "Network error creating session");
                    return state.with_one_time(PhoneNumberEntryOneTimeEvent::NetworkError);
                }
                RegistrationNetworkResult::ApplicationError(e) => {
                    warn!(error = %e, "Application error creating session");
                    return state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError);
                }
            },
        };

        self.clear_challenges_and_request_code(state, e164, session, emit)
            .await
    }

    /// Satisfy outstanding anti-abuse challenges, then request a code. Push
    /// challenges degrade gracefully; a captcha demand routes to the captcha
    /// screen instead of requesting a code.
    async fn clear_challenges_and_request_code(
        &self,
        mut state: PhoneNumberEntryState,
        e164: &str,
        session: SessionMetadata,
        emit: EventEmitter<'_>,
    ) -> PhoneNumberEntryState {
        let session = if session.requires_push_challenge() {
            self.sessions.handle_push_challenge(session).await
        } else {
            session
        };
        state.session_metadata = Some(session.clone());

        if session.requires_captcha() {
            emit(RegistrationFlowEvent::NavigateToScreen(
                RegistrationRoute::Captcha { session },
            ));
            return state;
        }

        match self
            .sessions
            .request_verification_code(&session.id, VerificationCodeTransport::Sms)
            .await
        {
            RegistrationNetworkResult::Success(updated) => {
                state.session_metadata = Some(updated.clone());
                emit(RegistrationFlowEvent::NavigateToScreen(
                    RegistrationRoute::VerificationCodeEntry {
                        session: updated,
                        e164: e164.to_string(),
                    },
                ));
                state
            }
            RegistrationNetworkResult::Failure(RequestVerificationCodeError::RateLimited {
                retry_after,
                session,
            }) => {
                state.session_metadata = Some(session);
                state.with_one_time(PhoneNumberEntryOneTimeEvent::RateLimited { retry_after })
            }
            RegistrationNetworkResult::Failure(RequestVerificationCodeError::SessionNotFound(
                message,
            )) => {
                warn!(%message, "Session vanished while requesting a code, resetting");
                emit(RegistrationFlowEvent::ResetState);
                state
            }
            RegistrationNetworkResult::Failure(
                RequestVerificationCodeError::CouldNotFulfillWithRequestedTransport { session },
            ) => {
                state.session_metadata = Some(session);
                state.with_one_time(
                    PhoneNumberEntryOneTimeEvent::CouldNotRequestCodeWithSelectedTransport,
                )
            }
            RegistrationNetworkResult::Failure(
                RequestVerificationCodeError::ThirdPartyServiceError {
                    message,
                    permanent_failure,
                },
            ) => {
                warn!(%message, permanent_failure, "Third-party delivery failure");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::ThirdPartyError)
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error requesting verification code");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error requesting verification code");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError)
            }
        }
    }

    async fn submit_captcha(
        &self,
        state: PhoneNumberEntryState,
        token: &str,
        emit: EventEmitter<'_>,
    ) -> PhoneNumberEntryState {
        let Some(session) = state.session_metadata.clone() else {
            warn!("Captcha completed without an active session");
            return state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError);
        };
        let e164 = state.e164();

        match self.sessions.submit_captcha_token(&session.id, token).await {
            RegistrationNetworkResult::Success(updated) => {
                let mut next = state;
                if updated.requires_captcha() {
                    next.session_metadata = Some(updated.clone());
                    emit(RegistrationFlowEvent::NavigateToScreen(
                        RegistrationRoute::Captcha { session: updated },
                    ));
                    next
                } else {
                    self.clear_challenges_and_request_code(next, &e164, updated, emit)
                        .await
                }
            }
            RegistrationNetworkResult::Failure(UpdateSessionError::RateLimited {
                retry_after,
                session,
            }) => {
                let mut next = state;
                next.session_metadata = Some(session);
                next.with_one_time(PhoneNumberEntryOneTimeEvent::RateLimited { retry_after })
            }
            RegistrationNetworkResult::Failure(UpdateSessionError::RejectedUpdate(message)) => {
                warn!(%message, "Captcha token rejected");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError)
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error submitting captcha token");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::NetworkError)
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error submitting captcha token");
                state.with_one_time(PhoneNumberEntryOneTimeEvent::UnknownError)
            }
        }
    }
}

/// Where registration lands after success: straight to the PIN restore when
/// the account can pull storage-service data, otherwise to PIN creation.
pub(crate) fn post_registration_route(storage_capable: bool) -> RegistrationRoute {
    if storage_capable {
        RegistrationRoute::PinEntryForSvrRestore
    } else {
        RegistrationRoute::PinCreate
    }
}
