//! The network collaborator interface consumed by the engine.
//!
//! The engine never talks to a transport directly; hosts implement this
//! trait over whatever HTTP/websocket stack they already run. Every mutating
//! call returns the four-way [`RegistrationNetworkResult`] so the flow can
//! distinguish typed protocol errors from transport and local failures.

use crate::error::{
    AccountManagementError, BackupMasterKeyError, CheckSvrCredentialsError, CreateSessionError,
    GetSvrCredentialsError, RegisterAccountError, RegistrationNetworkResult,
    RequestVerificationCodeError, RestoreMasterKeyError, SubmitVerificationCodeError,
    UpdateSessionError,
};
use crate::types::{
    AccountAttributes, CheckSvrCredentialsResponse, RegisterAccountRequest,
    RegisterAccountResponse, SessionMetadata, SvrCredentials, VerificationCodeTransport,
};
use async_trait::async_trait;
use registration_crypto::MasterKey;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkController: Send + Sync {
    /// Create a verification session for a phone number. The push token, if
    /// available, lets the server offer a push challenge instead of a captcha.
    async fn create_session<'a>(
        &self,
        e164: &str,
        push_token: Option<&'a str>,
    ) -> RegistrationNetworkResult<SessionMetadata, CreateSessionError>;

    /// Fetch the current state of an existing session.
    async fn get_session(
        &self,
        session_id: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, UpdateSessionError>;

    /// Submit a push-challenge token and/or captcha token against a session.
    async fn update_session<'a>(
        &self,
        session_id: &str,
        push_challenge_token: Option<&'a str>,
        captcha_token: Option<&'a str>,
    ) -> RegistrationNetworkResult<SessionMetadata, UpdateSessionError>;

    async fn request_verification_code(
        &self,
        session_id: &str,
        transport: VerificationCodeTransport,
        locale: &str,
        sms_retriever_supported: bool,
    ) -> RegistrationNetworkResult<SessionMetadata, RequestVerificationCodeError>;

    async fn submit_verification_code(
        &self,
        session_id: &str,
        code: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, SubmitVerificationCodeError>;

    async fn register_account(
        &self,
        request: RegisterAccountRequest,
    ) -> RegistrationNetworkResult<RegisterAccountResponse, RegisterAccountError>;

    /// The device push token, if push services are available on this install.
    async fn get_push_token(&self) -> Option<String>;

    /// Resolve to the push-challenge token once one is delivered. The engine
    /// bounds this wait with its own timeout; implementations may pend
    /// indefinitely.
    async fn await_push_challenge_token(&self) -> Option<String>;

    /// URL the host should load to present a captcha challenge.
    fn captcha_url(&self) -> String;

    async fn restore_master_key_from_svr(
        &self,
        credentials: &SvrCredentials,
        pin: &str,
    ) -> RegistrationNetworkResult<MasterKey, RestoreMasterKeyError>;

    async fn set_pin_and_master_key_on_svr(
        &self,
        pin: &str,
        master_key: &MasterKey,
    ) -> RegistrationNetworkResult<Option<SvrCredentials>, BackupMasterKeyError>;

    async fn enable_registration_lock(
        &self,
        registration_lock_token: &str,
    ) -> RegistrationNetworkResult<(), AccountManagementError>;

    async fn disable_registration_lock(
        &self,
    ) -> RegistrationNetworkResult<(), AccountManagementError>;

    /// Fetch fresh SVR credentials for the now-authenticated account.
    async fn get_svr_credentials(
        &self,
    ) -> RegistrationNetworkResult<SvrCredentials, GetSvrCredentialsError>;

    /// Ask which of the supplied credentials are still valid for this number.
    async fn check_svr_credentials(
        &self,
        e164: &str,
        credentials: &[SvrCredentials],
    ) -> RegistrationNetworkResult<CheckSvrCredentialsResponse, CheckSvrCredentialsError>;

    async fn set_account_attributes(
        &self,
        attributes: &AccountAttributes,
    ) -> RegistrationNetworkResult<(), AccountManagementError>;

    /// Enqueue the durable job that resets the SVR guess counter after a
    /// successful PIN-based restore. Fire-and-forget.
    async fn enqueue_svr_guess_reset_job(&self);
}
