//! Typed results and error taxonomies for every network-facing operation.
//!
//! Orchestrators never panic and never throw: each call returns a
//! [`RegistrationNetworkResult`] whose failure arm is the operation's own
//! error enum. Transport problems and unexpected application failures are
//! kept apart from typed protocol errors so the reducer can apply the right
//! policy (retry prompt, credential invalidation, or full reset) per arm.

use crate::types::{RegistrationLockData, SessionMetadata};
use std::time::Duration;
use thiserror::Error;

/// Four-way tagged result for a registration network call.
///
/// `NetworkError` is a transport failure (retryable, input preserved);
/// `ApplicationError` is an unexpected local failure (surfaced as a generic
/// error). Both carry their cause for logging only.
#[derive(Debug)]
pub enum RegistrationNetworkResult<T, E> {
    Success(T),
    Failure(E),
    NetworkError(anyhow::Error),
    ApplicationError(anyhow::Error),
}

impl<T, E> RegistrationNetworkResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Map the success payload, leaving every other arm untouched.
    pub fn map_success<U>(self, f: impl FnOnce(T) -> U) -> RegistrationNetworkResult<U, E> {
        match self {
            Self::Success(data) => RegistrationNetworkResult::Success(f(data)),
            Self::Failure(e) => RegistrationNetworkResult::Failure(e),
            Self::NetworkError(e) => RegistrationNetworkResult::NetworkError(e),
            Self::ApplicationError(e) => RegistrationNetworkResult::ApplicationError(e),
        }
    }
}

/// Errors from creating a verification session.
#[derive(Debug, Error)]
pub enum CreateSessionError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from updating a session with a captcha or push-challenge token.
#[derive(Debug, Error)]
pub enum UpdateSessionError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        session: SessionMetadata,
    },

    #[error("Update rejected: {0}")]
    RejectedUpdate(String),
}

/// Errors from requesting a verification code over SMS or voice.
#[derive(Debug, Error)]
pub enum RequestVerificationCodeError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        session: SessionMetadata,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Could not fulfill request with the requested transport")]
    CouldNotFulfillWithRequestedTransport { session: SessionMetadata },

    #[error("Third-party delivery service error: {message}")]
    ThirdPartyServiceError {
        message: String,
        permanent_failure: bool,
    },
}

/// Errors from submitting a user-entered verification code.
#[derive(Debug, Error)]
pub enum SubmitVerificationCodeError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        session: SessionMetadata,
    },

    #[error("Incorrect verification code")]
    IncorrectCode { session: SessionMetadata },

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

/// Errors from the account registration call itself.
#[derive(Debug, Error)]
pub enum RegisterAccountError {
    #[error("Account is protected by registration lock")]
    RegistrationLock(RegistrationLockData),

    #[error("Registration recovery password rejected: {0}")]
    RegistrationRecoveryPasswordIncorrect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session not found or not verified: {0}")]
    SessionNotFoundOrNotVerified(String),

    #[error("A device transfer is possible")]
    DeviceTransferPossible,

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

/// Errors from restoring the master key from SVR with a PIN.
#[derive(Debug, Error)]
pub enum RestoreMasterKeyError {
    #[error("Wrong PIN, {tries_remaining} tries remaining")]
    WrongPin { tries_remaining: u32 },

    #[error("No SVR data found for this credential")]
    NoDataFound,
}

/// Errors from fetching fresh SVR credentials for the authenticated account.
#[derive(Debug, Error)]
pub enum GetSvrCredentialsError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from checking which previously-known SVR credentials still match.
#[derive(Debug, Error)]
pub enum CheckSvrCredentialsError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from backing up a PIN-protected master key to SVR.
#[derive(Debug, Error)]
pub enum BackupMasterKeyError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from toggling registration lock or pushing account attributes.
#[derive(Debug, Error)]
pub enum AccountManagementError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
