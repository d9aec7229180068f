//! The flow event stream: everything screens can tell the reducer, and
//! everything the host consumes to drive navigation and side effects.

use crate::state::RegistrationRoute;
use crate::types::SessionMetadata;
use registration_crypto::{AccountEntropyPool, MasterKey};

/// Events applied against [`RegistrationFlowState`](crate::RegistrationFlowState)
/// by the reducer, and re-emitted to the host where state alone cannot carry
/// the consequence (exit-flow, reset).
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationFlowEvent {
    /// Navigate to a specific screen.
    NavigateToScreen(RegistrationRoute),

    /// Navigate back one screen.
    NavigateBack,

    /// Some irrecoverable state was hit; the best course of action is to
    /// completely reset registration.
    ResetState,

    /// The ongoing registration session was updated.
    SessionUpdated(SessionMetadata),

    /// The e164 for this registration attempt was chosen or changed.
    E164Chosen(String),

    /// The user successfully registered.
    Registered(AccountEntropyPool),

    /// The master key was restored from SVR.
    MasterKeyRestoredFromSvr(MasterKey),

    /// Recovery-password registration is not possible for this account.
    RecoveryPasswordInvalid,
}
