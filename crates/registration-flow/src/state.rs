//! Flow-level state: the route backstack and everything accumulated across
//! screens during one registration attempt.

use crate::storage::PreExistingRegistrationData;
use crate::types::{SessionMetadata, SvrCredentials};
use registration_crypto::{AccountEntropyPool, MasterKey};
use std::time::Duration;

/// Navigation routes for the registration flow. The head of the backstack is
/// the current screen.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationRoute {
    Welcome,
    Permissions {
        for_restore: bool,
    },
    PhoneNumberEntry,
    CountryCodePicker,
    VerificationCodeEntry {
        session: SessionMetadata,
        e164: String,
    },
    Captcha {
        session: SessionMetadata,
    },
    PinEntryForSvrRestore,
    PinEntryForRegistrationLock {
        time_remaining: Duration,
        svr_credentials: SvrCredentials,
    },
    PinEntryForSmsBypass {
        svr_credentials: SvrCredentials,
    },
    AccountLocked {
        time_remaining: Duration,
    },
    PinCreate,
    RestoreViaQr,
    FullyComplete,
}

/// The single source of truth for one registration attempt.
///
/// Created once per attempt (fresh install or forced re-registration) and
/// discarded when the flow reaches a terminal route or is reset.
#[derive(Debug, Clone)]
pub struct RegistrationFlowState {
    /// The navigation stack. Never empty; the last entry can only be left by
    /// the host tearing the flow down.
    pub back_stack: Vec<RegistrationRoute>,

    /// Metadata for the currently-active verification session.
    pub session_metadata: Option<SessionMetadata>,

    /// The e164 tied to [`Self::session_metadata`].
    pub session_e164: Option<String>,

    /// The entropy pool generated (or carried over) by this registration.
    pub account_entropy_pool: Option<AccountEntropyPool>,

    /// Master key restored from SVR. Only needed to bootstrap the initial
    /// storage-service restore; a fresh pool takes over afterwards.
    pub temporary_master_key: Option<MasterKey>,

    /// Present only when this is a device-local re-registration.
    pub pre_existing_registration_data: Option<PreExistingRegistrationData>,

    /// Once a recovery password has been proven invalid by the server, no
    /// recovery-password path may ever run again for this flow instance.
    /// Monotonic: set true, never cleared.
    pub do_not_attempt_recovery_password: bool,
}

impl Default for RegistrationFlowState {
    fn default() -> Self {
        Self {
            back_stack: vec![RegistrationRoute::Welcome],
            session_metadata: None,
            session_e164: None,
            account_entropy_pool: None,
            temporary_master_key: None,
            pre_existing_registration_data: None,
            do_not_attempt_recovery_password: false,
        }
    }
}

impl RegistrationFlowState {
    /// Fresh state, optionally seeded with data from a prior registration on
    /// this device.
    pub fn new(pre_existing: Option<PreExistingRegistrationData>) -> Self {
        Self {
            pre_existing_registration_data: pre_existing,
            ..Self::default()
        }
    }

    /// The screen currently on top of the backstack.
    pub fn current_route(&self) -> &RegistrationRoute {
        self.back_stack
            .last()
            .expect("backstack invariant: never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_starts_at_welcome() {
        let state = RegistrationFlowState::default();
        assert_eq!(state.current_route(), &RegistrationRoute::Welcome);
        assert!(!state.do_not_attempt_recovery_password);
        assert!(state.session_metadata.is_none());
    }
}
