//! The top-level reducer: applies flow events against flow state.

use crate::event::RegistrationFlowEvent;
use crate::state::{RegistrationFlowState, RegistrationRoute};
use tracing::{debug, info};

/// Result of applying one event: the successor state plus any events the
/// host must act on itself (exit-flow, full reset).
#[derive(Debug)]
pub struct Applied {
    pub state: RegistrationFlowState,
    pub effects: Vec<RegistrationFlowEvent>,
}

/// Pure reducer over [`RegistrationFlowState`]. All event application is
/// serialized through here: screens run their async work first, then feed
/// the resulting events in one at a time, so state never sees interleaved
/// writes.
pub struct RegistrationFlowStateMachine;

impl RegistrationFlowStateMachine {
    /// Apply a single event, producing the successor state and host effects.
    pub fn apply(state: &RegistrationFlowState, event: RegistrationFlowEvent) -> Applied {
        let mut next = state.clone();
        let mut effects = Vec::new();

        match event {
            RegistrationFlowEvent::NavigateToScreen(route) => {
                // Routes that carry session context sync it into flow state
                // so later screens (PIN entry) can read it back.
                if let RegistrationRoute::VerificationCodeEntry { session, e164 } = &route {
                    next.session_metadata = Some(session.clone());
                    next.session_e164 = Some(e164.clone());
                }
                if next.current_route() != &route {
                    debug!(?route, "Navigating");
                    next.back_stack.push(route);
                }
            }
            RegistrationFlowEvent::NavigateBack => {
                if next.back_stack.len() > 1 {
                    next.back_stack.pop();
                } else {
                    // Popping the last entry is the host's exit-flow signal,
                    // not a state change.
                    effects.push(RegistrationFlowEvent::NavigateBack);
                }
            }
            RegistrationFlowEvent::ResetState => {
                info!("Resetting registration flow state");
                next = RegistrationFlowState::default();
                effects.push(RegistrationFlowEvent::ResetState);
            }
            RegistrationFlowEvent::SessionUpdated(session) => {
                next.session_metadata = Some(session);
            }
            RegistrationFlowEvent::E164Chosen(e164) => {
                next.session_e164 = Some(e164);
            }
            RegistrationFlowEvent::Registered(aep) => {
                next.account_entropy_pool = Some(aep);
            }
            RegistrationFlowEvent::MasterKeyRestoredFromSvr(master_key) => {
                next.temporary_master_key = Some(master_key);
            }
            RegistrationFlowEvent::RecoveryPasswordInvalid => {
                next.do_not_attempt_recovery_password = true;
                next.pre_existing_registration_data = None;
            }
        }

        Applied {
            state: next,
            effects,
        }
    }
}
