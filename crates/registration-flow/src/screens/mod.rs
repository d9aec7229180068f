//! Per-screen flows: the async decision trees behind each route.
//!
//! Each flow applies a screen event against screen state, emitting
//! intermediate state snapshots (spinner on/off, one-time events) through a
//! state emitter and flow-level consequences through an event emitter. The
//! emitters are plain callbacks so hosts can pipe them into whatever
//! reactive machinery they run; tests collect them into vectors.

pub mod country_code;
pub mod phone_number;
pub mod pin_create;
pub mod pin_entry;
pub mod verification_code;

use crate::event::RegistrationFlowEvent;

/// Sink for successive screen-state snapshots.
pub type StateEmitter<'a, S> = &'a mut (dyn FnMut(S) + Send);

/// Sink for flow-level events consumed by the reducer and the host.
pub type EventEmitter<'a> = &'a mut (dyn FnMut(RegistrationFlowEvent) + Send);
