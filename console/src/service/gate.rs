//! Session gate for protected views
//!
//! The gate is a three-state machine driven by session events. Transitions
//! and routing decisions are pure; [`SessionGate`] executes the resulting
//! navigation and never repeats a redirect while its decision is unchanged.

use std::sync::Arc;

use tracing::debug;

use crate::infra::navigation::{Navigator, Route};
use crate::service::session::SessionStatus;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl From<&SessionStatus> for GateState {
    fn from(status: &SessionStatus) -> Self {
        match status {
            SessionStatus::Loading => GateState::Loading,
            SessionStatus::Authenticated(_) => GateState::Authenticated,
            SessionStatus::Unauthenticated => GateState::Unauthenticated,
        }
    }
}

/// Session events observed by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// Session initialization resolved
    Initialized { authenticated: bool },
    /// The stored credential appeared or disappeared
    CredentialChanged { present: bool },
}

/// What a guarded view requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Requires a session; others go to the login route
    Protected,
    /// Login page; signed-in users go to the dashboard
    LoginOnly,
}

/// Outcome of evaluating a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ShowLoading,
    Render,
    Redirect(Route),
}

/// Pure state transition
pub fn transition(state: GateState, event: GateEvent) -> GateState {
    match (state, event) {
        (_, GateEvent::Initialized { authenticated: true }) => GateState::Authenticated,
        (_, GateEvent::Initialized { authenticated: false }) => GateState::Unauthenticated,
        // Credential changes don't end loading; only initialization does
        (GateState::Loading, GateEvent::CredentialChanged { .. }) => GateState::Loading,
        (_, GateEvent::CredentialChanged { present: true }) => GateState::Authenticated,
        (_, GateEvent::CredentialChanged { present: false }) => GateState::Unauthenticated,
    }
}

/// Pure routing decision
pub fn decide(state: GateState, guard: Guard) -> Decision {
    match (state, guard) {
        (GateState::Loading, _) => Decision::ShowLoading,
        (GateState::Unauthenticated, Guard::Protected) => Decision::Redirect(Route::Login),
        (GateState::Authenticated, Guard::LoginOnly) => Decision::Redirect(Route::Dashboard),
        _ => Decision::Render,
    }
}

/// Gate instance bound to one guarded view
pub struct SessionGate {
    guard: Guard,
    state: GateState,
    issued: Option<Route>,
    navigator: Arc<dyn Navigator>,
}

impl SessionGate {
    /// Create a gate in the `Loading` state
    pub fn new(guard: Guard, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            guard,
            state: GateState::Loading,
            issued: None,
            navigator,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Apply a session event and execute the resulting decision
    pub fn handle(&mut self, event: GateEvent) -> Decision {
        self.state = transition(self.state, event);
        self.evaluate()
    }

    /// Adopt the session status directly, e.g. on mount
    pub fn sync(&mut self, status: &SessionStatus) -> Decision {
        self.state = GateState::from(status);
        self.evaluate()
    }

    /// Evaluate the guard against the current state
    ///
    /// Navigation is issued only when the decision changes to a new redirect.
    pub fn evaluate(&mut self) -> Decision {
        let decision = decide(self.state, self.guard);
        match &decision {
            Decision::Redirect(route) => {
                if self.issued.as_ref() != Some(route) {
                    debug!("Session gate redirecting to {}", route.path());
                    self.navigator.navigate(route);
                    self.issued = Some(route.clone());
                }
            }
            Decision::Render | Decision::ShowLoading => self.issued = None,
        }
        decision
    }

    /// Whether the guarded view may load its data
    pub fn allows_render(&self) -> bool {
        decide(self.state, self.guard) == Decision::Render
    }
}
