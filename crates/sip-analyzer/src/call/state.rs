//! The call state machine: a pure function over `(state, event)` (§4.6).

/// Lifecycle state of a SIP dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    CallSetup,
    InCall,
    Completed,
    Cancelled,
    Rejected,
    Busy,
    Diverted,
}

impl CallState {
    /// Terminal states are sticky: once reached, no further event moves
    /// the call out of them (spec.md §4.6, "any final / any / sticky").
    pub fn is_final(self) -> bool {
        !matches!(self, CallState::CallSetup | CallState::InCall)
    }
}

/// The classified shape of an observed SIP message, independent of
/// which [`crate::call::Call`] it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    Invite,
    Provisional,
    FinalSuccess,
    Redirect,
    BusyOrDecline,
    OtherFailure,
    Cancel,
    Bye,
}

impl CallEvent {
    /// Classify a SIP message into the event categories the state
    /// machine understands, from its method (for requests) or status
    /// code (for responses).
    pub fn classify(method: Option<&str>, status_code: Option<u16>) -> Option<CallEvent> {
        if let Some(method) = method {
            return match method.to_ascii_uppercase().as_str() {
                "INVITE" => Some(CallEvent::Invite),
                "CANCEL" => Some(CallEvent::Cancel),
                "BYE" => Some(CallEvent::Bye),
                _ => None,
            };
        }
        let code = status_code?;
        Some(match code {
            100..=199 => CallEvent::Provisional,
            200..=299 => CallEvent::FinalSuccess,
            300..=399 => CallEvent::Redirect,
            486 | 600 => CallEvent::BusyOrDecline,
            400..=699 => CallEvent::OtherFailure,
            _ => return None,
        })
    }
}

/// Apply one event to the current state, per spec.md §4.6's transition
/// table. Kept as a single `match` rather than a trait-object FSM: the
/// table is small and finite, and spec.md gives its exact transitions.
pub fn transition(current: Option<CallState>, event: CallEvent) -> Option<CallState> {
    use CallEvent::*;
    use CallState::*;

    match (current, event) {
        (None, Invite) => Some(CallSetup),

        (Some(state), _) if state.is_final() => Some(state),

        (Some(CallSetup), Provisional) => Some(CallSetup),
        (Some(CallSetup), FinalSuccess) => Some(InCall),
        (Some(CallSetup), Redirect) => Some(Diverted),
        (Some(CallSetup), BusyOrDecline) => Some(Busy),
        (Some(CallSetup), OtherFailure) => Some(Rejected),
        (Some(CallSetup), Cancel) => Some(Cancelled),

        (Some(InCall), Bye) => Some(Completed),
        (Some(InCall), FinalSuccess) => Some(InCall),

        (Some(state), _) => Some(state),
        (None, _) => None,
    }
}
