//! Call lifecycle: dialog storage ([`Call`]), its state machine
//! ([`state`]), and ad-hoc groupings ([`CallGroup`]) (§3, §4.6, §4.7).

mod call;
mod group;
pub mod state;

pub use call::Call;
pub use group::CallGroup;
pub use state::{transition, CallEvent, CallState};
