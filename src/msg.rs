use crossterm::event::KeyEvent;

use crate::maintenance::{MaintenanceError, Outcome, Progress};

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Background action
    JobProgress(Progress),
    JobFinished(Result<Outcome, MaintenanceError>),

    // -- System
    Tick,
}
