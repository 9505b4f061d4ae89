/// Deferred work of the scanner core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// One step of the sweep.
    Tick,
    /// Sample read once the gimbal has settled after a move.
    Settle,
    /// Reopen a closed link.
    Reconnect,
}
