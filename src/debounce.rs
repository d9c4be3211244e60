/// Debounce gate: hold off a cycle's action for a short window so a burst of
/// change events collapses into one run.
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a cycle waits before starting its command.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The window passed without cancellation; the action may proceed.
    Elapsed,
    /// The token fired first; the action must never run.
    Cancelled,
}

/// Race a `window`-long timer against `token`.
///
/// Cancellation is checked first, so a token that is already signaled
/// always yields `Cancelled`.
pub async fn arm(window: Duration, token: &CancellationToken) -> GateOutcome {
    tokio::select! {
        biased;
        _ = token.cancelled() => GateOutcome::Cancelled,
        _ = tokio::time::sleep(window) => GateOutcome::Elapsed,
    }
}
