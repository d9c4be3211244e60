use crate::child::{CommandSpec, StdinPolicy};
use crate::cycle::{CycleHandle, StopPolicy, SupervisionCycle};
use crate::target::WatchTarget;
use crate::watcher::ChangeEvent;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Operating mode of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the command once per burst of changes anywhere under the watch
    /// root, killing a run that is still going when a new change arrives.
    Invoke,
    /// Keep the command running and restart it whenever the target file
    /// changes.
    Restart,
}

impl Mode {
    pub fn stop_policy(self) -> StopPolicy {
        match self {
            Mode::Invoke => StopPolicy::Force,
            Mode::Restart => StopPolicy::Graceful,
        }
    }

    pub fn stdin_policy(self) -> StdinPolicy {
        match self {
            Mode::Invoke => StdinPolicy::Null,
            Mode::Restart => StdinPolicy::Inherit,
        }
    }
}

/// Consumes change events in order and keeps at most one cycle outstanding.
pub struct Supervisor {
    mode: Mode,
    spec: Arc<CommandSpec>,
    target: WatchTarget,
    current: Option<CycleHandle>,
}

impl Supervisor {
    pub fn new(mode: Mode, spec: CommandSpec, target: WatchTarget) -> Self {
        Self {
            mode,
            spec: Arc::new(spec),
            target,
            current: None,
        }
    }

    /// Whether `event` should trigger a new cycle in the current mode.
    pub fn is_relevant(&self, event: &ChangeEvent) -> bool {
        match self.mode {
            Mode::Restart => event.path == self.target.path(),
            Mode::Invoke => !is_named_after_parent(&event.path),
        }
    }

    /// Restart mode only reacts to events naming the target itself, which
    /// never happens when the target is a directory.
    pub fn restart_target_unreachable(&self) -> bool {
        self.mode == Mode::Restart && !self.target.is_file()
    }

    /// Drive the loop until the event stream ends or `shutdown` fires.
    ///
    /// On stream end the outstanding cycle is allowed to finish; on shutdown
    /// it is superseded so no child outlives the supervisor.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        shutdown: CancellationToken,
    ) {
        if self.restart_target_unreachable() {
            tracing::warn!(
                path = %self.target.path().display(),
                "restart target is a directory; the command will never be restarted"
            );
        }
        if self.mode == Mode::Restart {
            self.launch();
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("shutting down");
                    self.supersede_current().await;
                    return;
                }
                event = events.recv() => event,
            };

            let Some(event) = event else {
                tracing::debug!("change stream closed");
                if let Some(cycle) = self.current.take() {
                    cycle.finished().await;
                }
                return;
            };

            if !self.is_relevant(&event) {
                tracing::trace!(path = %event.path.display(), "ignoring change");
                continue;
            }

            let path = event.path.display();
            match self.mode {
                Mode::Restart => tracing::info!(%path, "------- restarting -------"),
                Mode::Invoke => tracing::debug!(%path, "change detected"),
            }
            self.supersede_current().await;
            self.launch();
        }
    }

    /// Cancel the outstanding cycle, if any, and wait until its child is gone.
    async fn supersede_current(&mut self) {
        if let Some(cycle) = self.current.take() {
            let outcome = cycle.supersede().await;
            tracing::debug!(outcome = ?outcome, "previous cycle done");
        }
    }

    fn launch(&mut self) {
        debug_assert!(self.current.is_none());
        self.current = Some(SupervisionCycle::spawn(
            Arc::clone(&self.spec),
            self.mode.stop_policy(),
            self.mode.stdin_policy(),
        ));
    }
}

/// `dir/name/name`: the shape of a build artifact written next to the
/// sources it was built from, named after their directory.
fn is_named_after_parent(path: &Path) -> bool {
    let name = path.file_name();
    let parent_name = path.parent().and_then(Path::file_name);
    name.is_some() && name == parent_name
}
