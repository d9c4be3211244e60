/// Supervision cycle: one debounced attempt to run the command in response to
/// a change, which may be superseded before or while the command runs.
///
/// State machine:
///
/// ```text
/// Pending --gate cancelled--> Cancelled          (nothing spawned)
/// Pending --gate elapsed----> Started
/// Started --exit first------> Finished           (NaturallyFinished)
/// Started --token first-----> stop, reap, Cancelled (Superseded)
/// ```
use crate::child::{ChildProcess, CommandSpec, SpawnError, StdinPolicy};
use crate::debounce::{self, GateOutcome, DEBOUNCE_WINDOW};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// How a running child is stopped when its cycle is superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// SIGTERM, then wait for the process to exit on its own.
    Graceful,
    /// Kill outright.
    Force,
}

/// What a cycle reports back to the supervisor once nothing of it is left running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The command ran and exited without being asked to.
    NaturallyFinished,
    /// The cycle was cancelled: either nothing was spawned, or the child was
    /// stopped and reaped.
    Superseded,
}

/// Supervisor-side handle to a spawned cycle.
#[derive(Debug)]
pub struct CycleHandle {
    token: CancellationToken,
    completion: oneshot::Receiver<CycleOutcome>,
}

impl CycleHandle {
    /// Signal cancellation. Repeated calls have no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the cycle and wait until its child (if any) has been reaped.
    ///
    /// `None` means the cycle ended without an outcome because the command
    /// failed to spawn; that failure has already been logged.
    pub async fn supersede(self) -> Option<CycleOutcome> {
        self.cancel();
        self.finished().await
    }

    /// Wait for the cycle to end on its own.
    pub async fn finished(self) -> Option<CycleOutcome> {
        self.completion.await.ok()
    }
}

/// The task-side half of a cycle.
pub struct SupervisionCycle {
    spec: Arc<CommandSpec>,
    stop: StopPolicy,
    stdin: StdinPolicy,
    token: CancellationToken,
}

impl SupervisionCycle {
    /// Create a cycle in the `Pending` state and start driving it on the
    /// tokio runtime. The debounce window starts immediately.
    pub fn spawn(spec: Arc<CommandSpec>, stop: StopPolicy, stdin: StdinPolicy) -> CycleHandle {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let cycle = SupervisionCycle {
            spec,
            stop,
            stdin,
            token: token.clone(),
        };

        tokio::spawn(async move {
            match cycle.run().await {
                Ok(outcome) => {
                    // The supervisor may have stopped listening; that is fine.
                    let _ = tx.send(outcome);
                }
                Err(err) => {
                    tracing::error!(error = %err, "command failed to start");
                }
            }
        });

        CycleHandle {
            token,
            completion: rx,
        }
    }

    async fn run(self) -> Result<CycleOutcome, SpawnError> {
        if debounce::arm(DEBOUNCE_WINDOW, &self.token).await == GateOutcome::Cancelled {
            tracing::debug!("cycle cancelled before start");
            return Ok(CycleOutcome::Superseded);
        }

        tracing::info!(command = %self.spec, "starting ..");
        let started = Instant::now();
        let mut child = ChildProcess::start(&self.spec, self.stdin)?;
        let pid = child.pid();

        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                self.stop_child(&mut child);
                child.wait_for_exit().await;
                CycleOutcome::Superseded
            }
            status = child.wait_for_exit() => {
                tracing::debug!(pid, status = ?status, "child exited");
                // A cancel that landed before we report still wins.
                if self.token.is_cancelled() {
                    CycleOutcome::Superseded
                } else {
                    CycleOutcome::NaturallyFinished
                }
            }
        };

        if outcome == CycleOutcome::NaturallyFinished {
            tracing::info!(
                pid,
                duration_ms = started.elapsed().as_millis() as u64,
                ".. finished"
            );
        }
        Ok(outcome)
    }

    fn stop_child(&self, child: &mut ChildProcess) {
        tracing::info!(pid = child.pid(), policy = ?self.stop, "superseded, stopping");
        match self.stop {
            StopPolicy::Graceful => child.request_graceful_stop(),
            StopPolicy::Force => child.force_kill(),
        }
    }
}
