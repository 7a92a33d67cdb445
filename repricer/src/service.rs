//! Single-threaded runtime for the phase controller
//!
//! One task owns the controller. It waits on two sources at once: the command channel fed
//! by [`ServiceHandle`] (host notifications, reset, shutdown) and a delay queue holding the
//! controller's deferred tasks. Both are handled one at a time on that task, so the session
//! needs no locking.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::time::DelayQueue;
use tracing::{debug, info, instrument};

use crate::controller::{DeferredTask, PhaseController};
use crate::platforms::{AccessibilityEvent, AccessibilityHost};
use crate::session::{Phase, SessionStatus};
use crate::{AutomationConfig, AutomationError};

#[derive(Debug)]
enum Command {
    Event(AccessibilityEvent),
    Reset,
    Shutdown,
}

/// Cloneable front door to a running [`AutomationService`].
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl ServiceHandle {
    /// Deliver a host notification.
    pub fn notify(&self, event: AccessibilityEvent) -> Result<(), AutomationError> {
        self.send(Command::Event(event))
    }

    /// Drop the current session and return to idle.
    pub fn reset(&self) -> Result<(), AutomationError> {
        self.send(Command::Reset)
    }

    /// Stop the service loop. Pending deferred work is discarded.
    pub fn shutdown(&self) -> Result<(), AutomationError> {
        self.send(Command::Shutdown)
    }

    /// Status published after the most recent stimulus.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Wait until the session reaches `phase`, up to `timeout`.
    pub async fn wait_for_phase(
        &self,
        phase: Phase,
        timeout: Duration,
    ) -> Result<SessionStatus, AutomationError> {
        let mut status = self.status.clone();
        let reached = tokio::time::timeout(timeout, status.wait_for(|s| s.phase == phase)).await;
        match reached {
            Ok(Ok(current)) => Ok(current.clone()),
            Ok(Err(_)) => Err(AutomationError::ServiceStopped),
            Err(_) => Err(AutomationError::Timeout(format!(
                "phase {phase} not reached within {timeout:?}, last status {:?}",
                self.status()
            ))),
        }
    }

    fn send(&self, command: Command) -> Result<(), AutomationError> {
        self.commands
            .send(command)
            .map_err(|_| AutomationError::ServiceStopped)
    }
}

pub struct AutomationService {
    controller: PhaseController,
    commands: mpsc::UnboundedReceiver<Command>,
    queue: DelayQueue<DeferredTask>,
    status: watch::Sender<SessionStatus>,
}

impl AutomationService {
    pub fn new(
        host: Arc<dyn AccessibilityHost>,
        config: AutomationConfig,
    ) -> Result<(Self, ServiceHandle), AutomationError> {
        let controller = PhaseController::new(host, config, Instant::now())?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(controller.session().status());
        let service = Self {
            controller,
            commands: command_rx,
            queue: DelayQueue::new(),
            status: status_tx,
        };
        let handle = ServiceHandle {
            commands: command_tx,
            status: status_rx,
        };
        Ok((service, handle))
    }

    /// Start the service on the current tokio runtime.
    pub fn spawn(
        host: Arc<dyn AccessibilityHost>,
        config: AutomationConfig,
    ) -> Result<(ServiceHandle, JoinHandle<()>), AutomationError> {
        let (service, handle) = Self::new(host, config)?;
        let join = tokio::spawn(service.run());
        Ok((handle, join))
    }

    #[instrument(name = "automation_service", skip(self))]
    pub async fn run(mut self) {
        info!(
            package = %self.controller.config().target_package,
            "automation service started"
        );
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Event(event)) => {
                        self.controller.on_event(&event, Instant::now());
                    }
                    Some(Command::Reset) => {
                        self.queue.clear();
                        self.controller.reset(Instant::now());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(expired) = self.queue.next(), if !self.queue.is_empty() => {
                    self.controller.on_deferred(expired.into_inner(), Instant::now());
                }
            }
            self.flush();
        }
        info!(status = ?self.controller.session().status(), "automation service stopped");
    }

    /// Move newly scheduled work into the delay queue and publish the session status.
    fn flush(&mut self) {
        for (delay, task) in self.controller.take_scheduled() {
            debug!(?delay, ?task, "queueing deferred task");
            self.queue.insert(task, delay);
        }
        let status = self.controller.session().status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
