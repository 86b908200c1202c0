//! Runs a [`Reconciler`] on a dedicated thread with a fixed poll schedule.

use std::{
    io,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    player::{ControlCommand, PlayerControl},
    tags::TagCatalog,
};

use super::{Reconciler, SessionEvent};

/// Upper bound on how long the loop sleeps between checks.
const LOOP_GRANULARITY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    DetectNow,
    /// Make a user-chosen file active without asking the player.
    Open(PathBuf),
    Toggle(String),
    Control(ControlCommand),
    SetAutoRefresh(bool),
    SetCatalog(TagCatalog),
    Snapshot,
    Shutdown,
}

/// Owner side of a running session.
pub struct SessionHandle {
    commands: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Session thread already stopped");
        }
    }

    pub fn detect_now(&self) {
        self.send(SessionCommand::DetectNow);
    }

    pub fn open(&self, path: impl Into<PathBuf>) {
        self.send(SessionCommand::Open(path.into()));
    }

    pub fn toggle(&self, name: impl Into<String>) {
        self.send(SessionCommand::Toggle(name.into()));
    }

    pub fn control(&self, command: ControlCommand) {
        self.send(SessionCommand::Control(command));
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Stop the loop and wait for the thread. In-flight probes are abandoned.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        let _ = self.commands.send(SessionCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Session thread panicked");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the session thread. A detection runs immediately, then polls
/// follow every `interval`.
pub fn spawn_session(
    reconciler: Reconciler,
    control: Option<PlayerControl>,
    interval: Duration,
) -> io::Result<SessionHandle> {
    let (command_tx, command_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let loop_cancel = Arc::clone(&cancel);
    let thread = thread::Builder::new()
        .name("vibetag-session".into())
        .spawn(move || {
            SessionLoop {
                reconciler,
                control,
                interval,
                commands: command_rx,
                events: event_tx,
                cancel: loop_cancel,
            }
            .run()
        })?;
    Ok(SessionHandle {
        commands: command_tx,
        events: event_rx,
        cancel,
        thread: Some(thread),
    })
}

struct SessionLoop {
    reconciler: Reconciler,
    control: Option<PlayerControl>,
    interval: Duration,
    commands: Receiver<SessionCommand>,
    events: Sender<SessionEvent>,
    cancel: Arc<AtomicBool>,
}

impl SessionLoop {
    fn run(mut self) {
        tracing::info!(
            "Session started; polling every {} ms",
            self.interval.as_millis()
        );
        self.reconciler.request_detection();
        let mut next_tick = Instant::now() + self.interval;
        while !self.cancel.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next_tick {
                self.reconciler.tick();
                next_tick = now + self.interval;
            }
            let wait = next_tick
                .saturating_duration_since(Instant::now())
                .min(LOOP_GRANULARITY);
            match self.commands.recv_timeout(wait) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                    while let Ok(command) = self.commands.try_recv() {
                        if !self.handle(command) {
                            self.cancel.store(true, Ordering::Relaxed);
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            self.reconciler.pump();
            self.publish();
        }
        self.reconciler.cancel();
        tracing::info!("Session stopped");
    }

    /// Returns false when the loop should exit.
    fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::DetectNow => {
                self.reconciler.request_detection();
            }
            SessionCommand::Open(path) => {
                self.reconciler.select_file(path);
            }
            SessionCommand::Toggle(name) => {
                let outcome = self.reconciler.toggle(&name);
                tracing::debug!("Toggle {name}: {outcome:?}");
            }
            SessionCommand::Control(command) => match &self.control {
                Some(control) => control.send(command),
                None => tracing::debug!("No player control configured; ignoring {command:?}"),
            },
            SessionCommand::SetAutoRefresh(enabled) => {
                self.reconciler.set_auto_refresh(enabled);
            }
            SessionCommand::SetCatalog(catalog) => {
                self.reconciler.set_catalog(catalog);
            }
            SessionCommand::Snapshot => {
                let snapshot = self.reconciler.snapshot();
                let _ = self.events.send(SessionEvent::Snapshot(snapshot));
            }
            SessionCommand::Shutdown => return false,
        }
        self.publish();
        true
    }

    fn publish(&mut self) {
        for event in self.reconciler.drain_events() {
            if self.events.send(event).is_err() {
                break;
            }
        }
    }
}
