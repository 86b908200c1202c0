use std::{
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    },
    thread,
    time::Duration,
};

use crate::player::{PlayerProbe, ProbeError};

/// Why a probe was started; decides how its result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Periodic poll: only a changed path is adopted.
    Scheduled,
    /// Explicit detection: always reloads, falls back to the cached path.
    Requested,
}

#[derive(Debug)]
pub(crate) struct ProbeReply {
    pub(crate) generation: u64,
    pub(crate) kind: ProbeKind,
    pub(crate) result: Result<PathBuf, ProbeError>,
}

/// Runs probes on short-lived worker threads and collects their replies.
pub(crate) struct ProbeJobs {
    probe: Arc<PlayerProbe>,
    reply_tx: Sender<ProbeReply>,
    reply_rx: Receiver<ProbeReply>,
    generation: u64,
}

impl ProbeJobs {
    pub(crate) fn new(probe: Arc<PlayerProbe>) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel();
        Self {
            probe,
            reply_tx,
            reply_rx,
            generation: 0,
        }
    }

    pub(crate) fn probe(&self) -> &PlayerProbe {
        &self.probe
    }

    pub(crate) fn spawn(&self, kind: ProbeKind) -> std::io::Result<()> {
        let probe = Arc::clone(&self.probe);
        let tx = self.reply_tx.clone();
        let generation = self.generation;
        thread::Builder::new()
            .name("vibetag-probe".into())
            .spawn(move || {
                let result = probe.current_file();
                let _ = tx.send(ProbeReply {
                    generation,
                    kind,
                    result,
                });
            })
            .map(|_| ())
    }

    /// Invalidate every in-flight probe; their replies will be discarded.
    pub(crate) fn cancel_in_flight(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn is_current(&self, reply: &ProbeReply) -> bool {
        reply.generation == self.generation
    }

    pub(crate) fn try_recv(&self) -> Option<ProbeReply> {
        match self.reply_rx.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<ProbeReply> {
        match self.reply_rx.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
