//! Background writer for fire-and-forget persistence.

use super::codec;
use crate::error::Result;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Requests handled by the writer thread, in submission order.
enum WriteRequest {
    /// Replace the backing file with these encoded bytes.
    Write(Vec<u8>),
    /// Signal once everything submitted before this has been handled.
    Flush(Sender<()>),
    /// Finish pending work and exit.
    Shutdown,
}

/// Owns the writer thread for one backing file.
pub(crate) struct PersistWriter {
    path: PathBuf,
    sender: Sender<WriteRequest>,
    handle: Option<JoinHandle<()>>,
    failures: Arc<AtomicU64>,
}

impl PersistWriter {
    /// Start a writer for `path`.
    pub fn spawn(name: &str, path: PathBuf) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let failures = Arc::new(AtomicU64::new(0));

        let thread_path = path.clone();
        let thread_failures = Arc::clone(&failures);
        let handle = thread::Builder::new()
            .name(format!("persist-{}", name))
            .spawn(move || run(thread_path, receiver, thread_failures))?;

        Ok(Self {
            path,
            sender,
            handle: Some(handle),
            failures,
        })
    }

    /// Queue a snapshot. Never blocks on I/O.
    pub fn submit(&self, bytes: Vec<u8>) {
        if self.sender.send(WriteRequest::Write(bytes)).is_err() {
            self.failures.fetch_add(1, Ordering::SeqCst);
            error!(path = ?self.path, "Persistence writer is gone, snapshot dropped");
        }
    }

    /// Block until every snapshot submitted so far is written or has failed.
    pub fn flush(&self) {
        let (ack, done) = bounded(1);
        if self.sender.send(WriteRequest::Flush(ack)).is_err() {
            return;
        }
        let _ = done.recv();
    }

    /// Number of snapshots that failed to reach disk.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Drop for PersistWriter {
    fn drop(&mut self) {
        let _ = self.sender.send(WriteRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(path = ?self.path, "Persistence writer panicked");
            }
        }
    }
}

/// Writer loop. Drains whatever is queued and writes only the newest snapshot.
fn run(path: PathBuf, receiver: Receiver<WriteRequest>, failures: Arc<AtomicU64>) {
    while let Ok(first) = receiver.recv() {
        let mut latest = None;
        let mut acks = Vec::new();
        let mut shutdown = false;
        let mut coalesced = 0usize;

        for request in std::iter::once(first).chain(receiver.try_iter()) {
            match request {
                WriteRequest::Write(bytes) => {
                    if latest.replace(bytes).is_some() {
                        coalesced += 1;
                    }
                }
                WriteRequest::Flush(ack) => acks.push(ack),
                WriteRequest::Shutdown => shutdown = true,
            }
        }

        if let Some(bytes) = latest {
            match codec::write_file(&path, &bytes) {
                Ok(()) => debug!(path = ?path, bytes = bytes.len(), coalesced, "Snapshot written"),
                Err(e) => {
                    failures.fetch_add(1, Ordering::SeqCst);
                    error!(path = ?path, error = %e, "Failed to persist snapshot");
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }

        if shutdown {
            break;
        }
    }
}
