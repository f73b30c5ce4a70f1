//! Save Queue
//!
//! Write-through persistence for one editing session. Mutations enqueue a
//! snapshot and return immediately; a single background task writes them in
//! order, so at most one save per session is in flight. Snapshots that pile up
//! while a save is running collapse into the newest one.
//!
//! Failures are logged and abandoned. The in-memory state stays authoritative.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::Form;
use crate::repository::FormGateway;

/// Whether every enqueued snapshot has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Clean,
    Dirty,
}

struct SaveRequest {
    generation: u64,
    form: Form,
    /// Let the current update cycle finish before writing
    deferred: bool,
}

pub struct SaveQueue {
    tx: Option<mpsc::UnboundedSender<SaveRequest>>,
    /// Generation of the last settled request (stored or abandoned)
    settled: watch::Receiver<u64>,
    failures: Arc<AtomicU64>,
    submitted: u64,
    worker: Option<JoinHandle<()>>,
}

impl SaveQueue {
    /// Start the session's writer task. Must be called inside a tokio runtime.
    pub fn spawn(gateway: Arc<dyn FormGateway>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (settled_tx, settled) = watch::channel(0);
        let failures = Arc::new(AtomicU64::new(0));

        let worker = tokio::spawn(run_worker(gateway, rx, settled_tx, Arc::clone(&failures)));

        Self {
            tx: Some(tx),
            settled,
            failures,
            submitted: 0,
            worker: Some(worker),
        }
    }

    /// Write `form` as soon as the writer is free
    pub fn enqueue(&mut self, form: Form) {
        self.push(form, false);
    }

    /// Write `form` after yielding once to the scheduler
    pub fn enqueue_deferred(&mut self, form: Form) {
        self.push(form, true);
    }

    fn push(&mut self, form: Form, deferred: bool) {
        self.submitted += 1;
        let request = SaveRequest {
            generation: self.submitted,
            form,
            deferred,
        };

        let sent = self.tx.as_ref().map(|tx| tx.send(request).is_ok()).unwrap_or(false);
        if !sent {
            log::error!("Save queue is closed, dropping form snapshot {}", self.submitted);
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn state(&self) -> SaveState {
        if *self.settled.borrow() >= self.submitted {
            SaveState::Clean
        } else {
            SaveState::Dirty
        }
    }

    /// Number of snapshots that could not be written
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Wait until everything enqueued so far has been stored or abandoned
    pub async fn flush(&self) {
        let target = self.submitted;
        let mut settled = self.settled.clone();
        // Err means the worker is gone; nothing left to wait for
        let _ = settled.wait_for(|generation| *generation >= target).await;
    }

    /// Flush, stop the writer and wait for it to exit
    pub async fn close(mut self) {
        self.flush().await;
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                log::error!("Save worker ended abnormally: {}", e);
            }
        }
    }
}

async fn run_worker(
    gateway: Arc<dyn FormGateway>,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
    settled: watch::Sender<u64>,
    failures: Arc<AtomicU64>,
) {
    while let Some(mut request) = rx.recv().await {
        if request.deferred {
            tokio::task::yield_now().await;
        }

        // Later snapshot wins over anything still pending
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }

        let SaveRequest { generation, form, .. } = request;
        match gateway.save(&form).await {
            Ok(saved) => log::debug!(
                "Form {} saved for campaign {} ({} fields, snapshot {})",
                saved.id,
                saved.campaign_id,
                saved.fields.len(),
                generation
            ),
            Err(e) => {
                failures.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Error saving form for campaign {} (snapshot {}): {}",
                    form.campaign_id,
                    generation,
                    e
                );
            }
        }

        settled.send_replace(generation);
    }
}
