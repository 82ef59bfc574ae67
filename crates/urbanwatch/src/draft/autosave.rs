//! Debounced draft persistence.
//!
//! The form calls [`DraftAutosave::edit`] on every keystroke. A background task
//! holds the latest snapshot and writes it once the form has been quiet for the
//! debounce period, so a burst of edits costs one write.
//!
//! ```text
//!          edit with data
//!   Empty ◀──────────────▶ Dirty
//!     │    edit without     │
//!     │        data         │
//!     └── discard / commit ─┴──▶ Closed (terminal)
//! ```
//!
//! The state follows the latest snapshot, whether or not it has been written
//! yet. A snapshot with no draft data clears the key instead of writing an
//! empty draft. Dropping the handle flushes whatever is pending.

use super::{has_any_draft_data, Draft, DraftStore};
use crate::error::{Result, UrbanError};
use crate::store::KvBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(650);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// The latest snapshot holds no draft data.
    Empty,
    /// The latest snapshot holds draft data.
    Dirty,
    /// Discarded or committed. No further edits are accepted.
    Closed,
}

enum Command {
    Edit(Draft),
    Flush(oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

pub struct DraftAutosave {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<DraftState>,
    worker: JoinHandle<()>,
}

impl DraftAutosave {
    /// Spawns the autosave task. Must be called inside a tokio runtime.
    pub fn start<B: KvBackend + 'static>(store: Arc<DraftStore<B>>, debounce: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(DraftState::Empty);
        let worker = tokio::spawn(run(store, debounce, rx, state_tx));
        Self {
            commands,
            state,
            worker,
        }
    }

    pub fn state(&self) -> DraftState {
        *self.state.borrow()
    }

    /// Replaces the pending snapshot and restarts the quiet period.
    pub fn edit(&self, draft: Draft) -> Result<()> {
        if self.state() == DraftState::Closed {
            return Err(UrbanError::DraftClosed);
        }
        self.commands
            .send(Command::Edit(draft))
            .map_err(|_| UrbanError::DraftClosed)
    }

    /// Writes the pending snapshot now, if there is one.
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Flush(ack))
            .map_err(|_| UrbanError::DraftClosed)?;
        done.await.map_err(|_| UrbanError::DraftClosed)?
    }

    /// Drops the pending snapshot, clears the saved draft and closes the session.
    pub async fn discard(&self) -> Result<()> {
        self.close().await
    }

    /// Same as [`discard`](Self::discard), called once the draft has been saved
    /// as a report.
    pub async fn commit(&self) -> Result<()> {
        self.close().await
    }

    async fn close(&self) -> Result<()> {
        if self.state() == DraftState::Closed {
            return Ok(());
        }
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Close(ack))
            .map_err(|_| UrbanError::DraftClosed)?;
        done.await.map_err(|_| UrbanError::DraftClosed)?
    }

    /// Closes the channel and waits for the worker to write anything pending.
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);
        if let Err(e) = worker.await {
            warn!(error = %e, "draft autosave task failed");
        }
    }
}

async fn run<B: KvBackend>(
    store: Arc<DraftStore<B>>,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<DraftState>,
) {
    let mut pending: Option<Draft> = None;

    loop {
        let command = if pending.is_some() {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    if let Some(draft) = pending.take() {
                        if let Err(e) = persist(&store, &draft).await {
                            warn!(error = %e, "draft autosave failed");
                        }
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Edit(draft)) => {
                let next = if has_any_draft_data(&draft) {
                    DraftState::Dirty
                } else {
                    DraftState::Empty
                };
                pending = Some(draft);
                state.send_replace(next);
            }
            Some(Command::Flush(ack)) => {
                let result = match pending.take() {
                    Some(draft) => persist(&store, &draft).await,
                    None => Ok(()),
                };
                let _ = ack.send(result);
            }
            Some(Command::Close(ack)) => {
                pending = None;
                state.send_replace(DraftState::Closed);
                let _ = ack.send(store.clear().await);
                debug!("draft session closed");
                break;
            }
            None => {
                if let Some(draft) = pending.take() {
                    if let Err(e) = persist(&store, &draft).await {
                        warn!(error = %e, "final draft write failed");
                    }
                }
                break;
            }
        }
    }
}

async fn persist<B: KvBackend>(store: &DraftStore<B>, draft: &Draft) -> Result<()> {
    if has_any_draft_data(draft) {
        store.save(draft).await
    } else {
        store.clear().await
    }
}
