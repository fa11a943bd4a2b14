//! Session Store - Application state of one demo session
//!
//! Holds the prediction history, the batch slot and the current selection.
//! State changes only through typed [`Action`]s; subscribers are notified of
//! every change through a watch channel.

use std::sync::Arc;
use tokio::sync::watch;

use crate::logic::backend::Direction;
use crate::logic::history::{HistoryBuffer, HistoryEntry, PredictionRecord};
use crate::logic::prediction::BatchRun;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BatchSlot {
    pub loading: bool,
    /// Direction of the running or last run
    pub direction: Option<Direction>,
    pub last_run: Option<BatchRun>,
    /// Why the last run could not start
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub direction: Direction,
    pub sample_index: u32,
    pub wesad_subject: Option<u32>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            direction: Direction::WesadToKemocon,
            sample_index: 0,
            wesad_subject: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub history: HistoryBuffer,
    pub batch: BatchSlot,
    pub selection: Selection,
    /// Bumped on every applied action
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub enum Action {
    RecordPrediction(PredictionRecord),
    StartBatch(Direction),
    BatchFinished(BatchRun),
    BatchAborted(String),
    SelectDirection(Direction),
    SelectSample(u32),
    SelectSubject(u32),
    ClearHistory,
}

impl SessionState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::new(history_capacity),
            ..Self::default()
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::RecordPrediction(record) => {
                self.history.push(record);
            }
            Action::StartBatch(direction) => {
                self.batch.loading = true;
                self.batch.direction = Some(direction);
                self.batch.error = None;
            }
            Action::BatchFinished(run) => {
                self.batch.loading = false;
                self.batch.direction = Some(run.direction);
                self.batch.last_run = Some(run);
            }
            Action::BatchAborted(message) => {
                self.batch.loading = false;
                self.batch.error = Some(message);
            }
            Action::SelectDirection(direction) => {
                if self.selection.direction != direction {
                    self.selection.direction = direction;
                    self.selection.sample_index = 0;
                }
            }
            Action::SelectSample(index) => self.selection.sample_index = index,
            Action::SelectSubject(subject_id) => self.selection.wesad_subject = Some(subject_id),
            Action::ClearHistory => self.history.clear(),
        }
        self.revision += 1;
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Shared handle to the session state. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(history_capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(SessionState::new(history_capacity));
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: Action) {
        log::trace!("Session action: {:?}", std::mem::discriminant(&action));
        self.tx.send_modify(|state| state.apply(action));
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Receiver woken on every dispatched action
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Current history, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.tx.borrow().history.entries().cloned().collect()
    }

    pub fn selection(&self) -> Selection {
        self.tx.borrow().selection.clone()
    }

    pub fn is_batch_loading(&self) -> bool {
        self.tx.borrow().batch.loading
    }

    pub fn last_batch(&self) -> Option<BatchRun> {
        self.tx.borrow().batch.last_run.clone()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_HISTORY_CAPACITY)
    }
}
