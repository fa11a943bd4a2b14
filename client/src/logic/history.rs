//! Prediction History - Recent single predictions
//!
//! Bounded newest-first buffer fed by both prediction flows. Batch runs never
//! write here. Entries pushed past capacity are dropped from the tail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::logic::backend::{PredictionResult, WesadPrediction};

// ============================================================================
// ENTRIES
// ============================================================================

/// Flow that produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    CrossDataset,
    Wesad,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::CrossDataset => "cross_dataset",
            PredictionSource::Wesad => "wesad",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionRecord {
    CrossDataset(PredictionResult),
    Wesad {
        subject_id: u32,
        sample_index: u32,
        prediction: WesadPrediction,
    },
}

impl PredictionRecord {
    pub fn source(&self) -> PredictionSource {
        match self {
            PredictionRecord::CrossDataset(_) => PredictionSource::CrossDataset,
            PredictionRecord::Wesad { .. } => PredictionSource::Wesad,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Monotonic per buffer, survives eviction and `clear`
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub source: PredictionSource,
    pub record: PredictionRecord,
}

impl HistoryEntry {
    /// Age of the entry as shown next to it, e.g. "just now" or "3m ago"
    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        relative_label(now.signed_duration_since(self.recorded_at))
    }
}

fn relative_label(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        0..=9 => "just now".to_string(),
        10..=59 => format!("{}s ago", secs),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl HistoryBuffer {
    /// Buffer holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Record a prediction made now
    pub fn push(&mut self, record: PredictionRecord) -> &HistoryEntry {
        self.push_at(record, Utc::now())
    }

    pub fn push_at(&mut self, record: PredictionRecord, recorded_at: DateTime<Utc>) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            sequence: self.next_sequence,
            recorded_at,
            source: record.source(),
            record,
        };
        self.next_sequence += 1;

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    /// Newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_HISTORY_CAPACITY)
    }
}
