// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded submission-attempt history shared by every pipeline of an engine.

use crate::types::{HistorySummary, SubmissionAttempt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Attempts shown in a summary.
const RECENT: usize = 10;

/// Ring of the most recent attempts. Appends take the write lock, so they
/// are serialized; reads may run concurrently.
#[derive(Clone)]
pub struct AttemptHistory {
    entries: Arc<RwLock<VecDeque<SubmissionAttempt>>>,
    capacity: usize,
}

impl AttemptHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Append an attempt, evicting the oldest past capacity.
    pub async fn record(&self, attempt: SubmissionAttempt) {
        let mut entries = self.entries.write().await;
        entries.push_back(attempt);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// All retained attempts, oldest first.
    pub async fn entries(&self) -> Vec<SubmissionAttempt> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn summary(&self) -> HistorySummary {
        let entries = self.entries.read().await;
        let total = entries.len();
        let succeeded = entries.iter().filter(|a| a.success).count();
        let recent = entries
            .iter()
            .skip(total.saturating_sub(RECENT))
            .cloned()
            .collect();
        HistorySummary {
            total,
            recent,
            success_rate: if total == 0 {
                0.0
            } else {
                succeeded as f32 / total as f32
            },
        }
    }
}
