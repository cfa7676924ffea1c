// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::TaskName;
use crate::types::OverlapPolicy;

/// Triggers that arrive while a run is already executing.
///
/// Each entry is a batch of task names for one future run. `max_batches`
/// (`queue_length`) bounds how many future runs are remembered; once the
/// bound is reached new triggers are merged into the last batch. With the
/// default of 1 every trigger during a run coalesces into a single next run.
#[derive(Debug)]
pub struct TriggerQueue {
    policy: OverlapPolicy,
    max_batches: usize,
    batches: VecDeque<Vec<TaskName>>,
}

impl TriggerQueue {
    /// `max_batches` is clamped to at least 1.
    pub fn new(policy: OverlapPolicy, max_batches: usize) -> Self {
        Self {
            policy,
            max_batches: max_batches.max(1),
            batches: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Record a batch of tasks triggered while a run is in progress.
    ///
    /// - `Queue`: ignored if every task is already queued; otherwise a new
    ///   batch while below `max_batches`, else merged into the last batch.
    /// - `Replace`: forget everything queued and keep only this batch.
    pub fn record_trigger(&mut self, tasks: &[TaskName]) {
        if tasks.is_empty() {
            return;
        }

        match self.policy {
            OverlapPolicy::Queue => {
                let already_queued = tasks
                    .iter()
                    .all(|t| self.batches.iter().any(|b| b.contains(t)));
                if already_queued {
                    debug!(?tasks, "trigger already queued; ignoring");
                    return;
                }

                if self.batches.len() < self.max_batches {
                    let mut batch = Vec::new();
                    merge_unique(&mut batch, tasks);
                    self.batches.push_back(batch);
                    debug!(?tasks, queued = self.batches.len(), "queued trigger for a later run");
                } else if let Some(last) = self.batches.back_mut() {
                    merge_unique(last, tasks);
                    debug!(?tasks, "queue full; merged trigger into last queued batch");
                }
            }
            OverlapPolicy::Replace => {
                if !self.batches.is_empty() {
                    warn!(
                        dropped = self.batches.len(),
                        "replacing queued triggers with the latest one"
                    );
                }
                self.batches.clear();
                let mut batch = Vec::new();
                merge_unique(&mut batch, tasks);
                self.batches.push_back(batch);
            }
        }
    }

    /// Take the oldest queued batch, if any.
    pub fn next_batch(&mut self) -> Option<Vec<TaskName>> {
        let batch = self.batches.pop_front()?;
        debug!(?batch, remaining = self.batches.len(), "dequeued trigger batch");
        Some(batch)
    }
}

/// Append names not already present, keeping first-seen order.
pub(crate) fn merge_unique(into: &mut Vec<TaskName>, names: &[TaskName]) {
    for name in names {
        if !into.contains(name) {
            into.push(name.clone());
        }
    }
}

