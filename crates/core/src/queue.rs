// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock queue ordering engine
//!
//! Given a snapshot of the children of a lock node, decides whether a candidate
//! holds the lock and, if not, which earlier candidates block it.

use crate::node::{CandidateName, Role};
use serde::{Deserialize, Serialize};

/// How candidates of a lock node exclude each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Held only by the lowest sequence among all siblings
    Exclusive,
    /// Held while no earlier sibling is a writer
    SharedRead,
    /// Same as exclusive: any earlier sibling blocks
    SharedWrite,
}

impl OrderingPolicy {
    /// Policy for candidates of the given role
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Lock => OrderingPolicy::Exclusive,
            Role::Read => OrderingPolicy::SharedRead,
            Role::Write => OrderingPolicy::SharedWrite,
        }
    }

    /// Whether an earlier sibling blocks a candidate under this policy
    pub fn is_blocked_by(&self, earlier: &CandidateName) -> bool {
        match self {
            OrderingPolicy::Exclusive | OrderingPolicy::SharedWrite => true,
            OrderingPolicy::SharedRead => earlier.role() == Role::Write,
        }
    }
}

/// Result of evaluating one candidate against a snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// The candidate holds the lock
    Acquired,
    /// Earlier candidates block; ascending by sequence, nearest last
    Blocked { blockers: Vec<CandidateName> },
    /// The candidate is not in the snapshot and must be recreated
    Missing,
}

impl Evaluation {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Evaluation::Acquired)
    }

    /// The blocker immediately ahead of the candidate
    pub fn nearest_blocker(&self) -> Option<&CandidateName> {
        match self {
            Evaluation::Blocked { blockers } => blockers.last(),
            _ => None,
        }
    }
}

/// Children of a lock node, ordered by sequence number
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    candidates: Vec<CandidateName>,
}

impl QueueSnapshot {
    /// Build a snapshot from an unordered children listing
    ///
    /// Children that are not candidate names are skipped.
    pub fn from_children<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut candidates: Vec<CandidateName> = children
            .into_iter()
            .filter_map(|child| {
                let child = child.as_ref();
                let parsed = CandidateName::parse(child);
                if parsed.is_none() {
                    tracing::trace!(child, "ignoring non-candidate child");
                }
                parsed
            })
            .collect();
        candidates.sort();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[CandidateName] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Position of a candidate in sequence order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Candidates currently holding the lock
    ///
    /// The head of the queue always holds. Readers following it hold too,
    /// up to the first writer or exclusive candidate.
    pub fn holders(&self) -> Vec<&CandidateName> {
        self.candidates
            .iter()
            .filter(|c| {
                self.evaluate(c.name(), OrderingPolicy::for_role(c.role()))
                    .is_acquired()
            })
            .collect()
    }

    /// Decide whether `own` holds the lock under `policy`
    pub fn evaluate(&self, own: &str, policy: OrderingPolicy) -> Evaluation {
        let Some(position) = self.position(own) else {
            return Evaluation::Missing;
        };

        let blockers: Vec<CandidateName> = self.candidates[..position]
            .iter()
            .filter(|earlier| policy.is_blocked_by(earlier))
            .cloned()
            .collect();

        if blockers.is_empty() {
            Evaluation::Acquired
        } else {
            Evaluation::Blocked { blockers }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
