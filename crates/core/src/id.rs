// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token generation for candidate names
//!
//! Every candidate name embeds a token unique to its creation attempt, so a
//! client can find the node it created when the create acknowledgement was
//! lost. Tokens never contain `-`, which separates name segments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique candidate tokens
pub trait TokenGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based token generator for production use
#[derive(Clone, Debug, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Sequential token generator for testing
#[derive(Clone, Debug)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().replace('-', ""),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("t")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
