// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What an acquirer does to the candidates ahead of it

use serde::{Deserialize, Serialize};

/// Revocation behavior while waiting for a lock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevokeMode {
    /// Wait in line without touching other candidates
    #[default]
    None,
    /// Ask every blocker to release by writing `unlock` to its node, then wait
    Gentle,
    /// Delete every blocker outright and retry without waiting
    Immediate,
}

impl RevokeMode {
    pub fn is_revoking(&self) -> bool {
        !matches!(self, RevokeMode::None)
    }
}

impl From<bool> for RevokeMode {
    fn from(revoke: bool) -> Self {
        if revoke {
            RevokeMode::Gentle
        } else {
            RevokeMode::None
        }
    }
}
