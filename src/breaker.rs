//! Per-batch failure latches for the two remote registries.
//!
//! A breaker starts closed and opens on the first transport failure. It
//! never closes again; a new batch gets new breakers.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceState {
    Closed,
    Open,
}

#[derive(Debug)]
pub struct Breaker {
    source: &'static str,
    open: AtomicBool,
}

impl Breaker {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            open: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn tripped(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SourceState {
        if self.tripped() {
            SourceState::Open
        } else {
            SourceState::Closed
        }
    }

    /// Opens the breaker. Returns true only for the call that made the
    /// transition; tripping an open breaker changes nothing.
    pub fn trip(&self) -> bool {
        self.open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// The identity and enrollment breakers of one batch.
#[derive(Debug)]
pub struct Breakers {
    pub identity: Breaker,
    pub enrollment: Breaker,
}

impl Breakers {
    pub fn new() -> Self {
        Self {
            identity: Breaker::new("identity"),
            enrollment: Breaker::new("enrollment"),
        }
    }
}

impl Default for Breakers {
    fn default() -> Self {
        Self::new()
    }
}
