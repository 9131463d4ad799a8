//! X-108 temporal lock: no irreversible action before tau seconds have
//! elapsed since the hold was raised.
//!
//! The transition function here is the single authority on release. Callers
//! feed `now` in (wall-clock seconds or a simulated counter) and must never
//! infer "released" from elapsed time themselves.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// No pending irreversible action.
    Idle,
    /// An irreversible action was requested; tau has not elapsed.
    Holding,
    /// Tau elapsed; the action may proceed once.
    Released,
}

impl LockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Idle => "idle",
            LockStatus::Holding => "holding",
            LockStatus::Released => "released",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalLock {
    status: LockStatus,
    hold_started_at: Option<f64>,
    tau: f64,
}

impl TemporalLock {
    pub fn new(tau: f64) -> Result<Self> {
        if !tau.is_finite() || tau <= 0.0 {
            return Err(EngineError::InvalidConfig(format!("tau must be > 0, got {tau}")));
        }
        Ok(Self { status: LockStatus::Idle, hold_started_at: None, tau })
    }

    pub fn status(&self) -> LockStatus {
        self.status
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn hold_started_at(&self) -> Option<f64> {
        self.hold_started_at
    }

    /// Register an irreversible-action request. Idle -> Holding; while
    /// Holding or Released the pending hold stands and the original
    /// `hold_started_at` is kept (a re-request never shortens the wait).
    pub fn request_irreversible(&mut self, now: f64) {
        if self.status == LockStatus::Idle {
            self.status = LockStatus::Holding;
            self.hold_started_at = Some(now);
        }
    }

    /// Advance the clock. Holding -> Released once `now - hold_started_at`
    /// reaches tau; Idle and Released are unchanged.
    pub fn tick(&mut self, now: f64) -> LockStatus {
        if self.status == LockStatus::Holding {
            if let Some(start) = self.hold_started_at {
                if now - start >= self.tau {
                    self.status = LockStatus::Released;
                }
            }
        }
        self.status
    }

    /// One-shot reset after the action executes: Released -> Idle. Returns
    /// false (and leaves the state untouched) in any other state.
    pub fn consume(&mut self) -> bool {
        if self.status == LockStatus::Released {
            self.status = LockStatus::Idle;
            self.hold_started_at = None;
            true
        } else {
            false
        }
    }

    /// Seconds still to wait at `now`, zero once releasable. None when no
    /// hold is pending.
    pub fn remaining(&self, now: f64) -> Option<f64> {
        match (self.status, self.hold_started_at) {
            (LockStatus::Holding, Some(start)) => Some((self.tau - (now - start)).max(0.0)),
            _ => None,
        }
    }
}
