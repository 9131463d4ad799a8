//! Run-scoped orchestration of one governance pass.
//!
//! The pipeline is strictly sequential: extract -> simulate -> lock
//! transition -> gates -> decide -> seal. Each stage consumes the complete
//! output of the previous one, and the pass either yields a sealed
//! RunRecord or fails atomically.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config::{Mode, RunConfig};
use crate::errors::Result;
use crate::features;
use crate::gates::{self, Verdict};
use crate::logging::{log, obj, v_num, v_str, Level, LogDomain};
use crate::observation::ObservationSeries;
use crate::policy;
use crate::recorder::{seal, RunRecord, SealInput};
use crate::simulate;
use crate::temporal_lock::{LockStatus, TemporalLock};

/// One engine instance per logical run stream. The temporal lock inside is
/// run-scoped and behind a mutex: one writer advances its transitions at a
/// time, and concurrent streams each get their own engine.
pub struct GovernanceEngine {
    cfg: RunConfig,
    lock: Mutex<TemporalLock>,
}

/// Wall-clock seconds since the epoch, for callers running in real time.
pub fn wall_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn generate_run_id(seed: u64, input_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Utc::now().timestamp_millis().to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(seed.to_le_bytes());
    hasher.update(input_hash.as_bytes());
    hex::encode(hasher.finalize())[..12].to_string()
}

impl GovernanceEngine {
    pub fn new(cfg: RunConfig) -> Result<Self> {
        cfg.validate()?;
        let lock = TemporalLock::new(cfg.tau)?;
        log(
            Level::Info,
            LogDomain::System,
            "engine.start",
            obj(&[
                ("domain", v_str(cfg.domain.as_str())),
                ("tau", v_num(cfg.tau)),
                ("horizon", v_num(cfg.horizon as f64)),
            ]),
        );
        Ok(Self { cfg, lock: Mutex::new(lock) })
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn lock_status(&self) -> LockStatus {
        self.lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status()
    }

    /// Seed for this pass: Proof replays the configured seed, Free draws a
    /// fresh one from OS entropy (and the record keeps it).
    fn effective_seed(&self) -> u64 {
        match self.cfg.mode {
            Mode::Proof => self.cfg.seed,
            Mode::Free => rand::thread_rng().gen(),
        }
    }

    /// Run one governance pass at caller-supplied time `now` (seconds;
    /// wall-clock or simulated — the lock only sees the number).
    pub fn run_pass(
        &self,
        series: &ObservationSeries,
        irreversible: bool,
        now: f64,
    ) -> Result<RunRecord> {
        let seed = self.effective_seed();
        let run_id = generate_run_id(seed, series.input_hash());

        let feats = features::extract(series)?;
        log(
            Level::Info,
            LogDomain::Observation,
            "features.extracted",
            obj(&[
                ("run_id", v_str(&run_id)),
                ("samples", v_num(series.len() as f64)),
                ("summary", v_str(&feats.summary())),
            ]),
        );

        let sim = simulate::simulate(&feats, seed, self.cfg.horizon)?;
        log(
            Level::Info,
            LogDomain::Simulation,
            "simulation.done",
            obj(&[
                ("run_id", v_str(&run_id)),
                ("seed", v_num(seed as f64)),
                ("mean_return", v_num(sim.mean_return)),
                ("cvar95", v_num(sim.cvar95)),
            ]),
        );

        // Lock transitions and the post-decision consume happen under one
        // guard: the single-writer region for this pass.
        let mut lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if irreversible {
            lock.request_irreversible(now);
        }
        let status = lock.tick(now);
        let remaining = lock.remaining(now);
        log(
            Level::Debug,
            LogDomain::Lock,
            "lock.tick",
            obj(&[
                ("run_id", v_str(&run_id)),
                ("status", v_str(status.as_str())),
                ("remaining", v_num(remaining.unwrap_or(0.0))),
            ]),
        );

        let gate_results = gates::evaluate(
            &feats,
            &sim,
            status,
            remaining,
            irreversible,
            &self.cfg.risk_thresholds,
        );
        let decision = policy::decide(&gate_results, &sim, &feats, &self.cfg);

        if decision.final_verdict == Verdict::Allow && irreversible {
            // One-shot: the released lock is spent by this ALLOW.
            lock.consume();
        }
        drop(lock);

        log(
            Level::Info,
            LogDomain::Governance,
            "decision.final",
            obj(&[
                ("run_id", v_str(&run_id)),
                ("verdict", v_str(decision.final_verdict.as_str())),
                ("roi_score", v_num(decision.roi_score)),
            ]),
        );

        let record = seal(SealInput {
            run_id: &run_id,
            seed,
            domain: self.cfg.domain,
            mode: self.cfg.mode,
            tau: self.cfg.tau,
            horizon: self.cfg.horizon,
            risk_thresholds: self.cfg.risk_thresholds,
            input_hash: series.input_hash(),
            features: feats,
            simulation: sim.summary(),
            gates: gate_results.to_vec(),
            decision,
        })?;

        log(
            Level::Info,
            LogDomain::Audit,
            "record.sealed",
            obj(&[("run_id", v_str(&record.run_id)), ("created_at", v_str(&record.created_at))]),
        );
        Ok(record)
    }

    /// `run_pass` against the wall clock.
    pub fn run_pass_wall(&self, series: &ObservationSeries, irreversible: bool) -> Result<RunRecord> {
        self.run_pass(series, irreversible, wall_now())
    }
}
