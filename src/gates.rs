//! The three governance gates: integrity, X-108, risk.
//!
//! Every gate is evaluated on every pass and every result is recorded, even
//! when an earlier gate already blocks. Auditability over short-circuiting.

use serde::{Deserialize, Serialize};

use crate::config::RiskThresholds;
use crate::features::FeatureVector;
use crate::simulate::SimulationResult;
use crate::temporal_lock::LockStatus;

pub const GATE_NAMES: [&str; 3] = ["integrity", "x108", "risk"];

/// Decision severity with total order BLOCK > HOLD > ALLOW. The derive
/// ordering follows declaration order, so `max()` picks the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    Hold,
    Block,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Hold => "HOLD",
            Verdict::Block => "BLOCK",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub name: String,
    pub verdict: Verdict,
    pub reason: String,
}

impl GateResult {
    fn new(name: &str, verdict: Verdict, reason: impl Into<String>) -> Self {
        Self { name: name.to_string(), verdict, reason: reason.into() }
    }
}

/// Feature-vector sanity. Raw-input consistency (negative prices,
/// non-monotonic timestamps) is already rejected at series construction,
/// so this gate re-checks the declared feature ranges.
fn integrity_gate(features: &FeatureVector) -> GateResult {
    let checks: [(&str, f64, f64, f64); 4] = [
        ("volatility", features.volatility, 0.0, f64::INFINITY),
        ("coherence", features.coherence, 0.0, 1.0),
        ("friction", features.friction, 0.0, 1.0),
        ("stability", features.stability, 0.0, 1.0),
    ];
    for (field, value, lo, hi) in checks {
        if !value.is_finite() || value < lo || value > hi {
            return GateResult::new(
                "integrity",
                Verdict::Block,
                format!("feature {field}={value} outside declared range [{lo}, {hi}]"),
            );
        }
    }
    GateResult::new("integrity", Verdict::Allow, "all feature fields within declared ranges")
}

/// Defers to the TemporalLock for the final disposition: HOLD while an
/// irreversible action is still inside its tau window, ALLOW otherwise.
fn x108_gate(lock: LockStatus, irreversible: bool, remaining: Option<f64>) -> GateResult {
    if !irreversible {
        return GateResult::new("x108", Verdict::Allow, "reversible action, lock not engaged");
    }
    match lock {
        LockStatus::Holding => {
            let left = remaining.unwrap_or(0.0);
            GateResult::new(
                "x108",
                Verdict::Hold,
                format!("temporal lock holding, {left:.3}s until release"),
            )
        }
        LockStatus::Released => {
            GateResult::new("x108", Verdict::Allow, "temporal lock released, tau elapsed")
        }
        LockStatus::Idle => {
            GateResult::new("x108", Verdict::Allow, "no pending irreversible hold")
        }
    }
}

/// CVaR95 against the configured budget: at or below `block` breaches it,
/// at or below `hold` sits in the cautionary band.
fn risk_gate(simulation: &SimulationResult, thresholds: &RiskThresholds) -> GateResult {
    let cvar = simulation.cvar95;
    if cvar <= thresholds.block {
        GateResult::new(
            "risk",
            Verdict::Block,
            format!("cvar95 {cvar:.4} breaches block budget {:.4}", thresholds.block),
        )
    } else if cvar <= thresholds.hold {
        GateResult::new(
            "risk",
            Verdict::Hold,
            format!("cvar95 {cvar:.4} inside cautionary band (hold {:.4})", thresholds.hold),
        )
    } else {
        GateResult::new(
            "risk",
            Verdict::Allow,
            format!("cvar95 {cvar:.4} within budget (hold {:.4})", thresholds.hold),
        )
    }
}

/// Evaluate all three gates. Order is fixed: integrity, x108, risk.
pub fn evaluate(
    features: &FeatureVector,
    simulation: &SimulationResult,
    lock: LockStatus,
    lock_remaining: Option<f64>,
    irreversible: bool,
    thresholds: &RiskThresholds,
) -> [GateResult; 3] {
    [
        integrity_gate(features),
        x108_gate(lock, irreversible, lock_remaining),
        risk_gate(simulation, thresholds),
    ]
}

/// Maximum-severity verdict across the gate set.
pub fn aggregate_verdict(gates: &[GateResult]) -> Verdict {
    gates.iter().map(|g| g.verdict).max().unwrap_or(Verdict::Block)
}
