//! Sealing and export of the immutable audit record for one governance pass.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{Domain, Mode, RiskThresholds};
use crate::errors::{EngineError, Result};
use crate::features::FeatureVector;
use crate::gates::{GateResult, Verdict, GATE_NAMES};
use crate::policy::Decision;
use crate::simulate::SimulationSummary;

/// Immutable aggregate of everything a pass consumed and produced. Once
/// sealed it is never mutated; a correction means a new run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub seed: u64,
    pub domain: Domain,
    pub mode: Mode,
    pub tau: f64,
    pub horizon: usize,
    pub risk_thresholds: RiskThresholds,
    /// sha256 of the observation series, for input lineage.
    pub input_hash: String,
    pub features: FeatureVector,
    pub simulation: SimulationSummary,
    pub gates: Vec<GateResult>,
    pub decision: Decision,
    pub created_at: String,
}

pub struct SealInput<'a> {
    pub run_id: &'a str,
    pub seed: u64,
    pub domain: Domain,
    pub mode: Mode,
    pub tau: f64,
    pub horizon: usize,
    pub risk_thresholds: RiskThresholds,
    pub input_hash: &'a str,
    pub features: FeatureVector,
    pub simulation: SimulationSummary,
    pub gates: Vec<GateResult>,
    pub decision: Decision,
}

/// Assemble the record. All-or-nothing: any missing piece fails with
/// `IncompleteRun` and nothing is produced.
pub fn seal(input: SealInput<'_>) -> Result<RunRecord> {
    if input.run_id.is_empty() {
        return Err(EngineError::IncompleteRun("run_id is empty".to_string()));
    }
    if input.input_hash.is_empty() {
        return Err(EngineError::IncompleteRun("input_hash is empty".to_string()));
    }
    if input.gates.len() != GATE_NAMES.len() {
        return Err(EngineError::IncompleteRun(format!(
            "expected {} gate results, got {}",
            GATE_NAMES.len(),
            input.gates.len()
        )));
    }
    for (gate, expected) in input.gates.iter().zip(GATE_NAMES.iter()) {
        if gate.name != *expected {
            return Err(EngineError::IncompleteRun(format!(
                "gate '{}' out of place, expected '{expected}'",
                gate.name
            )));
        }
        if gate.reason.is_empty() {
            return Err(EngineError::IncompleteRun(format!("gate '{}' has no reason", gate.name)));
        }
    }
    match (input.decision.final_verdict, &input.decision.intent) {
        (Verdict::Allow, None) => {
            return Err(EngineError::IncompleteRun("ALLOW decision without intent".to_string()));
        }
        (Verdict::Hold | Verdict::Block, Some(_)) => {
            return Err(EngineError::IncompleteRun(format!(
                "{} decision carries an intent",
                input.decision.final_verdict.as_str()
            )));
        }
        _ => {}
    }

    Ok(RunRecord {
        run_id: input.run_id.to_string(),
        seed: input.seed,
        domain: input.domain,
        mode: input.mode,
        tau: input.tau,
        horizon: input.horizon,
        risk_thresholds: input.risk_thresholds,
        input_hash: input.input_hash.to_string(),
        features: input.features,
        simulation: input.simulation,
        gates: input.gates,
        decision: input.decision,
        created_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

impl RunRecord {
    /// Write `<dir>/<run_id>/record.json` via temp file + rename, so no
    /// reader ever sees a partial artifact.
    pub fn export_json(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let run_dir = dir.join(&self.run_id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("create run dir {}", run_dir.display()))?;
        let body = serde_json::to_string_pretty(self).context("serialize run record")?;
        let tmp = run_dir.join("record.json.tmp");
        let path = run_dir.join("record.json");
        fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("rename into {}", path.display()))?;
        Ok(path)
    }
}
