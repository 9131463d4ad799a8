//! Run configuration. Every knob has an env override and a documented
//! default, so a pass is reproducible from its recorded config alone.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// Application domain the intent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Trading intents (ERC-8004 paper intents).
    Trading,
    BankRobo,
    BlockchainIntents,
    Unified,
}

impl Domain {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trading" => Ok(Domain::Trading),
            "bank-robo" | "bank_robo" => Ok(Domain::BankRobo),
            "blockchain" | "blockchain_intents" | "intents" => Ok(Domain::BlockchainIntents),
            "unified" => Ok(Domain::Unified),
            other => Err(EngineError::InvalidConfig(format!("unknown domain: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Trading => "trading",
            Domain::BankRobo => "bank-robo",
            Domain::BlockchainIntents => "blockchain_intents",
            Domain::Unified => "unified",
        }
    }
}

/// Seeding policy for a pass.
///
/// `Proof` replays the configured seed verbatim. `Free` draws a fresh seed
/// from OS entropy per pass; the drawn seed is recorded, so a Free run is
/// still reproducible from its own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Proof,
    Free,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "proof" => Ok(Mode::Proof),
            "free" => Ok(Mode::Free),
            other => Err(EngineError::InvalidConfig(format!("unknown mode: {other}"))),
        }
    }
}

/// CVaR95 budget for the risk gate. Both bounds are returns (negative =
/// loss); `block` must sit at or below `hold`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub block: f64,
    pub hold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub domain: Domain,
    pub mode: Mode,
    pub seed: u64,
    /// X-108 wait in seconds before an irreversible intent may act.
    pub tau: f64,
    /// Number of Monte-Carlo paths per simulation.
    pub horizon: usize,
    pub risk_thresholds: RiskThresholds,
    /// Directory for per-run audit artifacts.
    pub traces_dir: String,
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self {
            domain: std::env::var("DOMAIN")
                .ok()
                .and_then(|v| Domain::parse(&v).ok())
                .unwrap_or(Domain::Trading),
            mode: std::env::var("MODE")
                .ok()
                .and_then(|v| Mode::parse(&v).ok())
                .unwrap_or(Mode::Proof),
            seed: std::env::var("SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(42),
            tau: std::env::var("TAU").ok().and_then(|v| v.parse().ok()).unwrap_or(10.0),
            horizon: std::env::var("HORIZON").ok().and_then(|v| v.parse().ok()).unwrap_or(1000),
            risk_thresholds: RiskThresholds {
                block: std::env::var("RISK_BLOCK").ok().and_then(|v| v.parse().ok()).unwrap_or(-0.2),
                hold: std::env::var("RISK_HOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(-0.1),
            },
            traces_dir: std::env::var("TRACES_DIR").unwrap_or_else(|_| "traces".to_string()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(EngineError::InvalidConfig(format!("tau must be > 0, got {}", self.tau)));
        }
        if self.horizon == 0 {
            return Err(EngineError::InvalidConfig("horizon must be > 0".to_string()));
        }
        let th = &self.risk_thresholds;
        if !th.block.is_finite() || !th.hold.is_finite() {
            return Err(EngineError::InvalidConfig("risk thresholds must be finite".to_string()));
        }
        if th.block > th.hold {
            return Err(EngineError::InvalidConfig(format!(
                "risk block threshold {} above hold threshold {}",
                th.block, th.hold
            )));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Trading,
            mode: Mode::Proof,
            seed: 42,
            tau: 10.0,
            horizon: 1000,
            risk_thresholds: RiskThresholds { block: -0.2, hold: -0.1 },
            traces_dir: "traces".to_string(),
        }
    }
}
