//! Governance decision engine: gated release of autonomous-agent intents.
//!
//! One pass takes an observation series plus a run configuration and yields
//! a sealed, auditable RunRecord: extracted features, a seeded Monte-Carlo
//! risk projection, three gate verdicts (integrity, X-108 temporal lock,
//! risk), and the final ROI-scored decision. The engine emits paper intents
//! only; it never places orders or touches the network.

pub mod config;
pub mod errors;
pub mod features;
pub mod gates;
pub mod logging;
pub mod observation;
pub mod policy;
pub mod recorder;
pub mod runner;
pub mod simulate;
pub mod temporal_lock;

pub use config::{Domain, Mode, RiskThresholds, RunConfig};
pub use errors::{EngineError, Result};
pub use features::{extract, FeatureVector, Regime};
pub use gates::{aggregate_verdict, evaluate, GateResult, Verdict};
pub use observation::{ObservationSeries, Sample};
pub use policy::{decide, Decision, Intent};
pub use recorder::{seal, RunRecord, SealInput};
pub use runner::{wall_now, GovernanceEngine};
pub use simulate::{simulate, SimulationResult, SimulationSummary};
pub use temporal_lock::{LockStatus, TemporalLock};
