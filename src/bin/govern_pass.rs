//! Run one governance pass over a CSV price series and export the audit
//! record.
//!
//! Usage:
//!   govern_pass <prices.csv> [--irreversible]
//!
//! Configuration comes from the environment (DOMAIN, MODE, SEED, TAU,
//! HORIZON, RISK_BLOCK, RISK_HOLD, TRACES_DIR). The sealed record lands in
//! TRACES_DIR/<run_id>/record.json and is printed to stdout.

use std::path::Path;

use anyhow::{bail, Context, Result};

use obsidia_engine::{GovernanceEngine, ObservationSeries, RunConfig};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut csv_path: Option<&str> = None;
    let mut irreversible = false;
    for arg in &args {
        match arg.as_str() {
            "--irreversible" => irreversible = true,
            "--help" => {
                eprintln!("usage: govern_pass <prices.csv> [--irreversible]");
                return Ok(());
            }
            path => csv_path = Some(path),
        }
    }
    let Some(csv_path) = csv_path else {
        bail!("usage: govern_pass <prices.csv> [--irreversible]");
    };

    let cfg = RunConfig::from_env();
    cfg.validate().context("run configuration")?;
    let traces_dir = cfg.traces_dir.clone();

    let text = std::fs::read_to_string(csv_path)
        .with_context(|| format!("read {csv_path}"))?;
    let series = ObservationSeries::from_csv(&text).context("parse observation series")?;

    let engine = GovernanceEngine::new(cfg)?;
    let record = engine.run_pass_wall(&series, irreversible)?;
    let artifact = record.export_json(Path::new(&traces_dir))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    eprintln!(
        "verdict={} roi_score={:.4} artifact={}",
        record.decision.final_verdict.as_str(),
        record.decision.roi_score,
        artifact.display()
    );
    Ok(())
}
