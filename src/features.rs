//! Feature extraction: one fixed, validated vector per observation series.
//! Deterministic — identical input always yields the identical vector.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::observation::ObservationSeries;

/// Volatility above this marks the series as a volatile regime.
pub const VOLATILE_VOL_CUT: f64 = 0.3;
/// Coherence below this flags the series as low-coherence (Unknown regime).
pub const LOW_COHERENCE_CUT: f64 = 0.3;
/// Coherence at or above this reads as a persistent trend.
pub const TRENDING_COHERENCE_CUT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Trending,
    Ranging,
    Volatile,
    Unknown,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Trending => "trending",
            Regime::Ranging => "ranging",
            Regime::Volatile => "volatile",
            Regime::Unknown => "unknown",
        }
    }
}

/// Fixed feature schema. Ranges are declared here and re-checked by the
/// integrity gate: volatility >= 0, the rest in [0,1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureVector {
    pub volatility: f64,
    pub coherence: f64,
    pub regime: Regime,
    pub friction: f64,
    pub stability: f64,
}

impl FeatureVector {
    /// Human-readable one-liner for the audit trail.
    pub fn summary(&self) -> String {
        format!(
            "regime={} vol={:.4} coherence={:.2} friction={:.2} stability={:.2}",
            self.regime.as_str(),
            self.volatility,
            self.coherence,
            self.friction,
            self.stability
        )
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 }
}

fn stddev(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (n as f64 - 1.0);
    var.sqrt()
}

/// Lag-1 autocorrelation of the return series, in [-1, 1].
fn autocorr_lag1(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(returns);
    let denom: f64 = returns.iter().map(|r| (r - m) * (r - m)).sum();
    if denom < 1e-18 {
        return 0.0;
    }
    let num: f64 = returns.windows(2).map(|w| (w[0] - m) * (w[1] - m)).sum();
    (num / denom).clamp(-1.0, 1.0)
}

/// Largest same-sign fraction of returns. 1.0 = every return points the
/// same way, 0.5 = perfectly mixed.
fn trend_consistency(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let pos = returns.iter().filter(|r| **r > 0.0).count() as f64;
    let neg = returns.iter().filter(|r| **r < 0.0).count() as f64;
    (pos.max(neg) / returns.len() as f64).clamp(0.0, 1.0)
}

fn classify_regime(volatility: f64, coherence: f64) -> Regime {
    if volatility > VOLATILE_VOL_CUT {
        Regime::Volatile
    } else if coherence >= TRENDING_COHERENCE_CUT {
        Regime::Trending
    } else if coherence >= LOW_COHERENCE_CUT {
        Regime::Ranging
    } else {
        Regime::Unknown
    }
}

/// Compute the feature vector for a series.
///
/// Fails with `InsufficientData` when the series holds fewer than 2 samples
/// (no return can be formed).
pub fn extract(series: &ObservationSeries) -> Result<FeatureVector> {
    if series.len() < 2 {
        return Err(EngineError::InsufficientData { got: series.len(), min: 2 });
    }
    let returns = series.log_returns();

    let volatility = stddev(&returns);

    // Coherence blends serial correlation with directional persistence,
    // both mapped onto [0,1]; monotonic in each input.
    let ac = 0.5 * (autocorr_lag1(&returns) + 1.0);
    let tc = trend_consistency(&returns);
    let coherence = clamp01(0.5 * ac + 0.5 * tc);

    let regime = classify_regime(volatility, coherence);

    // Bounded proxies. Friction reads mean absolute move as turnover
    // pressure; stability falls with volatility and rises with coherence.
    let abs_returns: Vec<f64> = returns.iter().map(|r| r.abs()).collect();
    let friction = clamp01(mean(&abs_returns) * 10.0);
    let stability = clamp01((1.0 - volatility.min(1.0)) * (0.5 + 0.5 * coherence));

    Ok(FeatureVector { volatility, coherence, regime, friction, stability })
}
