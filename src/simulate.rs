//! Seeded Monte-Carlo risk projector.
//!
//! Each path draws a single outcome from a distribution parameterized by the
//! feature vector: volatility sets the scale, coherence sets the drift. Every
//! path gets its own RNG seeded from the run seed and the path index, so the
//! numbers are identical whether paths run sequentially or across threads.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::features::FeatureVector;

pub const DEFAULT_HORIZON: usize = 1000;

/// Drift per unit of coherence above/below the 0.5 midpoint.
const DRIFT_SCALE: f64 = 0.1;

/// splitmix64 increment; spreads consecutive path indices across seed space.
const PATH_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Paths below this count are not worth the thread fan-out.
const PARALLEL_MIN_PATHS: usize = 512;

#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// One scalar outcome per path, in path-index order.
    pub paths: Vec<f64>,
    pub mean_return: f64,
    /// 5th percentile of outcomes (the ceil(0.05*N)-th smallest).
    pub var95: f64,
    /// Mean of the worst ceil(0.05*N) outcomes.
    pub cvar95: f64,
    pub seed: u64,
}

/// Compact form embedded in the RunRecord; raw paths stay out of the audit
/// artifact for size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub mean_return: f64,
    pub var95: f64,
    pub cvar95: f64,
    pub seed: u64,
    pub path_count: usize,
}

impl SimulationResult {
    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            mean_return: self.mean_return,
            var95: self.var95,
            cvar95: self.cvar95,
            seed: self.seed,
            path_count: self.paths.len(),
        }
    }
}

fn sub_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(PATH_SEED_MIX)
}

/// One standard-normal deviate via Box-Muller from the path's own RNG.
fn path_outcome(drift: f64, scale: f64, seed: u64, index: usize) -> f64 {
    let mut rng = StdRng::seed_from_u64(sub_seed(seed, index));
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    drift + scale * z
}

/// Run `horizon` independent paths and aggregate tail statistics.
///
/// Same `(features, seed, horizon)` always reproduces `paths` bit-for-bit.
pub fn simulate(features: &FeatureVector, seed: u64, horizon: usize) -> Result<SimulationResult> {
    if !features.volatility.is_finite() || features.volatility < 0.0 {
        return Err(EngineError::Simulation(format!(
            "volatility must be finite and non-negative, got {}",
            features.volatility
        )));
    }
    if horizon == 0 {
        return Err(EngineError::Simulation("horizon must be > 0".to_string()));
    }

    let drift = (features.coherence - 0.5) * DRIFT_SCALE;
    let scale = features.volatility;

    let workers = num_cpus::get().max(1);
    let paths = if horizon >= PARALLEL_MIN_PATHS && workers > 1 {
        let mut out = vec![0.0f64; horizon];
        let chunk = (horizon + workers - 1) / workers;
        std::thread::scope(|s| {
            for (w, slot) in out.chunks_mut(chunk).enumerate() {
                s.spawn(move || {
                    let base = w * chunk;
                    for (j, cell) in slot.iter_mut().enumerate() {
                        *cell = path_outcome(drift, scale, seed, base + j);
                    }
                });
            }
        });
        out
    } else {
        (0..horizon)
            .map(|i| path_outcome(drift, scale, seed, i))
            .collect()
    };

    let mean_return = paths.iter().sum::<f64>() / horizon as f64;

    let mut sorted = paths.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let k = ((0.05 * horizon as f64).ceil() as usize).clamp(1, horizon);
    let var95 = sorted[k - 1];
    let cvar95 = sorted[..k].iter().sum::<f64>() / k as f64;

    Ok(SimulationResult { paths, mean_return, var95, cvar95, seed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Regime;

    fn features(volatility: f64, coherence: f64) -> FeatureVector {
        FeatureVector {
            volatility,
            coherence,
            regime: Regime::Ranging,
            friction: 0.1,
            stability: 0.5,
        }
    }

    #[test]
    fn test_same_seed_reproduces_bit_for_bit() {
        let f = features(0.2, 0.6);
        let a = simulate(&f, 42, 1000).unwrap();
        let b = simulate(&f, 42, 1000).unwrap();
        assert_eq!(a.paths.len(), b.paths.len());
        for (x, y) in a.paths.iter().zip(b.paths.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(a.cvar95.to_bits(), b.cvar95.to_bits());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let f = features(0.2, 0.6);
        let a = simulate(&f, 1, 500).unwrap();
        let b = simulate(&f, 2, 500).unwrap();
        assert_ne!(a.paths, b.paths);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        // Below and above the fan-out cutoff must agree on shared prefixes
        // because each path depends only on (seed, index).
        let f = features(0.3, 0.4);
        let small = simulate(&f, 7, 100).unwrap();
        let large = simulate(&f, 7, 2000).unwrap();
        for (i, x) in small.paths.iter().enumerate() {
            assert_eq!(x.to_bits(), large.paths[i].to_bits(), "path {i} differs");
        }
    }

    #[test]
    fn test_cvar_is_mean_of_worst_tail() {
        let f = features(0.5, 0.2);
        let r = simulate(&f, 9, 1000).unwrap();
        let mut sorted = r.paths.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let k = 50; // ceil(0.05 * 1000)
        let expect = sorted[..k].iter().sum::<f64>() / k as f64;
        assert!((r.cvar95 - expect).abs() < 1e-12);
        assert!((r.var95 - sorted[k - 1]).abs() < 1e-12);
        assert!(r.cvar95 <= r.var95);
    }

    #[test]
    fn test_cvar_tail_size_rounds_up() {
        let f = features(0.2, 0.5);
        // ceil(0.05 * 30) = 2
        let r = simulate(&f, 3, 30).unwrap();
        let mut sorted = r.paths.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expect = (sorted[0] + sorted[1]) / 2.0;
        assert!((r.cvar95 - expect).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_volatility() {
        let f = features(-0.1, 0.5);
        assert!(matches!(simulate(&f, 1, 100), Err(EngineError::Simulation(_))));
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let f = features(0.1, 0.5);
        assert!(matches!(simulate(&f, 1, 0), Err(EngineError::Simulation(_))));
    }

    #[test]
    fn test_zero_volatility_collapses_to_drift() {
        let f = features(0.0, 0.9);
        let r = simulate(&f, 11, 200).unwrap();
        let drift = (0.9 - 0.5) * 0.1;
        for x in &r.paths {
            assert!((x - drift).abs() < 1e-12);
        }
        assert!((r.cvar95 - drift).abs() < 1e-12);
    }

    #[test]
    fn test_coherent_features_push_mean_up() {
        let lo = simulate(&features(0.1, 0.1), 5, 4000).unwrap();
        let hi = simulate(&features(0.1, 0.9), 5, 4000).unwrap();
        assert!(hi.mean_return > lo.mean_return);
    }
}
