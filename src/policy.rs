//! Return-on-Intent policy: turns gate results plus simulated risk/return
//! into the final verdict. Gate disposition is a hard ceiling; the score
//! can never upgrade a BLOCK or a pending HOLD.

use serde::{Deserialize, Serialize};

use crate::config::{Domain, RunConfig};
use crate::features::FeatureVector;
use crate::gates::{aggregate_verdict, GateResult, Verdict};
use crate::simulate::SimulationResult;

/// Guard against division blow-up when the tail is flat.
const ROI_EPSILON: f64 = 1e-9;

/// Structured action descriptor, emitted only on a final ALLOW.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub domain: Domain,
    pub action: String,
    /// Fraction of the caller's budget, scaled by feature stability.
    pub size_hint: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub final_verdict: Verdict,
    pub roi_score: f64,
    pub intent: Option<Intent>,
    /// Names of the gates whose verdict equals the final one (the binding
    /// gates), in gate order.
    pub contributing_gates: Vec<String>,
}

/// Risk-adjusted ratio of expected return to tail loss.
pub fn roi_score(simulation: &SimulationResult) -> f64 {
    simulation.mean_return / simulation.cvar95.abs().max(ROI_EPSILON)
}

fn build_intent(
    features: &FeatureVector,
    simulation: &SimulationResult,
    score: f64,
    domain: Domain,
) -> Intent {
    let action = if simulation.mean_return >= 0.0 { "enter_long" } else { "enter_short" };
    Intent {
        domain,
        action: action.to_string(),
        size_hint: (0.1 * features.stability).clamp(0.0, 0.1),
        rationale: format!(
            "roi_score {score:.4} with cvar95 {:.4}; {}",
            simulation.cvar95,
            features.summary()
        ),
    }
}

/// Final verdict for the pass. The aggregated gate verdict stands as-is;
/// an intent payload is attached if and only if it is ALLOW.
pub fn decide(
    gates: &[GateResult],
    simulation: &SimulationResult,
    features: &FeatureVector,
    cfg: &RunConfig,
) -> Decision {
    let final_verdict = aggregate_verdict(gates);
    let score = roi_score(simulation);

    let contributing_gates = gates
        .iter()
        .filter(|g| g.verdict == final_verdict)
        .map(|g| g.name.clone())
        .collect();

    let intent = match final_verdict {
        Verdict::Allow => Some(build_intent(features, simulation, score, cfg.domain)),
        Verdict::Hold | Verdict::Block => None,
    };

    Decision { final_verdict, roi_score: score, intent, contributing_gates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Regime;

    fn features() -> FeatureVector {
        FeatureVector {
            volatility: 0.05,
            coherence: 0.9,
            regime: Regime::Trending,
            friction: 0.1,
            stability: 0.8,
        }
    }

    fn sim(mean_return: f64, cvar95: f64) -> SimulationResult {
        SimulationResult { paths: vec![mean_return; 10], mean_return, var95: cvar95, cvar95, seed: 1 }
    }

    fn gate(name: &str, verdict: Verdict) -> GateResult {
        GateResult { name: name.to_string(), verdict, reason: "t".to_string() }
    }

    #[test]
    fn test_block_is_hard_ceiling_regardless_of_score() {
        // Strongly positive ROI must not override a risk BLOCK.
        let gates = vec![
            gate("integrity", Verdict::Allow),
            gate("x108", Verdict::Allow),
            gate("risk", Verdict::Block),
        ];
        let d = decide(&gates, &sim(0.5, -0.25), &features(), &RunConfig::default());
        assert_eq!(d.final_verdict, Verdict::Block);
        assert!(d.intent.is_none());
        assert!(d.roi_score > 0.0);
        assert_eq!(d.contributing_gates, vec!["risk"]);
    }

    #[test]
    fn test_hold_yields_no_intent() {
        let gates = vec![
            gate("integrity", Verdict::Allow),
            gate("x108", Verdict::Hold),
            gate("risk", Verdict::Allow),
        ];
        let d = decide(&gates, &sim(0.02, -0.05), &features(), &RunConfig::default());
        assert_eq!(d.final_verdict, Verdict::Hold);
        assert!(d.intent.is_none());
        assert_eq!(d.contributing_gates, vec!["x108"]);
    }

    #[test]
    fn test_allow_carries_intent() {
        let gates = vec![
            gate("integrity", Verdict::Allow),
            gate("x108", Verdict::Allow),
            gate("risk", Verdict::Allow),
        ];
        let d = decide(&gates, &sim(0.02, -0.05), &features(), &RunConfig::default());
        assert_eq!(d.final_verdict, Verdict::Allow);
        let intent = d.intent.expect("allow must carry an intent");
        assert_eq!(intent.action, "enter_long");
        assert!(intent.size_hint > 0.0 && intent.size_hint <= 0.1);
        assert_eq!(d.contributing_gates.len(), 3);
    }

    #[test]
    fn test_negative_expectation_enters_short() {
        let gates = vec![
            gate("integrity", Verdict::Allow),
            gate("x108", Verdict::Allow),
            gate("risk", Verdict::Allow),
        ];
        let d = decide(&gates, &sim(-0.01, -0.05), &features(), &RunConfig::default());
        assert_eq!(d.intent.unwrap().action, "enter_short");
    }

    #[test]
    fn test_roi_score_flat_tail_does_not_blow_up() {
        let s = roi_score(&sim(0.01, 0.0));
        assert!(s.is_finite());
    }
}
