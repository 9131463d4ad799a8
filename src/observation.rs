//! Observation input: a time-ordered price/measurement series.
//!
//! Malformed input (negative prices, non-monotonic timestamps) is rejected
//! here, at construction, so everything downstream can assume a clean series.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ts: u64,
    pub close: f64,
}

/// Immutable once constructed. `input_hash` is the sha256 of the raw samples
/// and goes into the audit record for lineage.
#[derive(Debug, Clone)]
pub struct ObservationSeries {
    samples: Vec<Sample>,
    input_hash: String,
}

impl ObservationSeries {
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let mut prev_ts: Option<u64> = None;
        for (i, s) in samples.iter().enumerate() {
            if !s.close.is_finite() || s.close <= 0.0 {
                return Err(EngineError::Observation(format!(
                    "sample {i}: close must be a positive finite number, got {}",
                    s.close
                )));
            }
            if let Some(prev) = prev_ts {
                if s.ts <= prev {
                    return Err(EngineError::Observation(format!(
                        "sample {i}: timestamp {} not strictly increasing (prev {})",
                        s.ts, prev
                    )));
                }
            }
            prev_ts = Some(s.ts);
        }

        let mut hasher = Sha256::new();
        for s in &samples {
            hasher.update(s.ts.to_le_bytes());
            hasher.update(s.close.to_le_bytes());
        }
        let input_hash = hex::encode(hasher.finalize());

        Ok(Self { samples, input_hash })
    }

    /// Parse CSV text with a header row. A `close` column is required; a
    /// `ts` column is used when present, otherwise the row index stands in.
    /// Comment lines (`#`) and blank lines are skipped.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut header: Option<Vec<String>> = None;
        let mut samples = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match &header {
                None => {
                    header = Some(
                        trimmed
                            .split(',')
                            .map(|c| c.trim().to_ascii_lowercase())
                            .collect(),
                    );
                }
                Some(cols) => {
                    let close_idx = cols.iter().position(|c| c == "close").ok_or_else(|| {
                        EngineError::Observation("required column 'close' not found".to_string())
                    })?;
                    let ts_idx = cols.iter().position(|c| c == "ts" || c == "timestamp");

                    let fields: Vec<&str> = trimmed.split(',').map(|f| f.trim()).collect();
                    if fields.len() != cols.len() {
                        return Err(EngineError::Observation(format!(
                            "row has {} fields, header has {}",
                            fields.len(),
                            cols.len()
                        )));
                    }
                    let close: f64 = fields[close_idx].parse().map_err(|_| {
                        EngineError::Observation(format!("bad close value: {}", fields[close_idx]))
                    })?;
                    let ts: u64 = match ts_idx {
                        Some(i) => fields[i].parse().map_err(|_| {
                            EngineError::Observation(format!("bad ts value: {}", fields[i]))
                        })?,
                        None => samples.len() as u64,
                    };
                    samples.push(Sample { ts, close });
                }
            }
        }

        Self::from_samples(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn input_hash(&self) -> &str {
        &self.input_hash
    }

    /// Log-differences of consecutive closes. Length is `len() - 1`.
    pub fn log_returns(&self) -> Vec<f64> {
        self.samples
            .windows(2)
            .map(|w| (w[1].close / w[0].close).ln())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(prices: &[f64]) -> ObservationSeries {
        let samples = prices
            .iter()
            .enumerate()
            .map(|(i, &c)| Sample { ts: 1000 + i as u64 * 3600, close: c })
            .collect();
        ObservationSeries::from_samples(samples).unwrap()
    }

    #[test]
    fn test_rejects_negative_price() {
        let r = ObservationSeries::from_samples(vec![
            Sample { ts: 1, close: 100.0 },
            Sample { ts: 2, close: -5.0 },
        ]);
        assert!(matches!(r, Err(EngineError::Observation(_))));
    }

    #[test]
    fn test_rejects_non_monotonic_timestamps() {
        let r = ObservationSeries::from_samples(vec![
            Sample { ts: 10, close: 100.0 },
            Sample { ts: 10, close: 101.0 },
        ]);
        assert!(matches!(r, Err(EngineError::Observation(_))));
    }

    #[test]
    fn test_log_returns() {
        let s = series(&[100.0, 110.0, 99.0]);
        let r = s.log_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - (110.0f64 / 100.0).ln()).abs() < 1e-12);
        assert!((r[1] - (99.0f64 / 110.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_csv_close_column_required() {
        let err = ObservationSeries::from_csv("ts,open\n1,100.0\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_csv_parse_with_extra_columns() {
        let s = ObservationSeries::from_csv(
            "ts,open,high,low,close,volume\n\
             1000,99,101,98,100.0,5\n\
             2000,100,103,99,102.5,6\n",
        )
        .unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.samples()[1].close, 102.5);
    }

    #[test]
    fn test_input_hash_stable() {
        let a = series(&[100.0, 101.0]);
        let b = series(&[100.0, 101.0]);
        assert_eq!(a.input_hash(), b.input_hash());
        let c = series(&[100.0, 102.0]);
        assert_ne!(a.input_hash(), c.input_hash());
    }
}
