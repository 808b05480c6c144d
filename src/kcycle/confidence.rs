//! Confidence resolution.
//!
//! `final = clamp(prior + Σ adjustments − structural_penalty, 0.0, 1.0)`
//!
//! The prior is the statement's own confidence, or the configured default
//! when absent. The structural penalty is always zero today because
//! structural failures are fatal; it stays in the formula so a graded OOS
//! outcome can feed it later.

use serde::{Deserialize, Serialize};

/// Prior used when a statement carries no confidence.
pub const DEFAULT_PRIOR_CONFIDENCE: f64 = 0.5;

/// Structural penalty for a candidate that passed (or skipped) OOS.
pub const NO_STRUCTURAL_PENALTY: f64 = 0.0;

/// Resolved confidences are rounded to 1e-9 so that sums which are exact in
/// decimal compare exactly against the quarantine threshold.
const CONFIDENCE_SCALE: f64 = 1e9;

/// The inputs and result of one resolution, kept for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub prior: f64,
    pub prior_defaulted: bool,
    pub adjustment: f64,
    pub structural_penalty: f64,
    pub confidence: f64,
}

impl Resolution {
    /// Human-readable derivation, e.g. `0.50 (default prior) - 0.20 = 0.30`.
    pub fn explain(&self) -> String {
        let prior = if self.prior_defaulted {
            format!("{:.2} (default prior)", self.prior)
        } else {
            format!("{:.2} (prior)", self.prior)
        };
        let mut out = prior;
        if self.adjustment != 0.0 {
            let sign = if self.adjustment < 0.0 { '-' } else { '+' };
            out.push_str(&format!(" {sign} {:.2} (quality)", self.adjustment.abs()));
        }
        if self.structural_penalty != 0.0 {
            out.push_str(&format!(" - {:.2} (structure)", self.structural_penalty));
        }
        out.push_str(&format!(" = {:.2}", self.confidence));
        out
    }
}

/// Deterministically combine prior and adjustments into a final confidence.
///
/// A non-finite prior is treated as absent.
pub fn resolve(
    prior: Option<f64>,
    default_prior: f64,
    adjustments: &[f64],
    structural_penalty: f64,
) -> Resolution {
    let given = prior.filter(|p| p.is_finite());
    let prior = given.unwrap_or(default_prior);
    let adjustment: f64 = adjustments.iter().sum();
    let raw = (prior + adjustment - structural_penalty).clamp(0.0, 1.0);
    let confidence = (raw * CONFIDENCE_SCALE).round() / CONFIDENCE_SCALE;
    Resolution {
        prior,
        prior_defaulted: given.is_none(),
        adjustment,
        structural_penalty,
        confidence,
    }
}
