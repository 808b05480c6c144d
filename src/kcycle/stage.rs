//! K-Cycle states and the pure transition table.
//!
//! [`transition`] is the only place that decides where a candidate goes
//! next. Validators feed it outcomes; the orchestrator just follows it.

use serde::{Deserialize, Serialize};

/// A K-Cycle state. `Accepted`, `Rejected` and `Quarantined` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Received,
    OosCheck,
    VqfCheck,
    ConfidenceResolution,
    Accepted,
    Rejected,
    Quarantined,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::OosCheck => "OOS_CHECK",
            Self::VqfCheck => "VQF_CHECK",
            Self::ConfidenceResolution => "CONFIDENCE_RESOLUTION",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Quarantined => "QUARANTINED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Quarantined)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(Self::Received),
            "OOS_CHECK" => Ok(Self::OosCheck),
            "VQF_CHECK" => Ok(Self::VqfCheck),
            "CONFIDENCE_RESOLUTION" => Ok(Self::ConfidenceResolution),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            "QUARANTINED" => Ok(Self::Quarantined),
            _ => Err(format!("unknown stage: {s}")),
        }
    }
}

/// What a stage produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The candidate entered the cycle.
    Started,
    /// OOS result.
    Structure { passed: bool },
    /// VQF result, with the speculative confidence already compared to the threshold.
    Quality {
        violations: bool,
        below_threshold: bool,
    },
    /// Final confidence written.
    Resolved,
}

impl StageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Structure { passed: true } => "structure_passed",
            Self::Structure { passed: false } => "structure_failed",
            Self::Quality {
                violations: false,
                below_threshold: false,
            } => "quality_passed",
            Self::Quality {
                below_threshold: true,
                ..
            } => "below_threshold",
            Self::Quality { .. } => "quality_degraded",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Cycle-level switches consulted by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switches {
    pub oos_enabled: bool,
    pub vqf_enabled: bool,
    pub strict_mode: bool,
}

impl Default for Switches {
    fn default() -> Self {
        Self {
            oos_enabled: true,
            vqf_enabled: true,
            strict_mode: false,
        }
    }
}

/// Next stage for `(stage, outcome)`, or `None` if the pair is not a legal move.
pub fn transition(stage: Stage, outcome: StageOutcome, switches: Switches) -> Option<Stage> {
    use Stage::*;
    use StageOutcome::*;

    let after_structure = if switches.vqf_enabled {
        VqfCheck
    } else {
        ConfidenceResolution
    };

    let next = match (stage, outcome) {
        (Received, Started) if switches.oos_enabled => OosCheck,
        (Received, Started) => after_structure,

        (OosCheck, Structure { passed: false }) => Rejected,
        (OosCheck, Structure { passed: true }) => after_structure,

        (
            VqfCheck,
            Quality {
                violations,
                below_threshold,
            },
        ) => match (switches.strict_mode, violations, below_threshold) {
            (true, true, _) => Rejected,
            (true, false, _) => ConfidenceResolution,
            (false, _, true) => Quarantined,
            (false, _, false) => ConfidenceResolution,
        },

        (ConfidenceResolution, Resolved) => Accepted,

        _ => return None,
    };
    Some(next)
}
