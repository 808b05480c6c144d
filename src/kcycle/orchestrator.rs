//! K-Cycle orchestration: drive one candidate from `RECEIVED` to a terminal
//! decision, appending an audit entry for every transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KosError, KosResult};
use crate::ontology::SchemaRegistry;
use crate::spocm::Statement;
use crate::storage::StatementStore;

use super::confidence::{self, Resolution, DEFAULT_PRIOR_CONFIDENCE, NO_STRUCTURAL_PENALTY};
use super::oos::{self, OosVerdict};
use super::stage::{transition, Stage, StageOutcome, Switches};
use super::violation::{summarize, Violation};
use super::vqf;

/// Confidence below which a non-strict candidate is quarantined.
pub const DEFAULT_QUARANTINE_THRESHOLD: f64 = 0.3;

/// Terminal decision of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
    Quarantined,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Quarantined => "quarantined",
        }
    }

    fn from_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Accepted => Some(Self::Accepted),
            Stage::Rejected => Some(Self::Rejected),
            Stage::Quarantined => Some(Self::Quarantined),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "quarantined" => Ok(Self::Quarantined),
            _ => Err(format!("unknown decision: {s}")),
        }
    }
}

/// Settings for one cycle, copied from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleConfig {
    pub switches: Switches,
    pub quarantine_threshold: f64,
    pub default_confidence: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            switches: Switches::default(),
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
            default_confidence: DEFAULT_PRIOR_CONFIDENCE,
        }
    }
}

/// One immutable step of a candidate's processing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stage: Stage,
    pub outcome: String,
    pub next: Stage,
    pub at: DateTime<Utc>,
    pub detail: String,
}

/// Everything a finished cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub decision: Decision,
    /// The candidate with its resolved confidence (accepted or quarantined),
    /// or unchanged (rejected).
    pub statement: Statement,
    pub confidence: Option<f64>,
    pub violations: Vec<Violation>,
    pub audit: Vec<AuditEntry>,
    pub registry_version: u64,
}

struct Cycle {
    stage: Stage,
    switches: Switches,
    audit: Vec<AuditEntry>,
}

impl Cycle {
    fn advance(&mut self, outcome: StageOutcome, detail: String) -> KosResult<()> {
        let next = transition(self.stage, outcome, self.switches).ok_or_else(|| {
            KosError::InvalidTransition {
                stage: self.stage.to_string(),
                outcome: outcome.to_string(),
            }
        })?;
        tracing::debug!(from = %self.stage, to = %next, outcome = %outcome, "k-cycle transition");
        self.audit.push(AuditEntry {
            stage: self.stage,
            outcome: outcome.label().to_string(),
            next,
            at: Utc::now(),
            detail,
        });
        self.stage = next;
        Ok(())
    }
}

/// Run a candidate through the K-Cycle.
///
/// `registry` must be a snapshot held for the whole call. The storage reads
/// in OOS assume the caller serializes acceptances per (subject, relation).
pub fn run_cycle(
    candidate: &Statement,
    registry: &SchemaRegistry,
    store: &dyn StatementStore,
    config: &CycleConfig,
) -> KosResult<CycleReport> {
    let mut cycle = Cycle {
        stage: Stage::Received,
        switches: config.switches,
        audit: Vec::new(),
    };
    let mut violations: Vec<Violation> = Vec::new();
    let mut quality_adjustment = 0.0;
    let mut resolution: Option<Resolution> = None;

    cycle.advance(
        StageOutcome::Started,
        format!(
            "candidate {} ({} {}) under schema v{}",
            candidate.id(),
            candidate.subject().id,
            candidate.relation(),
            registry.version()
        ),
    )?;

    while !cycle.stage.is_terminal() {
        match cycle.stage {
            Stage::OosCheck => match oos::validate(candidate, registry, store)? {
                OosVerdict::Pass => {
                    cycle.advance(
                        StageOutcome::Structure { passed: true },
                        "structure valid".into(),
                    )?;
                }
                OosVerdict::Fail(found) => {
                    let detail = summarize(&found);
                    violations.extend(found);
                    cycle.advance(StageOutcome::Structure { passed: false }, detail)?;
                }
            },
            Stage::VqfCheck => {
                let spec = registry.resolve_relation(candidate.relation());
                let report = vqf::validate(candidate, spec, config.switches.strict_mode);
                quality_adjustment = report.adjustment();
                let speculative = speculate(candidate, config, quality_adjustment);
                let below_threshold = speculative.confidence < config.quarantine_threshold;

                let mut detail = if report.passed() {
                    "quality checks passed".to_string()
                } else {
                    summarize(&report.violations)
                };
                detail.push_str(&format!(
                    "; speculative confidence {} vs threshold {:.2}",
                    speculative.explain(),
                    config.quarantine_threshold
                ));

                let had_violations = !report.passed();
                violations.extend(report.violations);
                cycle.advance(
                    StageOutcome::Quality {
                        violations: had_violations,
                        below_threshold,
                    },
                    detail,
                )?;
                if cycle.stage == Stage::Quarantined {
                    resolution = Some(speculative);
                }
            }
            Stage::ConfidenceResolution => {
                let resolved = speculate(candidate, config, quality_adjustment);
                let detail = resolved.explain();
                resolution = Some(resolved);
                cycle.advance(StageOutcome::Resolved, detail)?;
            }
            other => {
                return Err(KosError::InvalidTransition {
                    stage: other.to_string(),
                    outcome: "none".into(),
                });
            }
        }
    }

    let decision = Decision::from_stage(cycle.stage).ok_or_else(|| KosError::InvalidTransition {
        stage: cycle.stage.to_string(),
        outcome: "terminal".into(),
    })?;
    let confidence = match decision {
        Decision::Rejected => None,
        _ => resolution.map(|r| r.confidence),
    };
    let statement = match confidence {
        Some(c) => candidate.resolved(c),
        None => candidate.clone(),
    };

    tracing::info!(
        statement_id = %candidate.id(),
        relation = %candidate.relation(),
        decision = %decision,
        confidence = ?confidence,
        violations = violations.len(),
        "k-cycle finished"
    );

    Ok(CycleReport {
        decision,
        statement,
        confidence,
        violations,
        audit: cycle.audit,
        registry_version: registry.version(),
    })
}

fn speculate(candidate: &Statement, config: &CycleConfig, quality_adjustment: f64) -> Resolution {
    confidence::resolve(
        candidate.metadata().confidence,
        config.default_confidence,
        &[quality_adjustment],
        NO_STRUCTURAL_PENALTY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kcycle::violation::Rule;
    use crate::ontology::{RelationSpec, SubjectTypeSpec};
    use crate::spocm::{Metadata, Object, Predicate, Subject, Temporality};
    use crate::storage::memory::MemoryStore;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder(1)
            .subject_type(SubjectTypeSpec::new("Person"))
            .relation(RelationSpec::new("hasRole").subjects(["Person"]).single())
            .relation(RelationSpec::new("weight").with_units(["kg"]))
            .build()
            .unwrap()
    }

    fn role(prior: Option<f64>) -> Statement {
        let mut meta = Metadata::default();
        meta.confidence = prior;
        Statement::new(
            Subject::new("user:001", "Person"),
            Predicate::new("hasRole"),
            Object::new("Administrator"),
        )
        .with_metadata(meta)
    }

    fn stages(report: &CycleReport) -> Vec<Stage> {
        report.audit.iter().map(|e| e.next).collect()
    }

    #[test]
    fn clean_candidate_walks_every_stage() {
        let store = MemoryStore::new();
        let report = run_cycle(&role(None), &registry(), &store, &CycleConfig::default()).unwrap();
        assert_eq!(report.decision, Decision::Accepted);
        assert_eq!(report.confidence, Some(0.5));
        assert_eq!(report.statement.metadata().confidence, Some(0.5));
        assert_eq!(
            stages(&report),
            vec![
                Stage::OosCheck,
                Stage::VqfCheck,
                Stage::ConfidenceResolution,
                Stage::Accepted
            ]
        );
        assert_eq!(report.audit[0].stage, Stage::Received);
    }

    #[test]
    fn unknown_relation_rejects_before_vqf() {
        let store = MemoryStore::new();
        let s = Statement::new(
            Subject::new("user:001", "Person"),
            Predicate::new("hasPet"),
            Object::new("Rex"),
        );
        let report = run_cycle(&s, &registry(), &store, &CycleConfig::default()).unwrap();
        assert_eq!(report.decision, Decision::Rejected);
        assert_eq!(report.confidence, None);
        assert_eq!(stages(&report), vec![Stage::OosCheck, Stage::Rejected]);
        assert!(report.audit[1].detail.contains("unknown_relation"));
    }

    #[test]
    fn threshold_is_inclusive_for_acceptance() {
        let store = MemoryStore::new();
        let config = CycleConfig::default();
        let at = run_cycle(&role(Some(0.3)), &registry(), &store, &config).unwrap();
        assert_eq!(at.decision, Decision::Accepted);
        assert_eq!(at.confidence, Some(0.3));

        let below = run_cycle(&role(Some(0.29)), &registry(), &store, &config).unwrap();
        assert_eq!(below.decision, Decision::Quarantined);
        assert_eq!(below.confidence, Some(0.29));
        assert_eq!(below.audit.last().unwrap().next, Stage::Quarantined);
    }

    #[test]
    fn degraded_confidence_equal_to_threshold_is_accepted() {
        let store = MemoryStore::new();
        let predicate = Predicate::new("hasRole").with_temporality(Temporality::interval(
            Some("2024-06-01T00:00:00Z".parse().unwrap()),
            Some("2024-01-01T00:00:00Z".parse().unwrap()),
        ));
        let s = Statement::new(
            Subject::new("user:001", "Person"),
            predicate,
            Object::new("Administrator").with_unit("kg"),
        )
        .with_metadata(Metadata::default().with_confidence(0.7));

        let report = run_cycle(&s, &registry(), &store, &CycleConfig::default()).unwrap();
        let rules: Vec<Rule> = report.violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::UnexpectedUnit, Rule::TemporalOrder]);
        assert_eq!(report.decision, Decision::Accepted);
        assert_eq!(report.confidence, Some(0.3));
    }

    #[test]
    fn strict_mode_accepts_low_confidence_without_violations() {
        let store = MemoryStore::new();
        let config = CycleConfig {
            switches: Switches {
                strict_mode: true,
                ..Switches::default()
            },
            ..CycleConfig::default()
        };
        let s = role(Some(0.2)).with_metadata(
            Metadata::default()
                .with_author("a")
                .with_source("s")
                .with_confidence(0.2),
        );
        let report = run_cycle(&s, &registry(), &store, &config).unwrap();
        assert_eq!(report.decision, Decision::Accepted);
        assert!(report.violations.is_empty());
        assert!(stages(&report).contains(&Stage::ConfidenceResolution));
    }

    #[test]
    fn soft_violation_degrades_confidence() {
        let store = MemoryStore::new();
        let s = Statement::new(
            Subject::new("user:001", "Person"),
            Predicate::new("weight"),
            Object::new(70.0),
        );
        let report = run_cycle(&s, &registry(), &store, &CycleConfig::default()).unwrap();
        assert_eq!(report.decision, Decision::Accepted);
        assert!((report.confidence.unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(report.violations[0].rule, Rule::MissingUnit);
    }

    #[test]
    fn disabled_stages_are_skipped() {
        let store = MemoryStore::new();
        let config = CycleConfig {
            switches: Switches {
                oos_enabled: false,
                vqf_enabled: false,
                strict_mode: true,
            },
            ..CycleConfig::default()
        };
        let s = Statement::new(
            Subject::new("user:001", "Person"),
            Predicate::new("hasPet"),
            Object::new("Rex"),
        );
        let report = run_cycle(&s, &registry(), &store, &config).unwrap();
        assert_eq!(report.decision, Decision::Accepted);
        assert_eq!(
            stages(&report),
            vec![Stage::ConfidenceResolution, Stage::Accepted]
        );
    }
}
