//! The K-Cycle: OOS → VQF → confidence resolution → decision.

pub mod confidence;
pub mod oos;
pub mod orchestrator;
pub mod stage;
pub mod violation;
pub mod vqf;

pub use confidence::{Resolution, DEFAULT_PRIOR_CONFIDENCE};
pub use orchestrator::{
    run_cycle, AuditEntry, CycleConfig, CycleReport, Decision, DEFAULT_QUARANTINE_THRESHOLD,
};
pub use stage::{Stage, Switches};
pub use violation::{Rule, Violation, ViolationClass};
