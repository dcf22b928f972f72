//! Lifecycle engine: applies archive and restore transitions to a resolved cascade.
//!
//! There is no multi-row transaction. Steps are written one at a time in the order given by
//! [`CascadeSet::ordered_steps`], and the outcome is reported as a [`TransitionReport`]:
//!
//! - A failed dependent is recorded and the remaining steps still run.
//! - A failed root stops the run immediately; rows written before it stay written.
//! - Rows already in the target state are not written at all, so retrying the same
//!   operation is safe and converges.
//!
//! When restoring, a dependent whose parent could not be restored is not attempted, so a
//! child never becomes active under an archived parent.

use crate::cascade::{CascadeSet, CascadeStep};
use crate::models::{EntityKind, RecordPatch};
use crate::store::EntityStore;
use medidesk_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Archive,
    Restore,
}

impl Direction {
    /// The value of `active` every row ends up with.
    pub fn target_active(&self) -> bool {
        matches!(self, Direction::Restore)
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Direction::Archive => "archived",
            Direction::Restore => "restored",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Archive => f.write_str("archive"),
            Direction::Restore => f.write_str("restore"),
        }
    }
}

/// A row that could not be transitioned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub kind: EntityKind,
    pub id: RecordId,
    pub reason: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.id, self.reason)
    }
}

/// Row counts per entity kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub patients: usize,
    pub representatives: usize,
    pub medical_histories: usize,
    pub consultations: usize,
    pub prescriptions: usize,
}

impl KindCounts {
    pub fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Patient => self.patients,
            EntityKind::Representative => self.representatives,
            EntityKind::MedicalHistory => self.medical_histories,
            EntityKind::Consultation => self.consultations,
            EntityKind::Prescription => self.prescriptions,
        }
    }

    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }

    fn bump(&mut self, kind: EntityKind) {
        let slot = match kind {
            EntityKind::Patient => &mut self.patients,
            EntityKind::Representative => &mut self.representatives,
            EntityKind::MedicalHistory => &mut self.medical_histories,
            EntityKind::Consultation => &mut self.consultations,
            EntityKind::Prescription => &mut self.prescriptions,
        };
        *slot += 1;
    }
}

/// Outcome of one transition.
///
/// `success` is true iff the root row ended up in the target state, whatever happened to its
/// dependents. Dependent failures are listed in `failures`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionReport {
    pub success: bool,
    pub direction: Direction,
    pub root_kind: EntityKind,
    pub root_id: RecordId,
    /// Rows written by this run.
    pub changed: KindCounts,
    /// Rows that were already in the target state.
    pub unchanged: KindCounts,
    pub failures: Vec<StepFailure>,
    pub root_failure: Option<StepFailure>,
}

impl TransitionReport {
    fn new(set: &CascadeSet, direction: Direction) -> Self {
        Self {
            success: false,
            direction,
            root_kind: set.root.kind.entity_kind(),
            root_id: set.root.id,
            changed: KindCounts::default(),
            unchanged: KindCounts::default(),
            failures: Vec::new(),
            root_failure: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures grouped by kind, for notices.
    pub fn failure_counts(&self) -> KindCounts {
        let mut counts = KindCounts::default();
        for failure in &self.failures {
            counts.bump(failure.kind);
        }
        counts
    }
}

/// What a transition would touch, computed without writing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CascadePreview {
    pub includes_patient: bool,
    pub patient_name: Option<String>,
    pub medical_history: bool,
    pub consultations: usize,
    pub prescriptions: usize,
    pub representatives: usize,
}

impl From<&CascadeSet> for CascadePreview {
    fn from(set: &CascadeSet) -> Self {
        Self {
            includes_patient: set.includes_patient(),
            patient_name: set.patient.as_ref().map(|p| p.full_name.clone()),
            medical_history: set.medical_history.is_some(),
            consultations: set.consultations.len(),
            prescriptions: set.prescriptions.len(),
            representatives: set.representatives.len(),
        }
    }
}

pub struct LifecycleEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> LifecycleEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Counts of the rows a transition of `set` would touch. Does not access the store.
    pub fn preview(&self, set: &CascadeSet) -> CascadePreview {
        CascadePreview::from(set)
    }

    /// Flips `active` on every row of `set`, sequentially and in dependency order.
    pub fn transition(&self, set: &CascadeSet, direction: Direction) -> TransitionReport {
        let target = direction.target_active();
        let patch = RecordPatch::set_active(target);
        let mut report = TransitionReport::new(set, direction);
        let mut blocked: BTreeSet<EntityKind> = BTreeSet::new();

        for step in set.ordered_steps(direction) {
            if step.active == target {
                report.unchanged.bump(step.kind);
                if step.is_root {
                    report.success = true;
                }
                continue;
            }

            if direction == Direction::Restore {
                if let Some(parent) = parent_kind(&step).filter(|p| blocked.contains(p)) {
                    let reason = format!("parent {parent} could not be restored");
                    if self.fail(&mut report, step, reason) {
                        break;
                    }
                    blocked.insert(step.kind);
                    continue;
                }
            }

            match self.store.update(step.kind, &step.id, &patch) {
                Ok(_) => {
                    report.changed.bump(step.kind);
                    if step.is_root {
                        report.success = true;
                    }
                }
                Err(e) => {
                    if self.fail(&mut report, step, e.to_string()) {
                        break;
                    }
                    blocked.insert(step.kind);
                }
            }
        }

        if report.success {
            tracing::info!(
                "{} {} {}: {} rows changed, {} unchanged, {} failed",
                direction.past_tense(),
                report.root_kind,
                report.root_id,
                report.changed.total(),
                report.unchanged.total(),
                report.failures.len()
            );
        }
        report
    }

    /// Records a failed step. Returns true when the failure is fatal.
    fn fail(&self, report: &mut TransitionReport, step: CascadeStep, reason: String) -> bool {
        let failure = StepFailure {
            kind: step.kind,
            id: step.id,
            reason,
        };
        if step.is_root {
            tracing::error!(
                "failed to {} root {}; stopping cascade",
                report.direction,
                failure
            );
            report.success = false;
            report.root_failure = Some(failure);
            return true;
        }
        tracing::warn!("failed to {} {}", report.direction, failure);
        report.failures.push(failure);
        false
    }
}

/// The kind whose restore a step depends on.
fn parent_kind(step: &CascadeStep) -> Option<EntityKind> {
    match step.kind {
        EntityKind::Patient => None,
        EntityKind::MedicalHistory | EntityKind::Representative => Some(EntityKind::Patient),
        EntityKind::Consultation | EntityKind::Prescription => Some(EntityKind::MedicalHistory),
    }
}
