use std::path::PathBuf;

use crate::record::{ChangeRecord, ExecStatus, OpKind, RecordId};

/// Output of analysis: every changed record, open to review before
/// execution.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub(super) records: Vec<ChangeRecord>,
    pub(super) stage_names: Vec<&'static str>,
}

impl Plan {
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ChangeRecord] {
        &mut self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Drop records the reviewer rejected. Records reading a dropped
    /// record's result are skipped at execution.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&ChangeRecord) -> bool,
    {
        self.records.retain(keep);
    }

    /// Mark one record as skipped. Returns false if it is not in the plan.
    pub fn skip(&mut self, id: RecordId) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.set_skipped("skipped by reviewer");
                true
            }
            None => false,
        }
    }

    /// Records that execution would still run.
    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| is_runnable(r)).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stage_names(&self) -> &[&'static str] {
        &self.stage_names
    }

    pub fn by_stage(&self, stage: usize) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(move |r| r.stage == Some(stage))
    }
}

pub(super) fn is_runnable(r: &ChangeRecord) -> bool {
    r.changed && r.op != OpKind::None && r.status == ExecStatus::Pending
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub id: RecordId,
    pub stage: Option<usize>,
    pub op: OpKind,
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: ExecStatus,
    pub reason: Option<String>,
}

/// Per-record status list of one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<RecordOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Left pending because execution was cancelled.
    pub not_run: usize,
    pub cancelled: bool,
}

impl ExecutionReport {
    pub(super) fn from_records(records: &[ChangeRecord], cancelled: bool) -> Self {
        let mut report = Self {
            cancelled,
            ..Self::default()
        };
        for r in records {
            match r.status {
                ExecStatus::Success => report.succeeded += 1,
                ExecStatus::Failed => report.failed += 1,
                ExecStatus::Skipped => report.skipped += 1,
                ExecStatus::Pending | ExecStatus::Running => report.not_run += 1,
            }
            report.outcomes.push(RecordOutcome {
                id: r.id,
                stage: r.stage,
                op: r.op,
                source: r.current_source().to_path_buf(),
                target: r.planned_path.clone(),
                status: r.status,
                reason: r.fail_reason.clone(),
            });
        }
        report
    }

    pub fn status_of(&self, id: RecordId) -> Option<ExecStatus> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| o.status)
    }
}
