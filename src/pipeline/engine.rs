use std::collections::HashMap;
use std::path::PathBuf;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::cancel::CancelFlag;
use super::lock::LockTable;
use super::plan::{ExecutionReport, Plan, is_runnable};
use super::progress::{NoProgress, ProgressCounter, ProgressReporter};
use super::strategy::{AnalyzeContext, Strategy};
use crate::condition::Subject;
use crate::config::ConfigStore;
use crate::record::{ChangeRecord, ExecStatus, OpKind, RecordId};
use crate::strategies::Stage;

/// Runs stages strictly in declared order.
pub struct Pipeline<S = Stage> {
    stages: Vec<S>,
    default_threads: usize,
    parallel_analyze: bool,
    locks: LockTable,
    cancel: CancelFlag,
}

impl<S: Strategy> Pipeline<S> {
    pub fn new(stages: Vec<S>) -> Self {
        Self {
            stages,
            default_threads: 4,
            parallel_analyze: true,
            locks: LockTable::new(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_default_threads(mut self, threads: usize) -> Self {
        self.default_threads = threads.max(1);
        self
    }

    pub fn with_parallel_analyze(mut self, parallel: bool) -> Self {
        self.parallel_analyze = parallel;
        self
    }

    pub fn stages(&self) -> &[S] {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut [S] {
        &mut self.stages
    }

    /// Handle for requesting cancellation from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Plan every stage over `files` without touching the filesystem.
    ///
    /// Each stage sees the current version of every item: the planned result
    /// of the last stage that changed it. Items failing a stage's gate or
    /// target scope pass through that stage unchanged. Deleted items are not
    /// offered to later stages.
    pub fn analyze(
        &self,
        files: &[PathBuf],
        roots: &[PathBuf],
        progress: &dyn ProgressReporter,
    ) -> Plan {
        let mut ids = IdSource::default();
        let mut items: Vec<ChangeRecord> = files
            .iter()
            .map(|f| ChangeRecord::identity(ids.next(), f))
            .collect();
        let mut planned = Vec::new();

        for (index, stage) in self.stages.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(stage = stage.name(), "analysis cancelled");
                break;
            }

            let eligible: Vec<ChangeRecord> = items
                .iter()
                .filter(|item| self.admits(stage, item))
                .cloned()
                .collect();
            info!(
                stage = stage.name(),
                items = items.len(),
                eligible = eligible.len(),
                "analyzing stage"
            );

            let ctx = AnalyzeContext {
                roots,
                items: &items,
                progress,
                parallel: self.parallel_analyze,
            };
            let analyzed = stage.analyze(&eligible, &ctx);

            let mut outputs: HashMap<RecordId, Vec<ChangeRecord>> = HashMap::new();
            let mut orphans = Vec::new();
            for out in analyzed {
                match out.derived_from() {
                    Some(from) => outputs.entry(from).or_default().push(out),
                    None => orphans.push(out),
                }
            }

            let mut next_items = Vec::with_capacity(items.len());
            let produced = items
                .into_iter()
                .flat_map(|item| outputs.remove(&item.id).unwrap_or_else(|| vec![item]))
                .chain(orphans);
            let mut changed = 0usize;
            let mut dir_moves = Vec::new();
            for mut rec in produced {
                if !rec.changed {
                    next_items.push(rec);
                    continue;
                }
                rec.id = ids.next();
                rec.stage = Some(index);
                changed += 1;
                if rec.op != OpKind::Delete {
                    next_items.push(rec.carry_forward(ids.next()));
                }
                if rec.is_dir() && rec.op.consumes_source() {
                    dir_moves.push(DirMove {
                        id: rec.id,
                        from: rec.current_source().to_path_buf(),
                        to: (rec.op != OpKind::Delete).then(|| rec.planned_path.clone()),
                    });
                }
                planned.push(rec);
            }
            debug!(stage = stage.name(), changed, "stage planned");
            items = follow_dir_moves(next_items, dir_moves);
        }

        Plan {
            records: planned,
            stage_names: self.stages.iter().map(|s| s.name()).collect(),
        }
    }

    pub fn execute(&self, plan: &mut Plan) -> ExecutionReport {
        self.execute_with_progress(plan, &NoProgress)
    }

    /// Apply every pending record, stage by stage.
    ///
    /// Failures are isolated per record. A record is skipped when the record
    /// it reads from did not succeed or when another running operation holds
    /// one of its paths. Cancellation is checked before each record; a record
    /// already running always completes.
    pub fn execute_with_progress(
        &self,
        plan: &mut Plan,
        progress: &dyn ProgressReporter,
    ) -> ExecutionReport {
        let counter = ProgressCounter::new(plan.pending_count(), progress);

        for (index, stage) in self.stages.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let statuses: HashMap<RecordId, ExecStatus> =
                plan.records.iter().map(|r| (r.id, r.status)).collect();
            let mut batch: Vec<&mut ChangeRecord> = plan
                .records
                .iter_mut()
                .filter(|r| r.stage == Some(index) && is_runnable(r))
                .collect();
            if batch.is_empty() {
                continue;
            }

            let threads = stage
                .preferred_threads()
                .unwrap_or(self.default_threads)
                .max(1);
            info!(
                stage = stage.name(),
                records = batch.len(),
                threads,
                "executing stage"
            );

            // Directories move after the files inside them, deepest first.
            let (mut dirs, mut files): (Vec<_>, Vec<_>) = batch
                .drain(..)
                .partition(|r| r.current_source().is_dir());
            dirs.sort_by_key(|r| std::cmp::Reverse(r.current_source().components().count()));

            let run = |rec: &mut &mut ChangeRecord| {
                self.execute_one(stage, rec, &statuses, &counter);
            };
            match ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| files.par_iter_mut().for_each(run)),
                Err(err) => {
                    warn!(stage = stage.name(), error = %err, "thread pool unavailable, running inline");
                    files.iter_mut().for_each(run);
                }
            }
            dirs.iter_mut().for_each(run);
        }

        let report = ExecutionReport::from_records(&plan.records, self.cancel.is_cancelled());
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            not_run = report.not_run,
            "execution finished"
        );
        report
    }

    fn admits(&self, stage: &S, item: &ChangeRecord) -> bool {
        stage.target_scope().admits(item.is_dir())
            && stage
                .gate()
                .test(&Subject::planned(item.current_source(), item.source()))
    }

    fn execute_one(
        &self,
        stage: &S,
        rec: &mut ChangeRecord,
        statuses: &HashMap<RecordId, ExecStatus>,
        counter: &ProgressCounter<'_>,
    ) {
        if self.cancel.is_cancelled() {
            return;
        }

        if let Some(up) = rec.upstream {
            let upstream = statuses.get(&up).copied();
            if upstream != Some(ExecStatus::Success) {
                debug!(record = %rec.id, upstream = %up, "upstream did not succeed, skipping");
                rec.set_skipped(format!("upstream record {up} did not succeed"));
                counter.step(&rec.new_name);
                return;
            }
        }

        let Some(_guard) = self.locks.try_lock(locked_paths(rec)) else {
            debug!(record = %rec.id, path = %rec.current_source().display(), "path locked, skipping");
            rec.set_skipped("path is locked by another operation");
            counter.step(&rec.new_name);
            return;
        };

        rec.status = ExecStatus::Running;
        match stage.execute(rec) {
            Ok(()) => {
                rec.status = ExecStatus::Success;
                rec.fail_reason = None;
                debug!(
                    stage = stage.name(),
                    op = %rec.op,
                    target = %rec.planned_path.display(),
                    "record applied"
                );
            }
            Err(err) => {
                warn!(
                    stage = stage.name(),
                    op = %rec.op,
                    path = %rec.current_source().display(),
                    error = %err,
                    "record failed"
                );
                rec.set_failed(err.to_string());
            }
        }
        counter.step(&rec.new_name);
    }

    /// Forward to every stage under a per-position key scope.
    pub fn load_config(&mut self, store: &ConfigStore) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.load_config(store, &stage_scope(index));
        }
    }

    pub fn save_config(&self, store: &mut ConfigStore) {
        for (index, stage) in self.stages.iter().enumerate() {
            stage.save_config(store, &stage_scope(index));
        }
    }
}

/// A directory planned to move (or, with no target, to be deleted).
struct DirMove {
    id: RecordId,
    from: PathBuf,
    to: Option<PathBuf>,
}

/// Point items that live under a moved directory at the directory's new
/// location, and drop items under a deleted one. Deeper moves apply first so
/// nested renames compose.
fn follow_dir_moves(items: Vec<ChangeRecord>, mut moves: Vec<DirMove>) -> Vec<ChangeRecord> {
    if moves.is_empty() {
        return items;
    }
    moves.sort_by_key(|m| std::cmp::Reverse(m.from.components().count()));

    let mut kept = Vec::with_capacity(items.len());
    'items: for mut item in items {
        for m in &moves {
            if item.upstream == Some(m.id) {
                continue;
            }
            match &m.to {
                Some(to) => {
                    if item.rebase(&m.from, to, m.id) {
                        debug!(record = %m.id, path = %item.current_source().display(), "following directory move");
                    }
                }
                None if item.current_source().starts_with(&m.from) => continue 'items,
                None => {}
            }
        }
        kept.push(item);
    }
    kept
}

fn stage_scope(index: usize) -> String {
    format!("s{index}_")
}

/// Paths an operation mutates: its target, plus its source when the source
/// goes away.
fn locked_paths(rec: &ChangeRecord) -> Vec<PathBuf> {
    let mut paths = vec![rec.planned_path.clone()];
    if rec.op.consumes_source() {
        paths.push(rec.current_source().to_path_buf());
    }
    paths
}

#[derive(Default)]
struct IdSource(usize);

impl IdSource {
    fn next(&mut self) -> RecordId {
        let id = RecordId(self.0);
        self.0 += 1;
        id
    }
}
