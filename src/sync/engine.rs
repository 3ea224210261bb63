//! Reconciliation engine: runs create/delete intents against the ledger and
//! keeps the optimistic view consistent with confirmed reads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use super::collection::{ReconcileReport, TaskCollection};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::logging::intent_span;
use crate::model::{LocalKey, Snapshot, Task, TaskId, TaskStatus, TxOutcome};
use crate::ports::{Clock, IdGenerator, LedgerClient};
use crate::session::AccountSession;
use crate::tracker::{TrackerConfig, TransactionTracker};

struct State {
    tasks: TaskCollection,
    revision: u64,
}

/// Sole owner of the task collection.
///
/// Intents may run concurrently; each suspends at authorization,
/// submission, confirmation and the reconciling read. The collection lock
/// is only held inside a synchronous step, never across an await, and
/// every step publishes one settled [`Snapshot`].
pub struct ReconciliationEngine {
    ledger: Arc<dyn LedgerClient>,
    session: AccountSession,
    tracker: TransactionTracker,
    id_gen: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    snapshots: watch::Sender<Snapshot>,
}

impl ReconciliationEngine {
    /// Builds an engine over the ports in `ctx`.
    #[must_use]
    pub fn new(ctx: &ServiceContext, tracker: TrackerConfig) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::default());
        Self {
            ledger: Arc::clone(&ctx.ledger),
            session: AccountSession::new(Arc::clone(&ctx.accounts)),
            tracker: TransactionTracker::new(Arc::clone(&ctx.ledger), tracker),
            id_gen: Arc::clone(&ctx.id_gen),
            clock: Arc::clone(&ctx.clock),
            state: Mutex::new(State { tasks: TaskCollection::new(), revision: 0 }),
            snapshots,
        }
    }

    /// Receives every settled snapshot from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// The latest settled snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Proposes a task, submits it and waits for the ledger to confirm it.
    ///
    /// The proposed row is visible before any network round trip. On success
    /// the returned task carries its ledger id and keeps the proposed key.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank title or body (nothing changes).
    /// - `NoProvider`, `UserRejected` or `Submission` if no transaction was
    ///   created; `TransactionFailed` if the ledger rejected it. The proposed
    ///   row is removed in all four cases.
    /// - `Read` if the transaction was confirmed but the follow-up read failed
    ///   or did not contain the task. After a failed read the row stays
    ///   pending and the next [`ReconciliationEngine::refresh`] commits it.
    pub async fn create_task(&self, title: &str, body: &str) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }
        if body.trim().is_empty() {
            return Err(Error::Validation("body must not be empty".into()));
        }

        let key = LocalKey::new(self.id_gen.generate_id());
        let span = intent_span("create", &key);
        async {
            let now = self.clock.now();
            self.apply_if(|c| c.propose_create(key.clone(), title, body, now), Result::is_ok)?;
            info!("create proposed");
            let inflight = Inflight::new(self, key.clone());

            let submitted = match self.session.ensure_authorized().await {
                Ok(from) => self.ledger.submit_create(&from, title, body).await,
                Err(e) => Err(e),
            };
            let handle = match submitted {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(error = %e, "create not submitted; rolled back");
                    inflight.roll_back();
                    return Err(e);
                }
            };
            self.apply(|c| c.attach_handle(&key, handle.clone()));
            info!(%handle, "create submitted");

            match self.tracker.resolve(&handle).await {
                TxOutcome::Confirmed => {
                    self.apply(|c| c.mark_confirmed(&key));
                    // From here the next successful read owns the outcome.
                    inflight.keep();
                    self.commit_created(&key).await
                }
                TxOutcome::Failed { reason } => {
                    warn!(%handle, %reason, "create failed; rolled back");
                    inflight.roll_back();
                    Err(Error::TransactionFailed { handle: handle.0, reason })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Hides task `id`, submits its deletion and waits for the outcome.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if a delete of `id` is already in flight or `id` is
    ///   not a visible confirmed task (nothing changes).
    /// - `NoProvider`, `UserRejected`, `Submission` or `TransactionFailed`;
    ///   the task reappears unless the ledger already shows it tombstoned.
    pub async fn delete_task(&self, id: TaskId) -> Result<()> {
        let now = self.clock.now();
        let key = self.apply_if(|c| c.propose_delete(id, now), Result::is_ok)?;
        let span = intent_span("delete", &key);
        async {
            info!(%id, "delete proposed");
            let inflight = Inflight::new(self, key.clone());

            let submitted = match self.session.ensure_authorized().await {
                Ok(from) => self.ledger.submit_delete(&from, id).await,
                Err(e) => Err(e),
            };
            let handle = match submitted {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(%id, error = %e, "delete not submitted; rolled back");
                    inflight.roll_back();
                    return Err(e);
                }
            };
            self.apply(|c| c.attach_handle(&key, handle.clone()));
            info!(%id, %handle, "delete submitted");

            match self.tracker.resolve(&handle).await {
                TxOutcome::Confirmed => {
                    self.apply(|c| c.commit_delete(&key));
                    inflight.keep();
                    info!(%id, "delete committed");
                    Ok(())
                }
                TxOutcome::Failed { reason } => {
                    warn!(%id, %handle, %reason, "delete failed; rolled back");
                    inflight.roll_back();
                    Err(Error::TransactionFailed { handle: handle.0, reason })
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Reads the ledger and merges it into the collection.
    ///
    /// # Errors
    ///
    /// Returns `Read` if the ledger cannot be read; the collection is left
    /// untouched and retrying is up to the caller.
    pub async fn refresh(&self) -> Result<Snapshot> {
        self.read_and_reconcile().await?;
        Ok(self.current_snapshot())
    }

    async fn commit_created(&self, key: &LocalKey) -> Result<Task> {
        self.read_and_reconcile().await?;
        let task = self.lock().tasks.task(key);
        match task {
            Some(task) if task.status == TaskStatus::Confirmed => Ok(task),
            _ => Err(Error::Read(format!("confirmed create {key} is missing from the ledger read"))),
        }
    }

    async fn read_and_reconcile(&self) -> Result<()> {
        let ticket = self.lock().tasks.begin_read();
        let records = self.ledger.list_items().await.map_err(|e| {
            warn!(ticket, error = %e, "ledger read failed; collection unchanged");
            e
        })?;
        let report = self.apply_if(|c| c.reconcile(&records, ticket), |r| !r.stale);
        log_report(ticket, records.len(), &report);
        Ok(())
    }

    fn apply<R>(&self, step: impl FnOnce(&mut TaskCollection) -> R) -> R {
        self.apply_if(step, |_| true)
    }

    /// Runs one step and publishes a snapshot if `changed` says it did anything.
    fn apply_if<R>(
        &self,
        step: impl FnOnce(&mut TaskCollection) -> R,
        changed: impl FnOnce(&R) -> bool,
    ) -> R {
        let mut state = self.lock();
        let result = step(&mut state.tasks);
        if changed(&result) {
            state.revision += 1;
            let snapshot = state.tasks.snapshot(state.revision);
            debug!(revision = state.revision, tasks = snapshot.tasks.len(), "state changed");
            self.snapshots.send_replace(snapshot);
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_report(ticket: u64, records: usize, report: &ReconcileReport) {
    if report.stale {
        debug!(ticket, "ignored read that started before a newer one");
        return;
    }
    debug!(ticket, records, "ledger read reconciled");
    for (key, id) in &report.adopted {
        info!(%key, %id, "create committed");
    }
    for key in &report.dropped {
        warn!(%key, "confirmed create not found in ledger read; dropped until it appears");
    }
}

/// Undoes an intent's local bookkeeping if its future is dropped mid-flight.
///
/// The remote mutation, if any, is not retracted.
struct Inflight<'a> {
    engine: &'a ReconciliationEngine,
    key: Option<LocalKey>,
}

impl<'a> Inflight<'a> {
    fn new(engine: &'a ReconciliationEngine, key: LocalKey) -> Self {
        Self { engine, key: Some(key) }
    }

    fn keep(mut self) {
        self.key = None;
    }

    fn roll_back(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(key) = self.key.take() {
            if self.engine.apply_if(|c| c.rollback(&key), |rolled| *rolled) {
                debug!(%key, "local bookkeeping rolled back");
            }
        }
    }
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
