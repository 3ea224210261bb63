//! The canonical task collection and its step transitions.
//!
//! Everything here is synchronous. The engine calls one method per resume
//! point while holding the lock, so every transition is applied whole and
//! every snapshot is settled.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    LocalKey, OperationKind, OperationStatus, PendingOperation, Snapshot, Task, TaskId, TaskRecord,
    TaskStatus, TransactionHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Proposed,
    Confirmed,
    DeletionProposed,
}

#[derive(Debug, Clone)]
struct Entry {
    key: LocalKey,
    id: Option<TaskId>,
    title: String,
    body: String,
    state: RowState,
    /// The last read showed this id tombstoned.
    tombstoned: bool,
    /// Highest ledger id known when the create was proposed.
    baseline: u64,
    /// Read sequence number current when the create was confirmed.
    confirmed_after: Option<u64>,
}

impl Entry {
    fn to_task(&self) -> Task {
        Task {
            key: self.key.clone(),
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            status: if self.id.is_some() { TaskStatus::Confirmed } else { TaskStatus::Proposed },
        }
    }
}

/// What a ledger read changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Confirmed creates matched to a ledger id.
    pub adopted: Vec<(LocalKey, TaskId)>,
    /// Confirmed creates with no matching record; their rows were dropped.
    pub dropped: Vec<LocalKey>,
    /// The read started before one that was already applied and was ignored.
    pub stale: bool,
}

/// Ordered task rows plus the pending operation of every row in flight.
///
/// Every row is either a visible confirmed task or has a pending operation.
#[derive(Debug, Default)]
pub struct TaskCollection {
    entries: Vec<Entry>,
    pending: HashMap<LocalKey, PendingOperation>,
    /// Ids already adopted by a committed create.
    claimed: HashSet<TaskId>,
    /// Ids deleted locally that the ledger may not show as tombstoned yet.
    retired: HashSet<TaskId>,
    high_water: u64,
    reads_started: u64,
    last_applied_read: u64,
}

impl TaskCollection {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a proposed row and its `Preparing` create operation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if `key` is already in use.
    pub fn propose_create(
        &mut self,
        key: LocalKey,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<Task> {
        if self.entries.iter().any(|e| e.key == key) {
            return Err(Error::InvalidState(format!("local key {key} is already in use")));
        }
        let entry = Entry {
            key: key.clone(),
            id: None,
            title: title.to_string(),
            body: body.to_string(),
            state: RowState::Proposed,
            tombstoned: false,
            baseline: self.high_water,
            confirmed_after: None,
        };
        let task = entry.to_task();
        self.entries.push(entry);
        self.pending.insert(key.clone(), Self::operation(OperationKind::Create, key, None, at));
        Ok(task)
    }

    /// Hides confirmed task `id` and registers a `Preparing` delete for it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if a delete of `id` is already in flight or `id`
    /// is not a visible confirmed task.
    pub fn propose_delete(&mut self, id: TaskId, at: DateTime<Utc>) -> Result<LocalKey> {
        let in_flight = self
            .pending
            .values()
            .any(|op| op.kind == OperationKind::Delete && op.target == Some(id));
        if in_flight {
            return Err(Error::InvalidState(format!("a deletion of task {id} is already in flight")));
        }

        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.id == Some(id) && e.state == RowState::Confirmed)
        else {
            return Err(Error::InvalidState(format!("task {id} is not a confirmed task")));
        };
        entry.state = RowState::DeletionProposed;
        let key = entry.key.clone();
        self.pending
            .insert(key.clone(), Self::operation(OperationKind::Delete, key.clone(), Some(id), at));
        Ok(key)
    }

    /// Records the transaction handle of the operation at `key`.
    pub fn attach_handle(&mut self, key: &LocalKey, handle: TransactionHandle) {
        if let Some(op) = self.pending.get_mut(key) {
            op.handle = Some(handle);
            op.status = OperationStatus::Submitted;
        }
    }

    /// Marks the create at `key` as confirmed by the ledger; the row stays
    /// proposed until a read started afterwards correlates it.
    pub fn mark_confirmed(&mut self, key: &LocalKey) {
        if let Some(op) = self.pending.get_mut(key) {
            op.status = OperationStatus::Confirmed;
        }
        let after = self.reads_started;
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.key == key) {
            entry.confirmed_after = Some(after);
        }
    }

    /// Removes the deleted row for good. Later reads that still show the id
    /// alive are ignored for it until the ledger catches up.
    pub fn commit_delete(&mut self, key: &LocalKey) {
        self.pending.remove(key);
        if let Some(index) = self.entries.iter().position(|e| &e.key == key) {
            let entry = self.entries.remove(index);
            if let Some(id) = entry.id {
                self.retired.insert(id);
            }
        }
    }

    /// Undoes the operation at `key`: a proposed row disappears, a hidden row
    /// reappears (unless the ledger already tombstoned it).
    ///
    /// Returns `false` if nothing was pending at `key`.
    pub fn rollback(&mut self, key: &LocalKey) -> bool {
        let Some(op) = self.pending.remove(key) else {
            return false;
        };
        let Some(index) = self.entries.iter().position(|e| &e.key == key) else {
            return true;
        };
        match op.kind {
            OperationKind::Create => {
                self.entries.remove(index);
            }
            OperationKind::Delete if self.entries[index].tombstoned => {
                self.entries.remove(index);
            }
            OperationKind::Delete => self.entries[index].state = RowState::Confirmed,
        }
        true
    }

    /// Takes a sequence number for a read about to start.
    pub fn begin_read(&mut self) -> u64 {
        self.reads_started += 1;
        self.reads_started
    }

    /// Merges a full ledger read taken under `ticket` into the collection.
    ///
    /// Confirmed ledger state wins for every id it knows. Proposed rows survive
    /// until their own operation resolves, hidden rows stay hidden while
    /// their delete is in flight, and locally committed deletes are not
    /// revived by a read that lags behind. A record that matches an
    /// in-flight create is held back until that create is reconciled.
    pub fn reconcile(&mut self, records: &[TaskRecord], ticket: u64) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if ticket < self.last_applied_read {
            report.stale = true;
            return report;
        }
        self.last_applied_read = ticket;
        if let Some(max) = records.iter().map(|r| r.id.0).max() {
            self.high_water = self.high_water.max(max);
        }
        let alive = |id: &TaskId| records.iter().any(|r| r.id == *id && !r.deleted);
        self.retired.retain(alive);
        self.claimed.retain(alive);

        let adopted = self.correlate(records, ticket, &mut report);
        let held = self.held_for_creates(records, &adopted, &report);

        let (mut known, proposed): (Vec<Entry>, Vec<Entry>) =
            std::mem::take(&mut self.entries).into_iter().partition(|e| e.id.is_some());
        let mut proposed: Vec<Option<Entry>> = proposed
            .into_iter()
            .filter(|e| !report.dropped.contains(&e.key))
            .map(Some)
            .collect();

        let mut rebuilt = Vec::with_capacity(records.len() + proposed.len());
        for record in records {
            if self.retired.contains(&record.id) || held.contains(&record.id) {
                continue;
            }
            let existing = known.iter().position(|e| e.id == Some(record.id));
            let hidden = existing.is_some_and(|i| known[i].state == RowState::DeletionProposed);
            if record.deleted && !hidden {
                if let Some(i) = existing {
                    known.remove(i);
                }
                continue;
            }

            let entry = if let Some(key) = adopted.get(&record.id) {
                if let Some(i) = existing {
                    known.remove(i);
                }
                proposed
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|e| &e.key == key))
                    .and_then(Option::take)
                    .map(|mut e| {
                        e.id = Some(record.id);
                        e.state = RowState::Confirmed;
                        e
                    })
            } else {
                existing.map(|i| known.remove(i))
            };

            let mut entry = entry.unwrap_or_else(|| Entry {
                key: LocalKey::for_ledger_id(record.id),
                id: Some(record.id),
                title: String::new(),
                body: String::new(),
                state: RowState::Confirmed,
                tombstoned: false,
                baseline: 0,
                confirmed_after: None,
            });
            entry.title.clone_from(&record.title);
            entry.body.clone_from(&record.body);
            entry.tombstoned = record.deleted;
            rebuilt.push(entry);
        }

        // Rows the read no longer lists survive only while their delete is in flight.
        rebuilt.extend(known.into_iter().filter(|e| e.state == RowState::DeletionProposed));
        rebuilt.extend(proposed.into_iter().flatten());
        self.entries = rebuilt;
        report
    }

    /// Matches confirmed creates to ledger ids and retires their operations.
    ///
    /// A candidate is a live record with the same title and body, an id above
    /// the highest id known at proposal, not claimed by another create and not
    /// being deleted. The newest proposal takes the highest candidate.
    fn correlate(
        &mut self,
        records: &[TaskRecord],
        ticket: u64,
        report: &mut ReconcileReport,
    ) -> HashMap<TaskId, LocalKey> {
        let deleting: HashSet<TaskId> = self
            .entries
            .iter()
            .filter(|e| e.state == RowState::DeletionProposed)
            .filter_map(|e| e.id)
            .collect();
        let confirmed: Vec<(LocalKey, String, String, u64)> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.state == RowState::Proposed)
            .filter(|e| e.confirmed_after.is_some_and(|after| ticket > after))
            .map(|e| (e.key.clone(), e.title.clone(), e.body.clone(), e.baseline))
            .collect();

        let mut adopted = HashMap::new();
        for (key, title, body, baseline) in confirmed {
            let candidate = records
                .iter()
                .filter(|r| !r.deleted && r.title == title && r.body == body && r.id.0 > baseline)
                .map(|r| r.id)
                .filter(|id| {
                    !self.claimed.contains(id) && !adopted.contains_key(id) && !deleting.contains(id)
                })
                .max();
            self.pending.remove(&key);
            match candidate {
                Some(id) => {
                    self.claimed.insert(id);
                    adopted.insert(id, key.clone());
                    report.adopted.push((key, id));
                }
                None => report.dropped.push(key),
            }
        }
        adopted
    }

    /// Live records that most likely belong to a create still in flight.
    ///
    /// They stay out of the view so the proposed row is not shown twice; the
    /// create adopts one of them once its confirmation is reconciled. Each
    /// in-flight create holds at most one record, picked the way
    /// [`TaskCollection::correlate`] would pick it.
    fn held_for_creates(
        &self,
        records: &[TaskRecord],
        adopted: &HashMap<TaskId, LocalKey>,
        report: &ReconcileReport,
    ) -> HashSet<TaskId> {
        let mut held = HashSet::new();
        let in_flight = self.entries.iter().rev().filter(|e| {
            e.state == RowState::Proposed
                && !report.dropped.contains(&e.key)
                && !report.adopted.iter().any(|(key, _)| key == &e.key)
        });
        for entry in in_flight {
            let candidate = records
                .iter()
                .filter(|r| {
                    !r.deleted && r.title == entry.title && r.body == entry.body && r.id.0 > entry.baseline
                })
                .map(|r| r.id)
                .filter(|id| {
                    !self.claimed.contains(id)
                        && !adopted.contains_key(id)
                        && !held.contains(id)
                        && !self.entries.iter().any(|e| e.id == Some(*id))
                })
                .max();
            if let Some(id) = candidate {
                held.insert(id);
            }
        }
        held
    }

    /// The row at `key`, if it is still in the collection.
    #[must_use]
    pub fn task(&self, key: &LocalKey) -> Option<Task> {
        self.entries.iter().find(|e| &e.key == key).map(Entry::to_task)
    }

    /// The pending operation at `key`.
    #[must_use]
    pub fn pending(&self, key: &LocalKey) -> Option<&PendingOperation> {
        self.pending.get(key)
    }

    /// A settled view at `revision`.
    #[must_use]
    pub fn snapshot(&self, revision: u64) -> Snapshot {
        let mut pending: Vec<PendingOperation> = self.pending.values().cloned().collect();
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.key.cmp(&b.key)));
        Snapshot {
            revision,
            tasks: self
                .entries
                .iter()
                .filter(|e| e.state != RowState::DeletionProposed)
                .map(Entry::to_task)
                .collect(),
            deleting: self
                .entries
                .iter()
                .filter(|e| e.state == RowState::DeletionProposed)
                .filter_map(|e| e.id)
                .collect(),
            pending,
        }
    }

    fn operation(
        kind: OperationKind,
        key: LocalKey,
        target: Option<TaskId>,
        at: DateTime<Utc>,
    ) -> PendingOperation {
        PendingOperation {
            kind,
            key,
            target,
            status: OperationStatus::Preparing,
            handle: None,
            submitted_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn record(id: u64, title: &str, body: &str, deleted: bool) -> TaskRecord {
        TaskRecord { id: TaskId(id), title: title.into(), body: body.into(), deleted }
    }

    fn key(raw: &str) -> LocalKey {
        LocalKey::new(raw)
    }

    fn read(c: &mut TaskCollection, records: &[TaskRecord]) -> ReconcileReport {
        let ticket = c.begin_read();
        c.reconcile(records, ticket)
    }

    fn titles(c: &TaskCollection) -> Vec<String> {
        c.snapshot(0).tasks.into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn tombstones_never_reach_the_view() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(1, "a", "x", false), record(2, "b", "x", true), record(3, "c", "x", false)]);
        assert_eq!(titles(&c), ["a", "c"]);
    }

    #[test]
    fn proposed_rows_survive_reads_and_follow_ledger_rows() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(1, "a", "x", false)]);
        c.propose_create(key("k1"), "new", "y", at()).unwrap();

        read(&mut c, &[record(1, "a", "x", false), record(2, "other", "z", false)]);

        let snap = c.snapshot(0);
        assert_eq!(titles(&c), ["a", "other", "new"]);
        assert_eq!(snap.tasks[2].status, TaskStatus::Proposed);
        assert_eq!(snap.pending.len(), 1);
    }

    #[test]
    fn confirmed_create_adopts_the_new_id_and_keeps_its_key() {
        let mut c = TaskCollection::new();
        read(&mut c, &[]);
        c.propose_create(key("k1"), "Buy milk", "2%", at()).unwrap();
        c.attach_handle(&key("k1"), TransactionHandle("0x1".into()));
        c.mark_confirmed(&key("k1"));

        let report = read(&mut c, &[record(7, "Buy milk", "2%", false)]);

        assert_eq!(report.adopted, vec![(key("k1"), TaskId(7))]);
        let task = c.task(&key("k1")).unwrap();
        assert_eq!(task.id, Some(TaskId(7)));
        assert_eq!(task.status, TaskStatus::Confirmed);
        assert!(c.pending(&key("k1")).is_none());
        assert_eq!(c.snapshot(0).tasks.len(), 1);
    }

    #[test]
    fn correlation_ignores_ids_known_before_the_proposal() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(3, "same", "same", false)]);
        c.propose_create(key("k1"), "same", "same", at()).unwrap();
        c.mark_confirmed(&key("k1"));

        let report = read(&mut c, &[record(3, "same", "same", false), record(9, "same", "same", false)]);

        assert_eq!(report.adopted, vec![(key("k1"), TaskId(9))]);
        assert_eq!(c.task(&LocalKey::for_ledger_id(TaskId(3))).unwrap().id, Some(TaskId(3)));
    }

    #[test]
    fn identical_creates_take_distinct_ids() {
        let mut c = TaskCollection::new();
        read(&mut c, &[]);
        for k in ["k1", "k2"] {
            c.propose_create(key(k), "dup", "dup", at()).unwrap();
            c.mark_confirmed(&key(k));
        }

        read(&mut c, &[record(1, "dup", "dup", false), record(2, "dup", "dup", false)]);

        assert_eq!(c.task(&key("k2")).unwrap().id, Some(TaskId(2)));
        assert_eq!(c.task(&key("k1")).unwrap().id, Some(TaskId(1)));
        assert_eq!(c.snapshot(0).tasks.len(), 2);
    }

    #[test]
    fn unmatched_confirmed_create_is_dropped() {
        let mut c = TaskCollection::new();
        read(&mut c, &[]);
        c.propose_create(key("k1"), "lost", "x", at()).unwrap();
        c.mark_confirmed(&key("k1"));

        let report = read(&mut c, &[]);

        assert_eq!(report.dropped, vec![key("k1")]);
        assert!(c.task(&key("k1")).is_none());
        assert!(c.snapshot(0).pending.is_empty());
    }

    #[test]
    fn read_started_before_confirmation_does_not_correlate() {
        let mut c = TaskCollection::new();
        c.propose_create(key("k1"), "t", "b", at()).unwrap();
        let early = c.begin_read();
        c.mark_confirmed(&key("k1"));

        let report = c.reconcile(&[], early);

        assert!(report.dropped.is_empty());
        assert_eq!(c.task(&key("k1")).unwrap().status, TaskStatus::Proposed);
    }

    #[test]
    fn mined_create_is_not_shown_twice_before_its_receipt_is_seen() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(1, "a", "x", false)]);
        c.propose_create(key("k1"), "Buy milk", "2%", at()).unwrap();
        c.attach_handle(&key("k1"), TransactionHandle("0x1".into()));

        let mined = [record(1, "a", "x", false), record(2, "Buy milk", "2%", false)];
        read(&mut c, &mined);

        let snap = c.snapshot(0);
        assert_eq!(titles(&c), ["a", "Buy milk"]);
        assert_eq!(snap.tasks[1].key, key("k1"));
        assert_eq!(snap.tasks[1].status, TaskStatus::Proposed);
        assert!(c.propose_delete(TaskId(2), at()).is_err());

        c.mark_confirmed(&key("k1"));
        let report = read(&mut c, &mined);
        assert_eq!(report.adopted, vec![(key("k1"), TaskId(2))]);
        assert_eq!(c.snapshot(0).tasks.len(), 2);
    }

    #[test]
    fn held_record_appears_once_the_create_is_rolled_back() {
        let mut c = TaskCollection::new();
        read(&mut c, &[]);
        c.propose_create(key("k1"), "same", "same", at()).unwrap();
        let elsewhere = [record(1, "same", "same", false)];
        read(&mut c, &elsewhere);
        assert_eq!(c.snapshot(0).tasks.len(), 1);

        c.rollback(&key("k1"));
        read(&mut c, &elsewhere);

        let snap = c.snapshot(0);
        assert_eq!(snap.tasks.len(), 1);
        assert_eq!(snap.tasks[0].key, LocalKey::for_ledger_id(TaskId(1)));
    }

    #[test]
    fn claimed_ids_are_forgotten_once_tombstoned() {
        let mut c = TaskCollection::new();
        read(&mut c, &[]);
        c.propose_create(key("k1"), "t", "b", at()).unwrap();
        c.mark_confirmed(&key("k1"));
        read(&mut c, &[record(1, "t", "b", false)]);
        assert!(c.claimed.contains(&TaskId(1)));

        read(&mut c, &[record(1, "t", "b", false)]);
        assert!(c.claimed.contains(&TaskId(1)));

        read(&mut c, &[record(1, "t", "b", true)]);
        assert!(c.claimed.is_empty());
    }

    #[test]
    fn stale_read_is_ignored() {
        let mut c = TaskCollection::new();
        let old = c.begin_read();
        let new = c.begin_read();
        c.reconcile(&[record(1, "a", "x", false)], new);

        let report = c.reconcile(&[], old);

        assert!(report.stale);
        assert_eq!(titles(&c), ["a"]);
    }

    #[test]
    fn second_delete_of_the_same_id_is_rejected() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(7, "a", "x", false)]);

        c.propose_delete(TaskId(7), at()).unwrap();
        let err = c.propose_delete(TaskId(7), at()).unwrap_err();

        assert!(matches!(err, Error::InvalidState(_)));
        let snap = c.snapshot(0);
        assert!(snap.tasks.is_empty());
        assert_eq!(snap.deleting, vec![TaskId(7)]);
    }

    #[test]
    fn delete_requires_a_visible_confirmed_task() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(2, "gone", "x", true)]);
        assert!(matches!(c.propose_delete(TaskId(2), at()), Err(Error::InvalidState(_))));
        assert!(matches!(c.propose_delete(TaskId(99), at()), Err(Error::InvalidState(_))));
    }

    #[test]
    fn hidden_row_survives_reads_until_its_delete_resolves() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(7, "a", "x", false)]);
        let k = c.propose_delete(TaskId(7), at()).unwrap();

        read(&mut c, &[record(7, "a", "x", false)]);
        assert_eq!(c.snapshot(0).deleting, vec![TaskId(7)]);

        assert!(c.rollback(&k));
        assert_eq!(c.snapshot(0).task(TaskId(7)).unwrap().title, "a");
    }

    #[test]
    fn committed_delete_is_not_revived_by_a_lagging_read() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(7, "a", "x", false)]);
        let k = c.propose_delete(TaskId(7), at()).unwrap();
        c.commit_delete(&k);

        read(&mut c, &[record(7, "a", "x", false)]);
        assert!(c.snapshot(0).is_empty());

        read(&mut c, &[record(7, "a", "x", true)]);
        read(&mut c, &[record(7, "a", "x", true)]);
        assert!(c.snapshot(0).is_empty());
    }

    #[test]
    fn failed_delete_of_a_tombstoned_task_leaves_it_removed() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(7, "a", "x", false)]);
        let k = c.propose_delete(TaskId(7), at()).unwrap();
        read(&mut c, &[record(7, "a", "x", true)]);

        c.rollback(&k);

        let snap = c.snapshot(0);
        assert!(snap.tasks.is_empty());
        assert!(snap.deleting.is_empty());
    }

    #[test]
    fn rollback_of_a_create_restores_the_previous_view() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(1, "a", "x", false)]);
        let before = c.snapshot(0);

        c.propose_create(key("k1"), "t", "b", at()).unwrap();
        assert!(c.rollback(&key("k1")));

        assert_eq!(c.snapshot(0), before);
        assert!(!c.rollback(&key("k1")));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut c = TaskCollection::new();
        c.propose_create(key("k1"), "t", "b", at()).unwrap();
        assert!(c.propose_create(key("k1"), "t", "b", at()).is_err());
    }

    #[test]
    fn ledger_fields_win_over_local_ones() {
        let mut c = TaskCollection::new();
        read(&mut c, &[record(1, "old", "x", false)]);
        read(&mut c, &[record(1, "new", "y", false)]);
        let task = &c.snapshot(0).tasks[0];
        assert_eq!((task.title.as_str(), task.body.as_str()), ("new", "y"));
        assert_eq!(task.key, LocalKey::for_ledger_id(TaskId(1)));
    }
}
