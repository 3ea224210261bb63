//! Text rendering of engine snapshots.

use std::fmt::Write as _;
use std::io::Write;

use tokio::sync::watch;

use crate::model::{OperationKind, Snapshot, TaskStatus};

/// Renders the active view, one task per line, then in-flight deletions.
#[must_use]
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if snapshot.tasks.is_empty() && snapshot.deleting.is_empty() {
        out.push_str("No tasks.\n");
        return out;
    }

    for task in &snapshot.tasks {
        let label = match (task.status, task.id) {
            (TaskStatus::Confirmed, Some(id)) => format!("#{id}"),
            _ => "(pending)".to_string(),
        };
        let _ = writeln!(out, "{label:<10}{} - {}", task.title, task.body);
    }
    for id in &snapshot.deleting {
        let _ = writeln!(out, "deleting #{id}");
    }
    out
}

/// One-line summary of what is in flight, e.g. `adding 1, deleting 1`.
#[must_use]
pub fn activity(snapshot: &Snapshot) -> Option<String> {
    let in_flight = |kind| snapshot.pending.iter().filter(|op| op.kind == kind).count();
    let (adding, deleting) = (in_flight(OperationKind::Create), in_flight(OperationKind::Delete));
    match (adding, deleting) {
        (0, 0) => None,
        (a, 0) => Some(format!("adding {a}")),
        (0, d) => Some(format!("deleting {d}")),
        (a, d) => Some(format!("adding {a}, deleting {d}")),
    }
}

/// Writes a rendering for every snapshot published while it runs.
pub struct Follower<W> {
    updates: watch::Receiver<Snapshot>,
    out: W,
}

impl<W: Write> Follower<W> {
    /// Follows `updates`, writing to `out`.
    pub fn new(updates: watch::Receiver<Snapshot>, out: W) -> Self {
        Self { updates, out }
    }

    /// Renders each change until the engine is dropped.
    ///
    /// Intermediate snapshots may be skipped; the latest one is always rendered.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn run(mut self) -> std::io::Result<W> {
        while self.updates.changed().await.is_ok() {
            let snapshot = self.updates.borrow_and_update().clone();
            self.write(&snapshot)?;
        }
        Ok(self.out)
    }

    fn write(&mut self, snapshot: &Snapshot) -> std::io::Result<()> {
        match activity(snapshot) {
            Some(line) => writeln!(self.out, "[{}] {line}", snapshot.revision)?,
            None => writeln!(self.out, "[{}]", snapshot.revision)?,
        }
        self.out.write_all(render(snapshot).as_bytes())?;
        self.out.flush()
    }
}
