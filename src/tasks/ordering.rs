//! Reordering over a filtered view.
//!
//! Indices come from the rendered (filtered) sequence. They are mapped back to
//! positions in the full list by task id, the task is moved there, and every
//! task in the full list gets `order = index`.

use crate::backend::{Backend, BackendError};
use crate::store::{Task, TaskPatch};

/// Result of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Cancelled drop, same position, or an index out of range.
    Unchanged,
    /// Every record was written.
    Persisted { total: usize },
    /// A write failed after `persisted` of `total` records had landed.
    Failed { persisted: usize, total: usize },
}

/// Compute the full list after moving `visible[source]` onto the slot of
/// `visible[destination]`. Returns `None` when nothing should change.
pub fn plan_move(
    tasks: &[Task],
    visible: &[&str],
    source: usize,
    destination: Option<usize>,
) -> Option<Vec<Task>> {
    let destination = destination?;
    if source == destination {
        return None;
    }
    let source_id = visible.get(source)?;
    let destination_id = visible.get(destination)?;

    let from = tasks.iter().position(|t| t.id == *source_id)?;
    let to = tasks.iter().position(|t| t.id == *destination_id)?;

    let mut moved = tasks.to_vec();
    let task = moved.remove(from);
    moved.insert(to, task);
    for (index, task) in moved.iter_mut().enumerate() {
        task.order = index as i64;
    }
    Some(moved)
}

/// Write each task's `order`, one call at a time, stopping at the first
/// failure. On failure returns how many writes landed.
pub fn persist_orders(
    backend: &dyn Backend,
    tasks: &[Task],
) -> Result<(), (usize, BackendError)> {
    for (written, task) in tasks.iter().enumerate() {
        backend
            .update_task(&task.id, &TaskPatch::order(task.order))
            .map_err(|e| (written, e))?;
    }
    Ok(())
}
