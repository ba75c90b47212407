use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;
use uuid::Uuid;

use super::Store;
use super::models::{ChecklistItem, ChecklistPatch, NewTask, Priority, Task, TaskPatch};
use crate::backend::{BackendError, BackendResult};

const TASK_COLUMNS: &str = r#"id, user_id, title, description, due_date, priority, completed,
                    "order", created_at, updated_at"#;

fn parse_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: i64 = row.get(5)?;
    let completed: i64 = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        due_date: parse_timestamp(4, row.get(4)?)?,
        priority: Priority::from_ordinal(priority),
        completed: completed != 0,
        order: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn checklist_from_row(row: &Row<'_>) -> rusqlite::Result<ChecklistItem> {
    let completed: i64 = row.get(3)?;
    Ok(ChecklistItem {
        id: row.get(0)?,
        task_id: row.get(1)?,
        title: row.get(2)?,
        completed: completed != 0,
        order: row.get(4)?,
    })
}

impl Store {
    // ── Tasks ──

    pub fn create_task(&self, user_id: &str, task: &NewTask) -> BackendResult<Task> {
        let id = Uuid::new_v4().to_string();
        // New tasks go to the end of the user's list.
        self.conn.execute(
            r#"INSERT INTO tasks (id, user_id, title, description, due_date, priority, "order")
               SELECT ?1, ?2, ?3, ?4, ?5, ?6, COALESCE(MAX("order") + 1, 0)
               FROM tasks WHERE user_id = ?2"#,
            params![
                id,
                user_id,
                task.title,
                task.description,
                task.due_date.map(|d| d.to_rfc3339()),
                task.priority.as_ordinal(),
            ],
        )?;
        self.find_task(&id)?
            .ok_or_else(|| BackendError::not_found("task", &id))
    }

    pub fn find_task(&self, id: &str) -> BackendResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn list_tasks_for_user(&self, user_id: &str) -> BackendResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1
               ORDER BY "order", created_at, id"#
        ))?;
        let tasks = stmt
            .query_map(params![user_id], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn task_owner(&self, id: &str) -> BackendResult<String> {
        self.conn
            .query_row(
                "SELECT user_id FROM tasks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| BackendError::not_found("task", id))
    }

    pub fn apply_task_patch(&self, id: &str, patch: &TaskPatch) -> BackendResult<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(ref title) = patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(ref description) = patch.description {
            sets.push("description = ?");
            values.push(description.clone().map_or(Value::Null, Value::Text));
        }
        if let Some(due) = patch.due_date {
            sets.push("due_date = ?");
            values.push(due.map_or(Value::Null, |d| Value::Text(d.to_rfc3339())));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Value::Integer(priority.as_ordinal()));
        }
        if let Some(completed) = patch.completed {
            sets.push("completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(order) = patch.order {
            sets.push(r#""order" = ?"#);
            values.push(Value::Integer(order));
        }
        if sets.is_empty() {
            return Ok(());
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(Utc::now().to_rfc3339()));
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(BackendError::not_found("task", id));
        }
        Ok(())
    }

    /// Checklist rows go with the task through `ON DELETE CASCADE`.
    pub fn remove_task(&self, id: &str) -> BackendResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(BackendError::not_found("task", id));
        }
        Ok(())
    }

    // ── Checklist items ──

    pub fn create_checklist_item(
        &self,
        task_id: &str,
        title: &str,
        order: i64,
    ) -> BackendResult<ChecklistItem> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            r#"INSERT INTO task_checklists (id, task_id, title, "order") VALUES (?1, ?2, ?3, ?4)"#,
            params![id, task_id, title, order],
        )?;
        let item = self.conn.query_row(
            r#"SELECT id, task_id, title, completed, "order" FROM task_checklists WHERE id = ?1"#,
            params![id],
            checklist_from_row,
        )?;
        Ok(item)
    }

    pub fn list_checklist_for_task(&self, task_id: &str) -> BackendResult<Vec<ChecklistItem>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, task_id, title, completed, "order"
               FROM task_checklists WHERE task_id = ?1
               ORDER BY "order", created_at, id"#,
        )?;
        let items = stmt
            .query_map(params![task_id], checklist_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn checklist_owner(&self, id: &str) -> BackendResult<String> {
        self.conn
            .query_row(
                "SELECT t.user_id FROM task_checklists c JOIN tasks t ON t.id = c.task_id
                 WHERE c.id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| BackendError::not_found("checklist item", id))
    }

    pub fn apply_checklist_patch(&self, id: &str, patch: &ChecklistPatch) -> BackendResult<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(ref title) = patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(completed) = patch.completed {
            sets.push("completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(order) = patch.order {
            sets.push(r#""order" = ?"#);
            values.push(Value::Integer(order));
        }
        if sets.is_empty() {
            return Ok(());
        }
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE task_checklists SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(BackendError::not_found("checklist item", id));
        }
        Ok(())
    }

    pub fn remove_checklist_item(&self, id: &str) -> BackendResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_checklists WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(BackendError::not_found("checklist item", id));
        }
        Ok(())
    }

    // ── Stats ──

    pub fn task_stats(&self, user_id: &str) -> BackendResult<TaskStats> {
        let (total, completed): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(TaskStats {
            total: total as usize,
            completed: completed as usize,
        })
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        TaskStats {
            total: tasks.len(),
            completed: tasks.iter().filter(|t| t.completed).count(),
        }
    }

    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    pub fn completion_pct(&self) -> u16 {
        if self.total == 0 {
            0
        } else {
            ((self.completed * 100) / self.total) as u16
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    fn store_with_user() -> (Store, String) {
        let store = Store::open_in_memory().unwrap();
        let session = store.sign_up("test@example.com", "hunter22").unwrap();
        (store, session.user.id)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
        }
    }

    #[test]
    fn test_create_and_get_task() {
        let (store, user) = store_with_user();
        let due = Utc::now() + chrono::Duration::days(2);
        let task = store
            .create_task(
                &user,
                &NewTask {
                    title: "write report".into(),
                    description: Some("quarterly".into()),
                    due_date: Some(due),
                    priority: Priority::High,
                },
            )
            .unwrap();

        assert_eq!(task.title, "write report");
        assert_eq!(task.description.as_deref(), Some("quarterly"));
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
        assert_eq!(task.user_id, user);
        // RFC 3339 keeps sub-second precision.
        assert_eq!(task.due_date, Some(due));

        let fetched = store.find_task(&task.id).unwrap().unwrap();
        assert_eq!(fetched, task);
    }

    #[test]
    fn test_new_tasks_append_to_end() {
        let (store, user) = store_with_user();
        let a = store.create_task(&user, &new_task("a")).unwrap();
        let b = store.create_task(&user, &new_task("b")).unwrap();
        let c = store.create_task(&user, &new_task("c")).unwrap();
        assert_eq!((a.order, b.order, c.order), (0, 1, 2));
    }

    #[test]
    fn test_order_is_per_user() {
        let (store, alice) = store_with_user();
        let bob = store.sign_up("bob@example.com", "hunter22").unwrap().user.id;
        store.create_task(&alice, &new_task("a1")).unwrap();
        store.create_task(&alice, &new_task("a2")).unwrap();
        let b1 = store.create_task(&bob, &new_task("b1")).unwrap();
        assert_eq!(b1.order, 0);
        assert_eq!(store.list_tasks_for_user(&alice).unwrap().len(), 2);
        assert_eq!(store.list_tasks_for_user(&bob).unwrap().len(), 1);
    }

    #[test]
    fn test_list_is_ordered_by_order_column() {
        let (store, user) = store_with_user();
        let a = store.create_task(&user, &new_task("a")).unwrap();
        let b = store.create_task(&user, &new_task("b")).unwrap();
        store.apply_task_patch(&a.id, &TaskPatch::order(5)).unwrap();
        store.apply_task_patch(&b.id, &TaskPatch::order(1)).unwrap();

        let titles: Vec<String> = store
            .list_tasks_for_user(&user)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn test_patch_touches_only_given_fields() {
        let (store, user) = store_with_user();
        let task = store.create_task(&user, &new_task("keep me")).unwrap();
        store
            .apply_task_patch(&task.id, &TaskPatch::completed(true))
            .unwrap();
        let after = store.find_task(&task.id).unwrap().unwrap();
        assert!(after.completed);
        assert_eq!(after.title, task.title);
        assert_eq!(after.order, task.order);
        assert_eq!(after.priority, task.priority);
    }

    #[test]
    fn test_patch_can_clear_optional_fields() {
        let (store, user) = store_with_user();
        let task = store
            .create_task(
                &user,
                &NewTask {
                    title: "t".into(),
                    description: Some("d".into()),
                    due_date: Some(Utc::now()),
                    priority: Priority::Low,
                },
            )
            .unwrap();
        store
            .apply_task_patch(
                &task.id,
                &TaskPatch {
                    description: Some(None),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        let after = store.find_task(&task.id).unwrap().unwrap();
        assert!(after.description.is_none());
        assert!(after.due_date.is_none());
    }

    #[test]
    fn test_delete_task_removes_checklist() {
        let (store, user) = store_with_user();
        let task = store.create_task(&user, &new_task("doomed")).unwrap();
        store.create_checklist_item(&task.id, "step", 0).unwrap();

        store.remove_task(&task.id).unwrap();
        assert!(store.find_task(&task.id).unwrap().is_none());
        assert!(store.list_checklist_for_task(&task.id).unwrap().is_empty());
        assert!(matches!(
            store.remove_task(&task.id),
            Err(BackendError::NotFound { .. })
        ));
    }

    #[test]
    fn test_checklist_crud() {
        let (store, user) = store_with_user();
        let task = store.create_task(&user, &new_task("parent")).unwrap();
        let second = store.create_checklist_item(&task.id, "second", 1).unwrap();
        let first = store.create_checklist_item(&task.id, "first", 0).unwrap();

        let items = store.list_checklist_for_task(&task.id).unwrap();
        assert_eq!(items, vec![first.clone(), second.clone()]);

        store
            .apply_checklist_patch(
                &first.id,
                &ChecklistPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        let items = store.list_checklist_for_task(&task.id).unwrap();
        assert!(items[0].completed);
        assert!(!items[1].completed);

        store.remove_checklist_item(&second.id).unwrap();
        assert_eq!(store.list_checklist_for_task(&task.id).unwrap().len(), 1);
        assert_eq!(store.checklist_owner(&first.id).unwrap(), user);
    }

    #[test]
    fn test_task_stats() {
        let (store, user) = store_with_user();
        let a = store.create_task(&user, &new_task("a")).unwrap();
        store.create_task(&user, &new_task("b")).unwrap();
        store.create_task(&user, &new_task("c")).unwrap();
        store
            .apply_task_patch(&a.id, &TaskPatch::completed(true))
            .unwrap();

        let stats = store.task_stats(&user).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending(), 2);
        assert_eq!(stats.completion_pct(), 33);

        let tasks = store.list_tasks(&user).unwrap();
        assert_eq!(TaskStats::from_tasks(&tasks), stats);
    }

    #[test]
    fn test_stats_empty() {
        let (store, user) = store_with_user();
        let stats = store.task_stats(&user).unwrap();
        assert_eq!(stats, TaskStats::default());
        assert_eq!(stats.completion_pct(), 0);
    }
}
