use crate::backend::Backend;
use crate::store::{ChecklistItem, ChecklistPatch};

/// Sub-items of one task, fetched when its detail panel opens.
#[derive(Debug, Clone, Default)]
pub struct Checklist {
    pub task_id: String,
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    pub fn open(backend: &dyn Backend, task_id: &str) -> Self {
        let mut checklist = Checklist {
            task_id: task_id.to_string(),
            items: Vec::new(),
        };
        checklist.refresh(backend);
        checklist
    }

    pub fn refresh(&mut self, backend: &dyn Backend) {
        match backend.list_checklist(&self.task_id) {
            Ok(items) => self.items = items,
            Err(e) => tracing::error!(task = %self.task_id, "failed to load checklist: {e}"),
        }
    }

    /// Append an item. Blank titles are ignored.
    pub fn add(&mut self, backend: &dyn Backend, title: &str) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let order = self.items.iter().map(|i| i.order).max().map_or(0, |m| m + 1);
        if let Err(e) = backend.insert_checklist_item(&self.task_id, title, order) {
            tracing::error!(task = %self.task_id, "failed to add checklist item: {e}");
            return;
        }
        self.refresh(backend);
    }

    pub fn toggle(&mut self, backend: &dyn Backend, id: &str) {
        let Some(item) = self.items.iter().find(|i| i.id == id) else {
            return;
        };
        let patch = ChecklistPatch {
            completed: Some(!item.completed),
            ..Default::default()
        };
        if let Err(e) = backend.update_checklist_item(id, &patch) {
            tracing::error!(item = %id, "failed to toggle checklist item: {e}");
            return;
        }
        self.refresh(backend);
    }

    pub fn remove(&mut self, backend: &dyn Backend, id: &str) {
        if let Err(e) = backend.delete_checklist_item(id) {
            tracing::error!(item = %id, "failed to delete checklist item: {e}");
            return;
        }
        self.refresh(backend);
    }

    /// `(done, total)`
    pub fn progress(&self) -> (usize, usize) {
        let done = self.items.iter().filter(|i| i.completed).count();
        (done, self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FlakyBackend;
    use crate::store::{NewTask, Priority, Store};

    fn setup() -> (FlakyBackend, String) {
        let store = Store::open_in_memory().unwrap();
        let session = store.sign_up("alice@example.com", "secret1").unwrap();
        let task = store
            .insert_task(
                &session.user.id,
                &NewTask {
                    title: "pack".into(),
                    description: None,
                    due_date: None,
                    priority: Priority::Medium,
                },
            )
            .unwrap();
        (FlakyBackend::new(store), task.id)
    }

    #[test]
    fn add_toggle_remove() {
        let (backend, task_id) = setup();
        let mut checklist = Checklist::open(&backend, &task_id);
        assert!(checklist.items.is_empty());

        checklist.add(&backend, "socks");
        checklist.add(&backend, "  ");
        checklist.add(&backend, "charger");
        let titles: Vec<&str> = checklist.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["socks", "charger"]);
        assert_eq!(checklist.items[1].order, 1);

        let id = checklist.items[0].id.clone();
        checklist.toggle(&backend, &id);
        assert_eq!(checklist.progress(), (1, 2));
        checklist.toggle(&backend, &id);
        assert_eq!(checklist.progress(), (0, 2));

        checklist.remove(&backend, &id);
        assert_eq!(checklist.items.len(), 1);
        assert_eq!(checklist.items[0].title, "charger");
    }

    #[test]
    fn add_after_remove_appends_last() {
        let (backend, task_id) = setup();
        let mut checklist = Checklist::open(&backend, &task_id);
        for title in ["a", "b", "c"] {
            checklist.add(&backend, title);
        }
        let first = checklist.items[0].id.clone();
        checklist.remove(&backend, &first);
        checklist.add(&backend, "d");

        let titles: Vec<&str> = checklist.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["b", "c", "d"]);
        assert_eq!(checklist.items[2].order, 3);
    }

    #[test]
    fn failed_write_leaves_items_untouched() {
        let (backend, task_id) = setup();
        let mut checklist = Checklist::open(&backend, &task_id);
        checklist.add(&backend, "socks");
        let before = checklist.items.clone();

        backend.fail_writes.set(true);
        checklist.add(&backend, "charger");
        checklist.toggle(&backend, &before[0].id);
        checklist.remove(&backend, &before[0].id);
        assert_eq!(checklist.items, before);
    }
}
