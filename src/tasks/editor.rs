use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::store::{NewTask, Priority, Task, TaskPatch};

const DUE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
/// Format used when pre-filling the editor.
pub const DUE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    DueDate,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::DueDate => "due date",
        }
    }
}

/// Every problem found in a draft, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<(Field, String)>,
}

fn summarize(errors: &[(Field, String)]) -> String {
    errors
        .iter()
        .map(|(_, msg)| msg.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, msg)| msg.as_str())
    }
}

/// Raw editor input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskDraft {
    /// Pre-fill from an existing task for editing.
    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date: task.due_date.map(format_due),
            priority: Some(task.priority),
        }
    }

    /// Validate for creation.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewTask, ValidationErrors> {
        let fields = self.check(now, None)?;
        Ok(NewTask {
            title: fields.title,
            description: Some(fields.description),
            due_date: fields.due_date,
            priority: fields.priority,
        })
    }

    /// Validate an edit of `original`. A due date left as it was may be in
    /// the past.
    pub fn validate_edit(
        &self,
        now: DateTime<Utc>,
        original: &Task,
    ) -> Result<TaskPatch, ValidationErrors> {
        let fields = self.check(now, Some(original))?;
        Ok(TaskPatch {
            title: Some(fields.title),
            description: Some(Some(fields.description)),
            due_date: Some(fields.due_date),
            priority: Some(fields.priority),
            ..Default::default()
        })
    }

    fn check(&self, now: DateTime<Utc>, original: Option<&Task>) -> Result<Checked, ValidationErrors> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push((Field::Title, "Title is required".to_string()));
        }
        let description = self.description.trim();
        if description.is_empty() {
            errors.push((Field::Description, "Description is required".to_string()));
        }

        let raw_due = self.due_date.as_deref().map(str::trim).unwrap_or_default();
        let unchanged = original
            .and_then(|t| t.due_date)
            .filter(|due| format_due(*due) == raw_due);
        let due_date = match unchanged {
            Some(due) => Some(due),
            None => match parse_due(raw_due) {
                Ok(Some(due)) if due < now => {
                    errors.push((Field::DueDate, "Due date cannot be in the past".to_string()));
                    None
                }
                Ok(due) => due,
                Err(msg) => {
                    errors.push((Field::DueDate, msg));
                    None
                }
            },
        };

        if !errors.is_empty() {
            return Err(ValidationErrors { errors });
        }
        Ok(Checked {
            title: title.to_string(),
            description: description.to_string(),
            due_date,
            priority: self.priority.unwrap_or_default(),
        })
    }
}

struct Checked {
    title: String,
    description: String,
    due_date: Option<DateTime<Utc>>,
    priority: Priority,
}

pub fn format_due(due: DateTime<Utc>) -> String {
    due.with_timezone(&Local)
        .format(DUE_DISPLAY_FORMAT)
        .to_string()
}

/// Parse a due date. Empty input means no due date.
///
/// Accepts RFC 3339, or `YYYY-MM-DD HH:MM` / `YYYY-MM-DDTHH:MM` in local time.
pub fn parse_due(input: &str) -> Result<Option<DateTime<Utc>>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in DUE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            // Skipped local times (DST gaps) have no mapping.
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .ok_or_else(|| format!("'{input}' does not exist in the local time zone"));
        }
    }
    Err(format!(
        "Unrecognised due date '{input}' (use YYYY-MM-DD HH:MM)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn draft(title: &str, description: &str, due: Option<&str>) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            description: description.into(),
            due_date: due.map(String::from),
            priority: None,
        }
    }

    #[test]
    fn valid_draft_defaults_to_medium() {
        let now = Utc::now();
        let due = format_due(now + Duration::days(3));
        let task = draft("  Plan trip ", "book flights", Some(&due))
            .validate(now)
            .unwrap();
        assert_eq!(task.title, "Plan trip");
        assert_eq!(task.description.as_deref(), Some("book flights"));
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.due_date.is_some());
    }

    #[test]
    fn all_field_errors_are_collected() {
        let now = Utc::now();
        let errors = draft(" ", "", Some("tomorrow-ish")).validate(now).unwrap_err();
        assert_eq!(errors.errors.len(), 3);
        assert_eq!(errors.message_for(Field::Title), Some("Title is required"));
        assert!(errors.message_for(Field::Description).is_some());
        assert!(
            errors
                .message_for(Field::DueDate)
                .unwrap()
                .contains("Unrecognised")
        );
    }

    #[test]
    fn past_due_date_is_rejected() {
        let now = Utc::now();
        let past = (now - Duration::hours(2)).to_rfc3339();
        let errors = draft("t", "d", Some(&past)).validate(now).unwrap_err();
        assert_eq!(
            errors.message_for(Field::DueDate),
            Some("Due date cannot be in the past")
        );
        assert!(errors.to_string().contains("past"));
    }

    #[test]
    fn missing_due_date_is_fine() {
        let now = Utc::now();
        let task = draft("t", "d", None).validate(now).unwrap();
        assert!(task.due_date.is_none());
        let task = draft("t", "d", Some("  ")).validate(now).unwrap();
        assert!(task.due_date.is_none());
    }

    #[test]
    fn accepted_formats() {
        assert!(parse_due("2030-01-02 09:30").unwrap().is_some());
        assert!(parse_due("2030-01-02T09:30").unwrap().is_some());
        let exact = parse_due("2030-01-02T09:30:00Z").unwrap().unwrap();
        assert_eq!(exact.to_rfc3339(), "2030-01-02T09:30:00+00:00");
        assert!(parse_due("02/01/2030").is_err());
    }

    #[test]
    fn unchanged_past_due_date_is_kept_on_edit() {
        let now = Utc::now();
        let past = now - Duration::days(2);
        let original = Task {
            id: "t1".into(),
            user_id: "u".into(),
            title: "old".into(),
            description: Some("desc".into()),
            due_date: Some(past),
            priority: Priority::High,
            completed: false,
            order: 0,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let mut edit = TaskDraft::from_task(&original);
        edit.title = "renamed".into();
        let patch = edit.validate_edit(now, &original).unwrap();
        assert_eq!(patch.title.as_deref(), Some("renamed"));
        assert_eq!(patch.due_date, Some(Some(past)));
        assert_eq!(patch.priority, Some(Priority::High));
        assert!(patch.completed.is_none());
        assert!(patch.order.is_none());

        // Moving it to a different past date is still an error.
        edit.due_date = Some(format_due(past - Duration::days(1)));
        assert!(edit.validate_edit(now, &original).is_err());
    }

    #[test]
    fn clearing_due_date_on_edit() {
        let now = Utc::now();
        let original = Task {
            id: "t1".into(),
            user_id: "u".into(),
            title: "t".into(),
            description: Some("d".into()),
            due_date: Some(now + Duration::days(1)),
            priority: Priority::Low,
            completed: true,
            order: 4,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let mut edit = TaskDraft::from_task(&original);
        edit.due_date = None;
        let patch = edit.validate_edit(now, &original).unwrap();
        assert_eq!(patch.due_date, Some(None));
    }

    fn non_blank() -> impl Strategy<Value = String> {
        any::<String>().prop_filter("needs a visible character", |s| !s.trim().is_empty())
    }

    proptest! {
        #[test]
        fn any_non_blank_text_yields_a_medium_task(title in non_blank(), description in non_blank()) {
            let task = draft(&title, &description, None).validate(Utc::now()).unwrap();
            prop_assert_eq!(task.title, title.trim());
            prop_assert_eq!(task.description.as_deref(), Some(description.trim()));
            prop_assert_eq!(task.priority, Priority::Medium);
            prop_assert!(task.due_date.is_none());
        }

        #[test]
        fn blank_title_is_always_rejected(padding in "[ \t\n]{0,8}", description in non_blank()) {
            let errors = draft(&padding, &description, None).validate(Utc::now()).unwrap_err();
            prop_assert!(errors.message_for(Field::Title).is_some());
        }
    }
}
