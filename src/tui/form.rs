use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::store::{Priority, Task};
use crate::tasks::{Field, TaskDraft, ValidationErrors};

// ── Single-line text input ────────────────────────────────────────────

/// Editable buffer with a byte-offset cursor kept on a char boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        TextInput { value, cursor }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    fn prev_boundary(&self) -> usize {
        self.value[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.value[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }

    /// Start of the word left of the cursor.
    fn word_left(&self) -> usize {
        let trimmed = self.value[..self.cursor].trim_end();
        trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8())
    }

    /// Start of the next word right of the cursor.
    fn word_right(&self) -> usize {
        let rest = &self.value[self.cursor..];
        let Some(gap) = rest.find(char::is_whitespace) else {
            return self.value.len();
        };
        rest[gap..]
            .find(|c: char| !c.is_whitespace())
            .map_or(self.value.len(), |next| self.cursor + gap + next)
    }

    /// Apply an editing key. Returns `true` when the key was consumed.
    pub fn handle(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.cursor = self.cursor.min(self.value.len());
        let alt = modifiers.contains(KeyModifiers::ALT);
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        match code {
            KeyCode::Left if alt => self.cursor = self.word_left(),
            KeyCode::Left => self.cursor = self.prev_boundary(),
            KeyCode::Right if alt => self.cursor = self.word_right(),
            KeyCode::Right => self.cursor = self.next_boundary(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.value.len(),

            KeyCode::Backspace if alt => self.delete_back_to(self.word_left()),
            KeyCode::Char('w') if ctrl => self.delete_back_to(self.word_left()),
            KeyCode::Char('u') if ctrl => self.delete_back_to(0),
            KeyCode::Backspace => self.delete_back_to(self.prev_boundary()),
            KeyCode::Delete => {
                let end = self.next_boundary();
                self.value.replace_range(self.cursor..end, "");
            }

            KeyCode::Char(c) if !ctrl && !alt => {
                self.value.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            _ => return false,
        }
        true
    }

    fn delete_back_to(&mut self, start: usize) {
        self.value.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// The buffer with a block cursor drawn in.
    pub fn render(&self) -> String {
        let (before, after) = self.value.split_at(self.cursor().min(self.value.len()));
        format!("{before}\u{2588}{after}")
    }
}

// ── Task form ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Title,
    Description,
    DueDate,
    Priority,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Description,
        FormField::DueDate,
        FormField::Priority,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::DueDate => "Due (YYYY-MM-DD HH:MM)",
            FormField::Priority => "Priority",
        }
    }

    fn validation_field(self) -> Option<Field> {
        match self {
            FormField::Title => Some(Field::Title),
            FormField::Description => Some(Field::Description),
            FormField::DueDate => Some(Field::DueDate),
            FormField::Priority => None,
        }
    }

    fn step(self, forward: bool) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ALL.len();
        let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        Self::ALL[next]
    }
}

/// Create/edit modal state.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    /// `Some(id)` when editing an existing task.
    pub editing: Option<String>,
    pub field: FormField,
    pub title: TextInput,
    pub description: TextInput,
    pub due: TextInput,
    pub priority: Priority,
    pub errors: Option<ValidationErrors>,
}

pub enum FormOutcome {
    Continue,
    Cancel,
    Submit,
}

impl TaskForm {
    pub fn for_task(task: &Task) -> Self {
        let draft = TaskDraft::from_task(task);
        TaskForm {
            editing: Some(task.id.clone()),
            field: FormField::Title,
            title: TextInput::with_value(draft.title),
            description: TextInput::with_value(draft.description),
            due: TextInput::with_value(draft.due_date.unwrap_or_default()),
            priority: draft.priority.unwrap_or_default(),
            errors: None,
        }
    }

    pub fn draft(&self) -> TaskDraft {
        let due = self.due.value.trim();
        TaskDraft {
            title: self.title.value.clone(),
            description: self.description.value.clone(),
            due_date: (!due.is_empty()).then(|| due.to_string()),
            priority: Some(self.priority),
        }
    }

    pub fn error_for(&self, field: FormField) -> Option<&str> {
        let field = field.validation_field()?;
        self.errors.as_ref()?.message_for(field)
    }

    fn active_input(&mut self) -> Option<&mut TextInput> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due),
            FormField::Priority => None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> FormOutcome {
        match code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Enter => return FormOutcome::Submit,
            KeyCode::Tab | KeyCode::Down => self.field = self.field.step(true),
            KeyCode::BackTab | KeyCode::Up => self.field = self.field.step(false),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if self.field == FormField::Priority =>
            {
                self.priority = self.priority.next();
            }
            _ => {
                if let Some(input) = self.active_input() {
                    input.handle(code, modifiers);
                }
            }
        }
        FormOutcome::Continue
    }

    /// Keep the form open with the validation messages attached.
    pub fn reject(&mut self, errors: ValidationErrors) {
        if let Some(first) = FormField::ALL
            .iter()
            .find(|f| f.validation_field().is_some_and(|v| errors.message_for(v).is_some()))
        {
            self.field = *first;
        }
        self.errors = Some(errors);
    }

    /// Whether a task's due date has passed.
    pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
        !task.completed && task.due_date.is_some_and(|due| due < now)
    }
}

// ── Rendering helpers ─────────────────────────────────────────────────

/// Clear a centred `width`×`height` panel, draw its border, and return the
/// inner area.
pub fn render_modal(
    frame: &mut Frame,
    title: &str,
    border_style: Style,
    width: u16,
    height: u16,
) -> Rect {
    let area = frame.area();
    let w = width.min(area.width.saturating_sub(4));
    let h = height.min(area.height.saturating_sub(4));
    let panel = Rect::new(
        area.width.saturating_sub(w) / 2,
        area.height.saturating_sub(h) / 2,
        w,
        h,
    );

    frame.render_widget(Clear, panel);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    inner
}

/// One-line bar of `key description` pairs.
pub fn render_hints(
    frame: &mut Frame,
    area: Rect,
    hints: &[(&str, &str)],
    key_style: Style,
    desc_style: Style,
) {
    let spans: Vec<Span<'_>> = hints
        .iter()
        .flat_map(|(key, desc)| [Span::styled(*key, key_style), Span::styled(*desc, desc_style)])
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: &str) -> TextInput {
        TextInput::with_value(value)
    }

    #[test]
    fn typing_inserts_at_cursor() {
        let mut t = input("hllo");
        t.handle(KeyCode::Home, KeyModifiers::NONE);
        t.handle(KeyCode::Right, KeyModifiers::NONE);
        t.handle(KeyCode::Char('e'), KeyModifiers::NONE);
        assert_eq!(t.value, "hello");
        assert_eq!(t.cursor(), 2);
    }

    #[test]
    fn backspace_and_delete() {
        let mut t = input("heello");
        t.handle(KeyCode::Left, KeyModifiers::NONE);
        t.handle(KeyCode::Left, KeyModifiers::NONE);
        t.handle(KeyCode::Left, KeyModifiers::NONE);
        t.handle(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(t.value, "hello");
        t.handle(KeyCode::Delete, KeyModifiers::NONE);
        assert_eq!(t.value, "helo");
    }

    #[test]
    fn word_motions() {
        let mut t = input("hello world test");
        t.handle(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(t.cursor(), 12);
        t.handle(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(t.cursor(), 6);
        t.handle(KeyCode::Right, KeyModifiers::ALT);
        assert_eq!(t.cursor(), 12);
        t.handle(KeyCode::End, KeyModifiers::NONE);
        t.handle(KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(t.value, "hello world ");
        t.handle(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert_eq!(t.value, "");
    }

    #[test]
    fn multibyte_cursor_stays_on_boundaries() {
        let mut t = input("añb");
        t.handle(KeyCode::Left, KeyModifiers::NONE);
        t.handle(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(t.cursor(), 1);
        t.handle(KeyCode::Delete, KeyModifiers::NONE);
        assert_eq!(t.value, "ab");
    }

    #[test]
    fn ctrl_chars_are_not_inserted() {
        let mut t = input("x");
        assert!(!t.handle(KeyCode::Char('z'), KeyModifiers::CONTROL));
        assert_eq!(t.value, "x");
    }

    #[test]
    fn render_shows_cursor() {
        let mut t = input("hello");
        assert_eq!(t.render(), "hello\u{2588}");
        t.handle(KeyCode::Home, KeyModifiers::NONE);
        assert_eq!(t.render(), "\u{2588}hello");
    }

    #[test]
    fn form_cycles_fields_and_priority() {
        let mut form = TaskForm::default();
        form.handle_key(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(form.title.value, "x");
        form.handle_key(KeyCode::BackTab, KeyModifiers::NONE);
        assert_eq!(form.field, FormField::Priority);
        form.handle_key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(form.priority, Priority::Low);
        form.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(form.field, FormField::Title);
    }

    #[test]
    fn rejected_form_focuses_first_bad_field() {
        let mut form = TaskForm::default();
        form.title = TextInput::with_value("ok");
        let errors = form.draft().validate(Utc::now()).unwrap_err();
        form.reject(errors);
        assert_eq!(form.field, FormField::Description);
        assert!(form.error_for(FormField::Description).is_some());
        assert!(form.error_for(FormField::Title).is_none());
        assert!(form.error_for(FormField::Priority).is_none());
    }

    #[test]
    fn blank_due_is_omitted_from_draft() {
        let form = TaskForm {
            due: TextInput::with_value("   "),
            ..Default::default()
        };
        assert_eq!(form.draft().due_date, None);
        assert_eq!(form.draft().priority, Some(Priority::Medium));
    }
}
