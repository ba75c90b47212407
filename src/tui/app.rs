use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::auth::{AuthForm, AuthGate};
use crate::backend::Backend;
use crate::config::Config;
use crate::focus::{FocusSession, TimerEvent, TimerMode};
use crate::routes::{Route, Screen};
use crate::store::{Store, Task};
use crate::tasks::{Checklist, ReorderOutcome, TaskList};

use super::event::{self, AppEvent};
use super::form::{FormOutcome, TaskForm, TextInput};
use super::keymap::{Action, KeyMap};
use super::theme::{Theme, ToastStyle};
use super::ui;

const TICK_RATE: Duration = Duration::from_millis(250);
const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub style: ToastStyle,
    expires_at: Instant,
}

/// What the dashboard is doing with key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Form,
    ConfirmDelete,
    Checklist,
    Help,
    /// A task is picked up; `selected` is the drop slot.
    Moving,
}

pub struct App {
    pub store: Store,
    pub config: Config,
    pub theme: Theme,
    pub keymap: KeyMap,
    pub should_quit: bool,

    // Auth + routing
    pub gate: AuthGate,
    pub auth_form: AuthForm,
    pub route: Route,
    pub screen: Screen,

    // Dashboard
    pub tasks: Option<TaskList>,
    pub selected: usize,
    pub mode: Mode,
    pub form: TaskForm,
    pub confirm_target: Option<String>,
    pub checklist: Option<Checklist>,
    pub checklist_input: TextInput,
    pub checklist_index: usize,
    /// Id of the task picked up in `Mode::Moving`.
    pub moving_id: Option<String>,

    // Focus screen
    pub focus: Option<FocusSession>,

    pub toast: Option<Toast>,
}

impl App {
    pub fn new(store: Store, config: Config, route: Route) -> Result<Self> {
        let gate = AuthGate::new(&store)?;
        let theme = config.theme.build();
        let mut app = App {
            store,
            config,
            theme,
            keymap: KeyMap::default_keymap(),
            should_quit: false,
            gate,
            auth_form: AuthForm::default(),
            route,
            screen: Screen::Auth,
            tasks: None,
            selected: 0,
            mode: Mode::Normal,
            form: TaskForm::default(),
            confirm_target: None,
            checklist: None,
            checklist_input: TextInput::default(),
            checklist_index: 0,
            moving_id: None,
            focus: None,
            toast: None,
        };
        app.sync();
        Ok(app)
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            let timeout = self
                .focus
                .as_ref()
                .and_then(|f| f.until_next_tick(Instant::now()))
                .map_or(TICK_RATE, |d| d.min(TICK_RATE));

            match event::poll(timeout)? {
                AppEvent::Key(key) => self.handle_key(key.code, key.modifiers),
                AppEvent::Resize | AppEvent::Tick => {}
            }
            self.background(Instant::now());

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Work done on every loop turn: realtime, session upkeep, timer ticks.
    fn background(&mut self, now: Instant) {
        if let Err(e) = self.store.poll_remote_changes() {
            tracing::warn!("failed to poll for remote changes: {e}");
        }

        let before = self.gate.user().map(|u| u.id.clone());
        self.gate.poll();
        self.gate.maintain(&self.store, Utc::now());
        let mut resync = before != self.gate.user().map(|u| u.id.clone());

        if let Some(list) = self.tasks.as_mut()
            && list.pump(&self.store)
        {
            if let Some(checklist) = self.checklist.as_mut() {
                checklist.refresh(&self.store);
            }
            self.clamp_selection();
            // The focused task may have been deleted elsewhere.
            resync |= matches!(self.screen, Screen::Focus(_));
        }
        if resync {
            self.sync();
        }

        if let Some(session) = self.focus.as_mut()
            && let Some(TimerEvent::Completed(mode)) = session.poll(now)
        {
            self.notify(format!("{} finished", mode.label()), ToastStyle::Success);
        }

        if self.toast.as_ref().is_some_and(|t| t.expires_at <= now) {
            self.toast = None;
        }
    }

    /// Bring the task list, focus session, and screen in line with the
    /// current session and route.
    fn sync(&mut self) {
        let user_id = self.gate.user().map(|u| u.id.clone());
        let stale = match (&self.tasks, &user_id) {
            (Some(list), Some(id)) => list.user_id() != id,
            (None, None) => false,
            _ => true,
        };
        if stale {
            self.reset_dashboard();
            self.tasks = None;
            if let Some(id) = &user_id {
                match TaskList::open(&self.store, id) {
                    Ok(list) => self.tasks = Some(list),
                    Err(e) => {
                        tracing::error!("failed to open task list: {e}");
                        self.notify("Could not load tasks", ToastStyle::Error);
                    }
                }
            }
        }

        let mut screen = Screen::resolve(&self.store, self.gate.session(), &self.route);
        if let Screen::Focus(id) = &screen
            && self.focus.as_ref().is_none_or(|f| f.task().id != *id)
        {
            self.focus = self.open_focus(id);
            if self.focus.is_none() {
                screen = Screen::Dashboard;
            }
        }
        if screen == Screen::Dashboard && matches!(self.route, Route::Focus(_)) {
            tracing::info!(route = %self.route.path(), "redirecting to dashboard");
            self.route = Route::Dashboard;
        }
        if !matches!(screen, Screen::Focus(_))
            && let Some(session) = self.focus.take()
        {
            session.close();
        }
        self.screen = screen;
    }

    fn open_focus(&self, task_id: &str) -> Option<FocusSession> {
        let notifier = Box::new(self.config.notifications.clone());
        match FocusSession::open(
            &self.store,
            task_id,
            self.config.focus,
            TimerMode::Focus,
            notifier,
        ) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(task = %task_id, "failed to open focus session: {e}");
                None
            }
        }
    }

    pub fn navigate(&mut self, route: Route) {
        tracing::debug!(route = %route.path(), "navigate");
        self.route = route;
        self.sync();
    }

    fn reset_dashboard(&mut self) {
        self.selected = 0;
        self.mode = Mode::Normal;
        self.form = TaskForm::default();
        self.confirm_target = None;
        self.checklist = None;
        self.checklist_input.clear();
        self.moving_id = None;
    }

    pub fn notify(&mut self, message: impl Into<String>, style: ToastStyle) {
        self.toast = Some(Toast {
            message: message.into(),
            style,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks.as_ref().map(TaskList::visible).unwrap_or_default()
    }

    /// Current visible position of the picked-up task.
    pub fn moving_index(&self) -> Option<usize> {
        let id = self.moving_id.as_deref()?;
        self.visible_tasks().iter().position(|t| t.id == id)
    }

    fn selected_task(&self) -> Option<Task> {
        self.visible_tasks().get(self.selected).map(|t| (*t).clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    // ── Key handling ──────────────────────────────────────────────────

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match self.screen {
            Screen::Auth => self.handle_auth_key(code, modifiers),
            Screen::Focus(_) => self.handle_focus_key(code, modifiers),
            Screen::Dashboard => match self.mode {
                Mode::Normal => self.handle_dashboard_key(code, modifiers),
                Mode::Form => self.handle_form_key(code, modifiers),
                Mode::ConfirmDelete => self.handle_confirm_key(code),
                Mode::Checklist => self.handle_checklist_key(code, modifiers),
                Mode::Help => self.mode = Mode::Normal,
                Mode::Moving => self.handle_moving_key(code),
            },
        }
    }

    fn handle_auth_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('t') if ctrl => self.auth_form.toggle_mode(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.auth_form.next_field();
            }
            KeyCode::Enter => {
                if let Some(session) = self.auth_form.submit(&self.store) {
                    self.gate.poll();
                    self.sync();
                    self.notify(
                        format!("Signed in as {}", session.user.email),
                        ToastStyle::Success,
                    );
                }
            }
            KeyCode::Backspace => {
                self.auth_form.active_input().pop();
            }
            KeyCode::Char(c) if !ctrl => self.auth_form.active_input().push(c),
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(action) = self.keymap.lookup_dashboard(code, modifiers) else {
            return;
        };

        match action {
            Action::Quit => self.should_quit = true,
            Action::ShowHelp => self.mode = Mode::Help,
            Action::Refresh => {
                if let Some(list) = self.tasks.as_mut() {
                    list.refresh(&self.store);
                }
                self.clamp_selection();
            }
            Action::SignOut => {
                self.gate.sign_out(&self.store);
                self.auth_form = AuthForm::default();
                self.route = Route::Dashboard;
                self.sync();
                self.notify("Signed out", ToastStyle::Info);
            }

            Action::MoveDown => {
                let len = self.visible_tasks().len();
                if len > 0 {
                    self.selected = (self.selected + 1).min(len - 1);
                }
            }
            Action::MoveUp => self.selected = self.selected.saturating_sub(1),
            Action::NextFilter => {
                if let Some(list) = self.tasks.as_mut() {
                    list.set_filter(list.filter().next());
                }
                self.selected = 0;
            }

            Action::NewTask => {
                self.form = TaskForm::default();
                self.mode = Mode::Form;
            }
            Action::EditTask => {
                if let Some(task) = self.selected_task() {
                    self.form = TaskForm::for_task(&task);
                    self.mode = Mode::Form;
                }
            }
            Action::ToggleDone => {
                let Some(task) = self.selected_task() else {
                    return;
                };
                let toggled = self
                    .tasks
                    .as_mut()
                    .is_some_and(|list| list.toggle_complete(&self.store, &task.id));
                if toggled {
                    self.clamp_selection();
                } else {
                    self.notify("Could not update task", ToastStyle::Error);
                }
            }
            Action::DeleteTask => {
                if let Some(task) = self.selected_task() {
                    self.confirm_target = Some(task.id);
                    self.mode = Mode::ConfirmDelete;
                }
            }
            Action::OpenChecklist => {
                if let Some(task) = self.selected_task() {
                    self.checklist = Some(Checklist::open(&self.store, &task.id));
                    self.checklist_input.clear();
                    self.checklist_index = 0;
                    self.mode = Mode::Checklist;
                }
            }
            Action::OpenFocus => {
                if let Some(task) = self.selected_task() {
                    self.navigate(Route::Focus(task.id));
                }
            }

            Action::PickUp => {
                if let Some(task) = self.selected_task() {
                    self.moving_id = Some(task.id);
                    self.mode = Mode::Moving;
                }
            }
            Action::ReorderDown => {
                let dest = self.selected + 1;
                self.reorder(self.selected, Some(dest));
            }
            Action::ReorderUp => {
                if let Some(dest) = self.selected.checked_sub(1) {
                    self.reorder(self.selected, Some(dest));
                }
            }

            Action::ToggleTimer
            | Action::ResetTimer
            | Action::FocusMode
            | Action::ShortBreakMode
            | Action::LongBreakMode
            | Action::BackToDashboard => {}
        }
    }

    fn handle_moving_key(&mut self, code: KeyCode) {
        let Some(source) = self.moving_index() else {
            self.finish_move();
            self.clamp_selection();
            self.notify("Task being moved is no longer listed", ToastStyle::Error);
            return;
        };
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = self.visible_tasks().len();
                if len > 0 {
                    self.selected = (self.selected + 1).min(len - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Enter => {
                self.finish_move();
                let dest = self.selected;
                self.reorder(source, Some(dest));
            }
            KeyCode::Esc => {
                self.finish_move();
                self.selected = source;
                self.reorder(source, None);
            }
            _ => {}
        }
    }

    fn finish_move(&mut self) {
        self.moving_id = None;
        self.mode = Mode::Normal;
    }

    fn reorder(&mut self, source: usize, destination: Option<usize>) {
        let Some(list) = self.tasks.as_mut() else {
            return;
        };
        match list.reorder(&self.store, source, destination) {
            ReorderOutcome::Unchanged => {}
            ReorderOutcome::Persisted { .. } => {
                if let Some(dest) = destination {
                    self.selected = dest;
                }
            }
            ReorderOutcome::Failed { persisted, total } => {
                self.selected = source;
                self.notify(
                    format!("Reorder failed after {persisted} of {total} writes, list reloaded"),
                    ToastStyle::Error,
                );
            }
        }
        self.clamp_selection();
    }

    fn handle_form_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match self.form.handle_key(code, modifiers) {
            FormOutcome::Continue => {}
            FormOutcome::Cancel => {
                self.form = TaskForm::default();
                self.mode = Mode::Normal;
            }
            FormOutcome::Submit => self.submit_form(),
        }
    }

    fn submit_form(&mut self) {
        let Some(list) = self.tasks.as_mut() else {
            return;
        };
        let draft = self.form.draft();
        let now = Utc::now();

        match self.form.editing.clone() {
            Some(id) => match list.update(&self.store, &id, &draft, now) {
                Ok(true) => {
                    self.mode = Mode::Normal;
                    self.notify("Task updated", ToastStyle::Success);
                }
                Ok(false) => self.notify("Could not save task", ToastStyle::Error),
                Err(errors) => self.form.reject(errors),
            },
            None => match list.create(&self.store, &draft, now) {
                Ok(Some(task)) => {
                    if let Some(idx) = list.visible().iter().position(|t| t.id == task.id) {
                        self.selected = idx;
                    }
                    self.mode = Mode::Normal;
                    self.notify(format!("Created \"{}\"", task.title), ToastStyle::Success);
                }
                Ok(None) => self.notify("Could not create task", ToastStyle::Error),
                Err(errors) => self.form.reject(errors),
            },
        }
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let deleted = match (self.confirm_target.take(), self.tasks.as_mut()) {
                    (Some(id), Some(list)) => Some(list.delete(&self.store, &id)),
                    _ => None,
                };
                match deleted {
                    Some(true) => self.notify("Task deleted", ToastStyle::Info),
                    Some(false) => self.notify("Could not delete task", ToastStyle::Error),
                    None => {}
                }
                self.mode = Mode::Normal;
                self.clamp_selection();
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.confirm_target = None;
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_checklist_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(checklist) = self.checklist.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };
        let len = checklist.items.len();
        match code {
            KeyCode::Esc => {
                self.checklist = None;
                self.checklist_input.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Down => {
                if len > 0 {
                    self.checklist_index = (self.checklist_index + 1).min(len - 1);
                }
            }
            KeyCode::Up => self.checklist_index = self.checklist_index.saturating_sub(1),
            KeyCode::Enter if self.checklist_input.value.trim().is_empty() => {
                if let Some(id) = checklist.items.get(self.checklist_index).map(|i| i.id.clone()) {
                    checklist.toggle(&self.store, &id);
                }
            }
            KeyCode::Enter => {
                let title = self.checklist_input.take();
                checklist.add(&self.store, &title);
                self.checklist_index = checklist.items.len().saturating_sub(1);
            }
            KeyCode::Delete if self.checklist_input.value.is_empty() => {
                if let Some(id) = checklist.items.get(self.checklist_index).map(|i| i.id.clone()) {
                    checklist.remove(&self.store, &id);
                    self.checklist_index = self
                        .checklist_index
                        .min(checklist.items.len().saturating_sub(1));
                }
            }
            _ => {
                self.checklist_input.handle(code, modifiers);
            }
        }
    }

    fn handle_focus_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(action) = self.keymap.lookup_focus(code, modifiers) else {
            return;
        };
        if action == Action::BackToDashboard {
            self.navigate(Route::Dashboard);
            return;
        }
        if action == Action::Quit {
            self.should_quit = true;
            return;
        }
        let Some(session) = self.focus.as_mut() else {
            return;
        };

        let finished = match action {
            Action::ToggleTimer => session.toggle(Instant::now()),
            Action::ResetTimer => {
                session.reset();
                None
            }
            Action::FocusMode => {
                session.switch_mode(TimerMode::Focus);
                None
            }
            Action::ShortBreakMode => {
                session.switch_mode(TimerMode::ShortBreak);
                None
            }
            Action::LongBreakMode => {
                session.switch_mode(TimerMode::LongBreak);
                None
            }
            _ => None,
        };
        if let Some(TimerEvent::Completed(mode)) = finished {
            self.notify(format!("{} finished", mode.label()), ToastStyle::Success);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::Phase;
    use crate::store::{NewTask, Priority};
    use crate::tasks::Filter;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.notifications.enabled = false;
        config
    }

    fn signed_in_app(titles: &[&str]) -> App {
        let store = Store::open_in_memory().unwrap();
        let session = store.sign_up("alice@example.com", "secret1").unwrap();
        for title in titles {
            store
                .insert_task(
                    &session.user.id,
                    &NewTask {
                        title: (*title).into(),
                        description: Some("d".into()),
                        due_date: None,
                        priority: Priority::Medium,
                    },
                )
                .unwrap();
        }
        App::new(store, quiet_config(), Route::Dashboard).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(code, KeyModifiers::NONE);
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn visible_titles(app: &App) -> Vec<String> {
        app.visible_tasks().iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn starts_on_auth_screen_and_registers() {
        let store = Store::open_in_memory().unwrap();
        let mut app = App::new(store, quiet_config(), Route::Dashboard).unwrap();
        assert_eq!(app.screen, Screen::Auth);
        assert!(app.tasks.is_none());

        app.handle_key(KeyCode::Char('t'), KeyModifiers::CONTROL);
        type_str(&mut app, "bob@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "hunter22");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Dashboard);
        assert!(app.tasks.is_some());
        assert_eq!(app.gate.user().unwrap().email, "bob@example.com");
    }

    #[test]
    fn failed_login_stays_on_auth_screen() {
        let store = Store::open_in_memory().unwrap();
        let mut app = App::new(store, quiet_config(), Route::Dashboard).unwrap();
        type_str(&mut app, "nobody@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "wrongpass");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Auth);
        assert!(app.auth_form.error.is_some());
        assert!(app.auth_form.password.is_empty());
    }

    #[test]
    fn create_task_through_form() {
        let mut app = signed_in_app(&[]);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Form);
        type_str(&mut app, "Buy milk");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "two litres");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(visible_titles(&app), ["Buy milk"]);
    }

    #[test]
    fn invalid_form_stays_open_with_errors() {
        let mut app = signed_in_app(&[]);
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Form);
        assert!(app.form.errors.is_some());
        assert!(visible_titles(&app).is_empty());
    }

    #[test]
    fn pick_up_and_drop_reorders() {
        let mut app = signed_in_app(&["a", "b", "c"]);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.mode, Mode::Moving);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(visible_titles(&app), ["b", "c", "a"]);
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn drop_moves_picked_task_after_refetch() {
        let mut app = signed_in_app(&["a", "b", "c", "d"]);
        let first = app.visible_tasks()[0].id.clone();
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('g'));

        app.store.delete_task(&first).unwrap();
        app.background(Instant::now());
        assert_eq!(app.moving_index(), Some(1));

        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Char('k'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(visible_titles(&app), ["c", "b", "d"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn move_is_cancelled_when_picked_task_disappears() {
        let mut app = signed_in_app(&["a", "b", "c"]);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('g'));
        let picked = app.moving_id.clone().unwrap();

        app.store.delete_task(&picked).unwrap();
        app.background(Instant::now());
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.moving_id.is_none());
        assert_eq!(visible_titles(&app), ["a", "c"]);
        assert!(matches!(
            app.toast.as_ref().map(|t| t.style),
            Some(ToastStyle::Error)
        ));
    }

    #[test]
    fn cancelled_move_keeps_order() {
        let mut app = signed_in_app(&["a", "b", "c"]);
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Esc);

        assert_eq!(visible_titles(&app), ["a", "b", "c"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn quick_move_follows_selection() {
        let mut app = signed_in_app(&["a", "b", "c"]);
        press(&mut app, KeyCode::Char('J'));
        assert_eq!(visible_titles(&app), ["b", "a", "c"]);
        assert_eq!(app.selected, 1);
        press(&mut app, KeyCode::Char('K'));
        assert_eq!(visible_titles(&app), ["a", "b", "c"]);
    }

    #[test]
    fn toggle_and_filter() {
        let mut app = signed_in_app(&["a", "b"]);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tasks.as_ref().unwrap().filter(), Filter::Active);
        assert_eq!(visible_titles(&app), ["b"]);
        press(&mut app, KeyCode::Tab);
        assert_eq!(visible_titles(&app), ["a"]);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = signed_in_app(&["a", "b"]);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode, Mode::ConfirmDelete);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(visible_titles(&app), ["a", "b"]);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(visible_titles(&app), ["b"]);
    }

    #[test]
    fn checklist_add_and_toggle() {
        let mut app = signed_in_app(&["a"]);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.mode, Mode::Checklist);
        type_str(&mut app, "step one");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        let checklist = app.checklist.as_ref().unwrap();
        assert_eq!(checklist.items.len(), 1);
        assert_eq!(checklist.progress(), (1, 1));

        press(&mut app, KeyCode::Esc);
        assert!(app.checklist.is_none());
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn focus_screen_round_trip() {
        let mut app = signed_in_app(&["a"]);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.screen, Screen::Focus(_)));
        assert!(matches!(app.route, Route::Focus(_)));

        press(&mut app, KeyCode::Char(' '));
        let session = app.focus.as_ref().unwrap();
        assert_eq!(session.timer().phase(), Phase::Running);
        assert!(session.ticker_active());

        press(&mut app, KeyCode::Char('2'));
        let session = app.focus.as_ref().unwrap();
        assert_eq!(session.timer().mode(), TimerMode::ShortBreak);
        assert_eq!(session.timer().phase(), Phase::Ready);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(app.focus.is_none());
    }

    #[test]
    fn focus_route_for_missing_task_redirects() {
        let store = Store::open_in_memory().unwrap();
        store.sign_up("alice@example.com", "secret1").unwrap();
        let app = App::new(store, quiet_config(), Route::Focus("missing".into())).unwrap();
        assert_eq!(app.screen, Screen::Dashboard);
        assert_eq!(app.route, Route::Dashboard);
        assert!(app.focus.is_none());
    }

    #[test]
    fn deleting_focused_task_elsewhere_leaves_focus_screen() {
        let mut app = signed_in_app(&["a"]);
        press(&mut app, KeyCode::Enter);
        let id = app.focus.as_ref().unwrap().task().id.clone();

        app.store.delete_task(&id).unwrap();
        app.background(Instant::now());
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(app.focus.is_none());
    }

    #[test]
    fn sign_out_returns_to_auth() {
        let mut app = signed_in_app(&["a"]);
        press(&mut app, KeyCode::Char('L'));
        assert_eq!(app.screen, Screen::Auth);
        assert!(app.tasks.is_none());
        assert_eq!(app.store.change_subscriber_count(), 0);
    }
}
