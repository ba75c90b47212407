use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use crate::auth::{AuthField, AuthMode};
use crate::focus::{Phase, TimerMode};
use crate::routes::Screen;
use crate::store::Task;
use crate::tasks::Filter;
use crate::tasks::editor::format_due;

use super::app::{App, Mode};
use super::form::{self, FormField, TaskForm};

pub fn draw(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::Auth => draw_auth(frame, app),
        Screen::Dashboard => draw_dashboard(frame, app),
        Screen::Focus(_) => draw_focus(frame, app),
    }

    if let Some(toast) = &app.toast {
        let area = frame.area();
        let width = (toast.message.chars().count() as u16 + 4).min(area.width);
        let rect = Rect::new(
            area.width.saturating_sub(width),
            area.height.saturating_sub(2),
            width,
            1,
        );
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(format!(" {} ", toast.message)).style(app.theme.toast_style(toast.style)),
            rect,
        );
    }
}

// ── Auth ──────────────────────────────────────────────────────────────

fn draw_auth(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let form = &app.auth_form;
    let title = match form.mode {
        AuthMode::Login => " focusdeck: Sign in ",
        AuthMode::Register => " focusdeck: Create account ",
    };
    let inner = form::render_modal(frame, title, theme.focused_border(), 56, 10);

    let label_style = |field: AuthField| {
        if form.field == field {
            Style::default()
                .fg(theme.form_highlight)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_secondary)
        }
    };
    let cursor = |field: AuthField| if form.field == field { "\u{2588}" } else { "" };
    let masked = "*".repeat(form.password.chars().count());

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Email:    ", label_style(AuthField::Email)),
            Span::raw(form.email.as_str()),
            Span::raw(cursor(AuthField::Email)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Password: ", label_style(AuthField::Password)),
            Span::raw(masked),
            Span::raw(cursor(AuthField::Password)),
        ]),
        Line::from(""),
    ];
    if let Some(error) = &form.error {
        lines.push(Line::styled(error.as_str(), Style::default().fg(theme.form_error)));
    }
    let hint = match form.mode {
        AuthMode::Login => "Enter sign in  Tab field  Ctrl+T create account  Esc quit",
        AuthMode::Register => "Enter register  Tab field  Ctrl+T back to sign in  Esc quit",
    };
    lines.push(Line::styled(hint, Style::default().fg(theme.text_secondary)));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

// ── Dashboard ─────────────────────────────────────────────────────────

fn draw_dashboard(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let email = app.gate.user().map(|u| u.email.as_str()).unwrap_or_default();
    let title = Line::from(vec![
        Span::styled(
            " focusdeck ",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(email, Style::default().fg(theme.text_secondary)),
    ]);
    frame.render_widget(Paragraph::new(title), rows[0]);

    draw_stats(frame, app, rows[1]);

    let filter = app.tasks.as_ref().map(|l| l.filter()).unwrap_or_default();
    let tabs = Tabs::new(Filter::ALL.iter().map(|f| f.label()))
        .select(Filter::ALL.iter().position(|f| *f == filter).unwrap_or(0))
        .style(theme.tab_inactive_style())
        .highlight_style(theme.tab_active_style());
    frame.render_widget(tabs, rows[2]);

    draw_task_list(frame, app, rows[3]);
    draw_dashboard_hints(frame, app, rows[4]);

    match app.mode {
        Mode::Form => draw_task_form(frame, app),
        Mode::ConfirmDelete => draw_confirm_delete(frame, app),
        Mode::Checklist => draw_checklist(frame, app),
        Mode::Help => draw_help(frame, app),
        Mode::Normal | Mode::Moving => {}
    }
}

fn draw_stats(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let stats = app.tasks.as_ref().map(|l| l.stats()).unwrap_or_default();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Min(10),
        ])
        .split(area);

    let boxes = [
        ("Total", stats.total, theme.text_primary),
        ("Completed", stats.completed, theme.done),
        ("Pending", stats.pending(), theme.priority_medium),
    ];
    for (i, (label, value, color)) in boxes.into_iter().enumerate() {
        let block = Block::default()
            .title(format!(" {label} "))
            .borders(Borders::ALL)
            .border_style(theme.unfocused_border());
        frame.render_widget(
            Paragraph::new(value.to_string())
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .block(block),
            cols[i],
        );
    }

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Progress ")
                .borders(Borders::ALL)
                .border_style(theme.unfocused_border()),
        )
        .gauge_style(Style::default().fg(theme.done))
        .percent(stats.completion_pct());
    frame.render_widget(gauge, cols[3]);
}

fn draw_task_list(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let block = Block::default()
        .title(" Tasks ")
        .borders(Borders::ALL)
        .border_style(theme.focused_border());

    let Some(list) = app.tasks.as_ref() else {
        frame.render_widget(Paragraph::new("No task list").block(block), area);
        return;
    };
    if list.is_loading() {
        frame.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    }

    let visible = list.visible();
    if visible.is_empty() {
        let hint = match list.filter() {
            Filter::All => "No tasks yet. Press n to add one.",
            Filter::Active => "Nothing left to do.",
            Filter::Completed => "Nothing completed yet.",
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(theme.text_secondary))
                .block(block),
            area,
        );
        return;
    }

    let now = Utc::now();
    let moving = app.moving_id.as_deref();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|task| task_item(app, task, moving == Some(task.id.as_str()), now))
        .collect();

    let highlight = if app.mode == Mode::Moving {
        Style::default().fg(theme.drag).add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    };
    let widget = List::new(items)
        .block(block)
        .highlight_style(highlight)
        .highlight_symbol("\u{25b8} ");
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(widget, area, &mut state);
}

fn task_item<'a>(
    app: &App,
    task: &'a Task,
    picked_up: bool,
    now: chrono::DateTime<Utc>,
) -> ListItem<'a> {
    let theme = &app.theme;
    let title_style = if task.completed {
        Style::default()
            .fg(theme.done)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if picked_up {
        Style::default().fg(theme.drag).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_primary)
    };

    let mut spans = vec![
        Span::raw(format!("{} ", task.symbol())),
        Span::styled(
            format!("[{}] ", &task.priority.label()[..1]),
            theme.priority_style(task.priority),
        ),
        Span::styled(task.title.as_str(), title_style),
    ];
    if let Some(due) = task.due_date {
        let style = if TaskForm::is_overdue(task, now) {
            Style::default().fg(theme.overdue).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_secondary)
        };
        spans.push(Span::styled(format!("  due {}", format_due(due)), style));
    }
    if picked_up {
        spans.push(Span::styled("  (moving)", Style::default().fg(theme.drag)));
    }
    ListItem::new(Line::from(spans))
}

fn draw_dashboard_hints(frame: &mut Frame, app: &App, area: Rect) {
    let hints: &[(&str, &str)] = match app.mode {
        Mode::Moving => &[(" j/k", " move  "), ("Enter", " drop  "), ("Esc", " cancel")],
        _ => &[
            (" n", " new  "),
            ("e", " edit  "),
            ("Space", " done  "),
            ("d", " delete  "),
            ("c", " checklist  "),
            ("Enter", " focus  "),
            ("g", " move  "),
            ("Tab", " filter  "),
            ("?", " help  "),
            ("q", " quit"),
        ],
    };
    form::render_hints(
        frame,
        area,
        hints,
        Style::default().fg(app.theme.accent),
        Style::default().fg(app.theme.text_secondary),
    );
}

// ── Overlays ──────────────────────────────────────────────────────────

fn draw_task_form(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let form = &app.form;
    let title = if form.editing.is_some() {
        " Edit Task "
    } else {
        " New Task "
    };
    let inner = form::render_modal(frame, title, theme.focused_border(), 64, 16);

    let mut lines = Vec::new();
    for field in FormField::ALL {
        let active = form.field == field;
        let label_style = if active {
            Style::default()
                .fg(theme.form_highlight)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_secondary)
        };
        lines.push(Line::styled(field.label(), label_style));

        let value = match field {
            FormField::Title => input_line(&form.title, active),
            FormField::Description => input_line(&form.description, active),
            FormField::DueDate => input_line(&form.due, active),
            FormField::Priority => Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    form.priority.label(),
                    theme.priority_style(form.priority),
                ),
                Span::styled(
                    if active { "  (Space to change)" } else { "" },
                    Style::default().fg(theme.text_secondary),
                ),
            ]),
        };
        lines.push(value);

        if let Some(error) = form.error_for(field) {
            lines.push(Line::styled(
                format!("  {error}"),
                Style::default().fg(theme.form_error),
            ));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "Enter save  Tab next field  Esc cancel",
        Style::default().fg(theme.text_secondary),
    ));

    frame.render_widget(Paragraph::new(lines), inner);
}

fn input_line(input: &form::TextInput, active: bool) -> Line<'static> {
    let text = if active {
        input.render()
    } else {
        input.value.clone()
    };
    Line::from(format!("  {text}"))
}

fn draw_confirm_delete(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let title = app
        .confirm_target
        .as_deref()
        .and_then(|id| app.tasks.as_ref()?.get(id))
        .map(|t| t.title.as_str())
        .unwrap_or("this task");
    let inner = form::render_modal(
        frame,
        " Delete Task ",
        Style::default().fg(theme.toast_error),
        50,
        5,
    );
    let lines = vec![
        Line::from(format!("Delete \"{title}\"?")),
        Line::from(""),
        Line::styled("y confirm  n cancel", Style::default().fg(theme.text_secondary)),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_checklist(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let Some(checklist) = &app.checklist else {
        return;
    };
    let (done, total) = checklist.progress();
    let task_title = app
        .tasks
        .as_ref()
        .and_then(|l| l.get(&checklist.task_id))
        .map(|t| t.title.as_str())
        .unwrap_or_default();
    let title = format!(" Checklist: {task_title} ({done}/{total}) ");
    let inner = form::render_modal(frame, &title, theme.focused_border(), 60, 18);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let items: Vec<ListItem> = checklist
        .items
        .iter()
        .map(|item| {
            let (mark, style) = if item.completed {
                ("[x] ", Style::default().fg(theme.done))
            } else {
                ("[ ] ", Style::default().fg(theme.text_primary))
            };
            ListItem::new(Line::from(vec![
                Span::raw(mark),
                Span::styled(item.title.as_str(), style),
            ]))
        })
        .collect();
    let mut state = ListState::default()
        .with_selected((!checklist.items.is_empty()).then_some(app.checklist_index));
    frame.render_stateful_widget(
        List::new(items).highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
        rows[0],
        &mut state,
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("+ ", Style::default().fg(theme.accent)),
            Span::raw(app.checklist_input.render()),
        ])),
        rows[1],
    );
    form::render_hints(
        frame,
        rows[2],
        &[
            ("Enter", " add/toggle  "),
            ("Del", " remove  "),
            ("Up/Down", " select  "),
            ("Esc", " close"),
        ],
        Style::default().fg(theme.accent),
        Style::default().fg(theme.text_secondary),
    );
}

fn draw_help(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let sections = app.keymap.help_entries();
    let height = sections
        .iter()
        .map(|(_, entries)| entries.len() as u16 + 2)
        .sum::<u16>()
        + 2;
    let inner = form::render_modal(frame, " Keys ", theme.focused_border(), 56, height);

    let mut lines = Vec::new();
    for (title, entries) in sections {
        lines.push(Line::styled(
            title,
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ));
        for entry in entries {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<10}", entry.label), Style::default().fg(theme.form_highlight)),
                Span::raw(entry.description),
            ]));
        }
        lines.push(Line::from(""));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

// ── Focus ─────────────────────────────────────────────────────────────

fn draw_focus(frame: &mut Frame, app: &App) {
    let theme = &app.theme;
    let Some(session) = &app.focus else {
        frame.render_widget(Paragraph::new("Loading..."), frame.area());
        return;
    };
    let task = session.task();
    let timer = session.timer();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let modes = Tabs::new(TimerMode::ALL.iter().map(|m| m.label()))
        .select(TimerMode::ALL.iter().position(|m| *m == timer.mode()).unwrap_or(0))
        .style(theme.tab_inactive_style())
        .highlight_style(theme.tab_active_style());
    frame.render_widget(modes, rows[0]);

    let mut about = vec![Line::styled(
        task.title.as_str(),
        Style::default()
            .fg(theme.text_primary)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(desc) = &task.description {
        about.push(Line::styled(
            desc.as_str(),
            Style::default().fg(theme.text_secondary),
        ));
    }
    frame.render_widget(
        Paragraph::new(about)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rows[2],
    );

    let status = match timer.phase() {
        Phase::Ready => "ready",
        Phase::Running => "running",
        Phase::Paused => "paused",
        Phase::Expired => "time's up",
    };
    let clock = Paragraph::new(vec![
        Line::from(""),
        Line::styled(timer.display(), theme.timer_style(timer.phase())),
        Line::styled(status, Style::default().fg(theme.text_secondary)),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.focused_border()),
    );
    frame.render_widget(clock, rows[3]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).border_style(theme.unfocused_border()))
        .gauge_style(theme.timer_style(timer.phase()))
        .ratio(timer.progress().clamp(0.0, 1.0))
        .label(timer.mode().label());
    frame.render_widget(gauge, rows[4]);

    let toggle = if timer.is_running() { " pause  " } else { " start  " };
    form::render_hints(
        frame,
        rows[5],
        &[
            (" Space", toggle),
            ("r", " reset  "),
            ("1/2/3", " mode  "),
            ("Esc", " back"),
        ],
        Style::default().fg(theme.accent),
        Style::default().fg(theme.text_secondary),
    );
}
