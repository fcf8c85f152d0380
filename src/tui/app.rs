//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which drives the recipient's task
//! view: a stats header, the task table, and the add/edit form. Every change
//! goes through `TaskBoard`, so each keypress that mutates a task is one full
//! load-mutate-save cycle followed by a redraw.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::access::Session;
use crate::board::{Saved, TaskBoard};
use crate::store::TaskStore;
use crate::task::Task;
use crate::tui::{
    colors::{urgency_colors, BRAND_PURPLE, DUE_SOON_ORANGE},
    enums::AppState,
    task_form::{TaskForm, DESCRIPTION_ORDER, DUE_ORDER, NAME_ORDER, URGENCY_ORDER},
    utils::centered_rect,
};
use crate::util::{format_due_relative, truncate};

pub struct App<'a, S: TaskStore> {
    state: AppState,
    board: TaskBoard<S>,
    session: &'a mut Session,
    table_state: TableState,
    form: TaskForm,
    status_message: String,
    today: NaiveDate,
}

impl<'a, S: TaskStore> App<'a, S> {
    /// Build the view; reopens an edit form left open by the previous run.
    pub fn new(board: TaskBoard<S>, session: &'a mut Session) -> Self {
        let today = Local::now().date_naive();
        let mut app = App {
            state: AppState::TaskList,
            board,
            session,
            table_state: TableState::default(),
            form: TaskForm::new(today),
            status_message: String::new(),
            today,
        };
        if !app.board.tasks().is_empty() {
            app.table_state.select(Some(0));
        }
        if let Some(id) = app.session.editing.clone() {
            app.open_edit(&id);
        }
        app
    }

    fn selected_task(&self) -> Option<&Task> {
        self.table_state.selected().and_then(|i| self.board.tasks().get(i))
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Surface a failed write; the change stays on screen.
    fn note_saved<T>(&mut self, saved: &Saved<T>, ok: &str) {
        match &saved.warning {
            Some(e) => self.set_status_message(format!("Failed to save tasks: {e}")),
            None => self.set_status_message(ok),
        }
    }

    fn refresh(&mut self) {
        self.today = Local::now().date_naive();
        self.board.reload();
        let len = self.board.tasks().len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            Some(i) if i >= len => self.table_state.select(Some(len - 1)),
            None => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    fn open_edit(&mut self, id: &str) {
        let Some(task) = self.board.get(id) else {
            self.session.editing = None;
            return;
        };
        self.form = TaskForm::from_task(task, self.today);
        self.session.editing = Some(id.to_string());
        self.state = AppState::EditTask;
    }

    fn close_form(&mut self) {
        self.session.editing = None;
        self.state = AppState::TaskList;
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        match self.board.toggle_completed(&id) {
            Ok(saved) => {
                let msg = if saved.value { "Task completed" } else { "Task reopened" };
                self.note_saved(&saved, msg);
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn submit_form(&mut self) {
        let fields = match self.form.to_fields(self.today) {
            Ok(fields) => fields,
            Err(msg) => return self.set_status_message(msg),
        };
        let result = match self.form.editing.clone() {
            Some(id) => self
                .board
                .update_fields(&id, &fields)
                .map(|saved| (saved.warning, "Task updated")),
            None => {
                let me = self.session.user_email.clone().unwrap_or_default();
                self.board
                    .create(&fields, &me, &me, self.today)
                    .map(|saved| (saved.warning, "Task added"))
            }
        };
        match result {
            Ok((warning, msg)) => {
                let was_add = self.form.editing.is_none();
                self.close_form();
                self.note_saved(&Saved { value: (), warning }, msg);
                if was_add {
                    self.table_state.select(Some(self.board.tasks().len() - 1));
                }
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let len = self.board.tasks().len();
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(i) = self.table_state.selected() {
                    self.table_state.select(Some(i.saturating_sub(1)));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(i) = self.table_state.selected() {
                    if i + 1 < len {
                        self.table_state.select(Some(i + 1));
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('c') => self.toggle_selected(),
            KeyCode::Char('a') => {
                self.form = TaskForm::new(self.today);
                self.state = AppState::AddTask;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_task().map(|t| t.id.clone()) {
                    self.open_edit(&id);
                }
            }
            KeyCode::Char('r') => {
                self.refresh();
                self.set_status_message("Reloaded");
            }
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                let msg = if self.state == AppState::EditTask { "Edit cancelled" } else { "New task discarded" };
                self.close_form();
                self.set_status_message(msg);
            }
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.prev_field(),
            KeyCode::Left => self.form.handle_left_right(false),
            KeyCode::Right => self.form.handle_left_right(true),
            KeyCode::Backspace => self.form.handle_backspace(),
            KeyCode::Delete => self.form.handle_delete(),
            KeyCode::Enter => self.submit_form(),
            KeyCode::Char(c) => self.form.handle_char(c),
            _ => {}
        }
    }

    /// Apply one key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match self.state {
            AppState::TaskList => return self.handle_task_list_input(key, modifiers),
            AppState::AddTask | AppState::EditTask => self.handle_form_input(key),
            AppState::Help => self.state = AppState::TaskList,
        }
        false
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let stats = self.board.stats(self.today);
        let tile = |label: &str, value: usize, color: Color| {
            vec![
                Span::styled(format!("{label} "), Style::default().fg(Color::Gray)),
                Span::styled(value.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw("    "),
            ]
        };
        let mut spans = vec![
            Span::styled("MY TASKS", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("    "),
        ];
        spans.extend(tile("Total", stats.total, Color::White));
        spans.extend(tile("Pending", stats.pending, Color::Cyan));
        spans.extend(tile("Completed", stats.completed, Color::Green));
        spans.extend(tile("Due soon", stats.due_soon, DUE_SOON_ORANGE));

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(BRAND_PURPLE)))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        self.render_header(f, chunks[0]);

        if self.board.tasks().is_empty() {
            let empty = Paragraph::new("No tasks yet. Press 'a' to add one or have someone assign one to you!")
                .block(Block::default().borders(Borders::ALL).title("Tasks"))
                .alignment(Alignment::Center);
            f.render_widget(empty, chunks[1]);
            return;
        }

        let header = Row::new(["", "Task", "Urgency", "Due", "By when", "From"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(BRAND_PURPLE).fg(Color::White))
        .height(1);

        let today = self.today;
        let rows: Vec<Row> = self
            .board
            .tasks()
            .iter()
            .map(|task| {
                let due_soon = task.is_due_soon(today);
                let (badge_fg, badge_bg) = urgency_colors(task.urgency);
                let style = if task.completed {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                } else if due_soon {
                    Style::default().fg(DUE_SOON_ORANGE)
                } else {
                    Style::default().fg(Color::White)
                };
                let due = format!(
                    "{}{}",
                    if due_soon { "! " } else { "" },
                    format_due_relative(task.due_date(), today)
                );
                Row::new(vec![
                    Cell::from(if task.completed { "[x]" } else { "[ ]" }),
                    Cell::from(task.task_name.clone()),
                    Cell::from(task.urgency.as_str())
                        .style(Style::default().fg(badge_fg).bg(badge_bg).add_modifier(Modifier::BOLD)),
                    Cell::from(due),
                    Cell::from(truncate(&task.by_when, 10)),
                    Cell::from(truncate(&task.assigned_by, 28)),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(3),
            Constraint::Min(24),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(28),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}) - Press 'h' for help",
                self.board.tasks().len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.table_state);
    }

    fn render_task_form(&self, f: &mut Frame, area: Rect) {
        let is_edit = self.state == AppState::EditTask;
        let popup = centered_rect(60, 70, area);
        f.render_widget(Clear, popup);

        let title = if is_edit { "Edit Task" } else { "Add a new task" };
        let outer = Block::default().borders(Borders::ALL).title(title);
        let inner = outer.inner(popup);
        f.render_widget(outer, popup);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Name
                Constraint::Length(5), // Description
                Constraint::Length(3), // Urgency
                Constraint::Length(3), // Due
                Constraint::Min(1),    // Instructions
            ])
            .split(inner);

        let border = |order: usize| {
            if self.form.current_field == order {
                Style::default().fg(DUE_SOON_ORANGE)
            } else {
                Style::default()
            }
        };
        let boxed = |label: &'static str, order: usize| {
            Block::default().borders(Borders::ALL).title(label).border_style(border(order))
        };

        f.render_widget(
            Paragraph::new(self.form.name.value.as_str()).block(boxed("Task Name *", NAME_ORDER)),
            chunks[0],
        );
        f.render_widget(
            Paragraph::new(self.form.description.value.as_str())
                .block(boxed("Description", DESCRIPTION_ORDER))
                .wrap(Wrap { trim: true }),
            chunks[1],
        );
        let (fg, bg) = urgency_colors(self.form.selected_urgency());
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("< "),
                Span::styled(self.form.selected_urgency().as_str(), Style::default().fg(fg).bg(bg)),
                Span::raw(" >"),
            ]))
            .block(boxed("Urgency", URGENCY_ORDER)),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(self.form.due.value.as_str()).block(boxed("By When", DUE_ORDER)),
            chunks[3],
        );
        f.render_widget(
            Paragraph::new("Tab/Up/Down: field   Left/Right: urgency   Enter: save   Esc: cancel")
                .style(Style::default().fg(Color::Gray)),
            chunks[4],
        );

        let active = match self.form.current_field {
            NAME_ORDER => Some((&self.form.name, chunks[0])),
            DESCRIPTION_ORDER => Some((&self.form.description, chunks[1])),
            DUE_ORDER => Some((&self.form.due, chunks[3])),
            _ => None,
        };
        if let Some((input, rect)) = active {
            f.set_cursor_position((rect.x + 1 + input.cursor as u16, rect.y + 1));
        }
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(Span::styled("My Tasks Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Task List:", bold)),
            Line::from("  ↑/↓, k/j     Move selection"),
            Line::from("  Space/c      Toggle completed"),
            Line::from("  a            Add a new task"),
            Line::from("  e/Enter      Edit selected task"),
            Line::from("  r            Reload from the store"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Esc        Quit"),
            Line::from(""),
            Line::from(Span::styled("Due Date Formats:", bold)),
            Line::from("  YYYY-MM-DD, today, tomorrow, in 3d, in 2w, friday, next mon, eow, eom"),
            Line::from(""),
            Line::from("Orange rows are due within 2 days (overdue included)."),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, bg) = if !self.status_message.is_empty() {
            (self.status_message.clone(), BRAND_PURPLE)
        } else if self.state == AppState::TaskList
            && self.selected_task().is_some_and(|t| t.is_due_soon(self.today))
        {
            ("This task is due within 2 days!".to_string(), DUE_SOON_ORANGE)
        } else {
            let text = match self.state {
                AppState::TaskList => match self.selected_task() {
                    Some(t) => format!("From: {} | Created: {}", t.assigned_by, t.created_at),
                    None => "Press 'a' to add a task".to_string(),
                },
                AppState::AddTask => "Add New Task".to_string(),
                AppState::EditTask => "Edit Task".to_string(),
                AppState::Help => "Help".to_string(),
            };
            (text, BRAND_PURPLE)
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(bg).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::AddTask | AppState::EditTask => {
                self.render_task_list(f, chunks[0]);
                self.render_task_form(f, chunks[0]);
            }
            AppState::Help => self.render_help(f, chunks[0]),
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop: draw, then handle input until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::fields::Urgency;
    use crate::store::memory::MemoryStore;

    fn task(id: &str, by_when: &str) -> Task {
        Task {
            id: id.into(),
            task_name: format!("task {id}"),
            description: String::new(),
            urgency: Urgency::Medium,
            by_when: by_when.into(),
            assigned_by: "a@mathco.com".into(),
            assigned_to: "vivek.joon@mathco.com".into(),
            completed: false,
            created_at: "2026-10-01 09:00".into(),
        }
    }

    fn session() -> Session {
        Session {
            id: "s1".into(),
            user_email: Some("vivek.joon@mathco.com".into()),
            authenticated: true,
            elevated: true,
            editing: None,
        }
    }

    fn press(app: &mut App<'_, MemoryStore>, keys: &[KeyCode]) {
        for key in keys {
            app.handle_key(*key, KeyModifiers::NONE);
        }
    }

    fn type_text(app: &mut App<'_, MemoryStore>, text: &str) {
        for c in text.chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn space_toggles_the_selected_task_and_saves() {
        let mut s = session();
        let board = TaskBoard::open(MemoryStore::with_tasks(vec![task("t1", "2030-01-01"), task("t2", "2030-01-01")]));
        let mut app = App::new(board, &mut s);

        press(&mut app, &[KeyCode::Down, KeyCode::Char(' ')]);
        assert!(!app.board.tasks()[0].completed);
        assert!(app.board.tasks()[1].completed);
        assert_eq!(app.status_message, "Task completed");
    }

    #[test]
    fn add_form_creates_a_task_owned_by_the_recipient() {
        let mut s = session();
        let mut app = App::new(TaskBoard::open(MemoryStore::default()), &mut s);

        press(&mut app, &[KeyCode::Char('a')]);
        assert_eq!(app.state, AppState::AddTask);
        type_text(&mut app, "Prepare slides");
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Right, KeyCode::Right, KeyCode::Enter]);

        assert_eq!(app.state, AppState::TaskList);
        let tasks = app.board.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_name, "Prepare slides");
        assert_eq!(tasks[0].urgency, Urgency::High);
        assert_eq!(tasks[0].assigned_by, "vivek.joon@mathco.com");
        assert_eq!(app.table_state.selected(), Some(0));
    }

    #[test]
    fn blank_name_keeps_the_form_open() {
        let mut s = session();
        let mut app = App::new(TaskBoard::open(MemoryStore::default()), &mut s);
        press(&mut app, &[KeyCode::Char('a'), KeyCode::Enter]);
        assert_eq!(app.state, AppState::AddTask);
        assert_eq!(app.status_message, "Task name is required!");
        assert!(app.board.tasks().is_empty());
    }

    #[test]
    fn edit_is_tracked_in_the_session_and_restored() {
        let mut s = session();
        {
            let board = TaskBoard::open(MemoryStore::with_tasks(vec![task("t1", "not a date")]));
            let mut app = App::new(board, &mut s);
            press(&mut app, &[KeyCode::Char('e')]);
            assert_eq!(app.state, AppState::EditTask);
            assert_eq!(app.form.due.value, app.today.format("%Y-%m-%d").to_string());
        }
        assert_eq!(s.editing.as_deref(), Some("t1"));

        let store = MemoryStore::with_tasks(vec![task("t1", "2030-01-01")]);
        let mut app = App::new(TaskBoard::open(store), &mut s);
        assert_eq!(app.state, AppState::EditTask);
        press(&mut app, &[KeyCode::Backspace, KeyCode::Backspace]);
        type_text(&mut app, "XY");
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(app.board.tasks()[0].task_name, "task XY");
        assert_eq!(app.board.tasks()[0].by_when, "2030-01-01");
        drop(app);
        assert_eq!(s.editing, None);
    }

    #[test]
    fn escape_names_the_form_it_closed() {
        let mut s = session();
        let board = TaskBoard::open(MemoryStore::with_tasks(vec![task("t1", "2030-01-01")]));
        let mut app = App::new(board, &mut s);

        press(&mut app, &[KeyCode::Char('a'), KeyCode::Esc]);
        assert_eq!(app.state, AppState::TaskList);
        assert_eq!(app.status_message, "New task discarded");

        press(&mut app, &[KeyCode::Char('e'), KeyCode::Esc]);
        assert_eq!(app.status_message, "Edit cancelled");
        assert_eq!(app.session.editing, None);
    }

    #[test]
    fn failed_save_is_shown_in_the_status_bar() {
        let mut s = session();
        let store = MemoryStore::with_tasks(vec![task("t1", "2030-01-01")]);
        store.fail_save.set(true);
        let mut app = App::new(TaskBoard::open(store), &mut s);
        press(&mut app, &[KeyCode::Char('c')]);
        assert!(app.board.tasks()[0].completed);
        assert!(app.status_message.starts_with("Failed to save tasks"));
    }

    #[test]
    fn renders_every_screen() {
        let mut s = session();
        let board = TaskBoard::open(MemoryStore::with_tasks(vec![task("t1", "2000-01-01"), task("t2", "x")]));
        let mut app = App::new(board, &mut s);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("MY TASKS"));
        assert!(text.contains("task t1"));
        assert!(text.contains("due within 2 days"));

        press(&mut app, &[KeyCode::Char('a')]);
        terminal.draw(|f| app.render(f)).unwrap();
        press(&mut app, &[KeyCode::Esc, KeyCode::Char('h')]);
        terminal.draw(|f| app.render(f)).unwrap();
        press(&mut app, &[KeyCode::Char('x')]);
        assert_eq!(app.state, AppState::TaskList);
    }

    #[test]
    fn quit_keys() {
        let mut s = session();
        let mut app = App::new(TaskBoard::open(MemoryStore::default()), &mut s);
        assert!(app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    }
}
