//! Task form handling for the terminal user interface.
//!
//! One form serves both "add a new task" and "edit": name, description,
//! urgency selector and due date, in that visual order.

use chrono::NaiveDate;

use crate::fields::Urgency;
use crate::task::{Task, TaskFields, DATE_FORMAT};
use crate::tui::input::InputField;
use crate::util::parse_due_input;

pub const NAME_ORDER: usize = 0;
pub const DESCRIPTION_ORDER: usize = 1;
pub const URGENCY_ORDER: usize = 2;
pub const DUE_ORDER: usize = 3;
const FIELD_COUNT: usize = 4;

pub struct TaskForm {
    pub name: InputField,
    pub description: InputField,
    pub due: InputField,
    pub urgency: usize,
    pub current_field: usize,
    /// Task being edited; `None` for a new task.
    pub editing: Option<String>,
}

impl TaskForm {
    /// Empty form for a new task, due today.
    pub fn new(today: NaiveDate) -> Self {
        let mut form = Self {
            name: InputField::new(),
            description: InputField::new(),
            due: InputField::with_value(&today.format(DATE_FORMAT).to_string()),
            urgency: 0,
            current_field: NAME_ORDER,
            editing: None,
        };
        form.update_active_field();
        form
    }

    /// Form prefilled from `task`; a malformed stored date shows as today.
    pub fn from_task(task: &Task, today: NaiveDate) -> Self {
        let current = TaskFields::from_task(task, today);
        let mut form = Self::new(today);
        form.name = InputField::with_value(&current.task_name);
        form.description = InputField::with_value(&current.description);
        form.due = InputField::with_value(&current.by_when.format(DATE_FORMAT).to_string());
        form.urgency = Urgency::ALL.iter().position(|u| *u == current.urgency).unwrap_or(0);
        form.editing = Some(task.id.clone());
        form.update_active_field();
        form
    }

    pub fn selected_urgency(&self) -> Urgency {
        Urgency::ALL[self.urgency % Urgency::ALL.len()]
    }

    /// Collect the form into task fields. The due date accepts the same inputs as the CLI.
    pub fn to_fields(&self, today: NaiveDate) -> Result<TaskFields, String> {
        let by_when = parse_due_input(&self.due.value, today)
            .ok_or_else(|| format!("Could not understand due date '{}'", self.due.value.trim()))?;
        Ok(TaskFields::new(self.name.value.clone(), self.selected_urgency(), by_when)
            .with_description(self.description.value.clone()))
    }

    fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            NAME_ORDER => Some(&mut self.name),
            DESCRIPTION_ORDER => Some(&mut self.description),
            DUE_ORDER => Some(&mut self.due),
            _ => None,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        self.name.active = self.current_field == NAME_ORDER;
        self.description.active = self.current_field == DESCRIPTION_ORDER;
        self.due.active = self.current_field == DUE_ORDER;
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(input) = self.active_input() {
            input.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(input) = self.active_input() {
            input.handle_delete();
        }
    }

    /// Left/right move the cursor in text fields and cycle the urgency selector.
    pub fn handle_left_right(&mut self, right: bool) {
        if self.current_field == URGENCY_ORDER {
            let n = Urgency::ALL.len();
            self.urgency = if right { (self.urgency + 1) % n } else { (self.urgency + n - 1) % n };
            return;
        }
        if let Some(input) = self.active_input() {
            if right {
                input.move_cursor_right();
            } else {
                input.move_cursor_left();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn task(by_when: &str) -> Task {
        Task {
            id: "ab12cd34".into(),
            task_name: "Review Q4".into(),
            description: "numbers".into(),
            urgency: Urgency::High,
            by_when: by_when.into(),
            assigned_by: "a@mathco.com".into(),
            assigned_to: "vivek.joon@mathco.com".into(),
            completed: false,
            created_at: String::new(),
        }
    }

    #[test]
    fn prefill_uses_stored_values() {
        let form = TaskForm::from_task(&task("2026-11-01"), today());
        assert_eq!(form.name.value, "Review Q4");
        assert_eq!(form.description.value, "numbers");
        assert_eq!(form.selected_urgency(), Urgency::High);
        assert_eq!(form.due.value, "2026-11-01");
        assert_eq!(form.editing.as_deref(), Some("ab12cd34"));
    }

    #[test]
    fn malformed_stored_date_prefills_today() {
        let form = TaskForm::from_task(&task("whenever"), today());
        assert_eq!(form.due.value, "2026-10-16");
    }

    #[test]
    fn typing_goes_to_the_active_field_and_selector_cycles() {
        let mut form = TaskForm::new(today());
        for c in "Slides".chars() {
            form.handle_char(c);
        }
        form.next_field();
        form.next_field();
        form.handle_char('z');
        form.handle_left_right(false);
        assert_eq!(form.selected_urgency(), Urgency::Critical);
        form.handle_left_right(true);
        form.handle_left_right(true);
        assert_eq!(form.selected_urgency(), Urgency::Medium);

        let fields = form.to_fields(today()).unwrap();
        assert_eq!(fields.task_name, "Slides");
        assert_eq!(fields.by_when, today());
    }

    #[test]
    fn due_accepts_natural_language_and_rejects_garbage() {
        let mut form = TaskForm::new(today());
        form.due = InputField::with_value("tomorrow");
        assert_eq!(form.to_fields(today()).unwrap().by_when, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        form.due = InputField::with_value("later");
        assert!(form.to_fields(today()).is_err());
    }

    #[test]
    fn field_navigation_wraps() {
        let mut form = TaskForm::new(today());
        form.prev_field();
        assert_eq!(form.current_field, DUE_ORDER);
        assert!(form.due.active && !form.name.active);
        form.next_field();
        assert_eq!(form.current_field, NAME_ORDER);
    }
}
