//! Enumerations for TUI state management.

/// Which screen the task view is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    TaskList,
    AddTask,
    EditTask,
    Help,
}
