//! TUI entry point and terminal setup.

use std::io;
use std::sync::Once;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::access::Session;
use crate::board::TaskBoard;
use crate::store::TaskStore;
use crate::tui::app::App;

/// Initialise the terminal, run the task view until the user quits, then restore it.
pub fn run_tui<S: TaskStore>(board: TaskBoard<S>, session: &mut Session) -> io::Result<()> {
    install_restore_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(board, session);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Leave raw mode and the alternate screen before the previous panic hook
/// prints, so a panic inside the loop does not strand the terminal.
fn install_restore_hook() {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| {
        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
            previous_hook(panic_info);
        }));
    });
}
