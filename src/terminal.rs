use crossterm::{execute, terminal};
use ratatui::Terminal;
use std::io::{self, stdout};

pub type GalleryTerminal = Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

pub fn setup_terminal() -> Result<GalleryTerminal, Box<dyn std::error::Error>> {
    terminal::enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn cleanup_terminal(terminal: &mut GalleryTerminal) -> io::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        terminal::Clear(terminal::ClearType::All),
        terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}
