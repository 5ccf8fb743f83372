use crate::gallery::{Status, View};
use crate::media::{format_size, MediaKind};
use crate::state::{AppState, AuthField, AuthMode, InputMode, Screen};
use ratatui::{prelude::*, widgets::*};

// Draw loading screen
pub fn draw_loading_screen(f: &mut ratatui::Frame, message: &str) {
    let area = f.size();

    let loading_text = Paragraph::new(message)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Gallery")
                .padding(Padding::uniform(1)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    let vertical_center = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(5),
            Constraint::Percentage(55),
        ])
        .split(area);

    let horizontal_center = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(vertical_center[1]);

    f.render_widget(loading_text, horizontal_center[1]);
}

pub fn draw_ui(f: &mut ratatui::Frame, state: &mut AppState) {
    match state.screen {
        Screen::Auth => draw_auth_screen(f, state),
        Screen::Gallery => draw_gallery_ui(f, state),
    }

    // Error popup goes over everything else
    if state.error_message.is_some() {
        draw_error_popup(f, state);
    }
}

pub fn draw_auth_screen(f: &mut ratatui::Frame, state: &mut AppState) {
    let area = f.size();
    let popup_area = centered_rect(60, 60, area);
    let form = &state.auth_form;

    let title = match form.mode {
        AuthMode::SignIn => "Sign in",
        AuthMode::SignUp => "Create account",
    };
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Blue));
    f.render_widget(outer, popup_area);

    let inner_area = popup_area.inner(&Margin {
        horizontal: 2,
        vertical: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Length(3), // Error or progress
            Constraint::Min(0),    // Key hints
        ])
        .split(inner_area);

    let field_style = |field: AuthField| {
        if form.field == field {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };

    let email = Paragraph::new(form.email.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Email:")
            .border_style(field_style(AuthField::Email)),
    );
    f.render_widget(email, chunks[0]);

    let masked = "*".repeat(form.password.chars().count());
    let password = Paragraph::new(masked).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Password:")
            .border_style(field_style(AuthField::Password)),
    );
    f.render_widget(password, chunks[1]);

    let (feedback, feedback_style) = if form.busy {
        (
            "Signing in...".to_string(),
            Style::default().fg(Color::Gray),
        )
    } else if let Some(error) = &form.error {
        (error.clone(), Style::default().fg(Color::Red))
    } else {
        (String::new(), Style::default())
    };
    f.render_widget(
        Paragraph::new(feedback)
            .style(feedback_style)
            .wrap(Wrap { trim: true }),
        chunks[2],
    );

    let toggle_hint = match form.mode {
        AuthMode::SignIn => "Ctrl+T: Create an account instead",
        AuthMode::SignUp => "Ctrl+T: Sign in to an existing account",
    };
    let hints = vec![
        "Enter: Submit | Tab: Switch field",
        toggle_hint,
        "Ctrl+G: Sign in with Google | Esc: Quit",
    ]
    .join("\n");
    f.render_widget(
        Paragraph::new(hints)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        chunks[3],
    );

    if !form.busy {
        let (chunk, len) = match form.field {
            AuthField::Email => (chunks[0], form.email.chars().count()),
            AuthField::Password => (chunks[1], form.password.chars().count()),
        };
        f.set_cursor(chunk.x + 1 + len as u16, chunk.y + 1);
    }
}

pub fn draw_gallery_ui(f: &mut ratatui::Frame, state: &mut AppState) {
    let main_chunks = if state.show_help {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(7),
            ])
            .split(f.size())
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.size())
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(main_chunks[0]);

    let in_folder = matches!(state.gallery.view(), View::PhotoGrid { .. });

    // Left: Albums
    let user = state
        .gallery
        .identity()
        .map(|identity| identity.label().to_string())
        .unwrap_or_default();
    let folder_items: Vec<_> = state
        .gallery
        .folders()
        .iter()
        .map(|name| ListItem::new(name.as_str()))
        .collect();
    let folders_border_style = if in_folder {
        Style::default()
    } else {
        Style::default().fg(Color::Green)
    };
    let folders = List::new(folder_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Albums ({})", user))
                .border_style(folders_border_style)
                .padding(Padding::uniform(1)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    f.render_stateful_widget(folders, chunks[0], &mut state.folder_state);

    // Right: Media in the open album
    let media_title = match state.gallery.view() {
        View::PhotoGrid { folder } => format!("{} ({} items)", folder, state.gallery.items().len()),
        View::FolderList => "Media".to_string(),
    };
    let media_items: Vec<_> = if state.gallery.is_loading() && state.gallery.items().is_empty() {
        vec![ListItem::new(""), ListItem::new("Loading media...")]
    } else if !in_folder {
        vec![ListItem::new("Press Enter to open the selected album.")]
    } else if state.gallery.items().is_empty() {
        vec![ListItem::new("This album is empty. Press u to upload.")]
    } else {
        state
            .gallery
            .items()
            .iter()
            .map(|item| {
                let icon = match item.kind() {
                    MediaKind::Image => "🖼",
                    MediaKind::Video => "🎬",
                };
                let size = item.size.map(format_size).unwrap_or_default();
                ListItem::new(format!("{} {}  {}", icon, item.display_name(), size))
            })
            .collect()
    };
    let media_border_style = if in_folder {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    let media = List::new(media_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(media_title)
                .border_style(media_border_style)
                .padding(Padding::uniform(1)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    if in_folder {
        f.render_stateful_widget(media, chunks[1], &mut state.item_state);
    } else {
        f.render_widget(media, chunks[1]);
    }

    // Status line
    let (status_text, status_style) = if state.gallery.is_uploading() {
        (
            "Uploading...".to_string(),
            Style::default().fg(Color::Yellow),
        )
    } else {
        match state.gallery.status() {
            Some(Status::Info(message)) => (message.clone(), Style::default().fg(Color::Green)),
            Some(Status::Error(message)) => (message.clone(), Style::default().fg(Color::Red)),
            None => ("Press ? for help".to_string(), Style::default().fg(Color::Gray)),
        }
    };
    f.render_widget(Paragraph::new(status_text).style(status_style), main_chunks[1]);

    if state.show_help {
        let help_text = if in_folder {
            vec![
                "j/k or ↑/↓: Move | Enter: Open in lightbox | Esc: Back to albums",
                "u: Upload files | d: Delete item | r: Reload",
                "Lightbox: ←/→ or h/l: Previous/next | s: Save | d: Delete | Esc: Close",
                "n: New album | o: Sign out | ?: Toggle this help | q: Quit",
            ]
        } else {
            vec![
                "j/k or ↑/↓: Move | Enter: Open album",
                "n: New album | d: Delete album | r: Reload albums",
                "o: Sign out | ?: Toggle this help | q: Quit",
            ]
        }
        .join("\n");

        let help_bar = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help (Press ? to toggle)"),
            )
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true });
        f.render_widget(help_bar, main_chunks[2]);
    }

    if state.gallery.lightbox().is_open() {
        draw_lightbox(f, state);
    }
    if state.gallery.pending().is_some() {
        draw_confirm_popup(f, state);
    }
    if state.input_mode != InputMode::Normal {
        draw_input_prompt(f, state);
    }
}

pub fn draw_lightbox(f: &mut ratatui::Frame, state: &mut AppState) {
    let Some(view) = state.gallery.lightbox().current() else {
        return;
    };
    let area = f.size();
    let popup_area = centered_rect(70, 60, area);
    f.render_widget(Clear, popup_area);

    let player = state.gallery.lightbox().player();
    let playback = match view.kind {
        MediaKind::Video if player.playing => "▶ Playing",
        MediaKind::Video => "⏸ Stopped",
        MediaKind::Image => "",
    };
    let mut lines = vec![
        Line::from(Span::styled(
            view.item.display_name().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Type: {}", view.kind.label())),
        Line::from(format!("URL: {}", view.item.url)),
    ];
    if let Some(size) = view.item.size {
        lines.push(Line::from(format!("Size: {}", format_size(size))));
    }
    if let Some(updated) = view.item.updated {
        lines.push(Line::from(format!(
            "Updated: {}",
            updated.format("%b %-d, %Y %H:%M")
        )));
    }
    if !playback.is_empty() {
        lines.push(Line::from(playback));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "←/→: Navigate | s: Save | d: Delete | Esc: Close",
        Style::default().fg(Color::Gray),
    )));

    let block = Block::default()
        .title(format!("{} / {}", view.position, view.total))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .padding(Padding::uniform(1));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup_area);
}

pub fn draw_confirm_popup(f: &mut ratatui::Frame, state: &mut AppState) {
    if let Some(pending) = state.gallery.pending() {
        let popup_area = centered_rect(50, 20, f.size());
        f.render_widget(Clear, popup_area);

        let paragraph = Paragraph::new(pending.prompt())
            .block(
                Block::default()
                    .title("Confirm")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, popup_area);
    }
}

pub fn draw_input_prompt(f: &mut ratatui::Frame, state: &mut AppState) {
    let title = match state.input_mode {
        InputMode::NewFolder => "New album name (letters, numbers, - and _)",
        InputMode::UploadPaths => "Files to upload (space separated, quote paths with spaces)",
        InputMode::Normal => return,
    };
    let area = f.size();
    let popup = centered_rect(70, 20, area);
    let popup_area = Rect {
        height: area.height.min(3),
        ..popup
    };
    f.render_widget(Clear, popup_area);

    let input = Paragraph::new(state.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(input, popup_area);
    f.set_cursor(
        popup_area.x + 1 + state.input.chars().count() as u16,
        popup_area.y + 1,
    );
}

// Draw error popup
pub fn draw_error_popup(f: &mut ratatui::Frame, state: &mut AppState) {
    if let Some(error_msg) = &state.error_message {
        let area = f.size();
        let popup_area = centered_rect(60, 20, area);

        f.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));

        let paragraph = Paragraph::new(error_msg.clone())
            .block(block)
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, popup_area);
    }
}

// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
