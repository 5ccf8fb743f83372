use crate::background_tasks::{
    spawn_confirm_pending, spawn_create_folder, spawn_download, spawn_folder_load,
    spawn_google_sign_in, spawn_open_folder, spawn_photo_reload, spawn_sign_in, spawn_sign_out,
    spawn_upload,
};
use crate::gallery::View;
use crate::state::{AppState, InputMode, Screen};
use crate::upload::parse_path_list;
use crossterm::event::{self, KeyCode, KeyModifiers};
use std::sync::Arc;
use tokio::sync::RwLock;

pub async fn handle_key_event(
    key: event::KeyEvent,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut state_guard = state_arc.write().await;

    // Any key dismisses the error popup; the key itself is still handled.
    if state_guard.error_message.is_some() {
        state_guard.clear_error_message();
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match state_guard.screen {
        Screen::Auth => handle_auth_input(key, &mut state_guard, state_arc.clone()),
        Screen::Gallery => {
            if state_guard.input_mode != InputMode::Normal {
                handle_prompt_input(key, &mut state_guard, state_arc.clone())
            } else if state_guard.gallery.pending().is_some() {
                handle_confirm_input(key, &mut state_guard, state_arc.clone())
            } else if state_guard.gallery.lightbox().is_open() {
                handle_lightbox_input(key, &mut state_guard, state_arc.clone())
            } else {
                handle_gallery_input(key, &mut state_guard, state_arc.clone())
            }
        }
    }
}

fn handle_auth_input(
    key: event::KeyEvent,
    state_guard: &mut AppState,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    if state_guard.auth_form.busy {
        return Ok(key.code == KeyCode::Esc);
    }

    match key.code {
        KeyCode::Esc => Ok(true),
        KeyCode::Tab | KeyCode::BackTab => {
            state_guard.auth_form.toggle_field();
            Ok(false)
        }
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state_guard.auth_form.toggle_mode();
            Ok(false)
        }
        KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            spawn_google_sign_in(state_arc);
            Ok(false)
        }
        KeyCode::Enter => {
            spawn_sign_in(state_arc);
            Ok(false)
        }
        KeyCode::Char(c) => {
            state_guard.auth_form.focused_text().push(c);
            Ok(false)
        }
        KeyCode::Backspace => {
            state_guard.auth_form.focused_text().pop();
            Ok(false)
        }
        _ => Ok(false),
    }
}

fn handle_prompt_input(
    key: event::KeyEvent,
    state_guard: &mut AppState,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match key.code {
        KeyCode::Esc => state_guard.stop_input(),
        KeyCode::Enter => {
            let input = state_guard.input.clone();
            let mode = state_guard.input_mode;
            state_guard.stop_input();
            match mode {
                InputMode::NewFolder => {
                    spawn_create_folder(state_arc, input);
                }
                InputMode::UploadPaths => {
                    let paths = parse_path_list(&input);
                    if paths.is_empty() {
                        state_guard
                            .set_error_message("Please select one or more files.".to_string());
                    } else {
                        spawn_upload(state_arc, paths);
                    }
                }
                InputMode::Normal => {}
            }
        }
        KeyCode::Char(c) => state_guard.input.push(c),
        KeyCode::Backspace => {
            state_guard.input.pop();
        }
        _ => {}
    }
    Ok(false)
}

fn handle_confirm_input(
    key: event::KeyEvent,
    state_guard: &mut AppState,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            spawn_confirm_pending(state_arc);
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state_guard.gallery.cancel_pending();
        }
        _ => {}
    }
    Ok(false)
}

fn handle_lightbox_input(
    key: event::KeyEvent,
    state_guard: &mut AppState,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    match key.code {
        KeyCode::Right | KeyCode::Char('l') => state_guard.gallery.lightbox_next(),
        KeyCode::Left | KeyCode::Char('h') => state_guard.gallery.lightbox_prev(),
        KeyCode::Char('s') => {
            spawn_download(state_arc);
        }
        KeyCode::Char('d') => {
            let cursor = state_guard.gallery.lightbox().cursor();
            state_guard.gallery.request_delete_photo(cursor);
        }
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
            // Keep the list selection on whatever the lightbox ended on.
            state_guard.selected_item = state_guard.gallery.lightbox().cursor();
            state_guard.gallery.close_lightbox();
            state_guard.update_list_states();
        }
        _ => {}
    }
    Ok(false)
}

fn handle_gallery_input(
    key: event::KeyEvent,
    state_guard: &mut AppState,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let in_folder = matches!(state_guard.gallery.view(), View::PhotoGrid { .. });

    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('?') => state_guard.toggle_help(),
        KeyCode::Char('j') | KeyCode::Down => state_guard.move_down(),
        KeyCode::Char('k') | KeyCode::Up => state_guard.move_up(),
        KeyCode::Enter => {
            if in_folder {
                let index = state_guard.selected_item;
                state_guard.gallery.open_lightbox(index);
            } else if let Some(folder) = state_guard.selected_folder_name().map(str::to_string) {
                spawn_open_folder(state_arc, folder);
            }
        }
        KeyCode::Esc | KeyCode::Backspace if in_folder => {
            state_guard.gallery.back();
            state_guard.selected_item = 0;
            state_guard.update_list_states();
        }
        KeyCode::Char('n') => state_guard.start_input(InputMode::NewFolder),
        KeyCode::Char('u') => {
            if in_folder {
                state_guard.start_input(InputMode::UploadPaths);
            } else {
                state_guard.set_error_message("Please select an album first.".to_string());
            }
        }
        KeyCode::Char('d') => {
            if in_folder {
                let index = state_guard.selected_item;
                state_guard.gallery.request_delete_photo(index);
            } else if let Some(folder) = state_guard.selected_folder_name().map(str::to_string) {
                state_guard.gallery.request_delete_folder(&folder);
            }
        }
        KeyCode::Char('r') => {
            if in_folder {
                spawn_photo_reload(state_arc);
            } else {
                spawn_folder_load(state_arc);
            }
        }
        KeyCode::Char('o') => {
            spawn_sign_out(state_arc);
        }
        _ => {}
    }
    Ok(false)
}
