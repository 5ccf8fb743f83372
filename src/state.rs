use crate::auth::{AuthState, SessionManager};
use crate::gallery::{GalleryController, Status, Ticket, View};
use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Screen {
    Auth,
    Gallery,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AuthField {
    Email,
    Password,
}

pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub mode: AuthMode,
    pub field: AuthField,
    pub error: Option<String>,
    pub busy: bool,
}

impl AuthForm {
    pub fn new() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            mode: AuthMode::SignIn,
            field: AuthField::Email,
            error: None,
            busy: false,
        }
    }

    pub fn focused_text(&mut self) -> &mut String {
        match self.field {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
    }

    /// Local check before anything is sent to the identity provider.
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Please enter both email and password.".to_string());
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.password.clear();
        self.error = None;
        self.busy = false;
    }
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new()
    }
}

/// What the single-line input prompt is collecting, if anything.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    NewFolder,
    UploadPaths,
}

pub struct AppState {
    pub screen: Screen,
    pub auth_form: AuthForm,
    pub input_mode: InputMode,
    pub input: String,
    pub show_help: bool,
    pub selected_folder: usize,
    pub folder_state: ListState,
    pub selected_item: usize,
    pub item_state: ListState,
    pub session: Arc<SessionManager>,
    pub gallery: GalleryController,
    pub download_dir: PathBuf,
    // Error message for display
    pub error_message: Option<String>,
}

impl AppState {
    pub fn new(
        session: Arc<SessionManager>,
        gallery: GalleryController,
        download_dir: PathBuf,
    ) -> Self {
        let mut folder_state = ListState::default();
        folder_state.select(Some(0));
        let mut item_state = ListState::default();
        item_state.select(Some(0));
        Self {
            screen: Screen::Auth,
            auth_form: AuthForm::new(),
            input_mode: InputMode::Normal,
            input: String::new(),
            show_help: false,
            selected_folder: 0,
            folder_state,
            selected_item: 0,
            item_state,
            session,
            gallery,
            download_dir,
            error_message: None,
        }
    }

    pub fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn clear_error_message(&mut self) {
        self.error_message = None;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Moves a controller error into the popup and keeps selections inside their lists.
    pub fn sync_from_gallery(&mut self) {
        if let Some(Status::Error(message)) = self.gallery.status().cloned() {
            self.gallery.clear_status();
            self.set_error_message(message);
        }
        self.clamp_selection();
    }

    /// Switches screens for an auth transition. A sign-in returns the ticket of the
    /// folder load the caller should run.
    pub fn switch_auth_state(&mut self, auth: AuthState) -> Option<Ticket> {
        let signed_in = auth.is_signed_in();
        let load = self.gallery.reset_for_auth(auth);
        if signed_in {
            self.screen = Screen::Gallery;
            self.auth_form.reset();
        } else {
            self.screen = Screen::Auth;
            self.auth_form.busy = false;
            self.input_mode = InputMode::Normal;
            self.input.clear();
            self.selected_folder = 0;
            self.selected_item = 0;
        }
        self.sync_from_gallery();
        load
    }

    pub async fn apply_auth_state(&mut self, auth: AuthState) {
        if let Some(ticket) = self.switch_auth_state(auth) {
            let result = self.gallery.api().list_folders().await;
            let _ = self.gallery.finish_folder_load(&ticket, result);
            self.sync_from_gallery();
        }
    }

    pub fn selected_folder_name(&self) -> Option<&str> {
        self.gallery
            .folders()
            .get(self.selected_folder)
            .map(String::as_str)
    }

    pub fn start_input(&mut self, mode: InputMode) {
        self.input_mode = mode;
        self.input.clear();
    }

    pub fn stop_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    pub fn move_up(&mut self) {
        match self.gallery.view() {
            View::FolderList => {
                self.selected_folder = self.selected_folder.saturating_sub(1);
            }
            View::PhotoGrid { .. } => {
                self.selected_item = self.selected_item.saturating_sub(1);
            }
        }
        self.update_list_states();
    }

    pub fn move_down(&mut self) {
        match self.gallery.view() {
            View::FolderList => {
                if self.selected_folder + 1 < self.gallery.folders().len() {
                    self.selected_folder += 1;
                }
            }
            View::PhotoGrid { .. } => {
                if self.selected_item + 1 < self.gallery.items().len() {
                    self.selected_item += 1;
                }
            }
        }
        self.update_list_states();
    }

    pub fn clamp_selection(&mut self) {
        let folders = self.gallery.folders().len();
        if self.selected_folder >= folders {
            self.selected_folder = folders.saturating_sub(1);
        }
        let items = self.gallery.items().len();
        if self.selected_item >= items {
            self.selected_item = items.saturating_sub(1);
        }
        self.update_list_states();
    }

    pub fn update_list_states(&mut self) {
        self.folder_state.select(Some(self.selected_folder));
        self.item_state.select(Some(self.selected_item));
    }
}
