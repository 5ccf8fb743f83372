use crate::auth::AuthState;
use crate::gallery::{run_pending, Refresh, Ticket};
use crate::state::{AppState, AuthMode};
use crate::upload::{upload_batch, UploadFile};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;

// Every task below takes the state lock only to start and to apply its work.
// Network calls run with the lock released so the UI keeps drawing and reading keys.

// Applies an auth transition to the gallery and switches screens
pub fn spawn_auth_change(state_arc: Arc<RwLock<AppState>>, auth: AuthState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let load = state_arc.write().await.switch_auth_state(auth);
        if let Some(ticket) = load {
            fetch_folders(&state_arc, ticket).await;
        }
    })
}

pub fn spawn_folder_load(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ticket = state_arc.write().await.gallery.begin_folder_load();
        fetch_folders(&state_arc, ticket).await;
    })
}

pub fn spawn_open_folder(state_arc: Arc<RwLock<AppState>>, folder: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (api, ticket) = {
            let mut state_guard = state_arc.write().await;
            state_guard.selected_item = 0;
            let ticket = state_guard.gallery.begin_select_folder(&folder);
            state_guard.sync_from_gallery();
            (state_guard.gallery.api(), ticket)
        };

        let result = api.list_photos(&folder).await;

        let mut state_guard = state_arc.write().await;
        let _ = state_guard.gallery.finish_select_folder(&ticket, result);
        state_guard.sync_from_gallery();
    })
}

pub fn spawn_photo_reload(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ticket = state_arc.write().await.gallery.begin_photo_reload();
        if let Some(ticket) = ticket {
            fetch_photos(&state_arc, ticket).await;
        }
    })
}

pub fn spawn_create_folder(state_arc: Arc<RwLock<AppState>>, name: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (api, ticket, name) = {
            let mut state_guard = state_arc.write().await;
            match state_guard.gallery.begin_create_folder(&name) {
                Ok(name) => (state_guard.gallery.api(), state_guard.gallery.ticket(), name),
                Err(_) => {
                    state_guard.sync_from_gallery();
                    return;
                }
            }
        };

        let result = api.create_folder(&name).await;

        let created = {
            let mut state_guard = state_arc.write().await;
            let created = state_guard
                .gallery
                .finish_create_folder(&ticket, &name, result)
                .is_ok();
            state_guard.sync_from_gallery();
            created.then(|| state_guard.gallery.begin_folder_load())
        };
        if let Some(ticket) = created {
            fetch_folders(&state_arc, ticket).await;
        }
    })
}

pub fn spawn_confirm_pending(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (api, ticket, action) = {
            let mut state_guard = state_arc.write().await;
            let Some((ticket, action)) = state_guard.gallery.take_pending() else {
                return;
            };
            (state_guard.gallery.api(), ticket, action)
        };

        let result = run_pending(api.as_ref(), &action).await;

        let follow_up = {
            let mut state_guard = state_arc.write().await;
            let refresh = state_guard.gallery.finish_pending(&ticket, &action, result);
            state_guard.sync_from_gallery();
            match refresh {
                Ok(Refresh::Photos(folder)) => {
                    state_guard.gallery.begin_reload_of(&folder).map(FollowUp::Photos)
                }
                Ok(Refresh::Folders) => Some(FollowUp::Folders(
                    state_guard.gallery.begin_folder_load(),
                )),
                Ok(Refresh::Nothing) | Err(_) => None,
            }
        };
        match follow_up {
            Some(FollowUp::Photos(ticket)) => fetch_photos(&state_arc, ticket).await,
            Some(FollowUp::Folders(ticket)) => fetch_folders(&state_arc, ticket).await,
            None => {}
        }
    })
}

pub fn spawn_download(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (api, download) = {
            let mut state_guard = state_arc.write().await;
            let dir = state_guard.download_dir.clone();
            match state_guard.gallery.begin_download(&dir) {
                Ok(download) => (state_guard.gallery.api(), download),
                Err(_) => {
                    state_guard.sync_from_gallery();
                    return;
                }
            }
        };

        let result = download.save(api.as_ref()).await;

        let mut state_guard = state_arc.write().await;
        let _ = state_guard.gallery.finish_download(&download, result);
        state_guard.sync_from_gallery();
    })
}

/// Uploads `paths` into the active folder. The state lock is only held to start
/// and finish the batch, never while bytes are in flight.
pub fn spawn_upload(state_arc: Arc<RwLock<AppState>>, paths: Vec<PathBuf>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut files = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in &paths {
            match UploadFile::from_path(path).await {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable upload");
                    unreadable.push(e.to_string());
                }
            }
        }

        let (plan, api) = {
            let mut state_guard = state_arc.write().await;
            if !unreadable.is_empty() {
                state_guard.set_error_message(unreadable.join("\n"));
                if files.is_empty() {
                    return;
                }
            }
            match state_guard.gallery.begin_upload(files) {
                Ok(plan) => (plan, state_guard.gallery.api()),
                Err(_) => {
                    state_guard.sync_from_gallery();
                    return;
                }
            }
        };

        let result = upload_batch(api.as_ref(), &plan.folder, plan.files, plan.limits).await;

        let reload = {
            let mut state_guard = state_arc.write().await;
            let finished = state_guard.gallery.finish_upload(&plan.ticket, result);
            state_guard.sync_from_gallery();
            match finished {
                Ok(summary) if !summary.session_expired() => {
                    state_guard.gallery.begin_reload_of(&plan.folder)
                }
                _ => None,
            }
        };
        if let Some(ticket) = reload {
            fetch_photos(&state_arc, ticket).await;
        }
    })
}

/// Email/password sign-in or sign-up. The lock is released while the provider is contacted;
/// a successful sign-in switches screens through the auth subscription.
pub fn spawn_sign_in(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (session, mode, email, password) = {
            let mut state_guard = state_arc.write().await;
            if let Err(message) = state_guard.auth_form.validate() {
                state_guard.auth_form.error = Some(message);
                return;
            }
            state_guard.auth_form.busy = true;
            state_guard.auth_form.error = None;
            let form = &state_guard.auth_form;
            (
                state_guard.session.clone(),
                form.mode,
                form.email.clone(),
                form.password.clone(),
            )
        };

        let result = match mode {
            AuthMode::SignIn => session.sign_in(&email, &password).await,
            AuthMode::SignUp => session.sign_up(&email, &password).await,
        };

        let mut state_guard = state_arc.write().await;
        state_guard.auth_form.busy = false;
        if let Err(e) = result {
            state_guard.auth_form.error = Some(e.to_string());
        }
    })
}

pub fn spawn_google_sign_in(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let session = {
            let mut state_guard = state_arc.write().await;
            state_guard.auth_form.busy = true;
            state_guard.auth_form.error = None;
            state_guard.session.clone()
        };

        let result = session.sign_in_with_google().await;

        let mut state_guard = state_arc.write().await;
        state_guard.auth_form.busy = false;
        if let Err(e) = result {
            state_guard.auth_form.error = Some(e.to_string());
        }
    })
}

pub fn spawn_sign_out(state_arc: Arc<RwLock<AppState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let session = state_arc.read().await.session.clone();
        session.sign_out().await;
    })
}

enum FollowUp {
    Photos(Ticket),
    Folders(Ticket),
}

async fn fetch_folders(state_arc: &Arc<RwLock<AppState>>, ticket: Ticket) {
    let api = state_arc.read().await.gallery.api();
    let result = api.list_folders().await;

    let mut state_guard = state_arc.write().await;
    let _ = state_guard.gallery.finish_folder_load(&ticket, result);
    state_guard.sync_from_gallery();
}

async fn fetch_photos(state_arc: &Arc<RwLock<AppState>>, ticket: Ticket) {
    let Some(folder) = ticket.folder().map(str::to_string) else {
        return;
    };
    let api = state_arc.read().await.gallery.api();
    let result = api.list_photos(&folder).await;

    let mut state_guard = state_arc.write().await;
    let _ = state_guard.gallery.finish_photo_reload(&ticket, result);
    state_guard.sync_from_gallery();
}
