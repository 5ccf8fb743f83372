use crate::api::GalleryApi;
use crate::auth::{AuthState, Identity};
use crate::error::GalleryError;
use crate::lightbox::Lightbox;
use crate::media::MediaItem;
use crate::upload::{upload_batch, UploadFile, UploadLimits, UploadSummary};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

lazy_static! {
    static ref FOLDER_NAME: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("folder name pattern is valid");
}

/// Checks a folder name locally. Returns the trimmed name.
pub fn validate_folder_name(name: &str) -> Result<String, GalleryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GalleryError::Validation(
            "Please enter an album name.".to_string(),
        ));
    }
    if !FOLDER_NAME.is_match(trimmed) {
        return Err(GalleryError::Validation(
            "Album names may only contain letters, numbers, '-' and '_'.".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    FolderList,
    PhotoGrid { folder: String },
}

/// A destructive action waiting for the user's yes/no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeletePhoto { filename: String, name: String },
    DeleteFolder { name: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeletePhoto { name, .. } => {
                format!("Are you sure you want to delete {}? (y/n)", name)
            }
            PendingAction::DeleteFolder { name } => format!(
                "Delete album {} and everything in it? (y/n)",
                name
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// Snapshot of the session and open folder a request was started from.
/// Its result is only applied while the snapshot still holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    folder: Option<String>,
}

impl Ticket {
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }
}

/// What a finished delete leaves stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    Photos(String),
    Folders,
    Nothing,
}

/// Everything a background task needs to run an upload without holding the controller.
#[derive(Debug)]
pub struct UploadPlan {
    pub ticket: Ticket,
    pub folder: String,
    pub files: Vec<UploadFile>,
    pub limits: UploadLimits,
}

/// A lightbox item being saved to disk.
#[derive(Debug, Clone)]
pub struct Download {
    ticket: Ticket,
    pub url: String,
    pub target: PathBuf,
}

impl Download {
    pub async fn save(&self, api: &dyn GalleryApi) -> Result<PathBuf, GalleryError> {
        let bytes = api.download(&self.url).await?;
        tokio::fs::write(&self.target, &bytes).await.map_err(|e| {
            GalleryError::Validation(format!("Cannot write {}: {}", self.target.display(), e))
        })?;
        info!(path = %self.target.display(), bytes = bytes.len(), "download saved");
        Ok(self.target.clone())
    }
}

pub struct GalleryController {
    api: Arc<dyn GalleryApi>,
    // Bumped on every auth change; results from an earlier session are dropped.
    epoch: u64,
    identity: Option<Identity>,
    view: View,
    folders: Vec<String>,
    lightbox: Lightbox,
    pending: Option<PendingAction>,
    status: Option<Status>,
    loading: bool,
    uploading: bool,
    limits: UploadLimits,
}

impl GalleryController {
    pub fn new(api: Arc<dyn GalleryApi>, limits: UploadLimits) -> Self {
        Self {
            api,
            epoch: 0,
            identity: None,
            view: View::FolderList,
            folders: Vec::new(),
            lightbox: Lightbox::new(),
            pending: None,
            status: None,
            loading: false,
            uploading: false,
            limits,
        }
    }

    pub fn api(&self) -> Arc<dyn GalleryApi> {
        self.api.clone()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn current_folder(&self) -> Option<&str> {
        match &self.view {
            View::PhotoGrid { folder } => Some(folder),
            View::FolderList => None,
        }
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn items(&self) -> &[MediaItem] {
        self.lightbox.items()
    }

    pub fn lightbox(&self) -> &Lightbox {
        &self.lightbox
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Info(message.into()));
    }

    fn fail(&mut self, context: &str, error: &GalleryError) {
        warn!(context, %error, "gallery operation failed");
        let message = match error {
            GalleryError::Unauthenticated => {
                "Session expired. Please sign in again.".to_string()
            }
            GalleryError::Validation(message) => message.clone(),
            other => format!("{}: {}", context, other),
        };
        self.status = Some(Status::Error(message));
    }

    /// Snapshot of the session and view, taken when a request is started.
    pub fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            folder: self.current_folder().map(str::to_string),
        }
    }

    fn same_session(&self, ticket: &Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    fn still_showing(&self, ticket: &Ticket) -> bool {
        self.same_session(ticket) && self.current_folder() == ticket.folder()
    }

    /// Resets the gallery for a new auth state. A sign-in returns the ticket of the
    /// folder load that should follow.
    pub fn reset_for_auth(&mut self, state: AuthState) -> Option<Ticket> {
        self.epoch += 1;
        self.view = View::FolderList;
        self.lightbox.close();
        self.lightbox.set_items(Vec::new());
        self.pending = None;
        self.uploading = false;
        match state {
            AuthState::SignedIn(identity) => {
                info!(uid = %identity.uid, "signed in, loading albums");
                self.identity = Some(identity);
                Some(self.begin_folder_load())
            }
            AuthState::SignedOut => {
                info!("signed out, clearing gallery");
                self.identity = None;
                self.folders.clear();
                self.loading = false;
                None
            }
        }
    }

    pub async fn on_auth_change(&mut self, state: AuthState) {
        if let Some(ticket) = self.reset_for_auth(state) {
            let result = self.api.list_folders().await;
            let _ = self.finish_folder_load(&ticket, result);
        }
    }

    pub fn begin_folder_load(&mut self) -> Ticket {
        self.loading = true;
        self.ticket()
    }

    pub fn finish_folder_load(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<String>, GalleryError>,
    ) -> Result<(), GalleryError> {
        if !self.same_session(ticket) {
            debug!("dropping album list from an earlier session");
            return result.map(|_| ());
        }
        self.loading = false;
        match result {
            Ok(folders) => {
                self.folders = folders;
                Ok(())
            }
            Err(e) => {
                self.fail("Could not load albums", &e);
                Err(e)
            }
        }
    }

    pub async fn load_folders(&mut self) -> Result<(), GalleryError> {
        let ticket = self.begin_folder_load();
        let result = self.api.list_folders().await;
        self.finish_folder_load(&ticket, result)
    }

    /// Folder List → Photo Grid. The view switches at once; items arrive with
    /// [`finish_select_folder`](Self::finish_select_folder).
    pub fn begin_select_folder(&mut self, name: &str) -> Ticket {
        self.lightbox.close();
        self.lightbox.set_items(Vec::new());
        self.view = View::PhotoGrid {
            folder: name.to_string(),
        };
        self.loading = true;
        self.ticket()
    }

    /// Applies a folder's listing if it is still the open folder. On failure the view
    /// falls back to the folder list.
    pub fn finish_select_folder(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<MediaItem>, GalleryError>,
    ) -> Result<(), GalleryError> {
        if !self.still_showing(ticket) {
            debug!(folder = ?ticket.folder(), "album closed before its listing arrived");
            return result.map(|_| ());
        }
        self.loading = false;
        match result {
            Ok(items) => {
                info!(folder = ?ticket.folder(), count = items.len(), "album loaded");
                self.lightbox.set_items(items);
                self.status = None;
                Ok(())
            }
            Err(e) => {
                self.view = View::FolderList;
                self.lightbox.set_items(Vec::new());
                self.fail("Could not load media", &e);
                Err(e)
            }
        }
    }

    pub async fn select_folder(&mut self, name: &str) -> Result<(), GalleryError> {
        let ticket = self.begin_select_folder(name);
        let result = self.api.list_photos(name).await;
        self.finish_select_folder(&ticket, result)
    }

    /// Starts a reload of the active folder. `None` on the folder list.
    pub fn begin_photo_reload(&mut self) -> Option<Ticket> {
        self.current_folder()?;
        self.loading = true;
        Some(self.ticket())
    }

    /// Starts a reload of `folder`, but only if it is still the active view.
    pub fn begin_reload_of(&mut self, folder: &str) -> Option<Ticket> {
        if self.current_folder() != Some(folder) {
            info!(folder, "album no longer open, skipping reload");
            return None;
        }
        self.begin_photo_reload()
    }

    pub fn finish_photo_reload(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<MediaItem>, GalleryError>,
    ) -> Result<(), GalleryError> {
        if !self.still_showing(ticket) {
            debug!(folder = ?ticket.folder(), "dropping reload for a closed album");
            return result.map(|_| ());
        }
        self.loading = false;
        match result {
            Ok(items) => {
                self.lightbox.set_items(items);
                Ok(())
            }
            Err(e) => {
                self.fail("Could not load media", &e);
                Err(e)
            }
        }
    }

    /// Reloads the active folder's items. A no-op on the folder list.
    pub async fn reload_photos(&mut self) -> Result<(), GalleryError> {
        let Some(ticket) = self.begin_photo_reload() else {
            return Ok(());
        };
        let result = match ticket.folder() {
            Some(folder) => self.api.list_photos(folder).await,
            None => return Ok(()),
        };
        self.finish_photo_reload(&ticket, result)
    }

    pub fn back(&mut self) {
        self.lightbox.close();
        self.lightbox.set_items(Vec::new());
        self.view = View::FolderList;
    }

    /// Validates the name before any request. Returns the trimmed name to send.
    pub fn begin_create_folder(&mut self, name: &str) -> Result<String, GalleryError> {
        validate_folder_name(name).map_err(|e| {
            self.fail("Invalid album name", &e);
            e
        })
    }

    pub fn finish_create_folder(
        &mut self,
        ticket: &Ticket,
        name: &str,
        result: Result<(), GalleryError>,
    ) -> Result<(), GalleryError> {
        if !self.same_session(ticket) {
            return result;
        }
        match result {
            Ok(()) => {
                info!(folder = %name, "album created");
                self.info(format!("Album {} created.", name));
                Ok(())
            }
            Err(e) => {
                self.fail("Could not create album", &e);
                Err(e)
            }
        }
    }

    /// Creates a folder, then reloads the folder list.
    pub async fn create_folder(&mut self, name: &str) -> Result<(), GalleryError> {
        let name = self.begin_create_folder(name)?;
        let ticket = self.ticket();
        let result = self.api.create_folder(&name).await;
        self.finish_create_folder(&ticket, &name, result)?;
        self.load_folders().await
    }

    /// Asks for confirmation before deleting the item at `index` of the current list.
    pub fn request_delete_photo(&mut self, index: usize) -> bool {
        let Some(item) = self.items().get(index) else {
            return false;
        };
        self.pending = Some(PendingAction::DeletePhoto {
            filename: item.filename.clone(),
            name: item.display_name().to_string(),
        });
        true
    }

    pub fn request_delete_folder(&mut self, name: &str) {
        self.pending = Some(PendingAction::DeleteFolder {
            name: name.to_string(),
        });
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Takes the confirmed action out of the controller so it can run without it.
    pub fn take_pending(&mut self) -> Option<(Ticket, PendingAction)> {
        let action = self.pending.take()?;
        Some((self.ticket(), action))
    }

    /// Applies the outcome of a confirmed delete. Returns what has to be reloaded.
    pub fn finish_pending(
        &mut self,
        ticket: &Ticket,
        action: &PendingAction,
        result: Result<(), GalleryError>,
    ) -> Result<Refresh, GalleryError> {
        if !self.same_session(ticket) {
            return result.map(|_| Refresh::Nothing);
        }
        match (action, result) {
            (PendingAction::DeletePhoto { filename, .. }, Ok(())) => {
                info!(%filename, "media deleted");
                self.info("Deleted.");
                Ok(ticket
                    .folder()
                    .map(|folder| Refresh::Photos(folder.to_string()))
                    .unwrap_or(Refresh::Nothing))
            }
            (PendingAction::DeleteFolder { name }, Ok(())) => {
                info!(folder = %name, "album deleted");
                if self.current_folder() == Some(name.as_str()) {
                    self.back();
                }
                self.info(format!("Album {} deleted.", name));
                Ok(Refresh::Folders)
            }
            (PendingAction::DeletePhoto { .. }, Err(e)) => {
                self.fail("Could not delete media", &e);
                Err(e)
            }
            (PendingAction::DeleteFolder { .. }, Err(e)) => {
                self.fail("Could not delete album", &e);
                Err(e)
            }
        }
    }

    pub async fn confirm_pending(&mut self) -> Result<(), GalleryError> {
        let Some((ticket, action)) = self.take_pending() else {
            return Ok(());
        };
        let result = run_pending(self.api.as_ref(), &action).await;
        match self.finish_pending(&ticket, &action, result)? {
            Refresh::Photos(folder) => {
                if let Some(ticket) = self.begin_reload_of(&folder) {
                    let result = self.api.list_photos(&folder).await;
                    self.finish_photo_reload(&ticket, result)?;
                }
                Ok(())
            }
            Refresh::Folders => self.load_folders().await,
            Refresh::Nothing => Ok(()),
        }
    }

    /// Validates an upload against the current view and marks it in progress.
    pub fn begin_upload(&mut self, files: Vec<UploadFile>) -> Result<UploadPlan, GalleryError> {
        let Some(folder) = self.current_folder().map(str::to_string) else {
            let e = GalleryError::Validation("Please select an album first.".to_string());
            self.fail("Upload", &e);
            return Err(e);
        };
        if files.is_empty() {
            let e = GalleryError::Validation("Please select one or more files.".to_string());
            self.fail("Upload", &e);
            return Err(e);
        }
        self.uploading = true;
        self.info(format!("Uploading {} file(s)...", files.len()));
        Ok(UploadPlan {
            ticket: self.ticket(),
            folder,
            files,
            limits: self.limits,
        })
    }

    /// Applies a finished batch's summary status. The caller reloads through
    /// [`begin_reload_of`](Self::begin_reload_of), which skips a folder that is no longer open.
    pub fn finish_upload(
        &mut self,
        ticket: &Ticket,
        result: Result<UploadSummary, GalleryError>,
    ) -> Result<UploadSummary, GalleryError> {
        if !self.same_session(ticket) {
            debug!("upload batch finished after the session changed");
            return result;
        }
        self.uploading = false;
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                self.fail("Upload failed", &e);
                return Err(e);
            }
        };

        if summary.session_expired() {
            self.fail("Upload", &GalleryError::Unauthenticated);
        } else if summary.failures.is_empty() {
            self.info(summary.status_line());
        } else {
            self.status = Some(Status::Error(summary.status_line()));
        }
        Ok(summary)
    }

    /// Uploads into the active folder and reloads it once, if it is still open.
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Result<UploadSummary, GalleryError> {
        let plan = self.begin_upload(files)?;
        let result = upload_batch(self.api.as_ref(), &plan.folder, plan.files, plan.limits).await;
        let summary = self.finish_upload(&plan.ticket, result)?;
        if !summary.session_expired() {
            if let Some(ticket) = self.begin_reload_of(&plan.folder) {
                let result = self.api.list_photos(&plan.folder).await;
                let _ = self.finish_photo_reload(&ticket, result);
            }
        }
        Ok(summary)
    }

    pub fn open_lightbox(&mut self, index: usize) -> bool {
        self.lightbox.open_index(index)
    }

    pub fn lightbox_next(&mut self) {
        self.lightbox.next();
    }

    pub fn lightbox_prev(&mut self) {
        self.lightbox.prev();
    }

    pub fn close_lightbox(&mut self) {
        self.lightbox.close();
    }

    /// Picks the item shown in the lightbox for download into `dir`.
    pub fn begin_download(&mut self, dir: &Path) -> Result<Download, GalleryError> {
        let Some(view) = self.lightbox.current() else {
            let e = GalleryError::Validation("Nothing to download.".to_string());
            self.fail("Download", &e);
            return Err(e);
        };
        let download = Download {
            ticket: self.ticket(),
            url: view.item.url.clone(),
            target: dir.join(view.item.basename()),
        };
        self.info("Preparing download...");
        Ok(download)
    }

    pub fn finish_download(
        &mut self,
        download: &Download,
        result: Result<PathBuf, GalleryError>,
    ) -> Result<PathBuf, GalleryError> {
        if !self.same_session(&download.ticket) {
            return result;
        }
        match result {
            Ok(path) => {
                self.info(format!("Saved {}", path.display()));
                Ok(path)
            }
            Err(e) => {
                self.fail("Download failed", &e);
                Err(e)
            }
        }
    }

    /// Saves the item shown in the lightbox into `dir`, named after its basename.
    pub async fn download_current(&mut self, dir: &Path) -> Result<PathBuf, GalleryError> {
        let download = self.begin_download(dir)?;
        let result = download.save(self.api.as_ref()).await;
        self.finish_download(&download, result)
    }
}

/// Sends a confirmed delete to the backend.
pub async fn run_pending(api: &dyn GalleryApi, action: &PendingAction) -> Result<(), GalleryError> {
    match action {
        PendingAction::DeletePhoto { filename, .. } => api.delete_photo(filename).await,
        PendingAction::DeleteFolder { name } => api.delete_folder(name).await,
    }
}
