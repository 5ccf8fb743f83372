use crate::api::{ApiClient, ReqwestTransport};
use crate::auth::store::default_entry;
use crate::auth::{
    DisabledGoogleFlow, FirebaseAuth, GoogleFlow, InstalledGoogleFlow, KeyringEntry,
    SessionManager,
};
use crate::config::GalleryConfig;
use crate::events::spawn_auth_listener;
use crate::gallery::GalleryController;
use crate::state::AppState;
use crate::terminal::GalleryTerminal;
use crate::ui::{draw_loading_screen, draw_ui};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Wires the session, API client and gallery together and tries to restore a saved session.
pub async fn initialize_app(
    config: &GalleryConfig,
) -> Result<(Arc<RwLock<AppState>>, JoinHandle<()>), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let google: Box<dyn GoogleFlow> = if config.google_client_secret.exists() {
        Box::new(InstalledGoogleFlow::new(config.google_client_secret.clone()))
    } else {
        warn!(
            path = %config.google_client_secret.display(),
            "client secret not found, Google sign-in disabled"
        );
        Box::new(DisabledGoogleFlow)
    };
    let provider = Arc::new(FirebaseAuth::new(
        client.clone(),
        &config.firebase_api_key,
        google,
    ));
    let keyring: Arc<dyn KeyringEntry> = Arc::new(default_entry()?);
    let session = Arc::new(SessionManager::new(provider, keyring));

    let transport = Arc::new(ReqwestTransport::new(client));
    let api = Arc::new(ApiClient::new(
        &config.backend_url,
        transport,
        session.clone(),
    ));
    let gallery = GalleryController::new(api, config.upload_limits);

    let state = AppState::new(session.clone(), gallery, config.download_dir.clone());
    let state_arc = Arc::new(RwLock::new(state));

    // Subscribe before restoring so the restored sign-in is not missed.
    let listener = spawn_auth_listener(session.clone(), state_arc.clone()).await;
    if session.restore().await {
        info!("continuing previous session");
    }

    Ok((state_arc, listener))
}

pub async fn run_app_loop(
    terminal: &mut GalleryTerminal,
    state_arc: Arc<RwLock<AppState>>,
) -> Result<(), Box<dyn std::error::Error>> {
    use crate::event_handler::handle_key_event;
    use crossterm::event;

    loop {
        // Draw UI
        {
            let mut state_guard = state_arc.write().await;
            terminal.draw(|f| draw_ui(f, &mut state_guard))?;
        }

        // Handle input (navigation, quit, etc.)
        if event::poll(Duration::from_millis(100))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind != event::KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, state_arc.clone()).await? {
                    break; // Quit signal received
                }
            }
        }
    }

    Ok(())
}

pub fn draw_loading_screens(
    terminal: &mut GalleryTerminal,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    terminal.draw(|f| {
        draw_loading_screen(f, message);
    })?;
    Ok(())
}
