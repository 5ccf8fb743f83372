use crate::auth::store::{clear_stored_session, default_entry};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the gallery backend.
    #[clap(long, env = "GALLERY_BACKEND_URL", default_value = "http://127.0.0.1:8080")]
    pub backend_url: String,

    /// Web API key of the Firebase project used for sign-in.
    #[clap(long, env = "FIREBASE_API_KEY")]
    pub firebase_api_key: Option<String>,

    /// OAuth client secret used for Google sign-in.
    #[clap(long, env = "GOOGLE_CLIENT_SECRET_FILE", default_value = "client_secret.json")]
    pub google_client_secret: PathBuf,

    /// How many files are transferred at once during an upload.
    #[clap(long, default_value_t = 4)]
    pub upload_concurrency: usize,

    /// Largest file accepted for upload, in megabytes.
    #[clap(long, default_value_t = 100)]
    pub max_upload_mb: u64,

    /// Where downloaded media is saved.
    #[clap(long, default_value = ".")]
    pub download_dir: PathBuf,

    /// Log output goes here; the terminal belongs to the UI.
    #[clap(long, default_value = "tuigallery.log")]
    pub log_file: PathBuf,

    /// Clear the stored session from the system keyring and exit.
    #[clap(long)]
    pub clear_keyring: bool,
}

pub fn handle_keyring_clear() -> Result<(), Box<dyn std::error::Error>> {
    let entry = default_entry()?;

    if let Err(e) = clear_stored_session(&entry) {
        // Logging is not set up yet, so report straight to the console.
        eprintln!("Failed to delete the stored session from keyring: {}", e);
    } else {
        println!("Stored session removed from keyring. Exiting.");
    }
    Ok(())
}
