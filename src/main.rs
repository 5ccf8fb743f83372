use clap::Parser;
use tracing::{error, info};
use tuigallery::app::{draw_loading_screens, initialize_app, run_app_loop};
use tuigallery::cli::{handle_keyring_clear, Cli};
use tuigallery::config::GalleryConfig;
use tuigallery::logging::init_logging;
use tuigallery::terminal::{cleanup_terminal, setup_terminal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.clear_keyring {
        handle_keyring_clear()?;
        return Ok(());
    }

    let config = match GalleryConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    init_logging(&config.log_file)?;
    info!(backend = %config.backend_url, "starting tuigallery");

    let mut terminal = setup_terminal()?;

    draw_loading_screens(&mut terminal, "Restoring session...")?;

    let (state_arc, listener) = match initialize_app(&config).await {
        Ok(app) => app,
        Err(e) => {
            cleanup_terminal(&mut terminal)?;
            error!(error = %e, "initialization failed");
            eprintln!("Application initialization failed: {}", e);
            return Ok(());
        }
    };

    let result = run_app_loop(&mut terminal, state_arc).await;
    listener.abort();
    cleanup_terminal(&mut terminal)?;

    if let Err(e) = result {
        error!(error = %e, "application error");
        eprintln!("Application error: {}", e);
    }
    info!("exiting");
    Ok(())
}
