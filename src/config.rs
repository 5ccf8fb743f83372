use crate::cli::Cli;
use crate::error::ConfigError;
use crate::upload::UploadLimits;
use std::path::PathBuf;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    pub backend_url: String,
    pub firebase_api_key: String,
    pub google_client_secret: PathBuf,
    pub upload_limits: UploadLimits,
    pub download_dir: PathBuf,
    pub log_file: PathBuf,
}

impl GalleryConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let backend_url = normalize_backend_url(&cli.backend_url)?;

        let firebase_api_key = cli
            .firebase_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        if cli.upload_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if cli.max_upload_mb == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }

        Ok(Self {
            backend_url,
            firebase_api_key,
            google_client_secret: cli.google_client_secret.clone(),
            upload_limits: UploadLimits {
                max_bytes: cli.max_upload_mb.saturating_mul(BYTES_PER_MB),
                concurrency: cli.upload_concurrency,
            },
            download_dir: cli.download_dir.clone(),
            log_file: cli.log_file.clone(),
        })
    }
}

fn normalize_backend_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = reqwest::Url::parse(raw.trim()).map_err(|e| ConfigError::BackendUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::BackendUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
