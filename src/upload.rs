use crate::api::GalleryApi;
use crate::error::GalleryError;
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-file ceiling enforced before any network call.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file queued for upload. Transient: nothing is kept after the batch finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub source: FileSource,
}

impl UploadFile {
    /// Reads name, size and a guessed content type from the filesystem without loading the bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            GalleryError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(GalleryError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                GalleryError::Validation(format!("{} has no file name", path.display()))
            })?;
        Ok(Self {
            content_type: guess_content_type(&name),
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn in_memory(name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    async fn read(self) -> Result<Vec<u8>, GalleryError> {
        match self.source {
            FileSource::Memory(bytes) => Ok(bytes),
            FileSource::Path(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| GalleryError::upload(&self.name, e.to_string())),
        }
    }
}

pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Splits an input line into paths. Whitespace separates; double quotes group.
pub fn parse_path_list(input: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in input.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }
    paths
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub concurrency: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

#[derive(Debug)]
pub struct UploadFailure {
    pub filename: String,
    pub error: GalleryError,
}

#[derive(Debug, Default)]
pub struct UploadSummary {
    pub attempted: usize,
    pub succeeded: Vec<String>,
    pub failures: Vec<UploadFailure>,
}

impl UploadSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn session_expired(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_unauthenticated())
    }

    pub fn status_line(&self) -> String {
        if self.failures.is_empty() {
            format!("All uploads complete! ({} file(s))", self.succeeded.len())
        } else {
            format!(
                "Uploaded {} of {} file(s); {} failed.",
                self.succeeded.len(),
                self.attempted,
                self.failed()
            )
        }
    }
}

/// Uploads every file into `folder`, at most `limits.concurrency` at a time.
///
/// Best effort: an oversized or failing file is recorded in the summary and its
/// siblings continue. Only an empty selection or missing folder is an error.
pub async fn upload_batch(
    api: &dyn GalleryApi,
    folder: &str,
    files: Vec<UploadFile>,
    limits: UploadLimits,
) -> Result<UploadSummary, GalleryError> {
    if files.is_empty() {
        return Err(GalleryError::Validation(
            "Please select one or more files.".to_string(),
        ));
    }
    if folder.trim().is_empty() {
        return Err(GalleryError::Validation(
            "Please select an album first.".to_string(),
        ));
    }

    let attempted = files.len();
    info!(folder, files = attempted, concurrency = limits.concurrency, "starting upload batch");

    let outcomes: Vec<(String, Result<(), GalleryError>)> = stream::iter(files)
        .map(|file| async move {
            let name = file.name.clone();
            let result = upload_one(api, folder, file, limits.max_bytes).await;
            (name, result)
        })
        .buffer_unordered(limits.concurrency.max(1))
        .collect()
        .await;

    let mut summary = UploadSummary {
        attempted,
        ..Default::default()
    };
    for (filename, result) in outcomes {
        match result {
            Ok(()) => summary.succeeded.push(filename),
            Err(error) => {
                warn!(%filename, %error, "upload failed");
                summary.failures.push(UploadFailure { filename, error });
            }
        }
    }
    info!(
        folder,
        succeeded = summary.succeeded.len(),
        failed = summary.failed(),
        "upload batch finished"
    );
    Ok(summary)
}

async fn upload_one(
    api: &dyn GalleryApi,
    folder: &str,
    file: UploadFile,
    max_bytes: u64,
) -> Result<(), GalleryError> {
    if file.size > max_bytes {
        return Err(GalleryError::upload(
            &file.name,
            format!(
                "file is larger than the {} MB limit",
                max_bytes / (1024 * 1024)
            ),
        ));
    }

    let signed = api
        .request_upload_url(&file.name, folder, &file.content_type)
        .await
        .map_err(|e| wrap_upload_error(&file.name, e))?;
    debug!(
        file = %file.name,
        object = signed.path.as_deref().unwrap_or(""),
        expires_in = signed.expires_in,
        "signed upload url issued"
    );

    let name = file.name.clone();
    let content_type = file.content_type.clone();
    let bytes = file.read().await?;
    api.put_signed(&signed.url, &content_type, bytes)
        .await
        .map_err(|e| wrap_upload_error(&name, e))
}

// Session loss keeps its own variant so callers can tell it apart from a bad file.
fn wrap_upload_error(filename: &str, error: GalleryError) -> GalleryError {
    match error {
        GalleryError::Unauthenticated | GalleryError::Upload { .. } => error,
        other => GalleryError::upload(filename, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockGalleryApi, SignedUpload};

    fn signed(url: &str) -> SignedUpload {
        SignedUpload {
            url: url.to_string(),
            path: None,
            expires_in: Some(900),
        }
    }

    fn oversized(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: "video/mp4".to_string(),
            size: DEFAULT_MAX_UPLOAD_BYTES + 1,
            source: FileSource::Path(PathBuf::from("/definitely/not/here.mp4")),
        }
    }

    #[tokio::test]
    async fn test_oversized_file_is_skipped_before_any_request() {
        let mut api = MockGalleryApi::new();
        api.expect_request_upload_url()
            .withf(|filename, folder, _| filename != "huge.mp4" && folder == "Trip2024")
            .times(2)
            .returning(|filename, _, _| Ok(signed(&format!("https://s/{}", filename))));
        api.expect_put_signed().times(2).returning(|_, _, _| Ok(()));

        let files = vec![
            UploadFile::in_memory("a.jpg", "image/jpeg", vec![1, 2, 3]),
            oversized("huge.mp4"),
            UploadFile::in_memory("b.png", "image/png", vec![4]),
        ];
        let summary = upload_batch(&api, "Trip2024", files, UploadLimits::default())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].filename, "huge.mp4");
        assert!(matches!(
            summary.failures[0].error,
            GalleryError::Upload { .. }
        ));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let mut api = MockGalleryApi::new();
        api.expect_request_upload_url()
            .times(3)
            .returning(|filename, _, _| Ok(signed(&format!("https://s/{}", filename))));
        api.expect_put_signed().times(3).returning(|url, _, _| {
            if url.ends_with("bad.jpg") {
                Err(GalleryError::api(Some(400), "rejected"))
            } else {
                Ok(())
            }
        });

        let files = vec![
            UploadFile::in_memory("a.jpg", "image/jpeg", vec![1]),
            UploadFile::in_memory("bad.jpg", "image/jpeg", vec![2]),
            UploadFile::in_memory("c.jpg", "image/jpeg", vec![3]),
        ];
        let summary = upload_batch(
            &api,
            "Trip",
            files,
            UploadLimits {
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                concurrency: 1,
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.succeeded.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(
            summary.failures[0].error.to_string(),
            "Upload of bad.jpg failed: rejected"
        );
        assert_eq!(summary.status_line(), "Uploaded 2 of 3 file(s); 1 failed.");
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected_locally() {
        let mut api = MockGalleryApi::new();
        api.expect_request_upload_url().never();
        let err = upload_batch(&api, "Trip", Vec::new(), UploadLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_session_loss_is_reported() {
        let mut api = MockGalleryApi::new();
        api.expect_request_upload_url()
            .returning(|_, _, _| Err(GalleryError::Unauthenticated));
        api.expect_put_signed().never();
        let files = vec![UploadFile::in_memory("a.jpg", "image/jpeg", vec![1])];
        let summary = upload_batch(&api, "Trip", files, UploadLimits::default())
            .await
            .unwrap();
        assert!(summary.session_expired());
    }

    #[tokio::test]
    async fn test_from_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.jpg");
        std::fs::write(&path, b"jpegdata").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "holiday.jpg");
        assert_eq!(file.size, 8);
        assert_eq!(file.content_type, "image/jpeg");

        assert!(UploadFile::from_path(dir.path()).await.is_err());
    }

    #[test]
    fn test_parse_path_list_handles_quotes() {
        let paths = parse_path_list(r#"a.jpg "my photos/b c.png"  d.mp4"#);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("my photos/b c.png"),
                PathBuf::from("d.mp4")
            ]
        );
        assert!(parse_path_list("   ").is_empty());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_content_type("unknown.zzz"), "application/octet-stream");
    }
}
