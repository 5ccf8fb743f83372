use crate::media::MediaItem;
use serde::{Deserialize, Serialize};

// The backend wraps listings in an object; older deployments returned bare arrays.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FoldersResponse {
    Wrapped { folders: Vec<String> },
    Bare(Vec<String>),
}

impl FoldersResponse {
    pub fn into_folders(self) -> Vec<String> {
        match self {
            FoldersResponse::Wrapped { folders } | FoldersResponse::Bare(folders) => folders,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PhotosResponse {
    Wrapped { photos: Vec<MediaItem> },
    Bare(Vec<MediaItem>),
}

impl PhotosResponse {
    pub fn into_items(self) -> Vec<MediaItem> {
        let mut items = match self {
            PhotosResponse::Wrapped { photos } | PhotosResponse::Bare(photos) => photos,
        };
        for item in &mut items {
            item.fill_display_name();
        }
        items
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub url: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FolderRequest<'a> {
    pub folder: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DeletePhotoRequest<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest<'a> {
    pub filename: &'a str,
    pub folder: &'a str,
    pub content_type: &'a str,
}
