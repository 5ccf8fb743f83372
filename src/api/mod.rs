//! Backend REST API client
//!
//! - transport: the HTTP seam (reqwest in production, mocks in tests)
//! - types: request and response schemas for each endpoint
//! - client: token handling, status mapping and the typed operations

pub mod client;
pub mod transport;
pub mod types;

use crate::error::GalleryError;
use crate::media::MediaItem;
use async_trait::async_trait;

pub use client::{ApiClient, ApiOptions, TokenSource};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::SignedUpload;

/// Operations the gallery controller and uploader need from the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GalleryApi: Send + Sync {
    async fn list_folders(&self) -> Result<Vec<String>, GalleryError>;
    async fn list_photos(&self, folder: &str) -> Result<Vec<MediaItem>, GalleryError>;
    async fn create_folder(&self, name: &str) -> Result<(), GalleryError>;
    async fn delete_folder(&self, name: &str) -> Result<(), GalleryError>;
    async fn delete_photo(&self, filename: &str) -> Result<(), GalleryError>;
    async fn request_upload_url(
        &self,
        filename: &str,
        folder: &str,
        content_type: &str,
    ) -> Result<SignedUpload, GalleryError>;
    async fn put_signed(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), GalleryError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, GalleryError>;
}
