use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use super::types::{
    Ack, DeletePhotoRequest, ErrorBody, FolderRequest, FoldersResponse, PhotosResponse,
    SignedUpload, UploadUrlRequest,
};
use super::GalleryApi;
use crate::error::GalleryError;
use crate::media::MediaItem;
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the API client gets its bearer token, and how it ends a dead session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A freshly minted token, or `None` when nobody is signed in or the session was rejected.
    /// Transport failures are `Err(Network)` and leave the session alone.
    async fn fresh_token(&self) -> Result<Option<String>, GalleryError>;
    async fn expire_session(&self);
}

/// Method, query string and JSON body of a backend call.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post<T: Serialize>(body: &T) -> Result<Self, GalleryError> {
        Ok(Self {
            method: Method::POST,
            query: Vec::new(),
            body: Some(to_json(body)?),
        })
    }

    pub fn delete<T: Serialize>(body: &T) -> Result<Self, GalleryError> {
        Ok(Self {
            method: Method::DELETE,
            query: Vec::new(),
            body: Some(to_json(body)?),
        })
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

fn to_json<T: Serialize>(body: &T) -> Result<serde_json::Value, GalleryError> {
    serde_json::to_value(body)
        .map_err(|e| GalleryError::Validation(format!("Could not encode request: {}", e)))
}

pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated backend request. 401/403 ends the session before returning `Unauthenticated`.
    pub async fn call(
        &self,
        endpoint: &str,
        options: ApiOptions,
    ) -> Result<HttpResponse, GalleryError> {
        let Some(token) = self.tokens.fresh_token().await? else {
            warn!(endpoint, "no access token available, signing out");
            self.tokens.expire_session().await;
            return Err(GalleryError::Unauthenticated);
        };

        let url = self.endpoint_url(endpoint, &options.query)?;
        let mut request = HttpRequest::new(options.method, url)
            .header("Authorization", format!("Bearer {}", token));
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| GalleryError::Validation(format!("Could not encode request: {}", e)))?;
            request = request
                .header("Content-Type", "application/json")
                .body(bytes);
        }

        let response = self.transport.execute(request).await?;
        match response.status {
            401 | 403 => {
                warn!(endpoint, status = response.status, "session rejected by backend");
                self.tokens.expire_session().await;
                Err(GalleryError::Unauthenticated)
            }
            status if !response.is_success() => {
                let message = error_message(&response);
                warn!(endpoint, status, %message, "backend call failed");
                Err(GalleryError::api(Some(status), message))
            }
            _ => {
                debug!(endpoint, status = response.status, "backend call succeeded");
                Ok(response)
            }
        }
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<String, GalleryError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint)).map_err(|e| {
            GalleryError::Validation(format!("Invalid backend url for {}: {}", endpoint, e))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    async fn call_ack(&self, endpoint: &str, options: ApiOptions) -> Result<(), GalleryError> {
        let response = self.call(endpoint, options).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let ack: Ack = parse_body(endpoint, &response)?;
        if let Some(message) = ack.message {
            debug!(endpoint, %message, "acknowledged");
        }
        Ok(())
    }
}

fn parse_body<T: DeserializeOwned>(endpoint: &str, response: &HttpResponse) -> Result<T, GalleryError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        GalleryError::api(
            Some(response.status),
            format!("Malformed response from {}: {}", endpoint, e),
        )
    })
}

fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", response.status))
}

#[async_trait]
impl GalleryApi for ApiClient {
    async fn list_folders(&self) -> Result<Vec<String>, GalleryError> {
        let response = self.call("/get-folders", ApiOptions::get()).await?;
        let folders: FoldersResponse = parse_body("/get-folders", &response)?;
        Ok(folders.into_folders())
    }

    async fn list_photos(&self, folder: &str) -> Result<Vec<MediaItem>, GalleryError> {
        let response = self
            .call("/get-photos", ApiOptions::get().query("folder", folder))
            .await?;
        let photos: PhotosResponse = parse_body("/get-photos", &response)?;
        Ok(photos.into_items())
    }

    async fn create_folder(&self, name: &str) -> Result<(), GalleryError> {
        self.call_ack("/create-folder", ApiOptions::post(&FolderRequest { folder: name })?)
            .await
    }

    async fn delete_folder(&self, name: &str) -> Result<(), GalleryError> {
        self.call_ack("/delete-folder", ApiOptions::delete(&FolderRequest { folder: name })?)
            .await
    }

    async fn delete_photo(&self, filename: &str) -> Result<(), GalleryError> {
        self.call_ack(
            "/delete-photo",
            ApiOptions::delete(&DeletePhotoRequest { filename })?,
        )
        .await
    }

    async fn request_upload_url(
        &self,
        filename: &str,
        folder: &str,
        content_type: &str,
    ) -> Result<SignedUpload, GalleryError> {
        let body = UploadUrlRequest {
            filename,
            folder,
            content_type,
        };
        let response = self
            .call("/generate-upload-url", ApiOptions::post(&body)?)
            .await?;
        let signed: SignedUpload = parse_body("/generate-upload-url", &response)?;
        if signed.url.trim().is_empty() {
            return Err(GalleryError::api(
                Some(response.status),
                "Malformed response from /generate-upload-url: empty url",
            ));
        }
        Ok(signed)
    }

    async fn put_signed(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), GalleryError> {
        // Signed URLs carry their own credentials; no bearer token here.
        let request = HttpRequest::new(Method::PUT, url)
            .header("Content-Type", content_type)
            .body(body);
        let response = self.transport.execute(request).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(GalleryError::api(
                Some(response.status),
                format!("Storage rejected the upload with status {}", response.status),
            ))
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GalleryError> {
        let response = self
            .transport
            .execute(HttpRequest::new(Method::GET, url))
            .await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(GalleryError::api(
                Some(response.status),
                format!("Download failed with status {}", response.status),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::MockHttpTransport;
    use crate::media::MediaKind;
    use mockall::predicate::function;

    fn signed_in_tokens() -> MockTokenSource {
        let mut tokens = MockTokenSource::new();
        tokens
            .expect_fresh_token()
            .returning(|| Ok(Some("tok-123".to_string())));
        tokens
    }

    fn client(transport: MockHttpTransport, tokens: MockTokenSource) -> ApiClient {
        ApiClient::new("http://backend.test/", Arc::new(transport), Arc::new(tokens))
    }

    #[tokio::test]
    async fn test_list_photos_builds_query_and_classifies() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.method == Method::GET
                    && req.url == "http://backend.test/get-photos?folder=Trip2024"
                    && req.header_value("Authorization") == Some("Bearer tok-123")
                    && req.body.is_none()
            })
            .times(1)
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"photos":[
                        {"filename":"u/Trip2024/a.jpg","name":"a.jpg","type":"image/jpeg","url":"https://s/a"},
                        {"filename":"u/Trip2024/b.mp4","name":"b.mp4","type":"application/octet-stream","url":"https://s/b"}
                    ]}"#,
                ))
            });

        let api = client(transport, signed_in_tokens());
        let items = api.list_photos("Trip2024").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind(), MediaKind::Image);
        assert_eq!(items[1].kind(), MediaKind::Video);
    }

    #[tokio::test]
    async fn test_401_signs_out_exactly_once() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"error":"Unauthorized"}"#)));
        let mut tokens = signed_in_tokens();
        tokens.expect_expire_session().times(1).returning(|| ());

        let api = client(transport, tokens);
        let err = api.list_folders().await.unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_403_is_treated_as_session_expiry() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(403, r#"{"message":"expired"}"#)));
        let mut tokens = signed_in_tokens();
        tokens.expect_expire_session().times(1).returning(|| ());

        let api = client(transport, tokens);
        assert!(api.delete_photo("u/T/a.jpg").await.unwrap_err().is_unauthenticated());
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_network() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().never();
        let mut tokens = MockTokenSource::new();
        tokens.expect_fresh_token().returning(|| Ok(None));
        tokens.expect_expire_session().times(1).returning(|| ());

        let api = client(transport, tokens);
        assert!(api.list_folders().await.unwrap_err().is_unauthenticated());
    }

    #[tokio::test]
    async fn test_refresh_network_failure_keeps_session() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().never();
        let mut tokens = MockTokenSource::new();
        tokens
            .expect_fresh_token()
            .returning(|| Err(GalleryError::Network("dns lookup failed".to_string())));
        tokens.expect_expire_session().never();

        let api = client(transport, tokens);
        assert!(matches!(
            api.list_folders().await.unwrap_err(),
            GalleryError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_server_message_is_surfaced() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().returning(|_| {
            Ok(HttpResponse::new(
                409,
                r#"{"error":"Conflict","message":"Folder Trip already exists"}"#,
            ))
        });
        let api = client(transport, signed_in_tokens());
        match api.create_folder("Trip").await.unwrap_err() {
            GalleryError::Api { status, message } => {
                assert_eq!(status, Some(409));
                assert_eq!(message, "Folder Trip already exists");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_code_used_when_body_is_not_json() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(502, "<html>Bad gateway</html>")));
        let api = client(transport, signed_in_tokens());
        let err = api.list_folders().await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502");
    }

    #[tokio::test]
    async fn test_malformed_listing_is_api_error() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"folders": 12}"#)));
        let api = client(transport, signed_in_tokens());
        assert!(matches!(
            api.list_folders().await.unwrap_err(),
            GalleryError::Api { status: Some(200), .. }
        ));
    }

    #[tokio::test]
    async fn test_create_folder_sends_json_body() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap();
                req.method == Method::POST
                    && req.url == "http://backend.test/create-folder"
                    && req.header_value("content-type") == Some("application/json")
                    && body == serde_json::json!({"folder": "my-album_1"})
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(201, r#"{"message":"created"}"#)));
        let api = client(transport, signed_in_tokens());
        api.create_folder("my-album_1").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_signed_has_no_bearer_token() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.method == Method::PUT
                    && req.url == "https://storage.test/put?sig=abc"
                    && req.header_value("Authorization").is_none()
                    && req.header_value("Content-Type") == Some("image/png")
                    && req.body.as_deref() == Some(&b"png-bytes"[..])
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, Vec::new())));
        let mut tokens = MockTokenSource::new();
        tokens.expect_fresh_token().never();

        let api = client(transport, tokens);
        api.put_signed("https://storage.test/put?sig=abc", "image/png", b"png-bytes".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_network_failure_is_propagated() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .returning(|_| Err(GalleryError::Network("connection refused".to_string())));
        let api = client(transport, signed_in_tokens());
        assert!(matches!(
            api.list_folders().await.unwrap_err(),
            GalleryError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_request_upload_url_rejects_empty_url() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_execute()
            .with(function(|req: &HttpRequest| req.url.ends_with("/generate-upload-url")))
            .returning(|_| Ok(HttpResponse::new(200, r#"{"url":""}"#)));
        let api = client(transport, signed_in_tokens());
        assert!(api
            .request_upload_url("a.jpg", "Trip", "image/jpeg")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_request_upload_url_reads_object_path_and_expiry() {
        let mut transport = MockHttpTransport::new();
        transport.expect_execute().returning(|_| {
            Ok(HttpResponse::new(
                200,
                r#"{"url":"https://storage.test/put?sig=1","path":"uid-1/Trip/a.jpg","expiresIn":900}"#,
            ))
        });
        let api = client(transport, signed_in_tokens());
        let signed = api
            .request_upload_url("a.jpg", "Trip", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(signed.path.as_deref(), Some("uid-1/Trip/a.jpg"));
        assert_eq!(signed.expires_in, Some(900));
    }
}
