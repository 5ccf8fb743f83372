#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use tuigallery::api::{ApiClient, HttpRequest, HttpResponse, HttpTransport};
use tuigallery::auth::{Identity, IdentityProvider, KeyringEntry, ProviderSession, SessionManager};
use tuigallery::error::{AuthError, GalleryError};
use tuigallery::gallery::GalleryController;
use tuigallery::upload::UploadLimits;

pub const BACKEND_URL: &str = "http://backend.test";
pub const UID: &str = "uid-1";
pub const PASSWORD: &str = "correct-horse";

/// In-memory stand-in for the gallery backend and the storage bucket behind it.
pub struct FakeBackend {
    pub requests: RwLock<Vec<HttpRequest>>,
    folders: RwLock<BTreeMap<String, Vec<Value>>>,
    pub force_status: RwLock<Option<u16>>,
    /// Backend path whose responses are held back, and for how long.
    pub slow: RwLock<Option<(&'static str, std::time::Duration)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            folders: RwLock::new(BTreeMap::new()),
            force_status: RwLock::new(None),
            slow: RwLock::new(None),
        }
    }

    pub async fn with_trip_album() -> Arc<Self> {
        let backend = Self::new();
        backend.add_folder("Pets").await;
        backend.add_folder("Trip2024").await;
        backend
            .add_photo("Trip2024", "beach.jpg", "image/jpeg")
            .await;
        backend.add_photo("Trip2024", "waves.mp4", "").await;
        Arc::new(backend)
    }

    pub async fn add_folder(&self, name: &str) {
        self.folders
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    pub async fn add_photo(&self, folder: &str, name: &str, content_type: &str) {
        let filename = format!("{}/{}/{}", UID, folder, name);
        let mut photo = json!({
            "filename": filename,
            "name": name,
            "url": format!("https://storage.test/read/{}", filename),
        });
        if !content_type.is_empty() {
            photo["type"] = json!(content_type);
        }
        self.folders
            .write()
            .await
            .entry(folder.to_string())
            .or_default()
            .push(photo);
    }

    pub async fn photo_names(&self, folder: &str) -> Vec<String> {
        self.folders
            .read()
            .await
            .get(folder)
            .map(|photos| {
                photos
                    .iter()
                    .filter_map(|p| p["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn count_requests(&self, path: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| {
                reqwest::Url::parse(&r.url)
                    .map(|u| u.path() == path)
                    .unwrap_or(false)
            })
            .count()
    }

    async fn route(&self, request: &HttpRequest) -> HttpResponse {
        let Ok(url) = reqwest::Url::parse(&request.url) else {
            return HttpResponse::new(400, "bad url");
        };
        let body: Value = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null);

        if url.host_str() == Some("storage.test") {
            return self.storage(request, &url).await;
        }
        if request.header_value("Authorization").is_none() {
            return HttpResponse::new(401, r#"{"error":"Unauthorized"}"#);
        }

        let mut folders = self.folders.write().await;
        match url.path() {
            "/get-folders" => {
                let names: Vec<&String> = folders.keys().collect();
                HttpResponse::new(200, json!({ "folders": names }).to_string())
            }
            "/get-photos" => {
                let folder = url
                    .query_pairs()
                    .find(|(k, _)| k == "folder")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                let photos = folders.get(&folder).cloned().unwrap_or_default();
                HttpResponse::new(200, json!({ "photos": photos }).to_string())
            }
            "/create-folder" => {
                let name = body["folder"].as_str().unwrap_or_default().to_string();
                if folders.contains_key(&name) {
                    return HttpResponse::new(
                        409,
                        json!({ "error": format!("Folder {} already exists", name) }).to_string(),
                    );
                }
                folders.insert(name, Vec::new());
                HttpResponse::new(200, r#"{"message":"Folder created"}"#)
            }
            "/delete-folder" => {
                let name = body["folder"].as_str().unwrap_or_default();
                folders.remove(name);
                HttpResponse::new(200, r#"{"message":"Folder deleted"}"#)
            }
            "/delete-photo" => {
                let filename = body["filename"].as_str().unwrap_or_default();
                for photos in folders.values_mut() {
                    photos.retain(|p| p["filename"].as_str() != Some(filename));
                }
                HttpResponse::new(200, r#"{"message":"Photo deleted"}"#)
            }
            "/generate-upload-url" => {
                let filename = body["filename"].as_str().unwrap_or_default();
                let folder = body["folder"].as_str().unwrap_or_default();
                let url = format!("https://storage.test/upload/{}/{}", folder, filename);
                HttpResponse::new(200, json!({ "url": url }).to_string())
            }
            _ => HttpResponse::new(404, r#"{"error":"Not found"}"#),
        }
    }

    async fn storage(&self, request: &HttpRequest, url: &reqwest::Url) -> HttpResponse {
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        match (request.method.as_str(), segments.as_slice()) {
            ("PUT", ["upload", folder, name]) => {
                let content_type = request.header_value("Content-Type").unwrap_or_default();
                self.add_photo(folder, name, content_type).await;
                HttpResponse::new(200, "")
            }
            ("GET", ["read", ..]) => HttpResponse::new(200, format!("bytes of {}", url.path())),
            _ => HttpResponse::new(404, ""),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, GalleryError> {
        self.requests.write().await.push(request.clone());
        let delay = *self.slow.read().await;
        if let Some((path, delay)) = delay {
            let matches = reqwest::Url::parse(&request.url)
                .map(|u| u.path() == path)
                .unwrap_or(false);
            if matches {
                tokio::time::sleep(delay).await;
            }
        }
        if let Some(status) = *self.force_status.read().await {
            return Ok(HttpResponse::new(status, r#"{"error":"Unauthorized"}"#));
        }
        Ok(self.route(&request).await)
    }
}

/// Accepts one password and hands out numbered ID tokens.
pub struct FakeProvider {
    pub refresh_calls: RwLock<usize>,
    pub reject_refresh: RwLock<bool>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            refresh_calls: RwLock::new(0),
            reject_refresh: RwLock::new(false),
        }
    }

    fn session(email: Option<&str>, n: usize) -> ProviderSession {
        ProviderSession {
            identity: Identity {
                uid: UID.to_string(),
                email: email.map(str::to_string),
                display_name: None,
            },
            id_token: format!("id-token-{}", n),
            refresh_token: "refresh-1".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<ProviderSession, AuthError> {
        Ok(Self::session(Some(email), 0))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AuthError> {
        if password == PASSWORD {
            Ok(Self::session(Some(email), 0))
        } else {
            Err(AuthError::WrongPassword)
        }
    }

    async fn sign_in_with_google(&self) -> Result<ProviderSession, AuthError> {
        Err(AuthError::Google("Google sign-in is not configured".to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, AuthError> {
        let mut calls = self.refresh_calls.write().await;
        *calls += 1;
        if *self.reject_refresh.read().await || refresh_token != "refresh-1" {
            return Err(AuthError::SessionExpired);
        }
        // Token refresh responses carry no email.
        Ok(Self::session(None, *calls))
    }
}

/// Keyring entry that lives in memory.
#[derive(Default)]
pub struct MemoryKeyring {
    pub value: Mutex<Option<String>>,
}

impl KeyringEntry for MemoryKeyring {
    fn get_password(&self) -> Result<String, keyring::Error> {
        self.value
            .lock()
            .unwrap()
            .clone()
            .ok_or(keyring::Error::NoEntry)
    }

    fn set_password(&self, password: &str) -> Result<(), keyring::Error> {
        *self.value.lock().unwrap() = Some(password.to_string());
        Ok(())
    }

    fn delete_password(&self) -> Result<(), keyring::Error> {
        match self.value.lock().unwrap().take() {
            Some(_) => Ok(()),
            None => Err(keyring::Error::NoEntry),
        }
    }
}

pub struct TestStack {
    pub backend: Arc<FakeBackend>,
    pub provider: Arc<FakeProvider>,
    pub keyring: Arc<MemoryKeyring>,
    pub session: Arc<SessionManager>,
    pub gallery: GalleryController,
}

pub async fn test_stack(limits: UploadLimits) -> TestStack {
    let backend = FakeBackend::with_trip_album().await;
    let provider = Arc::new(FakeProvider::new());
    let keyring = Arc::new(MemoryKeyring::default());
    let session = Arc::new(SessionManager::new(provider.clone(), keyring.clone()));
    let api = Arc::new(ApiClient::new(BACKEND_URL, backend.clone(), session.clone()));
    let gallery = GalleryController::new(api, limits);
    TestStack {
        backend,
        provider,
        keyring,
        session,
        gallery,
    }
}
