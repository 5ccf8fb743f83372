use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Filename extensions treated as video regardless of the reported MIME type.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn classify(content_type: Option<&str>, filename: &str) -> Self {
        let mime_is_video = content_type
            .map(|t| t.trim().to_ascii_lowercase().starts_with("video/"))
            .unwrap_or(false);

        let ext_is_video = filename
            .rsplit_once('.')
            .map(|(_, ext)| {
                let ext = ext.to_ascii_lowercase();
                VIDEO_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false);

        if mime_is_video || ext_is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A photo or video as listed by `/get-photos`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaItem {
    /// Full storage path, e.g. `uid/Trip2024/beach.jpg`. Used as the delete key.
    pub filename: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated: Option<DateTime<Utc>>,
}

impl MediaItem {
    pub fn new(filename: &str, content_type: Option<&str>, url: &str) -> Self {
        let mut item = Self {
            filename: filename.to_string(),
            name: String::new(),
            content_type: content_type.map(str::to_string),
            url: url.to_string(),
            size: None,
            updated: None,
        };
        item.fill_display_name();
        item
    }

    /// Never cached: every caller re-derives the kind from the item.
    pub fn kind(&self) -> MediaKind {
        MediaKind::classify(self.content_type.as_deref(), &self.filename)
    }

    pub fn is_video(&self) -> bool {
        self.kind() == MediaKind::Video
    }

    /// Last path segment of `filename`.
    pub fn basename(&self) -> &str {
        self.filename.rsplit('/').next().unwrap_or(&self.filename)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.basename()
        } else {
            &self.name
        }
    }

    pub(crate) fn fill_display_name(&mut self) {
        if self.name.trim().is_empty() {
            self.name = self.basename().to_string();
        }
    }
}

// The backend emits naive ISO timestamps for some objects; those are read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| naive.and_utc())
            })
            .ok()
    }))
}

/// Human readable byte count for status lines.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
