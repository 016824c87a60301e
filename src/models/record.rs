//! Indexed file records and the metadata they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Media, Message};
use super::track::{Platform, TrackMatch};

/// Kind of indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Audio,
    Video,
    Document,
    Photo,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Photo => "photo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "photo" => Some(Self::Photo),
            _ => None,
        }
    }

    /// Title-cased label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Video => "Video",
            Self::Document => "Document",
            Self::Photo => "Photo",
        }
    }
}

/// File metadata pulled out of a message's media payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_name: String,
    pub file_type: FileType,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
    pub duration: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FileMetadata {
    /// Derive metadata from a message, or `None` if it has nothing indexable.
    ///
    /// Photos resolve to their largest size.
    pub fn from_message(message: &Message) -> Option<Self> {
        let (info, file_type, fallback_name) = match message.media.as_ref()? {
            Media::Audio(info) => (info, FileType::Audio, "Unknown Audio"),
            Media::Video(info) => (info, FileType::Video, "Unknown Video"),
            Media::Document(info) => (info, FileType::Document, "Unknown Document"),
            Media::Photo { sizes } => {
                let photo = sizes.iter().max_by_key(|p| {
                    (
                        p.file_size.unwrap_or(0),
                        u64::from(p.width) * u64::from(p.height),
                    )
                })?;
                return Some(Self {
                    file_id: photo.file_id.clone(),
                    file_unique_id: photo.file_unique_id.clone(),
                    file_name: format!("photo_{}.jpg", message.id),
                    file_type: FileType::Photo,
                    mime_type: Some("image/jpeg".to_string()),
                    file_size: photo.file_size,
                    duration: None,
                    width: Some(photo.width),
                    height: Some(photo.height),
                });
            }
            Media::Unsupported => return None,
        };

        let file_name = info
            .file_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        Some(Self {
            file_id: info.file_id.clone(),
            file_unique_id: info.file_unique_id.clone(),
            file_name,
            file_type,
            mime_type: info.mime_type.clone(),
            file_size: info.file_size,
            duration: info.duration,
            width: info.width,
            height: info.height,
        })
    }
}

/// A persisted file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Primary key.
    pub file_id: String,
    /// Stable content identifier, used for secondary dedup.
    pub file_unique_id: String,
    /// Reference to the mirrored copy in the backup channel.
    pub backup_file_id: Option<String>,
    pub file_name: String,
    pub caption: Option<String>,
    pub file_type: FileType,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
    pub duration: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub message_id: i64,
    pub sender_id: Option<i64>,
    pub sender_username: Option<String>,
    pub date: DateTime<Utc>,
    pub track_url: Option<String>,
    pub track_id: Option<String>,
    pub platform: Option<Platform>,
    pub is_deleted: bool,
    pub indexed_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a fresh record for a message.
    pub fn from_message(
        message: &Message,
        metadata: FileMetadata,
        track: Option<&TrackMatch>,
    ) -> Self {
        let mut record = Self {
            file_id: metadata.file_id,
            file_unique_id: metadata.file_unique_id,
            backup_file_id: None,
            file_name: metadata.file_name,
            caption: message.text_content().map(str::to_string),
            file_type: metadata.file_type,
            mime_type: metadata.mime_type,
            file_size: metadata.file_size,
            duration: metadata.duration,
            width: metadata.width,
            height: metadata.height,
            chat_id: message.chat.id,
            chat_title: message.chat.title.clone(),
            message_id: message.id,
            sender_id: message.sender.as_ref().map(|s| s.id),
            sender_username: message.sender.as_ref().and_then(|s| s.username.clone()),
            date: message.date,
            track_url: None,
            track_id: None,
            platform: None,
            is_deleted: false,
            indexed_at: Utc::now(),
        };
        if let Some(track) = track {
            record.apply_track(track);
        }
        record
    }

    pub fn apply_track(&mut self, track: &TrackMatch) {
        self.track_url = Some(track.canonical_url.clone());
        self.track_id = Some(track.track_id.clone());
        self.platform = Some(track.platform);
    }

    /// The stored track identity, if all of its parts are present.
    pub fn track(&self) -> Option<TrackMatch> {
        Some(TrackMatch {
            platform: self.platform?,
            track_id: self.track_id.clone()?,
            canonical_url: self.track_url.clone()?,
        })
    }
}

/// Anything a caption can be rendered from.
///
/// Live messages have their file metadata resolved when the source is built,
/// so accessors never re-derive it.
#[derive(Debug, Clone)]
pub enum MediaSource<'a> {
    Live {
        message: &'a Message,
        metadata: FileMetadata,
    },
    Stored(&'a FileRecord),
}

impl<'a> MediaSource<'a> {
    /// Wrap a live message; `None` if it has no indexable media.
    pub fn live(message: &'a Message) -> Option<Self> {
        FileMetadata::from_message(message).map(|metadata| Self::Live { message, metadata })
    }

    pub fn stored(record: &'a FileRecord) -> Self {
        Self::Stored(record)
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Live { metadata, .. } => &metadata.file_name,
            Self::Stored(r) => &r.file_name,
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            Self::Live { metadata, .. } => metadata.file_type,
            Self::Stored(r) => r.file_type,
        }
    }

    pub fn file_size(&self) -> Option<u64> {
        match self {
            Self::Live { metadata, .. } => metadata.file_size,
            Self::Stored(r) => r.file_size,
        }
    }

    pub fn duration(&self) -> Option<u32> {
        match self {
            Self::Live { metadata, .. } => metadata.duration,
            Self::Stored(r) => r.duration,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let (w, h) = match self {
            Self::Live { metadata, .. } => (metadata.width, metadata.height),
            Self::Stored(r) => (r.width, r.height),
        };
        Some((w?, h?)).filter(|(w, h)| *w > 0 && *h > 0)
    }

    pub fn chat_title(&self) -> Option<&str> {
        match self {
            Self::Live { message, .. } => message.chat.title.as_deref(),
            Self::Stored(r) => r.chat_title.as_deref(),
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Self::Live { message, .. } => message.date,
            Self::Stored(r) => r.date,
        }
    }

    /// Track already attached to this source; live messages have none until extracted.
    pub fn stored_track(&self) -> Option<TrackMatch> {
        match self {
            Self::Live { .. } => None,
            Self::Stored(r) => r.track(),
        }
    }

    pub fn message(&self) -> Option<&'a Message> {
        match self {
            Self::Live { message, .. } => Some(*message),
            Self::Stored(_) => None,
        }
    }
}
