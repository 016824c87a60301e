//! Channel messages as delivered by a message source.
//!
//! The shape follows the platform's bot API closely enough that a channel
//! export can be deserialized directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel or group a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Author of a message, when the platform exposes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Rich-text entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Bare URL written out in the text.
    Url,
    /// Link text pointing at an explicit target.
    TextLink,
    /// Formatting, mentions, hashtags and anything else.
    #[serde(other)]
    Other,
}

/// A rich-text span over a message's text or caption.
///
/// `offset` and `length` are measured in UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub offset: usize,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MessageEntity {
    pub fn text_link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            kind: EntityType::TextLink,
            offset,
            length,
            url: Some(url.into()),
        }
    }

    pub fn bare_url(offset: usize, length: usize) -> Self {
        Self {
            kind: EntityType::Url,
            offset,
            length,
            url: None,
        }
    }

    /// Slice the span this entity covers out of `text`.
    ///
    /// Returns `None` when the span does not fall on valid boundaries.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = utf16_to_byte_index(text, self.offset)?;
        let end = utf16_to_byte_index(text, self.offset.checked_add(self.length)?)?;
        text.get(start..end)
    }
}

fn utf16_to_byte_index(text: &str, units: usize) -> Option<usize> {
    let mut seen = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        if seen == units {
            return Some(byte_idx);
        }
        if seen > units {
            return None;
        }
        seen += ch.len_utf16();
    }
    (seen == units).then_some(text.len())
}

/// Inline keyboard button attached under a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A downloadable file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One resolution of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Media payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Media {
    Audio(FileInfo),
    Video(FileInfo),
    Document(FileInfo),
    Photo { sizes: Vec<PhotoSize> },
    /// Stickers, voice notes, polls and other payloads that are not indexed.
    #[serde(other)]
    Unsupported,
}

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sequence number within the chat.
    pub id: i64,
    pub chat: Chat,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption_entities: Vec<MessageEntity>,
    /// Rows of inline buttons.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Vec<InlineButton>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

impl Message {
    /// Create a bare text message.
    pub fn new(chat_id: i64, id: i64, date: DateTime<Utc>) -> Self {
        Self {
            id,
            chat: Chat {
                id: chat_id,
                title: None,
            },
            date,
            sender: None,
            text: None,
            entities: Vec::new(),
            caption: None,
            caption_entities: Vec::new(),
            buttons: Vec::new(),
            media: None,
        }
    }

    /// Whether the message carries a payload worth indexing.
    pub fn has_indexable_media(&self) -> bool {
        match &self.media {
            Some(Media::Photo { sizes }) => !sizes.is_empty(),
            Some(Media::Unsupported) | None => false,
            Some(_) => true,
        }
    }

    /// Caption if present, otherwise the message text.
    pub fn text_content(&self) -> Option<&str> {
        self.caption.as_deref().or(self.text.as_deref())
    }
}
