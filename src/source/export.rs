//! Message source backed by a channel export file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{FetchError, FetchResult, MessageSource};
use crate::models::Message;

/// Serves messages from a JSON array or JSON-lines export.
///
/// Messages for other channels in the file are ignored at lookup time.
pub struct JsonExportSource {
    path: PathBuf,
    messages: BTreeMap<(i64, i64), Message>,
}

impl JsonExportSource {
    /// Load an export from disk.
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let messages = Self::parse(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        debug!("Loaded {} messages from {}", messages.len(), path.display());
        Ok(Self::from_messages(path.to_path_buf(), messages))
    }

    pub fn from_messages(path: PathBuf, messages: Vec<Message>) -> Self {
        let messages = messages
            .into_iter()
            .map(|m| ((m.chat.id, m.id), m))
            .collect();
        Self { path, messages }
    }

    fn parse(contents: &str) -> Result<Vec<Message>, serde_json::Error> {
        let trimmed = contents.trim_start();
        if trimmed.starts_with('[') {
            return serde_json::from_str(trimmed);
        }

        let mut messages = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(line) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    warn!("Skipping malformed export line {}: {}", line_no + 1, e);
                }
            }
        }
        Ok(messages)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Channels present in the export.
    pub fn channels(&self) -> Vec<i64> {
        let mut channels: Vec<i64> = self.messages.keys().map(|(chat, _)| *chat).collect();
        channels.dedup();
        channels
    }
}

#[async_trait]
impl MessageSource for JsonExportSource {
    async fn get_message(&self, channel_id: i64, sequence: i64) -> FetchResult<Message> {
        if sequence <= 0 {
            return Err(FetchError::InvalidSequence {
                channel_id,
                sequence,
            });
        }
        self.messages
            .get(&(channel_id, sequence))
            .cloned()
            .ok_or(FetchError::NotFound {
                channel_id,
                sequence,
            })
    }

    async fn get_latest_sequence(&self, channel_id: i64) -> FetchResult<i64> {
        Ok(self
            .messages
            .range((channel_id, i64::MIN)..=(channel_id, i64::MAX))
            .next_back()
            .map(|((_, seq), _)| *seq)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LINE_A: &str = r#"{"id": 1, "chat": {"id": -100}, "date": "2024-01-01T00:00:00Z", "text": "a"}"#;
    const LINE_B: &str = r#"{"id": 3, "chat": {"id": -100}, "date": "2024-01-01T00:00:00Z", "text": "b"}"#;
    const LINE_OTHER: &str = r#"{"id": 9, "chat": {"id": -200}, "date": "2024-01-01T00:00:00Z"}"#;

    #[tokio::test]
    async fn test_jsonl_export() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}\nnot json\n\n{}\n{}", LINE_A, LINE_B, LINE_OTHER).unwrap();

        let source = JsonExportSource::load(file.path()).await.unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.channels(), vec![-200, -100]);
        assert_eq!(source.get_latest_sequence(-100).await.unwrap(), 3);
        assert_eq!(source.get_latest_sequence(-300).await.unwrap(), 0);

        let msg = source.get_message(-100, 3).await.unwrap();
        assert_eq!(msg.text.as_deref(), Some("b"));
        assert!(matches!(
            source.get_message(-100, 2).await,
            Err(FetchError::NotFound { sequence: 2, .. })
        ));
        assert!(matches!(
            source.get_message(-100, 0).await,
            Err(FetchError::InvalidSequence { .. })
        ));
    }

    #[tokio::test]
    async fn test_json_array_export() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[{},{}]", LINE_A, LINE_B).unwrap();
        let source = JsonExportSource::load(file.path()).await.unwrap();
        assert_eq!(source.len(), 2);
    }
}
