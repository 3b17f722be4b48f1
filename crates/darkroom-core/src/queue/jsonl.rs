//! Append-only JSONL spool used to hand messages from `ingest` to `process`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::QueueError;
use crate::types::IngestMessage;

use super::{DeliveredMessage, MessageQueue};

/// Queue that appends one message body per line to a spool file.
pub struct JsonlQueue {
    path: PathBuf,
}

impl JsonlQueue {
    /// Create a queue writing to `path`. The file is created on first send.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write per line keeps concurrent appenders from interleaving
        file.write_all(format!("{line}\n").as_bytes())?;
        file.flush()
    }
}

#[async_trait]
impl MessageQueue for JsonlQueue {
    async fn send(&self, message: &IngestMessage) -> Result<(), QueueError> {
        let body = message.to_body()?;
        self.append(&body).map_err(|source| QueueError::Spool {
            path: self.path.clone(),
            source,
        })
    }
}

/// Read a spool file back as a delivery batch. See [`parse_spool`].
pub fn read_spool(path: &Path) -> std::io::Result<Vec<DeliveredMessage>> {
    Ok(parse_spool(&std::fs::read_to_string(path)?))
}

/// Parse spool content into a delivery batch.
///
/// Blank lines are ignored. Message ids are `line-<n>` with 1-based line
/// numbers, so a retry list can be matched back to the spool.
pub fn parse_spool(content: &str) -> Vec<DeliveredMessage> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let body = line.trim();
            (!body.is_empty())
                .then(|| DeliveredMessage::new(format!("line-{}", index + 1), body))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(key: &str) -> IngestMessage {
        IngestMessage {
            bucket: "uploads".to_string(),
            key: key.to_string(),
            etag: None,
        }
    }

    #[tokio::test]
    async fn test_send_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JsonlQueue::new(dir.path().join("spool/queue.jsonl"));

        queue.send(&message("incoming/a.png")).await.unwrap();
        queue.send(&message("incoming/b.png")).await.unwrap();

        let messages = read_spool(queue.path()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_id, "line-1");
        assert_eq!(
            IngestMessage::parse(&messages[1].body).unwrap().key,
            "incoming/b.png"
        );
    }

    #[test]
    fn test_read_spool_skips_blank_lines_keeps_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.jsonl");
        std::fs::write(&path, "{\"bucket\":\"b\",\"key\":\"k\"}\n\nnot json\n").unwrap();

        let messages = read_spool(&path).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].message_id, "line-3");
        assert_eq!(messages[1].body, "not json");
    }

    #[tokio::test]
    async fn test_send_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the spool file should be
        let queue = JsonlQueue::new(dir.path());
        let err = queue.send(&message("incoming/a.png")).await.unwrap_err();
        assert!(matches!(err, QueueError::Spool { .. }));
    }
}
