use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::state::Message;
use super::state::MessageId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub seq: u64,
    pub ts_ms: i64,
    pub message: Message,
}

/// Append-only JSONL log of finalized conversation messages.
#[derive(Debug)]
pub struct TranscriptStore {
    path: PathBuf,
    next_seq: u64,
}

impl TranscriptStore {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existing = load_records(path.as_path())?;
        let next_seq = existing
            .iter()
            .map(|record| record.seq)
            .max()
            .map_or(1, |seq| seq.saturating_add(1));
        Ok(Self { path, next_seq })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Messages still marked streaming are refused.
    pub fn append(&mut self, message: &Message) -> std::io::Result<u64> {
        if message.streaming {
            return Err(std::io::Error::other(format!(
                "message {} is still streaming",
                message.id
            )));
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let record = TranscriptRecord {
            seq,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            message: message.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|err| std::io::Error::other(format!("serialize: {err}")))?;
        append_line(self.path.as_path(), line.as_str())?;
        Ok(seq)
    }

    pub fn load(&self) -> std::io::Result<Vec<TranscriptRecord>> {
        load_records(self.path.as_path())
    }
}

/// Rebuilds conversation order from records. A message id written twice keeps
/// its first position and its latest content.
pub fn restore_messages(records: &[TranscriptRecord]) -> Vec<Message> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.seq);

    let mut messages: Vec<Message> = Vec::new();
    for record in sorted {
        if record.message.streaming {
            continue;
        }
        match position_of(&messages, &record.message.id) {
            Some(index) => messages[index] = record.message,
            None => messages.push(record.message),
        }
    }
    messages
}

fn position_of(messages: &[Message], id: &MessageId) -> Option<usize> {
    messages.iter().position(|message| &message.id == id)
}

fn load_records(path: &Path) -> std::io::Result<Vec<TranscriptRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => tracing::debug!(error = %err, "skipping unreadable transcript line"),
        }
    }
    Ok(records)
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}
