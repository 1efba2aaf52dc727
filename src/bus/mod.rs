//! `MessageBus`: filesystem-backed inbox/outbox/processed queues per
//! instance, using the same atomic create-then-rename pattern this crate
//! already relies on elsewhere for on-disk state.

pub mod router;

pub use router::Router;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum BusError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::Io(e) => write!(f, "message bus I/O error: {e}"),
            BusError::Serialize(e) => write!(f, "malformed message file: {e}"),
        }
    }
}

impl std::error::Error for BusError {}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self {
        BusError::Io(e)
    }
}

impl From<serde_json::Error> for BusError {
    fn from(e: serde_json::Error) -> Self {
        BusError::Serialize(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Task,
    Status,
    Result,
    Error,
}

/// Either a concrete set of instance ids or the `broadcast` sentinel (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Broadcast,
    Instances(Vec<String>),
}

impl Recipient {
    fn matches(&self, instance_id: &str) -> bool {
        match self {
            Recipient::Broadcast => true,
            Recipient::Instances(ids) => ids.iter().any(|id| id == instance_id),
        }
    }
}

/// Immutable message record (§3). `id` is `<timestamp>-<9-char-random>`,
/// which is also the filename (with `:` replaced by `-` so it's a valid
/// filename on every platform), giving filename-sort == send-order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    to: WireTo,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `"broadcast"` or `["<id>", ...]` on the wire (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireTo {
    Sentinel(String),
    Instances(Vec<String>),
}

impl Message {
    pub fn to(&self) -> Recipient {
        match &self.to {
            WireTo::Sentinel(_) => Recipient::Broadcast,
            WireTo::Instances(ids) => Recipient::Instances(ids.clone()),
        }
    }

    fn new(from: &str, to: Recipient, kind: MessageKind, content: &str, metadata: Option<serde_json::Value>) -> Self {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let suffix: String = {
            let mut rng = rand::thread_rng();
            (0..9)
                .map(|_| {
                    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
                    CHARSET[rng.gen_range(0..CHARSET.len())] as char
                })
                .collect()
        };
        let id = format!("{timestamp}-{suffix}");
        let metadata = match metadata {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            id,
            from: from.to_string(),
            to: match to {
                Recipient::Broadcast => WireTo::Sentinel("broadcast".to_string()),
                Recipient::Instances(ids) => WireTo::Instances(ids),
            },
            kind,
            content: content.to_string(),
            timestamp,
            metadata,
        }
    }

    /// Filename this message is stored under: the id with `:` replaced by
    /// `-` so the timestamp prefix is filesystem-safe everywhere.
    fn filename(&self) -> String {
        format!("{}.json", self.id.replace(':', "-"))
    }
}

/// How long a processed message is retained before `cleanup()` deletes it.
const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-instance `inbox/`/`outbox/`/`processed/` directories under
/// `<repo>/.cgwt/messages/<instanceId>/`.
pub struct MessageBus {
    instance_id: String,
    root: PathBuf,
    watching: std::sync::atomic::AtomicBool,
}

impl MessageBus {
    pub fn for_instance(messages_root: &Path, instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            root: messages_root.join(instance_id),
            watching: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn outbox(&self) -> PathBuf {
        self.root.join("outbox")
    }

    pub fn inbox(&self) -> PathBuf {
        self.root.join("inbox")
    }

    pub fn processed(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn init_directories(&self) -> Result<(), BusError> {
        for dir in [self.outbox(), self.inbox(), self.processed()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// `send(to, kind, content, metadata?)` — atomic create-then-rename
    /// into `outbox/`.
    pub fn send(
        &self,
        to: Recipient,
        kind: MessageKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, BusError> {
        let message = Message::new(&self.instance_id, to, kind, content, metadata);
        self.write_atomic(&self.outbox(), &message)?;
        Ok(message)
    }

    fn write_atomic(&self, dir: &Path, message: &Message) -> Result<(), BusError> {
        fs::create_dir_all(dir)?;
        let final_path = dir.join(message.filename());
        let tmp_path = dir.join(format!(".{}.tmp", message.filename()));
        fs::write(&tmp_path, serde_json::to_vec_pretty(message)?)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// `pending()` — scan `inbox/`, keep messages addressed to this
    /// instance (or `broadcast`), filename-sort order, move consumed files
    /// to `processed/`.
    pub fn pending(&self) -> Result<Vec<Message>, BusError> {
        let inbox = self.inbox();
        fs::create_dir_all(&inbox)?;
        fs::create_dir_all(self.processed())?;

        let mut entries: Vec<PathBuf> = fs::read_dir(&inbox)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        entries.sort();

        let mut delivered = Vec::new();
        for path in entries {
            let bytes = fs::read(&path)?;
            let message: Message = serde_json::from_slice(&bytes)?;
            if !message.to().matches(&self.instance_id) {
                continue;
            }
            let processed_path = self.processed().join(
                path.file_name().expect("inbox entries have a filename"),
            );
            fs::rename(&path, &processed_path)?;
            delivered.push(message);
        }
        Ok(delivered)
    }

    /// `startWatching(periodMs)` marker; the actual cooperative polling
    /// loop lives in `AppController`, which calls `pending()` on each tick
    /// while `is_watching()` is true.
    pub fn start_watching(&self) {
        self.watching.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn stop_watching(&self) {
        self.watching.store(false, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// `cleanup()` — delete `processed/` files older than 24h.
    pub fn cleanup(&self) -> Result<(), BusError> {
        let processed = self.processed();
        if !processed.exists() {
            return Ok(());
        }
        let now = SystemTime::now();
        for entry in fs::read_dir(&processed)?.filter_map(|e| e.ok()) {
            let metadata = entry.metadata()?;
            let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
            if now.duration_since(modified).unwrap_or_default() > RETENTION {
                let _ = fs::remove_file(entry.path());
            }
        }
        Ok(())
    }
}
