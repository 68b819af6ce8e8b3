use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::candidate::CandidateId;
use crate::error::Result;
use crate::scheduler::{ActiveAssignment, CooldownEntry, ExceptionEntry, QueueEntry};

pub const QUEUE_FILE: &str = "livequeue.json";
pub const COOLDOWNS_FILE: &str = "cooldowns.json";
pub const ACTIVE_FILE: &str = "active.json";
pub const EXCEPTIONS_FILE: &str = "exceptions.json";
/// Appended to a document that failed to parse on load.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Full contents of the four stores, each keyed by candidate id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub queue: BTreeMap<CandidateId, QueueEntry>,
    #[serde(default)]
    pub cooldowns: BTreeMap<CandidateId, CooldownEntry>,
    #[serde(default)]
    pub active: BTreeMap<CandidateId, ActiveAssignment>,
    #[serde(default)]
    pub exceptions: BTreeMap<CandidateId, ExceptionEntry>,
}

/// Snapshot/restore of the stores. Writes are whole-snapshot; there is no
/// transactional guarantee across the four documents.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn load(&self) -> Result<Snapshot>;
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// One pretty-printed JSON document per store in a data directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_document<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Document missing, starting empty");
                return Ok(T::default());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                // The next save would overwrite it, so keep the bad copy aside.
                let aside = self.dir.join(format!("{}{}", name, CORRUPT_SUFFIX));
                match tokio::fs::rename(&path, &aside).await {
                    Ok(()) => tracing::warn!(
                        path = %path.display(),
                        moved_to = %aside.display(),
                        error = %e,
                        "Unreadable document moved aside, starting empty"
                    ),
                    Err(rename_err) => tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        rename_error = %rename_err,
                        "Unreadable document will be overwritten on the next save"
                    ),
                }
                Ok(T::default())
            }
        }
    }

    async fn write_document<T: Serialize>(&self, name: &str, doc: &T) -> Result<()> {
        let contents = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(self.dir.join(name), contents).await?;
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for JsonFilePersistence {
    async fn load(&self) -> Result<Snapshot> {
        let snapshot = Snapshot {
            queue: self.read_document(QUEUE_FILE).await?,
            cooldowns: self.read_document(COOLDOWNS_FILE).await?,
            active: self.read_document(ACTIVE_FILE).await?,
            exceptions: self.read_document(EXCEPTIONS_FILE).await?,
        };
        tracing::info!(
            dir = %self.dir.display(),
            queued = snapshot.queue.len(),
            cooldowns = snapshot.cooldowns.len(),
            active = snapshot.active.len(),
            exceptions = snapshot.exceptions.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.write_document(QUEUE_FILE, &snapshot.queue).await?;
        self.write_document(COOLDOWNS_FILE, &snapshot.cooldowns).await?;
        self.write_document(ACTIVE_FILE, &snapshot.active).await?;
        self.write_document(EXCEPTIONS_FILE, &snapshot.exceptions).await?;
        tracing::debug!(dir = %self.dir.display(), "Snapshot saved");
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Snapshot>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: Mutex::new(snapshot),
        }
    }

    pub async fn saved(&self) -> Snapshot {
        self.saved.lock().await.clone()
    }
}

#[async_trait]
impl PersistencePort for MemoryPersistence {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.saved.lock().await = snapshot.clone();
        Ok(())
    }
}
