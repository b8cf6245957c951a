//! Persisted poll baselines.
//!
//! A baseline is the newest point in a module's history that a build has
//! seen. Stores only ever move a baseline forward.

use crate::error::{Result, ScmError};
use chrono::{DateTime, Utc};
use cvsync_core::ModuleKey;
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Maximum time to wait for the store lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Last-seen point in a module's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollBaseline {
    /// Lower bound of the next history query (exclusive).
    pub timestamp: DateTime<Utc>,
    /// Newest file revision seen at `timestamp`, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl PollBaseline {
    /// A baseline at `timestamp`.
    #[must_use]
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            revision: None,
        }
    }

    /// Attach a revision.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// The later of two baselines; ties keep `self`.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.timestamp > self.timestamp { other } else { self }
    }
}

/// Keyed storage for baselines. Single writer per key.
pub trait BaselineStore: std::fmt::Debug + Send + Sync {
    /// Baseline for a module, if any.
    fn get(&self, key: &ModuleKey) -> Result<Option<PollBaseline>>;

    /// Record a baseline; an older value than the stored one is ignored.
    fn put(&self, key: &ModuleKey, baseline: PollBaseline) -> Result<()>;

    /// Record several baselines.
    fn put_all(&self, baselines: &BTreeMap<ModuleKey, PollBaseline>) -> Result<()> {
        for (key, baseline) in baselines {
            self.put(key, baseline.clone())?;
        }
        Ok(())
    }
}

fn merge(map: &mut BTreeMap<ModuleKey, PollBaseline>, key: &ModuleKey, baseline: PollBaseline) -> bool {
    match map.get(key) {
        Some(existing) if existing.timestamp >= baseline.timestamp => false,
        _ => {
            map.insert(key.clone(), baseline);
            true
        }
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    entries: RwLock<BTreeMap<ModuleKey, PollBaseline>>,
}

impl MemoryBaselineStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored baselines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn get(&self, key: &ModuleKey) -> Result<Option<PollBaseline>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &ModuleKey, baseline: PollBaseline) -> Result<()> {
        merge(&mut self.entries.write(), key, baseline);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BaselineFile {
    baselines: Vec<BaselineRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BaselineRecord {
    key: ModuleKey,
    baseline: PollBaseline,
}

/// JSON file store guarded by an exclusive lock file.
///
/// Every write is a locked read-modify-write followed by an atomic rename.
#[derive(Debug, Clone)]
pub struct FileBaselineStore {
    path: PathBuf,
}

impl FileBaselineStore {
    /// A store backed by `path`; the file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn acquire_lock(&self) -> Result<File> {
        let path = self.lock_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ScmError::baseline(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| ScmError::baseline(&path, e))?;

        let start = std::time::Instant::now();
        loop {
            // fs2's method, not std's File::try_lock
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    trace!(path = %path.display(), "acquired baseline lock");
                    return Ok(file);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(ScmError::baseline(
                            &path,
                            format!("lock not acquired within {}s", LOCK_TIMEOUT.as_secs()),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(ScmError::baseline(&path, e)),
            }
        }
    }

    fn read_all(&self) -> Result<BTreeMap<ModuleKey, PollBaseline>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(ScmError::baseline(&self.path, e)),
        };
        let file: BaselineFile =
            sonic_rs::from_str(&content).map_err(|e| ScmError::baseline(&self.path, e))?;
        Ok(file
            .baselines
            .into_iter()
            .map(|r| (r.key, r.baseline))
            .collect())
    }

    fn write_all(&self, map: &BTreeMap<ModuleKey, PollBaseline>) -> Result<()> {
        let file = BaselineFile {
            baselines: map
                .iter()
                .map(|(key, baseline)| BaselineRecord {
                    key: key.clone(),
                    baseline: baseline.clone(),
                })
                .collect(),
        };
        let data = sonic_rs::to_string_pretty(&file).map_err(|e| ScmError::baseline(&self.path, e))?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(parent).map_err(|e| ScmError::baseline(parent, e))?;
        temp.write_all(data.as_bytes())
            .map_err(|e| ScmError::baseline(&self.path, e))?;
        temp.flush().map_err(|e| ScmError::baseline(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| ScmError::baseline(&self.path, e.error))?;
        Ok(())
    }

    /// Every stored baseline.
    pub fn load(&self) -> Result<BTreeMap<ModuleKey, PollBaseline>> {
        let _lock = self.acquire_lock()?;
        self.read_all()
    }
}

impl BaselineStore for FileBaselineStore {
    fn get(&self, key: &ModuleKey) -> Result<Option<PollBaseline>> {
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &ModuleKey, baseline: PollBaseline) -> Result<()> {
        let mut single = BTreeMap::new();
        single.insert(key.clone(), baseline);
        self.put_all(&single)
    }

    fn put_all(&self, baselines: &BTreeMap<ModuleKey, PollBaseline>) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let mut map = self.read_all()?;
        let mut changed = 0usize;
        for (key, baseline) in baselines {
            if merge(&mut map, key, baseline.clone()) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.write_all(&map)?;
        }
        debug!(
            path = %self.path.display(),
            changed,
            total = map.len(),
            "stored poll baselines"
        );
        Ok(())
    }
}
