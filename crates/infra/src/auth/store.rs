//! Token storage backends

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use mentorlink_common::error::{CommonError, CommonResult};
use parking_lot::Mutex;
use tracing::debug;

/// Key/value storage for tokens
///
/// Implementations are synchronous; they are only touched under short
/// critical sections and never across an await.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> CommonResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CommonResult<()>;

    fn remove(&self, key: &str) -> CommonResult<()>;
}

/// Session-scoped store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> CommonResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CommonResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CommonResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Durable store backed by a JSON object on disk
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a partially written file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store backed by the JSON file at `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CommonResult<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(CommonError::persistence("read tokens", e.to_string())),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .map_err(|e| CommonError::serialization("json", format!("{}: {e}", self.path.display())))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> CommonResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CommonError::persistence("create token dir", e.to_string()))?;
        }
        let contents = serde_json::to_string_pretty(values)
            .map_err(|e| CommonError::serialization("json", e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)
            .map_err(|e| CommonError::persistence("write tokens", e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| CommonError::persistence("rename tokens", e.to_string()))?;
        debug!(path = %self.path.display(), "token file written");
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> CommonResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CommonResult<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> CommonResult<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
