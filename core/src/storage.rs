//! Persisted key-value state (the cached session).
//!
//! Values are plain strings. `FileStorage` keeps every entry on one
//! `key: value` line of a single file and rewrites the file on each change,
//! so it is only suited to the handful of keys the session store writes.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use log::error;

use crate::error::{ApiError, ApiResult};

pub const USER_TOKEN: &str = "userToken";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const USER_DATA: &str = "userData";

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> ApiResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ApiResult;
    fn remove(&self, key: &str) -> ApiResult;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ApiResult {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ApiResult {
        (**self).remove(key)
    }
}

pub type KeyValues = HashMap<String, String>;

fn poisoned<T>(_: T) -> ApiError {
    ApiError::Storage("storage lock poisoned".to_string())
}

/// Process-local storage; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<KeyValues>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ApiResult {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ApiResult {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

/// Storage backed by a single file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> ApiResult<KeyValues> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(KeyValues::new()),
            Err(e) => {
                error!("open {:?}: {e}", self.path);
                return Err(ApiError::Storage(e.to_string()));
            }
        };
        read(file)
    }

    /// Write to a sibling temp file and rename it over the real one, so a
    /// crash mid-write leaves the previous contents intact.
    fn store(&self, keyvalues: &KeyValues) -> ApiResult {
        let failed = |e: std::io::Error| {
            error!("write {:?}: {e}", self.path);
            ApiError::Storage(e.to_string())
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(failed)?;
            }
        }

        let tmp = self.tmp_path();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(failed)?;
        write(&file, keyvalues).map_err(failed)?;
        file.sync_all().map_err(failed)?;
        fs::rename(&tmp, &self.path).map_err(failed)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn modify(&self, f: impl FnOnce(&mut KeyValues)) -> ApiResult {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut kv = self.load()?;
        f(&mut kv);
        self.store(&kv)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ApiResult {
        if key.contains(':') || key.contains('\n') || value.contains('\n') {
            return Err(ApiError::Storage(format!("unstorable entry for key {key:?}")));
        }
        self.modify(|kv| {
            kv.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> ApiResult {
        self.modify(|kv| {
            kv.remove(key);
        })
    }
}

fn read(input: impl Read) -> ApiResult<KeyValues> {
    let mut kv = HashMap::new();

    for line in BufReader::new(input).lines() {
        let line = line.map_err(|e| {
            error!("couldn't read line: {e}");
            ApiError::Storage(e.to_string())
        })?;
        if line.is_empty() {
            continue;
        }

        let (k, v) = line.split_once(':').ok_or_else(|| {
            error!("invalid line, can't split");
            ApiError::Storage("invalid line".to_string())
        })?;

        let v = v.strip_prefix(' ').ok_or_else(|| {
            error!("invalid line - no whitespace after colon");
            ApiError::Storage("invalid line".to_string())
        })?;
        kv.insert(k.into(), v.into());
    }

    Ok(kv)
}

fn write(mut output: impl Write, keyvalues: &KeyValues) -> Result<(), std::io::Error> {
    for (k, v) in keyvalues {
        writeln!(output, "{}: {}", k, v)?;
    }
    Ok(())
}
