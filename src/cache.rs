//! On-disk snapshot cache
//!
//! The file is `{"timestamp": <unix seconds>, "info": {"<key>": "<value>" | null}}`.
//! `null` records a fact that was unknown at capture time. Keys this build
//! does not know are ignored on read.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::system::{FactKey, FactValue, SystemFacts};

/// Staleness window when the config does not set one.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    timestamp: f64,
    info: HashMap<String, Option<String>>,
}

impl From<&SystemFacts> for CacheEntry {
    fn from(facts: &SystemFacts) -> Self {
        let info = facts
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    FactValue::Known(v) => Some(v.clone()),
                    FactValue::Unknown => None,
                };
                (key.as_str().to_string(), value)
            })
            .collect();
        Self {
            timestamp: facts.captured_at().timestamp_millis() as f64 / 1000.0,
            info,
        }
    }
}

impl CacheEntry {
    fn into_facts(self) -> Option<SystemFacts> {
        let captured_at = Utc
            .timestamp_millis_opt((self.timestamp * 1000.0).round() as i64)
            .single()?;
        let values: BTreeMap<FactKey, FactValue> = self
            .info
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.parse::<FactKey>().ok()?;
                Some((key, value.map_or(FactValue::Unknown, FactValue::Known)))
            })
            .collect();
        Some(SystemFacts::new(values, captured_at))
    }
}

/// A single cache file holding the last snapshot.
#[derive(Debug, Clone)]
pub struct FactsCache {
    path: PathBuf,
}

impl FactsCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<cache dir>/winfetch/sysinfo.json`, falling back to the temp dir.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("winfetch")
            .join("sysinfo.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored snapshot if it is at most `max_age` old. Missing, stale,
    /// future-dated and unreadable files are all misses.
    pub fn read(&self, max_age: Duration) -> Option<SystemFacts> {
        let facts = match self.load() {
            Ok(Some(facts)) => facts,
            Ok(None) => {
                debug!(path = %self.path.display(), "no cache file");
                return None;
            }
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(facts.captured_at());
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        if age < chrono::Duration::zero() {
            debug!("cache timestamp is in the future, ignoring");
            return None;
        }
        if age > max_age {
            debug!(age_ms = age.num_milliseconds(), "cache is stale");
            return None;
        }
        Some(facts)
    }

    fn load(&self) -> Result<Option<SystemFacts>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.read_error(e)),
        };
        let entry: CacheEntry = serde_json::from_str(&content).map_err(|e| self.read_error(e))?;
        entry
            .into_facts()
            .map(Some)
            .ok_or_else(|| self.read_error("timestamp out of range"))
    }

    /// Replaces the cache file atomically: the snapshot goes to a temporary
    /// file in the same directory which is then renamed over the target.
    pub fn write(&self, facts: &SystemFacts) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let json = serde_json::to_vec(&CacheEntry::from(facts)).map_err(|e| self.write_error(e))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(&json).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_error(e.error))?;
        debug!(path = %self.path.display(), "cache written");
        Ok(())
    }

    fn read_error(&self, reason: impl ToString) -> Error {
        Error::CacheRead {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, reason: impl ToString) -> Error {
        Error::CacheWrite {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
