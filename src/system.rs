use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, warn};

use crate::platform::SystemProbe;

/// Per-fact deadline when the config does not set one.
pub const DEFAULT_FACT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Shown wherever a fact could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// The fixed set of facts the collector knows how to gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FactKey {
    User,
    Os,
    Hostname,
    Kernel,
    Uptime,
    Packages,
    Shell,
    Resolution,
    Wm,
    Theme,
    Terminal,
    Font,
    Cpu,
    Gpu,
    Memory,
    Disk,
}

impl FactKey {
    pub const ALL: [FactKey; 16] = [
        FactKey::User,
        FactKey::Os,
        FactKey::Hostname,
        FactKey::Kernel,
        FactKey::Uptime,
        FactKey::Packages,
        FactKey::Shell,
        FactKey::Resolution,
        FactKey::Wm,
        FactKey::Theme,
        FactKey::Terminal,
        FactKey::Font,
        FactKey::Cpu,
        FactKey::Gpu,
        FactKey::Memory,
        FactKey::Disk,
    ];

    /// Name used in config files and in the cache.
    pub fn as_str(self) -> &'static str {
        match self {
            FactKey::User => "user",
            FactKey::Os => "os",
            FactKey::Hostname => "hostname",
            FactKey::Kernel => "kernel",
            FactKey::Uptime => "uptime",
            FactKey::Packages => "packages",
            FactKey::Shell => "shell",
            FactKey::Resolution => "resolution",
            FactKey::Wm => "wm",
            FactKey::Theme => "theme",
            FactKey::Terminal => "terminal",
            FactKey::Font => "font",
            FactKey::Cpu => "cpu",
            FactKey::Gpu => "gpu",
            FactKey::Memory => "memory",
            FactKey::Disk => "disk",
        }
    }

    /// Label shown in the facts column.
    pub fn label(self) -> &'static str {
        match self {
            FactKey::User => "User",
            FactKey::Os => "OS",
            FactKey::Hostname => "Host",
            FactKey::Kernel => "Kernel",
            FactKey::Uptime => "Uptime",
            FactKey::Packages => "Packages",
            FactKey::Shell => "Shell",
            FactKey::Resolution => "Resolution",
            FactKey::Wm => "WM",
            FactKey::Theme => "Theme",
            FactKey::Terminal => "Terminal",
            FactKey::Font => "Font",
            FactKey::Cpu => "CPU",
            FactKey::Gpu => "GPU",
            FactKey::Memory => "Memory",
            FactKey::Disk => "Disk",
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        FactKey::ALL
            .into_iter()
            .find(|key| key.as_str() == needle)
            .ok_or_else(|| format!("unknown fact key '{}'", s))
    }
}

/// Outcome of one fact query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactValue {
    Known(String),
    Unknown,
}

impl FactValue {
    pub fn as_str(&self) -> &str {
        match self {
            FactValue::Known(value) => value,
            FactValue::Unknown => UNKNOWN,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, FactValue::Known(_))
    }
}

/// Immutable capture of every fact at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemFacts {
    values: BTreeMap<FactKey, FactValue>,
    captured_at: DateTime<Utc>,
}

impl SystemFacts {
    /// Keys missing from `values` are recorded as unknown.
    pub fn new(mut values: BTreeMap<FactKey, FactValue>, captured_at: DateTime<Utc>) -> Self {
        for key in FactKey::ALL {
            values.entry(key).or_insert(FactValue::Unknown);
        }
        Self {
            values,
            captured_at: truncate_to_millis(captured_at),
        }
    }

    pub fn get(&self, key: FactKey) -> &FactValue {
        // every key is populated in `new`
        self.values.get(&key).unwrap_or(&FactValue::Unknown)
    }

    pub fn display(&self, key: FactKey) -> &str {
        self.get(key).as_str()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactKey, &FactValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// The cache stores millisecond timestamps, so snapshots do too.
fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .unwrap_or(at)
}

/// Runs every fact query on its own blocking task with a deadline.
pub struct FactsCollector<P> {
    probe: Arc<P>,
    timeout: Duration,
}

impl<P: SystemProbe + 'static> FactsCollector<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            timeout: DEFAULT_FACT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gathers all facts. Never fails: a fact that errors, panics or misses
    /// its deadline is recorded as unknown.
    pub async fn collect(&self) -> SystemFacts {
        // deadlines start now, so awaiting in order still bounds the total wait
        let pending: Vec<_> = FactKey::ALL
            .into_iter()
            .map(|key| {
                let probe = Arc::clone(&self.probe);
                let task = tokio::task::spawn_blocking(move || probe.query(key));
                (key, tokio::time::timeout(self.timeout, task))
            })
            .collect();

        let mut values = BTreeMap::new();
        for (key, task) in pending {
            let value = match task.await {
                Ok(Ok(Ok(value))) if !value.trim().is_empty() => FactValue::Known(value),
                Ok(Ok(Ok(_))) => {
                    debug!(%key, "query returned an empty value");
                    FactValue::Unknown
                }
                Ok(Ok(Err(e))) => {
                    warn!("{}", e);
                    FactValue::Unknown
                }
                Ok(Err(e)) => {
                    warn!(%key, "query task failed: {}", e);
                    FactValue::Unknown
                }
                Err(_) => {
                    warn!(%key, timeout = ?self.timeout, "query timed out");
                    FactValue::Unknown
                }
            };
            values.insert(key, value);
        }

        SystemFacts::new(values, Utc::now())
    }
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Usage figures for one mounted volume.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub name: String,
    pub total: u64,
    pub available: u64,
}

fn percent(used: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        ((used as f64 / total as f64) * 100.0).round() as u64
    }
}

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d ", days));
    }
    if hours > 0 || days > 0 {
        out.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 || hours > 0 || days > 0 {
        out.push_str(&format!("{}m ", minutes));
    }
    out.push_str(&format!("{}s", seconds));
    out
}

pub fn format_memory(used: u64, total: u64) -> String {
    format!(
        "{:.2} GiB / {:.2} GiB ({}%)",
        used as f64 / GIB,
        total as f64 / GIB,
        percent(used, total)
    )
}

/// First two volumes, then a count of the rest.
pub fn format_disks(disks: &[DiskUsage]) -> Option<String> {
    if disks.is_empty() {
        return None;
    }
    let shown: Vec<String> = disks
        .iter()
        .take(2)
        .map(|disk| {
            let used = disk.total.saturating_sub(disk.available);
            format!(
                "{} ({:.1}/{:.1} GiB, {}%)",
                disk.name,
                used as f64 / GIB,
                disk.total as f64 / GIB,
                percent(used, disk.total)
            )
        })
        .collect();
    let mut out = shown.join(", ");
    if disks.len() > 2 {
        out.push_str(&format!(" (+{} more)", disks.len() - 2));
    }
    Some(out)
}

static CPU_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((?:R|TM)\)|\s+CPU\b").expect("literal pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("literal pattern"));

pub fn format_cpu(brand: &str, mhz: u64, cores: Option<usize>, threads: usize) -> String {
    let name = CPU_NOISE.replace_all(brand, "");
    let name = WHITESPACE.replace_all(&name, " ");
    let name = name.trim();

    let mut out = name.to_string();
    if mhz > 0 && !name.contains("GHz") {
        out.push_str(&format!(" @ {:.2}GHz", mhz as f64 / 1000.0));
    }
    match cores {
        Some(cores) => out.push_str(&format!(" ({}C/{}T)", cores, threads)),
        None if threads > 0 => out.push_str(&format!(" ({}T)", threads)),
        None => {}
    }
    out
}

/// `12 (scoop), 40 (winget)`; managers reporting zero are dropped.
pub fn format_packages(counts: &[(&str, usize)]) -> Option<String> {
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(manager, count)| format!("{} ({})", count, manager))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
