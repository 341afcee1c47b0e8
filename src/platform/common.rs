//! Queries that `sysinfo`, `os_info` and `whoami` answer on every OS.

use std::path::Path;
use std::process::Command;

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

use crate::error::{Error, Result};
use crate::system::{self, DiskUsage, FactKey};

pub fn user() -> Result<String> {
    let host = hostname()?;
    Ok(format!("{}@{}", whoami::username(), host))
}

pub fn hostname() -> Result<String> {
    System::host_name().ok_or_else(|| Error::collection(FactKey::Hostname, "host name unavailable"))
}

pub fn os() -> Result<String> {
    let info = os_info::get();
    let name = info
        .edition()
        .map(str::to_string)
        .unwrap_or_else(|| info.os_type().to_string());
    let mut out = name.replace("Microsoft ", "");
    if *info.version() != os_info::Version::Unknown {
        out.push_str(&format!(" ({})", info.version()));
    }
    if info.bitness() != os_info::Bitness::Unknown {
        out.push_str(&format!(" [{}]", info.bitness()));
    }
    Ok(out)
}

pub fn kernel() -> Result<String> {
    System::kernel_version().ok_or_else(|| Error::collection(FactKey::Kernel, "kernel version unavailable"))
}

pub fn uptime() -> Result<String> {
    match System::uptime() {
        0 => Err(Error::collection(FactKey::Uptime, "boot time unavailable")),
        secs => Ok(system::format_uptime(secs)),
    }
}

pub fn cpu() -> Result<String> {
    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    let cpus = sys.cpus();
    let first = cpus
        .first()
        .ok_or_else(|| Error::collection(FactKey::Cpu, "no processors reported"))?;
    Ok(system::format_cpu(
        first.brand(),
        first.frequency(),
        sys.physical_core_count(),
        cpus.len(),
    ))
}

pub fn memory() -> Result<String> {
    let sys = System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::everything()));
    if sys.total_memory() == 0 {
        return Err(Error::collection(FactKey::Memory, "memory totals unavailable"));
    }
    Ok(system::format_memory(sys.used_memory(), sys.total_memory()))
}

pub fn disk() -> Result<String> {
    let disks = Disks::new_with_refreshed_list();
    let usage: Vec<DiskUsage> = disks
        .list()
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| DiskUsage {
            name: disk
                .mount_point()
                .display()
                .to_string()
                .trim_end_matches('\\')
                .to_string(),
            total: disk.total_space(),
            available: disk.available_space(),
        })
        .collect();
    system::format_disks(&usage).ok_or_else(|| Error::collection(FactKey::Disk, "no volumes reported"))
}

/// Name of the process `depth` levels above this one.
pub fn ancestor_process_name(depth: usize) -> Option<String> {
    let mut sys = System::new();
    sys.refresh_processes();
    let mut pid = sysinfo::get_current_pid().ok()?;
    for _ in 0..depth {
        pid = sys.process(pid)?.parent()?;
    }
    sys.process(pid).map(|process| process.name().to_string())
}

/// Runs a command and returns its trimmed stdout when it succeeds.
pub fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}

/// Number of directory entries accepted by `keep`; zero when unreadable.
pub fn count_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().filter(|entry| keep(&entry.path())).count())
        .unwrap_or(0)
}
