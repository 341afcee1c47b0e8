use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SystemProbe, common};
use crate::error::{Error, Result};
use crate::system::{self, FactKey};

/// Linux, macOS and the BSDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixProbe;

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
        .to_string()
}

fn env_fact(key: FactKey, vars: &[&str]) -> Result<String> {
    vars.iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| Error::collection(key, format!("none of {} set", vars.join(", "))))
}

fn linux_gpus() -> Option<String> {
    if let Some(stdout) = common::command_output("lspci", &[]) {
        let gpus: Vec<String> = stdout
            .lines()
            .filter(|line| line.contains(" VGA ") || line.contains("3D controller"))
            .filter_map(|line| line.rsplit(": ").next())
            .map(|name| name.trim().to_string())
            .collect();
        if !gpus.is_empty() {
            return Some(gpus.join(", "));
        }
    }

    let entries = fs::read_dir("/sys/bus/pci/devices").ok()?;
    let mut gpus = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(class) = fs::read_to_string(path.join("class")) else {
            continue;
        };
        if !class.trim().starts_with("0x03") {
            continue;
        }
        if let (Ok(vendor), Ok(device)) = (
            fs::read_to_string(path.join("vendor")),
            fs::read_to_string(path.join("device")),
        ) {
            gpus.push(format!("PCI {}:{}", vendor.trim(), device.trim()));
        }
    }
    if gpus.is_empty() { None } else { Some(gpus.join(", ")) }
}

fn macos_gpus() -> Option<String> {
    let stdout = common::command_output("system_profiler", &["SPDisplaysDataType", "-json"])?;
    let json: serde_json::Value = serde_json::from_str(&stdout).ok()?;
    let gpus = json.get("SPDisplaysDataType")?.as_array()?;
    let names: Vec<String> = gpus
        .iter()
        .filter_map(|gpu| {
            let model = gpu.get("sppci_model")?.as_str()?;
            match gpu.get("sppci_cores").and_then(|v| v.as_str()) {
                Some(cores) => Some(format!("{} ({} cores)", model, cores)),
                None => Some(model.to_string()),
            }
        })
        .collect();
    if names.is_empty() { None } else { Some(names.join(", ")) }
}

/// First connected DRM output's preferred mode.
fn drm_resolution() -> Option<String> {
    let mut outputs: Vec<PathBuf> = fs::read_dir("/sys/class/drm")
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            fs::read_to_string(path.join("status"))
                .map(|status| status.trim() == "connected")
                .unwrap_or(false)
        })
        .collect();
    outputs.sort();
    outputs.iter().find_map(|path| {
        fs::read_to_string(path.join("modes"))
            .ok()?
            .lines()
            .next()
            .map(str::to_string)
    })
}

impl SystemProbe for UnixProbe {
    fn user(&self) -> Result<String> {
        common::user()
    }

    fn os(&self) -> Result<String> {
        common::os()
    }

    fn hostname(&self) -> Result<String> {
        common::hostname()
    }

    fn kernel(&self) -> Result<String> {
        common::kernel()
    }

    fn uptime(&self) -> Result<String> {
        common::uptime()
    }

    fn packages(&self) -> Result<String> {
        let dpkg = common::count_entries(Path::new("/var/lib/dpkg/info"), |p| {
            p.extension().is_some_and(|ext| ext == "list")
        });
        let pacman = common::count_entries(Path::new("/var/lib/pacman/local"), Path::is_dir);
        let brew: usize = ["/opt/homebrew/Cellar", "/usr/local/Cellar"]
            .iter()
            .map(|dir| common::count_entries(Path::new(dir), Path::is_dir))
            .sum();
        let flatpak = common::count_entries(Path::new("/var/lib/flatpak/app"), Path::is_dir);

        system::format_packages(&[("dpkg", dpkg), ("pacman", pacman), ("brew", brew), ("flatpak", flatpak)])
            .ok_or_else(|| Error::collection(FactKey::Packages, "no package manager found"))
    }

    fn shell(&self) -> Result<String> {
        env_fact(FactKey::Shell, &["SHELL"]).map(|shell| basename(&shell))
    }

    fn resolution(&self) -> Result<String> {
        drm_resolution().ok_or_else(|| Error::collection(FactKey::Resolution, "no connected display"))
    }

    fn wm(&self) -> Result<String> {
        if cfg!(target_os = "macos") {
            return Ok("Quartz Compositor".to_string());
        }
        env_fact(FactKey::Wm, &["XDG_CURRENT_DESKTOP", "DESKTOP_SESSION"])
    }

    fn theme(&self) -> Result<String> {
        if cfg!(target_os = "macos") {
            let style = common::command_output("defaults", &["read", "-g", "AppleInterfaceStyle"]);
            return Ok(match style.as_deref() {
                Some("Dark") => "Dark".to_string(),
                _ => "Light".to_string(),
            });
        }
        env_fact(FactKey::Theme, &["GTK_THEME"])
    }

    fn terminal(&self) -> Result<String> {
        if let Ok(program) = env_fact(FactKey::Terminal, &["TERM_PROGRAM"]) {
            return Ok(program);
        }
        // our parent is the shell, its parent is usually the emulator
        common::ancestor_process_name(2)
            .or_else(|| env::var("TERM").ok())
            .ok_or_else(|| Error::collection(FactKey::Terminal, "no parent terminal process"))
    }

    fn cpu(&self) -> Result<String> {
        common::cpu()
    }

    fn gpu(&self) -> Result<String> {
        let found = if cfg!(target_os = "macos") {
            macos_gpus()
        } else {
            linux_gpus()
        };
        found.ok_or_else(|| Error::collection(FactKey::Gpu, "no display adapter found"))
    }

    fn memory(&self) -> Result<String> {
        common::memory()
    }

    fn disk(&self) -> Result<String> {
        common::disk()
    }
}
