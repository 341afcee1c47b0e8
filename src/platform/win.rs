use std::env;
use std::ffi::c_void;
use std::path::PathBuf;

use windows::Win32::Foundation::ERROR_SUCCESS;
use windows::Win32::System::Registry::{
    HKEY_CURRENT_USER, RRF_RT_REG_DWORD, RRF_RT_REG_SZ, RegGetValueW,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};
use windows::core::HSTRING;

use super::{SystemProbe, common};
use crate::error::{Error, Result};
use crate::system::{self, FactKey};

const PERSONALIZE_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize";
const THEMES_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Themes";

/// Windows 10 and 11.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProbe;

fn read_reg_dword(subkey: &str, value: &str) -> Option<u32> {
    let mut data: u32 = 0;
    let mut size = std::mem::size_of::<u32>() as u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_CURRENT_USER,
            &HSTRING::from(subkey),
            &HSTRING::from(value),
            RRF_RT_REG_DWORD,
            None,
            Some(&mut data as *mut u32 as *mut c_void),
            Some(&mut size),
        )
    };
    (status == ERROR_SUCCESS).then_some(data)
}

fn read_reg_string(subkey: &str, value: &str) -> Option<String> {
    let mut buffer = [0u16; 512];
    let mut size = (buffer.len() * std::mem::size_of::<u16>()) as u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_CURRENT_USER,
            &HSTRING::from(subkey),
            &HSTRING::from(value),
            RRF_RT_REG_SZ,
            None,
            Some(buffer.as_mut_ptr() as *mut c_void),
            Some(&mut size),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    let text = String::from_utf16_lossy(&buffer[..len]);
    if text.is_empty() { None } else { Some(text) }
}

fn powershell(script: &str) -> Option<String> {
    common::command_output("powershell", &["-NoProfile", "-NonInteractive", "-Command", script])
}

fn dirs_in(path: Option<PathBuf>) -> usize {
    path.map(|dir| common::count_entries(&dir, |p| p.is_dir()))
        .unwrap_or(0)
}

impl SystemProbe for WindowsProbe {
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
        let choco = dirs_in(env::var_os("ChocolateyInstall").map(|dir| PathBuf::from(dir).join("lib")));
        let scoop = dirs_in(dirs::home_dir().map(|home| home.join("scoop").join("apps")));
        system::format_packages(&[("choco", choco), ("scoop", scoop)])
            .ok_or_else(|| Error::collection(FactKey::Packages, "no chocolatey or scoop packages"))
    }

    fn shell(&self) -> Result<String> {
        let parent = common::ancestor_process_name(1).unwrap_or_default().to_lowercase();
        if parent.starts_with("pwsh") || parent.starts_with("powershell") {
            let version = powershell("$PSVersionTable.PSVersion.ToString()");
            return Ok(match version {
                Some(version) => format!("PowerShell {}", version),
                None => "PowerShell".to_string(),
            });
        }
        if parent.starts_with("cmd") {
            return Ok("Command Prompt".to_string());
        }
        env::var("ComSpec").map_err(|e| Error::collection(FactKey::Shell, e.to_string()))
    }

    fn resolution(&self) -> Result<String> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(Error::collection(FactKey::Resolution, "GetSystemMetrics returned no size"));
        }
        Ok(format!("{}x{}", width, height))
    }

    fn wm(&self) -> Result<String> {
        Ok("Windows Explorer".to_string())
    }

    fn theme(&self) -> Result<String> {
        let mode = match read_reg_dword(PERSONALIZE_KEY, "AppsUseLightTheme") {
            Some(1) => "Light",
            Some(_) => "Dark",
            None => return Err(Error::collection(FactKey::Theme, "personalization key missing")),
        };
        let name = read_reg_string(THEMES_KEY, "CurrentTheme")
            .and_then(|path| {
                path.rsplit('\\')
                    .next()
                    .map(|leaf| leaf.trim_end_matches(".theme").to_string())
            })
            .unwrap_or_else(|| format!("Windows {}", mode));
        Ok(format!("{} ({})", name, mode))
    }

    fn terminal(&self) -> Result<String> {
        if env::var_os("WT_SESSION").is_some() {
            return Ok("Windows Terminal".to_string());
        }
        if let Ok(program) = env::var("TERM_PROGRAM") {
            return Ok(program);
        }
        match common::ancestor_process_name(1) {
            Some(name) if name.to_lowercase().starts_with("powershell") => Ok("Windows PowerShell".to_string()),
            Some(name) if name.to_lowercase().starts_with("cmd") => Ok("Command Prompt".to_string()),
            Some(name) => Ok(name.trim_end_matches(".exe").to_string()),
            None => Err(Error::collection(FactKey::Terminal, "no parent process")),
        }
    }

    fn font(&self) -> Result<String> {
        read_reg_string("Console", "FaceName")
            .ok_or_else(|| Error::collection(FactKey::Font, "console font not configured"))
    }

    fn cpu(&self) -> Result<String> {
        common::cpu()
    }

    fn gpu(&self) -> Result<String> {
        let listed = common::command_output("wmic", &["path", "win32_VideoController", "get", "name"])
            .map(|stdout| stdout.lines().skip(1).map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(", "))
            .filter(|gpus| !gpus.is_empty())
            .or_else(|| powershell("(Get-CimInstance Win32_VideoController).Name -join ', '"));
        listed.ok_or_else(|| Error::collection(FactKey::Gpu, "no video controller reported"))
    }

    fn memory(&self) -> Result<String> {
        common::memory()
    }

    fn disk(&self) -> Result<String> {
        common::disk()
    }
}
