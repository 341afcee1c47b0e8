//! Platform capability layer
//!
//! The collector only talks to [`SystemProbe`]. Each OS family provides one
//! implementation; facts it cannot answer fall through to the default
//! methods, which report an unsupported-query error.

mod common;
#[cfg(not(windows))]
mod unix;
#[cfg(windows)]
mod win;

use crate::error::{Error, Result};
use crate::system::FactKey;

#[cfg(not(windows))]
pub use unix::UnixProbe as NativeProbe;
#[cfg(windows)]
pub use win::WindowsProbe as NativeProbe;

fn unsupported(key: FactKey) -> Result<String> {
    Err(Error::collection(key, "not supported on this platform"))
}

/// Read-only OS queries, one per fact.
pub trait SystemProbe: Send + Sync {
    fn user(&self) -> Result<String> {
        unsupported(FactKey::User)
    }

    fn os(&self) -> Result<String> {
        unsupported(FactKey::Os)
    }

    fn hostname(&self) -> Result<String> {
        unsupported(FactKey::Hostname)
    }

    fn kernel(&self) -> Result<String> {
        unsupported(FactKey::Kernel)
    }

    fn uptime(&self) -> Result<String> {
        unsupported(FactKey::Uptime)
    }

    fn packages(&self) -> Result<String> {
        unsupported(FactKey::Packages)
    }

    fn shell(&self) -> Result<String> {
        unsupported(FactKey::Shell)
    }

    fn resolution(&self) -> Result<String> {
        unsupported(FactKey::Resolution)
    }

    fn wm(&self) -> Result<String> {
        unsupported(FactKey::Wm)
    }

    fn theme(&self) -> Result<String> {
        unsupported(FactKey::Theme)
    }

    fn terminal(&self) -> Result<String> {
        unsupported(FactKey::Terminal)
    }

    fn font(&self) -> Result<String> {
        unsupported(FactKey::Font)
    }

    fn cpu(&self) -> Result<String> {
        unsupported(FactKey::Cpu)
    }

    fn gpu(&self) -> Result<String> {
        unsupported(FactKey::Gpu)
    }

    fn memory(&self) -> Result<String> {
        unsupported(FactKey::Memory)
    }

    fn disk(&self) -> Result<String> {
        unsupported(FactKey::Disk)
    }

    /// Dispatches a key to its query.
    fn query(&self, key: FactKey) -> Result<String> {
        match key {
            FactKey::User => self.user(),
            FactKey::Os => self.os(),
            FactKey::Hostname => self.hostname(),
            FactKey::Kernel => self.kernel(),
            FactKey::Uptime => self.uptime(),
            FactKey::Packages => self.packages(),
            FactKey::Shell => self.shell(),
            FactKey::Resolution => self.resolution(),
            FactKey::Wm => self.wm(),
            FactKey::Theme => self.theme(),
            FactKey::Terminal => self.terminal(),
            FactKey::Font => self.font(),
            FactKey::Cpu => self.cpu(),
            FactKey::Gpu => self.gpu(),
            FactKey::Memory => self.memory(),
            FactKey::Disk => self.disk(),
        }
    }
}
