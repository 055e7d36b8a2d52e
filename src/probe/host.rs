//! Built-in probes for the local host.
//!
//! Coarse, low-cardinality signals only. Everything is read from the process
//! environment or well-known files; nothing is spawned and nothing leaves
//! the machine.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::Probe;
use crate::error::{FingerprintError, ProbeError};
use crate::fingerprint::canonical;

const MEMINFO_PATH: &str = "/proc/meminfo";
const ETC_TIMEZONE_PATH: &str = "/etc/timezone";
const LOCALTIME_PATH: &str = "/etc/localtime";

/// Locale variables in POSIX precedence order
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_CTYPE", "LANG"];

/// Registration order of the default probe set
pub const DEFAULT_PROBE_NAMES: &[&str] = &["platform", "cores", "memory", "locale", "timezone"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostProbe {
    Platform,
    Cores,
    Memory,
    Locale,
    Timezone,
}

impl HostProbe {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "platform" => Some(HostProbe::Platform),
            "cores" => Some(HostProbe::Cores),
            "memory" => Some(HostProbe::Memory),
            "locale" => Some(HostProbe::Locale),
            "timezone" => Some(HostProbe::Timezone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostProbe::Platform => "platform",
            HostProbe::Cores => "cores",
            HostProbe::Memory => "memory",
            HostProbe::Locale => "locale",
            HostProbe::Timezone => "timezone",
        }
    }
}

#[async_trait]
impl Probe for HostProbe {
    fn name(&self) -> &str {
        self.as_str()
    }

    async fn run(&self) -> Result<String, ProbeError> {
        match self {
            HostProbe::Platform => Ok(canonical::platform(std::env::consts::OS, std::env::consts::ARCH)),
            HostProbe::Cores => read_cores(),
            HostProbe::Memory => read_memory(Path::new(MEMINFO_PATH)).await,
            HostProbe::Locale => read_locale(|var| std::env::var(var).ok()),
            HostProbe::Timezone => {
                read_timezone(
                    std::env::var("TZ").ok(),
                    Path::new(ETC_TIMEZONE_PATH),
                    Path::new(LOCALTIME_PATH),
                )
                .await
            }
        }
    }
}

/// All built-in probes in their fixed registration order
pub fn default_probes() -> Vec<Arc<dyn Probe>> {
    DEFAULT_PROBE_NAMES
        .iter()
        .filter_map(|name| HostProbe::from_name(name))
        .map(|p| Arc::new(p) as Arc<dyn Probe>)
        .collect()
}

/// Build built-in probes in the order the caller lists them.
pub fn probes_by_name(names: &[String]) -> Result<Vec<Arc<dyn Probe>>, FingerprintError> {
    names
        .iter()
        .map(|name| {
            HostProbe::from_name(name.trim())
                .map(|p| Arc::new(p) as Arc<dyn Probe>)
                .ok_or_else(|| FingerprintError::InvalidInput(format!("unknown probe '{}'", name)))
        })
        .collect()
}

fn read_cores() -> Result<String, ProbeError> {
    let cores = std::thread::available_parallelism()?;
    Ok(canonical::count(cores.get()))
}

async fn read_memory(meminfo: &Path) -> Result<String, ProbeError> {
    let content = tokio::fs::read_to_string(meminfo).await?;
    parse_mem_total(&content)
        .map(canonical::gib_rounded)
        .ok_or_else(|| ProbeError::Unavailable(format!("MemTotal not found in {}", meminfo.display())))
}

/// Parse `MemTotal:  16303428 kB` into KiB
fn parse_mem_total(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kib| kib.parse().ok())
}

fn read_locale<F>(lookup: F) -> Result<String, ProbeError>
where
    F: Fn(&str) -> Option<String>,
{
    // First variable that is set wins, even if it names the C locale
    let raw = LOCALE_VARS
        .iter()
        .find_map(|var| lookup(var).filter(|v| !v.is_empty()))
        .ok_or_else(|| ProbeError::Unavailable("no locale variable set".to_string()))?;

    canonical::locale(&raw)
        .ok_or_else(|| ProbeError::Unavailable(format!("locale '{}' carries no language", raw)))
}

async fn read_timezone(
    tz_env: Option<String>,
    etc_timezone: &Path,
    localtime: &Path,
) -> Result<String, ProbeError> {
    if let Some(zone) = tz_env.as_deref().and_then(zone_from_tz_var) {
        return Ok(zone);
    }

    match tokio::fs::read_to_string(etc_timezone).await {
        Ok(content) => {
            let zone = content.trim();
            if !zone.is_empty() {
                return Ok(zone.to_string());
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => return Err(e.into()),
        Err(e) => debug!("{} unreadable: {}", etc_timezone.display(), e),
    }

    let target = tokio::fs::read_link(localtime).await?;
    zone_from_zoneinfo_path(&target)
        .ok_or_else(|| ProbeError::Unavailable(format!("{} is not a zoneinfo link", localtime.display())))
}

/// `TZ` may be `Europe/Berlin`, `:Europe/Berlin` or a zoneinfo path
fn zone_from_tz_var(raw: &str) -> Option<String> {
    let tz = raw.trim().trim_start_matches(':');
    if tz.is_empty() {
        return None;
    }
    if tz.starts_with('/') {
        return zone_from_zoneinfo_path(&PathBuf::from(tz));
    }
    Some(tz.to_string())
}

fn zone_from_zoneinfo_path(path: &Path) -> Option<String> {
    let path = path.to_string_lossy();
    let (_, zone) = path.split_once("zoneinfo/")?;
    let zone = zone.trim_start_matches("posix/").trim_start_matches("right/");
    if zone.is_empty() {
        None
    } else {
        Some(zone.to_string())
    }
}
