//! Script assets — compiled into the binary so the framework is
//! self-contained on machines where only the binary is available.
//!
//! Assets are loaded at compile time via `include_str!` and addressed by
//! logical name. [`ScriptSource`] is the seam: swapping the embedded bundle
//! for a filesystem (or any other) source must not change any other
//! component.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Remote directory where script assets are staged before execution.
pub const REMOTE_SCRIPT_DIR: &str = "/tmp/scripts";

/// Check probes
pub static CHECK_CPU_NUM: &str = include_str!("scripts/check_cpu_num.sh");
pub static CHECK_MEMORY_SIZE: &str = include_str!("scripts/check_memory_size.sh");
pub static CHECK_DISK_SIZE: &str = include_str!("scripts/check_disk_size.sh");
pub static CHECK_KERNEL_VERSION: &str = include_str!("scripts/check_kernel_version.sh");
pub static CHECK_DISTRIBUTION: &str = include_str!("scripts/check_distribution.sh");
pub static CHECK_PORT_OCCUPIED: &str = include_str!("scripts/check_port_occupied.sh");

/// Init scripts
pub static INIT_CHANGE_FIREWALL: &str = include_str!("scripts/init_change_firewall.sh");
pub static INIT_CHANGE_HOSTNAME: &str = include_str!("scripts/init_change_hostname.sh");
pub static INIT_CLOSE_SWAP: &str = include_str!("scripts/init_close_swap.sh");
pub static INIT_NETWORK: &str = include_str!("scripts/init_network.sh");
pub static INIT_CHANGE_TIMEZONE: &str = include_str!("scripts/init_change_timezone.sh");
pub static INIT_KEEPALIVED: &str = include_str!("scripts/init_keepalived.sh.j2");
pub static INIT_INSTALL_TOOLCHAIN: &str = include_str!("scripts/init_install_toolchain.sh.j2");

/// All embedded scripts as (name, content) pairs.
pub const ALL_SCRIPTS: &[(&str, &str)] = &[
    ("check_cpu_num.sh", CHECK_CPU_NUM),
    ("check_memory_size.sh", CHECK_MEMORY_SIZE),
    ("check_disk_size.sh", CHECK_DISK_SIZE),
    ("check_kernel_version.sh", CHECK_KERNEL_VERSION),
    ("check_distribution.sh", CHECK_DISTRIBUTION),
    ("check_port_occupied.sh", CHECK_PORT_OCCUPIED),
    ("init_change_firewall.sh", INIT_CHANGE_FIREWALL),
    ("init_change_hostname.sh", INIT_CHANGE_HOSTNAME),
    ("init_close_swap.sh", INIT_CLOSE_SWAP),
    ("init_network.sh", INIT_NETWORK),
    ("init_change_timezone.sh", INIT_CHANGE_TIMEZONE),
    ("init_keepalived.sh.j2", INIT_KEEPALIVED),
    ("init_install_toolchain.sh.j2", INIT_INSTALL_TOOLCHAIN),
];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Script asset not found: {0}")]
    NotFound(String),

    #[error("Failed to read script asset {name}: {detail}")]
    Read { name: String, detail: String },

    #[error("Failed to render script asset {name}: {detail}")]
    Render { name: String, detail: String },
}

/// Read-only source of named script assets.
pub trait ScriptSource: Send + Sync {
    fn names(&self) -> Vec<String>;

    fn open(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}

/// The embedded bundle compiled into the binary.
pub struct EmbeddedScripts;

impl ScriptSource for EmbeddedScripts {
    fn names(&self) -> Vec<String> {
        ALL_SCRIPTS.iter().map(|(name, _)| name.to_string()).collect()
    }

    fn open(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        ALL_SCRIPTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, content)| content.as_bytes().to_vec())
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Filesystem-backed source, for local development and overrides.
pub struct DirScripts {
    root: PathBuf,
}

impl DirScripts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirScripts { root: root.into() }
    }
}

impl ScriptSource for DirScripts {
    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    names.push(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        names
    }

    fn open(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(AssetError::NotFound(name.to_string()));
        }
        std::fs::read(&path).map_err(|e| AssetError::Read {
            name: name.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Remote staging path for a named script asset.
pub fn staging_path(name: &str) -> PathBuf {
    Path::new(REMOTE_SCRIPT_DIR).join(name)
}
