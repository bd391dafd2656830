//! File transfer over the machine's SFTP channel.
//!
//! Single files stream in either direction with parent directories created
//! as needed. Directory transfers mirror the source tree under the
//! destination, with the destination directory name derived from the source
//! leaf name; a caller-supplied predicate decides per file whether it is
//! transferred. Directory creation is idempotent.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ssh2::Sftp;

use crate::error::MachineError;
use crate::session::Machine;

/// Per-file transfer predicate used by directory transfers.
pub type TransferPredicate<'a> = &'a dyn Fn(&Path) -> bool;

impl Machine {
    fn sftp(&self) -> Result<&Sftp, MachineError> {
        self.sftp.as_ref().ok_or_else(|| {
            MachineError::Session("transfer channel is closed".to_string())
        })
    }

    /// Stream one local file to the remote filesystem.
    pub fn put_file(&self, local: &Path, remote: &Path) -> Result<(), MachineError> {
        let sftp = self.sftp()?;
        if let Some(parent) = remote.parent() {
            mkdir_all_remote(sftp, parent)?;
        }

        let mut source = fs::File::open(local).map_err(|e| MachineError::Transfer {
            path: local.display().to_string(),
            detail: format!("failed to open local file: {e}"),
        })?;
        let mut dest = sftp.create(remote).map_err(|e| MachineError::Transfer {
            path: remote.display().to_string(),
            detail: format!("failed to create remote file: {e}"),
        })?;
        std::io::copy(&mut source, &mut dest).map_err(|e| MachineError::Transfer {
            path: remote.display().to_string(),
            detail: format!("failed to copy content: {e}"),
        })?;
        tracing::debug!(
            "[Machine] Uploaded {} -> {}",
            local.display(),
            remote.display()
        );
        Ok(())
    }

    /// Stream one remote file to the local filesystem.
    pub fn fetch_file(&self, remote: &Path, local: &Path) -> Result<(), MachineError> {
        let sftp = self.sftp()?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| MachineError::CreateDir {
                path: parent.display().to_string(),
                detail: e.to_string(),
            })?;
        }

        let mut source = sftp.open(remote).map_err(|e| MachineError::Transfer {
            path: remote.display().to_string(),
            detail: format!("failed to open remote file: {e}"),
        })?;
        let mut dest = fs::File::create(local).map_err(|e| MachineError::Transfer {
            path: local.display().to_string(),
            detail: format!("failed to create local file: {e}"),
        })?;
        std::io::copy(&mut source, &mut dest).map_err(|e| MachineError::Transfer {
            path: local.display().to_string(),
            detail: format!("failed to copy content: {e}"),
        })?;
        tracing::debug!(
            "[Machine] Fetched {} -> {}",
            remote.display(),
            local.display()
        );
        Ok(())
    }

    /// Write bytes to a remote file, creating parent directories as needed.
    /// Used to stage script assets without a local file.
    pub fn write_remote_file(&self, remote: &Path, content: &[u8]) -> Result<(), MachineError> {
        let sftp = self.sftp()?;
        if let Some(parent) = remote.parent() {
            mkdir_all_remote(sftp, parent)?;
        }
        let mut dest = sftp.create(remote).map_err(|e| MachineError::Transfer {
            path: remote.display().to_string(),
            detail: format!("failed to create remote file: {e}"),
        })?;
        dest.write_all(content).map_err(|e| MachineError::Transfer {
            path: remote.display().to_string(),
            detail: format!("failed to copy content: {e}"),
        })?;
        Ok(())
    }

    /// Recursively upload `local_dir` under `remote_parent`. The remote tree
    /// lands at `<remote_parent>/<basename(local_dir)>`; files failing
    /// `predicate` are skipped.
    pub fn put_dir(
        &self,
        local_dir: &Path,
        remote_parent: &Path,
        predicate: TransferPredicate,
    ) -> Result<(), MachineError> {
        let sftp = self.sftp()?;
        let dest_root = mirrored_root(remote_parent, local_dir)?;
        mkdir_all_remote(sftp, &dest_root)?;

        for file in walk_local_files(local_dir).map_err(|e| MachineError::Transfer {
            path: local_dir.display().to_string(),
            detail: format!("failed to walk local directory: {e}"),
        })? {
            if !predicate(&file) {
                tracing::debug!("[Machine] Skipping {} (predicate)", file.display());
                continue;
            }
            let relative = file
                .strip_prefix(local_dir)
                .expect("walked file is under its root");
            self.put_file(&file, &dest_root.join(relative))?;
        }
        Ok(())
    }

    /// Recursively download `remote_dir` under `local_parent`. The local
    /// tree lands at `<local_parent>/<basename(remote_dir)>`; files failing
    /// `predicate` are skipped.
    pub fn fetch_dir(
        &self,
        remote_dir: &Path,
        local_parent: &Path,
        predicate: TransferPredicate,
    ) -> Result<(), MachineError> {
        let dest_root = mirrored_root(local_parent, remote_dir)?;
        fs::create_dir_all(&dest_root).map_err(|e| MachineError::CreateDir {
            path: dest_root.display().to_string(),
            detail: e.to_string(),
        })?;
        self.fetch_dir_inner(remote_dir, &dest_root, predicate)
    }

    fn fetch_dir_inner(
        &self,
        remote_dir: &Path,
        local_dir: &Path,
        predicate: TransferPredicate,
    ) -> Result<(), MachineError> {
        let sftp = self.sftp()?;
        let entries = sftp.readdir(remote_dir).map_err(|e| MachineError::Transfer {
            path: remote_dir.display().to_string(),
            detail: format!("failed to list remote directory: {e}"),
        })?;

        for (path, stat) in entries {
            let name = match path.file_name() {
                Some(name) => name.to_os_string(),
                None => continue,
            };
            let dest = local_dir.join(&name);
            if stat.is_dir() {
                if !dest.exists() {
                    fs::create_dir_all(&dest).map_err(|e| MachineError::CreateDir {
                        path: dest.display().to_string(),
                        detail: e.to_string(),
                    })?;
                }
                self.fetch_dir_inner(&path, &dest, predicate)?;
            } else {
                if !predicate(&path) {
                    tracing::debug!("[Machine] Skipping {} (predicate)", path.display());
                    continue;
                }
                self.fetch_file(&path, &dest)?;
            }
        }
        Ok(())
    }
}

/// Destination root for a directory transfer: the source leaf name appended
/// to the destination parent.
pub fn mirrored_root(dest_parent: &Path, source: &Path) -> Result<PathBuf, MachineError> {
    let leaf = source.file_name().ok_or_else(|| MachineError::Transfer {
        path: source.display().to_string(),
        detail: "source directory has no leaf name".to_string(),
    })?;
    Ok(dest_parent.join(leaf))
}

/// Recursively collect all regular files under `dir`, sorted for
/// deterministic transfer order.
pub fn walk_local_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                files.extend(walk_local_files(&path)?);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Create a remote directory and all of its ancestors. Existing directories
/// are detected with a stat call first, so repeated transfers do not fail.
fn mkdir_all_remote(sftp: &Sftp, dir: &Path) -> Result<(), MachineError> {
    let mut current = PathBuf::new();
    for component in dir.components() {
        current.push(component);
        if current.as_os_str().is_empty() || current == Path::new("/") {
            continue;
        }
        if sftp.stat(&current).is_ok() {
            continue;
        }
        sftp.mkdir(&current, 0o755).map_err(|e| MachineError::CreateDir {
            path: current.display().to_string(),
            detail: e.to_string(),
        })?;
    }
    Ok(())
}
