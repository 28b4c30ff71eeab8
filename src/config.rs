//! # Supervisor configuration.
//!
//! [`HostConfig`] carries everything the supervisor needs before the child
//! starts: which executable to run and with what arguments, where attach
//! clients may connect, and how much scrollback to retain.
//!
//! [`HostConfig::validate`] performs every filesystem check up front so a
//! misconfiguration fails fast, is reported with a precise errno code, and
//! the child is never started.

use std::path::PathBuf;

use crate::attach::ListenAddr;
use crate::error::HostError;

/// Everything needed to supervise one child process.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Absolute path of the executable to run.
    pub exec: PathBuf,
    /// Optional attach endpoint (unix path or TCP `host:port`).
    pub listen: Option<String>,
    /// Number of output lines retained for replay to attaching clients.
    pub scrollback: usize,
    /// Arguments passed to the child. Argument zero is always the resolved
    /// executable path; these follow it.
    pub args: Vec<String>,
}

impl HostConfig {
    /// Checks the executable path and attach address before anything runs.
    ///
    /// Failures map to errno codes via [`HostError::errno`]: EINVAL for
    /// unusable values, ENOENT/ENOTDIR for missing or wrong-kind paths,
    /// EEXIST for an occupied socket path.
    pub fn validate(&self) -> Result<(), HostError> {
        self.validate_exec()?;
        if let Some(listen) = &self.listen {
            ListenAddr::parse(listen)?.validate()?;
        }
        Ok(())
    }

    fn validate_exec(&self) -> Result<(), HostError> {
        let path = self.exec.display().to_string();
        if !self.exec.is_absolute() || path.len() <= 1 {
            return Err(HostError::InvalidExec { path });
        }

        let dir = match self.exec.parent() {
            Some(dir) if dir.as_os_str().is_empty() => PathBuf::from("/"),
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("/"),
        };
        match std::fs::metadata(&dir) {
            Err(_) => {
                return Err(HostError::ExecDirMissing {
                    path: dir.display().to_string(),
                })
            }
            Ok(meta) if !meta.is_dir() => {
                return Err(HostError::ExecDirNotDir {
                    path: dir.display().to_string(),
                })
            }
            Ok(_) => {}
        }

        if !self.exec.exists() {
            return Err(HostError::ExecMissing { path });
        }
        Ok(())
    }
}
