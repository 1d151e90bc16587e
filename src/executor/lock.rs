use crate::errors::SensorError;
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use sysinfo::{Pid, System};
use tracing::{debug, warn};

/// Exclusive ownership of a report path for the duration of a run.
///
/// Taken by creating `<report>.lock` holding the owner pid; released when
/// dropped. A lock left behind by a process that is gone is taken over.
#[derive(Debug)]
pub struct ReportLock {
    path: PathBuf,
}

impl ReportLock {
    pub fn acquire(report: &Path) -> Result<Self, SensorError> {
        let mut name = report.as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        match Self::create(&path) {
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let owner = match stale_owner(&path) {
                    Some(pid) => pid,
                    None => return Err(SensorError::ReportLocked(report.to_path_buf())),
                };
                warn!(lock = %path.display(), owner, "taking over stale report lock");
                match fs::remove_file(&path) {
                    Ok(()) => (),
                    Err(err) if err.kind() == ErrorKind::NotFound => (),
                    Err(err) => return Err(err.into()),
                }
                // Someone else may have won the takeover in between.
                match Self::create(&path) {
                    Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                        Err(SensorError::ReportLocked(report.to_path_buf()))
                    }
                    res => Ok(res?),
                }
            }
            res => Ok(res?),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        if let Err(err) = writeln!(file, "{}", std::process::id()) {
            debug!(lock = %path.display(), %err, "could not record lock owner");
        }
        debug!(lock = %path.display(), "report lock acquired");
        Ok(ReportLock {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Pid recorded in the lock at `path` if that process no longer runs.
/// Unreadable or empty locks count as held.
fn stale_owner(path: &Path) -> Option<u32> {
    let pid = fs::read_to_string(path).ok()?.trim().parse::<u32>().ok()?;
    if pid == std::process::id() || is_running(pid) {
        None
    } else {
        Some(pid)
    }
}

fn is_running(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).is_some()
}

impl Drop for ReportLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), %err, "failed to release report lock");
        }
    }
}
