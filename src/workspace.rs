use crate::attendance;
use crate::config::Config;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".attendd.lock";

/// A directory holding the student registry and the attendance log.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    students_path: PathBuf,
    attendance_path: PathBuf,
}

/// Exclusive hold on a workspace. Released on drop.
pub struct WorkspaceLock {
    _file: File,
}

impl Workspace {
    /// Open a workspace, creating the directory and empty stores if missing.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        let ws = Self {
            root: root.to_path_buf(),
            students_path: root.join(config.students_file.trim()),
            attendance_path: root.join(config.attendance_file.trim()),
        };

        let _guard = ws.lock()?;
        if !ws.students_path.exists() {
            write_atomic(&ws.students_path, b"[]")?;
            tracing::info!(path = %ws.students_path.display(), "created empty student registry");
        }
        if !ws.attendance_path.exists() {
            write_atomic(&ws.attendance_path, attendance::empty_log_csv().as_bytes())?;
            tracing::info!(path = %ws.attendance_path.display(), "created empty attendance log");
        }
        Ok(ws)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn students_path(&self) -> &Path {
        &self.students_path
    }

    pub fn attendance_path(&self) -> &Path {
        &self.attendance_path
    }

    /// Block until this process holds the workspace exclusively.
    ///
    /// Not reentrant: a second `lock()` while a guard is alive deadlocks.
    pub fn lock(&self) -> Result<WorkspaceLock> {
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Lock {
                path: path.clone(),
                source: e,
            })?;
        file.lock().map_err(|e| Error::Lock { path, source: e })?;
        Ok(WorkspaceLock { _file: file })
    }
}

/// Replace `path` with `bytes` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut f = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    f.write_all(bytes).map_err(|e| Error::io(&tmp, e))?;
    f.sync_all().map_err(|e| Error::io(&tmp, e))?;
    drop(f);

    std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

/// Read a store file; a missing file reads as `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}
