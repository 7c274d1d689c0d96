//! Filesystem and memory hardening helpers shared by the backends and the
//! migration pipeline.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{KeyError, Result};

/// Set restrictive file permissions (0600)
pub fn set_secure_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Create a directory (and parents) with mode 0700.
pub fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Constant-time comparison function
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Disable core dumps for the current process
pub fn disable_core_dumps() -> Result<()> {
    #[cfg(unix)]
    {
        use libc::{rlimit, setrlimit, RLIMIT_CORE};
        let rlim = rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let result = unsafe { setrlimit(RLIMIT_CORE, &rlim) };
        if result != 0 {
            return Err(KeyError::FileError(
                "failed to disable core dumps".to_string(),
            ));
        }
    }
    Ok(())
}

/// Write `data` to `path` atomically: tempfile in the same directory, fsync,
/// rename, then fsync the directory. A crash mid-write never leaves a
/// truncated file at `path`.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| KeyError::FileError(format!("no parent directory: {}", path.display())))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|e| KeyError::FileError(e.to_string()))?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    let tmp_path = tmp.into_temp_path();
    tmp_path
        .persist(path)
        .map_err(|e| KeyError::FileError(e.to_string()))?;
    set_secure_permissions(path)?;
    fsync_dir(dir)?;
    Ok(())
}

fn fsync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    Ok(())
}

/// Exclusive advisory lock on `<dir>/.lock`. Contenders fail with `Busy`
/// rather than queueing; dropping the guard releases the lock.
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    pub fn acquire(dir: &Path, name: &str) -> Result<Self> {
        create_private_dir(dir)?;
        let path = dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc != 0 {
                return Err(KeyError::Busy(name.to_string()));
            }
        }
        Ok(DirLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        }
    }
}

/// Overwrite a file with zeroes of its exact length, fsync, then unlink.
/// Used by the secure-wipe path of migration.
pub fn secure_overwrite(path: &Path) -> Result<()> {
    let len = fs::metadata(path)?.len() as usize;
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.write_all(&vec![0u8; len])?;
    file.sync_all()?;
    drop(file);
    fs::remove_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn dir_lock_excludes_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let _first = DirLock::acquire(dir.path(), "v1").unwrap();
        let second = DirLock::acquire(dir.path(), "v1");
        assert!(matches!(second, Err(KeyError::Busy(_))));
    }

    #[test]
    fn dir_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _guard = DirLock::acquire(dir.path(), "v1").unwrap();
        }
        assert!(DirLock::acquire(dir.path(), "v1").is_ok());
    }

    #[test]
    fn secure_overwrite_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private.key");
        fs::write(&path, b"super secret hex").unwrap();
        secure_overwrite(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
