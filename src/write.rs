//! Atomic file write utilities
use rand::{Rng, distributions::Alphanumeric};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    // Rename is atomic on the same filesystem
    std::fs::rename(&tmp, path)?;
    // fsync the parent dir for durability where supported
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Like [`atomic_write`], but the file is owner read/write only for its
/// entire lifetime, temp file included.
pub fn atomic_write_secret(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = tmp_path(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f = opts.open(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    std::fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let mut pb = path.as_os_str().to_owned();
    let s = format!(".tmp.{}", suffix);
    pb.push(&s);
    PathBuf::from(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_files() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.join("out.txt");
        atomic_write(&path, b"hello").unwrap();
        let got = std::fs::read(&path).unwrap();
        assert_eq!(got, b"hello");
    }

    #[test]
    fn creates_missing_parents() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.join("a/b/out.txt");
        atomic_write(&path, b"nested").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"nested");
    }

    #[cfg(unix)]
    #[test]
    fn secret_writes_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.join("token");
        atomic_write_secret(&path, b"s3cr3t").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"s3cr3t");
    }
}
